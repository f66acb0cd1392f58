use std::fmt;

use alloy_primitives::{B256, U256};
use multicall::MultiSendError;
use thiserror::Error;

use crate::lifecycle::TransactionStatus;

/// Stable identifiers attached to every error, for logs and support requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidTransactionFields,
    InsufficientConfirmations,
    StaleConfirmation,
    GatewayRequest,
    ChainRequest,
    NonceConflict,
    InvalidState,
    Cancelled,
    UnsupportedChain,
    PrepareTransaction,
    SubmitTransaction,
}

impl ErrorCode {
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::InvalidTransactionFields => 801,
            ErrorCode::InsufficientConfirmations => 802,
            ErrorCode::StaleConfirmation => 803,
            ErrorCode::GatewayRequest => 804,
            ErrorCode::ChainRequest => 805,
            ErrorCode::NonceConflict => 806,
            ErrorCode::InvalidState => 807,
            ErrorCode::Cancelled => 808,
            ErrorCode::UnsupportedChain => 809,
            ErrorCode::PrepareTransaction => 815,
            ErrorCode::SubmitTransaction => 816,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTransactionFields => "Invalid transaction fields",
            ErrorCode::InsufficientConfirmations => "Not enough confirmations to execute",
            ErrorCode::StaleConfirmation => "Confirmation signed an outdated transaction hash",
            ErrorCode::GatewayRequest => "Error communicating with the transaction gateway",
            ErrorCode::ChainRequest => "Error communicating with the chain",
            ErrorCode::NonceConflict => "Transaction nonce no longer matches the Safe nonce",
            ErrorCode::InvalidState => "Operation not allowed in the current transaction state",
            ErrorCode::Cancelled => "Request was dismissed",
            ErrorCode::UnsupportedChain => "Chain is not supported",
            ErrorCode::PrepareTransaction => "Error preparing a transaction",
            ErrorCode::SubmitTransaction => "Error submitting a transaction",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Which external collaborator a network failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOrigin {
    Gateway,
    Chain,
}

impl fmt::Display for NetworkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkOrigin::Gateway => f.write_str("gateway"),
            NetworkOrigin::Chain => f.write_str("chain"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SafeError {
    #[error("invalid `{field}`: {reason}")]
    Encoding { field: String, reason: String },

    #[error("{have} of {need} required confirmations")]
    InsufficientConfirmations { have: usize, need: usize },

    #[error("confirmation signs {found} but the transaction hash is {expected}")]
    StaleHash { expected: B256, found: B256 },

    #[error("{origin} request failed: {message}")]
    Network { origin: NetworkOrigin, message: String },

    #[error("transaction nonce {expected} does not match on-chain nonce {onchain}")]
    NonceConflict { expected: U256, onchain: U256 },

    #[error("batch member {index} has nonce {nonce}, the batch must start at on-chain nonce {onchain}")]
    BatchNonceGap { index: usize, nonce: U256, onchain: U256 },

    #[error("cannot {action} a transaction that is {status}")]
    InvalidState { action: &'static str, status: TransactionStatus },

    #[error("request was dismissed before it completed")]
    Cancelled,

    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),
}

impl SafeError {
    pub fn encoding(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encoding { field: field.into(), reason: reason.to_string() }
    }

    pub fn chain(err: impl ToString) -> Self {
        Self::Network { origin: NetworkOrigin::Chain, message: err.to_string() }
    }

    pub fn gateway(err: impl ToString) -> Self {
        Self::Network { origin: NetworkOrigin::Gateway, message: err.to_string() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SafeError::Encoding { .. } => ErrorCode::InvalidTransactionFields,
            SafeError::InsufficientConfirmations { .. } => ErrorCode::InsufficientConfirmations,
            SafeError::StaleHash { .. } => ErrorCode::StaleConfirmation,
            SafeError::Network { origin: NetworkOrigin::Gateway, .. } => ErrorCode::GatewayRequest,
            SafeError::Network { origin: NetworkOrigin::Chain, .. } => ErrorCode::ChainRequest,
            SafeError::NonceConflict { .. } | SafeError::BatchNonceGap { .. } => {
                ErrorCode::NonceConflict
            }
            SafeError::InvalidState { .. } => ErrorCode::InvalidState,
            SafeError::Cancelled => ErrorCode::Cancelled,
            SafeError::UnsupportedChain(_) => ErrorCode::UnsupportedChain,
        }
    }

    /// Human readable message prefixed with the stable error code.
    pub fn user_message(&self) -> String {
        format!("{} ({})", self.code(), self)
    }
}

impl From<MultiSendError> for SafeError {
    fn from(err: MultiSendError) -> Self {
        match err {
            MultiSendError::EmptyBatch => SafeError::encoding("transactions", err),
            MultiSendError::UnsupportedChain(chain_id) => SafeError::UnsupportedChain(chain_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(SafeError::encoding("nonce", "missing").code().code(), 801);
        assert_eq!(SafeError::gateway("timeout").code().code(), 804);
        assert_eq!(SafeError::chain("timeout").code().code(), 805);
        assert_eq!(
            SafeError::NonceConflict { expected: U256::from(1), onchain: U256::from(2) }
                .code()
                .code(),
            806
        );
        assert_eq!(ErrorCode::PrepareTransaction.code(), 815);
    }

    #[test]
    fn user_message_names_the_field() {
        let err = SafeError::encoding("operation", "missing");
        let message = err.user_message();

        assert!(message.starts_with("801: Invalid transaction fields"));
        assert!(message.contains("`operation`"));
    }

    #[test]
    fn multi_send_errors_map_to_encoding() {
        let err: SafeError = MultiSendError::EmptyBatch.into();
        assert!(matches!(err, SafeError::Encoding { ref field, .. } if field == "transactions"));

        let err: SafeError = MultiSendError::UnsupportedChain(5).into();
        assert_eq!(err, SafeError::UnsupportedChain(5));
    }
}
