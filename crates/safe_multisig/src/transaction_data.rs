use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::SafeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Operation {
    #[default]
    Call = 0,
    DelegateCall = 1,
}

impl From<Operation> for u8 {
    fn from(operation: Operation) -> Self {
        operation as u8
    }
}

impl TryFrom<u8> for Operation {
    type Error = SafeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            other => Err(SafeError::encoding("operation", format!("unknown operation {other}"))),
        }
    }
}

/// A call the Safe should make, before nonce and gas parameters are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeMetaTransaction {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
}

/// Every field that goes into the `SafeTx` typed-data message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransactionData {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: U256,
}

impl SafeTransactionData {
    /// Creates a transaction without gas refunds: every gas field is zero and no refund
    /// token or receiver is set.
    pub fn new(to: Address, value: U256, data: Bytes, operation: Operation, nonce: U256) -> Self {
        Self {
            to,
            value,
            data,
            operation,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce,
        }
    }

    pub fn from_meta(meta: SafeMetaTransaction, nonce: U256) -> Self {
        Self::new(meta.to, meta.value, meta.input, Operation::Call, nonce)
    }
}

/// One owner's approval of a specific transaction hash.
///
/// A `None` signature means the owner approved the hash on-chain (`approveHash`) or is the
/// account sending the execution, so no off-chain signature is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub owner: Address,
    #[serde(default)]
    pub signature: Option<Bytes>,
    pub safe_tx_hash: B256,
}

impl Confirmation {
    pub fn signed(owner: Address, signature: Bytes, safe_tx_hash: B256) -> Self {
        Self { owner, signature: Some(signature), safe_tx_hash }
    }

    pub fn pre_approved(owner: Address, safe_tx_hash: B256) -> Self {
        Self { owner, signature: None, safe_tx_hash }
    }
}

/// Calldata ready to be sent to the Safe (or to the multi-send contract for batches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableSafeTransaction {
    pub safe_address: Address,
    pub calldata: Bytes,
}
