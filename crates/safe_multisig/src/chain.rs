use std::{marker::PhantomData, time::Duration};

use alloy_network::ReceiptResponse;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_transport::Transport;
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{
    calls::{get_nonce, get_owners, get_threshold, get_transaction_hash, get_version, is_hash_approved},
    error::SafeError,
    transaction_data::SafeTransactionData,
};

/// On-chain state of a Safe account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeInfo {
    pub address: Address,
    pub owners: Vec<Address>,
    pub threshold: usize,
    pub nonce: U256,
    pub version: String,
}

impl SafeInfo {
    pub fn new(
        address: Address,
        owners: Vec<Address>,
        threshold: usize,
        nonce: U256,
        version: String,
    ) -> Result<Self, SafeError> {
        if threshold == 0 || threshold > owners.len() {
            return Err(SafeError::encoding(
                "threshold",
                format!("threshold {threshold} is invalid for {} owners", owners.len()),
            ));
        }

        Ok(Self { address, owners, threshold, nonce, version })
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, SafeError>;

    async fn nonce(&self, safe: Address) -> Result<U256, SafeError>;

    /// Hash of `safe_tx` as computed by the deployed Safe contract.
    async fn transaction_hash(&self, safe: Address, safe_tx: SafeTransactionData) -> Result<B256, SafeError>;

    /// Those of `owners` that approved `safe_tx_hash` on-chain with `approveHash`.
    async fn approved_owners(
        &self,
        safe: Address,
        safe_tx_hash: B256,
        owners: Vec<Address>,
    ) -> Result<Vec<Address>, SafeError>;

    /// Waits until `tx_hash` is mined. Returns `false` if it reverted.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<bool, SafeError>;
}

/// Checks a locally computed `safe_tx_hash` against the deployed contract and returns the
/// owners that already approved it on-chain.
pub async fn verify_transaction_hash(
    chain: &dyn ChainReader,
    safe: &SafeInfo,
    safe_tx: &SafeTransactionData,
    safe_tx_hash: B256,
) -> Result<Vec<Address>, SafeError> {
    let onchain = chain.transaction_hash(safe.address, safe_tx.clone()).await?;
    if onchain != safe_tx_hash {
        return Err(SafeError::encoding(
            "safeTxHash",
            format!("computed {safe_tx_hash} but Safe {} v{} returns {onchain}", safe.address, safe.version),
        ));
    }

    chain.approved_owners(safe.address, safe_tx_hash, safe.owners.clone()).await
}

/// [`ChainReader`] over any alloy provider.
pub struct RpcChainReader<P, T> {
    provider: P,
    receipt_timeout: Duration,
    poll_interval: Duration,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> RpcChainReader<P, T>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    pub fn new(provider: P, receipt_timeout: Duration, poll_interval: Duration) -> Self {
        Self { provider, receipt_timeout, poll_interval, _transport: PhantomData }
    }

    async fn poll_receipt(&self, tx_hash: B256) -> Result<bool, SafeError> {
        loop {
            let receipt =
                self.provider.get_transaction_receipt(tx_hash).await.map_err(SafeError::chain)?;

            if let Some(receipt) = receipt {
                return Ok(receipt.status());
            }

            trace!(%tx_hash, "Receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl<P, T> ChainReader for RpcChainReader<P, T>
where
    P: Provider<T> + 'static,
    T: Transport + Clone,
{
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, SafeError> {
        let (owners, threshold, nonce, version) = tokio::try_join!(
            get_owners::<P, T>(safe, &self.provider),
            get_threshold::<P, T>(safe, &self.provider),
            get_nonce::<P, T>(safe, &self.provider),
            get_version::<P, T>(safe, &self.provider),
        )?;

        let threshold = usize::try_from(threshold).map_err(SafeError::chain)?;
        debug!(%safe, %version, threshold, %nonce, "Read Safe state");

        SafeInfo::new(safe, owners, threshold, nonce, version)
    }

    async fn nonce(&self, safe: Address) -> Result<U256, SafeError> {
        get_nonce::<P, T>(safe, &self.provider).await
    }

    async fn transaction_hash(&self, safe: Address, safe_tx: SafeTransactionData) -> Result<B256, SafeError> {
        get_transaction_hash::<P, T>(&safe_tx, safe, &self.provider).await
    }

    async fn approved_owners(
        &self,
        safe: Address,
        safe_tx_hash: B256,
        owners: Vec<Address>,
    ) -> Result<Vec<Address>, SafeError> {
        let mut approved = Vec::new();
        for owner in owners {
            if is_hash_approved::<P, T>(owner, safe_tx_hash, safe, &self.provider).await? {
                approved.push(owner);
            }
        }

        debug!(%safe, %safe_tx_hash, approvals = approved.len(), "Read on-chain approvals");
        Ok(approved)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<bool, SafeError> {
        tokio::time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| SafeError::chain(format!("timed out waiting for receipt of {tx_hash}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction_data::Operation;
    use alloy_primitives::Bytes;

    fn transaction() -> SafeTransactionData {
        SafeTransactionData::new(Address::repeat_byte(7), U256::ZERO, Bytes::new(), Operation::Call, U256::from(4))
    }

    fn info() -> SafeInfo {
        let owners = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        SafeInfo::new(Address::repeat_byte(5), owners, 2, U256::from(4), "1.3.0".into()).unwrap()
    }

    #[tokio::test]
    async fn verified_hash_lists_onchain_approvals() {
        let hash = B256::repeat_byte(0x11);

        let mut chain = MockChainReader::new();
        chain
            .expect_transaction_hash()
            .withf(|safe, tx| *safe == Address::repeat_byte(5) && tx.nonce == U256::from(4))
            .returning(move |_, _| Ok(hash));
        chain
            .expect_approved_owners()
            .withf(move |_, approved_hash, owners| *approved_hash == hash && owners.len() == 2)
            .returning(|_, _, _| Ok(vec![Address::repeat_byte(2)]));

        let approved = verify_transaction_hash(&chain, &info(), &transaction(), hash).await.unwrap();
        assert_eq!(approved, vec![Address::repeat_byte(2)]);
    }

    #[tokio::test]
    async fn hash_mismatch_is_reported() {
        let mut chain = MockChainReader::new();
        chain.expect_transaction_hash().returning(|_, _| Ok(B256::repeat_byte(0x22)));
        chain.expect_approved_owners().never();

        let err = verify_transaction_hash(&chain, &info(), &transaction(), B256::repeat_byte(0x11))
            .await
            .unwrap_err();
        assert!(matches!(err, SafeError::Encoding { ref field, .. } if field == "safeTxHash"));
    }

    #[test]
    fn threshold_must_fit_owners() {
        let owners = vec![Address::repeat_byte(1), Address::repeat_byte(2)];

        assert!(SafeInfo::new(Address::ZERO, owners.clone(), 0, U256::ZERO, "1.3.0".into()).is_err());
        assert!(SafeInfo::new(Address::ZERO, owners.clone(), 3, U256::ZERO, "1.3.0".into()).is_err());

        let info = SafeInfo::new(Address::ZERO, owners, 2, U256::ZERO, "1.3.0".into()).unwrap();
        assert!(info.is_owner(&Address::repeat_byte(2)));
        assert!(!info.is_owner(&Address::repeat_byte(3)));
    }
}
