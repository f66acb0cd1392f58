//! Executes several fully confirmed Safe transactions atomically through `MultiSendCallOnly`.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use multicall::{encode_multi_send_call, MultiSendTx};
use tracing::{info, warn};

use crate::{
    calls::exec_transaction,
    chain::ChainReader,
    error::SafeError,
    hasher::SafeTxHasher,
    signatures::{collect, SignerExpectation},
    transaction_data::{Confirmation, SafeTransactionData},
    wallet::{CallOptions, CallRequest, WalletProvider},
};

/// A transaction with the confirmations gathered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReadyTransaction {
    pub data: SafeTransactionData,
    pub safe_tx_hash: B256,
    pub confirmations: Vec<Confirmation>,
    pub threshold: usize,
}

impl ExecutionReadyTransaction {
    pub fn new(
        hasher: &SafeTxHasher,
        safe: Address,
        version: &str,
        data: SafeTransactionData,
        confirmations: Vec<Confirmation>,
        threshold: usize,
    ) -> Result<Self, SafeError> {
        let safe_tx_hash = hasher.hash(safe, version, &data)?;
        Ok(Self { data, safe_tx_hash, confirmations, threshold })
    }

    /// Packed signatures, provided at least `threshold` owners confirmed.
    pub fn signatures(&self) -> Result<Bytes, SafeError> {
        let set = collect(self.safe_tx_hash, &self.confirmations, None)?;
        if set.len() < self.threshold {
            return Err(SafeError::InsufficientConfirmations { have: set.len(), need: self.threshold });
        }

        set.pack_checked(SignerExpectation::AtLeastOne)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub multi_send_address: Address,
    pub transactions: Vec<MultiSendTx>,
    /// `multiSend(bytes)` calldata.
    pub calldata: Bytes,
    pub nonces: Vec<U256>,
}

impl EncodedBatch {
    pub fn call_request(&self) -> CallRequest {
        CallRequest::new(self.multi_send_address, self.calldata.clone())
    }
}

/// Encodes every member as an `execTransaction` call on `safe` and wraps them in one
/// `multiSend` call. Any member without enough signatures fails the whole batch.
pub fn build_batch(
    safe: Address,
    multi_send: Address,
    txs: &[ExecutionReadyTransaction],
) -> Result<EncodedBatch, SafeError> {
    if txs.is_empty() {
        return Err(SafeError::encoding("transactions", "batch is empty"));
    }

    let mut transactions = Vec::with_capacity(txs.len());
    for (i, tx) in txs.iter().enumerate() {
        let signatures = tx
            .signatures()
            .map_err(|err| SafeError::encoding(format!("transactions[{i}].signatures"), err))?;

        let executable = exec_transaction(&tx.data, &signatures, safe);
        transactions.push(MultiSendTx::call(safe, U256::ZERO, executable.calldata));
    }

    let calldata = encode_multi_send_call(&transactions)?;

    Ok(EncodedBatch {
        multi_send_address: multi_send,
        transactions,
        calldata,
        nonces: txs.iter().map(|tx| tx.data.nonce).collect(),
    })
}

/// Checks that `nonces` continue the Safe's sequence starting at `onchain`.
pub fn check_consecutive_nonces(nonces: &[U256], onchain: U256) -> Result<(), SafeError> {
    for (index, nonce) in nonces.iter().enumerate() {
        if *nonce != onchain + U256::from(index) {
            return Err(SafeError::BatchNonceGap { index, nonce: *nonce, onchain });
        }
    }

    Ok(())
}

pub struct BatchExecutor {
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletProvider>,
    multi_send: Address,
}

impl BatchExecutor {
    pub fn new(chain: Arc<dyn ChainReader>, wallet: Arc<dyn WalletProvider>, multi_send: Address) -> Self {
        Self { chain, wallet, multi_send }
    }

    /// Builds the batch, checks the nonces against a fresh read and dispatches it.
    pub async fn submit(
        &self,
        safe: Address,
        txs: &[ExecutionReadyTransaction],
        options: CallOptions,
    ) -> Result<B256, SafeError> {
        let batch = build_batch(safe, self.multi_send, txs)?;

        let onchain = self.chain.nonce(safe).await?;
        if let Err(err) = check_consecutive_nonces(&batch.nonces, onchain) {
            warn!(%safe, code = %err.code(), "Batch nonces do not follow the Safe nonce: {err}");
            return Err(err);
        }

        let tx_hash = self.wallet.send_call(batch.call_request().with_options(options)).await?;
        info!(%safe, %tx_hash, size = txs.len(), "Batch dispatched");

        Ok(tx_hash)
    }

    pub async fn await_receipt(&self, tx_hash: B256) -> Result<bool, SafeError> {
        self.chain.wait_for_receipt(tx_hash).await
    }
}
