use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use alloy_transport::Transport;

use crate::{
    contracts::safe::Safe,
    error::SafeError,
    transaction_data::{ExecutableSafeTransaction, SafeTransactionData},
};

/// Encodes `execTransaction` with the given packed signatures.
pub fn exec_transaction(
    safe_tx: &SafeTransactionData,
    signatures: &[u8],
    safe: Address,
) -> ExecutableSafeTransaction {
    let call = Safe::execTransactionCall::new((
        safe_tx.to,
        safe_tx.value,
        safe_tx.data.clone(),
        safe_tx.operation.into(),
        safe_tx.safe_tx_gas,
        safe_tx.base_gas,
        safe_tx.gas_price,
        safe_tx.gas_token,
        safe_tx.refund_receiver,
        Bytes::copy_from_slice(signatures),
    ));

    ExecutableSafeTransaction { safe_address: safe, calldata: call.abi_encode().into() }
}

/// Encodes `approveHash`, which records the sender's approval of `safe_tx_hash` on-chain.
pub fn approve_hash(safe_tx_hash: B256, safe: Address) -> ExecutableSafeTransaction {
    let call = Safe::approveHashCall::new((safe_tx_hash,));

    ExecutableSafeTransaction { safe_address: safe, calldata: call.abi_encode().into() }
}

pub async fn get_nonce<P, T>(safe: Address, provider: &P) -> Result<U256, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::nonceCall::new(());

    let Safe::nonceReturn { _0: nonce } = call_and_decode(call, safe, provider).await?;

    Ok(nonce)
}

pub async fn get_owners<P, T>(safe: Address, provider: &P) -> Result<Vec<Address>, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::getOwnersCall::new(());

    let Safe::getOwnersReturn { _0: owners } = call_and_decode(call, safe, provider).await?;

    Ok(owners)
}

pub async fn get_threshold<P, T>(safe: Address, provider: &P) -> Result<U256, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::getThresholdCall::new(());

    let Safe::getThresholdReturn { _0: threshold } = call_and_decode(call, safe, provider).await?;

    Ok(threshold)
}

/// Asks the Safe contract itself for the hash of `safe_tx`.
///
/// Useful to cross-check the locally computed hash against the deployed contract version.
pub async fn get_transaction_hash<P, T>(
    safe_tx: &SafeTransactionData,
    safe: Address,
    provider: &P,
) -> Result<B256, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::getTransactionHashCall::new((
        safe_tx.to,
        safe_tx.value,
        safe_tx.data.clone(),
        safe_tx.operation.into(),
        safe_tx.safe_tx_gas,
        safe_tx.base_gas,
        safe_tx.gas_price,
        safe_tx.gas_token,
        safe_tx.refund_receiver,
        safe_tx.nonce,
    ));

    let Safe::getTransactionHashReturn { _0: tx_hash } =
        call_and_decode(call, safe, provider).await?;

    Ok(tx_hash)
}

pub async fn get_version<P, T>(safe: Address, provider: &P) -> Result<String, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::VERSIONCall::new(());

    let Safe::VERSIONReturn { _0: version } = call_and_decode(call, safe, provider).await?;

    Ok(version)
}

/// Returns `true` if `owner` called `approveHash(safe_tx_hash)` on the Safe.
pub async fn is_hash_approved<P, T>(
    owner: Address,
    safe_tx_hash: B256,
    safe: Address,
    provider: &P,
) -> Result<bool, SafeError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let call = Safe::approvedHashesCall::new((owner, safe_tx_hash));

    let Safe::approvedHashesReturn { _0: approved } =
        call_and_decode(call, safe, provider).await?;

    Ok(!approved.is_zero())
}

/// Private function to make a contract call and decode the response
async fn call_and_decode<C, P, T>(call: C, to: Address, provider: &P) -> Result<C::Return, SafeError>
where
    C: SolCall,
    P: Provider<T>,
    T: Transport + Clone,
{
    let call_data: Vec<u8> = call.abi_encode();

    let mut req = TransactionRequest::default().to(to);
    req.set_input(call_data);

    let data = provider.call(&req).await.map_err(SafeError::chain)?;
    let data = C::abi_decode_returns(data.as_ref(), true).map_err(SafeError::chain)?;

    Ok(data)
}
