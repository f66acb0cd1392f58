//! Signing and dispatching capability of the account acting on the Safe.

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::{error::SafeError, hasher::SafeTypedData};

/// Overrides for the outer Ethereum transaction. Unset fields are filled by the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub options: CallOptions,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self { to, data, value: U256::ZERO, options: CallOptions::default() }
    }

    pub fn with_options(self, options: CallOptions) -> Self {
        Self { options, ..self }
    }

    fn into_transaction_request(self, from: Address) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_from(from)
            .with_to(self.to)
            .with_input(self.data)
            .with_value(self.value);

        if let Some(gas_limit) = self.options.gas_limit {
            request.set_gas_limit(gas_limit);
        }
        if let Some(max_fee_per_gas) = self.options.max_fee_per_gas {
            request.set_max_fee_per_gas(max_fee_per_gas);
        }
        if let Some(max_priority_fee_per_gas) = self.options.max_priority_fee_per_gas {
            request.set_max_priority_fee_per_gas(max_priority_fee_per_gas);
        }
        if let Some(nonce) = self.options.nonce {
            request.set_nonce(nonce);
        }

        request
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Checks that the wallet is reachable and on the expected chain.
    async fn connect(&self) -> Result<(), SafeError>;

    fn address(&self) -> Address;

    /// Returns the 65-byte `r ‖ s ‖ v` signature over the typed data.
    async fn sign_typed_data(&self, typed_data: SafeTypedData) -> Result<Bytes, SafeError>;

    /// Broadcasts the call and returns its transaction hash.
    async fn send_call(&self, call: CallRequest) -> Result<B256, SafeError>;
}

/// Holds a private key and signs locally.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    rpc_url: Url,
    chain_id: u64,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, rpc_url: Url, chain_id: u64) -> Self {
        Self { signer: signer.with_chain_id(Some(chain_id)), rpc_url, chain_id }
    }

    pub fn from_private_key(private_key: &str, rpc_url: Url, chain_id: u64) -> Result<Self, SafeError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|err| SafeError::encoding("private_key", err))?;

        Ok(Self::new(signer, rpc_url, chain_id))
    }
}

/// An account unlocked on the node, which signs and sends on our behalf.
#[derive(Debug, Clone)]
pub struct UnlockedWallet {
    address: Address,
    rpc_url: Url,
    chain_id: u64,
}

impl UnlockedWallet {
    pub fn new(address: Address, rpc_url: Url, chain_id: u64) -> Self {
        Self { address, rpc_url, chain_id }
    }
}

#[derive(Debug, Clone)]
pub enum Wallet {
    Local(LocalWallet),
    Unlocked(UnlockedWallet),
}

async fn ensure_chain_id(rpc_url: &Url, expected: u64) -> Result<(), SafeError> {
    let provider = ProviderBuilder::new().on_http(rpc_url.clone());
    let chain_id = provider.get_chain_id().await.map_err(SafeError::chain)?;

    if chain_id != expected {
        return Err(SafeError::chain(format!(
            "wallet is connected to chain {chain_id}, expected {expected}"
        )));
    }

    Ok(())
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn connect(&self) -> Result<(), SafeError> {
        ensure_chain_id(&self.rpc_url, self.chain_id).await?;
        debug!(address = %self.signer.address(), "Local wallet connected");
        Ok(())
    }

    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_typed_data(&self, typed_data: SafeTypedData) -> Result<Bytes, SafeError> {
        let signature = self
            .signer
            .sign_hash(&typed_data.hash)
            .await
            .map_err(|err| SafeError::encoding("signature", err))?;

        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn send_call(&self, call: CallRequest) -> Result<B256, SafeError> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(self.rpc_url.clone());

        let request = call.into_transaction_request(self.signer.address());
        let pending = provider.send_transaction(request).await.map_err(SafeError::chain)?;
        let tx_hash = *pending.tx_hash();

        info!(%tx_hash, "Transaction sent");
        Ok(tx_hash)
    }
}

#[async_trait]
impl WalletProvider for UnlockedWallet {
    async fn connect(&self) -> Result<(), SafeError> {
        ensure_chain_id(&self.rpc_url, self.chain_id).await?;

        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let accounts = provider.get_accounts().await.map_err(SafeError::chain)?;
        if !accounts.contains(&self.address) {
            return Err(SafeError::chain(format!("account {} is not unlocked on the node", self.address)));
        }

        debug!(address = %self.address, "Unlocked wallet connected");
        Ok(())
    }

    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, typed_data: SafeTypedData) -> Result<Bytes, SafeError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let signature: Bytes = provider
            .raw_request("eth_signTypedData_v4".into(), (self.address, typed_data.document.to_string()))
            .await
            .map_err(SafeError::chain)?;

        Ok(signature)
    }

    async fn send_call(&self, call: CallRequest) -> Result<B256, SafeError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let request = call.into_transaction_request(self.address);
        let tx_hash: B256 = provider
            .raw_request("eth_sendTransaction".into(), (request,))
            .await
            .map_err(SafeError::chain)?;

        info!(%tx_hash, "Transaction sent");
        Ok(tx_hash)
    }
}

#[async_trait]
impl WalletProvider for Wallet {
    async fn connect(&self) -> Result<(), SafeError> {
        match self {
            Wallet::Local(wallet) => wallet.connect().await,
            Wallet::Unlocked(wallet) => wallet.connect().await,
        }
    }

    fn address(&self) -> Address {
        match self {
            Wallet::Local(wallet) => wallet.address(),
            Wallet::Unlocked(wallet) => wallet.address(),
        }
    }

    async fn sign_typed_data(&self, typed_data: SafeTypedData) -> Result<Bytes, SafeError> {
        match self {
            Wallet::Local(wallet) => wallet.sign_typed_data(typed_data).await,
            Wallet::Unlocked(wallet) => wallet.sign_typed_data(typed_data).await,
        }
    }

    async fn send_call(&self, call: CallRequest) -> Result<B256, SafeError> {
        match self {
            Wallet::Local(wallet) => wallet.send_call(call).await,
            Wallet::Unlocked(wallet) => wallet.send_call(call).await,
        }
    }
}
