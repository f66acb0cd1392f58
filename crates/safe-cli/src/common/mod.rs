use std::{path::Path, sync::Arc, time::Duration};

use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_transport_http::Http;
use clap::Parser;
use safe_multisig::{
    ChainReader, ClientMeta, Confirmation, LocalWallet, Recorder, RpcChainReader, SafeClient,
    SafeConfig, TransactionForm, TransactionSender, UnlockedWallet, Wallet, WalletProvider,
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::utils::load_from_json_file;

#[derive(Debug, Parser, Clone)]
pub struct EthArgs {
    #[arg(long, env = "ETH_RPC_URL", value_name = "URL", help = "The RPC endpoint.")]
    pub rpc_url: Url,

    #[arg(
        long,
        env = "SAFE_PRIVATE_KEY",
        hide_env_values = true,
        conflicts_with = "from",
        value_name = "KEY",
        help = "Private key of the owner signing and sending transactions."
    )]
    pub private_key: Option<String>,

    #[arg(
        long,
        env = "ETH_FROM",
        value_name = "ADDRESS",
        help = "Account unlocked on the node, used instead of a private key."
    )]
    pub from: Option<Address>,

    #[arg(long, env = "SAFE_GATEWAY_URL", value_name = "URL", help = "Override the transaction gateway.")]
    pub gateway_url: Option<Url>,

    #[arg(long, value_name = "ADDRESS", help = "Override the MultiSendCallOnly contract used for batches.")]
    pub multi_send: Option<Address>,

    #[arg(long, value_name = "SECONDS", help = "How long to wait for a transaction to be mined.")]
    pub receipt_timeout: Option<u64>,
}

/// Everything a command needs to talk to the chain and the gateway.
pub struct SafeContext {
    pub config: Arc<SafeConfig>,
    pub chain: Arc<dyn ChainReader>,
}

impl EthArgs {
    pub async fn connect(&self, client: ClientMeta) -> eyre::Result<SafeContext> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let chain_id = provider.get_chain_id().await?;
        debug!(chain_id, rpc_url = %self.rpc_url, "Connected to chain");

        let mut config = SafeConfig::for_chain(chain_id, client)?;
        if let Some(gateway_url) = &self.gateway_url {
            config = config.with_gateway_url(gateway_url.clone());
        }
        if let Some(multi_send) = self.multi_send {
            config = config.with_multi_send_address(multi_send);
        }
        if let Some(seconds) = self.receipt_timeout {
            config = config.with_receipt_timeout(Duration::from_secs(seconds));
        }

        let chain = RpcChainReader::<_, Http<reqwest::Client>>::new(
            provider,
            config.receipt_timeout,
            config.receipt_poll_interval,
        );

        Ok(SafeContext { config: Arc::new(config), chain: Arc::new(chain) })
    }

    pub fn wallet(&self, chain_id: u64) -> eyre::Result<Wallet> {
        match (&self.private_key, self.from) {
            (Some(private_key), _) => Ok(Wallet::Local(LocalWallet::from_private_key(
                private_key,
                self.rpc_url.clone(),
                chain_id,
            )?)),
            (None, Some(from)) => Ok(Wallet::Unlocked(UnlockedWallet::new(from, self.rpc_url.clone(), chain_id))),
            (None, None) => eyre::bail!("A signer is required: pass --private-key or --from"),
        }
    }
}

impl SafeContext {
    pub fn recorder(&self) -> eyre::Result<Arc<dyn Recorder>> {
        Ok(Arc::new(SafeClient::new(&self.config)?))
    }

    /// Connects the wallet and builds a sender for one transaction.
    pub async fn sender(&self, wallet: Wallet) -> eyre::Result<(TransactionSender, Arc<Wallet>)> {
        wallet.connect().await?;
        let wallet = Arc::new(wallet);

        let sender = TransactionSender::new(
            self.chain.clone(),
            wallet.clone(),
            self.recorder()?,
            self.config.clone(),
        );

        Ok((sender, wallet))
    }
}

/// A transaction and the confirmations collected for it so far.
///
/// ```json
/// {
///   "safe": "0x...",
///   "transaction": { "to": "0x...", "value": "0", "data": "0x", "operation": 0 },
///   "confirmations": [{ "owner": "0x...", "signature": "0x...", "safeTxHash": "0x..." }],
///   "origin": "optional provenance"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionFile {
    pub safe: Address,
    pub transaction: TransactionForm,
    #[serde(default)]
    pub confirmations: Vec<Confirmation>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl TransactionFile {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        load_from_json_file(path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub transaction: TransactionForm,
    #[serde(default)]
    pub confirmations: Vec<Confirmation>,
}

/// Several transactions of one Safe, executed in file order.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    pub safe: Address,
    pub transactions: Vec<BatchEntry>,
}

impl BatchFile {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        load_from_json_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(private_key: Option<&str>, from: Option<Address>) -> EthArgs {
        EthArgs {
            rpc_url: Url::parse("http://localhost:8545").unwrap(),
            private_key: private_key.map(str::to_string),
            from,
            gateway_url: None,
            multi_send: None,
            receipt_timeout: None,
        }
    }

    #[test]
    fn wallet_selection() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(matches!(args(Some(key), None).wallet(1).unwrap(), Wallet::Local(_)));

        let from = Address::repeat_byte(1);
        let wallet = args(None, Some(from)).wallet(1).unwrap();
        assert!(matches!(wallet, Wallet::Unlocked(_)));
        assert_eq!(wallet.address(), from);

        assert!(args(None, None).wallet(1).is_err());
    }

    #[test]
    fn loads_transaction_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");
        fs::write(
            &path,
            r#"{
                "safe": "0x00000000000000000000000000000000000005af",
                "transaction": { "to": "0x0000000000000000000000000000000000000077", "operation": 0, "value": "1" },
                "confirmations": [{
                    "owner": "0x000000000000000000000000000000000000000a",
                    "signature": null,
                    "safeTxHash": "0x1111111111111111111111111111111111111111111111111111111111111111"
                }]
            }"#,
        )
        .unwrap();

        let file = TransactionFile::load(&path).unwrap();
        assert_eq!(file.safe, alloy_primitives::address!("00000000000000000000000000000000000005af"));
        assert_eq!(file.transaction.get("value"), Some("1"));
        assert_eq!(file.transaction.get("operation"), Some("0"));
        assert_eq!(file.confirmations.len(), 1);
        assert!(file.confirmations[0].signature.is_none());
        assert!(file.origin.is_none());
    }

    #[test]
    fn loads_batch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(
            &path,
            r#"{
                "safe": "0x00000000000000000000000000000000000005af",
                "transactions": [
                    { "transaction": { "to": "0x0000000000000000000000000000000000000077", "operation": 0, "nonce": 3 } },
                    { "transaction": { "to": "0x0000000000000000000000000000000000000078", "operation": 0, "nonce": 4 } }
                ]
            }"#,
        )
        .unwrap();

        let file = BatchFile::load(&path).unwrap();
        assert_eq!(file.transactions.len(), 2);
        assert_eq!(file.transactions[1].transaction.get("nonce"), Some("4"));
    }
}
