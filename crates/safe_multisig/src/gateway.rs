//! Client for the Safe transaction gateway, which records proposals and confirmations so
//! that other owners can pick them up.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    config::SafeConfig,
    error::SafeError,
    transaction_data::{Operation, SafeTransactionData},
};

fn checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeTransactionBody {
    #[serde(serialize_with = "checksummed")]
    pub to: Address,
    #[serde(serialize_with = "decimal")]
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
    #[serde(serialize_with = "decimal")]
    pub nonce: U256,
    #[serde(serialize_with = "decimal")]
    pub safe_tx_gas: U256,
    #[serde(serialize_with = "decimal")]
    pub base_gas: U256,
    #[serde(serialize_with = "decimal")]
    pub gas_price: U256,
    #[serde(serialize_with = "checksummed")]
    pub gas_token: Address,
    #[serde(serialize_with = "checksummed")]
    pub refund_receiver: Address,
    pub safe_tx_hash: B256,
    #[serde(serialize_with = "checksummed")]
    pub sender: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ProposeTransactionBody {
    pub fn new(
        tx: &SafeTransactionData,
        safe_tx_hash: B256,
        sender: Address,
        signature: Option<Bytes>,
        origin: Option<String>,
    ) -> Self {
        Self {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation,
            nonce: tx.nonce,
            safe_tx_gas: tx.safe_tx_gas,
            base_gas: tx.base_gas,
            gas_price: tx.gas_price,
            gas_token: tx.gas_token,
            refund_receiver: tx.refund_receiver,
            safe_tx_hash,
            sender,
            signature,
            origin,
        }
    }
}

/// The gateway's view of a recorded transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub tx_id: String,
    pub tx_status: String,
    #[serde(default)]
    pub tx_hash: Option<B256>,
    #[serde(default)]
    pub executed_at: Option<u64>,
    pub safe_address: Address,
    #[serde(default)]
    pub detailed_execution_info: Option<Value>,
}

/// Persists proposals and confirmations outside of the chain.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Recorder: Send + Sync + 'static {
    async fn propose_transaction(
        &self,
        safe: Address,
        body: ProposeTransactionBody,
    ) -> Result<TransactionDetails, SafeError>;

    async fn confirm_transaction(&self, safe_tx_hash: B256, signature: Bytes) -> Result<(), SafeError>;

    async fn fetch_transaction(&self, tx_id: String) -> Result<TransactionDetails, SafeError>;
}

pub struct SafeClient {
    chain_id: u64,
    gateway_url: String,
    client: reqwest::Client,
}

impl SafeClient {
    pub fn new(config: &SafeConfig) -> Result<Self, SafeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.client.user_agent())
            .build()
            .map_err(SafeError::gateway)?;

        Ok(Self {
            chain_id: config.chain_id,
            gateway_url: config.gateway_url.as_str().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn transactions_url(&self) -> String {
        format!("{}/v1/chains/{}/transactions", self.gateway_url, self.chain_id)
    }

    fn propose_url(&self, safe: Address) -> String {
        format!("{}/{}/propose", self.transactions_url(), safe.to_checksum(None))
    }

    fn confirmations_url(&self, safe_tx_hash: B256) -> String {
        format!("{}/{}/confirmations", self.transactions_url(), safe_tx_hash)
    }

    fn transaction_url(&self, tx_id: &str) -> String {
        format!("{}/{}", self.transactions_url(), tx_id)
    }
}

async fn check_response(response: Response) -> Result<Response, SafeError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(SafeError::gateway(format!("{} - {}", status, text)));
    }

    Ok(response)
}

#[async_trait]
impl Recorder for SafeClient {
    async fn propose_transaction(
        &self,
        safe: Address,
        body: ProposeTransactionBody,
    ) -> Result<TransactionDetails, SafeError> {
        let url = self.propose_url(safe);
        debug!(%url, safe_tx_hash = %body.safe_tx_hash, "Proposing transaction");

        let response = self.client.post(&url).json(&body).send().await.map_err(SafeError::gateway)?;
        let details: TransactionDetails =
            check_response(response).await?.json().await.map_err(SafeError::gateway)?;

        info!(tx_id = %details.tx_id, "Transaction proposed");
        Ok(details)
    }

    async fn confirm_transaction(&self, safe_tx_hash: B256, signature: Bytes) -> Result<(), SafeError> {
        let url = self.confirmations_url(safe_tx_hash);
        debug!(%url, "Confirming transaction");

        let body = json!({ "signedSafeTxHash": signature });
        let response = self.client.post(&url).json(&body).send().await.map_err(SafeError::gateway)?;
        check_response(response).await?;

        info!(%safe_tx_hash, "Confirmation recorded");
        Ok(())
    }

    async fn fetch_transaction(&self, tx_id: String) -> Result<TransactionDetails, SafeError> {
        let url = self.transaction_url(&tx_id);

        let response = self.client.get(&url).send().await.map_err(SafeError::gateway)?;
        check_response(response).await?.json().await.map_err(SafeError::gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientMeta;
    use alloy_primitives::address;

    const SAFE: Address = address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

    fn client() -> SafeClient {
        let meta = ClientMeta::new("Safe CLI", "linux", "Safe CLI v0.1.0", "https://safe.global");
        let config = SafeConfig::for_chain(11155111, meta).unwrap();
        SafeClient::new(&config).unwrap()
    }

    #[test]
    fn endpoint_urls() {
        let client = client();
        let hash = B256::repeat_byte(0xab);

        assert_eq!(
            client.propose_url(SAFE),
            "https://safe-client.safe.global/v1/chains/11155111/transactions/\
             0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed/propose"
        );
        assert_eq!(
            client.confirmations_url(hash),
            format!("https://safe-client.safe.global/v1/chains/11155111/transactions/{hash}/confirmations")
        );
        assert_eq!(
            client.transaction_url("multisig_0x1_0x2"),
            "https://safe-client.safe.global/v1/chains/11155111/transactions/multisig_0x1_0x2"
        );
    }

    #[test]
    fn propose_body_shape() {
        let to = address!("fb6916095ca1df60bb79ce92ce3ea74c37c5d359");
        let mut tx = SafeTransactionData::new(
            to,
            U256::from(10).pow(U256::from(18)),
            Bytes::from_static(&[0xca, 0xfe]),
            Operation::Call,
            U256::from(4),
        );
        tx.safe_tx_gas = U256::from(50_000);

        let body =
            ProposeTransactionBody::new(&tx, B256::repeat_byte(1), SAFE, None, Some("cli".into()));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["to"], "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
        assert_eq!(value["value"], "1000000000000000000");
        assert_eq!(value["data"], "0xcafe");
        assert_eq!(value["operation"], 0);
        assert_eq!(value["nonce"], "4");
        assert_eq!(value["safeTxGas"], "50000");
        assert_eq!(value["gasToken"], "0x0000000000000000000000000000000000000000");
        assert_eq!(value["sender"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(value["origin"], "cli");
        assert!(value.get("signature").is_none());
    }

    #[test]
    fn details_from_gateway_json() {
        let details: TransactionDetails = serde_json::from_value(json!({
            "txId": "multisig_0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed_0x01",
            "txStatus": "AWAITING_CONFIRMATIONS",
            "txHash": null,
            "safeAddress": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "txInfo": { "type": "Custom" }
        }))
        .unwrap();

        assert_eq!(details.tx_status, "AWAITING_CONFIRMATIONS");
        assert_eq!(details.tx_hash, None);
        assert_eq!(details.safe_address, SAFE);
    }
}
