//! Canonical `SafeTx` hash computation.
//!
//! The hash is the EIP-712 signing hash of the transaction fields under a domain bound to
//! the Safe address. Which fields and which domain are used depends on the Safe version.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use semver::Version;
use serde_json::{json, Map, Value};

use crate::{
    error::SafeError,
    transaction_data::SafeTransactionData,
    utils::get_eip712_tx_types,
};

mod current {
    alloy_sol_types::sol! {
        #[derive(Debug)]
        struct SafeTx {
            address to;
            uint256 value;
            bytes data;
            uint8 operation;
            uint256 safeTxGas;
            uint256 baseGas;
            uint256 gasPrice;
            address gasToken;
            address refundReceiver;
            uint256 nonce;
        }
    }
}

mod legacy {
    alloy_sol_types::sol! {
        #[derive(Debug)]
        struct SafeTx {
            address to;
            uint256 value;
            bytes data;
            uint8 operation;
            uint256 safeTxGas;
            uint256 dataGas;
            uint256 gasPrice;
            address gasToken;
            address refundReceiver;
            uint256 nonce;
        }
    }
}

/// Typed-data layout selected from the Safe version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eip712Schema {
    /// Before v1.0.0: no chain id, `dataGas` instead of `baseGas`.
    Legacy,
    /// v1.0.0 up to v1.3.0: no chain id in the domain.
    WithoutChainId,
    /// v1.3.0 and later.
    Current,
}

impl Eip712Schema {
    pub fn for_version(version: &str) -> Result<Self, SafeError> {
        let version = Version::parse(version.trim())
            .map_err(|e| SafeError::encoding("version", format!("{version:?}: {e}")))?;

        Ok(match (version.major, version.minor) {
            (0, _) => Eip712Schema::Legacy,
            (1, minor) if minor < 3 => Eip712Schema::WithoutChainId,
            _ => Eip712Schema::Current,
        })
    }

    pub fn includes_chain_id(&self) -> bool {
        matches!(self, Eip712Schema::Current)
    }

    pub fn base_gas_field(&self) -> &'static str {
        match self {
            Eip712Schema::Legacy => "dataGas",
            _ => "baseGas",
        }
    }
}

/// Typed data handed to a signer: the digest, and the JSON document for wallets that
/// sign through `eth_signTypedData_v4`.
#[derive(Debug, Clone, PartialEq)]
pub struct SafeTypedData {
    pub hash: B256,
    pub document: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeTxHasher {
    chain_id: u64,
}

impl SafeTxHasher {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn domain(&self, safe: Address, schema: Eip712Schema) -> Eip712Domain {
        let chain_id = schema.includes_chain_id().then(|| U256::from(self.chain_id));
        Eip712Domain::new(None, None, chain_id, Some(safe), None)
    }

    /// Computes the canonical `safeTxHash`. Pure: identical inputs give identical output.
    pub fn hash(
        &self,
        safe: Address,
        version: &str,
        tx: &SafeTransactionData,
    ) -> Result<B256, SafeError> {
        let schema = Eip712Schema::for_version(version)?;
        Ok(self.hash_with_schema(safe, schema, tx))
    }

    pub fn hash_with_schema(
        &self,
        safe: Address,
        schema: Eip712Schema,
        tx: &SafeTransactionData,
    ) -> B256 {
        let domain = self.domain(safe, schema);

        match schema {
            Eip712Schema::Legacy => legacy::SafeTx {
                to: tx.to,
                value: tx.value,
                data: tx.data.clone(),
                operation: tx.operation.into(),
                safeTxGas: tx.safe_tx_gas,
                dataGas: tx.base_gas,
                gasPrice: tx.gas_price,
                gasToken: tx.gas_token,
                refundReceiver: tx.refund_receiver,
                nonce: tx.nonce,
            }
            .eip712_signing_hash(&domain),
            Eip712Schema::WithoutChainId | Eip712Schema::Current => current::SafeTx {
                to: tx.to,
                value: tx.value,
                data: tx.data.clone(),
                operation: tx.operation.into(),
                safeTxGas: tx.safe_tx_gas,
                baseGas: tx.base_gas,
                gasPrice: tx.gas_price,
                gasToken: tx.gas_token,
                refundReceiver: tx.refund_receiver,
                nonce: tx.nonce,
            }
            .eip712_signing_hash(&domain),
        }
    }

    /// Builds the hash together with the typed-data document describing it.
    pub fn typed_data(
        &self,
        safe: Address,
        version: &str,
        tx: &SafeTransactionData,
    ) -> Result<SafeTypedData, SafeError> {
        let schema = Eip712Schema::for_version(version)?;
        let hash = self.hash_with_schema(safe, schema, tx);
        let document = self.typed_data_document(safe, schema, tx);

        Ok(SafeTypedData { hash, document })
    }

    pub fn typed_data_document(
        &self,
        safe: Address,
        schema: Eip712Schema,
        tx: &SafeTransactionData,
    ) -> Value {
        let mut domain = Map::new();
        if schema.includes_chain_id() {
            domain.insert("chainId".to_string(), json!(self.chain_id));
        }
        domain.insert("verifyingContract".to_string(), json!(safe.to_checksum(None)));

        let mut message = Map::new();
        message.insert("to".to_string(), json!(tx.to.to_checksum(None)));
        message.insert("value".to_string(), json!(tx.value.to_string()));
        message.insert("data".to_string(), json!(tx.data.to_string()));
        message.insert("operation".to_string(), json!(u8::from(tx.operation)));
        message.insert("safeTxGas".to_string(), json!(tx.safe_tx_gas.to_string()));
        message.insert(schema.base_gas_field().to_string(), json!(tx.base_gas.to_string()));
        message.insert("gasPrice".to_string(), json!(tx.gas_price.to_string()));
        message.insert("gasToken".to_string(), json!(tx.gas_token.to_checksum(None)));
        message
            .insert("refundReceiver".to_string(), json!(tx.refund_receiver.to_checksum(None)));
        message.insert("nonce".to_string(), json!(tx.nonce.to_string()));

        json!({
            "types": get_eip712_tx_types(schema),
            "domain": domain,
            "primaryType": "SafeTx",
            "message": message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{transaction_data::Operation, utils::encode_type};
    use alloy_primitives::{address, keccak256, Bytes};

    const SAFE: Address = address!("00000000000000000000000000000000000005af");

    fn sample_tx() -> SafeTransactionData {
        SafeTransactionData {
            to: address!("00000000000000000000000000000000000000aa"),
            value: U256::from(1_000_000_000u64),
            data: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]),
            operation: Operation::Call,
            safe_tx_gas: U256::from(21_000),
            base_gas: U256::from(3),
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: U256::from(4),
        }
    }

    fn word(address: Address) -> [u8; 32] {
        B256::left_padding_from(address.as_slice()).0
    }

    /// Independent computation of the signing hash, following EIP-712 step by step.
    fn manual_hash(chain_id: Option<u64>, schema: Eip712Schema, tx: &SafeTransactionData) -> B256 {
        let type_hash = keccak256(encode_type(&get_eip712_tx_types(schema)));

        let mut encoded = type_hash.to_vec();
        encoded.extend_from_slice(&word(tx.to));
        encoded.extend_from_slice(&tx.value.to_be_bytes::<32>());
        encoded.extend_from_slice(keccak256(&tx.data).as_slice());
        encoded.extend_from_slice(&U256::from(u8::from(tx.operation)).to_be_bytes::<32>());
        encoded.extend_from_slice(&tx.safe_tx_gas.to_be_bytes::<32>());
        encoded.extend_from_slice(&tx.base_gas.to_be_bytes::<32>());
        encoded.extend_from_slice(&tx.gas_price.to_be_bytes::<32>());
        encoded.extend_from_slice(&word(tx.gas_token));
        encoded.extend_from_slice(&word(tx.refund_receiver));
        encoded.extend_from_slice(&tx.nonce.to_be_bytes::<32>());
        let struct_hash = keccak256(encoded);

        let mut domain = Vec::new();
        match chain_id {
            Some(chain_id) => {
                domain.extend_from_slice(
                    keccak256("EIP712Domain(uint256 chainId,address verifyingContract)").as_slice(),
                );
                domain.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
            }
            None => domain.extend_from_slice(
                keccak256("EIP712Domain(address verifyingContract)").as_slice(),
            ),
        }
        domain.extend_from_slice(&word(SAFE));
        let domain_separator = keccak256(domain);

        let mut digest = vec![0x19, 0x01];
        digest.extend_from_slice(domain_separator.as_slice());
        digest.extend_from_slice(struct_hash.as_slice());
        keccak256(digest)
    }

    #[test]
    fn schema_follows_version() {
        assert_eq!(Eip712Schema::for_version("0.1.0").unwrap(), Eip712Schema::Legacy);
        assert_eq!(Eip712Schema::for_version("1.1.1").unwrap(), Eip712Schema::WithoutChainId);
        assert_eq!(Eip712Schema::for_version("1.2.0").unwrap(), Eip712Schema::WithoutChainId);
        assert_eq!(Eip712Schema::for_version("1.3.0").unwrap(), Eip712Schema::Current);
        assert_eq!(Eip712Schema::for_version("1.3.0+L2").unwrap(), Eip712Schema::Current);
        assert_eq!(Eip712Schema::for_version("1.4.1").unwrap(), Eip712Schema::Current);
    }

    #[test]
    fn unparsable_version_is_an_encoding_error() {
        let err = SafeTxHasher::new(1).hash(SAFE, "latest", &sample_tx()).unwrap_err();
        assert!(matches!(err, SafeError::Encoding { ref field, .. } if field == "version"));
    }

    #[test]
    fn hash_is_deterministic() {
        let hasher = SafeTxHasher::new(1);
        let tx = sample_tx();

        assert_eq!(hasher.hash(SAFE, "1.3.0", &tx).unwrap(), hasher.hash(SAFE, "1.3.0", &tx).unwrap());
    }

    #[test]
    fn hash_matches_eip712_encoding() {
        let tx = sample_tx();

        assert_eq!(
            SafeTxHasher::new(5).hash(SAFE, "1.3.0", &tx).unwrap(),
            manual_hash(Some(5), Eip712Schema::Current, &tx)
        );
        assert_eq!(
            SafeTxHasher::new(5).hash(SAFE, "1.1.1", &tx).unwrap(),
            manual_hash(None, Eip712Schema::WithoutChainId, &tx)
        );
        assert_eq!(
            SafeTxHasher::new(5).hash(SAFE, "0.1.0", &tx).unwrap(),
            manual_hash(None, Eip712Schema::Legacy, &tx)
        );
    }

    #[test]
    fn chain_id_only_matters_from_v130() {
        let tx = sample_tx();

        assert_ne!(
            SafeTxHasher::new(1).hash(SAFE, "1.3.0", &tx).unwrap(),
            SafeTxHasher::new(2).hash(SAFE, "1.3.0", &tx).unwrap()
        );
        assert_eq!(
            SafeTxHasher::new(1).hash(SAFE, "1.2.0", &tx).unwrap(),
            SafeTxHasher::new(2).hash(SAFE, "1.2.0", &tx).unwrap()
        );
    }

    #[test]
    fn every_field_changes_the_hash() {
        let hasher = SafeTxHasher::new(1);
        let base = hasher.hash(SAFE, "1.3.0", &sample_tx()).unwrap();

        let mut tx = sample_tx();
        tx.nonce = U256::from(5);
        assert_ne!(hasher.hash(SAFE, "1.3.0", &tx).unwrap(), base);

        let mut tx = sample_tx();
        tx.operation = Operation::DelegateCall;
        assert_ne!(hasher.hash(SAFE, "1.3.0", &tx).unwrap(), base);

        let other_safe = address!("00000000000000000000000000000000000005b0");
        assert_ne!(hasher.hash(other_safe, "1.3.0", &sample_tx()).unwrap(), base);
    }

    #[test]
    fn typed_data_document_shape() {
        let typed = SafeTxHasher::new(1).typed_data(SAFE, "1.3.0", &sample_tx()).unwrap();

        assert_eq!(typed.hash, SafeTxHasher::new(1).hash(SAFE, "1.3.0", &sample_tx()).unwrap());
        assert_eq!(typed.document["primaryType"], "SafeTx");
        assert_eq!(typed.document["domain"]["chainId"], 1);
        assert_eq!(typed.document["message"]["nonce"], "4");
        assert_eq!(typed.document["message"]["data"], "0xa9059cbb");
        assert_eq!(typed.document["types"]["SafeTx"].as_array().unwrap().len(), 10);

        let legacy = SafeTxHasher::new(1).typed_data(SAFE, "0.1.0", &sample_tx()).unwrap();
        assert!(legacy.document["domain"].get("chainId").is_none());
        assert_eq!(legacy.document["message"]["dataGas"], "3");
    }
}
