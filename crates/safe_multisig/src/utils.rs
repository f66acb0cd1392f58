use serde::Serialize;

use crate::hasher::Eip712Schema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EIP712Field {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
}

impl EIP712Field {
    fn new(field_type: &str, name: &str) -> Self {
        Self { field_type: field_type.to_string(), name: name.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EIP712TxTypes {
    #[serde(rename = "EIP712Domain")]
    pub eip712_domain: Vec<EIP712Field>,
    #[serde(rename = "SafeTx")]
    pub safe_tx: Vec<EIP712Field>,
}

/// Message and domain types for the given schema.
///
/// Safes older than v1.3.0 do not include the chain id in their domain, and Safes older
/// than v1.0.0 call the `baseGas` field `dataGas`.
pub fn get_eip712_tx_types(schema: Eip712Schema) -> EIP712TxTypes {
    let eip712_domain = if schema.includes_chain_id() {
        eip712_domain()
    } else {
        eip712_domain_before_v130()
    };

    EIP712TxTypes {
        eip712_domain,
        safe_tx: vec![
            EIP712Field::new("address", "to"),
            EIP712Field::new("uint256", "value"),
            EIP712Field::new("bytes", "data"),
            EIP712Field::new("uint8", "operation"),
            EIP712Field::new("uint256", "safeTxGas"),
            EIP712Field::new("uint256", schema.base_gas_field()),
            EIP712Field::new("uint256", "gasPrice"),
            EIP712Field::new("address", "gasToken"),
            EIP712Field::new("address", "refundReceiver"),
            EIP712Field::new("uint256", "nonce"),
        ],
    }
}

fn eip712_domain_before_v130() -> Vec<EIP712Field> {
    vec![EIP712Field::new("address", "verifyingContract")]
}

fn eip712_domain() -> Vec<EIP712Field> {
    vec![EIP712Field::new("uint256", "chainId"), EIP712Field::new("address", "verifyingContract")]
}

/// Renders the `SafeTx` type as it appears in the EIP-712 type hash.
#[cfg(test)]
pub fn encode_type(types: &EIP712TxTypes) -> String {
    let fields = types
        .safe_tx
        .iter()
        .map(|field| format!("{} {}", field.field_type, field.name))
        .collect::<Vec<_>>()
        .join(",");

    format!("SafeTx({fields})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_schema_types() {
        let types = get_eip712_tx_types(Eip712Schema::Current);

        assert_eq!(types.eip712_domain.len(), 2);
        assert_eq!(types.eip712_domain[0].name, "chainId");
        assert_eq!(
            encode_type(&types),
            "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,\
             uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,\
             uint256 nonce)"
        );
    }

    #[test]
    fn older_schemas_drop_chain_id() {
        let types = get_eip712_tx_types(Eip712Schema::WithoutChainId);
        assert_eq!(types.eip712_domain, vec![EIP712Field::new("address", "verifyingContract")]);
        assert!(encode_type(&types).contains("uint256 baseGas"));

        let legacy = get_eip712_tx_types(Eip712Schema::Legacy);
        assert!(encode_type(&legacy).contains("uint256 dataGas"));
        assert!(!encode_type(&legacy).contains("baseGas"));
    }

    #[test]
    fn serializes_with_typed_data_names() {
        let value = serde_json::to_value(get_eip712_tx_types(Eip712Schema::Current)).unwrap();

        assert_eq!(value["EIP712Domain"][1]["type"], "address");
        assert_eq!(value["SafeTx"][0]["name"], "to");
    }
}
