//! Validation of raw transaction input.
//!
//! Every field is described once in [`FIELD_SCHEMA`] and the same rules are applied to
//! every form, whether it came from the command line, a JSON file or another client.

use std::{collections::BTreeMap, str::FromStr};

use alloy_primitives::{Address, Bytes, U256};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::SafeError,
    transaction_data::{Operation, SafeTransactionData},
};

/// Raw field values keyed by their typed-data name (`to`, `safeTxGas`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>")]
pub struct TransactionForm(BTreeMap<String, String>);

impl TransactionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl TryFrom<BTreeMap<String, Value>> for TransactionForm {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut form = BTreeMap::new();
        for (field, value) in raw {
            match value {
                Value::Null => {}
                Value::String(value) => {
                    form.insert(field, value);
                }
                Value::Number(value) => {
                    form.insert(field, value.to_string());
                }
                other => return Err(format!("field `{field}` must be a string or number, got {other}")),
            }
        }
        Ok(Self(form))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    Amount(U256),
    Bytes(Bytes),
    Operation(Operation),
}

pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub validate: fn(&str) -> Result<FieldValue, String>,
}

pub const FIELD_SCHEMA: &[FieldRule] = &[
    FieldRule { name: "to", required: true, validate: parse_address },
    FieldRule { name: "operation", required: true, validate: parse_operation },
    FieldRule { name: "value", required: false, validate: parse_amount },
    FieldRule { name: "data", required: false, validate: parse_bytes },
    FieldRule { name: "safeTxGas", required: false, validate: parse_amount },
    FieldRule { name: "baseGas", required: false, validate: parse_amount },
    FieldRule { name: "gasPrice", required: false, validate: parse_amount },
    FieldRule { name: "gasToken", required: false, validate: parse_address },
    FieldRule { name: "refundReceiver", required: false, validate: parse_address },
    FieldRule { name: "nonce", required: false, validate: parse_amount },
];

fn parse_address(raw: &str) -> Result<FieldValue, String> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    let mixed_case = hex.chars().any(|c| c.is_ascii_uppercase()) &&
        hex.chars().any(|c| c.is_ascii_lowercase());

    let address = if mixed_case {
        Address::parse_checksummed(raw, None).map_err(|err| err.to_string())?
    } else {
        Address::from_str(raw).map_err(|err| err.to_string())?
    };

    Ok(FieldValue::Address(address))
}

fn parse_amount(raw: &str) -> Result<FieldValue, String> {
    U256::from_str(raw).map(FieldValue::Amount).map_err(|err| err.to_string())
}

fn parse_bytes(raw: &str) -> Result<FieldValue, String> {
    Bytes::from_str(raw).map(FieldValue::Bytes).map_err(|err| err.to_string())
}

fn parse_operation(raw: &str) -> Result<FieldValue, String> {
    let operation = match raw.to_ascii_uppercase().as_str() {
        "0" | "CALL" => Operation::Call,
        "1" | "DELEGATE_CALL" | "DELEGATECALL" => Operation::DelegateCall,
        other => return Err(format!("unknown operation `{other}`")),
    };

    Ok(FieldValue::Operation(operation))
}

/// A validated transaction whose nonce may still have to come from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: Option<U256>,
}

impl TransactionDraft {
    pub fn into_transaction(self, nonce: U256) -> SafeTransactionData {
        SafeTransactionData {
            to: self.to,
            value: self.value,
            data: self.data,
            operation: self.operation,
            safe_tx_gas: self.safe_tx_gas,
            base_gas: self.base_gas,
            gas_price: self.gas_price,
            gas_token: self.gas_token,
            refund_receiver: self.refund_receiver,
            nonce,
        }
    }
}

struct ValidatedFields(BTreeMap<&'static str, FieldValue>);

impl ValidatedFields {
    fn address(&self, field: &str) -> Option<Address> {
        match self.0.get(field) {
            Some(FieldValue::Address(address)) => Some(*address),
            _ => None,
        }
    }

    fn amount(&self, field: &str) -> Option<U256> {
        match self.0.get(field) {
            Some(FieldValue::Amount(amount)) => Some(*amount),
            _ => None,
        }
    }

    fn bytes(&self, field: &str) -> Option<Bytes> {
        match self.0.get(field) {
            Some(FieldValue::Bytes(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn operation(&self) -> Option<Operation> {
        match self.0.get("operation") {
            Some(FieldValue::Operation(operation)) => Some(*operation),
            _ => None,
        }
    }
}

/// Applies [`FIELD_SCHEMA`] to `form`. The first failing field is reported.
pub fn validate(form: &TransactionForm) -> Result<TransactionDraft, SafeError> {
    let mut fields = BTreeMap::new();

    for rule in FIELD_SCHEMA {
        match form.get(rule.name) {
            Some(raw) => {
                let value = (rule.validate)(raw).map_err(|reason| SafeError::encoding(rule.name, reason))?;
                fields.insert(rule.name, value);
            }
            None if rule.required => return Err(SafeError::encoding(rule.name, "field is required")),
            None => {}
        }
    }

    for field in form.fields() {
        if !FIELD_SCHEMA.iter().any(|rule| rule.name == field) {
            debug!(field, "Ignoring unknown transaction field");
        }
    }

    let fields = ValidatedFields(fields);
    let to = fields.address("to").ok_or_else(|| SafeError::encoding("to", "field is required"))?;
    let operation =
        fields.operation().ok_or_else(|| SafeError::encoding("operation", "field is required"))?;

    Ok(TransactionDraft {
        to,
        value: fields.amount("value").unwrap_or_default(),
        data: fields.bytes("data").unwrap_or_default(),
        operation,
        safe_tx_gas: fields.amount("safeTxGas").unwrap_or_default(),
        base_gas: fields.amount("baseGas").unwrap_or_default(),
        gas_price: fields.amount("gasPrice").unwrap_or_default(),
        gas_token: fields.address("gasToken").unwrap_or_default(),
        refund_receiver: fields.address("refundReceiver").unwrap_or_default(),
        nonce: fields.amount("nonce"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TO: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn field_of(err: SafeError) -> String {
        match err {
            SafeError::Encoding { field, .. } => field,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn minimal_form_gets_defaults() {
        let form = TransactionForm::new().with("to", TO).with("operation", "0");

        let draft = validate(&form).unwrap();
        assert_eq!(draft.to, address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert_eq!(draft.operation, Operation::Call);
        assert_eq!(draft.value, U256::ZERO);
        assert!(draft.data.is_empty());
        assert_eq!(draft.gas_token, Address::ZERO);
        assert_eq!(draft.nonce, None);
    }

    #[test]
    fn missing_required_fields_are_named() {
        let form = TransactionForm::new().with("operation", "0");
        assert_eq!(field_of(validate(&form).unwrap_err()), "to");

        let form = TransactionForm::new().with("to", TO);
        assert_eq!(field_of(validate(&form).unwrap_err()), "operation");

        let form = TransactionForm::new().with("to", "  ").with("operation", "0");
        assert_eq!(field_of(validate(&form).unwrap_err()), "to");
    }

    #[test]
    fn malformed_fields_are_named() {
        let base = TransactionForm::new().with("to", TO).with("operation", "CALL");

        assert_eq!(field_of(validate(&base.clone().with("value", "-1")).unwrap_err()), "value");
        assert_eq!(field_of(validate(&base.clone().with("data", "0xzz")).unwrap_err()), "data");
        assert_eq!(field_of(validate(&base.clone().with("nonce", "abc")).unwrap_err()), "nonce");
        assert_eq!(field_of(validate(&base.with("operation", "2")).unwrap_err()), "operation");
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let form = TransactionForm::new()
            .with("to", "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .with("operation", "0");

        assert_eq!(field_of(validate(&form).unwrap_err()), "to");
    }

    #[test]
    fn full_form_from_json() {
        let form: TransactionForm = serde_json::from_value(serde_json::json!({
            "to": TO,
            "value": 1000,
            "data": "0xdeadbeef",
            "operation": "DELEGATE_CALL",
            "safeTxGas": "21000",
            "nonce": 7,
            "refundReceiver": null,
        }))
        .unwrap();

        let draft = validate(&form).unwrap();
        assert_eq!(draft.value, U256::from(1000));
        assert_eq!(draft.data, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(draft.operation, Operation::DelegateCall);
        assert_eq!(draft.safe_tx_gas, U256::from(21000));
        assert_eq!(draft.refund_receiver, Address::ZERO);

        let tx = draft.into_transaction(U256::from(7));
        assert_eq!(tx.nonce, U256::from(7));
    }

    #[test]
    fn non_scalar_json_values_are_rejected() {
        let result: Result<TransactionForm, _> =
            serde_json::from_value(serde_json::json!({ "to": [1, 2] }));
        assert!(result.is_err());
    }
}
