use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::{IMultiSendCallOnly, MultiSendError};

/// Operation byte for a plain `CALL` inside a multi-send payload.
pub const OPERATION_CALL: u8 = 0;

/// One entry of a multi-send payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSendTx {
    pub operation: u8,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl MultiSendTx {
    pub fn call(to: Address, value: U256, data: Bytes) -> Self {
        Self { operation: OPERATION_CALL, to, value, data }
    }

    /// Size of this entry once packed: `uint8 ‖ address ‖ uint256 ‖ uint256 ‖ bytes`.
    pub fn packed_len(&self) -> usize {
        1 + 20 + 32 + 32 + self.data.len()
    }

    fn write_packed(&self, out: &mut Vec<u8>) {
        out.push(self.operation);
        out.extend_from_slice(self.to.as_slice());
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(self.data.len()).to_be_bytes::<32>());
        out.extend_from_slice(&self.data);
    }
}

/// Packs the entries in the given order, as expected by `multiSend(bytes)`.
///
/// Entries are neither reordered nor deduplicated. An empty batch is rejected.
pub fn encode_packed(txs: &[MultiSendTx]) -> Result<Bytes, MultiSendError> {
    if txs.is_empty() {
        return Err(MultiSendError::EmptyBatch);
    }

    let mut out = Vec::with_capacity(txs.iter().map(MultiSendTx::packed_len).sum());
    for tx in txs {
        tx.write_packed(&mut out);
    }

    Ok(out.into())
}

/// Returns the full `multiSend(bytes)` calldata for the given entries.
pub fn encode_multi_send_call(txs: &[MultiSendTx]) -> Result<Bytes, MultiSendError> {
    let transactions = encode_packed(txs)?;
    let call = IMultiSendCallOnly::multiSendCall { transactions };

    Ok(call.abi_encode().into())
}
