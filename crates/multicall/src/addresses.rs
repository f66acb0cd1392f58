use alloy_chains::NamedChain;
use alloy_primitives::{address, Address};

use crate::MultiSendError;

/// Canonical `MultiSendCallOnly` v1.3.0 deployment. Same address on every supported chain.
///
/// Unlike `MultiSend` it may be called directly from an EOA, but every entry must use
/// [`OPERATION_CALL`](crate::OPERATION_CALL).
pub const MULTI_SEND_CALL_ONLY_ADDRESS: Address =
    address!("40A2aCCbd92BCA938b02010E17A5b8929b49130D");

const SUPPORTED_CHAINS: [NamedChain; 8] = [
    NamedChain::Mainnet,
    NamedChain::Sepolia,
    NamedChain::Holesky,
    NamedChain::Gnosis,
    NamedChain::Polygon,
    NamedChain::Optimism,
    NamedChain::Arbitrum,
    NamedChain::Base,
];

/// Returns `true` if the canonical multi-send contracts are deployed on `chain_id`.
pub fn is_supported_chain(chain_id: u64) -> bool {
    SUPPORTED_CHAINS.iter().any(|chain| *chain as u64 == chain_id)
}

/// Returns the `MultiSendCallOnly` address for the given chain.
pub fn multi_send_call_only_address(chain_id: u64) -> Result<Address, MultiSendError> {
    if is_supported_chain(chain_id) {
        Ok(MULTI_SEND_CALL_ONLY_ADDRESS)
    } else {
        Err(MultiSendError::UnsupportedChain(chain_id))
    }
}
