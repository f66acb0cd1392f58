//! Collects owner confirmations and packs them into the `signatures` argument of
//! `execTransaction`.
//!
//! The Safe contract recovers each signer in turn and requires the owners to be strictly
//! ascending, so entries are kept keyed by owner and only serialized in address order.

use std::collections::{btree_map::Entry, BTreeMap};

use alloy_primitives::{Address, Bytes, B256};
use tracing::{debug, warn};

use crate::{error::SafeError, transaction_data::Confirmation};

/// Length of an ECDSA signature in `r ‖ s ‖ v` form.
pub const SIGNATURE_LENGTH: usize = 65;

/// Signature type byte telling the Safe the owner pre-validated the hash.
const PRE_VALIDATED_SIGNATURE_TYPE: u8 = 1;

/// Whether an empty signature blob is acceptable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerExpectation {
    /// Execution path: at least one signer must be present.
    AtLeastOne,
    /// Threshold-1 self execution where the sender approves implicitly.
    AllowEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSignature {
    Signature(Bytes),
    PreValidated,
}

impl OwnerSignature {
    fn encode(&self, owner: Address) -> Bytes {
        match self {
            OwnerSignature::Signature(signature) => signature.clone(),
            OwnerSignature::PreValidated => pre_validated_signature(owner),
        }
    }
}

/// Builds the `r ‖ s ‖ v` entry for an owner whose approval is checked on-chain:
/// `r` is the owner address left-padded to 32 bytes, `s` is zero and `v` is 1.
pub fn pre_validated_signature(owner: Address) -> Bytes {
    let mut signature = Vec::with_capacity(SIGNATURE_LENGTH);
    signature.extend_from_slice(B256::left_padding_from(owner.as_slice()).as_slice());
    signature.extend_from_slice(B256::ZERO.as_slice());
    signature.push(PRE_VALIDATED_SIGNATURE_TYPE);
    signature.into()
}

/// The set of owner approvals for one transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    safe_tx_hash: B256,
    entries: BTreeMap<Address, OwnerSignature>,
}

impl SignatureSet {
    pub fn new(safe_tx_hash: B256) -> Self {
        Self { safe_tx_hash, entries: BTreeMap::new() }
    }

    pub fn safe_tx_hash(&self) -> B256 {
        self.safe_tx_hash
    }

    /// Adds a confirmation.
    ///
    /// Confirmations for another hash are rejected with [`SafeError::StaleHash`] and leave
    /// the set untouched. When an owner is already present the stronger entry is kept: an
    /// explicit signature replaces a pre-validation marker, and between two signatures the
    /// lower byte string wins so the result never depends on arrival order.
    pub fn insert(&mut self, confirmation: &Confirmation) -> Result<(), SafeError> {
        if confirmation.safe_tx_hash != self.safe_tx_hash {
            return Err(SafeError::StaleHash {
                expected: self.safe_tx_hash,
                found: confirmation.safe_tx_hash,
            });
        }

        let signature = match &confirmation.signature {
            Some(signature) if signature.len() != SIGNATURE_LENGTH => {
                return Err(SafeError::encoding(
                    "signature",
                    format!(
                        "expected {SIGNATURE_LENGTH} bytes from {}, got {}",
                        confirmation.owner,
                        signature.len()
                    ),
                ));
            }
            Some(signature) => OwnerSignature::Signature(signature.clone()),
            None => OwnerSignature::PreValidated,
        };

        self.insert_entry(confirmation.owner, signature);
        Ok(())
    }

    /// Adds the pre-validation marker for `owner` unless it already signed.
    pub fn pre_approve(&mut self, owner: Address) {
        self.insert_entry(owner, OwnerSignature::PreValidated);
    }

    fn insert_entry(&mut self, owner: Address, signature: OwnerSignature) {
        match self.entries.entry(owner) {
            Entry::Vacant(entry) => {
                entry.insert(signature);
            }
            Entry::Occupied(mut entry) => {
                let replace = match (entry.get(), &signature) {
                    (OwnerSignature::PreValidated, OwnerSignature::Signature(_)) => true,
                    (OwnerSignature::Signature(current), OwnerSignature::Signature(new)) => {
                        new[..] < current[..]
                    }
                    _ => false,
                };
                if replace {
                    entry.insert(signature);
                } else {
                    debug!(%owner, "Duplicate confirmation ignored");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, owner: &Address) -> bool {
        self.entries.contains_key(owner)
    }

    pub fn owners(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }

    /// Keeps only the entries whose owner satisfies `keep`.
    pub fn retain_owners(&mut self, mut keep: impl FnMut(&Address) -> bool) {
        self.entries.retain(|owner, _| keep(owner));
    }

    /// Concatenates all entries in ascending owner order.
    pub fn pack(&self) -> Bytes {
        let mut packed = Vec::with_capacity(self.entries.len() * SIGNATURE_LENGTH);
        for (owner, signature) in &self.entries {
            packed.extend_from_slice(&signature.encode(*owner));
        }
        packed.into()
    }

    /// Packs the set, enforcing the caller's expectation about empty results.
    pub fn pack_checked(&self, expectation: SignerExpectation) -> Result<Bytes, SafeError> {
        if self.is_empty() && expectation == SignerExpectation::AtLeastOne {
            return Err(SafeError::InsufficientConfirmations { have: 0, need: 1 });
        }
        Ok(self.pack())
    }
}

/// Builds the signature blob for `safe_tx_hash` from confirmations in any order.
///
/// Confirmations for another hash are dropped, so including them gives the same bytes as
/// omitting them. Malformed signatures for the current hash are an error.
pub fn aggregate<'a>(
    safe_tx_hash: B256,
    confirmations: impl IntoIterator<Item = &'a Confirmation>,
    pre_approving_owner: Option<Address>,
    expectation: SignerExpectation,
) -> Result<Bytes, SafeError> {
    let set = collect(safe_tx_hash, confirmations, pre_approving_owner)?;
    set.pack_checked(expectation)
}

/// Builds the [`SignatureSet`] for `safe_tx_hash`, dropping stale confirmations.
pub fn collect<'a>(
    safe_tx_hash: B256,
    confirmations: impl IntoIterator<Item = &'a Confirmation>,
    pre_approving_owner: Option<Address>,
) -> Result<SignatureSet, SafeError> {
    let mut set = SignatureSet::new(safe_tx_hash);

    for confirmation in confirmations {
        match set.insert(confirmation) {
            Ok(()) => {}
            Err(err @ SafeError::StaleHash { .. }) => {
                warn!(owner = %confirmation.owner, code = %err.code(), "Dropping confirmation: {err}");
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(owner) = pre_approving_owner {
        set.pre_approve(owner);
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const A: Address = address!("000000000000000000000000000000000000000a");
    const B: Address = address!("000000000000000000000000000000000000000b");
    const C: Address = address!("00000000000000000000000000000000000000c0");

    fn hash() -> B256 {
        B256::repeat_byte(0x11)
    }

    fn signature(byte: u8) -> Bytes {
        Bytes::from(vec![byte; SIGNATURE_LENGTH])
    }

    fn signed(owner: Address, byte: u8) -> Confirmation {
        Confirmation::signed(owner, signature(byte), hash())
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let c_then_a = [signed(C, 3), signed(A, 1)];
        let a_then_c = [signed(A, 1), signed(C, 3)];

        let first = aggregate(hash(), &c_then_a, None, SignerExpectation::AtLeastOne).unwrap();
        let second = aggregate(hash(), &a_then_c, None, SignerExpectation::AtLeastOne).unwrap();

        assert_eq!(first, second);
        assert_eq!(&first[..SIGNATURE_LENGTH], signature(1).as_ref());
        assert_eq!(&first[SIGNATURE_LENGTH..], signature(3).as_ref());
    }

    #[test]
    fn every_permutation_packs_identically() {
        let confirmations = [signed(B, 2), signed(C, 3), signed(A, 1)];
        let expected =
            aggregate(hash(), &confirmations, None, SignerExpectation::AtLeastOne).unwrap();

        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in permutations {
            let shuffled = order.map(|i| confirmations[i].clone());
            assert_eq!(
                aggregate(hash(), &shuffled, None, SignerExpectation::AtLeastOne).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn stale_confirmations_are_inert() {
        let stale = Confirmation::signed(B, signature(2), B256::repeat_byte(0x22));

        let with_stale =
            aggregate(hash(), &[signed(A, 1), stale], None, SignerExpectation::AtLeastOne)
                .unwrap();
        let without =
            aggregate(hash(), &[signed(A, 1)], None, SignerExpectation::AtLeastOne).unwrap();

        assert_eq!(with_stale, without);
    }

    #[test]
    fn stale_insert_reports_error() {
        let mut set = SignatureSet::new(hash());
        let stale = Confirmation::signed(A, signature(1), B256::ZERO);

        assert!(matches!(set.insert(&stale), Err(SafeError::StaleHash { .. })));
        assert!(set.is_empty());
    }

    #[test]
    fn pre_approving_owner_gets_marker() {
        let blob = aggregate(hash(), &[signed(A, 1)], Some(B), SignerExpectation::AtLeastOne)
            .unwrap();

        assert_eq!(blob.len(), 2 * SIGNATURE_LENGTH);
        let marker = &blob[SIGNATURE_LENGTH..];
        assert_eq!(&marker[12..32], B.as_slice());
        assert!(marker[32..64].iter().all(|byte| *byte == 0));
        assert_eq!(marker[64], 1);
        assert_eq!(marker, pre_validated_signature(B).as_ref());
    }

    #[test]
    fn explicit_signature_beats_marker() {
        let blob = aggregate(hash(), &[signed(B, 2)], Some(B), SignerExpectation::AtLeastOne)
            .unwrap();
        assert_eq!(blob, signature(2));

        let on_chain = Confirmation::pre_approved(B, hash());
        let blob = aggregate(hash(), &[on_chain, signed(B, 2)], None, SignerExpectation::AtLeastOne)
            .unwrap();
        assert_eq!(blob, signature(2));
    }

    #[test]
    fn duplicate_owner_is_deduplicated() {
        let set = collect(hash(), &[signed(A, 5), signed(A, 4)], None).unwrap();
        let reversed = collect(hash(), &[signed(A, 4), signed(A, 5)], None).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.pack(), reversed.pack());
        assert_eq!(set.pack(), signature(4));
    }

    #[test]
    fn empty_set_respects_expectation() {
        let none: [Confirmation; 0] = [];

        assert_eq!(
            aggregate(hash(), &none, None, SignerExpectation::AtLeastOne),
            Err(SafeError::InsufficientConfirmations { have: 0, need: 1 })
        );
        assert_eq!(
            aggregate(hash(), &none, None, SignerExpectation::AllowEmpty).unwrap(),
            Bytes::new()
        );
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let short = Confirmation::signed(A, Bytes::from_static(&[1, 2, 3]), hash());

        assert!(matches!(
            aggregate(hash(), &[short], None, SignerExpectation::AtLeastOne),
            Err(SafeError::Encoding { ref field, .. }) if field == "signature"
        ));
    }
}
