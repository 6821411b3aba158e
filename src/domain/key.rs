//! Composite signing keys and signature-set reduction.
//!
//! A `Key` models real-world nested governance: an account may be controlled by
//! a single public key or by an N-of-M threshold whose members are themselves
//! keys of either shape, to arbitrary depth.

use crate::foundation::{KeyBytes, QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Key {
    /// An immutable public-key value, compared by byte identity.
    Atomic(KeyBytes),
    /// Satisfied when at least `required` children are recursively satisfied.
    Threshold { required: usize, children: Vec<Key> },
}

impl Key {
    pub fn atomic(key: impl Into<KeyBytes>) -> Self {
        Self::Atomic(key.into())
    }

    pub fn threshold(required: usize, children: Vec<Key>) -> Self {
        Self::Threshold { required, children }
    }

    /// A key list: every child must be satisfied.
    pub fn all_of(children: Vec<Key>) -> Self {
        let required = children.len();
        Self::Threshold { required, children }
    }

    /// Checks the threshold invariant (`1 <= required <= len(children)`) recursively.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Atomic(_) => Ok(()),
            Self::Threshold { required, children } => {
                if *required == 0 || *required > children.len() {
                    return Err(QuorumError::Message(format!(
                        "threshold invariant violated: required={} children={}",
                        required,
                        children.len()
                    )));
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
        }
    }

    pub fn is_satisfied_by(&self, signers: &BTreeSet<KeyBytes>) -> bool {
        match self {
            Self::Atomic(key) => signers.contains(key),
            Self::Threshold { required, children } => {
                // A zero-required node violates the threshold invariant and is
                // never satisfied, not vacuously satisfied.
                *required > 0 && children.iter().filter(|child| child.is_satisfied_by(signers)).count() >= *required
            }
        }
    }

    /// All leaf public keys reachable from this node, deduplicated.
    pub fn atomic_keys(&self) -> BTreeSet<KeyBytes> {
        let mut out = BTreeSet::new();
        self.collect_atomic_keys(&mut out);
        out
    }

    fn collect_atomic_keys(&self, out: &mut BTreeSet<KeyBytes>) {
        match self {
            Self::Atomic(key) => {
                out.insert(key.clone());
            }
            Self::Threshold { children, .. } => {
                for child in children {
                    child.collect_atomic_keys(out);
                }
            }
        }
    }

    /// Serialized form persisted as a cache row's `encoded_key`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|err| QuorumError::EncodingError(err.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Reduces an oversupply of signatures down to a minimal set that still
/// satisfies every threshold node.
///
/// Returns the selected signer keys, or `None` if some node's satisfied-child
/// count falls below its `required` (the tree cannot be validly reduced).
/// Nodes violating the threshold invariant (`required` of zero, or above the
/// child count) are unsatisfiable rather than vacuously satisfied: an empty
/// requirement tree must never select an empty signature set as valid.
///
/// Selection at each node is deterministic: satisfied children are preferred by
/// fewest leaf signatures first, ties broken by lowest child index. This is
/// pure reduction; it never synthesizes a missing signer.
pub fn reduce(key: &Key, available: &BTreeSet<KeyBytes>) -> Option<BTreeSet<KeyBytes>> {
    match key {
        Key::Atomic(pk) => {
            if available.contains(pk) {
                let mut selected = BTreeSet::new();
                selected.insert(pk.clone());
                Some(selected)
            } else {
                None
            }
        }
        Key::Threshold { required, children } => {
            if *required == 0 || *required > children.len() {
                return None;
            }
            let mut satisfied: Vec<(usize, BTreeSet<KeyBytes>)> = Vec::new();
            for (index, child) in children.iter().enumerate() {
                if let Some(selected) = reduce(child, available) {
                    satisfied.push((index, selected));
                }
            }
            if satisfied.len() < *required {
                return None;
            }
            satisfied.sort_by(|(a_idx, a_set), (b_idx, b_set)| a_set.len().cmp(&b_set.len()).then(a_idx.cmp(b_idx)));
            let mut selected = BTreeSet::new();
            for (_, child_set) in satisfied.into_iter().take(*required) {
                selected.extend(child_set);
            }
            Some(selected)
        }
    }
}
