//! Transaction, group, and status model.
//!
//! The on-wire network transaction format is out of scope; the serialized body
//! here is an opaque bincode blob plus the accessor operations the resolver,
//! collator, and scheduler need.

use crate::domain::key::Key;
use crate::foundation::{AccountId, GroupId, KeyBytes, NetworkName, NodeId, QuorumError, Result, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    New,
    WaitingForSignatures,
    WaitingForExecution,
    Executed,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::Expired)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::WaitingForSignatures => "waiting_for_signatures",
            Self::WaitingForExecution => "waiting_for_execution",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Recorded on a transaction when it reaches `Failed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// The reduced transaction still exceeds the size ceiling.
    TransactionOversize,
    /// The threshold structure cannot be satisfied by the collected signatures.
    ThresholdUnsatisfiable,
    /// Network submission was rejected.
    SubmitFailed,
    /// The execution window closed before the transaction could run.
    WindowExpired,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransactionOversize => "transaction_oversize",
            Self::ThresholdUnsatisfiable => "threshold_unsatisfiable",
            Self::SubmitFailed => "submit_failed",
            Self::WindowExpired => "window_expired",
        };
        f.write_str(name)
    }
}

/// Semantic model of a transaction, reachable only through the accessor layer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct TransactionBody {
    pub fee_payer: AccountId,
    #[serde(default)]
    pub signing_accounts: Vec<AccountId>,
    #[serde(default)]
    pub receiver_accounts: Vec<AccountId>,
    #[serde(default)]
    pub node_id: Option<NodeId>,
    /// Set when the transaction proposes changing a node's account id; both the
    /// old and the new account must then sign.
    #[serde(default)]
    pub new_node_account_id: Option<AccountId>,
    /// Keys introduced by the transaction itself (e.g. for account creation).
    #[serde(default)]
    pub new_keys: Vec<Key>,
    /// Collected signatures keyed by the signing public key.
    #[serde(default)]
    pub signatures: BTreeMap<KeyBytes, Vec<u8>>,
}

impl TransactionBody {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|err| QuorumError::EncodingError(err.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn size_in_bytes(&self) -> Result<usize> {
        Ok(self.encode()?.len())
    }

    pub fn signer_set(&self) -> BTreeSet<KeyBytes> {
        self.signatures.keys().cloned().collect()
    }

    /// Drops every signature whose signer is not in `keep`.
    pub fn retain_signatures(&mut self, keep: &BTreeSet<KeyBytes>) {
        self.signatures.retain(|signer, _| keep.contains(signer));
    }
}

/// Persisted transaction row. Owned by the persistence layer; this subsystem
/// only reads it and updates status, signature bytes, and failure metadata.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub body_bytes: Vec<u8>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub status_code: Option<StatusCode>,
    /// Instant (epoch millis) after which execution is permitted.
    pub valid_start_ms: u64,
    #[serde(default)]
    pub network: Option<NetworkName>,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub executed_at_ms: Option<u64>,
    #[serde(default)]
    pub failed_at_ms: Option<u64>,
}

impl TransactionRecord {
    pub fn body(&self) -> Result<TransactionBody> {
        TransactionBody::decode(&self.body_bytes)
    }
}

/// Ordered list of member transactions scheduled as one unit.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TransactionGroup {
    pub id: GroupId,
    pub members: Vec<TransactionId>,
    /// Members execute one at a time in order.
    #[serde(default)]
    pub sequential: bool,
    /// All-or-nothing batch: no member proceeds unless every member can.
    #[serde(default)]
    pub atomic: bool,
}
