//! Cached entity rows and the parsed info they decode into.
//!
//! A `CachedRow` is the unit of mutual exclusion for refreshes: at most one
//! live owner holds a non-null `refresh_token` for a natural key at any time.

use crate::domain::key::Key;
use crate::foundation::{AccountId, EntityKey, KeyBytes, NetworkName, NodeId, Result, RowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Node,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => f.write_str("account"),
            Self::Node => f.write_str("node"),
        }
    }
}

/// Entity-specific payload alongside the encoded key.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum EntityExtra {
    Account { receiver_signature_required: bool },
    Node { node_account_id: Option<AccountId> },
}

impl EntityExtra {
    /// The never-fetched default for a freshly inserted row of `kind`.
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Account => Self::Account { receiver_signature_required: false },
            EntityKind::Node => Self::Node { node_account_id: None },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CachedRow {
    pub id: RowId,
    pub kind: EntityKind,
    pub key: EntityKey,
    /// Serialized `Key`, or `None` if never successfully fetched.
    pub encoded_key: Option<Vec<u8>>,
    pub extra: EntityExtra,
    /// Opaque remote freshness token for conditional fetches.
    pub etag: Option<String>,
    /// Non-null while some owner is refreshing this row.
    pub refresh_token: Option<String>,
    /// Last successful write timestamp (epoch millis).
    pub updated_at_ms: u64,
}

impl CachedRow {
    pub fn has_complete_data(&self) -> bool {
        self.encoded_key.is_some()
    }

    pub fn is_fresh(&self, now_ms: u64, stale_threshold_ms: u64) -> bool {
        now_ms.saturating_sub(self.updated_at_ms) < stale_threshold_ms
    }
}

/// Caller-supplied field updates applied together with a claim release.
/// `None` fields keep the row's current value.
#[derive(Clone, Debug, Default)]
pub struct RowUpdate {
    pub encoded_key: Option<Vec<u8>>,
    pub extra: Option<EntityExtra>,
    pub etag: Option<String>,
}

impl RowUpdate {
    /// Release-only update: just clears the claim and refreshes `updated_at`.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Outcome of one refresh attempt. Transient; never persisted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshResult {
    Refreshed,
    NotModified,
    NotFound,
    DataUnchanged,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub network: NetworkName,
    pub key: Key,
    pub receiver_signature_required: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct NodeInfo {
    pub node_id: NodeId,
    pub network: NetworkName,
    pub admin_key: Key,
    pub node_account_id: Option<AccountId>,
}

/// Freshly fetched remote data, shape-tagged by entity kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemoteInfo {
    Account(AccountInfo),
    Node(NodeInfo),
}

impl RemoteInfo {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Account(_) => EntityKind::Account,
            Self::Node(_) => EntityKind::Node,
        }
    }

    pub fn key(&self) -> &Key {
        match self {
            Self::Account(info) => &info.key,
            Self::Node(info) => &info.admin_key,
        }
    }

    pub fn extra(&self) -> EntityExtra {
        match self {
            Self::Account(info) => EntityExtra::Account { receiver_signature_required: info.receiver_signature_required },
            Self::Node(info) => EntityExtra::Node { node_account_id: info.node_account_id.clone() },
        }
    }

    /// The row mutation persisting this fetch result.
    pub fn to_update(&self, etag: Option<String>) -> Result<RowUpdate> {
        Ok(RowUpdate { encoded_key: Some(self.key().encode()?), extra: Some(self.extra()), etag })
    }

    /// Flattened leaf keys for the idempotent derived-key insert.
    pub fn flattened_keys(&self) -> BTreeSet<KeyBytes> {
        self.key().atomic_keys()
    }

    /// Decodes a cached row back into the parsed form. `None` when the row has
    /// never been fetched or its payload does not decode for this kind.
    pub fn parse_row(row: &CachedRow) -> Option<Self> {
        let encoded = row.encoded_key.as_deref()?;
        let key = Key::decode(encoded).ok()?;
        match (&row.extra, row.kind) {
            (EntityExtra::Account { receiver_signature_required }, EntityKind::Account) => Some(Self::Account(AccountInfo {
                account_id: AccountId::from(row.key.entity_id.clone()),
                network: row.key.network.clone(),
                key,
                receiver_signature_required: *receiver_signature_required,
            })),
            (EntityExtra::Node { node_account_id }, EntityKind::Node) => Some(Self::Node(NodeInfo {
                node_id: NodeId::from(row.key.entity_id.clone()),
                network: row.key.network.clone(),
                admin_key: key,
                node_account_id: node_account_id.clone(),
            })),
            _ => None,
        }
    }

    /// Whether this fetch carries meaningfully different data than `row` (used
    /// for refresh telemetry only; never gates whether data is returned).
    pub fn has_data_changed(&self, row: &CachedRow) -> Result<bool> {
        let encoded = self.key().encode()?;
        Ok(row.encoded_key.as_deref() != Some(encoded.as_slice()) || row.extra != self.extra())
    }

    pub fn into_account(self) -> Option<AccountInfo> {
        match self {
            Self::Account(info) => Some(info),
            Self::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<NodeInfo> {
        match self {
            Self::Node(info) => Some(info),
            Self::Account(_) => None,
        }
    }
}
