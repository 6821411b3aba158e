//! Collaborator ports consumed by this subsystem. The mirror-source transport,
//! the real network submitter, and the signature-coverage evaluator are
//! implemented elsewhere; only the contracts live here.

pub mod mock;

use crate::domain::transaction::TransactionStatus;
use crate::domain::RemoteInfo;
use crate::domain::EntityKind;
use crate::foundation::{EntityKey, Result, TransactionId};
use async_trait::async_trait;
use std::collections::HashMap;

/// One conditional fetch against the remote metadata source.
#[derive(Clone, Debug)]
pub enum RemoteFetch {
    /// Fresh data, with the etag to present on the next conditional fetch.
    Modified { info: RemoteInfo, etag: Option<String> },
    /// The presented etag still matches; cached data remains valid.
    NotModified { etag: String },
    /// The entity does not exist at the remote source.
    NotFound,
}

#[async_trait]
pub trait RemoteInfoFetcher: Send + Sync {
    async fn fetch(&self, kind: EntityKind, key: &EntityKey, etag: Option<&str>) -> Result<RemoteFetch>;
}

/// Network submission of a collated transaction blob.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, id: TransactionId, body_bytes: &[u8]) -> Result<()>;
}

/// External component deciding, per batch, whether transactions now have
/// sufficient raw signature coverage (or have expired). This subsystem only
/// consumes the returned transition map.
#[async_trait]
pub trait StatusEvaluator: Send + Sync {
    async fn evaluate(&self, ids: &[TransactionId]) -> Result<HashMap<TransactionId, TransactionStatus>>;
}
