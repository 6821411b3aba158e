//! Narrow persistence ports: claim, release, read, link, insert-keys on the
//! cache side; transaction/group reads and status writes on the scheduler side.
//!
//! Implemented once for the real store (external concern) and once in-memory
//! for tests and embedded use.

use crate::domain::transaction::{StatusCode, TransactionGroup, TransactionRecord, TransactionStatus};
use crate::domain::{CachedRow, EntityKind, RowUpdate};
use crate::foundation::{EntityKey, KeyBytes, QuorumError, RowId, TransactionId};

pub type Result<T> = std::result::Result<T, QuorumError>;

pub trait CacheStore: Send + Sync {
    /// Atomic claim upsert. Inserts a fresh row carrying `token` if no row
    /// exists for the natural key; otherwise steals the claim only if the row
    /// is unclaimed or its claim is older than `reclaim_after_ms`. Whenever
    /// the claim is taken, `updated_at_ms` is stamped with `now_ms` so the
    /// new owner's reclaim window starts from the takeover, keeping the claim
    /// exclusive for its full lease. Returns the current row regardless of
    /// claim outcome; `None` only when the row was concurrently deleted
    /// between the upsert and the read-back.
    fn claim_row(
        &self,
        kind: EntityKind,
        key: &EntityKey,
        token: &str,
        reclaim_after_ms: u64,
        now_ms: u64,
    ) -> Result<Option<CachedRow>>;

    fn read_row(&self, kind: EntityKind, key: &EntityKey) -> Result<Option<CachedRow>>;

    /// Conditional release: matches both the natural key and `token`, clears
    /// the claim, stamps `updated_at`, applies `update`. Returns the row id on
    /// success, or `None` if the claim was lost in the interim.
    fn save_and_release(
        &self,
        kind: EntityKind,
        key: &EntityKey,
        token: &str,
        update: RowUpdate,
        now_ms: u64,
    ) -> Result<Option<RowId>>;

    /// Rows whose last successful write is older than the staleness window,
    /// for background sweeps.
    fn list_stale_rows(&self, now_ms: u64, stale_threshold_ms: u64) -> Result<Vec<CachedRow>>;

    /// Conflict-ignoring insert of derived leaf-key records for a resolved
    /// entity. Duplicates are expected and harmless.
    fn insert_entity_keys(&self, row_id: RowId, keys: &[KeyBytes]) -> Result<()>;

    /// Conflict-ignoring insert of a link row associating a transaction with a
    /// cached entity row.
    fn link_transaction(&self, transaction_id: TransactionId, row_id: RowId) -> Result<()>;
}

pub trait TransactionStore: Send + Sync {
    fn get_transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>>;

    fn update_status(&self, id: TransactionId, status: TransactionStatus) -> Result<()>;

    /// Terminal failure: sets status `Failed`, records `code` and the failure timestamp.
    fn mark_failed(&self, id: TransactionId, code: StatusCode, now_ms: u64) -> Result<()>;

    fn mark_executed(&self, id: TransactionId, now_ms: u64) -> Result<()>;

    /// Replaces the serialized body (used after signature reduction).
    fn update_body_bytes(&self, id: TransactionId, body_bytes: Vec<u8>) -> Result<()>;

    fn get_group(&self, id: crate::foundation::GroupId) -> Result<Option<TransactionGroup>>;
}
