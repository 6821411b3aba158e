use crate::domain::transaction::{StatusCode, TransactionGroup, TransactionRecord, TransactionStatus};
use crate::domain::{CachedRow, EntityExtra, EntityKind, RowUpdate};
use crate::foundation::{EntityKey, GroupId, KeyBytes, QuorumError, RowId, TransactionId};
use crate::infrastructure::storage::{CacheStore, TransactionStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

struct CacheInner {
    rows: HashMap<(EntityKind, EntityKey), CachedRow>,
    entity_keys: BTreeSet<(RowId, KeyBytes)>,
    links: BTreeSet<(TransactionId, RowId)>,
    next_row_id: u64,
}

pub struct MemoryCacheStore {
    inner: Arc<Mutex<CacheInner>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                rows: HashMap::new(),
                entity_keys: BTreeSet::new(),
                links: BTreeSet::new(),
                next_row_id: 1,
            })),
        }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, CacheInner>, QuorumError> {
        self.inner.lock().map_err(|_| QuorumError::storage("memory cache lock", "poisoned"))
    }

    /// Test/observability helpers over the idempotent side tables.
    pub fn linked_rows(&self, transaction_id: TransactionId) -> Result<Vec<RowId>, QuorumError> {
        Ok(self.lock_inner()?.links.iter().filter(|(tx, _)| *tx == transaction_id).map(|(_, row)| *row).collect())
    }

    pub fn entity_key_count(&self, row_id: RowId) -> Result<usize, QuorumError> {
        Ok(self.lock_inner()?.entity_keys.iter().filter(|(row, _)| *row == row_id).count())
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCacheStore {
    fn claim_row(
        &self,
        kind: EntityKind,
        key: &EntityKey,
        token: &str,
        reclaim_after_ms: u64,
        now_ms: u64,
    ) -> Result<Option<CachedRow>, QuorumError> {
        let mut inner = self.lock_inner()?;
        let map_key = (kind, key.clone());
        if let Some(row) = inner.rows.get_mut(&map_key) {
            let stale = now_ms.saturating_sub(row.updated_at_ms) >= reclaim_after_ms;
            if row.refresh_token.is_none() || stale {
                // Stamping the takeover instant restarts the reclaim window,
                // otherwise an aged row would stay stealable while the new
                // owner is still fetching.
                row.refresh_token = Some(token.to_string());
                row.updated_at_ms = now_ms;
            }
            return Ok(Some(row.clone()));
        }
        let row = CachedRow {
            id: RowId::new(inner.next_row_id),
            kind,
            key: key.clone(),
            encoded_key: None,
            extra: EntityExtra::empty(kind),
            etag: None,
            refresh_token: Some(token.to_string()),
            updated_at_ms: now_ms,
        };
        inner.next_row_id += 1;
        inner.rows.insert(map_key, row.clone());
        Ok(Some(row))
    }

    fn read_row(&self, kind: EntityKind, key: &EntityKey) -> Result<Option<CachedRow>, QuorumError> {
        Ok(self.lock_inner()?.rows.get(&(kind, key.clone())).cloned())
    }

    fn save_and_release(
        &self,
        kind: EntityKind,
        key: &EntityKey,
        token: &str,
        update: RowUpdate,
        now_ms: u64,
    ) -> Result<Option<RowId>, QuorumError> {
        let mut inner = self.lock_inner()?;
        let Some(row) = inner.rows.get_mut(&(kind, key.clone())) else {
            return Ok(None);
        };
        if row.refresh_token.as_deref() != Some(token) {
            return Ok(None);
        }
        row.refresh_token = None;
        row.updated_at_ms = now_ms;
        if let Some(encoded_key) = update.encoded_key {
            row.encoded_key = Some(encoded_key);
        }
        if let Some(extra) = update.extra {
            row.extra = extra;
        }
        if let Some(etag) = update.etag {
            row.etag = Some(etag);
        }
        Ok(Some(row.id))
    }

    fn list_stale_rows(&self, now_ms: u64, stale_threshold_ms: u64) -> Result<Vec<CachedRow>, QuorumError> {
        Ok(self
            .lock_inner()?
            .rows
            .values()
            .filter(|row| !row.is_fresh(now_ms, stale_threshold_ms))
            .cloned()
            .collect())
    }

    fn insert_entity_keys(&self, row_id: RowId, keys: &[KeyBytes]) -> Result<(), QuorumError> {
        let mut inner = self.lock_inner()?;
        for key in keys {
            inner.entity_keys.insert((row_id, key.clone()));
        }
        Ok(())
    }

    fn link_transaction(&self, transaction_id: TransactionId, row_id: RowId) -> Result<(), QuorumError> {
        self.lock_inner()?.links.insert((transaction_id, row_id));
        Ok(())
    }
}

struct TransactionInner {
    transactions: HashMap<TransactionId, TransactionRecord>,
    groups: HashMap<GroupId, TransactionGroup>,
}

pub struct MemoryTransactionStore {
    inner: Arc<Mutex<TransactionInner>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(TransactionInner { transactions: HashMap::new(), groups: HashMap::new() })) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, TransactionInner>, QuorumError> {
        self.inner.lock().map_err(|_| QuorumError::storage("memory transaction lock", "poisoned"))
    }

    pub fn insert_transaction(&self, record: TransactionRecord) -> Result<(), QuorumError> {
        self.lock_inner()?.transactions.insert(record.id, record);
        Ok(())
    }

    pub fn insert_group(&self, group: TransactionGroup) -> Result<(), QuorumError> {
        self.lock_inner()?.groups.insert(group.id, group);
        Ok(())
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get_transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>, QuorumError> {
        Ok(self.lock_inner()?.transactions.get(&id).cloned())
    }

    fn update_status(&self, id: TransactionId, status: TransactionStatus) -> Result<(), QuorumError> {
        let mut inner = self.lock_inner()?;
        let record = inner.transactions.get_mut(&id).ok_or(QuorumError::TransactionNotFound(id.value()))?;
        record.status = status;
        Ok(())
    }

    fn mark_failed(&self, id: TransactionId, code: StatusCode, now_ms: u64) -> Result<(), QuorumError> {
        let mut inner = self.lock_inner()?;
        let record = inner.transactions.get_mut(&id).ok_or(QuorumError::TransactionNotFound(id.value()))?;
        record.status = TransactionStatus::Failed;
        record.status_code = Some(code);
        record.failed_at_ms = Some(now_ms);
        Ok(())
    }

    fn mark_executed(&self, id: TransactionId, now_ms: u64) -> Result<(), QuorumError> {
        let mut inner = self.lock_inner()?;
        let record = inner.transactions.get_mut(&id).ok_or(QuorumError::TransactionNotFound(id.value()))?;
        record.status = TransactionStatus::Executed;
        record.executed_at_ms = Some(now_ms);
        Ok(())
    }

    fn update_body_bytes(&self, id: TransactionId, body_bytes: Vec<u8>) -> Result<(), QuorumError> {
        let mut inner = self.lock_inner()?;
        let record = inner.transactions.get_mut(&id).ok_or(QuorumError::TransactionNotFound(id.value()))?;
        record.body_bytes = body_bytes;
        Ok(())
    }

    fn get_group(&self, id: GroupId) -> Result<Option<TransactionGroup>, QuorumError> {
        Ok(self.lock_inner()?.groups.get(&id).cloned())
    }
}
