//! Scripted doubles for the collaborator ports, used by tests and embedded
//! simulations.

use crate::domain::transaction::TransactionStatus;
use crate::domain::EntityKind;
use crate::foundation::{EntityKey, QuorumError, Result, TransactionId};
use crate::infrastructure::remote::{RemoteFetch, RemoteInfoFetcher, StatusEvaluator, TransactionSubmitter};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Per-key queue of scripted fetch outcomes. Once a key's queue is drained the
/// last outcome repeats; keys with no script resolve to `NotFound`.
pub struct MockFetcher {
    scripts: Mutex<HashMap<(EntityKind, EntityKey), VecDeque<RemoteFetch>>>,
    last: Mutex<HashMap<(EntityKind, EntityKey), RemoteFetch>>,
    fetch_count: AtomicUsize,
    fail_next: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            last: Mutex::new(HashMap::new()),
            fetch_count: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, kind: EntityKind, key: EntityKey, outcome: RemoteFetch) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts.entry((kind, key)).or_default().push_back(outcome);
    }

    /// The next `count` fetches fail with a transient error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteInfoFetcher for MockFetcher {
    async fn fetch(&self, kind: EntityKind, key: &EntityKey, _etag: Option<&str>) -> Result<RemoteFetch> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(QuorumError::RemoteFetchFailed { entity: key.to_string(), details: "scripted failure".to_string() });
        }

        let map_key = (kind, key.clone());
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = scripts.get_mut(&map_key) {
            if let Some(outcome) = queue.pop_front() {
                self.last.lock().unwrap_or_else(|e| e.into_inner()).insert(map_key, outcome.clone());
                return Ok(outcome);
            }
        }
        if let Some(outcome) = self.last.lock().unwrap_or_else(|e| e.into_inner()).get(&map_key) {
            return Ok(outcome.clone());
        }
        Ok(RemoteFetch::NotFound)
    }
}

/// Records submitted blobs; optionally fails every submission.
pub struct MockSubmitter {
    submitted: Mutex<Vec<(TransactionId, Vec<u8>)>>,
    fail_all: std::sync::atomic::AtomicBool,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self { submitted: Mutex::new(Vec::new()), fail_all: std::sync::atomic::AtomicBool::new(false) }
    }

    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<(TransactionId, Vec<u8>)> {
        self.submitted.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn submit(&self, id: TransactionId, body_bytes: &[u8]) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(QuorumError::SubmitFailed(format!("scripted submit failure for {id}")));
        }
        self.submitted.lock().unwrap_or_else(|e| e.into_inner()).push((id, body_bytes.to_vec()));
        Ok(())
    }
}

/// Returns a fixed transition map and records which ids were evaluated.
pub struct MockEvaluator {
    transitions: Mutex<HashMap<TransactionId, TransactionStatus>>,
    evaluated: Mutex<Vec<TransactionId>>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self { transitions: Mutex::new(HashMap::new()), evaluated: Mutex::new(Vec::new()) }
    }

    pub fn set_transition(&self, id: TransactionId, status: TransactionStatus) {
        self.transitions.lock().unwrap_or_else(|e| e.into_inner()).insert(id, status);
    }

    pub fn evaluated(&self) -> Vec<TransactionId> {
        self.evaluated.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusEvaluator for MockEvaluator {
    async fn evaluate(&self, ids: &[TransactionId]) -> Result<HashMap<TransactionId, TransactionStatus>> {
        self.evaluated.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(ids);
        let transitions = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(ids.iter().filter_map(|id| transitions.get(id).map(|status| (*id, *status))).collect())
    }
}
