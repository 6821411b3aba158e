#![allow(dead_code)]

use crate::fixtures::constants::TEST_NETWORK;
use quorum_core::application::{Collator, ExecutionScheduler, InfoCacheService, KeyResolver};
use quorum_core::domain::cache::{AccountInfo, NodeInfo};
use quorum_core::domain::key::Key;
use quorum_core::domain::{EntityKind, RemoteInfo};
use quorum_core::foundation::{AccountId, EntityKey, KeyBytes, NetworkName, NodeId};
use quorum_core::infrastructure::config::{CacheConfig, LimitsConfig, SchedulerConfig};
use quorum_core::infrastructure::remote::mock::{MockEvaluator, MockFetcher, MockSubmitter};
use quorum_core::infrastructure::remote::RemoteFetch;
use quorum_core::infrastructure::storage::{MemoryCacheStore, MemoryTransactionStore};
use std::sync::Arc;
use std::time::Duration;

pub fn key_bytes(tag: u8) -> KeyBytes {
    KeyBytes::new(vec![tag; 32])
}

pub fn atomic_key(tag: u8) -> Key {
    Key::atomic(key_bytes(tag))
}

pub fn entity_key(entity_id: &str) -> EntityKey {
    EntityKey::new(NetworkName::from(TEST_NETWORK), entity_id)
}

pub fn account_fetch(account_id: &str, key: Key, receiver_signature_required: bool) -> RemoteFetch {
    RemoteFetch::Modified {
        info: RemoteInfo::Account(AccountInfo {
            account_id: AccountId::from(account_id),
            network: NetworkName::from(TEST_NETWORK),
            key,
            receiver_signature_required,
        }),
        etag: Some(format!("etag-{account_id}")),
    }
}

pub fn node_fetch(node_id: &str, admin_key: Key, node_account_id: Option<&str>) -> RemoteFetch {
    RemoteFetch::Modified {
        info: RemoteInfo::Node(NodeInfo {
            node_id: NodeId::from(node_id),
            network: NetworkName::from(TEST_NETWORK),
            admin_key,
            node_account_id: node_account_id.map(AccountId::from),
        }),
        etag: Some(format!("etag-{node_id}")),
    }
}

/// Claim settings tuned for tests: short polls, few attempts, quick reclaim.
pub fn fast_cache_config() -> CacheConfig {
    CacheConfig { stale_threshold_ms: 60_000, reclaim_after_ms: 200, claim_poll_interval_ms: 5, claim_max_attempts: 3 }
}

/// Scheduler settings tuned for tests: everything fires within a few hundred ms.
pub fn fast_scheduler_config() -> SchedulerConfig {
    SchedulerConfig { execution_window_ms: 2_000, collate_lead_ms: 40, execution_delay_ms: 60 }
}

pub struct Stack {
    pub cache_store: Arc<MemoryCacheStore>,
    pub tx_store: Arc<MemoryTransactionStore>,
    pub fetcher: Arc<MockFetcher>,
    pub submitter: Arc<MockSubmitter>,
    pub evaluator: Arc<MockEvaluator>,
    pub service: Arc<InfoCacheService>,
    pub scheduler: ExecutionScheduler,
}

/// Fully wired in-memory stack: cache service, resolver, collator, scheduler,
/// all against scripted collaborator doubles.
pub fn stack(cache: CacheConfig, scheduler_config: SchedulerConfig, limits: LimitsConfig) -> Stack {
    let cache_store = Arc::new(MemoryCacheStore::new());
    let tx_store = Arc::new(MemoryTransactionStore::new());
    let fetcher = Arc::new(MockFetcher::new());
    let submitter = Arc::new(MockSubmitter::new());
    let evaluator = Arc::new(MockEvaluator::new());

    let service = Arc::new(InfoCacheService::new(cache_store.clone(), fetcher.clone(), &cache));
    let resolver = Arc::new(KeyResolver::new(service.clone()));
    let collator = Arc::new(Collator::new(resolver, &limits));
    let scheduler = ExecutionScheduler::new(tx_store.clone(), collator, submitter.clone(), evaluator.clone(), scheduler_config);

    Stack { cache_store, tx_store, fetcher, submitter, evaluator, service, scheduler }
}

pub fn default_stack() -> Stack {
    stack(fast_cache_config(), fast_scheduler_config(), LimitsConfig::default().with_defaults())
}

/// Polls `condition` until it holds or `deadline` elapses.
pub async fn wait_until<F: Fn() -> bool>(deadline: Duration, condition: F) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn script_account(stack: &Stack, account_id: &str, key: Key, receiver_signature_required: bool) {
    stack.fetcher.script(EntityKind::Account, entity_key(account_id), account_fetch(account_id, key, receiver_signature_required));
}

pub fn script_node(stack: &Stack, node_id: &str, admin_key: Key, node_account_id: Option<&str>) {
    stack.fetcher.script(EntityKind::Node, entity_key(node_id), node_fetch(node_id, admin_key, node_account_id));
}
