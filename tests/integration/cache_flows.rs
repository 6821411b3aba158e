use crate::fixtures::{
    atomic_key, entity_key, fast_scheduler_config, script_account, stack, TransactionRecordBuilder, TEST_FEE_PAYER,
};
use quorum_core::domain::EntityKind;
use quorum_core::foundation::{AccountId, RowId};
use quorum_core::infrastructure::config::{CacheConfig, LimitsConfig};
use quorum_core::infrastructure::remote::RemoteFetch;
use quorum_core::infrastructure::storage::CacheStore;
use std::time::Duration;

fn always_stale_config() -> CacheConfig {
    // Every lookup re-fetches; claim settings stay test-fast.
    CacheConfig { stale_threshold_ms: 1, reclaim_after_ms: 200, claim_poll_interval_ms: 5, claim_max_attempts: 3 }
}

#[tokio::test]
async fn first_lookup_fetches_persists_and_links() {
    let stack = crate::fixtures::default_stack();
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let transaction = TransactionRecordBuilder::default().id(21).build();
    let info = stack
        .service
        .get_account_info_for_transaction(&transaction, &AccountId::from(TEST_FEE_PAYER))
        .await
        .expect("lookup")
        .expect("account resolves");
    assert_eq!(info.key, atomic_key(1));
    assert_eq!(stack.fetcher.fetch_count(), 1);

    let row = stack
        .cache_store
        .read_row(EntityKind::Account, &entity_key(TEST_FEE_PAYER))
        .expect("read")
        .expect("row persisted");
    assert!(row.has_complete_data());
    assert!(row.refresh_token.is_none());
    assert_eq!(row.etag.as_deref(), Some(format!("etag-{TEST_FEE_PAYER}").as_str()));

    // Derived leaf keys and the transaction link are both recorded.
    assert_eq!(stack.cache_store.entity_key_count(row.id).expect("count"), 1);
    assert_eq!(stack.cache_store.linked_rows(transaction.id).expect("links"), vec![row.id]);
}

#[tokio::test]
async fn fresh_rows_are_served_without_any_fetch() {
    let stack = crate::fixtures::default_stack();
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let first = TransactionRecordBuilder::default().id(22).build();
    let second = TransactionRecordBuilder::default().id(23).build();
    let account = AccountId::from(TEST_FEE_PAYER);

    stack.service.get_account_info_for_transaction(&first, &account).await.expect("first").expect("resolves");
    let info = stack.service.get_account_info_for_transaction(&second, &account).await.expect("second").expect("resolves");

    assert_eq!(info.key, atomic_key(1));
    assert_eq!(stack.fetcher.fetch_count(), 1);
    // Each transaction still gets its own link row.
    assert_eq!(stack.cache_store.linked_rows(second.id).expect("links").len(), 1);
}

#[tokio::test]
async fn not_modified_refreshes_the_etag_and_serves_cached_data() {
    let stack = stack(always_stale_config(), fast_scheduler_config(), LimitsConfig::default().with_defaults());
    let key = entity_key(TEST_FEE_PAYER);
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);
    stack.fetcher.script(EntityKind::Account, key.clone(), RemoteFetch::NotModified { etag: "etag-2".to_string() });

    let account = AccountId::from(TEST_FEE_PAYER);
    let first = TransactionRecordBuilder::default().id(24).build();
    stack.service.get_account_info_for_transaction(&first, &account).await.expect("first").expect("resolves");

    // Past the 1ms freshness window the next lookup re-fetches conditionally.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = TransactionRecordBuilder::default().id(25).build();
    let info = stack.service.get_account_info_for_transaction(&second, &account).await.expect("second").expect("resolves");

    assert_eq!(info.key, atomic_key(1));
    assert_eq!(stack.fetcher.fetch_count(), 2);
    let row = stack.cache_store.read_row(EntityKind::Account, &key).expect("read").expect("row");
    assert_eq!(row.etag.as_deref(), Some("etag-2"));
}

#[tokio::test]
async fn fetch_failure_falls_back_to_stale_data() {
    let stack = stack(always_stale_config(), fast_scheduler_config(), LimitsConfig::default().with_defaults());
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let account = AccountId::from(TEST_FEE_PAYER);
    let first = TransactionRecordBuilder::default().id(26).build();
    stack.service.get_account_info_for_transaction(&first, &account).await.expect("first").expect("resolves");

    tokio::time::sleep(Duration::from_millis(5)).await;
    stack.fetcher.fail_next(1);
    let second = TransactionRecordBuilder::default().id(27).build();
    let info = stack
        .service
        .get_account_info_for_transaction(&second, &account)
        .await
        .expect("stale fallback is not an error")
        .expect("stale data still served");
    assert_eq!(info.key, atomic_key(1));

    // The failed refresh released its claim so later refreshes can proceed.
    let row = stack.cache_store.read_row(EntityKind::Account, &entity_key(TEST_FEE_PAYER)).expect("read").expect("row");
    assert!(row.refresh_token.is_none());
}

#[tokio::test]
async fn unknown_entities_resolve_to_none_and_release_the_claim() {
    let stack = crate::fixtures::default_stack();
    // No script: the fetcher reports NotFound.
    let transaction = TransactionRecordBuilder::default().id(28).build();
    let info = stack
        .service
        .get_account_info_for_transaction(&transaction, &AccountId::from("0.0.9999"))
        .await
        .expect("lookup");
    assert!(info.is_none());

    let row = stack.cache_store.read_row(EntityKind::Account, &entity_key("0.0.9999")).expect("read").expect("row");
    assert!(!row.has_complete_data());
    assert!(row.refresh_token.is_none());
    assert_eq!(row.id, RowId::new(1));
}

#[tokio::test]
async fn transactions_without_network_context_resolve_to_none() {
    let stack = crate::fixtures::default_stack();
    let transaction = TransactionRecordBuilder::default().id(29).no_network().build();
    let info = stack
        .service
        .get_account_info_for_transaction(&transaction, &AccountId::from(TEST_FEE_PAYER))
        .await
        .expect("lookup");
    assert!(info.is_none());
    assert_eq!(stack.fetcher.fetch_count(), 0);
}
