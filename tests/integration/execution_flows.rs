use crate::fixtures::{
    atomic_key, default_stack, fast_cache_config, fast_scheduler_config, key_bytes, script_account, stack, wait_until,
    TransactionRecordBuilder, TEST_FEE_PAYER,
};
use quorum_core::domain::key::Key;
use quorum_core::domain::transaction::{StatusCode, TransactionBody, TransactionStatus};
use quorum_core::foundation::{now_millis, TransactionId};
use quorum_core::infrastructure::config::LimitsConfig;
use quorum_core::infrastructure::storage::TransactionStore;
use std::collections::HashMap;
use std::time::Duration;

fn waiting_update(id: u64) -> HashMap<TransactionId, TransactionStatus> {
    [(TransactionId::new(id), TransactionStatus::WaitingForExecution)].into_iter().collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_flow_collates_submits_and_marks_executed() {
    let stack = default_stack();
    // 2-of-3 governing key; the transaction is over-signed with all three.
    script_account(&stack, TEST_FEE_PAYER, Key::threshold(2, vec![atomic_key(1), atomic_key(2), atomic_key(3)]), false);

    let id = TransactionId::new(50);
    let transaction = TransactionRecordBuilder::default()
        .id(50)
        .status(TransactionStatus::WaitingForSignatures)
        .valid_start_ms(now_millis() + 150)
        .signature(key_bytes(1))
        .signature(key_bytes(2))
        .signature(key_bytes(3))
        .build();
    stack.tx_store.insert_transaction(transaction).expect("insert");

    stack.scheduler.apply_status_updates(waiting_update(50)).await;

    let tx_store = stack.tx_store.clone();
    let done = wait_until(Duration::from_secs(3), || {
        matches!(tx_store.get_transaction(id), Ok(Some(record)) if record.status == TransactionStatus::Executed)
    })
    .await;
    assert!(done, "transaction should reach executed");

    let record = stack.tx_store.get_transaction(id).expect("read").expect("exists");
    assert!(record.executed_at_ms.is_some());

    // The submitted blob carries exactly the reduced 2-signature set.
    let submitted = stack.submitter.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, id);
    let body = TransactionBody::decode(&submitted[0].1).expect("decode submitted");
    assert_eq!(body.signatures.len(), 2);
    // The persisted body was reduced as well.
    assert_eq!(record.body_bytes, submitted[0].1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_submission_marks_the_transaction_failed() {
    let stack = default_stack();
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);
    stack.submitter.fail_all();

    let id = TransactionId::new(51);
    let transaction = TransactionRecordBuilder::default()
        .id(51)
        .valid_start_ms(now_millis() + 100)
        .signature(key_bytes(1))
        .build();
    stack.tx_store.insert_transaction(transaction).expect("insert");

    stack.scheduler.collate_and_execute(id).await.expect("schedule");

    let tx_store = stack.tx_store.clone();
    let done = wait_until(Duration::from_secs(3), || {
        matches!(tx_store.get_transaction(id), Ok(Some(record)) if record.status == TransactionStatus::Failed)
    })
    .await;
    assert!(done, "transaction should reach failed");

    let record = stack.tx_store.get_transaction(id).expect("read").expect("exists");
    assert_eq!(record.status_code, Some(StatusCode::SubmitFailed));
    assert!(record.failed_at_ms.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsatisfiable_thresholds_fail_at_collation_time() {
    let stack = default_stack();
    script_account(&stack, TEST_FEE_PAYER, Key::threshold(2, vec![atomic_key(1), atomic_key(2)]), false);

    let id = TransactionId::new(52);
    let transaction = TransactionRecordBuilder::default()
        .id(52)
        .valid_start_ms(now_millis() + 100)
        .signature(key_bytes(1))
        .build();
    stack.tx_store.insert_transaction(transaction).expect("insert");

    stack.scheduler.collate_and_execute(id).await.expect("schedule");

    let tx_store = stack.tx_store.clone();
    let done = wait_until(Duration::from_secs(3), || {
        matches!(tx_store.get_transaction(id), Ok(Some(record)) if record.status == TransactionStatus::Failed)
    })
    .await;
    assert!(done, "transaction should fail");

    let record = stack.tx_store.get_transaction(id).expect("read").expect("exists");
    assert_eq!(record.status_code, Some(StatusCode::ThresholdUnsatisfiable));
    assert!(stack.submitter.submitted().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversize_transactions_fail_without_submission() {
    let stack = stack(fast_cache_config(), fast_scheduler_config(), LimitsConfig { max_transaction_bytes: 64 });
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let id = TransactionId::new(53);
    let transaction = TransactionRecordBuilder::default()
        .id(53)
        .valid_start_ms(now_millis() + 100)
        .signature(key_bytes(1))
        .build();
    stack.tx_store.insert_transaction(transaction).expect("insert");

    stack.scheduler.collate_and_execute(id).await.expect("schedule");

    let tx_store = stack.tx_store.clone();
    let done = wait_until(Duration::from_secs(3), || {
        matches!(tx_store.get_transaction(id), Ok(Some(record)) if record.status == TransactionStatus::Failed)
    })
    .await;
    assert!(done, "transaction should fail");

    let record = stack.tx_store.get_transaction(id).expect("read").expect("exists");
    assert_eq!(record.status_code, Some(StatusCode::TransactionOversize));
    assert!(stack.submitter.submitted().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn externally_changed_status_cancels_execution_at_fire_time() {
    let stack = default_stack();
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let id = TransactionId::new(54);
    let transaction = TransactionRecordBuilder::default()
        .id(54)
        .valid_start_ms(now_millis() + 150)
        .signature(key_bytes(1))
        .build();
    stack.tx_store.insert_transaction(transaction).expect("insert");

    stack.scheduler.collate_and_execute(id).await.expect("schedule");
    // An external actor executes the transaction out from under the timer.
    stack.tx_store.update_status(id, TransactionStatus::Executed).expect("external update");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(stack.submitter.submitted().is_empty());
}
