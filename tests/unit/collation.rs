use crate::fixtures::{
    atomic_key, fast_cache_config, fast_scheduler_config, key_bytes, script_account, stack, TransactionRecordBuilder,
    TEST_FEE_PAYER,
};
use quorum_core::application::{CollationOutcome, Collator, KeyResolver};
use quorum_core::domain::key::Key;
use quorum_core::domain::transaction::TransactionBody;
use quorum_core::infrastructure::config::LimitsConfig;
use std::sync::Arc;

fn collator_for(stack: &crate::fixtures::Stack, limits: LimitsConfig) -> Collator {
    Collator::new(Arc::new(KeyResolver::new(stack.service.clone())), &limits)
}

#[tokio::test]
async fn surplus_signatures_are_pruned() {
    let stack = crate::fixtures::default_stack();
    // Fee payer governed by 1-of-2; the transaction carries both signatures
    // plus one from a key nobody asked for.
    script_account(&stack, TEST_FEE_PAYER, Key::threshold(1, vec![atomic_key(1), atomic_key(2)]), false);

    let transaction = TransactionRecordBuilder::default()
        .signature(key_bytes(1))
        .signature(key_bytes(2))
        .signature(key_bytes(9))
        .build();

    let collator = collator_for(&stack, LimitsConfig::default().with_defaults());
    let outcome = collator.collate(&transaction).await.expect("collate");

    let CollationOutcome::Collated(reduced) = outcome else {
        panic!("expected collated bytes, got {outcome:?}");
    };
    let body = TransactionBody::decode(&reduced).expect("decode reduced");
    assert_eq!(body.signatures.len(), 1);
    assert!(body.signatures.contains_key(&key_bytes(1)));
}

#[tokio::test]
async fn missing_signatures_are_unsatisfiable() {
    let stack = crate::fixtures::default_stack();
    script_account(&stack, TEST_FEE_PAYER, Key::threshold(2, vec![atomic_key(1), atomic_key(2)]), false);

    let transaction = TransactionRecordBuilder::default().signature(key_bytes(1)).build();
    let collator = collator_for(&stack, LimitsConfig::default().with_defaults());
    assert_eq!(collator.collate(&transaction).await.expect("collate"), CollationOutcome::Unsatisfiable);
}

#[tokio::test]
async fn fully_unresolvable_requirements_never_collate() {
    let stack = crate::fixtures::default_stack();
    // No scripted entities: the fee payer is remotely unknown, so resolution
    // yields an empty requirement tree. That must read as unsatisfiable, not
    // as a transaction that is valid with zero signatures.
    let transaction = TransactionRecordBuilder::default().signature(key_bytes(1)).build();
    let collator = collator_for(&stack, LimitsConfig::default().with_defaults());
    assert_eq!(collator.collate(&transaction).await.expect("collate"), CollationOutcome::Unsatisfiable);
}

#[tokio::test]
async fn reduced_form_exceeding_the_ceiling_is_oversize() {
    let stack = stack(fast_cache_config(), fast_scheduler_config(), LimitsConfig { max_transaction_bytes: 64 });
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let transaction = TransactionRecordBuilder::default().signature(key_bytes(1)).build();
    let collator = collator_for(&stack, LimitsConfig { max_transaction_bytes: 64 });
    assert_eq!(collator.collate(&transaction).await.expect("collate"), CollationOutcome::Oversize);
}

#[tokio::test]
async fn already_minimal_sets_pass_through_unchanged() {
    let stack = crate::fixtures::default_stack();
    script_account(&stack, TEST_FEE_PAYER, atomic_key(1), false);

    let transaction = TransactionRecordBuilder::default().signature(key_bytes(1)).build();
    let collator = collator_for(&stack, LimitsConfig::default().with_defaults());
    let outcome = collator.collate(&transaction).await.expect("collate");

    let CollationOutcome::Collated(reduced) = outcome else {
        panic!("expected collated bytes, got {outcome:?}");
    };
    let body = TransactionBody::decode(&reduced).expect("decode reduced");
    assert_eq!(body.signatures.len(), 1);
    assert_eq!(body, transaction.body().expect("original body"));
}
