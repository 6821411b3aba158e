//! Key requirement resolution: who must sign a transaction.
//!
//! Walks the transaction's semantic model and asks the cache services for each
//! entity's current governing key, composing the results into one nested
//! threshold tree. Resolution failures are isolated per entity: a missing key
//! for one account never aborts resolution of the others, it only leaves the
//! resulting tree incomplete (best-effort).

use crate::application::info_cache::InfoCacheService;
use crate::domain::key::Key;
use crate::domain::transaction::TransactionRecord;
use crate::foundation::{AccountId, Result};
use log::warn;
use std::sync::Arc;

pub struct KeyResolver {
    cache: Arc<InfoCacheService>,
}

impl KeyResolver {
    pub fn new(cache: Arc<InfoCacheService>) -> Self {
        Self { cache }
    }

    /// Computes the full signature requirement tree for a transaction.
    ///
    /// With `include_all_receivers`, receiver accounts contribute their keys
    /// regardless of their `receiver_signature_required` flag (used by
    /// "show all possible signers" views).
    pub async fn compute_signature_key(&self, transaction: &TransactionRecord, include_all_receivers: bool) -> Result<Key> {
        let body = transaction.body()?;
        let mut children: Vec<Key> = Vec::new();

        self.add_account_key(transaction, &body.fee_payer, &mut children).await;

        for account_id in &body.signing_accounts {
            self.add_account_key(transaction, account_id, &mut children).await;
        }

        for account_id in &body.receiver_accounts {
            match self.cache.get_account_info_for_transaction(transaction, account_id).await {
                Ok(Some(info)) => {
                    if info.receiver_signature_required || include_all_receivers {
                        push_unique(&mut children, info.key);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("receiver key resolution failed tx_id={} account={} error={}", transaction.id, account_id, err);
                }
            }
        }

        if let Some(node_id) = &body.node_id {
            match self.cache.get_node_info_for_transaction(transaction, node_id).await {
                Ok(Some(node)) => {
                    // The node admin key is always required.
                    push_unique(&mut children, node.admin_key);
                    // An account-id change needs both the old and the new
                    // account's keys.
                    if let Some(new_account) = &body.new_node_account_id {
                        if let Some(current) = &node.node_account_id {
                            if current != new_account {
                                self.add_account_key(transaction, current, &mut children).await;
                            }
                        }
                        self.add_account_key(transaction, new_account, &mut children).await;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("node key resolution failed tx_id={} node={} error={}", transaction.id, node_id, err);
                }
            }
        }

        for key in body.new_keys {
            push_unique(&mut children, key);
        }

        Ok(Key::all_of(children))
    }

    async fn add_account_key(&self, transaction: &TransactionRecord, account_id: &AccountId, children: &mut Vec<Key>) {
        match self.cache.get_account_info_for_transaction(transaction, account_id).await {
            Ok(Some(info)) => push_unique(children, info.key),
            Ok(None) => {}
            Err(err) => {
                warn!("account key resolution failed tx_id={} account={} error={}", transaction.id, account_id, err);
            }
        }
    }
}

fn push_unique(children: &mut Vec<Key>, key: Key) {
    if !children.contains(&key) {
        children.push(key);
    }
}
