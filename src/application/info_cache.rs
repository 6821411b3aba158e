//! Read-through cache services for account and node key metadata.
//!
//! Two parallel shapes (account, node) share one coordination pattern: serve
//! fresh cached rows without any network call, otherwise contend for the
//! refresh claim and either perform the conditional fetch or fall back to
//! whatever data the current owner leaves behind.

use crate::domain::cache::{AccountInfo, NodeInfo, RefreshResult, RemoteInfo};
use crate::domain::transaction::TransactionRecord;
use crate::domain::{EntityKind, RowUpdate};
use crate::foundation::{now_millis, AccountId, EntityKey, KeyBytes, NodeId, QuorumError, Result};
use crate::infrastructure::cache::{ClaimOutcome, RefreshCoordinator};
use crate::infrastructure::config::CacheConfig;
use crate::infrastructure::remote::{RemoteFetch, RemoteInfoFetcher};
use crate::infrastructure::storage::CacheStore;
use log::{debug, info, warn};
use std::sync::Arc;

pub struct InfoCacheService {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn RemoteInfoFetcher>,
    coordinator: RefreshCoordinator,
    stale_threshold_ms: u64,
}

impl InfoCacheService {
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn RemoteInfoFetcher>, config: &CacheConfig) -> Self {
        let coordinator = RefreshCoordinator::new(store.clone(), config);
        Self { store, fetcher, coordinator, stale_threshold_ms: config.stale_threshold_ms }
    }

    pub async fn get_account_info_for_transaction(
        &self,
        transaction: &TransactionRecord,
        account_id: &AccountId,
    ) -> Result<Option<AccountInfo>> {
        let info = self.get_info_for_transaction(EntityKind::Account, transaction, account_id.as_str()).await?;
        Ok(info.and_then(RemoteInfo::into_account))
    }

    pub async fn get_node_info_for_transaction(
        &self,
        transaction: &TransactionRecord,
        node_id: &NodeId,
    ) -> Result<Option<NodeInfo>> {
        let info = self.get_info_for_transaction(EntityKind::Node, transaction, node_id.as_str()).await?;
        Ok(info.and_then(RemoteInfo::into_node))
    }

    /// Background-sweep refresh, not tied to a transaction. Returns whether the
    /// row's meaningful data actually changed.
    pub async fn refresh_account(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.refresh(EntityKind::Account, key).await? == RefreshResult::Refreshed)
    }

    pub async fn refresh_node(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.refresh(EntityKind::Node, key).await? == RefreshResult::Refreshed)
    }

    async fn get_info_for_transaction(
        &self,
        kind: EntityKind,
        transaction: &TransactionRecord,
        entity_id: &str,
    ) -> Result<Option<RemoteInfo>> {
        let Some(network) = transaction.network.clone() else {
            // No network context means nothing to resolve against.
            return Ok(None);
        };
        let key = EntityKey::new(network, entity_id);
        key.validate()?;
        let now = now_millis();

        if let Some(row) = self.store.read_row(kind, &key)? {
            if row.has_complete_data() && row.is_fresh(now, self.stale_threshold_ms) {
                self.store.link_transaction(transaction.id, row.id)?;
                return Ok(RemoteInfo::parse_row(&row));
            }
        }

        let outcome = self.coordinator.try_claim_refresh(kind, &key).await?;
        if !outcome.claimed {
            // Another owner is (or was) refreshing; use whatever exists.
            self.store.link_transaction(transaction.id, outcome.row.id)?;
            return Ok(RemoteInfo::parse_row(&outcome.row));
        }

        match self.refresh_owned(kind, &key, &outcome).await {
            Ok((_, parsed)) => {
                self.store.link_transaction(transaction.id, outcome.row.id)?;
                Ok(parsed)
            }
            Err(err @ QuorumError::RemoteFetchFailed { .. }) => {
                // Transient: claim was released best-effort; serve stale-or-absent.
                warn!("serving stale-or-absent data after fetch failure kind={} key={} error={}", kind, key, err);
                self.store.link_transaction(transaction.id, outcome.row.id)?;
                Ok(RemoteInfo::parse_row(&outcome.row))
            }
            Err(err) => Err(err),
        }
    }

    async fn refresh(&self, kind: EntityKind, key: &EntityKey) -> Result<RefreshResult> {
        key.validate()?;
        let outcome = self.coordinator.try_claim_refresh(kind, key).await?;
        if !outcome.claimed {
            return Ok(RefreshResult::NotModified);
        }
        let (result, _) = self.refresh_owned(kind, key, &outcome).await?;
        Ok(result)
    }

    /// Performs an owned refresh: conditional fetch, persist, release. The
    /// claim is always released, best-effort even on fetch failure.
    async fn refresh_owned(
        &self,
        kind: EntityKind,
        key: &EntityKey,
        outcome: &ClaimOutcome,
    ) -> Result<(RefreshResult, Option<RemoteInfo>)> {
        let row = &outcome.row;
        let token = outcome.token.as_str();

        let fetched = match self.fetcher.fetch(kind, key, row.etag.as_deref()).await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.coordinator.release_after_failure(kind, key, token);
                return Err(err);
            }
        };

        match fetched {
            RemoteFetch::NotModified { etag } => {
                let update = RowUpdate { etag: Some(etag), ..Default::default() };
                if self.coordinator.save_and_release(kind, key, token, update)?.is_none() {
                    debug!("claim lost before not-modified release kind={} key={}", kind, key);
                }
                Ok((RefreshResult::NotModified, RemoteInfo::parse_row(row)))
            }
            RemoteFetch::NotFound => {
                if self.coordinator.save_and_release(kind, key, token, RowUpdate::none())?.is_none() {
                    debug!("claim lost before not-found release kind={} key={}", kind, key);
                }
                Ok((RefreshResult::NotFound, None))
            }
            RemoteFetch::Modified { info, etag } => {
                if info.kind() != kind {
                    self.coordinator.release_after_failure(kind, key, token);
                    return Err(QuorumError::RemoteFetchFailed {
                        entity: key.to_string(),
                        details: format!("remote returned {} data for a {} fetch", info.kind(), kind),
                    });
                }
                let changed = info.has_data_changed(row)?;
                let update = info.to_update(etag)?;
                match self.coordinator.save_and_release(kind, key, token, update)? {
                    Some(row_id) => {
                        let keys: Vec<KeyBytes> = info.flattened_keys().into_iter().collect();
                        self.store.insert_entity_keys(row_id, &keys)?;
                    }
                    None => debug!("claim lost before modified release kind={} key={}", kind, key),
                }
                let result = if changed {
                    RefreshResult::Refreshed
                } else {
                    info!("refresh fetched identical data kind={} key={} changed=false", kind, key);
                    RefreshResult::DataUnchanged
                };
                Ok((result, Some(info)))
            }
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub(crate) fn stale_threshold_ms(&self) -> u64 {
        self.stale_threshold_ms
    }
}
