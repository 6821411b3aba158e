//! Generic claim/lease protocol over keyed cache rows.
//!
//! Multiple process instances share one store, so exclusion is expressed as a
//! tokenized, time-bounded claim on the row rather than an in-memory lock. For
//! one natural key at most one owner holds a non-null `refresh_token`; a claim
//! older than the reclaim window is presumed abandoned and stealable.

use crate::domain::{CachedRow, EntityKind, RowUpdate};
use crate::foundation::{new_claim_token, now_millis, EntityKey, QuorumError, Result, RowId};
use crate::infrastructure::config::CacheConfig;
use crate::infrastructure::storage::CacheStore;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClaimOutcome {
    pub row: CachedRow,
    /// True iff the caller owns the refresh and must release via
    /// `save_and_release` when done.
    pub claimed: bool,
    /// The token the row was claimed with; only meaningful when `claimed`.
    pub token: String,
}

pub struct RefreshCoordinator {
    store: Arc<dyn CacheStore>,
    poll_interval: Duration,
    max_attempts: u32,
    reclaim_after_ms: u64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            poll_interval: Duration::from_millis(config.claim_poll_interval_ms),
            max_attempts: config.claim_max_attempts,
            reclaim_after_ms: config.reclaim_after_ms,
        }
    }

    /// Attempts to become the exclusive refresher for `key`.
    ///
    /// Polls while another owner holds the claim: each retry first checks
    /// read-only whether the row has become unclaimed (fresh data available
    /// without refreshing), then re-attempts the atomic upsert. After the
    /// attempt cap, returns the last observed row unclaimed (best-effort
    /// staleness), or fails if no row was ever observed.
    pub async fn try_claim_refresh(&self, kind: EntityKind, key: &EntityKey) -> Result<ClaimOutcome> {
        let token = new_claim_token();
        let mut last_row: Option<CachedRow> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                // Another owner may have finished while we slept; prefer its
                // result over stealing the claim ourselves.
                if let Some(row) = self.store.read_row(kind, key)? {
                    if row.refresh_token.is_none() {
                        debug!("claim released by other owner kind={} key={} attempt={}", kind, key, attempt);
                        return Ok(ClaimOutcome { row, claimed: false, token });
                    }
                    last_row = Some(row);
                }
            }

            // Re-upsert even when claimed: the row may have been concurrently
            // deleted and recreated since the read above.
            if let Some(row) = self.store.claim_row(kind, key, &token, self.reclaim_after_ms, now_millis())? {
                let claimed = row.refresh_token.as_deref() == Some(token.as_str());
                if claimed {
                    debug!("claim acquired kind={} key={} attempt={}", kind, key, attempt);
                    return Ok(ClaimOutcome { row, claimed: true, token });
                }
                last_row = Some(row);
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        match last_row {
            Some(row) => {
                warn!("claim attempts exhausted, returning last observed row kind={} key={} attempts={}", kind, key, self.max_attempts);
                Ok(ClaimOutcome { row, claimed: false, token })
            }
            None => Err(QuorumError::ClaimExhausted { entity: key.to_string(), attempts: self.max_attempts }),
        }
    }

    /// Conditional write-and-release guarded by the claim token. `None` means
    /// the claim was lost (e.g. reclaimed by a timed-out watchdog) and the
    /// update did not apply.
    pub fn save_and_release(&self, kind: EntityKind, key: &EntityKey, token: &str, update: RowUpdate) -> Result<Option<RowId>> {
        self.store.save_and_release(kind, key, token, update, now_millis())
    }

    /// Best-effort claim release after a failed refresh. A failed release is
    /// logged and left to the reclaim window rather than propagated, so the
    /// original failure stays the primary signal.
    pub fn release_after_failure(&self, kind: EntityKind, key: &EntityKey, token: &str) {
        match self.store.save_and_release(kind, key, token, RowUpdate::none(), now_millis()) {
            Ok(Some(_)) => {}
            Ok(None) => debug!("claim already lost during failure release kind={} key={}", kind, key),
            Err(err) => warn!("claim release failed, reclaim window will recover kind={} key={} error={}", kind, key, err),
        }
    }
}
