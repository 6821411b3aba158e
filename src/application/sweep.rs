//! Periodic background refresh of stale cache rows.

use crate::application::info_cache::InfoCacheService;
use crate::domain::EntityKind;
use crate::foundation::now_millis;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// One pass over every stale row. Claim contention is expected across
/// instances; a row another sweeper grabs first simply reports unchanged.
pub async fn sweep_once(service: &InfoCacheService) -> usize {
    let now = now_millis();
    let stale = match service.store().list_stale_rows(now, service.stale_threshold_ms()) {
        Ok(rows) => rows,
        Err(err) => {
            warn!("stale-row listing failed error={}", err);
            return 0;
        }
    };

    let mut refreshed = 0usize;
    for row in stale {
        let result = match row.kind {
            EntityKind::Account => service.refresh_account(&row.key).await,
            EntityKind::Node => service.refresh_node(&row.key).await,
        };
        match result {
            Ok(true) => refreshed += 1,
            Ok(false) => {}
            Err(err) => warn!("sweep refresh failed kind={} key={} error={}", row.kind, row.key, err),
        }
    }
    refreshed
}

/// Runs `sweep_once` on a fixed interval until the task is aborted.
pub async fn run_refresh_sweep(service: Arc<InfoCacheService>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let refreshed = sweep_once(service.as_ref()).await;
        if refreshed > 0 {
            debug!("refresh sweep completed refreshed={}", refreshed);
        }
    }
}
