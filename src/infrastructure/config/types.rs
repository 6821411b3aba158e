use crate::foundation::constants::{
    CLAIM_MAX_ATTEMPTS, CLAIM_POLL_INTERVAL_MS, COLLATE_LEAD_MS, DEFAULT_RECLAIM_AFTER_MS, DEFAULT_STALE_THRESHOLD_MS,
    EXECUTION_DELAY_MS, EXECUTION_WINDOW_MS, MAX_TRANSACTION_BYTES,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Optional directory for log files; console-only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Log filter expression (e.g. `"info"` or `"quorum_core=debug"`).
    #[serde(default)]
    pub log_filters: Option<String>,
}

/// Cache refresh coordination settings. Zero values are replaced with compiled
/// defaults during loader postprocessing.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window: rows younger than this are served without any fetch.
    #[serde(default)]
    pub stale_threshold_ms: u64,
    /// Age after which an unreleased claim is presumed abandoned and stealable.
    #[serde(default)]
    pub reclaim_after_ms: u64,
    /// Fixed delay between claim attempts while another owner refreshes.
    #[serde(default)]
    pub claim_poll_interval_ms: u64,
    /// Hard cap on claim attempts.
    #[serde(default)]
    pub claim_max_attempts: u32,
}

impl CacheConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.stale_threshold_ms == 0 {
            self.stale_threshold_ms = DEFAULT_STALE_THRESHOLD_MS;
        }
        if self.reclaim_after_ms == 0 {
            self.reclaim_after_ms = DEFAULT_RECLAIM_AFTER_MS;
        }
        if self.claim_poll_interval_ms == 0 {
            self.claim_poll_interval_ms = CLAIM_POLL_INTERVAL_MS;
        }
        if self.claim_max_attempts == 0 {
            self.claim_max_attempts = CLAIM_MAX_ATTEMPTS;
        }
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Execution permitted from `valid_start` for this long.
    #[serde(default)]
    pub execution_window_ms: u64,
    /// Collation fires this long before the execution deadline.
    #[serde(default)]
    pub collate_lead_ms: u64,
    /// The execution timer fires this long after `valid_start`.
    #[serde(default)]
    pub execution_delay_ms: u64,
}

impl SchedulerConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.execution_window_ms == 0 {
            self.execution_window_ms = EXECUTION_WINDOW_MS;
        }
        if self.collate_lead_ms == 0 {
            self.collate_lead_ms = COLLATE_LEAD_MS;
        }
        if self.execution_delay_ms == 0 {
            self.execution_delay_ms = EXECUTION_DELAY_MS;
        }
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard ceiling on serialized transaction size.
    #[serde(default)]
    pub max_transaction_bytes: usize,
}

impl LimitsConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_transaction_bytes == 0 {
            self.max_transaction_bytes = MAX_TRANSACTION_BYTES;
        }
        self
    }
}
