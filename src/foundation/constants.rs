//! System-wide constants for approval coordination.

/// Milliseconds per second.
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// Fixed delay between claim attempts while another owner holds the refresh.
pub const CLAIM_POLL_INTERVAL_MS: u64 = 500;

/// Hard cap on claim attempts before giving up on becoming the refresher.
pub const CLAIM_MAX_ATTEMPTS: u32 = 20;

/// Default window after which an unreleased claim is presumed abandoned and stealable.
pub const DEFAULT_RECLAIM_AFTER_MS: u64 = 2 * 60 * MILLIS_PER_SECOND;

/// Default freshness window for cached entity rows.
pub const DEFAULT_STALE_THRESHOLD_MS: u64 = 5 * 60 * MILLIS_PER_SECOND;

/// Execution is permitted from `valid_start` until `valid_start + EXECUTION_WINDOW_MS`.
pub const EXECUTION_WINDOW_MS: u64 = 180 * MILLIS_PER_SECOND;

/// Collation fires this long before the execution deadline to leave room for
/// final reduction and propagation.
pub const COLLATE_LEAD_MS: u64 = 10 * MILLIS_PER_SECOND;

/// The execution timer fires this long after `valid_start`.
pub const EXECUTION_DELAY_MS: u64 = MILLIS_PER_SECOND;

/// Hard ceiling on the serialized transaction size accepted by the network.
pub const MAX_TRANSACTION_BYTES: usize = 6144;

/// Environment variable overriding wall-clock time in tests.
pub const TEST_NOW_MILLIS_ENV_VAR: &str = "QUORUM_TEST_NOW_MILLIS";
