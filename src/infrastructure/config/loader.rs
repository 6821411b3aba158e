//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (QUORUM_* prefix)

use crate::foundation::QuorumError;
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use std::path::Path;

/// Environment variable prefix for config overrides.
///
/// Example: `QUORUM_CACHE__STALE_THRESHOLD_MS` -> `cache.stale_threshold_ms`
const ENV_PREFIX: &str = "QUORUM_";

const CONFIG_FILE_NAME: &str = "quorum-config.toml";

/// Load configuration from the default file in `data_dir` (`quorum-config.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig, QuorumError> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig, QuorumError> {
    info!("loading configuration path={}", path.display());
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
    }
    let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config: AppConfig = figment.extract().map_err(|e| QuorumError::ConfigError(format!("config extraction failed: {e}")))?;
    let config = postprocess(config);
    debug!(
        "configuration loaded stale_threshold_ms={} reclaim_after_ms={} execution_window_ms={} max_transaction_bytes={}",
        config.cache.stale_threshold_ms,
        config.cache.reclaim_after_ms,
        config.scheduler.execution_window_ms,
        config.limits.max_transaction_bytes
    );
    Ok(config)
}

fn postprocess(mut config: AppConfig) -> AppConfig {
    config.cache = config.cache.with_defaults();
    config.scheduler = config.scheduler.with_defaults();
    config.limits = config.limits.with_defaults();
    config
}
