//! Application layer: the composed services built from domain algorithms and
//! infrastructure ports.

pub mod collator;
pub mod info_cache;
pub mod resolver;
pub mod scheduler;
pub mod sweep;

pub use collator::{CollationOutcome, Collator};
pub use info_cache::InfoCacheService;
pub use resolver::KeyResolver;
pub use scheduler::ExecutionScheduler;
