pub mod claim;

pub use claim::{ClaimOutcome, RefreshCoordinator};
