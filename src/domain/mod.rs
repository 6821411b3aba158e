//! Domain layer: pure types and structurally recursive algorithms.
//!
//! Nothing here performs IO; storage and transport concerns live in
//! `infrastructure`, composition in `application`.

pub mod cache;
pub mod key;
pub mod transaction;

pub use cache::{CachedRow, EntityExtra, EntityKind, RefreshResult, RemoteInfo, RowUpdate};
pub use cache::{AccountInfo, NodeInfo};
pub use key::Key;
pub use transaction::{StatusCode, TransactionBody, TransactionGroup, TransactionRecord, TransactionStatus};
