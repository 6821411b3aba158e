pub mod memory;
pub mod traits;

pub use memory::{MemoryCacheStore, MemoryTransactionStore};
pub use traits::{CacheStore, TransactionStore};
