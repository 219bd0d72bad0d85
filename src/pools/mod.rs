//! The [`RawPool`] and [`SyncPool`] allocators.

pub mod raw_pool;
pub mod sync_pool;

pub use raw_pool::{FreeMatch, PoolConfig, RawPool};
pub use sync_pool::SyncPool;
