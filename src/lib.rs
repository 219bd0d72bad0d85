//! A fixed-capacity pool allocator with a two-phase reserve/commit protocol.
//!
//! This crate manages a single contiguous byte pool supplied by the caller —
//! a static array, a heap buffer, or any borrowed slice — and serves
//! variable-sized allocations from it without ever touching an operating
//! system allocator. All internal bookkeeping uses small integer offsets
//! instead of native pointers, so the per-block overhead is a handful of
//! bytes and the whole pool is position independent.
//!
//! # Usage
//! To use this crate add `fixedpool` as a dependency in your project's
//! `Cargo.toml`.
//! ```toml
//! [dependencies]
//! fixedpool = "0.1"
//! ```
//!
//! ```
//! use fixedpool::{ArrayStorage, RawPool};
//!
//! let mut pool: RawPool<ArrayStorage<256>> = RawPool::new(ArrayStorage::new());
//! pool.clear();
//!
//! // Ask for space first, decide how much you actually need later.
//! let (offset, capacity) = pool.reserve().expect("fresh pool has space");
//! assert!(capacity >= 5);
//! pool.payload_mut(offset).unwrap()[..5].copy_from_slice(b"hello");
//! assert!(pool.commit(5));
//!
//! assert_eq!(pool.alloc_count(), 1);
//! assert_eq!(&pool.payload(offset).unwrap()[..5], b"hello");
//! assert!(pool.free(offset));
//! assert!(pool.is_empty());
//! ```
//!
//! # Allocators
//! Two allocators are exported by this crate - [`RawPool`] and [`SyncPool`].
//! Use [`RawPool`] from a single execution context; [`SyncPool`] is just a
//! `Mutex` wrapper over it that brackets every operation — including the
//! read-only queries — in a critical section, so one pool can be shared
//! between threads while independent pools never contend.
//!
//! # Mode of operation
//! Allocation is deliberately split in two phases, because callers of a pool
//! like this one often do not know the final size of a record until after
//! writing it (think variable-length serialized frames):
//! - [`reserve`](RawPool::reserve) hands out the single largest free region
//!   at its *full* capacity. Finding it is O(1): the free list is kept
//!   sorted by descending size, so its head is always the answer.
//! - The caller writes into the region, then either
//!   [`commit`](RawPool::commit)s the bytes it actually used — any usable
//!   remainder is split off and returned to the free list immediately — or
//!   [`revert`](RawPool::revert)s, which is free of structural work since
//!   the reserved block never left the free list.
//! - [`free`](RawPool::free) releases a committed block and merges it with
//!   free physical neighbors on the spot, so fragmentation never outlives
//!   the operation that could have caused it. There is no other
//!   defragmentation: [`free_space`](RawPool::free_space) reports the
//!   largest single request that can succeed, not the sum of free bytes.
//!
//! Below are the abstractions the allocators are built from:
//!
//! ## Blocks
//! The pool is tiled by blocks, each a small header followed by its payload
//! bytes. Headers store the linkage of the block in whichever logical list
//! owns it, the offset of the physically preceding block, and the payload
//! size; the physical successor is always derived from the size, never
//! stored. See [`RawPool::HEADER`] for the per-block overhead.
//!
//! ## Free list and allocated list
//! Free blocks form a circular doubly-linked list ordered by descending
//! payload size; committed blocks form a second circular list in LIFO
//! commit order, which is what lets [`get`](RawPool::get) enumerate
//! allocations from oldest to newest and, with the `queued-free` feature,
//! lets [`free_first`](RawPool::free_first)/[`free_last`](RawPool::free_last)
//! release blocks without the caller tracking offsets.
//!
//! ## Storage
//! The pool is generic over its backing buffer via the [`Storage`] trait:
//! [`ArrayStorage`] bakes the bytes into the pool itself (and into a
//! `static`, since construction is `const`), [`HeapStorage`] boxes them for
//! runtime-sized pools, and any `&mut [u8]` works too. [`backing_size`]
//! computes how many backing bytes a desired usable capacity needs.
//!
//! ## Configuration
//! The offset width (`u8`/`u16`/`u32`, via [`PoolIndex`]) and the payload
//! alignment (1, 2, 4 or 8) are type-level choices; the minimum payload
//! size and the [`free`](RawPool::free) matching policy are construction
//! knobs on [`PoolConfig`].

pub use crate::index::PoolIndex;
pub use crate::pools::{FreeMatch, PoolConfig, RawPool, SyncPool};
pub use crate::storage::{backing_size, ArrayStorage, HeapStorage, Storage};

mod header;
pub mod index;
mod list;
pub mod pools;
pub mod storage;
mod util;
