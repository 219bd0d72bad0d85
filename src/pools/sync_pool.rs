//! A lock-bracketed pool allocator.

use crate::pools::raw_pool::PoolConfig;
use crate::pools::RawPool;
use crate::storage::{HeapStorage, Storage};
use crate::PoolIndex;

use std::sync::Mutex;

/// A pool allocator shareable between threads.
///
/// This is a `Mutex` wrapper over [`RawPool`]: every entry point — including
/// the read-only queries, which observe multi-field state — runs inside the
/// critical section. The lock is per pool; independent pools never contend
/// with each other.
///
/// The reserve/commit handshake itself is still a single-owner protocol: one
/// logical context drives `reserve`/`commit`/`revert`, while any thread may
/// `free` blocks or query state concurrently.
pub struct SyncPool<S, I = u16, const A: usize = 4> {
    inner: Mutex<RawPool<S, I, A>>,
}

impl<S: Storage, I: PoolIndex, const A: usize> SyncPool<S, I, A> {
    /// Per-block header overhead in bytes for this configuration.
    pub const HEADER: usize = RawPool::<S, I, A>::HEADER;

    /// Creates an inert pool over `storage`; call
    /// [`clear`](SyncPool::clear) before use. Being `const`, this can build
    /// a `static` pool.
    pub const fn new(storage: S) -> Self {
        SyncPool {
            inner: Mutex::new(RawPool::new(storage)),
        }
    }

    /// Creates an inert pool with explicit policy knobs. See
    /// [`new`](SyncPool::new).
    pub const fn with_config(storage: S, config: PoolConfig) -> Self {
        SyncPool {
            inner: Mutex::new(RawPool::with_config(storage, config)),
        }
    }

    /// See [`RawPool::clear`].
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear()
    }

    /// See [`RawPool::reserve`].
    pub fn reserve(&self) -> Option<(usize, usize)> {
        self.inner.lock().unwrap().reserve()
    }

    /// See [`RawPool::revert`].
    pub fn revert(&self) {
        self.inner.lock().unwrap().revert()
    }

    /// See [`RawPool::commit`].
    pub fn commit(&self, len: usize) -> bool {
        self.inner.lock().unwrap().commit(len)
    }

    /// See [`RawPool::free`].
    pub fn free(&self, offset: usize) -> bool {
        self.inner.lock().unwrap().free(offset)
    }

    /// See [`RawPool::free_first`].
    #[cfg(feature = "queued-free")]
    pub fn free_first(&self) -> bool {
        self.inner.lock().unwrap().free_first()
    }

    /// See [`RawPool::free_last`].
    #[cfg(feature = "queued-free")]
    pub fn free_last(&self) -> bool {
        self.inner.lock().unwrap().free_last()
    }

    /// See [`RawPool::free_space`].
    pub fn free_space(&self) -> usize {
        self.inner.lock().unwrap().free_space()
    }

    /// See [`RawPool::alloc_count`].
    pub fn alloc_count(&self) -> usize {
        self.inner.lock().unwrap().alloc_count()
    }

    /// See [`RawPool::is_full`].
    pub fn is_full(&self) -> bool {
        self.inner.lock().unwrap().is_full()
    }

    /// See [`RawPool::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// See [`RawPool::is_reserved`].
    pub fn is_reserved(&self) -> bool {
        self.inner.lock().unwrap().is_reserved()
    }

    /// See [`RawPool::capacity`].
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity()
    }

    /// See [`RawPool::contains`].
    pub fn contains(&self, offset: usize) -> bool {
        self.inner.lock().unwrap().contains(offset)
    }

    /// See [`RawPool::get`].
    pub fn get(&self, n: usize) -> Option<(usize, usize)> {
        self.inner.lock().unwrap().get(n)
    }

    /// Runs `f` over the payload of the block whose payload starts at
    /// `offset`, inside the critical section. `None` if no such block.
    pub fn with_payload<R>(&self, offset: usize, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let guard = self.inner.lock().unwrap();
        guard.payload(offset).map(f)
    }

    /// Runs `f` over the mutable payload of the block whose payload starts
    /// at `offset`, inside the critical section. `None` if no such block.
    pub fn with_payload_mut<R>(&self, offset: usize, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let mut guard = self.inner.lock().unwrap();
        guard.payload_mut(offset).map(f)
    }
}

impl<I: PoolIndex, const A: usize> SyncPool<HeapStorage, I, A> {
    /// See [`RawPool::with_capacity`].
    pub fn with_capacity(capacity: usize) -> Self {
        SyncPool {
            inner: Mutex::new(RawPool::with_capacity(capacity)),
        }
    }
}
