//! A single-context pool allocator core.
//
// For a general view of the allocator's operational semantics see the
// [`crate`] level documentation.
//
// # Additional implementation notes
// ## Block bookkeeping
// The pool is tiled by blocks. A block is always reachable physically (from
// offset 0 via the derived successor relation) and, except for a block in
// the middle of the reserve/commit handshake, belongs to exactly one logical
// list: the size-descending free list or the LIFO allocated list. The
// reserved block is the one deliberate exception — it stays linked in the
// free list with its free flag cleared, which is what makes `revert` free
// and keeps an interleaved `free` from coalescing into it.
//
// ## Offsets, not pointers
// All linkage is index-based (`PoolIndex`), so the control structures never
// hold native pointers and the pool can live in a static, on the heap, or in
// a buffer that moves as a whole between uses.

use core::fmt::{self, Debug};

use crate::header::{self, size_of_header};
use crate::index::PoolIndex;
use crate::list;
use crate::storage::{backing_size, HeapStorage, Storage};
use crate::util::{align_down, align_up};

use tracing::{debug, instrument, Level};

/// How [`RawPool::free`] maps a caller offset to an allocated block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FreeMatch {
    /// Any offset within the block's physical span matches. Costs a scan of
    /// the allocated list, but tolerates offsets derived into a payload.
    #[default]
    Within,
    /// The offset must be a payload start. The candidate block is recomputed
    /// directly from the offset and membership is judged only by free-flag
    /// parity with the allocated-list head — a deliberately coarse check
    /// that skips the list walk.
    Exact,
}

/// Construction-time policy knobs of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Commits below this many bytes are rejected, and splits that would
    /// leave a free remainder smaller than this are folded into the
    /// committed block instead.
    pub min_payload: usize,
    /// The matching policy of [`RawPool::free`].
    pub free_match: FreeMatch,
}

impl PoolConfig {
    /// No minimum payload, span matching.
    pub const DEFAULT: PoolConfig = PoolConfig {
        min_payload: 0,
        free_match: FreeMatch::Within,
    };
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A fixed-capacity pool allocator for a single execution context.
///
/// `S` supplies the backing bytes, `I` is the offset width (defaults to
/// `u16`) and `A` the payload alignment in bytes (defaults to 4).
///
/// Allocation is a two-phase handshake: [`reserve`](RawPool::reserve) hands
/// out the largest free region at its full capacity, the caller writes into
/// it, and [`commit`](RawPool::commit) keeps only what was actually used,
/// returning the rest to the free list. [`revert`](RawPool::revert) abandons
/// the handshake instead. Committed blocks are released with
/// [`free`](RawPool::free), which coalesces with free physical neighbors
/// immediately.
///
/// A pool built with [`new`](RawPool::new) is inert until
/// [`clear`](RawPool::clear) runs; [`with_capacity`](RawPool::with_capacity)
/// returns a ready-to-use heap-backed pool.
pub struct RawPool<S, I = u16, const A: usize = 4> {
    storage: S,
    size: usize,
    flist: I,
    alist: I,
    reserved: I,
    allocated: usize,
    config: PoolConfig,
}

impl<S, I: PoolIndex, const A: usize> Debug for RawPool<S, I, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPool")
            .field("size", &self.size)
            .field("free_head", &self.flist)
            .field("alloc_head", &self.alist)
            .field("reserved", &self.reserved)
            .field("allocated", &self.allocated)
            .finish()
    }
}

impl<S: Storage, I: PoolIndex, const A: usize> RawPool<S, I, A> {
    /// Per-block header overhead in bytes for this configuration.
    pub const HEADER: usize = size_of_header::<I>(A);

    const ALIGN_OK: () = assert!(
        A == 1 || A == 2 || A == 4 || A == 8,
        "unsupported pool alignment"
    );

    /// Creates a pool over `storage` with the default [`PoolConfig`].
    ///
    /// The pool is inert — every operation fails cleanly — until
    /// [`clear`](RawPool::clear) initializes it. Being `const`, this can
    /// build a `static` pool.
    pub const fn new(storage: S) -> Self {
        Self::with_config(storage, PoolConfig::DEFAULT)
    }

    /// Creates a pool over `storage` with explicit policy knobs. See
    /// [`new`](RawPool::new).
    pub const fn with_config(storage: S, config: PoolConfig) -> Self {
        let _ = Self::ALIGN_OK;
        RawPool {
            storage,
            size: 0,
            flist: I::INVALID,
            alist: I::INVALID,
            reserved: I::INVALID,
            allocated: 0,
            config,
        }
    }

    /// (Re)initializes the pool to a single spanning free block, discarding
    /// every allocation and any pending reservation.
    ///
    /// The managed size is the storage length rounded down to the alignment
    /// and clamped to what the index type can address. A storage too small
    /// for even one block leaves the pool inert.
    pub fn clear(&mut self) {
        let len = self.storage.bytes().len();
        let cap = align_down(len.min(I::INVALID.to_usize()), A);

        self.alist = I::INVALID;
        self.reserved = I::INVALID;
        self.allocated = 0;

        if cap < Self::HEADER + A {
            self.size = 0;
            self.flist = I::INVALID;
            return;
        }

        self.size = cap;
        let first = I::from_usize(0);
        self.flist = first;

        let pool = self.storage.bytes_mut();
        header::set_logical_next(pool, first, first);
        header::set_logical_prev(pool, first, first);
        header::set_prev_phys(pool, first, I::INVALID);
        header::set_payload::<I, A>(pool, first, cap - Self::HEADER, true);
    }

    /// Tentatively claims the largest free region.
    ///
    /// Returns the payload offset and the full capacity of that region, or
    /// `None` if the free list is empty. The caller may write up to the
    /// returned capacity, then must settle the handshake with
    /// [`commit`](RawPool::commit) or [`revert`](RawPool::revert).
    ///
    /// Reserving while a reservation is already pending is a contract
    /// violation.
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    pub fn reserve(&mut self) -> Option<(usize, usize)> {
        debug_assert_eq!(
            self.reserved,
            I::INVALID,
            "reserve while a reservation is pending"
        );

        if self.flist == I::INVALID {
            debug!("free list empty, nothing to hand out");
            return None;
        }

        let blk = self.flist;
        let pool = self.storage.bytes_mut();
        let capacity = header::payload_size::<I, A>(pool, blk);
        // The block stays linked in the free list; only the flag changes, so
        // a revert is a pure rollback and an interleaved free cannot absorb
        // the reserved region.
        header::set_free::<I, A>(pool, blk, false);
        self.reserved = blk;
        Some((blk.to_usize() + Self::HEADER, capacity))
    }

    /// Abandons the pending reservation.
    ///
    /// Normally a pure flag rollback: the block never left the free list.
    /// The one exception is a block freed *during* the reservation right
    /// next to it — `free` could not merge into the reserved region, so the
    /// adjacency is settled here instead.
    ///
    /// Reverting with no reservation pending is a contract violation.
    #[instrument(level = "debug")]
    pub fn revert(&mut self) {
        debug_assert_ne!(
            self.reserved,
            I::INVALID,
            "revert without a pending reservation"
        );

        if self.reserved == I::INVALID {
            return;
        }

        let blk = self.reserved;
        self.reserved = I::INVALID;

        let size = self.size;
        let pool = self.storage.bytes_mut();
        header::set_free::<I, A>(pool, blk, true);

        let prev = header::prev_phys(pool, blk);
        let after = header::next_phys::<I, A>(pool, blk);
        let prev_free = prev != I::INVALID && header::is_free::<I, A>(pool, prev);
        let next_free = after != size && header::is_free::<I, A>(pool, I::from_usize(after));

        if prev_free || next_free {
            debug!("coalescing with space freed during the reservation");
            self.flist = list::remove(pool, self.flist, blk);
            let merged = self.join_adjacent(blk);
            self.flist = list::insert_sorted::<I, A>(self.storage.bytes_mut(), self.flist, merged);
        }
    }

    /// Settles the pending reservation, keeping `len` payload bytes.
    ///
    /// `len` is rounded up to the alignment. Fails — leaving the reservation
    /// intact, so the caller may retry with a smaller size or revert — when
    /// there is no pending reservation, when the rounded size exceeds the
    /// reserved capacity, or when it undercuts the configured minimum
    /// payload.
    ///
    /// On success the block moves to the front of the allocated list. A
    /// remainder big enough for another block is split off and returned to
    /// the free list (coalescing with a free successor first); a smaller
    /// remainder is folded into the committed block, so the caller may end
    /// up owning slightly more than requested.
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    pub fn commit(&mut self, len: usize) -> bool {
        if self.reserved == I::INVALID {
            debug!("commit without a pending reservation");
            return false;
        }
        if len > self.size {
            debug!("commit larger than the whole pool");
            return false;
        }

        let mut len = align_up(len, A);
        if self.config.min_payload > 0 && len < self.config.min_payload {
            debug!(
                min = self.config.min_payload,
                "commit below the minimum payload"
            );
            return false;
        }

        let blk = self.reserved;
        let header_size = Self::HEADER;
        let pool = self.storage.bytes_mut();
        let capacity = header::payload_size::<I, A>(pool, blk);
        debug_assert!(
            !header::is_free::<I, A>(pool, blk),
            "reserved block must be flagged in use"
        );

        if len > capacity {
            debug!(capacity, "commit larger than the reserved capacity");
            return false;
        }

        let spare = capacity - len;
        let split = spare >= header_size + self.config.min_payload;
        if !split && spare > 0 {
            debug!(spare, "remainder folded into the committed block");
        }
        if !split {
            len = capacity;
        }

        self.flist = list::remove(pool, self.flist, blk);
        header::set_payload::<I, A>(pool, blk, len, false);
        self.alist = list::push_front(pool, self.alist, blk);

        if split {
            let tail = I::from_usize(blk.to_usize() + header_size + len);
            header::set_payload::<I, A>(pool, tail, spare - header_size, true);
            header::set_prev_phys(pool, tail, blk);

            let after = header::next_phys::<I, A>(pool, tail);
            if after != self.size {
                header::set_prev_phys(pool, I::from_usize(after), tail);
            }

            // The tail may border space freed while the reservation was
            // held.
            let tail = self.join_adjacent(tail);
            self.flist = list::insert_sorted::<I, A>(self.storage.bytes_mut(), self.flist, tail);
            debug!(
                tail = tail.to_usize(),
                "split remainder returned to the free list"
            );
        }

        self.reserved = I::INVALID;
        self.allocated += 1;
        true
    }

    /// Releases the committed block matching `offset` under the configured
    /// [`FreeMatch`] policy.
    ///
    /// Offsets outside the pool, or matching no allocated block, are
    /// rejected with no state change. On success the block is coalesced with
    /// any free physical neighbors and the merged extent rejoins the free
    /// list.
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    pub fn free(&mut self, offset: usize) -> bool {
        if offset >= self.size {
            debug!("offset outside the pool");
            return false;
        }
        if self.alist == I::INVALID {
            return false;
        }

        let Some(blk) = self.find_allocated(offset) else {
            debug!("offset matches no allocated block");
            return false;
        };

        self.release(blk);
        true
    }

    /// Frees the most recently committed block, no offset required.
    #[cfg(feature = "queued-free")]
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    pub fn free_first(&mut self) -> bool {
        if self.alist == I::INVALID {
            return false;
        }
        let blk = self.alist;
        self.release(blk);
        true
    }

    /// Frees the least recently committed block, no offset required.
    #[cfg(feature = "queued-free")]
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    pub fn free_last(&mut self) -> bool {
        if self.alist == I::INVALID {
            return false;
        }
        // The allocated list is LIFO, so the oldest block is the tail.
        let blk = header::logical_prev(self.storage.bytes(), self.alist);
        self.release(blk);
        true
    }

    /// Capacity of the largest free region — the biggest single request
    /// that can currently succeed, not the total of free bytes.
    pub fn free_space(&self) -> usize {
        if self.flist == I::INVALID {
            0
        } else {
            header::payload_size::<I, A>(self.storage.bytes(), self.flist)
        }
    }

    /// Number of committed blocks.
    pub fn alloc_count(&self) -> usize {
        self.allocated
    }

    /// Whether no free region remains.
    pub fn is_full(&self) -> bool {
        self.free_space() == 0
    }

    /// Whether no block is committed.
    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /// Whether a reservation is currently pending.
    pub fn is_reserved(&self) -> bool {
        self.reserved != I::INVALID
    }

    /// The managed pool size in bytes, after rounding and clamping.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Whether `offset` lies inside the managed pool range.
    pub fn contains(&self, offset: usize) -> bool {
        offset < self.size
    }

    /// The policy knobs this pool was built with.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Payload offset and size of the `n`-th committed block, counting from
    /// the oldest still-committed one. `None` when out of range.
    pub fn get(&self, n: usize) -> Option<(usize, usize)> {
        if n >= self.allocated {
            return None;
        }

        // The allocated list is LIFO; reverse the caller's oldest-first
        // index against the head.
        let pool = self.storage.bytes();
        let blk = list::nth(pool, self.alist, self.allocated - 1 - n)?;
        Some((
            blk.to_usize() + Self::HEADER,
            header::payload_size::<I, A>(pool, blk),
        ))
    }

    /// The payload bytes of the block whose payload starts at `offset` —
    /// either a committed block or the pending reservation.
    pub fn payload(&self, offset: usize) -> Option<&[u8]> {
        let (start, len) = self.payload_span(offset)?;
        Some(&self.storage.bytes()[start..start + len])
    }

    /// Mutable access to the payload bytes of the block whose payload starts
    /// at `offset` — either a committed block or the pending reservation.
    pub fn payload_mut(&mut self, offset: usize) -> Option<&mut [u8]> {
        let (start, len) = self.payload_span(offset)?;
        Some(&mut self.storage.bytes_mut()[start..start + len])
    }

    fn payload_span(&self, offset: usize) -> Option<(usize, usize)> {
        let pool = self.storage.bytes();

        if self.reserved != I::INVALID && offset == self.reserved.to_usize() + Self::HEADER {
            return Some((offset, header::payload_size::<I, A>(pool, self.reserved)));
        }

        let blk = list::find_containing::<I, A>(pool, self.alist, offset)?;
        (offset == blk.to_usize() + Self::HEADER)
            .then(|| (offset, header::payload_size::<I, A>(pool, blk)))
    }

    /// Resolves a caller offset to an allocated-list block per the
    /// configured matching policy.
    fn find_allocated(&self, offset: usize) -> Option<I> {
        let pool = self.storage.bytes();
        match self.config.free_match {
            FreeMatch::Within => list::find_containing::<I, A>(pool, self.alist, offset),
            FreeMatch::Exact => {
                // Coarse by design: the candidate block is recomputed from
                // the offset and membership is judged only by free-flag
                // parity with the list head — no containment scan. An
                // offset that is not a real payload start can therefore
                // resolve to a bogus block; exactness is the caller's
                // contract here.
                let blk = offset.checked_sub(Self::HEADER)?;
                if blk % A != 0 {
                    return None;
                }
                let blk = I::from_usize(blk);
                let head_free = header::is_free::<I, A>(pool, self.alist);
                let blk_free = header::is_free::<I, A>(pool, blk);
                (head_free == blk_free).then_some(blk)
            }
        }
    }

    /// Unlinks an allocated block, coalesces it with free neighbors and
    /// returns the merged extent to the free list.
    fn release(&mut self, blk: I) {
        self.alist = list::remove(self.storage.bytes_mut(), self.alist, blk);
        let merged = self.join_adjacent(blk);
        self.flist = list::insert_sorted::<I, A>(self.storage.bytes_mut(), self.flist, merged);
        self.allocated -= 1;
    }

    /// Merges an orphan block (a member of no list) with whichever physical
    /// neighbors are free, detaching those from the free list. Returns the
    /// merged block — still orphaned — flagged free, its size recomputed
    /// from the merged span.
    #[instrument(level = "debug", ret(level = Level::DEBUG))]
    fn join_adjacent(&mut self, orphan: I) -> I {
        let size = self.size;
        let header_size = Self::HEADER;
        let pool = self.storage.bytes_mut();

        let mut orphan = orphan;
        let prev = header::prev_phys(pool, orphan);
        let mut after = header::next_phys::<I, A>(pool, orphan);

        if prev == I::INVALID {
            debug_assert_eq!(orphan.to_usize(), 0, "only the first block has no predecessor");
        } else if header::is_free::<I, A>(pool, prev) {
            self.flist = list::remove(pool, self.flist, prev);
            debug!(prev = prev.to_usize(), "absorbing free physical predecessor");
            orphan = prev;
        }

        if after != size {
            let next_blk = I::from_usize(after);
            if header::is_free::<I, A>(pool, next_blk) {
                self.flist = list::remove(pool, self.flist, next_blk);
                after = header::next_phys::<I, A>(pool, next_blk);
                debug!(next = next_blk.to_usize(), "absorbing free physical successor");
            }
        }

        if after != size {
            header::set_prev_phys(pool, I::from_usize(after), orphan);
        }

        header::set_payload::<I, A>(pool, orphan, after - orphan.to_usize() - header_size, true);
        orphan
    }
}

impl<I: PoolIndex, const A: usize> RawPool<HeapStorage, I, A> {
    /// Builds an initialized heap-backed pool able to serve `capacity`
    /// usable bytes: the backing buffer is the rounded capacity plus one
    /// header of overhead, so a fresh pool's [`free_space`](RawPool::free_space)
    /// equals the rounded request.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::new(HeapStorage::new(backing_size::<I>(capacity, A)));
        pool.clear();
        pool
    }

    /// Same as [`with_capacity`](RawPool::with_capacity) with explicit
    /// policy knobs.
    pub fn with_capacity_and_config(capacity: usize, config: PoolConfig) -> Self {
        let mut pool = Self::with_config(HeapStorage::new(backing_size::<I>(capacity, A)), config);
        pool.clear();
        pool
    }
}
