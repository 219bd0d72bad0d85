//! Circular doubly-linked list primitives over pool-resident blocks.
//!
//! Both logical lists of a pool — the size-sorted free list and the
//! insertion-ordered allocated list — are built from the same linkage: the
//! `logical_next`/`logical_prev` fields of each block header form a circular
//! chain, and a list is identified purely by the offset of its head block
//! ([`PoolIndex::INVALID`] when empty). A sole member links to itself.
//!
//! Every function takes the current head and returns the new one, since an
//! insertion or removal at the front moves it.

use crate::header;
use crate::index::PoolIndex;

/// Makes `blk` a one-element circular list.
#[inline]
fn link_single<I: PoolIndex>(pool: &mut [u8], blk: I) {
    header::set_logical_next(pool, blk, blk);
    header::set_logical_prev(pool, blk, blk);
}

/// Splices `blk` into the circle right before `at`.
fn insert_before<I: PoolIndex>(pool: &mut [u8], at: I, blk: I) {
    let prev = header::logical_prev(pool, at);
    header::set_logical_next(pool, blk, at);
    header::set_logical_prev(pool, blk, prev);
    header::set_logical_next(pool, prev, blk);
    header::set_logical_prev(pool, at, blk);
}

/// Adds `blk` at the front of the list. O(1).
pub(crate) fn push_front<I: PoolIndex>(pool: &mut [u8], head: I, blk: I) -> I {
    debug_assert_ne!(blk, I::INVALID);

    if head == I::INVALID {
        link_single(pool, blk);
    } else {
        insert_before(pool, head, blk);
    }
    blk
}

/// Adds `blk` keeping the list ordered by descending payload size. O(n).
///
/// Ties land after the existing entries of equal size, and the head only
/// moves when the new block is strictly larger than the current maximum.
pub(crate) fn insert_sorted<I: PoolIndex, const A: usize>(pool: &mut [u8], head: I, blk: I) -> I {
    debug_assert_ne!(blk, I::INVALID);

    if head == I::INVALID {
        link_single(pool, blk);
        return blk;
    }

    let size = header::payload_size::<I, A>(pool, blk);
    let mut at = head;
    let mut displaces_head = true;

    loop {
        if header::payload_size::<I, A>(pool, at) < size {
            break;
        }
        displaces_head = false;
        at = header::logical_next(pool, at);
        if at == head {
            break;
        }
    }

    insert_before(pool, at, blk);
    if displaces_head {
        blk
    } else {
        head
    }
}

/// Detaches `blk` from the list it belongs to. O(1).
///
/// The caller must pass the head of that same list; there is no validation
/// that `blk` is actually a member.
pub(crate) fn remove<I: PoolIndex>(pool: &mut [u8], head: I, blk: I) -> I {
    debug_assert_ne!(blk, I::INVALID);

    let next = header::logical_next(pool, blk);
    let prev = header::logical_prev(pool, blk);

    if next == blk {
        // Sole member; the list becomes empty.
        debug_assert_eq!(prev, blk);
        debug_assert_eq!(head, blk);
        return I::INVALID;
    }

    header::set_logical_next(pool, prev, next);
    header::set_logical_prev(pool, next, prev);

    if head == blk {
        next
    } else {
        head
    }
}

/// Finds the list member whose physical span `[block, next_phys)` contains
/// the byte `offset`. O(n).
pub(crate) fn find_containing<I: PoolIndex, const A: usize>(
    pool: &[u8],
    head: I,
    offset: usize,
) -> Option<I> {
    if head == I::INVALID {
        return None;
    }

    let mut at = head;
    loop {
        if offset >= at.to_usize() && offset < header::next_phys::<I, A>(pool, at) {
            return Some(at);
        }
        at = header::logical_next(pool, at);
        if at == head {
            return None;
        }
    }
}

/// Returns the `n`-th member counted from the head. O(n).
pub(crate) fn nth<I: PoolIndex>(pool: &[u8], head: I, n: usize) -> Option<I> {
    if head == I::INVALID {
        return None;
    }

    let mut at = head;
    let mut i = 0;
    loop {
        if i == n {
            return Some(at);
        }
        at = header::logical_next(pool, at);
        if at == head {
            return None;
        }
        i += 1;
    }
}
