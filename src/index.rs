//! The [`PoolIndex`] trait and its implementations.
//!
//! All positions inside a pool are byte offsets of an unsigned integer width
//! chosen to just cover the pool size. Block headers store these offsets
//! instead of native pointers, which keeps the metadata small and the whole
//! pool position independent. The all-ones value of the width doubles as the
//! "no block" sentinel.

use core::fmt::Debug;
use core::mem::size_of;

/// An unsigned integer type usable as a pool offset.
///
/// Implemented for `u8`, `u16` and `u32`. Pick the narrowest type that covers
/// the pool size: `u8` for pools up to 255 bytes, `u16` up to 65535, `u32`
/// beyond that.
pub trait PoolIndex: Copy + Eq + Ord + Debug {
    /// The sentinel meaning "invalid / no block". Equal to the type's
    /// maximum value, so a pool may not grow past it.
    const INVALID: Self;

    /// Serialized width of the index in bytes.
    const BYTES: usize;

    /// Narrows a `usize` offset into the index type.
    fn from_usize(value: usize) -> Self;

    /// Widens the index back into a `usize` offset.
    fn to_usize(self) -> usize;

    /// Reads an index stored at byte position `at` of the pool.
    fn read(pool: &[u8], at: usize) -> Self;

    /// Stores an index at byte position `at` of the pool.
    fn write(pool: &mut [u8], at: usize, value: Self);
}

macro_rules! impl_pool_index {
    ($($ty:ty),*) => {$(
        impl PoolIndex for $ty {
            const INVALID: Self = <$ty>::MAX;
            const BYTES: usize = size_of::<$ty>();

            #[inline(always)]
            fn from_usize(value: usize) -> Self {
                debug_assert!(
                    value <= <$ty>::MAX as usize,
                    "offset out of index range"
                );
                value as $ty
            }

            #[inline(always)]
            fn to_usize(self) -> usize {
                self as usize
            }

            #[inline]
            fn read(pool: &[u8], at: usize) -> Self {
                let mut raw = [0_u8; size_of::<$ty>()];
                raw.copy_from_slice(&pool[at..at + size_of::<$ty>()]);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn write(pool: &mut [u8], at: usize, value: Self) {
                pool[at..at + size_of::<$ty>()].copy_from_slice(&value.to_ne_bytes());
            }
        }
    )*};
}

impl_pool_index!(u8, u16, u32);
