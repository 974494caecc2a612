//! Spare representations of value types.
//!
//! A spare representation is a bit pattern that no valid value of a type ever
//! has, such as the byte `2` for a `bool` or the null pointer for a reference.
//! A [`Maybe`](crate::Maybe) stores "no value" as one of these patterns when the
//! value type has any, so it takes no more room than the value itself.
//!
//! The spare patterns of a type are described by an implementation of
//! [`Tombstone`] on a traits type. [`Niches`] knows the patterns of common
//! types and is the default; [`NoNiche`] claims none for any type, forcing a
//! separate flag. Integrators describe their own types by implementing
//! [`Tombstone`] on a traits type of their own.

use alloc::{boxed::Box, string::String, vec::Vec};
use core::{
    mem::MaybeUninit,
    num::{
        NonZeroI8, NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI128, NonZeroIsize, NonZeroU8,
        NonZeroU16, NonZeroU32, NonZeroU64, NonZeroU128, NonZeroUsize,
    },
    ptr::NonNull,
};

use crate::maybe::{
    Maybe,
    encoding::{Encoding, Flagged, Tombstoned},
};

/// Spare bit patterns of `T`, described by the traits type `Self`.
///
/// # Safety
///
/// Implementors must ensure:
///
/// 1. For every `index < SPARE_REPRESENTATIONS`, the pattern written by
///    [`set_spare_representation`](Self::set_spare_representation) is not a
///    valid `T`, and distinct indices write distinct patterns.
/// 2. [`spare_index`](Self::spare_index) returns `Some(index)` for the pattern
///    of `index` and `None` for every valid `T`, and only reads bytes that are
///    initialized both in valid values and in spare patterns.
/// 3. `SPARE_REPRESENTATIONS` lies within the bounds of [`Self::Spare`].
pub unsafe trait Tombstone<T> {
    /// The number of spare patterns, at the type level. It selects how a
    /// [`Maybe`] of `T` is encoded.
    type Spare: SpareCount;

    /// The number of spare patterns.
    const SPARE_REPRESENTATIONS: usize;

    /// Returns the index of the spare pattern held by `slot`, or `None` if it
    /// holds a valid `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds a valid `T` or a pattern written by
    ///    [`set_spare_representation`](Self::set_spare_representation).
    unsafe fn spare_index(slot: &MaybeUninit<T>) -> Option<usize>;

    /// Writes spare pattern `index` into `slot` without constructing a `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `index < Self::SPARE_REPRESENTATIONS`.
    /// 2. `slot` holds no live value, since it is overwritten without being
    ///    dropped.
    unsafe fn set_spare_representation(slot: &mut MaybeUninit<T>, index: usize);
}

/// A type-level bound on a number of spare patterns.
///
/// The bound decides the encoding of a [`Maybe`]: [`Tombstoned`] when there
/// is at least one spare pattern, [`Flagged`] otherwise.
pub trait SpareCount {
    /// The encoding of a [`Maybe`] of a type with this many spare patterns.
    type Encoding: Encoding;
    /// The count left for a [`Maybe`] of such a [`Maybe`].
    type Nested: SpareCount;
    /// Lower bound of the count.
    const MIN: usize;
    /// Upper bound of the count.
    const MAX: usize;
}

/// Exactly `N` spare patterns.
#[derive(Clone, Copy, Debug)]
pub struct Exactly<const N: usize>;

/// More spare patterns than any realistic nesting of [`Maybe`] consumes.
///
/// Each level of nesting consumes one pattern and keeps the tombstoned
/// encoding, with the patterns left counted as [`Remaining`]. The count must be
/// at least [`UNBOUNDED_MIN`]; types with one to eight patterns declare
/// [`Exactly`] instead, whose nesting falls back to a flag once the patterns
/// run out. A smaller count is rejected at compile time:
///
/// ```compile_fail
/// use core::mem::MaybeUninit;
///
/// use polyvalue::{
///     Maybe,
///     maybe::{Tombstone, Unbounded},
/// };
///
/// struct OneSpare;
///
/// // SAFETY: values of this traits type never reach 255.
/// unsafe impl Tombstone<u8> for OneSpare {
///     type Spare = Unbounded;
///     const SPARE_REPRESENTATIONS: usize = 1;
///
///     unsafe fn spare_index(slot: &MaybeUninit<u8>) -> Option<usize> {
///         // SAFETY: the byte is always initialized.
///         (unsafe { slot.assume_init() } == 255).then_some(0)
///     }
///
///     unsafe fn set_spare_representation(slot: &mut MaybeUninit<u8>, _: usize) {
///         slot.write(255);
///     }
/// }
///
/// let _ = Maybe::<u8, OneSpare>::some(1);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Unbounded;

/// The smallest count an [`Unbounded`] bound accepts: one more than the
/// largest [`Exactly`] count.
pub const UNBOUNDED_MIN: usize = 9;

/// The patterns left of an [`Unbounded`] count inside nested [`Maybe`]s.
///
/// Nesting as many levels as the original count fails to compile.
#[derive(Clone, Copy, Debug)]
pub struct Remaining;

/// The spare patterns a flag byte offers to an enclosing [`Maybe`]: every
/// value but the two the flag itself uses.
pub const FLAG_SPARES: usize = 254;

impl SpareCount for Exactly<0> {
    type Encoding = Flagged;
    type Nested = Unbounded;
    const MIN: usize = 0;
    const MAX: usize = 0;
}

impl SpareCount for Unbounded {
    type Encoding = Tombstoned;
    type Nested = Remaining;
    const MIN: usize = UNBOUNDED_MIN;
    const MAX: usize = usize::MAX;
}

impl SpareCount for Remaining {
    type Encoding = Tombstoned;
    type Nested = Remaining;
    const MIN: usize = 1;
    const MAX: usize = usize::MAX;
}

/// Implements [`SpareCount`] for counts with a tombstoned encoding.
macro_rules! exactly {
    ($($count:literal => $nested:literal),*) => {$(
        impl SpareCount for Exactly<$count> {
            type Encoding = Tombstoned;
            type Nested = Exactly<$nested>;
            const MIN: usize = $count;
            const MAX: usize = $count;
        }
    )*};
}

exactly!(1 => 0, 2 => 1, 3 => 2, 4 => 3, 5 => 4, 6 => 5, 7 => 6, 8 => 7);

/// The spare patterns of common types. The default traits of a [`Maybe`].
///
/// Types implemented here:
///
/// - `bool`: the 254 byte values other than `0` and `1`;
/// - `char`: the values above `char::MAX`;
/// - the `NonZero` integers, [`NonNull`], references and [`Box`]: the zero
///   pattern;
/// - primitive numbers, `()`, [`String`] and [`Vec`]: none;
/// - [`Maybe`]: the spare patterns its value type has left, see below.
///
/// A [`Maybe`] of a [`Maybe`] reserves one spare pattern of the inner value
/// type for the inner "no value" state and offers the rest; a flagged
/// [`Maybe`] offers the unused values of its flag byte.
#[derive(Clone, Copy, Debug)]
pub enum Niches {}

/// Claims no spare patterns for any type, so a [`Maybe`] always carries a
/// flag.
#[derive(Clone, Copy, Debug)]
pub enum NoNiche {}

// SAFETY: there are no spare patterns to describe.
unsafe impl<T> Tombstone<T> for NoNiche {
    type Spare = Exactly<0>;
    const SPARE_REPRESENTATIONS: usize = 0;

    #[inline]
    unsafe fn spare_index(_: &MaybeUninit<T>) -> Option<usize> {
        None
    }

    unsafe fn set_spare_representation(_: &mut MaybeUninit<T>, _: usize) {
        unreachable!("type has no spare representations")
    }
}

/// Implements [`Tombstone`] on [`Niches`] for types without spare patterns.
macro_rules! no_spares {
    ($($ty:ty),* $(,)?) => {$(
        // SAFETY: there are no spare patterns to describe.
        unsafe impl Tombstone<$ty> for Niches {
            type Spare = Exactly<0>;
            const SPARE_REPRESENTATIONS: usize = 0;

            #[inline]
            unsafe fn spare_index(_: &MaybeUninit<$ty>) -> Option<usize> {
                None
            }

            unsafe fn set_spare_representation(_: &mut MaybeUninit<$ty>, _: usize) {
                unreachable!("type has no spare representations")
            }
        }
    )*};
}

no_spares!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, (), String,
);

// SAFETY: there are no spare patterns to describe.
unsafe impl<T> Tombstone<Vec<T>> for Niches {
    type Spare = Exactly<0>;
    const SPARE_REPRESENTATIONS: usize = 0;

    #[inline]
    unsafe fn spare_index(_: &MaybeUninit<Vec<T>>) -> Option<usize> {
        None
    }

    unsafe fn set_spare_representation(_: &mut MaybeUninit<Vec<T>>, _: usize) {
        unreachable!("type has no spare representations")
    }
}

// SAFETY: a `bool` is the byte 0 or 1, so the bytes 2 to 255 are spare and the
// byte is always initialized.
unsafe impl Tombstone<bool> for Niches {
    type Spare = Unbounded;
    const SPARE_REPRESENTATIONS: usize = 254;

    #[inline]
    unsafe fn spare_index(slot: &MaybeUninit<bool>) -> Option<usize> {
        // SAFETY: the byte is initialized in values and spare patterns alike.
        // 1. Guaranteed by the caller
        let byte = unsafe { slot.as_ptr().cast::<u8>().read() };
        (byte >= 2).then(|| usize::from(byte - 2))
    }

    #[inline]
    unsafe fn set_spare_representation(slot: &mut MaybeUninit<bool>, index: usize) {
        debug_assert!(index < 254);
        // SAFETY: a `bool` is one byte.
        // 1. Guaranteed by the caller, so the byte fits
        unsafe { slot.as_mut_ptr().cast::<u8>().write(index as u8 + 2) };
    }
}

/// The first `u32` that is not a `char`, ignoring surrogates.
const CHAR_SPARE_START: u32 = char::MAX as u32 + 1;

// SAFETY: no `char` exceeds `char::MAX`, and all four bytes are initialized.
unsafe impl Tombstone<char> for Niches {
    type Spare = Unbounded;
    const SPARE_REPRESENTATIONS: usize = (u32::MAX - CHAR_SPARE_START) as usize + 1;

    #[inline]
    unsafe fn spare_index(slot: &MaybeUninit<char>) -> Option<usize> {
        // SAFETY: the bytes are initialized in values and spare patterns alike.
        // 1. Guaranteed by the caller
        let bits = unsafe { slot.as_ptr().cast::<u32>().read() };
        (bits >= CHAR_SPARE_START).then(|| (bits - CHAR_SPARE_START) as usize)
    }

    #[inline]
    unsafe fn set_spare_representation(slot: &mut MaybeUninit<char>, index: usize) {
        // SAFETY: a `char` is a `u32` in size and alignment.
        // 1. Guaranteed by the caller, so the sum does not overflow
        unsafe { slot.as_mut_ptr().cast::<u32>().write(CHAR_SPARE_START + index as u32) };
    }
}

/// Returns whether every byte of `slot` is zero.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. Every byte of `slot` is initialized.
#[inline]
unsafe fn is_zeroed<T>(slot: &MaybeUninit<T>) -> bool {
    // SAFETY: the slot is `size_of::<T>()` bytes long.
    // 1. Guaranteed by the caller
    let bytes = unsafe { core::slice::from_raw_parts(slot.as_ptr().cast::<u8>(), size_of::<T>()) };
    bytes.iter().all(|&byte| byte == 0)
}

/// Implements [`Tombstone`] on [`Niches`] for types whose only spare pattern
/// is zero.
macro_rules! zero_spare {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {$(
        // SAFETY: the type is never zero and has no padding, so spare pattern 0
        // is all zero bytes and every byte is always initialized.
        unsafe impl<$($generics)*> Tombstone<$ty> for Niches {
            type Spare = Exactly<1>;
            const SPARE_REPRESENTATIONS: usize = 1;

            #[inline]
            unsafe fn spare_index(slot: &MaybeUninit<$ty>) -> Option<usize> {
                // SAFETY:
                // 1. Guaranteed by the caller, and the type has no padding
                unsafe { is_zeroed(slot) }.then_some(0)
            }

            #[inline]
            unsafe fn set_spare_representation(slot: &mut MaybeUninit<$ty>, index: usize) {
                debug_assert_eq!(index, 0);
                // SAFETY: the slot is valid for writes of one `$ty`.
                unsafe { slot.as_mut_ptr().write_bytes(0, 1) };
            }
        }
    )*};
}

zero_spare!(
    [] NonZeroU8, [] NonZeroU16, [] NonZeroU32, [] NonZeroU64, [] NonZeroU128, [] NonZeroUsize,
    [] NonZeroI8, [] NonZeroI16, [] NonZeroI32, [] NonZeroI64, [] NonZeroI128, [] NonZeroIsize,
    [T] NonNull<T>, ['a, T] &'a T, ['a, T] &'a mut T, [T] Box<T>,
);

/// The encoding of a [`Maybe<T, Tr>`].
pub(super) type EncodingOf<T, Tr> = <<Tr as Tombstone<T>>::Spare as SpareCount>::Encoding;

/// The storage of a [`Maybe<T, Tr>`].
pub(super) type StorageOf<T, Tr> = <EncodingOf<T, Tr> as Encoding>::Storage<T>;

// SAFETY: a tombstoned maybe offers the spare patterns of `T` above index 0,
// shifted down by one; a flagged maybe offers its flag values 2 to 255. In both
// cases the patterns are neither a value nor the "no value" state of the maybe,
// and they are exactly what `nested_spare_index` recognizes.
unsafe impl<T, Tr: Tombstone<T>> Tombstone<Maybe<T, Tr>> for Niches {
    type Spare = <Tr::Spare as SpareCount>::Nested;
    const SPARE_REPRESENTATIONS: usize = if <EncodingOf<T, Tr> as Encoding>::TOMBSTONED {
        Tr::SPARE_REPRESENTATIONS - 1
    } else {
        FLAG_SPARES
    };

    #[inline]
    unsafe fn spare_index(slot: &MaybeUninit<Maybe<T, Tr>>) -> Option<usize> {
        // `Maybe` is a transparent wrapper around its storage.
        let storage = slot.as_ptr().cast::<StorageOf<T, Tr>>();
        // SAFETY: `EncodingOf<T, Tr>` is the encoding selected by `Tr`.
        // 1. Guaranteed by the caller
        unsafe { <EncodingOf<T, Tr> as Encoding>::nested_spare_index::<T, Tr>(storage) }
    }

    #[inline]
    unsafe fn set_spare_representation(slot: &mut MaybeUninit<Maybe<T, Tr>>, index: usize) {
        let storage = slot.as_mut_ptr().cast::<StorageOf<T, Tr>>();
        // SAFETY: `EncodingOf<T, Tr>` is the encoding selected by `Tr`.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { <EncodingOf<T, Tr> as Encoding>::set_nested_spare::<T, Tr>(storage, index) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spare_of<T, Tr: Tombstone<T>>(index: usize) -> Option<usize> {
        let mut slot = MaybeUninit::<T>::uninit();
        // SAFETY: the slot is vacant and the caller passes an index in range.
        unsafe { Tr::set_spare_representation(&mut slot, index) };
        // SAFETY: the slot holds a spare pattern.
        unsafe { Tr::spare_index(&slot) }
    }

    fn value_spare<T, Tr: Tombstone<T>>(value: T) -> Option<usize> {
        let slot = MaybeUninit::new(value);
        // SAFETY: the slot holds a valid `T`.
        unsafe { Tr::spare_index(&slot) }
    }

    #[test]
    fn test_bool_spares() {
        assert_eq!(spare_of::<bool, Niches>(0), Some(0));
        assert_eq!(spare_of::<bool, Niches>(253), Some(253));
        assert_eq!(value_spare::<bool, Niches>(true), None);
        assert_eq!(value_spare::<bool, Niches>(false), None);
    }

    #[test]
    fn test_char_spares() {
        assert_eq!(spare_of::<char, Niches>(0), Some(0));
        assert_eq!(spare_of::<char, Niches>(12345), Some(12345));
        assert_eq!(value_spare::<char, Niches>(char::MAX), None);
        assert_eq!(value_spare::<char, Niches>('\0'), None);
    }

    #[test]
    fn test_zero_spares() {
        assert_eq!(spare_of::<&u64, Niches>(0), Some(0));
        assert_eq!(value_spare::<&u64, Niches>(&5), None);
        assert_eq!(spare_of::<NonZeroU16, Niches>(0), Some(0));
        assert_eq!(value_spare::<NonZeroU16, Niches>(NonZeroU16::MIN), None);
    }

    #[test]
    fn test_nested_counts() {
        assert_eq!(<Niches as Tombstone<Maybe<bool>>>::SPARE_REPRESENTATIONS, 253);
        assert_eq!(<Niches as Tombstone<Maybe<Maybe<bool>>>>::SPARE_REPRESENTATIONS, 252);
        assert_eq!(<Niches as Tombstone<Maybe<u32>>>::SPARE_REPRESENTATIONS, FLAG_SPARES);
        assert_eq!(<Niches as Tombstone<Maybe<&u8>>>::SPARE_REPRESENTATIONS, 0);
    }

    #[test]
    fn test_nested_patterns_skip_inner_none() {
        assert_eq!(spare_of::<Maybe<bool>, Niches>(0), Some(0));
        assert_eq!(value_spare::<Maybe<bool>, Niches>(Maybe::none()), None);
        assert_eq!(value_spare::<Maybe<bool>, Niches>(Maybe::some(true)), None);

        assert_eq!(spare_of::<Maybe<u32>, Niches>(7), Some(7));
        assert_eq!(value_spare::<Maybe<u32>, Niches>(Maybe::none()), None);
        assert_eq!(value_spare::<Maybe<u32>, Niches>(Maybe::some(0)), None);
    }
}
