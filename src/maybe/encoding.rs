//! The two storage layouts of a [`Maybe`](crate::Maybe).
//!
//! - [`Tombstoned`]: the storage is exactly a `T`, and "no value" is spare
//!   pattern 0 of `T`. An enclosing maybe uses the spare patterns from 1 on,
//!   shifted down by one.
//! - [`Flagged`]: the storage is a `T` followed by a flag byte, `0` for no
//!   value and `1` for a value. An enclosing maybe uses the flag values from 2
//!   on.
//!
//! The layout is selected at compile time by the
//! [`SpareCount`](crate::maybe::SpareCount) of the value
//! type's traits, so no [`Maybe`](crate::Maybe) carries both.

use core::mem::MaybeUninit;

use crate::maybe::tombstone::{FLAG_SPARES, Tombstone};

/// A storage layout of a [`Maybe`](crate::Maybe).
///
/// # Safety
///
/// Implementors must ensure that [`Encoding::Storage`] holds either a value,
/// the "no value" state, or one of the nested spare patterns, and that the
/// methods below tell those states apart as documented.
pub unsafe trait Encoding {
    /// Whether "no value" is a spare pattern of the value type.
    const TOMBSTONED: bool;

    /// The storage of a maybe of `T`.
    type Storage<T>;

    /// Creates storage in the "no value" state.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `Self` is the encoding selected by `Tr::Spare`.
    unsafe fn none<T, Tr: Tombstone<T>>() -> Self::Storage<T>;

    /// Creates storage holding `value`.
    fn some<T>(value: T) -> Self::Storage<T>;

    /// Returns the slot of the value.
    fn slot<T>(storage: &Self::Storage<T>) -> &MaybeUninit<T>;

    /// Returns the slot of the value, for writing.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Only valid values of `T` are written through the slot, unless the
    ///    state is updated with [`Encoding::mark_none`] afterwards.
    unsafe fn slot_mut<T>(storage: &mut Self::Storage<T>) -> &mut MaybeUninit<T>;

    /// Returns whether the storage holds a value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `Self` is the encoding selected by `Tr::Spare`.
    /// 2. The storage holds a value or the "no value" state.
    unsafe fn is_some<T, Tr: Tombstone<T>>(storage: &Self::Storage<T>) -> bool;

    /// Puts the storage in the "no value" state.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `Self` is the encoding selected by `Tr::Spare`.
    /// 2. The slot holds no live value.
    unsafe fn mark_none<T, Tr: Tombstone<T>>(storage: &mut Self::Storage<T>);

    /// Marks the value written into the slot as present.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A valid `T` was just written into the slot.
    unsafe fn mark_some<T>(storage: &mut Self::Storage<T>);

    /// Returns the index of the nested spare pattern held by `storage`, or
    /// `None` if it holds a value or the "no value" state.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `Self` is the encoding selected by `Tr::Spare`.
    /// 2. `storage` points to storage holding a value, the "no value" state,
    ///    or a pattern written by [`Encoding::set_nested_spare`].
    unsafe fn nested_spare_index<T, Tr: Tombstone<T>>(storage: *const Self::Storage<T>)
    -> Option<usize>;

    /// Writes nested spare pattern `index` into `storage`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `Self` is the encoding selected by `Tr::Spare`.
    /// 2. `index` is below the nested spare count: the spare count of `Tr`
    ///    minus one when tombstoned, [`FLAG_SPARES`] when flagged.
    /// 3. `storage` is valid for writes and holds no live value.
    unsafe fn set_nested_spare<T, Tr: Tombstone<T>>(storage: *mut Self::Storage<T>, index: usize);
}

/// "No value" is spare pattern 0 of the value type.
#[derive(Clone, Copy, Debug)]
pub enum Tombstoned {}

// SAFETY: spare pattern 0 is "no value", any other spare pattern `i` is nested
// spare `i - 1`, and a valid `T` is a value; these never overlap by the
// contract of `Tombstone`.
unsafe impl Encoding for Tombstoned {
    const TOMBSTONED: bool = true;

    type Storage<T> = MaybeUninit<T>;

    #[inline]
    unsafe fn none<T, Tr: Tombstone<T>>() -> MaybeUninit<T> {
        let mut slot = MaybeUninit::uninit();
        // SAFETY: the encoding is only selected for at least one spare pattern.
        // 1. Guaranteed by the caller, so index 0 exists
        // 2. The slot is fresh
        unsafe { Tr::set_spare_representation(&mut slot, 0) };
        slot
    }

    #[inline]
    fn some<T>(value: T) -> MaybeUninit<T> {
        MaybeUninit::new(value)
    }

    #[inline]
    fn slot<T>(storage: &MaybeUninit<T>) -> &MaybeUninit<T> {
        storage
    }

    #[inline]
    unsafe fn slot_mut<T>(storage: &mut MaybeUninit<T>) -> &mut MaybeUninit<T> {
        storage
    }

    #[inline]
    unsafe fn is_some<T, Tr: Tombstone<T>>(storage: &MaybeUninit<T>) -> bool {
        // SAFETY:
        // 1. The storage holds a value or spare pattern 0, guaranteed by the
        //    caller
        unsafe { Tr::spare_index(storage) }.is_none()
    }

    #[inline]
    unsafe fn mark_none<T, Tr: Tombstone<T>>(storage: &mut MaybeUninit<T>) {
        // SAFETY:
        // 1. Guaranteed by the caller, so index 0 exists
        // 2. Guaranteed by the caller
        unsafe { Tr::set_spare_representation(storage, 0) };
    }

    #[inline]
    unsafe fn mark_some<T>(_: &mut MaybeUninit<T>) {}

    #[inline]
    unsafe fn nested_spare_index<T, Tr: Tombstone<T>>(
        storage: *const MaybeUninit<T>,
    ) -> Option<usize> {
        // SAFETY: guaranteed by the caller, and `MaybeUninit` has no validity
        // requirements.
        let storage = unsafe { &*storage };
        // SAFETY:
        // 1. The storage holds a value or a spare pattern, guaranteed by the
        //    caller
        match unsafe { Tr::spare_index(storage) } {
            None | Some(0) => None,
            Some(index) => Some(index - 1),
        }
    }

    #[inline]
    unsafe fn set_nested_spare<T, Tr: Tombstone<T>>(storage: *mut MaybeUninit<T>, index: usize) {
        // SAFETY: guaranteed by the caller, and `MaybeUninit` has no validity
        // requirements.
        let storage = unsafe { &mut *storage };
        // SAFETY:
        // 1. Guaranteed by the caller, so `index + 1` is a spare of `Tr`
        // 2. Guaranteed by the caller
        unsafe { Tr::set_spare_representation(storage, index + 1) };
    }
}

/// Flag value of the "no value" state.
const FLAG_NONE: u8 = 0;
/// Flag value of a present value.
const FLAG_SOME: u8 = 1;
/// Flag value of nested spare pattern 0.
const FLAG_FIRST_SPARE: u8 = 2;

/// "No value" is a flag byte stored after the value.
#[derive(Clone, Copy, Debug)]
pub enum Flagged {}

/// Storage of a flagged maybe.
#[repr(C)]
pub struct FlaggedStorage<T> {
    /// Room for the value.
    value: MaybeUninit<T>,
    /// [`FLAG_SOME`] when `value` is live, [`FLAG_NONE`] when it is not, or a
    /// nested spare pattern from [`FLAG_FIRST_SPARE`] on.
    flag: u8,
}

// SAFETY: the flag tells the three states apart and is always initialized.
unsafe impl Encoding for Flagged {
    const TOMBSTONED: bool = false;

    type Storage<T> = FlaggedStorage<T>;

    #[inline]
    unsafe fn none<T, Tr: Tombstone<T>>() -> FlaggedStorage<T> {
        FlaggedStorage {
            value: MaybeUninit::uninit(),
            flag: FLAG_NONE,
        }
    }

    #[inline]
    fn some<T>(value: T) -> FlaggedStorage<T> {
        FlaggedStorage {
            value: MaybeUninit::new(value),
            flag: FLAG_SOME,
        }
    }

    #[inline]
    fn slot<T>(storage: &FlaggedStorage<T>) -> &MaybeUninit<T> {
        &storage.value
    }

    #[inline]
    unsafe fn slot_mut<T>(storage: &mut FlaggedStorage<T>) -> &mut MaybeUninit<T> {
        &mut storage.value
    }

    #[inline]
    unsafe fn is_some<T, Tr: Tombstone<T>>(storage: &FlaggedStorage<T>) -> bool {
        storage.flag == FLAG_SOME
    }

    #[inline]
    unsafe fn mark_none<T, Tr: Tombstone<T>>(storage: &mut FlaggedStorage<T>) {
        storage.flag = FLAG_NONE;
    }

    #[inline]
    unsafe fn mark_some<T>(storage: &mut FlaggedStorage<T>) {
        storage.flag = FLAG_SOME;
    }

    #[inline]
    unsafe fn nested_spare_index<T, Tr: Tombstone<T>>(
        storage: *const FlaggedStorage<T>,
    ) -> Option<usize> {
        // SAFETY: `storage` points to a live storage, guaranteed by the caller.
        let flag = unsafe { &raw const (*storage).flag };
        // SAFETY: the flag is initialized in every state.
        let flag = unsafe { flag.read() };
        (flag >= FLAG_FIRST_SPARE).then(|| usize::from(flag - FLAG_FIRST_SPARE))
    }

    #[inline]
    unsafe fn set_nested_spare<T, Tr: Tombstone<T>>(storage: *mut FlaggedStorage<T>, index: usize) {
        debug_assert!(index < FLAG_SPARES);
        // SAFETY: `storage` is valid for writes, guaranteed by the caller.
        let flag = unsafe { &raw mut (*storage).flag };
        // SAFETY: as above. The index is below `FLAG_SPARES`, so the flag does not
        // overflow.
        unsafe { flag.write(FLAG_FIRST_SPARE + index as u8) };
    }
}
