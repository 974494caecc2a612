//! Compile-time generated arrays of function pointers.
//!
//! Stable Rust cannot name an array whose length is computed from generic
//! parameters, yet both the per-alternative operation rows of a union and the
//! thunk table of the visitation engine have exactly that shape. They are
//! therefore assembled as nested `#[repr(C)]` pairs of [`Leaf`] entries. Such a
//! nest has the same layout as `[E; LEN]`, and [`FlatArray`] recovers the
//! array view by reading the entries through a pointer to the first one.
//!
//! # Safety Invariant
//!
//! [`FlatArray`] is only implemented for `()`, [`Leaf<E>`] and [`Concat`] of
//! two flat arrays over the same `E`, so every implementor is a contiguous run
//! of `E` values without padding. [`FlatArray::get`] additionally checks the
//! size relation at compile time before indexing.

use core::mem::size_of;

/// A single table entry.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Leaf<E>(pub E);

/// Two tables laid out back to back.
///
/// With `#[repr(C)]` the second half starts right after the first. Since both
/// halves are made of the same entry type, no padding is ever inserted.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct Concat<A, B>(pub A, pub B);

/// A contiguous array of `E` spelled as a nest of [`Leaf`] and [`Concat`].
///
/// # Safety
///
/// Implementors must have the exact layout of `[E; Self::LEN]`. This crate
/// provides the only implementations and they uphold this by construction.
pub unsafe trait FlatArray<E: Copy>: Copy {
    /// The number of entries.
    const LEN: usize;

    /// Returns the entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::LEN`.
    #[inline]
    fn get(&self, index: usize) -> E {
        const {
            assert!(size_of::<Self>() == Self::LEN * size_of::<E>());
        }
        assert!(index < Self::LEN, "table index out of bounds");

        let first: *const E = core::ptr::from_ref(self).cast::<E>();
        // SAFETY: `index < Self::LEN` was checked above and `Self` has the
        // layout of `[E; Self::LEN]` by the safety contract of this trait, so
        // the offset stays within the same allocation.
        let entry: *const E = unsafe { first.add(index) };
        // SAFETY: `entry` points at an initialized `E` inside `self`.
        unsafe { *entry }
    }
}

// SAFETY: `()` is the empty array.
unsafe impl<E: Copy> FlatArray<E> for () {
    const LEN: usize = 0;
}

// SAFETY: `Leaf<E>` is `#[repr(transparent)]` over a single `E`.
unsafe impl<E: Copy> FlatArray<E> for Leaf<E> {
    const LEN: usize = 1;
}

// SAFETY: `Concat` is `#[repr(C)]`, so `B` directly follows `A`. Both are flat
// arrays of `E`, so their sizes are multiples of `size_of::<E>()` and their
// alignment is that of `E` (or 1 for `()`), which leaves no padding.
unsafe impl<E: Copy, A: FlatArray<E>, B: FlatArray<E>> FlatArray<E> for Concat<A, B> {
    const LEN: usize = A::LEN + B::LEN;
}
