//! Operands of the visitation engine.
//!
//! An [`Operand`] is a tagged union passed to the engine in one of three ways:
//! by shared reference, by mutable reference, or by value. [`Extract`] turns
//! the storage of an operand into the argument the visitor receives for one of
//! its alternatives. [`Operands`] groups one to four operands into a tuple and
//! computes the flat index of their current combination.

use core::ptr::NonNull;

use crate::{
    dispatch::table::{Pick, Selection},
    list::{AltList, Cons, Nil, NonEmpty},
    ops::Lifecycle,
    util::Erased,
    variant::RawVariant,
};

/// A tagged union taking part in a visitation.
///
/// # Safety
///
/// Implementors must guarantee that, unless [`Operand::index`] is out of
/// range, [`Operand::storage`] returns the address of a live value of that
/// alternative of [`Operand::Alternatives`], which stays valid for as long as
/// the arguments produced by [`Extract`] may be used.
pub unsafe trait Operand {
    /// The alternatives of the union.
    type Alternatives: NonEmpty;

    /// Returns the index of the active alternative, or a value of at least
    /// `Self::Alternatives::COUNT` when the union is valueless.
    fn index(&self) -> usize;

    /// Returns the address of the union's storage.
    ///
    /// Operands passed by value are never dropped after this is called; their
    /// active value is moved out by [`Extract::extract`] instead.
    fn storage(&mut self) -> NonNull<Erased>;
}

/// Extraction of alternative `T` from the storage of an operand.
///
/// # Safety
///
/// [`Extract::extract`] may only read the storage as a live `T`.
pub unsafe trait Extract<T>: Operand {
    /// The argument passed to the visitor for alternative `T`.
    type Arg;

    /// Turns the storage into the visitor's argument.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `storage` was returned by [`Operand::storage`] on an operand whose
    ///    active alternative is `T`.
    /// 2. The storage is extracted at most once.
    unsafe fn extract(storage: NonNull<Erased>) -> Self::Arg;
}

// SAFETY: the storage of a `RawVariant` holds a live value of alternative
// `index()` unless it is `VALUELESS`, which is out of range. The reference keeps
// it alive for `'a`.
unsafe impl<'a, L: Lifecycle + NonEmpty> Operand for &'a RawVariant<L> {
    type Alternatives = L;

    #[inline]
    fn index(&self) -> usize {
        RawVariant::index(self)
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        RawVariant::storage(self)
    }
}

// SAFETY: the storage is only read through a shared reference to a `T`.
unsafe impl<'a, L: Lifecycle + NonEmpty, T: 'a> Extract<T> for &'a RawVariant<L> {
    type Arg = &'a T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> &'a T {
        // SAFETY:
        // 1. Guaranteed by the caller, and the union is borrowed for `'a`
        unsafe { storage.cast::<T>().as_ref() }
    }
}

// SAFETY: as for shared references; the unique borrow is moved into the
// operand tuple, so nothing else accesses the union for `'a`.
unsafe impl<'a, L: Lifecycle + NonEmpty> Operand for &'a mut RawVariant<L> {
    type Alternatives = L;

    #[inline]
    fn index(&self) -> usize {
        RawVariant::index(self)
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        RawVariant::storage_mut(self)
    }
}

// SAFETY: the storage is only accessed through a unique reference to a `T`.
unsafe impl<'a, L: Lifecycle + NonEmpty, T: 'a> Extract<T> for &'a mut RawVariant<L> {
    type Arg = &'a mut T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> &'a mut T {
        let mut ptr = storage.cast::<T>();
        // SAFETY:
        // 1. Guaranteed by the caller, and the union is uniquely borrowed for `'a`
        // 2. Guaranteed by the caller, so this is the only reference
        unsafe { ptr.as_mut() }
    }
}

// SAFETY: an owned union is never dropped once its storage was handed out, so
// the active value stays live until `extract` moves it out.
unsafe impl<L: Lifecycle + NonEmpty> Operand for RawVariant<L> {
    type Alternatives = L;

    #[inline]
    fn index(&self) -> usize {
        RawVariant::index(self)
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        self.storage_mut()
    }
}

// SAFETY: the storage is read once as a `T`, moving the value out.
unsafe impl<L: Lifecycle + NonEmpty, T> Extract<T> for RawVariant<L> {
    type Arg = T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> T {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller, and the union is never dropped
        unsafe { storage.cast::<T>().read() }
    }
}

/// Returns the mixed-radix divisors for unions with the given alternative
/// counts: `1` for the first one and the product of all previous counts for
/// every later one.
pub const fn divisors<const K: usize>(counts: [usize; K]) -> [usize; K] {
    let mut divisors = [1; K];
    let mut k = 1;
    while k < K {
        divisors[k] = divisors[k - 1] * counts[k - 1];
        k += 1;
    }
    divisors
}

/// A tuple of one to four operands.
///
/// # Safety
///
/// [`Operands::flat_index`] must return `Some` only when every operand's index
/// is in range, and then the mixed-radix index of the combination with the
/// first operand varying fastest. [`Operands::storages`] must return the
/// operands' storages in order.
pub unsafe trait Operands: Sized {
    /// The operands as a list, last operand first.
    type Reversed;
    /// The combination of every operand's first alternative.
    type First: Selection;
    /// The storages of the operands.
    type Storages: AsRef<[NonNull<Erased>]>;
    /// The number of combinations of alternatives.
    const COMBINATIONS: usize;

    /// Returns the flat index of the current combination, or `None` if any
    /// operand is valueless.
    fn flat_index(&self) -> Option<usize>;

    /// Returns the storages of the operands, in order.
    fn storages(&mut self) -> Self::Storages;
}

/// Spells a type-level list.
macro_rules! list {
    () => { Nil };
    ($head:ty $(, $tail:ty)*) => { Cons<$head, list!($($tail),*)> };
}

/// Implements [`Operands`] for a tuple.
macro_rules! operands {
    ($len:literal; [$($operand:ident $index:tt),+]; reversed [$($reversed:ident),+]) => {
        // SAFETY: the index is range checked per operand and folded with the
        // divisors of `divisors`; the storages are collected in operand order.
        unsafe impl<$($operand),+> Operands for ($($operand,)+)
        where
            $($operand: Operand + Extract<<<$operand as Operand>::Alternatives as NonEmpty>::Head>,)+
        {
            type Reversed = list!($($reversed),+);
            type First = list!($(Pick<$operand, <<$operand as Operand>::Alternatives as NonEmpty>::Head>),+);
            type Storages = [NonNull<Erased>; $len];
            const COMBINATIONS: usize = 1 $(* <<$operand as Operand>::Alternatives as AltList>::COUNT)+;

            #[inline]
            fn flat_index(&self) -> Option<usize> {
                let divisors = const {
                    divisors([$(<<$operand as Operand>::Alternatives as AltList>::COUNT),+])
                };
                let mut flat = 0;
                $(
                    let index = Operand::index(&self.$index);
                    if index >= <<$operand as Operand>::Alternatives as AltList>::COUNT {
                        return None;
                    }
                    flat += index * divisors[$index];
                )+
                Some(flat)
            }

            #[inline]
            fn storages(&mut self) -> Self::Storages {
                [$(Operand::storage(&mut self.$index)),+]
            }
        }
    };
}

operands!(1; [O0 0]; reversed [O0]);
operands!(2; [O0 0, O1 1]; reversed [O1, O0]);
operands!(3; [O0 0, O1 1, O2 2]; reversed [O2, O1, O0]);
operands!(4; [O0 0, O1 1, O2 2, O3 3]; reversed [O3, O2, O1, O0]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisors() {
        assert_eq!(divisors([2]), [1]);
        assert_eq!(divisors([2, 3]), [1, 2]);
        assert_eq!(divisors([2, 3, 4]), [1, 2, 6]);
        assert_eq!(divisors::<0>([]), []);
    }
}
