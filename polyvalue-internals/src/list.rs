//! Type-level lists of alternatives.
//!
//! A tagged union is parameterized by a list of alternative types, spelled as
//! `Cons<A, Cons<B, Nil>>`. The list drives three things at compile time:
//!
//! - [`AltList::Slot`]: a union of all alternatives, which is the storage of
//!   the tagged union and is as large and as aligned as its largest member;
//! - [`AltList::COUNT`] and [`AltList::NEEDS_DROP`]: facts folded over every
//!   alternative;
//! - [`Row`]: one flat table per operation kind with an entry per alternative,
//!   which is how a union dispatches lifecycle operations on its active
//!   alternative.
//!
//! The same [`Cons`]/[`Nil`] types also spell the list of operands of the
//! visitation engine, see [`dispatch`](crate::dispatch).

use core::{
    convert::Infallible,
    marker::PhantomData,
    mem::{ManuallyDrop, needs_drop},
};

use crate::flat::{Concat, FlatArray, Leaf};

/// The empty list.
///
/// Lists only exist at the type level, so this type has no values.
#[derive(Clone, Copy, Debug)]
pub enum Nil {}

/// A list with head `H` and tail `T`.
///
/// Lists only exist at the type level, so this type has no values.
pub struct Cons<H, T> {
    /// Makes the type uninhabited.
    _never: Infallible,
    /// Ties the type parameters to the list without owning them.
    _marker: PhantomData<(fn() -> H, fn() -> T)>,
}

/// Storage able to hold any one alternative of a list.
///
/// The fields are never read by name; values are accessed through a pointer to
/// the whole slot, which is valid since `#[repr(C)]` places every field at
/// offset zero.
#[repr(C)]
pub union Slot<H, T> {
    /// Room for the head alternative.
    head: ManuallyDrop<H>,
    /// Room for any alternative of the tail.
    tail: ManuallyDrop<T>,
}

/// A type-level list of alternatives.
///
/// # Safety
///
/// Implementors must make [`AltList::Slot`] large and aligned enough for every
/// alternative, with every alternative stored at offset zero. [`COUNT`] must
/// be the number of alternatives. Only [`Nil`] and [`Cons`] implement this.
///
/// [`COUNT`]: AltList::COUNT
pub unsafe trait AltList {
    /// The number of alternatives.
    const COUNT: usize;
    /// Whether destroying any alternative runs code.
    const NEEDS_DROP: bool;
    /// Storage for one value of any alternative.
    type Slot;
}

// SAFETY: the empty list has no alternatives and `()` satisfies no layout
// requirements, which is all that is needed.
unsafe impl AltList for Nil {
    const COUNT: usize = 0;
    const NEEDS_DROP: bool = false;
    type Slot = ();
}

// SAFETY: `Slot<H, T::Slot>` is a `#[repr(C)]` union, so it is large and aligned
// enough for `H` and for every alternative `T::Slot` accommodates, all of them
// at offset zero.
unsafe impl<H, T: AltList> AltList for Cons<H, T> {
    const COUNT: usize = 1 + T::COUNT;
    const NEEDS_DROP: bool = needs_drop::<H>() || T::NEEDS_DROP;
    type Slot = Slot<H, T::Slot>;
}

/// A list with at least one alternative.
pub trait NonEmpty: AltList {
    /// The first alternative.
    type Head;
}

impl<H, T: AltList> NonEmpty for Cons<H, T> {
    type Head = H;
}

/// A kind of per-alternative operation, such as destroying or cloning.
pub trait Kind {
    /// The function pointer type stored for each alternative.
    type Entry: Copy;
}

/// Provides the entry of operation kind `Self` for the alternative type `T`.
///
/// Kinds that need a capability only implement this for types that have it,
/// so a [`Row`] exists exactly when every alternative has the capability.
pub trait EntryFor<T>: Kind {
    /// The entry for `T`.
    const ENTRY: Self::Entry;
}

/// One flat table of operation kind `K` with one entry per alternative.
///
/// # Safety
///
/// Entry `i` of [`Row::ENTRIES`] must be `<K as EntryFor<T>>::ENTRY` where `T`
/// is alternative `i` of the list.
pub unsafe trait Row<K: Kind>: AltList {
    /// The layout of the table.
    type Entries: FlatArray<K::Entry>;
    /// The table itself.
    const ENTRIES: Self::Entries;
}

// SAFETY: the empty list has no entries.
unsafe impl<K: Kind> Row<K> for Nil {
    type Entries = ();
    const ENTRIES: () = ();
}

// SAFETY: the entry of the head comes first, followed by the entries of the
// tail, which are in order by induction.
unsafe impl<K, H, T> Row<K> for Cons<H, T>
where
    K: EntryFor<H>,
    T: Row<K>,
{
    type Entries = Concat<Leaf<K::Entry>, T::Entries>;
    const ENTRIES: Self::Entries = Concat(Leaf(<K as EntryFor<H>>::ENTRY), T::ENTRIES);
}

/// Looks up the entry of operation kind `K` for alternative `index` of `L`.
///
/// # Panics
///
/// Panics if `index >= L::COUNT`.
#[inline]
pub fn entry<K: Kind, L: Row<K>>(index: usize) -> K::Entry {
    L::ENTRIES.get(index)
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::mem::{align_of, size_of};

    use super::*;

    type Three = Cons<u8, Cons<String, Cons<u64, Nil>>>;

    enum Width {}

    impl Kind for Width {
        type Entry = usize;
    }

    impl<T> EntryFor<T> for Width {
        const ENTRY: usize = size_of::<T>();
    }

    #[test]
    fn test_count() {
        assert_eq!(<Nil as AltList>::COUNT, 0);
        assert_eq!(<Cons<u8, Nil> as AltList>::COUNT, 1);
        assert_eq!(<Three as AltList>::COUNT, 3);
    }

    #[test]
    fn test_needs_drop() {
        assert!(!<Cons<u8, Cons<u64, Nil>> as AltList>::NEEDS_DROP);
        assert!(<Three as AltList>::NEEDS_DROP);
    }

    #[test]
    fn test_slot_layout() {
        type S = <Three as AltList>::Slot;
        assert_eq!(size_of::<S>(), size_of::<String>());
        assert_eq!(align_of::<S>(), align_of::<u64>().max(align_of::<String>()));
    }

    #[test]
    fn test_row_entries_in_order() {
        assert_eq!(entry::<Width, Three>(0), 1);
        assert_eq!(entry::<Width, Three>(1), size_of::<String>());
        assert_eq!(entry::<Width, Three>(2), 8);
        assert_eq!(<<Three as Row<Width>>::Entries as FlatArray<usize>>::LEN, 3);
    }

    #[test]
    #[should_panic]
    fn test_row_out_of_range() {
        let _ = entry::<Width, Three>(3);
    }
}
