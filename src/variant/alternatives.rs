//! Tuples of alternatives and the lookups a [`Variant`](crate::Variant) needs
//! on them.

use polyvalue_internals::{
    list::{Cons, NonEmpty, Nil},
    ops::Lifecycle,
};

/// Sealing for [`Alternatives`].
mod sealed {
    /// Implemented for the tuples that implement [`Alternatives`](super::Alternatives).
    pub trait Sealed {}
}

/// A tuple of 1 to 8 types that a [`Variant`](crate::Variant) chooses from.
///
/// This trait is sealed and implemented for tuples only.
pub trait Alternatives: sealed::Sealed {
    /// The alternatives as a type-level list.
    #[doc(hidden)]
    type List: NonEmpty + Lifecycle;
}

/// Alternative `I` of a tuple of alternatives.
pub trait At<const I: usize>: Alternatives {
    /// The type of alternative `I`.
    type Type;
}

/// Marks the position at which [`Locate`] found a type.
///
/// It only exists to tell the impls of [`Locate`] apart; callers leave it to
/// inference.
#[derive(Clone, Copy, Debug)]
pub struct Position<const I: usize>;

/// The position of `T` among a tuple of alternatives.
///
/// `M` is inferred. When `T` occurs more than once in the tuple inference
/// fails, so selecting an alternative by type is only possible when the type
/// picks it unambiguously.
pub trait Locate<T, M>: Alternatives {
    /// The index of `T`.
    const INDEX: usize;
}

/// A unit alternative that makes a union default-constructible.
///
/// ```
/// use polyvalue::{Monostate, Variant};
///
/// struct NoDefault(u8);
///
/// let union: Variant<(Monostate, NoDefault)> = Variant::default();
/// assert_eq!(union.index(), 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monostate;

/// Spells a type-level list.
macro_rules! list {
    () => { Nil };
    ($head:ident $(, $tail:ident)*) => { Cons<$head, list!($($tail),*)> };
}

/// Implements [`Alternatives`], [`At`] and [`Locate`] for a tuple.
macro_rules! alternatives {
    (@position [$($all:ident),+] $ty:ident $index:tt) => {
        impl<$($all),+> At<$index> for ($($all,)+) {
            type Type = $ty;
        }

        impl<$($all),+> Locate<$ty, Position<$index>> for ($($all,)+) {
            const INDEX: usize = $index;
        }
    };
    (@positions $all:tt $($ty:ident $index:tt),+) => {
        $(alternatives!(@position $all $ty $index);)+
    };
    ($($ty:ident $index:tt),+) => {
        impl<$($ty),+> sealed::Sealed for ($($ty,)+) {}

        impl<$($ty),+> Alternatives for ($($ty,)+) {
            type List = list!($($ty),+);
        }

        alternatives!(@positions [$($ty),+] $($ty $index),+);
    };
}

alternatives!(T0 0);
alternatives!(T0 0, T1 1);
alternatives!(T0 0, T1 1, T2 2);
alternatives!(T0 0, T1 1, T2 2, T3 3);
alternatives!(T0 0, T1 1, T2 2, T3 3, T4 4);
alternatives!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
alternatives!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
alternatives!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);

#[cfg(test)]
mod tests {
    use polyvalue_internals::list::AltList;

    use super::*;

    fn index_of<A: Locate<T, M>, T, M>() -> usize {
        A::INDEX
    }

    #[test]
    fn test_locate() {
        assert_eq!(index_of::<(u8, u16, u32), u32, _>(), 2);
        assert_eq!(index_of::<(u8,), u8, _>(), 0);
        assert_eq!(
            index_of::<(u8, u16, u32, u64, i8, i16, i32, i64), i64, _>(),
            7
        );
    }

    #[test]
    fn test_count() {
        assert_eq!(<<(u8, char) as Alternatives>::List as AltList>::COUNT, 2);
        assert_eq!(
            <<(u8, u16, u32, u64, i8, i16, i32, i64) as Alternatives>::List as AltList>::COUNT,
            8
        );
    }

    static_assertions::assert_type_eq_all!(<(u8, char, bool) as At<1>>::Type, char);
}
