//! Visitation of one or more tagged unions through a flat thunk table.
//!
//! A visit over operands `O0 .. O(K-1)` looks up a single function pointer
//! in a table with one thunk per combination of the operands' alternatives.
//! The table is a compile-time constant per visitor, result type and operand
//! tuple; the lookup index is computed from the operands' active indices in
//! mixed radix (see [`table`](self::table) for the layout), so the cost of a
//! visit does not depend on the number of alternatives.
//!
//! The visitor, the operand storages and the result slot are passed to the
//! thunks as erased pointers. Each thunk casts them back to the types it was
//! generated for, extracts its combination through [`Extract`] and hands it to
//! [`Visit::visit`].

mod operand;
mod table;

use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::NonNull;

pub use self::{
    operand::{Extract, Operand, Operands, divisors},
    table::{Convert, Exact, Fan, Pick, Resolve, Selection, Table, Thunk, Visit},
};
use crate::{flat::FlatArray, list::Nil, util::Erased};

/// Returns the number of thunks generated for visiting operands `U` with
/// visitor `V`, resolving outputs to `R` with policy `P`.
pub fn thunk_count<V, U, R, P>() -> usize
where
    U: Operands,
    U::Reversed: Table<V, R, P, Nil>,
{
    <<U::Reversed as Table<V, R, P, Nil>>::Thunks as FlatArray<Thunk>>::LEN
}

/// Calls `visitor` with the active alternatives of `operands`.
///
/// Returns `None` without calling the visitor if any operand is valueless.
/// Owned operands are consumed: their active values are moved into the
/// visitor's arguments, and owned operands are dropped as usual when `None` is
/// returned.
pub fn dispatch<V, U, R, P>(visitor: &mut V, operands: U) -> Option<R>
where
    U: Operands,
    U::Reversed: Table<V, R, P, Nil>,
{
    let index = operands.flat_index()?;
    let thunk = <U::Reversed as Table<V, R, P, Nil>>::THUNKS.get(index);
    let mut operands = ManuallyDrop::new(operands);
    let storages = operands.storages();
    let mut result = MaybeUninit::<R>::uninit();
    // SAFETY: `thunk` was generated for `V`, `R` and the combination at `index`,
    // which is the combination the operands currently hold:
    // 1. `visitor` is a unique reference to a `V`
    // 2. `storages` holds the operands' storages in order; the operands are never
    //    dropped, so owned values are moved out exactly once
    // 3. `result` is valid for writes of an `R`
    unsafe {
        thunk(
            NonNull::from(visitor).cast::<Erased>(),
            storages.as_ref(),
            NonNull::from(&mut result).cast::<Erased>(),
        );
    }
    // SAFETY: the thunk wrote the result before returning.
    Some(unsafe { result.assume_init() })
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec, vec::Vec};

    use super::*;
    use crate::{list::Cons, variant::RawVariant};

    type Two = Cons<u8, Cons<&'static str, Nil>>;
    type Three = Cons<i16, Cons<char, Cons<bool, Nil>>>;

    fn two(index: usize) -> RawVariant<Two> {
        match index {
            // SAFETY: alternative 0 is `u8`.
            0 => unsafe { RawVariant::new(0, 7u8) },
            // SAFETY: alternative 1 is `&str`.
            _ => unsafe { RawVariant::new(1, "seven") },
        }
    }

    fn three(index: usize) -> RawVariant<Three> {
        match index {
            // SAFETY: alternative 0 is `i16`.
            0 => unsafe { RawVariant::new(0, -7i16) },
            // SAFETY: alternative 1 is `char`.
            1 => unsafe { RawVariant::new(1, 'z') },
            // SAFETY: alternative 2 is `bool`.
            _ => unsafe { RawVariant::new(2, true) },
        }
    }

    /// Reports the alternatives it was called with.
    struct Names;

    impl<A, B> Visit<(&A, &B)> for Names {
        type Output = (&'static str, &'static str);

        fn visit(&mut self, _: (&A, &B)) -> Self::Output {
            (core::any::type_name::<A>(), core::any::type_name::<B>())
        }
    }

    #[test]
    fn test_table_has_one_thunk_per_combination() {
        type Pair<'a> = (&'a RawVariant<Two>, &'a RawVariant<Three>);
        assert_eq!(
            thunk_count::<Names, Pair<'_>, (&'static str, &'static str), Exact>(),
            6
        );
        assert_eq!(<Pair<'_> as Operands>::COMBINATIONS, 6);
    }

    #[test]
    fn test_first_operand_varies_fastest() {
        for j in 0..3 {
            for i in 0..2 {
                let (a, b) = (two(i), three(j));
                assert_eq!((&a, &b).flat_index(), Some(i + j * 2));
            }
        }
    }

    #[test]
    fn test_every_combination_reaches_its_thunk() {
        let names = ["u8", "&str"];
        let others = ["i16", "char", "bool"];
        for j in 0..3 {
            for i in 0..2 {
                let (a, b) = (two(i), three(j));
                let (first, second) = dispatch::<_, _, _, Exact>(&mut Names, (&a, &b)).unwrap();
                assert_eq!(first, names[i]);
                assert_eq!(second, others[j]);
            }
        }
    }

    #[test]
    fn test_valueless_operand_skips_visit() {
        let a = two(0);
        let mut b = three(2);
        b.destroy();
        assert_eq!((&a, &b).flat_index(), None);
        assert!(dispatch::<_, _, (&str, &str), Exact>(&mut Names, (&a, &b)).is_none());
    }

    /// Doubles numbers in place and records what it saw.
    struct Double(Vec<&'static str>);

    impl Visit<&mut u8> for Double {
        type Output = ();

        fn visit(&mut self, value: &mut u8) {
            *value *= 2;
            self.0.push("u8");
        }
    }

    impl Visit<&mut &'static str> for Double {
        type Output = ();

        fn visit(&mut self, _: &mut &'static str) {
            self.0.push("str");
        }
    }

    #[test]
    fn test_mutable_operand() {
        let mut visitor = Double(Vec::new());
        let mut a = two(0);
        dispatch::<_, _, (), Exact>(&mut visitor, (&mut a,));
        dispatch::<_, _, (), Exact>(&mut visitor, (&mut a,));
        let mut b = two(1);
        dispatch::<_, _, (), Exact>(&mut visitor, (&mut b,));
        // SAFETY: alternative 0 is active.
        assert_eq!(unsafe { *a.get_unchecked::<u8>() }, 28);
        assert_eq!(visitor.0, vec!["u8", "u8", "str"]);
    }

    /// Widens any alternative to a `u32` through different output types.
    struct Widen;

    impl Visit<u8> for Widen {
        type Output = u8;

        fn visit(&mut self, value: u8) -> u8 {
            value
        }
    }

    impl Visit<u16> for Widen {
        type Output = u16;

        fn visit(&mut self, value: u16) -> u16 {
            value + 1000
        }
    }

    #[test]
    fn test_owned_operand_with_converted_output() {
        type Small = Cons<u8, Cons<u16, Nil>>;
        // SAFETY: alternative 0 is `u8`.
        let a: RawVariant<Small> = unsafe { RawVariant::new(0, 5u8) };
        // SAFETY: alternative 1 is `u16`.
        let b: RawVariant<Small> = unsafe { RawVariant::new(1, 5u16) };
        assert_eq!(dispatch::<_, _, u32, Convert>(&mut Widen, (a,)), Some(5));
        assert_eq!(dispatch::<_, _, u32, Convert>(&mut Widen, (b,)), Some(1005));
    }

    /// Takes ownership of strings.
    struct Collect(Vec<String>);

    impl Visit<String> for Collect {
        type Output = ();

        fn visit(&mut self, value: String) {
            self.0.push(value);
        }
    }

    impl Visit<u8> for Collect {
        type Output = ();

        fn visit(&mut self, _: u8) {}
    }

    #[test]
    fn test_owned_operand_moves_value_once() {
        type List = Cons<String, Cons<u8, Nil>>;
        let mut visitor = Collect(Vec::new());
        // SAFETY: alternative 0 is `String`.
        let raw: RawVariant<List> = unsafe { RawVariant::new(0, String::from("moved")) };
        dispatch::<_, _, (), Exact>(&mut visitor, (raw,));
        assert_eq!(visitor.0, vec![String::from("moved")]);
    }
}
