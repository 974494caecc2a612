//! Integration tests for the polyvalue-internals crate.
//!
//! ## Box Tests
//! - `test_box_inline_and_indirect_storage`: storage strategy per type and
//!   access through both strategies
//! - `test_box_drops_exactly_once`: every value stored in a box is dropped
//!   once, whatever path removed it
//! - `test_box_clone_panic_keeps_values`: a panicking clone leaves both the
//!   source and the assignment target holding their old values
//!
//! ## Union Tests
//! - `test_variant_emplace_panic_is_valueless`: a panicking constructor leaves
//!   the union valueless until the next successful emplace
//! - `test_variant_clone_panic_is_valueless`: a panicking clone during a
//!   cross-alternative copy leaves the target valueless
//! - `test_variant_drops_exactly_once`: lifecycle rows never double drop
//!
//! ## Visitation Tests
//! - `test_visit_three_operands`: mixed-radix lookup over three unions
//! - `test_visit_owned_and_borrowed_operands`: owned operands are consumed,
//!   borrowed ones left intact

use std::{
    cell::Cell,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
};

use polyvalue_internals::{
    RawBox, RawVariant, VALUELESS,
    capability::{Capabilities, INLINE_SIZE, fits_inline},
    dispatch::{Exact, Operands, Visit, dispatch},
    list::{Cons, Nil},
};

/// Increments a shared counter when dropped.
#[derive(Clone)]
struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Panics when cloned.
#[derive(Debug)]
struct CloneBomb;

impl Clone for CloneBomb {
    fn clone(&self) -> Self {
        panic!("clone bomb");
    }
}

#[test]
fn test_box_inline_and_indirect_storage() {
    assert!(fits_inline::<u64>());
    assert!(fits_inline::<[usize; 2]>());
    assert!(!fits_inline::<[usize; 3]>());
    assert_eq!(INLINE_SIZE, 2 * size_of::<usize>());

    let small = RawBox::new(7u64);
    let large = RawBox::new([1usize, 2, 3]);
    assert_eq!(small.capabilities(), Some(Capabilities::of::<u64>()));
    assert!(small.capabilities().is_some_and(|c| c.inline));
    assert!(large.capabilities().is_some_and(|c| !c.inline));
    assert_eq!(small.downcast_ref::<u64>(), Some(&7));
    assert_eq!(large.downcast_ref::<[usize; 3]>(), Some(&[1, 2, 3]));
    assert_eq!(large.downcast_ref::<u64>(), None);

    let mut copy = large.clone();
    copy.downcast_mut::<[usize; 3]>().unwrap()[0] = 10;
    assert_eq!(large.downcast_ref::<[usize; 3]>(), Some(&[1, 2, 3]));
    assert_eq!(copy.downcast_ref::<[usize; 3]>(), Some(&[10, 2, 3]));
}

#[test]
fn test_box_drops_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    let counter = || DropCounter(Rc::clone(&drops));

    let mut a = RawBox::new(counter());
    let mut b = RawBox::new(String::from("other"));
    a.swap(&mut b);
    a.swap(&mut b);
    assert_eq!(drops.get(), 0);

    let taken = a.take::<DropCounter>();
    assert!(!a.has_value());
    drop(taken);
    assert_eq!(drops.get(), 1);

    a.emplace(counter());
    a.emplace(5u8);
    assert_eq!(drops.get(), 2);

    let mut big = RawBox::new([counter(), counter(), counter()]);
    let copy = big.clone();
    big.reset();
    assert_eq!(drops.get(), 5);
    drop(copy);
    assert_eq!(drops.get(), 8);
}

#[test]
fn test_box_clone_panic_keeps_values() {
    let source = RawBox::new(CloneBomb);
    let result = catch_unwind(AssertUnwindSafe(|| source.clone()));
    assert!(result.is_err());
    assert!(source.is::<CloneBomb>());

    let mut target = RawBox::new(3u16);
    let result = catch_unwind(AssertUnwindSafe(|| target.clone_assign_from(&source)));
    assert!(result.is_err());
    assert_eq!(target.downcast_ref::<u16>(), Some(&3));
}

type Alternatives = Cons<String, Cons<CloneBomb, Cons<u32, Nil>>>;

#[test]
fn test_variant_emplace_panic_is_valueless() {
    // SAFETY: alternative 0 is `String`.
    let mut raw: RawVariant<Alternatives> = unsafe { RawVariant::new(0, String::from("ciao")) };
    let result = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: alternative 2 is `u32`.
        unsafe { raw.emplace_with::<u32, _>(2, || panic!("constructor failed")) };
    }));
    assert!(result.is_err());
    assert!(raw.is_valueless());
    assert_eq!(raw.index(), VALUELESS);
    assert_eq!(raw.type_name(), None);

    // SAFETY: alternative 2 is `u32`.
    unsafe { raw.emplace_with(2, || 9u32) };
    assert_eq!(raw.index(), 2);
}

#[test]
fn test_variant_clone_panic_is_valueless() {
    // SAFETY: alternative 1 is `CloneBomb`.
    let source: RawVariant<Alternatives> = unsafe { RawVariant::new(1, CloneBomb) };
    // SAFETY: alternative 2 is `u32`.
    let mut target: RawVariant<Alternatives> = unsafe { RawVariant::new(2, 4u32) };
    let result = catch_unwind(AssertUnwindSafe(|| target.clone_assign_from(&source)));
    assert!(result.is_err());
    assert!(target.is_valueless());
    assert_eq!(source.index(), 1);
}

#[test]
fn test_variant_drops_exactly_once() {
    type Counted = Cons<DropCounter, Cons<u8, Nil>>;
    let drops = Rc::new(Cell::new(0));
    let counter = || DropCounter(Rc::clone(&drops));

    // SAFETY: alternative 0 is `DropCounter`.
    let mut a: RawVariant<Counted> = unsafe { RawVariant::new(0, counter()) };
    // SAFETY: alternative 1 is `u8`.
    let mut b: RawVariant<Counted> = unsafe { RawVariant::new(1, 3u8) };
    a.swap(&mut b);
    b.swap(&mut a);
    assert_eq!(drops.get(), 0);

    let mut c = a.clone();
    c.move_assign_from(&mut b);
    assert_eq!(drops.get(), 1);
    assert!(b.is_valueless());

    drop(a);
    assert_eq!(drops.get(), 2);
    drop(b);
    drop(c);
    assert_eq!(drops.get(), 2);
}

/// Concatenates the debug output of three alternatives.
struct Join;

impl<A: std::fmt::Debug, B: std::fmt::Debug, C: std::fmt::Debug> Visit<(&A, &B, &C)> for Join {
    type Output = String;

    fn visit(&mut self, (a, b, c): (&A, &B, &C)) -> String {
        format!("{a:?}/{b:?}/{c:?}")
    }
}

#[test]
fn test_visit_three_operands() {
    type Ab = Cons<bool, Cons<char, Nil>>;
    type Abc = Cons<u8, Cons<i64, Cons<&'static str, Nil>>>;

    // SAFETY: each value matches its alternative index.
    let (first, second, third): (RawVariant<Ab>, RawVariant<Abc>, RawVariant<Ab>) = unsafe {
        (
            RawVariant::new(1, 'x'),
            RawVariant::new(2, "mid"),
            RawVariant::new(0, true),
        )
    };
    let operands = (&first, &second, &third);
    assert_eq!(<(&RawVariant<Ab>, &RawVariant<Abc>, &RawVariant<Ab>) as Operands>::COMBINATIONS, 12);
    assert_eq!(operands.flat_index(), Some(1 + 2 * 2));
    assert_eq!(
        dispatch::<_, _, String, Exact>(&mut Join, operands).as_deref(),
        Some("'x'/\"mid\"/true")
    );
}

/// Moves the owned operand into the visitor and reads the borrowed one.
#[derive(Default)]
struct Store(Vec<String>);

impl Visit<(String, &u32)> for Store {
    type Output = usize;

    fn visit(&mut self, (owned, borrowed): (String, &u32)) -> usize {
        self.0.push(owned);
        *borrowed as usize
    }
}

impl Visit<(u32, &u32)> for Store {
    type Output = usize;

    fn visit(&mut self, (owned, borrowed): (u32, &u32)) -> usize {
        (owned + borrowed) as usize
    }
}

impl Visit<(String, &String)> for Store {
    type Output = usize;

    fn visit(&mut self, (owned, borrowed): (String, &String)) -> usize {
        self.0.push(owned);
        borrowed.len()
    }
}

impl Visit<(u32, &String)> for Store {
    type Output = usize;

    fn visit(&mut self, (owned, borrowed): (u32, &String)) -> usize {
        owned as usize + borrowed.len()
    }
}

#[test]
fn test_visit_owned_and_borrowed_operands() {
    type Pair = Cons<String, Cons<u32, Nil>>;
    let mut store = Store::default();

    // SAFETY: alternative 0 is `String`, alternative 1 is `u32`.
    let (owned, borrowed): (RawVariant<Pair>, RawVariant<Pair>) = unsafe {
        (
            RawVariant::new(0, String::from("taken")),
            RawVariant::new(1, 40u32),
        )
    };
    let result = dispatch::<_, _, usize, Exact>(&mut store, (owned, &borrowed));
    assert_eq!(result, Some(40));
    assert_eq!(store.0, ["taken"]);
    assert_eq!(borrowed.index(), 1);
}
