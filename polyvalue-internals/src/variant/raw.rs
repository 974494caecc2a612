//! Storage of a tagged union over a list of alternatives.
//!
//! This module encapsulates the `storage` and `index` fields of
//! [`RawVariant`], ensuring they are only visible within this module. This
//! visibility restriction guarantees the safety invariant: **when `index` is
//! not [`VALUELESS`], `storage` holds a live value of alternative `index`;
//! otherwise it holds no live value**.
//!
//! # Safety Invariant
//!
//! Every operation that destroys the current value sets `index` to
//! [`VALUELESS`] before running the destructor, and every operation that
//! constructs a value sets `index` only after the construction succeeded. A
//! panic at any point therefore leaves the union valueless rather than pointing
//! at a dead value.
//!
//! Lifecycle operations are dispatched on the active alternative through the
//! per-alternative rows of [`ops`](crate::ops). Rows that need a capability
//! only exist when every alternative has it, and so do the methods using them.

use core::{cmp::Ordering, fmt, mem::MaybeUninit, ptr::NonNull};

use crate::{
    list::{Row, entry},
    ops::{
        Compare, CopyAssign, CopyConstruct, Destroy, Equal, Format, Lifecycle, MoveAssign,
        MoveConstruct, Swap, TypeName,
    },
    util::Erased,
};

/// Index of a union that holds no value.
pub const VALUELESS: usize = usize::MAX;

/// Storage for one value out of the alternatives of `L`, together with the
/// index of the active alternative.
pub struct RawVariant<L: Lifecycle> {
    /// Room for any alternative.
    ///
    /// # Safety
    ///
    /// Holds a live value of alternative `index` unless `index` is
    /// [`VALUELESS`].
    storage: MaybeUninit<L::Slot>,
    /// The active alternative, or [`VALUELESS`].
    index: usize,
}

impl<L: Lifecycle> RawVariant<L> {
    /// Creates a union holding `value` as alternative `index`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is alternative `index` of `L`.
    #[inline]
    pub unsafe fn new<T>(index: usize, value: T) -> Self {
        debug_assert!(index < L::COUNT);
        let mut raw = Self::valueless();
        // SAFETY: the storage is vacant and, by the layout of `L::Slot`, large and
        // aligned enough for every alternative.
        // 1. Guaranteed by the caller
        unsafe { raw.storage_mut().cast::<T>().write(value) };
        raw.index = index;
        raw
    }

    /// Creates a union holding no value.
    #[inline]
    const fn valueless() -> Self {
        Self {
            storage: MaybeUninit::uninit(),
            index: VALUELESS,
        }
    }

    /// Returns the index of the active alternative, or [`VALUELESS`].
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns whether the union holds no value.
    #[inline]
    pub fn is_valueless(&self) -> bool {
        self.index == VALUELESS
    }

    /// Address of the storage, for reading.
    #[inline]
    pub fn storage(&self) -> NonNull<Erased> {
        NonNull::from(&self.storage).cast::<Erased>()
    }

    /// Address of the storage, for writing.
    #[inline]
    pub fn storage_mut(&mut self) -> NonNull<Erased> {
        NonNull::from(&mut self.storage).cast::<Erased>()
    }

    /// Returns the name of the active alternative's type.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        (!self.is_valueless()).then(|| (entry::<TypeName, L>(self.index))())
    }

    /// Returns a reference to the active value as a `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The union is not valueless and `T` is the active alternative.
    #[inline]
    pub unsafe fn get_unchecked<T>(&self) -> &T {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.storage().cast::<T>().as_ref() }
    }

    /// Returns a mutable reference to the active value as a `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The union is not valueless and `T` is the active alternative.
    #[inline]
    pub unsafe fn get_unchecked_mut<T>(&mut self) -> &mut T {
        let mut ptr = self.storage_mut().cast::<T>();
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { ptr.as_mut() }
    }

    /// Moves the active value out as a `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The union is not valueless and `T` is the active alternative.
    #[inline]
    pub unsafe fn into_unchecked<T>(self) -> T {
        let mut this = core::mem::ManuallyDrop::new(self);
        this.index = VALUELESS;
        // SAFETY: the value is live and the shell is never dropped.
        // 1. Guaranteed by the caller
        unsafe { this.storage_mut().cast::<T>().read() }
    }

    /// Destroys the active value, leaving the union valueless.
    pub fn destroy(&mut self) {
        let index = core::mem::replace(&mut self.index, VALUELESS);
        if index == VALUELESS || !L::NEEDS_DROP {
            return;
        }
        let destroy = entry::<Destroy, L>(index);
        let storage = self.storage_mut();
        // SAFETY: the storage held a live value of alternative `index`, which is
        // treated as dead from now on since the index was reset.
        unsafe { destroy(storage) };
    }

    /// Destroys the active value, then stores the value produced by `make` as
    /// alternative `index` and returns a reference to it.
    ///
    /// If `make` panics, the union is left valueless.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is alternative `index` of `L`.
    pub unsafe fn emplace_with<T, F>(&mut self, index: usize, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.destroy();
        let value = make();
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.put(index, value) }
    }

    /// Destroys the active value, then attempts to store the value produced by
    /// `make` as alternative `index`.
    ///
    /// If `make` fails, the error is returned and the union is left valueless.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is alternative `index` of `L`.
    pub unsafe fn try_emplace_with<T, E, F>(&mut self, index: usize, make: F) -> Result<&mut T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.destroy();
        let value = make()?;
        // SAFETY:
        // 1. Guaranteed by the caller
        Ok(unsafe { self.put(index, value) })
    }

    /// Stores an already constructed `value` as alternative `index`.
    ///
    /// If alternative `index` is active, `value` is assigned to it; otherwise
    /// the active value is destroyed and `value` is moved in. Neither path can
    /// leave the union valueless.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is alternative `index` of `L`.
    pub unsafe fn assign<T>(&mut self, index: usize, value: T) -> &mut T {
        if self.index == index {
            // SAFETY: alternative `index` is active.
            // 1. Guaranteed by the caller
            let current = unsafe { self.get_unchecked_mut::<T>() };
            *current = value;
            current
        } else {
            self.destroy();
            // SAFETY:
            // 1. Guaranteed by the caller
            unsafe { self.put(index, value) }
        }
    }

    /// Writes `value` into the vacant storage and activates `index`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is alternative `index` of `L`.
    /// 2. The union is valueless.
    unsafe fn put<T>(&mut self, index: usize, value: T) -> &mut T {
        debug_assert!(self.is_valueless());
        let mut ptr = self.storage_mut().cast::<T>();
        // SAFETY: the storage is vacant and fits every alternative.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { ptr.write(value) };
        self.index = index;
        // SAFETY: `ptr` points to the value just written, owned by `self`.
        unsafe { ptr.as_mut() }
    }

    /// Moves the value of `source` into `self`, leaving `source` valueless.
    ///
    /// When both hold the same alternative this is an assignment through the
    /// [`MoveAssign`] row; otherwise the active value is destroyed and the
    /// value of `source` is relocated through the [`MoveConstruct`] row.
    pub fn move_assign_from(&mut self, source: &mut Self) {
        let incoming = core::mem::replace(&mut source.index, VALUELESS);
        if incoming == VALUELESS {
            self.destroy();
            return;
        }
        let src = source.storage_mut();
        if self.index == incoming {
            let move_assign = entry::<MoveAssign, L>(incoming);
            let dst = self.storage_mut();
            // SAFETY: both hold a live value of alternative `incoming`, and
            // `source` is treated as vacant since its index was reset.
            unsafe { move_assign(dst, src) };
        } else {
            self.destroy();
            let move_construct = entry::<MoveConstruct, L>(incoming);
            let dst = self.storage_mut();
            // SAFETY: `source` held a live value of alternative `incoming` and is
            // treated as vacant since its index was reset; `self` is vacant.
            unsafe { move_construct(dst, src) };
            self.index = incoming;
        }
    }

    /// Exchanges the values of `self` and `other`.
    ///
    /// - same alternative: the values are swapped through the [`Swap`] row;
    /// - exactly one valueless: the live value is relocated to the other side,
    ///   which leaves the former source valueless;
    /// - different alternatives: the values rotate through a temporary union;
    /// - both valueless: nothing happens.
    pub fn swap(&mut self, other: &mut Self) {
        match (self.is_valueless(), other.is_valueless()) {
            (true, true) => {}
            (false, true) => other.move_assign_from(self),
            (true, false) => self.move_assign_from(other),
            (false, false) if self.index == other.index => {
                let swap = entry::<Swap, L>(self.index);
                let a = self.storage_mut();
                let b = other.storage_mut();
                // SAFETY: both hold a live value of the same alternative.
                unsafe { swap(a, b) };
            }
            (false, false) => {
                let mut temporary = Self::valueless();
                temporary.move_assign_from(self);
                self.move_assign_from(other);
                other.move_assign_from(&mut temporary);
            }
        }
    }
}

impl<L: Lifecycle + Row<CopyConstruct> + Row<CopyAssign>> RawVariant<L> {
    /// Clones the value of `source` into `self`.
    ///
    /// - same alternative: the value is assigned through the [`CopyAssign`]
    ///   row, so nothing is destroyed or constructed;
    /// - `source` valueless: `self` becomes valueless;
    /// - otherwise: the active value is destroyed, then a clone is constructed
    ///   through the [`CopyConstruct`] row. If cloning panics, `self` is left
    ///   valueless.
    pub fn clone_assign_from(&mut self, source: &Self) {
        if source.is_valueless() {
            self.destroy();
        } else if self.index == source.index {
            let copy_assign = entry::<CopyAssign, L>(source.index);
            let dst = self.storage_mut();
            // SAFETY: both hold a live value of the same alternative.
            unsafe { copy_assign(dst, source.storage()) };
        } else {
            self.destroy();
            let copy_construct = entry::<CopyConstruct, L>(source.index);
            let dst = self.storage_mut();
            // SAFETY: `source` holds a live value of its alternative and `self`
            // is vacant.
            unsafe { copy_construct(dst, source.storage()) };
            self.index = source.index;
        }
    }
}

impl<L: Lifecycle + Row<CopyConstruct>> Clone for RawVariant<L> {
    fn clone(&self) -> Self {
        let mut copy = Self::valueless();
        if !self.is_valueless() {
            let copy_construct = entry::<CopyConstruct, L>(self.index);
            let dst = copy.storage_mut();
            // SAFETY: `self` holds a live value of its alternative and `copy` is
            // vacant. If cloning panics, `copy` is still valueless.
            unsafe { copy_construct(dst, self.storage()) };
            copy.index = self.index;
        }
        copy
    }
}

impl<L: Lifecycle> Drop for RawVariant<L> {
    #[inline]
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<L: Lifecycle + Row<Format>> fmt::Debug for RawVariant<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valueless() {
            return f.write_str("<valueless>");
        }
        let format = entry::<Format, L>(self.index);
        // SAFETY: the storage holds a live value of the active alternative.
        unsafe { format(self.storage(), f) }
    }
}

impl<L: Lifecycle + Row<Equal>> PartialEq for RawVariant<L> {
    fn eq(&self, other: &Self) -> bool {
        if self.index != other.index {
            return false;
        }
        if self.is_valueless() {
            return true;
        }
        let equal = entry::<Equal, L>(self.index);
        // SAFETY: both hold a live value of the same alternative.
        unsafe { equal(self.storage(), other.storage()) }
    }
}

impl<L: Lifecycle + Row<Equal> + Row<Compare>> PartialOrd for RawVariant<L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Valueless unions order before any live value
        match (self.is_valueless(), other.is_valueless()) {
            (true, true) => return Some(Ordering::Equal),
            (true, false) => return Some(Ordering::Less),
            (false, true) => return Some(Ordering::Greater),
            (false, false) => {}
        }
        match self.index.cmp(&other.index) {
            Ordering::Equal => {
                let compare = entry::<Compare, L>(self.index);
                // SAFETY: both hold a live value of the same alternative.
                unsafe { compare(self.storage(), other.storage()) }
            }
            ordering => Some(ordering),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, rc::Rc, string::String};
    use core::cell::Cell;

    use super::*;
    use crate::list::{Cons, Nil};

    type IntOrString = Cons<i32, Cons<String, Nil>>;

    fn int(value: i32) -> RawVariant<IntOrString> {
        // SAFETY: alternative 0 is `i32`.
        unsafe { RawVariant::new(0, value) }
    }

    fn string(value: &str) -> RawVariant<IntOrString> {
        // SAFETY: alternative 1 is `String`.
        unsafe { RawVariant::new(1, String::from(value)) }
    }

    /// Counts constructions; assignment through `clone_from` is not one.
    #[derive(Debug)]
    struct Counted<'a> {
        constructed: &'a Cell<usize>,
        value: u32,
    }

    impl Clone for Counted<'_> {
        fn clone(&self) -> Self {
            self.constructed.set(self.constructed.get() + 1);
            Self {
                constructed: self.constructed,
                value: self.value,
            }
        }

        fn clone_from(&mut self, source: &Self) {
            self.value = source.value;
        }
    }

    #[test]
    fn test_new_and_access() {
        let raw = string("ciao");
        assert_eq!(raw.index(), 1);
        assert!(!raw.is_valueless());
        assert_eq!(raw.type_name(), Some(core::any::type_name::<String>()));
        // SAFETY: alternative 1 is active.
        assert_eq!(unsafe { raw.get_unchecked::<String>() }, "ciao");
    }

    #[test]
    fn test_assign_same_alternative_keeps_index() {
        let mut raw = string("ciao");
        // SAFETY: alternative 1 is `String`.
        unsafe { raw.assign(1, String::from("ciao mare")) };
        assert_eq!(raw.index(), 1);
        // SAFETY: alternative 1 is active.
        assert_eq!(unsafe { raw.get_unchecked::<String>() }, "ciao mare");
    }

    #[test]
    fn test_try_emplace_error_leaves_valueless() {
        let mut raw = int(3);
        // SAFETY: alternative 1 is `String`.
        let result = unsafe { raw.try_emplace_with::<String, _, _>(1, || Err("refused")) };
        assert_eq!(result.err(), Some("refused"));
        assert!(raw.is_valueless());

        // SAFETY: alternative 0 is `i32`.
        unsafe { raw.try_emplace_with::<i32, (), _>(0, || Ok(4)) }.ok();
        assert_eq!(raw.index(), 0);
    }

    #[test]
    fn test_destroy_runs_once() {
        type Shared = Cons<Rc<()>, Cons<u8, Nil>>;
        let shared = Rc::new(());
        // SAFETY: alternative 0 is `Rc<()>`.
        let mut raw: RawVariant<Shared> = unsafe { RawVariant::new(0, Rc::clone(&shared)) };
        assert_eq!(Rc::strong_count(&shared), 2);
        raw.destroy();
        assert_eq!(Rc::strong_count(&shared), 1);
        drop(raw);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn test_clone_assign_same_alternative_does_not_construct() {
        type List<'a> = Cons<Counted<'a>, Cons<u8, Nil>>;
        let constructed = Cell::new(0);
        let make = |value| Counted {
            constructed: &constructed,
            value,
        };
        // SAFETY: alternative 0 is `Counted`.
        let source: RawVariant<List<'_>> = unsafe { RawVariant::new(0, make(1)) };
        // SAFETY: alternative 0 is `Counted`.
        let mut target: RawVariant<List<'_>> = unsafe { RawVariant::new(0, make(2)) };
        target.clone_assign_from(&source);
        assert_eq!(constructed.get(), 0);
        // SAFETY: alternative 0 is active.
        assert_eq!(unsafe { target.get_unchecked::<Counted<'_>>() }.value, 1);

        // SAFETY: alternative 1 is `u8`.
        let mut other: RawVariant<List<'_>> = unsafe { RawVariant::new(1, 9u8) };
        other.clone_assign_from(&source);
        assert_eq!(constructed.get(), 1);
        assert_eq!(other.index(), 0);
    }

    #[test]
    fn test_swap_cases() {
        let mut a = int(1);
        let mut b = string("two");
        a.swap(&mut b);
        assert_eq!((a.index(), b.index()), (1, 0));
        // SAFETY: alternative 1 is active in `a`, 0 in `b`.
        unsafe {
            assert_eq!(a.get_unchecked::<String>(), "two");
        }
        // SAFETY: as above.
        unsafe {
            assert_eq!(*b.get_unchecked::<i32>(), 1);
        }

        let mut c = string("three");
        a.swap(&mut c);
        // SAFETY: alternative 1 is active in both.
        unsafe {
            assert_eq!(a.get_unchecked::<String>(), "three");
        }

        let mut empty = int(0);
        empty.destroy();
        a.swap(&mut empty);
        assert!(a.is_valueless());
        assert_eq!(empty.index(), 1);
    }

    #[test]
    fn test_debug_and_comparisons() {
        assert_eq!(format!("{:?}", int(5)), "5");
        assert_eq!(format!("{:?}", string("x")), "\"x\"");
        let mut empty = int(0);
        empty.destroy();
        assert_eq!(format!("{empty:?}"), "<valueless>");

        assert_eq!(int(1), int(1));
        assert_ne!(int(1), string("1"));
        assert!(int(100) < string("a"));
        assert!(string("a") < string("b"));
        assert!(empty < int(i32::MIN));
    }
}
