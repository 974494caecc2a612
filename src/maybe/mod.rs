//! An optional value that uses a spare bit pattern of its type for "no value".
//!
//! A [`Maybe<T, Tr>`](Maybe) behaves like an [`Option<T>`], but its layout is
//! decided by the traits type `Tr`, which describes the spare patterns of `T`
//! through [`Tombstone`]:
//!
//! - if `T` has at least one spare pattern, the maybe is exactly as large as
//!   `T` and "no value" is stored as spare pattern 0;
//! - otherwise the maybe stores a flag byte after the value.
//!
//! Nesting composes: a `Maybe<Maybe<T>>` spends one more spare pattern of `T`,
//! or the spare values of the inner flag byte, and so stays as large as the
//! inner maybe as long as spare patterns are left.
//!
//! ```
//! use polyvalue::{Maybe, maybe::NoNiche};
//!
//! assert_eq!(size_of::<Maybe<bool>>(), size_of::<bool>());
//! assert_eq!(size_of::<Maybe<Maybe<bool>>>(), size_of::<bool>());
//! assert_eq!(size_of::<Maybe<u32, NoNiche>>(), 2 * size_of::<u32>());
//!
//! let mut flag = Maybe::<bool>::none();
//! assert!(flag.is_none());
//! flag.emplace(true);
//! assert_eq!(flag.value(), Ok(&true));
//! assert_eq!(flag.take().value_or(false), true);
//! assert!(flag.is_none());
//! ```
//!
//! The traits for common types are provided by [`Niches`], the default. A
//! type it does not cover is used either with [`NoNiche`] or with traits of
//! your own:
//!
//! ```
//! use core::mem::MaybeUninit;
//!
//! use polyvalue::{
//!     Maybe,
//!     maybe::{Exactly, Tombstone},
//! };
//!
//! /// Percentages are 0 to 100, so 255 and 254 are spare.
//! struct Percent;
//!
//! // SAFETY: no percentage is 254 or 255, and the byte is always initialized.
//! unsafe impl Tombstone<u8> for Percent {
//!     type Spare = Exactly<2>;
//!     const SPARE_REPRESENTATIONS: usize = 2;
//!
//!     unsafe fn spare_index(slot: &MaybeUninit<u8>) -> Option<usize> {
//!         // SAFETY: the byte is initialized.
//!         let byte = unsafe { slot.assume_init() };
//!         (byte >= 254).then(|| usize::from(255 - byte))
//!     }
//!
//!     unsafe fn set_spare_representation(slot: &mut MaybeUninit<u8>, index: usize) {
//!         slot.write(255 - index as u8);
//!     }
//! }
//!
//! assert_eq!(size_of::<Maybe<Maybe<u8, Percent>>>(), 1);
//! let nested: Maybe<Maybe<u8, Percent>> = Maybe::some(Maybe::none());
//! assert!(nested.is_some());
//! assert!(nested.value().is_ok_and(|inner| inner.is_none()));
//! ```

mod encoding;
mod tombstone;

use core::{cmp::Ordering, fmt, hash, marker::PhantomData};

pub use self::{
    encoding::{Encoding, Flagged, FlaggedStorage, Tombstoned},
    tombstone::{
        Exactly, FLAG_SPARES, Niches, NoNiche, Remaining, SpareCount, Tombstone, UNBOUNDED_MIN,
        Unbounded,
    },
};
use self::tombstone::{EncodingOf, StorageOf};
use crate::error::BadAccess;

/// An optional `T` whose "no value" state is encoded as described by `Tr`.
///
/// See the [module documentation](self) for the encoding.
#[repr(transparent)]
pub struct Maybe<T, Tr: Tombstone<T> = Niches> {
    /// Either a value, or the "no value" state.
    ///
    /// # Safety
    ///
    /// Never holds a nested spare pattern: those only exist in the storage of
    /// an enclosing [`Maybe`] that has no value.
    storage: StorageOf<T, Tr>,
    /// Owns a `T` and uses `Tr` without owning one.
    _marker: PhantomData<(T, fn() -> Tr)>,
}

impl<T, Tr: Tombstone<T>> Maybe<T, Tr> {
    /// Checks that the spare count of `Tr` agrees with its type-level bound.
    const CHECK: () = assert!(
        <Tr::Spare as SpareCount>::MIN <= Tr::SPARE_REPRESENTATIONS
            && Tr::SPARE_REPRESENTATIONS <= <Tr::Spare as SpareCount>::MAX,
        "spare count of the traits type is outside of its type-level bound; \
         counts from one to eight use `Exactly`"
    );

    /// Creates a maybe with no value.
    #[inline]
    pub fn none() -> Self {
        let () = Self::CHECK;
        Self {
            // SAFETY:
            // 1. `EncodingOf` is the encoding selected by `Tr::Spare`
            storage: unsafe { <EncodingOf<T, Tr> as Encoding>::none::<T, Tr>() },
            _marker: PhantomData,
        }
    }

    /// Creates a maybe holding `value`.
    #[inline]
    pub fn some(value: T) -> Self {
        let () = Self::CHECK;
        Self {
            storage: <EncodingOf<T, Tr> as Encoding>::some(value),
            _marker: PhantomData,
        }
    }

    /// Returns whether the maybe holds a value.
    #[inline]
    pub fn is_some(&self) -> bool {
        // SAFETY:
        // 1. `EncodingOf` is the encoding selected by `Tr::Spare`
        // 2. The storage never holds a nested spare pattern
        unsafe { <EncodingOf<T, Tr> as Encoding>::is_some::<T, Tr>(&self.storage) }
    }

    /// Returns whether the maybe holds no value.
    #[inline]
    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    /// Returns a reference to the value without checking that there is one.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The maybe holds a value.
    #[inline]
    pub unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_some());
        let slot = <EncodingOf<T, Tr> as Encoding>::slot(&self.storage);
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { slot.assume_init_ref() }
    }

    /// Returns a mutable reference to the value without checking that there is
    /// one.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The maybe holds a value.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self) -> &mut T {
        debug_assert!(self.is_some());
        // SAFETY: only valid values of `T` can be written through `&mut T`.
        let slot = unsafe { <EncodingOf<T, Tr> as Encoding>::slot_mut(&mut self.storage) };
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { slot.assume_init_mut() }
    }

    /// Returns a reference to the value, if any.
    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: the maybe holds a value.
        self.is_some().then(|| unsafe { self.get_unchecked() })
    }

    /// Returns a mutable reference to the value, if any.
    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut T> {
        if self.is_none() {
            return None;
        }
        // SAFETY: the maybe holds a value.
        Some(unsafe { self.get_unchecked_mut() })
    }

    /// Returns a reference to the value.
    #[inline]
    pub fn value(&self) -> Result<&T, BadAccess> {
        self.as_ref().ok_or_else(|| BadAccess::new::<T>(None))
    }

    /// Returns a mutable reference to the value.
    #[inline]
    pub fn value_mut(&mut self) -> Result<&mut T, BadAccess> {
        self.as_mut().ok_or_else(|| BadAccess::new::<T>(None))
    }

    /// Returns the value.
    #[inline]
    pub fn into_value(self) -> Result<T, BadAccess> {
        self.into_option().ok_or_else(|| BadAccess::new::<T>(None))
    }

    /// Returns the value, or `default` if there is none.
    #[inline]
    pub fn value_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }

    /// Returns the value, or the result of `default` if there is none.
    #[inline]
    pub fn value_or_else<F: FnOnce() -> T>(self, default: F) -> T {
        self.into_option().unwrap_or_else(default)
    }

    /// Moves the value out, leaving no value behind.
    #[inline]
    fn take_value(&mut self) -> Option<T> {
        if self.is_none() {
            return None;
        }
        // SAFETY: the value is read out once and the state is reset right after.
        let slot = unsafe { <EncodingOf<T, Tr> as Encoding>::slot_mut(&mut self.storage) };
        // SAFETY: the maybe holds a value.
        let value = unsafe { slot.assume_init_read() };
        // SAFETY:
        // 1. `EncodingOf` is the encoding selected by `Tr::Spare`
        // 2. The value was moved out
        unsafe { <EncodingOf<T, Tr> as Encoding>::mark_none::<T, Tr>(&mut self.storage) };
        Some(value)
    }

    /// Writes `value` into the maybe, which must hold no value.
    #[inline]
    fn put(&mut self, value: T) -> &mut T {
        debug_assert!(self.is_none());
        // SAFETY: a valid `T` is written and marked as present right after.
        let slot = unsafe { <EncodingOf<T, Tr> as Encoding>::slot_mut(&mut self.storage) };
        slot.write(value);
        // SAFETY:
        // 1. A valid `T` was just written
        unsafe { <EncodingOf<T, Tr> as Encoding>::mark_some(&mut self.storage) };
        // SAFETY: the maybe holds the value just written.
        unsafe { self.get_unchecked_mut() }
    }

    /// Destroys the value, if any, then stores `value` and returns a reference
    /// to it.
    #[inline]
    pub fn emplace(&mut self, value: T) -> &mut T {
        self.reset();
        self.put(value)
    }

    /// Destroys the value, if any.
    #[inline]
    pub fn reset(&mut self) {
        drop(self.take_value());
    }

    /// Moves the value out into a new maybe, leaving no value behind.
    #[inline]
    pub fn take(&mut self) -> Self {
        self.take_value().into()
    }

    /// Stores `value`, assigning it to the current value if there is one.
    #[inline]
    pub fn set(&mut self, value: T) -> &mut T {
        if self.is_none() {
            return self.put(value);
        }
        // SAFETY: the maybe holds a value.
        let current = unsafe { self.get_unchecked_mut() };
        *current = value;
        current
    }

    /// Moves the value of `source` into `self`.
    ///
    /// - both hold values: the value of `source` is assigned to the current one;
    /// - only `source` holds one: it is moved in;
    /// - `source` holds none: `self` is reset.
    #[inline]
    pub fn assign(&mut self, source: Self) {
        match source.into_option() {
            Some(value) => {
                self.set(value);
            }
            None => self.reset(),
        }
    }

    /// Converts the value of a differently typed `source` and stores it like
    /// [`assign`](Self::assign).
    ///
    /// ```
    /// use polyvalue::Maybe;
    ///
    /// let mut wide: Maybe<u64> = Maybe::none();
    /// wide.assign_from(Maybe::<u8>::some(7));
    /// assert_eq!(wide.value(), Ok(&7));
    /// wide.assign_from(Maybe::<u8>::none());
    /// assert!(wide.is_none());
    /// ```
    #[inline]
    pub fn assign_from<U, Tu>(&mut self, source: Maybe<U, Tu>)
    where
        Tu: Tombstone<U>,
        U: Into<T>,
    {
        match source.into_option() {
            Some(value) => {
                self.set(value.into());
            }
            None => self.reset(),
        }
    }

    /// Applies `f` to the value, if any.
    ///
    /// The traits of the result are chosen by the caller, usually through a
    /// type annotation.
    #[inline]
    pub fn map<U, Tu, F>(self, f: F) -> Maybe<U, Tu>
    where
        Tu: Tombstone<U>,
        F: FnOnce(T) -> U,
    {
        self.into_option().map(f).into()
    }

    /// Returns the result of `f` applied to the value, or no value.
    #[inline]
    pub fn and_then<U, Tu, F>(self, f: F) -> Maybe<U, Tu>
    where
        Tu: Tombstone<U>,
        F: FnOnce(T) -> Maybe<U, Tu>,
    {
        match self.into_option() {
            Some(value) => f(value),
            None => Maybe::none(),
        }
    }

    /// Returns `self` if it holds a value, otherwise the result of `f`.
    #[inline]
    pub fn or_else<F: FnOnce() -> Self>(self, f: F) -> Self {
        if self.is_some() { self } else { f() }
    }

    /// Exchanges the values of two maybes.
    ///
    /// A value moving into a maybe without one leaves its former maybe without
    /// a value.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        match (self.is_some(), other.is_some()) {
            (true, true) => {
                // SAFETY: `self` holds a value.
                let a = unsafe { self.get_unchecked_mut() };
                // SAFETY: `other` holds a value.
                let b = unsafe { other.get_unchecked_mut() };
                core::mem::swap(a, b);
            }
            (true, false) => other.assign(self.take()),
            (false, true) => self.assign(other.take()),
            (false, false) => {}
        }
    }

    /// Converts into an [`Option`].
    #[inline]
    pub fn into_option(mut self) -> Option<T> {
        self.take_value()
    }
}

impl<T, Tr: Tombstone<T>> Drop for Maybe<T, Tr> {
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T, Tr: Tombstone<T>> From<Option<T>> for Maybe<T, Tr> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::some(value),
            None => Self::none(),
        }
    }
}

impl<T, Tr: Tombstone<T>> From<Maybe<T, Tr>> for Option<T> {
    #[inline]
    fn from(value: Maybe<T, Tr>) -> Self {
        value.into_option()
    }
}

impl<T, Tr: Tombstone<T>> Default for Maybe<T, Tr> {
    /// Creates a maybe with no value.
    #[inline]
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Clone, Tr: Tombstone<T>> Clone for Maybe<T, Tr> {
    #[inline]
    fn clone(&self) -> Self {
        self.as_ref().cloned().into()
    }

    /// Copies the value of `source` into `self`.
    ///
    /// - both hold values: assigned with the value's own [`Clone::clone_from`];
    /// - only `source` holds one: a clone is stored;
    /// - `source` holds none: `self` is reset.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        match (self.as_mut(), source.as_ref()) {
            (Some(current), Some(value)) => current.clone_from(value),
            (None, Some(value)) => {
                self.put(value.clone());
            }
            (_, None) => self.reset(),
        }
    }
}

impl<T: fmt::Debug, Tr: Tombstone<T>> fmt::Debug for Maybe<T, Tr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ref() {
            Some(value) => f.debug_tuple("Some").field(value).finish(),
            None => f.write_str("None"),
        }
    }
}

impl<T: PartialEq, Tr: Tombstone<T>> PartialEq for Maybe<T, Tr> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl<T: Eq, Tr: Tombstone<T>> Eq for Maybe<T, Tr> {}

impl<T: PartialOrd, Tr: Tombstone<T>> PartialOrd for Maybe<T, Tr> {
    /// A maybe without a value orders before any maybe with one.
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_ref().partial_cmp(&other.as_ref())
    }
}

impl<T: Ord, Tr: Tombstone<T>> Ord for Maybe<T, Tr> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ref().cmp(&other.as_ref())
    }
}

impl<T: hash::Hash, Tr: Tombstone<T>> hash::Hash for Maybe<T, Tr> {
    #[inline]
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_ref().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String, vec, vec::Vec};
    use core::{mem::MaybeUninit, num::NonZeroU32};

    use super::*;

    /// Two spare `i32` patterns: `i32::MIN` and `i32::MIN + 1`.
    enum TwoSpares {}

    // SAFETY: the two patterns are reserved by convention in these tests, and
    // all four bytes are always initialized.
    unsafe impl Tombstone<i32> for TwoSpares {
        type Spare = Exactly<2>;
        const SPARE_REPRESENTATIONS: usize = 2;

        unsafe fn spare_index(slot: &MaybeUninit<i32>) -> Option<usize> {
            // SAFETY: the value is initialized.
            let value = unsafe { slot.assume_init() };
            (value <= i32::MIN + 1).then(|| (value - i32::MIN) as usize)
        }

        unsafe fn set_spare_representation(slot: &mut MaybeUninit<i32>, index: usize) {
            slot.write(i32::MIN + index as i32);
        }
    }

    /// The smallest unbounded count: `i32::MIN` up to `i32::MIN + 8`.
    enum NineSpares {}

    // SAFETY: the nine patterns are reserved by convention in these tests, and
    // all four bytes are always initialized.
    unsafe impl Tombstone<i32> for NineSpares {
        type Spare = Unbounded;
        const SPARE_REPRESENTATIONS: usize = UNBOUNDED_MIN;

        unsafe fn spare_index(slot: &MaybeUninit<i32>) -> Option<usize> {
            // SAFETY: the value is initialized.
            let value = unsafe { slot.assume_init() };
            (value <= i32::MIN + 8).then(|| (value - i32::MIN) as usize)
        }

        unsafe fn set_spare_representation(slot: &mut MaybeUninit<i32>, index: usize) {
            slot.write(i32::MIN + index as i32);
        }
    }

    type Deep = Maybe<Maybe<Maybe<i32, NineSpares>>>;

    static_assertions::assert_eq_size!(Deep, i32);
    static_assertions::assert_eq_size!(Maybe<bool>, bool);
    static_assertions::assert_eq_size!(Maybe<Maybe<bool>>, bool);
    static_assertions::assert_eq_size!(Maybe<&u64>, &u64);
    static_assertions::assert_eq_size!(Maybe<char>, char);
    static_assertions::assert_eq_size!(Maybe<Maybe<i32, TwoSpares>>, i32);
    static_assertions::assert_eq_size!(Maybe<Maybe<i32, NoNiche>>, [i32; 2]);
    static_assertions::assert_eq_size!(Maybe<Maybe<NonZeroU32>>, [u32; 2]);

    #[test]
    fn test_unbounded_nesting_keeps_tombstones() {
        assert_eq!(<Niches as Tombstone<Maybe<i32, NineSpares>>>::SPARE_REPRESENTATIONS, 8);
        assert_eq!(
            <Niches as Tombstone<Maybe<Maybe<i32, NineSpares>>>>::SPARE_REPRESENTATIONS,
            7
        );

        let states: [Deep; 4] = [
            Maybe::none(),
            Maybe::some(Maybe::none()),
            Maybe::some(Maybe::some(Maybe::none())),
            Maybe::some(Maybe::some(Maybe::some(-3))),
        ];
        let depths: Vec<usize> = states
            .iter()
            .map(|deep| match deep.as_ref() {
                None => 0,
                Some(middle) => match middle.as_ref() {
                    None => 1,
                    Some(inner) => 2 + usize::from(inner.is_some()),
                },
            })
            .collect();
        assert_eq!(depths, vec![0, 1, 2, 3]);
        let innermost = states[3]
            .as_ref()
            .and_then(Maybe::as_ref)
            .and_then(Maybe::as_ref);
        assert_eq!(innermost, Some(&-3));
    }

    #[test]
    fn test_nested_tombstones() {
        let outer: Maybe<Maybe<i32, TwoSpares>> = Maybe::none();
        assert!(outer.is_none());

        let outer: Maybe<Maybe<i32, TwoSpares>> = Maybe::some(Maybe::none());
        assert!(outer.is_some());
        assert!(outer.value().is_ok_and(Maybe::is_none));

        let outer: Maybe<Maybe<i32, TwoSpares>> = Maybe::some(Maybe::some(-4));
        assert_eq!(outer.into_value().and_then(Maybe::into_value), Ok(-4));
    }

    #[test]
    fn test_nested_flags() {
        let mut outer: Maybe<Maybe<u32>> = Maybe::some(Maybe::none());
        assert!(outer.is_some());
        outer.reset();
        assert!(outer.is_none());
        outer.emplace(Maybe::some(3));
        assert_eq!(outer.value().map(|inner| inner.value().copied()), Ok(Ok(3)));
    }

    #[test]
    fn test_reset_then_emplace_round_trip() {
        let original: Maybe<char> = Maybe::some('ß');
        let mut copy = original.clone();
        copy.reset();
        assert!(copy.is_none());
        copy.emplace('ß');
        assert_eq!(copy, original);
    }

    #[test]
    fn test_value_or() {
        assert_eq!(Maybe::<bool>::none().value_or(true), true);
        assert_eq!(Maybe::<bool>::some(false).value_or(true), false);
        assert_eq!(Maybe::<u8>::none().value_or_else(|| 9), 9);
        assert_eq!(
            Maybe::<u8>::none().value().unwrap_err(),
            BadAccess::new::<u8>(None)
        );
    }

    #[test]
    fn test_drop_runs_once() {
        let shared = Rc::new(());
        let mut maybe: Maybe<Rc<()>, NoNiche> = Maybe::some(Rc::clone(&shared));
        assert_eq!(Rc::strong_count(&shared), 2);
        maybe.set(Rc::clone(&shared));
        assert_eq!(Rc::strong_count(&shared), 2);
        let taken = maybe.take();
        assert!(maybe.is_none());
        drop(maybe);
        assert_eq!(Rc::strong_count(&shared), 2);
        drop(taken);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn test_swap_cases() {
        let mut a: Maybe<String> = Maybe::some(String::from("a"));
        let mut b: Maybe<String> = Maybe::some(String::from("b"));
        a.swap(&mut b);
        assert_eq!(a.value().map(String::as_str), Ok("b"));

        let mut empty: Maybe<String> = Maybe::none();
        a.swap(&mut empty);
        assert!(a.is_none());
        assert_eq!(empty.value().map(String::as_str), Ok("b"));

        let mut other_empty: Maybe<String> = Maybe::none();
        a.swap(&mut other_empty);
        assert!(a.is_none() && other_empty.is_none());
    }

    #[test]
    fn test_monadic() {
        let number: Maybe<u32> = Maybe::some(20);
        let doubled: Maybe<u64> = number.map(|n| u64::from(n) * 2);
        assert_eq!(doubled.value(), Ok(&40));

        let checked: Maybe<u8> = doubled.and_then(|n| u8::try_from(n).ok().into());
        assert_eq!(checked.value(), Ok(&40));
        let overflow: Maybe<u8> = Maybe::<u64>::some(300).and_then(|n| u8::try_from(n).ok().into());
        assert!(overflow.is_none());

        assert_eq!(overflow.or_else(|| Maybe::some(1)).value(), Ok(&1));
    }

    #[test]
    fn test_clone_from_and_assign() {
        let source: Maybe<Vec<u8>> = Maybe::some(vec![1, 2]);
        let mut target: Maybe<Vec<u8>> = Maybe::none();
        target.clone_from(&source);
        assert_eq!(target, source);
        target.clone_from(&Maybe::none());
        assert!(target.is_none());
        target.assign(Maybe::some(vec![3]));
        assert_eq!(target.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_ordering() {
        let none: Maybe<u8> = Maybe::none();
        assert!(none < Maybe::some(0));
        assert!(Maybe::<u8>::some(1) > Maybe::some(0));
        assert_eq!(none, Maybe::none());
        assert_eq!(Option::from(Maybe::<u8>::some(3)), Some(3));
        assert_eq!(Maybe::<u8>::from(Some(4)).into_option(), Some(4));
    }
}
