//! A tagged union over a fixed tuple of alternatives.
//!
//! A [`Variant<(A, B, ...)>`](Variant) holds exactly one value of one of its
//! alternatives, or, after a constructor panicked or failed while the union
//! had already given up its previous value, no value at all. That last state is
//! called *valueless* and is only left by a later successful emplace or
//! assignment.
//!
//! Alternatives are selected either by index (`get::<1>()`,
//! `emplace::<0>(..)`) or, when the type occurs exactly once among the
//! alternatives, by type (`get_as::<String, _>()`, `set(..)`).
//!
//! ```
//! use polyvalue::Variant;
//!
//! let mut union: Variant<(i32, String)> = Variant::new(String::from("ciao"));
//! assert_eq!(union.index(), 1);
//!
//! union.set(String::from("ciao mare"));
//! assert_eq!(union.index(), 1);
//! assert_eq!(union.get::<1>()?, "ciao mare");
//!
//! union.emplace::<0>(7);
//! assert_eq!(union.get_as::<i32, _>(), Ok(&7));
//! assert!(union.get::<1>().is_err());
//! # Ok::<(), polyvalue::BadAccess>(())
//! ```
//!
//! Operations that need a capability of the alternatives, such as [`Clone`],
//! [`Debug`](core::fmt::Debug), [`PartialEq`] or [`PartialOrd`], are available
//! exactly when every alternative has it.

mod alternatives;
mod visit;

use core::{cmp::Ordering, fmt};

use polyvalue_internals::{
    RawVariant,
    list::{AltList, Row},
    ops::{Compare, CopyAssign, CopyConstruct, Equal, Format},
};

pub use self::{
    alternatives::{Alternatives, At, Locate, Monostate, Position},
    visit::{VisitOutput, visit, visit_as},
};
use crate::{error::BadAccess, trace};

/// One value out of the alternatives `A`, or valueless.
///
/// See the [module documentation](self) for an overview.
pub struct Variant<A: Alternatives> {
    /// The storage and the active index.
    raw: RawVariant<A::List>,
}

/// Logs the union becoming valueless if dropped before being defused, which
/// happens when a constructor unwinds.
struct UnwindLog {
    /// Type name of the alternative under construction.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    alternative: &'static str,
}

impl UnwindLog {
    /// Arms the log for a constructor of `alternative`.
    #[inline]
    fn arm(alternative: &'static str) -> Self {
        Self { alternative }
    }

    /// Disarms the log after the construction succeeded.
    #[inline]
    fn defuse(self) {
        core::mem::forget(self);
    }
}

impl Drop for UnwindLog {
    fn drop(&mut self) {
        trace::debug!(
            alternative = self.alternative,
            "variant left valueless by a panicking constructor"
        );
    }
}

impl<A: Alternatives> Variant<A> {
    /// The number of alternatives.
    pub const ALTERNATIVES: usize = <A::List as AltList>::COUNT;

    /// Creates a union holding `value` as the alternative of its type.
    ///
    /// The type must occur exactly once among the alternatives; to pick one of
    /// several alternatives of the same type, use [`new_at`](Self::new_at).
    #[inline]
    pub fn new<T, M>(value: T) -> Self
    where
        A: Locate<T, M>,
    {
        // SAFETY: `T` is alternative `INDEX` of `A`.
        let raw = unsafe { RawVariant::new(<A as Locate<T, M>>::INDEX, value) };
        Self { raw }
    }

    /// Creates a union holding `value` as alternative `I`.
    ///
    /// ```
    /// use polyvalue::Variant;
    ///
    /// let union = Variant::<(u8, u8)>::new_at::<1>(3);
    /// assert_eq!(union.index(), 1);
    /// ```
    #[inline]
    pub fn new_at<const I: usize>(value: <A as At<I>>::Type) -> Self
    where
        A: At<I>,
    {
        // SAFETY: `At<I>::Type` is alternative `I` of `A`.
        let raw = unsafe { RawVariant::new(I, value) };
        Self { raw }
    }

    /// Returns the index of the active alternative, or
    /// [`VALUELESS`](crate::VALUELESS).
    #[inline]
    pub fn index(&self) -> usize {
        self.raw.index()
    }

    /// Returns whether the union holds no value.
    #[inline]
    pub fn is_valueless(&self) -> bool {
        self.raw.is_valueless()
    }

    /// Returns whether the active alternative is the one of type `T`.
    #[inline]
    pub fn holds<T, M>(&self) -> bool
    where
        A: Locate<T, M>,
    {
        self.raw.index() == <A as Locate<T, M>>::INDEX
    }

    /// Returns the name of the active alternative's type, or `None` if
    /// valueless.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        self.raw.type_name()
    }

    /// Returns the error for a request of alternative `T`.
    #[cold]
    fn bad_access<T>(&self) -> BadAccess {
        BadAccess::new::<T>(self.raw.type_name())
    }

    /// Returns a reference to alternative `I` if it is active.
    #[inline]
    pub fn get_if<const I: usize>(&self) -> Option<&<A as At<I>>::Type>
    where
        A: At<I>,
    {
        // SAFETY: alternative `I` is active.
        (self.raw.index() == I).then(|| unsafe { self.raw.get_unchecked() })
    }

    /// Returns a mutable reference to alternative `I` if it is active.
    #[inline]
    pub fn get_if_mut<const I: usize>(&mut self) -> Option<&mut <A as At<I>>::Type>
    where
        A: At<I>,
    {
        if self.raw.index() != I {
            return None;
        }
        // SAFETY: alternative `I` is active.
        Some(unsafe { self.raw.get_unchecked_mut() })
    }

    /// Returns a reference to alternative `I`.
    #[inline]
    pub fn get<const I: usize>(&self) -> Result<&<A as At<I>>::Type, BadAccess>
    where
        A: At<I>,
    {
        self.get_if::<I>()
            .ok_or_else(|| self.bad_access::<<A as At<I>>::Type>())
    }

    /// Returns a mutable reference to alternative `I`.
    #[inline]
    pub fn get_mut<const I: usize>(&mut self) -> Result<&mut <A as At<I>>::Type, BadAccess>
    where
        A: At<I>,
    {
        if self.raw.index() != I {
            return Err(self.bad_access::<<A as At<I>>::Type>());
        }
        // SAFETY: alternative `I` is active.
        Ok(unsafe { self.raw.get_unchecked_mut() })
    }

    /// Returns a reference to the alternative of type `T`.
    #[inline]
    pub fn get_as<T, M>(&self) -> Result<&T, BadAccess>
    where
        A: Locate<T, M>,
    {
        if !self.holds::<T, M>() {
            return Err(self.bad_access::<T>());
        }
        // SAFETY: the alternative of type `T` is active.
        Ok(unsafe { self.raw.get_unchecked() })
    }

    /// Returns a mutable reference to the alternative of type `T`.
    #[inline]
    pub fn get_as_mut<T, M>(&mut self) -> Result<&mut T, BadAccess>
    where
        A: Locate<T, M>,
    {
        if !self.holds::<T, M>() {
            return Err(self.bad_access::<T>());
        }
        // SAFETY: the alternative of type `T` is active.
        Ok(unsafe { self.raw.get_unchecked_mut() })
    }

    /// Returns a reference to alternative `I` without checking that it is
    /// active.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Alternative `I` is active.
    #[inline]
    pub unsafe fn get_unchecked<const I: usize>(&self) -> &<A as At<I>>::Type
    where
        A: At<I>,
    {
        debug_assert_eq!(self.raw.index(), I);
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.raw.get_unchecked() }
    }

    /// Returns a mutable reference to alternative `I` without checking that it
    /// is active.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Alternative `I` is active.
    #[inline]
    pub unsafe fn get_unchecked_mut<const I: usize>(&mut self) -> &mut <A as At<I>>::Type
    where
        A: At<I>,
    {
        debug_assert_eq!(self.raw.index(), I);
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.raw.get_unchecked_mut() }
    }

    /// Consumes the union and returns alternative `I`, or the union itself if
    /// another alternative is active.
    #[inline]
    pub fn into_inner<const I: usize>(self) -> Result<<A as At<I>>::Type, Self>
    where
        A: At<I>,
    {
        if self.raw.index() != I {
            return Err(self);
        }
        // SAFETY: alternative `I` is active.
        Ok(unsafe { self.raw.into_unchecked() })
    }

    /// Destroys the active value and stores `value` as alternative `I`.
    ///
    /// Unlike [`assign`](Self::assign), the previous value is destroyed even if
    /// alternative `I` is already active.
    #[inline]
    pub fn emplace<const I: usize>(&mut self, value: <A as At<I>>::Type) -> &mut <A as At<I>>::Type
    where
        A: At<I>,
    {
        // SAFETY: `At<I>::Type` is alternative `I` of `A`.
        unsafe { self.raw.emplace_with(I, || value) }
    }

    /// Destroys the active value and stores `value` as the alternative of its
    /// type.
    #[inline]
    pub fn emplace_as<T, M>(&mut self, value: T) -> &mut T
    where
        A: Locate<T, M>,
    {
        // SAFETY: `T` is alternative `INDEX` of `A`.
        unsafe { self.raw.emplace_with(<A as Locate<T, M>>::INDEX, || value) }
    }

    /// Destroys the active value, then stores the value returned by `make` as
    /// alternative `I`.
    ///
    /// If `make` panics, the union is left valueless.
    pub fn emplace_with<const I: usize, F>(&mut self, make: F) -> &mut <A as At<I>>::Type
    where
        A: At<I>,
        F: FnOnce() -> <A as At<I>>::Type,
    {
        let log = UnwindLog::arm(core::any::type_name::<<A as At<I>>::Type>());
        // SAFETY: `At<I>::Type` is alternative `I` of `A`.
        let value = unsafe { self.raw.emplace_with(I, make) };
        log.defuse();
        value
    }

    /// Destroys the active value, then attempts to store the value returned by
    /// `make` as alternative `I`.
    ///
    /// If `make` fails, the error is returned and the union is left valueless.
    ///
    /// ```
    /// use polyvalue::Variant;
    ///
    /// let mut union: Variant<(u8, u32)> = Variant::new(1u8);
    /// let result = union.try_emplace_with::<1, _, _>(|| u32::try_from(-1i64));
    /// assert!(result.is_err());
    /// assert!(union.is_valueless());
    /// ```
    pub fn try_emplace_with<const I: usize, E, F>(
        &mut self,
        make: F,
    ) -> Result<&mut <A as At<I>>::Type, E>
    where
        A: At<I>,
        F: FnOnce() -> Result<<A as At<I>>::Type, E>,
    {
        let log = UnwindLog::arm(core::any::type_name::<<A as At<I>>::Type>());
        // SAFETY: `At<I>::Type` is alternative `I` of `A`.
        let result = unsafe { self.raw.try_emplace_with(I, make) };
        log.defuse();
        if result.is_err() {
            trace::debug!(
                alternative = core::any::type_name::<<A as At<I>>::Type>(),
                "variant left valueless by a failed constructor"
            );
        }
        result
    }

    /// Stores `value` as alternative `I`.
    ///
    /// If alternative `I` is active, `value` is assigned to it and nothing is
    /// destroyed or constructed; otherwise the active value is destroyed and
    /// `value` is moved in. Since `value` is already built, the union never
    /// becomes valueless.
    #[inline]
    pub fn assign<const I: usize>(&mut self, value: <A as At<I>>::Type) -> &mut <A as At<I>>::Type
    where
        A: At<I>,
    {
        // SAFETY: `At<I>::Type` is alternative `I` of `A`.
        unsafe { self.raw.assign(I, value) }
    }

    /// Stores `value` as the alternative of its type, like
    /// [`assign`](Self::assign).
    #[inline]
    pub fn set<T, M>(&mut self, value: T) -> &mut T
    where
        A: Locate<T, M>,
    {
        // SAFETY: `T` is alternative `INDEX` of `A`.
        unsafe { self.raw.assign(<A as Locate<T, M>>::INDEX, value) }
    }

    /// Converts `value` into the alternative `T` and stores it like
    /// [`set`](Self::set).
    ///
    /// The conversion runs before the union is touched, so a panicking
    /// conversion leaves the active value in place.
    ///
    /// ```
    /// use polyvalue::Variant;
    ///
    /// let mut union: Variant<(u64, String)> = Variant::new(1u64);
    /// union.assign_into::<String, _, _>("converted");
    /// assert_eq!(union.get::<1>().map(String::as_str), Ok("converted"));
    /// ```
    #[inline]
    pub fn assign_into<T, M, U>(&mut self, value: U) -> &mut T
    where
        A: Locate<T, M>,
        U: Into<T>,
    {
        let value = value.into();
        self.set::<T, M>(value)
    }

    /// Builds a value of alternative `I` with `make` and stores it like
    /// [`assign`](Self::assign).
    ///
    /// The value is built before the union is touched, so if `make` fails the
    /// error is returned and the union is left unchanged.
    #[inline]
    pub fn try_assign_with<const I: usize, E, F>(
        &mut self,
        make: F,
    ) -> Result<&mut <A as At<I>>::Type, E>
    where
        A: At<I>,
        F: FnOnce() -> Result<<A as At<I>>::Type, E>,
    {
        let value = make()?;
        Ok(self.assign::<I>(value))
    }

    /// Moves the value of `source` into `self`.
    ///
    /// When both hold the same alternative the value is move-assigned;
    /// otherwise the active value is destroyed and the value of `source`
    /// relocated. A valueless `source` makes `self` valueless.
    #[inline]
    pub fn assign_from(&mut self, mut source: Self) {
        self.raw.move_assign_from(&mut source.raw);
    }

    /// Exchanges the values of two unions.
    ///
    /// - same alternative: the values are swapped in place;
    /// - exactly one valueless: the value moves across and its former union is
    ///   left valueless;
    /// - different alternatives: the values rotate through a temporary;
    /// - both valueless: nothing happens.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.raw.swap(&mut other.raw);
    }
}

impl<A> Default for Variant<A>
where
    A: At<0>,
    <A as At<0>>::Type: Default,
{
    /// Creates a union holding the default value of alternative 0.
    #[inline]
    fn default() -> Self {
        Self::new_at::<0>(Default::default())
    }
}

impl<A> Clone for Variant<A>
where
    A: Alternatives,
    A::List: Row<CopyConstruct> + Row<CopyAssign>,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
        }
    }

    /// Copies the value of `source` into `self`.
    ///
    /// When both hold the same alternative the value is assigned through
    /// [`Clone::clone_from`] of that alternative, without destroying anything.
    /// Otherwise the active value is destroyed and a clone constructed; if the
    /// clone panics, `self` is left valueless.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        match source.type_name() {
            Some(alternative) if self.index() != source.index() => {
                let log = UnwindLog::arm(alternative);
                self.raw.clone_assign_from(&source.raw);
                log.defuse();
            }
            _ => self.raw.clone_assign_from(&source.raw),
        }
    }
}

impl<A> fmt::Debug for Variant<A>
where
    A: Alternatives,
    A::List: Row<Format>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variant").field(&self.raw).finish()
    }
}

impl<A> PartialEq for Variant<A>
where
    A: Alternatives,
    A::List: Row<Equal>,
{
    /// Two unions are equal when they hold the same alternative with equal
    /// values, or are both valueless.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<A> PartialOrd for Variant<A>
where
    A: Alternatives,
    A::List: Row<Equal> + Row<Compare>,
{
    /// Valueless unions order first, then unions order by index, then by the
    /// values of their common alternative.
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.raw.partial_cmp(&other.raw)
    }
}
