//! A single owned value of any clonable type.
//!
//! An [`AnyBox`] is the type-erased counterpart of a plain value: it can hold
//! a value of any `T: Clone + 'static`, chosen when the value is stored, and it
//! can be cloned, swapped and reassigned without knowing that type. Values no
//! larger than two machine words (and not over-aligned) are stored inline;
//! anything else is stored behind one heap allocation owned by the box.
//!
//! ```
//! use polyvalue::AnyBox;
//!
//! let mut boxed = AnyBox::new(String::from("ciao"));
//! assert!(boxed.is::<String>());
//! boxed.get_mut::<String>()?.push_str(" mare");
//! assert_eq!(boxed.get::<String>()?, "ciao mare");
//!
//! boxed.set(42u64);
//! assert_eq!(boxed.cloned::<u64>()?, 42);
//! assert!(boxed.is_inline());
//! # Ok::<(), polyvalue::BadAccess>(())
//! ```

use core::any::TypeId;

use polyvalue_internals::{RawBox, capability::fits_inline};

use crate::{error::BadAccess, trace};

/// Runtime identity of the type held by an [`AnyBox`].
///
/// Two tokens compare equal exactly when they identify the same type. An
/// empty box reports the canonical [`TypeToken::empty`] token, which is
/// distinct from the token of every type a box can hold.
#[derive(Clone, Copy)]
pub struct TypeToken {
    /// Identity of the type.
    id: TypeId,
    /// Name of the type, for diagnostics.
    name: &'static str,
}

/// Stands in for the type of an empty box; no value of it can exist.
enum Empty {}

impl TypeToken {
    /// Returns the token of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Returns the token reported by empty boxes.
    #[inline]
    pub fn empty() -> Self {
        Self {
            id: TypeId::of::<Empty>(),
            name: "<empty>",
        }
    }

    /// Returns whether this is the token of an empty box.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.id == TypeId::of::<Empty>()
    }

    /// Returns the [`TypeId`] of the type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the name of the type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeToken {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl core::hash::Hash for TypeToken {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl core::fmt::Debug for TypeToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("TypeToken").field(&self.name).finish()
    }
}

/// An owned value of a type chosen at runtime, or nothing.
///
/// See the [module documentation](self) for the storage strategy.
///
/// Cloning a box clones the held value; [`Clone::clone_from`] assigns through
/// the held type's own [`Clone::clone_from`] when both boxes hold the same
/// type.
#[derive(Default)]
pub struct AnyBox {
    /// The erased storage.
    raw: RawBox,
}

impl AnyBox {
    /// Creates a box that holds no value.
    ///
    /// ```
    /// use polyvalue::{AnyBox, TypeToken};
    ///
    /// let boxed = AnyBox::empty();
    /// assert!(!boxed.has_value());
    /// assert_eq!(boxed.type_token(), TypeToken::empty());
    /// ```
    #[inline]
    pub const fn empty() -> Self {
        Self {
            raw: RawBox::empty(),
        }
    }

    /// Creates a box holding `value`.
    #[inline]
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        log_indirect::<T>();
        Self {
            raw: RawBox::new(value),
        }
    }

    /// Creates a box holding the value returned by `make`.
    #[inline]
    pub fn new_with<T, F>(make: F) -> Self
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        Self::new(make())
    }

    /// Replaces the held value with `value` and returns a reference to it.
    ///
    /// Any previous value is destroyed, even if it has the same type.
    #[inline]
    pub fn emplace<T: Clone + 'static>(&mut self, value: T) -> &mut T {
        log_indirect::<T>();
        self.raw.emplace(value)
    }

    /// Replaces the held value with the value returned by `make` and returns a
    /// reference to it.
    ///
    /// If `make` panics, the box keeps its previous value.
    #[inline]
    pub fn emplace_with<T, F>(&mut self, make: F) -> &mut T
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        self.emplace(make())
    }

    /// Replaces the held value with `value`.
    ///
    /// If the box already holds a `T`, `value` is assigned to it in place.
    ///
    /// ```
    /// use polyvalue::AnyBox;
    ///
    /// let mut boxed = AnyBox::new('a');
    /// boxed.set(String::from("b"));
    /// assert_eq!(boxed.get::<String>().map(String::as_str), Ok("b"));
    /// ```
    #[inline]
    pub fn set<T: Clone + 'static>(&mut self, value: T) {
        if !self.raw.is::<T>() {
            log_indirect::<T>();
        }
        self.raw.assign(value);
    }

    /// Destroys the held value, if any.
    #[inline]
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Exchanges the values of two boxes.
    ///
    /// A value moving into an empty box is relocated without being cloned, and
    /// leaves its former box empty.
    ///
    /// ```
    /// use polyvalue::AnyBox;
    ///
    /// let mut a = AnyBox::new(1u8);
    /// let mut b = AnyBox::new("two");
    /// a.swap(&mut b);
    /// assert_eq!(a.get::<&str>(), Ok(&"two"));
    /// assert_eq!(b.get::<u8>(), Ok(&1));
    /// ```
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.raw.swap(&mut other.raw);
    }

    /// Returns whether the box holds a value.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.raw.has_value()
    }

    /// Returns the identity of the held type, or [`TypeToken::empty`].
    #[inline]
    pub fn type_token(&self) -> TypeToken {
        match (self.raw.type_id(), self.raw.type_name()) {
            (Some(id), Some(name)) => TypeToken { id, name },
            _ => TypeToken::empty(),
        }
    }

    /// Returns whether the box holds a `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.raw.is::<T>()
    }

    /// Returns whether the held value is stored inline, or `false` if the box
    /// is empty.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.raw
            .capabilities()
            .is_some_and(|capabilities| capabilities.inline)
    }

    /// Returns a reference to the held value as a `T`.
    #[inline]
    pub fn get<T: 'static>(&self) -> Result<&T, BadAccess> {
        let held = self.raw.type_name();
        self.raw
            .downcast_ref::<T>()
            .ok_or_else(|| BadAccess::new::<T>(held))
    }

    /// Returns a mutable reference to the held value as a `T`.
    #[inline]
    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T, BadAccess> {
        let held = self.raw.type_name();
        self.raw
            .downcast_mut::<T>()
            .ok_or_else(|| BadAccess::new::<T>(held))
    }

    /// Returns a clone of the held value as a `T`.
    #[inline]
    pub fn cloned<T: Clone + 'static>(&self) -> Result<T, BadAccess> {
        self.get::<T>().cloned()
    }

    /// Moves the held value out as a `T`, leaving the box empty.
    ///
    /// On mismatch the box is left untouched.
    #[inline]
    pub fn take<T: 'static>(&mut self) -> Result<T, BadAccess> {
        let held = self.raw.type_name();
        self.raw.take::<T>().ok_or_else(|| BadAccess::new::<T>(held))
    }

    /// Consumes the box and returns the held value as a `T`, or the box itself
    /// on mismatch.
    ///
    /// ```
    /// use polyvalue::AnyBox;
    ///
    /// let boxed = AnyBox::new(3i64);
    /// let boxed = boxed.downcast::<i32>().unwrap_err();
    /// assert_eq!(boxed.downcast::<i64>().ok(), Some(3));
    /// ```
    #[inline]
    pub fn downcast<T: 'static>(mut self) -> Result<T, Self> {
        self.raw.take::<T>().ok_or(self)
    }

    /// Returns a reference to the held value if it is a `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.raw.downcast_ref::<T>()
    }

    /// Returns a mutable reference to the held value if it is a `T`.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.raw.downcast_mut::<T>()
    }
}

impl Clone for AnyBox {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
        }
    }

    #[inline]
    fn clone_from(&mut self, source: &Self) {
        self.raw.clone_assign_from(&source.raw);
    }
}

impl core::fmt::Debug for AnyBox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AnyBox")
            .field(&self.type_token().name())
            .finish()
    }
}

/// Logs that a `T` is about to be stored on the heap.
#[inline]
fn log_indirect<T>() {
    if !fits_inline::<T>() {
        trace::trace!(
            type_name = core::any::type_name::<T>(),
            size = size_of::<T>(),
            "storing boxed value indirectly"
        );
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, rc::Rc, string::String, vec::Vec};
    use core::cell::Cell;

    use super::*;

    static_assertions::assert_not_impl_any!(AnyBox: Send, Sync);

    #[test]
    fn test_extract_as_stored_type() {
        let boxed = AnyBox::new(String::from("value"));
        assert_eq!(boxed.get::<String>().map(String::as_str), Ok("value"));
        assert_eq!(boxed.cloned::<String>().as_deref(), Ok("value"));
        let error = boxed.get::<&str>().unwrap_err();
        assert_eq!(error.held, Some(core::any::type_name::<String>()));
        assert!(boxed.downcast_ref::<&str>().is_none());
    }

    #[test]
    fn test_empty_box() {
        let mut boxed = AnyBox::default();
        assert!(!boxed.has_value());
        assert!(!boxed.is_inline());
        assert!(boxed.type_token().is_empty());
        assert_eq!(boxed.get::<u8>(), Err(BadAccess::new::<u8>(None)));
        assert!(boxed.downcast_mut::<u8>().is_none());
        assert_eq!(format!("{boxed:?}"), "AnyBox(\"<empty>\")");
    }

    #[test]
    fn test_type_token() {
        let boxed = AnyBox::new(1u16);
        assert_eq!(boxed.type_token(), TypeToken::of::<u16>());
        assert_ne!(boxed.type_token(), TypeToken::of::<u32>());
        assert_ne!(boxed.type_token(), TypeToken::empty());
        assert_eq!(boxed.type_token().name(), "u16");
        assert_eq!(boxed.type_token().id(), TypeId::of::<u16>());
    }

    #[test]
    fn test_inline_policy() {
        assert!(AnyBox::new(0usize).is_inline());
        assert!(AnyBox::new((0usize, 0usize)).is_inline());
        assert!(!AnyBox::new([0usize; 4]).is_inline());
    }

    #[test]
    fn test_take_and_downcast() {
        let mut boxed = AnyBox::new(Vec::from([1, 2, 3]));
        assert!(boxed.take::<String>().is_err());
        assert!(boxed.has_value());
        assert_eq!(boxed.take::<Vec<i32>>(), Ok(Vec::from([1, 2, 3])));
        assert!(!boxed.has_value());

        let boxed = AnyBox::new_with(|| 'c');
        assert_eq!(boxed.downcast::<char>().ok(), Some('c'));
    }

    #[test]
    fn test_swap_twice_restores() {
        let mut a = AnyBox::new(String::from("left"));
        let mut b = AnyBox::new([7u64; 5]);
        a.swap(&mut b);
        assert!(a.is::<[u64; 5]>());
        assert!(b.is::<String>());
        a.swap(&mut b);
        assert_eq!(a.get::<String>().map(String::as_str), Ok("left"));
        assert_eq!(b.get::<[u64; 5]>(), Ok(&[7; 5]));
    }

    /// Counts how often it is cloned.
    struct CloneCount(Rc<Cell<usize>>);

    impl Clone for CloneCount {
        fn clone(&self) -> Self {
            self.0.set(self.0.get() + 1);
            Self(Rc::clone(&self.0))
        }
    }

    #[test]
    fn test_swap_with_empty_never_copies() {
        let clones = Rc::new(Cell::new(0));
        let mut full = AnyBox::new(CloneCount(Rc::clone(&clones)));
        let mut empty = AnyBox::empty();
        full.swap(&mut empty);
        assert!(!full.has_value());
        assert!(empty.is::<CloneCount>());
        empty.swap(&mut full);
        assert!(full.is::<CloneCount>());
        assert_eq!(clones.get(), 0);
    }

    #[test]
    fn test_emplace_and_set() {
        let mut boxed = AnyBox::empty();
        *boxed.emplace(1u32) += 1;
        assert_eq!(boxed.get::<u32>(), Ok(&2));
        boxed.emplace_with(|| String::from("now a string"));
        assert!(boxed.is::<String>());
        boxed.set(String::from("assigned"));
        assert_eq!(boxed.get::<String>().map(String::as_str), Ok("assigned"));
        boxed.reset();
        assert!(!boxed.has_value());
    }

    #[test]
    fn test_clone_from_same_type_assigns() {
        let clones = Rc::new(Cell::new(0));
        let source = AnyBox::new(CloneCount(Rc::clone(&clones)));
        let mut target = source.clone();
        assert_eq!(clones.get(), 1);
        target.clone_from(&source);
        assert_eq!(clones.get(), 2);
        assert!(target.is::<CloneCount>());

        let mut other = AnyBox::new(5u8);
        other.clone_from(&source);
        assert!(other.is::<CloneCount>());
    }
}
