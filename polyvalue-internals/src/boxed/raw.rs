//! Type-erased owned value with inline or indirect storage.
//!
//! This module encapsulates the `buffer` and `vtable` fields of [`RawBox`],
//! ensuring they are only visible within this module. This visibility
//! restriction guarantees the safety invariant: **the vtable is present if and
//! only if the buffer holds a value, and then it was created for the type and
//! strategy the value was stored with**.
//!
//! # Safety Invariant
//!
//! A value only enters the buffer through [`store`], immediately followed by
//! setting `vtable` to [`BoxVtable::new`] for the same type, or through one of
//! the vtable's own constructing operations, immediately followed by copying
//! that vtable. Every operation that vacates the buffer clears the vtable
//! first, so a panic in the middle of it can only leak, never double drop.

use core::{any::TypeId, marker::PhantomData, ptr::NonNull};

use crate::{
    boxed::vtable::{self, BoxVtable, store},
    capability::{Capabilities, InlineBuffer},
    util::Erased,
};

/// An owned value of a type chosen at construction time.
///
/// Values for which [`fits_inline`] holds live directly in the fixed-size
/// buffer; larger or over-aligned values live in a heap allocation owned by
/// the box, with the buffer holding the pointer.
///
/// [`fits_inline`]: crate::capability::fits_inline
pub struct RawBox {
    /// Storage for the value or for the pointer to it.
    ///
    /// # Safety
    ///
    /// Holds a value stored with [`store`] exactly when `vtable` is `Some`.
    buffer: InlineBuffer,
    /// The operations of the stored value.
    ///
    /// # Safety
    ///
    /// Created by [`BoxVtable::new`] for the type of the stored value.
    vtable: Option<&'static BoxVtable>,
    /// The stored value may be neither [`Send`] nor [`Sync`].
    _marker: PhantomData<*mut ()>,
}

impl RawBox {
    /// Creates a box that holds no value.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            buffer: InlineBuffer::uninit(),
            vtable: None,
            _marker: PhantomData,
        }
    }

    /// Creates a box holding `value`.
    #[inline]
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        let mut raw = Self::empty();
        raw.put(value);
        raw
    }

    /// Address of the buffer, for reading.
    #[inline]
    fn slot(&self) -> NonNull<Erased> {
        NonNull::from(&self.buffer).cast::<Erased>()
    }

    /// Address of the buffer, for writing.
    #[inline]
    fn slot_mut(&mut self) -> NonNull<Erased> {
        NonNull::from(&mut self.buffer).cast::<Erased>()
    }

    /// Stores `value` in the vacant buffer.
    fn put<T: Clone + 'static>(&mut self, value: T) -> &mut T {
        debug_assert!(self.vtable.is_none());
        let slot = self.slot_mut();
        // SAFETY: the buffer is vacant since `vtable` is `None`.
        let mut ptr = unsafe { store::<T>(slot, value) };
        self.vtable = Some(BoxVtable::new::<T>());
        // SAFETY: `ptr` points to the value just stored, which is owned by `self`
        // and therefore borrowed mutably for as long as `self` is.
        unsafe { ptr.as_mut() }
    }

    /// Returns whether the box holds a value.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.vtable.is_some()
    }

    /// Returns the [`TypeId`] of the held value, if any.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.vtable.map(|vtable| vtable.type_id())
    }

    /// Returns the name of the type of the held value, if any.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        self.vtable.map(|vtable| vtable.type_name())
    }

    /// Returns the static properties of the type of the held value, if any.
    #[inline]
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.vtable.map(|vtable| vtable.capabilities())
    }

    /// Returns whether the box holds a value of type `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<T>())
    }

    /// Returns a reference to the held value if it is a `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        // SAFETY: the buffer holds a `T` stored with `store::<T>`, since the
        // vtable was created for `T`.
        let ptr = unsafe { vtable::value::<T>(self.slot()) };
        // SAFETY: the value is live and owned by `self`.
        Some(unsafe { ptr.as_ref() })
    }

    /// Returns a mutable reference to the held value if it is a `T`.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if !self.is::<T>() {
            return None;
        }
        let slot = self.slot_mut();
        // SAFETY: the buffer holds a `T` stored with `store::<T>`, since the
        // vtable was created for `T`.
        let mut ptr = unsafe { vtable::value::<T>(slot) };
        // SAFETY: the value is live and uniquely borrowed through `self`.
        Some(unsafe { ptr.as_mut() })
    }

    /// Moves the held value out if it is a `T`, leaving the box empty.
    #[inline]
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        if !self.is::<T>() {
            return None;
        }
        self.vtable = None;
        let slot = self.slot_mut();
        // SAFETY: the buffer holds a `T` stored with `store::<T>`, and it is
        // treated as vacant from now on since `vtable` was cleared.
        Some(unsafe { vtable::take::<T>(slot) })
    }

    /// Replaces the held value with `value` and returns a reference to it.
    ///
    /// The previous value, if any, is destroyed after `value` is in place.
    pub fn emplace<T: Clone + 'static>(&mut self, value: T) -> &mut T {
        let mut previous = Self::empty();
        previous.move_assign_from(self);
        self.put(value)
    }

    /// Replaces the held value with `value`.
    ///
    /// If the box already holds a `T`, the value is assigned in place and any
    /// heap allocation is reused.
    pub fn assign<T: Clone + 'static>(&mut self, value: T) {
        match self.downcast_mut::<T>() {
            Some(current) => *current = value,
            None => {
                self.emplace(value);
            }
        }
    }

    /// Destroys the held value, if any.
    #[inline]
    pub fn reset(&mut self) {
        if let Some(vtable) = self.vtable.take() {
            let slot = self.slot_mut();
            // SAFETY: the buffer held a value for `vtable`, which is treated as
            // vacant from now on since `self.vtable` was cleared.
            unsafe { vtable.destroy(slot) };
        }
    }

    /// Moves the value of `source` into `self`, leaving `source` empty.
    ///
    /// When both hold values of the same type this is an assignment through the
    /// vtable; otherwise the current value is destroyed and the value of
    /// `source` is relocated.
    pub fn move_assign_from(&mut self, source: &mut Self) {
        let Some(incoming) = source.vtable.take() else {
            self.reset();
            return;
        };
        let src = source.slot_mut();
        match self.vtable {
            Some(current) if current.type_id() == incoming.type_id() => {
                let dst = self.slot_mut();
                // SAFETY: both buffers hold values of the type of `incoming`, and
                // `source` is treated as vacant since its vtable was cleared.
                unsafe { incoming.move_assign(dst, src) };
            }
            _ => {
                self.reset();
                let dst = self.slot_mut();
                // SAFETY: `source` holds a value for `incoming` and is treated as
                // vacant since its vtable was cleared; `self` was just emptied.
                unsafe { incoming.move_construct(dst, src) };
                self.vtable = Some(incoming);
            }
        }
    }

    /// Clones the value of `source` into `self`.
    ///
    /// When both hold values of the same type this is an assignment through the
    /// vtable; otherwise the current value is replaced by a clone.
    pub fn clone_assign_from(&mut self, source: &Self) {
        match (self.vtable, source.vtable) {
            (Some(current), Some(incoming)) if current.type_id() == incoming.type_id() => {
                let dst = self.slot_mut();
                // SAFETY: both buffers hold values of the same type, in distinct
                // boxes.
                unsafe { incoming.copy_assign(dst, source.slot()) };
            }
            _ => {
                let mut replacement = source.clone();
                self.move_assign_from(&mut replacement);
            }
        }
    }

    /// Exchanges the values of `self` and `other`.
    ///
    /// - both empty: nothing happens;
    /// - one empty: the value is relocated to the empty box;
    /// - same type: the values are swapped through the vtable;
    /// - different types: the values rotate through a temporary box.
    pub fn swap(&mut self, other: &mut Self) {
        match (self.vtable, other.vtable) {
            (None, None) => {}
            (Some(_), None) => other.move_assign_from(self),
            (None, Some(_)) => self.move_assign_from(other),
            (Some(current), Some(incoming)) if current.type_id() == incoming.type_id() => {
                let a = self.slot_mut();
                let b = other.slot_mut();
                // SAFETY: both buffers hold values of the same type, in distinct
                // boxes.
                unsafe { current.swap(a, b) };
            }
            (Some(_), Some(_)) => {
                let mut temporary = Self::empty();
                temporary.move_assign_from(self);
                self.move_assign_from(other);
                other.move_assign_from(&mut temporary);
            }
        }
    }
}

impl Clone for RawBox {
    fn clone(&self) -> Self {
        let mut copy = Self::empty();
        if let Some(vtable) = self.vtable {
            let dst = copy.slot_mut();
            // SAFETY: `self` holds a value for `vtable` and `copy` is vacant. If
            // cloning panics, `copy` still has no vtable and drops as empty.
            unsafe { vtable.copy_construct(dst, self.slot()) };
            copy.vtable = Some(vtable);
        }
        copy
    }
}

impl Default for RawBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for RawBox {
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl core::fmt::Debug for RawBox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawBox")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String, vec, vec::Vec};

    use super::*;

    static_assertions::assert_not_impl_any!(RawBox: Send, Sync);

    #[test]
    fn test_empty() {
        let raw = RawBox::empty();
        assert!(!raw.has_value());
        assert_eq!(raw.type_id(), None);
        assert_eq!(raw.downcast_ref::<i32>(), None);
    }

    #[test]
    fn test_inline_roundtrip() {
        let mut raw = RawBox::new(7u32);
        assert!(raw.has_value());
        assert!(raw.is::<u32>());
        assert!(!raw.is::<i32>());
        assert!(raw.capabilities().is_some_and(|caps| caps.inline));
        assert_eq!(raw.downcast_ref::<u32>(), Some(&7));
        *raw.downcast_mut::<u32>().unwrap() += 1;
        assert_eq!(raw.take::<u32>(), Some(8));
        assert!(!raw.has_value());
    }

    #[test]
    fn test_indirect_roundtrip() {
        let mut raw = RawBox::new(vec![1u8, 2, 3]);
        assert!(raw.capabilities().is_some_and(|caps| !caps.inline));
        assert_eq!(raw.downcast_ref::<Vec<u8>>().map(Vec::len), Some(3));
        assert_eq!(raw.take::<String>(), None);
        assert_eq!(raw.take::<Vec<u8>>(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_clone_and_drop_counts() {
        let shared = Rc::new(());
        let raw = RawBox::new(Rc::clone(&shared));
        let copy = raw.clone();
        assert_eq!(Rc::strong_count(&shared), 3);
        drop(raw);
        assert_eq!(Rc::strong_count(&shared), 2);
        drop(copy);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn test_swap_same_type() {
        let mut a = RawBox::new(String::from("a"));
        let mut b = RawBox::new(String::from("b"));
        a.swap(&mut b);
        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("b"));
        assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_swap_with_empty_relocates() {
        let mut full = RawBox::new(String::from("moved"));
        let mut empty = RawBox::empty();
        full.swap(&mut empty);
        assert!(!full.has_value());
        assert_eq!(empty.downcast_ref::<String>().map(String::as_str), Some("moved"));
    }

    #[test]
    fn test_swap_different_types() {
        let mut a = RawBox::new(1u8);
        let mut b = RawBox::new(String::from("text"));
        a.swap(&mut b);
        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("text"));
        assert_eq!(b.downcast_ref::<u8>(), Some(&1));
        a.swap(&mut b);
        assert_eq!(a.downcast_ref::<u8>(), Some(&1));
        assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("text"));
    }

    #[test]
    fn test_emplace_and_assign() {
        let mut raw = RawBox::new(1i32);
        *raw.emplace(String::from("x")) += "y";
        assert_eq!(raw.downcast_ref::<String>().map(String::as_str), Some("xy"));
        raw.assign(String::from("z"));
        assert_eq!(raw.downcast_ref::<String>().map(String::as_str), Some("z"));
        raw.assign(5i32);
        assert_eq!(raw.downcast_ref::<i32>(), Some(&5));
    }

    #[test]
    fn test_clone_assign_from() {
        let source = RawBox::new(String::from("source"));
        let mut same = RawBox::new(String::from("target"));
        same.clone_assign_from(&source);
        assert_eq!(same.downcast_ref::<String>().map(String::as_str), Some("source"));

        let mut other = RawBox::new(3u16);
        other.clone_assign_from(&source);
        assert_eq!(other.downcast_ref::<String>().map(String::as_str), Some("source"));

        other.clone_assign_from(&RawBox::empty());
        assert!(!other.has_value());
    }
}
