//! Vtable for type-erased box operations.
//!
//! This module contains the [`BoxVtable`] which lets a [`RawBox`] copy, move,
//! swap and destroy its value after the concrete type `T` has been erased.
//!
//! A value is stored in one of two ways, fixed per type at compile time by
//! [`fits_inline`]:
//!
//! - **inline**: the value lives directly in the box's buffer, and the
//!   vtable holds the functions from [`ops`];
//! - **indirect**: the buffer holds a single pointer to a heap allocation
//!   made with [`Box`](alloc::boxed::Box), and the vtable holds the
//!   functions from the [`indirect`] module, which follow that pointer.
//!
//! This module encapsulates the fields of [`BoxVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's functions match the type and the storage strategy
//! of the value in the buffer they are called on**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via [`BoxVtable::new`], which pairs the function pointers with
//! a specific type `T` and with the strategy [`store`] uses for that `T`.
//!
//! [`RawBox`]: crate::boxed::RawBox

use core::{any::TypeId, ptr::NonNull};

use crate::{
    capability::{Capabilities, fits_inline},
    ops::{self, Binary, Unary},
    util::Erased,
};

/// Vtable for type-erased box operations.
///
/// # Safety Invariant
///
/// The function pointer fields are guaranteed to point to the functions of
/// either [`ops`] or [`indirect`] instantiated with the value type `T` that was
/// used to create this [`BoxVtable`], picking [`ops`] exactly when
/// `fits_inline::<T>()` holds.
pub(crate) struct BoxVtable {
    /// Gets the [`TypeId`] of the value type.
    type_id: fn() -> TypeId,
    /// Gets the name of the value type.
    type_name: fn() -> &'static str,
    /// Static properties of the value type.
    capabilities: Capabilities,
    /// Drops the value and releases its storage.
    destroy: Unary,
    /// Clones the value into a vacant buffer.
    copy_construct: Binary,
    /// Relocates the value into a vacant buffer.
    move_construct: Binary,
    /// Clones the value into a buffer holding a value of the same type.
    copy_assign: Binary,
    /// Moves the value into a buffer holding a value of the same type.
    move_assign: Binary,
    /// Exchanges two values of the same type.
    swap: Binary,
}

impl BoxVtable {
    /// Creates a new [`BoxVtable`] for the value type `T`.
    pub(super) const fn new<T: Clone + 'static>() -> &'static Self {
        const {
            if fits_inline::<T>() {
                &Self {
                    type_id: TypeId::of::<T>,
                    type_name: core::any::type_name::<T>,
                    capabilities: Capabilities::of::<T>(),
                    destroy: ops::destroy::<T>,
                    copy_construct: ops::copy_construct::<T>,
                    move_construct: ops::move_construct::<T>,
                    copy_assign: ops::copy_assign::<T>,
                    move_assign: ops::move_assign::<T>,
                    swap: ops::swap::<T>,
                }
            } else {
                &Self {
                    type_id: TypeId::of::<T>,
                    type_name: core::any::type_name::<T>,
                    capabilities: Capabilities::of::<T>(),
                    destroy: indirect::destroy::<T>,
                    copy_construct: indirect::copy_construct::<T>,
                    move_construct: indirect::move_construct::<T>,
                    copy_assign: indirect::copy_assign::<T>,
                    move_assign: indirect::move_assign::<T>,
                    swap: indirect::swap::<T>,
                }
            }
        }
    }

    /// Gets the [`TypeId`] of the value type that was used to create this
    /// [`BoxVtable`].
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the name of the value type that was used to create this
    /// [`BoxVtable`].
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Gets the static properties of the value type.
    #[inline]
    pub(super) fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Destroys the value in the buffer at `slot`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds a value stored for this [`BoxVtable`]'s type.
    /// 2. The value is not used afterwards.
    #[inline]
    pub(super) unsafe fn destroy(&self, slot: NonNull<Erased>) {
        // SAFETY: `self.destroy` matches the type and strategy of the value at
        // `slot`, see the safety invariant of this type.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.destroy)(slot) }
    }

    /// Clones the value in the buffer at `src` into the vacant buffer at `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value stored for this [`BoxVtable`]'s type.
    /// 2. `dst` is a vacant buffer distinct from `src`.
    #[inline]
    pub(super) unsafe fn copy_construct(&self, dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY: `self.copy_construct` matches the type and strategy of the
        // value at `src`, see the safety invariant of this type.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.copy_construct)(dst, src) }
    }

    /// Relocates the value in the buffer at `src` into the vacant buffer at
    /// `dst`. Afterwards `src` is vacant.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value stored for this [`BoxVtable`]'s type, and is
    ///    treated as vacant afterwards.
    /// 2. `dst` is a vacant buffer distinct from `src`.
    #[inline]
    pub(super) unsafe fn move_construct(&self, dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY: `self.move_construct` matches the type and strategy of the
        // value at `src`, see the safety invariant of this type.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.move_construct)(dst, src) }
    }

    /// Clone-assigns the value at `src` to the value at `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `src` and `dst` hold values stored for this [`BoxVtable`]'s
    ///    type, in distinct buffers.
    #[inline]
    pub(super) unsafe fn copy_assign(&self, dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY: `self.copy_assign` matches the type and strategy of both
        // values, see the safety invariant of this type.
        // 1. Guaranteed by the caller
        unsafe { (self.copy_assign)(dst, src) }
    }

    /// Move-assigns the value at `src` to the value at `dst`. Afterwards
    /// `src` is vacant.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `src` and `dst` hold values stored for this [`BoxVtable`]'s
    ///    type, in distinct buffers.
    /// 2. `src` is treated as vacant afterwards.
    #[inline]
    pub(super) unsafe fn move_assign(&self, dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY: `self.move_assign` matches the type and strategy of both
        // values, see the safety invariant of this type.
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.move_assign)(dst, src) }
    }

    /// Exchanges the values at `a` and `b`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `a` and `b` hold values stored for this [`BoxVtable`]'s type,
    ///    in distinct buffers.
    #[inline]
    pub(super) unsafe fn swap(&self, a: NonNull<Erased>, b: NonNull<Erased>) {
        // SAFETY: `self.swap` matches the type and strategy of both values,
        // see the safety invariant of this type.
        // 1. Guaranteed by the caller
        unsafe { (self.swap)(a, b) }
    }
}

/// Stores `value` in the vacant buffer at `slot`, using the strategy that
/// [`BoxVtable::new::<T>`] expects.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` is a vacant box buffer.
pub(super) unsafe fn store<T>(slot: NonNull<Erased>, value: T) -> NonNull<T> {
    if fits_inline::<T>() {
        let slot = slot.cast::<T>();
        // SAFETY: the buffer is vacant and large and aligned enough for `T` since
        // `fits_inline::<T>()` holds.
        // 1. Guaranteed by the caller
        unsafe { slot.write(value) };
        slot
    } else {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { indirect::store(slot, value) }
    }
}

/// Returns the address of the value stored in the buffer at `slot`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` holds a `T` stored with [`store::<T>`].
pub(super) unsafe fn value<T>(slot: NonNull<Erased>) -> NonNull<T> {
    if fits_inline::<T>() {
        slot.cast::<T>()
    } else {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { indirect::target(slot) }
    }
}

/// Moves the value stored in the buffer at `slot` out, leaving the buffer
/// vacant.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` holds a `T` stored with [`store::<T>`].
/// 2. The buffer is treated as vacant afterwards.
pub(super) unsafe fn take<T>(slot: NonNull<Erased>) -> T {
    if fits_inline::<T>() {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { slot.cast::<T>().read() }
    } else {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { indirect::take(slot) }
    }
}

/// Lifecycle operations for values stored behind a heap allocation.
///
/// The buffer holds a `NonNull<T>` created from
/// [`Box::leak`](alloc::boxed::Box::leak). Each function follows that pointer
/// and delegates to the value's own operations.
mod indirect {
    use alloc::boxed::Box;
    use core::ptr::NonNull;

    use crate::util::Erased;

    /// Reads the heap pointer stored in the buffer at `slot`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds a heap pointer to a live `T`.
    pub(super) unsafe fn target<T>(slot: NonNull<Erased>) -> NonNull<T> {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { slot.cast::<NonNull<T>>().read() }
    }

    /// Moves `value` to the heap and stores the pointer in the vacant buffer
    /// at `slot`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` is a vacant box buffer.
    pub(super) unsafe fn store<T>(slot: NonNull<Erased>, value: T) -> NonNull<T> {
        let heap = NonNull::from(Box::leak(Box::new(value)));
        // SAFETY: every box buffer is large and aligned enough for a pointer.
        // 1. Guaranteed by the caller
        unsafe { slot.cast::<NonNull<T>>().write(heap) };
        heap
    }

    /// Moves the value out of its heap allocation and frees it.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds a heap pointer to a live `T`.
    /// 2. The buffer is treated as vacant afterwards.
    pub(super) unsafe fn take<T>(slot: NonNull<Erased>) -> T {
        // SAFETY:
        // 1. Guaranteed by the caller
        let heap = unsafe { target::<T>(slot) };
        // SAFETY: the pointer was created by `Box::leak` in `store` and
        // ownership is transferred here.
        // 2. Guaranteed by the caller
        let boxed = unsafe { Box::from_raw(heap.as_ptr()) };
        *boxed
    }

    /// Drops the value and frees its heap allocation.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds a heap pointer to a live `T`.
    /// 2. The buffer is treated as vacant afterwards.
    pub(super) unsafe fn destroy<T>(slot: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        drop(unsafe { take::<T>(slot) });
    }

    /// Clones the value into a new heap allocation stored at `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a heap pointer to a live `T`.
    /// 2. `dst` is a vacant box buffer.
    pub(super) unsafe fn copy_construct<T: Clone>(dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let source = unsafe { target::<T>(src) };
        // SAFETY: the allocation holds a live `T`.
        let value = unsafe { source.as_ref() }.clone();
        // SAFETY:
        // 2. Guaranteed by the caller
        unsafe { store(dst, value) };
    }

    /// Transfers the heap allocation from `src` to `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a heap pointer to a live `T`, and is treated as vacant
    ///    afterwards.
    /// 2. `dst` is a vacant box buffer.
    pub(super) unsafe fn move_construct<T>(dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let heap = unsafe { target::<T>(src) };
        // SAFETY:
        // 2. Guaranteed by the caller
        unsafe { dst.cast::<NonNull<T>>().write(heap) };
    }

    /// Clone-assigns the value behind `src` to the value behind `dst`, reusing
    /// the allocation of `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `dst` and `src` hold heap pointers to distinct live `T`s.
    pub(super) unsafe fn copy_assign<T: Clone>(dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let source = unsafe { target::<T>(src) };
        // SAFETY:
        // 1. Guaranteed by the caller
        let mut destination = unsafe { target::<T>(dst) };
        // SAFETY: the allocations are distinct and live as guaranteed by the
        // caller, so this unique reference does not alias `source`.
        let destination: &mut T = unsafe { destination.as_mut() };
        // SAFETY: as above.
        let source: &T = unsafe { source.as_ref() };
        destination.clone_from(source);
    }

    /// Moves the value behind `src` into the value behind `dst`, reusing the
    /// allocation of `dst` and freeing the one of `src`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `dst` and `src` hold heap pointers to distinct live `T`s.
    /// 2. `src` is treated as vacant afterwards.
    pub(super) unsafe fn move_assign<T>(dst: NonNull<Erased>, src: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        let value: T = unsafe { take::<T>(src) };
        // SAFETY:
        // 1. Guaranteed by the caller
        let mut destination = unsafe { target::<T>(dst) };
        // SAFETY: the allocation behind `dst` holds a live `T` that nothing else
        // borrows, as guaranteed by the caller.
        let destination: &mut T = unsafe { destination.as_mut() };
        *destination = value;
    }

    /// Exchanges the heap pointers stored at `a` and `b`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both `a` and `b` hold heap pointers to live `T`s, in distinct
    ///    buffers.
    pub(super) unsafe fn swap<T>(a: NonNull<Erased>, b: NonNull<Erased>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe {
            core::ptr::swap_nonoverlapping(
                a.cast::<NonNull<T>>().as_ptr(),
                b.cast::<NonNull<T>>().as_ptr(),
                1,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[test]
    fn test_box_vtable_eq() {
        // Vtables are promoted to statics and shared between uses
        let vtable1 = BoxVtable::new::<i32>();
        let vtable2 = BoxVtable::new::<i32>();
        assert!(core::ptr::eq(vtable1, vtable2));
    }

    #[test]
    fn test_box_vtable_type_identity() {
        let vtable = BoxVtable::new::<String>();
        assert_eq!(vtable.type_id(), TypeId::of::<String>());
        assert_eq!(vtable.type_name(), core::any::type_name::<String>());
        assert!(!vtable.capabilities().inline);
        assert!(BoxVtable::new::<u64>().capabilities().inline);
    }
}
