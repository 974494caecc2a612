//! Lifecycle operations over type-erased addresses.
//!
//! Each function in this module is generic over a value type `T` but takes
//! only [`NonNull<Erased>`] addresses, so that a pointer to any instantiation
//! fits one of a handful of function pointer types. Containers store such
//! pointers next to their type-erased storage and call them without knowing
//! `T`.
//!
//! Moves in Rust are destructive. [`move_construct`] and [`move_assign`]
//! therefore relocate the value: afterwards the source address holds no live
//! value and must not be destroyed.
//!
//! The zero-sized kinds at the bottom of this module ([`Destroy`],
//! [`CopyConstruct`], ...) select one of these functions per alternative of a
//! tagged union, see [`Row`](crate::list::Row).

use core::{cmp::Ordering, fmt, ptr::NonNull};

use crate::{
    list::{EntryFor, Kind, Row},
    util::Erased,
};

/// Signature of operations on one live value.
pub type Unary = unsafe fn(NonNull<Erased>);

/// Signature of operations on a destination and a source.
pub type Binary = unsafe fn(NonNull<Erased>, NonNull<Erased>);

/// Signature of formatting operations.
pub type FormatFn = unsafe fn(NonNull<Erased>, &mut fmt::Formatter<'_>) -> fmt::Result;

/// Signature of equality operations.
pub type EqualFn = unsafe fn(NonNull<Erased>, NonNull<Erased>) -> bool;

/// Signature of ordering operations.
pub type CompareFn = unsafe fn(NonNull<Erased>, NonNull<Erased>) -> Option<Ordering>;

/// Drops the `T` at `ptr`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `ptr` points to a live `T`.
/// 2. The value is not used afterwards, as it has been dropped.
pub unsafe fn destroy<T>(ptr: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    // 2. Guaranteed by the caller
    unsafe { ptr.cast::<T>().drop_in_place() }
}

/// Writes a clone of the `T` at `src` to `dst`.
///
/// If cloning panics, `dst` is left without a live value.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to a live `T`.
/// 2. `dst` is valid for writes of a `T` and holds no live value.
pub unsafe fn copy_construct<T: Clone>(dst: NonNull<Erased>, src: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    let source: &T = unsafe { src.cast::<T>().as_ref() };
    let value = source.clone();
    // SAFETY:
    // 2. Guaranteed by the caller
    unsafe { dst.cast::<T>().write(value) }
}

/// Relocates the `T` at `src` to `dst`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to a live `T`, which is considered moved out afterwards and
///    must not be used or dropped.
/// 2. `dst` is valid for writes of a `T`, holds no live value, and does not
///    overlap `src`.
pub unsafe fn move_construct<T>(dst: NonNull<Erased>, src: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    // 2. Guaranteed by the caller
    unsafe { src.cast::<T>().copy_to_nonoverlapping(dst.cast::<T>(), 1) }
}

/// Assigns a clone of the `T` at `src` to the live `T` at `dst`.
///
/// This uses [`Clone::clone_from`], so types can reuse their resources.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to a live `T`.
/// 2. `dst` points to a live `T` that may be mutated and does not overlap
///    `src`.
pub unsafe fn copy_assign<T: Clone>(dst: NonNull<Erased>, src: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    let source: &T = unsafe { src.cast::<T>().as_ref() };
    // SAFETY:
    // 2. Guaranteed by the caller
    let target: &mut T = unsafe { dst.cast::<T>().as_mut() };
    target.clone_from(source);
}

/// Moves the `T` at `src` into the live `T` at `dst`, dropping the previous
/// value at `dst`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to a live `T`, which is considered moved out afterwards and
///    must not be used or dropped.
/// 2. `dst` points to a live `T` that may be mutated and does not overlap
///    `src`.
pub unsafe fn move_assign<T>(dst: NonNull<Erased>, src: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    let value: T = unsafe { src.cast::<T>().read() };
    // SAFETY:
    // 2. Guaranteed by the caller
    let target: &mut T = unsafe { dst.cast::<T>().as_mut() };
    *target = value;
}

/// Exchanges the live values at `a` and `b`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `a` and `b` both point to a live `T` that may be mutated.
/// 2. `a` and `b` do not overlap.
pub unsafe fn swap<T>(a: NonNull<Erased>, b: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    // 2. Guaranteed by the caller
    unsafe { core::ptr::swap_nonoverlapping(a.cast::<T>().as_ptr(), b.cast::<T>().as_ptr(), 1) }
}

/// Formats the `T` at `ptr` with its [`Debug`](fmt::Debug) implementation.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `ptr` points to a live `T`.
pub unsafe fn debug<T: fmt::Debug>(
    ptr: NonNull<Erased>,
    formatter: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    // SAFETY:
    // 1. Guaranteed by the caller
    let value: &T = unsafe { ptr.cast::<T>().as_ref() };
    fmt::Debug::fmt(value, formatter)
}

/// Compares the values at `a` and `b` for equality.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `a` and `b` both point to a live `T`.
pub unsafe fn equal<T: PartialEq>(a: NonNull<Erased>, b: NonNull<Erased>) -> bool {
    // SAFETY:
    // 1. Guaranteed by the caller
    let a: &T = unsafe { a.cast::<T>().as_ref() };
    // SAFETY:
    // 1. Guaranteed by the caller
    let b: &T = unsafe { b.cast::<T>().as_ref() };
    a == b
}

/// Compares the values at `a` and `b` for ordering.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `a` and `b` both point to a live `T`.
pub unsafe fn compare<T: PartialOrd>(a: NonNull<Erased>, b: NonNull<Erased>) -> Option<Ordering> {
    // SAFETY:
    // 1. Guaranteed by the caller
    let a: &T = unsafe { a.cast::<T>().as_ref() };
    // SAFETY:
    // 1. Guaranteed by the caller
    let b: &T = unsafe { b.cast::<T>().as_ref() };
    a.partial_cmp(b)
}

/// Declares an operation kind and the functions it selects per alternative.
macro_rules! kinds {
    ($(
        $(#[$attr:meta])*
        $name:ident: $entry:ty = $function:ident $(where $bound:path)?;
    )*) => {$(
        $(#[$attr])*
        #[derive(Clone, Copy, Debug)]
        pub enum $name {}

        impl Kind for $name {
            type Entry = $entry;
        }

        impl<T $(: $bound)?> EntryFor<T> for $name {
            const ENTRY: $entry = $function::<T>;
        }
    )*};
}

kinds! {
    /// Selects [`destroy`].
    Destroy: Unary = destroy;
    /// Selects [`copy_construct`]; requires every alternative to be [`Clone`].
    CopyConstruct: Binary = copy_construct where Clone;
    /// Selects [`move_construct`].
    MoveConstruct: Binary = move_construct;
    /// Selects [`copy_assign`]; requires every alternative to be [`Clone`].
    CopyAssign: Binary = copy_assign where Clone;
    /// Selects [`move_assign`].
    MoveAssign: Binary = move_assign;
    /// Selects [`swap`].
    Swap: Binary = swap;
    /// Selects [`core::any::type_name`].
    TypeName: fn() -> &'static str = type_name;
    /// Selects [`debug`]; requires every alternative to be [`Debug`](fmt::Debug).
    Format: FormatFn = debug where fmt::Debug;
    /// Selects [`equal`]; requires every alternative to be [`PartialEq`].
    Equal: EqualFn = equal where PartialEq;
    /// Selects [`compare`]; requires every alternative to be [`PartialOrd`].
    Compare: CompareFn = compare where PartialOrd;
}

/// A list of alternatives whose rows for the unconditional operations exist.
///
/// Every list of [`Cons`](crate::list::Cons) cells implements this; it only
/// bundles the bounds so generic code can name them at once.
pub trait Lifecycle:
    Row<Destroy> + Row<MoveConstruct> + Row<MoveAssign> + Row<Swap> + Row<TypeName>
{
}

impl<L> Lifecycle for L where
    L: Row<Destroy> + Row<MoveConstruct> + Row<MoveAssign> + Row<Swap> + Row<TypeName>
{
}

/// Returns the name of `T`, as used by the [`TypeName`] kind.
fn type_name<T>() -> &'static str {
    core::any::type_name::<T>()
}
