//! Compile-time classification of value types.
//!
//! Containers need to know, per value type, how much room a value takes and
//! whether its lifecycle operations have observable effects. Everything in this
//! module is evaluated at compile time; nothing is stored per instance.
//!
//! Capabilities that depend on trait implementations (cloning, formatting,
//! comparison) are not predicates here. They surface as trait bounds on the
//! operation rows in [`ops`](crate::ops): a row only exists when every
//! alternative supports the operation, so a missing capability removes the
//! operation from the container's API instead of failing at runtime.

use core::mem::{MaybeUninit, align_of, needs_drop, size_of};

/// Number of bytes available for inline storage in a type-erased box.
pub const INLINE_SIZE: usize = 2 * size_of::<usize>();

/// Alignment of the inline buffer of a type-erased box.
///
/// This matches `max_align_t` on mainstream 64-bit targets.
pub const INLINE_ALIGN: usize = align_of::<InlineBuffer>();

/// The inline buffer of a type-erased box.
///
/// Holds either a value directly or a pointer to a heap allocation holding it.
#[repr(C, align(16))]
pub(crate) struct InlineBuffer(pub(crate) [MaybeUninit<u8>; INLINE_SIZE]);

impl InlineBuffer {
    /// Creates an uninitialized buffer.
    #[inline]
    pub(crate) const fn uninit() -> Self {
        Self([MaybeUninit::uninit(); INLINE_SIZE])
    }
}

/// Returns whether values of type `T` are stored directly inside a type-erased
/// box instead of behind a heap allocation.
#[inline]
pub const fn fits_inline<T>() -> bool {
    size_of::<T>() <= INLINE_SIZE && align_of::<T>() <= INLINE_ALIGN
}

/// Summary of the static properties of a value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Size of the value in bytes.
    pub size: usize,
    /// Alignment of the value in bytes.
    pub align: usize,
    /// Whether destroying a value is a no-op.
    pub trivially_destructible: bool,
    /// Whether a type-erased box stores the value inline.
    pub inline: bool,
}

impl Capabilities {
    /// Classifies the type `T`.
    #[inline]
    pub const fn of<T>() -> Self {
        Self {
            size: size_of::<T>(),
            align: align_of::<T>(),
            trivially_destructible: !needs_drop::<T>(),
            inline: fits_inline::<T>(),
        }
    }
}
