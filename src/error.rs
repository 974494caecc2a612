//! Errors returned by checked access.
//!
//! Both error types are plain values that implement [`core::error::Error`],
//! so they can be propagated with `?` into any error type that accepts one.

/// A value was requested as a type or alternative it does not currently hold.
///
/// Returned by checked extraction from an [`AnyBox`](crate::AnyBox), a
/// [`Variant`](crate::Variant) or a [`Maybe`](crate::Maybe).
///
/// # Examples
///
/// ```
/// use polyvalue::AnyBox;
///
/// let boxed = AnyBox::new(5u8);
/// let error = boxed.get::<u16>().unwrap_err();
/// assert_eq!(error.requested, "u16");
/// assert_eq!(error.held, Some("u8"));
/// assert_eq!(error.to_string(), "bad access: requested `u16` but holds `u8`");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BadAccess {
    /// The name of the requested type.
    pub requested: &'static str,
    /// The name of the type currently held, or `None` if nothing is held.
    pub held: Option<&'static str>,
}

impl BadAccess {
    /// Creates an error for a request of `T` from a container holding a value
    /// of the type named `held`, if any.
    #[inline]
    pub fn new<T: ?Sized>(held: Option<&'static str>) -> Self {
        Self {
            requested: core::any::type_name::<T>(),
            held,
        }
    }
}

impl core::fmt::Debug for BadAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BadAccess")
            .field("requested", &self.requested)
            .field("held", &self.held)
            .finish()
    }
}

impl core::fmt::Display for BadAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.held {
            Some(held) => write!(f, "bad access: requested `{}` but holds `{held}`", self.requested),
            None => write!(f, "bad access: requested `{}` but holds nothing", self.requested),
        }
    }
}

impl core::error::Error for BadAccess {}

/// An operation needed a live alternative but a union was valueless.
///
/// Returned by [`visit`](crate::visit) and [`visit_as`](crate::visit_as) when
/// any operand is valueless.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValuelessAccess;

impl core::fmt::Debug for ValuelessAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ValuelessAccess").finish()
    }
}

impl core::fmt::Display for ValuelessAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "access to a valueless variant")
    }
}

impl core::error::Error for ValuelessAccess {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            BadAccess::new::<u32>(None).to_string(),
            "bad access: requested `u32` but holds nothing"
        );
        assert_eq!(
            BadAccess::new::<str>(Some("i8")).to_string(),
            "bad access: requested `str` but holds `i8`"
        );
        assert_eq!(ValuelessAccess.to_string(), "access to a valueless variant");
    }

    #[test]
    fn test_is_error() {
        fn takes_error(_: &dyn core::error::Error) {}
        takes_error(&ValuelessAccess);
        takes_error(&BadAccess::new::<()>(None));
    }
}
