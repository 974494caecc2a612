//! Visitation of one or more unions.
//!
//! A visitor implements [`Visit`] for every combination of alternatives it
//! can be called with. For a single union the argument is the active
//! alternative itself; for two to four unions it is a tuple with one element
//! per union, in order. How each union is passed decides how its alternative
//! is passed: `&Variant` yields `&T`, `&mut Variant` yields `&mut T`, and a
//! `Variant` by value is consumed and yields `T`.
//!
//! ```
//! use polyvalue::{Variant, Visit, visit};
//!
//! struct Describe;
//!
//! impl Visit<(&i32, &i32)> for Describe {
//!     type Output = String;
//!     fn visit(&mut self, (a, b): (&i32, &i32)) -> String {
//!         format!("{}", a + b)
//!     }
//! }
//!
//! impl Visit<(&i32, &String)> for Describe {
//!     type Output = String;
//!     fn visit(&mut self, (a, b): (&i32, &String)) -> String {
//!         format!("{a}{b}")
//!     }
//! }
//!
//! impl Visit<(&String, &i32)> for Describe {
//!     type Output = String;
//!     fn visit(&mut self, (a, b): (&String, &i32)) -> String {
//!         format!("{a}{b}")
//!     }
//! }
//!
//! impl Visit<(&String, &String)> for Describe {
//!     type Output = String;
//!     fn visit(&mut self, (a, b): (&String, &String)) -> String {
//!         format!("{a} {b}")
//!     }
//! }
//!
//! let a: Variant<(i32, String)> = Variant::new(String::from("ciao"));
//! let b: Variant<(i32, String)> = Variant::new(2i32);
//! assert_eq!(visit(&mut Describe, (&a, &b))?, "ciao2");
//! # Ok::<(), polyvalue::ValuelessAccess>(())
//! ```

use core::ptr::NonNull;

use polyvalue_internals::{
    Erased, RawVariant,
    dispatch::{Convert, Exact, Extract, Operand, Operands, Selection, Table, Visit, dispatch},
    list::Nil,
};

use crate::{
    error::ValuelessAccess,
    trace,
    variant::{Alternatives, Variant},
};

// SAFETY: delegates to the operand impl of the underlying `RawVariant`.
unsafe impl<'a, A: Alternatives> Operand for &'a Variant<A> {
    type Alternatives = A::List;

    #[inline]
    fn index(&self) -> usize {
        self.raw.index()
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        self.raw.storage()
    }
}

// SAFETY: delegates to the extraction of the underlying `RawVariant`.
unsafe impl<'a, A: Alternatives, T: 'a> Extract<T> for &'a Variant<A> {
    type Arg = &'a T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> &'a T {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { <&'a RawVariant<A::List> as Extract<T>>::extract(storage) }
    }
}

// SAFETY: delegates to the operand impl of the underlying `RawVariant`.
unsafe impl<'a, A: Alternatives> Operand for &'a mut Variant<A> {
    type Alternatives = A::List;

    #[inline]
    fn index(&self) -> usize {
        self.raw.index()
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        self.raw.storage_mut()
    }
}

// SAFETY: delegates to the extraction of the underlying `RawVariant`.
unsafe impl<'a, A: Alternatives, T: 'a> Extract<T> for &'a mut Variant<A> {
    type Arg = &'a mut T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> &'a mut T {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { <&'a mut RawVariant<A::List> as Extract<T>>::extract(storage) }
    }
}

// SAFETY: delegates to the operand impl of the underlying `RawVariant`; the
// engine never drops an owned operand once its storage was handed out.
unsafe impl<A: Alternatives> Operand for Variant<A> {
    type Alternatives = A::List;

    #[inline]
    fn index(&self) -> usize {
        self.raw.index()
    }

    #[inline]
    fn storage(&mut self) -> NonNull<Erased> {
        self.raw.storage_mut()
    }
}

// SAFETY: delegates to the extraction of the underlying `RawVariant`.
unsafe impl<A: Alternatives, T> Extract<T> for Variant<A> {
    type Arg = T;

    #[inline]
    unsafe fn extract(storage: NonNull<Erased>) -> T {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { <RawVariant<A::List> as Extract<T>>::extract(storage) }
    }
}

/// The output of visitor `V` for the combination of every operand's first
/// alternative, which [`visit`] requires of every combination.
pub type VisitOutput<V, U> =
    <V as Visit<<<U as Operands>::First as Selection>::Args>>::Output;

/// Calls `visitor` with the active alternatives of `operands`.
///
/// `operands` is a tuple of one to four unions, each passed by reference, by
/// mutable reference or by value. Every combination of alternatives must
/// produce the same output type; this is checked at compile time. The lookup
/// takes constant time regardless of the number of alternatives.
///
/// # Errors
///
/// Returns [`ValuelessAccess`] without calling the visitor if any operand is
/// valueless. Operands passed by value are dropped in that case.
pub fn visit<V, U>(visitor: &mut V, operands: U) -> Result<VisitOutput<V, U>, ValuelessAccess>
where
    U: Operands,
    V: Visit<<U::First as Selection>::Args>,
    U::Reversed: Table<V, VisitOutput<V, U>, Exact, Nil>,
{
    dispatch::<V, U, VisitOutput<V, U>, Exact>(visitor, operands).ok_or_else(refused)
}

/// Calls `visitor` with the active alternatives of `operands`, converting
/// each combination's output into `R`.
///
/// Unlike [`visit`], the combinations may produce different output types as
/// long as each converts into `R` with [`Into`].
///
/// ```
/// use polyvalue::{Variant, Visit, visit_as};
///
/// struct Widen;
///
/// impl Visit<u8> for Widen {
///     type Output = u8;
///     fn visit(&mut self, value: u8) -> u8 {
///         value
///     }
/// }
///
/// impl Visit<u32> for Widen {
///     type Output = u32;
///     fn visit(&mut self, value: u32) -> u32 {
///         value
///     }
/// }
///
/// let union: Variant<(u8, u32)> = Variant::new(7u8);
/// assert_eq!(visit_as::<u64, _, _>(&mut Widen, (union,)), Ok(7));
/// ```
///
/// # Errors
///
/// Returns [`ValuelessAccess`] without calling the visitor if any operand is
/// valueless.
pub fn visit_as<R, V, U>(visitor: &mut V, operands: U) -> Result<R, ValuelessAccess>
where
    U: Operands,
    U::Reversed: Table<V, R, Convert, Nil>,
{
    dispatch::<V, U, R, Convert>(visitor, operands).ok_or_else(refused)
}

/// Logs a refused visit and returns its error.
#[cold]
fn refused() -> ValuelessAccess {
    trace::debug!("visitation refused: an operand is valueless");
    ValuelessAccess
}
