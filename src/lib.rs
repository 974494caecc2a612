#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Value-semantic containers for type-erased, tagged and optional values.
//!
//! ## Overview
//!
//! This crate provides three containers that own exactly one value (or none)
//! and copy, move, swap and drop it like a plain value:
//!
//! - [`AnyBox`]: one value of any clonable type, chosen at runtime. Small
//!   values live inline, larger ones behind a single heap allocation.
//! - [`Variant<(A, B, ...)>`](Variant): one value out of a fixed tuple of
//!   alternatives, with [`visit`] dispatching a visitor over the active
//!   alternatives of up to four unions in a single table lookup.
//! - [`Maybe<T>`](Maybe): an optional value that stores "no value" in a spare
//!   bit pattern of `T` when there is one, and nests without growing as long
//!   as spare patterns are left.
//!
//! ## Quick Example
//!
//! ```
//! use polyvalue::{AnyBox, Maybe, Variant};
//!
//! let mut boxed = AnyBox::new(String::from("ciao"));
//! boxed.get_mut::<String>()?.push_str(" mare");
//! assert_eq!(boxed.get::<String>()?, "ciao mare");
//!
//! let union: Variant<(u8, String)> = Variant::new(String::from("ciao"));
//! assert_eq!(union.index(), 1);
//!
//! let flag: Maybe<bool> = Maybe::some(true);
//! assert_eq!(size_of_val(&flag), 1);
//! # Ok::<(), polyvalue::BadAccess>(())
//! ```
//!
//! ## Operation Tables
//!
//! None of the containers knows the type it holds at the place where it
//! clones, assigns or drops it. Instead, each type (for the box) or each list
//! of alternatives (for the union) gets a table of lifecycle operations that
//! is built once at compile time and shared by address. Operations that not
//! every alternative supports are not given a table row, and the matching
//! method is missing from the union type instead of failing at runtime.
//!
//! ## Failure Model
//!
//! - Checked access returns a [`BadAccess`] error that names the requested
//!   and the held type.
//! - A union that gave up its value and then failed to construct the new one
//!   is *valueless*. Visiting it returns [`ValuelessAccess`].
//! - Panics of the held values' own operations unwind through the containers
//!   without leaking or double-dropping, leaving the state documented on each
//!   operation.
//!
//! ## Features
//!
//! - `tracing`: emit `debug` and `trace` events through the [`tracing`]
//!   crate, under the `polyvalue` target, when a union becomes valueless, a
//!   visitation is refused, or a box stores a value on the heap.
//!
//! [`tracing`]: https://docs.rs/tracing

extern crate alloc;

mod trace;

mod any_box;
mod error;
pub mod maybe;
pub mod prelude;
mod variant;

pub use polyvalue_internals::{
    VALUELESS,
    capability::{Capabilities, INLINE_ALIGN, INLINE_SIZE, fits_inline},
    dispatch::Visit,
};

pub use self::{
    any_box::{AnyBox, TypeToken},
    error::{BadAccess, ValuelessAccess},
    maybe::Maybe,
    variant::{
        Alternatives, At, Locate, Monostate, Position, Variant, VisitOutput, visit, visit_as,
    },
};
