#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`polyvalue`].
//!
//! # Overview
//!
//! This crate contains the type-erased storage and the unsafe operations that
//! power the [`polyvalue`] containers. Lifecycle operations of a concrete type
//! are reached through tables of function pointers generated at compile time,
//! so the containers never need to know, at the point of use, which type they
//! hold.
//!
//! **This crate is an implementation detail.** No semantic versioning guarantees
//! are provided. Users should depend on the [`polyvalue`] crate, not this one.
//!
//! # Architecture
//!
//! - **[`capability`]**: compile-time classification of a value type (size,
//!   alignment, whether dropping runs code, whether a box stores it inline)
//! - **[`ops`]**: the lifecycle operations over erased addresses and the
//!   operation kinds a table row can be built for
//! - **[`list`]** and **[`flat`]**: type-level lists of alternatives and the
//!   flat constant tables generated from them
//! - [`RawBox`]: a single value of any clonable type, stored inline or behind
//!   one heap allocation, driven by a `&'static` vtable per type
//! - [`RawVariant`]: one value out of a fixed list of alternatives, or
//!   [`VALUELESS`], driven by one table row per operation kind
//! - **[`dispatch`]**: the visitation engine, looking up one thunk per
//!   combination of alternatives across up to four unions
//!
//! # Safety Strategy
//!
//! Every table is generated from the concrete types it serves and is never
//! mutated afterwards. The types holding erased storage keep their fields
//! module-private, so the pairing between the storage and the table that
//! interprets it can be verified within a single file. Each table entry
//! documents exactly when it may be called.
//!
//! [`polyvalue`]: https://docs.rs/polyvalue/latest/polyvalue/

extern crate alloc;

mod boxed;
pub mod capability;
pub mod dispatch;
pub mod flat;
pub mod list;
pub mod ops;
mod util;
mod variant;

pub use boxed::RawBox;
pub use util::Erased;
pub use variant::{RawVariant, VALUELESS};
