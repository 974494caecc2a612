//! Module containing the tagged union storage.

mod raw;

pub use self::raw::{RawVariant, VALUELESS};
