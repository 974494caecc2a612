//! Module containing the type-erased single value box.

mod raw;
mod vtable;

pub use self::raw::RawBox;
