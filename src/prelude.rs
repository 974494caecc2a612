//! Commonly used items for convenient importing.
//!
//! ```
//! use polyvalue::prelude::*;
//!
//! let mut union: Variant<(Monostate, u32)> = Variant::default();
//! union.emplace::<1>(3);
//! assert_eq!(union.get::<1>(), Ok(&3));
//! ```

pub use crate::{
    AnyBox, BadAccess, Maybe, Monostate, ValuelessAccess, Variant, Visit, visit, visit_as,
};
