//! Logging of state transitions, through `tracing` when the `tracing` feature
//! is enabled.
//!
//! Without the feature the macros expand to nothing and their arguments are
//! not evaluated.

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "polyvalue", $($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "polyvalue", $($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

pub(crate) use {debug, trace};
