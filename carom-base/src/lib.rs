//! This library is an internal component of [`carom`],
//! which defines the mathematical and timekeeping vocabulary shared by the engine.
//! Do not depend on this library; use only [`carom`] instead.
//!
//! [`carom`]: https://crates.io/crates/carom

#![forbid(unsafe_code)]

/// Do not use this module directly; its contents are re-exported from `carom`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `carom`.
pub mod time;

/// Do not use this module directly; its contents are re-exported from `carom`.
pub mod util;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
