//! Deterministic 2D rigid-body simulation engine.
//!
//! Rather than stepping positions forward each frame and testing for overlap,
//! carom gives every body an analytic straight-line motion path and computes the
//! *exact simulation time* at which two bodies first touch. Contacts, timeouts,
//! and broad-phase grid crossings all live in one time-ordered event queue owned
//! by a [`World`](world::World); game logic drives the queue from its own frame
//! loop and reacts to the events it fires.
//!
//! The pieces, roughly from the bottom up:
//!
//! * [`body`]: shapes, analytic motion paths, and path versioning.
//! * [`toi`]: the pairwise time-of-impact solver.
//! * [`resolve`]: turning a contact into velocity changes plus table-driven
//!   gameplay reactions.
//! * [`scan`]: swept-probe queries (“what does this ray hit first”).
//! * [`behavior`]: callbacks attached to bodies.
//! * [`world`]: the event scheduler tying all of the above together.
//! * [`math`], [`time`], [`util`]: vocabulary shared with `carom-base`.
//!
//! All simulation is single-threaded and synchronous: nothing here spawns
//! threads, sleeps, or performs I/O.
//!
//! ## Feature flags
//!
//! * `"save"`: Adds serde serialization of body and timeout snapshots,
//!   for use by level persistence layers.

#![forbid(unsafe_code)]

pub mod behavior;
pub mod body;
pub mod event;
mod grid;
mod intalloc;
pub mod resolve;
pub mod scan;
pub mod toi;
pub mod world;

#[cfg(feature = "save")]
pub mod save;

/// Mathematical vocabulary for 2D positions, motions, and regions.
pub mod math {
    pub use carom_base::math::*;
}

/// Data types for simulated and real time.
pub mod time {
    pub use carom_base::time::*;
}

/// Formatting tools that don't fit anywhere else.
pub mod util {
    pub use carom_base::util::*;
}
