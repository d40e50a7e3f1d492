//! Gameplay hooks: behaviors are attached to bodies and receive the events the
//! world fires for them.

use core::fmt;

use crate::body::{BodyId, TimeoutTag};
use crate::event::HitEvent;
use crate::math::GridAab;
use crate::world::World;

/// Identifies a behavior registered with
/// [`World::add_behavior()`](crate::world::World::add_behavior).
///
/// Several bodies may link to the same behavior; keys are recycled after
/// [`remove_behavior()`](crate::world::World::remove_behavior).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BehaviorKey(pub(crate) u32);

/// Game logic attached to one or more bodies.
///
/// Every hook defaults to doing nothing; implement only the ones the behavior
/// cares about. Hooks run synchronously while the world processes events, on
/// the single simulation thread.
///
/// During a hook, the behavior itself is temporarily detached from the world's
/// table, so it may freely mutate the world (set velocities, add timeouts,
/// add or remove *other* bodies and behaviors) but it must not remove or
/// replace itself; do that from outside the callback.
pub trait Behavior: fmt::Debug {
    /// A collision involving a linked body was resolved.
    ///
    /// `this` is the linked body;
    /// [`hit.other(this)`](HitEvent::other) is its counterpart.
    fn on_hit(&mut self, world: &mut World, this: BodyId, hit: &HitEvent) {
        let _ = (world, this, hit);
    }

    /// A timeout scheduled on a linked body came due.
    fn on_timeout(&mut self, world: &mut World, this: BodyId, tag: TimeoutTag) {
        let _ = (world, this, tag);
    }

    /// A linked body's bounding box entered new broad-phase cells.
    fn on_grid_enter(&mut self, world: &mut World, this: BodyId, cells: GridAab) {
        let _ = (world, this, cells);
    }

    /// A linked body's bounding box left broad-phase cells.
    fn on_grid_exit(&mut self, world: &mut World, this: BodyId, cells: GridAab) {
        let _ = (world, this, cells);
    }

    /// A linked body's path reached the end of its validity window and was
    /// reprojected. This is the place to reapply friction-like forces that
    /// are not collisions.
    fn on_path_expired(&mut self, world: &mut World, this: BodyId) {
        let _ = (world, this);
    }
}
