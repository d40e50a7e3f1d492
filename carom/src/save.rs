//! Snapshots of the externally meaningful state of bodies (shape, physical
//! properties, motion at an instant, and pending timeouts) for use by level
//! save/load collaborators.
//!
//! Internal path bookkeeping (versions, validity windows, grid occupancy) is
//! deliberately not persisted. A loaded body's path is recreated fresh,
//! starting at the loading world's current time, and everything scheduled from
//! it is recomputed; this is the same machinery as any other path
//! invalidation.

use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyId, Group, Shape, StateTag, TimeoutTag};
use crate::event::Payload;
use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::time::SimTime;
use crate::world::World;

/// The persistent fields of one body, as of a particular instant.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BodySnapshot {
    /// Collision silhouette.
    pub shape: Shape,
    /// Mass; possibly infinite.
    pub mass: FreeCoordinate,
    /// Per-body elasticity override, if any.
    pub elasticity: Option<FreeCoordinate>,
    /// Collision group tag.
    pub group: Group,
    /// Gameplay state tag.
    pub state: StateTag,
    /// Position at the instant the snapshot was taken.
    pub position: FreePoint,
    /// Velocity at that instant.
    pub velocity: FreeVector,
}

/// One pending timeout belonging to a snapshotted body.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TimeoutSnapshot {
    /// Time remaining until the timeout fires, measured from the instant the
    /// snapshot was taken. Stored relative rather than absolute so that a
    /// load into a world with a different clock re-anchors correctly.
    pub remaining: SimTime,
    /// The tag given when the timeout was scheduled.
    pub tag: TimeoutTag,
}

impl World {
    /// Captures the persistent fields of the body as of the current simulation
    /// time.
    ///
    /// Panics if `id` is not a live body.
    #[track_caller]
    pub fn snapshot_body(&self, id: BodyId) -> BodySnapshot {
        let now = self.now();
        let body = self.body(id);
        BodySnapshot {
            shape: body.shape(),
            mass: body.mass,
            elasticity: body.elasticity,
            group: body.group,
            state: body.state,
            position: body.position_at_time(now),
            velocity: body.velocity(),
        }
    }

    /// The timeouts currently queued for the body, soonest first.
    pub fn pending_timeouts(&self, id: BodyId) -> Vec<TimeoutSnapshot> {
        let now = self.now();
        let mut timeouts: Vec<TimeoutSnapshot> = self
            .queued_events()
            .filter_map(|event| match event.payload {
                Payload::Timeout { body, tag } if body == id => Some(TimeoutSnapshot {
                    remaining: (event.time.into_inner() - now).max(0.0),
                    tag,
                }),
                _ => None,
            })
            .collect();
        timeouts.sort_by(|a, b| {
            a.remaining
                .total_cmp(&b.remaining)
                .then(a.tag.cmp(&b.tag))
        });
        timeouts
    }

    /// Recreates a body from a snapshot. Its path starts at the current time;
    /// behaviors are not part of snapshots and must be relinked by the caller.
    pub fn insert_snapshot(
        &mut self,
        snapshot: &BodySnapshot,
        timeouts: &[TimeoutSnapshot],
    ) -> BodyId {
        let mut body = Body::new(snapshot.shape, snapshot.position, snapshot.velocity);
        body.mass = snapshot.mass;
        body.elasticity = snapshot.elasticity;
        body.group = snapshot.group;
        body.state = snapshot.state;
        let id = self.add_body(body);
        let now = self.now();
        for timeout in timeouts {
            self.add_timeout(now + timeout.remaining, id, timeout.tag);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldOptions;
    use euclid::{point2, vec2};

    #[test]
    fn snapshot_round_trip_through_json() {
        let mut world = World::new(WorldOptions::default());
        let mut body = Body::new(
            Shape::Rect {
                half_extents: vec2(2.0, 0.5),
            },
            point2(1.0, 2.0),
            vec2(3.0, 0.0),
        );
        body.mass = 4.0;
        body.elasticity = Some(0.5);
        body.group = Group(2);
        body.state = StateTag(7);
        let id = world.add_body(body);
        world.add_timeout(6.0, id, TimeoutTag(1));
        world.add_timeout(2.5, id, TimeoutTag(2));

        let snapshot = world.snapshot_body(id);
        let timeouts = world.pending_timeouts(id);
        assert_eq!(
            timeouts,
            vec![
                TimeoutSnapshot {
                    remaining: 2.5,
                    tag: TimeoutTag(2)
                },
                TimeoutSnapshot {
                    remaining: 6.0,
                    tag: TimeoutTag(1)
                },
            ]
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: BodySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);

        let mut other_world = World::new(WorldOptions::default());
        other_world.step(3.0, crate::time::Deadline::Whenever);
        let new_id = other_world.insert_snapshot(&restored, &timeouts);
        let new_body = other_world.body(new_id);
        assert_eq!(new_body.position_at_time(3.0), point2(1.0, 2.0));
        assert_eq!(new_body.velocity(), vec2(3.0, 0.0));
        assert_eq!(new_body.mass, 4.0);
        assert_eq!(new_body.group, Group(2));
        assert_eq!(
            other_world.pending_timeouts(new_id),
            vec![
                TimeoutSnapshot {
                    remaining: 2.5,
                    tag: TimeoutTag(2)
                },
                TimeoutSnapshot {
                    remaining: 6.0,
                    tag: TimeoutTag(1)
                },
            ]
        );
    }

    #[test]
    fn snapshot_position_is_taken_at_current_time() {
        let mut world = World::new(WorldOptions::default());
        let id = world.add_body(Body::new(
            Shape::Circle { radius: 1.0 },
            point2(0.0, 0.0),
            vec2(2.0, 0.0),
        ));
        world.step(3.0, crate::time::Deadline::Whenever);
        let snapshot = world.snapshot_body(id);
        assert_eq!(snapshot.position, point2(6.0, 0.0));
    }
}
