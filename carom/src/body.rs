//! Bodies: collision shapes, analytic motion paths, and physical properties.

use core::fmt;

use manyfmt::Refmt as _;

use crate::behavior::BehaviorKey;
use crate::math::{Aab, FreeCoordinate, FreePoint, FreeVector};
use crate::time::SimTime;
use crate::util::ConciseDebug;

/// Identifies a body within a [`World`](crate::world::World).
///
/// Ids are recycled: after [`remove_body()`](crate::world::World::remove_body),
/// the id may be handed out again by a later
/// [`add_body()`](crate::world::World::add_body). Events already in the queue for
/// the removed body are purged at removal, so a recycled id never receives them.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BodyId(pub(crate) u32);

impl BodyId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Token identifying one revision of a body's motion path.
///
/// Every redefinition of the path (teleport, velocity change, reprojection,
/// freeze) produces a new version. Queued events capture the versions current
/// when they were computed; a mismatch at dequeue time marks the event stale.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PathVersion(pub(crate) u64);

/// Collision group tag.
///
/// Groups select which pairs of bodies are ever tested for collision
/// (see [`World::set_groups_collide()`](crate::world::World::set_groups_collide))
/// and which bodies a [scan](crate::scan) can hit.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
pub struct Group(pub u16);

/// Gameplay state tag, keying the resolver's
/// [reaction table](crate::resolve::ReactionTable).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
pub struct StateTag(pub u16);

/// Caller-chosen tag distinguishing the purposes of timeouts scheduled on the
/// same body.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeoutTag(pub u32);

/// Collision silhouette of a [`Body`], centered on the body's position.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Shape {
    /// A circle of the given radius.
    Circle {
        /// Distance from the body's position to its edge. May be zero
        /// (a point, useful as a scan probe).
        radius: FreeCoordinate,
    },
    /// An axis-aligned rectangle extending `half_extents` from the body's
    /// position in each direction.
    Rect {
        /// Half the rectangle's width and height.
        half_extents: FreeVector,
    },
}

impl Shape {
    /// The shape's bounding box, centered on the origin.
    pub fn bounding_box(&self) -> Aab {
        match *self {
            Shape::Circle { radius } => Aab::new(-radius, radius, -radius, radius),
            Shape::Rect { half_extents } => Aab::symmetric(half_extents),
        }
    }
}

/// How long a freshly defined path remains trustworthy, unless overridden with
/// [`Body::set_path_valid_duration()`].
///
/// A body whose path reaches this age without any collision is reprojected and
/// rescheduled anyway, giving game logic a periodic chance to reapply
/// non-collision forces such as friction.
pub const DEFAULT_PATH_VALIDITY: SimTime = 10.0;

/// Path validity installed by [`Body::freeze_at_time()`]: just enough for one
/// scan query.
pub(crate) const PROBE_PATH_VALIDITY: SimTime = 1.0;

/// A body's analytic motion line, copied out of a [`Body`] for solver queries:
/// position at time `t` is `start_position + velocity × (t − start_time)`,
/// trustworthy for `t ≤ valid_until`.
#[derive(Clone, Copy, PartialEq)]
pub struct Path {
    /// Time at which the path was defined.
    pub start_time: SimTime,
    /// Position of the body at `start_time`.
    pub start_position: FreePoint,
    /// Constant velocity, in position units per second.
    pub velocity: FreeVector,
    /// Time beyond which the path must not be extrapolated.
    pub valid_until: SimTime,
}

impl Path {
    /// Position of the moving body at time `t`.
    #[inline]
    pub fn position_at_time(&self, t: SimTime) -> FreePoint {
        self.start_position + self.velocity * (t - self.start_time)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Path {
            start_time,
            start_position,
            velocity,
            valid_until,
        } = self;
        fmt.debug_struct("Path")
            .field("start_time", start_time)
            .field("start_position", &start_position.refmt(&ConciseDebug))
            .field("velocity", &velocity.refmt(&ConciseDebug))
            .field("valid_until", valid_until)
            .finish()
    }
}

/// Path state set aside by [`Body::freeze_at_time()`].
#[derive(Clone, Copy, Debug, PartialEq)]
struct SavedPath {
    start_time: SimTime,
    start_position: FreePoint,
    velocity: FreeVector,
    valid_duration: SimTime,
    version: PathVersion,
}

/// An object with a shape, an analytic motion path, and physical properties.
/// What it collides with is determined by the owning
/// [`World`](crate::world::World).
///
/// The path fields are private: every change to them goes through a method that
/// also bumps the body's [`PathVersion`], which is what keeps previously queued
/// events from firing against motion that no longer exists. The plain physical
/// properties are public fields; they are consulted only at event time and need
/// no such bookkeeping.
#[derive(Clone, PartialEq)]
#[non_exhaustive]
pub struct Body {
    shape: Shape,
    path_start_time: SimTime,
    path_start_position: FreePoint,
    velocity: FreeVector,
    path_valid_duration: SimTime,
    path_version: PathVersion,
    /// Monotonic source for new version values; never rewound, even by
    /// [`Self::unfreeze()`].
    version_counter: u64,
    saved_path: Option<SavedPath>,

    /// Mass. Use [`f64::INFINITY`] for immovable bodies such as walls.
    pub mass: FreeCoordinate,
    /// Bounciness override for this body; [`None`] uses the resolver's default.
    pub elasticity: Option<FreeCoordinate>,
    /// Collision group tag. Takes effect the next time the body's path is
    /// invalidated.
    pub group: Group,
    /// Gameplay state tag consulted by the resolver's reaction table.
    pub state: StateTag,
    /// The behavior, if any, which receives this body's events.
    pub behavior: Option<BehaviorKey>,
}

impl Body {
    /// Constructs a [`Body`] at the given position with the given constant
    /// velocity, with mass 1 and default group/state and no behavior.
    ///
    /// `position` is interpreted as the body's position at the moment it is
    /// added to a world.
    pub fn new(
        shape: Shape,
        position: impl Into<FreePoint>,
        velocity: impl Into<FreeVector>,
    ) -> Self {
        Self {
            shape,
            path_start_time: 0.0,
            path_start_position: position.into(),
            velocity: velocity.into(),
            path_valid_duration: DEFAULT_PATH_VALIDITY,
            path_version: PathVersion(0),
            version_counter: 0,
            saved_path: None,
            mass: 1.0,
            elasticity: None,
            group: Group::default(),
            state: StateTag::default(),
            behavior: None,
        }
    }

    /// The body's collision silhouette.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The body's current constant velocity.
    #[inline]
    pub fn velocity(&self) -> FreeVector {
        self.velocity
    }

    /// Position of the body at time `t`, a pure function of the stored path.
    ///
    /// Panics in debug builds if `t` precedes the path's start time; the path
    /// says nothing about where the body was before it was defined.
    #[inline]
    pub fn position_at_time(&self, t: SimTime) -> FreePoint {
        debug_assert!(
            t >= self.path_start_time,
            "position_at_time({t}) precedes path start time {}",
            self.path_start_time
        );
        self.path_start_position + self.velocity * (t - self.path_start_time)
    }

    /// The body's shape bounding box, placed at its position at time `t`.
    #[inline]
    pub fn bounding_box_at_time(&self, t: SimTime) -> Aab {
        self.shape
            .bounding_box()
            .translate(self.position_at_time(t).to_vector())
    }

    /// The region swept by the body's bounding box between `t0` and `t1`.
    pub fn swept_bounding_box(&self, t0: SimTime, t1: SimTime) -> Aab {
        debug_assert!(t1 >= t0, "swept_bounding_box: misordered times {t0} > {t1}");
        self.bounding_box_at_time(t0)
            .union(self.bounding_box_at_time(t1))
    }

    /// The body's current motion line, for solver queries.
    pub fn path(&self) -> Path {
        Path {
            start_time: self.path_start_time,
            start_position: self.path_start_position,
            velocity: self.velocity,
            valid_until: self.path_valid_until(),
        }
    }

    /// The current revision token of the body's path.
    #[inline]
    pub fn path_version(&self) -> PathVersion {
        self.path_version
    }

    /// Time at which the current path was defined.
    #[inline]
    pub fn path_start_time(&self) -> SimTime {
        self.path_start_time
    }

    /// Time beyond which the current path must be refreshed even if no event
    /// involves this body.
    #[inline]
    pub fn path_valid_until(&self) -> SimTime {
        self.path_start_time + self.path_valid_duration
    }

    /// Changes how long each of this body's paths remains trustworthy before a
    /// forced refresh, and bumps the path version so the refresh is rescheduled.
    pub fn set_path_valid_duration(&mut self, duration: SimTime) {
        assert!(
            duration > 0.0,
            "path validity duration must be positive, not {duration}"
        );
        self.path_valid_duration = duration;
        self.bump_version();
    }

    /// Redefines the path so that the body is at `position` at time `t` with
    /// unchanged velocity; a teleport.
    pub fn set_position_at_time(&mut self, position: impl Into<FreePoint>, t: SimTime) {
        self.path_start_time = t;
        self.path_start_position = position.into();
        self.bump_version();
    }

    /// Redefines the path so that the body's velocity becomes `velocity` at
    /// time `t`, with position continuous: the body is exactly where the old
    /// path put it at `t`.
    pub fn set_velocity_at_time(&mut self, velocity: impl Into<FreeVector>, t: SimTime) {
        self.path_start_position = self.position_at_time(t);
        self.path_start_time = t;
        self.velocity = velocity.into();
        self.bump_version();
    }

    /// Reprojects the path start to time `t` without changing the body's
    /// motion. Used for the periodic forced refresh; the resulting path is
    /// valid for a further full validity duration.
    pub fn move_to_time(&mut self, t: SimTime) {
        self.path_start_position = self.position_at_time(t);
        self.path_start_time = t;
        self.bump_version();
    }

    /// Sets the path aside and pins the body at its time-`t` position with zero
    /// velocity and a minimal validity window, so that a scan query can treat
    /// it as momentarily static. Restore with [`Self::unfreeze()`].
    ///
    /// Panics if the body is already frozen.
    pub fn freeze_at_time(&mut self, t: SimTime) {
        assert!(
            self.saved_path.is_none(),
            "freeze_at_time() called on an already frozen body"
        );
        self.saved_path = Some(SavedPath {
            start_time: self.path_start_time,
            start_position: self.path_start_position,
            velocity: self.velocity,
            valid_duration: self.path_valid_duration,
            version: self.path_version,
        });
        self.path_start_position = self.position_at_time(t);
        self.path_start_time = t;
        self.velocity = FreeVector::zero();
        self.path_valid_duration = PROBE_PATH_VALIDITY;
        self.bump_version();
    }

    /// Restores the path saved by [`Self::freeze_at_time()`], including its
    /// version, so that events queued against the original path remain valid.
    ///
    /// Panics if the body is not frozen.
    pub fn unfreeze(&mut self) {
        let saved = self
            .saved_path
            .take()
            .expect("unfreeze() called on a body that is not frozen");
        self.path_start_time = saved.start_time;
        self.path_start_position = saved.start_position;
        self.velocity = saved.velocity;
        self.path_valid_duration = saved.valid_duration;
        self.path_version = saved.version;
    }

    /// Returns whether the body is currently frozen for a scan query.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.saved_path.is_some()
    }

    /// Restarts the path clock at time `t` without moving the body, for
    /// insertion into a world whose clock has already advanced.
    pub(crate) fn rebase(&mut self, t: SimTime) {
        self.path_start_time = t;
        self.bump_version();
    }

    fn bump_version(&mut self) {
        self.version_counter += 1;
        self.path_version = PathVersion(self.version_counter);
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = fmt.debug_struct("Body");
        ds.field("shape", &self.shape)
            .field(
                "position",
                &self.path_start_position.refmt(&ConciseDebug),
            )
            .field("velocity", &self.velocity.refmt(&ConciseDebug))
            .field("path_start_time", &self.path_start_time)
            .field("path_version", &self.path_version.0)
            .field("mass", &self.mass)
            .field("group", &self.group.0)
            .field("state", &self.state.0);
        if self.is_frozen() {
            ds.field("frozen", &true);
        }
        ds.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point2, vec2};

    fn test_body() -> Body {
        Body::new(Shape::Circle { radius: 1.0 }, point2(2.0, 3.0), vec2(1.0, -1.0))
    }

    #[test]
    fn position_is_linear_in_time() {
        let body = test_body();
        assert_eq!(body.position_at_time(0.0), point2(2.0, 3.0));
        assert_eq!(body.position_at_time(2.5), point2(4.5, 0.5));
    }

    #[test]
    fn zero_velocity_position_is_constant() {
        let body = Body::new(Shape::Circle { radius: 1.0 }, point2(2.0, 3.0), vec2(0.0, 0.0));
        for t in [0.0, 0.1, 5.0, 1e6] {
            assert_eq!(body.position_at_time(t), point2(2.0, 3.0));
        }
    }

    #[test]
    fn set_velocity_preserves_position() {
        let mut body = test_body();
        let before = body.position_at_time(4.0);
        body.set_velocity_at_time(vec2(-7.0, 0.25), 4.0);
        assert_eq!(body.position_at_time(4.0), before);
    }

    #[test]
    fn set_position_preserves_velocity() {
        let mut body = test_body();
        body.set_position_at_time(point2(100.0, 100.0), 1.0);
        assert_eq!(body.velocity(), vec2(1.0, -1.0));
        assert_eq!(body.position_at_time(2.0), point2(101.0, 99.0));
    }

    #[test]
    fn move_to_time_is_continuous() {
        let mut body = test_body();
        let expected = body.position_at_time(3.0);
        body.move_to_time(3.0);
        assert_eq!(body.path_start_time(), 3.0);
        assert_eq!(body.position_at_time(3.0), expected);
        assert_eq!(body.velocity(), vec2(1.0, -1.0));
        // The validity window slides forward with the reprojection.
        assert_eq!(body.path_valid_until(), 3.0 + DEFAULT_PATH_VALIDITY);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut body = test_body();
        let mut seen = vec![body.path_version()];
        body.set_position_at_time(point2(0.0, 0.0), 1.0);
        seen.push(body.path_version());
        body.set_velocity_at_time(vec2(0.0, 0.0), 1.0);
        seen.push(body.path_version());
        body.move_to_time(2.0);
        seen.push(body.path_version());
        body.set_path_valid_duration(5.0);
        seen.push(body.path_version());
        let distinct: std::collections::HashSet<_> = seen.iter().copied().collect();
        assert_eq!(distinct.len(), seen.len(), "versions were reused: {seen:?}");
    }

    #[test]
    fn freeze_and_unfreeze_round_trip() {
        let mut body = test_body();
        let version = body.path_version();
        let path = body.path();

        body.freeze_at_time(3.0);
        assert!(body.is_frozen());
        assert_eq!(body.velocity(), vec2(0.0, 0.0));
        assert_eq!(body.position_at_time(3.5), path.position_at_time(3.0));
        assert_ne!(body.path_version(), version);

        body.unfreeze();
        assert!(!body.is_frozen());
        assert_eq!(body.path_version(), version);
        assert_eq!(body.path(), path);
    }

    #[test]
    fn version_counter_is_not_rewound_by_unfreeze() {
        let mut body = test_body();
        body.freeze_at_time(0.0);
        let frozen_version = body.path_version();
        body.unfreeze();
        body.move_to_time(1.0);
        assert_ne!(
            body.path_version(),
            frozen_version,
            "a post-unfreeze version collided with the frozen one"
        );
    }

    #[test]
    fn swept_bounding_box_covers_both_ends() {
        let body = test_body();
        let swept = body.swept_bounding_box(0.0, 2.0);
        assert_eq!(swept, Aab::new(1.0, 5.0, 0.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "not frozen")]
    fn unfreeze_unfrozen_panics() {
        test_body().unfreeze();
    }
}
