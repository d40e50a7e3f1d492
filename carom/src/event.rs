//! Event types: what the scheduler queues internally, and what it delivers to
//! game logic.

use core::cmp::Ordering;

use ordered_float::NotNan;

use crate::body::{BodyId, PathVersion, TimeoutTag};
use crate::math::{FreeCoordinate, FreeVector, GridAab};
use crate::resolve::ResponseFlags;
use crate::time::SimTime;

/// A scheduled event, as stored in the world's priority queue.
///
/// Ordering is by time, with the queue-wide insertion sequence number breaking
/// ties, so that equal-time events fire in the order they were scheduled and
/// runs are deterministic.
#[derive(Clone, Debug)]
pub(crate) struct QueuedEvent {
    pub time: NotNan<SimTime>,
    pub sequence: u64,
    pub payload: Payload,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.sequence) == (other.time, other.sequence)
    }
}
impl Eq for QueuedEvent {}
impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.sequence).cmp(&(other.time, other.sequence))
    }
}

/// What a [`QueuedEvent`] will do when its time comes.
///
/// Payloads capture the path versions (and, for grid crossings, the crossing
/// generation) current when they were computed. A mismatch at dequeue time
/// means the motion the event was computed from no longer exists, and the
/// event is silently discarded; `invalidate` bookkeeping will already have
/// queued whatever replaces it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Payload {
    /// Two bodies' paths first touch. Body ids are in ascending order and the
    /// normal points from `a` toward `b`.
    Hit {
        a: BodyId,
        a_version: PathVersion,
        b: BodyId,
        b_version: PathVersion,
        normal: FreeVector,
    },
    /// A caller-scheduled timer. Not tied to a path version: timeouts survive
    /// path changes and die only with their body.
    Timeout { body: BodyId, tag: TimeoutTag },
    /// The body's bounding box expands into `strip`, making its full occupied
    /// range `new_range`.
    GridEnter {
        body: BodyId,
        version: PathVersion,
        grid_seq: u64,
        strip: GridAab,
        new_range: GridAab,
    },
    /// The body's bounding box leaves `strip`.
    GridExit {
        body: BodyId,
        version: PathVersion,
        grid_seq: u64,
        strip: GridAab,
        new_range: GridAab,
    },
    /// The body's path reaches the end of its validity window and must be
    /// reprojected so that non-collision forces get a chance to re-run.
    PathExpiry { body: BodyId, version: PathVersion },
}

impl Payload {
    /// Whether this event involves the given body, for the purge performed by
    /// body removal.
    pub fn references(&self, id: BodyId) -> bool {
        match *self {
            Payload::Hit { a, b, .. } => a == id || b == id,
            Payload::Timeout { body, .. }
            | Payload::GridEnter { body, .. }
            | Payload::GridExit { body, .. }
            | Payload::PathExpiry { body, .. } => body == id,
        }
    }
}

/// An event fired by
/// [`World::process_next_event()`](crate::world::World::process_next_event)
/// and delivered to game logic.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Two bodies touched and the contact has been resolved.
    Hit(HitEvent),
    /// A timeout scheduled with
    /// [`add_timeout()`](crate::world::World::add_timeout) came due.
    Timeout {
        /// Time at which the timeout fired.
        time: SimTime,
        /// The body it was scheduled on.
        body: BodyId,
        /// The tag given when it was scheduled.
        tag: TimeoutTag,
    },
    /// A body's bounding box entered new broad-phase cells.
    GridEnter {
        /// Time of the crossing.
        time: SimTime,
        /// The body that moved.
        body: BodyId,
        /// The cells newly touched.
        cells: GridAab,
    },
    /// A body's bounding box left broad-phase cells.
    GridExit {
        /// Time of the crossing.
        time: SimTime,
        /// The body that moved.
        body: BodyId,
        /// The cells no longer touched.
        cells: GridAab,
    },
    /// A body's path reached the end of its validity window and was
    /// reprojected in place.
    PathExpired {
        /// Time of the refresh.
        time: SimTime,
        /// The body whose path was reprojected.
        body: BodyId,
    },
}

/// Details of one resolved collision, as delivered to game logic.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct HitEvent {
    /// The exact simulation time of first touch.
    pub time: SimTime,
    /// First body of the pair (the one with the lower id).
    pub a: BodyId,
    /// Second body of the pair.
    pub b: BodyId,
    /// Unit contact normal, pointing from `a` toward `b`.
    pub normal: FreeVector,
    /// Magnitude of the impulse the resolver applied; zero when the bodies
    /// were not approaching or bouncing was suppressed for both.
    pub impulse: FreeCoordinate,
    /// Reaction-table flags that were applied to `a` and `b` respectively.
    pub response: (ResponseFlags, ResponseFlags),
}

impl HitEvent {
    /// The other body of the pair, from the perspective of `this`.
    ///
    /// Panics if `this` is not one of the pair.
    pub fn other(&self, this: BodyId) -> BodyId {
        if this == self.a {
            self.b
        } else if this == self.b {
            self.a
        } else {
            panic!("{this:?} is not part of this hit ({:?}, {:?})", self.a, self.b)
        }
    }

    /// The contact normal oriented to point away from `this`.
    pub fn normal_from(&self, this: BodyId) -> FreeVector {
        if this == self.a { self.normal } else { -self.normal }
    }

    /// The reaction-table flags that were applied to `this`.
    pub fn response_for(&self, this: BodyId) -> ResponseFlags {
        if this == self.a { self.response.0 } else { self.response.1 }
    }
}

/// What happened when the world looked at the head of its event queue.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Processed {
    /// An event fired and was delivered (to behaviors, and in this value).
    Fired(Event),
    /// The next queued event was stale and was dropped with no side effects.
    Discarded,
    /// The queue is empty.
    Idle,
}
