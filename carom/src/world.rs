//! The simulation world: the event scheduler that owns all bodies, the
//! time-ordered event queue, and the path-invalidation bookkeeping that decides
//! when the time-of-impact solver must be re-run.

use core::fmt;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use ordered_float::NotNan;

use crate::behavior::{Behavior, BehaviorKey};
use crate::body::{Body, BodyId, Group, PathVersion, TimeoutTag};
use crate::event::{Event, HitEvent, Payload, Processed, QueuedEvent};
use crate::grid::{self, SpatialGrid};
use crate::intalloc::IntAllocator;
use crate::math::{FreeCoordinate, FreePoint, FreeVector, GridAab};
use crate::resolve::{Resolver, ResponseFlags};
use crate::scan::{self, ScanHit, ScanRequest};
use crate::time::{Deadline, SimTime};
use crate::toi::{pair_time_of_impact, Contact};

/// Configuration for a new [`World`].
#[derive(Clone, Debug)]
pub struct WorldOptions {
    /// Edge length of one broad-phase grid cell, in world units.
    ///
    /// Cells should be comparable in size to typical bodies: much smaller and
    /// every body occupies many cells, much larger and every cell holds many
    /// bodies. Neither affects correctness.
    pub cell_size: FreeCoordinate,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self { cell_size: 10.0 }
    }
}

#[derive(Debug)]
struct BodyRecord {
    body: Body,
    /// Bumped whenever the body's grid crossings are rescheduled; queued
    /// crossing events from older generations are stale.
    grid_seq: u64,
}

/// Summary of one [`World::step()`] call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct StepInfo {
    /// Events fired and delivered.
    pub events_fired: usize,
    /// Stale events dropped.
    pub events_discarded: usize,
    /// Whether the clock reached the requested target time. If false, the
    /// wall-clock deadline tripped first and events are still due; the next
    /// `step()` resumes where this one stopped.
    pub reached_target: bool,
    /// Whether the wall-clock deadline cut the step short.
    pub hit_deadline: bool,
}

/// A deterministic 2D simulation of rigid bodies in continuous time.
///
/// The world owns every [`Body`], a time-ordered event queue, and the broad
/// phase. It has no clock loop of its own: callers advance it by
/// [`step()`](Self::step) (or by driving
/// [`process_next_event()`](Self::process_next_event) directly), and read
/// positions at any time in between with
/// [`Body::position_at_time()`], a pure query that never mutates.
///
/// The scheduling discipline, in one paragraph: every redefinition of a body's
/// path bumps that body's [`PathVersion`] and re-derives all of its events
/// (hits against broad-phase candidates, grid crossings, and a forced path
/// refresh). Queued events embed the versions they were computed from, and are
/// silently dropped at dequeue time if any version has moved on. This is what
/// makes path changes O(candidates) instead of O(bodies²): superseded events
/// are never hunted down in the queue, they simply fail validation when their
/// time comes.
pub struct World {
    bodies: Vec<Option<BodyRecord>>,
    body_ids: IntAllocator<u32>,
    queue: BinaryHeap<Reverse<QueuedEvent>>,
    next_sequence: u64,
    grid: SpatialGrid,
    /// Unordered group pairs excluded from collision testing.
    non_colliding: HashSet<(Group, Group)>,
    /// At most one live queued hit per body pair; the values are the path
    /// versions embedded in that queued event.
    pending_hits: HashMap<(BodyId, BodyId), (PathVersion, PathVersion)>,
    resolver: Resolver,
    behaviors: HashMap<BehaviorKey, Box<dyn Behavior>>,
    behavior_ids: IntAllocator<u32>,
    now: SimTime,
}

impl World {
    /// Constructs an empty world with its clock at zero.
    pub fn new(options: WorldOptions) -> Self {
        Self {
            bodies: Vec::new(),
            body_ids: IntAllocator::new(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
            grid: SpatialGrid::new(options.cell_size),
            non_colliding: HashSet::new(),
            pending_hits: HashMap::new(),
            resolver: Resolver::default(),
            behaviors: HashMap::new(),
            behavior_ids: IntAllocator::new(),
            now: 0.0,
        }
    }

    /// The current simulation time: the time of the latest processed event, or
    /// the latest [`step()`](Self::step) target, whichever is greater.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The collision resolver's configuration.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Mutable access to the collision resolver, for configuring elasticity,
    /// rub, and the reaction table. Takes effect from the next fired hit.
    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Configures whether bodies in groups `a` and `b` are ever tested for
    /// collision. All pairs collide by default.
    ///
    /// Takes effect the next time an affected body's path is invalidated.
    pub fn set_groups_collide(&mut self, a: Group, b: Group, collide: bool) {
        if collide {
            self.non_colliding.remove(&(a, b));
            self.non_colliding.remove(&(b, a));
        } else {
            self.non_colliding.insert((a, b));
            self.non_colliding.insert((b, a));
        }
    }

    fn groups_collide(&self, a: Group, b: Group) -> bool {
        !self.non_colliding.contains(&(a, b))
    }

    // --- Bodies -----------------------------------------------------------

    /// Adds `body` to the world, with its path starting at the current time,
    /// and schedules its events. Returns the id by which it is known.
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        let id = BodyId(self.body_ids.allocate().expect("body id space exhausted"));
        body.rebase(self.now);
        let index = id.index();
        if index >= self.bodies.len() {
            self.bodies.resize_with(index + 1, || None);
        }
        debug_assert!(self.bodies[index].is_none(), "id allocator returned a live id");
        self.bodies[index] = Some(BodyRecord { body, grid_seq: 0 });
        log::trace!("added body {id:?}");
        self.schedule_for_body(id);
        id
    }

    /// Removes the body, purging every queued event that references it, and
    /// returns it. The id may be reused by a later [`add_body()`](Self::add_body).
    ///
    /// Panics if `id` is not a live body.
    #[track_caller]
    pub fn remove_body(&mut self, id: BodyId) -> Body {
        let record = self
            .bodies
            .get_mut(id.index())
            .and_then(|slot| slot.take())
            .unwrap_or_else(|| panic!("no such body: {id:?}"));
        self.body_ids.free(id.0);
        self.grid.remove_body(id);
        self.pending_hits.retain(|&(a, b), _| a != id && b != id);

        let events = std::mem::take(&mut self.queue).into_vec();
        let before = events.len();
        let events: Vec<Reverse<QueuedEvent>> = events
            .into_iter()
            .filter(|Reverse(event)| !event.payload.references(id))
            .collect();
        log::debug!(
            "removed body {id:?}, purging {} queued events",
            before - events.len()
        );
        self.queue = BinaryHeap::from(events);

        record.body
    }

    /// The body with the given id.
    ///
    /// Panics if `id` is not a live body; that indicates a lifecycle bug in
    /// the calling code.
    #[track_caller]
    pub fn body(&self, id: BodyId) -> &Body {
        &self.record(id).body
    }

    /// Whether `id` currently names a live body.
    pub fn contains_body(&self, id: BodyId) -> bool {
        self.try_record(id).is_some()
    }

    /// Iterates over the ids of all live bodies, in id order.
    pub fn bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| BodyId(index as u32)))
    }

    /// Teleports the body so that it is at `position` at time `t` with
    /// unchanged velocity, and reschedules its events.
    #[track_caller]
    pub fn set_position_at_time(&mut self, id: BodyId, position: impl Into<FreePoint>, t: SimTime) {
        self.record_mut(id).body.set_position_at_time(position, t);
        self.schedule_for_body(id);
    }

    /// Changes the body's velocity at time `t`, leaving its position at `t`
    /// continuous, and reschedules its events.
    #[track_caller]
    pub fn set_velocity_at_time(&mut self, id: BodyId, velocity: impl Into<FreeVector>, t: SimTime) {
        self.record_mut(id).body.set_velocity_at_time(velocity, t);
        self.schedule_for_body(id);
    }

    /// Changes how long the body's paths stay valid before a forced refresh,
    /// and reschedules its events.
    #[track_caller]
    pub fn set_path_valid_duration(&mut self, id: BodyId, duration: SimTime) {
        self.record_mut(id).body.set_path_valid_duration(duration);
        self.schedule_for_body(id);
    }

    /// Reprojects the body's path to the current time and recomputes
    /// everything scheduled from it: grid occupancy, hit candidates, grid
    /// crossings, and the forced refresh.
    ///
    /// Game logic rarely needs this directly (the mutating operations call it
    /// implicitly) but it is harmless to call at any time.
    #[track_caller]
    pub fn invalidate_body(&mut self, id: BodyId) {
        let now = self.now;
        self.record_mut(id).body.move_to_time(now);
        self.schedule_for_body(id);
    }

    #[track_caller]
    fn record(&self, id: BodyId) -> &BodyRecord {
        match self.try_record(id) {
            Some(record) => record,
            None => panic!("no such body: {id:?}"),
        }
    }

    #[track_caller]
    fn record_mut(&mut self, id: BodyId) -> &mut BodyRecord {
        match self.bodies.get_mut(id.index()).and_then(Option::as_mut) {
            Some(record) => record,
            None => panic!("no such body: {id:?}"),
        }
    }

    fn try_record(&self, id: BodyId) -> Option<&BodyRecord> {
        self.bodies.get(id.index()).and_then(Option::as_ref)
    }

    // --- Behaviors --------------------------------------------------------

    /// Registers a behavior; link it to bodies via [`Body::behavior`].
    pub fn add_behavior(&mut self, behavior: Box<dyn Behavior>) -> BehaviorKey {
        let key = BehaviorKey(
            self.behavior_ids
                .allocate()
                .expect("behavior key space exhausted"),
        );
        self.behaviors.insert(key, behavior);
        key
    }

    /// Removes and returns a behavior. Bodies still linking to it simply stop
    /// receiving callbacks.
    ///
    /// Panics if `key` is not registered. That includes being called by the
    /// behavior itself from inside one of its own hooks, which is not
    /// supported.
    #[track_caller]
    pub fn remove_behavior(&mut self, key: BehaviorKey) -> Box<dyn Behavior> {
        let behavior = self
            .behaviors
            .remove(&key)
            .unwrap_or_else(|| panic!("no such behavior: {key:?}"));
        self.behavior_ids.free(key.0);
        behavior
    }

    /// Runs `f` with the behavior linked to `id`, if there is one, with the
    /// behavior temporarily detached so that it can mutate the world.
    fn with_behavior_of(&mut self, id: BodyId, f: impl FnOnce(&mut dyn Behavior, &mut World)) {
        let Some(key) = self.try_record(id).and_then(|record| record.body.behavior) else {
            return;
        };
        let Some(mut behavior) = self.behaviors.remove(&key) else {
            return;
        };
        f(behavior.as_mut(), self);
        self.behaviors.insert(key, behavior);
    }

    // --- Scheduling internals ---------------------------------------------

    fn queue_event(&mut self, time: SimTime, payload: Payload) {
        let time = NotNan::new(time).expect("event time must not be NaN");
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        log::trace!("queueing at {time}: {payload:?}");
        self.queue.push(Reverse(QueuedEvent {
            time,
            sequence,
            payload,
        }));
    }

    /// Recomputes everything scheduled from the body's current path. The
    /// caller must have bumped the path version first (every public mutation
    /// path does), so that all previously queued events for this body are
    /// already stale.
    fn schedule_for_body(&mut self, id: BodyId) {
        let now = self.now;
        let (aab, velocity, version, valid_until) = {
            let body = &self.record(id).body;
            (
                body.bounding_box_at_time(now),
                body.velocity(),
                body.path_version(),
                body.path_valid_until(),
            )
        };
        let cell_size = self.grid.cell_size();
        let range = aab.round_up_to_grid(cell_size);
        let change = self.grid.set_occupancy(id, range);
        let grid_seq = {
            let record = self.record_mut(id);
            record.grid_seq += 1;
            record.grid_seq
        };

        // Immediate notifications for the cells gained and lost by the path
        // redefinition itself. These find the occupancy already applied when
        // they fire; they exist for listeners, not for bookkeeping.
        for &strip in &change.entered {
            self.queue_event(
                now,
                Payload::GridEnter {
                    body: id,
                    version,
                    grid_seq,
                    strip,
                    new_range: range,
                },
            );
        }
        for &strip in &change.exited {
            self.queue_event(
                now,
                Payload::GridExit {
                    body: id,
                    version,
                    grid_seq,
                    strip,
                    new_range: range,
                },
            );
        }

        // Predicted future crossings from the analytic path.
        if let Some(crossing) = grid::next_entry(range, aab, velocity, cell_size, now) {
            self.queue_event(
                crossing.time,
                Payload::GridEnter {
                    body: id,
                    version,
                    grid_seq,
                    strip: crossing.strip,
                    new_range: crossing.new_range,
                },
            );
        }
        if let Some(crossing) = grid::next_exit(range, aab, velocity, cell_size, now) {
            self.queue_event(
                crossing.time,
                Payload::GridExit {
                    body: id,
                    version,
                    grid_seq,
                    strip: crossing.strip,
                    new_range: crossing.new_range,
                },
            );
        }

        // Hit tests against every body sharing a cell.
        for candidate in self.grid.candidates(range, id) {
            self.test_pair_and_schedule(id, candidate);
        }

        // Forced refresh when the path ages out.
        self.queue_event(valid_until.max(now), Payload::PathExpiry { body: id, version });
    }

    /// Runs the time-of-impact solver for one candidate pair and queues the
    /// hit, if any.
    fn test_pair_and_schedule(&mut self, id: BodyId, candidate: BodyId) {
        let (path_a, shape_a, group_a) = {
            let body = &self.record(id).body;
            (body.path(), body.shape(), body.group)
        };
        let (path_b, shape_b, group_b) = {
            let body = &self.record(candidate).body;
            (body.path(), body.shape(), body.group)
        };
        if !self.groups_collide(group_a, group_b) {
            return;
        }
        if let Some(contact) =
            pair_time_of_impact(&path_a, shape_a, &path_b, shape_b, self.now).contact()
        {
            self.schedule_hit(id, candidate, contact);
        }
    }

    /// Queues a hit event for the pair unless an identical one is already
    /// queued, maintaining at most one live hit per unordered pair.
    fn schedule_hit(&mut self, a: BodyId, b: BodyId, contact: Contact) {
        let (a, b, normal) = if a <= b {
            (a, b, contact.normal)
        } else {
            (b, a, -contact.normal)
        };
        let a_version = self.record(a).body.path_version();
        let b_version = self.record(b).body.path_version();
        let key = (a, b);
        if self.pending_hits.get(&key) == Some(&(a_version, b_version)) {
            // The same contact is already queued (found from the other body's
            // side, or from a grid crossing).
            return;
        }
        self.pending_hits.insert(key, (a_version, b_version));
        self.queue_event(
            contact.time,
            Payload::Hit {
                a,
                a_version,
                b,
                b_version,
                normal,
            },
        );
    }

    // --- Event processing --------------------------------------------------

    /// The time of the soonest queued event, stale or not.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|Reverse(event)| event.time.into_inner())
    }

    /// The number of queued events, including stale ones not yet discarded.
    pub fn queued_event_count(&self) -> usize {
        self.queue.len()
    }

    /// Dequeues and acts on exactly one event: validates it, applies collision
    /// resolution and grid bookkeeping, and delivers it to behaviors.
    ///
    /// The world's clock advances to the event's time. Callers drive the clock
    /// by comparing [`next_event_time()`](Self::next_event_time) against their
    /// target simulation time and calling this while the event is in range,
    /// or use [`step()`](Self::step), which does exactly that.
    pub fn process_next_event(&mut self) -> Processed {
        let Some(Reverse(event)) = self.queue.pop() else {
            return Processed::Idle;
        };
        let time = event.time.into_inner();
        self.now = self.now.max(time);

        match event.payload {
            Payload::Hit {
                a,
                a_version,
                b,
                b_version,
                normal,
            } => {
                let key = (a, b);
                if self.pending_hits.get(&key) == Some(&(a_version, b_version)) {
                    self.pending_hits.remove(&key);
                }
                let fresh = |world: &Self, id: BodyId, version: PathVersion| {
                    world
                        .try_record(id)
                        .is_some_and(|record| record.body.path_version() == version)
                };
                if !fresh(self, a, a_version) || !fresh(self, b, b_version) {
                    log::trace!("discarding stale hit between {a:?} and {b:?}");
                    return Processed::Discarded;
                }
                let hit = self.resolve_hit(time, a, b, normal);
                Processed::Fired(Event::Hit(hit))
            }

            Payload::Timeout { body, tag } => {
                if !self.contains_body(body) {
                    // Unreachable while removal purges, but harmless.
                    return Processed::Discarded;
                }
                self.with_behavior_of(body, |behavior, world| {
                    behavior.on_timeout(world, body, tag);
                });
                Processed::Fired(Event::Timeout { time, body, tag })
            }

            Payload::GridEnter {
                body,
                version,
                grid_seq,
                strip,
                new_range,
            } => {
                if !self.grid_event_valid(body, version, grid_seq) {
                    return Processed::Discarded;
                }
                self.apply_grid_crossing(body, time, version, new_range, Some(strip));
                self.with_behavior_of(body, |behavior, world| {
                    behavior.on_grid_enter(world, body, strip);
                });
                Processed::Fired(Event::GridEnter { time, body, cells: strip })
            }

            Payload::GridExit {
                body,
                version,
                grid_seq,
                strip,
                new_range,
            } => {
                if !self.grid_event_valid(body, version, grid_seq) {
                    return Processed::Discarded;
                }
                self.apply_grid_crossing(body, time, version, new_range, None);
                self.with_behavior_of(body, |behavior, world| {
                    behavior.on_grid_exit(world, body, strip);
                });
                Processed::Fired(Event::GridExit { time, body, cells: strip })
            }

            Payload::PathExpiry { body, version } => {
                let valid = self
                    .try_record(body)
                    .is_some_and(|record| record.body.path_version() == version);
                if !valid {
                    return Processed::Discarded;
                }
                self.record_mut(body).body.move_to_time(time);
                self.schedule_for_body(body);
                self.with_behavior_of(body, |behavior, world| {
                    behavior.on_path_expired(world, body);
                });
                Processed::Fired(Event::PathExpired { time, body })
            }
        }
    }

    fn grid_event_valid(&self, body: BodyId, version: PathVersion, grid_seq: u64) -> bool {
        self.try_record(body).is_some_and(|record| {
            record.body.path_version() == version && record.grid_seq == grid_seq
        })
    }

    /// Applies a grid crossing that fired: updates occupancy, tests new
    /// candidates (for entries), and schedules the next crossings. Does
    /// nothing when the event merely reports a change already applied at
    /// scheduling time.
    fn apply_grid_crossing(
        &mut self,
        body: BodyId,
        time: SimTime,
        version: PathVersion,
        new_range: GridAab,
        entered_strip: Option<GridAab>,
    ) {
        if self.grid.occupancy(body) == Some(new_range) {
            return;
        }
        self.grid.set_occupancy(body, new_range);
        let grid_seq = {
            let record = self.record_mut(body);
            record.grid_seq += 1;
            record.grid_seq
        };

        if let Some(strip) = entered_strip {
            for candidate in self.grid.candidates(strip, body) {
                self.test_pair_and_schedule(body, candidate);
            }
        }

        let (aab, velocity) = {
            let record_body = &self.record(body).body;
            (record_body.bounding_box_at_time(time), record_body.velocity())
        };
        let cell_size = self.grid.cell_size();
        if let Some(crossing) = grid::next_entry(new_range, aab, velocity, cell_size, time) {
            self.queue_event(
                crossing.time,
                Payload::GridEnter {
                    body,
                    version,
                    grid_seq,
                    strip: crossing.strip,
                    new_range: crossing.new_range,
                },
            );
        }
        if let Some(crossing) = grid::next_exit(new_range, aab, velocity, cell_size, time) {
            self.queue_event(
                crossing.time,
                Payload::GridExit {
                    body,
                    version,
                    grid_seq,
                    strip: crossing.strip,
                    new_range: crossing.new_range,
                },
            );
        }
    }

    /// Resolves a validated hit: computes and applies the impulse at the
    /// contact instant, delivers the event to both behaviors, then applies
    /// destruction.
    fn resolve_hit(&mut self, time: SimTime, a: BodyId, b: BodyId, normal: FreeVector) -> HitEvent {
        let response = self
            .resolver
            .response(&self.record(a).body, &self.record(b).body, normal);

        if let Some(delta) = response.delta_v_a {
            let body = &mut self.record_mut(a).body;
            let velocity = body.velocity() + delta;
            body.set_velocity_at_time(velocity, time);
        }
        if let Some(delta) = response.delta_v_b {
            let body = &mut self.record_mut(b).body;
            let velocity = body.velocity() + delta;
            body.set_velocity_at_time(velocity, time);
        }
        if response.delta_v_a.is_some() {
            self.schedule_for_body(a);
        }
        if response.delta_v_b.is_some() {
            self.schedule_for_body(b);
        }

        let hit = HitEvent {
            time,
            a,
            b,
            normal,
            impulse: response.impulse,
            response: response.flags,
        };
        self.with_behavior_of(a, |behavior, world| behavior.on_hit(world, a, &hit));
        self.with_behavior_of(b, |behavior, world| behavior.on_hit(world, b, &hit));

        let threshold = self.resolver.destroy_threshold;
        let destroy_a =
            response.flags.0.contains(ResponseFlags::DESTROY) && response.impulse >= threshold;
        let destroy_b =
            response.flags.1.contains(ResponseFlags::DESTROY) && response.impulse >= threshold;
        // A behavior hook may have removed either body already.
        if destroy_a && self.contains_body(a) {
            let _ = self.remove_body(a);
        }
        if destroy_b && self.contains_body(b) {
            let _ = self.remove_body(b);
        }

        hit
    }

    // --- Timers and the frame loop ----------------------------------------

    /// Schedules a [`Timeout`](Event::Timeout) event for `body` at `time`.
    ///
    /// Timeouts are not invalidated by path changes; they are cancelled only
    /// by removing the body. A time already in the past fires on the next
    /// processing call.
    ///
    /// Panics if `body` is not a live body or `time` is NaN.
    #[track_caller]
    pub fn add_timeout(&mut self, time: SimTime, body: BodyId, tag: TimeoutTag) {
        let _ = self.record(body);
        self.queue_event(time, Payload::Timeout { body, tag });
    }

    /// Processes queued events in time order until the next event is later
    /// than `target_time` (then advances the clock to exactly `target_time`),
    /// the queue runs dry, or the wall-clock `deadline` passes.
    ///
    /// This is the per-frame entry point: the two budgets together bound the
    /// work done in one call, at the price that a tripped deadline leaves the
    /// clock short of the target; check
    /// [`StepInfo::reached_target`] and simply call again next frame. Events
    /// are processed strictly in time order, so a tripped deadline never
    /// reorders anything; it only postpones.
    pub fn step(&mut self, target_time: SimTime, deadline: Deadline) -> StepInfo {
        assert!(
            target_time >= self.now,
            "step target {target_time} is before the current time {}",
            self.now
        );
        let mut info = StepInfo::default();
        loop {
            if Instant::now() >= deadline {
                info.hit_deadline = true;
                break;
            }
            match self.next_event_time() {
                Some(time) if time <= target_time => match self.process_next_event() {
                    Processed::Fired(_) => info.events_fired += 1,
                    Processed::Discarded => info.events_discarded += 1,
                    Processed::Idle => break,
                },
                _ => {
                    self.now = target_time;
                    info.reached_target = true;
                    break;
                }
            }
        }
        info
    }

    // --- Queries ----------------------------------------------------------

    /// Sweeps a probe shape from `request.origin` along `request.displacement`
    /// through the world as it is *right now*, and reports the first body hit
    /// whose group is in `request.groups`, or [`None`].
    ///
    /// This is a synchronous query: it does not touch the event queue and
    /// schedules nothing.
    pub fn rayscan(&mut self, request: &ScanRequest) -> Option<ScanHit> {
        scan::rayscan(self, request)
    }

    // --- Module-internal access -------------------------------------------

    pub(crate) fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    #[track_caller]
    pub(crate) fn freeze_body(&mut self, id: BodyId, t: SimTime) {
        self.record_mut(id).body.freeze_at_time(t);
    }

    #[track_caller]
    pub(crate) fn unfreeze_body(&mut self, id: BodyId) {
        self.record_mut(id).body.unfreeze();
    }

    #[cfg(feature = "save")]
    pub(crate) fn queued_events(&self) -> impl Iterator<Item = &QueuedEvent> {
        self.queue.iter().map(|Reverse(event)| event)
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("now", &self.now)
            .field("bodies", &self.bodies().count())
            .field("queued_events", &self.queue.len())
            .field("behaviors", &self.behaviors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Shape;
    use euclid::{point2, vec2};

    fn world() -> World {
        World::new(WorldOptions::default())
    }

    fn circle(position: (f64, f64), velocity: (f64, f64)) -> Body {
        Body::new(
            Shape::Circle { radius: 1.0 },
            point2(position.0, position.1),
            vec2(velocity.0, velocity.1),
        )
    }

    #[test]
    fn add_and_query() {
        let mut world = world();
        let id = world.add_body(circle((2.0, 3.0), (1.0, 0.0)));
        assert!(world.contains_body(id));
        assert_eq!(world.body(id).position_at_time(1.0), point2(3.0, 3.0));
        assert_eq!(world.bodies().collect::<Vec<_>>(), vec![id]);
    }

    #[test]
    #[should_panic(expected = "no such body")]
    fn bad_id_panics() {
        let world = world();
        let _ = world.body(BodyId(7));
    }

    #[test]
    fn remove_purges_queued_events() {
        let mut world = world();
        let id = world.add_body(circle((0.0, 0.0), (0.0, 0.0)));
        world.add_timeout(5.0, id, TimeoutTag(1));
        assert!(world.queued_event_count() > 0);
        world.remove_body(id);
        assert_eq!(world.queued_event_count(), 0);
    }

    #[test]
    fn removed_id_is_recycled_without_leaking_events() {
        let mut world = world();
        let first = world.add_body(circle((0.0, 0.0), (0.0, 0.0)));
        world.add_timeout(5.0, first, TimeoutTag(1));
        world.remove_body(first);
        let second = world.add_body(circle((50.0, 50.0), (0.0, 0.0)));
        assert_eq!(first, second, "free-list should recycle the id");
        // Stepping past the old timeout's due time must not deliver it to the
        // new body.
        let mut timeouts = 0;
        while let Some(t) = world.next_event_time() {
            if t > 10.0 {
                break;
            }
            if let Processed::Fired(Event::Timeout { .. }) = world.process_next_event() {
                timeouts += 1;
            }
        }
        assert_eq!(timeouts, 0);
    }

    #[test]
    fn step_to_quiet_target_advances_clock() {
        let mut world = world();
        let info = world.step(3.0, Deadline::Whenever);
        assert_eq!(world.now(), 3.0);
        assert!(info.reached_target);
        assert!(!info.hit_deadline);
    }

    #[test]
    fn step_asap_processes_nothing() {
        let mut world = world();
        let id = world.add_body(circle((0.0, 0.0), (0.0, 0.0)));
        world.add_timeout(1.0, id, TimeoutTag(0));
        let info = world.step(2.0, Deadline::Asap);
        assert!(info.hit_deadline);
        assert!(!info.reached_target);
        assert_eq!(info.events_fired, 0);
        assert_eq!(world.now(), 0.0);
    }

    #[test]
    fn equal_time_events_fire_in_scheduling_order() {
        let mut world = world();
        let id = world.add_body(circle((0.0, 0.0), (0.0, 0.0)));
        for tag in 0..4 {
            world.add_timeout(1.0, id, TimeoutTag(tag));
        }
        let mut fired = Vec::new();
        while world.next_event_time().is_some_and(|t| t <= 2.0) {
            if let Processed::Fired(Event::Timeout { tag, .. }) = world.process_next_event() {
                fired.push(tag.0);
            }
        }
        assert_eq!(fired, vec![0, 1, 2, 3]);
    }

    #[test]
    fn approaching_bodies_get_exactly_one_pending_hit() {
        let mut world = world();
        let a = world.add_body(circle((0.0, 0.0), (1.0, 0.0)));
        let b = world.add_body(circle((6.0, 0.0), (0.0, 0.0)));
        // Scheduling from both sides must coalesce into a single live hit.
        world.invalidate_body(a);
        world.invalidate_body(b);
        let hits = world
            .queued_events_for_test()
            .iter()
            .filter(|payload| matches!(payload, Payload::Hit { .. }))
            .count();
        // Only one of those queued hits is live; the rest are stale versions
        // that will be discarded. Processing to the contact time must fire
        // exactly one.
        assert!(hits >= 1);
        let mut fired_hits = 0;
        while world.next_event_time().is_some_and(|t| t <= 5.0) {
            if let Processed::Fired(Event::Hit(_)) = world.process_next_event() {
                fired_hits += 1;
            }
        }
        assert_eq!(fired_hits, 1);
    }

    impl World {
        fn queued_events_for_test(&self) -> Vec<Payload> {
            self.queue
                .iter()
                .map(|Reverse(event)| event.payload.clone())
                .collect()
        }
    }
}
