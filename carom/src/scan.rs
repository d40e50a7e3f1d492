//! Swept-probe queries: “sweeping a probe shape from here along this vector,
//! what is the first qualifying body hit, and how far along did it get?”
//!
//! A scan is a synchronous side query. It reuses the ordinary time-of-impact
//! solver by dressing the sweep up as a transient probe body with a
//! one-scan-unit path; each candidate body is momentarily frozen so that the
//! scan measures the world as it is *now* rather than where moving bodies
//! will be. Nothing is added to the world and the event queue is untouched.

use crate::body::{Body, BodyId, Group, Shape, PROBE_PATH_VALIDITY};
use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::toi::pair_time_of_impact;
use crate::world::World;

/// A swept-probe query, for [`World::rayscan()`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRequest {
    /// Starting position of the probe.
    pub origin: FreePoint,
    /// Direction and length of the sweep; a hit at the far end has
    /// fraction 1.
    pub displacement: FreeVector,
    /// The shape swept along the segment. A zero-radius
    /// [`Circle`](Shape::Circle) probes a bare point. Use a shape kind that
    /// the solver supports against the bodies being scanned; unsupported
    /// pairings are skipped loudly.
    pub shape: Shape,
    /// Collision groups eligible to be hit; bodies in any other group are
    /// passed through as if absent.
    pub groups: Vec<Group>,
}

/// The nearest hit found by a [`World::rayscan()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ScanHit {
    /// The body hit.
    pub body: BodyId,
    /// How far along the displacement the probe traveled before touching,
    /// in `0.0..=1.0`.
    pub fraction: FreeCoordinate,
    /// Unit surface normal at the touch point, facing back toward the
    /// scanner.
    pub normal: FreeVector,
}

pub(crate) fn rayscan(world: &mut World, request: &ScanRequest) -> Option<ScanHit> {
    let now = world.now();

    // The probe is an ordinary body with a one-scan-unit path. It is never
    // added to the world, so it has no id and schedules nothing.
    let mut probe = Body::new(request.shape, request.origin, request.displacement);
    probe.set_path_valid_duration(PROBE_PATH_VALIDITY);
    probe.rebase(now);
    let probe_path = probe.path();

    let swept = probe.swept_bounding_box(now, now + PROBE_PATH_VALIDITY);
    let range = swept.round_up_to_grid(world.grid().cell_size());
    let candidates = world.grid().occupants(range);

    let mut best: Option<ScanHit> = None;
    for candidate in candidates {
        if !request.groups.contains(&world.body(candidate).group) {
            continue;
        }

        world.freeze_body(candidate, now);
        let (path, shape) = {
            let body = world.body(candidate);
            (body.path(), body.shape())
        };
        let outcome = pair_time_of_impact(&probe_path, request.shape, &path, shape, now);
        world.unfreeze_body(candidate);

        if let Some(contact) = outcome.contact() {
            let fraction = contact.time - now;
            if best.as_ref().map_or(true, |hit| fraction < hit.fraction) {
                best = Some(ScanHit {
                    body: candidate,
                    fraction,
                    // The solver's normal points from the probe toward the
                    // body; the caller wants the surface it would see.
                    normal: -contact.normal,
                });
            }
        }
    }
    best
}
