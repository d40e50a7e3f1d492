//! The pairwise time-of-impact solver: given two bodies' current paths, the
//! earliest future instant (if any) at which their shapes first touch.
//!
//! “First touch” is exact and forward-looking: shapes already overlapping at the
//! start of the query window have no future first touch and report
//! [`ToiOutcome::NoContact`], as does a pair with no relative motion. All
//! no-contact outcomes are ordinary values, not errors; the scheduler treats
//! them as “nothing to schedule”.

use crate::body::{Path, Shape};
use crate::math::{FreeCoordinate, FreeVector};
use crate::time::SimTime;

/// An individual collision contact, produced by the solver and consumed
/// immediately by the scheduler and resolver; never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Simulation time at which the shapes first touch.
    pub time: SimTime,
    /// Unit normal at the contact, pointing from the first queried body toward
    /// the second.
    pub normal: FreeVector,
}

/// Error for a shape pairing the solver deliberately does not handle.
///
/// Rect–circle collision is unimplemented; callers are responsible for not
/// letting those shapes share a collision group pair.
#[derive(Clone, Copy, Debug, displaydoc::Display, PartialEq)]
#[displaydoc("collision between {a:?} and {b:?} is not implemented")]
pub struct UnsupportedShapePair {
    /// Shape of the first queried body.
    pub a: Shape,
    /// Shape of the second queried body.
    pub b: Shape,
}

impl std::error::Error for UnsupportedShapePair {}

/// Outcome of a time-of-impact query.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum ToiOutcome {
    /// The shapes first touch at the contained time.
    Contact(Contact),
    /// The paths never bring the shapes together within the shared validity
    /// window: no root, no axis overlap, non-positive time, or already
    /// overlapping.
    NoContact,
    /// The shape pairing has no solver. Loud (logged, and an assertion failure
    /// in debug builds) but a defined no-op in release builds.
    Unsupported(UnsupportedShapePair),
}

impl ToiOutcome {
    /// The contact, if there is one.
    pub fn contact(self) -> Option<Contact> {
        match self {
            ToiOutcome::Contact(contact) => Some(contact),
            ToiOutcome::NoContact | ToiOutcome::Unsupported(_) => None,
        }
    }
}

/// Computes the earliest time within both paths' validity windows, and not
/// before `from`, at which the two shapes first touch.
pub fn pair_time_of_impact(
    path_a: &Path,
    shape_a: Shape,
    path_b: &Path,
    shape_b: Shape,
    from: SimTime,
) -> ToiOutcome {
    let start = from.max(path_a.start_time).max(path_b.start_time);
    let end = path_a.valid_until.min(path_b.valid_until);
    if end < start {
        return ToiOutcome::NoContact;
    }

    match (shape_a, shape_b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(path_a, path_b, ra + rb, start, end)
        }
        (Shape::Rect { half_extents: ha }, Shape::Rect { half_extents: hb }) => {
            rect_rect(path_a, path_b, ha + hb, start, end)
        }
        (a, b) => {
            let error = UnsupportedShapePair { a, b };
            log::error!("{error}");
            debug_assert!(false, "{error}");
            ToiOutcome::Unsupported(error)
        }
    }
}

/// Circle–circle impact: in the frame where the first body is stationary, solve
/// `|p + v·t|² = r²` for the smallest nonnegative root.
fn circle_circle(
    path_a: &Path,
    path_b: &Path,
    r: FreeCoordinate,
    start: SimTime,
    end: SimTime,
) -> ToiOutcome {
    let p = path_b.position_at_time(start) - path_a.position_at_time(start);
    let v = path_b.velocity - path_a.velocity;

    let a = v.square_length();
    if a == 0.0 {
        // No relative motion: permanently apart or permanently overlapping,
        // and in neither case is there a future first touch. Handled here so
        // the quadratic below never divides by zero.
        return ToiOutcome::NoContact;
    }

    let b = p.dot(v);
    let c = p.square_length() - r * r;
    if c < 0.0 {
        // Already overlapping at the window start; the first touch is in the past.
        return ToiOutcome::NoContact;
    }

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        // Complex roots: the paths pass by each other.
        return ToiOutcome::NoContact;
    }

    let dt = (-b - discriminant.sqrt()) / a;
    if dt < 0.0 || start + dt > end {
        return ToiOutcome::NoContact;
    }

    let offset_at_contact = p + v * dt;
    ToiOutcome::Contact(Contact {
        time: start + dt,
        normal: unit_or(offset_at_contact, unit_or(-v, FreeVector::new(1.0, 0.0))),
    })
}

/// Rect–rect impact: intersect the per-axis time intervals during which the
/// projections overlap; the start of the intersection, if in range, is the
/// impact, and the axis that entered last provides the contact normal.
fn rect_rect(
    path_a: &Path,
    path_b: &Path,
    r: FreeVector,
    start: SimTime,
    end: SimTime,
) -> ToiOutcome {
    let p = path_b.position_at_time(start) - path_a.position_at_time(start);
    let v = path_b.velocity - path_a.velocity;

    let (enter_x, exit_x) = match axis_overlap_interval(p.x, v.x, r.x) {
        Some(interval) => interval,
        None => return ToiOutcome::NoContact,
    };
    let (enter_y, exit_y) = match axis_overlap_interval(p.y, v.y, r.y) {
        Some(interval) => interval,
        None => return ToiOutcome::NoContact,
    };

    let enter = enter_x.max(enter_y);
    let exit = exit_x.min(exit_y);
    if enter > exit {
        // The axes never overlap simultaneously.
        return ToiOutcome::NoContact;
    }
    if enter < 0.0 {
        // Already overlapping at the window start (this includes the case of
        // no relative motion on either axis, where both intervals are infinite).
        return ToiOutcome::NoContact;
    }
    if start + enter > end {
        return ToiOutcome::NoContact;
    }

    let normal = if enter_x >= enter_y {
        FreeVector::new((p.x + v.x * enter).signum(), 0.0)
    } else {
        FreeVector::new(0.0, (p.y + v.y * enter).signum())
    };
    ToiOutcome::Contact(Contact {
        time: start + enter,
        normal,
    })
}

/// The time interval during which `|p + v·t| ≤ r`; that is, during which two
/// 1D extents with relative position `p`, relative velocity `v`, and combined
/// half-width `r` overlap. [`None`] if they never do.
///
/// The returned interval is always ordered (end ≥ start) and may be unbounded
/// when there is no relative motion on the axis.
pub(crate) fn axis_overlap_interval(
    p: FreeCoordinate,
    v: FreeCoordinate,
    r: FreeCoordinate,
) -> Option<(SimTime, SimTime)> {
    debug_assert!(r >= 0.0, "combined half-width must not be negative: {r}");
    if v == 0.0 {
        if p.abs() <= r {
            Some((f64::NEG_INFINITY, f64::INFINITY))
        } else {
            None
        }
    } else {
        let t0 = (-p - r) / v;
        let t1 = (-p + r) / v;
        Some(if t0 <= t1 { (t0, t1) } else { (t1, t0) })
    }
}

fn unit_or(v: FreeVector, fallback: FreeVector) -> FreeVector {
    let length = v.length();
    if length > 0.0 {
        v / length
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point2, vec2};
    use rand::Rng as _;
    use rand::SeedableRng as _;

    fn path(
        position: (FreeCoordinate, FreeCoordinate),
        velocity: (FreeCoordinate, FreeCoordinate),
    ) -> Path {
        Path {
            start_time: 0.0,
            start_position: point2(position.0, position.1),
            velocity: vec2(velocity.0, velocity.1),
            valid_until: 100.0,
        }
    }

    const CIRCLE: Shape = Shape::Circle { radius: 1.0 };
    const RECT: Shape = Shape::Rect {
        half_extents: FreeVector::new(1.0, 1.0),
    };

    #[test]
    fn circles_head_on() {
        // Combined radius 2, gap 10, closing speed 2: contact at (10 − 2) / 2 = 4.
        let a = path((-5.0, 0.0), (1.0, 0.0));
        let b = path((5.0, 0.0), (-1.0, 0.0));
        let contact = pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0)
            .contact()
            .unwrap();
        assert_eq!(contact.time, 4.0);
        assert_eq!(contact.normal, vec2(1.0, 0.0));
        // Distance exactly equals the combined radius at the reported time.
        let distance = (b.position_at_time(contact.time) - a.position_at_time(contact.time)).length();
        assert!((distance - 2.0).abs() < 1e-9, "distance {distance}");
    }

    #[test]
    fn circles_parallel_motion_is_no_contact() {
        // Equal velocities: zero relative velocity, which must be special-cased
        // rather than divided by.
        let a = path((-5.0, 0.0), (1.0, 0.0));
        let b = path((5.0, 0.0), (1.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn circles_static_overlap_is_no_contact() {
        let a = path((0.0, 0.0), (0.0, 0.0));
        let b = path((0.5, 0.0), (0.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn circles_moving_overlap_is_no_contact() {
        // Overlapping and separating: the first touch is in the past, not the future.
        let a = path((0.0, 0.0), (0.0, 0.0));
        let b = path((0.5, 0.0), (1.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn circles_passing_by() {
        // Passes 3 units to the side; combined radius is only 2.
        let a = path((-10.0, 3.0), (1.0, 0.0));
        let b = path((0.0, 0.0), (0.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn circles_contact_beyond_validity_window() {
        let mut a = path((-5.0, 0.0), (1.0, 0.0));
        a.valid_until = 3.0; // contact would be at 4.0
        let b = path((5.0, 0.0), (-1.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, CIRCLE, &b, CIRCLE, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn rects_edge_to_edge() {
        // Unit-half-extent rects 4 apart on x, closing at relative speed 1:
        // the 2-unit gap between edges closes at t = 2.
        let a = path((0.0, 0.0), (1.0, 0.0));
        let b = path((4.0, 0.0), (0.0, 0.0));
        let contact = pair_time_of_impact(&a, RECT, &b, RECT, 0.0)
            .contact()
            .unwrap();
        assert_eq!(contact.time, 2.0);
        assert_eq!(contact.normal, vec2(1.0, 0.0));
    }

    #[test]
    fn rects_miss_on_perpendicular_axis() {
        let a = path((0.0, 10.0), (1.0, 0.0));
        let b = path((4.0, 0.0), (0.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, RECT, &b, RECT, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn rects_zero_velocity_axis_always_overlapping() {
        // No relative y motion, already overlapping on y: contact is governed
        // entirely by x.
        let a = path((0.0, 0.5), (1.0, 0.0));
        let b = path((6.0, 0.0), (0.0, 0.0));
        let contact = pair_time_of_impact(&a, RECT, &b, RECT, 0.0)
            .contact()
            .unwrap();
        assert_eq!(contact.time, 4.0);
        assert_eq!(contact.normal, vec2(1.0, 0.0));
    }

    #[test]
    fn rects_static_apart_is_no_contact() {
        let a = path((0.0, 0.0), (0.0, 0.0));
        let b = path((4.0, 0.0), (0.0, 0.0));
        assert_eq!(
            pair_time_of_impact(&a, RECT, &b, RECT, 0.0),
            ToiOutcome::NoContact
        );
    }

    #[test]
    fn rects_vertical_normal() {
        let a = path((0.0, 5.0), (0.0, -1.0));
        let b = path((0.0, 0.0), (0.0, 0.0));
        let contact = pair_time_of_impact(&a, RECT, &b, RECT, 0.0)
            .contact()
            .unwrap();
        assert_eq!(contact.time, 3.0);
        assert_eq!(contact.normal, vec2(0.0, -1.0));
    }

    #[test]
    fn axis_interval_is_ordered() {
        for (p, v, r) in [
            (5.0, -1.0, 1.0),
            (5.0, 1.0, 1.0),
            (-3.0, 0.25, 2.0),
            (0.0, -2.0, 1.5),
        ] {
            let (t0, t1) = axis_overlap_interval(p, v, r).unwrap();
            assert!(t1 >= t0, "interval misordered for p={p} v={v} r={r}");
        }
        assert_eq!(axis_overlap_interval(5.0, 0.0, 1.0), None);
        assert_eq!(
            axis_overlap_interval(0.5, 0.0, 1.0),
            Some((f64::NEG_INFINITY, f64::INFINITY))
        );
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn mixed_shapes_assert_in_debug() {
        let a = path((0.0, 0.0), (1.0, 0.0));
        let b = path((4.0, 0.0), (0.0, 0.0));
        let _ = pair_time_of_impact(&a, CIRCLE, &b, RECT, 0.0);
    }

    /// Randomized check that a reported circle–circle contact really is a first
    /// touch: the distance equals the combined radius at the reported time and
    /// exceeds it at all sampled earlier times.
    #[test]
    fn circles_random_contacts_are_first_touches() {
        let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0);
        let mut contacts = 0;
        for case_number in 0..1000 {
            let random_point =
                |rng: &mut rand_xoshiro::Xoshiro256Plus| (rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0));
            let random_velocity =
                |rng: &mut rand_xoshiro::Xoshiro256Plus| (rng.random_range(-4.0..4.0), rng.random_range(-4.0..4.0));
            let a = path(random_point(&mut rng), random_velocity(&mut rng));
            let b = path(random_point(&mut rng), random_velocity(&mut rng));
            let ra = rng.random_range(0.1..2.0);
            let rb = rng.random_range(0.1..2.0);

            if let Some(contact) = pair_time_of_impact(
                &a,
                Shape::Circle { radius: ra },
                &b,
                Shape::Circle { radius: rb },
                0.0,
            )
            .contact()
            {
                contacts += 1;
                let distance_at = |t: SimTime| {
                    (b.position_at_time(t) - a.position_at_time(t)).length()
                };
                let r = ra + rb;
                assert!(
                    (distance_at(contact.time) - r).abs() < 1e-6,
                    "case {case_number}: distance {} at reported contact, expected {r}",
                    distance_at(contact.time)
                );
                for i in 1..10 {
                    let t = contact.time * f64::from(i) / 10.0;
                    assert!(
                        distance_at(t) >= r - 1e-6,
                        "case {case_number}: contact at {} but distance {} already at {t}",
                        contact.time,
                        distance_at(t)
                    );
                }
            }
        }
        // The chosen ranges should produce a healthy mix of hits and misses.
        assert!(contacts > 50, "only {contacts} contacts out of 1000 cases");
    }
}
