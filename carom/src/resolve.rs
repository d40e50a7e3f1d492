//! Collision response: turning a contact into velocity changes, with a
//! data-driven table of gameplay reactions layered over the plain elastic
//! bounce.

use bitflags::bitflags;
use hashbrown::HashMap;

use crate::body::{Body, StateTag};
use crate::math::{FreeCoordinate, FreeVector};

bitflags! {
    /// Per-body reactions from a [`ReactionTable`] lookup, applied by the
    /// world when a hit fires.
    ///
    /// `NO_BOUNCE` and `WALL` take effect before the impulse is computed;
    /// `STUN` and `DESTROY` after, using the computed impulse magnitude.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ResponseFlags: u8 {
        /// This body keeps its velocity; reactions are still delivered but the
        /// resolver applies no velocity change to it.
        const NO_BOUNCE = 1 << 0;
        /// Treat this body as an immovable wall when computing the impulse,
        /// regardless of its mass. The other body rebounds fully.
        const WALL = 1 << 1;
        /// Report a stun to this body's behavior; the engine attaches no other
        /// meaning.
        const STUN = 1 << 2;
        /// Remove this body from the world if the impulse magnitude reaches
        /// the resolver's [`destroy_threshold`](Resolver::destroy_threshold).
        const DESTROY = 1 << 3;
    }
}

/// Symmetric lookup from a pair of body [`StateTag`]s to the
/// [`ResponseFlags`] for each body.
///
/// Both orderings of every registered pair are stored, so a lookup never needs
/// to be performed twice. Unregistered pairs get empty flags: a plain elastic
/// bounce.
#[derive(Clone, Debug, Default)]
pub struct ReactionTable {
    map: HashMap<(StateTag, StateTag), (ResponseFlags, ResponseFlags)>,
}

impl ReactionTable {
    /// Constructs an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reactions for contacts between a body in state `a` and a
    /// body in state `b`, replacing any previous registration for the pair.
    pub fn insert(
        &mut self,
        a: StateTag,
        b: StateTag,
        flags_a: ResponseFlags,
        flags_b: ResponseFlags,
    ) {
        self.map.insert((a, b), (flags_a, flags_b));
        self.map.insert((b, a), (flags_b, flags_a));
    }

    /// The reactions for a contact between bodies in states `a` and `b`,
    /// in that order.
    pub fn lookup(&self, a: StateTag, b: StateTag) -> (ResponseFlags, ResponseFlags) {
        self.map.get(&(a, b)).copied().unwrap_or_default()
    }
}

/// Velocity changes and reaction bookkeeping computed for one contact.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct HitResponse {
    /// Magnitude of the applied impulse, normal and rub components combined.
    pub impulse: FreeCoordinate,
    /// Velocity change for the first body, or [`None`] if it keeps its
    /// velocity (immovable, suppressed, or not approaching).
    pub delta_v_a: Option<FreeVector>,
    /// Velocity change for the second body, as above.
    pub delta_v_b: Option<FreeVector>,
    /// Reaction-table flags for the two bodies.
    pub flags: (ResponseFlags, ResponseFlags),
}

/// Turns detected contacts into velocity changes.
///
/// The impulse is elastic, computed from the bodies' combined inverse mass
/// along the contact normal, with restitution from the bodies' elasticity and
/// an optional tangential “rub” component standing in for contact friction.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Resolver {
    /// Restitution used for bodies that don't override it
    /// (see [`Body::elasticity`]). The effective restitution of a contact is
    /// the product of the two bodies' values.
    pub default_elasticity: FreeCoordinate,
    /// Fraction of the relative tangential motion removed by a contact,
    /// in `0.0..=1.0`. Zero leaves sliding motion untouched.
    pub rub: FreeCoordinate,
    /// Impulse magnitude at or above which [`ResponseFlags::DESTROY`] takes
    /// effect. Zero makes it unconditional.
    pub destroy_threshold: FreeCoordinate,
    /// Gameplay reactions layered on top of the elastic bounce.
    pub reactions: ReactionTable,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            default_elasticity: 1.0,
            rub: 0.0,
            destroy_threshold: 0.0,
            reactions: ReactionTable::new(),
        }
    }
}

impl Resolver {
    /// Computes the response to a contact between `a` and `b`.
    ///
    /// `normal` must be the unit contact normal pointing from `a` toward `b`,
    /// and the bodies' velocities are read as of the contact instant. The
    /// returned deltas are meant to be applied exactly then, so that both new
    /// paths start at the contact.
    pub fn response(&self, a: &Body, b: &Body, normal: FreeVector) -> HitResponse {
        let flags = self.reactions.lookup(a.state, b.state);
        let (flags_a, flags_b) = flags;

        let inverse_mass = |body: &Body, body_flags: ResponseFlags| {
            if body_flags.contains(ResponseFlags::WALL) {
                0.0
            } else {
                // Infinite mass gives 0 here, making the body immovable.
                1.0 / body.mass
            }
        };
        let inv_a = inverse_mass(a, flags_a);
        let inv_b = inverse_mass(b, flags_b);
        let denominator = inv_a + inv_b;

        let relative = b.velocity() - a.velocity();
        let approach = relative.dot(normal);
        if approach >= 0.0 || denominator == 0.0 {
            // Separating (a stale grazing contact), or two immovable bodies.
            return HitResponse {
                impulse: 0.0,
                delta_v_a: None,
                delta_v_b: None,
                flags,
            };
        }

        let elasticity = a.elasticity.unwrap_or(self.default_elasticity)
            * b.elasticity.unwrap_or(self.default_elasticity);
        let tangent = FreeVector::new(-normal.y, normal.x);
        let impulse_normal = -(1.0 + elasticity) * approach / denominator;
        let impulse_rub = -self.rub * relative.dot(tangent) / denominator;
        let impulse_vector = normal * impulse_normal + tangent * impulse_rub;

        let delta = |inverse_mass: FreeCoordinate, body_flags: ResponseFlags, sign: FreeCoordinate| {
            if body_flags.contains(ResponseFlags::NO_BOUNCE) || inverse_mass == 0.0 {
                None
            } else {
                Some(impulse_vector * (inverse_mass * sign))
            }
        };
        HitResponse {
            impulse: impulse_normal.hypot(impulse_rub),
            delta_v_a: delta(inv_a, flags_a, -1.0),
            delta_v_b: delta(inv_b, flags_b, 1.0),
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Shape;
    use euclid::{point2, vec2};

    fn circle_at(x: f64, velocity: (f64, f64)) -> Body {
        Body::new(
            Shape::Circle { radius: 1.0 },
            point2(x, 0.0),
            vec2(velocity.0, velocity.1),
        )
    }

    const NORMAL: FreeVector = FreeVector::new(1.0, 0.0);

    #[test]
    fn equal_mass_head_on_swaps_velocities() {
        let a = circle_at(0.0, (1.0, 0.0));
        let b = circle_at(2.0, (0.0, 0.0));
        let response = Resolver::default().response(&a, &b, NORMAL);
        assert_eq!(response.delta_v_a, Some(vec2(-1.0, 0.0)));
        assert_eq!(response.delta_v_b, Some(vec2(1.0, 0.0)));
        assert_eq!(response.impulse, 1.0);
    }

    #[test]
    fn separating_bodies_get_no_impulse() {
        let a = circle_at(0.0, (-1.0, 0.0));
        let b = circle_at(2.0, (0.0, 0.0));
        let response = Resolver::default().response(&a, &b, NORMAL);
        assert_eq!(response.impulse, 0.0);
        assert_eq!(response.delta_v_a, None);
        assert_eq!(response.delta_v_b, None);
    }

    #[test]
    fn infinite_mass_body_does_not_move() {
        let a = circle_at(0.0, (1.0, 0.0));
        let mut b = circle_at(2.0, (0.0, 0.0));
        b.mass = f64::INFINITY;
        let response = Resolver::default().response(&a, &b, NORMAL);
        // Full reflection off the immovable body.
        assert_eq!(response.delta_v_a, Some(vec2(-2.0, 0.0)));
        assert_eq!(response.delta_v_b, None);
    }

    #[test]
    fn wall_flag_acts_like_infinite_mass() {
        let mut resolver = Resolver::default();
        resolver
            .reactions
            .insert(StateTag(0), StateTag(7), ResponseFlags::empty(), ResponseFlags::WALL);
        let a = circle_at(0.0, (1.0, 0.0));
        let mut b = circle_at(2.0, (0.0, 0.0));
        b.state = StateTag(7);
        let response = resolver.response(&a, &b, NORMAL);
        assert_eq!(response.delta_v_a, Some(vec2(-2.0, 0.0)));
        assert_eq!(response.delta_v_b, None);
        assert_eq!(response.flags, (ResponseFlags::empty(), ResponseFlags::WALL));
    }

    #[test]
    fn no_bounce_suppresses_velocity_change_only() {
        let mut resolver = Resolver::default();
        resolver.reactions.insert(
            StateTag(1),
            StateTag(0),
            ResponseFlags::NO_BOUNCE,
            ResponseFlags::empty(),
        );
        let mut a = circle_at(0.0, (1.0, 0.0));
        a.state = StateTag(1);
        let b = circle_at(2.0, (0.0, 0.0));
        let response = resolver.response(&a, &b, NORMAL);
        assert_eq!(response.delta_v_a, None);
        // The other body still bounces, with the suppressed body's real mass.
        assert_eq!(response.delta_v_b, Some(vec2(1.0, 0.0)));
        assert!(response.impulse > 0.0);
    }

    #[test]
    fn rub_removes_tangential_motion() {
        let mut resolver = Resolver::default();
        resolver.rub = 1.0;
        let a = circle_at(0.0, (1.0, 2.0));
        let b = circle_at(2.0, (0.0, 0.0));
        let response = resolver.response(&a, &b, NORMAL);
        let va = vec2(1.0, 2.0) + response.delta_v_a.unwrap();
        let vb = vec2(0.0, 0.0) + response.delta_v_b.unwrap();
        let relative = vb - va;
        let tangent = vec2(-NORMAL.y, NORMAL.x);
        assert!(
            relative.dot(tangent).abs() < 1e-12,
            "tangential motion survived: {relative:?}"
        );
    }

    #[test]
    fn elasticity_product_dampens() {
        let mut a = circle_at(0.0, (1.0, 0.0));
        a.elasticity = Some(0.0);
        let b = circle_at(2.0, (0.0, 0.0));
        let response = Resolver::default().response(&a, &b, NORMAL);
        // Perfectly inelastic: both end at the common momentum-conserving velocity.
        assert_eq!(response.delta_v_a, Some(vec2(-0.5, 0.0)));
        assert_eq!(response.delta_v_b, Some(vec2(0.5, 0.0)));
    }

    #[test]
    fn reaction_table_is_symmetric() {
        let mut table = ReactionTable::new();
        table.insert(
            StateTag(1),
            StateTag(2),
            ResponseFlags::STUN,
            ResponseFlags::DESTROY,
        );
        assert_eq!(
            table.lookup(StateTag(1), StateTag(2)),
            (ResponseFlags::STUN, ResponseFlags::DESTROY)
        );
        assert_eq!(
            table.lookup(StateTag(2), StateTag(1)),
            (ResponseFlags::DESTROY, ResponseFlags::STUN)
        );
        assert_eq!(
            table.lookup(StateTag(1), StateTag(1)),
            (ResponseFlags::empty(), ResponseFlags::empty())
        );
    }
}
