use core::fmt;

use crate::math::{FreeCoordinate, FreePoint, FreeSize, FreeVector, GridAab, GridCoordinate};

/// Axis-aligned 2D box data type.
///
/// Note that this has continuous coordinates; a discrete analogue, used for
/// broad-phase grid cell regions, exists as [`GridAab`].
#[derive(Copy, Clone, PartialEq)]
pub struct Aab {
    // The upper > lower checks in the constructors will reject NaNs,
    // so these are always ordered and non-NaN.
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The [`Aab`] of zero size at the origin.
    pub const ZERO: Aab = Aab {
        lower_bounds: FreePoint::new(0., 0.),
        upper_bounds: FreePoint::new(0., 0.),
    };

    /// Constructs an [`Aab`] from individual coordinates.
    #[inline]
    #[track_caller]
    pub fn new(lx: FreeCoordinate, hx: FreeCoordinate, ly: FreeCoordinate, hy: FreeCoordinate) -> Self {
        Self::from_lower_upper(FreePoint::new(lx, ly), FreePoint::new(hx, hy))
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(aab) => aab,
            None => panic!(
                "invalid AAB points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    #[inline]
    pub fn checked_from_lower_upper(lower_bounds: FreePoint, upper_bounds: FreePoint) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x && lower_bounds.y <= upper_bounds.y {
            Some(Aab {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// Constructs an [`Aab`] symmetric about the origin, from half-widths along each axis.
    ///
    /// Panics if the half-widths are negative or NaN.
    #[inline]
    #[track_caller]
    pub fn symmetric(half_extents: impl Into<FreeVector>) -> Self {
        let half_extents = half_extents.into();
        Self::from_lower_upper(
            FreePoint::origin() - half_extents,
            FreePoint::origin() + half_extents,
        )
    }

    /// The most negative corner of the box.
    #[inline]
    pub const fn lower_bounds(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the box.
    #[inline]
    pub const fn upper_bounds(&self) -> FreePoint {
        self.upper_bounds
    }

    /// The center of the box.
    #[inline]
    pub fn center(&self) -> FreePoint {
        (self.lower_bounds + self.upper_bounds.to_vector()) * 0.5
    }

    /// Size of the box in each axis; equivalent to
    /// `self.upper_bounds() - self.lower_bounds()`.
    #[inline]
    pub fn size(&self) -> FreeSize {
        (self.upper_bounds - self.lower_bounds).to_size()
    }

    /// Returns whether `point` is within (or on the boundary of) this box.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        point.x >= self.lower_bounds.x
            && point.x <= self.upper_bounds.x
            && point.y >= self.lower_bounds.y
            && point.y <= self.upper_bounds.y
    }

    /// Returns whether this box and `other` have any volume in common
    /// (shared boundaries count).
    #[inline]
    pub fn intersects(&self, other: Aab) -> bool {
        self.lower_bounds.x <= other.upper_bounds.x
            && other.lower_bounds.x <= self.upper_bounds.x
            && self.lower_bounds.y <= other.upper_bounds.y
            && other.lower_bounds.y <= self.upper_bounds.y
    }

    /// Returns the smallest [`Aab`] which contains both `self` and `other`.
    #[inline]
    pub fn union(&self, other: Aab) -> Aab {
        Aab {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Translates the box by the given offset.
    #[must_use]
    #[inline]
    pub fn translate(&self, offset: FreeVector) -> Self {
        Self {
            lower_bounds: self.lower_bounds + offset,
            upper_bounds: self.upper_bounds + offset,
        }
    }

    /// Enlarges the box by moving each face outward by `distance`.
    ///
    /// Panics if the distance is negative enough to produce a misordered box, or NaN.
    #[must_use]
    #[track_caller]
    #[inline]
    pub fn expand(&self, distance: FreeCoordinate) -> Self {
        let expansion = FreeVector::new(distance, distance);
        Self::from_lower_upper(self.lower_bounds - expansion, self.upper_bounds + expansion)
    }

    /// Returns the rectangle of grid cells of the given size which this box touches.
    ///
    /// An edge lying exactly on a cell boundary touches the cell on the negative side
    /// of that boundary only; callers wanting slop should [`expand()`](Self::expand)
    /// first. A zero-size box touches the single cell containing it, so the result is
    /// never empty.
    #[inline]
    pub fn round_up_to_grid(&self, cell_size: FreeCoordinate) -> GridAab {
        let lx = (self.lower_bounds.x / cell_size).floor() as GridCoordinate;
        let ly = (self.lower_bounds.y / cell_size).floor() as GridCoordinate;
        let hx = ((self.upper_bounds.x / cell_size).ceil() as GridCoordinate).max(lx + 1);
        let hy = ((self.upper_bounds.y / cell_size).ceil() as GridCoordinate).max(ly + 1);
        GridAab::from_lower_upper([lx, ly], [hx, hy])
    }
}

impl fmt::Debug for Aab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Aab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Aab")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point2;

    #[test]
    fn new_wrong_order() {
        assert_eq!(
            Aab::checked_from_lower_upper(point2(1., 0.), point2(0., 1.)),
            None
        );
    }

    #[test]
    fn new_nan() {
        assert_eq!(
            Aab::checked_from_lower_upper(point2(0., f64::NAN), point2(1., 1.)),
            None
        );
    }

    #[test]
    fn union_and_contains() {
        let a = Aab::new(0., 1., 0., 1.);
        let b = Aab::new(2., 3., -1., 0.5);
        let u = a.union(b);
        assert_eq!(u, Aab::new(0., 3., -1., 1.));
        assert!(u.contains(point2(1.5, 0.)));
        assert!(!a.contains(point2(1.5, 0.)));
    }

    #[test]
    fn intersects_boundary_counts() {
        let a = Aab::new(0., 1., 0., 1.);
        assert!(a.intersects(Aab::new(1., 2., 0., 1.)));
        assert!(!a.intersects(Aab::new(1.0001, 2., 0., 1.)));
    }

    #[test]
    fn round_up_to_grid_straddling() {
        let aab = Aab::new(-0.5, 2.5, 0.5, 0.75);
        assert_eq!(
            aab.round_up_to_grid(1.0),
            GridAab::from_lower_upper([-1, 0], [3, 1])
        );
    }

    #[test]
    fn round_up_to_grid_boundary() {
        // Despite having zero height, the box still occupies one row of cells.
        let aab = Aab::new(0.0, 2.0, 1.0, 1.0);
        assert_eq!(
            aab.round_up_to_grid(1.0),
            GridAab::from_lower_upper([0, 1], [2, 2])
        );
    }

    #[test]
    fn round_up_to_grid_zero_size() {
        let aab = Aab::new(0.25, 0.25, 0.25, 0.25);
        assert_eq!(
            aab.round_up_to_grid(1.0),
            GridAab::from_lower_upper([0, 0], [1, 1])
        );
    }
}
