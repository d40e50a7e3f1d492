use core::fmt;
use core::iter::FusedIterator;
use core::ops::Range;

use crate::math::{GridCoordinate, GridPoint};

/// An axis-aligned rectangle of broad-phase grid cells.
///
/// The rectangle is defined by inclusive lower bounds and exclusive upper bounds;
/// a continuous analogue exists as [`Aab`](crate::math::Aab).
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct GridAab {
    lower_bounds: GridPoint,
    upper_bounds: GridPoint,
}

impl GridAab {
    /// Constructs a [`GridAab`] from inclusive lower bounds and exclusive upper bounds.
    ///
    /// Panics if the bounds are misordered; an empty rectangle (equal bounds on some
    /// axis) is allowed.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<GridPoint>,
        upper_bounds: impl Into<GridPoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        assert!(
            lower_bounds.x <= upper_bounds.x && lower_bounds.y <= upper_bounds.y,
            "GridAab bounds are misordered: lower {lower_bounds:?} upper {upper_bounds:?}"
        );
        GridAab {
            lower_bounds,
            upper_bounds,
        }
    }

    /// Constructs a [`GridAab`] containing a single cell.
    #[inline]
    pub fn single_cell(cell: GridPoint) -> Self {
        GridAab {
            lower_bounds: cell,
            upper_bounds: cell + euclid::vec2(1, 1),
        }
    }

    /// The inclusive lower bounds.
    #[inline]
    pub const fn lower_bounds(&self) -> GridPoint {
        self.lower_bounds
    }

    /// The exclusive upper bounds.
    #[inline]
    pub const fn upper_bounds(&self) -> GridPoint {
        self.upper_bounds
    }

    /// The range of cell x-coordinates this rectangle covers.
    #[inline]
    pub const fn x_range(&self) -> Range<GridCoordinate> {
        self.lower_bounds.x..self.upper_bounds.x
    }

    /// The range of cell y-coordinates this rectangle covers.
    #[inline]
    pub const fn y_range(&self) -> Range<GridCoordinate> {
        self.lower_bounds.y..self.upper_bounds.y
    }

    /// Returns whether this rectangle contains no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower_bounds.x == self.upper_bounds.x || self.lower_bounds.y == self.upper_bounds.y
    }

    /// The number of cells this rectangle covers.
    #[inline]
    pub fn cell_count(&self) -> usize {
        let size = self.upper_bounds - self.lower_bounds;
        (size.x as usize) * (size.y as usize)
    }

    /// Returns whether `cell` is one of the cells of this rectangle.
    #[inline]
    pub fn contains_cell(&self, cell: GridPoint) -> bool {
        self.x_range().contains(&cell.x) && self.y_range().contains(&cell.y)
    }

    /// Returns the rectangle of cells in both `self` and `other`,
    /// or [`None`] if they are disjoint.
    #[inline]
    pub fn intersection(&self, other: GridAab) -> Option<GridAab> {
        let lower = self.lower_bounds.max(other.lower_bounds);
        let upper = self.upper_bounds.min(other.upper_bounds);
        if lower.x < upper.x && lower.y < upper.y {
            Some(GridAab {
                lower_bounds: lower,
                upper_bounds: upper,
            })
        } else {
            None
        }
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: GridAab) -> GridAab {
        GridAab {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Iterates over every cell of this rectangle, in row-major (y-outer) order.
    #[inline]
    pub fn interior_iter(&self) -> GridAabIter {
        GridAabIter {
            bounds: *self,
            next: self.lower_bounds,
        }
    }
}

impl fmt::Debug for GridAab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let GridAab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("GridAab")
            .field(&(l.x..u.x))
            .field(&(l.y..u.y))
            .finish()
    }
}

/// Iterator produced by [`GridAab::interior_iter()`].
#[derive(Clone, Debug)]
pub struct GridAabIter {
    bounds: GridAab,
    next: GridPoint,
}

impl Iterator for GridAabIter {
    type Item = GridPoint;

    #[inline]
    fn next(&mut self) -> Option<GridPoint> {
        if self.bounds.is_empty() || self.next.y >= self.bounds.upper_bounds.y {
            return None;
        }
        let cell = self.next;
        self.next.x += 1;
        if self.next.x >= self.bounds.upper_bounds.x {
            self.next.x = self.bounds.lower_bounds.x;
            self.next.y += 1;
        }
        Some(cell)
    }
}

impl FusedIterator for GridAabIter {}
