//! Spatial broad phase: a uniform grid over world coordinates which tracks the
//! cells each body's bounding box touches, so that only bodies sharing a cell
//! are ever handed to the time-of-impact solver.
//!
//! Because body motion is analytic, the grid does not need to be re-scanned per
//! frame: the instant at which a body's occupied cell range next changes is
//! itself computable from the path, and the scheduler queues those crossings as
//! events alongside collisions.

use arrayvec::ArrayVec;
use hashbrown::HashMap;
use itertools::Itertools as _;

use crate::body::BodyId;
use crate::math::{Aab, FreeCoordinate, FreeVector, GridAab, GridCoordinate, GridPoint};
use crate::time::SimTime;

/// Cell membership index for all bodies in a world.
///
/// The cell containing a position is `floor(position / cell_size)`; a body
/// occupies every cell its bounding box touches. Occupancy is rebuilt lazily,
/// per body, when the body's path is invalidated or a predicted crossing fires.
#[derive(Clone, Debug)]
pub(crate) struct SpatialGrid {
    cell_size: FreeCoordinate,
    cells: HashMap<GridPoint, Vec<BodyId>>,
    occupancy: HashMap<BodyId, GridAab>,
}

/// Difference between a body's previous and new occupied cell ranges,
/// as disjoint rectangles.
#[derive(Clone, Debug, Default)]
pub(crate) struct OccupancyChange {
    pub entered: ArrayVec<GridAab, 4>,
    pub exited: ArrayVec<GridAab, 4>,
}

impl SpatialGrid {
    pub fn new(cell_size: FreeCoordinate) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "grid cell size must be positive and finite, not {cell_size}"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            occupancy: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> FreeCoordinate {
        self.cell_size
    }

    /// The cell range `body` currently occupies, if it has been placed.
    pub fn occupancy(&self, body: BodyId) -> Option<GridAab> {
        self.occupancy.get(&body).copied()
    }

    /// Replaces `body`'s occupied cell range, updating cell membership, and
    /// returns which cells were newly entered and left.
    pub fn set_occupancy(&mut self, body: BodyId, new_range: GridAab) -> OccupancyChange {
        let old_range = self.occupancy.insert(body, new_range);

        let mut change = OccupancyChange::default();
        match old_range {
            Some(old_range) if old_range == new_range => {}
            Some(old_range) => {
                for cell in old_range.interior_iter() {
                    if !new_range.contains_cell(cell) {
                        self.remove_from_cell(cell, body);
                    }
                }
                for cell in new_range.interior_iter() {
                    if !old_range.contains_cell(cell) {
                        self.cells.entry(cell).or_default().push(body);
                    }
                }
                change.entered = rect_difference(new_range, old_range);
                change.exited = rect_difference(old_range, new_range);
            }
            None => {
                for cell in new_range.interior_iter() {
                    self.cells.entry(cell).or_default().push(body);
                }
                if !new_range.is_empty() {
                    change.entered.push(new_range);
                }
            }
        }
        change
    }

    /// Removes `body` from all cells.
    pub fn remove_body(&mut self, body: BodyId) {
        if let Some(range) = self.occupancy.remove(&body) {
            for cell in range.interior_iter() {
                self.remove_from_cell(cell, body);
            }
        }
    }

    /// All bodies occupying any cell of `range`, deduplicated, in id order.
    pub fn occupants(&self, range: GridAab) -> Vec<BodyId> {
        range
            .interior_iter()
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .copied()
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// All bodies other than `exclude` occupying any cell of `range`,
    /// deduplicated, in id order.
    pub fn candidates(&self, range: GridAab, exclude: BodyId) -> Vec<BodyId> {
        let mut occupants = self.occupants(range);
        occupants.retain(|&id| id != exclude);
        occupants
    }

    fn remove_from_cell(&mut self, cell: GridPoint, body: BodyId) {
        if let Some(occupants) = self.cells.get_mut(&cell) {
            if let Some(i) = occupants.iter().position(|&id| id == body) {
                occupants.swap_remove(i);
            }
            if occupants.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }
}

/// Cells in `a` but not in `b`, as up to four disjoint rectangles.
pub(crate) fn rect_difference(a: GridAab, b: GridAab) -> ArrayVec<GridAab, 4> {
    let mut pieces = ArrayVec::new();
    if a.is_empty() {
        return pieces;
    }
    let overlap = match a.intersection(b) {
        Some(overlap) => overlap,
        None => {
            pieces.push(a);
            return pieces;
        }
    };

    // Left and right pieces span a's full height; the top and bottom pieces
    // cover only the overlap's x-range, so the four never intersect.
    let mut push = |lx: GridCoordinate, ly: GridCoordinate, hx: GridCoordinate, hy: GridCoordinate| {
        if lx < hx && ly < hy {
            pieces.push(GridAab::from_lower_upper([lx, ly], [hx, hy]));
        }
    };
    let al = a.lower_bounds();
    let au = a.upper_bounds();
    let ol = overlap.lower_bounds();
    let ou = overlap.upper_bounds();
    push(al.x, al.y, ol.x, au.y);
    push(ou.x, al.y, au.x, au.y);
    push(ol.x, al.y, ou.x, ol.y);
    push(ol.x, ou.y, ou.x, au.y);
    pieces
}

/// A predicted change in a body's occupied cell range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Crossing {
    /// The time at which the range changes.
    pub time: SimTime,
    /// The one-cell-wide strip being entered or left.
    pub strip: GridAab,
    /// The full occupied range after the crossing.
    pub new_range: GridAab,
}

/// The next instant at or after `t0` at which the leading edge of a box
/// occupying `range`, positioned as `aab_at_t0` and moving at `velocity`,
/// expands the range into a new row or column of cells. [`None`] if the box is
/// not moving.
pub(crate) fn next_entry(
    range: GridAab,
    aab_at_t0: Aab,
    velocity: FreeVector,
    cell_size: FreeCoordinate,
    t0: SimTime,
) -> Option<Crossing> {
    let mut best: Option<Crossing> = None;

    if velocity.x != 0.0 {
        let (boundary_cell, strip_column, edge) = if velocity.x > 0.0 {
            (range.upper_bounds().x, range.upper_bounds().x, aab_at_t0.upper_bounds().x)
        } else {
            (range.lower_bounds().x, range.lower_bounds().x - 1, aab_at_t0.lower_bounds().x)
        };
        let dt = ((FreeCoordinate::from(boundary_cell) * cell_size - edge) / velocity.x).max(0.0);
        let strip = GridAab::from_lower_upper(
            [strip_column, range.lower_bounds().y],
            [strip_column + 1, range.upper_bounds().y],
        );
        consider(&mut best, Crossing {
            time: t0 + dt,
            strip,
            new_range: range.union(strip),
        });
    }

    if velocity.y != 0.0 {
        let (boundary_cell, strip_row, edge) = if velocity.y > 0.0 {
            (range.upper_bounds().y, range.upper_bounds().y, aab_at_t0.upper_bounds().y)
        } else {
            (range.lower_bounds().y, range.lower_bounds().y - 1, aab_at_t0.lower_bounds().y)
        };
        let dt = ((FreeCoordinate::from(boundary_cell) * cell_size - edge) / velocity.y).max(0.0);
        let strip = GridAab::from_lower_upper(
            [range.lower_bounds().x, strip_row],
            [range.upper_bounds().x, strip_row + 1],
        );
        consider(&mut best, Crossing {
            time: t0 + dt,
            strip,
            new_range: range.union(strip),
        });
    }

    best
}

/// The next instant at or after `t0` at which the trailing edge of the box
/// leaves the outermost row or column of `range`. [`None`] if the box is not
/// moving.
///
/// For a moving box the trailing edge always crosses a given boundary after
/// the leading edge does, so processing entries and exits in time order keeps
/// the range nonempty.
pub(crate) fn next_exit(
    range: GridAab,
    aab_at_t0: Aab,
    velocity: FreeVector,
    cell_size: FreeCoordinate,
    t0: SimTime,
) -> Option<Crossing> {
    let mut best: Option<Crossing> = None;

    if velocity.x != 0.0 {
        let (boundary_cell, strip_column) = if velocity.x > 0.0 {
            (range.lower_bounds().x + 1, range.lower_bounds().x)
        } else {
            (range.upper_bounds().x - 1, range.upper_bounds().x - 1)
        };
        let edge = if velocity.x > 0.0 {
            aab_at_t0.lower_bounds().x
        } else {
            aab_at_t0.upper_bounds().x
        };
        let dt = ((FreeCoordinate::from(boundary_cell) * cell_size - edge) / velocity.x).max(0.0);
        let strip = GridAab::from_lower_upper(
            [strip_column, range.lower_bounds().y],
            [strip_column + 1, range.upper_bounds().y],
        );
        if let Some(new_range) = shrink(range, strip) {
            consider(&mut best, Crossing {
                time: t0 + dt,
                strip,
                new_range,
            });
        }
    }

    if velocity.y != 0.0 {
        let (boundary_cell, strip_row) = if velocity.y > 0.0 {
            (range.lower_bounds().y + 1, range.lower_bounds().y)
        } else {
            (range.upper_bounds().y - 1, range.upper_bounds().y - 1)
        };
        let edge = if velocity.y > 0.0 {
            aab_at_t0.lower_bounds().y
        } else {
            aab_at_t0.upper_bounds().y
        };
        let dt = ((FreeCoordinate::from(boundary_cell) * cell_size - edge) / velocity.y).max(0.0);
        let strip = GridAab::from_lower_upper(
            [range.lower_bounds().x, strip_row],
            [range.upper_bounds().x, strip_row + 1],
        );
        if let Some(new_range) = shrink(range, strip) {
            consider(&mut best, Crossing {
                time: t0 + dt,
                strip,
                new_range,
            });
        }
    }

    best
}

fn consider(best: &mut Option<Crossing>, candidate: Crossing) {
    if best.map_or(true, |b| candidate.time < b.time) {
        *best = Some(candidate);
    }
}

/// `range` with the given edge strip removed, or [`None`] if that would leave
/// no cells (a box strictly inside one cell has nothing to exit from).
fn shrink(range: GridAab, strip: GridAab) -> Option<GridAab> {
    let mut pieces = rect_difference(range, strip);
    match pieces.len() {
        1 => pieces.pop(),
        _ => None,
    }
}
