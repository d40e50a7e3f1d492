//! Numeric types used for coordinates, and the unit-of-measure types that tag them.

use euclid::{Point2D, Size2D, Vector2D};

/// Unit-of-measure type for continuous world coordinates, the plane bodies move in.
#[derive(Debug, Eq, PartialEq)]
pub enum World {}

/// Unit-of-measure type for discrete broad-phase grid cell coordinates.
///
/// One cell is `cell_size` world units on a side; the cell containing a world
/// position is found by `floor(position / cell_size)`.
#[derive(Debug, Eq, PartialEq)]
pub enum Cell {}

/// Coordinates that are not locked to the cell grid.
///
/// Note: Because `GridCoordinate = i32` and `FreeCoordinate = f64`, which has
/// more than 32 bits of mantissa, the conversion
/// `From<GridCoordinate> for FreeCoordinate` is exact.
pub type FreeCoordinate = f64;

/// Coordinates that identify a broad-phase grid cell.
pub type GridCoordinate = i32;

/// A position in continuous world space.
pub type FreePoint = Point2D<FreeCoordinate, World>;

/// A displacement or direction in continuous world space.
pub type FreeVector = Vector2D<FreeCoordinate, World>;

/// A 2D extent in continuous world space.
pub type FreeSize = Size2D<FreeCoordinate, World>;

/// A broad-phase grid cell, identified by its most-negative corner.
pub type GridPoint = Point2D<GridCoordinate, Cell>;

/// A displacement measured in whole grid cells.
pub type GridVector = Vector2D<GridCoordinate, Cell>;
