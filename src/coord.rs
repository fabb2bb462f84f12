//! Coordinate codec for the cubic board
//!
//! Cells are addressed either by a `(depth, height, width)` triple or by a
//! row-major flat index in `[0, size³)`. The flat index is the move key used
//! throughout the search tree.

use std::fmt;

use crate::{EngineError, Result};

/// A cell position on a `size × size × size` board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub depth: usize,
    pub height: usize,
    pub width: usize,
}

impl Coord {
    /// Creates a coordinate without bounds checking
    pub fn new(depth: usize, height: usize, width: usize) -> Self {
        Coord {
            depth,
            height,
            width,
        }
    }

    /// Returns true if every component lies in `[0, size)`
    pub fn is_within(&self, size: usize) -> bool {
        self.depth < size && self.height < size && self.width < size
    }
}

impl From<(usize, usize, usize)> for Coord {
    fn from((depth, height, width): (usize, usize, usize)) -> Self {
        Coord::new(depth, height, width)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.depth, self.height, self.width)
    }
}

/// Maps a coordinate to its flat index: `d·size² + h·size + w`
///
/// No validation is performed. Out-of-range coordinates yield indices outside
/// `[0, size³)`; use [`checked_index`] when the input is untrusted.
pub fn coord_to_index(coord: Coord, size: usize) -> usize {
    coord.depth * size * size + coord.height * size + coord.width
}

/// Inverse of [`coord_to_index`]
pub fn index_to_coord(index: usize, size: usize) -> Coord {
    let plane = size * size;
    let depth = index / plane;
    let remainder = index % plane;
    Coord::new(depth, remainder / size, remainder % size)
}

/// Number of cells on a board with the given side length
pub fn cell_count(size: usize) -> usize {
    size * size * size
}

/// Like [`coord_to_index`], but rejects coordinates outside the board
pub fn checked_index(coord: Coord, size: usize) -> Result<usize> {
    if !coord.is_within(size) {
        return Err(EngineError::OutOfRange {
            what: format!("coordinate {}", coord),
            size,
        });
    }
    Ok(coord_to_index(coord, size))
}

/// Like [`index_to_coord`], but rejects indices outside `[0, size³)`
pub fn checked_coord(index: usize, size: usize) -> Result<Coord> {
    if index >= cell_count(size) {
        return Err(EngineError::OutOfRange {
            what: format!("flat index {}", index),
            size,
        });
    }
    Ok(index_to_coord(index, size))
}
