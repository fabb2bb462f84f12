//! Perspective-relative board state for 3D Gomoku
//!
//! The board never stores "black" and "white" grids. It stores the pieces of
//! the player about to move and the pieces of the other player, and swaps the
//! two after every move. The predictor was trained on that layout, so channel 0
//! of the tensor is always "whoever moves next".

use std::fmt;

use crate::coord::{self, Coord};
use crate::{EngineError, Result};

/// Colour of a player
///
/// `First` moves on an empty board. The fourth tensor channel is filled with
/// 1.0 when `First` is to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    First,
    Second,
}

impl Color {
    /// Returns the other colour
    pub fn opponent(self) -> Color {
        match self {
            Color::First => Color::Second,
            Color::Second => Color::First,
        }
    }

    fn symbol(self) -> char {
        match self {
            Color::First => 'X',
            Color::Second => 'O',
        }
    }
}

/// The four planes handed to the predictor, in tensor order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Pieces of the player to move
    Mover = 0,
    /// Pieces of the player who just moved
    Opponent = 1,
    /// The single most recent move, if any
    LastMove = 2,
    /// Constant plane: 1.0 when the first colour is to move, else 0.0
    FirstToMove = 3,
}

/// Read-only snapshot of a position in predictor layout: `4 × size³` values
#[derive(Debug, Clone, PartialEq)]
pub struct BoardTensor {
    size: usize,
    data: Vec<f32>,
}

impl BoardTensor {
    /// Number of stacked planes
    pub const CHANNELS: usize = 4;

    /// Wraps raw channel-major data, checking its length against `size`
    pub fn from_raw(size: usize, data: Vec<f32>) -> Result<Self> {
        let expected = Self::CHANNELS * coord::cell_count(size);
        if size == 0 || data.len() != expected {
            return Err(EngineError::MalformedTensor(format!(
                "expected {} values for side {}, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(BoardTensor { size, data })
    }

    /// Side length of the board
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells per channel
    pub fn cell_count(&self) -> usize {
        coord::cell_count(self.size)
    }

    /// `[channels, depth, height, width]`
    pub fn shape(&self) -> [usize; 4] {
        [Self::CHANNELS, self.size, self.size, self.size]
    }

    /// One plane as a flat slice indexed by flat move index
    pub fn channel(&self, channel: Channel) -> &[f32] {
        let cells = self.cell_count();
        let start = channel as usize * cells;
        &self.data[start..start + cells]
    }

    /// Value of a single cell in a plane
    pub fn get(&self, channel: Channel, index: usize) -> f32 {
        self.channel(channel)[index]
    }

    /// Flat indices whose cell is empty in both piece planes, ascending
    pub fn empty_cells(&self) -> Vec<usize> {
        let mover = self.channel(Channel::Mover);
        let other = self.channel(Channel::Opponent);
        (0..self.cell_count())
            .filter(|&i| mover[i] <= 0.5 && other[i] <= 0.5)
            .collect()
    }

    /// All four planes back to back
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the tensor, returning the raw data
    pub fn into_raw(self) -> Vec<f32> {
        self.data
    }
}

/// Board position from the point of view of the player to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    size: usize,
    /// Grid A: pieces of the player to move
    mover: Vec<bool>,
    /// Grid B: pieces of the other player
    other: Vec<bool>,
    last_move: Option<usize>,
    to_move: Color,
}

impl BoardState {
    /// Creates an empty board with `First` to move
    pub fn new(size: usize) -> Self {
        let cells = coord::cell_count(size);
        BoardState {
            size,
            mover: vec![false; cells],
            other: vec![false; cells],
            last_move: None,
            to_move: Color::First,
        }
    }

    /// Rebuilds a board from a predictor tensor
    ///
    /// Cells above 0.5 count as set. The last-move plane may mark at most one
    /// cell, and that cell must hold a piece of the player who just moved.
    pub fn from_tensor(tensor: &BoardTensor) -> Result<Self> {
        let size = tensor.size();
        let mut board = BoardState::new(size);
        let mover = tensor.channel(Channel::Mover);
        let other = tensor.channel(Channel::Opponent);

        for index in 0..board.cell_count() {
            let (a, b) = (mover[index] > 0.5, other[index] > 0.5);
            if a && b {
                return Err(EngineError::MalformedTensor(format!(
                    "cell {} is set in both piece planes",
                    coord::index_to_coord(index, size)
                )));
            }
            board.mover[index] = a;
            board.other[index] = b;
        }

        let mut marked = tensor
            .channel(Channel::LastMove)
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.5)
            .map(|(i, _)| i);
        board.last_move = marked.next();
        if marked.next().is_some() {
            return Err(EngineError::MalformedTensor(
                "last-move plane marks more than one cell".to_string(),
            ));
        }
        if let Some(index) = board.last_move {
            if !board.other[index] {
                return Err(EngineError::MalformedTensor(format!(
                    "last move {} is not a piece of the previous mover",
                    coord::index_to_coord(index, size)
                )));
            }
        }

        board.to_move = if tensor.get(Channel::FirstToMove, 0) > 0.5 {
            Color::First
        } else {
            Color::Second
        };
        Ok(board)
    }

    /// Side length of the board
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells on the board
    pub fn cell_count(&self) -> usize {
        self.mover.len()
    }

    /// Colour of the player to move
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    /// Flat index of the most recent move
    pub fn last_move(&self) -> Option<usize> {
        self.last_move
    }

    /// Number of pieces on the board
    pub fn stone_count(&self) -> usize {
        self.mover.iter().filter(|&&set| set).count() + self.other.iter().filter(|&&set| set).count()
    }

    /// Returns true when no empty cell is left
    pub fn is_full(&self) -> bool {
        self.stone_count() == self.cell_count()
    }

    /// Returns true if the cell at `index` holds a piece of either player
    pub fn is_occupied(&self, index: usize) -> bool {
        self.mover[index] || self.other[index]
    }

    /// Colour of the piece at `index`, if any
    pub fn owner_of(&self, index: usize) -> Option<Color> {
        if self.mover[index] {
            Some(self.to_move)
        } else if self.other[index] {
            Some(self.to_move.opponent())
        } else {
            None
        }
    }

    /// Snapshot of the position in predictor layout
    pub fn tensor(&self) -> BoardTensor {
        let cells = self.cell_count();
        let mut data = Vec::with_capacity(BoardTensor::CHANNELS * cells);
        data.extend(self.mover.iter().map(|&set| set as u8 as f32));
        data.extend(self.other.iter().map(|&set| set as u8 as f32));
        data.extend((0..cells).map(|i| (self.last_move == Some(i)) as u8 as f32));
        let fill = if self.to_move == Color::First { 1.0 } else { 0.0 };
        data.extend(std::iter::repeat(fill).take(cells));
        BoardTensor {
            size: self.size,
            data,
        }
    }

    /// Places a piece for the player to move and hands the turn over
    ///
    /// The piece is written into the mover's grid before the grids swap, so it
    /// ends up in the opponent plane of the next tensor.
    pub fn apply_move(&mut self, coord: Coord) -> Result<()> {
        let index = coord::checked_index(coord, self.size)?;
        self.place(index)
    }

    /// Same as [`apply_move`](Self::apply_move), addressed by flat index
    pub fn apply_index(&mut self, index: usize) -> Result<()> {
        coord::checked_coord(index, self.size)?;
        self.place(index)
    }

    fn place(&mut self, index: usize) -> Result<()> {
        if self.is_occupied(index) {
            return Err(EngineError::OccupiedCell { index });
        }

        self.mover[index] = true;
        self.last_move = Some(index);

        std::mem::swap(&mut self.mover, &mut self.other);
        self.to_move = self.to_move.opponent();
        Ok(())
    }

    /// Flat indices of all empty cells, ascending (depth, then height, then width)
    pub fn available_moves(&self) -> Vec<usize> {
        (0..self.cell_count())
            .filter(|&i| !self.is_occupied(i))
            .collect()
    }

    /// Clears the board and gives the first move back to `First`
    pub fn reset(&mut self) {
        self.mover.iter_mut().for_each(|c| *c = false);
        self.other.iter_mut().for_each(|c| *c = false);
        self.last_move = None;
        self.to_move = Color::First;
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in 0..self.size {
            writeln!(f, "Depth level {}:", d)?;
            write!(f, "    ")?;
            for w in 0..self.size {
                write!(f, "{:^4}", w)?;
            }
            writeln!(f)?;
            for h in (0..self.size).rev() {
                write!(f, "{:>4}", h)?;
                for w in 0..self.size {
                    let index = coord::coord_to_index(Coord::new(d, h, w), self.size);
                    let symbol = self.owner_of(index).map_or('_', Color::symbol);
                    write!(f, "{:^4}", symbol)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
