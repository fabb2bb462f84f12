//! N-in-a-row rules on the cubic board
//!
//! The search itself is rules-agnostic. These rules decide when a game driven
//! by the engine is over, for self-play and for interactive play.

use crate::board::{BoardState, Color};
use crate::coord::{self, Coord};
use crate::{EngineError, Result};

/// The 13 line directions of a 3D grid as `(depth, height, width)` steps
///
/// Three axes, six face diagonals and four space diagonals. Each line is
/// scanned both ways, so opposite directions are not listed.
const DIRECTIONS: [(isize, isize, isize); 13] = [
    (0, 0, 1),
    (0, 1, 0),
    (1, 0, 0),
    (0, 1, 1),
    (0, 1, -1),
    (1, 0, 1),
    (1, 0, -1),
    (1, 1, 0),
    (1, -1, 0),
    (1, 1, 1),
    (1, 1, -1),
    (1, -1, 1),
    (1, -1, -1),
];

/// How a finished game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A player completed a line
    Win(Color),
    /// The board filled up without a line
    Draw,
}

impl Outcome {
    /// Result for `player`: 1.0 for a win, -1.0 for a loss, 0.0 for a draw
    pub fn score_for(&self, player: Color) -> f32 {
        match self {
            Outcome::Win(winner) if *winner == player => 1.0,
            Outcome::Win(_) => -1.0,
            Outcome::Draw => 0.0,
        }
    }
}

/// Win condition for a game
#[derive(Debug, Clone)]
pub struct GameRules {
    /// Number of pieces in a line needed to win
    pub n_in_row: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules { n_in_row: 4 }
    }
}

impl GameRules {
    /// Sets the line length needed to win
    pub fn with_n_in_row(mut self, n_in_row: usize) -> Self {
        self.n_in_row = n_in_row;
        self
    }

    /// Checks that a line of `n_in_row` fits on a board of side `size`
    pub fn validate_for(&self, size: usize) -> Result<()> {
        if self.n_in_row == 0 || self.n_in_row > size {
            return Err(EngineError::InvalidConfiguration(format!(
                "n_in_row must be between 1 and the board side {}, got {}",
                size, self.n_in_row
            )));
        }
        Ok(())
    }

    /// The colour that completed a line with the last move, if any
    ///
    /// Only lines through the last move are checked. On a board built by
    /// successive moves under these rules no earlier line can exist.
    pub fn winner(&self, board: &BoardState) -> Option<Color> {
        let last = board.last_move()?;
        let player = board.owner_of(last)?;
        let origin = coord::index_to_coord(last, board.size());

        DIRECTIONS
            .iter()
            .any(|&step| {
                let forward = self.run_length(board, origin, step, player);
                let backward = self.run_length(board, origin, negate(step), player);
                1 + forward + backward >= self.n_in_row
            })
            .then_some(player)
    }

    /// Outcome of the game, `None` while it is still running
    pub fn outcome(&self, board: &BoardState) -> Option<Outcome> {
        if let Some(winner) = self.winner(board) {
            return Some(Outcome::Win(winner));
        }
        board.is_full().then_some(Outcome::Draw)
    }

    /// Consecutive pieces of `player` after `origin` along `step`
    fn run_length(
        &self,
        board: &BoardState,
        origin: Coord,
        step: (isize, isize, isize),
        player: Color,
    ) -> usize {
        let mut count = 0;
        let mut current = origin;
        while let Some(next) = offset(current, step, board.size()) {
            if board.owner_of(coord::coord_to_index(next, board.size())) != Some(player) {
                break;
            }
            count += 1;
            current = next;
        }
        count
    }
}

fn negate((d, h, w): (isize, isize, isize)) -> (isize, isize, isize) {
    (-d, -h, -w)
}

fn offset(c: Coord, (dd, dh, dw): (isize, isize, isize), size: usize) -> Option<Coord> {
    let depth = c.depth.checked_add_signed(dd)?;
    let height = c.height.checked_add_signed(dh)?;
    let width = c.width.checked_add_signed(dw)?;
    let next = Coord::new(depth, height, width);
    next.is_within(size).then_some(next)
}
