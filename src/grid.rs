//! Grid model: fixed 18×10 matrix of cells. Updates return a new grid.

use crate::piece::{PieceColor, Player};
use std::collections::VecDeque;

/// Rows in the playfield.
pub const HEIGHT: usize = 18;
/// Columns in the playfield.
pub const WIDTH: usize = 10;

/// Colour of an empty cell.
pub const EMPTY_HEX: &str = "#000";

/// Single cell: either empty or filled by a locked piece of some colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(PieceColor),
}

impl Cell {
    #[inline]
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled(_))
    }

    /// Colour of the cell as `#RRGGBB`, or `#000` when empty.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Empty => EMPTY_HEX,
            Self::Filled(color) => color.hex(),
        }
    }
}

type Row = [Cell; WIDTH];

/// Playfield. y=0 is top; rows[0] is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: VecDeque<Row>,
}

impl Grid {
    /// All cells empty.
    pub fn new() -> Self {
        Self {
            rows: (0..HEIGHT).map(|_| [Cell::Empty; WIDTH]).collect(),
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn width(&self) -> usize {
        WIDTH
    }

    /// Cell at `(row, col)`; `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// New grid with the piece's occupied cells filled in its colour.
    /// Cells that fall outside the grid are dropped.
    pub fn merge_piece(&self, player: &Player) -> Self {
        let mut merged = self.clone();
        let color = player.shape.color;
        for (row, col) in player.cells() {
            if row < 0 || col < 0 || col as usize >= WIDTH {
                continue;
            }
            if let Some(r) = merged.rows.get_mut(row as usize) {
                r[col as usize] = Cell::Filled(color);
            }
        }
        merged
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|r| r.iter().all(Cell::is_filled))
    }

    /// Removes every full row in one batch and pushes as many empty rows on
    /// top. Returns the new grid and how many rows went.
    pub fn clear_full_rows(&self) -> (Self, usize) {
        let full: Vec<usize> = (0..self.height()).filter(|&y| self.is_row_full(y)).collect();
        if full.is_empty() {
            return (self.clone(), 0);
        }
        let mut cleared = self.clone();
        // Bottom to top so the remaining indices stay valid.
        for &y in full.iter().rev() {
            cleared.rows.remove(y);
        }
        for _ in 0..full.len() {
            cleared.rows.push_front([Cell::Empty; WIDTH]);
        }
        (cleared, full.len())
    }

    /// Fills a single cell; used to stage boards in tests.
    #[cfg(test)]
    pub fn with_cell(mut self, row: usize, col: usize, cell: Cell) -> Self {
        self.rows[row][col] = cell;
        self
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
