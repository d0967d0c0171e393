//! Placement validation and the drop hint (ghost piece).

use crate::grid::Grid;
use crate::piece::{Player, Position, Shape};

/// True if every occupied cell of `shape` anchored at `pos` lies inside the
/// grid and on an empty cell.
pub fn is_valid(pos: Position, shape: &Shape, grid: &Grid) -> bool {
    shape.occupied().all(|(y, x)| {
        let row = pos.row + y as i32;
        let col = pos.col + x as i32;
        if row < 0 || row >= grid.height() as i32 || col < 0 || col >= grid.width() as i32 {
            return false;
        }
        grid.get(row, col).is_some_and(|cell| !cell.is_filled())
    })
}

/// Lowest position straight below the piece that still validates.
/// Returns the piece unchanged when it cannot descend at all.
pub fn hint(player: &Player, grid: &Grid) -> Player {
    let mut pos = player.pos;
    while is_valid(pos.offset(1, 0), &player.shape, grid) {
        pos = pos.offset(1, 0);
    }
    player.at(pos)
}
