//! Piece catalog (the seven tetrominoes), colour palette, rotation and the
//! generator that hands out the active piece plus its queued successor.

use crate::grid::WIDTH;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// High-contrast palette. Colour is drawn independently of the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceColor {
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,
    White,
}

impl PieceColor {
    pub const ALL: [Self; 7] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Magenta,
        Self::Cyan,
        Self::White,
    ];

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#FF0000",
            Self::Green => "#00FF00",
            Self::Blue => "#0000FF",
            Self::Yellow => "#FFFF00",
            Self::Magenta => "#FF00FF",
            Self::Cyan => "#00FFFF",
            Self::White => "#FFFFFF",
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Red => (0xFF, 0x00, 0x00),
            Self::Green => (0x00, 0xFF, 0x00),
            Self::Blue => (0x00, 0x00, 0xFF),
            Self::Yellow => (0xFF, 0xFF, 0x00),
            Self::Magenta => (0xFF, 0x00, 0xFF),
            Self::Cyan => (0x00, 0xFF, 0xFF),
            Self::White => (0xFF, 0xFF, 0xFF),
        }
    }
}

/// Tetromino kinds (I, O, T, J, L, S, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    I,
    O,
    T,
    J,
    L,
    S,
    Z,
}

impl ShapeKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::J, Self::L, Self::S, Self::Z];

    /// Bounding matrix, row-major, `1` = occupied. No template has an
    /// occupied cell above its own row 0, so a spawn at row 0 never pokes
    /// out of the top of the grid.
    pub fn template(&self) -> &'static [&'static [u8]] {
        match self {
            Self::I => &[&[0, 0, 0, 0], &[1, 1, 1, 1], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Self::O => &[&[1, 1], &[1, 1]],
            Self::T => &[&[0, 0, 0], &[1, 1, 1], &[0, 1, 0]],
            Self::J => &[&[0, 1, 0], &[0, 1, 0], &[1, 1, 0]],
            Self::L => &[&[0, 1, 0], &[0, 1, 0], &[0, 1, 1]],
            Self::S => &[&[0, 1, 1], &[1, 1, 0], &[0, 0, 0]],
            Self::Z => &[&[1, 1, 0], &[0, 1, 1], &[0, 0, 0]],
        }
    }
}

/// An instantiated piece: its own copy of the template matrix plus a colour.
/// Rotating produces a new `Shape`; templates are never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub cells: Vec<Vec<bool>>,
    pub color: PieceColor,
}

impl Shape {
    pub fn new(kind: ShapeKind, color: PieceColor) -> Self {
        let cells = kind
            .template()
            .iter()
            .map(|row| row.iter().map(|&c| c == 1).collect())
            .collect();
        Self { kind, cells, color }
    }

    /// Matrix width (columns of the first row).
    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells as `(row, col)` offsets from the matrix origin.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &filled)| filled)
                .map(move |(x, _)| (y, x))
        })
    }

    /// 90° clockwise turn inside the bounding box: transpose, then reverse each row.
    pub fn rotated(&self) -> Self {
        let h = self.height();
        let w = self.width();
        let cells = (0..w)
            .map(|x| {
                let mut row: Vec<bool> = (0..h)
                    .map(|y| self.cells[y].get(x).copied().unwrap_or(false))
                    .collect();
                row.reverse();
                row
            })
            .collect();
        Self {
            kind: self.kind,
            cells,
            color: self.color,
        }
    }
}

/// Top-left anchor of a shape matrix on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }
}

/// The active piece plus the queued one shown in the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub pos: Position,
    pub shape: Shape,
    pub next: Option<Shape>,
}

impl Player {
    pub fn at(&self, pos: Position) -> Self {
        Self {
            pos,
            shape: self.shape.clone(),
            next: self.next.clone(),
        }
    }

    /// Grid coordinates `(row, col)` covered by the piece at its position.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .occupied()
            .map(|(y, x)| (self.pos.row + y as i32, self.pos.col + x as i32))
    }
}

/// Random source for new pieces.
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: StdRng,
    #[cfg(test)]
    script: std::collections::VecDeque<ShapeKind>,
}

impl PieceGenerator {
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            #[cfg(test)]
            script: std::collections::VecDeque::new(),
        }
    }

    /// Forces the next shape kinds (colours stay random); falls back to
    /// random kinds once the script runs out.
    #[cfg(test)]
    pub fn scripted(kinds: impl IntoIterator<Item = ShapeKind>) -> Self {
        let mut generator = Self::seeded(7);
        generator.script = kinds.into_iter().collect();
        generator
    }

    #[cfg(test)]
    fn scripted_kind(&mut self) -> Option<ShapeKind> {
        self.script.pop_front()
    }

    #[cfg(not(test))]
    fn scripted_kind(&mut self) -> Option<ShapeKind> {
        None
    }

    fn next_kind(&mut self) -> ShapeKind {
        match self.scripted_kind() {
            Some(kind) => kind,
            None => ShapeKind::ALL[self.rng.gen_range(0..ShapeKind::ALL.len())],
        }
    }

    /// Uniform shape, uniform colour, drawn independently with replacement.
    pub fn random_shape(&mut self) -> Shape {
        let kind = self.next_kind();
        let color = PieceColor::ALL[self.rng.gen_range(0..PieceColor::ALL.len())];
        Shape::new(kind, color)
    }

    /// Next active piece. The previous piece's queued shape is promoted when
    /// present; otherwise both active and queued shapes are fresh.
    pub fn next_player(&mut self, previous: Option<&Player>) -> Player {
        let shape = match previous.and_then(|p| p.next.clone()) {
            Some(queued) => queued,
            None => self.random_shape(),
        };
        let next = Some(self.random_shape());
        Player {
            pos: spawn_position(&shape),
            shape,
            next,
        }
    }
}

impl Default for PieceGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Row 0, horizontally centred on the shape's matrix width.
pub fn spawn_position(shape: &Shape) -> Position {
    let col = (WIDTH as i32 - shape.width() as i32).div_euclid(2);
    Position::new(0, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pattern(shape: &Shape) -> HashSet<(usize, usize)> {
        shape.occupied().collect()
    }

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in ShapeKind::ALL {
            let shape = Shape::new(kind, PieceColor::Red);
            assert_eq!(shape.occupied().count(), 4, "{:?}", kind);
        }
    }

    #[test]
    fn test_four_rotations_restore_pattern() {
        for kind in ShapeKind::ALL {
            let shape = Shape::new(kind, PieceColor::Cyan);
            let turned = shape.rotated().rotated().rotated().rotated();
            assert_eq!(pattern(&turned), pattern(&shape), "{:?}", kind);
            assert_eq!(turned, shape);
        }
    }

    #[test]
    fn test_rotate_t_clockwise() {
        let t = Shape::new(ShapeKind::T, PieceColor::Red);
        let r = t.rotated();
        // [0,0,0]    [0,1,0]
        // [1,1,1] -> [1,1,0]
        // [0,1,0]    [0,1,0]
        let expected: HashSet<_> = [(0, 1), (1, 0), (1, 1), (2, 1)].into_iter().collect();
        assert_eq!(pattern(&r), expected);
    }

    #[test]
    fn test_rotation_does_not_touch_template() {
        let i = Shape::new(ShapeKind::I, PieceColor::Blue);
        let _ = i.rotated();
        assert_eq!(Shape::new(ShapeKind::I, PieceColor::Blue), i);
        assert!(i.cells[1].iter().all(|&c| c));
    }

    #[test]
    fn test_spawn_column_is_centred() {
        let o = Shape::new(ShapeKind::O, PieceColor::Red);
        let i = Shape::new(ShapeKind::I, PieceColor::Red);
        let t = Shape::new(ShapeKind::T, PieceColor::Red);
        assert_eq!(spawn_position(&o), Position::new(0, 4));
        assert_eq!(spawn_position(&i), Position::new(0, 3));
        assert_eq!(spawn_position(&t), Position::new(0, 3));
    }

    #[test]
    fn test_first_player_has_queued_shape() {
        let mut generator = PieceGenerator::seeded(42);
        let player = generator.next_player(None);
        assert!(player.next.is_some());
        assert_eq!(player.pos.row, 0);
    }

    #[test]
    fn test_queued_shape_is_promoted() {
        let mut generator = PieceGenerator::seeded(3);
        let first = generator.next_player(None);
        let queued = first.next.clone().unwrap();
        let second = generator.next_player(Some(&first));
        assert_eq!(second.shape, queued);
        assert_eq!(second.pos, spawn_position(&queued));
        assert!(second.next.is_some());
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = PieceGenerator::seeded(99);
        let mut b = PieceGenerator::seeded(99);
        for _ in 0..20 {
            assert_eq!(a.random_shape(), b.random_shape());
        }
    }

    #[test]
    fn test_random_shapes_cover_catalog_and_palette() {
        let mut generator = PieceGenerator::seeded(1);
        let mut kinds = HashSet::new();
        let mut colors = HashSet::new();
        for _ in 0..500 {
            let s = generator.random_shape();
            kinds.insert(s.kind);
            colors.insert(s.color);
        }
        assert_eq!(kinds.len(), 7);
        assert_eq!(colors.len(), 7);
    }

    #[test]
    fn test_scripted_generator_follows_script() {
        let mut generator = PieceGenerator::scripted([ShapeKind::O, ShapeKind::I]);
        assert_eq!(generator.random_shape().kind, ShapeKind::O);
        assert_eq!(generator.random_shape().kind, ShapeKind::I);
    }

    #[test]
    fn test_palette_hex_matches_rgb() {
        for color in PieceColor::ALL {
            let (r, g, b) = color.rgb();
            assert_eq!(color.hex(), format!("#{:02X}{:02X}{:02X}", r, g, b));
        }
    }
}
