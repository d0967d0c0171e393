//! Game state: grid, active and queued piece, score, level, and the
//! transitions driven by gravity ticks and player input.

use crate::grid::Grid;
use crate::piece::{PieceGenerator, Player, Shape};
use crate::placement::{hint, is_valid};
use crate::scoring::{
    FAST_TICK_MS, SOFT_DROP_TAP_MS, gravity_interval, level_for_score, line_clear_points,
};
use log::{debug, info, trace};
use std::time::{Duration, Instant};

/// Where the session is. `Loading` is the start page: no piece yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Playing,
    Paused,
    GameOver,
}

/// Counters shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub lines: u32,
    pub score: u32,
    pub level: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            lines: 0,
            score: 0,
            level: 1,
        }
    }
}

/// What happened when a piece locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOutcome {
    /// Rows removed by this lock (4 = a tetris).
    pub cleared: usize,
    pub points: u32,
    /// The replacement piece could not be placed.
    pub game_over: bool,
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub grid: &'a Grid,
    pub active: Option<&'a Player>,
    pub hint: Option<&'a Player>,
    pub next: Option<&'a Shape>,
    pub session: Session,
    pub phase: Phase,
    pub paused: bool,
    pub game_over: bool,
}

#[derive(Debug)]
pub struct GameState {
    grid: Grid,
    player: Option<Player>,
    hint: Option<Player>,
    session: Session,
    phase: Phase,
    /// When the soft-drop input went down, while it is held.
    soft_drop_since: Option<Instant>,
    generator: PieceGenerator,
}

impl GameState {
    pub fn new(seed: Option<u64>) -> Self {
        let generator = match seed {
            Some(seed) => PieceGenerator::seeded(seed),
            None => PieceGenerator::from_entropy(),
        };
        Self::with_generator(generator)
    }

    pub fn with_generator(generator: PieceGenerator) -> Self {
        Self {
            grid: Grid::new(),
            player: None,
            hint: None,
            session: Session::default(),
            phase: Phase::Loading,
            soft_drop_since: None,
            generator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// True while gravity should run.
    pub fn is_ticking(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            grid: &self.grid,
            active: self.player.as_ref(),
            hint: self.hint.as_ref(),
            next: self.player.as_ref().and_then(|p| p.next.as_ref()),
            session: self.session,
            phase: self.phase,
            paused: self.is_paused(),
            game_over: self.is_game_over(),
        }
    }

    /// Gravity period: fast while soft drop is held, else level-based.
    pub fn tick_interval(&self) -> Duration {
        if self.soft_drop_since.is_some() {
            Duration::from_millis(FAST_TICK_MS)
        } else {
            gravity_interval(self.session.level)
        }
    }

    /// Leaves the start page.
    pub fn start(&mut self) {
        self.reset();
        info!("game started: first piece {:?}", self.player.as_ref().map(|p| p.shape.kind));
    }

    /// Fresh board and counters with a new, unlinked piece.
    pub fn on_restart(&mut self) {
        let previous = self.session;
        self.reset();
        info!(
            "restart (previous score {}, lines {}, level {})",
            previous.score, previous.lines, previous.level
        );
    }

    fn reset(&mut self) {
        self.grid = Grid::new();
        self.session = Session::default();
        self.soft_drop_since = None;
        self.phase = Phase::Playing;
        let player = self.generator.next_player(None);
        self.set_player(player);
    }

    /// Ends the session and goes back to the start page.
    pub fn on_quit(&mut self) {
        info!(
            "session ended: score {}, lines {}, level {}",
            self.session.score, self.session.lines, self.session.level
        );
        self.grid = Grid::new();
        self.player = None;
        self.hint = None;
        self.session = Session::default();
        self.soft_drop_since = None;
        self.phase = Phase::Loading;
    }

    pub fn on_toggle_pause(&mut self) {
        self.phase = match self.phase {
            Phase::Playing => Phase::Paused,
            Phase::Paused => Phase::Playing,
            other => other,
        };
        debug!("pause toggled: {:?}", self.phase);
    }

    /// One gravity step.
    pub fn tick(&mut self) -> Option<LockOutcome> {
        if self.phase != Phase::Playing {
            return None;
        }
        trace!("tick");
        self.step_down()
    }

    /// Moves the piece down one row, or locks it when it cannot descend.
    fn step_down(&mut self) -> Option<LockOutcome> {
        let player = match self.player.as_ref() {
            Some(p) => p,
            None => {
                let player = self.generator.next_player(None);
                self.set_player(player);
                return None;
            }
        };
        let below = player.pos.offset(1, 0);
        if is_valid(below, &player.shape, &self.grid) {
            let moved = player.at(below);
            self.set_player(moved);
            None
        } else {
            let locked = player.clone();
            Some(self.lock(locked))
        }
    }

    /// One immediate descent step, independent of any held soft drop.
    pub fn on_step_down(&mut self) -> Option<LockOutcome> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.step_down()
    }

    pub fn on_move_left(&mut self) -> bool {
        self.shift(-1)
    }

    pub fn on_move_right(&mut self) -> bool {
        self.shift(1)
    }

    fn shift(&mut self, d_col: i32) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(player) = self.player.as_ref() else {
            return false;
        };
        let target = player.pos.offset(0, d_col);
        if !is_valid(target, &player.shape, &self.grid) {
            return false;
        }
        let moved = player.at(target);
        self.set_player(moved);
        true
    }

    /// Clockwise turn in place; dropped if it does not fit (no kicks).
    pub fn on_rotate(&mut self) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(player) = self.player.as_ref() else {
            return false;
        };
        let rotated = player.shape.rotated();
        if !is_valid(player.pos, &rotated, &self.grid) {
            return false;
        }
        let turned = Player {
            pos: player.pos,
            shape: rotated,
            next: player.next.clone(),
        };
        self.set_player(turned);
        true
    }

    pub fn on_soft_drop_start(&mut self, now: Instant) {
        if self.phase != Phase::Playing {
            return;
        }
        if self.soft_drop_since.is_none() {
            self.soft_drop_since = Some(now);
        }
    }

    /// Releases soft drop. A quick tap nudges the piece down once.
    pub fn on_soft_drop_end(&mut self, now: Instant) -> Option<LockOutcome> {
        let pressed = self.soft_drop_since.take()?;
        if self.phase != Phase::Playing {
            return None;
        }
        let held = now.saturating_duration_since(pressed);
        if held <= Duration::from_millis(SOFT_DROP_TAP_MS) {
            self.step_down()
        } else {
            None
        }
    }

    /// Slams the piece to its hint position and locks it there.
    pub fn on_hard_drop(&mut self) -> Option<LockOutcome> {
        if self.phase != Phase::Playing {
            return None;
        }
        let landed = hint(self.player.as_ref()?, &self.grid);
        Some(self.lock(landed))
    }

    /// Merge, clear, score, then spawn the queued piece.
    fn lock(&mut self, locked: Player) -> LockOutcome {
        let (grid, cleared) = self.grid.merge_piece(&locked).clear_full_rows();
        self.grid = grid;

        let points = line_clear_points(cleared, self.session.level);
        if cleared > 0 {
            self.session.lines += cleared as u32;
            self.session.score = self.session.score.saturating_add(points);
            let level = level_for_score(self.session.level, self.session.score);
            if level != self.session.level {
                debug!("level {} -> {}", self.session.level, level);
            }
            self.session.level = level;
            debug!(
                "cleared {} row(s) for {} points; score {}, lines {}",
                cleared, points, self.session.score, self.session.lines
            );
        }
        debug!(
            "locked {:?} ({}) at row {}, col {}",
            locked.shape.kind,
            locked.shape.color.hex(),
            locked.pos.row,
            locked.pos.col
        );

        let spawned = self.generator.next_player(Some(&locked));
        let game_over = !is_valid(spawned.pos, &spawned.shape, &self.grid);
        if game_over {
            info!(
                "game over: score {}, lines {}, level {}",
                self.session.score, self.session.lines, self.session.level
            );
            self.phase = Phase::GameOver;
            self.soft_drop_since = None;
            // Keep showing the last piece that was in play.
            self.set_player(locked);
        } else {
            self.set_player(spawned);
        }
        LockOutcome {
            cleared,
            points,
            game_over,
        }
    }

    fn set_player(&mut self, player: Player) {
        self.hint = Some(hint(&player, &self.grid));
        self.player = Some(player);
    }

    #[cfg(test)]
    fn with_board(generator: PieceGenerator, grid: Grid) -> Self {
        let mut state = Self::with_generator(generator);
        state.start();
        state.grid = grid;
        let player = state.player.take().expect("start spawns a piece");
        state.set_player(player);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, HEIGHT, WIDTH};
    use crate::piece::{PieceColor, Position, ShapeKind};

    fn scripted(kinds: &[ShapeKind]) -> GameState {
        let mut state = GameState::with_generator(PieceGenerator::scripted(kinds.to_vec()));
        state.start();
        state
    }

    fn filled(grid: &Grid) -> usize {
        grid.rows()
            .map(|r| r.iter().filter(|c| c.is_filled()).count())
            .sum()
    }

    fn tick_until_lock(state: &mut GameState) -> LockOutcome {
        for _ in 0..=HEIGHT {
            if let Some(outcome) = state.tick() {
                return outcome;
            }
        }
        panic!("piece never locked");
    }

    #[test]
    fn test_new_state_is_loading() {
        let state = GameState::new(Some(1));
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.player().is_none());
        let snap = state.snapshot();
        assert!(snap.active.is_none());
        assert!(snap.hint.is_none());
        assert!(!snap.paused);
        assert!(!snap.game_over);
    }

    #[test]
    fn test_start_spawns_centred_piece_with_preview() {
        let state = scripted(&[ShapeKind::O, ShapeKind::T]);
        let player = state.player().unwrap();
        assert_eq!(player.pos, Position::new(0, 4));
        assert_eq!(player.shape.kind, ShapeKind::O);
        assert_eq!(player.next.as_ref().unwrap().kind, ShapeKind::T);
        assert_eq!(state.snapshot().hint.unwrap().pos, Position::new(16, 4));
        assert_eq!(state.phase(), Phase::Playing);
    }

    #[test]
    fn test_tick_moves_piece_down() {
        let mut state = scripted(&[ShapeKind::O]);
        assert_eq!(state.tick(), None);
        assert_eq!(state.player().unwrap().pos, Position::new(1, 4));
    }

    #[test]
    fn test_o_piece_locks_on_bottom_rows() {
        let mut state = scripted(&[ShapeKind::O, ShapeKind::T]);
        let mut ticks = 0;
        let outcome = loop {
            ticks += 1;
            if let Some(outcome) = state.tick() {
                break outcome;
            }
        };
        assert_eq!(ticks, 17);
        assert_eq!(outcome.cleared, 0);
        assert!(!outcome.game_over);
        for (r, c) in [(16, 4), (16, 5), (17, 4), (17, 5)] {
            assert!(state.grid().get(r, c).unwrap().is_filled());
        }
        assert_eq!(filled(state.grid()), 4);
        let next = state.player().unwrap();
        assert_eq!(next.shape.kind, ShapeKind::T);
        assert_eq!(next.pos.row, 0);
        assert_eq!(state.session(), Session::default());
    }

    #[test]
    fn test_horizontal_moves_stop_at_walls() {
        let mut state = scripted(&[ShapeKind::O]);
        for _ in 0..4 {
            assert!(state.on_move_left());
        }
        assert!(!state.on_move_left());
        assert_eq!(state.player().unwrap().pos.col, 0);
        for _ in 0..8 {
            assert!(state.on_move_right());
        }
        assert!(!state.on_move_right());
        assert_eq!(state.player().unwrap().pos.col, WIDTH as i32 - 2);
    }

    #[test]
    fn test_move_updates_hint() {
        let grid = Grid::new().with_cell(10, 3, Cell::Filled(PieceColor::Red));
        let mut state = GameState::with_board(PieceGenerator::scripted([ShapeKind::O]), grid);
        assert_eq!(state.snapshot().hint.unwrap().pos.row, 16);
        state.on_move_left();
        assert_eq!(state.snapshot().hint.unwrap().pos, Position::new(8, 3));
    }

    #[test]
    fn test_rotation_commits_when_free() {
        let mut state = scripted(&[ShapeKind::T]);
        let before = state.player().unwrap().shape.clone();
        assert!(state.on_rotate());
        assert_eq!(state.player().unwrap().shape, before.rotated());
    }

    #[test]
    fn test_rotation_rejected_without_kick() {
        // Vertical I against the left wall cannot turn flat.
        let mut state = scripted(&[ShapeKind::I]);
        assert!(state.on_rotate());
        while state.on_move_left() {}
        let pos = state.player().unwrap().pos;
        assert_eq!(pos.col, -2);
        let shape = state.player().unwrap().shape.clone();
        assert!(!state.on_rotate());
        assert_eq!(state.player().unwrap().pos, pos);
        assert_eq!(state.player().unwrap().shape, shape);
    }

    #[test]
    fn test_hard_drop_locks_at_hint() {
        let mut state = scripted(&[ShapeKind::O, ShapeKind::S]);
        let outcome = state.on_hard_drop().unwrap();
        assert_eq!(outcome.cleared, 0);
        assert!(state.grid().get(17, 4).unwrap().is_filled());
        assert!(state.grid().get(16, 5).unwrap().is_filled());
        assert_eq!(state.player().unwrap().shape.kind, ShapeKind::S);
    }

    #[test]
    fn test_single_line_clear_scores_400() {
        // Bottom row full except columns 4 and 5; an O fills them.
        let mut grid = Grid::new();
        for col in 0..WIDTH {
            if col != 4 && col != 5 {
                grid = grid.with_cell(17, col, Cell::Filled(PieceColor::Red));
            }
        }
        grid = grid.with_cell(16, 0, Cell::Filled(PieceColor::Blue));
        let mut state = GameState::with_board(PieceGenerator::scripted([ShapeKind::O]), grid);
        let outcome = state.on_hard_drop().unwrap();
        assert_eq!(outcome.cleared, 1);
        assert_eq!(outcome.points, 400);
        let session = state.session();
        assert_eq!((session.lines, session.score, session.level), (1, 400, 1));
        // Former row 16 shifted down; the O's upper half stays behind.
        assert_eq!(state.grid().get(17, 0), Some(Cell::Filled(PieceColor::Blue)));
        assert!(state.grid().get(17, 4).unwrap().is_filled());
        assert!(!state.grid().get(16, 4).unwrap().is_filled());
        assert!(state.grid().rows().next().unwrap().iter().all(|c| !c.is_filled()));
        assert_eq!(filled(state.grid()), 3);
    }

    #[test]
    fn test_single_cell_gap_clear() {
        // Row 17 missing only column 0; a vertical I fills it.
        let mut grid = Grid::new();
        for col in 1..WIDTH {
            grid = grid.with_cell(17, col, Cell::Filled(PieceColor::Green));
        }
        grid = grid.with_cell(16, 5, Cell::Filled(PieceColor::Yellow));
        let mut state = GameState::with_board(PieceGenerator::scripted([ShapeKind::I]), grid);
        assert!(state.on_rotate());
        while state.on_move_left() {}
        let outcome = state.on_hard_drop().unwrap();
        assert_eq!(outcome.cleared, 1);
        assert_eq!(state.session().lines, 1);
        assert_eq!(state.grid().get(17, 5), Some(Cell::Filled(PieceColor::Yellow)));
        for row in 15..18 {
            assert!(state.grid().get(row, 0).unwrap().is_filled());
        }
        assert!(!state.grid().get(14, 0).unwrap().is_filled());
    }

    #[test]
    fn test_tetris_scores_1900() {
        let mut grid = Grid::new();
        for row in 14..18 {
            for col in 1..WIDTH {
                grid = grid.with_cell(row, col, Cell::Filled(PieceColor::Cyan));
            }
        }
        let mut state = GameState::with_board(PieceGenerator::scripted([ShapeKind::I]), grid);
        state.on_rotate();
        while state.on_move_left() {}
        let outcome = state.on_hard_drop().unwrap();
        assert_eq!(outcome.cleared, 4);
        assert_eq!(outcome.points, 1900);
        assert_eq!(state.session().lines, 4);
        assert_eq!(state.session().level, 2);
        assert_eq!(filled(state.grid()), 0);
    }

    #[test]
    fn test_tick_interval_follows_level_and_soft_drop() {
        let mut state = scripted(&[ShapeKind::O]);
        let now = Instant::now();
        assert_eq!(state.tick_interval(), Duration::from_millis(450));
        state.on_soft_drop_start(now);
        assert_eq!(state.tick_interval(), Duration::from_millis(50));
        assert_eq!(state.on_soft_drop_end(now + Duration::from_millis(500)), None);
        assert_eq!(state.tick_interval(), Duration::from_millis(450));
        assert_eq!(state.player().unwrap().pos.row, 0);
    }

    #[test]
    fn test_soft_drop_tap_nudges_once() {
        let mut state = scripted(&[ShapeKind::O]);
        let now = Instant::now();
        state.on_soft_drop_start(now);
        assert_eq!(state.on_soft_drop_end(now + Duration::from_millis(80)), None);
        assert_eq!(state.player().unwrap().pos.row, 1);
        // Release without a press does nothing.
        assert_eq!(state.on_soft_drop_end(now + Duration::from_millis(90)), None);
        assert_eq!(state.player().unwrap().pos.row, 1);
    }

    #[test]
    fn test_step_down_leaves_soft_drop_hold() {
        let mut state = scripted(&[ShapeKind::O]);
        let now = Instant::now();
        state.on_soft_drop_start(now);
        assert_eq!(state.on_step_down(), None);
        assert_eq!(state.player().unwrap().pos.row, 1);
        assert_eq!(state.tick_interval(), Duration::from_millis(50));
        state.on_toggle_pause();
        assert_eq!(state.on_step_down(), None);
        assert_eq!(state.player().unwrap().pos.row, 1);
    }

    #[test]
    fn test_pause_freezes_ticks_and_input() {
        let mut state = scripted(&[ShapeKind::O]);
        state.on_toggle_pause();
        assert!(state.is_paused());
        assert!(state.snapshot().paused);
        assert!(!state.is_ticking());
        assert_eq!(state.tick(), None);
        assert!(!state.on_move_left());
        assert!(!state.on_rotate());
        assert_eq!(state.on_hard_drop(), None);
        assert_eq!(state.player().unwrap().pos, Position::new(0, 4));
        state.on_toggle_pause();
        assert_eq!(state.phase(), Phase::Playing);
        assert!(state.on_move_left());
    }

    #[test]
    fn test_soft_drop_release_while_paused_clears_hold() {
        let mut state = scripted(&[ShapeKind::O]);
        let now = Instant::now();
        state.on_soft_drop_start(now);
        state.on_toggle_pause();
        assert_eq!(state.on_soft_drop_end(now), None);
        state.on_toggle_pause();
        assert_eq!(state.tick_interval(), Duration::from_millis(450));
        assert_eq!(state.player().unwrap().pos.row, 0);
    }

    #[test]
    fn test_blocked_spawn_is_game_over() {
        // Stack up to row 2 with column 0 open so no row is full; the O can
        // only lock in rows 0-1, right where the next one spawns.
        let mut grid = Grid::new();
        for row in 2..HEIGHT {
            for col in 1..WIDTH {
                grid = grid.with_cell(row, col, Cell::Filled(PieceColor::White));
            }
        }
        let mut state =
            GameState::with_board(PieceGenerator::scripted([ShapeKind::O, ShapeKind::O]), grid);
        let last = state.player().unwrap().clone();
        let outcome = state.on_hard_drop().unwrap();
        assert!(outcome.game_over);
        assert!(state.is_game_over());
        assert!(state.snapshot().game_over);
        assert_eq!(state.player().unwrap().shape, last.shape);
        assert!(!state.is_ticking());
        assert_eq!(state.tick(), None);
        assert!(!state.on_move_right());
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut state = scripted(&[ShapeKind::O]);
        for _ in 0..40 {
            if state.is_game_over() {
                break;
            }
            state.on_hard_drop();
        }
        assert!(state.is_game_over());
        state.on_restart();
        let session = state.session();
        assert_eq!((session.score, session.lines, session.level), (0, 0, 1));
        assert_eq!(state.phase(), Phase::Playing);
        assert_eq!(filled(state.grid()), 0);
        let player = state.player().unwrap();
        assert!(is_valid(player.pos, &player.shape, state.grid()));
        assert_eq!(player.pos.row, 0);
    }

    #[test]
    fn test_quit_returns_to_loading() {
        let mut state = scripted(&[ShapeKind::O]);
        tick_until_lock(&mut state);
        state.on_quit();
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.player().is_none());
        assert_eq!(filled(state.grid()), 0);
        assert_eq!(state.tick(), None);
    }

    #[test]
    fn test_spawned_piece_uses_queued_shape() {
        let mut state = scripted(&[ShapeKind::L, ShapeKind::Z, ShapeKind::J]);
        let queued = state.player().unwrap().next.clone().unwrap();
        state.on_hard_drop();
        let player = state.player().unwrap();
        assert_eq!(player.shape, queued);
        assert_eq!(player.next.as_ref().unwrap().kind, ShapeKind::J);
    }

    #[test]
    fn test_spawned_shapes_never_reach_above_row_zero() {
        for kind in ShapeKind::ALL {
            let mut state = scripted(&[kind]);
            let player = state.player().unwrap().clone();
            assert!(player.cells().all(|(row, _)| row >= 0), "{:?}", kind);
            assert!(is_valid(player.pos, &player.shape, state.grid()));
            for _ in 0..4 {
                state.on_rotate();
                assert!(state.player().unwrap().cells().all(|(row, _)| row >= 0));
            }
        }
    }

    #[test]
    fn test_missing_piece_tick_spawns_instead_of_failing() {
        let mut state = scripted(&[ShapeKind::O]);
        state.player = None;
        state.hint = None;
        assert!(!state.on_move_left());
        assert!(!state.on_rotate());
        assert_eq!(state.on_hard_drop(), None);
        assert_eq!(state.tick(), None);
        assert!(state.player().is_some());
        assert!(state.snapshot().hint.is_some());
    }
}
