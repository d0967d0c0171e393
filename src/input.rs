//! Key bindings (normal and vim-style) and mouse drags mapped onto game actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k' | 'x') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

/// Turns left-button mouse gestures on the board into actions: a click
/// without movement rotates, horizontal drags move one column per board
/// cell crossed, downward drags step the piece down one row per row crossed,
/// and a fast downward flick hard-drops once per press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragTracker {
    /// Last terminal position that produced an action, while the button is down.
    anchor: Option<(u16, u16)>,
    /// When the anchor last moved (or the button went down).
    anchor_at: Option<Instant>,
    moved: bool,
    /// A flick already hard-dropped during this press.
    flicked: bool,
}

impl DragTracker {
    /// Terminal columns per board cell.
    pub const CELL_COLUMNS: u16 = 2;
    /// Downward speed (rows per second) that counts as a flick.
    pub const FLICK_ROWS_PER_SEC: f64 = 40.0;
    /// A flick must cross at least this many rows in one step.
    const FLICK_MIN_ROWS: i32 = 2;

    pub fn press(&mut self, column: u16, row: u16, now: Instant) {
        self.anchor = Some((column, row));
        self.anchor_at = Some(now);
        self.moved = false;
        self.flicked = false;
    }

    /// Actions for the pointer having moved to `(column, row)` at `now`.
    pub fn drag(&mut self, column: u16, row: u16, now: Instant) -> Vec<Action> {
        let Some((ax, ay)) = self.anchor else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        let dx = i32::from(column) - i32::from(ax);
        let steps_x = dx / i32::from(Self::CELL_COLUMNS);
        let horizontal = if steps_x < 0 {
            Action::MoveLeft
        } else {
            Action::MoveRight
        };
        actions.extend(std::iter::repeat_n(horizontal, steps_x.unsigned_abs() as usize));

        let dy = i32::from(row) - i32::from(ay);
        if dy > 0 && !self.flicked {
            if self.is_flick(dy, now) {
                self.flicked = true;
                actions.push(Action::HardDrop);
            } else {
                actions.extend(std::iter::repeat_n(Action::SoftDrop, dy as usize));
            }
        }

        let new_x = if steps_x != 0 {
            (i32::from(ax) + steps_x * i32::from(Self::CELL_COLUMNS)) as u16
        } else {
            ax
        };
        let new_y = if dy != 0 { row } else { ay };
        if (new_x, new_y) != (ax, ay) {
            self.moved = true;
            self.anchor_at = Some(now);
        }
        self.anchor = Some((new_x, new_y));
        actions
    }

    fn is_flick(&self, rows: i32, now: Instant) -> bool {
        if rows < Self::FLICK_MIN_ROWS {
            return false;
        }
        let elapsed = self
            .anchor_at
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(f64::INFINITY);
        elapsed <= 0.0 || f64::from(rows) / elapsed >= Self::FLICK_ROWS_PER_SEC
    }

    /// Button released. A press with no drag in between is a tap.
    pub fn release(&mut self) -> Action {
        let tapped = self.anchor.is_some() && !self.moved;
        *self = Self::default();
        if tapped { Action::Rotate } else { Action::None }
    }
}
