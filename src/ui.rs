//! Layout and drawing: start page, header, playfield with hint, next preview,
//! pause and game over overlays, line-clear flash.

use crate::game::{Phase, Snapshot};
use crate::grid::{Cell, HEIGHT, WIDTH};
use crate::input::DragTracker;
use crate::piece::{Player, Shape};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per board cell (cells are drawn as two characters).
const CELL_WIDTH: u16 = DragTracker::CELL_COLUMNS;
const BOARD_OUTER_WIDTH: u16 = WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_OUTER_HEIGHT: u16 = HEIGHT as u16 + 2;
const HEADER_HEIGHT: u16 = 3;
const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the white flash after a line clear (TachyonFX fade back to the board).
const LINE_CLEAR_FLASH_MS: u32 = 250;

const FILLED: &str = "██";
const GHOST: &str = "[]";
const EMPTY: &str = "  ";

/// Line-clear flash state carried between frames.
#[derive(Default)]
pub struct LineClearFlash {
    effect: Option<Effect>,
    last_processed: Option<Instant>,
    active: bool,
}

impl LineClearFlash {
    /// Starts a new flash on the next frame.
    pub fn trigger(&mut self) {
        self.effect = None;
        self.last_processed = None;
        self.active = true;
    }

    /// True once the running flash has played out.
    pub fn is_done(&self) -> bool {
        self.effect.as_ref().is_some_and(|e| e.done())
    }

    pub fn reset(&mut self) {
        self.effect = None;
        self.last_processed = None;
        self.active = false;
    }
}

/// Screen regions of the game view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLayout {
    pub header: Rect,
    pub board_outer: Rect,
    /// Board interior (no border).
    pub board: Rect,
    pub sidebar: Rect,
}

/// Board + sidebar centred in `area`, header on top.
pub fn game_layout(area: Rect) -> GameLayout {
    let total_w = BOARD_OUTER_WIDTH + SIDEBAR_WIDTH;
    let total_h = HEADER_HEIGHT + BOARD_OUTER_HEIGHT;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(BOARD_OUTER_HEIGHT),
        ])
        .split(vert[1]);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_OUTER_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(rows[1]);

    let board_outer = cols[0];
    let board = Rect {
        x: board_outer.x + 1,
        y: board_outer.y + 1,
        width: board_outer.width.saturating_sub(2),
        height: board_outer.height.saturating_sub(2),
    };
    GameLayout {
        header: rows[0],
        board_outer,
        board,
        sidebar: cols[1],
    }
}

/// Terminal cell → board cell `(row, col)`, when it falls on the board.
pub fn board_cell_at(area: Rect, column: u16, row: u16) -> Option<(usize, usize)> {
    let board = game_layout(area).board;
    if column < board.x || row < board.y || column >= board.right() || row >= board.bottom() {
        return None;
    }
    let col = ((column - board.x) / CELL_WIDTH) as usize;
    let r = (row - board.y) as usize;
    (col < WIDTH && r < HEIGHT).then_some((r, col))
}

/// Draw the current phase. Runs the line-clear flash when one is active.
pub fn draw(
    frame: &mut Frame,
    view: &Snapshot<'_>,
    theme: &Theme,
    flash: &mut LineClearFlash,
    now: Instant,
) {
    let area = frame.area();
    match view.phase {
        Phase::Loading => draw_start_page(frame, theme, area),
        Phase::Playing | Phase::Paused | Phase::GameOver => {
            let layout = game_layout(area);
            draw_header(frame, view, theme, layout.header);
            draw_board(frame, view, theme, layout);
            draw_sidebar(frame, view, theme, layout.sidebar);
            if flash.active {
                apply_line_clear_flash(frame, theme, layout.board, flash, now);
            }
            if view.paused {
                draw_pause_overlay(frame, theme, layout.board_outer);
            }
            if view.game_over {
                draw_game_over(frame, view, theme, area);
            }
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn frame_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_start_page(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 36, 13);
    let bold = Modifier::BOLD;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " TETRIS ",
            Style::default().fg(theme.main_fg).add_modifier(bold),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " HYPER BRUTAL EDITION ",
            Style::default().fg(theme.bg).bg(theme.main_fg).add_modifier(bold),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " [ START ] ",
            Style::default().fg(Color::White).bg(theme.title).add_modifier(bold),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " ENTER start    Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(frame_block(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_header(frame: &mut Frame, view: &Snapshot<'_>, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let fg = Style::default().fg(theme.main_fg);
    let session = view.session;
    let line = Line::from(vec![
        Span::styled("SCORE: ", title_style),
        Span::styled(session.score.to_string(), fg),
        Span::raw("   "),
        Span::styled("LV: ", title_style),
        Span::styled(session.level.to_string(), fg),
        Span::raw("   "),
        Span::styled("LINES: ", title_style),
        Span::styled(session.lines.to_string(), fg),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(frame_block(theme).title(Span::styled(" TETRIS ", title_style)))
        .render(area, frame.buffer_mut());
}

/// Cells of the falling piece and of its hint. Empty once the game is over:
/// the last piece is already merged into the grid.
fn overlay_cells(view: &Snapshot<'_>) -> (HashSet<(i32, i32)>, HashSet<(i32, i32)>) {
    if view.game_over {
        return (HashSet::new(), HashSet::new());
    }
    let cells = |p: Option<&Player>| -> HashSet<(i32, i32)> {
        p.map(|p| p.cells().collect()).unwrap_or_default()
    };
    (cells(view.active), cells(view.hint))
}

fn draw_board(frame: &mut Frame, view: &Snapshot<'_>, theme: &Theme, layout: GameLayout) {
    frame_block(theme).render(layout.board_outer, frame.buffer_mut());

    let (active, ghost) = overlay_cells(view);
    let active_color = view.active.map(|p| theme.piece_color(p.shape.color));

    let board = layout.board;
    let buf = frame.buffer_mut();
    for (y, row) in view.grid.rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let key = (y as i32, x as i32);
            let (symbol, style) = match (active_color, cell) {
                (Some(color), _) if active.contains(&key) => {
                    (FILLED, Style::default().fg(color).bg(theme.bg))
                }
                (_, Cell::Filled(color)) => (
                    FILLED,
                    Style::default().fg(theme.piece_color(*color)).bg(theme.bg),
                ),
                _ if ghost.contains(&key) => {
                    (GHOST, Style::default().fg(theme.hint_fg).bg(theme.bg))
                }
                _ => (EMPTY, Style::default().bg(theme.bg)),
            };
            let rx = board.x + x as u16 * CELL_WIDTH;
            let ry = board.y + y as u16;
            if rx + CELL_WIDTH <= board.right() && ry < board.bottom() {
                buf.set_string(rx, ry, symbol, style);
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &Snapshot<'_>, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let fg = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + 4 rows)
            Constraint::Length(1), // gap
            Constraint::Min(0),    // Controls
        ])
        .split(area);

    let next_block = frame_block(theme).title(Span::styled(" NEXT ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    if let Some(shape) = view.next {
        draw_next_preview(frame, theme, shape, next_inner);
    }

    let controls = vec![
        Line::from(vec![Span::styled("←/→ h/l ", title_style), Span::styled("move", fg)]),
        Line::from(vec![Span::styled("↑ k x   ", title_style), Span::styled("rotate", fg)]),
        Line::from(vec![Span::styled("↓ j     ", title_style), Span::styled("drop", fg)]),
        Line::from(vec![Span::styled("space   ", title_style), Span::styled("slam", fg)]),
        Line::from(vec![Span::styled("p       ", title_style), Span::styled("pause", fg)]),
        Line::from(vec![Span::styled("r       ", title_style), Span::styled("restart", fg)]),
        Line::from(vec![Span::styled("q       ", title_style), Span::styled("quit", fg)]),
        Line::from(vec![Span::styled("mouse   ", title_style), Span::styled("tap/drag", fg)]),
    ];
    Paragraph::new(controls)
        .block(frame_block(theme).title(Span::styled(" KEYS ", title_style)))
        .render(chunks[2], frame.buffer_mut());
}

/// Next piece, trimmed to its occupied rows/columns and centred.
fn draw_next_preview(frame: &mut Frame, theme: &Theme, shape: &Shape, area: Rect) {
    let cells: Vec<(usize, usize)> = shape.occupied().collect();
    let Some(min_y) = cells.iter().map(|&(y, _)| y).min() else {
        return;
    };
    let max_y = cells.iter().map(|&(y, _)| y).max().unwrap_or(min_y);
    let min_x = cells.iter().map(|&(_, x)| x).min().unwrap_or(0);
    let max_x = cells.iter().map(|&(_, x)| x).max().unwrap_or(min_x);

    let bw = (max_x - min_x + 1) as u16 * CELL_WIDTH;
    let bh = (max_y - min_y + 1) as u16;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;
    let style = Style::default().fg(theme.piece_color(shape.color)).bg(theme.bg);

    let buf = frame.buffer_mut();
    for (y, x) in cells {
        let rx = area.x + off_x + (x - min_x) as u16 * CELL_WIDTH;
        let ry = area.y + off_y + (y - min_y) as u16;
        if rx + CELL_WIDTH <= area.right() && ry < area.bottom() {
            buf.set_string(rx, ry, FILLED, style);
        }
    }
}

/// Fade the board from white back to its contents after a line clear.
fn apply_line_clear_flash(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    flash: &mut LineClearFlash,
    now: Instant,
) {
    let delta = flash
        .last_processed
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_processed = Some(now);

    if flash.effect.is_none() {
        let effect = fx::fade_from(
            theme.main_fg,
            theme.main_fg,
            (LINE_CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_area(board);
        flash.effect = Some(effect);
    }
    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, board_outer: Rect) {
    let popup = centered(board_outer, 20, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " PAUSED ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(Span::styled(" P resume ", Style::default().fg(theme.main_fg))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(frame_block(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &Snapshot<'_>, theme: &Theme, area: Rect) {
    let popup = centered(area, 30, 12);
    let stat = |label: &str, value: u32| {
        Line::from(Span::styled(
            format!(" {}: {} ", label, value),
            Style::default()
                .fg(theme.bg)
                .bg(theme.main_fg)
                .add_modifier(Modifier::BOLD),
        ))
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        stat("SCORE", view.session.score),
        stat("LEVEL", view.session.level),
        stat("LINES", view.session.lines),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart   Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(frame_block(theme))
        .render(popup, frame.buffer_mut());
}
