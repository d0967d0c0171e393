//! App: terminal init, main loop, gravity timing, key and mouse handling.

use crate::Args;
use crate::game::{GameState, LockOutcome, Phase};
use crate::input::{Action, DragTracker, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, LineClearFlash};
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use log::{debug, info};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

pub struct App {
    args: Args,
    theme: Theme,
    game: GameState,
    last_tick: Instant,
    /// Terminal reports key releases (keyboard enhancement flags accepted).
    key_releases: bool,
    /// Hard drop fires once per physical press; re-armed on release.
    hard_drop_armed: bool,
    drag: DragTracker,
    /// TachyonFX flash shown after a line clear.
    flash: LineClearFlash,
    /// Area of the last drawn frame, for mapping mouse positions.
    area: Rect,
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Self {
        let mut game = GameState::new(args.seed);
        if args.no_menu {
            game.start();
        }
        Self {
            args,
            theme,
            game,
            last_tick: Instant::now(),
            key_releases: false,
            hard_drop_armed: true,
            drag: DragTracker::default(),
            flash: LineClearFlash::default(),
            area: Rect::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        // Release events drive soft drop and the hard-drop latch.
        self.key_releases = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_releases {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        info!(
            "terminal key release reporting: {}",
            if self.key_releases { "on" } else { "off, soft drop taps only" }
        );

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        // Restore
        if self.key_releases {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            let view = self.game.snapshot();
            let completed =
                terminal.draw(|f| ui::draw(f, &view, &self.theme, &mut self.flash, now))?;
            self.area = completed.area;

            if self.flash.is_done() {
                self.flash.reset();
            }

            let timeout = if self.game.is_ticking() {
                let until_tick = self
                    .game
                    .tick_interval()
                    .saturating_sub(self.last_tick.elapsed());
                frame_duration.min(until_tick)
            } else {
                frame_duration
            };

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let exit = match event::read()? {
                        Event::Key(key) => self.on_key(key, Instant::now()),
                        Event::Mouse(mouse) => {
                            self.on_mouse(mouse, Instant::now());
                            false
                        }
                        _ => false,
                    };
                    if exit {
                        info!("exit");
                        return Ok(());
                    }
                }
            }

            if self.game.is_ticking() {
                if self.last_tick.elapsed() >= self.game.tick_interval() {
                    self.last_tick = Instant::now();
                    let outcome = self.game.tick();
                    self.after_lock(outcome);
                }
            } else {
                // Gravity restarts its period on resume.
                self.last_tick = Instant::now();
            }
        }
    }

    /// Handles one key event. Returns true when the app should exit.
    fn on_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let action = key_to_action(key);

        if key.kind == KeyEventKind::Release {
            match action {
                Action::SoftDrop => {
                    let outcome = self.game.on_soft_drop_end(now);
                    self.after_lock(outcome);
                }
                Action::HardDrop => self.hard_drop_armed = true,
                _ => {}
            }
            return false;
        }
        let repeat = key.kind == KeyEventKind::Repeat;

        match self.game.phase() {
            Phase::Loading => match action {
                Action::Quit if !repeat => return true,
                Action::HardDrop if !repeat => {
                    self.hard_drop_armed = !self.key_releases;
                    self.start_game();
                }
                _ => {}
            },
            Phase::Playing | Phase::Paused => match action {
                Action::Pause if !repeat => self.game.on_toggle_pause(),
                Action::Quit if !repeat => self.quit_to_start(),
                Action::Restart if !repeat => self.restart(),
                Action::HardDrop => {
                    if !repeat && self.hard_drop_armed {
                        self.hard_drop_armed = !self.key_releases;
                        let outcome = self.game.on_hard_drop();
                        self.after_lock(outcome);
                    }
                }
                Action::SoftDrop => {
                    if !self.key_releases {
                        self.nudge();
                    } else if !repeat {
                        self.game.on_soft_drop_start(now);
                    }
                }
                Action::MoveLeft | Action::MoveRight | Action::Rotate => {
                    self.apply_move(action);
                }
                _ => {}
            },
            Phase::GameOver => match action {
                Action::Restart if !repeat => self.restart(),
                Action::Quit if !repeat => self.quit_to_start(),
                _ => {}
            },
        }
        false
    }

    fn on_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.game.phase() == Phase::Loading {
                    self.start_game();
                } else if ui::board_cell_at(self.area, mouse.column, mouse.row).is_some() {
                    self.drag.press(mouse.column, mouse.row, now);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                for action in self.drag.drag(mouse.column, mouse.row, now) {
                    match action {
                        Action::SoftDrop => self.nudge(),
                        Action::HardDrop => {
                            let outcome = self.game.on_hard_drop();
                            self.after_lock(outcome);
                        }
                        other => self.apply_move(other),
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let action = self.drag.release();
                self.apply_move(action);
            }
            _ => {}
        }
    }

    fn apply_move(&mut self, action: Action) {
        match action {
            Action::MoveLeft => {
                self.game.on_move_left();
            }
            Action::MoveRight => {
                self.game.on_move_right();
            }
            Action::Rotate => {
                self.game.on_rotate();
            }
            _ => {}
        }
    }

    /// One-row step down; leaves a held soft drop alone.
    fn nudge(&mut self) {
        let outcome = self.game.on_step_down();
        self.after_lock(outcome);
    }

    fn after_lock(&mut self, outcome: Option<LockOutcome>) {
        let Some(outcome) = outcome else {
            return;
        };
        if outcome.cleared > 0 && !self.args.no_animation {
            self.flash.trigger();
        }
        if outcome.game_over {
            debug!("board topped out");
            self.drag = DragTracker::default();
        }
    }

    fn start_game(&mut self) {
        self.game.start();
        self.reset_timing();
    }

    fn restart(&mut self) {
        self.game.on_restart();
        self.reset_timing();
    }

    fn quit_to_start(&mut self) {
        self.game.on_quit();
        self.reset_timing();
    }

    fn reset_timing(&mut self) {
        self.last_tick = Instant::now();
        self.flash.reset();
        self.drag = DragTracker::default();
    }
}
