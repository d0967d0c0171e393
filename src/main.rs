//! Brutris: a high-contrast falling-block puzzle in the terminal.

mod app;
mod game;
mod grid;
mod input;
mod piece;
mod placement;
mod scoring;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use log::warn;
use std::fs::File;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    let theme = match theme::Theme::load(args.theme.as_deref()) {
        Ok(theme) => theme,
        Err(err) => {
            warn!("theme {:?} not loaded ({}); using default", args.theme, err);
            theme::Theme::default()
        }
    };
    let mut app = App::new(args, theme);
    app.run()?;
    Ok(())
}

/// Logs go to a file: the terminal belongs to the game while it runs.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// Falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "brutris",
    version,
    about = "TETRIS: HYPER BRUTAL EDITION. Falling blocks on a 10x18 board, high-contrast colours.",
    long_about = "Brutris is a terminal falling-block puzzle.\n\n\
        Steer the falling piece, fill horizontal rows to clear them. Clearing several rows \
        at once and playing at higher levels scores more; gravity speeds up with each level.\n\n\
        CONTROLS:\n  Left/Right h/l  Move      Up k x       Rotate     Down j   Soft drop (hold)\n  \
        Space/Enter     Hard drop  P            Pause      R        Restart   Q / Esc  Quit\n\n\
        MOUSE:\n  Click the board to rotate, drag sideways to move, drag down to drop, \
        flick down to slam.\n\n\
        Use --theme to load a btop-style theme file. Set RUST_LOG=debug for detailed logs."
)]
pub struct Args {
    /// Seed for the piece generator (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\").
    /// Keys: main_bg, main_fg, div_line, title, hint_fg.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Skip the start screen and begin playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Log file (filter with RUST_LOG, default info).
    #[arg(long, default_value = "brutris.log", value_name = "FILE")]
    pub log_file: PathBuf,
}
