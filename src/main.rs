//! Samegametui: SameGame-style cluster-clearing puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use samegametui::{Game, Palette};

/// Options derived from CLI that shape each deal and the presentation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cols: usize,
    pub rows: usize,
    pub palette: Palette,
    pub seed: Option<u64>,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = AppConfig {
        cols: usize::from(args.cols),
        rows: usize::from(args.rows),
        palette: Palette::first(usize::from(args.colors)),
        seed: args.seed,
        no_animation: args.no_animation,
    };

    if args.dump {
        let mut rng = make_rng(config.seed);
        let game = Game::new(config.cols, config.rows, &config.palette, &mut rng)
            .context("cannot deal board")?;
        print!("{}", game.dump());
        return Ok(());
    }

    let theme = match theme::Theme::load(args.theme.as_deref(), args.style) {
        Ok(theme) => theme,
        Err(err) => {
            log::warn!("theme not loaded, using defaults: {err}");
            theme::Theme::default_for_style(args.style)
        }
    };
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Seeded generator when a seed is given, otherwise one seeded from the OS.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// SameGame in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "samegametui",
    version,
    about = "SameGame-style puzzle in the terminal. Clear groups of two or more same-coloured tokens; the board collapses down and left.",
    long_about = "Samegametui is a terminal take on the classic SameGame.\n\n\
        Select a group of touching same-coloured tokens, then confirm to remove it. Tokens \
        above fall down and empty columns close up to the left. A group of n scores n², and \
        finishing with fewer than 50 tokens left earns a bonus. The game ends when no group \
        of two or more remains.\n\n\
        CONTROLS:\n  Arrows/hjkl Move cursor   Enter/Space Select, again to remove   x  Remove\n  \
        n / r       New game      d           Dump board to log          q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme). Set RUST_LOG=debug and \
        redirect stderr to capture logs."
)]
pub struct Args {
    /// Board width in columns.
    #[arg(long, default_value = "21", value_name = "COLS", value_parser = clap::value_parser!(u16).range(1..))]
    pub cols: u16,

    /// Board height in rows.
    #[arg(long, default_value = "14", value_name = "ROWS", value_parser = clap::value_parser!(u16).range(1..))]
    pub rows: u16,

    /// Number of token colours (1..=5).
    #[arg(short, long, default_value = "5", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub colors: u8,

    /// Seed for a reproducible deal.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour style: normal (theme), high-contrast, or colorblind.
    #[arg(long = "palette", default_value = "normal")]
    pub style: Style,

    /// Remove clusters instantly instead of fading them out.
    #[arg(long)]
    pub no_animation: bool,

    /// Deal a board, print its cluster/cell dump to stdout and exit.
    #[arg(long)]
    pub dump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Style {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
