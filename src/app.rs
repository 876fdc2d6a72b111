//! App: terminal init, main loop, cursor and key handling.

use crate::AppConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use rand::rngs::StdRng;
use samegametui::{Game, Position};
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Frame budget for the draw/poll loop (~60 FPS).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: AppConfig,
    theme: Theme,
    rng: StdRng,
    game: Game,
    screen: Screen,
    cursor: Position,
    game_start: Instant,
    last_points: Option<u32>,
    status: Option<String>,
    /// Cells of the cluster fading out; the removal is applied when the fade ends.
    removing: Vec<Position>,
    /// TachyonFX fade for the removal (created on its first frame).
    removal_effect: Option<Effect>,
    /// Last time the removal effect was processed (for delta).
    removal_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: AppConfig, theme: Theme) -> Result<Self> {
        let mut rng = crate::make_rng(config.seed);
        let game = Game::new(config.cols, config.rows, &config.palette, &mut rng)?;
        let screen = screen_for(&game);
        Ok(Self {
            config,
            theme,
            rng,
            game,
            screen,
            cursor: Position::new(0, 0),
            game_start: Instant::now(),
            last_points: None,
            status: None,
            removing: Vec::new(),
            removal_effect: None,
            removal_effect_process_time: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Shrink the board to fit the terminal; --cols/--rows are kept when they fit.
        let (term_cols, term_rows) = size()?;
        let (fit_cols, fit_rows) = ui::max_board_for_terminal(term_cols, term_rows);
        let cols = self.config.cols.min(fit_cols);
        let rows = self.config.rows.min(fit_rows);
        if (cols, rows) != self.game.dealt_size() {
            log::warn!(
                "board {}x{} does not fit the terminal, dealing {cols}x{rows}",
                self.config.cols,
                self.config.rows
            );
            self.config.cols = cols;
            self.config.rows = rows;
            self.new_game();
        }

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                let view = View {
                    game: &self.game,
                    theme: &self.theme,
                    screen: self.screen,
                    cursor: self.cursor,
                    removing: &self.removing,
                    last_points: self.last_points,
                    status: self.status.as_deref(),
                    started: self.game_start,
                    now,
                };
                ui::draw(
                    f,
                    &view,
                    &mut self.removal_effect,
                    &mut self.removal_effect_process_time,
                );
            })?;

            if !self.removing.is_empty() && self.removal_effect.as_ref().is_some_and(|e| e.done())
            {
                self.finish_removal();
            }

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.apply_action(key_to_action(key)) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Handle one action; returns true when the app should exit.
    fn apply_action(&mut self, action: Action) -> bool {
        if action == Action::Quit {
            return true;
        }
        // The board is frozen while a removal fades out.
        if !self.removing.is_empty() {
            return false;
        }
        match (self.screen, action) {
            (_, Action::NewGame) | (Screen::GameOver, Action::Confirm) => self.new_game(),
            (_, Action::Dump) => {
                log::info!("board dump\n{}", self.game.dump());
                self.status = Some("dump written to log".to_string());
            }
            (Screen::GameOver, _) => {}
            (Screen::Playing, Action::Up) => self.move_cursor(0, 1),
            (Screen::Playing, Action::Down) => self.move_cursor(0, -1),
            (Screen::Playing, Action::Left) => self.move_cursor(-1, 0),
            (Screen::Playing, Action::Right) => self.move_cursor(1, 0),
            (Screen::Playing, Action::Confirm) => self.confirm(),
            (Screen::Playing, Action::Remove) => self.begin_removal(),
            (Screen::Playing, Action::Quit | Action::None) => {}
        }
        false
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let (cols, rows) = (self.game.num_cols(), self.game.num_rows());
        if cols == 0 || rows == 0 {
            return;
        }
        let x = self.cursor.x.saturating_add_signed(dx).min(cols - 1);
        let y = self.cursor.y.saturating_add_signed(dy).min(rows - 1);
        self.cursor = Position::new(x, y);
    }

    /// Keep the cursor on the board after it shrank.
    fn clamp_cursor(&mut self) {
        let x = self.cursor.x.min(self.game.num_cols().saturating_sub(1));
        let y = self.cursor.y.min(self.game.num_rows().saturating_sub(1));
        self.cursor = Position::new(x, y);
    }

    /// Select the cluster under the cursor, or start removing it when it is
    /// already the active selection.
    fn confirm(&mut self) {
        let Position { x, y } = self.cursor;
        let already_active = match self.game.cluster_info_at(x, y) {
            Ok(info) => info.is_some_and(|c| {
                c.size >= 2 && self.game.selection() == Some(c.id)
            }),
            Err(err) => {
                log::debug!("confirm ignored: {err}");
                return;
            }
        };
        if already_active {
            self.begin_removal();
        } else if let Err(err) = self.game.select_at(x, y) {
            log::debug!("select ignored: {err}");
        }
    }

    fn begin_removal(&mut self) {
        let Some(members) = self.game.active_cluster().map(|c| c.members.to_vec()) else {
            return;
        };
        if self.config.no_animation {
            self.finish_removal();
            return;
        }
        self.removing = members;
        self.removal_effect = None;
        self.removal_effect_process_time = None;
    }

    fn finish_removal(&mut self) {
        self.removing.clear();
        self.removal_effect = None;
        self.removal_effect_process_time = None;
        if let Some(removal) = self.game.remove_selected() {
            self.last_points = Some(removal.score.cluster_points);
            if removal.game_over {
                self.screen = Screen::GameOver;
            }
        }
        self.clamp_cursor();
    }

    fn new_game(&mut self) {
        self.removing.clear();
        self.removal_effect = None;
        self.removal_effect_process_time = None;
        if let Err(err) = self.game.start_game(
            self.config.cols,
            self.config.rows,
            &self.config.palette,
            &mut self.rng,
        ) {
            log::error!("cannot deal a new board: {err}");
            self.status = Some(err.to_string());
            return;
        }
        self.screen = screen_for(&self.game);
        self.cursor = Position::new(0, 0);
        self.game_start = Instant::now();
        self.last_points = None;
        self.status = None;
    }
}

/// A deal with no removable cluster starts out finished.
fn screen_for(game: &Game) -> Screen {
    if game.is_game_over() {
        Screen::GameOver
    } else {
        Screen::Playing
    }
}
