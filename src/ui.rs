//! Layout and drawing: board, sidebar (score, tokens left, colours, keys), game over.

use crate::app::Screen;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use samegametui::{Game, Position as BoardPos, TokenColor};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each token is drawn two terminal columns wide so the board looks square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;
const SIDEBAR_HEIGHT: u16 = 27;

/// Fade-out of a removed cluster (TachyonFX).
const REMOVE_FADE_MS: u32 = 250;

/// Glyphs cycled by members of the active cluster.
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
const SPIN_FRAME_MS: u128 = 120;
const TOKEN_GLYPH: &str = "●";
const EMPTY_GLYPH: &str = "·";

/// Everything the renderer reads for one frame.
pub struct View<'a> {
    pub game: &'a Game,
    pub theme: &'a Theme,
    pub screen: Screen,
    pub cursor: BoardPos,
    /// Cells fading out before their removal is applied.
    pub removing: &'a [BoardPos],
    pub last_points: Option<u32>,
    pub status: Option<&'a str>,
    pub started: Instant,
    pub now: Instant,
}

/// Board size in terminal cells (border included) for a `cols` x `rows` deal.
fn board_pixel_size(cols: usize, rows: usize) -> (u16, u16) {
    let cols = u16::try_from(cols).unwrap_or(u16::MAX);
    let rows = u16::try_from(rows).unwrap_or(u16::MAX);
    (
        cols.saturating_mul(CELL_WIDTH).saturating_add(2),
        rows.saturating_add(2),
    )
}

/// Largest board (cols, rows) that fits beside the sidebar in a terminal of this size.
pub fn max_board_for_terminal(term_cols: u16, term_rows: u16) -> (usize, usize) {
    let cols = term_cols.saturating_sub(2 + SIDEBAR_WIDTH) / CELL_WIDTH;
    let rows = term_rows.saturating_sub(2);
    (usize::from(cols.max(1)), usize::from(rows.max(1)))
}

/// Terminal origin of the cell at `pos`, or `None` if it falls outside `inner`.
fn cell_origin(inner: Rect, rows: usize, pos: BoardPos) -> Option<(u16, u16)> {
    let row_from_top = rows.checked_sub(pos.y + 1)?;
    let x = inner
        .x
        .saturating_add(u16::try_from(pos.x).ok()?.saturating_mul(CELL_WIDTH));
    let y = inner.y.saturating_add(u16::try_from(row_from_top).ok()?);
    let fits = x.saturating_add(CELL_WIDTH) <= inner.x + inner.width && y < inner.y + inner.height;
    fits.then_some((x, y))
}

/// Board and sidebar areas, centred in `area`.
fn split_screen(area: Rect, game: &Game) -> (Rect, Rect) {
    let (cols, rows) = game.dealt_size();
    let (bw, bh) = board_pixel_size(cols, rows);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);
    let total_h = bh.max(SIDEBAR_HEIGHT);

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
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Draw one frame. While `view.removing` is non-empty the fade effect is created
/// (first frame) and advanced in `removal_effect`.
pub fn draw(
    frame: &mut Frame,
    view: &View<'_>,
    removal_effect: &mut Option<Effect>,
    removal_process_time: &mut Option<Instant>,
) {
    let area = frame.area();
    let (board_area, sidebar_area) = split_screen(area, view.game);
    let board_inner = draw_board(frame, view, board_area);
    draw_sidebar(frame, view, sidebar_area);
    if !view.removing.is_empty() {
        apply_removal_effect(
            frame,
            view,
            board_inner,
            removal_effect,
            removal_process_time,
        );
    }
    if view.screen == Screen::GameOver {
        draw_game_over(frame, view, area);
    }
}

/// Draw the board; returns the inner rect the cells live in.
fn draw_board(frame: &mut Frame, view: &View<'_>, area: Rect) -> Rect {
    let theme = view.theme;
    let game = view.game;
    let title = format!(" SameGame  {}x{} ", game.num_cols(), game.num_rows());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let (cols, rows) = game.dealt_size();
    let active = game.active_cluster();
    let spin_frame = view.now.duration_since(view.started).as_millis() / SPIN_FRAME_MS;
    let spinner = SPINNER[(spin_frame % SPINNER.len() as u128) as usize];

    let buf = frame.buffer_mut();
    for x in 0..cols {
        for y in 0..rows {
            let pos = BoardPos::new(x, y);
            let Some((rx, ry)) = cell_origin(inner, rows, pos) else {
                continue;
            };
            let mut style = Style::default().bg(theme.bg);
            let symbol = match game.board().cell(pos) {
                Some(token) => {
                    style = style.fg(theme.token_color(token.color()));
                    if active.is_some_and(|c| c.contains(pos)) {
                        style = style.bg(theme.selected_bg);
                        spinner
                    } else {
                        TOKEN_GLYPH
                    }
                }
                None if game.board().contains(x, y) => {
                    style = style.fg(theme.inactive_fg);
                    EMPTY_GLYPH
                }
                None => " ",
            };
            if pos == view.cursor && view.screen == Screen::Playing {
                style = style.bg(theme.inactive_fg);
                if symbol == EMPTY_GLYPH {
                    style = style.fg(theme.main_fg);
                }
            }
            buf[(rx, ry)].set_symbol(symbol).set_style(style);
            buf[(rx + 1, ry)].set_symbol(" ").set_style(style);
        }
    }
    inner
}

/// Buffer positions covered by the cells being removed.
fn removal_buffer_positions(inner: Rect, rows: usize, cells: &[BoardPos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        if let Some((x, y)) = cell_origin(inner, rows, pos) {
            for dx in 0..CELL_WIDTH {
                set.insert((x + dx, y));
            }
        }
    }
    set
}

/// Create or advance the fade that precedes a removal.
fn apply_removal_effect(
    frame: &mut Frame,
    view: &View<'_>,
    inner: Rect,
    removal_effect: &mut Option<Effect>,
    removal_process_time: &mut Option<Instant>,
) {
    let delta = removal_process_time
        .map(|t| view.now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *removal_process_time = Some(view.now);

    if removal_effect.is_none() {
        let (_, rows) = view.game.dealt_size();
        let fading = removal_buffer_positions(inner, rows, view.removing);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (REMOVE_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *removal_effect = Some(effect);
    }

    if let Some(effect) = removal_effect {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn sidebar_block(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(theme.title),
        ))
}

fn stat_line<'a>(theme: &Theme, label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(theme.title)),
        Span::styled(value, Style::default().fg(theme.main_fg)),
    ])
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let game = view.game;
    let state = game.state();
    let palette_rows = u16::try_from(game.palette().len()).unwrap_or(5);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),                // Score
            Constraint::Length(3),                // Tokens left
            Constraint::Length(palette_rows + 2), // Colours
            Constraint::Length(5),                // Group
            Constraint::Length(6),                // Keys
        ])
        .split(area);

    // --- Score ---
    let block = sidebar_block(theme, "Score");
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], frame.buffer_mut());
    let last = view
        .last_points
        .map_or_else(|| "-".to_string(), |p| format!("+{p}"));
    Paragraph::new(vec![
        stat_line(theme, "Total:    ", game.current_score().to_string()),
        stat_line(theme, "Clusters: ", state.cluster_score.to_string()),
        stat_line(theme, "Bonus:    ", state.bonus_score.to_string()),
        stat_line(theme, "Last:     ", last),
    ])
    .render(inner, frame.buffer_mut());

    // --- Tokens left ---
    let (cols, rows) = game.dealt_size();
    let total = cols * rows;
    let ratio = if total > 0 {
        (state.tokens_remaining as f64 / total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let block = sidebar_block(theme, "Tokens");
    let inner = block.inner(chunks[1]);
    block.render(chunks[1], frame.buffer_mut());
    let bar_color = if state.tokens_remaining < samegametui::score::BONUS_THRESHOLD {
        Color::Green
    } else {
        theme.title
    };
    Gauge::default()
        .ratio(ratio)
        .label(format!("{}/{}", state.tokens_remaining, total))
        .gauge_style(Style::default().fg(bar_color).bg(theme.bg))
        .render(inner, frame.buffer_mut());

    // --- Colours: tokens left per colour ---
    let mut counts = [0usize; TokenColor::ALL.len()];
    game.board().for_each_cell(|token| counts[token.color().index()] += 1);
    let block = sidebar_block(theme, "Colours");
    let inner = block.inner(chunks[2]);
    block.render(chunks[2], frame.buffer_mut());
    let lines: Vec<Line> = game
        .palette()
        .colors()
        .iter()
        .map(|&color| {
            Line::from(vec![
                Span::styled(
                    format!("{TOKEN_GLYPH} "),
                    Style::default().fg(theme.token_color(color)),
                ),
                Span::styled(
                    format!("{:<7}{:>4}", color.name(), counts[color.index()]),
                    Style::default().fg(theme.main_fg),
                ),
            ])
        })
        .collect();
    Paragraph::new(lines).render(inner, frame.buffer_mut());

    // --- Group under selection ---
    let block = sidebar_block(theme, "Group");
    let inner = block.inner(chunks[3]);
    block.render(chunks[3], frame.buffer_mut());
    let selected = match game.selection().and_then(|id| game.cluster_info(id)) {
        Some(info) if info.size >= 2 => format!("{} (+{})", info.size, info.size * info.size),
        Some(_) => "1 (stuck)".to_string(),
        None => "-".to_string(),
    };
    let removable = game.clusters().iter().filter(|(_, m)| m.len() >= 2).count();
    let status = view.status.unwrap_or("");
    Paragraph::new(vec![
        stat_line(theme, "Selected: ", selected),
        stat_line(theme, "Movable:  ", removable.to_string()),
        Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(theme.inactive_fg),
        )),
    ])
    .render(inner, frame.buffer_mut());

    // --- Keys ---
    let block = sidebar_block(theme, "Keys");
    let inner = block.inner(chunks[4]);
    block.render(chunks[4], frame.buffer_mut());
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(theme.token_color(TokenColor::Cyan))),
            Span::styled(what, Style::default().fg(theme.main_fg)),
        ])
    };
    Paragraph::new(vec![
        key("←↓↑→ hjkl ", "move"),
        key("Enter ", "select/remove"),
        key("x ", "remove  n new"),
        key("d ", "dump    q quit"),
    ])
    .render(inner, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let state = view.game.state();
    let popup_w = 30u16;
    let popup_h = 10u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let title = if state.tokens_remaining == 0 {
        " Board cleared! "
    } else {
        " Game Over "
    };
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", view.game.current_score()),
            fg,
        )),
        Line::from(Span::styled(
            format!(" Bonus: {} ", state.bonus_score),
            fg,
        )),
        Line::from(Span::styled(
            format!(" Left:  {} ", state.tokens_remaining),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled(" R — New game    Q — Quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Samegametui ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_board_for_terminal() {
        // 80x24: (80 - 26) / 2 = 27 columns, 22 rows.
        assert_eq!(max_board_for_terminal(80, 24), (27, 22));
        assert_eq!(max_board_for_terminal(10, 2), (1, 1));
    }

    #[test]
    fn test_cell_origin_flips_rows() {
        let inner = Rect::new(1, 1, 6, 3);
        assert_eq!(cell_origin(inner, 3, BoardPos::new(0, 0)), Some((1, 3)));
        assert_eq!(cell_origin(inner, 3, BoardPos::new(2, 2)), Some((5, 1)));
        assert_eq!(cell_origin(inner, 3, BoardPos::new(3, 0)), None);
        assert_eq!(cell_origin(inner, 3, BoardPos::new(0, 3)), None);
    }

    #[test]
    fn test_removal_positions_cover_both_columns() {
        let inner = Rect::new(0, 0, 4, 2);
        let set = removal_buffer_positions(inner, 2, &[BoardPos::new(1, 0)]);
        assert_eq!(set, HashSet::from([(2, 1), (3, 1)]));
    }
}
