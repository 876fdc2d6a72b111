//! Game controller: owns the board, applies select/remove commands, keeps score
//! and detects the end of the game.

use crate::cluster::{ClusterId, ClusterRegistry, find_clusters};
use crate::error::BoardError;
use crate::matrix::{Matrix, Position};
use crate::score::{ScoreDelta, score_removal};
use crate::token::{Palette, Token, TokenColor, TokenId};
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Playing,
    /// No cluster of two or more remains. Only a new game leaves this phase.
    GameOver,
}

/// Score and selection for the game in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    /// Sum of `size²` over every removal.
    pub cluster_score: u32,
    /// Low-token bonus from the most recent removal.
    pub bonus_score: u32,
    pub tokens_remaining: usize,
    pub selection: Option<ClusterId>,
    pub phase: Phase,
}

impl GameState {
    pub fn total_score(&self) -> u32 {
        self.cluster_score.saturating_add(self.bonus_score)
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

/// Read-only view of one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterInfo<'a> {
    pub id: ClusterId,
    pub size: usize,
    pub members: &'a [Position],
}

impl ClusterInfo<'_> {
    pub fn contains(&self, pos: Position) -> bool {
        self.members.contains(&pos)
    }
}

/// Outcome of a successful [`Game::remove_selected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub cluster: ClusterId,
    /// Where the removed tokens sat before compaction.
    pub positions: Vec<Position>,
    pub score: ScoreDelta,
    pub tokens_remaining: usize,
    pub game_over: bool,
}

/// A single play session. The only owner of board state.
#[derive(Debug, Clone)]
pub struct Game {
    board: Matrix<Token>,
    clusters: ClusterRegistry,
    state: GameState,
    palette: Palette,
    dealt_size: (usize, usize),
}

/// Fill a `cols` x `rows` board, numbering tokens in column-major order.
fn deal(
    cols: usize,
    rows: usize,
    mut color_at: impl FnMut(usize, usize) -> TokenColor,
) -> Result<Matrix<Token>, BoardError> {
    let mut serial = 0u32;
    Matrix::new(cols, rows, |x, y| {
        let id = TokenId(serial);
        serial += 1;
        Token::new(id, color_at(x, y), x, y)
    })
}

impl Game {
    /// Deal a random board from `palette` and start playing it.
    pub fn new<R: Rng + ?Sized>(
        cols: usize,
        rows: usize,
        palette: &Palette,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let board = deal(cols, rows, |_, _| palette.pick(rng))?;
        Ok(Self::with_board(board, palette.clone()))
    }

    /// Build a board with fixed colours, `color_at(x, y)` with y = 0 at the bottom.
    pub fn from_fn(
        cols: usize,
        rows: usize,
        mut color_at: impl FnMut(usize, usize) -> TokenColor,
    ) -> Result<Self, BoardError> {
        let mut used = Vec::new();
        let board = deal(cols, rows, |x, y| {
            let color = color_at(x, y);
            if !used.contains(&color) {
                used.push(color);
            }
            color
        })?;
        used.sort();
        let palette = Palette::new(used)?;
        Ok(Self::with_board(board, palette))
    }

    fn with_board(board: Matrix<Token>, palette: Palette) -> Self {
        let dealt_size = (board.num_cols(), board.num_rows());
        let mut game = Self {
            board,
            clusters: ClusterRegistry::default(),
            state: GameState::default(),
            palette,
            dealt_size,
        };
        game.reset_state();
        game
    }

    /// Replace the board with a fresh random deal. On error the current game is kept.
    pub fn start_game<R: Rng + ?Sized>(
        &mut self,
        cols: usize,
        rows: usize,
        palette: &Palette,
        rng: &mut R,
    ) -> Result<(), BoardError> {
        self.board = deal(cols, rows, |_, _| palette.pick(rng))?;
        self.palette = palette.clone();
        self.dealt_size = (cols, rows);
        self.reset_state();
        Ok(())
    }

    /// New deal with the size and palette of the current game.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), BoardError> {
        let (cols, rows) = self.dealt_size;
        let palette = self.palette.clone();
        self.start_game(cols, rows, &palette, rng)
    }

    fn reset_state(&mut self) {
        self.state = GameState {
            tokens_remaining: self.board.occupied_count(),
            ..GameState::default()
        };
        self.clusters = find_clusters(&mut self.board);
        log::info!(
            "new game: {}x{} board, {} colours, {} clusters",
            self.board.num_cols(),
            self.board.num_rows(),
            self.palette.len(),
            self.clusters.len()
        );
        self.check_game_over();
    }

    /// Enter `GameOver` once every occupied cell sits in a cluster smaller than two.
    fn check_game_over(&mut self) {
        let clusters = &self.clusters;
        let stuck = self.board.all_satisfy(|cell| {
            cell.is_none_or(|token| token.cluster().is_none_or(|id| clusters.size(id) < 2))
        });
        if stuck && self.state.phase == Phase::Playing {
            self.state.phase = Phase::GameOver;
            log::info!(
                "game over: score {} ({} left on board)",
                self.state.total_score(),
                self.state.tokens_remaining
            );
        }
    }

    pub fn board(&self) -> &Matrix<Token> {
        &self.board
    }

    pub fn clusters(&self) -> &ClusterRegistry {
        &self.clusters
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Board size at deal time; the live board may since have shrunk.
    pub fn dealt_size(&self) -> (usize, usize) {
        self.dealt_size
    }

    pub fn num_cols(&self) -> usize {
        self.board.num_cols()
    }

    pub fn num_rows(&self) -> usize {
        self.board.num_rows()
    }

    pub fn token_at(&self, x: usize, y: usize) -> Result<Option<&Token>, BoardError> {
        self.board.get(x, y)
    }

    pub fn cluster_info(&self, id: ClusterId) -> Option<ClusterInfo<'_>> {
        let members = self.clusters.members(id)?;
        Some(ClusterInfo {
            id,
            size: members.len(),
            members,
        })
    }

    /// Cluster of the token at `(x, y)`; `None` for an empty cell.
    pub fn cluster_info_at(&self, x: usize, y: usize) -> Result<Option<ClusterInfo<'_>>, BoardError> {
        Ok(self
            .board
            .get(x, y)?
            .and_then(Token::cluster)
            .and_then(|id| self.cluster_info(id)))
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn has_removable_cluster(&self) -> bool {
        self.clusters.has_removable()
    }

    pub fn selection(&self) -> Option<ClusterId> {
        self.state.selection
    }

    /// The selected cluster, only when it is large enough to remove.
    pub fn active_cluster(&self) -> Option<ClusterInfo<'_>> {
        self.state
            .selection
            .and_then(|id| self.cluster_info(id))
            .filter(|info| info.size >= 2)
    }

    pub fn current_score(&self) -> u32 {
        self.state.total_score()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    /// Select the cluster under `(x, y)`. Empty cells and a finished game leave
    /// the selection as it is. Singletons can be selected but never become active.
    pub fn select_at(&mut self, x: usize, y: usize) -> Result<(), BoardError> {
        let Some(id) = self.board.get(x, y)?.and_then(Token::cluster) else {
            return Ok(());
        };
        if self.is_game_over() {
            return Ok(());
        }
        self.state.selection = Some(id);
        log::trace!(
            "selected cluster {} ({} tokens) at ({}, {})",
            id,
            self.clusters.size(id),
            x,
            y
        );
        Ok(())
    }

    /// Remove the selected cluster, collapse the board and rescore.
    ///
    /// Nothing happens (and `None` is returned) when there is no selection, the
    /// selection is a singleton, or the game is over. Callers are expected to
    /// prevent those calls; they are tolerated rather than reported.
    pub fn remove_selected(&mut self) -> Option<Removal> {
        if self.is_game_over() {
            return None;
        }
        let id = self.state.selection?;
        let positions = self.clusters.members(id)?.to_vec();
        if positions.len() < 2 {
            return None;
        }

        for &pos in &positions {
            self.board.remove(pos);
        }
        let size = positions.len();
        self.state.tokens_remaining = self.state.tokens_remaining.saturating_sub(size);
        let score = score_removal(size, self.state.tokens_remaining);
        self.state.cluster_score = self.state.cluster_score.saturating_add(score.cluster_points);
        self.state.bonus_score = score.bonus;

        self.board.compact_down_and_left();
        for (pos, token) in self.board.iter_mut() {
            token.relocate(pos.x, pos.y);
        }

        self.state.selection = None;
        self.clusters = find_clusters(&mut self.board);
        self.check_game_over();

        log::info!(
            "removed cluster {} ({} tokens, +{} points, bonus {}); {} tokens left",
            id,
            size,
            score.cluster_points,
            score.bonus,
            self.state.tokens_remaining
        );
        Some(Removal {
            cluster: id,
            positions,
            score,
            tokens_remaining: self.state.tokens_remaining,
            game_over: self.is_game_over(),
        })
    }

    /// Diagnostic listing of clusters and cells. See [`Dump`].
    pub fn dump(&self) -> Dump<'_> {
        Dump { game: self }
    }
}

/// Text dump of a game:
///
/// ```text
/// clusters <count>
/// cluster <id> size <n>: (x,y) (x,y) ...
/// cells <cols>x<rows>
/// <x> <y> <colour> <cluster id>
/// <x> <y> -
/// ```
///
/// Clusters in id order, cells column-major; empty cells print a single `-`.
#[derive(Debug, Clone, Copy)]
pub struct Dump<'a> {
    game: &'a Game,
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Game {
            board, clusters, ..
        } = self.game;
        writeln!(f, "clusters {}", clusters.len())?;
        for (id, members) in clusters.iter() {
            write!(f, "cluster {} size {}:", id, members.len())?;
            for pos in members {
                write!(f, " {}", pos)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "cells {}x{}", board.num_cols(), board.num_rows())?;
        for x in 0..board.num_cols() {
            for y in 0..board.num_rows() {
                match board.cell(Position::new(x, y)) {
                    Some(token) => match token.cluster() {
                        Some(id) => writeln!(f, "{} {} {} {}", x, y, token.color(), id)?,
                        None => writeln!(f, "{} {} {} ?", x, y, token.color())?,
                    },
                    None => writeln!(f, "{} {} -", x, y)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const RED: TokenColor = TokenColor::Red;
    const BLUE: TokenColor = TokenColor::Cyan;

    /// (0,0)=R (1,0)=R (0,1)=R (1,1)=B
    fn scenario_a() -> Game {
        Game::from_fn(2, 2, |x, y| if (x, y) == (1, 1) { BLUE } else { RED }).unwrap()
    }

    #[test]
    fn test_scenario_a() {
        let mut game = scenario_a();
        assert_eq!(game.cluster_count(), 2);
        let red = game.cluster_info_at(0, 0).unwrap().unwrap();
        assert_eq!(red.size, 3);
        for (x, y) in [(0, 0), (1, 0), (0, 1)] {
            assert!(red.contains(Position::new(x, y)));
        }
        assert_eq!(game.cluster_info_at(1, 1).unwrap().unwrap().size, 1);
        assert!(!game.is_game_over());

        game.select_at(1, 0).unwrap();
        let removal = game.remove_selected().unwrap();
        assert_eq!(removal.positions.len(), 3);
        assert_eq!(game.state().tokens_remaining, 1);
        assert_eq!(game.state().cluster_score, 9);
        assert_eq!(game.state().bonus_score, 4900);
        assert_eq!(game.current_score(), 4909);
        assert_eq!((game.num_cols(), game.num_rows()), (1, 1));
        let last = game.token_at(0, 0).unwrap().unwrap();
        assert_eq!(last.color(), BLUE);
        assert_eq!((last.x(), last.y()), (0, 0));
        assert!(game.is_game_over());
        assert!(removal.game_over);
    }

    #[test]
    fn test_scenario_b_uniform_board() {
        let mut game = Game::from_fn(4, 4, |_, _| RED).unwrap();
        assert_eq!(game.cluster_count(), 1);
        assert_eq!(game.cluster_info_at(2, 3).unwrap().unwrap().size, 16);
        game.select_at(0, 0).unwrap();
        game.remove_selected().unwrap();
        assert_eq!(game.num_cols(), 0);
        assert_eq!(game.state().tokens_remaining, 0);
        assert_eq!(game.state().cluster_score, 256);
        assert_eq!(game.state().bonus_score, 5000);
        assert!(game.is_game_over());
        assert_eq!(
            game.token_at(0, 0).unwrap_err(),
            BoardError::IndexOutOfBounds {
                x: 0,
                y: 0,
                cols: 0,
                rows: 0
            }
        );
    }

    #[test]
    fn test_scenario_c_single_cell() {
        let mut game = Game::from_fn(1, 1, |_, _| RED).unwrap();
        assert!(game.is_game_over());
        game.select_at(0, 0).unwrap();
        assert_eq!(game.remove_selected(), None);
        assert_eq!(game.state().tokens_remaining, 1);
        assert_eq!(game.current_score(), 0);
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut rng = StdRng::seed_from_u64(1);
        let palette = Palette::default();
        assert_eq!(
            Game::new(0, 5, &palette, &mut rng).unwrap_err(),
            BoardError::InvalidDimension { cols: 0, rows: 5 }
        );

        let mut game = scenario_a();
        game.select_at(0, 0).unwrap();
        assert!(game.start_game(3, 0, &palette, &mut rng).is_err());
        // Failed restart leaves the running game alone.
        assert_eq!(game.num_cols(), 2);
        assert_eq!(game.selection(), Some(ClusterId(0)));
    }

    #[test]
    fn test_out_of_bounds_is_reported_without_change() {
        let mut game = scenario_a();
        game.select_at(0, 0).unwrap();
        assert!(game.select_at(2, 0).is_err());
        assert!(game.select_at(0, 2).is_err());
        assert!(game.cluster_info_at(5, 5).is_err());
        assert_eq!(game.selection(), Some(ClusterId(0)));
    }

    #[test]
    fn test_remove_without_removable_selection_is_noop() {
        let mut game = scenario_a();
        assert_eq!(game.remove_selected(), None);
        game.select_at(1, 1).unwrap();
        assert_eq!(game.selection(), game.cluster_info_at(1, 1).unwrap().map(|c| c.id));
        assert!(game.active_cluster().is_none());
        assert_eq!(game.remove_selected(), None);
        assert_eq!(game.state().tokens_remaining, 4);
        assert_eq!(game.num_cols(), 2);
    }

    #[test]
    fn test_selecting_empty_cell_keeps_selection() {
        // Column 0: R R G, column 1: B B G. Removing the blue pair leaves holes on top.
        let mut game = Game::from_fn(2, 3, |x, y| match (x, y) {
            (_, 2) => TokenColor::Green,
            (0, _) => RED,
            _ => BLUE,
        })
        .unwrap();
        game.select_at(1, 0).unwrap();
        game.remove_selected().unwrap();
        // Column 1 keeps its height: G at the bottom, two empty cells above.
        assert_eq!((game.num_cols(), game.num_rows()), (2, 3));
        game.select_at(0, 0).unwrap();
        let selected = game.selection();
        game.select_at(1, 2).unwrap();
        assert_eq!(game.token_at(1, 2).unwrap(), None);
        assert_eq!(game.selection(), selected);
        assert!(game.active_cluster().is_some());
    }

    #[test]
    fn test_compaction_relocates_tokens() {
        // Columns (bottom-up): [R, R, B], [B, G, G]
        let layout = [[RED, RED, BLUE], [BLUE, TokenColor::Green, TokenColor::Green]];
        let mut game = Game::from_fn(2, 3, |x, y| layout[x][y]).unwrap();
        let falling = game.token_at(0, 2).unwrap().unwrap().id();
        game.select_at(1, 0).unwrap();
        assert!(game.active_cluster().is_none());
        game.select_at(0, 1).unwrap();
        game.remove_selected().unwrap();

        assert_eq!(game.token_at(0, 1).unwrap(), None);
        let landed = game.token_at(0, 0).unwrap().unwrap();
        assert_eq!(landed.id(), falling);
        assert_eq!((landed.x(), landed.y()), (0, 0));
        for (pos, token) in game.board().iter() {
            assert_eq!((token.x(), token.y()), (pos.x, pos.y));
        }
        // The fallen blue token now touches the blue one at (1,0).
        assert_eq!(game.cluster_info_at(0, 0).unwrap().unwrap().size, 2);
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_bonus_is_replaced_not_accumulated() {
        // 60 tokens: two colour bands so two removals cross below 50.
        let mut game = Game::from_fn(6, 10, |x, _| if x < 3 { RED } else { BLUE }).unwrap();
        game.select_at(0, 0).unwrap();
        game.remove_selected().unwrap();
        assert_eq!(game.state().tokens_remaining, 30);
        assert_eq!(game.state().bonus_score, 2000);
        game.select_at(0, 0).unwrap();
        game.remove_selected().unwrap();
        assert_eq!(game.state().tokens_remaining, 0);
        assert_eq!(game.state().bonus_score, 5000);
        assert_eq!(game.state().cluster_score, 900 + 900);
        assert_eq!(game.current_score(), 6800);
    }

    #[test]
    fn test_game_over_blocks_commands_until_restart() {
        let mut game = scenario_a();
        game.select_at(0, 0).unwrap();
        game.remove_selected();
        assert!(game.is_game_over());
        game.select_at(0, 0).unwrap();
        assert_eq!(game.selection(), None);

        let mut rng = StdRng::seed_from_u64(3);
        game.restart(&mut rng).unwrap();
        assert_eq!(game.dealt_size(), (2, 2));
        assert_eq!(game.state().tokens_remaining, 4);
        assert_eq!(game.current_score(), 0);
        assert_eq!(game.is_game_over(), !game.has_removable_cluster());
    }

    #[test]
    fn test_dump_layout() {
        let game = scenario_a();
        let expected = "\
clusters 2
cluster 0 size 3: (0,0) (0,1) (1,0)
cluster 1 size 1: (1,1)
cells 2x2
0 0 Red 0
0 1 Red 0
1 0 Red 0
1 1 Cyan 1
";
        assert_eq!(game.dump().to_string(), expected);
    }

    #[test]
    fn test_dump_shows_empty_cells() {
        // Columns (bottom-up): [R, R, B], [G, B, G]
        let layout = [
            [RED, RED, BLUE],
            [TokenColor::Green, BLUE, TokenColor::Green],
        ];
        let mut game = Game::from_fn(2, 3, |x, y| layout[x][y]).unwrap();
        game.select_at(0, 0).unwrap();
        game.remove_selected().unwrap();
        let expected = "\
clusters 4
cluster 0 size 1: (0,0)
cluster 1 size 1: (1,0)
cluster 2 size 1: (1,1)
cluster 3 size 1: (1,2)
cells 2x3
0 0 Cyan 0
0 1 -
0 2 -
1 0 Green 1
1 1 Cyan 2
1 2 Green 3
";
        assert_eq!(game.dump().to_string(), expected);
        assert!(game.is_game_over());
    }

    #[test]
    fn test_seeded_deal_is_reproducible() {
        let palette = Palette::first(3);
        let a = Game::new(8, 6, &palette, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Game::new(8, 6, &palette, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.dump().to_string(), b.dump().to_string());
        assert!(a.board().iter().all(|(_, t)| palette.colors().contains(&t.color())));
    }

    proptest! {
        #[test]
        fn prop_play_to_the_end(
            seed in any::<u64>(),
            cols in 1usize..8,
            rows in 1usize..8,
            colors in 1usize..5,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut game = Game::new(cols, rows, &Palette::first(colors), &mut rng).unwrap();

            while !game.is_game_over() {
                let (target, size) = game
                    .clusters()
                    .iter()
                    .find(|(_, m)| m.len() >= 2)
                    .map(|(_, m)| (m[0], m.len()))
                    .unwrap();
                let before = game.state().clone();
                let occupied = game.board().occupied_count();

                game.select_at(target.x, target.y).unwrap();
                let removal = game.remove_selected().unwrap();

                let after = game.state();
                prop_assert_eq!(removal.positions.len(), size);
                prop_assert_eq!(after.tokens_remaining, before.tokens_remaining - size);
                prop_assert_eq!(game.board().occupied_count(), occupied - size);
                prop_assert_eq!(after.cluster_score, before.cluster_score + (size * size) as u32);
                prop_assert_eq!(
                    after.bonus_score,
                    50usize.saturating_sub(after.tokens_remaining) as u32 * 100
                );
                prop_assert_eq!(after.selection, None);
                for (pos, token) in game.board().iter() {
                    prop_assert_eq!((token.x(), token.y()), (pos.x, pos.y));
                }
            }

            let clusters = game.clusters();
            prop_assert!(game.board().iter().all(|(_, t)| clusters.size(t.cluster().unwrap()) < 2));
            prop_assert!(!game.has_removable_cluster());
        }
    }
}
