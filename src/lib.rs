//! SameGame rule engine: a shrinking board of coloured tokens, cluster
//! discovery, removal with gravity and column collapse, scoring and end-of-game
//! detection.
//!
//! ```
//! use samegametui::{Game, TokenColor};
//!
//! // (0,0), (1,0), (0,1) red; (1,1) cyan.
//! let mut game = Game::from_fn(2, 2, |x, y| {
//!     if (x, y) == (1, 1) { TokenColor::Cyan } else { TokenColor::Red }
//! })?;
//! game.select_at(0, 0)?;
//! game.remove_selected();
//! assert_eq!(game.current_score(), 9 + 4900);
//! assert!(game.is_game_over());
//! # Ok::<(), samegametui::BoardError>(())
//! ```

pub mod cluster;
pub mod error;
pub mod game;
pub mod matrix;
pub mod score;
pub mod token;

pub use cluster::{ClusterId, ClusterRegistry, find_clusters};
pub use error::BoardError;
pub use game::{ClusterInfo, Dump, Game, GameState, Phase, Removal};
pub use matrix::{Matrix, Position};
pub use score::{ScoreDelta, score_removal};
pub use token::{Palette, Token, TokenColor, TokenId};
