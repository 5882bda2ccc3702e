//! Minesweeper game engine.
//!
//! [`GameSession`] is the entry point for a front end: it builds a
//! [`Minefield`] per round, runs the round [`Clock`], and keeps the
//! leaderboard in sync with the score file through a background
//! [`ScoreKeeper`]. The front end forwards clicks to the session and redraws
//! the returned [`TileUpdate`]s.
//!
//! ```rust,no_run
//! use minesweeper::{Difficulty, GameSession, Pos, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = GameSession::new(SessionConfig::from_env());
//!     session.new_round(Difficulty::Easy);
//!
//!     let turn = session.on_reveal(Pos::new(0, 0));
//!     if turn.ended.is_some() {
//!         session.record_score("ann");
//!     }
//!
//!     for row in session.leaderboard(Difficulty::Easy) {
//!         println!("{row}");
//!     }
//!     session.terminate().await;
//! }
//! ```

pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod leaderboard;
mod logic;
pub mod session;
pub mod store;

pub use clock::Clock;
pub use config::SessionConfig;
pub use data::{Minefield, TileUpdate};
pub use error::{FieldError, StoreError};
pub use leaderboard::{LeaderboardRow, LeaderboardTree};
pub use session::{GameSession, RoundEnd, SessionState, Turn};
pub use store::{ScoreKeeper, ScoreStore};

pub use minesweeper_common::{
    Cell, Difficulty, FieldState, Pos, RecordError, ScoreRecord, UnknownDifficulty,
};
