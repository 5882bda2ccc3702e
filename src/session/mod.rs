use minesweeper_common::{Difficulty, FieldState, Pos, ScoreRecord};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::Clock,
    config::SessionConfig,
    data::{Minefield, TileUpdate},
    leaderboard::LeaderboardRow,
    store::{ScoreKeeper, ScoreStore, SharedLeaderboard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Playing,
    Won,
    Lost,
    Terminated,
}

/// Handed back when a round finishes. The caller should ask for a username
/// and then offer a new round or quitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundEnd {
    pub outcome: FieldState,
    pub tiles_cleared: usize,
    pub elapsed_seconds: u64,
}

/// Result of a reveal: the tiles to redraw and, if the round just finished,
/// how it ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    pub updates: Vec<TileUpdate>,
    pub ended: Option<RoundEnd>,
}

pub struct GameSession {
    state: SessionState,
    difficulty: Difficulty,
    field: Option<Minefield>,
    clock: Clock,
    scores: Option<ScoreKeeper>,
    leaderboard: SharedLeaderboard,
    score_recorded: bool,
}

impl GameSession {
    /// Creates an idle session and starts loading the leaderboard in the
    /// background. Must be called from within a tokio runtime.
    pub fn new(config: SessionConfig) -> Self {
        info!(
            "Creating session on {} with scores in {}",
            config.difficulty,
            config.score_file.display()
        );

        let scores = ScoreKeeper::spawn(ScoreStore::open(config.score_file));
        scores.reload();
        let leaderboard = scores.leaderboard();

        Self {
            state: SessionState::Idle,
            difficulty: config.difficulty,
            field: None,
            clock: Clock::new(),
            scores: Some(scores),
            leaderboard,
            score_recorded: false,
        }
    }

    pub fn new_round(&mut self, difficulty: Difficulty) {
        self.new_round_with_rng(difficulty, &mut rand::rng());
    }

    /// Starts a round with mines placed from `rng`.
    #[instrument(level = "trace", skip(self, rng))]
    pub fn new_round_with_rng<R: Rng + ?Sized>(&mut self, difficulty: Difficulty, rng: &mut R) {
        if self.state == SessionState::Terminated {
            warn!("Ignoring new round on a terminated session");
            return;
        }

        info!(
            "Starting {} round: {}x{} with {} mines",
            difficulty,
            difficulty.rows(),
            difficulty.columns(),
            difficulty.mine_count()
        );

        self.field = Some(Minefield::for_difficulty(difficulty, rng));
        self.difficulty = difficulty;
        self.score_recorded = false;
        self.clock.reset();
        self.clock.start();
        self.state = SessionState::Playing;

        if let Some(scores) = &self.scores {
            scores.reload();
        }
    }

    /// Abandons the current round without recording a score and starts a new
    /// one on `difficulty`.
    pub fn change_difficulty(&mut self, difficulty: Difficulty) {
        if self.state == SessionState::Playing {
            debug!("Abandoning {} round", self.difficulty);
            self.clock.stop();
        }
        self.new_round(difficulty);
    }

    fn finish_if_over(&mut self) -> Option<RoundEnd> {
        let field = self.field.as_ref()?;
        let outcome = field.state();

        self.state = match outcome {
            FieldState::Ongoing => return None,
            FieldState::Won => SessionState::Won,
            FieldState::Lost => SessionState::Lost,
        };
        self.clock.stop();

        let end = RoundEnd {
            outcome,
            tiles_cleared: field.tiles_cleared(),
            elapsed_seconds: self.clock.elapsed_seconds(),
        };
        info!(
            "Round over ({:?}): {} tiles cleared in {}s",
            end.outcome, end.tiles_cleared, end.elapsed_seconds
        );
        Some(end)
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn on_reveal(&mut self, pos: Pos) -> Turn {
        if self.state != SessionState::Playing {
            debug!("Ignoring reveal while {:?}", self.state);
            return Turn::default();
        }
        let Some(field) = self.field.as_mut() else {
            return Turn::default();
        };

        let updates = field.reveal(pos);
        let ended = self.finish_if_over();
        Turn { updates, ended }
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn on_toggle_flag(&mut self, pos: Pos) -> Option<TileUpdate> {
        if self.state != SessionState::Playing {
            debug!("Ignoring flag while {:?}", self.state);
            return None;
        }
        self.field.as_mut()?.toggle_flag(pos)
    }

    /// Saves the finished round under `username`. Blank names are skipped,
    /// as is a second score for the same round. Returns whether a record was
    /// queued for saving.
    #[instrument(level = "trace", skip(self))]
    pub fn record_score(&mut self, username: &str) -> bool {
        if !matches!(self.state, SessionState::Won | SessionState::Lost) {
            debug!("No finished round to record");
            return false;
        }
        if self.score_recorded {
            debug!("Score for this round already recorded");
            return false;
        }
        if username.trim().is_empty() {
            debug!("No username given, score not recorded");
            return false;
        }

        let tiles_cleared = self.field.as_ref().map_or(0, Minefield::tiles_cleared);
        let record = match ScoreRecord::new(username, tiles_cleared, self.difficulty.mine_count()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Not recording score: {}", e);
                return false;
            }
        };

        let Some(scores) = &self.scores else {
            return false;
        };
        info!("Recording score {}", record);
        scores.record(record);
        self.score_recorded = true;
        true
    }

    /// Ends the session. Queued score writes finish before this returns.
    pub async fn terminate(&mut self) {
        info!("Terminating session");
        self.clock.stop();
        self.state = SessionState::Terminated;
        if let Some(scores) = self.scores.take() {
            scores.shutdown().await;
        }
    }

    /// Waits for pending leaderboard loads and score writes.
    pub async fn flush_scores(&self) {
        if let Some(scores) = &self.scores {
            scores.flush().await;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn field(&self) -> Option<&Minefield> {
        self.field.as_ref()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.elapsed_seconds()
    }

    pub fn remaining_mines(&self) -> usize {
        self.field
            .as_ref()
            .map_or(self.difficulty.mine_count(), Minefield::remaining_mines)
    }

    pub fn leaderboard(&self, difficulty: Difficulty) -> Vec<LeaderboardRow> {
        self.leaderboard
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .rows(difficulty)
    }
}
