use std::{env, path::PathBuf};

use minesweeper_common::Difficulty;
use tracing::warn;

pub const DEFAULT_SCORE_FILE: &str = "ScoreBoard.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub score_file: PathBuf,
    pub difficulty: Difficulty,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            score_file: PathBuf::from(DEFAULT_SCORE_FILE),
            difficulty: Difficulty::default(),
        }
    }
}

impl SessionConfig {
    /// Reads `MINESWEEPER_SCORE_FILE` and `MINESWEEPER_DIFFICULTY`, falling
    /// back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let score_file = lookup("MINESWEEPER_SCORE_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.score_file);

        let difficulty = match lookup("MINESWEEPER_DIFFICULTY") {
            None => defaults.difficulty,
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, defaults.difficulty);
                defaults.difficulty
            }),
        };

        Self {
            score_file,
            difficulty,
        }
    }
}
