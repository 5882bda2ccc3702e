use std::{fmt, num::ParseIntError, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use crate::models::Difficulty;

/// Reasons a score record (or a line of the score file) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected 3 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("invalid number {value:?}: {source}")]
    InvalidNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("username is empty")]
    EmptyUsername,

    #[error("username {0:?} contains a comma or line break")]
    InvalidUsername(String),

    #[error("mine count {0} does not belong to any difficulty")]
    UnknownMineCount(usize),

    #[error("{tiles} tiles cleared exceeds the {max} safe tiles of the board")]
    TooManyTiles { tiles: usize, max: usize },
}

/// A completed round. Immutable once built; the score file only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    username: String,
    tiles_cleared: usize,
    mine_count: usize,
}

impl ScoreRecord {
    /// Builds a record, trimming the username. The mine count must belong to
    /// one of the difficulty presets.
    pub fn new(
        username: &str,
        tiles_cleared: usize,
        mine_count: usize,
    ) -> Result<Self, RecordError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RecordError::EmptyUsername);
        }
        if username.contains([',', '\n', '\r']) {
            return Err(RecordError::InvalidUsername(username.to_string()));
        }

        let difficulty = Difficulty::from_mine_count(mine_count)
            .ok_or(RecordError::UnknownMineCount(mine_count))?;
        if tiles_cleared > difficulty.safe_tiles() {
            return Err(RecordError::TooManyTiles {
                tiles: tiles_cleared,
                max: difficulty.safe_tiles(),
            });
        }

        Ok(Self {
            username: username.to_string(),
            tiles_cleared,
            mine_count,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn tiles_cleared(&self) -> usize {
        self.tiles_cleared
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn difficulty(&self) -> Difficulty {
        // Checked in `new`, every record maps to a preset.
        Difficulty::from_mine_count(self.mine_count).unwrap_or_default()
    }

    /// `username,tilesCleared,mineCount` without a trailing newline.
    pub fn to_line(&self) -> String {
        format!("{},{},{}", self.username, self.tiles_cleared, self.mine_count)
    }
}

fn parse_number(value: &str) -> Result<usize, RecordError> {
    value.parse().map_err(|source| RecordError::InvalidNumber {
        value: value.to_string(),
        source,
    })
}

impl FromStr for ScoreRecord {
    type Err = RecordError;

    /// Parses one line of the score file. Fields are trimmed.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [username, tiles, mines] = fields.as_slice() else {
            return Err(RecordError::FieldCount(fields.len()));
        };

        Self::new(username, parse_number(tiles)?, parse_number(mines)?)
    }
}

impl fmt::Display for ScoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}/{}",
            self.username,
            self.tiles_cleared,
            self.difficulty().safe_tiles()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_fields() {
        let record: ScoreRecord = "  alice , 17 ,12 ".parse().unwrap();
        assert_eq!(record.username(), "alice");
        assert_eq!(record.tiles_cleared(), 17);
        assert_eq!(record.mine_count(), 12);
        assert_eq!(record.difficulty(), Difficulty::Medium);
    }

    #[test]
    fn line_format_matches_score_file() {
        let record = ScoreRecord::new("bob", 30, 6).unwrap();
        assert_eq!(record.to_line(), "bob,30,6");
        assert_eq!(record.to_line().parse::<ScoreRecord>().unwrap(), record);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!("bob,12".parse::<ScoreRecord>(), Err(RecordError::FieldCount(2)));
        assert_eq!(
            "a,b,1,2".parse::<ScoreRecord>(),
            Err(RecordError::FieldCount(4))
        );
        assert!(matches!(
            "bob,notanumber,12".parse::<ScoreRecord>(),
            Err(RecordError::InvalidNumber { .. })
        ));
        assert!(matches!(
            "bob,-3,12".parse::<ScoreRecord>(),
            Err(RecordError::InvalidNumber { .. })
        ));
        assert_eq!(
            " ,3,12".parse::<ScoreRecord>(),
            Err(RecordError::EmptyUsername)
        );
        assert_eq!(
            "bob,3,7".parse::<ScoreRecord>(),
            Err(RecordError::UnknownMineCount(7))
        );
        assert_eq!(
            "bob,31,6".parse::<ScoreRecord>(),
            Err(RecordError::TooManyTiles { tiles: 31, max: 30 })
        );
    }

    #[test]
    fn username_cannot_break_the_line_format() {
        assert!(matches!(
            ScoreRecord::new("a,b", 1, 6),
            Err(RecordError::InvalidUsername(_))
        ));
        assert!(matches!(
            ScoreRecord::new("a\nb", 1, 6),
            Err(RecordError::InvalidUsername(_))
        ));
    }

    #[test]
    fn displays_against_safe_tile_total() {
        let record = ScoreRecord::new("carol", 100, 24).unwrap();
        assert_eq!(record.to_string(), "carol, 100/120");
    }
}
