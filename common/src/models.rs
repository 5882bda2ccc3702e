use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Visible state of a single tile, as handed to the presentation layer.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum Cell {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    /// A revealed mine. Only shown once the round is lost.
    #[serde(rename = "mine")]
    Mine,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldState {
    #[default]
    Ongoing,
    Won,
    Lost,
}

impl FieldState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FieldState::Ongoing)
    }
}

/// Board presets. The mine count alone identifies the preset, which is how
/// score records refer back to their board size.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub const fn rows(self) -> usize {
        match self {
            Difficulty::Easy => 6,
            Difficulty::Medium => 9,
            Difficulty::Hard => 12,
        }
    }

    /// Boards are square.
    pub const fn columns(self) -> usize {
        self.rows()
    }

    pub const fn mine_count(self) -> usize {
        match self {
            Difficulty::Easy => 6,
            Difficulty::Medium => 12,
            Difficulty::Hard => 24,
        }
    }

    /// Number of tiles that have to be cleared to win.
    pub const fn safe_tiles(self) -> usize {
        self.rows() * self.columns() - self.mine_count()
    }

    pub fn from_mine_count(mine_count: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.mine_count() == mine_count)
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty: {0}")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}
