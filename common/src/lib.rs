//! Types shared between the minesweeper engine and whatever presents it:
//! board coordinates, the visible tile states, difficulty presets and the
//! persisted score record.

pub mod models;
pub mod record;

pub use models::{Cell, Difficulty, FieldState, Pos, UnknownDifficulty};
pub use record::{RecordError, ScoreRecord};
