//! Error types raised by the engine.
//!
//! Player actions never fail: clicks outside the board or on tiles in the
//! wrong state are no-ops. Errors only come from building a board with an
//! impossible layout and from the score file.

use minesweeper_common::Pos;
use thiserror::Error;

/// Impossible board layouts. The difficulty presets never produce these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{mines} mines do not fit on a board of {cells} cells")]
    TooManyMines { mines: usize, cells: usize },

    #[error("mine at {pos} is outside the {rows}x{columns} board")]
    MineOutOfBounds {
        pos: Pos,
        rows: usize,
        columns: usize,
    },

    #[error("mine at {0} listed twice")]
    DuplicateMine(Pos),
}

/// Failures reading or writing the score file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("score file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
