use minesweeper_common::{Cell, FieldState, Pos};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TileState {
    Hidden,
    Flagged,
    /// `adjacent` is counted once, when the tile is revealed.
    Revealed { adjacent: u8 },
}

/// Engine-side tile. Front ends only ever see the derived [`Cell`].
#[derive(Debug, Clone)]
pub(crate) struct Tile {
    pub(crate) mine: bool,
    pub(crate) state: TileState,
}

impl Tile {
    pub(crate) const fn hidden() -> Self {
        Self {
            mine: false,
            state: TileState::Hidden,
        }
    }
}

/// Board of a single round. Row-major, `tiles[row * columns + col]`.
#[derive(Debug, Clone)]
pub struct Minefield {
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) mines: Vec<Pos>,
    pub(crate) revealed: usize,
    pub(crate) state: FieldState,
}

/// A tile whose visible state changed, in the order the changes happened.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileUpdate {
    pub pos: Pos,
    pub value: Cell,
}
