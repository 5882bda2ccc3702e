use minesweeper_common::{Cell, Difficulty, FieldState, Pos};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::{
    data::{Minefield, Tile, TileState, TileUpdate},
    error::FieldError,
};

/// Moore neighbourhood of `pos`, clipped to the board.
fn neighbors(pos: Pos, rows: usize, columns: usize) -> impl Iterator<Item = Pos> {
    (-1isize..=1)
        .flat_map(|dr| (-1isize..=1).map(move |dc| (dr, dc)))
        .filter(|&(dr, dc)| dr != 0 || dc != 0)
        .filter_map(move |(dr, dc)| {
            let row = pos.row.checked_add_signed(dr)?;
            let col = pos.col.checked_add_signed(dc)?;
            (row < rows && col < columns).then_some(Pos::new(row, col))
        })
}

fn check_capacity(rows: usize, columns: usize, mines: usize) -> Result<(), FieldError> {
    let cells = rows * columns;
    if mines >= cells {
        return Err(FieldError::TooManyMines { mines, cells });
    }
    Ok(())
}

impl From<&Tile> for Cell {
    fn from(value: &Tile) -> Self {
        match value.state {
            TileState::Hidden => Self::Hidden,
            TileState::Flagged => Self::Flagged,
            TileState::Revealed { .. } if value.mine => Self::Mine,
            TileState::Revealed { adjacent } => Self::Revealed { adjacent },
        }
    }
}

impl Minefield {
    fn empty(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            tiles: vec![Tile::hidden(); rows * columns],
            mines: Vec::new(),
            revealed: 0,
            state: FieldState::Ongoing,
        }
    }

    /// Places `mine_count` mines by sampling random positions from `rng`
    /// until that many distinct tiles hold one.
    pub fn new<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        mine_count: usize,
        rng: &mut R,
    ) -> Result<Self, FieldError> {
        check_capacity(rows, columns, mine_count)?;
        Ok(Self::place(rows, columns, mine_count, rng))
    }

    pub fn for_difficulty<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Self {
        debug_assert!(
            check_capacity(difficulty.rows(), difficulty.columns(), difficulty.mine_count())
                .is_ok()
        );
        Self::place(
            difficulty.rows(),
            difficulty.columns(),
            difficulty.mine_count(),
            rng,
        )
    }

    /// Builds a board with a known mine layout.
    pub fn with_mines(rows: usize, columns: usize, mines: &[Pos]) -> Result<Self, FieldError> {
        check_capacity(rows, columns, mines.len())?;

        let mut field = Self::empty(rows, columns);
        for &pos in mines {
            if !field.validate_pos(pos) {
                return Err(FieldError::MineOutOfBounds { pos, rows, columns });
            }
            let index = field.index(pos);
            if field.tiles[index].mine {
                return Err(FieldError::DuplicateMine(pos));
            }
            field.tiles[index].mine = true;
            field.mines.push(pos);
        }

        Ok(field)
    }

    fn place<R: Rng + ?Sized>(rows: usize, columns: usize, mine_count: usize, rng: &mut R) -> Self {
        let mut field = Self::empty(rows, columns);

        while field.mines.len() < mine_count {
            let pos = Pos::new(rng.random_range(0..rows), rng.random_range(0..columns));
            let index = field.index(pos);
            if !field.tiles[index].mine {
                field.tiles[index].mine = true;
                field.mines.push(pos);
            }
        }

        debug!("Placed {} mines on a {}x{} board", mine_count, rows, columns);
        field
    }

    fn index(&self, pos: Pos) -> usize {
        pos.row * self.columns + pos.col
    }

    fn validate_pos(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.columns
    }

    fn count_adjacent_mines(&self, pos: Pos) -> u8 {
        neighbors(pos, self.rows, self.columns)
            .filter(|&n| self.tiles[self.index(n)].mine)
            .count() as u8
    }

    fn has_won(&self) -> bool {
        self.revealed == self.rows * self.columns - self.mines.len()
    }

    fn reveal_mines(&mut self, updates: &mut Vec<TileUpdate>) {
        for i in 0..self.mines.len() {
            let pos = self.mines[i];
            let adjacent = self.count_adjacent_mines(pos);
            let index = self.index(pos);
            let tile = &mut self.tiles[index];
            tile.state = TileState::Revealed { adjacent };
            updates.push(TileUpdate {
                pos,
                value: (&*tile).into(),
            });
        }
    }

    /// Zero-expansion over a work-list. A tile leaves `Hidden` at most once,
    /// so every position is processed at most once and the loop terminates.
    fn reveal_cascade(&mut self, start: Pos, updates: &mut Vec<TileUpdate>) {
        let mut pending = vec![start];

        while let Some(pos) = pending.pop() {
            if !self.validate_pos(pos) {
                continue;
            }

            let index = self.index(pos);
            if self.tiles[index].state != TileState::Hidden || self.tiles[index].mine {
                continue;
            }

            let adjacent = self.count_adjacent_mines(pos);
            let tile = &mut self.tiles[index];
            tile.state = TileState::Revealed { adjacent };
            self.revealed += 1;
            updates.push(TileUpdate {
                pos,
                value: (&*tile).into(),
            });

            if adjacent == 0 {
                pending.extend(neighbors(pos, self.rows, self.columns));
            }
        }
    }

    /// Reveals the tile at `pos` and returns every tile whose visible state
    /// changed. Clicks outside the board, on flagged or revealed tiles, or on
    /// a finished board change nothing.
    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn reveal(&mut self, pos: Pos) -> Vec<TileUpdate> {
        let mut updates = Vec::new();

        if !self.validate_pos(pos) {
            debug!("Ignoring reveal outside the board at {}", pos);
            return updates;
        }

        if self.state.is_terminal() {
            debug!("Ignoring reveal on finished board at {}", pos);
            return updates;
        }

        let index = self.index(pos);
        match self.tiles[index].state {
            TileState::Hidden => {}
            TileState::Flagged => {
                debug!("Ignoring reveal on flagged tile {}", pos);
                return updates;
            }
            TileState::Revealed { .. } => return updates,
        }

        if self.tiles[index].mine {
            warn!("Mine hit at {} - round lost", pos);
            self.reveal_mines(&mut updates);
            self.state = FieldState::Lost;
            return updates;
        }

        self.reveal_cascade(pos, &mut updates);

        if self.has_won() {
            self.state = FieldState::Won;
            info!("All {} safe tiles cleared - round won", self.revealed);
        } else {
            debug!(
                "Revealed {} tiles, {} cleared so far",
                updates.len(),
                self.revealed
            );
        }

        updates
    }

    /// Cycles a tile between hidden and flagged.
    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn toggle_flag(&mut self, pos: Pos) -> Option<TileUpdate> {
        if !self.validate_pos(pos) || self.state.is_terminal() {
            return None;
        }

        let index = self.index(pos);
        let tile = &mut self.tiles[index];
        tile.state = match tile.state {
            TileState::Hidden => TileState::Flagged,
            TileState::Flagged => TileState::Hidden,
            TileState::Revealed { .. } => return None,
        };

        Some(TileUpdate {
            pos,
            value: (&*tile).into(),
        })
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    /// Mine counter shown next to the board. Flags do not decrement it.
    pub fn remaining_mines(&self) -> usize {
        self.mine_count()
    }

    /// Non-mine tiles revealed so far.
    pub fn tiles_cleared(&self) -> usize {
        self.revealed
    }

    pub fn flag_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.state == TileState::Flagged)
            .count()
    }

    /// Mine positions. Never handed to a front end: they stay hidden until
    /// the round is lost, and [`Minefield::cell`] is the player's view.
    pub(crate) fn mines(&self) -> &[Pos] {
        &self.mines
    }

    pub(crate) fn tile(&self, pos: Pos) -> Option<&Tile> {
        self.validate_pos(pos).then(|| &self.tiles[self.index(pos)])
    }

    pub fn cell(&self, pos: Pos) -> Option<Cell> {
        self.tile(pos).map(Cell::from)
    }

    /// Visible board, one `Vec` per row.
    pub fn snapshot(&self) -> Vec<Vec<Cell>> {
        self.tiles
            .iter()
            .map(Cell::from)
            .collect::<Vec<Cell>>()
            .chunks(self.columns)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn brute_force_count(field: &Minefield, pos: Pos) -> u8 {
        let mut count = 0;
        for row in pos.row.saturating_sub(1)..=(pos.row + 1).min(field.rows() - 1) {
            for col in pos.col.saturating_sub(1)..=(pos.col + 1).min(field.columns() - 1) {
                if (row, col) != (pos.row, pos.col) && field.mines().contains(&Pos::new(row, col)) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn places_exact_number_of_unique_mines() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (rows, columns, mines) in [
                (6, 6, 6),
                (9, 9, 12),
                (12, 12, 24),
                (3, 4, 11),
                (1, 2, 0),
            ] {
                let field = Minefield::new(rows, columns, mines, &mut rng).unwrap();
                assert_eq!(field.mine_count(), mines);

                let unique: HashSet<_> = field.mines().iter().copied().collect();
                assert_eq!(unique.len(), mines);
                assert!(field.mines().iter().all(|p| p.row < rows && p.col < columns));

                let flagged_as_mine = field.tiles.iter().filter(|t| t.mine).count();
                assert_eq!(flagged_as_mine, mines);
            }
        }
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let a = Minefield::for_difficulty(Difficulty::Hard, &mut StdRng::seed_from_u64(7));
        let b = Minefield::for_difficulty(Difficulty::Hard, &mut StdRng::seed_from_u64(7));
        assert_eq!(a.mines(), b.mines());
    }

    #[test]
    fn rejects_boards_that_cannot_hold_the_mines() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Minefield::new(3, 3, 9, &mut rng).unwrap_err(),
            FieldError::TooManyMines { mines: 9, cells: 9 }
        );
        assert!(Minefield::new(0, 0, 0, &mut rng).is_err());
        assert_eq!(
            Minefield::with_mines(2, 2, &[Pos::new(2, 0)]).unwrap_err(),
            FieldError::MineOutOfBounds {
                pos: Pos::new(2, 0),
                rows: 2,
                columns: 2
            }
        );
        assert_eq!(
            Minefield::with_mines(2, 2, &[Pos::new(1, 1), Pos::new(1, 1)]).unwrap_err(),
            FieldError::DuplicateMine(Pos::new(1, 1))
        );
    }

    #[test]
    fn counts_moore_neighbours_on_hand_built_board() {
        // . . .     M 1 0
        // . . .  => 2 2 1
        // . . .     1 M 1
        let mines = [Pos::new(0, 0), Pos::new(2, 1)];
        let mut field = Minefield::with_mines(3, 3, &mines).unwrap();

        let expected = [
            (Pos::new(0, 1), 1),
            (Pos::new(0, 2), 0),
            (Pos::new(1, 0), 2),
            (Pos::new(1, 1), 2),
            (Pos::new(1, 2), 1),
            (Pos::new(2, 0), 1),
            (Pos::new(2, 2), 1),
        ];

        for (pos, _) in expected {
            field.reveal(pos);
        }
        for (pos, adjacent) in expected {
            assert_eq!(field.cell(pos), Some(Cell::Revealed { adjacent }), "at {pos}");
            assert_eq!(adjacent, brute_force_count(&field, pos));
        }
        assert_eq!(field.state(), FieldState::Won);
    }

    #[test]
    fn zero_tile_cascades_to_its_region_and_border() {
        let mines: Vec<Pos> = (0..5).map(|row| Pos::new(row, 2)).collect();
        let mut field = Minefield::with_mines(5, 5, &mines).unwrap();

        let updates = field.reveal(Pos::new(0, 0));

        assert_eq!(updates.len(), 10);
        assert_eq!(field.tiles_cleared(), 10);
        for row in 0..5 {
            assert_eq!(field.cell(Pos::new(row, 0)), Some(Cell::Revealed { adjacent: 0 }));
            assert!(matches!(
                field.cell(Pos::new(row, 1)),
                Some(Cell::Revealed { adjacent: 2 | 3 })
            ));
            assert_eq!(field.cell(Pos::new(row, 3)), Some(Cell::Hidden));
        }
        assert_eq!(field.state(), FieldState::Ongoing);
    }

    #[test]
    fn cascade_terminates_on_all_zero_board() {
        let mut field = Minefield::new(50, 40, 0, &mut StdRng::seed_from_u64(1)).unwrap();

        let updates = field.reveal(Pos::new(0, 0));

        assert_eq!(updates.len(), 2000);
        assert_eq!(field.state(), FieldState::Won);
        assert!(
            field
                .snapshot()
                .iter()
                .flatten()
                .all(|c| *c == Cell::Revealed { adjacent: 0 })
        );
    }

    #[test]
    fn hitting_a_mine_reveals_every_mine() {
        let mines = [Pos::new(0, 0), Pos::new(3, 3), Pos::new(1, 2)];
        let mut field = Minefield::with_mines(4, 4, &mines).unwrap();
        field.toggle_flag(Pos::new(3, 3));

        let updates = field.reveal(Pos::new(1, 2));

        assert_eq!(field.state(), FieldState::Lost);
        assert_eq!(updates.len(), 3);
        for pos in mines {
            assert_eq!(field.cell(pos), Some(Cell::Mine));
        }
        assert!(field.reveal(Pos::new(2, 0)).is_empty());
        assert_eq!(field.cell(Pos::new(2, 0)), Some(Cell::Hidden));
        assert_eq!(field.toggle_flag(Pos::new(2, 0)), None);
    }

    #[test]
    fn finished_board_ignores_further_reveals() {
        let mut field = Minefield::with_mines(2, 2, &[Pos::new(1, 1)]).unwrap();
        for pos in [Pos::new(0, 0), Pos::new(0, 1), Pos::new(1, 0)] {
            field.reveal(pos);
        }
        assert_eq!(field.state(), FieldState::Won);

        assert!(field.reveal(Pos::new(1, 1)).is_empty());
        assert_eq!(field.state(), FieldState::Won);
        assert_eq!(field.cell(Pos::new(1, 1)), Some(Cell::Hidden));
    }

    #[test]
    fn out_of_bounds_and_repeated_clicks_are_no_ops() {
        let mut field = Minefield::with_mines(3, 3, &[Pos::new(2, 2)]).unwrap();
        assert!(field.reveal(Pos::new(3, 0)).is_empty());
        assert!(field.reveal(Pos::new(0, 99)).is_empty());
        assert_eq!(field.toggle_flag(Pos::new(5, 5)), None);

        assert_eq!(field.reveal(Pos::new(1, 1)).len(), 1);
        assert!(field.reveal(Pos::new(1, 1)).is_empty());
        assert_eq!(field.tiles_cleared(), 1);
    }

    #[test]
    fn flags_toggle_and_block_reveals() {
        let mut field = Minefield::new(3, 3, 0, &mut StdRng::seed_from_u64(3)).unwrap();
        let corner = Pos::new(2, 2);

        assert_eq!(
            field.toggle_flag(corner),
            Some(TileUpdate {
                pos: corner,
                value: Cell::Flagged
            })
        );
        assert_eq!(field.flag_count(), 1);
        assert_eq!(field.remaining_mines(), 0);
        assert!(field.reveal(corner).is_empty());

        // The cascade skips the flag as well.
        field.reveal(Pos::new(0, 0));
        assert_eq!(field.tiles_cleared(), 8);
        assert_eq!(field.cell(corner), Some(Cell::Flagged));
        assert_eq!(field.state(), FieldState::Ongoing);

        assert_eq!(
            field.toggle_flag(corner).map(|u| u.value),
            Some(Cell::Hidden)
        );
        field.reveal(corner);
        assert_eq!(field.state(), FieldState::Won);
        assert_eq!(field.toggle_flag(Pos::new(0, 0)), None);
    }

    #[test]
    fn mine_counter_ignores_flags() {
        let mut field =
            Minefield::for_difficulty(Difficulty::Medium, &mut StdRng::seed_from_u64(9));
        field.toggle_flag(Pos::new(0, 0));
        field.toggle_flag(Pos::new(4, 4));
        assert_eq!(field.remaining_mines(), 12);
    }

    #[test]
    fn snapshot_hides_mines_while_playing() {
        let field = Minefield::with_mines(2, 3, &[Pos::new(0, 1)]).unwrap();
        let snapshot = field.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].len(), 3);
        assert!(snapshot.iter().flatten().all(|c| *c == Cell::Hidden));
    }

    #[test]
    fn player_view_shows_mines_only_after_a_loss() {
        // Every safe tile touches a mine, so nothing cascades.
        let mines = [Pos::new(0, 0), Pos::new(0, 2), Pos::new(2, 0), Pos::new(2, 2)];
        let mut field = Minefield::with_mines(3, 3, &mines).unwrap();
        let shows_mine = |field: &Minefield| {
            field
                .snapshot()
                .iter()
                .flatten()
                .any(|cell| *cell == Cell::Mine)
        };

        for pos in [Pos::new(0, 1), Pos::new(1, 0), Pos::new(1, 1), Pos::new(1, 2)] {
            let updates = field.reveal(pos);
            assert_eq!(updates.len(), 1);
            assert_ne!(updates[0].value, Cell::Mine);

            field.toggle_flag(mines[0]);
            assert!(!shows_mine(&field));
            assert!(mines.iter().all(|&mine| field.cell(mine) != Some(Cell::Mine)));
            field.toggle_flag(mines[0]);
        }
        assert_eq!(field.state(), FieldState::Ongoing);
        assert_eq!(field.tiles_cleared(), 4);

        field.reveal(mines[3]);
        assert_eq!(field.state(), FieldState::Lost);
        assert!(shows_mine(&field));
        assert!(mines.iter().all(|&mine| field.cell(mine) == Some(Cell::Mine)));
        assert_eq!(field.cell(Pos::new(2, 1)), Some(Cell::Hidden));
    }
}
