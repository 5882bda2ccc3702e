//! Leaderboard ordered by tiles cleared.
//!
//! Records from every difficulty share one tree and are filtered by mine count
//! when queried. Insertion sends a record left when it cleared at least as
//! many tiles as the node it is compared with and right otherwise, so ties
//! land left and an in-order walk yields the best scores first. The tree is
//! never rebalanced: its shape, and therefore the order of tied records,
//! depends on insertion order.

use std::fmt;

use minesweeper_common::{Difficulty, ScoreRecord};
use serde::Serialize;

#[derive(Debug, Clone)]
struct Node {
    record: ScoreRecord,
    left: Option<usize>,
    right: Option<usize>,
}

/// Nodes live in a flat arena and refer to their children by index, which
/// keeps insertion and traversal iterative even for degenerate chains.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardTree {
    nodes: Vec<Node>,
}

impl LeaderboardTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ScoreRecord) {
        let new_index = self.nodes.len();
        let tiles = record.tiles_cleared();
        self.nodes.push(Node {
            record,
            left: None,
            right: None,
        });

        if new_index == 0 {
            return;
        }

        let mut current = 0;
        loop {
            let node = &mut self.nodes[current];
            let child = if tiles >= node.record.tiles_cleared() {
                &mut node.left
            } else {
                &mut node.right
            };

            match *child {
                Some(next) => current = next,
                None => {
                    *child = Some(new_index);
                    return;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records for one board size, in-order (left, node, right).
    pub fn query(&self, mine_count: usize) -> Query<'_> {
        Query {
            tree: self,
            mine_count,
            stack: Vec::new(),
            next: (!self.nodes.is_empty()).then_some(0),
        }
    }

    /// Display rows for a difficulty, best first.
    pub fn rows(&self, difficulty: Difficulty) -> Vec<LeaderboardRow> {
        self.query(difficulty.mine_count())
            .map(LeaderboardRow::from)
            .collect()
    }
}

impl FromIterator<ScoreRecord> for LeaderboardTree {
    fn from_iter<I: IntoIterator<Item = ScoreRecord>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl Extend<ScoreRecord> for LeaderboardTree {
    fn extend<I: IntoIterator<Item = ScoreRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Lazy in-order walk. Cloning it restarts from the same point.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    tree: &'a LeaderboardTree,
    mine_count: usize,
    stack: Vec<usize>,
    next: Option<usize>,
}

impl<'a> Iterator for Query<'a> {
    type Item = &'a ScoreRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some(index) = self.next {
                self.stack.push(index);
                self.next = self.tree.nodes[index].left;
            }

            let index = self.stack.pop()?;
            let node = &self.tree.nodes[index];
            self.next = node.right;

            if node.record.mine_count() == self.mine_count {
                return Some(&node.record);
            }
        }
    }
}

/// One line of a leaderboard: `username, tilesCleared/safeTiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub username: String,
    pub tiles_cleared: usize,
    pub total_tiles: usize,
}

impl From<&ScoreRecord> for LeaderboardRow {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            username: record.username().to_string(),
            tiles_cleared: record.tiles_cleared(),
            total_tiles: record.difficulty().safe_tiles(),
        }
    }
}

impl fmt::Display for LeaderboardRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}/{}",
            self.username, self.tiles_cleared, self.total_tiles
        )
    }
}
