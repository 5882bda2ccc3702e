//! Score persistence.
//!
//! [`ScoreStore`] reads and appends the plain-text score file, one
//! `username,tilesCleared,mineCount` record per line. [`ScoreKeeper`] owns a
//! store from a background task and keeps the in-memory [`LeaderboardTree`]
//! in sync with it. File I/O runs on tokio's blocking pool, never on the
//! thread that handles player actions.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use minesweeper_common::{Difficulty, ScoreRecord};
use tokio::{
    sync::{mpsc, oneshot},
    task::{self, JoinHandle},
};
use tracing::{debug, info, warn};

use crate::{
    error::StoreResult,
    leaderboard::{LeaderboardRow, LeaderboardTree},
};

/// Append-only score file.
#[derive(Debug, Clone)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every well-formed record in file order. Malformed lines are logged and
    /// skipped; a missing file is an empty leaderboard.
    pub fn load_all(&self) -> StoreResult<Vec<ScoreRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No score file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (number, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            let Ok(line) = String::from_utf8(line) else {
                warn!("Skipping score line {}: not valid UTF-8", number + 1);
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ScoreRecord>() {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed score line {}: {}", number + 1, e),
            }
        }

        debug!(
            "Loaded {} score records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// Adds one line at the end of the file, creating it if needed.
    pub fn append(&self, record: &ScoreRecord) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.to_line())?;
        file.flush()?;

        Ok(())
    }
}

pub type SharedLeaderboard = Arc<RwLock<LeaderboardTree>>;

fn read_tree(tree: &RwLock<LeaderboardTree>) -> RwLockReadGuard<'_, LeaderboardTree> {
    tree.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_tree(tree: &RwLock<LeaderboardTree>) -> RwLockWriteGuard<'_, LeaderboardTree> {
    tree.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum Command {
    Reload,
    Append(ScoreRecord),
    Flush(oneshot::Sender<()>),
}

/// Runs store commands one at a time, in the order they were sent. File I/O
/// goes to the blocking pool one command at a time.
async fn run_worker(
    store: ScoreStore,
    mut receiver: mpsc::UnboundedReceiver<Command>,
    leaderboard: SharedLeaderboard,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Reload => {
                let reader = store.clone();
                match task::spawn_blocking(move || reader.load_all()).await {
                    Ok(Ok(records)) => {
                        let tree: LeaderboardTree = records.into_iter().collect();
                        info!("Leaderboard loaded with {} records", tree.len());
                        *write_tree(&leaderboard) = tree;
                    }
                    Ok(Err(e)) => warn!(
                        "Failed to load scores from {}, keeping current leaderboard: {}",
                        store.path().display(),
                        e
                    ),
                    Err(e) => warn!("Score load task failed: {}", e),
                }
            }
            Command::Append(record) => {
                let writer = store.clone();
                let pending = record.clone();
                match task::spawn_blocking(move || writer.append(&pending)).await {
                    Ok(Ok(())) => debug!("Saved score {}", record.to_line()),
                    Ok(Err(e)) => warn!("Failed to save score {}: {}", record.to_line(), e),
                    Err(e) => warn!("Score save task failed: {}", e),
                }
                write_tree(&leaderboard).insert(record);
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("Score worker stopped");
}

/// Background owner of the score file and the leaderboard built from it.
pub struct ScoreKeeper {
    sender: mpsc::UnboundedSender<Command>,
    leaderboard: SharedLeaderboard,
    worker: JoinHandle<()>,
}

impl ScoreKeeper {
    /// Starts the worker. Must be called from within a tokio runtime.
    pub fn spawn(store: ScoreStore) -> Self {
        info!("Starting score worker for {}", store.path().display());

        let leaderboard: SharedLeaderboard = Arc::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = leaderboard.clone();
        let worker = tokio::spawn(run_worker(store, receiver, shared));

        Self {
            sender,
            leaderboard,
            worker,
        }
    }

    fn send(&self, command: Command) {
        if self.sender.send(command).is_err() {
            warn!("Score worker is gone, dropping store command");
        }
    }

    /// Rebuilds the leaderboard from the score file.
    pub fn reload(&self) {
        self.send(Command::Reload);
    }

    /// Appends `record` to the file, then adds it to the leaderboard. The
    /// record stays on the in-memory leaderboard even if the write fails.
    pub fn record(&self, record: ScoreRecord) {
        self.send(Command::Append(record));
    }

    /// Resolves once every command sent before it has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(Command::Flush(done));
        let _ = wait.await;
    }

    pub fn leaderboard(&self) -> SharedLeaderboard {
        self.leaderboard.clone()
    }

    pub fn rows(&self, difficulty: Difficulty) -> Vec<LeaderboardRow> {
        read_tree(&self.leaderboard).rows(difficulty)
    }

    /// Stops accepting commands and waits for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            warn!("Score worker ended abnormally: {}", e);
        }
    }
}
