//! Round timer.
//!
//! A tokio task ticks once per second and bumps an atomic counter while the
//! clock is running. Late ticks are skipped rather than replayed.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Counter {
    seconds: AtomicU64,
    running: AtomicBool,
}

#[derive(Debug, Default)]
pub struct Clock {
    counter: Arc<Counter>,
    ticker: Option<JoinHandle<()>>,
}

async fn run_ticker(counter: Arc<Counter>) {
    let mut interval = time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if counter.running.load(Ordering::Acquire) {
            counter.seconds.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts or resumes counting. The ticker task is spawned on the first
    /// call, so this must run inside a tokio runtime.
    pub fn start(&mut self) {
        self.counter.running.store(true, Ordering::Release);
        if self.ticker.is_none() {
            debug!("Starting clock ticker");
            self.ticker = Some(tokio::spawn(run_ticker(self.counter.clone())));
        }
    }

    pub fn stop(&self) {
        self.counter.running.store(false, Ordering::Release);
    }

    pub fn reset(&self) {
        self.counter.seconds.store(0, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.counter.running.load(Ordering::Acquire)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.counter.seconds.load(Ordering::Acquire)
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
