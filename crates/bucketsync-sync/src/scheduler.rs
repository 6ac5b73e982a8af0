//! Sync scheduler - one initial pass, then single-flight interval ticks
//!
//! The [`SyncScheduler`] runs a pass immediately and, when an interval is
//! configured, keeps ticking until its [`CancellationToken`] is cancelled.
//!
//! ## Flow
//!
//! ```text
//! start ──→ cancelled? ──→ Stopped
//!   └──→ initial pass task (holds permit) ──→ one-shot? ──→ Stopped
//!                                              │
//!                          tick ──→ PassGate::try_acquire
//!                                     ├─ acquired → spawn pass on TaskTracker
//!                                     └─ busy     → log, drop the tick
//!
//! cancel ──→ stop ticking ──→ await in-flight pass ──→ Stopped
//! ```
//!
//! Missed ticks are never queued or caught up. An in-flight pass is never
//! aborted; it observes no cancellation signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::engine::{PassReport, SyncEngine};
use crate::SyncError;

// ============================================================================
// PassRunner
// ============================================================================

/// Something that can execute one full pass
#[async_trait::async_trait]
pub trait PassRunner: Send + Sync + 'static {
    async fn run_pass(&self) -> Result<PassReport, SyncError>;
}

#[async_trait::async_trait]
impl PassRunner for SyncEngine {
    async fn run_pass(&self) -> Result<PassReport, SyncError> {
        SyncEngine::run_pass(self).await
    }
}

// ============================================================================
// PassGate
// ============================================================================

/// Single-slot execution permit
///
/// Capacity is exactly one and acquisition never waits.
#[derive(Debug, Clone, Default)]
pub struct PassGate {
    slot: Arc<Mutex<()>>,
}

/// Proof that the holder is the only running pass. Released on drop.
#[derive(Debug)]
pub struct PassPermit {
    _guard: OwnedMutexGuard<()>,
}

impl PassGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the permit if no pass is running
    pub fn try_acquire(&self) -> Option<PassPermit> {
        self.slot
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| PassPermit { _guard: guard })
    }

    /// Returns true while a permit is held
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }
}

// ============================================================================
// State and summary
// ============================================================================

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Counters reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerSummary {
    pub passes_started: usize,
    pub passes_succeeded: usize,
    pub passes_failed: usize,
    pub ticks_skipped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl Counters {
    fn summary(&self) -> SchedulerSummary {
        SchedulerSummary {
            passes_started: self.started.load(Ordering::SeqCst),
            passes_succeeded: self.succeeded.load(Ordering::SeqCst),
            passes_failed: self.failed.load(Ordering::SeqCst),
            ticks_skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

// ============================================================================
// SyncScheduler
// ============================================================================

/// Runs passes immediately and then on a fixed interval, never overlapping
pub struct SyncScheduler {
    runner: Arc<dyn PassRunner>,
    interval: Option<Duration>,
    gate: PassGate,
    tracker: TaskTracker,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SchedulerState>>,
    counters: Arc<Counters>,
}

impl SyncScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    /// * `runner` - Executes one pass
    /// * `interval` - Time between ticks; `None` or zero runs a single pass
    /// * `cancel` - Stops ticking when cancelled
    pub fn new(
        runner: Arc<dyn PassRunner>,
        interval: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            runner,
            interval: interval.filter(|d| !d.is_zero()),
            gate: PassGate::new(),
            tracker: TaskTracker::new(),
            cancel,
            state: Arc::new(state),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Subscribes to state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn gate(&self) -> &PassGate {
        &self.gate
    }

    /// Counters so far
    pub fn summary(&self) -> SchedulerSummary {
        self.counters.summary()
    }

    /// Runs until one-shot completion or cancellation
    ///
    /// # Errors
    ///
    /// In one-shot mode any pass failure is returned. In periodic mode only
    /// a scan failure of the initial pass is returned; later failures are
    /// logged and the next tick runs.
    pub async fn run(&self) -> Result<SchedulerSummary, SyncError> {
        if self.cancel.is_cancelled() {
            info!("Cancelled before start, no pass will run");
            self.stop().await;
            return Ok(self.summary());
        }

        let initial = match self.gate.try_acquire() {
            Some(permit) => {
                let pass = self.tracker.spawn(execute(
                    self.runner.clone(),
                    self.state.clone(),
                    self.counters.clone(),
                    permit,
                ));
                pass.await
                    .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())))
            }
            None => {
                warn!("A pass is already running, skipping initial pass");
                self.counters.skipped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        };

        let Some(period) = self.interval else {
            self.stop().await;
            return initial.map(|()| self.summary());
        };

        if let Err(e) = initial {
            if e.is_scan() {
                self.stop().await;
                return Err(e);
            }
            warn!(error = %e, "Initial pass failed, continuing with periodic sync");
        }

        info!(interval = ?period, "Starting periodic sync");
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received, no new passes will start");
                    break;
                }
                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.stop().await;
        Ok(self.summary())
    }

    fn on_tick(&self) {
        match self.gate.try_acquire() {
            Some(permit) => {
                debug!("Tick acquired the pass permit");
                let runner = self.runner.clone();
                let state = self.state.clone();
                let counters = self.counters.clone();
                self.tracker.spawn(async move {
                    if let Err(e) = execute(runner, state, counters, permit).await {
                        warn!(error = %e, "Periodic pass failed, will retry on next tick");
                    }
                });
            }
            None => {
                self.counters.skipped.fetch_add(1, Ordering::SeqCst);
                warn!("Previous sync still in progress, skipping this tick");
            }
        }
    }

    async fn stop(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!(in_flight = self.tracker.len(), "Waiting for in-flight pass to finish");
        }
        self.tracker.wait().await;
        self.state.send_replace(SchedulerState::Stopped);

        let summary = self.summary();
        info!(
            started = summary.passes_started,
            succeeded = summary.passes_succeeded,
            failed = summary.passes_failed,
            skipped = summary.ticks_skipped,
            "Sync scheduler stopped"
        );
    }
}

/// Runs one pass while holding `permit`
async fn execute(
    runner: Arc<dyn PassRunner>,
    state: Arc<watch::Sender<SchedulerState>>,
    counters: Arc<Counters>,
    permit: PassPermit,
) -> Result<(), SyncError> {
    counters.started.fetch_add(1, Ordering::SeqCst);
    state.send_replace(SchedulerState::Running);

    let result = runner.run_pass().await;
    match &result {
        Ok(_) => counters.succeeded.fetch_add(1, Ordering::SeqCst),
        Err(_) => counters.failed.fetch_add(1, Ordering::SeqCst),
    };

    // Idle must be published before the permit frees the slot for the next pass
    state.send_replace(SchedulerState::Idle);
    drop(permit);

    result.map(|_| ())
}

// ============================================================================
// Unit tests
// ============================================================================
