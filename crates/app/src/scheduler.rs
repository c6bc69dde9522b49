//! Single-flight scheduler driving the evaluation cycle on a fixed period.
//!
//! A tick that fires while a cycle is still running is dropped: it is never
//! queued and never runs in parallel with the running cycle.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::control_loop::CycleReport;

/// Something that can run one evaluation cycle.
pub trait EvaluationCycle: Send + Sync + 'static {
    fn run(self: Arc<Self>) -> impl Future<Output = CycleReport> + Send;
}

/// Non-blocking busy flag.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

/// Held while a cycle runs; releases the flag on drop, panics included.
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl SingleFlight {
    /// Take the flag, or `None` if a flight is already in progress.
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// What happened to one timer tick.
#[derive(Debug)]
pub enum TickOutcome {
    Started(JoinHandle<CycleReport>),
    Dropped,
}

pub struct Scheduler<C> {
    cycle: Arc<C>,
    period: Duration,
    flight: SingleFlight,
    started: AtomicU64,
    dropped: AtomicU64,
}

impl<C: EvaluationCycle> Scheduler<C> {
    pub fn new(cycle: Arc<C>, period: Duration) -> Self {
        Self {
            cycle,
            period,
            flight: SingleFlight::default(),
            started: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn cycles_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn ticks_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Start a cycle unless one is already running.
    pub fn tick(&self) -> TickOutcome {
        let Some(guard) = self.flight.try_acquire() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("previous evaluation cycle still running, dropping tick");
            return TickOutcome::Dropped;
        };
        self.started.fetch_add(1, Ordering::Relaxed);
        let cycle = Arc::clone(&self.cycle);
        TickOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            cycle.run().await
        }))
    }

    /// Tick every period until `shutdown` flips to `true`, then wait for the
    /// in-flight cycle to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<CycleReport>> = None;

        tracing::info!(period = ?self.period, "evaluation scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let TickOutcome::Started(handle) = self.tick() {
                        in_flight = Some(handle);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = in_flight.filter(|handle| !handle.is_finished()) {
            tracing::info!("waiting for in-flight evaluation cycle");
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "evaluation cycle aborted");
            }
        }
        tracing::info!(
            cycles = self.cycles_started(),
            dropped = self.ticks_dropped(),
            "evaluation scheduler stopped"
        );
    }
}
