// Poll scheduler: two independent timers (inventory, metrics) driving the sync engine.
// Each cycle is non-reentrant: a tick that fires while the previous run of the same cycle is
// still in flight is skipped, not queued. Stopping cancels future ticks only; runs already in
// flight finish and are applied against whatever state exists when they land.

use crate::sync_engine::SyncEngine;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};

pub const DEFAULT_INVENTORY_INTERVAL: Duration = Duration::from_secs(8);
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub inventory_interval: Duration,
    pub metrics_interval: Duration,
    /// How often to log engine stats at INFO level.
    pub stats_log_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inventory_interval: DEFAULT_INVENTORY_INTERVAL,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            stats_log_interval: Duration::from_secs(60),
        }
    }
}

/// Reentrancy guard and counters for one cycle.
#[derive(Default)]
struct Cycle {
    running: AtomicBool,
    started: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
}

impl Cycle {
    fn try_enter(self: &Arc<Self>) -> Option<CyclePermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.started.fetch_add(1, Ordering::Relaxed);
        Some(CyclePermit(self.clone()))
    }
}

/// Releases the cycle when the run finishes (or its task is dropped).
struct CyclePermit(Arc<Cycle>);

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.0.completed.fetch_add(1, Ordering::Relaxed);
        self.0.running.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    pub started: u64,
    pub completed: u64,
    pub skipped: u64,
}

impl From<&Cycle> for CycleStats {
    fn from(c: &Cycle) -> Self {
        Self {
            started: c.started.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
        }
    }
}

pub struct PollScheduler {
    shutdown_tx: watch::Sender<bool>,
    loops: Mutex<Vec<JoinHandle<()>>>,
    inventory: Arc<Cycle>,
    metrics: Arc<Cycle>,
}

impl PollScheduler {
    /// Starts both cycles; each fires once immediately, then every period.
    pub fn start(engine: Arc<SyncEngine>, config: SchedulerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inventory = Arc::new(Cycle::default());
        let metrics = Arc::new(Cycle::default());

        let inventory_loop = {
            let engine = engine.clone();
            spawn_cycle(
                "inventory",
                config.inventory_interval,
                inventory.clone(),
                shutdown_rx.clone(),
                move || {
                    let engine = engine.clone();
                    async move {
                        // Failures are logged by the engine; the next tick retries.
                        let _ = engine.refresh_inventory().await;
                    }
                },
            )
        };
        let metrics_loop = {
            let engine = engine.clone();
            spawn_cycle(
                "metrics",
                config.metrics_interval,
                metrics.clone(),
                shutdown_rx.clone(),
                move || {
                    let engine = engine.clone();
                    async move {
                        engine.refresh_metrics().await;
                    }
                },
            )
        };
        let stats_loop = spawn_stats_log(
            engine,
            config.stats_log_interval,
            inventory.clone(),
            metrics.clone(),
            shutdown_rx,
        );

        info!(
            inventory_interval_ms = config.inventory_interval.as_millis() as u64,
            metrics_interval_ms = config.metrics_interval.as_millis() as u64,
            "poll scheduler started"
        );

        Self {
            shutdown_tx,
            loops: Mutex::new(vec![inventory_loop, metrics_loop, stats_loop]),
            inventory,
            metrics,
        }
    }

    /// Stops both timers. Once this returns no further tick fires. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        let handles: Vec<JoinHandle<()>> = match self.loops.lock() {
            Ok(mut loops) => loops.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            handle.abort();
            let _ = handle.await;
        }
        debug!("poll scheduler stopped");
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub fn inventory_stats(&self) -> CycleStats {
        CycleStats::from(self.inventory.as_ref())
    }

    pub fn metrics_stats(&self) -> CycleStats {
        CycleStats::from(self.metrics.as_ref())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        let loops = match self.loops.get_mut() {
            Ok(loops) => loops,
            Err(poisoned) => poisoned.into_inner(),
        };
        for handle in loops.drain(..) {
            handle.abort();
        }
    }
}

fn spawn_cycle<F, Fut>(
    name: &'static str,
    period: Duration,
    cycle: Arc<Cycle>,
    mut shutdown_rx: watch::Receiver<bool>,
    run: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    match cycle.try_enter() {
                        Some(permit) => {
                            let fut = run();
                            tokio::spawn(async move {
                                let _permit = permit;
                                fut.await;
                            });
                        }
                        None => {
                            cycle.skipped.fetch_add(1, Ordering::Relaxed);
                            debug!(cycle = name, "previous run still in flight; tick skipped");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!(cycle = name, "cycle shutting down");
                    break;
                }
            }
        }
    })
}

fn spawn_stats_log(
    engine: Arc<SyncEngine>,
    period: Duration,
    inventory: Arc<Cycle>,
    metrics: Arc<Cycle>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing worth logging yet.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let stats = engine.stats().await;
                    let inv = CycleStats::from(inventory.as_ref());
                    let met = CycleStats::from(metrics.as_ref());
                    info!(
                        units = stats.units,
                        metric_buffers = stats.metric_buffers,
                        pending_actions = stats.pending_actions,
                        inventory_failures = stats.inventory_failures,
                        sample_failures = stats.sample_failures,
                        actions_succeeded = stats.actions_succeeded,
                        actions_failed = stats.actions_failed,
                        inventory_skipped = inv.skipped,
                        metrics_skipped = met.skipped,
                        "engine stats"
                    );
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    })
}
