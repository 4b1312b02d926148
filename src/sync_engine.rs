// Sync engine: owns the inventory, metric history and action tracker, and is the only thing
// that mutates them. All mutation happens under one lock that is never held across a network
// await; every step re-reads state after suspending.

use crate::action_tracker::{ActionTicket, ActionTracker, Resolution};
use crate::container_repo::{ContainerApi, decode};
use crate::error::{ActionError, FetchError};
use crate::filter::UnitFilter;
use crate::metric_buffer::{DEFAULT_HISTORY_CAPACITY, MetricBuffer};
use crate::models::{
    ActionKind, ActionOutcome, ActionPayload, ActionRequest, CreateUnitRequest, EngineEvent,
    MetricSample, Unit, UnitView,
};
use crate::unit_store::{ReplaceOutcome, UnitStore};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub history_capacity: usize,
    /// Capacity of the event broadcast channel (slow subscribers may lag).
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_capacity: 64,
        }
    }
}

/// Result of an inventory refresh that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryRefresh {
    Applied(ReplaceOutcome),
    /// A refresh issued later was installed first; this response was dropped.
    Superseded,
}

/// Per-cycle metrics summary. Failures are per unit, never one aggregate error.
#[derive(Debug, Default)]
pub struct MetricsReport {
    pub sampled: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
    /// Responses for units that left the inventory or stopped while the fetch was in flight.
    pub discarded: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub units: usize,
    pub metric_buffers: usize,
    pub pending_actions: usize,
    pub inventory_refreshes: u64,
    pub inventory_failures: u64,
    pub samples_recorded: u64,
    pub sample_failures: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    pub conflicts: u64,
}

struct EngineState {
    units: UnitStore,
    metrics: MetricBuffer,
    actions: ActionTracker,
    /// Generation of the inventory response currently installed.
    applied_generation: u64,
}

#[derive(Default)]
struct Counters {
    inventory_refreshes: AtomicU64,
    inventory_failures: AtomicU64,
    samples_recorded: AtomicU64,
    sample_failures: AtomicU64,
    actions_succeeded: AtomicU64,
    actions_failed: AtomicU64,
    conflicts: AtomicU64,
}

pub struct SyncEngine {
    api: Arc<dyn ContainerApi>,
    state: RwLock<EngineState>,
    issued_generation: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
    counters: Counters,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn ContainerApi>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            api,
            state: RwLock::new(EngineState {
                units: UnitStore::new(),
                metrics: MetricBuffer::new(config.history_capacity),
                actions: ActionTracker::new(),
                applied_generation: 0,
            }),
            issued_generation: AtomicU64::new(0),
            events,
            counters: Counters::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is normal (headless or no UI connected).
        let _ = self.events.send(event);
    }

    /// Fetch the inventory and install it. On failure the previous inventory stays in place.
    pub async fn refresh_inventory(&self) -> Result<InventoryRefresh, FetchError> {
        let generation = self.issued_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.api.list_units().await;
        let installed = match result {
            Ok(units) => self.install_inventory(generation, units).await,
            Err(e) => Err(e),
        };

        match installed {
            Ok(Some((outcome, orphaned))) => {
                self.counters.inventory_refreshes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    operation = "refresh_inventory",
                    generation,
                    added = outcome.added,
                    changed = outcome.changed,
                    removed = outcome.removed.len(),
                    "inventory installed"
                );
                for resolution in &orphaned {
                    self.report_resolution(resolution);
                }
                self.emit(EngineEvent::InventoryUpdated {
                    unit_count: outcome.added + outcome.changed + outcome.unchanged,
                    removed: outcome.removed.clone(),
                });
                Ok(InventoryRefresh::Applied(outcome))
            }
            Ok(None) => {
                debug!(
                    operation = "refresh_inventory",
                    generation, "stale inventory response discarded"
                );
                Ok(InventoryRefresh::Superseded)
            }
            Err(e) => {
                self.counters.inventory_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, operation = "refresh_inventory", "inventory refresh failed");
                self.emit(EngineEvent::InventoryFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Atomic install step: swap units, evict buffers and orphaned actions of vanished units.
    async fn install_inventory(
        &self,
        generation: u64,
        units: Vec<Unit>,
    ) -> Result<Option<(ReplaceOutcome, Vec<Resolution>)>, FetchError> {
        let mut state = self.state.write().await;
        if generation < state.applied_generation {
            return Ok(None);
        }
        let outcome = state.units.replace_all(units)?;
        state.applied_generation = generation;

        let mut orphaned = Vec::new();
        for id in &outcome.removed {
            state.metrics.evict(id);
            if let Some(resolution) = state.actions.cancel_orphaned(id) {
                orphaned.push(resolution);
            }
        }
        Ok(Some((outcome, orphaned)))
    }

    /// Sample every unit running right now. Each fetch is independent; one failing unit does
    /// not stop the others. A sample is kept only if its unit is still running when it lands.
    pub async fn refresh_metrics(&self) -> MetricsReport {
        let running = self.state.read().await.units.running_ids();

        let fetches = running.into_iter().map(|id| async move {
            let result = self.api.unit_stats(&id).await;
            (id, result)
        });
        let results = join_all(fetches).await;

        let mut report = MetricsReport::default();
        {
            let mut state = self.state.write().await;
            for (id, result) in results {
                match result {
                    Ok(sample) if state.units.get(&id).is_some_and(|u| u.is_running()) => {
                        state.metrics.push(&id, sample);
                        report.sampled.push(id);
                    }
                    Ok(_) => report.discarded += 1,
                    Err(e) => report.failed.push((id, e)),
                }
            }
        }

        self.counters
            .samples_recorded
            .fetch_add(report.sampled.len() as u64, Ordering::Relaxed);
        self.counters
            .sample_failures
            .fetch_add(report.failed.len() as u64, Ordering::Relaxed);
        for (id, e) in &report.failed {
            warn!(error = %e, operation = "refresh_metrics", unit_id = %id, "unit stats failed");
        }
        debug!(
            operation = "refresh_metrics",
            sampled = report.sampled.len(),
            failed = report.failed.len(),
            discarded = report.discarded,
            "metrics cycle done"
        );
        report
    }

    /// Inventory first so the metrics pass sees the current running set.
    pub async fn refresh_all(&self) -> Result<MetricsReport, FetchError> {
        self.refresh_inventory().await?;
        Ok(self.refresh_metrics().await)
    }

    /// Run one action against a unit.
    ///
    /// Rejected with `ActionError::Conflict` (before any network call) when the unit already
    /// has a pending action. Mutating actions stay pending until the confirming inventory
    /// refresh has been installed; read-only actions return their payload without a refresh.
    pub async fn dispatch_action(
        &self,
        request: ActionRequest,
    ) -> Result<ActionPayload, ActionError> {
        let unit_id = request.unit_id.clone();
        let kind = request.kind;

        let ticket = {
            let mut state = self.state.write().await;
            if !state.units.contains(&unit_id) {
                return Err(ActionError::UnitGone(unit_id));
            }
            match state.actions.dispatch(&unit_id, kind) {
                Ok(ticket) => ticket,
                Err(conflict) => {
                    self.counters.conflicts.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        operation = "dispatch_action",
                        unit_id = %unit_id,
                        kind = %kind,
                        pending = %conflict.pending,
                        "dispatch rejected"
                    );
                    return Err(conflict.into());
                }
            }
        };
        info!(operation = "dispatch_action", unit_id = %unit_id, kind = %kind, "action started");
        self.emit(EngineEvent::ActionStarted {
            unit_id: unit_id.clone(),
            kind,
        });

        let outcome = match self.api.perform(&request).await {
            Ok(reply) => decode::interpret_reply(kind, &reply),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(payload) => {
                if kind.is_mutating() {
                    self.reconcile(&unit_id, ticket).await;
                }
                match self.finish(&unit_id, ticket, ActionOutcome::Succeeded).await {
                    Some(_) => Ok(payload),
                    None => Err(ActionError::UnitGone(unit_id)),
                }
            }
            Err(reason) => {
                match self
                    .finish(&unit_id, ticket, ActionOutcome::Failed(reason.clone()))
                    .await
                {
                    Some(_) => Err(ActionError::Failed { kind, reason }),
                    None => Err(ActionError::UnitGone(unit_id)),
                }
            }
        }
    }

    /// Shorthand for `dispatch_action` with the canonical route for `kind`.
    pub async fn dispatch(
        &self,
        unit_id: &str,
        kind: ActionKind,
    ) -> Result<ActionPayload, ActionError> {
        self.dispatch_action(ActionRequest::for_kind(unit_id, kind))
            .await
    }

    /// Refresh the inventory while the action is still pending, so readers never see the
    /// action finished against a stale status.
    async fn reconcile(&self, unit_id: &str, ticket: ActionTicket) {
        let still_pending = self
            .state
            .write()
            .await
            .actions
            .mark_reconciling(unit_id, ticket);
        if !still_pending {
            return;
        }
        if let Err(e) = self.refresh_inventory().await {
            warn!(
                error = %e,
                operation = "reconcile",
                unit_id = %unit_id,
                "action succeeded but confirming refresh failed"
            );
        }
    }

    async fn finish(
        &self,
        unit_id: &str,
        ticket: ActionTicket,
        outcome: ActionOutcome,
    ) -> Option<Resolution> {
        let resolution = self
            .state
            .write()
            .await
            .actions
            .resolve(unit_id, ticket, outcome);
        match &resolution {
            Some(resolution) => self.report_resolution(resolution),
            None => debug!(
                operation = "resolve_action",
                unit_id = %unit_id,
                "late response for an action no longer pending"
            ),
        }
        resolution
    }

    fn report_resolution(&self, resolution: &Resolution) {
        match &resolution.outcome {
            ActionOutcome::Succeeded => {
                self.counters.actions_succeeded.fetch_add(1, Ordering::Relaxed);
                info!(
                    operation = "resolve_action",
                    unit_id = %resolution.unit_id,
                    kind = %resolution.kind,
                    elapsed_ms = resolution.elapsed.as_millis() as u64,
                    "action succeeded"
                );
            }
            ActionOutcome::Failed(reason) => {
                self.counters.actions_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    operation = "resolve_action",
                    unit_id = %resolution.unit_id,
                    kind = %resolution.kind,
                    reason = %reason,
                    "action failed"
                );
            }
        }
        self.emit(EngineEvent::resolved(
            &resolution.unit_id,
            resolution.kind,
            &resolution.outcome,
        ));
    }

    /// Create a new unit, then refresh so it shows up in the inventory.
    pub async fn create_unit(&self, request: CreateUnitRequest) -> Result<(), ActionError> {
        if request.image.trim().is_empty() {
            return Err(ActionError::CreateFailed("image is required".into()));
        }
        let reply = self
            .api
            .create_unit(&request)
            .await
            .map_err(|e| ActionError::CreateFailed(e.to_string()))?;
        if !reply.is_success() {
            let reason = reply
                .body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("server returned {}", reply.status));
            warn!(operation = "create_unit", image = %request.image, reason = %reason, "create failed");
            return Err(ActionError::CreateFailed(reason));
        }
        info!(operation = "create_unit", image = %request.image, "unit created");
        self.emit(EngineEvent::UnitCreated {
            image: request.image.clone(),
        });
        if let Err(e) = self.refresh_inventory().await {
            warn!(error = %e, operation = "create_unit", "refresh after create failed");
        }
        Ok(())
    }

    // --- read-only snapshots for the rendering layer ---

    pub async fn units(&self) -> Vec<Arc<Unit>> {
        self.state.read().await.units.list()
    }

    pub async fn unit(&self, unit_id: &str) -> Option<Arc<Unit>> {
        self.state.read().await.units.get(unit_id)
    }

    pub async fn metrics(&self, unit_id: &str) -> Vec<MetricSample> {
        self.state.read().await.metrics.snapshot(unit_id)
    }

    pub async fn is_pending(&self, unit_id: &str) -> bool {
        self.state.read().await.actions.is_pending(unit_id)
    }

    pub async fn pending_kind(&self, unit_id: &str) -> Option<ActionKind> {
        self.state.read().await.actions.pending_kind(unit_id)
    }

    pub async fn views(&self, filter: &UnitFilter) -> Vec<UnitView> {
        let state = self.state.read().await;
        state
            .units
            .list()
            .into_iter()
            .filter(|u| filter.matches(u))
            .map(|u| view_of(&state, u))
            .collect()
    }

    pub async fn view(&self, unit_id: &str) -> Option<UnitView> {
        let state = self.state.read().await;
        state.units.get(unit_id).map(|u| view_of(&state, u))
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        let c = &self.counters;
        EngineStats {
            units: state.units.len(),
            metric_buffers: state.metrics.len(),
            pending_actions: state.actions.len(),
            inventory_refreshes: c.inventory_refreshes.load(Ordering::Relaxed),
            inventory_failures: c.inventory_failures.load(Ordering::Relaxed),
            samples_recorded: c.samples_recorded.load(Ordering::Relaxed),
            sample_failures: c.sample_failures.load(Ordering::Relaxed),
            actions_succeeded: c.actions_succeeded.load(Ordering::Relaxed),
            actions_failed: c.actions_failed.load(Ordering::Relaxed),
            conflicts: c.conflicts.load(Ordering::Relaxed),
        }
    }
}

fn view_of(state: &EngineState, unit: Arc<Unit>) -> UnitView {
    UnitView {
        display_name: unit.display_name(),
        pending: state.actions.pending_kind(&unit.id),
        latest_sample: state.metrics.latest(&unit.id),
        unit,
    }
}
