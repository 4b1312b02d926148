// Shared test helpers: a scripted in-memory management API

#![allow(dead_code)]

use async_trait::async_trait;
use fleetdash::container_repo::{ActionReply, ContainerApi};
use fleetdash::error::FetchError;
use fleetdash::models::{
    ActionKind, ActionRequest, CreateUnitRequest, MetricSample, Unit, UnitStatus,
};
use fleetdash::sync_engine::{EngineConfig, SyncEngine};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn unit(id: &str, status: UnitStatus) -> Unit {
    Unit::new(id, Some(&format!("/{}", id)), status)
}

/// Fake API. Inventory and replies are read when a call *completes*, so tests can change
/// them while a call is held.
#[derive(Default)]
pub struct FakeApi {
    inventory: Mutex<Option<Result<Vec<Unit>, FetchError>>>,
    stats: Mutex<HashMap<String, Result<(f64, f64), FetchError>>>,
    replies: Mutex<HashMap<ActionKind, Result<ActionReply, FetchError>>>,
    create_reply: Mutex<Option<ActionReply>>,
    inventory_holds: Mutex<VecDeque<Arc<Notify>>>,
    action_holds: Mutex<VecDeque<Arc<Notify>>>,
    stats_holds: Mutex<VecDeque<Arc<Notify>>>,
    pub list_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
    pub perform_calls: AtomicUsize,
    pub performed: Mutex<Vec<ActionRequest>>,
    pub created: Mutex<Vec<CreateUnitRequest>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_inventory(&self, units: Vec<Unit>) {
        *self.inventory.lock().unwrap() = Some(Ok(units));
    }

    pub fn fail_inventory(&self, error: FetchError) {
        *self.inventory.lock().unwrap() = Some(Err(error));
    }

    pub fn set_stats(&self, id: &str, cpu: f64, mem: f64) {
        self.stats
            .lock()
            .unwrap()
            .insert(id.to_string(), Ok((cpu, mem)));
    }

    pub fn fail_stats(&self, id: &str, error: FetchError) {
        self.stats.lock().unwrap().insert(id.to_string(), Err(error));
    }

    pub fn set_reply(&self, kind: ActionKind, status: u16, body: serde_json::Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(kind, Ok(ActionReply { status, body }));
    }

    pub fn fail_action(&self, kind: ActionKind, error: FetchError) {
        self.replies.lock().unwrap().insert(kind, Err(error));
    }

    pub fn set_create_reply(&self, status: u16, body: serde_json::Value) {
        *self.create_reply.lock().unwrap() = Some(ActionReply { status, body });
    }

    /// The next `list_units` call waits until the returned handle is notified.
    pub fn hold_next_inventory(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.inventory_holds.lock().unwrap().push_back(hold.clone());
        hold
    }

    /// The next `perform` call waits until the returned handle is notified.
    pub fn hold_next_action(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.action_holds.lock().unwrap().push_back(hold.clone());
        hold
    }

    /// The next `unit_stats` call waits until the returned handle is notified.
    pub fn hold_next_stats(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.stats_holds.lock().unwrap().push_back(hold.clone());
        hold
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub fn perform_calls(&self) -> usize {
        self.perform_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerApi for FakeApi {
    async fn list_units(&self) -> Result<Vec<Unit>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.inventory_holds.lock().unwrap().pop_front();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        self.inventory
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn unit_stats(&self, unit_id: &str) -> Result<MetricSample, FetchError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.stats_holds.lock().unwrap().pop_front();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        match self.stats.lock().unwrap().get(unit_id) {
            Some(Ok((cpu, mem))) => Ok(MetricSample::new(*cpu, *mem)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::Status {
                status: 404,
                message: "no stats".into(),
            }),
        }
    }

    async fn perform(&self, request: &ActionRequest) -> Result<ActionReply, FetchError> {
        self.perform_calls.fetch_add(1, Ordering::SeqCst);
        self.performed.lock().unwrap().push(request.clone());
        let hold = self.action_holds.lock().unwrap().pop_front();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .get(&request.kind)
            .cloned()
            .unwrap_or_else(|| {
                Ok(ActionReply {
                    status: 200,
                    body: json!({ "success": true }),
                })
            })
    }

    async fn create_unit(&self, request: &CreateUnitRequest) -> Result<ActionReply, FetchError> {
        self.created.lock().unwrap().push(request.clone());
        Ok(self.create_reply.lock().unwrap().clone().unwrap_or(ActionReply {
            status: 201,
            body: json!({ "success": true }),
        }))
    }
}

pub fn engine_with(api: Arc<FakeApi>) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(api, EngineConfig::default()))
}

/// Poll `cond` until it holds, yielding to spawned tasks in between.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
