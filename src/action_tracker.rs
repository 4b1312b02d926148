// In-flight action bookkeeping: at most one pending action per unit.
//
// Idle (no record) -> Pending -> Succeeded | Failed -> Idle. Terminal states are returned to
// the caller as a `Resolution` and never stored.

use crate::error::ConflictError;
use crate::models::{ActionKind, ActionOutcome, ActionState};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Identifies one dispatch so a late response can't resolve a newer action on the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingPhase {
    /// Waiting for the remote call.
    InFlight,
    /// Remote call succeeded; local state is being refreshed.
    Reconciling,
}

#[derive(Debug, Clone)]
struct PendingAction {
    ticket: ActionTicket,
    kind: ActionKind,
    phase: PendingPhase,
    started_at: Instant,
}

/// Terminal notification produced by `resolve` or `cancel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub unit_id: String,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct ActionTracker {
    pending: HashMap<String, PendingAction>,
    next_ticket: u64,
}

impl ActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Pending. Rejects a second dispatch for the same unit.
    pub fn dispatch(
        &mut self,
        unit_id: &str,
        kind: ActionKind,
    ) -> Result<ActionTicket, ConflictError> {
        if let Some(existing) = self.pending.get(unit_id) {
            return Err(ConflictError {
                unit_id: unit_id.to_string(),
                pending: existing.kind,
            });
        }
        self.next_ticket += 1;
        let ticket = ActionTicket(self.next_ticket);
        self.pending.insert(
            unit_id.to_string(),
            PendingAction {
                ticket,
                kind,
                phase: PendingPhase::InFlight,
                started_at: Instant::now(),
            },
        );
        Ok(ticket)
    }

    /// Marks the remote call as done; the action stays pending until resolved.
    pub fn mark_reconciling(&mut self, unit_id: &str, ticket: ActionTicket) -> bool {
        match self.pending.get_mut(unit_id) {
            Some(p) if p.ticket == ticket => {
                p.phase = PendingPhase::Reconciling;
                true
            }
            _ => false,
        }
    }

    /// Pending -> terminal -> Idle. No-op (None) when the ticket is no longer pending.
    pub fn resolve(
        &mut self,
        unit_id: &str,
        ticket: ActionTicket,
        outcome: ActionOutcome,
    ) -> Option<Resolution> {
        match self.pending.get(unit_id) {
            Some(p) if p.ticket == ticket => {}
            _ => return None,
        }
        let p = self.pending.remove(unit_id)?;
        Some(Resolution {
            unit_id: unit_id.to_string(),
            kind: p.kind,
            outcome,
            elapsed: p.started_at.elapsed(),
        })
    }

    /// Fails an action whose unit disappeared from the inventory.
    /// Actions already reconciling are left for their dispatcher to resolve.
    pub fn cancel_orphaned(&mut self, unit_id: &str) -> Option<Resolution> {
        if self.pending.get(unit_id)?.phase == PendingPhase::Reconciling {
            return None;
        }
        let p = self.pending.remove(unit_id)?;
        Some(Resolution {
            unit_id: unit_id.to_string(),
            kind: p.kind,
            outcome: ActionOutcome::Failed("unit no longer exists".into()),
            elapsed: p.started_at.elapsed(),
        })
    }

    pub fn is_pending(&self, unit_id: &str) -> bool {
        self.pending.contains_key(unit_id)
    }

    pub fn state(&self, unit_id: &str) -> ActionState {
        if self.is_pending(unit_id) {
            ActionState::Pending
        } else {
            ActionState::Idle
        }
    }

    pub fn pending_kind(&self, unit_id: &str) -> Option<ActionKind> {
        self.pending.get(unit_id).map(|p| p.kind)
    }

    pub fn phase(&self, unit_id: &str) -> Option<PendingPhase> {
        self.pending.get(unit_id).map(|p| p.phase)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
