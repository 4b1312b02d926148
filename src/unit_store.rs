// Local inventory cache, keyed by unit id, in server order.

use crate::error::FetchError;
use crate::models::Unit;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What a successful `replace_all` changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Ids present before and absent now, in previous server order.
    pub removed: Vec<String>,
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Default)]
pub struct UnitStore {
    order: Vec<Arc<Unit>>,
    by_id: HashMap<String, usize>,
}

impl UnitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new inventory. All-or-nothing: on error the previous snapshot is untouched.
    /// Units equal to the current record keep their `Arc` so consumers can skip re-rendering.
    pub fn replace_all(&mut self, units: Vec<Unit>) -> Result<ReplaceOutcome, FetchError> {
        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if unit.id.trim().is_empty() {
                return Err(FetchError::Decode("inventory entry has an empty id".into()));
            }
            if !seen.insert(unit.id.as_str()) {
                return Err(FetchError::Decode(format!(
                    "inventory contains duplicate unit id {}",
                    unit.id
                )));
            }
        }

        let mut outcome = ReplaceOutcome::default();
        let mut order = Vec::with_capacity(units.len());
        let mut by_id = HashMap::with_capacity(units.len());
        for unit in units {
            let kept = match self.get(&unit.id) {
                Some(prev) if *prev == unit => {
                    outcome.unchanged += 1;
                    prev
                }
                Some(_) => {
                    outcome.changed += 1;
                    Arc::new(unit)
                }
                None => {
                    outcome.added += 1;
                    Arc::new(unit)
                }
            };
            by_id.insert(kept.id.clone(), order.len());
            order.push(kept);
        }

        outcome.removed = self
            .order
            .iter()
            .filter(|u| !by_id.contains_key(&u.id))
            .map(|u| u.id.clone())
            .collect();

        self.order = order;
        self.by_id = by_id;
        Ok(outcome)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Unit>> {
        self.by_id.get(id).map(|&i| self.order[i].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Snapshot in server order.
    pub fn list(&self) -> Vec<Arc<Unit>> {
        self.order.clone()
    }

    /// Ids of units currently reported as running.
    pub fn running_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|u| u.is_running())
            .map(|u| u.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
