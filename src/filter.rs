// Dashboard filter bar: free-text search, status selection and published port.

use crate::models::{Unit, UnitStatus};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitFilter {
    /// Case-insensitive substring of the display name or id.
    #[serde(default, alias = "searchText")]
    pub q: Option<String>,
    /// Status name; empty means all.
    #[serde(default)]
    pub status: Option<String>,
    /// Substring of the unit's `ports` attribute (e.g. "8080").
    #[serde(default)]
    pub port: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl UnitFilter {
    /// Rejects a status that names no known lifecycle state.
    pub fn validate(&self) -> Result<(), String> {
        match non_empty(&self.status) {
            Some(status) if UnitStatus::from_name(status).is_none() => {
                Err(format!("unknown status filter: {}", status))
            }
            _ => Ok(()),
        }
    }

    /// An unrecognised status matches nothing.
    pub fn matches(&self, unit: &Unit) -> bool {
        if let Some(status) = non_empty(&self.status)
            && UnitStatus::from_name(status) != Some(unit.status)
        {
            return false;
        }
        if let Some(port) = non_empty(&self.port) {
            let published = match unit.attributes.get("ports") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => return false,
                Some(other) => other.to_string(),
            };
            if !published.contains(port) {
                return false;
            }
        }
        match non_empty(&self.q) {
            Some(q) => {
                let q = q.to_lowercase();
                unit.display_name().to_lowercase().contains(&q)
                    || unit.id.to_lowercase().contains(&q)
            }
            None => true,
        }
    }
}
