// Managed unit (container) models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FetchError;

/// Number of id characters shown when a unit has no name.
pub const SHORT_ID_LEN: usize = 12;

/// Keys `UnitView` adds next to the flattened unit; dropped from server attributes.
const VIEW_KEYS: [&str; 3] = ["displayName", "pending", "latestSample"];

/// Unit lifecycle status; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Running,
    Exited,
    Paused,
    #[default]
    #[serde(other)]
    Unknown,
}

impl UnitStatus {
    /// Parse from the management API's status string (e.g. "running", "exited").
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "running" => UnitStatus::Running,
            "exited" => UnitStatus::Exited,
            "paused" => UnitStatus::Paused,
            _ => UnitStatus::Unknown,
        }
    }

    /// Strict counterpart of `parse` for user input: `None` for anything but a known name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "running" => Some(UnitStatus::Running),
            "exited" => Some(UnitStatus::Exited),
            "paused" => Some(UnitStatus::Paused),
            "unknown" => Some(UnitStatus::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Running => "running",
            UnitStatus::Exited => "exited",
            UnitStatus::Paused => "paused",
            UnitStatus::Unknown => "unknown",
        }
    }
}

/// One managed unit as last reported by the inventory endpoint.
///
/// Everything other than `id`, `name` and `status` is kept verbatim in `attributes`
/// (image, ports, created-at, ...) and handed to consumers untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: UnitStatus,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Unit {
    pub fn new(id: impl Into<String>, name: Option<&str>, status: UnitStatus) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            status,
            attributes: Map::new(),
        }
    }

    /// Decode one inventory record. Accepts `id` or the legacy `container_id` key and
    /// `status` or `state` for the lifecycle string.
    pub fn from_json(value: Value) -> Result<Self, FetchError> {
        let Value::Object(mut map) = value else {
            return Err(FetchError::Decode("inventory entry is not an object".into()));
        };

        let id = ["id", "container_id", "Id"]
            .iter()
            .find_map(|key| map.remove(*key).and_then(|v| v.as_str().map(str::to_string)))
            .ok_or_else(|| FetchError::Decode("inventory entry has no id".into()))?;
        if id.trim().is_empty() {
            return Err(FetchError::Decode("inventory entry has an empty id".into()));
        }

        let name = match map.remove("name") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Null) | None => None,
            Some(Value::String(_)) => None,
            Some(other) => {
                return Err(FetchError::Decode(format!(
                    "unit {} has a non-string name: {}",
                    id, other
                )));
            }
        };

        let status = ["status", "state"]
            .iter()
            .find_map(|key| map.remove(*key))
            .and_then(|v| v.as_str().map(UnitStatus::parse))
            .unwrap_or_default();

        for key in VIEW_KEYS {
            map.remove(key);
        }

        Ok(Self {
            id,
            name,
            status,
            attributes: map,
        })
    }

    /// Name shown to users: the name without Docker's leading '/', else a short id.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(|n| n.trim_start_matches('/')) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => short_id(&self.id).to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == UnitStatus::Running
    }
}

/// First 12 characters of an id (char-boundary safe).
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_accepts_container_id_and_keeps_attributes() {
        let unit = Unit::from_json(json!({
            "container_id": "abcdef0123456789",
            "name": "/web",
            "status": "running",
            "image": "nginx:latest",
            "ports": ["80/tcp"]
        }))
        .unwrap();
        assert_eq!(unit.id, "abcdef0123456789");
        assert_eq!(unit.status, UnitStatus::Running);
        assert_eq!(unit.display_name(), "web");
        assert_eq!(unit.attributes.get("image"), Some(&json!("nginx:latest")));
        assert!(!unit.attributes.contains_key("container_id"));
    }

    #[test]
    fn from_json_unknown_status_and_missing_name() {
        let unit = Unit::from_json(json!({ "id": "0123456789abcdef", "status": "restarting" }))
            .unwrap();
        assert_eq!(unit.status, UnitStatus::Unknown);
        assert_eq!(unit.display_name(), "0123456789ab");
    }

    #[test]
    fn from_json_rejects_missing_or_empty_id() {
        assert!(Unit::from_json(json!({ "name": "x" })).is_err());
        assert!(Unit::from_json(json!({ "id": "  " })).is_err());
        assert!(Unit::from_json(json!("not-an-object")).is_err());
    }

    #[test]
    fn serializes_flat_with_lowercase_status() {
        let mut unit = Unit::new("u1", Some("db"), UnitStatus::Exited);
        unit.attributes.insert("image".into(), json!("postgres"));
        let v = serde_json::to_value(&unit).unwrap();
        assert_eq!(v, json!({ "id": "u1", "name": "db", "status": "exited", "image": "postgres" }));
    }

    #[test]
    fn from_json_drops_keys_owned_by_the_view() {
        let unit = Unit::from_json(json!({
            "id": "u1",
            "status": "running",
            "displayName": "spoofed",
            "pending": "stop",
            "latestSample": null,
            "image": "nginx"
        }))
        .unwrap();
        assert_eq!(unit.attributes.len(), 1);
        assert!(unit.attributes.contains_key("image"));
    }

    #[test]
    fn short_id_handles_short_ids() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
    }
}
