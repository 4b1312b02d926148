// User-triggered lifecycle actions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Start,
    Stop,
    Restart,
    Remove,
    Logs,
    Inspect,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Start,
        ActionKind::Stop,
        ActionKind::Restart,
        ActionKind::Remove,
        ActionKind::Logs,
        ActionKind::Inspect,
    ];

    /// Mutating actions change unit state remotely and are reconciled by an inventory refresh.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ActionKind::Start | ActionKind::Stop | ActionKind::Restart | ActionKind::Remove
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Restart => "restart",
            ActionKind::Remove => "remove",
            ActionKind::Logs => "logs",
            ActionKind::Inspect => "inspect",
        }
    }

    /// Verb and path the management API expects for this action.
    pub fn route(&self, unit_id: &str) -> (HttpMethod, String) {
        match self {
            ActionKind::Start => (HttpMethod::Post, format!("/containers/start/{}", unit_id)),
            ActionKind::Stop => (HttpMethod::Post, format!("/containers/stop/{}", unit_id)),
            ActionKind::Restart => (HttpMethod::Post, format!("/containers/restart/{}", unit_id)),
            ActionKind::Remove => (HttpMethod::Delete, format!("/containers/remove/{}", unit_id)),
            ActionKind::Logs => (HttpMethod::Get, format!("/containers/{}/logs", unit_id)),
            ActionKind::Inspect => (HttpMethod::Get, format!("/containers/inspect/{}", unit_id)),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action kind: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// One dispatch: which unit, what kind, and the transport verb/path to hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub unit_id: String,
    pub kind: ActionKind,
    pub method: HttpMethod,
    pub endpoint: String,
}

impl ActionRequest {
    pub fn new(
        unit_id: impl Into<String>,
        kind: ActionKind,
        method: HttpMethod,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            kind,
            method,
            endpoint: endpoint.into(),
        }
    }

    /// Request using the management API's canonical route for `kind`.
    pub fn for_kind(unit_id: impl Into<String>, kind: ActionKind) -> Self {
        let unit_id = unit_id.into();
        let (method, endpoint) = kind.route(&unit_id);
        Self {
            unit_id,
            kind,
            method,
            endpoint,
        }
    }
}

/// Observable action state per unit. Terminal states are only ever seen in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum ActionOutcome {
    Succeeded,
    Failed(String),
}

impl ActionOutcome {
    pub fn state(&self) -> ActionState {
        match self {
            ActionOutcome::Succeeded => ActionState::Succeeded,
            ActionOutcome::Failed(_) => ActionState::Failed,
        }
    }
}

/// Result body handed back to the caller of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ActionPayload {
    None,
    Logs(String),
    Inspect(Value),
}

/// Body of `POST /containers/run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    pub image: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host_port: Option<String>,
    #[serde(default)]
    pub container_port: Option<String>,
}

impl CreateUnitRequest {
    /// Wire body: `{image, name, ports}` with a Docker-style port binding when both ports are set.
    pub fn to_body(&self) -> Value {
        let mut ports = serde_json::Map::new();
        if let (Some(host), Some(container)) = (
            self.host_port.as_deref().filter(|p| !p.is_empty()),
            self.container_port.as_deref().filter(|p| !p.is_empty()),
        ) {
            ports.insert(
                format!("{}/tcp", container),
                serde_json::json!([{ "HostPort": host }]),
            );
        }
        serde_json::json!({
            "image": self.image,
            "name": self.name.clone().unwrap_or_default(),
            "ports": ports,
        })
    }
}
