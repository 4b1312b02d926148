// Turn raw management-API JSON into domain values. Pure; exposed for unit tests.

use crate::error::FetchError;
use crate::models::{ActionKind, ActionPayload, MetricSample, Unit};
use serde_json::Value;

use super::ActionReply;

/// Inventory body: a bare array, or `{containers: [...]}` / `{data: [...]}`.
/// Any bad entry fails the whole decode so a partial list is never installed.
pub(crate) fn decode_inventory(body: Value) -> Result<Vec<Unit>, FetchError> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map
            .remove("containers")
            .or_else(|| map.remove("data"))
        {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(FetchError::Decode(
                    "inventory envelope does not contain a list".into(),
                ));
            }
            None => {
                if map.get("success").and_then(Value::as_bool) == Some(false) {
                    return Err(FetchError::Rejected(message_of(&map).unwrap_or_else(
                        || "inventory unavailable".to_string(),
                    )));
                }
                return Err(FetchError::Decode("inventory body has no unit list".into()));
            }
        },
        other => {
            return Err(FetchError::Decode(format!(
                "unexpected inventory body: {}",
                type_name(&other)
            )));
        }
    };
    entries.into_iter().map(Unit::from_json).collect()
}

/// Stats body: `{success, stats: {...}}` or the raw stats object.
pub(crate) fn decode_stats(body: Value) -> Result<MetricSample, FetchError> {
    let Value::Object(mut map) = body else {
        return Err(FetchError::Decode(format!(
            "unexpected stats body: {}",
            type_name(&body)
        )));
    };
    let stats = match map.get("success").and_then(Value::as_bool) {
        Some(false) => {
            return Err(FetchError::Rejected(
                message_of(&map).unwrap_or_else(|| "stats unavailable".to_string()),
            ));
        }
        Some(true) => match map.remove("stats") {
            Some(Value::Object(stats)) => stats,
            _ => return Err(FetchError::Decode("stats envelope has no stats object".into())),
        },
        None => map,
    };

    let cpu = percent(stats.get("cpuPercent"))
        .ok_or_else(|| FetchError::Decode("stats missing numeric cpuPercent".into()))?;
    let mem = percent(stats.get("memoryPercent"))
        .ok_or_else(|| FetchError::Decode("stats missing numeric memoryPercent".into()))?;
    Ok(MetricSample::new(cpu, mem))
}

/// Interpret an action reply. `Err` carries the human-readable failure reason.
pub(crate) fn interpret_reply(kind: ActionKind, reply: &ActionReply) -> Result<ActionPayload, String> {
    let obj = reply.body.as_object();
    let server_message = obj.and_then(message_of);

    if !reply.is_success() {
        return Err(server_message.unwrap_or_else(|| {
            if (200..300).contains(&reply.status) {
                format!("{} failed", kind)
            } else {
                format!("{} failed with status {}", kind, reply.status)
            }
        }));
    }

    match kind {
        ActionKind::Logs => match obj.and_then(|o| o.get("logs")) {
            Some(Value::String(logs)) => Ok(ActionPayload::Logs(logs.clone())),
            Some(Value::Null) | None => Err("response contained no logs".into()),
            Some(other) => Ok(ActionPayload::Logs(other.to_string())),
        },
        ActionKind::Inspect => match obj.and_then(|o| o.get("inspect")) {
            Some(Value::Null) | None => Err("response contained no inspect data".into()),
            Some(inspect) => Ok(ActionPayload::Inspect(inspect.clone())),
        },
        _ => Ok(ActionPayload::None),
    }
}

fn message_of(map: &serde_json::Map<String, Value>) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Accepts JSON numbers and numeric strings such as "12.5" or "12.5%".
fn percent(value: Option<&Value>) -> Option<f64> {
    let v = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitStatus;
    use serde_json::json;

    #[test]
    fn inventory_accepts_all_envelopes() {
        let units = json!([{ "id": "a", "status": "running" }]);
        assert_eq!(decode_inventory(units.clone()).unwrap().len(), 1);
        assert_eq!(
            decode_inventory(json!({ "containers": units.clone() })).unwrap()[0].status,
            UnitStatus::Running
        );
        assert_eq!(decode_inventory(json!({ "data": units })).unwrap()[0].id, "a");
    }

    #[test]
    fn inventory_with_one_bad_entry_fails_entirely() {
        let err = decode_inventory(json!([{ "id": "a" }, { "name": "no-id" }])).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn inventory_rejects_unexpected_shapes() {
        assert!(decode_inventory(json!("nope")).is_err());
        assert!(decode_inventory(json!({ "containers": 3 })).is_err());
        assert!(matches!(
            decode_inventory(json!({ "success": false, "message": "Unauthorized" })),
            Err(FetchError::Rejected(m)) if m == "Unauthorized"
        ));
    }

    #[test]
    fn stats_envelope_and_raw_forms() {
        let s = decode_stats(json!({ "success": true, "stats": { "cpuPercent": 12.5, "memoryPercent": 40 } }))
            .unwrap();
        assert_eq!((s.cpu_percent, s.memory_percent), (12.5, 40.0));

        let s = decode_stats(json!({ "cpuPercent": "3.25", "memoryPercent": "7%" })).unwrap();
        assert_eq!((s.cpu_percent, s.memory_percent), (3.25, 7.0));
    }

    #[test]
    fn stats_failures() {
        assert!(matches!(
            decode_stats(json!({ "success": false, "message": "not running" })),
            Err(FetchError::Rejected(m)) if m == "not running"
        ));
        assert!(decode_stats(json!({ "success": true })).is_err());
        assert!(decode_stats(json!({ "cpuPercent": "abc", "memoryPercent": 1 })).is_err());
        assert!(decode_stats(json!([1, 2])).is_err());
    }

    #[test]
    fn reply_failure_prefers_server_message() {
        let reply = ActionReply {
            status: 500,
            body: json!({ "success": false, "message": "container is locked" }),
        };
        assert_eq!(
            interpret_reply(ActionKind::Stop, &reply),
            Err("container is locked".to_string())
        );

        let reply = ActionReply {
            status: 401,
            body: Value::Null,
        };
        assert_eq!(
            interpret_reply(ActionKind::Stop, &reply),
            Err("stop failed with status 401".to_string())
        );

        let reply = ActionReply {
            status: 200,
            body: json!({ "success": false }),
        };
        assert_eq!(
            interpret_reply(ActionKind::Restart, &reply),
            Err("restart failed".to_string())
        );
    }

    #[test]
    fn reply_payloads() {
        let reply = ActionReply {
            status: 200,
            body: json!({ "success": true, "logs": "line1\nline2" }),
        };
        assert_eq!(
            interpret_reply(ActionKind::Logs, &reply),
            Ok(ActionPayload::Logs("line1\nline2".into()))
        );

        let reply = ActionReply {
            status: 200,
            body: json!({ "success": true, "inspect": { "Id": "u1" } }),
        };
        assert_eq!(
            interpret_reply(ActionKind::Inspect, &reply),
            Ok(ActionPayload::Inspect(json!({ "Id": "u1" })))
        );

        let reply = ActionReply {
            status: 204,
            body: Value::Null,
        };
        assert_eq!(interpret_reply(ActionKind::Start, &reply), Ok(ActionPayload::None));
    }
}
