// Wire shapes consumed by the rendering layer

use fleetdash::models::*;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_unit_view_flattens_unit_fields() {
    let mut unit = Unit::new("0123456789abcdef", None, UnitStatus::Paused);
    unit.attributes.insert("image".into(), json!("alpine"));
    let view = UnitView {
        display_name: unit.display_name(),
        unit: Arc::new(unit),
        pending: Some(ActionKind::Start),
        latest_sample: Some(MetricSample {
            cpu_percent: 1.5,
            memory_percent: 2.5,
            timestamp: 1_700_000_000_000,
        }),
    };
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(
        json,
        json!({
            "id": "0123456789abcdef",
            "status": "paused",
            "image": "alpine",
            "displayName": "0123456789ab",
            "pending": "start",
            "latestSample": {
                "cpuPercent": 1.5,
                "memoryPercent": 2.5,
                "timestamp": 1_700_000_000_000u64
            }
        })
    );
}

#[test]
fn test_action_resolved_event_shape() {
    let failed = EngineEvent::resolved(
        "u1",
        ActionKind::Remove,
        &ActionOutcome::Failed("in use".into()),
    );
    assert_eq!(
        serde_json::to_value(&failed).unwrap(),
        json!({
            "type": "actionResolved",
            "unitId": "u1",
            "kind": "remove",
            "state": "failed",
            "reason": "in use"
        })
    );

    let ok = EngineEvent::resolved("u1", ActionKind::Stop, &ActionOutcome::Succeeded);
    let json = serde_json::to_value(&ok).unwrap();
    assert_eq!(json["state"], json!("succeeded"));
    assert!(json.get("reason").is_none());
}

#[test]
fn test_action_kind_parse_and_routes() {
    assert_eq!("Restart".parse::<ActionKind>(), Ok(ActionKind::Restart));
    assert!("pause".parse::<ActionKind>().is_err());

    let request = ActionRequest::for_kind("abc", ActionKind::Logs);
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.endpoint, "/containers/abc/logs");
    assert!(!ActionKind::Logs.is_mutating());
    assert!(ActionKind::Remove.is_mutating());
}

#[test]
fn test_create_request_without_ports_sends_empty_binding() {
    let request = CreateUnitRequest {
        image: "busybox".into(),
        host_port: Some("8080".into()),
        ..Default::default()
    };
    assert_eq!(
        request.to_body(),
        json!({ "image": "busybox", "name": "", "ports": {} })
    );
}

#[test]
fn test_unit_view_never_repeats_view_keys() {
    let unit = Unit::from_json(json!({
        "id": "u1",
        "name": "/web",
        "status": "running",
        "displayName": "spoofed",
        "pending": "stop"
    }))
    .unwrap();
    let view = UnitView {
        display_name: unit.display_name(),
        unit: Arc::new(unit),
        pending: None,
        latest_sample: None,
    };
    let text = serde_json::to_string(&view).unwrap();
    assert_eq!(text.matches("\"displayName\"").count(), 1);
    assert_eq!(text.matches("\"pending\"").count(), 1);
    assert!(text.contains("\"displayName\":\"web\""));
}
