use super::endpoint::Endpoint;
use super::message::{Envelope, Inbound, Request};
use crate::dispatch::Topic;
use crate::utils::error::ChannelError;
use serde_json::{Value, json};

#[test]
fn envelope_parses_full_frame() {
    let env = Envelope::parse(r#"{"type":"notification","data":{"msg":"hi"},"timestamp":1000}"#)
        .expect("valid frame");
    assert_eq!(env.kind, "notification");
    assert_eq!(env.data, json!({"msg": "hi"}));
    assert_eq!(env.timestamp, 1000);
    assert_eq!(env.classify(), Inbound::Event(Topic::Notification));
}

#[test]
fn envelope_defaults_missing_data_and_timestamp() {
    let env = Envelope::parse(r#"{"type":"pong"}"#).expect("valid frame");
    assert_eq!(env.data, json!({}));
    assert_eq!(env.timestamp, 0);
    assert_eq!(env.classify(), Inbound::Pong);
}

#[test]
fn envelope_rejects_non_json_and_missing_type() {
    assert!(Envelope::parse("not json").is_err());
    assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
}

#[test]
fn unknown_types_are_classified_unrecognized() {
    let env = Envelope::parse(r#"{"type":"unknown_future_type","data":{}}"#).unwrap();
    assert_eq!(
        env.classify(),
        Inbound::Unrecognized("unknown_future_type".to_string())
    );
    assert_eq!(
        Inbound::from_type("disconnected"),
        Inbound::Unrecognized("disconnected".to_string())
    );
}

#[test]
fn outbound_envelope_serializes_type_data_timestamp() {
    let env = Envelope::new("ping", Value::Null, 42);
    let value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
    assert_eq!(value, json!({"type": "ping", "data": {}, "timestamp": 42}));
}

#[test]
fn requests_map_to_wire_shapes() {
    let cases = vec![
        (Request::Ping, "ping", json!({})),
        (
            Request::RequestAnalytics {
                period: "30d".to_string(),
            },
            "request_analytics",
            json!({"period": "30d"}),
        ),
        (
            Request::RequestNotifications { limit: 5 },
            "request_notifications",
            json!({"limit": 5}),
        ),
        (Request::RequestSystemStatus, "request_system_status", json!({})),
        (
            Request::UpdateJob {
                job_id: "job-9".to_string(),
                updates: json!({"status": "closed"}),
            },
            "update_job",
            json!({"jobId": "job-9", "updates": {"status": "closed"}}),
        ),
        (
            Request::UpdateContent {
                content_id: "hero".to_string(),
                updates: json!({"title": "Hiring"}),
            },
            "update_content",
            json!({"contentId": "hero", "updates": {"title": "Hiring"}}),
        ),
        (
            Request::UserActivity {
                activity: "page_view".to_string(),
                details: json!({"path": "/jobs"}),
            },
            "user_activity",
            json!({"activity": "page_view", "details": {"path": "/jobs"}}),
        ),
    ];

    for (request, kind, data) in cases {
        assert_eq!(request.into_parts(), (kind, data));
    }
}

#[test]
fn endpoint_maps_http_origins_to_ws_schemes() {
    let plain = Endpoint::parse("http://127.0.0.1:8080", "/ws").unwrap();
    assert_eq!(plain.base().as_str(), "ws://127.0.0.1:8080/ws");

    let secure = Endpoint::parse("https://careers.example.com/some/page?x=1#top", "ws").unwrap();
    assert_eq!(secure.base().as_str(), "wss://careers.example.com/ws");

    let already_ws = Endpoint::parse("wss://rt.example.com", "/ws").unwrap();
    assert_eq!(already_ws.base().scheme(), "wss");
}

#[test]
fn endpoint_appends_encoded_token() {
    let endpoint = Endpoint::parse("https://careers.example.com", "/ws").unwrap();
    let url = endpoint.url_for("a b&c");
    assert_eq!(
        url.as_str(),
        "wss://careers.example.com/ws?token=a+b%26c"
    );
    assert!(!endpoint.to_string().contains("token"));
}

#[test]
fn endpoint_rejects_bad_origins() {
    assert!(matches!(
        Endpoint::parse("ftp://files.example.com", "/ws"),
        Err(ChannelError::UnsupportedScheme(s)) if s == "ftp"
    ));
    assert!(matches!(
        Endpoint::parse("::::", "/ws"),
        Err(ChannelError::InvalidOrigin(_))
    ));
}
