//! Control API driven through the HTTP router against an in-memory engine

use axum::{
    body::{to_bytes, Body},
    http::{header, Request as HttpRequest, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use switcher_control::{
    config::{AppConfig, DownstreamConfig},
    control::{self, Controller, Publisher, Shutdown},
    downstream::DownstreamClient,
    protocol::Publication,
    web::{server::router, AppState},
};

struct Harness {
    app: Router,
    events: broadcast::Receiver<Publication>,
    engine: JoinHandle<Vec<String>>,
    control: JoinHandle<()>,
    shutdown: Shutdown,
}

async fn harness() -> Harness {
    let (engine_side, client_side) = tokio::io::duplex(64 * 1024);
    let engine = tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(engine_side);
        write_half.write_all(b"Snowmix version 0.5\n").await.unwrap();
        let mut lines = BufReader::new(read_half).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            seen.push(line);
        }
        seen
    });

    let config = AppConfig::default();
    let downstream_config = DownstreamConfig {
        banner_timeout_ms: 500,
        ..DownstreamConfig::default()
    };
    let downstream = DownstreamClient::from_stream(client_side, &downstream_config).await;

    let shutdown = Shutdown::new();
    let publisher = Publisher::new(64);
    let (handle, requests) = control::channel(8);
    let events = publisher.subscribe();
    let controller = Controller::new(&config, downstream, publisher.clone(), shutdown.clone());
    let control = tokio::spawn(controller.run(requests));

    let app = router(Arc::new(AppState {
        control: handle,
        publisher,
    }));

    Harness {
        app,
        events,
        engine,
        control,
        shutdown,
    }
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = HttpRequest::post("/control")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Next `count` envelopes as JSON
async fn updates(events: &mut broadcast::Receiver<Publication>, count: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for _ in 0..count {
        let publication = events.recv().await.unwrap();
        assert_eq!(publication.topic, "main");
        out.push(serde_json::to_value(&publication.message).unwrap());
    }
    out
}

#[tokio::test]
async fn test_sync_over_http() {
    let mut h = harness().await;

    let (status, body) = post(&h.app, json!({"action": "sync"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "ok"}));

    // Startup publishes preview and program first
    updates(&mut h.events, 2).await;
    assert_eq!(
        updates(&mut h.events, 4).await,
        vec![
            json!({"update": "preview", "value": 1}),
            json!({"update": "program", "value": 2}),
            json!({"update": "feeds_count", "value": 8}),
            json!({"update": "active_dsks", "value": []}),
        ]
    );
}

#[tokio::test]
async fn test_missing_action_is_acknowledged() {
    let h = harness().await;
    let (status, body) = post(&h.app, json!({"hello": "world"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "ok"}));
}

#[tokio::test]
async fn test_invalid_requests_get_error_acks() {
    let h = harness().await;

    let (status, body) = post(&h.app, json!({"action": "explode"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["response"], "error");

    let (status, body) = post(&h.app, json!({"action": "toggle_dsk", "dsk_id": 5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "error");

    // The loop survived the bad keyer index
    let (_, body) = post(&h.app, json!({"action": "toggle_dsk", "dsk_id": 0})).await;
    assert_eq!(body, json!({"response": "ok"}));
}

#[tokio::test]
async fn test_unbounded_transition_duration_is_rejected() {
    let h = harness().await;

    for duration in [json!(1e20), json!(1.7976931348623157e308), json!(-0.5)] {
        let (status, body) = post(&h.app, json!({"action": "transition", "duration": duration})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["response"], "error");
    }

    let (status, body) = post(&h.app, json!({"action": "transition", "duration": 0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "ok"}));
}

#[tokio::test]
async fn test_set_buses_take_and_quit() {
    let mut h = harness().await;

    post(&h.app, json!({"action": "set_program", "feed": 3})).await;
    post(&h.app, json!({"action": "set_preview", "feed": 5})).await;
    post(&h.app, json!({"action": "take"})).await;

    updates(&mut h.events, 2 + 4).await;
    assert_eq!(
        updates(&mut h.events, 2).await,
        vec![
            json!({"update": "preview", "value": 3}),
            json!({"update": "program", "value": 5}),
        ]
    );

    let (_, body) = post(&h.app, json!({"action": "quit"})).await;
    assert_eq!(body, json!({"response": "ok"}));
    assert_eq!(updates(&mut h.events, 1).await, vec![json!({"action": "quit"})]);

    h.control.await.unwrap();
    assert!(h.shutdown.is_triggered());

    let (status, _) = post(&h.app, json!({"action": "sync"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let lines = h.engine.await.unwrap();
    assert_eq!(
        lines.last().map(String::as_str),
        Some("tcl eval SetFeedToOverlay 5 3 9 10 11 12")
    );
}
