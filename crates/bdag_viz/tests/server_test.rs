//! Integration tests for the dashboard server
//!
//! Runs the real router on a loopback listener and drives it over HTTP:
//! - The ledger tick grows the window while live
//! - Pausing freezes the window
//! - Controls and view updates round-trip
//! - WebSocket subscribers see tick events
//! - WebSocket clients get the initial state and frame, then live events

use bdag_viz::{ApiState, DagEvent, VizConfig, VizServer};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

async fn serve(state: ApiState) -> String {
    let config = VizConfig {
        port: 0,
        enable_tracing: false,
        api_base_url: None,
        ..VizConfig::default()
    };
    let app = VizServer::with_state(config, state).router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn node_count(http: &reqwest::Client, base: &str) -> usize {
    let json: serde_json::Value = http
        .get(format!("{}/api/dag", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    json["nodes"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_ticks_grow_window_until_paused() {
    let state = ApiState::offline(31);
    let base = serve(state.clone()).await;
    let http = reqwest::Client::new();

    assert_eq!(node_count(&http, &base).await, 20);

    state.viz.start(Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(280)).await;
    let grown = node_count(&http, &base).await;
    assert!(grown > 20, "window should grow while live, got {}", grown);

    let paused: serde_json::Value = http
        .post(format!("{}/api/control/pause", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paused["state"], "paused");
    assert_eq!(paused["badge"], "Paused");

    let frozen = node_count(&http, &base).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(node_count(&http, &base).await, frozen);

    state.viz.stop();
}

#[tokio::test]
async fn test_view_controls_round_trip() {
    let base = serve(ApiState::offline(32)).await;
    let http = reqwest::Client::new();

    let view: serde_json::Value = http
        .post(format!("{}/api/view", base))
        .json(&serde_json::json!({ "filter": "recent" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["filter"], "recent");

    let zoom: serde_json::Value = http
        .post(format!("{}/api/control/zoom-out", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(zoom["label"], "Zoom: 83%");

    let bad = http
        .post(format!("{}/api/view", base))
        .json(&serde_json::json!({ "filter": "sideways" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing = http
        .get(format!("{}/api/dag/block/block_404", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_headers_when_enabled() {
    let base = serve(ApiState::offline(33)).await;
    let http = reqwest::Client::new();

    let response = http
        .get(format!("{}/api/legend", base))
        .header("Origin", "http://example.test")
        .send()
        .await
        .unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_subscribers_receive_tick_events() {
    let state = ApiState::offline(34);
    let mut events = state.broadcaster.subscribe();

    state.viz.tick().await.expect("live feed ticks");

    let mut saw_block = false;
    let mut saw_frame = false;
    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(100), events.recv()).await
    {
        match event {
            DagEvent::BlockAdded { node } => {
                assert_eq!(node.id, "block_20");
                saw_block = true;
            }
            DagEvent::Frame { frame } => {
                assert_eq!(frame.filled_circles().len(), 21);
                saw_frame = true;
            }
            _ => {}
        }
    }
    assert!(saw_block && saw_frame);
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("websocket message in time")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Reads until an event of type `kind` arrives.
async fn wait_for(ws: &mut WsStream, kind: &str) -> serde_json::Value {
    loop {
        let json = next_json(ws).await;
        if json["type"] == kind {
            return json;
        }
    }
}

#[tokio::test]
async fn test_websocket_initial_state_frame_and_ping() {
    let state = ApiState::offline(35);
    let base = serve(state.clone()).await;
    let url = format!("{}/ws/updates", base.replacen("http", "ws", 1));

    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let initial = next_json(&mut ws).await;
    assert_eq!(initial["type"], "initial_state");
    assert_eq!(initial["data"]["nodes"].as_array().unwrap().len(), 20);
    assert_eq!(initial["view"]["zoom"], 1.0);

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "frame");
    assert!(!frame["frame"]["commands"].as_array().unwrap().is_empty());

    ws.send(Message::Text("ping".into())).await.unwrap();
    let ping = wait_for(&mut ws, "ping").await;
    assert!(ping["timestamp"].as_i64().unwrap() > 0);

    ws.send(Message::Text("shout".into())).await.unwrap();
    let error = wait_for(&mut ws, "error").await;
    assert!(error["message"].as_str().unwrap().contains("shout"));

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_websocket_forwards_tick_events() {
    let state = ApiState::offline(36);
    let base = serve(state.clone()).await;
    let url = format!("{}/ws/updates", base.replacen("http", "ws", 1));

    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "initial_state");
    assert_eq!(next_json(&mut ws).await["type"], "frame");

    state.viz.tick().await.expect("live feed ticks");
    let added = wait_for(&mut ws, "block_added").await;
    assert_eq!(added["node"]["id"], "block_20");
    let frame = wait_for(&mut ws, "frame").await;
    assert!(frame["frame"]["commands"].is_array());
}
