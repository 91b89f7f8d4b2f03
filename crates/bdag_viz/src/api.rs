//! REST and WebSocket API endpoints for the dashboard server.
//!
//! # API Endpoints
//!
//! ## Ledger and graph
//!
//! - `GET /api/dag` - Window, references and stats (`?limit=N&filter=recent`)
//! - `GET /api/dag/d3` - Window as a node/link document
//! - `GET /api/dag/block/{id}` - One block by id
//! - `GET /api/dag/recent?n=N` - The `N` newest blocks
//! - `GET /api/dag/svg` - The current frame as SVG
//! - `GET /api/frame` - The current frame as a display list
//! - `GET /api/stats` - Graph stats, network card and connection counts
//! - `GET /api/details` - Details of the selected block, or `null`
//! - `GET /api/legend` - Legend rows
//!
//! ## Controls
//!
//! - `POST /api/control/{toggle,play,pause,reset,zoom-in,zoom-out}`
//! - `POST /api/view` - `{"filter": "high-tx", "search": "Block 1"}`, both optional
//! - `POST /api/select` - `{"x": 120.0, "y": 300.0}` in surface coordinates
//!
//! ## Analytics and explorer data
//!
//! - `GET /api/analytics`, `POST /api/analytics/toggle`
//! - `GET /api/network/transactions`, `GET /api/network/contracts`,
//!   `GET /api/network/stats`, `GET /api/wallet/{address}/transactions`
//!
//! ## WebSocket
//!
//! - `WS /ws/updates` - Initial state followed by every [`DagEvent`]
//!
//! `GET /` serves the canvas page that paints frames from the display list.

use crate::analytics::{AnalyticsFeed, AnalyticsHandle, AnalyticsReport};
use crate::client::{
    Contract, NetworkDataSource, NetworkStats, OfflineDataSource, SyntheticData, Transaction,
};
use crate::dag::{DagEdge, DagNode, DagView};
use crate::error::Error;
use crate::events::{DagEvent, EventBroadcaster};
use crate::feed::PlayState;
use crate::panels::{legend, BlockDetails, LegendEntry};
use crate::render::{NodeFilter, ViewState};
use crate::surface::DisplayList;
use crate::visualizer::{Visualizer, VisualizerHandle};

use axum::extract::ws::{Message, WebSocket};
use axum::http::{header, StatusCode};
use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A specialized `Result` type for API handlers.
type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

fn api_error(e: Error) -> (StatusCode, String) {
    let status = match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn parse_filter(raw: &str) -> ApiResult<NodeFilter> {
    raw.parse().map_err(api_error)
}

/// The shared state for the Axum web application.
///
/// Every field is a cheap handle; cloning shares the underlying visualizer, analytics
/// feed, data source and broadcaster.
#[derive(Clone)]
pub struct ApiState {
    /// The ledger feed, references and view state.
    pub viz: VisualizerHandle,

    /// The analytics panel.
    pub analytics: AnalyticsHandle,

    /// Explorer data for the transaction, contract and wallet panels.
    pub network: Arc<dyn NetworkDataSource>,

    /// The event broadcaster for sending real-time updates to WebSocket clients.
    pub broadcaster: EventBroadcaster,
}

impl ApiState {
    /// Wires a state around an existing broadcaster. `viz` and `analytics` should
    /// publish to the same broadcaster.
    pub fn new(
        viz: VisualizerHandle,
        analytics: AnalyticsHandle,
        network: Arc<dyn NetworkDataSource>,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            viz,
            analytics,
            network,
            broadcaster,
        }
    }

    /// A fully deterministic state that never touches the network.
    pub fn offline(seed: u64) -> Self {
        let broadcaster = EventBroadcaster::new();
        let now = chrono::Utc::now().timestamp_millis();
        Self::new(
            VisualizerHandle::new(Visualizer::seeded(seed, now), broadcaster.clone()),
            AnalyticsHandle::new(
                AnalyticsFeed::seeded(seed.wrapping_add(2)),
                broadcaster.clone(),
            ),
            Arc::new(OfflineDataSource::new(SyntheticData::seeded(
                seed.wrapping_add(3),
            ))),
            broadcaster,
        )
    }
}

/// Query parameters for `GET /api/dag`.
#[derive(Debug, Deserialize)]
pub struct DagQuery {
    /// Maximum number of blocks to return, oldest first.
    pub limit: Option<usize>,

    /// `all`, `recent` or `high-tx`.
    pub filter: Option<String>,
}

/// Query parameters for `GET /api/dag/recent`.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Defaults to 10.
    pub n: Option<usize>,
}

/// Body of `POST /api/view`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub filter: Option<String>,
    pub search: Option<String>,
}

/// Body of `POST /api/select`.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub x: f64,
    pub y: f64,
}

/// Constructs the main Axum [`Router`] for the dashboard server.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Ledger and graph
        .route("/api/dag", get(get_dag))
        .route("/api/dag/d3", get(get_dag_d3))
        .route("/api/dag/block/{id}", get(get_block))
        .route("/api/dag/recent", get(get_recent))
        .route("/api/dag/svg", get(get_svg))
        .route("/api/frame", get(get_frame))
        .route("/api/stats", get(get_stats))
        .route("/api/details", get(get_details))
        .route("/api/legend", get(get_legend))
        // Controls
        .route("/api/control/toggle", post(control_toggle))
        .route("/api/control/play", post(control_play))
        .route("/api/control/pause", post(control_pause))
        .route("/api/control/reset", post(control_reset))
        .route("/api/control/zoom-in", post(control_zoom_in))
        .route("/api/control/zoom-out", post(control_zoom_out))
        .route("/api/view", post(update_view))
        .route("/api/select", post(select_at))
        // Analytics
        .route("/api/analytics", get(get_analytics))
        .route("/api/analytics/toggle", post(toggle_analytics))
        // Explorer data
        .route("/api/network/transactions", get(get_transactions))
        .route("/api/network/contracts", get(get_contracts))
        .route("/api/network/stats", get(get_network_stats))
        .route("/api/wallet/{address}/transactions", get(get_wallet_transactions))
        // WebSocket
        .route("/ws/updates", get(ws_handler))
        .route("/", get(serve_index))
        .with_state(state)
}

/// API handler for `GET /api/dag`.
async fn get_dag(
    State(state): State<ApiState>,
    Query(query): Query<DagQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.filter.as_deref().map(parse_filter).transpose()?;
    let dag = state.viz.snapshot().await;
    let now = chrono::Utc::now().timestamp_millis();

    let mut nodes: Vec<&DagNode> = dag.nodes.iter().collect();
    if let Some(filter) = filter {
        nodes.retain(|n| filter.accepts(n, now));
    }
    if let Some(limit) = query.limit {
        nodes.truncate(limit);
    }

    // Only references between returned blocks.
    let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<&DagEdge> = dag
        .edges
        .iter()
        .filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
        .collect();

    Ok(Json(serde_json::json!({
        "nodes": nodes,
        "edges": edges,
        "stats": dag.stats,
    })))
}

/// API handler for `GET /api/dag/d3`.
async fn get_dag_d3(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(state.viz.snapshot().await.to_d3_json())
}

/// API handler for `GET /api/dag/block/{id}`.
async fn get_block(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DagNode>> {
    state
        .viz
        .snapshot()
        .await
        .get_node(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(Error::NotFound(format!("block {}", id))))
}

/// API handler for `GET /api/dag/recent`.
async fn get_recent(
    State(state): State<ApiState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<DagNode>> {
    let dag = state.viz.snapshot().await;
    let nodes = dag.recent_nodes(query.n.unwrap_or(10));
    Json(nodes.into_iter().cloned().collect())
}

async fn get_svg(State(state): State<ApiState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        state.viz.svg().await,
    )
}

async fn get_frame(State(state): State<ApiState>) -> Json<DisplayList> {
    Json(state.viz.frame().await)
}

/// API handler for `GET /api/stats`.
async fn get_stats(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let (stats, card, play_state, view) = {
        let viz = state.viz.read().await;
        (
            viz.snapshot().stats,
            viz.network_card(),
            viz.play_state(),
            viz.view().clone(),
        )
    };
    let client_count = state.broadcaster.client_count().await;
    let event_count = state.broadcaster.event_count().await;

    Json(serde_json::json!({
        "dag": stats,
        "network": card,
        "play_state": play_state,
        "badge": play_state.badge(),
        "zoom_label": view.zoom_label(),
        "websocket": {
            "connected_clients": client_count,
            "total_events": event_count,
        }
    }))
}

async fn get_details(State(state): State<ApiState>) -> Json<Option<BlockDetails>> {
    Json(state.viz.details().await)
}

async fn get_legend() -> Json<Vec<LegendEntry>> {
    Json(legend())
}

fn play_state_json(state: PlayState) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "state": state,
        "badge": state.badge(),
    }))
}

async fn control_toggle(State(state): State<ApiState>) -> Json<serde_json::Value> {
    play_state_json(state.viz.toggle_play().await)
}

async fn control_play(State(state): State<ApiState>) -> Json<serde_json::Value> {
    play_state_json(state.viz.set_play_state(PlayState::Live).await)
}

async fn control_pause(State(state): State<ApiState>) -> Json<serde_json::Value> {
    play_state_json(state.viz.set_play_state(PlayState::Paused).await)
}

async fn control_reset(State(state): State<ApiState>) -> Json<DagView> {
    Json(state.viz.reset_view().await)
}

async fn zoom_json(state: &ApiState) -> Json<serde_json::Value> {
    let view = state.viz.view().await;
    Json(serde_json::json!({
        "zoom": view.zoom,
        "label": view.zoom_label(),
    }))
}

async fn control_zoom_in(State(state): State<ApiState>) -> Json<serde_json::Value> {
    state.viz.zoom_in().await;
    zoom_json(&state).await
}

async fn control_zoom_out(State(state): State<ApiState>) -> Json<serde_json::Value> {
    state.viz.zoom_out().await;
    zoom_json(&state).await
}

/// API handler for `POST /api/view`.
async fn update_view(
    State(state): State<ApiState>,
    Json(req): Json<ViewRequest>,
) -> ApiResult<Json<ViewState>> {
    // Validate before mutating so a bad filter leaves the search untouched too.
    let filter = req.filter.as_deref().map(parse_filter).transpose()?;
    if let Some(filter) = filter {
        state.viz.set_filter(filter).await;
    }
    if let Some(search) = req.search {
        state.viz.set_search(search).await;
    }
    Ok(Json(state.viz.view().await))
}

/// API handler for `POST /api/select`.
async fn select_at(
    State(state): State<ApiState>,
    Json(req): Json<SelectRequest>,
) -> Json<Option<BlockDetails>> {
    Json(state.viz.click(req.x, req.y).await)
}

async fn get_analytics(State(state): State<ApiState>) -> Json<AnalyticsReport> {
    Json(state.analytics.report().await)
}

async fn toggle_analytics(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let live = state.analytics.toggle().await;
    Json(serde_json::json!({ "live": live }))
}

async fn get_transactions(State(state): State<ApiState>) -> Json<Vec<Transaction>> {
    Json(state.network.get_transactions().await)
}

async fn get_contracts(State(state): State<ApiState>) -> Json<Vec<Contract>> {
    Json(state.network.get_contracts().await)
}

async fn get_network_stats(State(state): State<ApiState>) -> Json<NetworkStats> {
    Json(state.network.get_network_stats().await)
}

async fn get_wallet_transactions(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Json<Vec<Transaction>> {
    Json(state.network.get_wallet_transactions(&address).await)
}

/// API handler for `GET /ws/updates`. Upgrades the connection to a WebSocket.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handles the lifecycle of a single WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    log::info!("WebSocket client connected: {}", client_id);

    state.broadcaster.register_client(client_id.clone()).await;

    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.broadcaster.subscribe();

    // Initial snapshot, then the current frame so the canvas paints immediately.
    let initial = serde_json::json!({
        "type": "initial_state",
        "data": state.viz.snapshot().await.to_d3_json(),
        "view": state.viz.view().await,
    });
    let frame = DagEvent::Frame {
        frame: state.viz.frame().await,
    };
    for message in [initial.to_string(), frame.to_json()] {
        if let Err(e) = sender.send(Message::Text(message.into())).await {
            let err = Error::WebSocket(format!("initial send to {} failed: {}", client_id, e));
            log::error!("{}", err);
            let _ = state.broadcaster.broadcast(DagEvent::error(err.to_string())).await;
            state.broadcaster.unregister_client(&client_id).await;
            return;
        }
    }

    let broadcaster = state.broadcaster.clone();
    let client_id_clone = client_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if let Err(e) = sender.send(Message::Text(event.to_json().into())).await {
                        log::debug!("Dropping client {}: {}", client_id_clone, e);
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Client {} lagged, skipped {} events",
                        client_id_clone,
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        broadcaster.unregister_client(&client_id_clone).await;
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                log::debug!("Received from {}: {}", client_id, text.as_str());
                let event = match text.as_str() {
                    "ping" => DagEvent::ping(),
                    other => DagEvent::error(format!("unknown command: {}", other)),
                };
                let _ = state.broadcaster.broadcast(event).await;
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client {} closed gracefully", client_id);
                break;
            }
            Err(e) => {
                let err = Error::WebSocket(format!("client {}: {}", client_id, e));
                log::error!("{}", err);
                let _ = state.broadcaster.broadcast(DagEvent::error(err.to_string())).await;
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.broadcaster.unregister_client(&client_id).await;
    log::info!("WebSocket client disconnected: {}", client_id);
}

/// Serves the canvas page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../web/index.html"))
}
