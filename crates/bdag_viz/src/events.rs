//! Real-time event system for pushing dashboard updates to WebSocket clients.
//!
//! [`EventBroadcaster`] fans [`DagEvent`]s out over a Tokio `broadcast` channel. Every
//! WebSocket connection subscribes once and forwards what it receives. Events are
//! emitted when the feed grows or resets, when the view changes, when analytics refresh,
//! and whenever a new frame has been painted.
//!
//! # Examples
//!
//! ```
//! use bdag_viz::{DagEvent, EventBroadcaster};
//!
//! #[tokio::main]
//! async fn main() {
//!     let broadcaster = EventBroadcaster::new();
//!     let mut receiver = broadcaster.subscribe();
//!
//!     broadcaster.broadcast(DagEvent::ping()).await;
//!
//!     if let Ok(event) = receiver.recv().await {
//!         assert!(event.to_json().contains("ping"));
//!     }
//! }
//! ```

use crate::dag::DagNode;
use crate::feed::PlayState;
use crate::render::ViewState;
use crate::surface::DisplayList;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Maximum number of events buffered per subscriber before the slowest one lags.
const EVENT_BUFFER_SIZE: usize = 1000;

/// An update pushed to dashboard clients.
///
/// Serialized with a `type` tag, e.g. `{"type":"block_added","node":{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DagEvent {
    /// The feed appended a block.
    BlockAdded { node: DagNode },

    /// Blocks were dropped from the front of the window.
    BlocksEvicted { ids: Vec<String> },

    /// References were recomputed for the current window.
    EdgesRebuilt { edge_count: usize },

    /// The window was regenerated from scratch.
    Reset { node_count: usize },

    /// The feed switched between live and paused.
    PlayStateChanged { state: PlayState },

    /// Zoom, filter, search or selection changed.
    ViewChanged { view: ViewState },

    /// A freshly painted frame.
    Frame { frame: DisplayList },

    /// The analytics snapshot was refreshed.
    StatsUpdated { stats: serde_json::Value },

    /// A client connected.
    Connected { client_id: String },

    /// Keep-alive.
    Ping { timestamp: i64 },

    /// Something went wrong server-side.
    Error { message: String },
}

impl DagEvent {
    pub fn block_added(node: DagNode) -> Self {
        DagEvent::BlockAdded { node }
    }

    pub fn stats_updated(stats: serde_json::Value) -> Self {
        DagEvent::StatsUpdated { stats }
    }

    pub fn ping() -> Self {
        DagEvent::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DagEvent::Error {
            message: message.into(),
        }
    }

    /// Serializes the event, falling back to `{}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Broadcasts [`DagEvent`]s to every subscriber and tracks connected clients.
///
/// Cloning shares the channel, the client set and the counter.
#[derive(Debug)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DagEvent>,
    clients: Arc<RwLock<HashSet<String>>>,
    event_count: Arc<RwLock<u64>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            sender,
            clients: Arc::new(RwLock::new(HashSet::new())),
            event_count: Arc::new(RwLock::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DagEvent> {
        self.sender.subscribe()
    }

    /// Sends `event` to all subscribers and returns how many received it.
    ///
    /// Having no subscribers is not an error; the event is counted and dropped.
    pub async fn broadcast(&self, event: DagEvent) -> usize {
        {
            let mut count = self.event_count.write().await;
            *count += 1;
        }

        self.sender.send(event).unwrap_or(0)
    }

    pub async fn register_client(&self, client_id: String) {
        self.clients.write().await.insert(client_id.clone());
        let _ = self.broadcast(DagEvent::Connected { client_id }).await;
    }

    pub async fn unregister_client(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn event_count(&self) -> u64 {
        *self.event_count.read().await
    }

    pub async fn frame(&self, frame: DisplayList) -> usize {
        self.broadcast(DagEvent::Frame { frame }).await
    }

    pub async fn stats_updated(&self, stats: serde_json::Value) -> usize {
        self.broadcast(DagEvent::stats_updated(stats)).await
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBroadcaster {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            clients: Arc::clone(&self.clients),
            event_count: Arc::clone(&self.event_count),
        }
    }
}
