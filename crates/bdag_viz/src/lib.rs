#![doc = include_str!("../README.md")]
//! ## Crate overview
//!
//! A live dashboard for a BlockDAG network.
//!
//! A [`LedgerFeed`](feed::LedgerFeed) produces synthetic blocks on a timer and keeps
//! the newest fifty in a sliding window. Each block references up to three of its
//! recent predecessors; [`layout`] derives those references, and [`render`] paints the
//! resulting graph onto any [`Surface`](surface::Surface) with zoom, filter, search,
//! selection and a pulse on fresh blocks. [`Visualizer`] ties them together and
//! [`VizServer`] serves it over HTTP and WebSocket next to an analytics panel and
//! explorer data.
//!
//! ## Quick start
//!
//! ```
//! use bdag_viz::surface::DisplayList;
//! use bdag_viz::Visualizer;
//!
//! let now = 1_700_000_000_000;
//! let mut viz = Visualizer::seeded(42, now);
//! viz.tick_at(now + 5_000);
//! viz.zoom_in();
//!
//! let mut frame = DisplayList::new();
//! viz.render_at(&mut frame, now + 5_000);
//! assert_eq!(frame.filled_circles().len(), 21);
//! ```

/// Analytics snapshot, chart series and their periodic refresh.
pub mod analytics;

/// HTTP and WebSocket API endpoints.
///
/// See [`ApiState`] for the shared server state.
pub mod api;

/// Explorer data source for the transaction, contract and wallet panels.
pub mod client;

/// Blocks, references and window snapshots.
pub mod dag;

/// Error types and result aliases for the dashboard crate.
pub mod error;

/// Real-time event broadcasting system for WebSocket clients.
pub mod events;

pub mod feed;

/// Reference derivation between blocks in the window.
pub mod layout;

/// Block details, network card and legend.
pub mod panels;

pub mod render;

/// HTTP server configuration and startup.
///
/// See [`VizServer`] for the main server interface.
pub mod server;

pub mod surface;

mod timer;

pub mod visualizer;

pub use api::ApiState;
pub use dag::{ColorCategory, DagEdge, DagNode, DagNodeBuilder, DagStats, DagView};
pub use error::{Error, Result};
pub use events::{DagEvent, EventBroadcaster};
pub use feed::{LedgerFeed, PlayState};
pub use render::{NodeFilter, ViewState};
pub use server::{VizConfig, VizServer};
pub use visualizer::{Visualizer, VisualizerHandle};

/// Version information from Cargo.toml.
///
/// ```
/// use bdag_viz::VERSION;
///
/// println!("bdag_viz version: {}", VERSION);
/// ```
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
