//! Painting the window onto a [`Surface`], plus the view state that drives it.
//!
//! The renderer redraws everything on every call: clear, apply the zoom scale, stroke
//! every reference, then fill each visible block. Blocks that fail the active filter or
//! search are skipped at draw time but stay in the model, and hit testing still sees
//! them.

use crate::dag::{DagEdge, DagNode, SURFACE_HEIGHT, SURFACE_WIDTH};
use crate::error::{Error, Result};
use crate::surface::{Point, Surface};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.3;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Multiplier applied per zoom step.
pub const ZOOM_STEP: f64 = 1.2;

/// Age under which a block counts as recent for [`NodeFilter::Recent`].
pub const RECENT_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Transaction count at which a block counts as high activity.
pub const HIGH_TX_THRESHOLD: u32 = 50;

/// Age under which a block gets a pulsing ring.
pub const PULSE_WINDOW_MS: i64 = 10_000;

const SELECTION_COLOR: &str = "#ffffff";
const SELECTION_WIDTH: f64 = 3.0;
const PULSE_AMPLITUDE: f64 = 5.0;
const PULSE_PERIOD_DIVISOR: f64 = 200.0;
const PULSE_ALPHA: f64 = 0.3;
const PULSE_WIDTH: f64 = 2.0;

/// Which blocks are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeFilter {
    /// Every block.
    #[default]
    All,
    /// Blocks created within the last five minutes.
    Recent,
    /// Blocks with at least fifty transactions.
    HighTx,
}

impl NodeFilter {
    /// Returns `true` if `node` passes this filter at `now_ms`.
    pub fn accepts(&self, node: &DagNode, now_ms: i64) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Recent => node.age_ms(now_ms) <= RECENT_WINDOW_MS,
            NodeFilter::HighTx => node.transactions >= HIGH_TX_THRESHOLD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeFilter::All => "all",
            NodeFilter::Recent => "recent",
            NodeFilter::HighTx => "high-tx",
        }
    }
}

impl FromStr for NodeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(NodeFilter::All),
            "recent" => Ok(NodeFilter::Recent),
            "high-tx" | "high_tx" => Ok(NodeFilter::HighTx),
            other => Err(Error::InvalidInput(format!("unknown filter '{}'", other))),
        }
    }
}

/// User-controlled view parameters. Mutating these never touches the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Uniform scale factor, always within `[MIN_ZOOM, MAX_ZOOM]`.
    pub zoom: f64,
    pub filter: NodeFilter,
    /// Free-text label search; empty matches everything.
    pub search: String,
    /// Id of the selected block, if any.
    pub selected: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            filter: NodeFilter::All,
            search: String::new(),
            selected: None,
        }
    }
}

impl ViewState {
    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
        self.zoom
    }

    /// Zoom label shown over the graph, e.g. `"Zoom: 120%"`.
    pub fn zoom_label(&self) -> String {
        format!("Zoom: {:.0}%", self.zoom * 100.0)
    }

    /// Restores zoom to 1.0 and clears the selection. Filter and search are kept.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.selected = None;
    }

    /// Returns `true` if `node` passes both the filter and the search.
    pub fn is_visible(&self, node: &DagNode, now_ms: i64) -> bool {
        self.filter.accepts(node, now_ms) && node.label_matches(&self.search)
    }

    /// Maps a pointer position on the scaled surface back to model coordinates.
    pub fn to_model(&self, screen: Point) -> Point {
        Point::new(screen.x / self.zoom, screen.y / self.zoom)
    }
}

/// Paints `nodes` and `edges` onto `surface` as seen through `view` at `now_ms`.
pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    nodes: &[DagNode],
    edges: &[DagEdge],
    view: &ViewState,
    now_ms: i64,
) {
    surface.clear(SURFACE_WIDTH, SURFACE_HEIGHT);
    surface.set_scale(view.zoom);

    let by_id: HashMap<&str, &DagNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    for edge in edges {
        let (Some(from), Some(to)) = (
            by_id.get(edge.source.as_str()),
            by_id.get(edge.target.as_str()),
        ) else {
            continue;
        };
        surface.set_alpha(edge.opacity);
        surface.stroke_line(
            Point::new(from.x, from.y),
            Point::new(to.x, to.y),
            &edge.color,
            edge.width,
        );
        surface.set_alpha(1.0);
    }

    let pulse = (now_ms as f64 / PULSE_PERIOD_DIVISOR).sin() * PULSE_AMPLITUDE;

    for node in nodes.iter().filter(|n| view.is_visible(n, now_ms)) {
        let center = Point::new(node.x, node.y);
        let color = node.color.color();
        surface.fill_circle(center, node.size, color);

        if view.selected.as_deref() == Some(node.id.as_str()) {
            surface.stroke_circle(center, node.size, SELECTION_COLOR, SELECTION_WIDTH);
        }

        if node.age_ms(now_ms) < PULSE_WINDOW_MS {
            surface.set_alpha(PULSE_ALPHA);
            surface.stroke_circle(center, node.size + pulse, color, PULSE_WIDTH);
            surface.set_alpha(1.0);
        }
    }
}

/// Returns the first block (window order) whose circle contains `point`.
pub fn hit_test(point: Point, nodes: &[DagNode]) -> Option<&DagNode> {
    nodes.iter().find(|n| n.contains(point.x, point.y))
}
