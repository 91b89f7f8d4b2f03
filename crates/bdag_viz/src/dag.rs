//! Data structures for representing the BlockDAG window in a visualization-friendly format.
//!
//! The main entry point is [`DagView`], an immutable snapshot of the blocks currently held
//! by the ledger feed together with the references derived between them and summary
//! statistics.
//!
//! # Quick Start
//!
//! ```
//! use bdag_viz::{DagEdge, DagNodeBuilder, DagView};
//!
//! let parent = DagNodeBuilder::new(0).position(100.0, 100.0).transactions(12).build();
//! let child = DagNodeBuilder::new(1).position(180.0, 140.0).transactions(64).build();
//! let edge = DagEdge::reference(1, 0, &parent.id, &child.id);
//!
//! let dag = DagView::new(vec![parent, child], vec![edge]);
//! assert_eq!(dag.stats.node_count, 2);
//! assert_eq!(dag.stats.edge_count, 1);
//! assert_eq!(dag.stats.total_transactions, 76);
//! ```
//!
//! # Visualization
//!
//! [`DagView::to_d3_json`] converts the snapshot to the node/link shape consumed by
//! browser-side graph libraries, mirroring the colors used by the canvas renderer.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical width of the render surface.
pub const SURFACE_WIDTH: f64 = 800.0;

/// Logical height of the render surface.
pub const SURFACE_HEIGHT: f64 = 600.0;

/// Stroke color shared by every block reference.
pub const EDGE_COLOR: &str = "#64748b";

/// Stroke opacity shared by every block reference.
pub const EDGE_OPACITY: f64 = 0.6;

/// Stroke width shared by every block reference.
pub const EDGE_WIDTH: f64 = 2.0;

/// Color category of a block.
///
/// Every block but the newest carries one of the three palette categories; the newest
/// block in the window is always [`ColorCategory::Latest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorCategory {
    /// A confirmed block (purple).
    Confirmed,
    /// A block with high activity (cyan).
    HighActivity,
    /// A settled block (amber).
    Settled,
    /// The most recently produced block (green).
    Latest,
}

impl ColorCategory {
    /// The palette drawn from for every block that is not the newest.
    pub const PALETTE: [ColorCategory; 3] = [
        ColorCategory::Confirmed,
        ColorCategory::HighActivity,
        ColorCategory::Settled,
    ];

    /// Returns the hex fill color for this category.
    pub fn color(&self) -> &'static str {
        match self {
            ColorCategory::Confirmed => "#8b5cf6",    // Purple
            ColorCategory::HighActivity => "#06b6d4", // Cyan
            ColorCategory::Settled => "#f59e0b",      // Amber
            ColorCategory::Latest => "#10b981",       // Green
        }
    }

    /// Returns the legend caption for this category.
    pub fn caption(&self) -> &'static str {
        match self {
            ColorCategory::Confirmed => "Confirmed Block",
            ColorCategory::HighActivity => "High Activity",
            ColorCategory::Settled => "Settled Block",
            ColorCategory::Latest => "Latest Block",
        }
    }
}

/// A single block in the visualized window.
///
/// Positions are assigned once at creation and never recomputed, so the layout is a
/// static scatter over the render surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagNode {
    /// Unique identifier within the current window (`block_{height}`).
    pub id: String,

    /// Human-readable label (`Block {height}`).
    pub label: String,

    /// Monotonic height assigned by the feed.
    pub height: u64,

    /// Horizontal position on the render surface.
    pub x: f64,

    /// Vertical position on the render surface.
    pub y: f64,

    /// Circle radius used for drawing and hit testing.
    pub size: f64,

    /// Color category. The only field that changes once a block exists: the
    /// feed demotes the newest block to a palette color when the next one lands.
    pub color: ColorCategory,

    /// Number of transactions in the block.
    pub transactions: u32,

    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// Gas consumed by the block.
    pub gas_used: u64,

    /// Mining difficulty of the block.
    pub difficulty: u64,
}

impl DagNode {
    /// Returns `true` if `(x, y)` lies on or inside this block's circle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() <= self.size
    }

    /// Milliseconds elapsed between creation and `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    /// Case-insensitive substring match of `term` against the label.
    pub fn label_matches(&self, term: &str) -> bool {
        term.is_empty() || self.label.to_lowercase().contains(&term.to_lowercase())
    }
}

/// A reference from an earlier block to a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagEdge {
    /// Identifier in the form `edge_{index}_{referenced_index}`.
    pub id: String,

    /// The referenced (earlier) block.
    pub source: String,

    /// The referencing (later) block. Arrows point at this end.
    pub target: String,

    /// Stroke color.
    pub color: String,

    /// Stroke opacity in `[0, 1]`.
    pub opacity: f64,

    /// Stroke width.
    pub width: f64,
}

impl DagEdge {
    /// Builds a reference edge from the block at window index `from_index` to the block
    /// at window index `to_index`, using the shared reference style.
    pub fn reference(to_index: usize, from_index: usize, source: &str, target: &str) -> Self {
        Self {
            id: format!("edge_{}_{}", to_index, from_index),
            source: source.to_string(),
            target: target.to_string(),
            color: EDGE_COLOR.to_string(),
            opacity: EDGE_OPACITY,
            width: EDGE_WIDTH,
        }
    }
}

/// A snapshot of the window, its derived edges, and summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagView {
    /// Blocks in window order (oldest first).
    pub nodes: Vec<DagNode>,

    /// References derived for this window.
    pub edges: Vec<DagEdge>,

    /// Statistics computed when the snapshot was taken.
    pub stats: DagStats,
}

/// Summary statistics for a [`DagView`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagStats {
    /// Number of blocks in the window.
    pub node_count: usize,

    /// Number of derived references.
    pub edge_count: usize,

    /// References per block, `0.0` for an empty window.
    pub avg_degree: f64,

    /// Sum of transactions across the window.
    pub total_transactions: u64,

    /// Timestamp of the oldest block.
    pub earliest_timestamp: Option<i64>,

    /// Timestamp of the newest block.
    pub latest_timestamp: Option<i64>,

    /// Height of the newest block.
    pub tip_height: Option<u64>,
}

impl DagStats {
    fn compute(nodes: &[DagNode], edges: &[DagEdge]) -> Self {
        let node_count = nodes.len();
        let edge_count = edges.len();
        Self {
            node_count,
            edge_count,
            avg_degree: if node_count == 0 {
                0.0
            } else {
                edge_count as f64 / node_count as f64
            },
            total_transactions: nodes.iter().map(|n| n.transactions as u64).sum(),
            earliest_timestamp: nodes.iter().map(|n| n.timestamp).min(),
            latest_timestamp: nodes.iter().map(|n| n.timestamp).max(),
            tip_height: nodes.iter().map(|n| n.height).max(),
        }
    }
}

impl DagView {
    /// Creates a snapshot and computes its statistics.
    pub fn new(nodes: Vec<DagNode>, edges: Vec<DagEdge>) -> Self {
        let stats = DagStats::compute(&nodes, &edges);
        Self {
            nodes,
            edges,
            stats,
        }
    }

    /// Finds a block by id.
    pub fn get_node(&self, id: &str) -> Option<&DagNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns up to `limit` blocks, newest first.
    pub fn recent_nodes(&self, limit: usize) -> Vec<&DagNode> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.height.cmp(&a.height)));
        nodes.into_iter().take(limit).collect()
    }

    /// Returns every edge touching `node_id`.
    pub fn edges_for_node(&self, node_id: &str) -> Vec<&DagEdge> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id || e.target == node_id)
            .collect()
    }

    /// Returns edges whose source or target is not in the window.
    pub fn dangling_edges(&self) -> Vec<&DagEdge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }

    /// Converts the snapshot to a node/link JSON document.
    pub fn to_d3_json(&self) -> serde_json::Value {
        serde_json::json!({
            "nodes": self.nodes.iter().map(|n| {
                serde_json::json!({
                    "id": n.id,
                    "label": n.label,
                    "group": n.color,
                    "color": n.color.color(),
                    "size": n.size,
                    "transactions": n.transactions,
                    "timestamp": n.timestamp,
                    "x": n.x,
                    "y": n.y,
                })
            }).collect::<Vec<_>>(),
            "links": self.edges.iter().map(|e| {
                serde_json::json!({
                    "id": e.id,
                    "source": e.source,
                    "target": e.target,
                    "color": e.color,
                    "opacity": e.opacity,
                    "width": e.width,
                    "arrows": "to",
                })
            }).collect::<Vec<_>>(),
            "stats": self.stats,
        })
    }
}

impl Default for DagView {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// A builder for [`DagNode`].
///
/// The id and label are derived from the height; everything else defaults to a
/// zero-sized settled block at the origin stamped with the current time.
pub struct DagNodeBuilder {
    node: DagNode,
}

impl DagNodeBuilder {
    /// Starts a block at `height`.
    pub fn new(height: u64) -> Self {
        Self {
            node: DagNode {
                id: format!("block_{}", height),
                label: format!("Block {}", height),
                height,
                x: 0.0,
                y: 0.0,
                size: 0.0,
                color: ColorCategory::Settled,
                transactions: 0,
                timestamp: chrono::Utc::now().timestamp_millis(),
                gas_used: 0,
                difficulty: 0,
            },
        }
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.node.x = x;
        self.node.y = y;
        self
    }

    pub fn size(mut self, size: f64) -> Self {
        self.node.size = size;
        self
    }

    pub fn color(mut self, color: ColorCategory) -> Self {
        self.node.color = color;
        self
    }

    pub fn transactions(mut self, transactions: u32) -> Self {
        self.node.transactions = transactions;
        self
    }

    /// Sets the creation time in milliseconds since the Unix epoch.
    pub fn timestamp(mut self, ts_ms: i64) -> Self {
        self.node.timestamp = ts_ms;
        self
    }

    pub fn gas_used(mut self, gas: u64) -> Self {
        self.node.gas_used = gas;
        self
    }

    pub fn difficulty(mut self, difficulty: u64) -> Self {
        self.node.difficulty = difficulty;
        self
    }

    pub fn build(self) -> DagNode {
        self.node
    }
}
