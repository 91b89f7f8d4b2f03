//! Read-only panels shown beside the graph: block details, network stats and legend.

use crate::dag::{ColorCategory, DagNode, DagStats, EDGE_COLOR};
use serde::Serialize;

/// Details of the selected block, with display strings pre-formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDetails {
    pub id: String,
    pub label: String,
    pub transactions: u32,
    pub gas_used: u64,
    /// Gas used with thousands separators, e.g. `"734,102"`.
    pub gas_used_display: String,
    pub timestamp: i64,
    /// Creation time of day in UTC, `HH:MM:SS`.
    pub time_display: String,
    pub difficulty: u64,
    pub difficulty_display: String,
}

impl From<&DagNode> for BlockDetails {
    fn from(node: &DagNode) -> Self {
        let time_display = chrono::DateTime::from_timestamp_millis(node.timestamp)
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            transactions: node.transactions,
            gas_used: node.gas_used,
            gas_used_display: group_thousands(node.gas_used),
            timestamp: node.timestamp,
            time_display,
            difficulty: node.difficulty,
            difficulty_display: group_thousands(node.difficulty),
        }
    }
}

/// The "Network Stats" card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkCard {
    pub total_blocks: usize,
    pub connections: usize,
    /// Average references per block, one decimal place.
    pub avg_degree: String,
}

impl From<&DagStats> for NetworkCard {
    fn from(stats: &DagStats) -> Self {
        Self {
            total_blocks: stats.node_count,
            connections: stats.edge_count,
            avg_degree: format!("{:.1}", stats.avg_degree),
        }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub caption: &'static str,
    pub color: &'static str,
    /// `"node"` for a dot, `"edge"` for a line swatch.
    pub kind: &'static str,
}

/// Legend rows in display order.
pub fn legend() -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = [
        ColorCategory::Latest,
        ColorCategory::Confirmed,
        ColorCategory::HighActivity,
        ColorCategory::Settled,
    ]
    .iter()
    .map(|c| LegendEntry {
        caption: c.caption(),
        color: c.color(),
        kind: "node",
    })
    .collect();
    entries.push(LegendEntry {
        caption: "Block Reference",
        color: EDGE_COLOR,
        kind: "edge",
    });
    entries
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
