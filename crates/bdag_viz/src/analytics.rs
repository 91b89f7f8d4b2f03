//! Network analytics panel: a randomly refreshed snapshot plus static chart series.

use crate::events::EventBroadcaster;
use crate::timer::PeriodicTask;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default refresh period of the analytics snapshot.
pub const ANALYTICS_INTERVAL_MS: u64 = 3_000;

/// Headline network figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub tps: u32,
    pub block_height: u64,
    /// Gas usage in percent.
    pub gas_usage: u32,
    pub mempool_size: u32,
    pub active_nodes: u32,
    pub total_supply: String,
    pub market_cap: String,
    /// Seconds.
    pub avg_block_time: f64,
}

impl AnalyticsSnapshot {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            tps: rng.random_range(500..1500),
            block_height: rng.random_range(500_000..600_000),
            gas_usage: rng.random_range(20..100),
            mempool_size: rng.random_range(1_000..6_000),
            active_nodes: rng.random_range(100..150),
            total_supply: "21000000".to_string(),
            market_cap: "$1.2B".to_string(),
            avg_block_time: rng.random_range(1.0..3.0),
        }
    }
}

/// One point of the 24-hour throughput chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: &'static str,
    pub tps: u32,
    pub blocks: u32,
}

/// One slice of the gas distribution chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GasShare {
    pub name: &'static str,
    pub value: u32,
    pub color: &'static str,
}

pub const CHART_SERIES: [ChartPoint; 6] = [
    ChartPoint {
        time: "00:00",
        tps: 650,
        blocks: 45,
    },
    ChartPoint {
        time: "04:00",
        tps: 720,
        blocks: 52,
    },
    ChartPoint {
        time: "08:00",
        tps: 890,
        blocks: 61,
    },
    ChartPoint {
        time: "12:00",
        tps: 1100,
        blocks: 78,
    },
    ChartPoint {
        time: "16:00",
        tps: 950,
        blocks: 65,
    },
    ChartPoint {
        time: "20:00",
        tps: 820,
        blocks: 58,
    },
];

/// Gas usage by category in percent; sums to 100.
pub const GAS_DISTRIBUTION: [GasShare; 4] = [
    GasShare {
        name: "Contract Calls",
        value: 45,
        color: "#8b5cf6",
    },
    GasShare {
        name: "Transfers",
        value: 30,
        color: "#06b6d4",
    },
    GasShare {
        name: "DEX Swaps",
        value: 15,
        color: "#10b981",
    },
    GasShare {
        name: "NFT Mints",
        value: 10,
        color: "#f59e0b",
    },
];

/// Everything the analytics panel shows, as served by `GET /api/analytics`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub live: bool,
    pub stats: AnalyticsSnapshot,
    pub chart: &'static [ChartPoint],
    pub gas: &'static [GasShare],
}

/// The current snapshot and whether it is being refreshed.
#[derive(Debug)]
pub struct AnalyticsFeed<R = StdRng> {
    snapshot: AnalyticsSnapshot,
    live: bool,
    rng: R,
}

impl AnalyticsFeed<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<R: Rng> AnalyticsFeed<R> {
    pub fn with_rng(mut rng: R) -> Self {
        let snapshot = AnalyticsSnapshot::generate(&mut rng);
        Self {
            snapshot,
            live: true,
            rng,
        }
    }

    /// Replaces the snapshot. Returns `false` and leaves it untouched while paused.
    pub fn refresh(&mut self) -> bool {
        if !self.live {
            return false;
        }
        self.snapshot = AnalyticsSnapshot::generate(&mut self.rng);
        true
    }

    pub fn toggle(&mut self) -> bool {
        self.live = !self.live;
        self.live
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn snapshot(&self) -> &AnalyticsSnapshot {
        &self.snapshot
    }

    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport {
            live: self.live,
            stats: self.snapshot.clone(),
            chart: &CHART_SERIES,
            gas: &GAS_DISTRIBUTION,
        }
    }
}

/// Shared [`AnalyticsFeed`] with its periodic refresh.
#[derive(Debug, Clone)]
pub struct AnalyticsHandle {
    inner: Arc<RwLock<AnalyticsFeed>>,
    broadcaster: EventBroadcaster,
    refresher: PeriodicTask,
}

impl AnalyticsHandle {
    pub fn new(feed: AnalyticsFeed, broadcaster: EventBroadcaster) -> Self {
        Self {
            inner: Arc::new(RwLock::new(feed)),
            broadcaster,
            refresher: PeriodicTask::new(),
        }
    }

    pub fn start(&self, period: Duration) {
        let inner = Arc::clone(&self.inner);
        let broadcaster = self.broadcaster.clone();
        self.refresher.start("analytics refresh", period, move || {
            let inner = Arc::clone(&inner);
            let broadcaster = broadcaster.clone();
            async move {
                refresh_and_publish(&inner, &broadcaster).await;
            }
        });
    }

    pub fn stop(&self) -> bool {
        self.refresher.stop()
    }

    pub fn is_running(&self) -> bool {
        self.refresher.is_running()
    }

    pub async fn refresh(&self) -> bool {
        refresh_and_publish(&self.inner, &self.broadcaster).await
    }

    pub async fn toggle(&self) -> bool {
        let live = self.inner.write().await.toggle();
        log::debug!("Analytics {}", if live { "resumed" } else { "paused" });
        live
    }

    pub async fn report(&self) -> AnalyticsReport {
        self.inner.read().await.report()
    }
}

async fn refresh_and_publish(
    inner: &RwLock<AnalyticsFeed>,
    broadcaster: &EventBroadcaster,
) -> bool {
    let stats = {
        let mut feed = inner.write().await;
        if !feed.refresh() {
            return false;
        }
        feed.snapshot().clone()
    };
    match serde_json::to_value(&stats) {
        Ok(value) => {
            broadcaster.stats_updated(value).await;
        }
        Err(e) => log::warn!("Failed to serialize analytics snapshot: {}", e),
    }
    true
}
