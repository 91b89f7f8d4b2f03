//! Synthetic ledger feed.
//!
//! [`LedgerFeed`] maintains a bounded, time-ordered window of synthetic blocks. It is
//! seeded with [`INITIAL_SEED`] blocks, grows by exactly one block per [`tick`], and
//! evicts from the front once the window exceeds [`WINDOW_CAPACITY`].
//!
//! Randomness is injected so tests can reproduce exact windows:
//!
//! ```
//! use bdag_viz::feed::{LedgerFeed, WINDOW_CAPACITY};
//!
//! let mut feed = LedgerFeed::seeded(7);
//! feed.seed_at(20, 1_700_000_000_000);
//! for i in 0..40 {
//!     feed.tick_at(1_700_000_000_000 + i * 5_000);
//! }
//! assert_eq!(feed.len(), WINDOW_CAPACITY);
//! ```
//!
//! [`tick`]: LedgerFeed::tick

use crate::dag::{ColorCategory, DagNode, DagNodeBuilder, SURFACE_HEIGHT, SURFACE_WIDTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Maximum number of blocks held in the window.
pub const WINDOW_CAPACITY: usize = 50;

/// Number of blocks produced by a reset.
pub const INITIAL_SEED: usize = 20;

/// Spacing between the timestamps of seeded blocks.
pub const SEED_SPACING_MS: i64 = 60_000;

/// Period between two ticks of the live feed.
pub const TICK_INTERVAL_MS: u64 = 5_000;

const MIN_SIZE: f64 = 10.0;
const MAX_SIZE: f64 = 30.0;
const MAX_TRANSACTIONS: u32 = 100;
const MAX_GAS_USED: u64 = 1_000_000;
const MAX_DIFFICULTY: u64 = 1_000_000_000;

/// Play/pause state of a periodic feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    /// Ticks append blocks.
    #[default]
    Live,
    /// Ticks are suppressed.
    Paused,
}

impl PlayState {
    /// Returns the opposite state.
    pub fn toggled(self) -> Self {
        match self {
            PlayState::Live => PlayState::Paused,
            PlayState::Paused => PlayState::Live,
        }
    }

    pub fn is_live(self) -> bool {
        self == PlayState::Live
    }

    /// Badge caption shown next to the graph.
    pub fn badge(self) -> &'static str {
        match self {
            PlayState::Live => "Live",
            PlayState::Paused => "Paused",
        }
    }
}

/// What a successful tick did to the window.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// The block appended at the tail.
    pub appended: DagNode,
    /// Blocks dropped from the front to respect the capacity.
    pub evicted: Vec<DagNode>,
}

/// A bounded window of synthetic blocks.
#[derive(Debug)]
pub struct LedgerFeed<R = StdRng> {
    window: Vec<DagNode>,
    capacity: usize,
    next_height: u64,
    state: PlayState,
    rng: R,
}

impl LedgerFeed<StdRng> {
    /// Creates an empty feed whose randomness is fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates an empty feed seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<R: Rng> LedgerFeed<R> {
    /// Creates an empty, live feed over the given random source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            window: Vec::with_capacity(WINDOW_CAPACITY + 1),
            capacity: WINDOW_CAPACITY,
            next_height: 0,
            state: PlayState::Live,
            rng,
        }
    }

    /// Replaces the window with `count` freshly generated blocks stamped relative to now.
    pub fn seed(&mut self, count: usize) {
        self.seed_at(count, chrono::Utc::now().timestamp_millis());
    }

    /// Replaces the window with `count` freshly generated blocks.
    ///
    /// Block `i` of `count` is stamped `now_ms - (count - i) * SEED_SPACING_MS`, so lower
    /// heights are always older. The newest block gets [`ColorCategory::Latest`]. Heights
    /// restart at zero. If `count` exceeds the capacity only the newest blocks are kept.
    pub fn seed_at(&mut self, count: usize, now_ms: i64) {
        self.window.clear();
        for i in 0..count {
            let color = if i + 1 == count {
                ColorCategory::Latest
            } else {
                self.palette_color()
            };
            let ts = now_ms - (count - i) as i64 * SEED_SPACING_MS;
            let node = self.generate(i as u64, color, ts);
            self.window.push(node);
        }
        self.next_height = count as u64;
        let excess = self.window.len().saturating_sub(self.capacity);
        self.window.drain(..excess);
    }

    /// Appends one block stamped with the current time. See [`tick_at`](Self::tick_at).
    pub fn tick(&mut self) -> Option<TickOutcome> {
        self.tick_at(chrono::Utc::now().timestamp_millis())
    }

    /// Appends one block stamped `now_ms` and evicts from the front past the capacity.
    ///
    /// Returns `None` without touching the window while paused. The previous newest block
    /// gives up the latest color for a palette color.
    pub fn tick_at(&mut self, now_ms: i64) -> Option<TickOutcome> {
        if !self.state.is_live() {
            return None;
        }

        let demoted = self.palette_color();
        if let Some(prev) = self.window.last_mut() {
            prev.color = demoted;
        }

        let height = self.next_height;
        self.next_height += 1;
        let node = self.generate(height, ColorCategory::Latest, now_ms);
        self.window.push(node.clone());

        let excess = self.window.len().saturating_sub(self.capacity);
        let evicted: Vec<DagNode> = self.window.drain(..excess).collect();

        log::debug!(
            "Appended {} ({} txs), evicted {}, window {}",
            node.id,
            node.transactions,
            evicted.len(),
            self.window.len()
        );

        Some(TickOutcome {
            appended: node,
            evicted,
        })
    }

    /// Replaces the window with [`INITIAL_SEED`] fresh blocks stamped relative to now.
    pub fn reset(&mut self) {
        self.reset_at(chrono::Utc::now().timestamp_millis());
    }

    pub fn reset_at(&mut self, now_ms: i64) {
        self.seed_at(INITIAL_SEED, now_ms);
        log::info!("Ledger feed reset to {} blocks", self.window.len());
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn set_state(&mut self, state: PlayState) {
        self.state = state;
    }

    /// Flips between live and paused and returns the new state.
    pub fn toggle(&mut self) -> PlayState {
        self.state = self.state.toggled();
        self.state
    }

    /// The current window, oldest first.
    pub fn nodes(&self) -> &[DagNode] {
        &self.window
    }

    /// A cloned copy of the current window.
    pub fn snapshot(&self) -> Vec<DagNode> {
        self.window.clone()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: &str) -> Option<&DagNode> {
        self.window.iter().find(|n| n.id == id)
    }

    /// The newest block.
    pub fn latest(&self) -> Option<&DagNode> {
        self.window.last()
    }

    /// Height the next appended block will receive.
    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    fn palette_color(&mut self) -> ColorCategory {
        ColorCategory::PALETTE[self.rng.random_range(0..ColorCategory::PALETTE.len())]
    }

    fn generate(&mut self, height: u64, color: ColorCategory, ts_ms: i64) -> DagNode {
        DagNodeBuilder::new(height)
            .position(
                self.rng.random_range(0.0..SURFACE_WIDTH),
                self.rng.random_range(0.0..SURFACE_HEIGHT),
            )
            .size(self.rng.random_range(MIN_SIZE..MAX_SIZE))
            .color(color)
            .transactions(self.rng.random_range(1..=MAX_TRANSACTIONS))
            .timestamp(ts_ms)
            .gas_used(self.rng.random_range(0..MAX_GAS_USED))
            .difficulty(self.rng.random_range(0..MAX_DIFFICULTY))
            .build()
    }
}
