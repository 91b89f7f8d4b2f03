//! The DAG visualizer: feed, derived references, view state and the play/pause machine.
//!
//! [`Visualizer`] is the synchronous core. Every operation takes `now_ms` explicitly in
//! its `*_at` form so tests can pin time; the plain forms read the wall clock.
//! [`VisualizerHandle`] shares one visualizer between the HTTP handlers and the periodic
//! ledger tick, and publishes a [`DagEvent`] plus a fresh frame after each change.
//!
//! ```
//! use bdag_viz::Visualizer;
//!
//! let now = 1_700_000_000_000;
//! let mut viz = Visualizer::seeded(1, now);
//! for i in 1..=5 {
//!     viz.tick_at(now + i * 5_000);
//! }
//! assert_eq!(viz.snapshot().nodes.len(), 25);
//! assert!(viz.snapshot().dangling_edges().is_empty());
//! ```

use crate::dag::{DagEdge, DagNode, DagView, SURFACE_HEIGHT, SURFACE_WIDTH};
use crate::events::{DagEvent, EventBroadcaster};
use crate::feed::{LedgerFeed, PlayState, TickOutcome, INITIAL_SEED};
use crate::layout::derive_edges;
use crate::panels::{BlockDetails, NetworkCard};
use crate::render::{draw, hit_test, NodeFilter, ViewState};
use crate::surface::{DisplayList, Point, Surface, SvgSurface};
use crate::timer::PeriodicTask;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Feed, references and view state for one dashboard.
#[derive(Debug)]
pub struct Visualizer {
    feed: LedgerFeed,
    edges: Vec<DagEdge>,
    view: ViewState,
    layout_rng: StdRng,
}

impl Visualizer {
    /// Wraps an existing feed and derives its references.
    pub fn new(feed: LedgerFeed, layout_rng: StdRng) -> Self {
        let mut viz = Self {
            feed,
            edges: Vec::new(),
            view: ViewState::default(),
            layout_rng,
        };
        viz.rebuild_edges();
        viz
    }

    /// A visualizer seeded with [`INITIAL_SEED`] blocks, fully determined by `seed`.
    pub fn seeded(seed: u64, now_ms: i64) -> Self {
        let mut feed = LedgerFeed::seeded(seed);
        feed.seed_at(INITIAL_SEED, now_ms);
        Self::new(feed, StdRng::seed_from_u64(seed.wrapping_add(1)))
    }

    /// A visualizer seeded with [`INITIAL_SEED`] blocks from OS entropy.
    pub fn from_os_rng() -> Self {
        let mut feed = LedgerFeed::from_os_rng();
        feed.seed_at(INITIAL_SEED, now_ms());
        Self::new(feed, StdRng::from_os_rng())
    }

    pub fn tick(&mut self) -> Option<TickOutcome> {
        self.tick_at(now_ms())
    }

    /// Advances the feed by one block and rebuilds references.
    ///
    /// A no-op returning `None` while paused. If the selected block is evicted the
    /// selection is cleared.
    pub fn tick_at(&mut self, now_ms: i64) -> Option<TickOutcome> {
        let outcome = self.feed.tick_at(now_ms)?;
        if let Some(selected) = &self.view.selected {
            if outcome.evicted.iter().any(|n| &n.id == selected) {
                self.view.selected = None;
            }
        }
        self.rebuild_edges();
        Some(outcome)
    }

    pub fn play_state(&self) -> PlayState {
        self.feed.state()
    }

    pub fn toggle_play(&mut self) -> PlayState {
        self.feed.toggle()
    }

    pub fn play(&mut self) {
        self.feed.set_state(PlayState::Live);
    }

    pub fn pause(&mut self) {
        self.feed.set_state(PlayState::Paused);
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.view.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.view.zoom_out()
    }

    pub fn set_filter(&mut self, filter: NodeFilter) {
        self.view.filter = filter;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.search = search.into();
    }

    /// Handles a pointer click at surface coordinates `(x, y)`.
    ///
    /// The point is mapped through the inverse zoom, then the first block containing it
    /// becomes the selection. Clicking empty space clears the selection.
    pub fn click(&mut self, x: f64, y: f64) -> Option<&DagNode> {
        let point = self.view.to_model(Point::new(x, y));
        let hit = hit_test(point, self.feed.nodes()).map(|n| n.id.clone());
        self.view.selected = hit;
        self.selected_node()
    }

    pub fn reset_view(&mut self) {
        self.reset_view_at(now_ms());
    }

    /// Restores zoom to 1.0, clears the selection and regenerates the feed.
    pub fn reset_view_at(&mut self, now_ms: i64) {
        self.view.reset();
        self.feed.reset_at(now_ms);
        self.rebuild_edges();
    }

    /// Paints the current state onto `surface`.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        self.render_at(surface, now_ms());
    }

    pub fn render_at<S: Surface + ?Sized>(&self, surface: &mut S, now_ms: i64) {
        draw(surface, self.feed.nodes(), &self.edges, &self.view, now_ms);
    }

    pub fn frame(&self) -> DisplayList {
        self.frame_at(now_ms())
    }

    pub fn frame_at(&self, now_ms: i64) -> DisplayList {
        let mut list = DisplayList::new();
        self.render_at(&mut list, now_ms);
        list
    }

    pub fn svg(&self) -> String {
        self.svg_at(now_ms())
    }

    pub fn svg_at(&self, now_ms: i64) -> String {
        let mut svg = SvgSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT);
        self.render_at(&mut svg, now_ms);
        svg.finish()
    }

    /// An owned snapshot of nodes, references and stats.
    pub fn snapshot(&self) -> DagView {
        DagView::new(self.feed.snapshot(), self.edges.clone())
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn feed(&self) -> &LedgerFeed {
        &self.feed
    }

    pub fn edges(&self) -> &[DagEdge] {
        &self.edges
    }

    pub fn selected_node(&self) -> Option<&DagNode> {
        self.view
            .selected
            .as_deref()
            .and_then(|id| self.feed.get(id))
    }

    pub fn details(&self) -> Option<BlockDetails> {
        self.selected_node().map(BlockDetails::from)
    }

    pub fn network_card(&self) -> NetworkCard {
        NetworkCard::from(&self.snapshot().stats)
    }

    fn rebuild_edges(&mut self) {
        self.edges = derive_edges(self.feed.nodes(), &mut self.layout_rng);
    }
}

/// Shared, event-publishing access to a [`Visualizer`] plus its periodic ledger tick.
///
/// Clones share the same visualizer, broadcaster and tick task.
#[derive(Debug, Clone)]
pub struct VisualizerHandle {
    inner: Arc<RwLock<Visualizer>>,
    broadcaster: EventBroadcaster,
    ticker: PeriodicTask,
}

impl VisualizerHandle {
    pub fn new(viz: Visualizer, broadcaster: EventBroadcaster) -> Self {
        Self {
            inner: Arc::new(RwLock::new(viz)),
            broadcaster,
            ticker: PeriodicTask::new(),
        }
    }

    /// Starts ticking the feed every `period`. Ticks while paused do nothing.
    pub fn start(&self, period: Duration) {
        let inner = Arc::clone(&self.inner);
        let broadcaster = self.broadcaster.clone();
        self.ticker.start("ledger tick", period, move || {
            let inner = Arc::clone(&inner);
            let broadcaster = broadcaster.clone();
            async move {
                tick_and_publish(&inner, &broadcaster).await;
            }
        });
        log::info!("Ledger feed started ({:?} period)", period);
    }

    /// Stops the periodic tick. Returns `true` if it was running.
    pub fn stop(&self) -> bool {
        let stopped = self.ticker.stop();
        if stopped {
            log::info!("Ledger feed stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Runs one tick immediately and publishes the outcome.
    pub async fn tick(&self) -> Option<TickOutcome> {
        tick_and_publish(&self.inner, &self.broadcaster).await
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, Visualizer> {
        self.inner.read().await
    }

    pub async fn toggle_play(&self) -> PlayState {
        let state = self.inner.write().await.toggle_play();
        self.broadcaster
            .broadcast(DagEvent::PlayStateChanged { state })
            .await;
        state
    }

    pub async fn set_play_state(&self, state: PlayState) -> PlayState {
        {
            let mut viz = self.inner.write().await;
            match state {
                PlayState::Live => viz.play(),
                PlayState::Paused => viz.pause(),
            }
        }
        self.broadcaster
            .broadcast(DagEvent::PlayStateChanged { state })
            .await;
        state
    }

    pub async fn zoom_in(&self) -> f64 {
        self.update_view(|viz| viz.zoom_in()).await
    }

    pub async fn zoom_out(&self) -> f64 {
        self.update_view(|viz| viz.zoom_out()).await
    }

    pub async fn set_filter(&self, filter: NodeFilter) {
        self.update_view(|viz| viz.set_filter(filter)).await
    }

    pub async fn set_search(&self, search: String) {
        self.update_view(|viz| viz.set_search(search)).await
    }

    pub async fn click(&self, x: f64, y: f64) -> Option<BlockDetails> {
        self.update_view(|viz| viz.click(x, y).map(BlockDetails::from))
            .await
    }

    pub async fn reset_view(&self) -> DagView {
        let (view, node_count, edge_count) = {
            let mut viz = self.inner.write().await;
            viz.reset_view();
            (viz.snapshot(), viz.feed().len(), viz.edges().len())
        };
        self.broadcaster
            .broadcast(DagEvent::Reset { node_count })
            .await;
        self.broadcaster
            .broadcast(DagEvent::EdgesRebuilt { edge_count })
            .await;
        self.publish_view().await;
        view
    }

    pub async fn snapshot(&self) -> DagView {
        self.inner.read().await.snapshot()
    }

    pub async fn frame(&self) -> DisplayList {
        self.inner.read().await.frame()
    }

    pub async fn svg(&self) -> String {
        self.inner.read().await.svg()
    }

    pub async fn view(&self) -> ViewState {
        self.inner.read().await.view().clone()
    }

    pub async fn play_state(&self) -> PlayState {
        self.inner.read().await.play_state()
    }

    pub async fn details(&self) -> Option<BlockDetails> {
        self.inner.read().await.details()
    }

    pub async fn network_card(&self) -> NetworkCard {
        self.inner.read().await.network_card()
    }

    async fn update_view<T>(&self, f: impl FnOnce(&mut Visualizer) -> T) -> T {
        let out = {
            let mut viz = self.inner.write().await;
            f(&mut *viz)
        };
        self.publish_view().await;
        out
    }

    async fn publish_view(&self) {
        let (view, frame) = {
            let viz = self.inner.read().await;
            (viz.view().clone(), viz.frame())
        };
        self.broadcaster
            .broadcast(DagEvent::ViewChanged { view })
            .await;
        self.broadcaster.frame(frame).await;
    }
}

async fn tick_and_publish(
    inner: &RwLock<Visualizer>,
    broadcaster: &EventBroadcaster,
) -> Option<TickOutcome> {
    // Append and truncate under one guard so readers never see a half-applied tick.
    let (outcome, edge_count, frame) = {
        let mut viz = inner.write().await;
        let outcome = viz.tick()?;
        (outcome, viz.edges().len(), viz.frame())
    };

    broadcaster
        .broadcast(DagEvent::block_added(outcome.appended.clone()))
        .await;
    if !outcome.evicted.is_empty() {
        let ids = outcome.evicted.iter().map(|n| n.id.clone()).collect();
        broadcaster
            .broadcast(DagEvent::BlocksEvicted { ids })
            .await;
    }
    broadcaster
        .broadcast(DagEvent::EdgesRebuilt { edge_count })
        .await;
    broadcaster.frame(frame).await;

    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::ColorCategory;
    use crate::feed::WINDOW_CAPACITY;
    use crate::render::{MAX_ZOOM, MIN_ZOOM};
    use std::collections::HashSet;

    const NOW: i64 = 1_700_000_000_000;

    fn assert_no_dangling(viz: &Visualizer) {
        let ids: HashSet<&str> = viz.feed().nodes().iter().map(|n| n.id.as_str()).collect();
        for e in viz.edges() {
            assert!(ids.contains(e.source.as_str()), "dangling source {}", e.source);
            assert!(ids.contains(e.target.as_str()), "dangling target {}", e.target);
        }
    }

    #[test]
    fn test_seeded_visualizer() {
        let viz = Visualizer::seeded(7, NOW);
        assert_eq!(viz.feed().len(), 20);
        assert_eq!(viz.play_state(), PlayState::Live);
        assert_eq!(viz.view().zoom, 1.0);
        assert!(!viz.edges().is_empty());
        assert_no_dangling(&viz);
    }

    #[test]
    fn test_edges_valid_after_every_tick() {
        let mut viz = Visualizer::seeded(3, NOW);
        for i in 1..=80 {
            viz.tick_at(NOW + i * 5_000);
            assert!(viz.feed().len() <= WINDOW_CAPACITY);
            assert!(viz.edges().len() <= 3 * viz.feed().len());
            assert_no_dangling(&viz);
        }
        assert_eq!(viz.feed().len(), WINDOW_CAPACITY);
    }

    #[test]
    fn test_five_ticks_scenario() {
        let mut viz = Visualizer::seeded(11, NOW);
        let first = viz.feed().nodes()[0].id.clone();
        for i in 1..=5 {
            assert!(viz.tick_at(NOW + i * 5_000).is_some());
        }
        assert_eq!(viz.feed().len(), 25);
        assert_eq!(viz.feed().latest().unwrap().color, ColorCategory::Latest);
        assert!(viz.feed().get(&first).is_some());
    }

    #[test]
    fn test_forty_ticks_scenario() {
        let mut viz = Visualizer::seeded(12, NOW);
        let originals: Vec<String> = viz.feed().nodes().iter().map(|n| n.id.clone()).collect();
        for i in 1..=40 {
            viz.tick_at(NOW + i * 5_000);
        }
        assert_eq!(viz.feed().len(), 50);
        assert!(originals[..10].iter().all(|id| viz.feed().get(id).is_none()));
        assert!(viz.edges().iter().all(|e| !originals[..10].contains(&e.source)));
    }

    #[test]
    fn test_paused_suppresses_ticks_but_view_still_changes() {
        let mut viz = Visualizer::seeded(5, NOW);
        assert_eq!(viz.toggle_play(), PlayState::Paused);
        let edges_before = viz.edges().to_vec();

        assert!(viz.tick_at(NOW + 5_000).is_none());
        assert_eq!(viz.feed().len(), 20);
        assert_eq!(viz.edges(), edges_before.as_slice());

        viz.zoom_in();
        viz.set_filter(NodeFilter::HighTx);
        let frame = viz.frame_at(NOW);
        assert!(frame
            .commands
            .contains(&crate::surface::DrawCommand::Scale { factor: 1.2 }));

        assert_eq!(viz.toggle_play(), PlayState::Live);
        assert!(viz.tick_at(NOW + 10_000).is_some());
    }

    #[test]
    fn test_click_selects_and_clears() {
        let mut viz = Visualizer::seeded(21, NOW);
        let target = viz.feed().nodes()[4].clone();

        viz.zoom_in();
        let zoom = viz.view().zoom;
        let hit = viz.click(target.x * zoom, target.y * zoom).map(|n| n.id.clone());
        assert!(hit.is_some());
        assert!(viz.details().is_some());
        assert_eq!(viz.view().selected, hit);

        // Far outside the surface never hits anything.
        assert!(viz.click(-10_000.0, -10_000.0).is_none());
        assert!(viz.view().selected.is_none());
        assert!(viz.details().is_none());
    }

    #[test]
    fn test_selection_cleared_on_eviction() {
        let mut viz = Visualizer::seeded(2, NOW);
        let oldest = viz.feed().nodes()[0].clone();
        viz.click(oldest.x, oldest.y);
        let selected = viz.view().selected.clone().unwrap();

        for i in 1..=40 {
            viz.tick_at(NOW + i);
        }
        assert!(viz.feed().get(&selected).is_none());
        assert!(viz.view().selected.is_none());
    }

    #[test]
    fn test_reset_scenario() {
        let mut viz = Visualizer::seeded(8, NOW);
        for i in 1..=45 {
            viz.tick_at(NOW + i * 5_000);
        }
        viz.zoom_in();
        viz.zoom_in();
        let n = viz.feed().nodes()[10].clone();
        let zoom = viz.view().zoom;
        viz.click(n.x * zoom, n.y * zoom);
        assert!(viz.view().selected.is_some());

        viz.reset_view_at(NOW + 300_000);
        assert_eq!(viz.feed().len(), 20);
        assert_eq!(viz.view().zoom, 1.0);
        assert!(viz.view().selected.is_none());
        assert_no_dangling(&viz);
    }

    #[test]
    fn test_zoom_bounds_through_visualizer() {
        let mut viz = Visualizer::seeded(1, NOW);
        for _ in 0..15 {
            assert!(viz.zoom_in() <= MAX_ZOOM);
        }
        for _ in 0..30 {
            assert!(viz.zoom_out() >= MIN_ZOOM);
        }
    }

    #[test]
    fn test_svg_and_network_card() {
        let viz = Visualizer::seeded(4, NOW);
        let svg = viz.svg_at(NOW);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<line").count(), viz.edges().len());

        let card = viz.network_card();
        assert_eq!(card.total_blocks, 20);
        assert_eq!(card.connections, viz.edges().len());
    }

    #[tokio::test]
    async fn test_handle_tick_publishes_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        let handle = VisualizerHandle::new(Visualizer::seeded(6, NOW), broadcaster);

        let outcome = handle.tick().await.expect("live feed ticks");
        assert_eq!(handle.snapshot().await.nodes.len(), 21);

        match rx.recv().await.unwrap() {
            DagEvent::BlockAdded { node } => assert_eq!(node.id, outcome.appended.id),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            DagEvent::EdgesRebuilt { .. }
        ));
        assert!(matches!(rx.recv().await.unwrap(), DagEvent::Frame { .. }));
    }

    #[tokio::test]
    async fn test_handle_paused_tick_publishes_nothing() {
        let broadcaster = EventBroadcaster::new();
        let handle = VisualizerHandle::new(Visualizer::seeded(6, NOW), broadcaster.clone());

        assert_eq!(handle.toggle_play().await, PlayState::Paused);
        let before = broadcaster.event_count().await;
        assert!(handle.tick().await.is_none());
        assert_eq!(broadcaster.event_count().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_lifecycle() {
        let handle = VisualizerHandle::new(Visualizer::seeded(9, NOW), EventBroadcaster::new());
        handle.start(Duration::from_secs(5));
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(handle.snapshot().await.nodes.len(), 23);

        assert!(handle.stop());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.snapshot().await.nodes.len(), 23);
    }

    #[tokio::test]
    async fn test_handle_reset() {
        let handle = VisualizerHandle::new(Visualizer::seeded(10, NOW), EventBroadcaster::new());
        for _ in 0..10 {
            handle.tick().await;
        }
        handle.zoom_in().await;
        let view = handle.reset_view().await;
        assert_eq!(view.nodes.len(), 20);
        assert_eq!(handle.read().await.view().zoom, 1.0);
    }
}
