//! HTTP and WebSocket server for the BlockDAG dashboard.
//!
//! [`VizServer`] owns an [`ApiState`], starts the periodic ledger tick and analytics
//! refresh, and serves the API with optional CORS and request tracing.
//!
//! # Examples
//!
//! ```rust,ignore
//! use bdag_viz::{VizConfig, VizServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VizConfig {
//!         rng_seed: Some(42),
//!         api_base_url: None,
//!         ..VizConfig::development()
//!     };
//!
//!     let shutdown = async {
//!         tokio::signal::ctrl_c().await.ok();
//!     };
//!
//!     VizServer::new(config).start_with_shutdown(shutdown).await?;
//!     Ok(())
//! }
//! ```

use crate::analytics::{AnalyticsFeed, AnalyticsHandle, ANALYTICS_INTERVAL_MS};
use crate::api::{create_router, ApiState};
use crate::client::{
    ClientConfig, MockBdagClient, NetworkDataSource, OfflineDataSource, SyntheticData,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS,
};
use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::feed::TICK_INTERVAL_MS;
use crate::visualizer::{Visualizer, VisualizerHandle};

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct VizConfig {
    /// The host address to bind to, e.g. `"127.0.0.1"` or `"0.0.0.0"`.
    pub host: String,

    pub port: u16,

    /// Allow cross-origin requests from any origin.
    pub enable_cors: bool,

    /// Log every HTTP request through `TraceLayer`.
    pub enable_tracing: bool,

    /// Period of the ledger tick.
    pub tick_interval_ms: u64,

    /// Period of the analytics refresh.
    pub analytics_interval_ms: u64,

    /// Seed for every random source. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,

    /// Explorer contacted by the network panels. `None` keeps them offline.
    pub api_base_url: Option<String>,

    pub api_timeout_ms: u64,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            enable_cors: true,
            enable_tracing: true,
            tick_interval_ms: TICK_INTERVAL_MS,
            analytics_interval_ms: ANALYTICS_INTERVAL_MS,
            rng_seed: None,
            api_base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl VizConfig {
    /// Binds on all interfaces with CORS and tracing on.
    pub fn development() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Loopback only, no CORS, no request tracing.
    pub fn production() -> Self {
        Self {
            enable_cors: false,
            enable_tracing: false,
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))
    }

    /// Rejects zero periods, which `tokio::time::interval_at` panics on, and bad addresses.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick interval must be positive".to_string()));
        }
        if self.analytics_interval_ms == 0 {
            return Err(Error::Config(
                "analytics interval must be positive".to_string(),
            ));
        }
        self.socket_addr().map(|_| ())
    }

    /// Builds the shared state this configuration describes.
    pub fn build_state(&self) -> ApiState {
        let broadcaster = EventBroadcaster::new();
        let now = chrono::Utc::now().timestamp_millis();

        let (viz, analytics, synthetic) = match self.rng_seed {
            Some(seed) => (
                Visualizer::seeded(seed, now),
                AnalyticsFeed::seeded(seed.wrapping_add(2)),
                SyntheticData::seeded(seed.wrapping_add(3)),
            ),
            None => (
                Visualizer::from_os_rng(),
                AnalyticsFeed::from_os_rng(),
                SyntheticData::from_os_rng(),
            ),
        };

        let network: Arc<dyn NetworkDataSource> = match &self.api_base_url {
            Some(base_url) => Arc::new(MockBdagClient::new(
                ClientConfig {
                    base_url: base_url.clone(),
                    timeout_ms: self.api_timeout_ms,
                },
                synthetic,
            )),
            None => Arc::new(OfflineDataSource::new(synthetic)),
        };

        ApiState::new(
            VisualizerHandle::new(viz, broadcaster.clone()),
            AnalyticsHandle::new(analytics, broadcaster.clone()),
            network,
            broadcaster,
        )
    }
}

/// The dashboard server.
pub struct VizServer {
    config: VizConfig,
    state: ApiState,
}

impl VizServer {
    pub fn new(config: VizConfig) -> Self {
        let state = config.build_state();
        Self { config, state }
    }

    /// Serves an existing state, e.g. one shared with other tasks.
    pub fn with_state(config: VizConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// The router with the configured middleware applied.
    pub fn router(&self) -> Router {
        let mut app = create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        if self.config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }

        app
    }

    /// Runs until the process is killed.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Runs until `shutdown_signal` resolves, then stops the periodic tasks.
    pub async fn start_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        let addr = self.config.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind: {}", e)))?;
        let local = listener.local_addr()?;

        log::info!("Starting BlockDAG dashboard on http://{}", local);
        log::info!("  - Web UI:    http://{}/", local);
        log::info!("  - API:       http://{}/api/dag", local);
        log::info!("  - WebSocket: ws://{}/ws/updates", local);

        self.state
            .viz
            .start(Duration::from_millis(self.config.tick_interval_ms));
        self.state
            .analytics
            .start(Duration::from_millis(self.config.analytics_interval_ms));

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| Error::Server(format!("Server error: {}", e)));

        self.state.viz.stop();
        self.state.analytics.stop();
        log::info!("Server shutdown complete");
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> VizConfig {
        VizConfig {
            port: 0,
            rng_seed: Some(42),
            api_base_url: None,
            ..VizConfig::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = VizConfig::default();
        assert_eq!(config.port, 8888);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_cors);
        assert!(config.enable_tracing);
        assert_eq!(config.tick_interval_ms, 5_000);
        assert_eq!(config.analytics_interval_ms, 3_000);
        assert!(config.rng_seed.is_none());
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://primordial.bdagscan.com")
        );
        assert_eq!(config.api_timeout_ms, 10_000);
    }

    #[test]
    fn test_config_development() {
        let config = VizConfig::development();
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.enable_cors);
        assert!(config.enable_tracing);
    }

    #[test]
    fn test_config_production() {
        let config = VizConfig::production();
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.enable_cors);
        assert!(!config.enable_tracing);
    }

    #[test]
    fn test_config_socket_addr() {
        let addr = VizConfig::development().socket_addr().unwrap();
        assert_eq!(addr.port(), 8888);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn test_config_socket_addr_invalid() {
        let config = VizConfig {
            host: "not-a-valid-ip".to_string(),
            ..VizConfig::default()
        };
        let err = config.socket_addr().unwrap_err();
        assert!(format!("{}", err).contains("Configuration"));
    }

    #[test]
    fn test_config_validate() {
        tokio_test::assert_ok!(VizConfig::default().validate());
        tokio_test::assert_ok!(VizConfig::production().validate());

        let config = VizConfig {
            tick_interval_ms: 0,
            ..VizConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = VizConfig {
            analytics_interval_ms: 0,
            ..VizConfig::default()
        };
        tokio_test::assert_err!(config.validate());
    }

    #[tokio::test]
    async fn test_seeded_state_is_reproducible() {
        let a = offline_config().build_state();
        let b = offline_config().build_state();

        let (va, vb) = (a.viz.snapshot().await, b.viz.snapshot().await);
        assert_eq!(va.nodes.len(), 20);
        assert_eq!(
            va.nodes.iter().map(|n| n.transactions).collect::<Vec<_>>(),
            vb.nodes.iter().map(|n| n.transactions).collect::<Vec<_>>()
        );
        assert_eq!(va.edges, vb.edges);
        assert_eq!(
            a.network.get_network_stats().await,
            b.network.get_network_stats().await
        );
    }

    #[tokio::test]
    async fn test_server_with_state() {
        let state = ApiState::offline(1);
        let server = VizServer::with_state(offline_config(), state.clone());
        assert_eq!(server.state().viz.snapshot().await.nodes.len(), 20);
        assert_eq!(server.config().port, 0);
    }

    #[tokio::test]
    async fn test_start_with_shutdown_stops_tasks() {
        let server = VizServer::new(offline_config());
        let state = server.state().clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(server.start_with_shutdown(async {
            rx.await.ok();
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.viz.is_running());
        assert!(state.analytics.is_running());

        tx.send(()).unwrap();
        running.await.unwrap().unwrap();
        assert!(!state.viz.is_running());
        assert!(!state.analytics.is_running());
    }

    #[tokio::test]
    async fn test_start_rejects_bad_config() {
        let config = VizConfig {
            tick_interval_ms: 0,
            ..offline_config()
        };
        let result = VizServer::new(config)
            .start_with_shutdown(async {})
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
