//! Network explorer data source.
//!
//! The dashboard's transaction, contract and wallet panels read through the
//! [`NetworkDataSource`] trait. [`MockBdagClient`] contacts the public explorer so the
//! request path is exercised, but the explorer serves HTML with no stable API; the body
//! is discarded and synthetic records are returned instead. Failures never reach the
//! caller: they are logged and replaced by empty lists or [`NetworkStats::fallback`].

use crate::error::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Public explorer of the primordial test network.
pub const DEFAULT_BASE_URL: &str = "https://primordial.bdagscan.com";

/// Per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    /// Block number with a leading `#`.
    pub block: String,
    pub events: String,
    pub age: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub fee: String,
}

impl Transaction {
    /// Whether `address` occurs, case-insensitively, in the sender or recipient.
    pub fn involves(&self, address: &str) -> bool {
        let needle = address.to_lowercase();
        self.from.to_lowercase().contains(&needle) || self.to.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: String,
    pub age: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub tps: u32,
    pub block_height: u64,
    pub gas_price: u32,
    pub active_nodes: u32,
    pub total_transactions: u64,
}

impl NetworkStats {
    /// Figures reported when the explorer cannot be reached.
    pub fn fallback() -> Self {
        Self {
            tps: 850,
            block_height: 797_519,
            gas_price: 20,
            active_nodes: 156,
            total_transactions: 883_125,
        }
    }
}

/// Where the dashboard's network panels get their data.
///
/// Every method is infallible from the caller's point of view.
#[async_trait]
pub trait NetworkDataSource: Send + Sync {
    async fn get_transactions(&self) -> Vec<Transaction>;

    async fn get_contracts(&self) -> Vec<Contract>;

    /// Recent transactions sent from or to `address`.
    async fn get_wallet_transactions(&self, address: &str) -> Vec<Transaction> {
        self.get_transactions()
            .await
            .into_iter()
            .filter(|tx| tx.involves(address))
            .collect()
    }

    async fn get_network_stats(&self) -> NetworkStats;
}

/// Random but plausible explorer records.
#[derive(Debug)]
pub struct SyntheticData {
    rng: Mutex<StdRng>,
}

impl SyntheticData {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        let mut guard = self.rng();
        let rng = &mut *guard;
        vec![
            Transaction {
                hash: format!("0x3eb{}bbf9c", hex8(rng)),
                block: format!("#{}", 797_519 - rng.random_range(0..100)),
                events: "Transfer".to_string(),
                age: format!("{} secs ago", rng.random_range(0..60)),
                from: format!("0xcF3{}A15D7", hex8(rng)),
                to: format!("0xbec{}D1429", hex8(rng)),
                amount: format!("{:.1} BDAG", rng.random_range(0.0..10.0)),
                fee: format!("0.00{} BDAG", rng.random_range(10..109)),
            },
            Transaction {
                hash: format!("0x8f2{}2afc4", hex8(rng)),
                block: format!("#{}", 797_518 - rng.random_range(0..100)),
                events: "Transfer".to_string(),
                age: format!("{} secs ago", rng.random_range(0..120)),
                from: format!("0x597{}7b71b", hex8(rng)),
                to: format!("0xDB9{}03a5d", hex8(rng)),
                amount: format!("{:.1} BDAG", rng.random_range(0.0..5.0)),
                fee: format!("0.00{} BDAG", rng.random_range(10..109)),
            },
        ]
    }

    pub fn contracts(&self) -> Vec<Contract> {
        let mut guard = self.rng();
        let rng = &mut *guard;
        vec![
            Contract {
                address: format!("0x9D3{}a13Ff", hex8(rng)),
                kind: "ERC1155".to_string(),
                owner: format!("0x9fA{}D3b4b", hex8(rng)),
                age: format!("{} hr ago", rng.random_range(0..24)),
                status: "Not Verified".to_string(),
                name: None,
            },
            Contract {
                address: format!("0x12C{}B2Ffa", hex8(rng)),
                kind: "ERC20".to_string(),
                owner: format!("0x9fA{}D3b4b", hex8(rng)),
                age: format!("{} hr ago", rng.random_range(0..48)),
                status: "Not Verified".to_string(),
                name: None,
            },
            Contract {
                address: format!("0xe3e{}b96bB", hex8(rng)),
                kind: "ERC20".to_string(),
                owner: format!("0x71b{}3e235", hex8(rng)),
                age: format!("{} hr ago", rng.random_range(0..72)),
                status: "Fully verified".to_string(),
                name: Some("MyToken".to_string()),
            },
        ]
    }

    pub fn network_stats(&self) -> NetworkStats {
        let mut guard = self.rng();
        let rng = &mut *guard;
        NetworkStats {
            tps: 750 + rng.random_range(0..200),
            block_height: 797_519 + rng.random_range(0..100),
            gas_price: 15 + rng.random_range(0..10),
            active_nodes: 140 + rng.random_range(0..20),
            total_transactions: 883_125 + rng.random_range(0..1_000),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn hex8(rng: &mut StdRng) -> String {
    format!("{:08x}", rng.random::<u32>())
}

/// A data source that never touches the network.
#[derive(Debug)]
pub struct OfflineDataSource {
    data: SyntheticData,
}

impl OfflineDataSource {
    pub fn new(data: SyntheticData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl NetworkDataSource for OfflineDataSource {
    async fn get_transactions(&self) -> Vec<Transaction> {
        self.data.transactions()
    }

    async fn get_contracts(&self) -> Vec<Contract> {
        self.data.contracts()
    }

    async fn get_network_stats(&self) -> NetworkStats {
        self.data.network_stats()
    }
}

/// Configuration for [`MockBdagClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explorer base URL, without a trailing slash.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Explorer client that confirms reachability and then serves synthetic records.
#[derive(Debug)]
pub struct MockBdagClient {
    config: ClientConfig,
    http: reqwest::Client,
    data: SyntheticData,
}

impl MockBdagClient {
    pub fn new(config: ClientConfig, data: SyntheticData) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .unwrap_or_default();
        Self { config, http, data }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Fetches `path` and throws the body away.
    async fn touch(&self, path: &str) -> Result<()> {
        let resp = self.http.get(self.url(path)).send().await?;
        let body = resp.text().await?;
        log::trace!("GET {} returned {} bytes", path, body.len());
        Ok(())
    }
}

#[async_trait]
impl NetworkDataSource for MockBdagClient {
    async fn get_transactions(&self) -> Vec<Transaction> {
        match self.touch("/tx?chain=EVM").await {
            Ok(()) => self.data.transactions(),
            Err(e) => {
                log::error!("Failed to fetch transactions: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_contracts(&self) -> Vec<Contract> {
        match self.touch("/contract?chain=EVM").await {
            Ok(()) => self.data.contracts(),
            Err(e) => {
                log::error!("Failed to fetch contracts: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_network_stats(&self) -> NetworkStats {
        match self.touch("/?chain=EVM").await {
            Ok(()) => self.data.network_stats(),
            Err(e) => {
                log::error!("Failed to fetch network stats: {}", e);
                NetworkStats::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::{routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_explorer(hits: Arc<AtomicUsize>) -> String {
        let page = move |headers: AxumHeaders| {
            let hits = Arc::clone(&hits);
            async move {
                assert_eq!(headers.get("accept").unwrap(), "application/json");
                hits.fetch_add(1, Ordering::SeqCst);
                "<html>explorer</html>"
            }
        };
        let app = Router::new()
            .route("/", get(page.clone()))
            .route("/tx", get(page.clone()))
            .route("/contract", get(page));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn unreachable_client() -> MockBdagClient {
        MockBdagClient::new(
            ClientConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                timeout_ms: 500,
            },
            SyntheticData::seeded(1),
        )
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://primordial.bdagscan.com");
        assert_eq!(config.timeout_ms, 10_000);
    }

    #[test]
    fn test_synthetic_transactions() {
        let data = SyntheticData::seeded(5);
        let txs = data.transactions();
        assert_eq!(txs.len(), 2);

        let first = &txs[0];
        assert!(first.hash.starts_with("0x3eb") && first.hash.ends_with("bbf9c"));
        assert_eq!(first.hash.len(), 5 + 8 + 5);
        assert!(first.from.starts_with("0xcF3"));
        assert!(first.to.ends_with("D1429"));
        assert!(first.amount.ends_with(" BDAG"));
        assert!(first.fee.starts_with("0.00"));
        let block: u64 = first.block.trim_start_matches('#').parse().unwrap();
        assert!((797_420..=797_519).contains(&block));

        assert!(txs[1].hash.starts_with("0x8f2"));
    }

    #[test]
    fn test_synthetic_contracts() {
        let contracts = SyntheticData::seeded(5).contracts();
        assert_eq!(contracts.len(), 3);
        assert_eq!(contracts[0].kind, "ERC1155");
        assert_eq!(contracts[2].name.as_deref(), Some("MyToken"));
        assert_eq!(contracts[2].status, "Fully verified");

        let json = serde_json::to_value(&contracts[0]).unwrap();
        assert_eq!(json["type"], "ERC1155");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_synthetic_stats_ranges() {
        let data = SyntheticData::seeded(8);
        for _ in 0..200 {
            let s = data.network_stats();
            assert!((750..950).contains(&s.tps));
            assert!((797_519..797_619).contains(&s.block_height));
            assert!((15..25).contains(&s.gas_price));
            assert!((140..160).contains(&s.active_nodes));
            assert!((883_125..884_125).contains(&s.total_transactions));
        }
    }

    #[tokio::test]
    async fn test_wallet_filter_is_case_insensitive() {
        let source = OfflineDataSource::new(SyntheticData::seeded(3));
        let sender = source.get_transactions().await;
        assert!(!sender.is_empty());

        let hits = source.get_wallet_transactions("0XCF3").await;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].from.starts_with("0xcF3"));

        let hits = source.get_wallet_transactions("03A5D").await;
        assert_eq!(hits.len(), 1);

        assert!(source.get_wallet_transactions("0xnobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_reachable_explorer_returns_synthetic_data() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_explorer(Arc::clone(&hits)).await;
        let client = MockBdagClient::new(
            ClientConfig {
                base_url,
                timeout_ms: 2_000,
            },
            SyntheticData::seeded(2),
        );

        assert_eq!(client.get_transactions().await.len(), 2);
        assert_eq!(client.get_contracts().await.len(), 3);
        let stats = client.get_network_stats().await;
        assert!((750..950).contains(&stats.tps));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_explorer_falls_back() {
        let client = unreachable_client();
        assert!(client.get_transactions().await.is_empty());
        assert!(client.get_contracts().await.is_empty());
        assert!(client.get_wallet_transactions("0xcF3").await.is_empty());
        assert_eq!(client.get_network_stats().await, NetworkStats::fallback());
    }
}
