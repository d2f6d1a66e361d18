use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_http: String,
    pub rpc_ws: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Static USD unit prices keyed by token address (plus "native"),
    /// feeding the config-backed price oracle.
    #[serde(default)]
    pub usd_prices: HashMap<String, f64>,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

// ============================================================
// Detection Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Materiality threshold for the large-profit path, USD.
    #[serde(default = "default_profit_threshold_usd")]
    pub profit_threshold_usd: f64,
    /// Fallback materiality threshold when no USD price is known,
    /// percent of the asset's total supply.
    #[serde(default = "default_supply_pct_threshold")]
    pub supply_pct_threshold: f64,
    /// Distinct post-filter transfers required to confirm a drain pattern.
    #[serde(default = "default_transfers_threshold")]
    pub transfers_threshold: usize,
    /// Rolling window for the transfer correlator, days.
    #[serde(default = "default_window_days")]
    pub window_days: u64,
    /// A victim with at least this many outgoing transactions is
    /// considered ordinarily active.
    #[serde(default = "default_victim_tx_count_threshold")]
    pub victim_tx_count_threshold: u64,
    /// A funding address with more incoming transactions than this is
    /// considered a high-traffic sink (exchange hot wallet).
    #[serde(default = "default_funding_tx_count_threshold")]
    pub funding_tx_count_threshold: u64,
    /// Upper bound on records kept per victim window, so a persisted blob
    /// stays within the storage provider's object limit.
    #[serde(default = "default_max_window_records")]
    pub max_window_records: usize,
    /// Timeout applied to every external lookup, milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            profit_threshold_usd: default_profit_threshold_usd(),
            supply_pct_threshold: default_supply_pct_threshold(),
            transfers_threshold: default_transfers_threshold(),
            window_days: default_window_days(),
            victim_tx_count_threshold: default_victim_tx_count_threshold(),
            funding_tx_count_threshold: default_funding_tx_count_threshold(),
            max_window_records: default_max_window_records(),
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

fn default_profit_threshold_usd() -> f64 {
    500_000.0
}

fn default_supply_pct_threshold() -> f64 {
    5.0
}

fn default_transfers_threshold() -> usize {
    7
}

fn default_window_days() -> u64 {
    5
}

fn default_victim_tx_count_threshold() -> u64 {
    2000
}

fn default_funding_tx_count_threshold() -> u64 {
    9999
}

fn default_max_window_records() -> usize {
    500
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

// ============================================================
// Labels Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LabelsConfig {
    /// CSV watchlist (address, label) merged into the label store.
    pub watchlist_path: Option<String>,
    #[serde(default)]
    pub manual_labels: Vec<ManualLabelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManualLabelConfig {
    pub address: String,
    pub label: String,
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Fatal-configuration checks: with these wrong, every classification
    /// downstream would be silently wrong, so startup aborts.
    fn validate(&self) -> eyre::Result<()> {
        if self.database.url.is_empty() {
            return Err(eyre::eyre!("Database URL must be configured"));
        }
        if self.chains.is_empty() {
            return Err(eyre::eyre!("At least one chain must be configured"));
        }
        for chain in &self.chains {
            for address in chain.usd_prices.keys() {
                if address != "native" && (!address.starts_with("0x") || address.len() != 42) {
                    return Err(eyre::eyre!(
                        "Invalid priced token address '{}' on chain '{}'",
                        address,
                        chain.name
                    ));
                }
            }
        }
        if self.detection.profit_threshold_usd <= 0.0 {
            return Err(eyre::eyre!("Profit threshold must be positive"));
        }
        if self.detection.transfers_threshold == 0 {
            return Err(eyre::eyre!("Transfers threshold must be at least 1"));
        }
        Ok(())
    }
}
