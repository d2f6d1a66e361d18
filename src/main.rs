use std::sync::Arc;

use alloy::providers::ProviderBuilder;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chainsentry::config::Config;
use chainsentry::labels::AddressLabelStore;
use chainsentry::pipeline::Detector;
use chainsentry::providers::rpc::RpcChainView;
use chainsentry::providers::StaticPriceOracle;
use chainsentry::scanner::chain::run_chain_scanner;
use chainsentry::scanner::FindingsBuffer;
use chainsentry::store::postgres::PgKvStore;
use chainsentry::store::DetectionStore;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ChainSentry starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        chains = config.chains.len(),
        "Configuration loaded from {}",
        config_path
    );

    // Create database connection pool for the detection state store
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let kv = Arc::new(PgKvStore::new(pool));
    let labels = Arc::new(AddressLabelStore::load(
        &config.labels.manual_labels,
        config.labels.watchlist_path.as_deref(),
    ));
    let prices = Arc::new(StaticPriceOracle::from_config(&config.chains));
    let findings = FindingsBuffer::new();

    // One detector per chain, each with its own RPC-backed state view
    let mut detectors = Vec::new();
    let mut scanners = Vec::new();
    for chain_config in &config.chains {
        let provider = ProviderBuilder::new().connect_http(
            chain_config
                .rpc_http
                .parse()
                .map_err(|e| eyre::eyre!("Invalid RPC URL for '{}': {}", chain_config.name, e))?,
        );
        let chain_view = Arc::new(RpcChainView::new(
            provider,
            config.detection.provider_timeout_ms,
        ));
        let store = Arc::new(DetectionStore::new(kv.clone(), chain_config.chain_id));
        let detector = Arc::new(Detector::new(
            chain_config.chain_id,
            config.detection.clone(),
            store,
            chain_view,
            prices.clone(),
            labels.clone(),
        ));
        detectors.push(detector.clone());
        scanners.push((chain_config.clone(), detector));
    }

    // Spawn API server
    if config.api.enabled {
        let api_detectors = detectors.clone();
        let api_findings = findings.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = chainsentry::api::serve(api_detectors, api_findings, &host, port).await
            {
                tracing::error!(error = %e, "API server failed");
            }
        });
    }

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    // Spawn one scanner task per chain
    let mut handles = Vec::new();
    for (chain_config, detector) in scanners {
        let shutdown = shutdown.clone();
        let findings = findings.clone();
        let chain_name = chain_config.name.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = run_chain_scanner(chain_config, detector, findings, shutdown).await {
                tracing::error!(chain = %chain_name, error = %e, "Chain scanner failed");
            }
        });

        handles.push(handle);
    }

    tracing::info!("All chain scanners started. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping all scanners...");
    shutdown.cancel();

    // Wait for all tasks to finish
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("ChainSentry stopped gracefully");
    Ok(())
}
