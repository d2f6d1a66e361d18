use alloy::consensus::Transaction as _;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Block, BlockNumberOrTag};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ChainConfig;
use crate::pipeline::Detector;
use crate::tx::types::TxEvent;

use super::FindingsBuffer;

/// Main entry point for a single chain's scanning task. Subscribes to new
/// blocks over WebSocket when configured, falling back to HTTP polling,
/// and feeds every transaction through the detection pipeline.
pub async fn run_chain_scanner(
    config: ChainConfig,
    detector: Arc<Detector>,
    findings: FindingsBuffer,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    tracing::info!(chain = %config.name, chain_id = config.chain_id, "Starting chain scanner");

    if let Some(ws_url) = config.rpc_ws.clone() {
        match scan_ws(&config, &ws_url, &detector, &findings, &shutdown).await {
            Ok(()) => {
                tracing::info!(chain = %config.name, "Chain scanner stopped");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    chain = %config.name,
                    error = %e,
                    "WebSocket connection failed, falling back to HTTP polling"
                );
            }
        }
    }

    scan_http(&config, &detector, &findings, &shutdown).await?;
    tracing::info!(chain = %config.name, "Chain scanner stopped");
    Ok(())
}

/// Live scanning via WebSocket block subscription.
async fn scan_ws(
    config: &ChainConfig,
    ws_url: &str,
    detector: &Arc<Detector>,
    findings: &FindingsBuffer,
    shutdown: &CancellationToken,
) -> eyre::Result<()> {
    let ws = WsConnect::new(ws_url);
    let provider = ProviderBuilder::new().connect_ws(ws).await?;

    let sub = provider.subscribe_blocks().await?;
    let mut stream = sub.into_stream();

    tracing::info!(chain = %config.name, "WebSocket block subscription active");

    loop {
        tokio::select! {
            maybe_header = stream.next() => {
                match maybe_header {
                    Some(header) => {
                        if let Err(e) = fetch_and_process_block(
                            &provider, config, detector, findings, header.number
                        ).await {
                            tracing::error!(
                                chain = %config.name,
                                block = header.number,
                                error = %e,
                                "Failed to process block"
                            );
                        }
                    }
                    None => {
                        tracing::warn!(chain = %config.name, "Block stream ended");
                        break;
                    }
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }

    Ok(())
}

/// Live scanning via HTTP polling (fallback when WS is unavailable).
async fn scan_http(
    config: &ChainConfig,
    detector: &Arc<Detector>,
    findings: &FindingsBuffer,
    shutdown: &CancellationToken,
) -> eyre::Result<()> {
    let provider = ProviderBuilder::new().connect_http(
        config
            .rpc_http
            .parse()
            .map_err(|e| eyre::eyre!("Invalid RPC URL: {}", e))?,
    );

    let mut last_seen = retry_rpc(|| provider.get_block_number()).await?;
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    while !shutdown.is_cancelled() {
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.cancelled() => break,
        }

        let tip = match retry_rpc(|| provider.get_block_number()).await {
            Ok(tip) => tip,
            Err(e) => {
                tracing::warn!(chain = %config.name, error = %e, "Tip poll failed");
                continue;
            }
        };

        while last_seen < tip && !shutdown.is_cancelled() {
            let next = last_seen + 1;
            if let Err(e) =
                fetch_and_process_block(&provider, config, detector, findings, next).await
            {
                tracing::error!(chain = %config.name, block = next, error = %e, "Failed to process block");
            }
            last_seen = next;
        }
    }

    Ok(())
}

async fn fetch_and_process_block<P: Provider>(
    provider: &P,
    config: &ChainConfig,
    detector: &Arc<Detector>,
    findings: &FindingsBuffer,
    number: u64,
) -> eyre::Result<()> {
    let block = retry_rpc(|| {
        provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
    })
    .await?
    .ok_or_else(|| eyre::eyre!("Block {} not found", number))?;

    process_block(provider, config, detector, findings, block).await
}

/// Build a `TxEvent` per transaction in the block and run the pipeline.
/// Internal call traces need a tracing-enabled endpoint; plain nodes get
/// an empty trace set and the pipeline's traceless edge rules apply.
async fn process_block<P: Provider>(
    provider: &P,
    config: &ChainConfig,
    detector: &Arc<Detector>,
    findings: &FindingsBuffer,
    block: Block,
) -> eyre::Result<()> {
    let timestamp = block.header.timestamp;
    let number = block.header.number;
    let mut analyzed = 0usize;
    let mut emitted = 0usize;

    for tx in block.transactions.into_transactions() {
        let hash = *tx.inner.tx_hash();

        let logs = match retry_rpc(|| provider.get_transaction_receipt(hash)).await {
            Ok(Some(receipt)) => receipt.inner.logs().to_vec(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(chain = %config.name, tx = %hash, error = %e, "Receipt fetch failed, skipping logs");
                Vec::new()
            }
        };

        let event = TxEvent {
            chain_id: config.chain_id,
            hash,
            from: tx.inner.signer(),
            to: tx.inner.to(),
            value: tx.inner.value(),
            nonce: tx.inner.nonce(),
            timestamp,
            input: tx.inner.input().clone(),
            traces: Vec::new(),
            logs,
        };

        let results = detector.analyze(&event).await;
        analyzed += 1;
        emitted += results.len();
        for finding in results {
            findings.push(finding).await;
        }
    }

    let block_time = chrono::DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default();
    tracing::debug!(
        chain = %config.name,
        block = number,
        block_time = %block_time,
        txs = analyzed,
        findings = emitted,
        "Processed block"
    );

    Ok(())
}

/// Retry an async operation with exponential backoff. Handles transient
/// RPC errors (rate limits, network issues).
pub async fn retry_rpc<F, Fut, T, E>(mut f: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = Duration::from_millis(500);
    let max_retries = 5;

    for attempt in 0..max_retries {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "RPC call failed, retrying..."
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }
        }
    }

    f().await
        .map_err(|e| eyre::eyre!("RPC call failed after {} retries: {}", max_retries, e))
}
