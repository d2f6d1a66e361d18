use alloy::primitives::Address;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::finding::{self, Finding, Severity};
use crate::labels::AddressLabelStore;
use crate::ledger;
use crate::phishing::TransferCorrelator;
use crate::profit::classifier::ProfitClassifier;
use crate::providers::{ChainView, PriceOracle};
use crate::routers::{wrapped_native_token, RouterFilter};
use crate::store::DetectionStore;
use crate::tx::decoder;
use crate::tx::types::TxEvent;

/// The detection pipeline for one chain. `analyze` is a pure function of
/// (transaction, external state) -> zero-or-more findings: recoverable
/// failures are absorbed here and never surface to the host loop.
pub struct Detector {
    chain_id: u64,
    routers: RouterFilter,
    wrapped_native: Option<Address>,
    classifier: ProfitClassifier,
    correlator: TransferCorrelator,
    store: Arc<DetectionStore>,
    chain: Arc<dyn ChainView>,
    prices: Arc<dyn PriceOracle>,
    txs_seen: AtomicU64,
    findings_emitted: AtomicU64,
}

impl Detector {
    pub fn new(
        chain_id: u64,
        config: DetectionConfig,
        store: Arc<DetectionStore>,
        chain: Arc<dyn ChainView>,
        prices: Arc<dyn PriceOracle>,
        labels: Arc<AddressLabelStore>,
    ) -> Self {
        let correlator =
            TransferCorrelator::new(config.clone(), store.clone(), chain.clone(), labels);
        Self {
            chain_id,
            routers: RouterFilter::for_chain(chain_id),
            wrapped_native: wrapped_native_token(chain_id),
            classifier: ProfitClassifier::new(config),
            correlator,
            store,
            chain,
            prices,
            txs_seen: AtomicU64::new(0),
            findings_emitted: AtomicU64::new(0),
        }
    }

    /// Run both detection paths over one transaction. Ledger construction
    /// completes before classification, classification before assembly.
    pub async fn analyze(&self, tx: &TxEvent) -> Vec<Finding> {
        self.txs_seen.fetch_add(1, Ordering::Relaxed);
        let anomaly_score = self.anomaly_score();

        let mut findings = Vec::new();
        if let Some(finding) = self.detect_large_profit(tx, anomaly_score).await {
            findings.push(finding);
        }
        if let Some(finding) = self.correlator.observe(tx, anomaly_score).await {
            findings.push(finding);
        }

        if !findings.is_empty() {
            self.findings_emitted
                .fetch_add(findings.len() as u64, Ordering::Relaxed);
            for finding in &findings {
                tracing::warn!(
                    chain_id = self.chain_id,
                    alert_id = %finding.alert_id,
                    severity = finding.severity.as_str(),
                    tx = %tx.hash,
                    "FINDING"
                );
            }
        }
        findings
    }

    async fn detect_large_profit(&self, tx: &TxEvent, anomaly_score: f64) -> Option<Finding> {
        if self.store.is_hash_alerted(&tx.hash).await {
            return None;
        }

        let effects = decoder::decode_transfer_effects(&tx.logs, self.wrapped_native);
        let ledger = ledger::build_ledger(tx, &effects);
        if ledger.is_empty() {
            return None;
        }

        let mut candidates = self
            .classifier
            .classify(
                tx,
                &effects,
                &ledger,
                &self.routers,
                self.chain.as_ref(),
                self.prices.as_ref(),
                anomaly_score,
            )
            .await;

        // At-most-once alerting per address across restarts.
        let mut filtered = Vec::with_capacity(candidates.len());
        for candidate in candidates.drain(..) {
            if self.store.is_alerted(&candidate.address).await {
                tracing::debug!(address = %candidate.address, "Already alerted, dropping candidate");
            } else {
                filtered.push(candidate);
            }
        }
        if filtered.is_empty() {
            return None;
        }

        let severity = if filtered.iter().any(|c| c.confidence >= 0.8) {
            Severity::High
        } else {
            Severity::Medium
        };
        let finding = finding::large_profit(&filtered, tx.hash, severity, tx.from, tx.to);

        for candidate in &filtered {
            self.store.mark_alerted(&candidate.address, false).await;
        }
        self.store.mark_hash_alerted(&tx.hash).await;

        Some(finding)
    }

    /// Alert rate over everything this instance has processed, used as
    /// the risk model's anomaly score for the current finding.
    fn anomaly_score(&self) -> f64 {
        let seen = self.txs_seen.load(Ordering::Relaxed).max(1);
        let emitted = self.findings_emitted.load(Ordering::Relaxed) + 1;
        (emitted as f64 / seen as f64).min(1.0)
    }

    pub fn stats(&self) -> DetectorStats {
        DetectorStats {
            chain_id: self.chain_id,
            txs_seen: self.txs_seen.load(Ordering::Relaxed),
            findings_emitted: self.findings_emitted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectorStats {
    pub chain_id: u64,
    pub txs_seen: u64,
    pub findings_emitted: u64,
}
