use alloy::primitives::Address;
use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::finding::{self, Finding, Severity};
use crate::labels::AddressLabelStore;
use crate::providers::ChainView;
use crate::store::DetectionStore;
use crate::tx::types::TxEvent;

use super::rules;
use super::TransferRecord;

const ONE_DAY_SECS: u64 = 24 * 60 * 60;

/// Stateful drain-pattern detector. Each victim moves through
/// no-history -> accumulating -> pattern-confirmed, then stays suppressed
/// via the alert state until its entry is cleared.
pub struct TransferCorrelator {
    config: DetectionConfig,
    store: Arc<DetectionStore>,
    chain: Arc<dyn ChainView>,
    labels: Arc<AddressLabelStore>,
}

impl TransferCorrelator {
    pub fn new(
        config: DetectionConfig,
        store: Arc<DetectionStore>,
        chain: Arc<dyn ChainView>,
        labels: Arc<AddressLabelStore>,
    ) -> Self {
        Self {
            config,
            store,
            chain,
            labels,
        }
    }

    /// Feed one transaction into the correlator. Returns a finding when
    /// this observation confirms a drain pattern; silence otherwise.
    pub async fn observe(&self, tx: &TxEvent, anomaly_score: f64) -> Option<Finding> {
        if tx.value.is_zero() {
            return None;
        }
        let destination = tx.to?;
        let victim = tx.from;
        if destination == victim {
            return None;
        }

        // Suppressed state: one alert per victim until the entry expires.
        if self.store.is_alerted(&victim).await {
            return None;
        }

        let funding_address = match self.chain.funding_address(victim).await {
            Ok(funding) => funding,
            Err(e) => {
                tracing::warn!(victim = %victim, error = %e, "Funding address lookup failed");
                None
            }
        };

        let record = TransferRecord {
            from: victim,
            from_nonce: tx.nonce,
            funding_address,
            latest_to: destination,
            value: tx.value,
            timestamp: tx.timestamp,
        };

        // Serialize the read-modify-write for this victim's window;
        // analyses of other victims proceed concurrently.
        let key = self.store.window_key(&victim);
        let lock = self.store.key_lock(&key).await;
        let _guard = lock.lock().await;

        let mut window = self.store.load_transfer_window(&victim).await;
        let cutoff = tx
            .timestamp
            .saturating_sub(self.config.window_days * ONE_DAY_SECS);
        window.retain(|record| record.timestamp >= cutoff);
        window.push(record);
        let mut window = rules::filter_conflicting_entries(&window);
        if window.len() > self.config.max_window_records {
            let excess = window.len() - self.config.max_window_records;
            window.drain(..excess);
        }
        self.store.save_transfer_window(&victim, &window).await;

        if window.len() < self.config.transfers_threshold {
            return None;
        }

        if !self.activity_profile_abnormal(victim, funding_address).await {
            return None;
        }

        let round_count = window
            .iter()
            .filter(|record| rules::check_round_value(record.value))
            .count();
        let round_share = round_count as f64 / window.len() as f64;
        let confidence = (0.5 + 0.4 * round_share).min(0.9);

        let keyword_hit = window
            .iter()
            .any(|record| rules::is_keyword_present(self.labels.labels(&record.latest_to)));
        let severity = if keyword_hit {
            Severity::Critical
        } else {
            Severity::High
        };

        let extra_attackers = rules::extract_multicall_actors(tx);
        let finding = finding::native_drain(
            victim,
            &window,
            tx.hash,
            tx.to,
            severity,
            confidence,
            anomaly_score,
            &extra_attackers,
        );

        self.store
            .mark_alerted(&victim, severity == Severity::Critical)
            .await;
        self.store.mark_hash_alerted(&tx.hash).await;

        tracing::warn!(
            victim = %victim,
            transfers = window.len(),
            severity = severity.as_str(),
            "Drain pattern confirmed"
        );
        Some(finding)
    }

    /// The repetition count alone is not enough: the pattern must also
    /// look like a freshly funded, low-activity wallet being swept, or a
    /// wallet funded from a high-traffic sink.
    async fn activity_profile_abnormal(
        &self,
        victim: Address,
        funding_address: Option<Address>,
    ) -> bool {
        let low_activity = match self.chain.outgoing_tx_count(victim).await {
            Ok(Some(count)) => count < self.config.victim_tx_count_threshold,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(victim = %victim, error = %e, "Outgoing tx count lookup failed");
                false
            }
        };
        if low_activity {
            return true;
        }

        let Some(funding) = funding_address else {
            return false;
        };
        match self.chain.incoming_tx_count(funding).await {
            Ok(Some(count)) => count > self.config.funding_tx_count_threshold,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(funding = %funding, error = %e, "Incoming tx count lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::TokenMetadata;
    use crate::store::memory::MemoryKvStore;
    use alloy::primitives::{Bytes, B256, U256};
    use async_trait::async_trait;

    struct MockChain {
        outgoing: Option<u64>,
        incoming: Option<u64>,
        funding: Option<Address>,
    }

    #[async_trait]
    impl ChainView for MockChain {
        async fn is_contract(&self, _address: Address) -> eyre::Result<bool> {
            Ok(false)
        }
        async fn token_metadata(&self, _token: Address) -> eyre::Result<Option<TokenMetadata>> {
            Ok(None)
        }
        async fn outgoing_tx_count(&self, _address: Address) -> eyre::Result<Option<u64>> {
            Ok(self.outgoing)
        }
        async fn incoming_tx_count(&self, _address: Address) -> eyre::Result<Option<u64>> {
            Ok(self.incoming)
        }
        async fn funding_address(&self, _address: Address) -> eyre::Result<Option<Address>> {
            Ok(self.funding)
        }
    }

    fn drain_tx(victim: Address, sink: Address, nonce: u64, timestamp: u64) -> TxEvent {
        TxEvent {
            chain_id: 1,
            hash: B256::with_last_byte(nonce as u8 + 1),
            from: victim,
            to: Some(sink),
            value: U256::from(10u8).pow(U256::from(18u8)),
            nonce,
            timestamp,
            input: Bytes::new(),
            traces: vec![],
            logs: vec![],
        }
    }

    fn correlator(chain: MockChain, labels: AddressLabelStore) -> (TransferCorrelator, Arc<DetectionStore>) {
        let store = Arc::new(DetectionStore::new(Arc::new(MemoryKvStore::new()), 1));
        let correlator = TransferCorrelator::new(
            DetectionConfig::default(),
            store.clone(),
            Arc::new(chain),
            Arc::new(labels),
        );
        (correlator, store)
    }

    fn fresh_wallet_chain() -> MockChain {
        MockChain {
            outgoing: Some(12),
            incoming: Some(20_000),
            funding: Some(Address::repeat_byte(0xF0)),
        }
    }

    #[tokio::test]
    async fn eight_round_transfers_confirm_then_suppress() {
        let victim = Address::repeat_byte(1);
        let sink = Address::repeat_byte(2);
        let (correlator, store) = correlator(fresh_wallet_chain(), AddressLabelStore::new());

        let base = 1_700_000_000u64;
        let mut findings = Vec::new();
        for nonce in 0..8u64 {
            let tx = drain_tx(victim, sink, nonce, base + nonce * 3600);
            if let Some(finding) = correlator.observe(&tx, 0.01).await {
                findings.push((nonce, finding));
            }
        }

        assert_eq!(findings.len(), 1);
        let (nonce, finding) = &findings[0];
        assert_eq!(*nonce, 6); // seventh transfer crosses the threshold
        assert_eq!(finding.alert_id, "NATIVE-DRAIN-PATTERN");
        assert_eq!(finding.severity, Severity::High);
        assert!(store.is_alerted(&victim).await);

        // Ninth identical-pattern transfer inside the suppression period
        let tx = drain_tx(victim, sink, 8, base + 9 * 3600);
        assert!(correlator.observe(&tx, 0.01).await.is_none());
    }

    #[tokio::test]
    async fn normal_activity_profile_never_confirms() {
        let victim = Address::repeat_byte(1);
        let sink = Address::repeat_byte(2);
        let chain = MockChain {
            outgoing: Some(5_000),
            incoming: Some(10),
            funding: Some(Address::repeat_byte(0xF0)),
        };
        let (correlator, store) = correlator(chain, AddressLabelStore::new());

        let base = 1_700_000_000u64;
        for nonce in 0..10u64 {
            let tx = drain_tx(victim, sink, nonce, base + nonce * 3600);
            assert!(correlator.observe(&tx, 0.01).await.is_none());
        }
        assert!(!store.is_alerted(&victim).await);
    }

    #[tokio::test]
    async fn labeled_destination_escalates_to_critical() {
        let victim = Address::repeat_byte(1);
        let sink = Address::repeat_byte(2);
        let mut labels = AddressLabelStore::new();
        labels.insert(sink, "Fake_Phishing9999".to_string());
        let (correlator, _store) = correlator(fresh_wallet_chain(), labels);

        let base = 1_700_000_000u64;
        let mut last = None;
        for nonce in 0..7u64 {
            let tx = drain_tx(victim, sink, nonce, base + nonce * 3600);
            last = correlator.observe(&tx, 0.01).await;
        }
        let finding = last.expect("pattern should confirm on the seventh transfer");
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn stale_records_fall_out_of_the_window() {
        let victim = Address::repeat_byte(1);
        let sink = Address::repeat_byte(2);
        let (correlator, store) = correlator(fresh_wallet_chain(), AddressLabelStore::new());

        let base = 1_700_000_000u64;
        // Six transfers, then a long gap: the stale six must not count
        // toward the threshold when the seventh arrives.
        for nonce in 0..6u64 {
            let tx = drain_tx(victim, sink, nonce, base + nonce * 60);
            assert!(correlator.observe(&tx, 0.01).await.is_none());
        }
        let later = base + 6 * 24 * 60 * 60;
        let tx = drain_tx(victim, sink, 6, later);
        assert!(correlator.observe(&tx, 0.01).await.is_none());
        assert_eq!(store.load_transfer_window(&victim).await.len(), 1);
    }

    #[tokio::test]
    async fn zero_value_and_self_sends_are_ignored() {
        let victim = Address::repeat_byte(1);
        let (correlator, store) = correlator(fresh_wallet_chain(), AddressLabelStore::new());

        let mut zero_value = drain_tx(victim, Address::repeat_byte(2), 0, 1_700_000_000);
        zero_value.value = U256::ZERO;
        assert!(correlator.observe(&zero_value, 0.01).await.is_none());

        let self_send = drain_tx(victim, victim, 1, 1_700_000_100);
        assert!(correlator.observe(&self_send, 0.01).await.is_none());

        assert!(store.load_transfer_window(&victim).await.is_empty());
    }
}
