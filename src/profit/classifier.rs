use alloy::primitives::{Address, I256, U256};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::config::DetectionConfig;
use crate::ledger::{AssetId, Ledger};
use crate::providers::{ChainView, PriceOracle, TokenMetadata};
use crate::routers::RouterFilter;
use crate::tx::types::{TransferEffect, TxEvent};

use super::signatures;
use super::ProfitCandidate;

/// Shape of an ERC-20 fan-out within one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    NotBatch,
    /// > 30 transfers of one token paying many distinct externally-owned
    /// receivers: a routine distribution, skipped entirely.
    BenignAirdrop,
    /// > 30 transfers of one token concentrating on a single receiver, or
    /// fanning out from contract-controlled senders: drain-shaped.
    Suspicious,
}

/// Classify a transaction's ERC-20 transfer set. Legitimate batch
/// distributions pay many distinct receivers from wallet senders; drains
/// concentrate value toward one receiver or originate from contracts.
pub async fn batch_transfer_kind(effects: &[TransferEffect], chain: &dyn ChainView) -> BatchKind {
    let transfers: Vec<(Address, Address, Address)> = effects
        .iter()
        .filter_map(|effect| match effect {
            TransferEffect::Token { token, from, to, .. } => Some((*token, *from, *to)),
            _ => None,
        })
        .collect();

    if transfers.len() <= 30 {
        return BatchKind::NotBatch;
    }

    let first_token = transfers[0].0;
    if transfers.iter().any(|(token, _, _)| *token != first_token) {
        return BatchKind::NotBatch;
    }

    let first_receiver = transfers[0].2;
    if transfers.iter().all(|(_, _, to)| *to == first_receiver) {
        return BatchKind::Suspicious;
    }

    let senders: HashSet<Address> = transfers.iter().map(|(_, from, _)| *from).collect();
    let checks = join_all(senders.iter().map(|sender| chain.is_contract(*sender))).await;
    // A failed bytecode lookup counts as "not a contract" rather than
    // poisoning the whole transaction.
    let any_contract_sender = checks.into_iter().any(|result| result.unwrap_or(false));
    if any_contract_sender {
        BatchKind::Suspicious
    } else {
        BatchKind::BenignAirdrop
    }
}

/// Runs the materiality rules over a built ledger and produces profit
/// candidates. An empty result is the normal "no finding" outcome.
pub struct ProfitClassifier {
    config: DetectionConfig,
}

impl ProfitClassifier {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn classify(
        &self,
        tx: &TxEvent,
        effects: &[TransferEffect],
        ledger: &Ledger,
        routers: &RouterFilter,
        chain: &dyn ChainView,
        prices: &dyn PriceOracle,
        anomaly_score: f64,
    ) -> Vec<ProfitCandidate> {
        let batch = batch_transfer_kind(effects, chain).await;
        if batch == BatchKind::BenignAirdrop {
            tracing::debug!(tx = %tx.hash, "Airdrop-shaped batch transfer, skipping profit analysis");
            return Vec::new();
        }

        let mut addresses: Vec<Address> = ledger
            .addresses()
            .filter(|address| **address != Address::ZERO && !routers.is_known_router(address))
            // A native-only gain in a traceless transaction is
            // indistinguishable from an ordinary transfer: insufficient
            // evidence, not a finding.
            .filter(|address| !(ledger.is_native_only(address) && !tx.has_traces()))
            .copied()
            .collect();
        addresses.sort();

        if addresses.is_empty() {
            return Vec::new();
        }

        let resolved = self
            .resolve_assets(&addresses, ledger, chain, prices, tx.chain_id)
            .await;

        let exploit_actors = signatures::exploit_actors(tx);
        let mut candidates = Vec::new();

        for address in addresses {
            let Some(changes) = ledger.changes(&address) else {
                continue;
            };

            let mut usd_total = 0.0;
            let mut any_priced = false;
            let mut best_supply_pct = 0.0f64;

            for (asset, delta) in changes {
                if *delta <= I256::ZERO {
                    continue;
                }
                let Some((metadata, price)) = resolved.get(asset) else {
                    continue;
                };
                if let Some(price) = price {
                    let decimals = metadata.as_ref().map(|m| m.decimals).unwrap_or(18);
                    usd_total += raw_to_human(*delta, decimals) * price;
                    any_priced = true;
                } else if let Some(supply) = metadata.as_ref().and_then(|m| m.total_supply) {
                    best_supply_pct = best_supply_pct.max(pct_of_supply(*delta, supply));
                }
            }

            let qualified = if any_priced && usd_total >= self.config.profit_threshold_usd {
                Some((true, usd_total, usd_total / self.config.profit_threshold_usd))
            } else if best_supply_pct >= self.config.supply_pct_threshold {
                Some((
                    false,
                    best_supply_pct,
                    best_supply_pct / self.config.supply_pct_threshold,
                ))
            } else {
                None
            };

            if let Some((is_usd, profit, ratio)) = qualified {
                let boosted =
                    exploit_actors.contains(&address) || batch == BatchKind::Suspicious;
                candidates.push(ProfitCandidate {
                    address,
                    confidence: confidence_for(ratio, boosted),
                    anomaly_score,
                    is_profit_in_usd: is_usd,
                    profit,
                });
            }
        }

        candidates
    }

    /// Fetch metadata and prices for every asset showing a positive delta,
    /// batched across distinct assets; lookups for different assets are
    /// independent. Failures degrade to "unpriced, no metadata".
    async fn resolve_assets(
        &self,
        addresses: &[Address],
        ledger: &Ledger,
        chain: &dyn ChainView,
        prices: &dyn PriceOracle,
        chain_id: u64,
    ) -> HashMap<AssetId, (Option<TokenMetadata>, Option<f64>)> {
        let mut assets: HashSet<AssetId> = HashSet::new();
        for address in addresses {
            if let Some(changes) = ledger.changes(address) {
                for (asset, delta) in changes {
                    if *delta > I256::ZERO {
                        assets.insert(*asset);
                    }
                }
            }
        }

        let fetches = assets.into_iter().map(|asset| async move {
            let metadata = match asset {
                AssetId::Native => Some(TokenMetadata {
                    symbol: "native".to_string(),
                    decimals: 18,
                    total_supply: None,
                }),
                AssetId::Token(token) => match chain.token_metadata(token).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!(token = %token, error = %e, "Token metadata lookup failed");
                        None
                    }
                },
            };
            let price = match prices.usd_price(&asset, chain_id).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(asset = %asset, error = %e, "Price lookup failed, using supply basis");
                    None
                }
            };
            (asset, (metadata, price))
        });

        join_all(fetches).await.into_iter().collect()
    }
}

/// Tiered by how far the gain clears the threshold, with a bump when the
/// address also ran an exploit-shaped call or the transfer set itself was
/// drain-shaped.
fn confidence_for(threshold_ratio: f64, boosted: bool) -> f64 {
    let base: f64 = if threshold_ratio >= 10.0 {
        0.9
    } else if threshold_ratio >= 5.0 {
        0.8
    } else if threshold_ratio >= 2.0 {
        0.7
    } else {
        0.6
    };
    if boosted {
        (base + 0.1).min(1.0)
    } else {
        base
    }
}

/// Convert a raw positive delta to a human-readable amount using the
/// token's decimals.
fn raw_to_human(delta: I256, decimals: u8) -> f64 {
    let raw = BigDecimal::from_str(&delta.to_string()).unwrap_or_default();
    let divisor = BigDecimal::new(BigInt::from(1), -(decimals as i64));
    (raw / divisor).to_f64().unwrap_or(0.0)
}

/// Gain as a percentage of total supply. Both sides are base units, so
/// decimals cancel.
fn pct_of_supply(delta: I256, supply: U256) -> f64 {
    if supply.is_zero() {
        return 0.0;
    }
    let d = BigDecimal::from_str(&delta.to_string()).unwrap_or_default();
    let s = BigDecimal::from_str(&supply.to_string()).unwrap_or_default();
    ((d / s) * BigDecimal::from(100)).to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::build_ledger;
    use crate::tx::types::TraceCall;
    use alloy::primitives::{Bytes, B256};
    use async_trait::async_trait;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    struct MockChain {
        contracts: HashSet<Address>,
        metadata: HashMap<Address, TokenMetadata>,
    }

    impl MockChain {
        fn new() -> Self {
            Self {
                contracts: HashSet::new(),
                metadata: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl ChainView for MockChain {
        async fn is_contract(&self, address: Address) -> eyre::Result<bool> {
            Ok(self.contracts.contains(&address))
        }
        async fn token_metadata(&self, token: Address) -> eyre::Result<Option<TokenMetadata>> {
            Ok(self.metadata.get(&token).cloned())
        }
        async fn outgoing_tx_count(&self, _address: Address) -> eyre::Result<Option<u64>> {
            Ok(None)
        }
        async fn incoming_tx_count(&self, _address: Address) -> eyre::Result<Option<u64>> {
            Ok(None)
        }
        async fn funding_address(&self, _address: Address) -> eyre::Result<Option<Address>> {
            Ok(None)
        }
    }

    struct MapOracle(HashMap<AssetId, f64>);

    #[async_trait]
    impl PriceOracle for MapOracle {
        async fn usd_price(&self, asset: &AssetId, _chain_id: u64) -> eyre::Result<Option<f64>> {
            Ok(self.0.get(asset).copied())
        }
    }

    fn tx_event() -> TxEvent {
        TxEvent {
            chain_id: 1,
            hash: B256::repeat_byte(0xAA),
            from: addr(1),
            to: Some(addr(2)),
            value: U256::ZERO,
            nonce: 0,
            timestamp: 1_700_000_000,
            input: Bytes::new(),
            traces: vec![TraceCall {
                from: addr(1),
                to: Some(addr(2)),
                value: U256::ZERO,
                input: Bytes::new(),
            }],
            logs: vec![],
        }
    }

    fn token_effects(token: Address, from: Address, to: Address, value: u128) -> Vec<TransferEffect> {
        vec![TransferEffect::Token {
            token,
            from,
            to,
            value: U256::from(value),
        }]
    }

    fn usdc_metadata() -> TokenMetadata {
        TokenMetadata {
            symbol: "USDC".to_string(),
            decimals: 6,
            total_supply: Some(U256::from(10u128.pow(16))),
        }
    }

    async fn classify_gain(gain_usdc_units: u128) -> Vec<ProfitCandidate> {
        let token = addr(0xA0);
        let tx = tx_event();
        let effects = token_effects(token, addr(2), addr(1), gain_usdc_units);
        let ledger = build_ledger(&tx, &effects);

        let mut chain = MockChain::new();
        chain.metadata.insert(token, usdc_metadata());
        let oracle = MapOracle(HashMap::from([(AssetId::Token(token), 1.0)]));

        let classifier = ProfitClassifier::new(DetectionConfig::default());
        classifier
            .classify(&tx, &effects, &ledger, &RouterFilter::for_chain(1), &chain, &oracle, 0.01)
            .await
    }

    #[tokio::test]
    async fn gain_below_threshold_yields_no_candidates() {
        // $400k in 6-decimal units, threshold $500k
        let candidates = classify_gain(400_000_000_000).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn threshold_is_monotonic() {
        // Increasing the gain can only move an address into candidacy.
        let below = classify_gain(400_000_000_000).await;
        let above = classify_gain(600_000_000_000).await;
        let far_above = classify_gain(6_000_000_000_000).await;
        assert!(below.is_empty());
        assert_eq!(above.len(), 1);
        assert_eq!(far_above.len(), 1);
        assert!(far_above[0].confidence >= above[0].confidence);
    }

    #[tokio::test]
    async fn usd_profit_is_reported_in_usd() {
        let candidates = classify_gain(600_000_000_000).await;
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_profit_in_usd);
        assert!((candidates[0].profit - 600_000.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn unpriced_token_falls_back_to_supply_basis() {
        let token = addr(0xA0);
        let tx = tx_event();
        // 6% of a 10^16 supply
        let effects = token_effects(token, addr(2), addr(1), 6 * 10u128.pow(14));
        let ledger = build_ledger(&tx, &effects);

        let mut chain = MockChain::new();
        chain.metadata.insert(token, usdc_metadata());
        let oracle = MapOracle(HashMap::new());

        let classifier = ProfitClassifier::new(DetectionConfig::default());
        let candidates = classifier
            .classify(&tx, &effects, &ledger, &RouterFilter::for_chain(1), &chain, &oracle, 0.01)
            .await;
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_profit_in_usd);
        assert!((candidates[0].profit - 6.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn router_addresses_are_never_candidates() {
        let token = addr(0xA0);
        let router =
            Address::from_str("0x7a250d5630b4cf539739df2c5dacb4c659f2488d").unwrap();
        let tx = tx_event();
        let effects = token_effects(token, addr(2), router, 600_000_000_000);
        let ledger = build_ledger(&tx, &effects);

        let mut chain = MockChain::new();
        chain.metadata.insert(token, usdc_metadata());
        let oracle = MapOracle(HashMap::from([(AssetId::Token(token), 1.0)]));

        let classifier = ProfitClassifier::new(DetectionConfig::default());
        let candidates = classifier
            .classify(&tx, &effects, &ledger, &RouterFilter::for_chain(1), &chain, &oracle, 0.01)
            .await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn native_only_gain_without_traces_is_excluded() {
        let mut tx = tx_event();
        tx.traces.clear();
        tx.value = U256::from(10u128.pow(21)); // 1000 native units
        let effects: Vec<TransferEffect> = vec![];
        let ledger = build_ledger(&tx, &effects);

        let chain = MockChain::new();
        let oracle = MapOracle(HashMap::from([(AssetId::Native, 3000.0)]));

        let classifier = ProfitClassifier::new(DetectionConfig::default());
        let candidates = classifier
            .classify(&tx, &effects, &ledger, &RouterFilter::for_chain(1), &chain, &oracle, 0.01)
            .await;
        assert!(candidates.is_empty());
    }

    fn batch_effects(token: Address, receivers: impl Iterator<Item = Address>) -> Vec<TransferEffect> {
        receivers
            .enumerate()
            .map(|(i, to)| TransferEffect::Token {
                token,
                from: Address::with_last_byte(i as u8 + 1),
                to,
                value: U256::from(100u64),
            })
            .collect()
    }

    #[tokio::test]
    async fn batch_to_one_receiver_is_suspicious() {
        let token = addr(0xA0);
        let effects = batch_effects(token, std::iter::repeat(addr(0xBB)).take(31));
        let chain = MockChain::new();
        assert_eq!(
            batch_transfer_kind(&effects, &chain).await,
            BatchKind::Suspicious
        );
    }

    #[tokio::test]
    async fn batch_to_distinct_receivers_is_benign_without_contract_senders() {
        let token = addr(0xA0);
        let receivers = (0..31u16).map(|i| Address::with_last_byte((i + 100) as u8));
        let effects = batch_effects(token, receivers);
        let chain = MockChain::new();
        assert_eq!(
            batch_transfer_kind(&effects, &chain).await,
            BatchKind::BenignAirdrop
        );
    }

    #[tokio::test]
    async fn contract_sender_makes_distinct_receiver_batch_suspicious() {
        let token = addr(0xA0);
        let receivers = (0..31u16).map(|i| Address::with_last_byte((i + 100) as u8));
        let effects = batch_effects(token, receivers);
        let mut chain = MockChain::new();
        chain.contracts.insert(Address::with_last_byte(1));
        assert_eq!(
            batch_transfer_kind(&effects, &chain).await,
            BatchKind::Suspicious
        );
    }

    #[tokio::test]
    async fn thirty_transfers_is_not_a_batch() {
        let token = addr(0xA0);
        let effects = batch_effects(token, std::iter::repeat(addr(0xBB)).take(30));
        let chain = MockChain::new();
        assert_eq!(
            batch_transfer_kind(&effects, &chain).await,
            BatchKind::NotBatch
        );
    }
}
