use alloy::primitives::{Address, B256};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::phishing::TransferRecord;
use crate::profit::ProfitCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Suspicious,
    Exploit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Address,
    Transaction,
}

/// One labeled entity attached to a finding.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub entity: String,
    pub entity_type: EntityType,
    pub label: String,
    pub confidence: f64,
}

/// The sole externally observable product of the detection core. Never
/// mutated after construction; either emitted with full metadata or not
/// emitted at all.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub name: String,
    pub description: String,
    pub alert_id: String,
    pub severity: Severity,
    pub finding_type: FindingType,
    pub metadata: BTreeMap<String, String>,
    pub labels: Vec<Label>,
}

pub fn lower_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Assemble a large-profit finding from a non-empty candidate list.
///
/// Every candidate is labeled "Attacker"; the transaction hash gets an
/// "Attack" label at confidence 1. When the declared sender is not among
/// the labeled addresses it is added at the maximum existing confidence,
/// since it authorized the transaction. The top-level anomaly score is
/// the minimum across candidates so one low-anomaly participant keeps the
/// finding's claim conservative.
pub fn large_profit(
    candidates: &[ProfitCandidate],
    tx_hash: B256,
    severity: Severity,
    tx_from: Address,
    tx_to: Option<Address>,
) -> Finding {
    let mut metadata = BTreeMap::new();
    metadata.insert("txFrom".to_string(), lower_hex(tx_from.as_slice()));
    metadata.insert(
        "txTo".to_string(),
        tx_to.map(|to| lower_hex(to.as_slice())).unwrap_or_default(),
    );

    let min_anomaly = candidates
        .iter()
        .map(|c| c.anomaly_score)
        .fold(f64::INFINITY, f64::min);
    metadata.insert("anomalyScore".to_string(), min_anomaly.to_string());

    let mut labels = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let profit = if candidate.is_profit_in_usd {
            format!("${:.2}", candidate.profit)
        } else {
            format!("{}% of total supply", candidate.profit)
        };
        metadata.insert(format!("profit{}", index + 1), profit);
        metadata.insert(
            format!("profitAddress{}", index + 1),
            lower_hex(candidate.address.as_slice()),
        );
        labels.push(Label {
            entity: lower_hex(candidate.address.as_slice()),
            entity_type: EntityType::Address,
            label: "Attacker".to_string(),
            confidence: candidate.confidence,
        });
    }

    let sender = lower_hex(tx_from.as_slice());
    if !labels.iter().any(|label| label.entity == sender) {
        let max_confidence = labels
            .iter()
            .map(|label| label.confidence)
            .fold(0.0, f64::max);
        labels.push(Label {
            entity: sender,
            entity_type: EntityType::Address,
            label: "Attacker".to_string(),
            confidence: max_confidence,
        });
    }

    labels.push(Label {
        entity: lower_hex(tx_hash.as_slice()),
        entity_type: EntityType::Transaction,
        label: "Attack".to_string(),
        confidence: 1.0,
    });

    Finding {
        name: "Large Profit".to_string(),
        description: "Transaction resulted in a large profit for the initiator".to_string(),
        alert_id: "LARGE-PROFIT".to_string(),
        severity,
        finding_type: FindingType::Suspicious,
        metadata,
        labels,
    }
}

/// Assemble a native-drain finding once the correlator confirms a pattern.
/// Distinct drain destinations and any multicall actors are labeled
/// "Attacker"; the victim keeps a "Victim" label for downstream consumers.
#[allow(clippy::too_many_arguments)]
pub fn native_drain(
    victim: Address,
    window: &[TransferRecord],
    tx_hash: B256,
    tx_to: Option<Address>,
    severity: Severity,
    confidence: f64,
    anomaly_score: f64,
    extra_attackers: &[Address],
) -> Finding {
    let mut metadata = BTreeMap::new();
    metadata.insert("txFrom".to_string(), lower_hex(victim.as_slice()));
    metadata.insert(
        "txTo".to_string(),
        tx_to.map(|to| lower_hex(to.as_slice())).unwrap_or_default(),
    );
    metadata.insert("anomalyScore".to_string(), anomaly_score.to_string());
    metadata.insert("victim".to_string(), lower_hex(victim.as_slice()));
    metadata.insert("transferCount".to_string(), window.len().to_string());
    if let Some(funding) = window.iter().rev().find_map(|r| r.funding_address) {
        metadata.insert("fundingAddress".to_string(), lower_hex(funding.as_slice()));
    }

    let mut labels = vec![Label {
        entity: lower_hex(victim.as_slice()),
        entity_type: EntityType::Address,
        label: "Victim".to_string(),
        confidence: 1.0,
    }];

    let mut seen = std::collections::HashSet::new();
    for destination in window
        .iter()
        .map(|r| r.latest_to)
        .chain(extra_attackers.iter().copied())
    {
        if destination != victim && seen.insert(destination) {
            labels.push(Label {
                entity: lower_hex(destination.as_slice()),
                entity_type: EntityType::Address,
                label: "Attacker".to_string(),
                confidence,
            });
        }
    }

    labels.push(Label {
        entity: lower_hex(tx_hash.as_slice()),
        entity_type: EntityType::Transaction,
        label: "Attack".to_string(),
        confidence: 1.0,
    });

    Finding {
        name: "Native Asset Drain".to_string(),
        description: "Repeated native transfers are draining the victim's balance".to_string(),
        alert_id: "NATIVE-DRAIN-PATTERN".to_string(),
        severity,
        finding_type: if severity == Severity::Critical {
            FindingType::Exploit
        } else {
            FindingType::Suspicious
        },
        metadata,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn candidate(address: Address, confidence: f64, anomaly: f64, profit: f64) -> ProfitCandidate {
        ProfitCandidate {
            address,
            confidence,
            anomaly_score: anomaly,
            is_profit_in_usd: true,
            profit,
        }
    }

    #[test]
    fn profit_metadata_uses_two_decimal_usd() {
        let attacker = Address::repeat_byte(1);
        let finding = large_profit(
            &[candidate(attacker, 0.8, 0.01, 600_000.0)],
            B256::repeat_byte(9),
            Severity::Medium,
            attacker,
            Some(Address::repeat_byte(2)),
        );
        assert_eq!(finding.metadata["profit1"], "$600000.00");
        assert_eq!(
            finding.metadata["profitAddress1"],
            lower_hex(attacker.as_slice())
        );
        assert_eq!(finding.alert_id, "LARGE-PROFIT");
    }

    #[test]
    fn supply_basis_renders_percent_string() {
        let attacker = Address::repeat_byte(1);
        let mut c = candidate(attacker, 0.8, 0.01, 6.5);
        c.is_profit_in_usd = false;
        let finding = large_profit(
            &[c],
            B256::repeat_byte(9),
            Severity::Medium,
            attacker,
            None,
        );
        assert_eq!(finding.metadata["profit1"], "6.5% of total supply");
    }

    #[test]
    fn sender_is_added_at_max_confidence() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let sender = Address::repeat_byte(3);
        let finding = large_profit(
            &[candidate(a, 0.6, 0.1, 700_000.0), candidate(b, 0.9, 0.2, 800_000.0)],
            B256::repeat_byte(9),
            Severity::High,
            sender,
            None,
        );
        let sender_label = finding
            .labels
            .iter()
            .find(|l| l.entity == lower_hex(sender.as_slice()))
            .expect("sender label missing");
        assert_eq!(sender_label.confidence, 0.9);
        assert_eq!(sender_label.label, "Attacker");
    }

    #[test]
    fn minimum_anomaly_score_wins() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut c1 = candidate(a, 0.6, 0.5, 700_000.0);
        let c2 = candidate(b, 0.9, 0.002, 800_000.0);
        c1.anomaly_score = 0.5;
        let finding = large_profit(&[c1, c2], B256::repeat_byte(9), Severity::High, a, None);
        assert_eq!(finding.metadata["anomalyScore"], "0.002");
    }

    #[test]
    fn attack_label_lands_on_the_hash() {
        let a = Address::repeat_byte(1);
        let hash = B256::repeat_byte(9);
        let finding = large_profit(
            &[candidate(a, 0.6, 0.1, 700_000.0)],
            hash,
            Severity::Medium,
            a,
            None,
        );
        let attack = finding
            .labels
            .iter()
            .find(|l| l.label == "Attack")
            .expect("attack label missing");
        assert_eq!(attack.entity, lower_hex(hash.as_slice()));
        assert!(matches!(attack.entity_type, EntityType::Transaction));
        assert_eq!(attack.confidence, 1.0);
    }

    #[test]
    fn drain_finding_labels_distinct_destinations() {
        let victim = Address::repeat_byte(1);
        let sink = Address::repeat_byte(2);
        let record = |to: Address, value: u64| TransferRecord {
            from: victim,
            from_nonce: 1,
            funding_address: None,
            latest_to: to,
            value: U256::from(value),
            timestamp: 0,
        };
        let window = vec![record(sink, 10), record(sink, 20), record(Address::repeat_byte(3), 30)];
        let finding = native_drain(
            victim,
            &window,
            B256::repeat_byte(9),
            Some(sink),
            Severity::High,
            0.7,
            0.01,
            &[],
        );
        let attackers: Vec<_> = finding
            .labels
            .iter()
            .filter(|l| l.label == "Attacker")
            .collect();
        assert_eq!(attackers.len(), 2);
        assert_eq!(finding.metadata["transferCount"], "3");
    }
}
