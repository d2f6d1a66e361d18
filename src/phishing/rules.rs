use alloy::primitives::{Address, U256};

use crate::tx::types::TxEvent;

use super::TransferRecord;

/// Drain-indicative substrings looked for in destination-address labels.
/// "xploit" also catches "Exploit"/"exploiter" prefixes after lowercasing.
const KEYWORDS: [&str; 9] = [
    "attack", "xploit", "phish", "hack", "drain", "scam", "fraud", "heist", ".eth",
];

/// Selectors of multicall wrappers used to disguise approval-based drains.
const MULTICALL_SELECTORS: [[u8; 4]; 2] = [
    [0xca, 0xa5, 0xc2, 0x3f], // multicall((address,bytes)[])
    [0x63, 0xfb, 0x0b, 0x96], // multicall(address[],bytes[])
];

/// Collapse retried duplicates of the same logical transfer while keeping
/// genuinely distinct drain events as independent evidence.
///
/// Two records from the same sender conflict only when all three hold:
/// values within ±20% of each other, values not exactly equal (an exact
/// repeat is a distinct event, not noise), and destinations differ. Only
/// the first record of a conflict group is retained, so a record is
/// dropped iff it conflicts with an earlier one. The output is stable
/// under re-filtering.
pub fn filter_conflicting_entries(records: &[TransferRecord]) -> Vec<TransferRecord> {
    let mut kept = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let conflicts_with_earlier = records[..index]
            .iter()
            .any(|earlier| conflicts(record, earlier));
        if !conflicts_with_earlier {
            kept.push(record.clone());
        }
    }
    kept
}

fn conflicts(record: &TransferRecord, earlier: &TransferRecord) -> bool {
    if record.from != earlier.from {
        return false;
    }
    let lower = earlier.value.checked_mul(U256::from(8u8)).map(|v| v / U256::from(10u8));
    let upper = earlier.value.checked_mul(U256::from(12u8)).map(|v| v / U256::from(10u8));
    let in_range = match (lower, upper) {
        (Some(lower), Some(upper)) => record.value >= lower && record.value <= upper,
        // Values this close to U256::MAX cannot be compared by scaling;
        // treat them as out of range.
        _ => false,
    };
    in_range && record.value != earlier.value && record.latest_to != earlier.latest_to
}

/// An amount is "suspiciously round" when it is an exact multiple of
/// 10^18 base units: scripted drain tooling moves whole canonical units,
/// organic transfers rarely do.
pub fn check_round_value(value: U256) -> bool {
    let unit = U256::from(10u8).pow(U256::from(18u8));
    (value % unit).is_zero()
}

/// Case-insensitive scan of address labels for drain-indicative
/// substrings. Corroborating, never sufficient on its own.
pub fn is_keyword_present(labels: &[String]) -> bool {
    labels.iter().any(|label| {
        let lowered = label.to_lowercase();
        KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
    })
}

/// from/to of traces whose calldata starts with a multicall selector.
/// These wrappers are a common disguise for approval-based drains.
pub fn extract_multicall_actors(tx: &TxEvent) -> Vec<Address> {
    let mut actors = Vec::new();
    for trace in &tx.traces {
        let input = trace.input.as_ref();
        if input.len() >= 4 && MULTICALL_SELECTORS.iter().any(|sel| &input[..4] == sel) {
            actors.push(trace.from);
            if let Some(to) = trace.to {
                actors.push(to);
            }
        }
    }
    actors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn record(from: u8, to: u8, value: u128) -> TransferRecord {
        TransferRecord {
            from: addr(from),
            from_nonce: 0,
            funding_address: None,
            latest_to: addr(to),
            value: U256::from(value),
            timestamp: 0,
        }
    }

    #[test]
    fn near_duplicate_to_different_destination_is_collapsed() {
        let records = vec![record(1, 2, 1000), record(1, 3, 1100)];
        let filtered = filter_conflicting_entries(&records);
        assert_eq!(filtered, vec![record(1, 2, 1000)]);
    }

    #[test]
    fn exact_repeat_is_independent_evidence() {
        let records = vec![record(1, 2, 1000), record(1, 3, 1000)];
        let filtered = filter_conflicting_entries(&records);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn same_destination_never_conflicts() {
        let records = vec![record(1, 2, 1000), record(1, 2, 1100)];
        let filtered = filter_conflicting_entries(&records);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn out_of_range_values_are_kept() {
        let records = vec![record(1, 2, 1000), record(1, 3, 1500)];
        let filtered = filter_conflicting_entries(&records);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn different_senders_never_conflict() {
        let records = vec![record(1, 2, 1000), record(4, 3, 1100)];
        let filtered = filter_conflicting_entries(&records);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            record(1, 2, 1000),
            record(1, 3, 1100), // conflicts with first
            record(1, 4, 1500),
            record(1, 5, 1500), // exact repeat, kept
            record(6, 7, 1050),
        ];
        let once = filter_conflicting_entries(&records);
        let twice = filter_conflicting_entries(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn round_value_boundaries() {
        assert!(check_round_value(U256::from(10_000_000_000_000_000_000u128)));
        assert!(!check_round_value(U256::from(10_000_000_000_000_000_001u128)));
        assert!(check_round_value(U256::from(10u8).pow(U256::from(18u8))));
    }

    #[test]
    fn multicall_traces_surface_their_actors() {
        use alloy::primitives::{Bytes, B256, U256};
        use crate::tx::types::TraceCall;

        let mut input = vec![0xca, 0xa5, 0xc2, 0x3f];
        input.extend_from_slice(&[0u8; 32]);
        let tx = TxEvent {
            chain_id: 1,
            hash: B256::ZERO,
            from: addr(1),
            to: Some(addr(2)),
            value: U256::ZERO,
            nonce: 0,
            timestamp: 0,
            input: Bytes::new(),
            traces: vec![
                TraceCall {
                    from: addr(3),
                    to: Some(addr(4)),
                    value: U256::ZERO,
                    input: Bytes::from(input),
                },
                TraceCall {
                    from: addr(5),
                    to: Some(addr(6)),
                    value: U256::ZERO,
                    input: Bytes::new(),
                },
            ],
            logs: vec![],
        };
        assert_eq!(extract_multicall_actors(&tx), vec![addr(3), addr(4)]);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert!(is_keyword_present(&["Fake_Phishing1234".to_string()]));
        assert!(is_keyword_present(&["EXPLOITER".to_string()]));
        assert!(is_keyword_present(&["sweeper.eth".to_string()]));
        assert!(!is_keyword_present(&["Binance 14".to_string()]));
        assert!(!is_keyword_present(&[]));
    }
}
