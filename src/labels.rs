use alloy::primitives::Address;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::ManualLabelConfig;

/// In-memory index of address labels, seeded from config and an optional
/// CSV watchlist at startup. One address can carry multiple labels
/// ("Fake_Phishing1234" from a watchlist + an ENS name from config).
///
/// The correlator's keyword check scans these labels; they are also echoed
/// into finding metadata when present.
#[derive(Debug, Default)]
pub struct AddressLabelStore {
    by_address: HashMap<Address, Vec<String>>,
}

impl AddressLabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from config: manual labels plus an optional
    /// watchlist CSV. A missing or malformed watchlist degrades to the
    /// manual labels alone.
    pub fn load(manual: &[ManualLabelConfig], watchlist_path: Option<&str>) -> Self {
        let mut store = Self::new();

        for label in manual {
            match Address::from_str(&label.address) {
                Ok(address) => store.insert(address, label.label.clone()),
                Err(e) => {
                    tracing::error!(
                        address = %label.address,
                        error = %e,
                        "Invalid manual label address, skipping"
                    );
                }
            }
        }

        if let Some(path) = watchlist_path {
            match load_watchlist_csv(path) {
                Ok(entries) => {
                    let count = entries.len();
                    for (address, label) in entries {
                        store.insert(address, label);
                    }
                    tracing::info!(count, path, "Watchlist labels loaded");
                }
                Err(e) => {
                    tracing::warn!(error = %e, path, "Failed to load watchlist, continuing without");
                }
            }
        }

        tracing::info!(addresses = store.by_address.len(), "Address label store ready");
        store
    }

    pub fn insert(&mut self, address: Address, label: String) {
        self.by_address.entry(address).or_default().push(label);
    }

    /// Labels for an address; empty slice when none are known.
    pub fn labels(&self, address: &Address) -> &[String] {
        self.by_address
            .get(address)
            .map(|labels| labels.as_slice())
            .unwrap_or(&[])
    }
}

/// Parse a watchlist CSV with columns: address, label. Rows with an
/// unparsable address are skipped.
fn load_watchlist_csv(path: &str) -> eyre::Result<Vec<(Address, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("Failed to open watchlist CSV '{}': {}", path, e))?;

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result?;
        let address = record.get(0).unwrap_or("").trim();
        let label = record.get(1).unwrap_or("").trim();
        if label.is_empty() {
            continue;
        }
        match Address::from_str(address) {
            Ok(address) => entries.push((address, label.to_string())),
            Err(_) => continue,
        }
    }

    Ok(entries)
}
