use alloy::primitives::{Address, I256};
use std::collections::HashMap;

/// Identity of a balance-bearing asset within one transaction: the native
/// asset sentinel or a token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetId {
    Native,
    Token(Address),
}

impl AssetId {
    pub fn as_token(&self) -> Option<Address> {
        match self {
            AssetId::Token(address) => Some(*address),
            AssetId::Native => None,
        }
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetId::Native => write!(f, "native"),
            AssetId::Token(address) => write!(f, "{address}"),
        }
    }
}

/// Per-transaction mapping of address -> asset -> net balance change, in
/// base units. Built fresh for every analyzed transaction and discarded
/// after the finding decision.
#[derive(Debug, Default)]
pub struct Ledger {
    deltas: HashMap<Address, HashMap<AssetId, I256>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signed balance change. Saturates instead of wrapping on the
    /// (absurd in practice) overflow of a 256-bit signed accumulator.
    pub fn apply(&mut self, address: Address, asset: AssetId, delta: I256) {
        let entry = self
            .deltas
            .entry(address)
            .or_default()
            .entry(asset)
            .or_insert(I256::ZERO);
        *entry = entry.saturating_add(delta);
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.deltas.keys()
    }

    pub fn changes(&self, address: &Address) -> Option<&HashMap<AssetId, I256>> {
        self.deltas.get(address)
    }

    /// True when the address's only recorded change is in the native asset.
    pub fn is_native_only(&self, address: &Address) -> bool {
        self.deltas
            .get(address)
            .map(|changes| changes.len() == 1 && changes.contains_key(&AssetId::Native))
            .unwrap_or(false)
    }

    /// Every asset touched by this transaction.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut seen = std::collections::HashSet::new();
        for changes in self.deltas.values() {
            seen.extend(changes.keys().copied());
        }
        seen.into_iter().collect()
    }

    /// Sum of deltas for one asset across all addresses. Zero for any
    /// well-formed transaction (conservation), since mints and burns are
    /// booked against the zero address.
    pub fn asset_sum(&self, asset: &AssetId) -> I256 {
        self.deltas
            .values()
            .filter_map(|changes| changes.get(asset))
            .fold(I256::ZERO, |acc, delta| acc.saturating_add(*delta))
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
