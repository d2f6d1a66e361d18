pub mod memory;
pub mod postgres;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::phishing::TransferRecord;

/// Minimal key-value contract the detection state lives behind. The
/// transport (Postgres here, anything with get/set elsewhere) is
/// swappable without touching detection logic. No multi-key guarantees.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> eyre::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> eyre::Result<()>;
}

/// Typed repository over the key-value contract: per-victim transfer
/// windows plus the alerted-address/hash sets, partitioned standard vs.
/// critical.
///
/// Reads degrade to empty defaults on failure; writes are fire-and-forget
/// with logged failure. Losing one write weakens deduplication but never
/// aborts transaction processing.
pub struct DetectionStore {
    kv: Arc<dyn KeyValueStore>,
    chain_id: u64,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DetectionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, chain_id: u64) -> Self {
        Self {
            kv,
            chain_id,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Mutex serializing read-modify-write cycles for one persisted key.
    /// Concurrent analyses touching different keys proceed in parallel.
    pub async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn window_key(&self, victim: &Address) -> String {
        format!(
            "{}-nativeTransfers-0x{}",
            self.chain_id,
            hex::encode(victim.as_slice())
        )
    }

    fn alerted_addresses_key(&self) -> String {
        format!("{}-alertedAddresses", self.chain_id)
    }

    fn alerted_critical_key(&self) -> String {
        format!("{}-alertedAddressesCritical", self.chain_id)
    }

    fn alerted_hashes_key(&self) -> String {
        format!("{}-alertedHashes", self.chain_id)
    }

    pub async fn load_transfer_window(&self, victim: &Address) -> Vec<TransferRecord> {
        let key = self.window_key(victim);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Corrupt transfer window, starting fresh");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Transfer window read failed, treating as empty");
                Vec::new()
            }
        }
    }

    pub async fn save_transfer_window(&self, victim: &Address, window: &[TransferRecord]) {
        let key = self.window_key(victim);
        let raw = match serde_json::to_string(window) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to serialize transfer window");
                return;
            }
        };
        if let Err(e) = self.kv.set(&key, &raw).await {
            tracing::warn!(key, error = %e, "Transfer window write failed, continuing");
        }
    }

    /// Whether either severity tier has already alerted on this address.
    pub async fn is_alerted(&self, address: &Address) -> bool {
        let needle = format!("0x{}", hex::encode(address.as_slice()));
        self.load_set(&self.alerted_addresses_key()).await.contains(&needle)
            || self.load_set(&self.alerted_critical_key()).await.contains(&needle)
    }

    pub async fn mark_alerted(&self, address: &Address, critical: bool) {
        let key = if critical {
            self.alerted_critical_key()
        } else {
            self.alerted_addresses_key()
        };
        let entry = format!("0x{}", hex::encode(address.as_slice()));
        self.append_to_set(&key, entry).await;
    }

    pub async fn is_hash_alerted(&self, hash: &B256) -> bool {
        let needle = format!("0x{}", hex::encode(hash.as_slice()));
        self.load_set(&self.alerted_hashes_key()).await.contains(&needle)
    }

    pub async fn mark_hash_alerted(&self, hash: &B256) {
        let entry = format!("0x{}", hex::encode(hash.as_slice()));
        self.append_to_set(&self.alerted_hashes_key(), entry).await;
    }

    async fn load_set(&self, key: &str) -> Vec<String> {
        match self.kv.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Corrupt alert set, starting fresh");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Alert set read failed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn append_to_set(&self, key: &str, entry: String) {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut set = self.load_set(key).await;
        if set.contains(&entry) {
            return;
        }
        set.push(entry);
        match serde_json::to_string(&set) {
            Ok(raw) => {
                if let Err(e) = self.kv.set(key, &raw).await {
                    tracing::warn!(key, error = %e, "Alert set write failed, continuing");
                }
            }
            Err(e) => tracing::error!(key, error = %e, "Failed to serialize alert set"),
        }
    }
}
