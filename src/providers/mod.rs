pub mod rpc;

use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::ChainConfig;
use crate::ledger::AssetId;

/// On-chain token metadata resolved per transaction analysis.
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Option<alloy::primitives::U256>,
}

/// Read-only view of blockchain state the detection paths consult.
///
/// Every method is fallible and allowed to answer `None` when the backing
/// service cannot produce the datum; callers fall back conservatively
/// instead of aborting the analysis.
#[async_trait]
pub trait ChainView: Send + Sync {
    /// Whether the address carries deployed bytecode.
    async fn is_contract(&self, address: Address) -> eyre::Result<bool>;

    /// decimals/symbol/totalSupply for a token contract.
    async fn token_metadata(&self, token: Address) -> eyre::Result<Option<TokenMetadata>>;

    /// Historical count of transactions sent by this address.
    async fn outgoing_tx_count(&self, address: Address) -> eyre::Result<Option<u64>>;

    /// Historical count of transactions received by this address.
    /// Needs an explorer-style index; plain RPC backends answer `None`.
    async fn incoming_tx_count(&self, address: Address) -> eyre::Result<Option<u64>>;

    /// The address that sent this address its first funds, when known.
    async fn funding_address(&self, address: Address) -> eyre::Result<Option<Address>>;
}

/// USD unit-price source. `None` means unpriced; the profit classifier
/// then falls back to the percent-of-supply basis.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn usd_price(&self, asset: &AssetId, chain_id: u64) -> eyre::Result<Option<f64>>;
}

/// Price oracle seeded from the per-chain `usd_prices` config table.
/// Deployments with a live pricing service swap this behind the trait.
pub struct StaticPriceOracle {
    native: HashMap<u64, f64>,
    tokens: HashMap<(u64, Address), f64>,
}

impl StaticPriceOracle {
    pub fn from_config(chains: &[ChainConfig]) -> Self {
        let mut native = HashMap::new();
        let mut tokens = HashMap::new();

        for chain in chains {
            for (key, price) in &chain.usd_prices {
                if key == "native" {
                    native.insert(chain.chain_id, *price);
                } else {
                    match Address::from_str(key) {
                        Ok(address) => {
                            tokens.insert((chain.chain_id, address), *price);
                        }
                        Err(e) => {
                            tracing::error!(
                                address = %key,
                                chain = %chain.name,
                                error = %e,
                                "Invalid priced token address, skipping"
                            );
                        }
                    }
                }
            }
        }

        Self { native, tokens }
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn usd_price(&self, asset: &AssetId, chain_id: u64) -> eyre::Result<Option<f64>> {
        Ok(match asset {
            AssetId::Native => self.native.get(&chain_id).copied(),
            AssetId::Token(address) => self.tokens.get(&(chain_id, *address)).copied(),
        })
    }
}
