use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::sol;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;

use super::{ChainView, TokenMetadata};

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

/// `ChainView` backed by a plain JSON-RPC node.
///
/// Incoming-transfer counts and funding lineage need an explorer-style
/// index a bare node does not keep, so those answer `None` and the
/// correlator's activity gate degrades conservatively.
pub struct RpcChainView<P> {
    provider: P,
    timeout: Duration,
}

impl<P: Provider + Clone + 'static> RpcChainView<P> {
    pub fn new(provider: P, timeout_ms: u64) -> Self {
        Self {
            provider,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> eyre::Result<T>
    where
        F: IntoFuture<Output = Result<T, alloy::transports::TransportError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(eyre::eyre!("{what} failed: {e}")),
            Err(_) => Err(eyre::eyre!("{what} timed out after {:?}", self.timeout)),
        }
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> ChainView for RpcChainView<P> {
    async fn is_contract(&self, address: Address) -> eyre::Result<bool> {
        let code = self
            .bounded("eth_getCode", self.provider.get_code_at(address))
            .await?;
        Ok(!code.is_empty())
    }

    async fn token_metadata(&self, token: Address) -> eyre::Result<Option<TokenMetadata>> {
        let erc20 = IERC20Metadata::new(token, self.provider.clone());

        // Non-ERC-20 contracts revert on decimals(); that is a normal
        // "no metadata" outcome, not an error.
        let decimals = match tokio::time::timeout(self.timeout, erc20.decimals().call()).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) | Err(_) => return Ok(None),
        };

        let symbol = match tokio::time::timeout(self.timeout, erc20.symbol().call()).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) | Err(_) => "UNKNOWN".to_string(),
        };

        let total_supply = match tokio::time::timeout(self.timeout, erc20.totalSupply().call()).await
        {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) | Err(_) => None,
        };

        Ok(Some(TokenMetadata {
            symbol,
            decimals,
            total_supply,
        }))
    }

    async fn outgoing_tx_count(&self, address: Address) -> eyre::Result<Option<u64>> {
        let count = self
            .bounded(
                "eth_getTransactionCount",
                self.provider.get_transaction_count(address),
            )
            .await?;
        Ok(Some(count))
    }

    async fn incoming_tx_count(&self, _address: Address) -> eyre::Result<Option<u64>> {
        Ok(None)
    }

    async fn funding_address(&self, _address: Address) -> eyre::Result<Option<Address>> {
        Ok(None)
    }
}
