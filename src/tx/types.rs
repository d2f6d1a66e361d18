use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;

/// A single traced internal call. Only the fields the detection paths
/// consume are kept; the scanner fills what its RPC endpoint can supply.
#[derive(Debug, Clone)]
pub struct TraceCall {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

/// One transaction as seen by the detection pipeline: the envelope fields
/// plus its receipt logs and (when the RPC endpoint supports tracing) its
/// internal call traces.
#[derive(Debug, Clone)]
pub struct TxEvent {
    pub chain_id: u64,
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: u64,
    /// Block timestamp, unix seconds.
    pub timestamp: u64,
    pub input: Bytes,
    pub traces: Vec<TraceCall>,
    pub logs: Vec<Log>,
}

impl TxEvent {
    /// True when the node returned no internal call traces for this
    /// transaction. Native-only balance changes are then unverifiable.
    pub fn has_traces(&self) -> bool {
        !self.traces.is_empty()
    }
}

/// Balance-relevant effects decoded once at the log boundary. The rest of
/// the core operates only on these variants, never on raw logs.
#[derive(Debug, Clone)]
pub enum TransferEffect {
    /// ERC-20 Transfer(from, to, value).
    Token {
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    },
    /// ERC-721 Transfer(from, to, tokenId) or ERC-1155 TransferSingle.
    /// `amount` is 1 for ERC-721.
    Nft {
        collection: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    /// Wrapped-native Deposit(dst, value). Asset-preserving conversion.
    WrappedDeposit {
        wrapper: Address,
        dst: Address,
        value: U256,
    },
    /// Wrapped-native Withdrawal(src, value). Asset-preserving conversion.
    WrappedWithdrawal {
        wrapper: Address,
        src: Address,
        value: U256,
    },
}

impl TransferEffect {
    /// The token contract an ERC-20 effect settles in, if any.
    pub fn erc20_token(&self) -> Option<Address> {
        match self {
            TransferEffect::Token { token, .. } => Some(*token),
            _ => None,
        }
    }
}
