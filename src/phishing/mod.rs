pub mod correlator;
pub mod rules;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub use correlator::TransferCorrelator;

/// One observed native-asset outflow attributable to a victim. Appended
/// to the victim's rolling window and persisted so state survives
/// restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub from_nonce: u64,
    pub funding_address: Option<Address>,
    pub latest_to: Address,
    pub value: U256,
    /// Block timestamp, unix seconds.
    pub timestamp: u64,
}
