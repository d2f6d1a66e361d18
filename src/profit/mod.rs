pub mod classifier;
pub mod signatures;

use alloy::primitives::Address;

/// An address whose net gain in some asset cleared the materiality
/// threshold. Produced by the classifier, consumed once by the finding
/// assembler.
#[derive(Debug, Clone)]
pub struct ProfitCandidate {
    pub address: Address,
    pub confidence: f64,
    pub anomaly_score: f64,
    /// True when `profit` is a USD amount; false when it is a percentage
    /// of the asset's total supply (no price was available).
    pub is_profit_in_usd: bool,
    pub profit: f64,
}
