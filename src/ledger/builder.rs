use alloy::primitives::I256;

use crate::tx::types::{TransferEffect, TxEvent};

use super::types::{AssetId, Ledger};

/// Fold a transaction's decoded transfer effects and traced native value
/// flows into a per-address, per-asset delta ledger.
///
/// Wrapped-native deposits and withdrawals are asset-preserving: a Deposit
/// credits the depositor's native balance (offsetting the traced outflow
/// into the wrapper), a Withdrawal debits it (offsetting the traced refund).
/// Without the offset every wrap/unwrap would read as profit or loss.
pub fn build_ledger(tx: &TxEvent, effects: &[TransferEffect]) -> Ledger {
    let mut ledger = Ledger::new();

    for effect in effects {
        match effect {
            TransferEffect::Token { token, from, to, value } => {
                let Some(amount) = to_signed(*value) else {
                    continue;
                };
                ledger.apply(*from, AssetId::Token(*token), -amount);
                ledger.apply(*to, AssetId::Token(*token), amount);
            }
            TransferEffect::Nft { collection, from, to, amount } => {
                let Some(amount) = to_signed(*amount) else {
                    continue;
                };
                ledger.apply(*from, AssetId::Token(*collection), -amount);
                ledger.apply(*to, AssetId::Token(*collection), amount);
            }
            TransferEffect::WrappedDeposit { dst, value, .. } => {
                if let Some(amount) = to_signed(*value) {
                    ledger.apply(*dst, AssetId::Native, amount);
                }
            }
            TransferEffect::WrappedWithdrawal { src, value, .. } => {
                if let Some(amount) = to_signed(*value) {
                    ledger.apply(*src, AssetId::Native, -amount);
                }
            }
        }
    }

    // Native value movement comes from traces when available; the top-level
    // transfer is part of the trace set on nodes that support tracing.
    if tx.has_traces() {
        for trace in &tx.traces {
            if trace.value.is_zero() {
                continue;
            }
            let (Some(to), Some(amount)) = (trace.to, to_signed(trace.value)) else {
                continue;
            };
            ledger.apply(trace.from, AssetId::Native, -amount);
            ledger.apply(to, AssetId::Native, amount);
        }
    } else if !tx.value.is_zero() {
        if let (Some(to), Some(amount)) = (tx.to, to_signed(tx.value)) {
            ledger.apply(tx.from, AssetId::Native, -amount);
            ledger.apply(to, AssetId::Native, amount);
        }
    }

    ledger
}

/// A transfer amount above i256::MAX is not representable as a signed
/// delta; such a log is treated as malformed and skipped.
fn to_signed(value: alloy::primitives::U256) -> Option<I256> {
    I256::try_from(value).ok()
}
