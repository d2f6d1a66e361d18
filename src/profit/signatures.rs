use alloy::primitives::{Address, B256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use std::collections::HashSet;

use crate::tx::types::TxEvent;

// Call shapes that show up at the top of known exploit transactions:
// liquidity removal, collateral borrow, staking/vault withdrawal. An
// address initiating one of these while also booking an outsized gain is
// a much stronger signal than the gain alone.
sol! {
    function remove_liquidity(uint256 _amount, uint256[2] min_amounts);
    function removeLiquidity(address tokenA, address tokenB, uint256 liquidity, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline);
    function removeLiquidityETH(address token, uint256 liquidity, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline);
    function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf);
    function burn(int24 tickLower, int24 tickUpper, uint128 amount);
    function withdrawAndUnwrap(uint256 amount);
    function instantWithdraw(uint256 amount, uint256 shares);
    function unstake(uint256 amount, bool trigger);
}

sol! {
    event DecreaseLiquidity(uint256 indexed tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);
    event WithdrawFromPosition(uint256 indexed tokenId, uint256 amount);
    event Withdrawn(address indexed user, uint256 amount);
    event WithdrawLocked(address indexed user, uint256 amount, bytes32 kek_id, address destination);
    event RewardClaimed(bytes32 indexed identifier, address indexed token, address indexed account, uint256 amount);
    event Unstaked(uint256 depositId, address indexed user, uint256 amount);
    event MintAndWithdraw(address indexed mintRecipient, uint256 amount, address indexed mintToken);
}

/// Selectors observed in drained-swap tooling that have no public ABI.
const OPAQUE_SWAP_SELECTORS: [[u8; 4]; 4] = [
    [0x1d, 0xc4, 0x37, 0xb1], // swapExactETHForTokens(uint256) variant
    [0x49, 0xbc, 0x17, 0xe9],
    [0xc1, 0x0b, 0xea, 0x5c], // swap(tuple,tuple)
    [0x56, 0xfe, 0xb1, 0x1b], // swapTokensForEth(address,uint256)
];

const CONVEX_WITHDRAW_LOCKED_AND_UNWRAP: [u8; 4] = [0x4a, 0xb7, 0x94, 0xa3];

const EXPLOIT_SELECTORS: [[u8; 4]; 13] = [
    remove_liquidityCall::SELECTOR,
    removeLiquidityCall::SELECTOR,
    removeLiquidityETHCall::SELECTOR,
    borrowCall::SELECTOR,
    burnCall::SELECTOR,
    withdrawAndUnwrapCall::SELECTOR,
    instantWithdrawCall::SELECTOR,
    unstakeCall::SELECTOR,
    OPAQUE_SWAP_SELECTORS[0],
    OPAQUE_SWAP_SELECTORS[1],
    OPAQUE_SWAP_SELECTORS[2],
    OPAQUE_SWAP_SELECTORS[3],
    CONVEX_WITHDRAW_LOCKED_AND_UNWRAP,
];

pub fn is_exploit_selector(input: &[u8]) -> bool {
    input.len() >= 4 && EXPLOIT_SELECTORS.iter().any(|sel| &input[..4] == sel)
}

pub fn is_exploit_event_topic(topic: &B256) -> bool {
    [
        DecreaseLiquidity::SIGNATURE_HASH,
        WithdrawFromPosition::SIGNATURE_HASH,
        Withdrawn::SIGNATURE_HASH,
        WithdrawLocked::SIGNATURE_HASH,
        RewardClaimed::SIGNATURE_HASH,
        Unstaked::SIGNATURE_HASH,
        MintAndWithdraw::SIGNATURE_HASH,
    ]
    .contains(topic)
}

/// Addresses acting as the initiator of an exploit-shaped call in this
/// transaction. The transaction sender counts when an exploit-shaped
/// event fired anywhere in the receipt.
pub fn exploit_actors(tx: &TxEvent) -> HashSet<Address> {
    let mut actors = HashSet::new();

    for trace in &tx.traces {
        if is_exploit_selector(trace.input.as_ref()) {
            actors.insert(trace.from);
        }
    }
    if is_exploit_selector(tx.input.as_ref()) {
        actors.insert(tx.from);
    }

    let any_exploit_event = tx.logs.iter().any(|log| {
        log.inner
            .data
            .topics()
            .first()
            .map(is_exploit_event_topic)
            .unwrap_or(false)
    });
    if any_exploit_event {
        actors.insert(tx.from);
    }

    actors
}
