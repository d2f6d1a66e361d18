use alloy::primitives::Address;
use std::collections::HashSet;
use std::str::FromStr;

/// Known neutral intermediaries: DEX routers, aggregators, settlement
/// contracts, batch senders. These show large transient balance swings on
/// nearly every big swap and must never be treated as profit recipients.
const ROUTER_ADDRESSES: &[&str] = &[
    "0x00000000000000adc04c56bf30ac9d3c0aaf14dc", // Seaport 1.5
    "0xdef1c0ded9bec7f1a1670819833240f027b25eff", // 0x Exchange Proxy
    "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad", // Uniswap Universal Router
    "0xef1c6e67703c7bd7107eed8303fbe6ec2554bf6b", // Uniswap Universal Router V2
    "0xe592427a0aece92de3edee1f18e0157c05861564", // Uniswap V3: Router
    "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", // Uniswap V3: Router 2
    "0x7a250d5630b4cf539739df2c5dacb4c659f2488d", // Uniswap V2: Router 2
    "0x6000da47483062a0d734ba3dc7576ce6a0b645c4", // UniswapX Dutch Auction Reactor
    "0xc36442b4a4522e871399cd717abdd847ab11fe88", // Uniswap V3: Positions NFT
    "0x10ed43c718714eb63d5aa57b78b54704e256024e", // PancakeSwap Router (BSC)
    "0x13f4ea83d0bd40e75c8222255bc855a974568dd4", // PancakeSwap Smart Router V3 (BSC)
    "0x1a0a18ac4becddbd6389559687d1a73d8927e416", // PancakeSwap Universal Router (BSC)
    "0x881d40237659c251811cec9c364ef91dc08d300c", // Metamask Swap Router (ETH)
    "0x1a1ec25dc08e98e5e93f1104b5e5cdd298707d31", // Metamask Swap Router (BSC)
    "0x9dda6ef3d919c9bc8885d5560999a3640431e8e6", // Metamask Swap Router (Arbitrum)
    "0x1111111254eeb25477b68fb85ed929f73a960582", // 1inch Router v5
    "0x111111125421ca6dc452d289314280a0f8842a65", // 1inch Router v6
    "0x1111111254fb6c44bac0bed2854e76f90643097d", // 1inch Router v4
    "0x9008d19f58aabd9ed0d60971565aa8510560ab41", // CoW Protocol: GPv2Settlement
    "0xba12222222228d8ba445958a75a0704d566bf2c8", // Balancer Vault
    "0x6131b5fae19ea4f9d964eac0408e4408b66337b5", // Kyberswap: Meta Aggregation Router V2
    "0xdef171fe48cf0115b1d80b88dc8eab59176fee57", // Paraswap V5: Augustus Swapper
    "0x5ff137d4b0fdcd49dca30c7cf57e578a026d2789", // ERC-4337 Entry Point 0.6.0
    "0xd152f549545093347a162dce210e7293f1452150", // Disperse App
    "0xd91efec7e42f80156d1d9f660a69847188950747", // KuCoin ERC-20 Batch Transfer
    "0xa5e0829caced8ffdd4de3c43696c57f7d7a678ff", // QuickSwap Router (Polygon)
    "0xf5b509bb0909a69b1c207e495f687a596c168e12", // QuickSwap Router V3 (Polygon)
    "0xb4315e873dbcf96ffd0acd8ea43f689d8c20fb30", // TraderJoe LB Router (Avalanche)
    "0x9333c74bdd1e118634fe5664aca7a9710b108bab", // OKX Dex Router (BSC)
    "0xa748d6573aca135af68f2635be60cb80278bd855", // OKX Dex Router (Polygon)
    "0xcf5540fffcdc3d510b18bfca6d2b9987b0772559", // Odos Router V2 (Ethereum)
    "0x89b8aa89fdd0507a99d334cbe3c808fafc7d850e", // Odos Router V2 (BSC)
    "0xa669e7a0d4b3e4fa48af2de86bd4cd7126be4e13", // Odos Router V2 (Arbitrum)
    "0x1231deb6f5749ef6ce6943a275a1d3e7486f4eae", // LI.FI Diamond
    "0x00000000005bbb0ef59571e58418f9a4357b68a0", // Pendle: Router V3
    "0x888888888889758f76e7103c6cbf23abbf58f946", // Pendle: Router V4
    "0xd50cf00b6e600dd036ba8ef475677d816d6c4281", // Radiant Lending Pool (BSC)
    "0x8a226b70dceb9656eb75545424400128fcef9d9e", // Radiant Capital wETH Gateway (BSC)
    "0xf0d4c12a5768d806021f80a262b4d39d26c58b8d", // Curve Router
    "0x400d75dab26bbc18d163aea3e83d9ea68f6c1804", // SushiSwap RouteProcessor3 (BSC)
    "0x544ba588efd839d2692fc31ea991cd39993c135f", // SushiSwap RouteProcessor4 (Arbitrum)
    "0xf491e7b69e4244ad4002bc14e878a34207e38c29", // SpookySwap: Router (Fantom)
    "0xe66b31678d6c16e9ebf358268a790b763c133750", // 0x: Coinbase Wallet Proxy
    "0xa7995f71aa11525db02fc2473c37dee5dbf55107", // Morpho: ETH Bundler
    "0x4095f064b8d3c3548a3bebfd0bbfd04750e30077", // Morpho: ETH Bundler V2
    "0x3a23f943181408eac424116af7b7790c94cb97a5", // Socket Gateway (BSC)
    "0x11e590f6092d557bf71baded50d81521674f8275", // GMX Exchange Router (Avalanche)
    "0xe54ca86531e17ef3616d22ca28b0d458b6c89106", // Pangolin Router (Avalanche)
];

/// NFT-collateralized lending peripherals, per chain. Same rationale as the
/// routers: loan principal passes through without being theirs.
const NFT_LENDING_ETHEREUM: &[&str] = &[
    "0x52ab06b7a6eefaf50587cdb7d896a999970067be", // Cyan Payment Plan 1.0
    "0xe803684b9e391d01dc1cdf76bac9ae3a596b2ae0", // Cyan Payment Plan V2
    "0x29469395eaf6f95920e59f858042f0e28d98a20b", // Blur: Blend
    "0x70b97a0da65c15dfb0ffa02aee6fa36e507c2762", // BendDAO: LendPool
    "0x774badbc759234bff52b0be11bf61bb68c9e9a24", // Pine Router
    "0x197bb6cd6cc9e9abbfdabff23de7435c51d1b7be", // Astaria
    "0x4c52ca29388a8a854095fd2beb83191d68dc840b", // Arcade.xyz: Origination Controller Proxy
    "0x8252df1d8b29057d1afe3062bf5a64d503152bc8", // NFTfi: DirectLoanFixedOfferRedeploy
    "0xe52cec0e90115abeb3304baa36bc2655731f7934", // NFTfi: DirectLoanFixedCollectionOffer
    "0x59b72fdb45b3182c8502cc297167fe4f821f332d", // Paraspace Proxy
];

const NFT_LENDING_POLYGON: &[&str] = &[
    "0x14515508958d4e3b4a16ab10250e36d0b965cc02", // Cyan Payment Plan
    "0x50160ff9c19fbe2b5643449e1a321cac15af2b2c", // PWN
];

const NFT_LENDING_ARBITRUM: &[&str] = &[
    "0x1e600b69d5e30e5293c250f554d96adf9acfe990", // DEFRAG Genesis Legion Asset Manager V1
    "0xf7ad5e19aa2333a5fe3e970a48a2a9ab482435c5", // DEFRAG Genesis Legion Asset Manager V2
    "0x8d1776dc9c6188f23112d665b006ced16e67812c", // DEFRAG Smols AssetManager
];

/// Canonical wrapped-native token per chain. Wrappers accrue the native
/// side of every deposit, so they are filtered like routers.
pub fn wrapped_native_token(chain_id: u64) -> Option<Address> {
    let hex = match chain_id {
        1 => "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
        10 => "0x4200000000000000000000000000000000000006",
        56 => "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c",
        137 => "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270",
        43114 => "0xb31f66aa3c1e785363f0875a1b74e27b85fd66c7",
        _ => return None,
    };
    Address::from_str(hex).ok()
}

/// Immutable, per-process-lifetime membership index over the curated
/// intermediary sets for one chain. Built once at startup; reads need no
/// locking.
pub struct RouterFilter {
    members: HashSet<Address>,
}

impl RouterFilter {
    pub fn for_chain(chain_id: u64) -> Self {
        let nft_lending: &[&str] = match chain_id {
            1 => NFT_LENDING_ETHEREUM,
            137 => NFT_LENDING_POLYGON,
            42161 => NFT_LENDING_ARBITRUM,
            _ => &[],
        };

        let mut members = HashSet::new();
        for hex in ROUTER_ADDRESSES.iter().chain(nft_lending) {
            match Address::from_str(hex) {
                Ok(address) => {
                    members.insert(address);
                }
                Err(e) => {
                    tracing::error!(address = %hex, error = %e, "Invalid curated router address, skipping");
                }
            }
        }
        if let Some(wrapper) = wrapped_native_token(chain_id) {
            members.insert(wrapper);
        }

        Self { members }
    }

    /// O(1) membership test. Address parsing is case-insensitive, so any
    /// hex casing of the same address answers identically.
    pub fn is_known_router(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
