use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use super::types::TransferEffect;

// Transfer-shaped event signatures the ledger understands. ERC-20 and
// ERC-721 share the Transfer topic and are told apart by topic count.
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
    event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value);
    event Deposit(address indexed dst, uint256 wad);
    event Withdrawal(address indexed src, uint256 wad);
}

/// Decode a transaction's receipt logs into the closed set of transfer
/// effects. Malformed entries are skipped, never fatal.
///
/// `wrapped_native` is the chain's canonical wrapped-native contract;
/// Deposit/Withdrawal logs from any other contract are ignored since the
/// event shapes are not unique to wrappers.
pub fn decode_transfer_effects(logs: &[Log], wrapped_native: Option<Address>) -> Vec<TransferEffect> {
    let mut effects = Vec::new();

    for log in logs {
        let inner = &log.inner;
        let topics = inner.data.topics();
        if topics.is_empty() {
            continue;
        }
        let data = inner.data.data.as_ref();

        if topics[0] == Transfer::SIGNATURE_HASH {
            match topics.len() {
                // ERC-20: signature + from + to, value in data
                3 => {
                    if data.len() < 32 {
                        continue;
                    }
                    effects.push(TransferEffect::Token {
                        token: inner.address,
                        from: Address::from_word(topics[1]),
                        to: Address::from_word(topics[2]),
                        value: U256::from_be_slice(&data[..32]),
                    });
                }
                // ERC-721: signature + from + to + tokenId, all indexed
                4 => {
                    effects.push(TransferEffect::Nft {
                        collection: inner.address,
                        from: Address::from_word(topics[1]),
                        to: Address::from_word(topics[2]),
                        amount: U256::from(1u8),
                    });
                }
                _ => {}
            }
        } else if topics[0] == TransferSingle::SIGNATURE_HASH {
            // ERC-1155: signature + operator + from + to, (id, value) in data
            if topics.len() != 4 || data.len() < 64 {
                continue;
            }
            effects.push(TransferEffect::Nft {
                collection: inner.address,
                from: Address::from_word(topics[2]),
                to: Address::from_word(topics[3]),
                amount: U256::from_be_slice(&data[32..64]),
            });
        } else if Some(inner.address) == wrapped_native {
            if topics[0] == Deposit::SIGNATURE_HASH && topics.len() == 2 && data.len() >= 32 {
                effects.push(TransferEffect::WrappedDeposit {
                    wrapper: inner.address,
                    dst: Address::from_word(topics[1]),
                    value: U256::from_be_slice(&data[..32]),
                });
            } else if topics[0] == Withdrawal::SIGNATURE_HASH && topics.len() == 2 && data.len() >= 32
            {
                effects.push(TransferEffect::WrappedWithdrawal {
                    wrapper: inner.address,
                    src: Address::from_word(topics[1]),
                    value: U256::from_be_slice(&data[..32]),
                });
            }
        }
    }

    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, B256};

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    pub fn erc20_log(token: Address, from: Address, to: Address, value: U256) -> Log {
        let topics = vec![
            Transfer::SIGNATURE_HASH,
            from.into_word(),
            to.into_word(),
        ];
        let data = Bytes::from(value.to_be_bytes::<32>().to_vec());
        Log {
            inner: alloy::primitives::Log {
                address: token,
                data: LogData::new_unchecked(topics, data),
            },
            ..Default::default()
        }
    }

    #[test]
    fn decodes_erc20_transfer() {
        let log = erc20_log(addr(9), addr(1), addr(2), U256::from(1000u64));
        let effects = decode_transfer_effects(&[log], None);
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            TransferEffect::Token { token, from, to, value } => {
                assert_eq!(*token, addr(9));
                assert_eq!(*from, addr(1));
                assert_eq!(*to, addr(2));
                assert_eq!(*value, U256::from(1000u64));
            }
            other => panic!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn erc721_transfer_decodes_as_nft() {
        let topics = vec![
            Transfer::SIGNATURE_HASH,
            addr(1).into_word(),
            addr(2).into_word(),
            B256::with_last_byte(7), // tokenId
        ];
        let log = Log {
            inner: alloy::primitives::Log {
                address: addr(9),
                data: LogData::new_unchecked(topics, Bytes::new()),
            },
            ..Default::default()
        };
        let effects = decode_transfer_effects(&[log], None);
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            effects[0],
            TransferEffect::Nft { amount, .. } if amount == U256::from(1u8)
        ));
    }

    #[test]
    fn malformed_log_is_skipped() {
        // ERC-20 shape but truncated data
        let topics = vec![
            Transfer::SIGNATURE_HASH,
            addr(1).into_word(),
            addr(2).into_word(),
        ];
        let log = Log {
            inner: alloy::primitives::Log {
                address: addr(9),
                data: LogData::new_unchecked(topics, Bytes::from(vec![0u8; 8])),
            },
            ..Default::default()
        };
        assert!(decode_transfer_effects(&[log], None).is_empty());
    }

    #[test]
    fn deposit_only_decoded_for_wrapper_contract() {
        let weth = addr(0xEE);
        let topics = vec![Deposit::SIGNATURE_HASH, addr(1).into_word()];
        let data = Bytes::from(U256::from(5u64).to_be_bytes::<32>().to_vec());
        let mk = |address| Log {
            inner: alloy::primitives::Log {
                address,
                data: LogData::new_unchecked(topics.clone(), data.clone()),
            },
            ..Default::default()
        };

        assert_eq!(decode_transfer_effects(&[mk(weth)], Some(weth)).len(), 1);
        assert!(decode_transfer_effects(&[mk(addr(0xDD))], Some(weth)).is_empty());
    }
}
