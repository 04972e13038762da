use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    primitives::B256,
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEventInterface,
};
use futures::{Stream, stream};
use tracing::warn;

use crate::{
    Chain,
    abi::perpetual::LidoAPYPerpetual::LidoAPYPerpetualEvents,
    error::{BLOCK_NOT_AVAILABLE, PerpError},
    types,
};

pub type RawEvent = types::EventContext<LidoAPYPerpetualEvents>;
pub type RawBlockEvents = types::BlockEvents<RawEvent>;

/// Returns stream of raw events emitted by the perpetual contract,
/// batched per block, starting from the specified block.
///
/// Polls logs via the given [`Provider`] to produce strictly continuous
/// event sequence, with [`Provider`]-configured interval.
///
/// It is recommended to setup provider with
/// [`alloy::transports::layers::RetryBackoffLayer`].
///
/// See [`LidoAPYPerpetualEvents`] for the list of possible events.
pub fn raw<P, S, SFut>(
    chain: &Chain,
    provider: P,
    from: types::StateInstant,
    sleep: S,
) -> impl Stream<Item = Result<RawBlockEvents, PerpError>>
where
    P: Provider,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    let contract = chain.contract();
    stream::unfold(
        (provider, from.block_number()),
        move |(provider, mut block_num)| async move {
            let filter = Filter::new()
                .address(contract)
                .event_signature(event_signatures())
                .from_block(block_num)
                .to_block(block_num);
            loop {
                let result = next_block(&provider, &filter, block_num).await;
                match result {
                    Ok(block) => {
                        block_num += 1;
                        return Some((Ok(block), (provider, block_num)));
                    }
                    Err(err) if err.is_block_pending() => {
                        sleep(provider.client().poll_interval()).await;
                    }
                    Err(err) => return Some((Err(err), (provider, block_num))),
                }
            }
        },
    )
}

fn event_signatures() -> Vec<B256> {
    LidoAPYPerpetualEvents::SELECTORS
        .iter()
        .copied()
        .map(B256::from)
        .collect()
}

async fn next_block<P: Provider>(
    provider: &P,
    filter: &Filter,
    block_num: u64,
) -> Result<RawBlockEvents, PerpError> {
    // Some nodes return an empty log list instead of an error for
    // blocks beyond the tip, so the head is checked explicitly
    let (head_block_num, logs) =
        futures::try_join!(provider.get_block_number(), provider.get_logs(filter))?;
    if head_block_num < block_num {
        return Err(PerpError::InvalidRequest(BLOCK_NOT_AVAILABLE.to_string()));
    }

    match logs.first() {
        Some(log) if log.block_timestamp.is_none() => {
            let block_ts = provider
                .get_block_by_number(BlockNumberOrTag::Number(block_num))
                .await?
                .ok_or(PerpError::NullResp)?
                .header
                .timestamp;
            decode_logs(types::StateInstant::new(block_num, block_ts), &logs)
        }
        _ => decode_block(block_num, &logs),
    }
}

/// Decodes logs of a single block into contract events, keeping log order.
///
/// Block timestamp is taken from the logs, a block without events
/// gets zero timestamp. Logs that are not perpetual events are skipped.
pub fn decode_block(block_num: u64, logs: &[Log]) -> Result<RawBlockEvents, PerpError> {
    let block_ts = logs.first().and_then(|l| l.block_timestamp);
    decode_logs(
        types::StateInstant::new(block_num, block_ts.unwrap_or_default()),
        logs,
    )
}

fn decode_logs(instant: types::StateInstant, logs: &[Log]) -> Result<RawBlockEvents, PerpError> {
    let block_num = instant.block_number();
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        if log.removed {
            continue;
        }
        if let Some(log_block) = log.block_number {
            if log_block != block_num {
                return Err(PerpError::BlockOutOfOrder(block_num, log_block));
            }
        }
        let event = match LidoAPYPerpetualEvents::decode_log(&log.inner) {
            Ok(decoded) => decoded.data,
            Err(err) => {
                warn!(%err, block_num, log_index = ?log.log_index, "Skipping unknown contract log");
                continue;
            }
        };
        events.push(RawEvent::new(
            log.transaction_hash.unwrap_or_default(),
            log.transaction_index.unwrap_or_default(),
            log.log_index.unwrap_or_default(),
            event,
        ));
    }
    Ok(RawBlockEvents::new(instant, events))
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, Bytes, LogData, TxHash, U256, b256},
        sol_types::SolEvent,
    };

    use super::*;
    use crate::{abi::perpetual::LidoAPYPerpetual, testing};

    #[test]
    fn test_decode_block() {
        let instant = types::StateInstant::new(77, 1_727_000_000);
        let tx_hash = b256!("0x47de82c4aa40baa30cabac4a74568488a8c74ded85a4e905f1ceaad4f29945e3");
        let trader = Address::repeat_byte(0x11);
        let token = Address::repeat_byte(0x22);
        let logs = vec![
            testing::mock_log(
                testing::DEFAULT_MOCK_CONTRACT,
                instant,
                tx_hash,
                5,
                14,
                &LidoAPYPerpetual::APYUpdated {
                    newAPY: U256::from(3_150_000_000_000_000_000u128),
                },
            ),
            testing::mock_log(
                testing::DEFAULT_MOCK_CONTRACT,
                instant,
                tx_hash,
                5,
                15,
                &LidoAPYPerpetual::PositionOpened {
                    trader,
                    token,
                    isLong: true,
                    size: U256::from(50),
                    collateral: U256::from(10),
                    leverage: U256::from(5),
                    entryAPY: U256::from(315),
                },
            ),
        ];

        let block = decode_block(77, &logs).unwrap();
        assert_eq!(block.instant(), instant);
        assert_eq!(block.events().len(), 2);
        assert!(
            matches!(block.events()[0], RawEvent { tx_hash: h, tx_index: 5, log_index: 14, event: LidoAPYPerpetualEvents::APYUpdated(ref e) } if h == tx_hash && e.newAPY == U256::from(3_150_000_000_000_000_000u128))
        );
        assert!(
            matches!(block.events()[1], RawEvent { log_index: 15, event: LidoAPYPerpetualEvents::PositionOpened(ref e), .. } if e.trader == trader && e.token == token && e.isLong && e.entryAPY == U256::from(315))
        );
    }

    #[test]
    fn test_decode_empty_block() {
        let block = decode_block(5, &[]).unwrap();
        assert_eq!(block.instant(), types::StateInstant::new(5, 0));
        assert!(block.is_empty());
    }

    #[test]
    fn test_decode_rejects_foreign_block() {
        let log = testing::mock_log(
            testing::DEFAULT_MOCK_CONTRACT,
            types::StateInstant::new(8, 0),
            TxHash::ZERO,
            0,
            0,
            &LidoAPYPerpetual::TokenAdded {
                token: Address::ZERO,
            },
        );
        assert!(matches!(
            decode_block(9, &[log]),
            Err(PerpError::BlockOutOfOrder(9, 8))
        ));
    }

    #[test]
    fn test_decode_skips_unknown_log() {
        let instant = types::StateInstant::new(8, 0);
        let known = testing::mock_log(
            testing::DEFAULT_MOCK_CONTRACT,
            instant,
            TxHash::ZERO,
            0,
            0,
            &LidoAPYPerpetual::APYUpdated {
                newAPY: U256::from(234),
            },
        );
        let mut unknown = known.clone();
        unknown.log_index = Some(1);
        unknown.inner.data = LogData::new_unchecked(vec![TxHash::repeat_byte(0xee)], Bytes::new());

        let block = decode_block(8, &[unknown, known]).unwrap();
        assert_eq!(block.events().len(), 1);
        assert!(
            matches!(block.events()[0], RawEvent { log_index: 0, event: LidoAPYPerpetualEvents::APYUpdated(ref e), .. } if e.newAPY == U256::from(234))
        );
    }

    #[test]
    fn test_event_signatures_cover_all_events() {
        let signatures = event_signatures();
        assert_eq!(signatures.len(), 7);
        assert!(signatures.contains(&LidoAPYPerpetual::APYUpdated::SIGNATURE_HASH));
        assert!(signatures.contains(&LidoAPYPerpetual::TokenRemoved::SIGNATURE_HASH));
    }
}
