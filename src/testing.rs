//! Mock events and logs for tests.
//!
//! [`new_mock_event`] wraps a typed event into the default transaction
//! context, the `create_*_event` helpers build each contract event from its
//! parameters, and [`mock_log`] produces the RPC log a node would return for
//! an event, to exercise decoding.

use alloy::{
    primitives::{self, Address, TxHash, U256, address, b256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{
    abi::perpetual::LidoAPYPerpetual::{
        APYUpdated, LidoAPYPerpetualEvents, OwnershipTransferred, PositionClosed,
        PositionLiquidated, PositionOpened, TokenAdded, TokenRemoved,
    },
    stream::RawEvent,
    types::{EventContext, StateInstant},
};

/// Address of the contract emitting mock events.
pub const DEFAULT_MOCK_CONTRACT: Address = address!("0xa16081f360e3847006db660bae1c6d1b2e17ec2a");

/// Transaction hash of mock events.
///
/// It is [`DEFAULT_MOCK_CONTRACT`] left-padded to 32 bytes, so record IDs
/// of mock events read `0x000000000000000000000000a16081f3...2ec2a-1`,
/// not the 20-byte address form.
pub const DEFAULT_MOCK_TX_HASH: TxHash =
    b256!("0x000000000000000000000000a16081f360e3847006db660bae1c6d1b2e17ec2a");

/// Log index of mock events.
pub const DEFAULT_MOCK_LOG_INDEX: u64 = 1;

/// Transaction index of mock events.
pub const DEFAULT_MOCK_TX_INDEX: u64 = 0;

/// Block mock events are produced at.
pub fn mock_instant() -> StateInstant {
    StateInstant::new(1, 1)
}

pub fn new_mock_event<E>(event: E) -> EventContext<E> {
    EventContext::new(
        DEFAULT_MOCK_TX_HASH,
        DEFAULT_MOCK_TX_INDEX,
        DEFAULT_MOCK_LOG_INDEX,
        event,
    )
}

pub fn mock_raw_event(tx_hash: TxHash, log_index: u64, event: LidoAPYPerpetualEvents) -> RawEvent {
    EventContext::new(tx_hash, DEFAULT_MOCK_TX_INDEX, log_index, event)
}

pub fn create_apy_updated_event(new_apy: U256) -> EventContext<APYUpdated> {
    new_mock_event(APYUpdated { newAPY: new_apy })
}

pub fn create_ownership_transferred_event(
    previous_owner: Address,
    new_owner: Address,
) -> EventContext<OwnershipTransferred> {
    new_mock_event(OwnershipTransferred {
        previousOwner: previous_owner,
        newOwner: new_owner,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_position_opened_event(
    trader: Address,
    token: Address,
    is_long: bool,
    size: U256,
    collateral: U256,
    leverage: U256,
    entry_apy: U256,
) -> EventContext<PositionOpened> {
    new_mock_event(PositionOpened {
        trader,
        token,
        isLong: is_long,
        size,
        collateral,
        leverage,
        entryAPY: entry_apy,
    })
}

pub fn create_position_closed_event(
    trader: Address,
    token: Address,
    is_long: bool,
    profit: U256,
) -> EventContext<PositionClosed> {
    new_mock_event(PositionClosed {
        trader,
        token,
        isLong: is_long,
        profit,
    })
}

pub fn create_position_liquidated_event(
    trader: Address,
    token: Address,
    is_long: bool,
    collateral: U256,
) -> EventContext<PositionLiquidated> {
    new_mock_event(PositionLiquidated {
        trader,
        token,
        isLong: is_long,
        collateral,
    })
}

pub fn create_token_added_event(token: Address) -> EventContext<TokenAdded> {
    new_mock_event(TokenAdded { token })
}

pub fn create_token_removed_event(token: Address) -> EventContext<TokenRemoved> {
    new_mock_event(TokenRemoved { token })
}

/// RPC log of the event as emitted by `contract` within the given block and transaction.
pub fn mock_log<E: SolEvent>(
    contract: Address,
    instant: StateInstant,
    tx_hash: TxHash,
    tx_index: u64,
    log_index: u64,
    event: &E,
) -> Log {
    Log {
        inner: primitives::Log {
            address: contract,
            data: event.encode_log_data(),
        },
        block_hash: None,
        block_number: Some(instant.block_number()),
        block_timestamp: Some(instant.block_timestamp()),
        transaction_hash: Some(tx_hash),
        transaction_index: Some(tx_index),
        log_index: Some(log_index),
        removed: false,
    }
}
