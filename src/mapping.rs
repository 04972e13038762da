//! Event-to-record mappers.
//!
//! Every contract event maps to exactly one newly created record, copying
//! the event fields as is together with block and transaction metadata.
//! Mappers are pure, there is no validation, defaulting or derived state.

use tracing::{debug, warn};

use crate::{
    abi::perpetual::LidoAPYPerpetual::{self, LidoAPYPerpetualEvents},
    store::{self, Entity, RecordMeta, Store, StoreError},
    stream, types,
};

/// Contract event with a corresponding record shape.
pub trait MapRecord {
    type Record: Into<Entity>;

    fn map_record(&self, meta: RecordMeta) -> Self::Record;
}

impl MapRecord for LidoAPYPerpetual::APYUpdated {
    type Record = store::ApyUpdated;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::ApyUpdated {
            meta,
            new_apy: self.newAPY,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::OwnershipTransferred {
    type Record = store::OwnershipTransferred;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::OwnershipTransferred {
            meta,
            previous_owner: self.previousOwner,
            new_owner: self.newOwner,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::PositionOpened {
    type Record = store::PositionOpened;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::PositionOpened {
            meta,
            trader: self.trader,
            token: self.token,
            is_long: self.isLong,
            size: self.size,
            collateral: self.collateral,
            leverage: self.leverage,
            entry_apy: self.entryAPY,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::PositionClosed {
    type Record = store::PositionClosed;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::PositionClosed {
            meta,
            trader: self.trader,
            token: self.token,
            is_long: self.isLong,
            profit: self.profit,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::PositionLiquidated {
    type Record = store::PositionLiquidated;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::PositionLiquidated {
            meta,
            trader: self.trader,
            token: self.token,
            is_long: self.isLong,
            collateral: self.collateral,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::TokenAdded {
    type Record = store::TokenAdded;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::TokenAdded {
            meta,
            token: self.token,
        }
    }
}

impl MapRecord for LidoAPYPerpetual::TokenRemoved {
    type Record = store::TokenRemoved;

    fn map_record(&self, meta: RecordMeta) -> Self::Record {
        store::TokenRemoved {
            meta,
            token: self.token,
        }
    }
}

/// Maps a single typed event to its record.
pub fn map<E: MapRecord>(instant: types::StateInstant, ctx: &types::EventContext<E>) -> E::Record {
    ctx.event().map_record(RecordMeta::new(instant, ctx))
}

/// Maps a single typed event and writes the record to the store.
pub fn handle<E: MapRecord>(
    store: &Store,
    instant: types::StateInstant,
    ctx: &types::EventContext<E>,
) -> Result<(), StoreError> {
    store.insert(map(instant, ctx))
}

/// Maps a decoded contract event of any kind.
pub fn map_event(instant: types::StateInstant, ctx: &stream::RawEvent) -> Entity {
    let meta = RecordMeta::new(instant, ctx);
    match ctx.event() {
        LidoAPYPerpetualEvents::APYUpdated(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::OwnershipTransferred(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::PositionClosed(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::PositionLiquidated(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::PositionOpened(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::TokenAdded(e) => e.map_record(meta).into(),
        LidoAPYPerpetualEvents::TokenRemoved(e) => e.map_record(meta).into(),
    }
}

/// Maps all events of the block and writes the records to the store.
///
/// Events already recorded are skipped. Returns the number of records written.
pub fn handle_block(store: &Store, block: &stream::RawBlockEvents) -> usize {
    let instant = block.instant();
    let mut written = 0;
    for ctx in block.events() {
        let entity = map_event(instant, ctx);
        let kind = entity.kind();
        match store.insert(entity) {
            Ok(()) => written += 1,
            Err(StoreError::Duplicate(id)) => {
                warn!(%id, %kind, "Record exists already, skipping")
            }
        }
    }
    debug!(
        block_number = instant.block_number(),
        events = block.events().len(),
        written,
        "Block mapped"
    );
    written
}
