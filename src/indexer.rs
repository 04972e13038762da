//! Background indexing of contract events into the record store.
//!
//! [`start`] spawns a task following [`crate::stream::raw`] and applying
//! [`crate::mapping::handle_block`] to every block in order, reporting the
//! progress through a channel.
//!
//! ```ignore
//! let store = Arc::new(Store::new());
//! let (mut rx, handle) = indexer::start(&chain, provider, from, tokio::time::sleep, store.clone());
//!
//! while let Some(block) = rx.recv().await {
//!     println!("Block {}: {} records", block.instant.block_number(), block.records);
//! }
//!
//! handle.await??;
//! ```

use std::{future::Future, sync::Arc, time::Duration};

use alloy::providers::Provider;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::info;

use crate::{Chain, error::PerpError, mapping, store::Store, stream, types};

/// Default channel buffer size.
const DEFAULT_CHANNEL_SIZE: usize = 100;

/// Outcome of indexing a single block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedBlock {
    /// Block instant.
    pub instant: types::StateInstant,

    /// Number of contract events in the block.
    pub events: usize,

    /// Number of records written.
    pub records: usize,
}

/// Start the indexer.
///
/// Returns a receiver of per-block progress and a handle to the background
/// task. Blocks are reported even if they contain no events. The task stops
/// with the first stream error or once the receiver is dropped.
pub fn start<P, S, SFut>(
    chain: &Chain,
    provider: P,
    from: types::StateInstant,
    sleep: S,
    store: Arc<Store>,
) -> (
    mpsc::Receiver<IndexedBlock>,
    tokio::task::JoinHandle<Result<(), PerpError>>,
)
where
    P: Provider + Send + 'static,
    S: Fn(Duration) -> SFut + Copy + Send + 'static,
    SFut: Future<Output = ()> + Send,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);

    let chain = chain.clone();
    let handle =
        tokio::spawn(async move { run_indexer(chain, provider, from, sleep, store, tx).await });

    (rx, handle)
}

async fn run_indexer<P, S, SFut>(
    chain: Chain,
    provider: P,
    from: types::StateInstant,
    sleep: S,
    store: Arc<Store>,
    tx: mpsc::Sender<IndexedBlock>,
) -> Result<(), PerpError>
where
    P: Provider,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    info!(
        contract = %chain.contract(),
        from_block = from.block_number(),
        "Indexing contract events"
    );

    let raw_stream = stream::raw(&chain, provider, from, sleep);
    futures::pin_mut!(raw_stream);

    let mut next_block = from.block_number();
    while let Some(result) = raw_stream.next().await {
        let block_events = result?;
        let instant = block_events.instant();
        if instant.block_number() != next_block {
            return Err(PerpError::BlockOutOfOrder(next_block, instant.block_number()));
        }
        next_block += 1;

        let indexed = IndexedBlock {
            instant,
            events: block_events.events().len(),
            records: mapping::handle_block(&store, &block_events),
        };

        if tx.send(indexed).await.is_err() {
            // Receiver dropped, graceful shutdown
            break;
        }
    }

    Ok(())
}
