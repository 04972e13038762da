use alloy::primitives::TxHash;

/// Decoded contract events of one block, in log order.
#[derive(Clone, Debug)]
pub struct BlockEvents<T> {
    instant: super::StateInstant,
    events: Vec<T>,
}

impl<T> BlockEvents<T> {
    pub fn new(instant: super::StateInstant, events: Vec<T>) -> Self {
        Self { instant, events }
    }

    pub fn instant(&self) -> super::StateInstant {
        self.instant
    }

    pub fn events(&self) -> &[T] {
        &self.events
    }

    /// Whether the contract emitted nothing in this block.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Contract event with the position of its log in the chain.
///
/// `tx_hash` and `log_index` together identify the log and become the key
/// of the record mapped from it.
#[derive(Clone, Debug)]
pub struct EventContext<T> {
    pub(crate) tx_hash: TxHash,
    pub(crate) tx_index: u64,
    pub(crate) log_index: u64,
    pub(crate) event: T,
}

impl<T> EventContext<T> {
    pub fn new(tx_hash: TxHash, tx_index: u64, log_index: u64, event: T) -> Self {
        Self {
            tx_hash,
            tx_index,
            log_index,
            event,
        }
    }

    /// Same event emitted by another transaction.
    pub fn with_tx_hash(self, tx_hash: TxHash) -> Self {
        Self { tx_hash, ..self }
    }

    /// Same event at another log position.
    pub fn with_log_index(self, log_index: u64) -> Self {
        Self { log_index, ..self }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    pub fn log_index(&self) -> u64 {
        self.log_index
    }

    pub fn event(&self) -> &T {
        &self.event
    }
}
