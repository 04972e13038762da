//! Yield perpetual SDK.
//!
//! # Overview
//!
//! Indexing, querying and trading tools for the `LidoAPYPerpetual` contract,
//! a leveraged long/short product settled against the Lido stETH APR.
//!
//! Use [`stream::raw`] to follow contract events block by block and
//! [`indexer::start`] to turn them into immutable records kept in a
//! [`store::Store`]. Records are produced by the stateless mappers of
//! [`mapping`], one per contract event.
//!
//! Use [`trading::TradeForm`] to collect position parameters and
//! [`trading::Trader`] to submit them to the contract.
//!
//! [`feed::LidoClient`] fetches the reference APR, [`api`] serves it over
//! HTTP together with the indexed records, and [`query::SubgraphClient`]
//! reads the same records from a hosted subgraph.
//!
//! # Limitations/follow-ups
//!
//! * The store is in-memory only, restarting the indexer replays history
//!   from the deployment block.
//!
//! * Event stream relies on log polling, one block per request.
//!
//! # Testing
//!
//! [`testing`] module provides mock event contexts and logs in the shape
//! produced by the chain, so mapping and decoding can be tested without a node.

pub mod abi;
pub mod api;
pub mod error;
pub mod feed;
pub mod indexer;
pub mod mapping;
pub mod num;
pub mod query;
pub mod store;
pub mod stream;
pub mod testing;
pub mod trading;
pub mod types;

use alloy::primitives::Address;

/// Default number of decimals of on-chain fixed-point values.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Chain ID of Rootstock testnet, the network the product was deployed to.
pub const ROOTSTOCK_TESTNET_CHAIN_ID: u64 = 31;

#[derive(Clone, Debug)]
/// Chain the perpetual contract is operating on.
pub struct Chain {
    chain_id: u64,
    contract: Address,
    deployed_at_block: u64,
    apy_decimals: u8,
    collateral_decimals: u8,
    leverage_decimals: u8,
}

impl Chain {
    pub fn new(chain_id: u64, contract: Address, deployed_at_block: u64) -> Self {
        Self {
            chain_id,
            contract,
            deployed_at_block,
            apy_decimals: DEFAULT_DECIMALS,
            collateral_decimals: DEFAULT_DECIMALS,
            leverage_decimals: DEFAULT_DECIMALS,
        }
    }

    pub fn rootstock_testnet(contract: Address, deployed_at_block: u64) -> Self {
        Self::new(ROOTSTOCK_TESTNET_CHAIN_ID, contract, deployed_at_block)
    }

    /// Overrides fixed-point decimals of APY, collateral and leverage values.
    pub fn with_decimals(mut self, apy: u8, collateral: u8, leverage: u8) -> Self {
        self.apy_decimals = apy;
        self.collateral_decimals = collateral;
        self.leverage_decimals = leverage;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn deployed_at_block(&self) -> u64 {
        self.deployed_at_block
    }

    pub fn apy_converter(&self) -> num::Converter {
        num::Converter::new(self.apy_decimals)
    }

    pub fn collateral_converter(&self) -> num::Converter {
        num::Converter::new(self.collateral_decimals)
    }

    pub fn leverage_converter(&self) -> num::Converter {
        num::Converter::new(self.leverage_decimals)
    }
}
