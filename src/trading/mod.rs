//! Opening and closing positions.
//!
//! [`TradeForm`] keeps parameters of a new position the way the user enters
//! them, [`Trader`] submits them to the perpetual contract and reports the
//! outcome as a [`Notice`].

mod form;

use alloy::{
    contract::SolCallBuilder,
    primitives::{Address, TxHash, U256},
    providers::Provider,
};
use fastnum::UD128;
use tracing::{debug, error, info};

use crate::{
    Chain,
    abi::perpetual::LidoAPYPerpetual::{self, LidoAPYPerpetualInstance},
    error::{self, PerpError},
    num,
    types::Direction,
};

pub use form::*;

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// User-facing outcome of a trade action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn trade_succeeded(request: &TradeRequest) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Trade Successful".to_string(),
            description: format!(
                "You've opened a {} position on {} with {}x leverage",
                request.direction(),
                request.token(),
                request.leverage()
            ),
        }
    }

    pub fn trade_failed() -> Self {
        Self {
            kind: NoticeKind::Failure,
            title: "Trade Failed".to_string(),
            description: "An error occurred while processing your trade".to_string(),
        }
    }

    pub fn position_closed(token: Address) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Position Closed".to_string(),
            description: format!("Your position on {token} has been closed"),
        }
    }

    pub fn close_failed() -> Self {
        Self {
            kind: NoticeKind::Failure,
            title: "Close Failed".to_string(),
            description: "An error occurred while closing your position".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}

/// Open position as reported by the contract.
#[derive(Clone, Copy, derive_more::Debug, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    #[debug("{size}")]
    pub size: UD128,
    #[debug("{collateral}")]
    pub collateral: UD128,
    #[debug("{leverage}")]
    pub leverage: UD128,
    #[debug("{entry_apy}")]
    pub entry_apy: UD128,
    #[debug("{take_profit_apy}")]
    pub take_profit_apy: UD128,
    #[debug("{stop_loss_apy}")]
    pub stop_loss_apy: UD128,
}

impl OpenPosition {
    fn new(
        info: &LidoAPYPerpetual::Position,
        apy_converter: num::Converter,
        collateral_converter: num::Converter,
        leverage_converter: num::Converter,
    ) -> Result<Option<Self>, PerpError> {
        if !info.isOpen {
            return Ok(None);
        }
        Ok(Some(Self {
            direction: info.isLong.into(),
            size: decimal(collateral_converter, info.size)?,
            collateral: decimal(collateral_converter, info.collateral)?,
            leverage: decimal(leverage_converter, info.leverage)?,
            entry_apy: decimal(apy_converter, info.entryAPY)?,
            take_profit_apy: decimal(apy_converter, info.takeProfitAPY)?,
            stop_loss_apy: decimal(apy_converter, info.stopLossAPY)?,
        }))
    }
}

fn decimal(converter: num::Converter, value: U256) -> Result<UD128, PerpError> {
    converter
        .from_unsigned(value)
        .ok_or_else(|| PerpError::Fatal(format!("contract value out of range: {value}")))
}

/// Contract client of a single wallet.
#[derive(Debug)]
pub struct Trader<P> {
    chain: Chain,
    instance: LidoAPYPerpetualInstance<P>,
}

impl<P: Provider> Trader<P> {
    pub fn new(chain: &Chain, provider: P) -> Self {
        Self {
            chain: chain.clone(),
            instance: LidoAPYPerpetual::new(chain.contract(), provider),
        }
    }

    /// APY recorded by the contract, in percent.
    pub async fn apy(&self) -> Result<UD128, PerpError> {
        let value = self.instance.getAPY().call().await?;
        decimal(self.chain.apy_converter(), value)
    }

    /// Current APY the new positions are opened at, in percent.
    pub async fn current_apy(&self) -> Result<UD128, PerpError> {
        let value = self.instance.currentAPY().call().await?;
        decimal(self.chain.apy_converter(), value)
    }

    /// Position of the trader in the given token, if open.
    pub async fn position(
        &self,
        trader: Address,
        token: Address,
    ) -> Result<Option<OpenPosition>, PerpError> {
        let info = self.instance.getPosition(trader, token).call().await?;
        OpenPosition::new(
            &info,
            self.chain.apy_converter(),
            self.chain.collateral_converter(),
            self.chain.leverage_converter(),
        )
    }

    fn open_position_call(
        &self,
        request: &TradeRequest,
    ) -> SolCallBuilder<&P, LidoAPYPerpetual::openPositionCall> {
        let args = request.to_call_args(
            self.chain.apy_converter(),
            self.chain.collateral_converter(),
            self.chain.leverage_converter(),
        );
        debug!(?request, ?args, "Opening position");

        self.instance.openPosition(
            args.token,
            args.is_long,
            args.collateral,
            args.leverage,
            args.take_profit_apy,
            args.stop_loss_apy,
        )
    }

    /// Sends `openPosition` transaction and waits for its receipt.
    pub async fn open_position(&self, request: &TradeRequest) -> Result<TxHash, PerpError> {
        let receipt = self
            .open_position_call(request)
            .send()
            .await?
            .get_receipt()
            .await?;
        error::confirmed(&receipt)
    }

    /// Sends `closePosition` transaction and waits for its receipt.
    pub async fn close_position(&self, token: Address) -> Result<TxHash, PerpError> {
        let receipt = self
            .instance
            .closePosition(token)
            .send()
            .await?
            .get_receipt()
            .await?;
        error::confirmed(&receipt)
    }

    /// Opens the position described by the form at the current contract APY.
    ///
    /// Any failure, including invalid form state, results in the same
    /// generic notice, details go to the log.
    pub async fn submit(&self, form: &TradeForm) -> Notice {
        let request = match self.apy().await {
            Ok(entry_apy) => match form.request(entry_apy) {
                Ok(request) => request,
                Err(err) => {
                    error!(%err, "Invalid trade form");
                    return Notice::trade_failed();
                }
            },
            Err(err) => {
                error!(%err, "Failed to read entry APY");
                return Notice::trade_failed();
            }
        };

        match self.open_position(&request).await {
            Ok(tx_hash) => {
                info!(%tx_hash, token = %request.token(), direction = %request.direction(), "Position opened");
                Notice::trade_succeeded(&request)
            }
            Err(err) => {
                error!(%err, "Trade failed");
                Notice::trade_failed()
            }
        }
    }

    /// Closes the position in the given token.
    pub async fn submit_close(&self, token: Address) -> Notice {
        match self.close_position(token).await {
            Ok(tx_hash) => {
                info!(%tx_hash, %token, "Position closed");
                Notice::position_closed(token)
            }
            Err(err) => {
                error!(%err, "Failed to close position");
                Notice::close_failed()
            }
        }
    }
}
