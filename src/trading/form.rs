use alloy::primitives::{Address, U256};
use fastnum::{UD128, udec128};

use crate::{num, types::Direction};

/// Form state of a new position.
///
/// Lives as long as the user session, nothing is persisted.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct TradeForm {
    token: Option<Address>,
    direction: Direction,
    #[debug("{collateral}")]
    collateral: UD128,
    #[debug("{leverage}")]
    leverage: UD128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TradeFormError {
    #[error("no token selected")]
    NoTokenSelected,

    #[error("collateral must be positive")]
    ZeroCollateral,
}

impl TradeForm {
    pub fn min_leverage() -> UD128 {
        UD128::ONE
    }

    pub fn max_leverage() -> UD128 {
        udec128!(25)
    }

    /// Increment of the leverage control.
    pub fn leverage_step() -> UD128 {
        udec128!(0.1)
    }

    pub fn new() -> Self {
        Self {
            token: None,
            direction: Direction::Long,
            collateral: UD128::ZERO,
            leverage: Self::min_leverage(),
        }
    }

    pub fn token(&self) -> Option<Address> {
        self.token
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn collateral(&self) -> UD128 {
        self.collateral
    }

    pub fn leverage(&self) -> UD128 {
        self.leverage
    }

    pub fn select_token(&mut self, token: Address) {
        self.token = Some(token);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn set_collateral(&mut self, collateral: UD128) {
        self.collateral = collateral;
    }

    /// Sets leverage, rounded to [`Self::leverage_step`] and clamped to
    /// the supported range.
    pub fn set_leverage(&mut self, leverage: UD128) {
        let leverage = leverage.round(1);
        self.leverage = if leverage < Self::min_leverage() {
            Self::min_leverage()
        } else if leverage > Self::max_leverage() {
            Self::max_leverage()
        } else {
            leverage
        };
    }

    pub fn increase_leverage(&mut self) {
        self.set_leverage(self.leverage + Self::leverage_step());
    }

    pub fn decrease_leverage(&mut self) {
        self.set_leverage(self.leverage - Self::leverage_step());
    }

    /// Whether the form can be submitted by the given wallet.
    pub fn can_submit(&self, wallet: Option<Address>) -> bool {
        self.token.is_some() && wallet.is_some()
    }

    /// Builds a request opening the position at the given entry APY.
    pub fn request(&self, entry_apy: UD128) -> Result<TradeRequest, TradeFormError> {
        let token = self.token.ok_or(TradeFormError::NoTokenSelected)?;
        if self.collateral == UD128::ZERO {
            return Err(TradeFormError::ZeroCollateral);
        }
        Ok(TradeRequest::new(
            token,
            self.direction,
            self.collateral,
            self.leverage,
            entry_apy,
        ))
    }
}

impl Default for TradeForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Request to open a position, with take-profit and stop-loss levels
/// 10% away from the entry APY.
#[derive(Clone, Copy, derive_more::Debug, PartialEq)]
pub struct TradeRequest {
    token: Address,
    direction: Direction,
    #[debug("{collateral}")]
    collateral: UD128,
    #[debug("{leverage}")]
    leverage: UD128,
    #[debug("{entry_apy}")]
    entry_apy: UD128,
    #[debug("{take_profit_apy}")]
    take_profit_apy: UD128,
    #[debug("{stop_loss_apy}")]
    stop_loss_apy: UD128,
}

/// `openPosition` call arguments in on-chain fixed-point representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenPositionArgs {
    pub token: Address,
    pub is_long: bool,
    pub collateral: U256,
    pub leverage: U256,
    pub take_profit_apy: U256,
    pub stop_loss_apy: U256,
}

impl TradeRequest {
    pub fn new(
        token: Address,
        direction: Direction,
        collateral: UD128,
        leverage: UD128,
        entry_apy: UD128,
    ) -> Self {
        let (up, down) = (entry_apy * udec128!(1.1), entry_apy * udec128!(0.9));
        let (take_profit_apy, stop_loss_apy) = match direction {
            Direction::Long => (up, down),
            Direction::Short => (down, up),
        };
        Self {
            token,
            direction,
            collateral,
            leverage,
            entry_apy,
            take_profit_apy,
            stop_loss_apy,
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn collateral(&self) -> UD128 {
        self.collateral
    }

    pub fn leverage(&self) -> UD128 {
        self.leverage
    }

    pub fn entry_apy(&self) -> UD128 {
        self.entry_apy
    }

    pub fn take_profit_apy(&self) -> UD128 {
        self.take_profit_apy
    }

    pub fn stop_loss_apy(&self) -> UD128 {
        self.stop_loss_apy
    }

    pub(crate) fn to_call_args(
        self,
        apy_converter: num::Converter,
        collateral_converter: num::Converter,
        leverage_converter: num::Converter,
    ) -> OpenPositionArgs {
        OpenPositionArgs {
            token: self.token,
            is_long: self.direction.is_long(),
            collateral: collateral_converter.to_unsigned(self.collateral),
            leverage: leverage_converter.to_unsigned(self.leverage),
            take_profit_apy: apy_converter.to_unsigned(self.take_profit_apy),
            stop_loss_apy: apy_converter.to_unsigned(self.stop_loss_apy),
        }
    }
}
