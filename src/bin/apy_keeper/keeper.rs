//! APY keeper loop.
//!
//! Every tick the keeper reads the current reference APR and pushes it to the
//! perpetual contract when it moved by more than the configured tolerance
//! since the last successful update.

use std::time::Duration;

use alloy::{
    primitives::TxHash,
    providers::{DynProvider, Provider},
};
use fastnum::UD128;
use tracing::{debug, error, info, warn};
use yield_perp::{
    Chain,
    abi::perpetual::LidoAPYPerpetual::LidoAPYPerpetualInstance,
    error::{self, PerpError},
    feed::ApyFeed,
    num,
};

/// Keeper schedule and transaction settings.
#[derive(Clone, Copy, derive_more::Debug, PartialEq)]
pub struct KeeperConfig {
    pub interval: Duration,
    #[debug("{tolerance}")]
    pub tolerance: UD128,
    pub legacy: bool,
}

/// Last APR accepted by the contract.
#[derive(Clone, Copy, derive_more::Debug)]
pub struct ApyTracker {
    #[debug("{last}")]
    last: UD128,
    #[debug("{tolerance}")]
    tolerance: UD128,
}

impl ApyTracker {
    pub fn new(tolerance: UD128) -> Self {
        Self {
            last: UD128::ZERO,
            tolerance,
        }
    }

    pub fn last(&self) -> UD128 {
        self.last
    }

    /// Whether `current` differs from the last pushed value by more than the
    /// tolerance.
    pub fn should_update(&self, current: UD128) -> bool {
        let delta = if current > self.last {
            current - self.last
        } else {
            self.last - current
        };
        delta > self.tolerance
    }

    pub fn record(&mut self, value: UD128) {
        self.last = value;
    }
}

/// APY keeper.
#[derive(Debug)]
pub struct ApyKeeper<F> {
    provider: DynProvider,
    instance: LidoAPYPerpetualInstance<DynProvider>,
    converter: num::Converter,
    feed: F,
    config: KeeperConfig,
    tracker: ApyTracker,
}

impl<F: ApyFeed> ApyKeeper<F> {
    pub fn new(chain: &Chain, provider: DynProvider, feed: F, config: KeeperConfig) -> Self {
        info!(
            contract = %chain.contract(),
            interval = ?config.interval,
            tolerance = %config.tolerance,
            legacy = config.legacy,
            "Initializing APY keeper"
        );

        let instance = LidoAPYPerpetualInstance::new(chain.contract(), provider.clone());
        Self {
            provider,
            instance,
            converter: chain.apy_converter(),
            feed,
            config,
            tracker: ApyTracker::new(config.tolerance),
        }
    }

    /// Run the keeper loop. Never returns, failures are retried on the next tick.
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.config.interval);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&mut self) {
        let current = match self.feed.current_apr().await {
            Ok(current) => current,
            Err(e) => {
                warn!(%e, "Failed to fetch current APR");
                return;
            }
        };
        info!(current_apr = %current, "Heartbeat");

        if !self.tracker.should_update(current) {
            debug!(last_apr = %self.tracker.last(), "No significant APY change, skipping update");
            return;
        }

        info!(last_apr = %self.tracker.last(), new_apr = %current, "APY changed, updating contract");
        let result = self.update_apy(current).await;
        self.settle(current, result);
    }

    /// Records the pushed value only once the contract accepted it.
    fn settle(&mut self, current: UD128, result: Result<TxHash, PerpError>) {
        match result {
            Ok(tx_hash) => {
                self.tracker.record(current);
                info!(%tx_hash, apr = %current, "Contract APY updated");
            }
            Err(e) => error!(%e, "Failed to update contract APY"),
        }
    }

    /// Sends `updateAPY` transaction and waits for its receipt.
    async fn update_apy(&self, apr: UD128) -> Result<TxHash, PerpError> {
        let value = self.converter.to_unsigned(apr);

        let mut builder = self.instance.updateAPY(value);
        if self.config.legacy {
            let gas_price = self.provider.get_gas_price().await?;
            builder = builder.gas_price(gas_price);
        }

        let receipt = builder.send().await?.get_receipt().await?;
        debug!(?receipt, "updateAPY transaction receipt");
        error::confirmed(&receipt)
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{B256, address},
        providers::ProviderBuilder,
        transports::mock::Asserter,
    };
    use fastnum::udec128;
    use yield_perp::{error::RevertReason, feed::FeedError};

    use super::*;

    struct FixedFeed(Option<UD128>);

    impl ApyFeed for FixedFeed {
        async fn current_apr(&self) -> Result<UD128, FeedError> {
            self.0.ok_or(FeedError::InvalidValue(f64::NAN))
        }

        async fn sma_apr(&self) -> Result<UD128, FeedError> {
            self.0.ok_or(FeedError::InvalidValue(f64::NAN))
        }
    }

    fn mocked_keeper(asserter: &Asserter, current: Option<UD128>) -> ApyKeeper<FixedFeed> {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());
        let chain = Chain::new(31, address!("0xa16081f360e3847006db660bae1c6d1b2e17ec2a"), 0);
        let config = KeeperConfig {
            interval: Duration::from_secs(5),
            tolerance: udec128!(0.000000001),
            legacy: false,
        };
        ApyKeeper::new(&chain, DynProvider::new(provider), FixedFeed(current), config)
    }

    #[tokio::test]
    async fn test_tick_keeps_last_value_on_failed_update() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("nonce too low");
        let mut keeper = mocked_keeper(&asserter, Some(udec128!(3.1)));

        keeper.tick().await;
        assert!(asserter.read_q().is_empty());
        assert_eq!(keeper.tracker.last(), UD128::ZERO);
    }

    #[tokio::test]
    async fn test_tick_skips_unchanged_apr() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("nonce too low");
        let mut keeper = mocked_keeper(&asserter, Some(UD128::ZERO));

        keeper.tick().await;
        assert_eq!(asserter.read_q().len(), 1);
        assert_eq!(keeper.tracker.last(), UD128::ZERO);
    }

    #[tokio::test]
    async fn test_tick_skips_on_feed_error() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("nonce too low");
        let mut keeper = mocked_keeper(&asserter, None);

        keeper.tick().await;
        assert_eq!(asserter.read_q().len(), 1);
        assert_eq!(keeper.tracker.last(), UD128::ZERO);
    }

    #[tokio::test]
    async fn test_settle_records_accepted_value_only() {
        let mut keeper = mocked_keeper(&Asserter::new(), Some(udec128!(3.1)));

        keeper.settle(
            udec128!(3.1),
            Err(PerpError::Reverted(Box::new(RevertReason::Unknown))),
        );
        assert_eq!(keeper.tracker.last(), UD128::ZERO);

        keeper.settle(udec128!(3.1), Ok(B256::repeat_byte(0x01)));
        assert_eq!(keeper.tracker.last(), udec128!(3.1));
        assert!(!keeper.tracker.should_update(udec128!(3.1)));
    }

    #[test]
    fn test_first_value_is_pushed() {
        let tracker = ApyTracker::new(udec128!(0.000000001));
        assert!(tracker.should_update(udec128!(3.123)));
        assert!(!tracker.should_update(UD128::ZERO));
    }

    #[test]
    fn test_changes_within_tolerance_are_skipped() {
        let mut tracker = ApyTracker::new(udec128!(0.000000001));
        tracker.record(udec128!(3.123));

        assert!(!tracker.should_update(udec128!(3.123)));
        assert!(!tracker.should_update(udec128!(3.1230000005)));
        assert!(!tracker.should_update(udec128!(3.1229999995)));
        assert!(tracker.should_update(udec128!(3.124)));
        assert!(tracker.should_update(udec128!(3.12)));
    }

    #[test]
    fn test_record_replaces_last_value() {
        let mut tracker = ApyTracker::new(udec128!(0.01));
        tracker.record(udec128!(3.5));
        assert_eq!(tracker.last(), udec128!(3.5));
        assert!(tracker.should_update(udec128!(3.6)));
        assert!(!tracker.should_update(udec128!(3.505)));
    }
}
