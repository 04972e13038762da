//! Configuration for the APY keeper.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): connection details, keys
//! - CLI arguments: update schedule and HTTP listener

use std::{net::SocketAddr, time::Duration};

use alloy::primitives::Address;
use clap::Parser;
use fastnum::{UD128, decimal::Context};
use url::Url;

use crate::keeper::KeeperConfig;

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Chain ID (e.g., 31 for Rootstock testnet)
    pub chain_id: u64,

    /// Perpetual contract address
    pub contract_address: String,

    /// Private key of the contract owner
    pub private_key: String,

    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Lido API base URL (default: public mainnet API)
    pub lido_api_url: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Parse the perpetual contract address.
    pub fn contract_address(&self) -> Result<Address, alloy::primitives::hex::FromHexError> {
        self.contract_address.parse()
    }

    /// Parse the Lido API base URL, if overridden.
    pub fn lido_api_url(&self) -> Result<Option<Url>, url::ParseError> {
        self.lido_api_url.as_deref().map(Url::parse).transpose()
    }
}

/// CLI arguments of the keeper.
#[derive(Debug, Parser)]
#[command(name = "apy-keeper")]
#[command(about = "Pushes the Lido stETH APR to the perpetual contract")]
pub struct CliConfig {
    /// Seconds between APR checks
    #[arg(long, default_value = "5")]
    pub interval_secs: u64,

    /// Minimal APR change (in percent) that triggers a contract update
    #[arg(long, default_value = "0.000000001")]
    pub tolerance: String,

    /// Number of decimals the contract stores the APY with
    #[arg(long, default_value = "18")]
    pub decimals: u8,

    /// Send legacy (gas-priced) transactions instead of EIP-1559 ones
    #[arg(long)]
    pub legacy: bool,

    /// Address to serve the HTTP API on
    #[arg(long, default_value = "127.0.0.1:3030")]
    pub listen: SocketAddr,
}

impl CliConfig {
    /// Convert CLI config to the config used by the keeper loop.
    pub fn to_keeper_config(&self) -> Result<KeeperConfig, ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let tolerance = UD128::from_str(&self.tolerance, Context::default())
            .map_err(|_| ConfigError::InvalidTolerance)?;

        if self.decimals > 36 {
            return Err(ConfigError::InvalidDecimals(self.decimals));
        }

        Ok(KeeperConfig {
            interval: Duration::from_secs(self.interval_secs),
            tolerance,
            legacy: self.legacy,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("interval_secs cannot be zero")]
    ZeroInterval,

    #[error("Invalid tolerance value")]
    InvalidTolerance,

    #[error("Unsupported number of decimals: {0}")]
    InvalidDecimals(u8),
}

#[cfg(test)]
mod tests {
    use fastnum::udec128;

    use super::*;

    fn default_cli() -> CliConfig {
        CliConfig::parse_from(["apy-keeper"])
    }

    #[test]
    fn test_defaults() {
        let cli = default_cli();
        assert_eq!(cli.listen, "127.0.0.1:3030".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.decimals, 18);

        let config = cli.to_keeper_config().unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.tolerance, udec128!(0.000000001));
        assert!(!config.legacy);
    }

    #[test]
    fn test_legacy_flag() {
        let cli = CliConfig::parse_from(["apy-keeper", "--legacy", "--interval-secs", "30"]);
        let config = cli.to_keeper_config().unwrap();
        assert!(config.legacy);
        assert_eq!(config.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values() {
        let cli = CliConfig {
            interval_secs: 0,
            ..default_cli()
        };
        assert!(matches!(
            cli.to_keeper_config(),
            Err(ConfigError::ZeroInterval)
        ));

        let cli = CliConfig {
            tolerance: "-1".to_string(),
            ..default_cli()
        };
        assert!(matches!(
            cli.to_keeper_config(),
            Err(ConfigError::InvalidTolerance)
        ));

        let cli = CliConfig {
            decimals: 40,
            ..default_cli()
        };
        assert!(matches!(
            cli.to_keeper_config(),
            Err(ConfigError::InvalidDecimals(40))
        ));
    }
}
