//! Error types for the APY keeper.

use yield_perp::{error::PerpError, feed::FeedError};

use crate::config::ConfigError;

/// Main error type for the APY keeper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("Contract error: {0}")]
    Perp(#[from] PerpError),

    #[error("APR feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] alloy::primitives::hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(#[from] alloy::signers::local::LocalSignerError),

    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
