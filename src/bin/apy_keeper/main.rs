//! APY keeper for the yield perpetual.
//!
//! This binary periodically pushes the Lido stETH APR to the perpetual
//! contract and serves the reference APR over HTTP.

mod config;
mod error;
mod keeper;

use std::{process::exit, sync::Arc};

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use tracing::{error, info};
use url::Url;
use yield_perp::{Chain, DEFAULT_DECIMALS, api, feed::LidoClient};

use config::{CliConfig, EnvConfig};
use error::Result;
use keeper::ApyKeeper;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(env_config, cli_config).await {
        error!(%e, "APY keeper encountered an error, shutting down");
        exit(1);
    }
}

async fn run(env_config: EnvConfig, cli_config: CliConfig) -> Result<()> {
    let keeper_config = cli_config.to_keeper_config()?;

    let chain = Chain::new(env_config.chain_id, env_config.contract_address()?, 0).with_decimals(
        cli_config.decimals,
        DEFAULT_DECIMALS,
        DEFAULT_DECIMALS,
    );

    let signer: PrivateKeySigner = env_config.private_key.parse()?;
    let wallet = EthereumWallet::new(signer);

    let node_url = Url::parse(&env_config.node_rpc_url)?;
    let provider = DynProvider::new(
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(RpcClient::new_http(node_url)),
    );

    let feed = match env_config.lido_api_url()? {
        Some(url) => LidoClient::new(url)?,
        None => LidoClient::mainnet()?,
    };

    let mut keeper = ApyKeeper::new(&chain, provider, feed.clone(), keeper_config);
    tokio::spawn(async move { keeper.run().await });

    let listener = tokio::net::TcpListener::bind(cli_config.listen).await?;
    info!(addr = %cli_config.listen, "Serving HTTP API");
    axum::serve(listener, api::apy_router(Arc::new(feed))).await?;

    Ok(())
}
