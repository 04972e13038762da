//! Indexer binary - follows the perpetual contract, keeps the records of its
//! events in memory and serves them over HTTP.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use alloy::{
    primitives::Address, providers::ProviderBuilder, rpc::client::RpcClient,
    transports::layers::RetryBackoffLayer,
};
use clap::Parser;
use tracing::{debug, error, info};
use url::Url;
use yield_perp::{
    Chain, ROOTSTOCK_TESTNET_CHAIN_ID, api,
    feed::{LIDO_API_URL, LidoClient},
    indexer,
    store::Store,
    types::StateInstant,
};

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Index perpetual contract events and serve them over HTTP")]
struct Args {
    /// RPC URL to connect to
    #[arg(short, long)]
    rpc_url: String,

    /// Perpetual contract address
    #[arg(short, long)]
    contract: Address,

    /// Chain ID of the network the contract is deployed to
    #[arg(long, default_value_t = ROOTSTOCK_TESTNET_CHAIN_ID)]
    chain_id: u64,

    /// Block the contract was deployed at, indexing starts from it
    #[arg(short, long, default_value = "0")]
    from_block: u64,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value = "1000")]
    poll_interval: u64,

    /// Address to serve the HTTP API on
    #[arg(long, default_value = "127.0.0.1:3031")]
    listen: SocketAddr,

    /// Lido API base URL
    #[arg(long, default_value = LIDO_API_URL)]
    lido_api_url: Url,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let chain = Chain::new(args.chain_id, args.contract, args.from_block);

    info!(rpc_url = %args.rpc_url, "Connecting");
    let client = RpcClient::builder()
        .layer(RetryBackoffLayer::new(10, 100, 200))
        .connect(&args.rpc_url)
        .await?;
    client.set_poll_interval(Duration::from_millis(args.poll_interval));
    let provider = ProviderBuilder::new().connect_client(client);

    let store = Arc::new(Store::new());
    let (mut rx, handle) = indexer::start(
        &chain,
        provider,
        StateInstant::new(chain.deployed_at_block(), 0),
        tokio::time::sleep,
        store.clone(),
    );

    let feed = Arc::new(LidoClient::new(args.lido_api_url)?);
    let app = api::records_router(store.clone()).merge(api::apy_router(feed));
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, "Serving HTTP API");
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    while let Some(block) = rx.recv().await {
        if block.records > 0 {
            info!(
                block = block.instant.block_number(),
                events = block.events,
                records = block.records,
                total = store.len(),
                "Block indexed"
            );
        } else {
            debug!(block = block.instant.block_number(), "Block indexed");
        }
    }

    server.abort();
    match handle.await? {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(%e, "Indexer stopped");
            Err(e.into())
        }
    }
}
