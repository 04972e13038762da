//! Trading CLI - reads the perpetual state, opens and closes positions and
//! shows recent contract activity from the subgraph.
//!
//! Connection details come from the environment (or .env file):
//! `NODE_RPC_URL`, `CONTRACT_ADDRESS`, `CHAIN_ID`, `PRIVATE_KEY` (for
//! position commands) and `SUBGRAPH_URL` (for `activity`).

use std::process::exit;

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use clap::{Parser, Subcommand};
use fastnum::{UD128, decimal::Context};
use url::Url;
use yield_perp::{
    Chain, ROOTSTOCK_TESTNET_CHAIN_ID,
    query::SubgraphClient,
    trading::{TradeForm, Trader},
    types::Direction,
};

#[derive(Debug, serde::Deserialize)]
struct EnvConfig {
    node_rpc_url: Option<String>,
    contract_address: Option<String>,
    chain_id: Option<u64>,
    private_key: Option<String>,
    subgraph_url: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "trade")]
#[command(about = "Trade the yield perpetual")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the APY recorded by the contract
    Apy,

    /// Show an open position
    Position {
        /// Collateral token of the position
        #[arg(short, long)]
        token: Address,

        /// Trader address, defaults to the configured wallet
        #[arg(long)]
        trader: Option<Address>,
    },

    /// Open a position at the current contract APY
    Open {
        /// Collateral token
        #[arg(short, long)]
        token: Address,

        /// Position direction: long or short
        #[arg(short, long, default_value = "long")]
        direction: Direction,

        /// Collateral amount
        #[arg(short, long)]
        collateral: String,

        /// Leverage, between 1 and 25 in steps of 0.1
        #[arg(short, long, default_value = "1")]
        leverage: String,
    },

    /// Close the position in the given token
    Close {
        /// Collateral token of the position
        #[arg(short, long)]
        token: Address,
    },

    /// Show recent APY updates and ownership transfers
    Activity,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    exit(1);
}

fn parse_decimal(name: &str, value: &str) -> UD128 {
    UD128::from_str(value, Context::default())
        .unwrap_or_else(|_| fail(format!("Invalid {name} value: {value}")))
}

fn wallet(config: &EnvConfig) -> EthereumWallet {
    let Some(key) = config.private_key.as_deref() else {
        fail("PRIVATE_KEY is required for this command");
    };
    match key.parse::<PrivateKeySigner>() {
        Ok(signer) => EthereumWallet::new(signer),
        Err(e) => fail(format!("Invalid private key: {e}")),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "warn");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config: EnvConfig = envy::from_env()
        .unwrap_or_else(|e| fail(format!("Failed to parse environment configuration: {e}")));

    match args.command {
        Command::Activity => show_activity(&config).await,
        Command::Apy => {
            let (chain, node_url) = connection(&config);
            let trader = Trader::new(
                &chain,
                ProviderBuilder::new().connect_client(RpcClient::new_http(node_url)),
            );
            match futures::try_join!(trader.apy(), trader.current_apy()) {
                Ok((apy, current)) => {
                    println!("APY:         {apy}%");
                    println!("Current APY: {current}%");
                }
                Err(e) => fail(format!("Failed to read APY: {e}")),
            }
        }
        Command::Position { token, trader } => {
            let (chain, node_url) = connection(&config);
            let owner = match trader {
                Some(trader) => trader,
                None => wallet(&config).default_signer().address(),
            };
            let trader = Trader::new(
                &chain,
                ProviderBuilder::new().connect_client(RpcClient::new_http(node_url)),
            );
            match trader.position(owner, token).await {
                Ok(Some(position)) => {
                    println!("Direction:   {}", position.direction);
                    println!("Size:        {}", position.size);
                    println!("Collateral:  {}", position.collateral);
                    println!("Leverage:    {}x", position.leverage);
                    println!("Entry APY:   {}%", position.entry_apy);
                    println!("Take profit: {}%", position.take_profit_apy);
                    println!("Stop loss:   {}%", position.stop_loss_apy);
                }
                Ok(None) => println!("No open position"),
                Err(e) => fail(format!("Failed to read position: {e}")),
            }
        }
        Command::Open {
            token,
            direction,
            collateral,
            leverage,
        } => {
            let (chain, node_url) = connection(&config);
            let wallet = wallet(&config);
            let owner = wallet.default_signer().address();

            let mut form = TradeForm::new();
            form.select_token(token);
            form.set_direction(direction);
            form.set_collateral(parse_decimal("collateral", &collateral));
            form.set_leverage(parse_decimal("leverage", &leverage));
            if !form.can_submit(Some(owner)) {
                fail("Select a token to trade");
            }

            let trader = Trader::new(&chain, signing_provider(wallet, node_url));
            let notice = trader.submit(&form).await;
            println!("{}: {}", notice.title, notice.description);
            if !notice.is_success() {
                exit(1);
            }
        }
        Command::Close { token } => {
            let (chain, node_url) = connection(&config);
            let trader = Trader::new(&chain, signing_provider(wallet(&config), node_url));
            let notice = trader.submit_close(token).await;
            println!("{}: {}", notice.title, notice.description);
            if !notice.is_success() {
                exit(1);
            }
        }
    }
}

fn connection(config: &EnvConfig) -> (Chain, Url) {
    let Some(contract) = config.contract_address.as_deref() else {
        fail("CONTRACT_ADDRESS is required for this command");
    };
    let Some(node_url) = config.node_rpc_url.as_deref() else {
        fail("NODE_RPC_URL is required for this command");
    };
    let contract: Address = contract
        .parse()
        .unwrap_or_else(|e| fail(format!("Invalid contract address: {e}")));
    let node_url =
        Url::parse(node_url).unwrap_or_else(|e| fail(format!("Invalid RPC URL: {e}")));
    let chain = Chain::new(
        config.chain_id.unwrap_or(ROOTSTOCK_TESTNET_CHAIN_ID),
        contract,
        0,
    );
    (chain, node_url)
}

fn signing_provider(wallet: EthereumWallet, node_url: Url) -> DynProvider {
    DynProvider::new(
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(RpcClient::new_http(node_url)),
    )
}

async fn show_activity(config: &EnvConfig) {
    let Some(url) = config.subgraph_url.as_deref() else {
        fail("SUBGRAPH_URL is required for this command");
    };
    let endpoint = Url::parse(url).unwrap_or_else(|e| fail(format!("Invalid subgraph URL: {e}")));

    let activity = match SubgraphClient::new(endpoint).recent_activity().await {
        Ok(activity) => activity,
        Err(e) => {
            tracing::error!(%e, "Failed to load recent activity");
            fail("Error loading data");
        }
    };

    println!("Recent APY updates:");
    for update in &activity.apyupdateds {
        println!(
            "  block {:>10}  APY {}  tx {}",
            update.meta.block_number, update.new_apy, update.meta.transaction_hash
        );
    }
    println!("Recent ownership transfers:");
    for transfer in &activity.ownership_transferreds {
        println!(
            "  block {:>10}  {} -> {}  tx {}",
            transfer.meta.block_number,
            transfer.previous_owner,
            transfer.new_owner,
            transfer.meta.transaction_hash
        );
    }
}
