use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};
use common::amount::TokenAmount;
use eyre::{Result, WrapErr};
use jackpot_sdk::chain::WalletSource;
use jackpot_sdk::{JackpotConfig, JackpotSdk, PurchaseIntent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// RPC endpoint, overrides the configuration
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Sign locally with this key
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Let the node sign for this account
    #[arg(long, conflicts_with = "private_key")]
    account: Option<Address>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Buy solo tickets, or pool tickets with --pool
    Buy {
        #[arg(short, long, default_value_t = 1)]
        tickets: u64,

        #[arg(long)]
        pool: Option<U256>,
    },

    /// Show token authorizations granted to a spender
    Allowances {
        /// Defaults to the signing account
        #[arg(long)]
        owner: Option<Address>,

        /// Defaults to the jackpot contract
        #[arg(long)]
        spender: Option<Address>,
    },

    /// Authorize a spender to pull tokens, e.g. `approve 25.5`
    Approve {
        amount: String,

        #[arg(long)]
        spender: Option<Address>,
    },

    /// Latest settled round
    LastJackpot,

    /// Current round overview
    Jackpot,

    /// Pool details from the pool contract, or active pools from the data API
    Pool {
        id: Option<U256>,

        /// Number of active pools to list when no id is given
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn load_config(cli: &Cli) -> Result<JackpotConfig> {
    let config = match &cli.config {
        Some(path) => JackpotConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => JackpotConfig::default(),
    };

    let mut config = config.with_env_overrides()?;
    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    Ok(config)
}

fn wallet_source(cli: &Cli) -> WalletSource {
    let rpc_url = cli.rpc_url.clone();
    match (&cli.private_key, cli.account) {
        (Some(private_key), _) => WalletSource::PrivateKey {
            private_key: private_key.clone(),
            rpc_url,
        },
        (None, Some(account)) => WalletSource::NodeAccount { account, rpc_url },
        (None, None) => WalletSource::ReadOnly { rpc_url },
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli)?;
    let decimals = config.token_decimals;
    let sdk = JackpotSdk::new(config, wallet_source(&cli)).wrap_err("failed to initialize SDK")?;

    match cli.command {
        Command::Buy { tickets, pool } => {
            let intent = match pool {
                Some(pool_id) => PurchaseIntent::pool(pool_id, tickets),
                None => PurchaseIntent::solo(tickets),
            };
            let result = sdk.purchase(&intent).await?;
            tracing::info!(
                cost = %TokenAmount::from_raw(result.cost_in_smallest_unit, decimals),
                "Bought {} ticket(s)",
                result.ticket_count
            );
            print_json(&result)?;
        }

        Command::Allowances { owner, spender } => {
            let owner = owner
                .or_else(|| sdk.account())
                .ok_or_else(|| eyre::eyre!("--owner is required without a signing account"))?;
            let records = sdk.user_allowances(owner, spender).await?;
            print_json(&records)?;
        }

        Command::Approve { amount, spender } => {
            let amount = TokenAmount::parse(&amount, decimals)
                .ok_or_else(|| eyre::eyre!("invalid amount '{}'", amount))?;
            let receipt = sdk.approve_token(spender, amount.raw()).await?;
            tracing::info!(scheme = ?receipt.action.scheme(), "Approved {}", amount);
            println!("{}", sdk.receipt_url(&receipt.tx_hash));
        }

        Command::LastJackpot => match sdk.latest_settlement().await? {
            Some(event) => print_json(&event)?,
            None => println!("No settled round within the lookback range"),
        },

        Command::Jackpot => {
            let overview = sdk.jackpot_overview().await?;
            let symbol = sdk.reader().token_symbol().await?;
            tracing::info!(
                jackpot = %TokenAmount::from_raw(overview.jackpot_amount, decimals),
                ticket_price = %TokenAmount::from_raw(overview.ticket_price, decimals),
                %symbol,
                odds = ?overview.odds,
                "Current round"
            );
            print_json(&overview)?;
            if sdk.account().is_some() {
                println!("tickets this round: {}", sdk.tickets_this_round().await?);
            }
        }

        Command::Pool { id: Some(pool_id), .. } => {
            let info = sdk
                .pool_info(pool_id)
                .await
                .ok_or_else(|| eyre::eyre!("pool {} could not be read", pool_id))?;
            print_json(&info)?;
            if sdk.account().is_some() {
                println!("tickets held: {}", sdk.user_tickets(pool_id).await);
            }
        }

        Command::Pool { id: None, limit } => {
            let response = sdk.data_api().active_pools(Some(limit)).await;
            if !response.success {
                eyre::bail!(
                    "data API request failed: {}",
                    response.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            print_json(&response.data.unwrap_or_default())?;
        }
    }

    Ok(())
}
