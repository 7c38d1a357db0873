//! Hyperliquidity market maker CLI.
//!
//! Quotes a geometric ladder of maker-only orders on a Hyperliquid spot
//! market, sized purely from the account's own inventory.
//!
//! Secrets come from the environment, never from config:
//! `HYPERLIQUIDITY_PRIVATE_KEY` signs, `HYPERLIQUIDITY_WALLET` is the
//! account address whose state is tracked.

use std::path::Path;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hyperliquid_rust_sdk::{BaseUrl, ExchangeClient, InfoClient};
use hyperliquidity::{HyperliquidExecutor, MakerConfig, MarketMaker};

#[derive(Parser)]
#[command(name = "hyperliquidity")]
#[command(version, about = "Inventory-driven spot market maker for Hyperliquid", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hyperliquidity.toml")]
    config: String,

    /// Override coin from config
    #[arg(long)]
    coin: Option<String>,

    /// Override network (mainnet, testnet, localhost)
    #[arg(long)]
    network: Option<String>,

    /// Private key (prefer the env var)
    #[arg(long, env = "HYPERLIQUIDITY_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Wallet address to quote for (prefer the env var)
    #[arg(long, env = "HYPERLIQUIDITY_WALLET")]
    wallet: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output format (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "hyperliquidity.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
    /// Run the market maker (default)
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up a .env file before reading CLI/env arguments.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::GenerateConfig { output }) => {
            generate_sample_config(output)?;
            return Ok(());
        }
        Some(Commands::ValidateConfig) => {
            let config = load_config(&cli)?;
            config.validate()?;
            println!("Configuration is valid:\n{config:#?}");
            return Ok(());
        }
        Some(Commands::Run) | None => {}
    }

    setup_logging(&cli)?;

    let config = load_config(&cli)?;
    config.validate()?;

    let private_key = cli
        .private_key
        .clone()
        .ok_or("Private key required. Set HYPERLIQUIDITY_PRIVATE_KEY or pass --private-key.")?;
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|_| "Invalid private key format")?;

    let wallet: Address = cli
        .wallet
        .clone()
        .ok_or("Wallet address required. Set HYPERLIQUIDITY_WALLET or pass --wallet.")?
        .parse()
        .map_err(|_| "Invalid wallet address format")?;

    let base_url = match &cli.network {
        Some(network) => parse_base_url(network)?,
        None => {
            if config.market.testnet {
                BaseUrl::Testnet
            } else {
                BaseUrl::Mainnet
            }
        }
    };

    info!(
        coin = %config.market.coin,
        network = ?base_url,
        start_px = config.strategy.start_px,
        n_orders = config.strategy.n_orders,
        order_sz = config.strategy.order_sz,
        interval_s = config.tuning.interval_s,
        "starting hyperliquidity"
    );

    // Reconnecting info client: subscriptions survive socket drops and the
    // orchestrator's staleness fallback covers the gap in between.
    let info_client = InfoClient::with_reconnect(None, Some(base_url)).await?;
    let exchange_client = ExchangeClient::new(None, signer, Some(base_url), None, None)
        .await
        .map_err(|e| format!("Failed to create exchange client: {e}"))?;
    let executor = HyperliquidExecutor::new(exchange_client);

    let mut maker = MarketMaker::new(config, info_client, executor, wallet)
        .await
        .map_err(|e| format!("Startup failed: {e}"))?;

    maker.run().await.map_err(|e| format!("Run failed: {e}"))?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<MakerConfig, Box<dyn std::error::Error>> {
    let path = &cli.config;
    let mut config = if Path::new(path).exists() {
        let content = std::fs::read_to_string(path)?;
        MakerConfig::from_toml(&content)?
    } else {
        return Err(format!("Config file not found: {path}").into());
    };

    if let Some(coin) = &cli.coin {
        config.market.coin = coin.clone();
    }
    Ok(config)
}

fn setup_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(&cli.log_level)
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("tokio_tungstenite=warn".parse().unwrap())
    });

    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

fn parse_base_url(s: &str) -> Result<BaseUrl, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "mainnet" => Ok(BaseUrl::Mainnet),
        "testnet" => Ok(BaseUrl::Testnet),
        "localhost" => Ok(BaseUrl::Localhost),
        _ => Err(format!("Unknown network '{s}'. Use: mainnet, testnet, localhost").into()),
    }
}

fn generate_sample_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sample = r#"# Hyperliquidity market maker configuration
# Secrets are read from the environment:
#   HYPERLIQUIDITY_PRIVATE_KEY  signing key
#   HYPERLIQUIDITY_WALLET       account address

[market]
# Spot pair name as the exchange knows it, e.g. "PURR/USDC" or "@142".
coin = "PURR/USDC"
testnet = true

[strategy]
# Price of grid level 0; levels step up 0.3% per level.
start_px = 1.0
n_orders = 100
# Size of one full order tranche, in tokens.
order_sz = 10.0
# Boundary seed when no asks rest at startup (0 = derive from allocation).
n_seeded_levels = 0

[allocation]
allocated_token = 1000.0
allocated_usdc = 1000.0

[tuning]
interval_s = 3.0
dead_zone_bps = 5.0
price_tolerance_bps = 1.0
size_tolerance_pct = 1.0
reconcile_every = 20
min_notional = 0.0
"#;

    std::fs::write(path, sample)?;
    println!("Sample config written to: {path}");
    Ok(())
}
