use anyhow::{Context, Result};
use cipherisk_engine::signatures::{address_of, SigningKey};
use cipherisk_engine::ClearEngine;
use cipherisk_execution::TracingSink;
use cipherisk_genesis::{create_genesis_state, load_config, parse_address, GenesisConfig};
use cipherisk_service::RiskService;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Confidential portfolio risk engine node", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "./data")]
    data_dir: String,
    /// Genesis JSON. Without it a development configuration is used.
    #[arg(short, long)]
    genesis: Option<PathBuf>,
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, default_value = "info")]
    log_level: Level,
    /// Hex seed for the reference engine's network and attestor keys.
    /// A fresh random seed is drawn when omitted.
    #[arg(long)]
    engine_seed: Option<String>,
}

fn dev_administrator(seed: &[u8; 32]) -> SigningKey {
    SigningKey::from_bytes(&blake3::derive_key("cipherisk 2024 dev administrator", seed))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder().with_max_level(args.log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    info!("Starting cipherisk node...");

    // 2. Genesis / configuration
    let seed = match &args.engine_seed {
        Some(hex_seed) => parse_address(hex_seed).context("--engine-seed")?,
        None => {
            info!("No --engine-seed given, drawing a random one");
            rand::random()
        }
    };
    let config = match &args.genesis {
        Some(path) => load_config(path)?,
        None => {
            let admin = dev_administrator(&seed);
            warn!(
                administrator = %hex::encode(address_of(&admin)),
                signing_key = %hex::encode(admin.to_bytes()),
                "No genesis file given, using development configuration"
            );
            GenesisConfig::dev(&address_of(&admin))
        }
    };
    let genesis = create_genesis_state(&config)?;

    // 3. Storage + recovery
    let storage = cipherisk_storage::Storage::new(&args.data_dir)
        .context("Failed to initialize storage")?;
    let storage = Arc::new(storage);
    info!("Storage initialized at {}", args.data_dir);

    let core_address = *blake3::hash(b"cipherisk core").as_bytes();
    let engine = ClearEngine::from_seed(&seed, core_address);
    let service = RiskService::recover_or_init(storage, genesis, engine, Arc::new(TracingSink))?;
    info!(root = %hex::encode(service.state_root().await), "Ledger ready");

    // 4. API
    let api_service = service.clone();
    let listen = args.listen;
    let api = tokio::spawn(async move { cipherisk_api::start_server(api_service, listen).await });

    info!("Node running. Press Ctrl+C to stop.");
    tokio::select! {
        res = api => {
            res.context("API task panicked")??;
        }
        _ = signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}
