use anyhow::{bail, Context, Result};
use cipherisk_engine::signatures::{address_of, generate_keypair};
use cipherisk_engine::{ClearEngine, Decryptor, InputEncryptor};
use cipherisk_execution::{CapturingSink, ErrorKind};
use cipherisk_genesis::{create_genesis_state, GenesisConfig};
use cipherisk_service::RiskService;
use cipherisk_types::instruction::RiskInstruction;
use cipherisk_types::transaction::Transaction;
use cipherisk_types::{asset_id_from_symbol, Address, AssetId, RiskEvent, BPS_DENOMINATOR};
use clap::Parser;
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Randomized end-to-end runs against the reference engine")]
struct Args {
    #[arg(long, default_value_t = 200)]
    computations: u32,
    #[arg(long, default_value_t = 8)]
    assets: usize,
    #[arg(long, default_value_t = 4)]
    portfolios: u8,
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

const SEED: [u8; 32] = [0x5Eu8; 32];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let subscriber = FmtSubscriber::builder().with_max_level(args.log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    println!("--- cipherisk confidential aggregation simulator ---");
    let mut rng = rand::thread_rng();

    let admin = generate_keypair();
    let mut config = GenesisConfig::dev(&address_of(&admin));
    config.assets.clear();
    let sink = CapturingSink::new();
    let core: Address = *blake3::hash(b"simulator core").as_bytes();
    let service = RiskService::new(
        create_genesis_state(&config)?,
        ClearEngine::from_seed(&SEED, core),
        Arc::new(sink.clone()),
    );
    let client = InputEncryptor::from_seed(&SEED);
    let admin_addr = address_of(&admin);

    let symbols: Vec<String> = (0..args.assets).map(|i| format!("SIM{}", i)).collect();
    let asset_ids: Vec<AssetId> = symbols.iter().map(|s| asset_id_from_symbol(s)).collect();

    let start = Instant::now();
    let mut checked = 0u32;
    let mut rejected = 0u32;

    for round in 0..args.computations {
        // Reconfigure a random asset now and then; stored results must not move.
        if round % 10 == 0 {
            for id in &asset_ids {
                let weight_bp = rng.gen_range(0..=10_000u16);
                let cap_amount = rng.gen_range(1..=1_000_000_000u64);
                service
                    .submit(Transaction::new(
                        admin_addr,
                        RiskInstruction::SetAssetParam { asset_id: *id, weight_bp, cap_amount },
                    ))
                    .await?;
            }
        }

        let portfolio_id = [rng.gen_range(0..args.portfolios.max(1)); 32];
        let submitter = address_of(&generate_keypair());
        let n = rng.gen_range(1..=asset_ids.len());
        let picked: Vec<AssetId> =
            (0..n).map(|_| asset_ids[rng.gen_range(0..asset_ids.len())]).collect();
        let amounts: Vec<u64> = (0..n).map(|_| rng.gen_range(0..=2_000_000_000u64)).collect();

        let expected = service
            .read(|state, _| {
                let mut num = 0u128;
                let mut den = 0u128;
                for (id, amount) in picked.iter().zip(&amounts) {
                    let p = state.asset_params[id];
                    num += u128::from((*amount).min(p.cap_amount)) * u128::from(p.weight_bp);
                    den += u128::from(p.cap_amount);
                }
                ((num / den) as u64).min(BPS_DENOMINATOR)
            })
            .await;

        let inputs = client.encrypt_batch(&submitter, &amounts);
        let receipt = service
            .submit(Transaction::new(
                submitter,
                RiskInstruction::ComputePortfolio {
                    portfolio_id,
                    asset_ids: picked,
                    attested_amounts: inputs.ciphertexts,
                    attestation: inputs.attestation,
                },
            ))
            .await?;

        let computed = receipt.events.last().cloned();
        let Some(RiskEvent::PortfolioComputed { risk_handle, health_handle, .. }) = computed else {
            bail!("computation emitted no PortfolioComputed event");
        };
        let (risk, health) = service
            .read(|_, engine| -> Result<(u64, u64)> {
                let risk = engine.decrypt(&risk_handle, &submitter)?;
                let health = engine.decrypt(&health_handle, &submitter)?;
                Ok((risk, health))
            })
            .await?;

        if risk != expected || health != BPS_DENOMINATOR - risk {
            bail!(
                "round {}: expected risk {}, got risk {} health {}",
                round,
                expected,
                risk,
                health
            );
        }
        checked += 1;

        // A bystander must not be able to read it.
        let outsider = address_of(&generate_keypair());
        if service.read(|_, engine| engine.decrypt(&risk_handle, &outsider)).await.is_ok() {
            bail!("round {}: outsider decrypted a private result", round);
        }

        // Empty submissions are always rejected without consuming an id.
        if round % 25 == 0 {
            let err = service
                .submit(Transaction::new(
                    submitter,
                    RiskInstruction::ComputePortfolio {
                        portfolio_id,
                        asset_ids: vec![],
                        attested_amounts: vec![],
                        attestation: vec![],
                    },
                ))
                .await
                .err()
                .context("empty batch was accepted")?;
            if err.rejection().map(|e| e.kind()) != Some(ErrorKind::InvalidInput) {
                bail!("unexpected rejection: {}", err);
            }
            rejected += 1;
        }
    }

    let elapsed = start.elapsed();
    let mut total_results = 0u64;
    for p in 0..args.portfolios.max(1) {
        total_results += service.read(|state, _| state.next_result_id(&[p; 32])).await;
    }
    if total_results != u64::from(args.computations) {
        bail!("result count {} does not match {} computations", total_results, args.computations);
    }

    println!("Computations verified: {}", checked);
    println!("Rejections verified:   {}", rejected);
    println!("Events emitted:        {}", sink.events().len());
    println!("Elapsed:               {:?}", elapsed);
    println!("State root:            {}", hex::encode(service.state_root().await));
    Ok(())
}
