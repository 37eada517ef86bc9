#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cipherisk_engine::{ClearEngine, Decryptor, InputEncryptor};
use cipherisk_execution::{execute_instruction, ExecutionContext};
use cipherisk_types::instruction::RiskInstruction;
use cipherisk_types::state::{AssetParam, GlobalState, RiskLimits};

const SEED: [u8; 32] = [9u8; 32];
const CORE: [u8; 32] = [0xC0; 32];

#[derive(Arbitrary, Debug)]
struct Position {
    weight_bp: u16,
    cap_amount: u64,
    amount: u64,
    configured: bool,
}

#[derive(Arbitrary, Debug)]
struct ComputeInput {
    submitter: [u8; 32],
    portfolio_id: [u8; 32],
    positions: Vec<Position>,
}

fuzz_target!(|data: ComputeInput| {
    let limits = RiskLimits::default();
    let mut state = GlobalState::new([0xAD; 32], limits);
    let mut asset_ids = Vec::new();
    let mut amounts = Vec::new();

    for (i, p) in data.positions.iter().enumerate() {
        let id = [i as u8; 32];
        if p.configured {
            state.asset_params.insert(
                id,
                AssetParam {
                    weight_bp: p.weight_bp % 10_001,
                    cap_amount: p.cap_amount % limits.max_cap + 1,
                },
            );
        }
        asset_ids.push(id);
        amounts.push(p.amount);
    }

    let mut engine = ClearEngine::from_seed(&SEED, CORE);
    let inputs = InputEncryptor::from_seed(&SEED).encrypt_batch(&data.submitter, &amounts);
    let before = state.clone();

    let si = RiskInstruction::ComputePortfolio {
        portfolio_id: data.portfolio_id,
        asset_ids,
        attested_amounts: inputs.ciphertexts,
        attestation: inputs.attestation,
    };
    let outcome = {
        let mut ctx = ExecutionContext::new(&mut state, &mut engine, 1);
        execute_instruction(&si, &data.submitter, &mut ctx)
    };

    match outcome {
        Ok(out) => {
            let id = out.result_id().expect("computation yields a result id");
            let stored = state.result(&data.portfolio_id, id).expect("stored result");
            let risk = engine.decrypt(&stored.risk_score.handle(), &data.submitter).unwrap();
            let health = engine.decrypt(&stored.health_score.handle(), &data.submitter).unwrap();
            assert!(risk <= 10_000);
            assert_eq!(risk + health, 10_000);
        }
        Err(_) => assert_eq!(state, before),
    }
});
