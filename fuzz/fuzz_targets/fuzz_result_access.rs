#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cipherisk_engine::{ClearEngine, EncryptedArithmetic, InputEncryptor};
use cipherisk_execution::{execute_instruction, ExecutionContext};
use cipherisk_types::instruction::RiskInstruction;
use cipherisk_types::state::{AssetParam, GlobalState, RiskLimits};

const SEED: [u8; 32] = [3u8; 32];

#[derive(Arbitrary, Debug)]
enum Op {
    Grant { caller: u8, to: u8, result_id: u8 },
    Publish { caller: u8, result_id: u8 },
    Claim { caller: u8, new_owner: u8 },
    Compute { caller: u8, amount: u64 },
}

fn principal(n: u8) -> [u8; 32] {
    let mut address = [0x5A; 32];
    address[0] = n % 6;
    address
}

fuzz_target!(|ops: Vec<Op>| {
    let portfolio = [0x99; 32];
    let asset = [0xEE; 32];
    let mut state = GlobalState::new(principal(0), RiskLimits::default());
    state.asset_params.insert(asset, AssetParam { weight_bp: 5000, cap_amount: 1000 });
    let mut engine = ClearEngine::from_seed(&SEED, [0xC0; 32]);
    let client = InputEncryptor::from_seed(&SEED);
    // (handle, principal) pairs that have been observed as allowed.
    let mut granted = std::collections::HashSet::new();

    for op in ops.iter().take(64) {
        let (sender, si) = match op {
            Op::Grant { caller, to, result_id } => (
                principal(*caller),
                RiskInstruction::GrantResultAccess {
                    portfolio_id: portfolio,
                    result_id: u64::from(*result_id % 8),
                    to: principal(*to),
                },
            ),
            Op::Publish { caller, result_id } => (
                principal(*caller),
                RiskInstruction::MakeResultPublic {
                    portfolio_id: portfolio,
                    result_id: u64::from(*result_id % 8),
                },
            ),
            Op::Claim { caller, new_owner } => (
                principal(*caller),
                RiskInstruction::ClaimOrTransferOwnership {
                    portfolio_id: portfolio,
                    new_owner: principal(*new_owner),
                },
            ),
            Op::Compute { caller, amount } => {
                let inputs = client.encrypt_batch(&principal(*caller), &[*amount]);
                (
                    principal(*caller),
                    RiskInstruction::ComputePortfolio {
                        portfolio_id: portfolio,
                        asset_ids: vec![asset],
                        attested_amounts: inputs.ciphertexts,
                        attestation: inputs.attestation,
                    },
                )
            }
        };
        let mut ctx = ExecutionContext::new(&mut state, &mut engine, 1);
        let _ = execute_instruction(&si, &sender, &mut ctx);

        // Grants never disappear.
        for (handle, who) in &granted {
            assert!(engine.is_allowed(handle, who));
        }
        if let Some(results) = state.results.get(&portfolio) {
            for r in results {
                for who in 0..6u8 {
                    let h = r.risk_score.handle();
                    if engine.is_allowed(&h, &principal(who)) {
                        granted.insert((h, principal(who)));
                    }
                }
            }
        }
    }
});
