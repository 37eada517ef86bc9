#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cipherisk_engine::ClearEngine;
use cipherisk_execution::{execute_instruction, ExecutionContext};
use cipherisk_types::instruction::RiskInstruction;
use cipherisk_types::state::{GlobalState, RiskLimits};

#[derive(Arbitrary, Debug)]
struct ParamInput {
    sender_is_admin: bool,
    sender: [u8; 32],
    asset_id: [u8; 32],
    weight_bp: u16,
    cap_amount: u64,
}

fuzz_target!(|data: ParamInput| {
    let admin = [0xAD; 32];
    let mut state = GlobalState::new(admin, RiskLimits::default());
    let mut engine = ClearEngine::from_seed(&[1u8; 32], [0xC0; 32]);
    let sender = if data.sender_is_admin { admin } else { data.sender };

    let si = RiskInstruction::SetAssetParam {
        asset_id: data.asset_id,
        weight_bp: data.weight_bp,
        cap_amount: data.cap_amount,
    };
    let res = {
        let mut ctx = ExecutionContext::new(&mut state, &mut engine, 1);
        execute_instruction(&si, &sender, &mut ctx)
    };

    // Whatever got stored satisfies the admission guardrails.
    for p in state.asset_params.values() {
        assert!(p.weight_bp <= 10_000);
        assert!(p.cap_amount > 0 && p.cap_amount <= state.limits.max_cap);
    }
    if res.is_ok() {
        assert_eq!(sender, admin);
        assert_eq!(state.asset_params.len(), 1);
    } else {
        assert!(state.asset_params.is_empty());
    }
});
