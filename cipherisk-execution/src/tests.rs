use super::*;
use crate::aggregation::{aggregate, public_denominator, resolve_params};
use cipherisk_engine::{ClearEngine, Decryptor, EngineError, InputEncryptor};
use cipherisk_types::state::{AssetParam, RiskLimits};
use cipherisk_types::{asset_id_from_symbol, AssetId, CiphertextHandle, PortfolioId};
use rand::Rng;

const SEED: [u8; 32] = [11u8; 32];
const CORE: Address = [0xC0; 32];
const ADMIN: Address = [0xAD; 32];
const ALICE: Address = [0xA1; 32];
const BOB: Address = [0xB0; 32];
const CAROL: Address = [0xCA; 32];
const PORTFOLIO: PortfolioId = [0x50; 32];

struct Harness {
    state: GlobalState,
    engine: ClearEngine,
    client: InputEncryptor,
    events: Vec<RiskEvent>,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: GlobalState::new(ADMIN, RiskLimits::default()),
            engine: ClearEngine::from_seed(&SEED, CORE),
            client: InputEncryptor::from_seed(&SEED),
            events: Vec::new(),
        }
    }

    fn exec(
        &mut self,
        sender: Address,
        instruction: RiskInstruction,
    ) -> Result<Outcome, RiskError> {
        let mut ctx = ExecutionContext::new(&mut self.state, &mut self.engine, 1_700_000_000);
        let out = execute_instruction(&instruction, &sender, &mut ctx);
        if out.is_ok() {
            self.events.extend(ctx.take_events());
        }
        out
    }

    fn set_param(&mut self, symbol: &str, weight_bp: u16, cap_amount: u64) -> AssetId {
        let asset_id = asset_id_from_symbol(symbol);
        self.exec(ADMIN, RiskInstruction::SetAssetParam { asset_id, weight_bp, cap_amount })
            .unwrap();
        asset_id
    }

    fn compute(
        &mut self,
        submitter: Address,
        assets: &[AssetId],
        amounts: &[u64],
    ) -> Result<ResultId, RiskError> {
        let inputs = self.client.encrypt_batch(&submitter, amounts);
        self.exec(
            submitter,
            RiskInstruction::ComputePortfolio {
                portfolio_id: PORTFOLIO,
                asset_ids: assets.to_vec(),
                attested_amounts: inputs.ciphertexts,
                attestation: inputs.attestation,
            },
        )
        .map(|o| o.result_id().unwrap())
    }

    fn scores(&self, result_id: ResultId) -> (u64, u64) {
        let r = self.state.result(&PORTFOLIO, result_id).unwrap();
        (
            self.engine.decrypt(&r.risk_score.handle(), &CORE).unwrap(),
            self.engine.decrypt(&r.health_score.handle(), &CORE).unwrap(),
        )
    }

    fn claim(&mut self, sender: Address, new_owner: Address) -> Result<Outcome, RiskError> {
        self.exec(
            sender,
            RiskInstruction::ClaimOrTransferOwnership { portfolio_id: PORTFOLIO, new_owner },
        )
    }

    fn handles(&self, result_id: ResultId) -> [CiphertextHandle; 2] {
        [
            results::risk_handle(&self.state, &PORTFOLIO, result_id).unwrap(),
            results::health_handle(&self.state, &PORTFOLIO, result_id).unwrap(),
        ]
    }
}

#[test]
fn test_single_asset_at_cap() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);

    let id = h.compute(ALICE, &[eth], &[1000]).unwrap();

    assert_eq!(id, 0);
    assert_eq!(h.scores(id), (5000, 5000));
    assert_eq!(h.state.result(&PORTFOLIO, id).unwrap().denominator, 1000);
}

#[test]
fn test_two_assets_oversized_position_is_capped() {
    let mut h = Harness::new();
    let a = h.set_param("AAA", 10_000, 500);
    let b = h.set_param("BBB", 0, 500);

    let id = h.compute(ALICE, &[a, b], &[600, 100]).unwrap();

    assert_eq!(h.scores(id), (5000, 5000));
    let stored = h.state.result(&PORTFOLIO, id).unwrap();
    assert_eq!(stored.denominator, 1000);
    assert_eq!(stored.position_count, 2);
}

#[test]
fn test_empty_batch_rejected_without_side_effects() {
    let mut h = Harness::new();
    let err = h.compute(ALICE, &[], &[]).unwrap_err();

    assert!(matches!(err, RiskError::InvalidInputLength { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(results::result_count(&h.state, &PORTFOLIO), 0);
    assert!(h.events.is_empty());
}

#[test]
fn test_length_mismatch_and_oversized_batch() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let inputs = h.client.encrypt_batch(&ALICE, &[1, 2]);
    let err = h
        .exec(
            ALICE,
            RiskInstruction::ComputePortfolio {
                portfolio_id: PORTFOLIO,
                asset_ids: vec![eth],
                attested_amounts: inputs.ciphertexts,
                attestation: inputs.attestation,
            },
        )
        .unwrap_err();
    assert!(matches!(err, RiskError::InvalidInputLength { assets: 1, amounts: 2, .. }));

    h.state.limits.max_assets_per_computation = 2;
    let err = h.compute(ALICE, &[eth, eth, eth], &[1, 1, 1]).unwrap_err();
    assert!(matches!(err, RiskError::InvalidInputLength { max: 2, .. }));
}

#[test]
fn test_unconfigured_asset_aborts_before_any_import() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let ghost = asset_id_from_symbol("GHOST");

    let err = h.compute(ALICE, &[eth, ghost], &[10, 10]).unwrap_err();

    assert!(matches!(err, RiskError::AssetNotConfigured(_)));
    assert_eq!(err.kind(), ErrorKind::NotConfigured);
    assert_eq!(h.engine.ciphertext_count(), 0);
    assert_eq!(results::result_count(&h.state, &PORTFOLIO), 0);
}

#[test]
fn test_unauthorized_set_asset_param_leaves_registry_unchanged() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let before = h.state.clone();

    let err = h
        .exec(BOB, RiskInstruction::SetAssetParam { asset_id: eth, weight_bp: 1, cap_amount: 1 })
        .unwrap_err();

    assert_eq!(err, RiskError::Unauthorized("configure asset parameters"));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!err.kind().is_retryable());
    assert_eq!(h.state, before);
}

#[test]
fn test_asset_param_guardrails() {
    let mut h = Harness::new();
    let id = asset_id_from_symbol("ETH");
    let max = h.state.limits.max_cap;

    let set = |weight_bp, cap_amount| RiskInstruction::SetAssetParam {
        asset_id: id,
        weight_bp,
        cap_amount,
    };

    assert_eq!(h.exec(ADMIN, set(10_001, 1)), Err(RiskError::InvalidWeight(10_001)));
    assert_eq!(h.exec(ADMIN, set(1, 0)), Err(RiskError::InvalidCap { cap: 0, max }));
    assert!(matches!(h.exec(ADMIN, set(1, max + 1)), Err(RiskError::InvalidCap { .. })));

    assert_eq!(registry::get_asset_param(&h.state, &id), None);

    h.set_param("ETH", 10_000, max);
    assert_eq!(
        registry::get_asset_param(&h.state, &id),
        Some(AssetParam { weight_bp: 10_000, cap_amount: max })
    );
}

#[test]
fn test_set_asset_param_is_idempotent() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 2500, 40);
    let first = h.state.clone();
    h.set_param("ETH", 2500, 40);

    assert_eq!(h.state, first);
    assert_eq!(h.state.asset_params.len(), 1);
    assert_eq!(
        h.events,
        vec![RiskEvent::AssetParamSet { asset_id: eth, weight_bp: 2500, cap_amount: 40 }]
    );

    h.set_param("ETH", 2500, 41);
    assert_eq!(h.events.len(), 2);
}

#[test]
fn test_zero_weight_configuration_is_distinct_from_unconfigured() {
    let mut h = Harness::new();
    let id = h.set_param("STABLE", 0, 1);
    assert_eq!(
        registry::get_asset_param(&h.state, &id),
        Some(AssetParam { weight_bp: 0, cap_amount: 1 })
    );
    let other = asset_id_from_symbol("OTHER");
    assert_eq!(registry::get_asset_param(&h.state, &other), None);
}

#[test]
fn test_result_ids_are_gapless_per_portfolio() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);

    for expected in 0..5u64 {
        assert_eq!(h.compute(ALICE, &[eth], &[expected * 100]).unwrap(), expected);
    }
    // A failure in between does not consume an id.
    assert!(h.compute(ALICE, &[], &[]).is_err());
    assert_eq!(h.compute(BOB, &[eth], &[1]).unwrap(), 5);
    assert_eq!(results::result_count(&h.state, &PORTFOLIO), 6);
    assert_eq!(results::result_count(&h.state, &[0x51; 32]), 0);
}

#[test]
fn test_stored_result_survives_parameter_changes() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let id = h.compute(ALICE, &[eth], &[400]).unwrap();
    let before = h.scores(id);

    h.set_param("ETH", 10_000, 10);
    let id2 = h.compute(ALICE, &[eth], &[400]).unwrap();

    assert_eq!(h.scores(id), before);
    assert_eq!(h.state.result(&PORTFOLIO, id).unwrap().denominator, 1000);
    assert_eq!(h.scores(id2), (10_000, 0));
}

#[test]
fn test_randomized_scores_match_plain_formula() {
    let mut rng = rand::thread_rng();
    let mut h = Harness::new();
    let symbols = ["A", "B", "C", "D", "E", "F"];

    for round in 0..40 {
        let n = rng.gen_range(1..=symbols.len());
        let mut ids = Vec::new();
        let mut amounts = Vec::new();
        let mut num: u64 = 0;
        let mut den: u64 = 0;
        for sym in symbols.iter().take(n) {
            let w: u16 = rng.gen_range(0..=10_000);
            let c: u64 = rng.gen_range(1..=5_000_000);
            let a: u64 = rng.gen_range(0..=10_000_000);
            ids.push(h.set_param(sym, w, c));
            amounts.push(a);
            num += a.min(c) * u64::from(w);
            den += c;
        }

        let id = h.compute(ALICE, &ids, &amounts).unwrap();
        let (risk, health) = h.scores(id);
        let expected = (num / den).min(10_000);

        assert_eq!(id, round);
        assert_eq!(risk, expected);
        assert!(risk <= 10_000);
        assert_eq!(health, 10_000 - risk);
        assert_eq!(h.state.result(&PORTFOLIO, id).unwrap().denominator, den);
    }
}

#[test]
fn test_contribution_uses_capped_amount() {
    let mut h = Harness::new();
    let w = 3000u16;
    let c = 2_000u64;
    let id = h.set_param("X", w, c);
    let params = resolve_params(&h.state, &[id], 1).unwrap();
    assert_eq!(public_denominator(&params).unwrap(), c);

    let inputs = h.client.encrypt_batch(&ALICE, &[c * 50]);
    let score = aggregate(&mut h.engine, &params, &inputs.ciphertexts, &inputs.attestation, &ALICE)
        .unwrap();
    h.engine.grant_self(score.risk).unwrap();

    // min(a, c) * w / c == w; uncapped it would be 50 * w and clamp to 10000.
    assert_eq!(h.engine.decrypt(&score.risk.handle(), &CORE).unwrap(), u64::from(w));
}

#[test]
fn test_zero_denominator_is_rejected() {
    let mut h = Harness::new();
    let params = [AssetParam { weight_bp: 1, cap_amount: 0 }];
    let inputs = h.client.encrypt_batch(&ALICE, &[5]);

    let err = aggregate(&mut h.engine, &params, &inputs.ciphertexts, &inputs.attestation, &ALICE)
        .unwrap_err();

    assert_eq!(err, RiskError::ZeroDenominator);
    assert_eq!(err.kind(), ErrorKind::ZeroDenominator);
    assert!(!err.kind().is_retryable());
}

#[test]
fn test_denominator_overflow_is_rejected() {
    let params = [
        AssetParam { weight_bp: 1, cap_amount: u64::MAX },
        AssetParam { weight_bp: 1, cap_amount: 1 },
    ];
    assert_eq!(public_denominator(&params), Err(RiskError::DenominatorOverflow));
}

#[test]
fn test_computation_keeps_only_result_ciphertexts() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let btc = h.set_param("BTC", 8000, 10);

    for round in 1..=3 {
        h.compute(ALICE, &[eth, btc], &[700, 70]).unwrap();
        assert_eq!(h.engine.ciphertext_count(), 2 * round);
    }
    for id in 0..3 {
        assert_eq!(h.scores(id), h.scores(0));
    }
}

#[test]
fn test_wrong_importer_attestation_is_invalid_input() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let inputs = h.client.encrypt_batch(&BOB, &[10]);

    let err = h
        .exec(
            ALICE,
            RiskInstruction::ComputePortfolio {
                portfolio_id: PORTFOLIO,
                asset_ids: vec![eth],
                attested_amounts: inputs.ciphertexts,
                attestation: inputs.attestation,
            },
        )
        .unwrap_err();

    assert_eq!(err, RiskError::Engine(EngineError::UnattestedCiphertext));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.kind().is_retryable());
    assert_eq!(results::result_count(&h.state, &PORTFOLIO), 0);
}

#[test]
fn test_ownership_claim_and_transfer() {
    let mut h = Harness::new();
    h.claim(ALICE, ALICE).unwrap();
    assert_eq!(ownership::owner_of(&h.state, &PORTFOLIO), Some(ALICE));

    assert_eq!(h.claim(BOB, BOB).unwrap_err().kind(), ErrorKind::Unauthorized);
    assert_eq!(h.claim(ALICE, [0u8; 32]).unwrap_err(), RiskError::InvalidAddress);

    h.claim(ALICE, BOB).unwrap();
    assert_eq!(ownership::owner_of(&h.state, &PORTFOLIO), Some(BOB));
    assert_eq!(
        h.events.last(),
        Some(&RiskEvent::OwnershipChanged {
            portfolio_id: PORTFOLIO,
            previous: Some(ALICE),
            new_owner: BOB,
        })
    );
}

#[test]
fn test_anyone_may_claim_unowned_portfolio_for_someone_else() {
    let mut h = Harness::new();
    h.claim(CAROL, ALICE).unwrap();
    assert_eq!(ownership::owner_of(&h.state, &PORTFOLIO), Some(ALICE));
}

#[test]
fn test_initial_grants_cover_submitter_owner_and_core() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    h.claim(ALICE, ALICE).unwrap();

    let id = h.compute(BOB, &[eth], &[500]).unwrap();

    for handle in h.handles(id) {
        assert!(h.engine.is_allowed(&handle, &CORE));
        assert!(h.engine.is_allowed(&handle, &BOB));
        assert!(h.engine.is_allowed(&handle, &ALICE));
        assert!(!h.engine.is_allowed(&handle, &CAROL));
        assert!(h.engine.decrypt(&handle, &CAROL).is_err());
    }
    let [risk, health] = h.handles(id);
    assert_eq!(h.engine.decrypt(&risk, &ALICE).unwrap(), 2500);
    assert_eq!(h.engine.decrypt(&health, &BOB).unwrap(), 7500);
}

#[test]
fn test_grant_result_access_roles() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    h.claim(ALICE, ALICE).unwrap();
    let id = h.compute(BOB, &[eth], &[500]).unwrap();
    let grant = |to: Address| RiskInstruction::GrantResultAccess {
        portfolio_id: PORTFOLIO,
        result_id: id,
        to,
    };

    let err = h.exec(CAROL, grant(CAROL)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let dave = [0xDD; 32];
    let erin = [0xEE; 32];
    let frank = [0xFF; 32];
    h.exec(ALICE, grant(dave)).unwrap();
    h.exec(BOB, grant(erin)).unwrap();
    h.exec(ADMIN, grant(frank)).unwrap();
    for who in [dave, erin, frank] {
        for handle in h.handles(id) {
            assert!(h.engine.is_allowed(&handle, &who));
        }
    }
    assert!(!h.engine.is_allowed(&h.handles(id)[0], &CAROL));

    assert_eq!(h.exec(ALICE, grant([0u8; 32])).unwrap_err(), RiskError::InvalidAddress);

    let missing = h.exec(ALICE, RiskInstruction::GrantResultAccess {
        portfolio_id: PORTFOLIO,
        result_id: 9,
        to: dave,
    });
    let missing = missing.unwrap_err();
    assert!(matches!(missing, RiskError::ResultNotFound { result_id: 9, .. }));
    assert_eq!(missing.kind(), ErrorKind::NotConfigured);
}

#[test]
fn test_make_result_public_then_grant_is_still_accepted() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    h.claim(ALICE, ALICE).unwrap();
    let id = h.compute(BOB, &[eth], &[1000]).unwrap();
    let publish = RiskInstruction::MakeResultPublic { portfolio_id: PORTFOLIO, result_id: id };

    // Submitters may share privately but not publish.
    assert_eq!(h.exec(BOB, publish.clone()).unwrap_err().kind(), ErrorKind::Unauthorized);

    h.exec(ALICE, publish.clone()).unwrap();
    for handle in h.handles(id) {
        assert!(h.engine.is_public(&handle));
        assert_eq!(h.engine.decrypt(&handle, &CAROL).unwrap(), 5000);
    }

    h.exec(ADMIN, publish).unwrap();
    let share = RiskInstruction::GrantResultAccess {
        portfolio_id: PORTFOLIO,
        result_id: id,
        to: CAROL,
    };
    h.exec(BOB, share).unwrap();
    assert!(h.engine.is_public(&h.handles(id)[1]));
}

#[test]
fn test_make_result_public_missing_result() {
    let mut h = Harness::new();
    let err = h
        .exec(ADMIN, RiskInstruction::MakeResultPublic { portfolio_id: PORTFOLIO, result_id: 0 })
        .unwrap_err();
    assert!(matches!(err, RiskError::ResultNotFound { .. }));
    assert!(results::risk_handle(&h.state, &PORTFOLIO, 0).is_err());
}

#[test]
fn test_computation_event_carries_handles_only() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    h.events.clear();

    let id = h.compute(ALICE, &[eth], &[321]).unwrap();
    let [risk_handle, health_handle] = h.handles(id);

    assert_eq!(
        h.events,
        vec![RiskEvent::PortfolioComputed {
            portfolio_id: PORTFOLIO,
            result_id: id,
            submitter: ALICE,
            risk_handle,
            health_handle,
        }]
    );
}

#[test]
fn test_set_administrator() {
    let mut h = Harness::new();
    let hand_over = |new_administrator| RiskInstruction::SetAdministrator { new_administrator };

    let err = h.exec(ALICE, hand_over(ALICE)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = h.exec(ADMIN, hand_over([0u8; 32])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAddress);

    h.exec(ADMIN, hand_over(ALICE)).unwrap();
    assert_eq!(h.state.administrator, ALICE);
    let set = RiskInstruction::SetAssetParam { asset_id: [1u8; 32], weight_bp: 1, cap_amount: 1 };
    assert!(h.exec(ADMIN, set).is_err());
}

#[test]
fn test_execute_transaction_dispatch() {
    let mut h = Harness::new();
    let eth = h.set_param("ETH", 5000, 1000);
    let inputs = h.client.encrypt_batch(&ALICE, &[1000]);
    let tx = Transaction::new(
        ALICE,
        RiskInstruction::ComputePortfolio {
            portfolio_id: PORTFOLIO,
            asset_ids: vec![eth],
            attested_amounts: inputs.ciphertexts,
            attestation: inputs.attestation,
        },
    );

    let mut ctx = ExecutionContext::new(&mut h.state, &mut h.engine, 5);
    assert_eq!(execute_transaction(&tx, &mut ctx), Ok(Outcome::ResultCreated(0)));
    assert_eq!(ctx.take_events().len(), 1);
    assert!(ctx.events.is_empty());
    assert_eq!(h.state.result(&PORTFOLIO, 0).unwrap().timestamp, 5);
}

#[test]
fn test_capturing_sink_records_in_order() {
    let sink = CapturingSink::new();
    let a = RiskEvent::ResultMadePublic { portfolio_id: PORTFOLIO, result_id: 0, by: ADMIN };
    let b = RiskEvent::ResultMadePublic { portfolio_id: PORTFOLIO, result_id: 1, by: ADMIN };
    sink.notify(&a);
    sink.notify(&b);
    assert_eq!(sink.events(), vec![a, b]);
    sink.clear();
    assert!(sink.events().is_empty());
}
