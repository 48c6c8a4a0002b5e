//! Rule-level adjudication: conditions gating actions, effect emission.

mod common;

use claimrules::types::EntityRef;
use claimrules::{
    ActionContext, AdjudicationEffect, CarcClassification, EffectAction, MemoryProvider, Rule,
    RuleEngine, RuleError,
};
use claimrules::model::{Claim, ClaimEntry, Insured};
use common::*;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

const YOUNG_INSURED: i64 = 2;
const YOUNG_CLAIM: i64 = 200;
const YOUNG_ENTRY: i64 = 2001;

fn rule(doc: serde_json::Value) -> Rule {
    Rule::parse(doc, Some("test-rule".into()), None).unwrap()
}

fn age_rule() -> Rule {
    rule(json!({
        "when": ["and",
                 ["=", "cpt", "0120,0150,0330"],
                 ["or", ["<", "age", 3], [">", "age", 20]]],
        "deny": 62,
    }))
}

/// The shared fixture plus a toddler with their own claim.
fn provider_with_toddler() -> MemoryProvider {
    let mut p = provider();
    p.add_insured(Insured {
        id: YOUNG_INSURED,
        birth_date: Some(date(2022, 1, 10)),
        ..Insured::default()
    });
    p.add_claim(
        Claim {
            id: YOUNG_CLAIM,
            insured_id: YOUNG_INSURED,
            date_received: Some(date(2024, 3, 10)),
            ..Claim::default()
        },
        vec![ClaimEntry {
            id: YOUNG_ENTRY,
            claim_id: YOUNG_CLAIM,
            cpt_code: Some("0120".to_string()),
            dos: Some(date(2024, 3, 1)),
            ..ClaimEntry::default()
        }],
    );
    p
}

fn run(
    engine: &RuleEngine<MemoryProvider>,
    rule: &Rule,
    entry: i64,
) -> Result<Vec<AdjudicationEffect>, RuleError> {
    let mut ctx = ctx();
    engine.eval_rule_for_entry(&mut ctx, rule, EntityRef::claim_entry(entry))
}

#[test]
fn age_rule_denies_out_of_range() {
    let engine = engine();
    let effects = run(&engine, &age_rule(), ENTRY).unwrap();
    assert_eq!(
        effects,
        vec![AdjudicationEffect {
            entry_id: ENTRY,
            context: ActionContext::Deny,
            action: EffectAction::Deny { carc: 62, strongly: false, footer: false },
        }]
    );
}

#[test]
fn age_rule_passes_in_range() {
    // The toddler is under 3 and gets denied too; a mismatched procedure
    // code skips the rule entirely.
    let engine = RuleEngine::new(provider_with_toddler());
    let effects = run(&engine, &age_rule(), YOUNG_ENTRY).unwrap();
    assert_eq!(effects.len(), 1);

    let other_code = rule(json!({
        "when": ["=", "cpt", "2750"],
        "deny": 62,
    }));
    assert_eq!(run(&engine, &other_code, ENTRY).unwrap(), Vec::new());
}

#[test]
fn carc_classification_drives_the_effect_context() {
    // With no classification configured, CARC 62 is a plain denial.
    let effects = run(&engine(), &age_rule(), ENTRY).unwrap();
    assert_eq!(effects[0].context, ActionContext::Deny);

    // The same rule against a plan that treats 62 as untimely filing
    // lands in the strong-denial phase.
    let untimely = CarcClassification {
        untimely_filing: [62].into(),
        ..CarcClassification::default()
    };
    let engine = RuleEngine::with_carc_classification(provider(), untimely);
    let effects = run(&engine, &age_rule(), ENTRY).unwrap();
    assert_eq!(effects[0].context, ActionContext::StrongDeny);
    assert_eq!(
        effects[0].action,
        EffectAction::Deny { carc: 62, strongly: false, footer: false }
    );
}

#[test]
fn deny_distributes_over_array_details() {
    let engine = engine();
    let two_carcs = rule(json!({"when": true, "deny": [62, 96]}));
    let effects = run(&engine, &two_carcs, ENTRY).unwrap();
    let carcs: Vec<i64> = effects
        .iter()
        .map(|e| match e.action {
            EffectAction::Deny { carc, .. } => carc,
            _ => panic!("expected deny"),
        })
        .collect();
    assert_eq!(carcs, vec![62, 96]);
}

#[test]
fn invalid_string_carc_is_skipped() {
    let engine = engine();
    let placeholder = rule(json!({"when": true, "deny": "TBD"}));
    assert_eq!(run(&engine, &placeholder, ENTRY).unwrap(), Vec::new());
}

#[test]
fn exempt_entries_are_not_denied() {
    let mut p = provider();
    p.exempt(ENTRY, 62);
    let engine = RuleEngine::new(p);
    assert_eq!(run(&engine, &age_rule(), ENTRY).unwrap(), Vec::new());

    // Exemption is per CARC.
    let other_carc = rule(json!({"when": true, "deny": 96}));
    assert_eq!(run(&engine, &other_carc, ENTRY).unwrap().len(), 1);
}

#[test]
fn strong_and_footer_variants_are_flagged() {
    let engine = engine();
    let strong = run(&engine, &rule(json!({"when": true, "strong_deny": 29})), ENTRY).unwrap();
    assert_eq!(
        strong[0].action,
        EffectAction::Deny { carc: 29, strongly: true, footer: false }
    );
    let footer = run(&engine, &rule(json!({"when": true, "footer_pend": 133})), ENTRY).unwrap();
    assert_eq!(
        footer[0].action,
        EffectAction::Pend { carc: 133, strongly: false, footer: true }
    );
}

#[test]
fn multiple_actions_emit_in_document_order() {
    let engine = engine();
    let combo = rule(json!({
        "when": true,
        "approve_at_zero": 45,
        "add_carc": 170,
    }));
    let effects = run(&engine, &combo, ENTRY).unwrap();
    assert_eq!(
        effects,
        vec![
            AdjudicationEffect {
                entry_id: ENTRY,
                context: ActionContext::ApproveAtZero,
                action: EffectAction::ApproveAtZero { carc: 45 },
            },
            AdjudicationEffect {
                entry_id: ENTRY,
                context: ActionContext::FooterAddCarc,
                action: EffectAction::AddCarc { carc: 170 },
            },
        ]
    );
}

#[test]
fn adjust_by_defaults_its_carc() {
    let engine = engine();
    let adjust = rule(json!({"when": true, "adjust_by": {"amount": "12.50"}}));
    let effects = run(&engine, &adjust, ENTRY).unwrap();
    assert_eq!(
        effects[0].action,
        EffectAction::Adjust { carc: 18, amount: Decimal::new(1250, 2) }
    );
}

#[test]
fn adjust_by_requires_an_amount() {
    let engine = engine();
    let missing = rule(json!({"when": true, "adjust_by": {"apply_carc": 45}}));
    let err = run(&engine, &missing, ENTRY).unwrap_err();
    let RuleError::Contextual { source, .. } = err else {
        panic!("expected contextual wrapper, got {err}");
    };
    assert!(matches!(*source, RuleError::MissingActionKey { .. }));
}

#[test]
fn rules_without_actions_are_rejected() {
    let engine = engine();
    let bare = rule(json!({"when": true}));
    let err = run(&engine, &bare, ENTRY).unwrap_err();
    let RuleError::Contextual { rule, source, .. } = err else {
        panic!("expected contextual wrapper");
    };
    assert_eq!(rule, "test-rule");
    assert!(matches!(*source, RuleError::NoActions));
}

#[test]
fn unknown_actions_are_fatal() {
    let engine = engine();
    let bogus = rule(json!({"when": true, "recalibrate": 1}));
    assert!(run(&engine, &bogus, ENTRY).is_err());
}

#[test]
fn heavy_actions_are_recognized_but_unimplemented() {
    let engine = engine();
    let recoup = rule(json!({"when": true, "recoup": {"carc": 101}}));
    let err = run(&engine, &recoup, ENTRY).unwrap_err();
    let RuleError::Contextual { source, .. } = err else {
        panic!("expected contextual wrapper");
    };
    assert!(matches!(*source, RuleError::UnsupportedAction { .. }));
}

#[test]
fn failed_condition_reports_the_rule_and_entry() {
    let engine = engine();
    // expiration_date is null for a plain claim entry, so the comparison
    // fails and carries the rule's identity outward.
    let broken = rule(json!({
        "when": ["<", ["dos", "entry"], ["expiration_date", "entry"]],
        "deny": 62,
    }));
    let err = run(&engine, &broken, ENTRY).unwrap_err();
    let RuleError::Contextual { rule, entry, source } = err else {
        panic!("expected contextual wrapper");
    };
    assert_eq!(rule, "test-rule");
    assert_eq!(entry, ENTRY.to_string());
    assert!(matches!(*source, RuleError::NullComparison { .. }));
}

#[test]
fn allowed_actions_validate_their_keys() {
    let engine = engine();
    let allowed = rule(json!({
        "when": true,
        "allowed_exactly": {"apply_carc": 45, "amount": 80},
    }));
    let effects = run(&engine, &allowed, ENTRY).unwrap();
    assert_eq!(effects.len(), 1);
    match &effects[0].action {
        EffectAction::Allowed { carc, amount, .. } => {
            assert_eq!(*carc, 45);
            assert_eq!(*amount, Decimal::from(80));
        }
        other => panic!("expected allowed effect, got {other:?}"),
    }
}

#[test]
fn found_bindings_reset_between_rules() {
    let engine = engine();
    let mut ctx = ctx();
    let finder = rule(json!({
        "when": ["found", "prior", ["=", ["cdt", "prior"], "0120"]],
        "add_carc": 170,
    }));
    let effects = engine
        .eval_rule_for_entry(&mut ctx, &finder, EntityRef::claim_entry(ENTRY))
        .unwrap();
    assert_eq!(effects.len(), 1);
    // The next rule starts clean: "prior" no longer names an entry, so the
    // leaf falls back to set parsing and the equality fails.
    let stale = rule(json!({
        "when": ["=", ["cdt", "prior"], "0120"],
        "add_carc": 170,
    }));
    assert!(engine
        .eval_rule_for_entry(&mut ctx, &stale, EntityRef::claim_entry(ENTRY))
        .is_err());
}
