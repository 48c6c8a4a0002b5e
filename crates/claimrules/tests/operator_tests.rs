//! Expression evaluation against the shared fixture.

mod common;

use claimrules::model::MemoryProvider;
use claimrules::types::EntityRef;
use claimrules::{BindingContext, Expr, RuleEngine, RuleError, RuleValue};
use common::*;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

fn eval_for_entry(
    engine: &RuleEngine<MemoryProvider>,
    ctx: &mut BindingContext,
    entry: i64,
    doc: serde_json::Value,
) -> Result<RuleValue, RuleError> {
    let expr = Expr::from_json(&doc).unwrap();
    let subject = RuleValue::Entity(EntityRef::claim_entry(entry));
    ctx.with_binding("rule:entry", subject, |ctx| engine.eval(ctx, &expr))
}

fn eval(doc: serde_json::Value) -> RuleValue {
    let engine = engine();
    let mut ctx = ctx();
    eval_for_entry(&engine, &mut ctx, ENTRY, doc).unwrap()
}

#[test]
fn equality_uses_set_semantics() {
    assert_eq!(eval(json!(["=", ["cdt", "entry"], "0120,0150"])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["=", ["cdt", "entry"], "0210,0330"])), RuleValue::Bool(false));
    assert_eq!(eval(json!(["not=", ["cdt", "entry"], "0210"])), RuleValue::Bool(true));
}

#[test]
fn bare_operator_names_apply_to_the_bound_entry() {
    // "cpt" as a leaf is sugar for ["cpt", entry].
    assert_eq!(eval(json!(["=", "cpt", "0120"])), RuleValue::Bool(true));
}

#[test]
fn unbound_leaf_text_parses_as_a_set() {
    assert_eq!(eval(json!("0120")), RuleValue::text("0120"));
    let set = eval(json!("0120,0150"));
    assert!(matches!(set, RuleValue::Set(_)));
}

#[test]
fn age_is_relative_to_the_service_date() {
    // Born 2000-06-15, service 2024-03-01: the birthday has not passed.
    assert_eq!(eval(json!(["age", "entry"])), RuleValue::from(23i64));
    assert_eq!(eval(json!([">", "age", 20])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["<", "age", 3])), RuleValue::Bool(false));
}

#[test]
fn chained_comparisons() {
    assert_eq!(eval(json!(["<", 1, 2, 3])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["<", 1, 3, 2])), RuleValue::Bool(false));
    assert_eq!(eval(json!(["<=", "1", "2"])), RuleValue::Bool(true));
}

#[test]
fn null_operands_in_comparisons_are_fatal() {
    let engine = engine();
    let mut ctx = ctx();
    // Plain claims carry no expiration date to compare against.
    let result = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!(["<", ["dos", "entry"], ["expiration_date", "entry"]]),
    );
    assert!(matches!(result, Err(RuleError::NullComparison { .. })));
}

#[test]
fn cond_selects_and_evaluates_the_first_match() {
    let value = eval(json!(["cond", ["<", "age", 3], "infant", true, "adult"]));
    assert_eq!(value, RuleValue::text("adult"));
    assert_eq!(eval(json!(["cond", false, "never"])), RuleValue::Null);
}

#[test]
fn cond_never_evaluates_unselected_branches() {
    let engine = engine();
    let mut ctx = ctx();
    // Each branch captures under a different name; only the selected
    // branch's capture may exist afterwards.
    let picked = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!(["cond",
               false, ["found", "skipped", ["=", ["cdt", "skipped"], "0120"]],
               true, ["found", "hit", ["=", ["cdt", "hit"], "0120"]],
               true, ["found", "never", ["=", ["cdt", "never"], "0120"]]]),
    )
    .unwrap();
    assert_eq!(picked, RuleValue::Bool(true));
    let dos = eval_for_entry(&engine, &mut ctx, ENTRY, json!(["dos", "hit"])).unwrap();
    assert_eq!(dos, RuleValue::Date(date(2023, 11, 5)));
    assert!(eval_for_entry(&engine, &mut ctx, ENTRY, json!(["dos", "skipped"])).is_err());
    assert!(eval_for_entry(&engine, &mut ctx, ENTRY, json!(["dos", "never"])).is_err());
}

#[test]
fn present_and_blank() {
    assert_eq!(eval(json!(["present", ["cdt", "entry"]])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["blank", ["remarks_only", "entry"]])), RuleValue::Bool(true));
}

#[test]
fn quadrants_and_arches_derive_from_teeth() {
    // Teeth 03 (upper right) and 12 (upper left).
    assert_eq!(eval(json!(["=", ["quadrant", "entry"], "10,20"])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["identical", ["arch", "entry"], "01"])), RuleValue::Bool(true));
    assert_eq!(eval(json!(["num_surfaces", "entry"])), RuleValue::from(2i64));
}

#[test]
fn keyed_date_arithmetic() {
    assert_eq!(
        eval(json!({"dos": "entry", "+": {"days": 45}})),
        RuleValue::Date(date(2024, 4, 15))
    );
    assert_eq!(
        eval(json!({"dos": "entry", "-": {"months": 1}})),
        RuleValue::Date(date(2024, 2, 1))
    );
    // Call-form dos defers to the keyed evaluation.
    assert_eq!(eval(json!(["dos", "entry"])), RuleValue::Date(date(2024, 3, 1)));
}

#[test]
fn fees_and_amounts_are_decimals() {
    assert_eq!(eval(json!(["billed", "entry"])), RuleValue::Number(Decimal::new(12500, 2)));
    assert_eq!(
        eval(json!(["reimbursable_fee", "entry"])),
        RuleValue::Number(Decimal::new(8000, 2))
    );
    assert_eq!(eval(json!(["uncovered", "entry"])), RuleValue::Bool(false));
}

#[test]
fn exists_scans_history_excluding_the_subject() {
    // The 2023 exam matches; the subject itself does not count.
    assert_eq!(
        eval(json!(["exists", ["=", ["cdt", "entry"], "0120"]])),
        RuleValue::Bool(true)
    );
    assert_eq!(
        eval(json!(["exists", ["=", ["cdt", "entry"], "9999"]])),
        RuleValue::Bool(false)
    );
    assert_eq!(
        eval(json!(["count_entries", ["=", ["cdt", "entry"], "0120"]])),
        RuleValue::from(2i64)
    );
}

#[test]
fn found_captures_the_matching_entry() {
    let engine = engine();
    let mut ctx = ctx();
    let found = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!(["found", "prior", ["=", ["cdt", "prior"], "0120"]]),
    )
    .unwrap();
    assert_eq!(found, RuleValue::Bool(true));
    // The captured entry resolves by name afterwards.
    let dos = eval_for_entry(&engine, &mut ctx, ENTRY, json!(["dos", "prior"])).unwrap();
    assert_eq!(dos, RuleValue::Date(date(2023, 11, 5)));
}

#[test]
fn membership_attributes_resolve_through_the_provider() {
    let mut p = provider();
    p.set_membership_attribute(INSURED, "rate-code", "A1");
    p.set_membership_attribute(INSURED, "chisholm-member", "true");
    let engine = RuleEngine::new(p);
    let mut ctx = ctx();
    assert_eq!(
        eval_for_entry(&engine, &mut ctx, ENTRY, json!(["membership_attribute", "rate-code"]))
            .unwrap(),
        RuleValue::text("A1")
    );
    assert_eq!(
        eval_for_entry(&engine, &mut ctx, ENTRY, json!(["membership_attribute", "missing"]))
            .unwrap(),
        RuleValue::Bool(false)
    );
    assert_eq!(
        eval_for_entry(&engine, &mut ctx, ENTRY, json!(["is_chisholm"])).unwrap(),
        RuleValue::Bool(true)
    );
}

#[test]
fn same_family_compares_against_the_main_entry() {
    let engine = engine();
    let mut ctx = ctx();
    let main = RuleValue::Entity(EntityRef::claim_entry(ENTRY));
    let expr = Expr::from_json(&json!(["same", "dos"])).unwrap();
    let history = RuleValue::Entity(EntityRef::claim_entry(SIBLING_ENTRY));
    let same = ctx.with_binding("rule:main", main, |ctx| {
        ctx.with_binding("rule:entry", history, |ctx| engine.eval(ctx, &expr))
    });
    assert_eq!(same.unwrap(), RuleValue::Bool(true));
}

#[test]
fn provider_and_facility_accessors() {
    assert_eq!(eval(json!(["provider", "entry"])), RuleValue::from(50i64));
    assert_eq!(eval(json!(["provider_type", "entry"])), RuleValue::text("Dentist"));
    assert_eq!(eval(json!(["facility_type", "entry"])), RuleValue::text("Clinic"));
    assert_eq!(
        eval(json!(["<=", "1", ["anesthesia_level", "entry"]])),
        RuleValue::Bool(true)
    );
    // No facility level on record compares as a single space.
    assert_eq!(
        eval(json!(["<=", "1", ["facility_anesthesia_level", "entry"]])),
        RuleValue::Bool(false)
    );
}

#[test]
fn wrong_arity_is_rejected() {
    let engine = engine();
    let mut ctx = ctx();
    let result = eval_for_entry(&engine, &mut ctx, ENTRY, json!(["not", true, false]));
    assert!(matches!(result, Err(RuleError::Arity { .. })));
}

#[test]
fn exceeds_benefit_limit_counts_the_window() {
    let engine = engine();
    let mut ctx = ctx();
    // One approved 0120 within a year of the 2024-03-01 service date.
    let within_year = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!({"exceeds_benefit_limit_within": {"months": 12},
               "of": ["=", ["cdt", "entry"], "0120"]}),
    )
    .unwrap();
    assert_eq!(within_year, RuleValue::Bool(true));
    let within_month = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!({"exceeds_benefit_limit_within": {"months": 1},
               "of": ["=", ["cdt", "entry"], "0120"]}),
    )
    .unwrap();
    assert_eq!(within_month, RuleValue::Bool(false));
    let needs_two = eval_for_entry(
        &engine,
        &mut ctx,
        ENTRY,
        json!({"exceeds_benefit_limit_within": {"months": 12},
               "of": ["=", ["cdt", "entry"], "0120"], "qty": 2}),
    )
    .unwrap();
    assert_eq!(needs_two, RuleValue::Bool(false));
}

#[test]
fn unknown_operator_fails_at_parse() {
    assert!(Expr::from_json(&json!(["frobnicate", 1])).is_err());
}
