//! Rule actions as adjudication effects
//!
//! Actions never mutate domain records directly. Each handler validates its
//! details, checks the gates the action carries (document kind, CARC
//! exemptions), and emits [`AdjudicationEffect`] values for the adjudication
//! host to apply.

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{ActionContext, action_context};
use claimrules_model::{Claim, ClaimEntry, DomainProvider};
use claimrules_types::EntityRef;
use log::debug;
use rust_decimal::Decimal;
use serde_json::Value as Json;

/// Actions whose multi-valued details distribute over each value.
const DISTRIBUTED: [&str; 5] = ["deny", "strong_deny", "approve_at_zero", "pend", "strong_pend"];

/// Fallback adjustment CARC for `adjust_by`.
const DEFAULT_ADJUST_CARC: i64 = 18;

/// One thing a rule asked adjudication to do to an entry. The context is
/// resolved when the effect is emitted, so the host can slot it into a
/// processing phase without reclassifying.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationEffect {
    pub entry_id: i64,
    pub context: ActionContext,
    pub action: EffectAction,
}

/// How an `allowed_*` action changes the allowed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedMode {
    Exactly,
    IncreaseTo,
    IncreaseBy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectAction {
    Deny {
        carc: i64,
        strongly: bool,
        footer: bool,
    },
    Pend {
        carc: i64,
        strongly: bool,
        footer: bool,
    },
    /// Approve with all amounts zeroed, carrying the explanatory CARC.
    ApproveAtZero { carc: i64 },
    /// Approve at the contracted fee, adjusted, with the given CARC.
    Adjust { carc: i64, amount: Decimal },
    Allowed {
        mode: AllowedMode,
        carc: i64,
        amount: Decimal,
    },
    AddCarc { carc: i64 },
    /// Validated details for the handlers whose arithmetic runs against
    /// adjudication accumulators the host owns.
    Copay(Json),
    ApplyDeductible(Json),
    ApplyCoinsurance(Json),
    LimitTotal(Json),
    Bundle(Json),
}

impl<P: DomainProvider> RuleEngine<P> {
    /// Dispatch one action entry of a rule document.
    pub(crate) fn perform_action(
        &self,
        ctx: &mut BindingContext,
        entry: EntityRef,
        action: &str,
        details: &Json,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        if let Json::Array(values) = details {
            if DISTRIBUTED.contains(&action) {
                debug!("Distributing {} across {} details", action, values.len());
                let mut effects = Vec::new();
                for value in values {
                    effects.extend(self.perform_action(ctx, entry, action, value)?);
                }
                return Ok(effects);
            }
        }
        let record = self.provider().claim_entry(entry.id)?;
        let claim = self.claim_of(&record)?;
        let label = ctx.rule_label().unwrap_or("unlabeled").to_string();
        // Single-valued details classify here; distribution above already
        // split multi-valued ones, so CARC reclassification is per code.
        let Some(context) = action_context(action, details, self.carcs()) else {
            return Err(RuleError::UnsupportedAction {
                action: action.to_string(),
                details: details.to_string(),
            });
        };
        match action {
            "deny" | "strong_deny" | "footer_deny" => {
                self.deny_effect(&label, &record, context, action, details)
            }
            "pend" | "strong_pend" | "footer_pend" => {
                Ok(pend_effect(&label, &record, context, action, details))
            }
            "approve_at_zero" => Ok(match details.as_i64() {
                Some(carc) => {
                    debug!("Rule {}: approving entry {} at $0 with CARC {}", label, record.id, carc);
                    vec![effect(record.id, context, EffectAction::ApproveAtZero { carc })]
                }
                None => {
                    log_invalid_carc(&label, action, details);
                    Vec::new()
                }
            }),
            "adjust_by" => self.adjust_by_effect(&label, &record, context, details),
            "allowed_exactly" | "allowed_increase_to" | "allowed_increase_by" => {
                self.allowed_effect(&label, &record, &claim, context, action, details)
            }
            "bundle" => self.bundle_effect(&label, &record, &claim, context, details),
            "limit_total" => {
                check_action_keys(
                    action,
                    details,
                    &["contributors", "carc_on_partial", "carc_on_full", "action_on_full"],
                    &["max_total", "action_on_partial", "abm", "ind_max", "fam_max"],
                )?;
                Ok(if claim.is_claim() {
                    vec![effect(record.id, context, EffectAction::LimitTotal(details.clone()))]
                } else {
                    Vec::new()
                })
            }
            "add_copay" => Ok(vec![effect(
                record.id,
                context,
                EffectAction::Copay(details.clone()),
            )]),
            "apply_deductible" => {
                check_action_keys(
                    action,
                    details,
                    &["contributors"],
                    &["ind_deductible", "fam_deductible", "carc_on_full", "carc_on_partial"],
                )?;
                Ok(vec![effect(
                    record.id,
                    context,
                    EffectAction::ApplyDeductible(details.clone()),
                )])
            }
            "apply_coinsurance" => {
                check_action_keys(action, details, &["coinsurance_rate"], &["carc_on_result"])?;
                Ok(vec![effect(
                    record.id,
                    context,
                    EffectAction::ApplyCoinsurance(details.clone()),
                )])
            }
            "add_carc" => Ok(match details.as_i64() {
                Some(carc) => {
                    debug!("Rule {}: adding CARC {} to entry {}", label, carc, record.id);
                    vec![effect(record.id, context, EffectAction::AddCarc { carc })]
                }
                None => {
                    log_invalid_carc(&label, action, details);
                    Vec::new()
                }
            }),
            other => Err(RuleError::UnsupportedAction {
                action: other.to_string(),
                details: details.to_string(),
            }),
        }
    }

    fn deny_effect(
        &self,
        label: &str,
        record: &ClaimEntry,
        context: ActionContext,
        action: &str,
        details: &Json,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        let Some(carc) = details.as_i64() else {
            log_invalid_carc(label, action, details);
            return Ok(Vec::new());
        };
        if self.provider().exempt_from_carc(record.id, carc)? {
            debug!(
                "Rule {}: entry {} would have denied with carc {} but entry is exempt",
                label, record.id, carc
            );
            return Ok(Vec::new());
        }
        debug!("Rule {}: {}ing entry {} with carc {}", label, action, record.id, carc);
        Ok(vec![effect(
            record.id,
            context,
            EffectAction::Deny {
                carc,
                strongly: action == "strong_deny",
                footer: action == "footer_deny",
            },
        )])
    }

    fn adjust_by_effect(
        &self,
        label: &str,
        record: &ClaimEntry,
        context: ActionContext,
        details: &Json,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        check_action_keys("adjust_by", details, &["amount"], &["apply_carc"])?;
        let carc = details
            .get("apply_carc")
            .and_then(Json::as_i64)
            .unwrap_or(DEFAULT_ADJUST_CARC);
        let amount = json_decimal(details.get("amount"));
        debug!(
            "Rule {}: adjusting entry {} by {} with CARC {}",
            label, record.id, amount, carc
        );
        Ok(vec![effect(record.id, context, EffectAction::Adjust { carc, amount })])
    }

    fn allowed_effect(
        &self,
        label: &str,
        record: &ClaimEntry,
        claim: &Claim,
        context: ActionContext,
        action: &str,
        details: &Json,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        check_action_keys(action, details, &["apply_carc", "amount"], &[])?;
        if !claim.is_claim() {
            return Ok(Vec::new());
        }
        let mode = match action {
            "allowed_exactly" => AllowedMode::Exactly,
            "allowed_increase_to" => AllowedMode::IncreaseTo,
            _ => AllowedMode::IncreaseBy,
        };
        let carc = details.get("apply_carc").and_then(Json::as_i64).unwrap_or(0);
        let amount = json_decimal(details.get("amount"));
        debug!(
            "Rule {}: {} {} on entry {} with CARC {}",
            label, action, amount, record.id, carc
        );
        Ok(vec![effect(
            record.id,
            context,
            EffectAction::Allowed { mode, carc, amount },
        )])
    }

    fn bundle_effect(
        &self,
        label: &str,
        record: &ClaimEntry,
        claim: &Claim,
        context: ActionContext,
        details: &Json,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        check_action_keys(
            "bundle",
            details,
            &["bundlables", "result", "carc_on_bundlables"],
            &["carc_on_result", "create_result"],
        )?;
        if !claim.is_claim() {
            debug!("Rule {}: skipping bundling for non-claim", label);
            return Ok(Vec::new());
        }
        // Encounter-rate lines pay once per visit already; bundling them
        // would double-count.
        if record.medicaid_reimbursable {
            debug!("Rule {}: skipping bundling for medicaid reimbursable entry", label);
            return Ok(Vec::new());
        }
        if let Some(carc) = details.get("carc_on_bundlables").and_then(Json::as_i64) {
            if self.provider().exempt_from_carc(record.id, carc)? {
                debug!(
                    "Rule {}: entry {} would have bundled but entry is exempt",
                    label, record.id
                );
                return Ok(Vec::new());
            }
        }
        Ok(vec![effect(
            record.id,
            context,
            EffectAction::Bundle(details.clone()),
        )])
    }
}

fn effect(entry_id: i64, context: ActionContext, action: EffectAction) -> AdjudicationEffect {
    AdjudicationEffect { entry_id, context, action }
}

fn pend_effect(
    label: &str,
    record: &ClaimEntry,
    context: ActionContext,
    action: &str,
    details: &Json,
) -> Vec<AdjudicationEffect> {
    let Some(carc) = details.as_i64() else {
        log_invalid_carc(label, action, details);
        return Vec::new();
    };
    debug!("Rule {}: {} entry {} with carc {}", label, action, record.id, carc);
    vec![effect(
        record.id,
        context,
        EffectAction::Pend {
            carc,
            strongly: action == "strong_pend",
            footer: action == "footer_pend",
        },
    )]
}

/// Invalid (non-integer) CARC details are skipped, not fatal: plans carry
/// the occasional placeholder string.
fn log_invalid_carc(label: &str, action: &str, details: &Json) {
    debug!(
        "Rule {}: would {}, but this carc is invalid: {}",
        label, action, details
    );
}

fn json_decimal(value: Option<&Json>) -> Decimal {
    match value {
        Some(Json::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Decimal::from(i)
            } else {
                n.as_f64()
                    .and_then(|f| Decimal::try_from(f).ok())
                    .unwrap_or_default()
            }
        }
        Some(Json::String(s)) => s.parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

/// Validate an action's detail map against its key table.
fn check_action_keys(
    action: &str,
    details: &Json,
    required: &[&'static str],
    optional: &[&'static str],
) -> Result<(), RuleError> {
    let Json::Object(map) = details else {
        return Err(RuleError::MissingActionKey {
            action: action.to_string(),
            key: required.first().copied().unwrap_or("details"),
            details: details.to_string(),
        });
    };
    for key in required {
        if !map.contains_key(*key) {
            return Err(RuleError::MissingActionKey {
                action: action.to_string(),
                key,
                details: details.to_string(),
            });
        }
    }
    let unexpected: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|k| !required.contains(k) && !optional.contains(k))
        .collect();
    if !unexpected.is_empty() {
        return Err(RuleError::UnexpectedActionKeys {
            action: action.to_string(),
            keys: unexpected.join(","),
            details: details.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_validation() {
        let details = json!({"apply_carc": 45, "amount": 12.5});
        assert!(check_action_keys("allowed_exactly", &details, &["apply_carc", "amount"], &[]).is_ok());

        let missing = json!({"apply_carc": 45});
        assert!(matches!(
            check_action_keys("allowed_exactly", &missing, &["apply_carc", "amount"], &[]),
            Err(RuleError::MissingActionKey { .. })
        ));

        let extra = json!({"amount": 1, "apply_carc": 2, "bogus": 3});
        assert!(matches!(
            check_action_keys("allowed_exactly", &extra, &["apply_carc", "amount"], &[]),
            Err(RuleError::UnexpectedActionKeys { .. })
        ));
    }

    #[test]
    fn decimal_coercion() {
        assert_eq!(json_decimal(Some(&json!(25))), Decimal::from(25));
        assert_eq!(json_decimal(Some(&json!("12.50"))), "12.50".parse().unwrap());
        assert_eq!(json_decimal(None), Decimal::ZERO);
    }
}
