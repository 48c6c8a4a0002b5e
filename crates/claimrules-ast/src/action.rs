//! Adjudication contexts and action classification
//!
//! Every rule action belongs to a context; a processing run walks contexts in
//! a fixed order so that, for example, strong denials land before discounts.
//! Classification mostly keys on the action name, but `deny` and
//! `approve_at_zero` reclassify on the carrier adjustment reason code (CARC)
//! in their details.

use log::debug;
use serde_json::Value as Json;
use std::collections::HashSet;

/// Processing phase an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionContext {
    StrongDeny,
    StrongPend,
    DupDeny,
    StrongApprove,
    Deny,
    ApproveAtZero,
    Adjust,
    LoiDeny,
    Pend,
    Fees,
    Bundle,
    Discount,
    ApplyDeductible,
    ApplyCoinsurance,
    ApplyMaxOutOfPocket,
    LimitTotal,
    FooterDeny,
    FooterPend,
    FooterAddCarc,
}

/// Contexts in processing order.
pub const CONTEXT_ORDER: &[ActionContext] = &[
    ActionContext::StrongDeny,
    ActionContext::StrongPend,
    ActionContext::DupDeny,
    ActionContext::StrongApprove,
    ActionContext::Deny,
    ActionContext::ApproveAtZero,
    ActionContext::Adjust,
    ActionContext::LoiDeny,
    ActionContext::Pend,
    ActionContext::Fees,
    ActionContext::Bundle,
    ActionContext::Discount,
    ActionContext::ApplyDeductible,
    ActionContext::ApplyCoinsurance,
    ActionContext::ApplyMaxOutOfPocket,
    ActionContext::LimitTotal,
    ActionContext::FooterDeny,
    ActionContext::FooterPend,
    ActionContext::FooterAddCarc,
];

impl ActionContext {
    /// Position in [`CONTEXT_ORDER`]. Lower runs earlier.
    pub fn rank(&self) -> usize {
        CONTEXT_ORDER.iter().position(|c| c == self).unwrap_or(usize::MAX)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionContext::StrongDeny => "strong_deny",
            ActionContext::StrongPend => "strong_pend",
            ActionContext::DupDeny => "dup_deny",
            ActionContext::StrongApprove => "strong_approve",
            ActionContext::Deny => "deny",
            ActionContext::ApproveAtZero => "approve_at_zero",
            ActionContext::Adjust => "adjust",
            ActionContext::LoiDeny => "loi_deny",
            ActionContext::Pend => "pend",
            ActionContext::Fees => "fees",
            ActionContext::Bundle => "bundle",
            ActionContext::Discount => "discount",
            ActionContext::ApplyDeductible => "apply_deductible",
            ActionContext::ApplyCoinsurance => "apply_coinsurance",
            ActionContext::ApplyMaxOutOfPocket => "apply_max_out_of_pocket",
            ActionContext::LimitTotal => "limit_total",
            ActionContext::FooterDeny => "footer_deny",
            ActionContext::FooterPend => "footer_pend",
            ActionContext::FooterAddCarc => "footer_add_carc",
        }
    }
}

/// Carrier adjustment reason codes grouped by the special handling they get
/// during classification and denial processing. Populated from plan
/// configuration at engine setup.
#[derive(Debug, Clone, Default)]
pub struct CarcClassification {
    pub untimely_filing: HashSet<i64>,
    pub expired_loi: HashSet<i64>,
    pub loi: HashSet<i64>,
    pub medical_necessity: HashSet<i64>,
}

impl CarcClassification {
    fn is_strong_denial(&self, carc: i64) -> bool {
        self.untimely_filing.contains(&carc) || self.expired_loi.contains(&carc)
    }
}

/// Classify an action (by name and raw details) into its context.
///
/// Returns `None` for unknown actions; the caller decides whether that is an
/// error. Multi-valued details never trigger CARC-based reclassification.
pub fn action_context(
    action: &str,
    details: &Json,
    carcs: &CarcClassification,
) -> Option<ActionContext> {
    let context = match action {
        "strong_deny" => ActionContext::StrongDeny,
        "strong_pend" => ActionContext::StrongPend,
        "discount" => ActionContext::Discount,
        "pend" => ActionContext::Pend,
        "bundle" => ActionContext::Bundle,
        "apply_coinsurance" => ActionContext::ApplyCoinsurance,
        "apply_deductible" => ActionContext::ApplyDeductible,
        "deny" => match details.as_i64() {
            Some(carc) if carcs.is_strong_denial(carc) => ActionContext::StrongDeny,
            Some(2) => ActionContext::DupDeny,
            Some(carc) if carcs.loi.contains(&carc) => ActionContext::LoiDeny,
            _ => ActionContext::Deny,
        },
        "approve_at_zero" => match details.as_i64() {
            Some(7) => ActionContext::StrongApprove,
            _ => ActionContext::ApproveAtZero,
        },
        "recoup" | "reverse" | "adjust_by" => ActionContext::Adjust,
        "allowed_exactly" | "allowed_increase_to" | "allowed_increase_by" | "add_copay" => {
            ActionContext::Discount
        }
        "bundle_surfaces" | "recode" | "deny_higher_fees" => ActionContext::Bundle,
        "limit_total" | "limit_lifetime_total" => ActionContext::LimitTotal,
        "apply_max_out_of_pocket" => ActionContext::ApplyMaxOutOfPocket,
        "footer_deny" => ActionContext::FooterDeny,
        "footer_pend" => ActionContext::FooterPend,
        "add_carc" => ActionContext::FooterAddCarc,
        _ => {
            debug!(
                "Unable to determine context for action {} with details {}",
                action, details
            );
            return None;
        }
    };
    Some(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn carcs() -> CarcClassification {
        CarcClassification {
            untimely_filing: [29].into(),
            expired_loi: [119].into(),
            loi: [197].into(),
            medical_necessity: [50].into(),
        }
    }

    #[test]
    fn name_keyed_actions() {
        let c = carcs();
        assert_eq!(
            action_context("strong_deny", &json!(62), &c),
            Some(ActionContext::StrongDeny)
        );
        assert_eq!(
            action_context("pend", &json!("review"), &c),
            Some(ActionContext::Pend)
        );
        assert_eq!(
            action_context("adjust_by", &json!("-10.0"), &c),
            Some(ActionContext::Adjust)
        );
        assert_eq!(
            action_context("add_carc", &json!(96), &c),
            Some(ActionContext::FooterAddCarc)
        );
    }

    #[test]
    fn deny_reclassifies_on_carc() {
        let c = carcs();
        assert_eq!(
            action_context("deny", &json!(29), &c),
            Some(ActionContext::StrongDeny)
        );
        assert_eq!(
            action_context("deny", &json!(119), &c),
            Some(ActionContext::StrongDeny)
        );
        assert_eq!(
            action_context("deny", &json!(2), &c),
            Some(ActionContext::DupDeny)
        );
        assert_eq!(
            action_context("deny", &json!(197), &c),
            Some(ActionContext::LoiDeny)
        );
        assert_eq!(
            action_context("deny", &json!(62), &c),
            Some(ActionContext::Deny)
        );
        // A list of codes stays a plain denial
        assert_eq!(
            action_context("deny", &json!([29, 62]), &c),
            Some(ActionContext::Deny)
        );
    }

    #[test]
    fn approve_at_zero_seven_is_strong() {
        let c = carcs();
        assert_eq!(
            action_context("approve_at_zero", &json!(7), &c),
            Some(ActionContext::StrongApprove)
        );
        assert_eq!(
            action_context("approve_at_zero", &json!(96), &c),
            Some(ActionContext::ApproveAtZero)
        );
    }

    #[test]
    fn unknown_actions_classify_to_none() {
        assert_eq!(action_context("launch_rockets", &json!(1), &carcs()), None);
    }

    #[test]
    fn rank_follows_processing_order() {
        assert!(ActionContext::StrongDeny.rank() < ActionContext::Deny.rank());
        assert!(ActionContext::Deny.rank() < ActionContext::FooterAddCarc.rank());
        assert_eq!(CONTEXT_ORDER.len(), 19);
    }
}
