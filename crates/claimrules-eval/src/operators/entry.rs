//! Claim entry and document accessors

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, OpCode};
use claimrules_model::{CobKind, DomainProvider};
use claimrules_types::RuleValue;
use rust_decimal::Decimal;

impl<P: DomainProvider> RuleEngine<P> {
    pub(crate) fn op_cdt(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "cdt", args)?;
        Ok(entry.cpt_code.into())
    }

    pub(crate) fn op_qty(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "qty", args)?;
        Ok(RuleValue::from(entry.qty.unwrap_or(1)))
    }

    pub(crate) fn op_billed(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "billed", args)?;
        Ok(RuleValue::Number(entry.amount_claim))
    }

    /// Contracted fee; zero when the procedure has none on file.
    pub(crate) fn op_reimbursable_fee(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "reimbursable_fee", args)?;
        let fee = self.provider().reimbursable_fee(entry.id)?;
        Ok(RuleValue::Number(fee.unwrap_or_default()))
    }

    /// `uncovered`: no contracted fee exists for the procedure.
    pub(crate) fn op_uncovered(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "uncovered", args)?;
        Ok(RuleValue::Bool(
            self.provider().reimbursable_fee(entry.id)?.is_none(),
        ))
    }

    pub(crate) fn op_remarks(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "remarks", args)?;
        Ok(entry.remarks.into())
    }

    pub(crate) fn op_remarks_only(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "remarks_only", args)?;
        Ok(entry.remarks.into())
    }

    /// Whether the remarks carry a DPC tracking number (`DPC0000D`).
    pub(crate) fn op_remarks_have_dpc_no(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "remarks_have_dpc_no?", args)?;
        let found = entry
            .remarks
            .as_deref()
            .is_some_and(contains_dpc_number);
        Ok(RuleValue::Bool(found))
    }

    pub(crate) fn op_entry_id(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "entry_id", args)?;
        Ok(RuleValue::from(entry.id))
    }

    pub(crate) fn op_claim_id(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "claim_id", args)?;
        Ok(RuleValue::from(entry.claim_id))
    }

    /// `pended` / `approved` / `denied` status tests.
    pub(crate) fn op_status(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, op.name(), args)?;
        let holds = match op {
            OpCode::Pended => entry.status.is_pended(),
            OpCode::Approved => entry.status.is_approved(),
            _ => entry.status.is_denied(),
        };
        Ok(RuleValue::Bool(holds))
    }

    pub(crate) fn op_mailed(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "mailed", args)?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.mailed))
    }

    pub(crate) fn op_is_emergency(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "is_emergency", args)?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.emergency))
    }

    pub(crate) fn op_sys_added_entry(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "sys_added_entry")?;
        Ok(RuleValue::Bool(entry.added_by_system))
    }

    pub(crate) fn op_behavior_management_form(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "behavior_management_form", args)?;
        Ok(RuleValue::Bool(entry.behavior_management_form))
    }

    pub(crate) fn op_cdt_is_ada(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "cdt_is_ada?", args)?;
        let is_ada = match entry.cpt_code.as_deref() {
            Some(code) => self.provider().cdt_is_ada(code)?,
            None => false,
        };
        Ok(RuleValue::Bool(is_ada))
    }

    pub(crate) fn op_cdt_max_qty(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "cdt_max_qty", args)?;
        let max = match entry.cpt_code.as_deref() {
            Some(code) => self.provider().cdt_max_qty(code)?,
            None => None,
        };
        Ok(RuleValue::from(max.unwrap_or(1)))
    }

    pub(crate) fn op_is_claim(&self, ctx: &mut BindingContext) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "is_claim?")?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.is_claim()))
    }

    pub(crate) fn op_is_preauth(&self, ctx: &mut BindingContext) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "is_preauth?")?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.is_preauth()))
    }

    pub(crate) fn op_transmission_method(
        &self,
        ctx: &mut BindingContext,
        _args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "transmission_method")?;
        Ok(self.claim_of(&entry)?.transmission_method.into())
    }

    pub(crate) fn op_place_of_service(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "place_of_service", args)?;
        Ok(self.claim_of(&entry)?.place_of_service.into())
    }

    pub(crate) fn op_pos_code(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "pos_code", args)?;
        let pos = self
            .claim_of(&entry)?
            .pos_code
            .filter(|code| !code.trim().is_empty());
        Ok(pos.into())
    }

    pub(crate) fn op_is_out_of_network(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "is_out_of_network?")?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.out_of_network))
    }

    pub(crate) fn op_has_cob(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "has_cob?", args)?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.has_cob))
    }

    /// The third-party-liability family: coverage of a given kind effective
    /// on the entry's date of service.
    pub(crate) fn op_has_tpl(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, op.name(), args)?;
        let claim = self.claim_of(&entry)?;
        let kind = match op {
            OpCode::HasDentalTpl => CobKind::Dental,
            OpCode::HasMedicalTpl => CobKind::Medical,
            OpCode::HasNonMedicalTpl => CobKind::NonMedical,
            _ => CobKind::Any,
        };
        let has = self
            .provider()
            .insured_has_cob(claim.insured_id, kind, entry.dos)?;
        Ok(RuleValue::Bool(has))
    }

    pub(crate) fn op_provider(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "provider", args)?;
        Ok(self.claim_of(&entry)?.provider_id.into())
    }

    pub(crate) fn op_provider_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "provider_type", args)?;
        let record = self.provider_of(&entry)?;
        Ok(record.and_then(|r| r.provider_type).into())
    }

    pub(crate) fn op_provider_npi(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "provider_npi")?;
        let record = self.provider_of(&entry)?;
        Ok(record.and_then(|r| r.npi).into())
    }

    pub(crate) fn op_provider_fdh_effective(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "provider_fdh_effective")?;
        let record = self.provider_of(&entry)?;
        Ok(record.and_then(|r| r.fdh_effective).into())
    }

    /// A provider has a medicaid id directly or through its facility link.
    pub(crate) fn op_provider_has_medicaid_id(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "provider_has_medicaid_id?")?;
        let claim = self.claim_of(&entry)?;
        let Some(provider_id) = claim.provider_id else {
            return Ok(RuleValue::Bool(false));
        };
        let direct = self
            .provider()
            .provider(provider_id)?
            .is_some_and(|r| r.medicaid_id.is_some_and(|id| !id.trim().is_empty()));
        if direct {
            return Ok(RuleValue::Bool(true));
        }
        let Some(facility_id) = claim.facility_id else {
            return Ok(RuleValue::Bool(false));
        };
        let as_of = self.consider_date(ctx, &entry)?;
        let linked =
            self.provider()
                .provider_facility_medicaid_link(provider_id, facility_id, as_of)?;
        Ok(RuleValue::Bool(linked))
    }

    pub(crate) fn op_payment_hold_code(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "payment_hold_code")?;
        let record = self.provider_of(&entry)?;
        Ok(record.and_then(|r| r.payment_hold_code).into())
    }

    /// `fqhc?`: the entry is reimbursed at a medicaid encounter rate.
    pub(crate) fn op_fqhc(&self, ctx: &mut BindingContext) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "fqhc?")?;
        Ok(RuleValue::Bool(entry.medicaid_reimbursable))
    }

    pub(crate) fn op_facility(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "facility", args)?;
        Ok(self.claim_of(&entry)?.facility_id.into())
    }

    pub(crate) fn op_facility_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "facility_type", args)?;
        let record = self.facility_of(&entry)?;
        Ok(record.and_then(|r| r.facility_type).into())
    }

    pub(crate) fn op_facility_has_teledentistry(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "facility_has_teledentistry?")?;
        let record = self.facility_of(&entry)?;
        Ok(RuleValue::Bool(record.is_some_and(|r| r.has_teledentistry)))
    }

    pub(crate) fn op_encounter_rate_applies(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "encounter_rate_applies")?;
        Ok(RuleValue::Bool(self.claim_of(&entry)?.encounter_rate_applies))
    }

    pub(crate) fn op_program(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "program", args)?;
        Ok(RuleValue::from(self.claim_of(&entry)?.program_id.unwrap_or(0)))
    }

    /// `benefit_max`: the plan cap, or effectively unlimited when none.
    pub(crate) fn op_benefit_max(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "benefit_max")?;
        let max = self
            .provider()
            .plan_benefit_max(entry.claim_id)?
            .filter(|m| *m > Decimal::ZERO);
        Ok(RuleValue::Number(max.unwrap_or(Decimal::MAX)))
    }

    /// `has_note_type?`: the document carries a note of any of the named
    /// types. The type list is taken literally.
    pub(crate) fn op_has_note_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "has_note_type?")?;
        let types = match &args[0] {
            Expr::Value(RuleValue::Text(s)) => s.clone(),
            other => self.eval(ctx, other)?.to_string(),
        };
        let has = self.provider().claim_has_note_type(entry.claim_id, &types)?;
        Ok(RuleValue::Bool(has))
    }

    /// Assigned dental-home provider or facility for the entry's insured.
    pub(crate) fn op_mdh(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
        facility: bool,
    ) -> Result<RuleValue, RuleError> {
        let op = if facility { "mdh_facility" } else { "mdh_provider" };
        let entry = self.entry_arg(ctx, op, args)?;
        let claim = self.claim_of(&entry)?;
        let as_of = self.consider_date(ctx, &entry)?;
        let id = if facility {
            self.provider().ifa_facility(claim.insured_id, as_of)?
        } else {
            self.provider().ifa_provider(claim.insured_id, as_of)?
        };
        Ok(id.into())
    }

    /// Kept as text for comparability with `"true"`/`"false"` literals in
    /// existing rule documents.
    pub(crate) fn op_rendered_by_mdh(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "rendered_by_mdh", args)?;
        Ok(RuleValue::text(entry.rendered_by_mdh.to_string()))
    }
}

/// Matches `DPC` followed by four digits and a `D`.
fn contains_dpc_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    text.match_indices("DPC").any(|(i, _)| {
        bytes.len() >= i + 8
            && bytes[i + 3..i + 7].iter().all(u8::is_ascii_digit)
            && bytes[i + 7] == b'D'
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpc_number_detection() {
        assert!(contains_dpc_number("see DPC1234D for details"));
        assert!(!contains_dpc_number("DPC12D"));
        assert!(!contains_dpc_number("DPC1234"));
        assert!(!contains_dpc_number("no tracking number"));
    }
}
