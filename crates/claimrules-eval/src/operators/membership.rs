//! Plan, program, and membership accessors

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::Expr;
use claimrules_model::DomainProvider;
use claimrules_types::RuleValue;
use std::collections::HashMap;

impl<P: DomainProvider> RuleEngine<P> {
    pub(crate) fn op_plan(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "plan", &value)?;
        Ok(data.group_plan_id.into())
    }

    pub(crate) fn op_plan_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "plan_type", &value)?;
        let plan_type = match data.group_plan_id {
            Some(id) => self.provider().plan_type(id)?,
            None => None,
        };
        Ok(plan_type.into())
    }

    /// `rate_code`: the rate-code membership attribute, or zero when the
    /// membership carries none.
    pub(crate) fn op_rate_code(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let attributes = self.membership_attributes_for(ctx, "rate_code", &value)?;
        Ok(match attributes.get("rate-code") {
            Some(code) => RuleValue::Text(code.clone()),
            None => RuleValue::from(0),
        })
    }

    pub(crate) fn op_member_ethnicity(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "member_ethnicity", args)?;
        let claim = self.claim_of(&entry)?;
        let insured = self.provider().insured(claim.insured_id)?;
        Ok(RuleValue::Text(insured.ethnicity.unwrap_or_default()))
    }

    /// `family_count`: the insured plus related insureds with effective
    /// relationships.
    pub(crate) fn op_family_count(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "family_count", &value)?;
        let Some(insured) = data.insured else {
            return Ok(RuleValue::from(1));
        };
        let related = self.provider().family_members(insured.id, data.target_date)?;
        Ok(RuleValue::from(related.len() as i64 + 1))
    }

    /// `membership_attribute`: look up one of a comma-separated list of
    /// attribute codes. `"true"`/`"false"` values come back as booleans,
    /// anything else as its value; a missing attribute is `false`.
    pub(crate) fn op_membership_attribute(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let requested = match &args[0] {
            Expr::Value(RuleValue::Text(s)) => s.clone(),
            other => self.eval(ctx, other)?.to_string(),
        };
        let subject = match args.get(1) {
            Some(arg) => self.eval(ctx, arg)?,
            None => self.bound_subject(ctx, "membership_attribute")?,
        };
        let attributes =
            self.membership_attributes_for(ctx, "membership_attribute", &subject)?;
        let found = requested
            .split(',')
            .find_map(|code| attributes.get(code.trim()));
        Ok(match found {
            Some(value) if value.eq_ignore_ascii_case("true") => RuleValue::Bool(true),
            Some(value) if value.eq_ignore_ascii_case("false") => RuleValue::Bool(false),
            Some(value) => RuleValue::Text(value.clone()),
            None => RuleValue::Bool(false),
        })
    }

    /// `iowa_tier`: the insured's benefit tier, as of the service date for
    /// claims and today for preauthorizations.
    pub(crate) fn op_benefit_tier(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "iowa_tier", args)?;
        let claim = self.claim_of(&entry)?;
        let as_of = if claim.is_claim() {
            self.consider_date(ctx, &entry)?
        } else {
            ctx.today()
        };
        Ok(self.provider().benefit_tier(claim.insured_id, as_of)?.into())
    }

    pub(crate) fn op_is_in_case_management(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "is_in_case_management?", &value)?;
        Ok(RuleValue::Bool(
            data.insured.is_some_and(|i| i.in_case_management),
        ))
    }

    /// `case_management_type`: the bound entry's insured has an open case
    /// of the named type.
    pub(crate) fn op_case_management_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let RuleValue::Text(wanted) = value else {
            return Err(RuleError::type_mismatch(
                "case_management_type",
                "a string",
                value.type_name(),
            ));
        };
        let entry = self.bound_entry(ctx, "case_management_type")?;
        let claim = self.claim_of(&entry)?;
        let insured = self.provider().insured(claim.insured_id)?;
        Ok(RuleValue::Bool(
            insured.case_management_types.iter().any(|t| *t == wanted),
        ))
    }

    /// `is_chisholm`: membership attribute flag on the bound entry's
    /// membership.
    pub(crate) fn op_is_chisholm(
        &self,
        ctx: &mut BindingContext,
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "is_chisholm")?;
        let subject = RuleValue::Entity(claimrules_types::EntityRef::claim_entry(entry.id));
        let attributes = self.membership_attributes_for(ctx, "is_chisholm", &subject)?;
        let member = attributes
            .get("chisholm-member")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        Ok(RuleValue::Bool(member))
    }

    /// Membership attributes for a subject, memoized per insured and date
    /// for the duration of a rule run.
    fn membership_attributes_for(
        &self,
        ctx: &mut BindingContext,
        op: &'static str,
        subject: &RuleValue,
    ) -> Result<HashMap<String, String>, RuleError> {
        let data = self.subject_data(ctx, op, subject)?;
        let Some(insured) = data.insured else {
            return Ok(HashMap::new());
        };
        let key = format!(
            "membership_attributes:{}:{}",
            insured.id, data.target_date
        );
        // The memo holds plain values, so the map rides through as JSON.
        let cached = ctx.memoize(&key, |_| {
            let attributes = self.provider().membership_attributes(
                insured.id,
                data.group_plan_id,
                data.target_date,
            )?;
            let encoded = serde_json::to_string(&attributes).unwrap_or_default();
            Ok::<RuleValue, RuleError>(RuleValue::Text(encoded))
        })?;
        match cached {
            RuleValue::Text(encoded) => {
                Ok(serde_json::from_str(&encoded).unwrap_or_default())
            }
            _ => Ok(HashMap::new()),
        }
    }

    /// The subject an argument-less membership lookup applies to: the bound
    /// entry, then the bound insured.
    fn bound_subject(
        &self,
        ctx: &BindingContext,
        op: &'static str,
    ) -> Result<RuleValue, RuleError> {
        ctx.get("rule:entry")
            .or_else(|| ctx.get("rule:insured"))
            .cloned()
            .ok_or_else(|| RuleError::NoSubject {
                name: op.to_string(),
            })
    }
}
