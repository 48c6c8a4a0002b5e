//! Dates, durations, ages and benefit-period anniversaries

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, OpCode};
use claimrules_model::DomainProvider;
use claimrules_types::{RuleDuration, RuleValue};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;

impl<P: DomainProvider> RuleEngine<P> {
    /// Map-form operators: durations (`{days 45}`), document dates with
    /// optional `+`/`-` arithmetic, and the benefit-limit window check.
    pub(crate) fn eval_keyed(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        arg: &Expr,
        kwargs: &IndexMap<String, Expr>,
    ) -> Result<RuleValue, RuleError> {
        match op {
            OpCode::Days | OpCode::Weeks | OpCode::Months | OpCode::Years => {
                let n = self.int_arg(ctx, op.name(), arg)?;
                let duration = match op {
                    OpCode::Days => RuleDuration::days(n),
                    OpCode::Weeks => RuleDuration::weeks(n),
                    OpCode::Months => RuleDuration::months(clamp_months(n)),
                    _ => RuleDuration::years(clamp_months(n)),
                };
                Ok(RuleValue::Duration(duration))
            }
            OpCode::Dos | OpCode::DateReceived => {
                let value = self.eval(ctx, arg)?;
                let entity = self.entry_ref(op.name(), &value)?;
                let entry = self.provider().claim_entry(entity.id)?;
                let claim = self.claim_of(&entry)?;
                // Preauths have no service date of their own; their receipt
                // date stands in for both forms.
                let base = if claim.is_claim() && op == OpCode::Dos {
                    entry.dos.or(claim.date_received)
                } else {
                    claim.date_received
                };
                let Some(mut date) = base else {
                    return Ok(RuleValue::Null);
                };
                if let Some(offset) = kwargs.get("+") {
                    let duration = self.duration_arg(ctx, op.name(), offset)?;
                    match duration.add_to(date) {
                        Some(d) => date = d,
                        None => return Ok(RuleValue::Null),
                    }
                }
                if let Some(offset) = kwargs.get("-") {
                    let duration = self.duration_arg(ctx, op.name(), offset)?;
                    match duration.sub_from(date) {
                        Some(d) => date = d,
                        None => return Ok(RuleValue::Null),
                    }
                }
                Ok(RuleValue::Date(date))
            }
            OpCode::ExpirationDate => {
                let value = self.eval(ctx, arg)?;
                let entity = self.entry_ref(op.name(), &value)?;
                let entry = self.provider().claim_entry(entity.id)?;
                Ok(self.claim_of(&entry)?.expiration_date.into())
            }
            OpCode::EntryId => {
                let value = self.eval(ctx, arg)?;
                let entity = self.entry_ref(op.name(), &value)?;
                Ok(RuleValue::from(entity.id))
            }
            OpCode::ExceedsBenefitLimitWithin => {
                self.op_exceeds_benefit_limit(ctx, arg, kwargs)
            }
            other => Err(RuleError::UnsupportedOp { op: other.name() }),
        }
    }

    pub(crate) fn int_arg(
        &self,
        ctx: &mut BindingContext,
        op: &'static str,
        arg: &Expr,
    ) -> Result<i64, RuleError> {
        let value = self.eval(ctx, arg)?;
        value
            .as_number()
            .filter(|n| n.fract().is_zero())
            .and_then(|n| n.to_i64())
            .ok_or_else(|| RuleError::type_mismatch(op, "an integer", value.type_name()))
    }

    fn duration_arg(
        &self,
        ctx: &mut BindingContext,
        op: &'static str,
        arg: &Expr,
    ) -> Result<RuleDuration, RuleError> {
        match self.eval(ctx, arg)? {
            RuleValue::Duration(d) => Ok(d),
            // A bare number counts days, as in `{dos entry + 45}`.
            RuleValue::Number(n) if n.fract().is_zero() => {
                Ok(RuleDuration::days(n.to_i64().unwrap_or(0)))
            }
            other => Err(RuleError::type_mismatch(op, "a duration", other.type_name())),
        }
    }

    /// `as_of_date`: the date a subject is considered at. Entries use their
    /// service date falling back to receipt; anything else means today.
    pub(crate) fn op_as_of_date(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        match value.as_entity() {
            Some(entity) if entity.is_claim_entry() => {
                let entry = self.provider().claim_entry(entity.id)?;
                match entry.dos {
                    Some(dos) => Ok(RuleValue::Date(dos)),
                    None => Ok(self.claim_of(&entry)?.date_received.into()),
                }
            }
            _ => Ok(RuleValue::Date(ctx.today())),
        }
    }

    pub(crate) fn op_start_of_year(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "start_of_year", args)?;
        let date = self.consider_date(ctx, &entry)?;
        Ok(NaiveDate::from_ymd_opt(date.year(), 1, 1).into())
    }

    /// `anniversary_before` / `anniversary_after`: the bounds of the plan
    /// benefit period covering the entry's date of service. Null when no
    /// period can be determined.
    pub(crate) fn op_anniversary(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, op.name(), args)?;
        let dos = self.consider_date(ctx, &entry)?;
        let period = self.provider().plan_benefit_period(entry.claim_id, dos)?;
        Ok(match period {
            Some(period) if op == OpCode::AnniversaryBefore => RuleValue::Date(period.from),
            Some(period) => RuleValue::Date(period.thru),
            None => RuleValue::Null,
        })
    }

    /// Deductible accumulation period bounds for the entry's insured.
    pub(crate) fn op_deductible_anniversary(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, op.name(), args)?;
        let claim = self.claim_of(&entry)?;
        let dos = self.consider_date(ctx, &entry)?;
        let period =
            self.provider()
                .deductible_benefit_period(claim.insured_id, claim.group_plan_id, dos)?;
        Ok(match period {
            Some(period) if op == OpCode::DeductibleAnniversaryBefore => {
                RuleValue::Date(period.from)
            }
            Some(period) => RuleValue::Date(period.thru),
            None => RuleValue::Null,
        })
    }

    /// `age`: whole years as of the subject's effective date.
    pub(crate) fn op_age(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "age", &value)?;
        Ok(data
            .insured
            .and_then(|insured| insured.age_in_years(data.target_date))
            .into())
    }

    /// `age_at_first_of_month`: age at the first of the effective month, or
    /// of an explicitly given date's month.
    pub(crate) fn op_age_at_first_of_month(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let data = self.subject_data(ctx, "age_at_first_of_month", &value)?;
        let target = match args.get(1) {
            Some(arg) => {
                let value = self.eval(ctx, arg)?;
                value.as_date().ok_or_else(|| {
                    RuleError::type_mismatch("age_at_first_of_month", "a date", value.type_name())
                })?
            }
            None => data.target_date,
        };
        let first = target.with_day(1).unwrap_or(target);
        Ok(data
            .insured
            .and_then(|insured| insured.age_in_years(first))
            .into())
    }

    /// `enrollment_days`: continuous enrollment looking back a number of
    /// days from the entry's effective date.
    pub(crate) fn op_enrollment_days(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let backdays = self.int_arg(ctx, "enrollment_days", &args[0])?;
        let entry = match args.get(1) {
            Some(arg) => self.entry_arg(ctx, "enrollment_days", std::slice::from_ref(arg))?,
            None => self.bound_entry(ctx, "enrollment_days")?,
        };
        let claim = self.claim_of(&entry)?;
        let as_of = self.consider_date(ctx, &entry)?;
        let days = self
            .provider()
            .continuous_enrollment_days(claim.insured_id, backdays, as_of)?;
        Ok(RuleValue::from(days))
    }

    /// `enrollment_period`: the externally bound enrollment duration, when
    /// the adjudication session supplies one.
    pub(crate) fn op_enrollment_period(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        self.eval(ctx, &args[0])?;
        Ok(ctx.get("enrollment_duration").cloned().unwrap_or(RuleValue::Null))
    }
}

fn clamp_months(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
