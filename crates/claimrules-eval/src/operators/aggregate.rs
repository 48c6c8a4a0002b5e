//! Operators that scan the claim and preauthorization history

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, ExprError, OpCode};
use claimrules_model::{Claim, ClaimEntry, DomainProvider, PreauthStatus};
use claimrules_types::{EntityRef, RuleValue};
use indexmap::IndexMap;
use std::collections::BTreeMap;

impl<P: DomainProvider> RuleEngine<P> {
    /// `exists`: some other entry in the history satisfies the condition.
    pub(crate) fn op_exists(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "exists")?;
        let found = self.count_entries(ctx, &entry, &args[0], false, 1)?;
        Ok(RuleValue::Bool(found >= 1))
    }

    /// `exists_at_least`: at least N other entries satisfy the condition.
    pub(crate) fn op_exists_at_least(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let needed = self.int_arg(ctx, "exists_at_least", &args[0])?;
        let entry = self.bound_entry(ctx, "exists_at_least")?;
        let found = self.count_entries(ctx, &entry, &args[1], false, needed)?;
        Ok(RuleValue::Bool(found >= needed))
    }

    /// `count_entries`: how many entries satisfy the condition, the subject
    /// itself included.
    pub(crate) fn op_count_entries(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "count_entries")?;
        let found = self.count_entries(ctx, &entry, &args[0], true, i64::MAX)?;
        Ok(RuleValue::from(found))
    }

    /// `found`: like `exists`, but captures the first matching entry under a
    /// name later expressions can refer to.
    pub(crate) fn op_found(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let Expr::Value(RuleValue::Text(name)) = &args[0] else {
            return Err(RuleError::Parse(ExprError::HeadNotOperator {
                found: args[0].to_string(),
            }));
        };
        let name = name.clone();
        let condition = &args[1];
        let entry = self.bound_entry(ctx, "found")?;
        let claim = self.claim_of(&entry)?;
        for candidate_claim in self.history_documents(&claim)? {
            if !candidate_claim.is_claim() && candidate_claim.id != entry.claim_id {
                continue;
            }
            if candidate_claim.voided {
                continue;
            }
            for candidate in self.provider().entries_sorted(candidate_claim.id)? {
                if candidate.voided || candidate.id == entry.id {
                    continue;
                }
                let entity = EntityRef::claim_entry(candidate.id);
                let key = format!("rule:{}", name);
                let matched =
                    ctx.with_binding(&key, RuleValue::Entity(entity), |ctx| {
                        self.eval_condition_for_entry(ctx, entity, condition)
                    })?;
                if matched {
                    ctx.record_found_entry(name, entity);
                    return Ok(RuleValue::Bool(true));
                }
            }
        }
        Ok(RuleValue::Bool(false))
    }

    /// `preauth_exists`: some entry on any preauthorization satisfies the
    /// condition.
    pub(crate) fn op_preauth_exists(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "preauth_exists")?;
        let claim = self.claim_of(&entry)?;
        for preauth in self.provider().preauth_history(claim.insured_id)? {
            if preauth.voided {
                continue;
            }
            for candidate in self.provider().entries_sorted(preauth.id)? {
                if candidate.voided {
                    continue;
                }
                let entity = EntityRef::claim_entry(candidate.id);
                if self.eval_condition_for_entry(ctx, entity, &args[0])? {
                    return Ok(RuleValue::Bool(true));
                }
            }
        }
        Ok(RuleValue::Bool(false))
    }

    /// `preauth_exists_with`: the caller's condition plus the standard match
    /// terms, applied to preauthorization entries. An approved, mailed
    /// preauthorization for the same procedure, tooth, and surface whose
    /// window covers the service date.
    pub(crate) fn op_preauth_exists_with(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "preauth_exists_with")?;
        let subject = Expr::entity(EntityRef::claim_entry(entry.id));
        let same_attr = |op: OpCode| {
            Expr::call(
                OpCode::Eq,
                vec![
                    Expr::call(op, vec![subject.clone()]),
                    Expr::call(op, vec![Expr::text("entry")]),
                ],
            )
        };
        let condition = Expr::call(
            OpCode::And,
            vec![
                args[0].clone(),
                same_attr(OpCode::Cdt),
                same_attr(OpCode::Tooth),
                same_attr(OpCode::Surface),
                Expr::text("approved"),
                Expr::text("mailed"),
                Expr::call(
                    OpCode::Le,
                    vec![
                        Expr::call(OpCode::Dos, vec![subject.clone()]),
                        Expr::call(OpCode::ExpirationDate, vec![Expr::text("entry")]),
                    ],
                ),
            ],
        );
        self.eval(ctx, &Expr::call(OpCode::PreauthExists, vec![condition]))
    }

    /// `preauth_for`: the preauthorization entry matched to the subject
    /// satisfies the condition.
    pub(crate) fn op_preauth_for(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.bound_entry(ctx, "preauth_for")?;
        let Some((preauth_id, preauth_entry_id)) =
            self.provider().preauth_for_entry(entry.id)?
        else {
            return Ok(RuleValue::Bool(false));
        };
        let preauth = self.provider().claim(preauth_id)?;
        let preauth_entry = self.provider().claim_entry(preauth_entry_id)?;
        if preauth.voided || preauth_entry.voided {
            return Ok(RuleValue::Bool(false));
        }
        let entity = EntityRef::claim_entry(preauth_entry_id);
        Ok(RuleValue::Bool(
            self.eval_condition_for_entry(ctx, entity, &args[0])?,
        ))
    }

    /// `preauthorized`: the entry's matched preauthorization is approved.
    /// Cached per entry for the session.
    pub(crate) fn op_preauthorized(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "preauthorized", args)?;
        let key = format!("entry_preauthorization:{}", entry.id);
        ctx.memoize(&key, |_| {
            let status = self.provider().preauthorization_status(entry.id)?;
            Ok(RuleValue::Bool(status == Some(PreauthStatus::Approved)))
        })
    }

    /// `{exceeds_benefit_limit_within timeframe, of condition, qty n}`: the
    /// subject's procedure frequency within the window around its service
    /// date reaches the limit.
    ///
    /// Approved entries count, as do unprocessed entries on the same
    /// document. Entries denied for medical necessity count only for other
    /// service dates, where they stand as permanent resolutions.
    pub(crate) fn op_exceeds_benefit_limit(
        &self,
        ctx: &mut BindingContext,
        arg: &Expr,
        kwargs: &IndexMap<String, Expr>,
    ) -> Result<RuleValue, RuleError> {
        let timeframe = match self.eval(ctx, arg)? {
            RuleValue::Duration(d) => d,
            other => {
                return Err(RuleError::type_mismatch(
                    "exceeds_benefit_limit_within",
                    "a duration",
                    other.type_name(),
                ));
            }
        };
        let entry = self.bound_entry(ctx, "exceeds_benefit_limit_within")?;
        let claim = self.claim_of(&entry)?;
        let current_dos = if claim.is_claim() {
            entry.dos
        } else {
            claim.date_received
        };
        let Some(current_dos) = current_dos else {
            return Ok(RuleValue::Bool(false));
        };
        let (Some(window_from), Some(window_thru)) = (
            timeframe.sub_from(current_dos),
            timeframe.add_to(current_dos),
        ) else {
            return Ok(RuleValue::Bool(false));
        };

        let condition = kwargs
            .get("of")
            .ok_or(RuleError::Parse(ExprError::MissingKwarg {
                op: "exceeds_benefit_limit_within",
                key: "of".to_string(),
            }))?;

        let mut relevant: Vec<ClaimEntry> = Vec::new();
        for history_claim in self.provider().claim_history(claim.insured_id)? {
            if !history_claim.is_claim() || history_claim.voided {
                continue;
            }
            for candidate in self.provider().entries_sorted(history_claim.id)? {
                // Other documents count whole; within the subject's own
                // document only earlier lines do, so a document never
                // exceeds its limit against itself twice.
                let counts = candidate.claim_id != entry.claim_id
                    || candidate.id < entry.id;
                let in_window = candidate
                    .dos
                    .is_some_and(|dos| dos > window_from && dos < window_thru);
                if candidate.voided || !counts || !in_window {
                    continue;
                }
                let entity = EntityRef::claim_entry(candidate.id);
                if self.eval_condition_for_entry(ctx, entity, condition)? {
                    relevant.push(candidate);
                }
            }
        }

        let mut by_dos: BTreeMap<chrono::NaiveDate, Vec<&ClaimEntry>> = BTreeMap::new();
        for candidate in &relevant {
            if let Some(dos) = candidate.dos {
                by_dos.entry(dos).or_default().push(candidate);
            }
        }
        let mut found = 0i64;
        for (dos, entries) in by_dos {
            let considered = entries
                .iter()
                .filter(|e| {
                    e.status.is_approved()
                        || (e.status.is_unprocessed() && e.claim_id == entry.claim_id)
                })
                .count() as i64;
            found += considered;
            if dos != current_dos {
                let denied_med_nec = entries
                    .iter()
                    .filter(|e| {
                        e.status.is_denied()
                            && e.carcs
                                .iter()
                                .any(|c| self.carcs().medical_necessity.contains(c))
                    })
                    .count() as i64;
                found += denied_med_nec;
            }
        }

        let needed = match kwargs.get("qty") {
            Some(expr) => self.int_arg(ctx, "exceeds_benefit_limit_within", expr)?,
            None => 1,
        };
        Ok(RuleValue::Bool(found >= needed))
    }

    /// The insured's claim history, with the subject's own document appended
    /// when it is a preauthorization and so lives outside the claim history.
    fn history_documents(&self, claim: &Claim) -> Result<Vec<Claim>, RuleError> {
        let mut documents = self.provider().claim_history(claim.insured_id)?;
        if !documents.iter().any(|c| c.id == claim.id) {
            documents.push(claim.clone());
        }
        Ok(documents)
    }

    /// Walk the insured's claim history counting entries that satisfy a
    /// condition. Preauthorizations only count when they are the subject's
    /// own document. Stops as soon as `needed` is reached.
    fn count_entries(
        &self,
        ctx: &mut BindingContext,
        entry: &ClaimEntry,
        condition: &Expr,
        count_self: bool,
        needed: i64,
    ) -> Result<i64, RuleError> {
        let claim = self.claim_of(entry)?;
        let mut found = 0i64;
        for history_claim in self.history_documents(&claim)? {
            if found >= needed {
                break;
            }
            if !history_claim.is_claim() && history_claim.id != entry.claim_id {
                continue;
            }
            if history_claim.voided {
                continue;
            }
            for candidate in self.provider().entries_sorted(history_claim.id)? {
                if found >= needed {
                    break;
                }
                if candidate.voided || (!count_self && candidate.id == entry.id) {
                    continue;
                }
                let entity = EntityRef::claim_entry(candidate.id);
                if self.eval_condition_for_entry(ctx, entity, condition)? {
                    found += 1;
                }
            }
        }
        Ok(found)
    }
}
