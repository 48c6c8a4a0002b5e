//! The expression evaluator
//!
//! [`RuleEngine`] owns the data provider and the CARC classification; all
//! per-session state lives in the [`BindingContext`] threaded through every
//! call. Dispatch is a single exhaustive match over the operator vocabulary;
//! the handlers live in the `operators` modules.

use crate::actions::AdjudicationEffect;
use crate::context::BindingContext;
use crate::error::RuleError;
use claimrules_ast::{CarcClassification, Expr, OpCode, Rule};
use claimrules_model::{Claim, ClaimEntry, DomainProvider, FacilityRecord, Insured, ProviderRecord};
use claimrules_types::{EntityRef, LazySet, RuleValue};
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::prelude::ToPrimitive;
use std::time::{Duration, Instant};

/// Expressions slower than this get logged.
const SLOW_EXPR: Duration = Duration::from_millis(500);

/// Evaluates rule expressions and dispatches rule actions.
pub struct RuleEngine<P> {
    provider: P,
    carcs: CarcClassification,
}

/// Everything operators need to know about the insured behind a subject.
pub(crate) struct SubjectData {
    pub insured: Option<Insured>,
    pub group_plan_id: Option<i64>,
    pub target_date: NaiveDate,
}

impl<P: DomainProvider> RuleEngine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_carc_classification(provider, CarcClassification::default())
    }

    pub fn with_carc_classification(provider: P, carcs: CarcClassification) -> Self {
        Self { provider, carcs }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn carcs(&self) -> &CarcClassification {
        &self.carcs
    }

    /// Evaluate an expression to a value.
    pub fn eval(
        &self,
        ctx: &mut BindingContext,
        expr: &Expr,
    ) -> Result<RuleValue, RuleError> {
        let started = Instant::now();
        let result = self.eval_inner(ctx, expr)?;
        if ctx.trace() {
            debug!("{} => {}", expr, result);
        }
        let elapsed = started.elapsed();
        if elapsed > SLOW_EXPR {
            warn!("Spent {:?} on this expression: {}", elapsed, expr);
        }
        Ok(result)
    }

    fn eval_inner(
        &self,
        ctx: &mut BindingContext,
        expr: &Expr,
    ) -> Result<RuleValue, RuleError> {
        match expr {
            Expr::Value(RuleValue::Text(text)) => self.resolve_text(ctx, text),
            Expr::Value(value) => Ok(value.clone()),
            Expr::Call { op, args } => {
                let arity = op.arity();
                if !arity.accepts(args.len()) {
                    return Err(RuleError::arity(op.name(), arity, render_args(args)));
                }
                self.dispatch(ctx, *op, args)
            }
            Expr::Keyed { op, arg, kwargs } => self.eval_keyed(ctx, *op, arg, kwargs),
        }
    }

    /// Resolve a bare text leaf.
    ///
    /// An operator name is sugar for applying that operator to the bound
    /// subject (entry, then insured, then plan). Otherwise the text resolves
    /// through scoped bindings, then entries captured by `found`, and finally
    /// parses as a set literal.
    fn resolve_text(
        &self,
        ctx: &mut BindingContext,
        text: &str,
    ) -> Result<RuleValue, RuleError> {
        if let Some(op) = OpCode::from_name(text).filter(|op| !op.is_keyed_only()) {
            let subject = ["rule:entry", "rule:insured", "rule:gpi"]
                .iter()
                .find_map(|key| ctx.get(key).cloned())
                .ok_or_else(|| RuleError::NoSubject {
                    name: text.to_string(),
                })?;
            return self.dispatch(ctx, op, &[Expr::Value(subject)]);
        }
        if let Some(value) = ctx.get(&format!("rule:{}", text)) {
            return Ok(value.clone());
        }
        if let Some(entry) = ctx.found_entry(text) {
            return Ok(RuleValue::Entity(entry));
        }
        Ok(LazySet::parse(text)?)
    }

    fn dispatch(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        use OpCode::*;
        match op {
            Eq | Intersects => self.op_eq(ctx, args),
            NotEq => self.op_negate(ctx, Eq, args),
            And => self.op_and(ctx, args),
            Or => self.op_or(ctx, args),
            Not => self.op_not(ctx, args),
            Cond => self.op_cond(ctx, args),
            Present => self.op_present(ctx, args),
            Blank => self.op_negate(ctx, Present, args),
            Lt | Gt | Le | Ge => self.op_compare(ctx, op, args),
            ContainsAny => self.op_contains_any(ctx, args),
            Identical => self.op_identical(ctx, args),
            Same => self.op_pairwise(ctx, And, Eq, args),
            SameOr => self.op_pairwise(ctx, Or, Eq, args),
            ExactlySame => self.op_pairwise(ctx, And, Identical, args),

            Cdt => self.op_cdt(ctx, args),
            Tooth => self.op_tooth(ctx, args),
            Quadrant | Area => self.op_quadrant(ctx, args),
            Arch => self.op_arch(ctx, args),
            Surface => self.op_surface(ctx, args),
            NumSurfaces => self.op_num_surfaces(ctx, args),
            IowaTier => self.op_benefit_tier(ctx, args),
            Qty => self.op_qty(ctx, args),
            Billed => self.op_billed(ctx, args),
            ReimbursableFee => self.op_reimbursable_fee(ctx, args),
            Uncovered => self.op_uncovered(ctx, args),
            Remarks => self.op_remarks(ctx, args),
            RemarksOnly => self.op_remarks_only(ctx, args),
            RemarksHaveDpcNo => self.op_remarks_have_dpc_no(ctx, args),
            EntryId => self.op_entry_id(ctx, args),
            ClaimId => self.op_claim_id(ctx, args),
            Pended | Approved | Denied => self.op_status(ctx, op, args),
            Mailed => self.op_mailed(ctx, args),
            IsEmergency => self.op_is_emergency(ctx, args),
            SysAddedEntry => self.op_sys_added_entry(ctx),
            BehaviorManagementForm => self.op_behavior_management_form(ctx, args),
            HasXrays | HasPreopXrays | HasPostopXrays => self.op_has_radiographs(ctx, op, args),
            HasAnesthesiaTimeRecord => self.op_has_anesthesia_record(ctx, args),
            HasPathology => self.op_has_pathology(ctx, args),
            HasNoteType => self.op_has_note_type(ctx, args),
            CdtIsAda => self.op_cdt_is_ada(ctx, args),
            CdtMaxQty => self.op_cdt_max_qty(ctx, args),
            Preauthorized => self.op_preauthorized(ctx, args),

            IsClaim => self.op_is_claim(ctx),
            IsPreauth => self.op_is_preauth(ctx),
            TransmissionMethod => self.op_transmission_method(ctx, args),
            PlaceOfService => self.op_place_of_service(ctx, args),
            PosCode => self.op_pos_code(ctx, args),
            IsOutOfNetwork => self.op_is_out_of_network(ctx),
            IsChisholm => self.op_is_chisholm(ctx),
            HasCob => self.op_has_cob(ctx, args),
            HasTpl | HasDentalTpl | HasMedicalTpl | HasNonMedicalTpl => {
                self.op_has_tpl(ctx, op, args)
            }

            Provider => self.op_provider(ctx, args),
            ProviderType => self.op_provider_type(ctx, args),
            ProviderNpi => self.op_provider_npi(ctx),
            ProviderFdhEffective => self.op_provider_fdh_effective(ctx),
            ProviderHasMedicaidId => self.op_provider_has_medicaid_id(ctx),
            PaymentHoldCode => self.op_payment_hold_code(ctx),
            AnesthesiaLevel => self.op_anesthesia_level(ctx, args),
            MaxAnesthesiaLevel => self.op_max_anesthesia_level(ctx, args),
            HasAnesthesiaCertificate => self.op_anesthesia_certificate(ctx, args, false),
            HasAnesthesiaType => self.op_anesthesia_type(ctx, args, false),
            RenderedByMdh => self.op_rendered_by_mdh(ctx, args),
            MdhProvider => self.op_mdh(ctx, args, false),
            MdhFacility => self.op_mdh(ctx, args, true),
            Fqhc => self.op_fqhc(ctx),

            Facility => self.op_facility(ctx, args),
            FacilityType => self.op_facility_type(ctx, args),
            FacilityHasTeledentistry => self.op_facility_has_teledentistry(ctx),
            FacilityAnesthesiaLevel => self.op_facility_anesthesia_level(ctx, args),
            MaxFacilityAnesthesiaLevel => self.op_max_facility_anesthesia_level(ctx, args),
            HasFacilityAnesthesiaCertificate => self.op_anesthesia_certificate(ctx, args, true),
            HasFacilityAnesthesiaType => self.op_anesthesia_type(ctx, args, true),

            Age => self.op_age(ctx, args),
            AgeAtFirstOfMonth => self.op_age_at_first_of_month(ctx, args),
            Dos | DateReceived | ExpirationDate => {
                self.eval_keyed(ctx, op, &args[0], &Default::default())
            }
            AsOfDate => self.op_as_of_date(ctx, args),
            StartOfYear => self.op_start_of_year(ctx, args),
            AnniversaryBefore | AnniversaryAfter => self.op_anniversary(ctx, op, args),
            DeductibleAnniversaryBefore | DeductibleAnniversaryAfter => {
                self.op_deductible_anniversary(ctx, op, args)
            }
            EnrollmentDays => self.op_enrollment_days(ctx, args),
            EnrollmentPeriod => self.op_enrollment_period(ctx, args),

            Plan => self.op_plan(ctx, args),
            PlanType => self.op_plan_type(ctx, args),
            RateCode => self.op_rate_code(ctx, args),
            Program => self.op_program(ctx, args),
            MemberEthnicity => self.op_member_ethnicity(ctx, args),
            FamilyCount => self.op_family_count(ctx, args),
            MembershipAttribute => self.op_membership_attribute(ctx, args),
            BenefitMax => self.op_benefit_max(ctx),
            EncounterRateApplies => self.op_encounter_rate_applies(ctx),
            IsInCaseManagement => self.op_is_in_case_management(ctx, args),
            CaseManagementType => self.op_case_management_type(ctx, args),

            Exists => self.op_exists(ctx, args),
            NotExists | NotFound => self.op_negate(ctx, Exists, args),
            ExistsAtLeast => self.op_exists_at_least(ctx, args),
            CountEntries => self.op_count_entries(ctx, args),
            Found => self.op_found(ctx, args),
            PreauthExists => self.op_preauth_exists(ctx, args),
            NotPreauthExists => self.op_negate(ctx, PreauthExists, args),
            PreauthExistsWith => self.op_preauth_exists_with(ctx, args),
            PreauthFor => self.op_preauth_for(ctx, args),

            Days | Weeks | Months | Years | ExceedsBenefitLimitWithin => {
                Err(RuleError::UnsupportedOp { op: op.name() })
            }
        }
    }

    /// Evaluate a condition with an entry bound as the subject.
    pub fn eval_condition_for_entry(
        &self,
        ctx: &mut BindingContext,
        entry: EntityRef,
        condition: &Expr,
    ) -> Result<bool, RuleError> {
        ctx.with_binding("rule:entry", RuleValue::Entity(entry), |ctx| {
            Ok(self.eval(ctx, condition)?.is_truthy())
        })
    }

    /// Evaluate a condition with an insured bound as the subject.
    pub fn eval_condition_for_insured(
        &self,
        ctx: &mut BindingContext,
        insured: EntityRef,
        condition: &Expr,
    ) -> Result<bool, RuleError> {
        let result = ctx.with_binding("rule:insured", RuleValue::Entity(insured), |ctx| {
            Ok(self.eval(ctx, condition)?.is_truthy())
        });
        ctx.clear_memo_prefix("membership_attributes:");
        result
    }

    /// Evaluate a condition with a plan membership bound as the subject.
    pub fn eval_condition_for_gpi(
        &self,
        ctx: &mut BindingContext,
        gpi: EntityRef,
        condition: &Expr,
    ) -> Result<bool, RuleError> {
        let result = ctx.with_binding("rule:gpi", RuleValue::Entity(gpi), |ctx| {
            Ok(self.eval(ctx, condition)?.is_truthy())
        });
        ctx.clear_memo_prefix("membership_attributes:");
        result
    }

    /// Run a rule against an entry: evaluate its condition and, when it
    /// holds, dispatch every action. Returns the effects to apply.
    ///
    /// Failures are wrapped with the rule label and entry id.
    pub fn eval_rule_for_entry(
        &self,
        ctx: &mut BindingContext,
        rule: &Rule,
        entry: EntityRef,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        ctx.set_rule_label(rule.label().map(String::from));
        ctx.clear_found_entries();
        let result = ctx.with_binding("rule:main", RuleValue::Entity(entry), |ctx| {
            self.run_rule(ctx, rule, entry)
        });
        ctx.clear_memo_prefix("membership_attributes:");
        ctx.set_rule_label(None);
        result.map_err(|e| e.in_context(rule.label(), Some(entry.id)))
    }

    fn run_rule(
        &self,
        ctx: &mut BindingContext,
        rule: &Rule,
        entry: EntityRef,
    ) -> Result<Vec<AdjudicationEffect>, RuleError> {
        if rule.actions().next().is_none() {
            return Err(RuleError::NoActions);
        }
        let condition_met = match rule.condition() {
            Some(condition) => self.eval_condition_for_entry(ctx, entry, condition)?,
            None => true,
        };
        let mut effects = Vec::new();
        if condition_met {
            debug!(
                "Applying rule {}: {}",
                rule.label().unwrap_or("unlabeled"),
                rule.description()
            );
            for (action, details) in rule.actions() {
                effects.extend(self.perform_action(ctx, entry, action, details)?);
            }
        }
        Ok(effects)
    }

    // Shared operand helpers

    pub(crate) fn entry_ref(
        &self,
        op: &'static str,
        value: &RuleValue,
    ) -> Result<EntityRef, RuleError> {
        match value.as_entity() {
            Some(entity) if entity.is_claim_entry() => Ok(entity),
            _ => Err(RuleError::not_an_entry(op, value.type_name())),
        }
    }

    /// Evaluate the single argument of an entry accessor and load the entry.
    pub(crate) fn entry_arg(
        &self,
        ctx: &mut BindingContext,
        op: &'static str,
        args: &[Expr],
    ) -> Result<ClaimEntry, RuleError> {
        let value = self.eval(ctx, &args[0])?;
        let entity = self.entry_ref(op, &value)?;
        Ok(self.provider.claim_entry(entity.id)?)
    }

    /// The entry bound as the rule subject.
    pub(crate) fn bound_entry(
        &self,
        ctx: &BindingContext,
        op: &'static str,
    ) -> Result<ClaimEntry, RuleError> {
        let entity = ctx
            .get_entity("rule:entry")
            .filter(EntityRef::is_claim_entry)
            .ok_or_else(|| RuleError::NoSubject {
                name: op.to_string(),
            })?;
        Ok(self.provider.claim_entry(entity.id)?)
    }

    pub(crate) fn claim_of(&self, entry: &ClaimEntry) -> Result<Claim, RuleError> {
        Ok(self.provider.claim(entry.claim_id)?)
    }

    /// Rendering provider record behind an entry's document, if any.
    pub(crate) fn provider_of(
        &self,
        entry: &ClaimEntry,
    ) -> Result<Option<ProviderRecord>, RuleError> {
        match self.claim_of(entry)?.provider_id {
            Some(id) => Ok(self.provider.provider(id)?),
            None => Ok(None),
        }
    }

    /// Service facility record behind an entry's document, if any.
    pub(crate) fn facility_of(
        &self,
        entry: &ClaimEntry,
    ) -> Result<Option<FacilityRecord>, RuleError> {
        match self.claim_of(entry)?.facility_id {
            Some(id) => Ok(self.provider.facility(id)?),
            None => Ok(None),
        }
    }

    /// Date this entry is considered as of: its date of service, then the
    /// document's receipt date, then today.
    pub(crate) fn consider_date(
        &self,
        ctx: &BindingContext,
        entry: &ClaimEntry,
    ) -> Result<NaiveDate, RuleError> {
        if let Some(dos) = entry.dos {
            return Ok(dos);
        }
        let claim = self.claim_of(entry)?;
        Ok(claim.date_received.unwrap_or_else(|| ctx.today()))
    }

    /// Resolve an evaluated subject (claim entry or insured) to its insured,
    /// plan, and effective date.
    pub(crate) fn subject_data(
        &self,
        ctx: &BindingContext,
        op: &'static str,
        value: &RuleValue,
    ) -> Result<SubjectData, RuleError> {
        match value.as_entity() {
            Some(entity) if entity.is_claim_entry() => {
                let entry = self.provider.claim_entry(entity.id)?;
                let claim = self.claim_of(&entry)?;
                let target_date = self.consider_date(ctx, &entry)?;
                let insured = self.provider.insured(claim.insured_id).ok();
                Ok(SubjectData {
                    insured,
                    group_plan_id: claim.group_plan_id,
                    target_date,
                })
            }
            Some(entity) if entity.is_insured() => Ok(SubjectData {
                insured: Some(self.provider.insured(entity.id)?),
                group_plan_id: ctx
                    .get("group_plan_id")
                    .and_then(|v| v.as_number())
                    .and_then(|n| n.to_i64()),
                target_date: ctx.today(),
            }),
            _ => Err(RuleError::NotASubject {
                op,
                found: value.type_name().to_string(),
            }),
        }
    }
}

/// Render an argument list for error messages.
pub(crate) fn render_args(args: &[Expr]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("[{}]", rendered.join(" "))
}
