//! In-memory provider for tests and rule authoring tools

use crate::error::ProviderError;
use crate::provider::{CobKind, DomainProvider};
use crate::records::{
    BenefitPeriod, Claim, ClaimEntry, FacilityRecord, Insured, PreauthStatus, ProviderRecord,
};
use chrono::NaiveDate;
use claimrules_types::EntityRef;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// A [`DomainProvider`] backed by hash maps. Documents are returned in
/// insertion order, which doubles as the adjudication order in tests.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    entries: HashMap<i64, ClaimEntry>,
    claims: HashMap<i64, Claim>,
    insureds: HashMap<i64, Insured>,
    providers: HashMap<i64, ProviderRecord>,
    facilities: HashMap<i64, FacilityRecord>,
    claim_order: HashMap<i64, Vec<i64>>,
    preauth_order: HashMap<i64, Vec<i64>>,
    entry_order: HashMap<i64, Vec<i64>>,
    fees: HashMap<i64, Decimal>,
    exemptions: HashSet<(i64, i64)>,
    preauth_status: HashMap<i64, PreauthStatus>,
    preauth_links: HashMap<i64, (i64, i64)>,
    benefit_periods: HashMap<i64, BenefitPeriod>,
    deductible_periods: HashMap<i64, BenefitPeriod>,
    benefit_maxes: HashMap<i64, Decimal>,
    membership_attrs: HashMap<i64, HashMap<String, String>>,
    plan_types: HashMap<i64, String>,
    benefit_tiers: HashMap<i64, String>,
    cob: HashMap<i64, Vec<CobKind>>,
    enrollment_days: HashMap<i64, i64>,
    family: HashMap<i64, Vec<i64>>,
    ada_codes: HashSet<String>,
    max_qtys: HashMap<String, i64>,
    note_types: HashMap<i64, Vec<String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_insured(&mut self, insured: Insured) -> &mut Self {
        self.insureds.insert(insured.id, insured);
        self
    }

    /// Register a document and its entries. History order follows insertion.
    pub fn add_claim(&mut self, claim: Claim, entries: Vec<ClaimEntry>) -> &mut Self {
        let order = if claim.is_preauth() {
            &mut self.preauth_order
        } else {
            &mut self.claim_order
        };
        order.entry(claim.insured_id).or_default().push(claim.id);
        let ids = self.entry_order.entry(claim.id).or_default();
        for entry in entries {
            ids.push(entry.id);
            self.entries.insert(entry.id, entry);
        }
        self.claims.insert(claim.id, claim);
        self
    }

    pub fn add_provider(&mut self, provider: ProviderRecord) -> &mut Self {
        self.providers.insert(provider.id, provider);
        self
    }

    pub fn add_facility(&mut self, facility: FacilityRecord) -> &mut Self {
        self.facilities.insert(facility.id, facility);
        self
    }

    pub fn set_fee(&mut self, entry_id: i64, amount: Decimal) -> &mut Self {
        self.fees.insert(entry_id, amount);
        self
    }

    pub fn exempt(&mut self, entry_id: i64, carc: i64) -> &mut Self {
        self.exemptions.insert((entry_id, carc));
        self
    }

    pub fn set_preauth_status(&mut self, entry_id: i64, status: PreauthStatus) -> &mut Self {
        self.preauth_status.insert(entry_id, status);
        self
    }

    pub fn link_preauth(&mut self, entry_id: i64, preauth_id: i64, preauth_entry_id: i64) -> &mut Self {
        self.preauth_links.insert(entry_id, (preauth_id, preauth_entry_id));
        self
    }

    pub fn set_benefit_period(&mut self, claim_id: i64, period: BenefitPeriod) -> &mut Self {
        self.benefit_periods.insert(claim_id, period);
        self
    }

    pub fn set_deductible_period(&mut self, insured_id: i64, period: BenefitPeriod) -> &mut Self {
        self.deductible_periods.insert(insured_id, period);
        self
    }

    pub fn set_benefit_max(&mut self, claim_id: i64, max: Decimal) -> &mut Self {
        self.benefit_maxes.insert(claim_id, max);
        self
    }

    pub fn set_membership_attribute(
        &mut self,
        insured_id: i64,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.membership_attrs
            .entry(insured_id)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn set_plan_type(&mut self, group_plan_id: i64, plan_type: impl Into<String>) -> &mut Self {
        self.plan_types.insert(group_plan_id, plan_type.into());
        self
    }

    pub fn set_benefit_tier(&mut self, insured_id: i64, tier: impl Into<String>) -> &mut Self {
        self.benefit_tiers.insert(insured_id, tier.into());
        self
    }

    pub fn add_cob(&mut self, insured_id: i64, kind: CobKind) -> &mut Self {
        self.cob.entry(insured_id).or_default().push(kind);
        self
    }

    pub fn set_enrollment_days(&mut self, insured_id: i64, days: i64) -> &mut Self {
        self.enrollment_days.insert(insured_id, days);
        self
    }

    pub fn set_family(&mut self, insured_id: i64, members: Vec<i64>) -> &mut Self {
        self.family.insert(insured_id, members);
        self
    }

    pub fn add_ada_code(&mut self, code: impl Into<String>) -> &mut Self {
        self.ada_codes.insert(code.into());
        self
    }

    pub fn set_max_qty(&mut self, code: impl Into<String>, qty: i64) -> &mut Self {
        self.max_qtys.insert(code.into(), qty);
        self
    }

    pub fn add_note_type(&mut self, claim_id: i64, note_type: impl Into<String>) -> &mut Self {
        self.note_types.entry(claim_id).or_default().push(note_type.into());
        self
    }

    fn history(&self, order: &HashMap<i64, Vec<i64>>, insured_id: i64) -> Vec<Claim> {
        order
            .get(&insured_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.claims.get(id).cloned())
            .collect()
    }
}

impl DomainProvider for MemoryProvider {
    fn claim_entry(&self, id: i64) -> Result<ClaimEntry, ProviderError> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(EntityRef::claim_entry(id)))
    }

    fn claim(&self, id: i64) -> Result<Claim, ProviderError> {
        self.claims
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(EntityRef::claim(id)))
    }

    fn insured(&self, id: i64) -> Result<Insured, ProviderError> {
        self.insureds
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(EntityRef::insured(id)))
    }

    fn entries_sorted(&self, claim_id: i64) -> Result<Vec<ClaimEntry>, ProviderError> {
        Ok(self
            .entry_order
            .get(&claim_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect())
    }

    fn claim_history(&self, insured_id: i64) -> Result<Vec<Claim>, ProviderError> {
        Ok(self.history(&self.claim_order, insured_id))
    }

    fn preauth_history(&self, insured_id: i64) -> Result<Vec<Claim>, ProviderError> {
        Ok(self.history(&self.preauth_order, insured_id))
    }

    fn provider(&self, id: i64) -> Result<Option<ProviderRecord>, ProviderError> {
        Ok(self.providers.get(&id).cloned())
    }

    fn facility(&self, id: i64) -> Result<Option<FacilityRecord>, ProviderError> {
        Ok(self.facilities.get(&id).cloned())
    }

    fn reimbursable_fee(&self, entry_id: i64) -> Result<Option<Decimal>, ProviderError> {
        Ok(self.fees.get(&entry_id).copied())
    }

    fn exempt_from_carc(&self, entry_id: i64, carc: i64) -> Result<bool, ProviderError> {
        Ok(self.exemptions.contains(&(entry_id, carc)))
    }

    fn preauthorization_status(
        &self,
        entry_id: i64,
    ) -> Result<Option<PreauthStatus>, ProviderError> {
        Ok(self.preauth_status.get(&entry_id).copied())
    }

    fn preauth_for_entry(&self, entry_id: i64) -> Result<Option<(i64, i64)>, ProviderError> {
        Ok(self.preauth_links.get(&entry_id).copied())
    }

    fn plan_benefit_period(
        &self,
        claim_id: i64,
        _dos: NaiveDate,
    ) -> Result<Option<BenefitPeriod>, ProviderError> {
        Ok(self.benefit_periods.get(&claim_id).copied())
    }

    fn deductible_benefit_period(
        &self,
        insured_id: i64,
        _group_plan_id: Option<i64>,
        _dos: NaiveDate,
    ) -> Result<Option<BenefitPeriod>, ProviderError> {
        Ok(self.deductible_periods.get(&insured_id).copied())
    }

    fn plan_benefit_max(&self, claim_id: i64) -> Result<Option<Decimal>, ProviderError> {
        Ok(self.benefit_maxes.get(&claim_id).copied())
    }

    fn plan_type(&self, group_plan_id: i64) -> Result<Option<String>, ProviderError> {
        Ok(self.plan_types.get(&group_plan_id).cloned())
    }

    fn membership_attributes(
        &self,
        insured_id: i64,
        _group_plan_id: Option<i64>,
        _as_of: NaiveDate,
    ) -> Result<HashMap<String, String>, ProviderError> {
        Ok(self
            .membership_attrs
            .get(&insured_id)
            .cloned()
            .unwrap_or_default())
    }

    fn family_members(
        &self,
        insured_id: i64,
        _as_of: NaiveDate,
    ) -> Result<Vec<i64>, ProviderError> {
        Ok(self.family.get(&insured_id).cloned().unwrap_or_default())
    }

    fn benefit_tier(
        &self,
        insured_id: i64,
        _as_of: NaiveDate,
    ) -> Result<Option<String>, ProviderError> {
        Ok(self.benefit_tiers.get(&insured_id).cloned())
    }

    fn insured_has_cob(
        &self,
        insured_id: i64,
        kind: CobKind,
        _dos: Option<NaiveDate>,
    ) -> Result<bool, ProviderError> {
        let kinds = self.cob.get(&insured_id);
        Ok(match kind {
            CobKind::Any => kinds.is_some_and(|k| !k.is_empty()),
            other => kinds.is_some_and(|k| k.contains(&other)),
        })
    }

    fn continuous_enrollment_days(
        &self,
        insured_id: i64,
        _backdays: i64,
        _as_of: NaiveDate,
    ) -> Result<i64, ProviderError> {
        Ok(self.enrollment_days.get(&insured_id).copied().unwrap_or(0))
    }

    fn claim_has_note_type(
        &self,
        claim_id: i64,
        note_types: &str,
    ) -> Result<bool, ProviderError> {
        let Some(present) = self.note_types.get(&claim_id) else {
            return Ok(false);
        };
        Ok(note_types
            .split(',')
            .any(|wanted| present.iter().any(|t| t == wanted.trim())))
    }

    fn cdt_is_ada(&self, code: &str) -> Result<bool, ProviderError> {
        Ok(self.ada_codes.contains(code))
    }

    fn cdt_max_qty(&self, code: &str) -> Result<Option<i64>, ProviderError> {
        Ok(self.max_qtys.get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DocumentKind;

    #[test]
    fn history_preserves_insertion_order() {
        let mut p = MemoryProvider::new();
        for id in [10, 11, 12] {
            p.add_claim(
                Claim {
                    id,
                    insured_id: 1,
                    ..Claim::default()
                },
                vec![ClaimEntry {
                    id: id * 100,
                    claim_id: id,
                    ..ClaimEntry::default()
                }],
            );
        }
        let history = p.claim_history(1).unwrap();
        assert_eq!(history.iter().map(|c| c.id).collect::<Vec<_>>(), [10, 11, 12]);
        assert_eq!(p.entries_sorted(11).unwrap()[0].id, 1100);
    }

    #[test]
    fn preauths_are_kept_apart_from_claims() {
        let mut p = MemoryProvider::new();
        p.add_claim(
            Claim {
                id: 1,
                insured_id: 7,
                kind: DocumentKind::Preauth,
                ..Claim::default()
            },
            vec![],
        );
        assert!(p.claim_history(7).unwrap().is_empty());
        assert_eq!(p.preauth_history(7).unwrap().len(), 1);
    }

    #[test]
    fn missing_lookups_are_not_found() {
        let p = MemoryProvider::new();
        assert!(matches!(
            p.claim_entry(42),
            Err(ProviderError::NotFound { .. })
        ));
    }
}
