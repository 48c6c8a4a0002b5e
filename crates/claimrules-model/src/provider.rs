//! The data-provider seam between the evaluator and the claims store
//!
//! Rule evaluation is pure with respect to domain data: every lookup goes
//! through [`DomainProvider`]. Production backs this with the claims
//! database; tests use [`crate::MemoryProvider`]. Methods with defaults
//! return an empty answer so providers only implement what their plans use.

use crate::error::ProviderError;
use crate::records::{
    BenefitPeriod, Claim, ClaimEntry, FacilityRecord, Insured, PreauthStatus, ProviderRecord,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Which coordination-of-benefits coverage a lookup asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CobKind {
    Any,
    Dental,
    Medical,
    NonMedical,
}

/// Read access to the domain objects rules evaluate against.
pub trait DomainProvider {
    fn claim_entry(&self, id: i64) -> Result<ClaimEntry, ProviderError>;

    fn claim(&self, id: i64) -> Result<Claim, ProviderError>;

    fn insured(&self, id: i64) -> Result<Insured, ProviderError>;

    /// Entries of a document in stable adjudication order.
    fn entries_sorted(&self, claim_id: i64) -> Result<Vec<ClaimEntry>, ProviderError>;

    /// All claim documents for an insured, the document under adjudication
    /// included.
    fn claim_history(&self, insured_id: i64) -> Result<Vec<Claim>, ProviderError>;

    /// All preauthorization documents for an insured.
    fn preauth_history(&self, insured_id: i64) -> Result<Vec<Claim>, ProviderError>;

    fn provider(&self, id: i64) -> Result<Option<ProviderRecord>, ProviderError> {
        let _ = id;
        Ok(None)
    }

    fn facility(&self, id: i64) -> Result<Option<FacilityRecord>, ProviderError> {
        let _ = id;
        Ok(None)
    }

    /// Whether a provider carries a medicaid id through its link to this
    /// facility as of the given date. Fallback when the provider record
    /// itself has none.
    fn provider_facility_medicaid_link(
        &self,
        provider_id: i64,
        facility_id: i64,
        as_of: NaiveDate,
    ) -> Result<bool, ProviderError> {
        let _ = (provider_id, facility_id, as_of);
        Ok(false)
    }

    /// Contracted fee for an entry; `None` means the procedure is uncovered.
    fn reimbursable_fee(&self, entry_id: i64) -> Result<Option<Decimal>, ProviderError> {
        let _ = entry_id;
        Ok(None)
    }

    /// Whether this entry is exempt from denial under the given CARC.
    fn exempt_from_carc(&self, entry_id: i64, carc: i64) -> Result<bool, ProviderError> {
        let _ = (entry_id, carc);
        Ok(false)
    }

    /// Status of the preauthorization matched to this entry, if any.
    fn preauthorization_status(
        &self,
        entry_id: i64,
    ) -> Result<Option<PreauthStatus>, ProviderError> {
        let _ = entry_id;
        Ok(None)
    }

    /// The preauthorization document and entry matched to this claim entry.
    fn preauth_for_entry(&self, entry_id: i64) -> Result<Option<(i64, i64)>, ProviderError> {
        let _ = entry_id;
        Ok(None)
    }

    /// Plan benefit period covering a date of service.
    fn plan_benefit_period(
        &self,
        claim_id: i64,
        dos: NaiveDate,
    ) -> Result<Option<BenefitPeriod>, ProviderError> {
        let _ = (claim_id, dos);
        Ok(None)
    }

    /// Deductible accumulation period for an insured under a plan.
    fn deductible_benefit_period(
        &self,
        insured_id: i64,
        group_plan_id: Option<i64>,
        dos: NaiveDate,
    ) -> Result<Option<BenefitPeriod>, ProviderError> {
        let _ = (insured_id, group_plan_id, dos);
        Ok(None)
    }

    fn plan_benefit_max(&self, claim_id: i64) -> Result<Option<Decimal>, ProviderError> {
        let _ = claim_id;
        Ok(None)
    }

    fn plan_type(&self, group_plan_id: i64) -> Result<Option<String>, ProviderError> {
        let _ = group_plan_id;
        Ok(None)
    }

    /// Membership attributes (rate code and friends) effective on a date.
    fn membership_attributes(
        &self,
        insured_id: i64,
        group_plan_id: Option<i64>,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, String>, ProviderError> {
        let _ = (insured_id, group_plan_id, as_of);
        Ok(HashMap::new())
    }

    /// Insureds related to this one with effective relationships on a date.
    fn family_members(
        &self,
        insured_id: i64,
        as_of: NaiveDate,
    ) -> Result<Vec<i64>, ProviderError> {
        let _ = (insured_id, as_of);
        Ok(Vec::new())
    }

    fn benefit_tier(
        &self,
        insured_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<String>, ProviderError> {
        let _ = (insured_id, as_of);
        Ok(None)
    }

    fn insured_has_cob(
        &self,
        insured_id: i64,
        kind: CobKind,
        dos: Option<NaiveDate>,
    ) -> Result<bool, ProviderError> {
        let _ = (insured_id, kind, dos);
        Ok(false)
    }

    /// Continuous enrollment days looking back from a date.
    fn continuous_enrollment_days(
        &self,
        insured_id: i64,
        backdays: i64,
        as_of: NaiveDate,
    ) -> Result<i64, ProviderError> {
        let _ = (insured_id, backdays, as_of);
        Ok(0)
    }

    fn claim_has_note_type(
        &self,
        claim_id: i64,
        note_types: &str,
    ) -> Result<bool, ProviderError> {
        let _ = (claim_id, note_types);
        Ok(false)
    }

    /// Assigned dental-home provider for an insured as of a date.
    fn ifa_provider(
        &self,
        insured_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<i64>, ProviderError> {
        let _ = (insured_id, as_of);
        Ok(None)
    }

    /// Assigned dental-home facility for an insured as of a date.
    fn ifa_facility(
        &self,
        insured_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<i64>, ProviderError> {
        let _ = (insured_id, as_of);
        Ok(None)
    }

    fn max_anesthesia_level(
        &self,
        provider_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<i32>, ProviderError> {
        let _ = (provider_id, as_of);
        Ok(None)
    }

    fn max_facility_anesthesia_level(
        &self,
        facility_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<i32>, ProviderError> {
        let _ = (facility_id, as_of);
        Ok(None)
    }

    fn provider_has_anesthesia_certificate(
        &self,
        provider_id: i64,
        certificates: &[&str],
        as_of: NaiveDate,
    ) -> Result<bool, ProviderError> {
        let _ = (provider_id, certificates, as_of);
        Ok(false)
    }

    fn provider_has_anesthesia_type(
        &self,
        provider_id: i64,
        types: &[&str],
        as_of: NaiveDate,
    ) -> Result<bool, ProviderError> {
        let _ = (provider_id, types, as_of);
        Ok(false)
    }

    fn facility_has_anesthesia_certificate(
        &self,
        facility_id: i64,
        certificates: &[&str],
        as_of: NaiveDate,
    ) -> Result<bool, ProviderError> {
        let _ = (facility_id, certificates, as_of);
        Ok(false)
    }

    fn facility_has_anesthesia_type(
        &self,
        facility_id: i64,
        types: &[&str],
        as_of: NaiveDate,
    ) -> Result<bool, ProviderError> {
        let _ = (facility_id, types, as_of);
        Ok(false)
    }

    /// Whether a procedure code is in the ADA catalog.
    fn cdt_is_ada(&self, code: &str) -> Result<bool, ProviderError> {
        let _ = code;
        Ok(false)
    }

    /// Per-procedure quantity cap from the code catalog.
    fn cdt_max_qty(&self, code: &str) -> Result<Option<i64>, ProviderError> {
        let _ = code;
        Ok(None)
    }
}
