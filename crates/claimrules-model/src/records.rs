//! Plain domain records as the evaluator sees them
//!
//! These are snapshots handed out by a [`crate::DomainProvider`]; the
//! evaluator never mutates them. Adjudication outcomes are expressed as
//! effects for the caller to apply.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Adjudication status of a claim entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Unprocessed,
    Pended,
    Approved,
    Denied,
}

impl EntryStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, EntryStatus::Approved)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, EntryStatus::Denied)
    }

    pub fn is_pended(&self) -> bool {
        matches!(self, EntryStatus::Pended)
    }

    pub fn is_unprocessed(&self) -> bool {
        matches!(self, EntryStatus::Unprocessed)
    }
}

/// One service line on a claim or preauthorization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub id: i64,
    pub claim_id: i64,
    /// Procedure code (CDT/CPT)
    pub cpt_code: Option<String>,
    /// Date of service
    pub dos: Option<NaiveDate>,
    pub tooth_ids: Vec<String>,
    pub surface_ids: Vec<String>,
    pub status: EntryStatus,
    pub qty: Option<i64>,
    /// Billed amount
    pub amount_claim: Decimal,
    /// Free-text narrative attached to the line
    pub remarks: Option<String>,
    pub carcs: Vec<i64>,
    pub voided: bool,
    pub added_by_system: bool,
    pub has_radiograph: bool,
    pub has_anesthesia_record: bool,
    pub has_pathology: bool,
    pub behavior_management_form: bool,
    /// FQHC/IHS-style encounter line reimbursed at a medicaid rate
    pub medicaid_reimbursable: bool,
    pub rendered_by_mdh: bool,
}

impl ClaimEntry {
    /// The date this entry is considered as of: its date of service, falling
    /// back to nothing when the line carries no date.
    pub fn consider_date(&self) -> Option<NaiveDate> {
        self.dos
    }
}

/// Whether a document is a payable claim or a preauthorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    #[default]
    Claim,
    Preauth,
}

/// A claim or preauthorization document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub kind: DocumentKind,
    pub insured_id: i64,
    pub group_plan_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub facility_id: Option<i64>,
    pub program_id: Option<i64>,
    pub date_received: Option<NaiveDate>,
    /// Preauthorization expiry
    pub expiration_date: Option<NaiveDate>,
    pub place_of_service: Option<String>,
    pub pos_code: Option<String>,
    pub transmission_method: Option<String>,
    pub emergency: bool,
    pub mailed: bool,
    pub voided: bool,
    pub out_of_network: bool,
    pub has_cob: bool,
    pub encounter_rate_applies: bool,
    pub paid_eob: bool,
}

impl Claim {
    pub fn is_claim(&self) -> bool {
        self.kind == DocumentKind::Claim
    }

    pub fn is_preauth(&self) -> bool {
        self.kind == DocumentKind::Preauth
    }
}

/// An insured person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insured {
    pub id: i64,
    pub birth_date: Option<NaiveDate>,
    pub ethnicity: Option<String>,
    pub in_case_management: bool,
    pub case_management_types: Vec<String>,
}

impl Insured {
    /// Whole years of age as of `date`, birthday-aware.
    pub fn age_in_years(&self, date: NaiveDate) -> Option<i64> {
        use chrono::Datelike;
        let birth = self.birth_date?;
        let mut age = i64::from(date.year() - birth.year());
        if (date.month(), date.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }
}

/// A rendering provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: i64,
    pub npi: Option<String>,
    pub medicaid_id: Option<String>,
    pub fdh_effective: Option<NaiveDate>,
    pub provider_type: Option<String>,
    /// Single-character level, compared as text against "1", "2", ...
    pub anesthesia_level: Option<String>,
    pub payment_hold_code: Option<String>,
}

/// A service facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: i64,
    pub facility_type: Option<String>,
    pub has_teledentistry: bool,
    pub anesthesia_level: Option<String>,
}

/// Outcome of a preauthorization lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreauthStatus {
    Approved,
    Denied,
    Pending,
}

/// A benefit period: inclusive start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitPeriod {
    pub from: NaiveDate,
    pub thru: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_respects_birthday() {
        let insured = Insured {
            birth_date: Some(date(2000, 6, 15)),
            ..Insured::default()
        };
        assert_eq!(insured.age_in_years(date(2024, 6, 14)), Some(23));
        assert_eq!(insured.age_in_years(date(2024, 6, 15)), Some(24));
        assert_eq!(Insured::default().age_in_years(date(2024, 1, 1)), None);
    }

    #[test]
    fn status_predicates() {
        assert!(EntryStatus::Approved.is_approved());
        assert!(!EntryStatus::Denied.is_approved());
        assert!(EntryStatus::Unprocessed.is_unprocessed());
    }
}
