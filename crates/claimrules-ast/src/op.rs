//! The closed operator vocabulary of the rule language
//!
//! Every operator a rule may name is listed here; anything else is rejected
//! at parse time. A handful of operators only appear as the key of a map
//! expression (`{days 45}`) and are never valid at the head of a call.

use std::fmt;

macro_rules! op_codes {
    ($($variant:ident => $name:literal $(| $alias:literal)*,)+) => {
        /// An operator name, interned.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant,)+
        }

        impl OpCode {
            /// Look up an operator by its rule-text spelling.
            pub fn from_name(name: &str) -> Option<OpCode> {
                match name {
                    $($name $(| $alias)* => Some(OpCode::$variant),)+
                    _ => None,
                }
            }

            /// Canonical spelling, as it appears in rule text.
            pub fn name(&self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)+
                }
            }
        }
    };
}

op_codes! {
    Eq => "=",
    NotEq => "not=",
    And => "and",
    Or => "or",
    Not => "not",
    Cond => "cond",
    Present => "present",
    Blank => "blank",
    Lt => "<",
    Gt => ">",
    Le => "<=",
    Ge => ">=",
    ContainsAny => "contains_any?",
    Intersects => "intersects",
    Identical => "identical",
    Same => "same",
    SameOr => "same_or",
    ExactlySame => "exactly_same",

    Cdt => "cdt" | "cpt",
    Tooth => "tooth",
    Quadrant => "quadrant",
    Area => "area",
    Arch => "arch",
    Surface => "surface",
    NumSurfaces => "num_surfaces",
    IowaTier => "iowa_tier",
    Qty => "qty",
    Billed => "billed",
    ReimbursableFee => "reimbursable_fee",
    Uncovered => "uncovered",
    Remarks => "remarks",
    RemarksOnly => "remarks_only",
    RemarksHaveDpcNo => "remarks_have_dpc_no?",
    EntryId => "entry_id",
    ClaimId => "claim_id",
    Dos => "dos",
    DateReceived => "date_received",
    ExpirationDate => "expiration_date",
    AsOfDate => "as_of_date",
    StartOfYear => "start_of_year",
    Pended => "pended",
    Approved => "approved",
    Denied => "denied",
    Mailed => "mailed",
    IsEmergency => "is_emergency",
    SysAddedEntry => "sys_added_entry",
    Preauthorized => "preauthorized",
    BehaviorManagementForm => "behavior_management_form",
    HasXrays => "has_xrays" | "has_xray",
    HasPreopXrays => "has_preop_xrays" | "has_preop_xray",
    HasPostopXrays => "has_postop_xrays" | "has_postop_xray",
    HasAnesthesiaTimeRecord => "has_anesthesia_time_record",
    HasPathology => "has_pathology",
    HasNoteType => "has_note_type?",
    CdtIsAda => "cdt_is_ada?",
    CdtMaxQty => "cdt_max_qty",

    IsClaim => "is_claim?" | "is_claim",
    IsPreauth => "is_preauth?" | "is_preauth",
    TransmissionMethod => "transmission_method",
    PlaceOfService => "place_of_service",
    PosCode => "pos_code",
    IsOutOfNetwork => "is_out_of_network?",
    IsChisholm => "is_chisholm",
    HasCob => "has_cob?",
    HasTpl => "has_tpl?",
    HasDentalTpl => "has_dental_tpl?",
    HasMedicalTpl => "has_medical_tpl?",
    HasNonMedicalTpl => "has_non_medical_tpl?",

    Provider => "provider",
    ProviderType => "provider_type",
    ProviderNpi => "provider_npi",
    ProviderFdhEffective => "provider_fdh_effective",
    ProviderHasMedicaidId => "provider_has_medicaid_id?",
    PaymentHoldCode => "payment_hold_code",
    AnesthesiaLevel => "anesthesia_level",
    MaxAnesthesiaLevel => "max_anesthesia_level",
    HasAnesthesiaCertificate => "has_anesthesia_certificate?",
    HasAnesthesiaType => "has_anesthesia_type?",
    RenderedByMdh => "rendered_by_mdh",
    MdhProvider => "mdh_provider",
    MdhFacility => "mdh_facility",
    Fqhc => "fqhc?",

    Facility => "facility",
    FacilityType => "facility_type",
    FacilityHasTeledentistry => "facility_has_teledentistry?",
    FacilityAnesthesiaLevel => "facility_anesthesia_level",
    MaxFacilityAnesthesiaLevel => "max_facility_anesthesia_level",
    HasFacilityAnesthesiaType => "has_facility_anesthesia_type?",
    HasFacilityAnesthesiaCertificate => "has_facility_anesthesia_certificate?",

    Age => "age",
    AgeAtFirstOfMonth => "age_at_first_of_month",
    AnniversaryBefore => "anniversary_before",
    AnniversaryAfter => "anniversary_after",
    DeductibleAnniversaryBefore => "deductible_anniversary_before",
    DeductibleAnniversaryAfter => "deductible_anniversary_after",
    Plan => "plan",
    PlanType => "plan_type",
    RateCode => "rate_code",
    Program => "program",
    MemberEthnicity => "member_ethnicity",
    FamilyCount => "family_count",
    EnrollmentDays => "enrollment_days",
    EnrollmentPeriod => "enrollment_period",
    MembershipAttribute => "membership_attribute",
    BenefitMax => "benefit_max",
    EncounterRateApplies => "encounter_rate_applies",
    IsInCaseManagement => "is_in_case_management?",
    CaseManagementType => "case_management_type",

    Exists => "exists",
    NotExists => "not_exists",
    ExistsAtLeast => "exists_at_least",
    CountEntries => "count_entries",
    Found => "found",
    NotFound => "not_found",
    PreauthExists => "preauth_exists",
    NotPreauthExists => "not_preauth_exists",
    PreauthExistsWith => "preauth_exists_with",
    PreauthFor => "preauth_for",

    Days => "days",
    Weeks => "weeks",
    Months => "months",
    Years => "years",
    ExceedsBenefitLimitWithin => "exceeds_benefit_limit_within",
}

/// Argument-count contract for call-position operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Any number of arguments, including none
    Any,
    /// Exactly this many
    Exact(usize),
    /// This many or more
    AtLeast(usize),
    /// Inclusive range
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Any => true,
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Arity::Any => f.write_str("any number of args"),
            Arity::Exact(1) => f.write_str("exactly one arg"),
            Arity::Exact(n) => write!(f, "exactly {} args", n),
            Arity::AtLeast(1) => f.write_str("at least one arg"),
            Arity::AtLeast(n) => write!(f, "at least {} args", n),
            Arity::Between(lo, hi) => write!(f, "between {} and {} args", lo, hi),
        }
    }
}

/// Keyword-argument contract for map-position operators.
#[derive(Debug, Clone, Copy)]
pub struct KwargSpec {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

/// Lookup order for the operator key of a map expression. When a map names
/// more than one keyed operator, the first in this order wins.
pub const KEYED_OPS: &[OpCode] = &[
    OpCode::Days,
    OpCode::EntryId,
    OpCode::Weeks,
    OpCode::Months,
    OpCode::Years,
    OpCode::ExpirationDate,
    OpCode::Dos,
    OpCode::DateReceived,
    OpCode::ExceedsBenefitLimitWithin,
];

impl OpCode {
    /// Operators that are only meaningful as the key of a map expression.
    pub fn is_keyed_only(&self) -> bool {
        matches!(
            self,
            OpCode::Days | OpCode::Weeks | OpCode::Years | OpCode::ExceedsBenefitLimitWithin
        )
    }

    /// Keyword-argument contract when this operator keys a map expression.
    pub fn kwargs(&self) -> Option<KwargSpec> {
        const NONE: KwargSpec = KwargSpec {
            required: &[],
            optional: &[],
        };
        match self {
            OpCode::Days
            | OpCode::Weeks
            | OpCode::Months
            | OpCode::Years
            | OpCode::EntryId
            | OpCode::ExpirationDate => Some(NONE),
            OpCode::Dos | OpCode::DateReceived => Some(KwargSpec {
                required: &[],
                optional: &["+", "-"],
            }),
            OpCode::ExceedsBenefitLimitWithin => Some(KwargSpec {
                required: &["of"],
                optional: &["qty"],
            }),
            _ => None,
        }
    }

    /// Argument-count contract in call position. Enforced by the evaluator
    /// before dispatch.
    pub fn arity(&self) -> Arity {
        match self {
            // Variadic or self-validating forms
            OpCode::Eq
            | OpCode::NotEq
            | OpCode::And
            | OpCode::Or
            | OpCode::Cond
            | OpCode::Intersects
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::Le
            | OpCode::Ge => Arity::Any,

            // Operators that read the bound entry and ignore arguments
            OpCode::IsClaim
            | OpCode::IsPreauth
            | OpCode::SysAddedEntry
            | OpCode::IsOutOfNetwork
            | OpCode::IsChisholm
            | OpCode::PaymentHoldCode => Arity::Any,

            // Never valid in call position; dispatch rejects them
            OpCode::Days
            | OpCode::Weeks
            | OpCode::Months
            | OpCode::Years
            | OpCode::ExceedsBenefitLimitWithin => Arity::Any,

            OpCode::Present
            | OpCode::Blank
            | OpCode::Same
            | OpCode::SameOr
            | OpCode::ExactlySame
            | OpCode::Identical => Arity::AtLeast(1),

            OpCode::ContainsAny => Arity::AtLeast(2),

            OpCode::Found | OpCode::ExistsAtLeast => Arity::Exact(2),

            OpCode::AnniversaryBefore
            | OpCode::AnniversaryAfter
            | OpCode::DeductibleAnniversaryBefore
            | OpCode::DeductibleAnniversaryAfter
            | OpCode::AgeAtFirstOfMonth
            | OpCode::MembershipAttribute
            | OpCode::EnrollmentDays => Arity::Between(1, 2),

            _ => Arity::Exact(1),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_one_operator() {
        assert_eq!(OpCode::from_name("cpt"), Some(OpCode::Cdt));
        assert_eq!(OpCode::from_name("cdt"), Some(OpCode::Cdt));
        assert_eq!(OpCode::from_name("is_claim"), Some(OpCode::IsClaim));
        assert_eq!(OpCode::from_name("is_claim?"), Some(OpCode::IsClaim));
        assert_eq!(OpCode::from_name("has_xray"), Some(OpCode::HasXrays));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(OpCode::from_name("frobnicate"), None);
        assert_eq!(OpCode::from_name(""), None);
    }

    #[test]
    fn keyed_only_ops_are_flagged() {
        assert!(OpCode::Days.is_keyed_only());
        assert!(OpCode::Years.is_keyed_only());
        assert!(!OpCode::Months.is_keyed_only());
        assert!(!OpCode::Dos.is_keyed_only());
    }

    #[test]
    fn arity_contracts() {
        assert!(OpCode::Eq.arity().accepts(0));
        assert!(OpCode::Eq.arity().accepts(5));
        assert!(!OpCode::Not.arity().accepts(2));
        assert!(OpCode::Not.arity().accepts(1));
        assert!(OpCode::Found.arity().accepts(2));
        assert!(!OpCode::Found.arity().accepts(1));
        assert!(OpCode::AnniversaryBefore.arity().accepts(1));
        assert!(OpCode::AnniversaryBefore.arity().accepts(2));
        assert!(!OpCode::AnniversaryBefore.arity().accepts(3));
    }

    #[test]
    fn kwarg_specs() {
        let spec = OpCode::ExceedsBenefitLimitWithin.kwargs().unwrap();
        assert_eq!(spec.required, &["of"]);
        assert_eq!(spec.optional, &["qty"]);
        assert!(OpCode::Age.kwargs().is_none());
    }
}
