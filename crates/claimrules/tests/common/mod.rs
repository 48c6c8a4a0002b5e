//! Shared fixture: an insured with a current claim and some history.

use chrono::NaiveDate;
use claimrules::model::{
    Claim, ClaimEntry, DocumentKind, EntryStatus, FacilityRecord, Insured, MemoryProvider,
    ProviderRecord,
};
use claimrules::{BindingContext, RuleEngine};
use rust_decimal::Decimal;

pub const INSURED: i64 = 1;
pub const CLAIM: i64 = 100;
pub const ENTRY: i64 = 1001;
pub const SIBLING_ENTRY: i64 = 1002;
pub const HISTORY_CLAIM: i64 = 90;
pub const HISTORY_ENTRY: i64 = 901;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ctx() -> BindingContext {
    BindingContext::new(date(2024, 6, 1))
}

/// An insured born mid-2000 with one prior claim (an approved 0120 exam in
/// November 2023) and a current two-line claim received 2024-03-10 with
/// service date 2024-03-01.
pub fn provider() -> MemoryProvider {
    let mut p = MemoryProvider::new();
    p.add_insured(Insured {
        id: INSURED,
        birth_date: Some(date(2000, 6, 15)),
        ethnicity: Some("2106-3".to_string()),
        ..Insured::default()
    });
    p.add_provider(ProviderRecord {
        id: 50,
        npi: Some("1234567890".to_string()),
        provider_type: Some("Dentist".to_string()),
        anesthesia_level: Some("2".to_string()),
        ..ProviderRecord::default()
    });
    p.add_facility(FacilityRecord {
        id: 60,
        facility_type: Some("Clinic".to_string()),
        has_teledentistry: true,
        ..FacilityRecord::default()
    });
    p.add_claim(
        Claim {
            id: HISTORY_CLAIM,
            insured_id: INSURED,
            group_plan_id: Some(5),
            date_received: Some(date(2023, 11, 10)),
            ..Claim::default()
        },
        vec![ClaimEntry {
            id: HISTORY_ENTRY,
            claim_id: HISTORY_CLAIM,
            cpt_code: Some("0120".to_string()),
            dos: Some(date(2023, 11, 5)),
            status: EntryStatus::Approved,
            ..ClaimEntry::default()
        }],
    );
    p.add_claim(
        Claim {
            id: CLAIM,
            insured_id: INSURED,
            group_plan_id: Some(5),
            provider_id: Some(50),
            facility_id: Some(60),
            date_received: Some(date(2024, 3, 10)),
            kind: DocumentKind::Claim,
            ..Claim::default()
        },
        vec![
            ClaimEntry {
                id: ENTRY,
                claim_id: CLAIM,
                cpt_code: Some("0120".to_string()),
                dos: Some(date(2024, 3, 1)),
                tooth_ids: vec!["03".to_string(), "12".to_string()],
                surface_ids: vec!["M".to_string(), "O".to_string()],
                amount_claim: Decimal::new(12500, 2),
                ..ClaimEntry::default()
            },
            ClaimEntry {
                id: SIBLING_ENTRY,
                claim_id: CLAIM,
                cpt_code: Some("0150".to_string()),
                dos: Some(date(2024, 3, 1)),
                ..ClaimEntry::default()
            },
        ],
    );
    p.set_fee(ENTRY, Decimal::new(8000, 2));
    p
}

pub fn engine() -> RuleEngine<MemoryProvider> {
    RuleEngine::new(provider())
}
