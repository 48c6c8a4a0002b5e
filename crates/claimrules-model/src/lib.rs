//! Domain records and the data-provider abstraction for claims rule
//! evaluation.
//!
//! The evaluator in `claimrules-eval` never touches a database; it sees
//! domain objects only through the [`DomainProvider`] trait defined here.
//! [`MemoryProvider`] is the hash-map-backed implementation used by tests.

pub mod error;
pub mod memory;
pub mod provider;
pub mod records;

pub use error::ProviderError;
pub use memory::MemoryProvider;
pub use provider::{CobKind, DomainProvider};
pub use records::{
    BenefitPeriod, Claim, ClaimEntry, DocumentKind, EntryStatus, FacilityRecord, Insured,
    PreauthStatus, ProviderRecord,
};
