//! Opaque references into the domain data provider

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of domain object an [`EntityRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A single service line on a claim or preauthorization
    ClaimEntry,
    /// A claim or preauthorization document
    Claim,
    /// An insured person
    Insured,
    /// A plan membership record (group-plan-insured)
    PlanMembership,
}

/// Opaque handle into the domain data provider.
///
/// The evaluator never looks inside domain objects itself; it carries these
/// handles around and asks the provider for fields. Equality is identity
/// (kind + id), not structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Reference to a claim entry
    pub fn claim_entry(id: i64) -> Self {
        Self::new(EntityKind::ClaimEntry, id)
    }

    /// Reference to a claim document
    pub fn claim(id: i64) -> Self {
        Self::new(EntityKind::Claim, id)
    }

    /// Reference to an insured person
    pub fn insured(id: i64) -> Self {
        Self::new(EntityKind::Insured, id)
    }

    /// Reference to a plan membership record
    pub fn plan_membership(id: i64) -> Self {
        Self::new(EntityKind::PlanMembership, id)
    }

    pub fn is_claim_entry(&self) -> bool {
        self.kind == EntityKind::ClaimEntry
    }

    pub fn is_insured(&self) -> bool {
        self.kind == EntityKind::Insured
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::ClaimEntry => "claim_entry",
            EntityKind::Claim => "claim",
            EntityKind::Insured => "insured",
            EntityKind::PlanMembership => "plan_membership",
        };
        write!(f, "{}#{}", kind, self.id)
    }
}
