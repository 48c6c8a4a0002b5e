//! Provider-side errors

use claimrules_types::EntityRef;
use thiserror::Error;

/// Errors a data provider may raise while loading domain objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The referenced object does not exist
    #[error("No such {}", entity)]
    NotFound { entity: EntityRef },

    /// A reference of the wrong kind was handed to a lookup
    #[error("Expected {expected}, got {found}")]
    WrongKind {
        expected: &'static str,
        found: EntityRef,
    },

    /// The backing store failed
    #[error("Provider backend error: {message}")]
    Backend { message: String },
}

impl ProviderError {
    pub fn not_found(entity: EntityRef) -> Self {
        ProviderError::NotFound { entity }
    }

    pub fn wrong_kind(expected: &'static str, found: EntityRef) -> Self {
        ProviderError::WrongKind { expected, found }
    }
}
