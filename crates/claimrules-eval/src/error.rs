//! Evaluation errors
//!
//! Errors raised during rule evaluation are fatal for the rule at hand. At
//! the rule boundary they are wrapped with the rule label and the entry under
//! adjudication, mirroring how adjudication failures get reported upstream.

use claimrules_ast::{Arity, ExprError};
use claimrules_model::ProviderError;
use claimrules_types::SetParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ExprError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    SetParse(#[from] SetParseError),

    /// Wrong number of arguments to an operator
    #[error("{op} requires {expected}: {found}")]
    Arity {
        op: &'static str,
        expected: Arity,
        found: String,
    },

    /// Operator is in the vocabulary but has no call-position handler
    #[error("Unsupported op: {op}")]
    UnsupportedOp { op: &'static str },

    /// An operator needed a claim entry and got something else
    #[error("{op} arg must be claim entry, found {found}")]
    NotAnEntry { op: &'static str, found: String },

    /// An operator needed a claim entry or insured and got something else
    #[error("{op} arg must be claim entry or insured, found {found}")]
    NotASubject { op: &'static str, found: String },

    /// `not` over a non-boolean
    #[error("{op} needs boolean arg, got {found}")]
    NotABoolean { op: &'static str, found: String },

    /// A chained comparison saw a null operand
    #[error("Comparison {op} does not make sense with nil values in parameters: {args}")]
    NullComparison { op: &'static str, args: String },

    /// Operands of incompatible types in a comparison
    #[error("Cannot compare {lhs} with {rhs} using {op}")]
    Incomparable {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    /// A wrong-typed operand outside comparisons
    #[error("{op} expects {expected}, got {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    /// Bare operator name used with no entry, insured or plan bound
    #[error("{name} with unavailable default argument")]
    NoSubject { name: String },

    /// A rule document with no action entries
    #[error("Rule must specify actions")]
    NoActions,

    #[error("Unsupported action {action} with details {details}")]
    UnsupportedAction { action: String, details: String },

    #[error("Action {action} requires {key}: {details}")]
    MissingActionKey {
        action: String,
        key: &'static str,
        details: String,
    },

    #[error("Action {action} received unexpected keys {keys}: {details}")]
    UnexpectedActionKeys {
        action: String,
        keys: String,
        details: String,
    },

    /// Rule-boundary wrapper carrying the rule label and entry id
    #[error("[Rule: {rule} | Entry: {entry}] {source}")]
    Contextual {
        rule: String,
        entry: String,
        #[source]
        source: Box<RuleError>,
    },
}

impl RuleError {
    pub fn arity(op: &'static str, expected: Arity, args: impl std::fmt::Display) -> Self {
        RuleError::Arity {
            op,
            expected,
            found: args.to_string(),
        }
    }

    pub fn not_an_entry(op: &'static str, found: impl std::fmt::Display) -> Self {
        RuleError::NotAnEntry {
            op,
            found: found.to_string(),
        }
    }

    pub fn type_mismatch(
        op: &'static str,
        expected: &'static str,
        found: impl std::fmt::Display,
    ) -> Self {
        RuleError::TypeMismatch {
            op,
            expected,
            found: found.to_string(),
        }
    }

    /// Attach the rule and entry identity a failure occurred under.
    pub fn in_context(self, rule: Option<&str>, entry: Option<i64>) -> Self {
        RuleError::Contextual {
            rule: rule.unwrap_or("no rule").to_string(),
            entry: entry.map_or_else(|| "no entry".to_string(), |id| id.to_string()),
            source: Box::new(self),
        }
    }
}
