//! Errors raised while turning rule documents into expression trees

use thiserror::Error;

/// Structural errors in a rule document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// A call expression was an empty array
    #[error("Expression array is empty")]
    EmptyExpression,

    /// The head of a call expression was not a string
    #[error("First element of array should be an op: {found}")]
    HeadNotOperator { found: String },

    /// The head of a call expression named no known operator
    #[error("First element of array should be an op: {name}")]
    UnknownOperator { name: String },

    /// A map expression contained no keyed-operator key
    #[error("No valid op code found in expression: {text}")]
    NoKeyedOperator { text: String },

    /// A keyed operator was missing a required keyword argument
    #[error("Op {op} requires keyword arg {key}")]
    MissingKwarg { op: &'static str, key: String },

    /// A keyed operator received a keyword argument it does not accept
    #[error("Op {op} does not accept keyword arg {key}")]
    UnexpectedKwarg { op: &'static str, key: String },

    /// A JSON number could not be represented as a decimal
    #[error("Unrepresentable number in expression: {text}")]
    BadNumber { text: String },

    /// A rule document was not a map
    #[error("Rule document must be a map, got: {found}")]
    RuleNotMap { found: String },
}
