//! The runtime value produced by rule expression evaluation

use crate::{EntityRef, LazySet, RuleDuration};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rule evaluation result.
///
/// Equality is structural for every variant except `Entity`, which compares
/// by identity (the handle, not the record behind it). Money and other
/// numerics are decimal, never binary floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RuleValue {
    /// Missing/unknown
    Null,
    /// Boolean value
    Bool(bool),
    /// Decimal number (codes compared numerically, amounts, ages, counts)
    Number(Decimal),
    /// String value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Calendar duration
    Duration(RuleDuration),
    /// Parsed code-set literal
    Set(LazySet),
    /// Opaque domain-object handle
    Entity(EntityRef),
}

impl RuleValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RuleValue::Null)
    }

    /// Condition truthiness: only `Null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, RuleValue::Null | RuleValue::Bool(false))
    }

    /// Ruby-style presence: null, false, and blank strings are not present.
    pub fn is_present(&self) -> bool {
        match self {
            RuleValue::Null | RuleValue::Bool(false) => false,
            RuleValue::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        RuleValue::Text(s.into())
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        RuleValue::Number(n.into())
    }

    pub fn as_entity(&self) -> Option<EntityRef> {
        match self {
            RuleValue::Entity(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RuleValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            RuleValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RuleValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleValue::Null => "null",
            RuleValue::Bool(_) => "boolean",
            RuleValue::Number(_) => "number",
            RuleValue::Text(_) => "text",
            RuleValue::Date(_) => "date",
            RuleValue::Duration(_) => "duration",
            RuleValue::Set(_) => "set",
            RuleValue::Entity(_) => "entity",
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Null => f.write_str("nil"),
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::Number(n) => write!(f, "{}", n),
            RuleValue::Text(s) => f.write_str(s),
            RuleValue::Date(d) => write!(f, "{}", d),
            RuleValue::Duration(d) => write!(f, "{}", d),
            RuleValue::Set(s) => write!(f, "{}", s),
            RuleValue::Entity(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        RuleValue::Bool(b)
    }
}

impl From<Decimal> for RuleValue {
    fn from(n: Decimal) -> Self {
        RuleValue::Number(n)
    }
}

impl From<i64> for RuleValue {
    fn from(n: i64) -> Self {
        RuleValue::Number(Decimal::from(n))
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Text(s)
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Text(s.to_string())
    }
}

impl From<NaiveDate> for RuleValue {
    fn from(d: NaiveDate) -> Self {
        RuleValue::Date(d)
    }
}

impl From<EntityRef> for RuleValue {
    fn from(e: EntityRef) -> Self {
        RuleValue::Entity(e)
    }
}

impl<T: Into<RuleValue>> From<Option<T>> for RuleValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(RuleValue::Null, Into::into)
    }
}
