//! Lazily parsed code-set literals
//!
//! Rule text like `"2330,2331,2332,2335"`, `"6-10"` or `"as-ts"` denotes a set
//! of procedure/tooth codes with optional ranges. Ranges whose endpoints are
//! two characters ending in `s` are "supernumerary" tooth ranges and live in
//! their own bucket; membership and intersection never mix the two buckets.

use crate::value::RuleValue;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a set literal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetParseError {
    /// A comma segment contained more than one dash
    #[error("Unable to parse as LazySet: {text}")]
    Unparseable { text: String },

    /// One range endpoint is supernumerary-shaped and the other is not
    #[error("Unrecognized range from {lo} to {hi}")]
    MixedRange { lo: String, hi: String },
}

/// A parsed set literal: discrete elements plus two categories of ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazySet {
    elements: Vec<String>,
    supernumerary_ranges: Vec<(String, String)>,
    other_ranges: Vec<(String, String)>,
}

/// Parse results are pure functions of the literal text, so they are memoized
/// process-wide. Only successful parses are cached.
static PARSE_CACHE: Lazy<Mutex<HashMap<String, RuleValue>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl LazySet {
    /// Parse a set literal into a [`RuleValue`].
    ///
    /// A literal with no comma and no dash is a scalar: it becomes a `Date` if
    /// it parses as one of the slash date formats, otherwise the bare `Text`.
    /// A set that ends up holding exactly one element and no ranges collapses
    /// to that element as a bare `Text` scalar.
    pub fn parse(text: &str) -> Result<RuleValue, SetParseError> {
        if let Some(hit) = PARSE_CACHE.lock().get(text) {
            return Ok(hit.clone());
        }
        let parsed = Self::parse_uncached(text)?;
        PARSE_CACHE
            .lock()
            .insert(text.to_string(), parsed.clone());
        Ok(parsed)
    }

    fn parse_uncached(text: &str) -> Result<RuleValue, SetParseError> {
        if !text.contains(',') && !text.contains('-') {
            return Ok(match parse_scalar_date(text) {
                Some(date) => RuleValue::Date(date),
                None => RuleValue::Text(text.to_string()),
            });
        }

        let mut set = LazySet::default();
        for segment in text.split(',') {
            let parts: Vec<&str> = segment.split('-').collect();
            match parts.as_slice() {
                [single] => set.add_element(single),
                [lo, hi] => set.add_range(lo, hi)?,
                _ => {
                    return Err(SetParseError::Unparseable {
                        text: text.to_string(),
                    });
                }
            }
        }

        if set.supernumerary_ranges.is_empty() && set.other_ranges.is_empty() {
            // Single-element, range-free sets collapse to the bare scalar.
            match set.elements.len() {
                0 => return Ok(RuleValue::Null),
                1 => return Ok(RuleValue::Text(set.elements.remove(0))),
                _ => {}
            }
        }
        Ok(RuleValue::Set(set))
    }

    fn add_element(&mut self, element: &str) {
        self.elements.push(element.to_string());
    }

    fn add_range(&mut self, lo: &str, hi: &str) -> Result<(), SetParseError> {
        let lo_sup = is_supernumerary(lo);
        let hi_sup = is_supernumerary(hi);
        if lo_sup && hi_sup {
            self.supernumerary_ranges
                .push((lo.to_string(), hi.to_string()));
        } else if !lo_sup && !hi_sup {
            self.other_ranges.push((lo.to_string(), hi.to_string()));
        } else {
            return Err(SetParseError::MixedRange {
                lo: lo.to_string(),
                hi: hi.to_string(),
            });
        }
        Ok(())
    }

    /// Discrete (non-range) members.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Supernumerary tooth ranges.
    pub fn supernumerary_ranges(&self) -> &[(String, String)] {
        &self.supernumerary_ranges
    }

    /// All remaining ranges.
    pub fn other_ranges(&self) -> &[(String, String)] {
        &self.other_ranges
    }

    /// Membership test.
    ///
    /// Exact element matches win. Otherwise the candidate picks its range
    /// bucket by the supernumerary shape test; within a range, comparison is
    /// numeric when the candidate and both endpoints start with a digit, and
    /// equal-length lexicographic when none of them do. Inclusive bounds.
    pub fn includes(&self, candidate: &str) -> bool {
        if self.elements.iter().any(|e| e == candidate) {
            return true;
        }
        let ranges = if is_supernumerary(candidate) {
            &self.supernumerary_ranges
        } else {
            &self.other_ranges
        };
        for (lo, hi) in ranges {
            let digits = [candidate, lo, hi].map(starts_with_digit);
            if digits.iter().all(|d| *d) {
                let c = leading_number(candidate);
                if leading_number(lo) <= c && leading_number(hi) >= c {
                    return true;
                }
            } else if digits.iter().all(|d| !*d)
                && candidate.len() == lo.len()
                && lo.as_str() <= candidate
                && hi.as_str() >= candidate
            {
                return true;
            }
        }
        false
    }

    /// True if the two sets share an element or have overlapping ranges in
    /// the same category. Symmetric by construction.
    pub fn intersects(&self, other: &LazySet) -> bool {
        if self
            .elements
            .iter()
            .any(|e1| other.elements.iter().any(|e2| e1 == e2))
        {
            return true;
        }
        ranges_overlap(&self.supernumerary_ranges, &other.supernumerary_ranges)
            || ranges_overlap(&self.other_ranges, &other.other_ranges)
    }

    /// Canonical literal rendering (elements first, then ranges).
    pub fn to_text(&self) -> String {
        let mut parts: Vec<String> = self.elements.clone();
        for (lo, hi) in self.other_ranges.iter().chain(&self.supernumerary_ranges) {
            parts.push(format!("{}-{}", lo, hi));
        }
        parts.join(",")
    }

    /// Elements in sorted order, for whole-set identity comparison.
    pub fn sorted_elements(&self) -> Vec<String> {
        let mut sorted = self.elements.clone();
        sorted.sort();
        sorted
    }
}

impl fmt::Display for LazySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn ranges_overlap(lhs: &[(String, String)], rhs: &[(String, String)]) -> bool {
    lhs.iter().any(|r1| {
        rhs.iter()
            .any(|r2| !(endpoint_gt(&r1.0, &r2.1) || endpoint_gt(&r2.0, &r1.1)))
    })
}

/// Endpoint ordering for overlap tests: numeric when both endpoints start
/// with a digit, lexicographic otherwise.
fn endpoint_gt(a: &str, b: &str) -> bool {
    if starts_with_digit(a) && starts_with_digit(b) {
        leading_number(a) > leading_number(b)
    } else {
        a > b
    }
}

fn is_supernumerary(code: &str) -> bool {
    code.len() == 2 && code.as_bytes()[1] == b's'
}

fn starts_with_digit(s: &str) -> bool {
    s.as_bytes().first().is_some_and(|b| b.is_ascii_digit())
}

/// Numeric value of the leading `[0-9.]` prefix, zero when absent.
fn leading_number(s: &str) -> Decimal {
    let end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    Decimal::from_str(&s[..end]).unwrap_or_default()
}

fn parse_scalar_date(text: &str) -> Option<NaiveDate> {
    for format in ["%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(text: &str) -> LazySet {
        match LazySet::parse(text).unwrap() {
            RuleValue::Set(s) => s,
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn scalar_collapses_to_text() {
        assert_eq!(
            LazySet::parse("42").unwrap(),
            RuleValue::Text("42".to_string())
        );
        assert_eq!(
            LazySet::parse("0120").unwrap(),
            RuleValue::Text("0120".to_string())
        );
    }

    #[test]
    fn scalar_date_formats() {
        assert_eq!(
            LazySet::parse("2024/03/15").unwrap(),
            RuleValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
    }

    #[test]
    fn double_dash_is_an_error() {
        assert!(matches!(
            LazySet::parse("1-2-3"),
            Err(SetParseError::Unparseable { .. })
        ));
    }

    #[test]
    fn mixed_range_is_an_error() {
        assert!(matches!(
            LazySet::parse("as-10"),
            Err(SetParseError::MixedRange { .. })
        ));
    }

    #[test]
    fn numeric_range_membership_is_inclusive() {
        let s = set("6-10");
        assert!(s.includes("6"));
        assert!(s.includes("10"));
        assert!(s.includes("7"));
        assert!(!s.includes("12"));
    }

    #[test]
    fn supernumerary_candidates_only_see_supernumerary_ranges() {
        let s = set("as-ts,6-10");
        assert!(s.includes("bs"));
        assert!(!s.includes("6s"));
        assert!(s.includes("6"));
    }

    #[test]
    fn lexicographic_range_requires_equal_length() {
        let s = set("aa-az");
        assert!(s.includes("am"));
        assert!(!s.includes("a"));
        assert!(!s.includes("ama"));
    }

    #[test]
    fn intersection_on_shared_elements_and_ranges() {
        assert!(set("1,2,3").intersects(&set("3,4,5")));
        assert!(set("1-5,9").intersects(&set("4-8,0")));
        assert!(!set("1-3,9").intersects(&set("4-8,0")));
    }
}
