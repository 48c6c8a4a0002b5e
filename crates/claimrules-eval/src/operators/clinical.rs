//! Tooth, surface, and anesthesia accessors
//!
//! Tooth ids follow the Universal Numbering System: permanent teeth `01`
//! through `32`, primary teeth `A` through `T`, supernumeraries with an `s`
//! suffix. `01`/`02` also appear as whole-arch area codes and `10`/`20`/
//! `30`/`40` as quadrant codes, which is why quadrant mapping checks the
//! area spellings first.

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, OpCode};
use claimrules_model::DomainProvider;
use claimrules_types::{LazySet, RuleValue};
use log::debug;

const QUADRANT_CODES: [&str; 4] = ["10", "20", "30", "40"];
const ARCH_CODES: [&str; 2] = ["01", "02"];

impl<P: DomainProvider> RuleEngine<P> {
    /// `tooth`: the entry's tooth ids as a set. Unknown ids are logged and
    /// dropped; no valid ids means null.
    pub(crate) fn op_tooth(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "tooth", args)?;
        let mut teeth = dedup(&entry.tooth_ids);
        let invalid: Vec<&String> = teeth
            .iter()
            .filter(|t| !is_valid_tooth_or_area(t))
            .copied()
            .collect();
        if !invalid.is_empty() {
            debug!(
                "Can't evaluate claim_entry#{} invalid tooth: {}",
                entry.id,
                invalid
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            teeth.retain(|t| is_valid_tooth_or_area(t));
        }
        join_as_set(&teeth)
    }

    /// `surface`: the entry's surface ids as a set, or null when it has none.
    pub(crate) fn op_surface(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "surface", args)?;
        join_as_set(&dedup(&entry.surface_ids))
    }

    pub(crate) fn op_num_surfaces(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "num_surfaces", args)?;
        Ok(RuleValue::from(dedup(&entry.surface_ids).len() as i64))
    }

    /// `quadrant` (alias `area`): the quadrant codes covered by the entry's
    /// teeth. Whole-arch codes pass through unchanged.
    pub(crate) fn op_quadrant(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "quadrant", args)?;
        let quads = map_teeth(&entry.tooth_ids, quadrant_of);
        join_as_set(&quads)
    }

    /// `arch`: `01` for upper, `02` for lower.
    pub(crate) fn op_arch(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "arch", args)?;
        let arches = map_teeth(&entry.tooth_ids, arch_of);
        join_as_set(&arches)
    }

    pub(crate) fn op_has_radiographs(
        &self,
        ctx: &mut BindingContext,
        _op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "has_xrays", args)?;
        Ok(RuleValue::Bool(entry.has_radiograph))
    }

    pub(crate) fn op_has_anesthesia_record(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "has_anesthesia_time_record", args)?;
        Ok(RuleValue::Bool(entry.has_anesthesia_record))
    }

    pub(crate) fn op_has_pathology(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "has_pathology", args)?;
        Ok(RuleValue::Bool(entry.has_pathology))
    }

    /// `anesthesia_level`: single-character level of the rendering provider.
    /// Always text; `" "` when unknown so `["<=" "1" anesthesia_level]`
    /// stays comparable.
    pub(crate) fn op_anesthesia_level(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "anesthesia_level", args)?;
        let level = self
            .provider_of(&entry)?
            .and_then(|r| r.anesthesia_level)
            .unwrap_or_else(|| " ".to_string());
        Ok(RuleValue::Text(level))
    }

    pub(crate) fn op_facility_anesthesia_level(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "facility_anesthesia_level", args)?;
        let level = self
            .facility_of(&entry)?
            .and_then(|r| r.anesthesia_level)
            .unwrap_or_else(|| " ".to_string());
        Ok(RuleValue::Text(level))
    }

    /// `max_anesthesia_level`: highest level certified for the provider in
    /// the facility's state as of the effective date.
    pub(crate) fn op_max_anesthesia_level(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "max_anesthesia_level", args)?;
        let claim = self.claim_of(&entry)?;
        let as_of = self.consider_date(ctx, &entry)?;
        let level = match claim.provider_id {
            Some(id) => self.provider().max_anesthesia_level(id, as_of)?,
            None => None,
        };
        Ok(level_text(level))
    }

    pub(crate) fn op_max_facility_anesthesia_level(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let entry = self.entry_arg(ctx, "max_facility_anesthesia_level", args)?;
        let claim = self.claim_of(&entry)?;
        let as_of = self.consider_date(ctx, &entry)?;
        let level = match claim.facility_id {
            Some(id) => self.provider().max_facility_anesthesia_level(id, as_of)?,
            None => None,
        };
        Ok(level_text(level))
    }

    /// `has_anesthesia_certificate?` family: the bound entry's provider (or
    /// facility) holds any of the named certificates. The certificate list
    /// is a literal comma-separated argument.
    pub(crate) fn op_anesthesia_certificate(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
        facility: bool,
    ) -> Result<RuleValue, RuleError> {
        let op = if facility {
            "has_facility_anesthesia_certificate?"
        } else {
            "has_anesthesia_certificate?"
        };
        let entry = self.bound_entry(ctx, op)?;
        let claim = self.claim_of(&entry)?;
        let names = literal_list(self, ctx, &args[0])?;
        let names: Vec<&str> = names.split(',').collect();
        let as_of = self.consider_date(ctx, &entry)?;
        let has = if facility {
            match claim.facility_id {
                Some(id) => self
                    .provider()
                    .facility_has_anesthesia_certificate(id, &names, as_of)?,
                None => false,
            }
        } else {
            match claim.provider_id {
                Some(id) => self
                    .provider()
                    .provider_has_anesthesia_certificate(id, &names, as_of)?,
                None => false,
            }
        };
        Ok(RuleValue::Bool(has))
    }

    /// `has_anesthesia_type?` family, shaped like the certificate check.
    pub(crate) fn op_anesthesia_type(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
        facility: bool,
    ) -> Result<RuleValue, RuleError> {
        let op = if facility {
            "has_facility_anesthesia_type?"
        } else {
            "has_anesthesia_type?"
        };
        let entry = self.bound_entry(ctx, op)?;
        let claim = self.claim_of(&entry)?;
        let names = literal_list(self, ctx, &args[0])?;
        let names: Vec<&str> = names.split(',').collect();
        let as_of = self.consider_date(ctx, &entry)?;
        let has = if facility {
            match claim.facility_id {
                Some(id) => self
                    .provider()
                    .facility_has_anesthesia_type(id, &names, as_of)?,
                None => false,
            }
        } else {
            match claim.provider_id {
                Some(id) => self
                    .provider()
                    .provider_has_anesthesia_type(id, &names, as_of)?,
                None => false,
            }
        };
        Ok(RuleValue::Bool(has))
    }
}

fn literal_list<P: DomainProvider>(
    engine: &RuleEngine<P>,
    ctx: &mut BindingContext,
    arg: &Expr,
) -> Result<String, RuleError> {
    match arg {
        Expr::Value(RuleValue::Text(s)) => Ok(s.clone()),
        other => Ok(engine.eval(ctx, other)?.to_string()),
    }
}

fn level_text(level: Option<i32>) -> RuleValue {
    match level {
        Some(n) if n >= 0 => RuleValue::Text(n.to_string()),
        _ => RuleValue::text(" "),
    }
}

fn dedup(ids: &[String]) -> Vec<&String> {
    let mut seen = Vec::new();
    for id in ids {
        if !id.is_empty() && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

fn map_teeth(teeth: &[String], f: fn(&str) -> Option<&'static str>) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for tooth in teeth {
        if let Some(code) = f(tooth) {
            if !out.contains(&code) {
                out.push(code);
            }
        }
    }
    out
}

fn join_as_set<S: AsRef<str>>(items: &[S]) -> Result<RuleValue, RuleError> {
    if items.is_empty() {
        return Ok(RuleValue::Null);
    }
    let joined = items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",");
    Ok(LazySet::parse(&joined)?)
}

/// Numeric tooth position 1..=32, with supernumeraries (`s` suffix, or
/// numbers offset by 50) folded onto their permanent position.
fn tooth_position(tooth: &str) -> Option<u32> {
    let base = tooth.strip_suffix(['s', 'S']).unwrap_or(tooth);
    if base.len() == 1 {
        let c = base.chars().next()?.to_ascii_uppercase();
        if c.is_ascii_uppercase() && c <= 'T' {
            // Primary teeth A..T occupy positions 4..13 and 20..29, but for
            // quadrant purposes a fifth of the alphabet maps to each.
            let n = c as u32 - 'A' as u32;
            return Some(n / 5 * 8 + n % 5 + 1);
        }
        return base.parse().ok();
    }
    let n: u32 = base.parse().ok()?;
    match n {
        1..=32 => Some(n),
        51..=82 => Some(n - 50),
        _ => None,
    }
}

fn quadrant_of(tooth: &str) -> Option<&'static str> {
    if let Some(code) = QUADRANT_CODES.iter().find(|c| **c == tooth) {
        return Some(code);
    }
    if let Some(code) = ARCH_CODES.iter().find(|c| **c == tooth) {
        return Some(code);
    }
    match tooth_position(tooth)? {
        1..=8 => Some("10"),
        9..=16 => Some("20"),
        17..=24 => Some("30"),
        25..=32 => Some("40"),
        _ => None,
    }
}

fn arch_of(tooth: &str) -> Option<&'static str> {
    if let Some(code) = ARCH_CODES.iter().find(|c| **c == tooth) {
        return Some(code);
    }
    match tooth_position(tooth)? {
        1..=16 => Some("01"),
        17..=32 => Some("02"),
        _ => None,
    }
}

fn is_valid_tooth_or_area(id: &str) -> bool {
    tooth_position(id).is_some()
        || QUADRANT_CODES.contains(&id)
        || ARCH_CODES.contains(&id)
        || id == "00"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_mapping() {
        assert_eq!(quadrant_of("8"), Some("10"));
        assert_eq!(quadrant_of("09"), Some("20"));
        assert_eq!(quadrant_of("17"), Some("30"));
        assert_eq!(quadrant_of("32"), Some("40"));
        // Area spellings pass through before numeric interpretation.
        assert_eq!(quadrant_of("10"), Some("10"));
        assert_eq!(quadrant_of("20"), Some("20"));
        assert_eq!(quadrant_of("01"), Some("01"));
        assert_eq!(quadrant_of("02"), Some("02"));
        assert_eq!(quadrant_of("A"), Some("10"));
        assert_eq!(quadrant_of("T"), Some("40"));
        assert_eq!(quadrant_of("58"), Some("10"));
        assert_eq!(quadrant_of("xx"), None);
    }

    #[test]
    fn arch_mapping() {
        assert_eq!(arch_of("01"), Some("01"));
        assert_eq!(arch_of("02"), Some("02"));
        assert_eq!(arch_of("12"), Some("01"));
        assert_eq!(arch_of("28"), Some("02"));
        assert_eq!(arch_of("E"), Some("01"));
        assert_eq!(arch_of("K"), Some("02"));
    }

    #[test]
    fn tooth_validity() {
        assert!(is_valid_tooth_or_area("01"));
        assert!(is_valid_tooth_or_area("32"));
        assert!(is_valid_tooth_or_area("A"));
        assert!(is_valid_tooth_or_area("As"));
        assert!(is_valid_tooth_or_area("51"));
        assert!(is_valid_tooth_or_area("40"));
        assert!(!is_valid_tooth_or_area("33"));
        assert!(!is_valid_tooth_or_area("ZZ"));
    }
}
