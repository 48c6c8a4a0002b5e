//! Boolean connectives, equality, and the `same` family

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, ExprError, OpCode};
use claimrules_model::DomainProvider;
use claimrules_types::{LazySet, RuleValue};

impl<P: DomainProvider> RuleEngine<P> {
    /// `=` (and `intersects`): the first operand matched against the rest.
    ///
    /// Set operands use set semantics: two sets match when they intersect, a
    /// set and a scalar when the set includes it. Fewer than two operands is
    /// vacuously true.
    pub(crate) fn op_eq(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        if args.len() < 2 {
            return Ok(RuleValue::Bool(true));
        }
        let first = self.eval(ctx, &args[0])?;
        for arg in &args[1..] {
            let other = self.eval(ctx, arg)?;
            if !values_match(&first, &other) {
                return Ok(RuleValue::Bool(false));
            }
        }
        Ok(RuleValue::Bool(true))
    }

    /// Negation of another boolean operator; used by `not=`, `blank`,
    /// `not_exists` and friends.
    pub(crate) fn op_negate(
        &self,
        ctx: &mut BindingContext,
        inner: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let value = self.eval(ctx, &Expr::call(inner, args.to_vec()))?;
        match value {
            RuleValue::Bool(b) => Ok(RuleValue::Bool(!b)),
            other => Err(RuleError::NotABoolean {
                op: "not",
                found: other.to_string(),
            }),
        }
    }

    pub(crate) fn op_and(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        for arg in args {
            if !self.eval(ctx, arg)?.is_truthy() {
                return Ok(RuleValue::Bool(false));
            }
        }
        Ok(RuleValue::Bool(true))
    }

    pub(crate) fn op_or(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        for arg in args {
            if self.eval(ctx, arg)?.is_truthy() {
                return Ok(RuleValue::Bool(true));
            }
        }
        Ok(RuleValue::Bool(false))
    }

    /// `not` demands an actual boolean, not mere truthiness.
    pub(crate) fn op_not(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        match self.eval(ctx, &args[0])? {
            RuleValue::Bool(b) => Ok(RuleValue::Bool(!b)),
            other => Err(RuleError::NotABoolean {
                op: "not",
                found: other.to_string(),
            }),
        }
    }

    /// `cond`: test/value pairs; the first truthy test selects its value.
    /// Later pairs are never evaluated. No match yields null.
    pub(crate) fn op_cond(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        for pair in args.chunks(2) {
            if self.eval(ctx, &pair[0])?.is_truthy() {
                return match pair.get(1) {
                    Some(value) => self.eval(ctx, value),
                    None => Ok(RuleValue::Null),
                };
            }
        }
        Ok(RuleValue::Null)
    }

    pub(crate) fn op_present(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        for arg in args {
            if !self.eval(ctx, arg)?.is_present() {
                return Ok(RuleValue::Bool(false));
            }
        }
        Ok(RuleValue::Bool(true))
    }

    /// `contains_any?`: case-insensitive substring search of the first
    /// operand for any of the given keywords.
    pub(crate) fn op_contains_any(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let haystack = self.eval(ctx, &args[0])?;
        if !haystack.is_present() {
            return Ok(RuleValue::Bool(false));
        }
        let haystack = haystack.to_string().to_uppercase();
        for keyword in &args[1..] {
            // Keywords are taken literally, not resolved as expressions.
            let keyword = match keyword {
                Expr::Value(RuleValue::Text(s)) => s.clone(),
                other => self.eval(ctx, other)?.to_string(),
            };
            if haystack.contains(&keyword.to_uppercase()) {
                return Ok(RuleValue::Bool(true));
            }
        }
        Ok(RuleValue::Bool(false))
    }

    /// `identical`: whole-value equality. Two sets are identical when their
    /// element lists match, not merely when they intersect.
    pub(crate) fn op_identical(
        &self,
        ctx: &mut BindingContext,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let first = self.eval(ctx, &args[0])?;
        for arg in &args[1..] {
            let other = self.eval(ctx, arg)?;
            let same = match (&first, &other) {
                (RuleValue::Set(a), RuleValue::Set(b)) => {
                    a.sorted_elements() == b.sorted_elements()
                }
                (a, b) => a == b,
            };
            if !same {
                return Ok(RuleValue::Bool(false));
            }
        }
        Ok(RuleValue::Bool(true))
    }

    /// The `same` family: each argument names an attribute operator, and the
    /// call expands to that attribute compared between the current entry and
    /// the main entry under adjudication.
    pub(crate) fn op_pairwise(
        &self,
        ctx: &mut BindingContext,
        joiner: OpCode,
        comparator: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        let mut comparisons = Vec::with_capacity(args.len());
        for arg in args {
            let Expr::Value(RuleValue::Text(name)) = arg else {
                return Err(RuleError::Parse(ExprError::HeadNotOperator {
                    found: arg.to_string(),
                }));
            };
            let attribute = OpCode::from_name(name)
                .filter(|op| !op.is_keyed_only())
                .ok_or_else(|| {
                    RuleError::Parse(ExprError::UnknownOperator { name: name.clone() })
                })?;
            comparisons.push(Expr::call(
                comparator,
                vec![
                    Expr::call(attribute, vec![Expr::text("entry")]),
                    Expr::call(attribute, vec![Expr::text("main")]),
                ],
            ));
        }
        self.eval(ctx, &Expr::call(joiner, comparisons))
    }
}

/// Equality with set semantics, as `=` sees it.
fn values_match(a: &RuleValue, b: &RuleValue) -> bool {
    match (a, b) {
        (RuleValue::Set(s1), RuleValue::Set(s2)) => s1.intersects(s2),
        (RuleValue::Set(s), other) | (other, RuleValue::Set(s)) => set_includes(s, other),
        (a, b) => a == b,
    }
}

fn set_includes(set: &LazySet, candidate: &RuleValue) -> bool {
    match candidate {
        RuleValue::Text(s) => set.includes(s),
        other => set.includes(&other.to_string()),
    }
}
