//! Chained ordering comparisons

use crate::context::BindingContext;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use claimrules_ast::{Expr, OpCode};
use claimrules_model::DomainProvider;
use claimrules_types::RuleValue;
use std::cmp::Ordering;

impl<P: DomainProvider> RuleEngine<P> {
    /// `<`, `>`, `<=`, `>=` over two or more operands, chained pairwise:
    /// `["<", a, b, c]` means `a < b && b < c`.
    ///
    /// All operands are evaluated before any comparison; a null operand is
    /// fatal rather than silently false. Fewer than two operands is
    /// vacuously true.
    pub(crate) fn op_compare(
        &self,
        ctx: &mut BindingContext,
        op: OpCode,
        args: &[Expr],
    ) -> Result<RuleValue, RuleError> {
        if args.len() < 2 {
            return Ok(RuleValue::Bool(true));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(ctx, arg)?);
        }
        if values.iter().any(RuleValue::is_null) {
            let rendered: Vec<String> = values.iter().map(|v| format!("\u{201c}{}\u{201d}", v)).collect();
            return Err(RuleError::NullComparison {
                op: op.name(),
                args: rendered.join(" "),
            });
        }
        for pair in values.windows(2) {
            let ordering = compare_values(op.name(), &pair[0], &pair[1])?;
            let holds = match op {
                OpCode::Lt => ordering == Ordering::Less,
                OpCode::Gt => ordering == Ordering::Greater,
                OpCode::Le => ordering != Ordering::Greater,
                OpCode::Ge => ordering != Ordering::Less,
                _ => return Err(RuleError::UnsupportedOp { op: op.name() }),
            };
            if !holds {
                return Ok(RuleValue::Bool(false));
            }
        }
        Ok(RuleValue::Bool(true))
    }
}

/// Ordering between two values of the same kind. Text compares
/// lexicographically, which is what the single-character anesthesia levels
/// (with their `" "` floor) rely on.
fn compare_values(
    op: &'static str,
    a: &RuleValue,
    b: &RuleValue,
) -> Result<Ordering, RuleError> {
    match (a, b) {
        (RuleValue::Number(x), RuleValue::Number(y)) => Ok(x.cmp(y)),
        (RuleValue::Text(x), RuleValue::Text(y)) => Ok(x.cmp(y)),
        (RuleValue::Date(x), RuleValue::Date(y)) => Ok(x.cmp(y)),
        (lhs, rhs) => Err(RuleError::Incomparable {
            op,
            lhs: lhs.type_name().to_string(),
            rhs: rhs.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn ordering_by_kind() {
        let one = RuleValue::Number(Decimal::from(1));
        let two = RuleValue::Number(Decimal::from(2));
        assert_eq!(compare_values("<", &one, &two).unwrap(), Ordering::Less);
        assert_eq!(
            compare_values("<", &RuleValue::text(" "), &RuleValue::text("1")).unwrap(),
            Ordering::Less
        );
        assert!(compare_values("<", &one, &RuleValue::text("1")).is_err());
    }
}
