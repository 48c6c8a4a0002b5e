//! The expression tree rules are parsed into
//!
//! Rule conditions arrive as JSON: scalars are literals, arrays are operator
//! calls with the operator name at the head, and maps are keyed operators
//! with keyword arguments (`{"dos": "entry", "+": {"days": 45}}`). Parsing
//! validates structure and vocabulary; argument counts and value types are
//! checked during evaluation, where the bound subject is known.

use crate::error::ExprError;
use crate::op::{KEYED_OPS, OpCode};
use claimrules_types::{EntityRef, RuleValue};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::fmt;

/// A parsed rule expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal: null, boolean, number, or unresolved text
    Value(RuleValue),
    /// An operator call: `["=", ["age", "insured"], 21]`
    Call { op: OpCode, args: Vec<Expr> },
    /// A keyed operator: `{"dos": "entry", "+": {"days": 45}}`
    Keyed {
        op: OpCode,
        arg: Box<Expr>,
        kwargs: IndexMap<String, Expr>,
    },
}

impl Expr {
    pub fn value(v: impl Into<RuleValue>) -> Expr {
        Expr::Value(v.into())
    }

    pub fn text(s: impl Into<String>) -> Expr {
        Expr::Value(RuleValue::Text(s.into()))
    }

    /// An embedded entity handle. Produced by macro expansions that pin a
    /// subexpression to a concrete domain object; never parsed from text.
    pub fn entity(e: EntityRef) -> Expr {
        Expr::Value(RuleValue::Entity(e))
    }

    pub fn call(op: OpCode, args: Vec<Expr>) -> Expr {
        Expr::Call { op, args }
    }

    /// Parse a JSON document into an expression tree.
    pub fn from_json(doc: &Json) -> Result<Expr, ExprError> {
        match doc {
            Json::Null => Ok(Expr::Value(RuleValue::Null)),
            Json::Bool(b) => Ok(Expr::Value(RuleValue::Bool(*b))),
            Json::Number(n) => Ok(Expr::Value(RuleValue::Number(parse_number(n)?))),
            Json::String(s) => Ok(Expr::Value(RuleValue::Text(s.clone()))),
            Json::Array(items) => Self::parse_call(items),
            Json::Object(map) => Self::parse_keyed(map),
        }
    }

    fn parse_call(items: &[Json]) -> Result<Expr, ExprError> {
        let Some(head) = items.first() else {
            return Err(ExprError::EmptyExpression);
        };
        let name = head.as_str().ok_or_else(|| ExprError::HeadNotOperator {
            found: head.to_string(),
        })?;
        let op = OpCode::from_name(name)
            .filter(|op| !op.is_keyed_only())
            .ok_or_else(|| ExprError::UnknownOperator {
                name: name.to_string(),
            })?;
        let args = items[1..]
            .iter()
            .map(Expr::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::Call { op, args })
    }

    fn parse_keyed(map: &serde_json::Map<String, Json>) -> Result<Expr, ExprError> {
        let Some(op) = KEYED_OPS
            .iter()
            .copied()
            .find(|op| map.contains_key(op.name()))
        else {
            return Err(ExprError::NoKeyedOperator {
                text: Json::Object(map.clone()).to_string(),
            });
        };
        // kwargs() is Some for everything in KEYED_OPS
        let spec = op.kwargs().unwrap_or(crate::op::KwargSpec {
            required: &[],
            optional: &[],
        });

        for key in spec.required {
            if !map.contains_key(*key) {
                return Err(ExprError::MissingKwarg {
                    op: op.name(),
                    key: (*key).to_string(),
                });
            }
        }
        let mut kwargs = IndexMap::new();
        for (key, value) in map {
            if key == op.name() {
                continue;
            }
            if !spec.required.contains(&key.as_str()) && !spec.optional.contains(&key.as_str()) {
                return Err(ExprError::UnexpectedKwarg {
                    op: op.name(),
                    key: key.clone(),
                });
            }
            kwargs.insert(key.clone(), Expr::from_json(value)?);
        }

        let arg = Expr::from_json(&map[op.name()])?;
        Ok(Expr::Keyed {
            op,
            arg: Box::new(arg),
            kwargs,
        })
    }
}

fn parse_number(n: &serde_json::Number) -> Result<Decimal, ExprError> {
    if let Some(i) = n.as_i64() {
        return Ok(Decimal::from(i));
    }
    n.as_f64()
        .and_then(|f| Decimal::try_from(f).ok())
        .ok_or_else(|| ExprError::BadNumber {
            text: n.to_string(),
        })
}

impl fmt::Display for Expr {
    /// Rule-text-like rendering, used in error and trace messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Value(RuleValue::Text(s)) => write!(f, "\"{}\"", s),
            Expr::Value(v) => write!(f, "{}", v),
            Expr::Call { op, args } => {
                write!(f, "[{}", op)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str("]")
            }
            Expr::Keyed { op, arg, kwargs } => {
                write!(f, "{{{} {}", op, arg)?;
                for (key, value) in kwargs {
                    write!(f, ", {} {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(doc: serde_json::Value) -> Expr {
        Expr::from_json(&doc).unwrap()
    }

    #[test]
    fn scalars_parse_to_literals() {
        assert_eq!(parse(json!(null)), Expr::Value(RuleValue::Null));
        assert_eq!(parse(json!(true)), Expr::value(true));
        assert_eq!(parse(json!(21)), Expr::value(21));
        assert_eq!(parse(json!("entry")), Expr::text("entry"));
    }

    #[test]
    fn calls_parse_head_and_args() {
        let expr = parse(json!(["=", ["age", "insured"], 21]));
        assert_eq!(
            expr,
            Expr::call(
                OpCode::Eq,
                vec![
                    Expr::call(OpCode::Age, vec![Expr::text("insured")]),
                    Expr::value(21),
                ]
            )
        );
    }

    #[test]
    fn empty_array_is_rejected() {
        assert_eq!(Expr::from_json(&json!([])), Err(ExprError::EmptyExpression));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(matches!(
            Expr::from_json(&json!(["frobnicate", 1])),
            Err(ExprError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn keyed_only_op_is_rejected_in_call_position() {
        assert!(matches!(
            Expr::from_json(&json!(["days", 45])),
            Err(ExprError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn keyed_expression_with_optional_kwarg() {
        let expr = parse(json!({"dos": "entry", "+": {"days": 45}}));
        let Expr::Keyed { op, arg, kwargs } = expr else {
            panic!("expected keyed expression");
        };
        assert_eq!(op, OpCode::Dos);
        assert_eq!(*arg, Expr::text("entry"));
        assert!(matches!(kwargs.get("+"), Some(Expr::Keyed { .. })));
    }

    #[test]
    fn keyed_expression_rejects_unknown_kwarg() {
        assert_eq!(
            Expr::from_json(&json!({"dos": "entry", "*": 2})),
            Err(ExprError::UnexpectedKwarg {
                op: "dos",
                key: "*".to_string()
            })
        );
    }

    #[test]
    fn keyed_expression_requires_required_kwargs() {
        assert_eq!(
            Expr::from_json(&json!({"exceeds_benefit_limit_within": {"months": 12}})),
            Err(ExprError::MissingKwarg {
                op: "exceeds_benefit_limit_within",
                key: "of".to_string()
            })
        );
    }

    #[test]
    fn map_without_keyed_op_is_rejected() {
        assert!(matches!(
            Expr::from_json(&json!({"age": "insured"})),
            Err(ExprError::NoKeyedOperator { .. })
        ));
    }

    #[test]
    fn display_is_rule_text_like() {
        let expr = parse(json!(["=", ["cpt", "entry"], "0120,0150"]));
        assert_eq!(expr.to_string(), "[= [cdt \"entry\"] \"0120,0150\"]");
    }
}
