//! The rule container
//!
//! A rule is a map document: an optional `"when"` condition plus one or more
//! action entries whose values are the action details. The condition is
//! parsed eagerly; action details stay raw JSON until dispatch, which owns
//! their validation.

use crate::action::{ActionContext, CarcClassification, action_context};
use crate::error::ExprError;
use crate::expr::Expr;
use serde_json::Value as Json;

/// A parsed adjudication rule.
#[derive(Debug, Clone)]
pub struct Rule {
    label: Option<String>,
    description: String,
    condition: Option<Expr>,
    doc: Json,
}

impl Rule {
    /// Parse a rule document. The document must be a map; any `"when"` key
    /// is parsed as the condition and everything else is an action.
    pub fn parse(doc: Json, label: Option<String>, description: Option<String>) -> Result<Rule, ExprError> {
        let Some(map) = doc.as_object() else {
            return Err(ExprError::RuleNotMap {
                found: doc.to_string(),
            });
        };
        let condition = map.get("when").map(Expr::from_json).transpose()?;
        Ok(Rule {
            label,
            description: description.unwrap_or_default(),
            condition,
            doc,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The parsed `"when"` condition. A rule with no condition always fires.
    pub fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }

    /// Action entries in document order, `"when"` excluded.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &Json)> {
        self.doc
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(name, _)| name.as_str() != "when")
            .map(|(name, details)| (name.as_str(), details))
    }

    /// Contexts this rule's actions run in, deduplicated, in document order.
    /// Unknown actions contribute nothing.
    pub fn applicable_contexts(&self, carcs: &CarcClassification) -> Vec<ActionContext> {
        let mut contexts = Vec::new();
        for (name, details) in self.actions() {
            if let Some(context) = action_context(name, details, carcs)
                && !contexts.contains(&context)
            {
                contexts.push(context);
            }
        }
        contexts
    }

    /// The raw rule document.
    pub fn doc(&self) -> &Json {
        &self.doc
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.doc == other.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(doc: Json) -> Rule {
        Rule::parse(doc, Some("test-rule".to_string()), None).unwrap()
    }

    #[test]
    fn parses_condition_and_actions() {
        let r = rule(json!({
            "when": ["=", ["cpt", "entry"], "0120"],
            "deny": 62
        }));
        assert!(r.condition().is_some());
        let actions: Vec<_> = r.actions().collect();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].0, "deny");
    }

    #[test]
    fn condition_is_optional() {
        let r = rule(json!({"pend": "manual review"}));
        assert!(r.condition().is_none());
    }

    #[test]
    fn non_map_document_is_rejected() {
        assert!(matches!(
            Rule::parse(json!(["deny", 62]), None, None),
            Err(ExprError::RuleNotMap { .. })
        ));
    }

    #[test]
    fn bad_condition_fails_parse() {
        assert!(Rule::parse(json!({"when": ["bogus_op"]}), None, None).is_err());
    }

    #[test]
    fn applicable_contexts_dedupe_in_document_order() {
        let r = rule(json!({
            "when": true,
            "add_carc": 96,
            "deny": 62,
            "footer_pend": "note"
        }));
        let contexts = r.applicable_contexts(&CarcClassification::default());
        assert_eq!(
            contexts,
            vec![
                ActionContext::FooterAddCarc,
                ActionContext::Deny,
                ActionContext::FooterPend
            ]
        );
    }

    #[test]
    fn equality_is_label_plus_document() {
        let a = rule(json!({"deny": 62}));
        let b = rule(json!({"deny": 62}));
        let c = rule(json!({"deny": 96}));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
