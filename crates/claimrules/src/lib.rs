//! Claims adjudication rule language
//!
//! This workspace implements a small EDN-shaped rule language for claims
//! adjudication:
//! - Parsing rule documents and expressions from JSON
//! - Evaluating conditions against domain data behind a provider trait
//! - Dispatching rule actions into adjudication effects
//!
//! # Example
//!
//! ```ignore
//! use claimrules::{BindingContext, MemoryProvider, Rule, RuleEngine};
//!
//! let doc = serde_json::json!({
//!     "when": ["or", ["<", "age", 3], [">", "age", 20]],
//!     "deny": 62,
//! });
//! let rule = Rule::parse(doc, Some("age-limit".into()), None)?;
//!
//! let engine = RuleEngine::new(provider);
//! let effects = engine.eval_rule_for_entry(&mut ctx, &rule, entry)?;
//! ```

// Re-export all public APIs from internal crates
pub use claimrules_ast as ast;
pub use claimrules_eval as eval;
pub use claimrules_model as model;
pub use claimrules_types as types;

// Convenience re-exports
pub use claimrules_ast::{ActionContext, CarcClassification, Expr, OpCode, Rule};
pub use claimrules_eval::{AdjudicationEffect, BindingContext, EffectAction, RuleEngine, RuleError};
pub use claimrules_model::{DomainProvider, MemoryProvider};
pub use claimrules_types::{EntityRef, LazySet, RuleDuration, RuleValue};
