//! Rule expression evaluation and action dispatch
//!
//! [`RuleEngine`] evaluates parsed rule expressions against domain data
//! reached through a [`claimrules_model::DomainProvider`], and turns rule
//! actions into [`AdjudicationEffect`] values for the caller to apply.
//! Per-session state (scoped bindings, found-entry captures, memo caches)
//! lives in [`BindingContext`].

pub mod actions;
pub mod context;
pub mod engine;
pub mod error;
mod operators;

pub use actions::{AdjudicationEffect, AllowedMode, EffectAction};
pub use context::BindingContext;
pub use engine::RuleEngine;
pub use error::RuleError;
