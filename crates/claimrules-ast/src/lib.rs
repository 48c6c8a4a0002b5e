//! Expression tree, operator vocabulary and rule container for the claims
//! rule language.
//!
//! Rules are JSON documents: a `"when"` condition expression plus action
//! entries. This crate parses documents into [`Expr`] trees over the closed
//! [`OpCode`] vocabulary and classifies actions into processing contexts.
//! Evaluation lives in `claimrules-eval`.

pub mod action;
pub mod error;
pub mod expr;
pub mod op;
pub mod rule;

pub use action::{ActionContext, CONTEXT_ORDER, CarcClassification, action_context};
pub use error::ExprError;
pub use expr::Expr;
pub use op::{Arity, KwargSpec, OpCode};
pub use rule::Rule;
