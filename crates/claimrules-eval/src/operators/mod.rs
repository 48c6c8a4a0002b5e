//! Operator handlers, grouped by concern
//!
//! Each module contributes an `impl RuleEngine` block; the dispatch match in
//! `engine` routes every operator to exactly one handler here.

mod aggregate;
mod clinical;
mod comparison;
mod datetime;
mod entry;
mod logical;
mod membership;
