//! Runtime value model for the claims rule language
//!
//! This crate defines:
//! - `RuleValue`, the tagged union produced by expression evaluation
//! - `RuleDuration`, calendar-aware durations (`{days 45}` and friends)
//! - `EntityRef`, opaque handles into the domain data provider
//! - `LazySet`, comma/dash delimited code-set literals with range membership

pub mod duration;
pub mod entity;
pub mod lazyset;
pub mod value;

pub use duration::RuleDuration;
pub use entity::{EntityKind, EntityRef};
pub use lazyset::{LazySet, SetParseError};
pub use value::RuleValue;
