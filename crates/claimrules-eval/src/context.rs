//! Scoped bindings for a single evaluation session
//!
//! Evaluation threads a [`BindingContext`] through every call instead of
//! using ambient state. Bindings are stacks: `with_binding` pushes for the
//! duration of a closure and always restores on the way out, so nested
//! scopes (entry loops inside `found`, rebinding during anniversary lookups)
//! cannot leak.

use claimrules_types::{EntityRef, RuleValue};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Session state for rule evaluation.
#[derive(Debug)]
pub struct BindingContext {
    stacks: HashMap<String, Vec<RuleValue>>,
    found_entries: HashMap<String, EntityRef>,
    memo: HashMap<String, RuleValue>,
    rule_label: Option<String>,
    today: NaiveDate,
    trace: bool,
}

impl BindingContext {
    /// A context evaluating "as of" the given date. Operators like `age`
    /// with no explicit date use it as today.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            stacks: HashMap::new(),
            found_entries: HashMap::new(),
            memo: HashMap::new(),
            rule_label: None,
            today,
            trace: false,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Innermost value bound to `key`, if any.
    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.stacks.get(key).and_then(|stack| stack.last())
    }

    /// The entity bound to `key`, if the binding holds one.
    pub fn get_entity(&self, key: &str) -> Option<EntityRef> {
        self.get(key).and_then(RuleValue::as_entity)
    }

    /// Bind `key` for the duration of `f`; restores the previous binding on
    /// exit, including the error path.
    pub fn with_binding<T>(
        &mut self,
        key: &str,
        value: RuleValue,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.stacks.entry(key.to_string()).or_default().push(value);
        let result = f(self);
        if let Some(stack) = self.stacks.get_mut(key) {
            stack.pop();
        }
        result
    }

    /// Bind several keys at once for the duration of `f`.
    pub fn with_bindings<T>(
        &mut self,
        bindings: &[(&str, RuleValue)],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        for (key, value) in bindings {
            self.stacks
                .entry((*key).to_string())
                .or_default()
                .push(value.clone());
        }
        let result = f(self);
        for (key, _) in bindings {
            if let Some(stack) = self.stacks.get_mut(*key) {
                stack.pop();
            }
        }
        result
    }

    /// Entries captured by `found`, visible to later expressions by name.
    pub fn found_entry(&self, name: &str) -> Option<EntityRef> {
        self.found_entries.get(name).copied()
    }

    pub fn record_found_entry(&mut self, name: impl Into<String>, entry: EntityRef) {
        self.found_entries.insert(name.into(), entry);
    }

    pub fn clear_found_entries(&mut self) {
        self.found_entries.clear();
    }

    /// Memoized value under `key`, computing and caching it on a miss.
    /// Used for per-rule caches like membership attribute lookups.
    pub fn memoize<E>(
        &mut self,
        key: &str,
        compute: impl FnOnce(&mut Self) -> Result<RuleValue, E>,
    ) -> Result<RuleValue, E> {
        if let Some(hit) = self.memo.get(key) {
            return Ok(hit.clone());
        }
        let value = compute(self)?;
        self.memo.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Drop memo entries whose key starts with `prefix`. Ran when a rule
    /// finishes so attribute caches never span rules.
    pub fn clear_memo_prefix(&mut self, prefix: &str) {
        self.memo.retain(|key, _| !key.starts_with(prefix));
    }

    /// Label of the rule currently being evaluated, for error reporting.
    pub fn rule_label(&self) -> Option<&str> {
        self.rule_label.as_deref()
    }

    pub fn set_rule_label(&mut self, label: Option<String>) {
        self.rule_label = label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> BindingContext {
        BindingContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn bindings_nest_and_restore() {
        let mut c = ctx();
        c.with_binding("rule:entry", RuleValue::from(1i64), |c| {
            assert_eq!(c.get("rule:entry"), Some(&RuleValue::from(1i64)));
            c.with_binding("rule:entry", RuleValue::from(2i64), |c| {
                assert_eq!(c.get("rule:entry"), Some(&RuleValue::from(2i64)));
            });
            assert_eq!(c.get("rule:entry"), Some(&RuleValue::from(1i64)));
        });
        assert_eq!(c.get("rule:entry"), None);
    }

    #[test]
    fn bindings_restore_on_error_paths() {
        let mut c = ctx();
        let result: Result<(), &str> =
            c.with_binding("rule:entry", RuleValue::from(1i64), |_| Err("boom"));
        assert!(result.is_err());
        assert_eq!(c.get("rule:entry"), None);
    }

    #[test]
    fn memoize_computes_once() {
        let mut c = ctx();
        let mut calls = 0;
        for _ in 0..3 {
            let v: Result<_, ()> = c.memoize("attrs:7", |_| {
                calls += 1;
                Ok(RuleValue::text("gold"))
            });
            assert_eq!(v.unwrap(), RuleValue::text("gold"));
        }
        assert_eq!(calls, 1);
        c.clear_memo_prefix("attrs:");
        let _: Result<_, ()> = c.memoize("attrs:7", |_| {
            calls += 1;
            Ok(RuleValue::text("gold"))
        });
        assert_eq!(calls, 2);
    }
}
