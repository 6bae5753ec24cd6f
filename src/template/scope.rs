//! Variable scope used for template substitution

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Dashboard time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the range
    pub from: DateTime<Utc>,
    /// End of the range
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

/// A single scoped variable binding
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScopedVar {
    /// Display text
    #[serde(default)]
    pub text: String,
    /// Value substituted into templates
    pub value: String,
}

impl ScopedVar {
    /// Create a binding whose text and value are the same
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            text: value.clone(),
            value,
        }
    }
}

/// Variable bindings available while resolving one batch of queries
///
/// Holds named variables plus the optional time range that backs the
/// built-in `__from` / `__to` variables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScopedVars {
    #[serde(flatten)]
    vars: HashMap<String, ScopedVar>,

    #[serde(skip)]
    range: Option<TimeRange>,
}

impl ScopedVars {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable binding
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), ScopedVar::new(value));
        self
    }

    /// Set the time range
    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Insert or replace a binding
    pub fn insert(&mut self, name: impl Into<String>, var: ScopedVar) {
        self.vars.insert(name.into(), var);
    }

    /// Look up a binding by name
    pub fn get(&self, name: &str) -> Option<&ScopedVar> {
        self.vars.get(name)
    }

    /// Time range, if one is set
    pub fn range(&self) -> Option<&TimeRange> {
        self.range.as_ref()
    }

    /// Number of named bindings
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether there are no named bindings
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
