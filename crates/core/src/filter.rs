//! Name and tag filtering
//!
//! The [`Filter`] trait is the compiled-predicate contract used throughout
//! the system: the sampler filters sources by name, record builders filter
//! metrics at build time, and sink adapters filter entries, records and
//! metrics during delivery.
//!
//! [`GlobFilter`] is the built-in implementation, compiled from
//! include/exclude pattern lists (`tally_config::FilterSpec`). Patterns are
//! literals, a trailing-`*` prefix match, or a lone `*`. Richer predicate
//! syntaxes are plugins implementing [`Filter`] directly.

use std::fmt;

use tally_config::FilterSpec;

use crate::tag::Tag;

/// Compiled predicate over metric, record and source names
pub trait Filter: Send + Sync + fmt::Debug {
    /// Whether a name passes the filter
    fn accepts_name(&self, name: &str) -> bool;

    /// Whether a record's tag set passes the filter
    ///
    /// Each tag is tested in its `"name:value"` string form. A tag set is
    /// rejected when any tag is explicitly excluded, and accepted otherwise;
    /// implementations with include patterns may require a matching tag.
    fn accepts_tags(&self, tags: &[Tag]) -> bool {
        tags.iter()
            .all(|t| self.accepts_name(&format!("{}:{}", t.name(), t.value())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Any,
    Literal(String),
    Prefix(String),
}

impl Pattern {
    fn compile(raw: &str) -> Self {
        if raw == "*" {
            Self::Any
        } else if let Some(prefix) = raw.strip_suffix('*') {
            Self::Prefix(prefix.to_string())
        } else {
            Self::Literal(raw.to_string())
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Literal(lit) => name == lit,
            Self::Prefix(prefix) => name.starts_with(prefix),
        }
    }
}

/// Include/exclude pattern filter
///
/// Empty filter accepts everything. A name must not match any exclude
/// pattern and, when include patterns are present, must match one of them.
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Self {
        Self {
            include: include.iter().map(|s| Pattern::compile(s.as_ref())).collect(),
            exclude: exclude.iter().map(|s| Pattern::compile(s.as_ref())).collect(),
        }
    }

    /// Compile a configuration spec; `None` when the spec is unconstrained
    pub fn from_spec(spec: &FilterSpec) -> Option<Self> {
        if spec.is_empty() {
            None
        } else {
            Some(Self::new(&spec.include, &spec.exclude))
        }
    }

    fn included(&self, name: &str) -> bool {
        self.include.iter().any(|p| p.matches(name))
    }

    fn excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(name))
    }
}

impl Filter for GlobFilter {
    fn accepts_name(&self, name: &str) -> bool {
        if self.excluded(name) {
            return false;
        }
        self.include.is_empty() || self.included(name)
    }

    fn accepts_tags(&self, tags: &[Tag]) -> bool {
        let key = |t: &Tag| format!("{}:{}", t.name(), t.value());
        if tags.iter().any(|t| self.excluded(&key(t))) {
            return false;
        }
        self.include.is_empty() || tags.iter().any(|t| self.included(&key(t)))
    }
}
