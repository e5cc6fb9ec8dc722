//! Filter pattern specifications
//!
//! A filter spec is a pair of include/exclude pattern lists. The core crate
//! compiles a spec into a predicate; this crate only carries the raw
//! patterns so configuration stays independent of the matching engine.

use serde::Deserialize;

/// Include/exclude pattern lists for a name filter
///
/// # Example
///
/// ```toml
/// [source_filter]
/// include = ["Rpc*", "Jvm"]
/// exclude = ["RpcDetailed*"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterSpec {
    /// Patterns a name must match when any are given
    pub include: Vec<String>,

    /// Patterns that reject a name outright
    pub exclude: Vec<String>,
}

impl FilterSpec {
    /// Whether the spec constrains anything at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(FilterSpec::default().is_empty());
    }

    #[test]
    fn test_deserialize() {
        let spec: FilterSpec = toml::from_str(
            r#"
include = ["good*"]
exclude = ["bad"]
"#,
        )
        .unwrap();
        assert_eq!(spec.include, vec!["good*"]);
        assert_eq!(spec.exclude, vec!["bad"]);
        assert!(!spec.is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let spec: FilterSpec = toml::from_str(r#"include = ["a"]"#).unwrap();
        assert_eq!(spec.include, vec!["a"]);
        assert!(spec.exclude.is_empty());
    }
}
