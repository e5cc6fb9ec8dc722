//! Per-source configuration
//!
//! Overrides applied by one source adapter during its sampling passes.

use serde::Deserialize;

use crate::FilterSpec;

/// Configuration for one source adapter
///
/// # Example
///
/// ```toml
/// [source.jvm]
/// [source.jvm.metric_filter]
/// include = ["Threads*", "GcCount*"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Records this source is allowed to emit
    pub record_filter: FilterSpec,

    /// Metrics this source is allowed to emit
    pub metric_filter: FilterSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert!(config.record_filter.is_empty());
        assert!(config.metric_filter.is_empty());
    }

    #[test]
    fn test_deserialize() {
        let config: SourceConfig = toml::from_str(
            r#"
[metric_filter]
include = ["Threads*"]
"#,
        )
        .unwrap();
        assert_eq!(config.metric_filter.include, vec!["Threads*"]);
        assert!(config.record_filter.is_empty());
    }
}
