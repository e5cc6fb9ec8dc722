//! In-process introspection beans
//!
//! A process-wide registry of named read-only views over live metric
//! values, the hook points an external management surface would attach to.
//! Each source adapter registers one bean while started; the orchestrator
//! registers a control bean exposing its period.
//!
//! Attribute reads go through the adapter's cached snapshot, so rapid
//! external polling costs at most one `all=true` sample per cache interval.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Value of one introspection attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Read-only attribute view exposed under a bean name
pub trait MetricsView: Send + Sync {
    /// Current attribute values, one per metric
    fn attributes(&self) -> Vec<(String, AttributeValue)>;
}

fn registry() -> &'static Mutex<HashMap<String, Arc<dyn MetricsView>>> {
    static BEANS: OnceLock<Mutex<HashMap<String, Arc<dyn MetricsView>>>> = OnceLock::new();
    BEANS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Publish `view` under `name`, replacing any previous registration
pub fn register(name: impl Into<String>, view: Arc<dyn MetricsView>) {
    let name = name.into();
    if registry().lock().insert(name.clone(), view).is_some() {
        tracing::warn!(bean = %name, "replacing existing bean registration");
    } else {
        tracing::debug!(bean = %name, "registered bean");
    }
}

/// Remove the bean registered under `name`, if any
pub fn unregister(name: &str) {
    if registry().lock().remove(name).is_some() {
        tracing::debug!(bean = %name, "unregistered bean");
    }
}

/// Look up a bean by name
pub fn get(name: &str) -> Option<Arc<dyn MetricsView>> {
    registry().lock().get(name).cloned()
}

/// Read one attribute of one bean
pub fn attribute(bean: &str, attribute: &str) -> Option<AttributeValue> {
    let view = get(bean)?;
    view.attributes()
        .into_iter()
        .find(|(name, _)| name == attribute)
        .map(|(_, value)| value)
}
