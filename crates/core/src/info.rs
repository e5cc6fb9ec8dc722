//! Metric metadata and interning
//!
//! A [`MetricsInfo`] is a `(name, description)` pair attached to every
//! metric, tag and record. Infos are interned: `info("Ops", "...")` returns
//! the same allocation for the same pair, so equality checks are usually a
//! pointer comparison and repeated snapshots reuse one allocation.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Interned name/description pair identifying a metric, tag or record
#[derive(Clone)]
pub struct MetricsInfo {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    description: String,
}

impl MetricsInfo {
    /// Metric name
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Human-readable description
    #[inline]
    pub fn description(&self) -> &str {
        &self.inner.description
    }
}

impl PartialEq for MetricsInfo {
    fn eq(&self, other: &Self) -> bool {
        // Interned infos normally share the allocation
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name
                && self.inner.description == other.inner.description)
    }
}

impl Eq for MetricsInfo {}

impl Hash for MetricsInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
        self.inner.description.hash(state);
    }
}

impl fmt::Debug for MetricsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.name, self.inner.description)
    }
}

impl fmt::Display for MetricsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

fn pool() -> &'static Mutex<HashMap<(String, String), MetricsInfo>> {
    static POOL: OnceLock<Mutex<HashMap<(String, String), MetricsInfo>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get the canonical info for a name/description pair
pub fn info(name: &str, description: &str) -> MetricsInfo {
    let mut pool = pool().lock();
    if let Some(existing) = pool.get(&(name.to_string(), description.to_string())) {
        return existing.clone();
    }
    let created = MetricsInfo {
        inner: Arc::new(Inner {
            name: name.to_string(),
            description: description.to_string(),
        }),
    };
    pool.insert(
        (name.to_string(), description.to_string()),
        created.clone(),
    );
    created
}

/// Info for the context tag carried by records
pub fn context_info() -> MetricsInfo {
    info("Context", "Metrics context")
}
