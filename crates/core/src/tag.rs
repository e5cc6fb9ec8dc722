//! Record tags
//!
//! A [`Tag`] is an interned `(info, value)` pair appended to records and
//! used by sink-side routing and filtering.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::info::MetricsInfo;

/// Interned labeled string attached to records
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    inner: Arc<TagInner>,
}

#[derive(PartialEq, Eq, Hash)]
struct TagInner {
    info: MetricsInfo,
    value: String,
}

impl Tag {
    /// Metadata for this tag
    #[inline]
    pub fn info(&self) -> &MetricsInfo {
        &self.inner.info
    }

    /// Tag name
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.info.name()
    }

    /// Tag description
    #[inline]
    pub fn description(&self) -> &str {
        self.inner.info.description()
    }

    /// Tag value
    #[inline]
    pub fn value(&self) -> &str {
        &self.inner.value
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name(), self.value())
    }
}

fn pool() -> &'static Mutex<HashMap<(MetricsInfo, String), Tag>> {
    static POOL: OnceLock<Mutex<HashMap<(MetricsInfo, String), Tag>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get the canonical tag for an info/value pair
pub fn tag(info: MetricsInfo, value: &str) -> Tag {
    let mut pool = pool().lock();
    if let Some(existing) = pool.get(&(info.clone(), value.to_string())) {
        return existing.clone();
    }
    let created = Tag {
        inner: Arc::new(TagInner {
            info: info.clone(),
            value: value.to_string(),
        }),
    };
    pool.insert((info, value.to_string()), created.clone());
    created
}
