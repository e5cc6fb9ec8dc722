//! Lifecycle callbacks
//!
//! Hooks invoked around `start` and `stop`, in registration order. A
//! callback fault must never break the lifecycle, so every invocation goes
//! through [`GuardedCallback`], which catches panics, logs them at WARN and
//! continues.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Pre/post start and stop hooks
///
/// All methods default to no-ops; implement only the phases of interest.
pub trait Callback: Send + Sync {
    fn pre_start(&self) {}
    fn post_start(&self) {}
    fn pre_stop(&self) {}
    fn post_stop(&self) {}
}

/// Wrapper suppressing and logging callback faults
#[derive(Clone)]
pub(crate) struct GuardedCallback {
    inner: Arc<dyn Callback>,
}

impl GuardedCallback {
    pub fn new(inner: Arc<dyn Callback>) -> Self {
        Self { inner }
    }

    pub fn pre_start(&self) {
        self.guard("pre_start", |cb| cb.pre_start());
    }

    pub fn post_start(&self) {
        self.guard("post_start", |cb| cb.post_start());
    }

    pub fn pre_stop(&self) {
        self.guard("pre_stop", |cb| cb.pre_stop());
    }

    pub fn post_stop(&self) {
        self.guard("post_stop", |cb| cb.post_stop());
    }

    fn guard(&self, phase: &str, invoke: impl FnOnce(&dyn Callback)) {
        if catch_unwind(AssertUnwindSafe(|| invoke(self.inner.as_ref()))).is_err() {
            tracing::warn!(phase, "caught panic in callback");
        }
    }
}
