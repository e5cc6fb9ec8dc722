//! Metrics sources and declarative source building
//!
//! A [`Source`] contributes metric samples when asked: the sampler hands it
//! a collector and the source stages records into it. Implementations must
//! not block on I/O and must not retain the collector past the call.
//!
//! Most sources never implement [`Source`] by hand. They describe their
//! metrics through [`MetricsDecl`] and let [`SourceBuilder`] bind the
//! declarations into a registry and synthesize the sampling callback:
//!
//! ```ignore
//! struct WorkerMetrics {
//!     requests: Option<MutableCounterLong>,
//! }
//!
//! impl MetricsDecl for WorkerMetrics {
//!     fn decl(&self) -> DeclInfo {
//!         DeclInfo::new("Worker").context("workers")
//!     }
//!
//!     fn declare(&mut self, registry: &MetricsRegistry) -> Result<bool> {
//!         if self.requests.is_none() {
//!             self.requests = Some(registry.new_counter(info("Requests", "Total requests"), 0)?);
//!         }
//!         Ok(true)
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::collector::Collector;
use crate::error::{MetricsError, Result};
use crate::info::{info, MetricsInfo};
use crate::registry::MetricsRegistry;

/// Producer-side object contributing metric samples when asked
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Stage this source's records into `collector`
    ///
    /// With `all` set, every metric is emitted regardless of change state;
    /// otherwise only metrics mutated since their last emitted snapshot.
    fn get_metrics(&self, collector: &mut Collector, all: bool);
}

/// Name, description and context a declarative source carries
#[derive(Debug, Clone)]
pub struct DeclInfo {
    name: String,
    about: Option<String>,
    context: Option<String>,
}

impl DeclInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            context: None,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Declarative description of a source's metrics
///
/// The statically-typed counterpart of an annotated object: `decl` names the
/// source, `registry` surfaces a registry the object already carries, and
/// `declare` binds each declared metric into the given registry, storing the
/// returned handles on the object. `declare` runs once per registration and
/// must skip handles that are already bound, so identity is preserved when
/// the metrics system restarts.
pub trait MetricsDecl {
    /// Source-level metadata
    fn decl(&self) -> DeclInfo;

    /// Registry the object carries, if any
    fn registry(&self) -> Option<MetricsRegistry> {
        None
    }

    /// Bind declared metrics into `registry`; true if the object declares any
    fn declare(&mut self, registry: &MetricsRegistry) -> Result<bool>;
}

/// Builds a [`Source`] from a declarative object
///
/// Discovers or creates the registry, runs the declarations, and either
/// returns the object's own sampling callback or synthesizes one over the
/// registry. Misuse is rejected: an object that is itself a source and
/// declares metrics must carry its own registry (otherwise the declared
/// metrics would be sampled by nobody), and an object that is not a source
/// must declare at least one metric.
pub struct SourceBuilder {
    source: Option<Arc<dyn Source>>,
    info: MetricsInfo,
    registry: MetricsRegistry,
    has_registry: bool,
    has_metrics: bool,
}

impl SourceBuilder {
    /// Build from a purely declarative object
    pub fn new(object: &mut dyn MetricsDecl) -> Result<Self> {
        Self::build_parts(object, None)
    }

    /// Build from an object that also implements [`Source`] itself
    pub fn with_source(object: &mut dyn MetricsDecl, source: Arc<dyn Source>) -> Result<Self> {
        Self::build_parts(object, Some(source))
    }

    fn build_parts(object: &mut dyn MetricsDecl, source: Option<Arc<dyn Source>>) -> Result<Self> {
        let decl = object.decl();
        let existing = object.registry();
        let has_registry = existing.is_some();

        let info = info(decl.name.as_str(), decl.about.as_deref().unwrap_or(&decl.name));
        let registry = existing.unwrap_or_else(|| MetricsRegistry::with_info(info.clone()));
        if let Some(context) = &decl.context {
            registry.set_context(context);
        }

        let has_metrics = object.declare(&registry)?;

        Ok(Self {
            source,
            info,
            registry,
            has_registry,
            has_metrics,
        })
    }

    /// Metadata describing the built source
    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.info.clone()
    }

    /// Registry the declarations were bound into
    #[inline]
    pub fn registry(&self) -> MetricsRegistry {
        self.registry.clone()
    }

    /// Finish building
    pub fn build(self) -> Result<Arc<dyn Source>> {
        if let Some(source) = self.source {
            if self.has_metrics && !self.has_registry {
                return Err(MetricsError::HybridWithoutRegistry);
            }
            return Ok(source);
        }
        if !self.has_metrics {
            return Err(MetricsError::NoDeclaredMetrics);
        }
        Ok(Arc::new(RegistrySource {
            registry: self.registry,
        }))
    }
}

/// Synthesized source sampling a registry into a single record
#[derive(Debug)]
struct RegistrySource {
    registry: MetricsRegistry,
}

impl Source for RegistrySource {
    fn get_metrics(&self, collector: &mut Collector, all: bool) {
        let rb = collector.add_record(self.registry.info());
        self.registry.snapshot(rb, all);
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;
