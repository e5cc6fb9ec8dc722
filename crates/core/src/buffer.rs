//! Snapshot buffers
//!
//! A [`Buffer`] is the immutable unit of delivery to sinks: the records of
//! every sampled source for one pass, grouped by source name. Buffers share
//! their entry list behind `Arc`, so fanning one out to many sink queues
//! costs one pointer clone per sink.

use std::sync::Arc;

use crate::record::Record;

/// Records produced by one source during one pass
#[derive(Debug, Clone)]
pub struct BufferEntry {
    source_name: String,
    records: Vec<Record>,
}

impl BufferEntry {
    #[inline]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Immutable collection of every source's records for one sampling pass
#[derive(Debug, Clone)]
pub struct Buffer {
    entries: Arc<[BufferEntry]>,
}

impl Buffer {
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BufferEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulates entries for one pass, in sampling order
#[derive(Debug, Default)]
pub struct BufferBuilder {
    entries: Vec<BufferEntry>,
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source_name: impl Into<String>, records: Vec<Record>) {
        self.entries.push(BufferEntry {
            source_name: source_name.into(),
            records,
        });
    }

    pub fn build(self) -> Buffer {
        Buffer {
            entries: self.entries.into(),
        }
    }
}
