//! Vertex sources: where boundary records come from.

mod memory;
mod shapefile;

pub use memory::MemorySource;
pub use shapefile::ShapefileSource;

#[cfg(test)]
pub(crate) use shapefile::fixtures;

use crate::error::SourceError;
use crate::models::{Ring, SourceRecord};

/// A sequential reader of boundary records
pub trait VertexSource {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Record count, when the source knows it up front
    fn len_hint(&self) -> Option<usize> {
        None
    }

    /// Read the next record, `None` at the end
    fn next_record(&mut self) -> Result<Option<SourceRecord>, SourceError>;

    /// Drain the source, failing on the first unreadable record
    fn read_all(&mut self) -> Result<Vec<SourceRecord>, SourceError> {
        let mut records = Vec::with_capacity(self.len_hint().unwrap_or(0));
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Drop a trailing vertex that repeats the first one
pub(crate) fn open_ring(mut ring: Ring) -> Ring {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}
