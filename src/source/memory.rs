use super::VertexSource;
use crate::error::SourceError;
use crate::models::SourceRecord;

/// Records held in memory, handed out in order
pub struct MemorySource {
    label: String,
    total: usize,
    records: std::vec::IntoIter<SourceRecord>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        Self {
            label: label.into(),
            total: records.len(),
            records: records.into_iter(),
        }
    }
}

impl VertexSource for MemorySource {
    fn describe(&self) -> String {
        format!("{} ({} records)", self.label, self.total)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.total)
    }

    fn next_record(&mut self) -> Result<Option<SourceRecord>, SourceError> {
        Ok(self.records.next())
    }
}
