//! Append-only audit log of resolved decisions.

use serde::{Deserialize, Serialize};

use crate::core::types::InterventionRecord;

/// Ordered record of every applied `Approve`/`Modify` decision.
///
/// Entries are only ever appended by the intervention gate; there is no way to
/// reorder or edit them from outside the crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    records: Vec<InterventionRecord>,
}

impl AuditLog {
    pub(crate) fn append(&mut self, record: InterventionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[InterventionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterventionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&InterventionRecord> {
        self.records.last()
    }

    /// Records for `step_id`, in the order they were appended.
    pub fn for_step<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a InterventionRecord> {
        self.records.iter().filter(move |record| record.step_id == step_id)
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a InterventionRecord;
    type IntoIter = std::slice::Iter<'a, InterventionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
