//! Immutable commit records and the file descriptors they carry.

use serde::{Deserialize, Serialize};

/// Opaque reference to the file a commit was (or will be) materialized as.
/// Never interpreted by the coordinator core — carried through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: String,
    pub size: u64,
    pub mod_time: i64,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, size: u64, mod_time: i64) -> Self {
        Self {
            path: path.into(),
            size,
            mod_time,
        }
    }
}

/// A single ratified commit. Deeply immutable once constructed: marking a
/// record backfilled produces a new `CommitRecord` rather than mutating this
/// one in place, so a reference handed to a caller can never be observed to
/// change underneath them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    version: i64,
    file_descriptor: FileDescriptor,
    commit_timestamp: i64,
    is_disown: bool,
    is_backfilled: bool,
}

impl CommitRecord {
    pub fn new(
        version: i64,
        file_descriptor: FileDescriptor,
        commit_timestamp: i64,
        is_disown: bool,
        is_backfilled: bool,
    ) -> Self {
        Self {
            version,
            file_descriptor,
            commit_timestamp,
            is_disown,
            is_backfilled,
        }
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn file_descriptor(&self) -> &FileDescriptor {
        &self.file_descriptor
    }

    pub fn commit_timestamp(&self) -> i64 {
        self.commit_timestamp
    }

    pub fn is_disown(&self) -> bool {
        self.is_disown
    }

    pub fn is_backfilled(&self) -> bool {
        self.is_backfilled
    }

    /// Returns a copy of this record marked as backfilled. Used by
    /// `TableLedger` to build the trim sentinel without mutating history in
    /// place.
    pub(crate) fn with_backfilled(&self) -> Self {
        Self {
            is_backfilled: true,
            ..self.clone()
        }
    }
}

/// The reader-facing view of a [`CommitRecord`]. `is_disown` and
/// `is_backfilled` are internal bookkeeping and are never exposed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecordView {
    pub version: i64,
    pub file_descriptor: FileDescriptor,
    pub commit_timestamp: i64,
}

impl From<&CommitRecord> for CommitRecordView {
    fn from(record: &CommitRecord) -> Self {
        Self {
            version: record.version,
            file_descriptor: record.file_descriptor.clone(),
            commit_timestamp: record.commit_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfilling_a_record_does_not_mutate_the_original() {
        let original = CommitRecord::new(3, FileDescriptor::new("p", 1, 2), 100, false, false);
        let backfilled = original.with_backfilled();
        assert!(!original.is_backfilled());
        assert!(backfilled.is_backfilled());
        assert_eq!(original.version(), backfilled.version());
    }

    #[test]
    fn view_hides_disown_and_backfilled_flags() {
        let record = CommitRecord::new(0, FileDescriptor::new("p", 1, 2), 100, true, true);
        let view = CommitRecordView::from(&record);
        assert_eq!(view.version, 0);
        assert_eq!(view.commit_timestamp, 100);
        // No is_disown/is_backfilled field exists on CommitRecordView at all;
        // this test exists to document the intent, not to exercise behavior.
    }
}
