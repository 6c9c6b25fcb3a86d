//! Value types exchanged between callers and the coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::record::CommitRecordView;

/// The commit payload half of a [`CommitRequest`]. All five fields are
/// required by construction, so the source precondition "if any
/// commit-payload field is present, all of them are present" has no
/// representable counterexample — there is nothing to validate at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub file_name: String,
    pub version: i64,
    pub file_size: u64,
    pub file_mod_time: i64,
    pub commit_timestamp: i64,
}

impl CommitPayload {
    pub fn new(
        file_name: impl Into<String>,
        version: i64,
        file_size: u64,
        file_mod_time: i64,
        commit_timestamp: i64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            version,
            file_size,
            file_mod_time,
            commit_timestamp,
        }
    }
}

/// Request to commit to (or report backfill progress on) one table.
///
/// Constructed with [`CommitRequest::new`] and the `with_*` builder methods,
/// following the same style as the teacher's `CommitProperties`/`CommitBuilder`
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub table_id: Uuid,
    pub table_uri: String,
    pub commit: Option<CommitPayload>,
    pub last_known_backfilled_version: Option<i64>,
    pub is_disown: bool,
    pub protocol: Option<Value>,
    pub metadata: Option<Value>,
}

impl CommitRequest {
    pub fn new(table_id: Uuid, table_uri: impl Into<String>) -> Self {
        Self {
            table_id,
            table_uri: table_uri.into(),
            commit: None,
            last_known_backfilled_version: None,
            is_disown: false,
            protocol: None,
            metadata: None,
        }
    }

    pub fn with_commit(mut self, payload: CommitPayload) -> Self {
        self.commit = Some(payload);
        self
    }

    pub fn with_last_known_backfilled_version(mut self, version: i64) -> Self {
        self.last_known_backfilled_version = Some(version);
        self
    }

    pub fn with_disown(mut self, is_disown: bool) -> Self {
        self.is_disown = is_disown;
        self
    }

    pub fn with_protocol(mut self, protocol: Value) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Response to a `get_commits` call: the unbackfilled window in the
/// requested range, plus the last ratified version (`-1` if the table has
/// never been committed to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCommitsResponse {
    pub commits: Vec<CommitRecordView>,
    pub last_ratified_version: i64,
}

impl GetCommitsResponse {
    pub(crate) fn empty() -> Self {
        Self {
            commits: Vec::new(),
            last_ratified_version: -1,
        }
    }
}
