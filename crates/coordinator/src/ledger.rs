//! Per-table commit ledger: the invariant keeper.
//!
//! Everything that touches `commits` happens under a single `RwLock` held
//! for the full duration of validation plus mutation, so every lock-release
//! boundary leaves the five invariants from the data model holding:
//! strictly increasing versions, contiguity after the first commit, a
//! bounded unbackfilled window, at most one (trailing) disown record, and a
//! sole retained record once a full-trim backfill has been observed.

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::CoordinatorError;
use crate::fault::FaultInjection;
use crate::record::{CommitRecord, CommitRecordView, FileDescriptor};
use crate::requests::CommitRequest;

const DELTA_LOG_FOLDER: &str = "_delta_log";
const COMMITS_FOLDER: &str = "_commits";

/// Builds the on-disk commit path at commit time rather than at read time,
/// per the spec's "avoid per-read cost" rationale.
fn commit_file_path(table_uri: &str, file_name: &str) -> String {
    let base = table_uri.trim_end_matches('/');
    format!("{base}/{DELTA_LOG_FOLDER}/{COMMITS_FOLDER}/{file_name}")
}

#[derive(Debug)]
pub(crate) struct TableLedger {
    table_uri: String,
    commits: RwLock<Vec<CommitRecord>>,
}

impl TableLedger {
    pub(crate) fn new(table_uri: String) -> Self {
        Self {
            table_uri,
            commits: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn table_uri(&self) -> &str {
        &self.table_uri
    }

    /// Performs steps 2–7 of `commit` (the registration step happens one
    /// level up, in the coordinator, before a ledger reference even exists).
    pub(crate) fn commit(
        &self,
        request: &CommitRequest,
        faults: &FaultInjection,
        max_unbackfilled: usize,
    ) -> Result<(), CoordinatorError> {
        let mut commits = self.commits.write();

        // Step 3 runs before step 4's URI check, per the spec's own numbered
        // order — a backfill-ack-only request (no commit payload) is never
        // checked against `table_uri` at all, since that check is nested
        // under "if a commit payload is present" below. Not an oversight:
        // a request carrying only `last_known_backfilled_version` has no
        // way to name a wrong table other than `table_id`, which already
        // selected this ledger.
        if let Some(backfilled_through) = request.last_known_backfilled_version {
            let last_ratified = commits.last().map(|c| c.version()).unwrap_or(-1);
            let ceiling = request
                .commit
                .as_ref()
                .map(|payload| payload.version)
                .unwrap_or(0)
                .max(last_ratified);
            if backfilled_through > ceiling {
                return Err(CoordinatorError::InvalidArgument(format!(
                    "last_known_backfilled_version {backfilled_through} exceeds {ceiling}"
                )));
            }
        }

        // Step 4: validate and append the commit payload, if present.
        if let Some(payload) = &request.commit {
            if request.table_uri != self.table_uri {
                return Err(CoordinatorError::InvalidTargetTable {
                    table_id: request.table_id,
                    expected: self.table_uri.clone(),
                    actual: request.table_uri.clone(),
                });
            }

            let unbackfilled = commits.iter().filter(|c| !c.is_backfilled()).count();
            if unbackfilled >= max_unbackfilled {
                return Err(CoordinatorError::CommitLimitReached {
                    table_id: request.table_id,
                    limit: max_unbackfilled,
                });
            }

            if faults.test_and_clear_before_commit() {
                debug!(table_id = %request.table_id, "throw_before_commit fault injected");
                return Err(CoordinatorError::IoFailure {
                    table_id: request.table_id,
                    message: "throw_before_commit fault injected".to_string(),
                    after_append: false,
                });
            }

            match commits.last() {
                Some(last) if last.is_disown() => {
                    return Err(CoordinatorError::TableDisowned(request.table_id));
                }
                Some(last) => {
                    let expected = last.version() + 1;
                    if payload.version != expected {
                        let behind = payload.version < expected;
                        warn!(
                            table_id = %request.table_id,
                            attempted = payload.version,
                            expected,
                            "commit conflict"
                        );
                        return Err(CoordinatorError::CommitConflict {
                            table_id: request.table_id,
                            attempted: payload.version,
                            expected,
                            conflict: behind,
                            retryable: behind,
                        });
                    }
                }
                None => {
                    // First commit after registration: any version is accepted as-is.
                }
            }

            let path = commit_file_path(&self.table_uri, &payload.file_name);
            let record = CommitRecord::new(
                payload.version,
                FileDescriptor::new(path, payload.file_size, payload.file_mod_time),
                payload.commit_timestamp,
                request.is_disown,
                false,
            );
            commits.push(record);
        }

        // Step 5: the commit above, if any, is retained even if this fires.
        if faults.test_and_clear_after_commit() {
            debug!(table_id = %request.table_id, "throw_after_commit fault injected");
            return Err(CoordinatorError::IoFailure {
                table_id: request.table_id,
                message: "throw_after_commit fault injected".to_string(),
                after_append: true,
            });
        }

        // Step 6: apply the backfill trim using post-append state.
        if let Some(backfilled_through) = request.last_known_backfilled_version {
            apply_backfill(&mut commits, backfilled_through);
        }

        Ok(())
    }

    pub(crate) fn get_commits(
        &self,
        start: Option<i64>,
        end: Option<i64>,
    ) -> (Vec<CommitRecordView>, i64) {
        let commits = self.commits.read();
        let last_ratified = match commits.last() {
            Some(last) => last.version(),
            None => return (Vec::new(), -1),
        };
        let effective_start = start.unwrap_or(0);
        let effective_end = end.unwrap_or(last_ratified);
        let views = commits
            .iter()
            .filter(|c| {
                !c.is_backfilled() && c.version() >= effective_start && c.version() <= effective_end
            })
            .map(CommitRecordView::from)
            .collect();
        (views, last_ratified)
    }
}

/// Applies a "versions up to `backfilled_through` are now durable" update.
/// Assumes the caller holds the write lock and has already validated
/// `backfilled_through` against pre-append state.
fn apply_backfill(commits: &mut Vec<CommitRecord>, backfilled_through: i64) {
    let last_version = commits.last().map(|c| c.version());
    if last_version == Some(backfilled_through) {
        if let Some(sentinel) = commits.last().map(CommitRecord::with_backfilled) {
            commits.clear();
            commits.push(sentinel);
        }
    } else {
        commits.retain(|c| c.version() > backfilled_through);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::CommitPayload;
    use uuid::Uuid;

    fn request(table_id: Uuid, table_uri: &str, version: i64) -> CommitRequest {
        CommitRequest::new(table_id, table_uri).with_commit(CommitPayload::new(
            format!("{version:020}.json"),
            version,
            100,
            0,
            1000 + version,
        ))
    }

    #[test]
    fn commit_file_path_zero_pads_nothing_itself_but_joins_segments() {
        assert_eq!(
            commit_file_path("s3://bucket/table", "00000000000000000003.json"),
            "s3://bucket/table/_delta_log/_commits/00000000000000000003.json"
        );
        assert_eq!(
            commit_file_path("s3://bucket/table/", "f.json"),
            "s3://bucket/table/_delta_log/_commits/f.json"
        );
    }

    #[test]
    fn first_commit_accepts_any_version() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        ledger
            .commit(&request(table_id, "u", 5), &faults, 10)
            .unwrap();
        let (commits, last_ratified) = ledger.get_commits(None, None);
        assert_eq!(last_ratified, 5);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].version, 5);
    }

    #[test]
    fn version_must_be_contiguous_after_first_commit() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        ledger
            .commit(&request(table_id, "u", 0), &faults, 10)
            .unwrap();

        let err = ledger
            .commit(&request(table_id, "u", 0), &faults, 10)
            .unwrap_err();
        match err {
            CoordinatorError::CommitConflict {
                conflict,
                retryable,
                ..
            } => {
                assert!(conflict);
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ledger
            .commit(&request(table_id, "u", 2), &faults, 10)
            .unwrap_err();
        match err {
            CoordinatorError::CommitConflict {
                conflict,
                retryable,
                ..
            } => {
                assert!(!conflict);
                assert!(!retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn limit_is_enforced_before_append() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        for v in 0..3 {
            ledger.commit(&request(table_id, "u", v), &faults, 3).unwrap();
        }
        let err = ledger
            .commit(&request(table_id, "u", 3), &faults, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::CommitLimitReached { limit: 3, .. }
        ));
    }

    #[test]
    fn backfill_equal_to_last_ratified_leaves_a_single_sentinel() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        for v in 0..4 {
            ledger.commit(&request(table_id, "u", v), &faults, 10).unwrap();
        }
        let backfill_req = CommitRequest::new(table_id, "u").with_last_known_backfilled_version(3);
        ledger.commit(&backfill_req, &faults, 10).unwrap();

        let (commits, last_ratified) = ledger.get_commits(None, None);
        assert_eq!(last_ratified, 3);
        assert!(commits.is_empty(), "sentinel must be hidden from readers");
    }

    #[test]
    fn backfill_below_last_ratified_trims_older_commits_only() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        for v in 0..4 {
            ledger.commit(&request(table_id, "u", v), &faults, 10).unwrap();
        }
        let backfill_req = CommitRequest::new(table_id, "u").with_last_known_backfilled_version(1);
        ledger.commit(&backfill_req, &faults, 10).unwrap();

        let (commits, last_ratified) = ledger.get_commits(None, None);
        assert_eq!(last_ratified, 3);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].version, 2);
        assert_eq!(commits[1].version, 3);
    }

    #[test]
    fn disowned_ledger_rejects_further_commits() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        ledger.commit(&request(table_id, "u", 0), &faults, 10).unwrap();
        let disown = CommitRequest::new(table_id, "u")
            .with_commit(CommitPayload::new("1.json", 1, 1, 0, 1))
            .with_disown(true);
        ledger.commit(&disown, &faults, 10).unwrap();

        let err = ledger
            .commit(&request(table_id, "u", 2), &faults, 10)
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::TableDisowned(_)));
    }

    #[test]
    fn throw_after_commit_retains_the_append() {
        let ledger = TableLedger::new("u".to_string());
        let faults = FaultInjection::default();
        let table_id = Uuid::new_v4();
        ledger.commit(&request(table_id, "u", 0), &faults, 10).unwrap();

        faults.set_throw_after_commit(true);
        let err = ledger
            .commit(&request(table_id, "u", 1), &faults, 10)
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::IoFailure {
                after_append: true,
                ..
            }
        ));

        let (_, last_ratified) = ledger.get_commits(None, None);
        assert_eq!(last_ratified, 1);
    }
}
