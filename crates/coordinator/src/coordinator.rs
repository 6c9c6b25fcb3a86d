//! The keyed collection of table ledgers and its public API.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::CoordinatorError;
use crate::fault::FaultInjection;
use crate::ledger::TableLedger;
use crate::requests::{CommitRequest, GetCommitsResponse};

/// Default unbackfilled window size (`spec.md` §8's `MAX_UNBACKFILLED`).
pub const DEFAULT_MAX_UNBACKFILLED: usize = 10;

/// Shared contract for a commit coordinator. The in-memory implementation in
/// this crate performs no I/O and needs no suspension points; the trait is
/// `async` so network-backed implementations (the stated purpose of keeping
/// this reference implementation around) can share callers with it.
#[async_trait]
pub trait CommitCoordinatorClient: fmt::Debug + Send + Sync {
    /// Submits a commit, a backfill acknowledgement, or both, for one table.
    async fn commit(&self, request: CommitRequest) -> Result<(), CoordinatorError>;

    /// Returns the unbackfilled window in `[start, end]` (defaulting to the
    /// whole window) plus the last ratified version, or `(empty, -1)` for an
    /// unregistered table.
    async fn get_commits(
        &self,
        table_id: Uuid,
        table_uri: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<GetCommitsResponse, CoordinatorError>;

    /// Explicitly registers a table. A no-op if it is already registered
    /// under the same URI; fails with `InvalidTargetTable` if it is already
    /// registered under a different one.
    async fn register_table(
        &self,
        table_id: Uuid,
        table_uri: &str,
    ) -> Result<(), CoordinatorError>;

    /// Whether `other` is the same logical coordinator as `self`. Used by
    /// callers deciding whether to reuse a connection when table
    /// configuration changes reference the "same" coordinator.
    fn is_equivalent_to(&self, other: &dyn CommitCoordinatorClient) -> bool;

    /// Downcast hook backing the default `is_equivalent_to` comparisons.
    /// Implementations typically return `self`.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Compares two optional coordinator clients for semantic equality: both
/// absent, or both present and mutually declaring equivalence.
pub fn coordinators_equivalent(
    a: Option<&Arc<dyn CommitCoordinatorClient>>,
    b: Option<&Arc<dyn CommitCoordinatorClient>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_equivalent_to(b.as_ref()),
        _ => false,
    }
}

/// Read-only introspection snapshot. Never consulted by `commit`/`get_commits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub registered_tables: usize,
}

/// The reference in-memory commit coordinator: volatile by design, used both
/// for testing and as a template for network-backed implementations.
pub struct InMemoryCommitCoordinatorClient {
    id: Uuid,
    ledgers: DashMap<Uuid, Arc<TableLedger>>,
    max_unbackfilled: usize,
    faults: FaultInjection,
}

impl fmt::Debug for InMemoryCommitCoordinatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCommitCoordinatorClient")
            .field("id", &self.id)
            .field("registered_tables", &self.ledgers.len())
            .field("max_unbackfilled", &self.max_unbackfilled)
            .finish()
    }
}

impl Default for InMemoryCommitCoordinatorClient {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNBACKFILLED)
    }
}

impl InMemoryCommitCoordinatorClient {
    pub fn new(max_unbackfilled: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledgers: DashMap::new(),
            max_unbackfilled,
            faults: FaultInjection::default(),
        }
    }

    /// Arms (or disarms) the one-shot `throw_before_commit` fault. Consulted
    /// after the URI and limit checks, before the commit is appended.
    pub fn set_throw_before_commit(&self, value: bool) {
        self.faults.set_throw_before_commit(value);
    }

    /// Arms (or disarms) the one-shot `throw_after_commit` fault. Consulted
    /// after the commit is appended, before any backfill trim.
    pub fn set_throw_after_commit(&self, value: bool) {
        self.faults.set_throw_after_commit(value);
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            registered_tables: self.ledgers.len(),
        }
    }

    fn ledger_for(&self, table_id: Uuid) -> Option<Arc<TableLedger>> {
        self.ledgers.get(&table_id).map(|entry| Arc::clone(entry.value()))
    }
}

#[async_trait]
impl CommitCoordinatorClient for InMemoryCommitCoordinatorClient {
    #[instrument(level = "debug", skip(self, request), fields(table_id = %request.table_id))]
    async fn commit(&self, request: CommitRequest) -> Result<(), CoordinatorError> {
        if request.commit.is_none() && request.last_known_backfilled_version.is_none() {
            return Err(CoordinatorError::InvalidArgument(
                "commit request must carry a commit payload, a backfill acknowledgement, or both"
                    .to_string(),
            ));
        }

        if request.commit.is_some() {
            self.ledgers
                .entry(request.table_id)
                .or_insert_with(|| Arc::new(TableLedger::new(request.table_uri.clone())));
        }

        let ledger = self.ledger_for(request.table_id).ok_or_else(|| {
            CoordinatorError::InvalidArgument(format!(
                "table `{}` is not registered and the request carries no commit payload",
                request.table_id
            ))
        })?;

        ledger.commit(&request, &self.faults, self.max_unbackfilled)
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_commits(
        &self,
        table_id: Uuid,
        table_uri: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<GetCommitsResponse, CoordinatorError> {
        let Some(ledger) = self.ledger_for(table_id) else {
            return Ok(GetCommitsResponse::empty());
        };

        if ledger.table_uri() != table_uri {
            warn!(
                %table_id,
                expected = ledger.table_uri(),
                actual = table_uri,
                "get_commits targeted the wrong table uri"
            );
            return Err(CoordinatorError::InvalidTargetTable {
                table_id,
                expected: ledger.table_uri().to_string(),
                actual: table_uri.to_string(),
            });
        }

        let (commits, last_ratified_version) = ledger.get_commits(start, end);
        Ok(GetCommitsResponse {
            commits,
            last_ratified_version,
        })
    }

    async fn register_table(
        &self,
        table_id: Uuid,
        table_uri: &str,
    ) -> Result<(), CoordinatorError> {
        match self.ledgers.entry(table_id) {
            Entry::Occupied(entry) => {
                if entry.get().table_uri() == table_uri {
                    Ok(())
                } else {
                    warn!(
                        %table_id,
                        expected = entry.get().table_uri(),
                        actual = table_uri,
                        "register_table targeted an already-registered table under a different uri"
                    );
                    Err(CoordinatorError::InvalidTargetTable {
                        table_id,
                        expected: entry.get().table_uri().to_string(),
                        actual: table_uri.to_string(),
                    })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(TableLedger::new(table_uri.to_string())));
                Ok(())
            }
        }
    }

    fn is_equivalent_to(&self, other: &dyn CommitCoordinatorClient) -> bool {
        other
            .as_any()
            .downcast_ref::<InMemoryCommitCoordinatorClient>()
            .map(|other| other.id == self.id)
            .unwrap_or(false)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
