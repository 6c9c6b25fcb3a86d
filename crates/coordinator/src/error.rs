//! Error taxonomy for the commit coordinator and its registries.

use uuid::Uuid;

/// Errors raised by [`crate::CommitCoordinatorClient`] operations.
///
/// Validation errors (`InvalidArgument`, `InvalidTargetTable`) are raised
/// without touching any ledger state. `IoFailure` is the only variant that
/// may leave a ledger partially mutated — see [`IoFailure::after_append`][Self::IoFailure]
/// and the fault-injection hooks on `InMemoryCommitCoordinatorClient`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// A required field was missing, or the request shape was otherwise
    /// inconsistent (e.g. neither a commit payload nor a backfill
    /// acknowledgement was present).
    #[error("invalid commit request: {0}")]
    InvalidArgument(String),

    /// The request's `table_uri` does not match the URI the table was
    /// registered under.
    #[error("table `{table_id}` was registered under `{expected}`, but the request targets `{actual}`")]
    InvalidTargetTable {
        table_id: Uuid,
        expected: String,
        actual: String,
    },

    /// The ledger's unbackfilled window is full; the caller should retry
    /// after backfill progress has been reported.
    #[error("table `{table_id}` has reached its unbackfilled commit limit of {limit}")]
    CommitLimitReached { table_id: Uuid, limit: usize },

    /// The request's version did not match the version the ledger expected
    /// next. `retryable` is true iff the caller's version was behind the
    /// expected version (the caller can catch up and retry); both `conflict`
    /// and `retryable` are always equal.
    #[error("commit conflict on table `{table_id}`: attempted version {attempted}, expected {expected}")]
    CommitConflict {
        table_id: Uuid,
        attempted: i64,
        expected: i64,
        conflict: bool,
        retryable: bool,
    },

    /// A fault-injection flag was observed set and has now been cleared.
    /// `after_append` distinguishes whether the commit was durably appended
    /// before the failure was raised.
    #[error("coordinator io failure on table `{table_id}`: {message}")]
    IoFailure {
        table_id: Uuid,
        message: String,
        after_append: bool,
    },

    /// The ledger has been disowned (its last commit carries `is_disown`)
    /// and no longer accepts commits.
    #[error("table `{0}` has been disowned and no longer accepts commits")]
    TableDisowned(Uuid),
}

impl CoordinatorError {
    /// Whether a caller may usefully retry the request that produced this
    /// error without any intervening state change on their part.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoordinatorError::CommitLimitReached { .. } => true,
            CoordinatorError::CommitConflict { retryable, .. } => *retryable,
            CoordinatorError::IoFailure { after_append, .. } => !after_append,
            CoordinatorError::InvalidArgument(_)
            | CoordinatorError::InvalidTargetTable { .. }
            | CoordinatorError::TableDisowned(_) => false,
        }
    }
}

/// Errors raised at the registry boundary. Never touches ledger state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A builder is already registered under this name/catalog.
    #[error("a coordinator builder is already registered for `{0}`")]
    AlreadyRegistered(String),

    /// No builder is registered under this name/catalog.
    #[error("no coordinator builder registered for `{0}`")]
    UnknownCoordinator(String),

    /// The builder was found but failed to produce a client.
    #[error("failed to build coordinator `{name}`: {source}")]
    BuildFailed { name: String, source: String },
}
