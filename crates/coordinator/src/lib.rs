//! In-memory commit coordinator for Delta tables using coordinated commits.
//!
//! A commit coordinator mediates concurrent writes to a table: it assigns
//! contiguous, monotonically increasing version numbers to commits, holds a
//! bounded window of *unbackfilled* commits in memory until an external
//! process materializes them as files in the table's `_delta_log`, and
//! serves readers a consistent view of recent commits.
//!
//! This crate implements the coordinator state machine only. The table
//! format (log file naming, action schemas, protocol semantics), the
//! storage layer that actually writes commit files, and any query-engine
//! integration are external collaborators — this crate only defines the
//! interfaces it exchanges with them.
//!
//! ```text
//!  writer ──commit()──▶ Coordinator ──▶ TableLedger (per table_id)
//!                            │                │
//!                      register()        write lock, append,
//!                            │            validate invariants
//!  reader ──get_commits()────┘                │
//!                                         read lock, filter
//!                                         unbackfilled window
//! ```
//!
//! State is volatile by design: this is a reference implementation used both
//! for testing and as a template for network-backed coordinators. It
//! provides no durability, no cross-process coordination, no
//! authentication, no garbage collection of historical commit files, and no
//! schema evolution.

mod coordinator;
mod error;
mod fault;
mod ledger;
mod record;
mod registry;
mod requests;

pub use coordinator::{
    coordinators_equivalent, CommitCoordinatorClient, CoordinatorStats,
    InMemoryCommitCoordinatorClient, DEFAULT_MAX_UNBACKFILLED,
};
pub use error::{CoordinatorError, RegistryError};
pub use record::{CommitRecordView, FileDescriptor};
pub use registry::{
    CatalogCommitCoordinatorBuilder, CatalogContext, CommitCoordinatorBuilder, CoordinatorRegistry,
    IN_MEMORY_BUILDER_NAME,
};
pub use requests::{CommitPayload, CommitRequest, GetCommitsResponse};
