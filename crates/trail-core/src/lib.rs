//! Append-only change history with deterministic point-in-time snapshots.
//!
//! trail-core records every mutation to a tracked task — creation, scalar
//! field updates, and relation membership changes — as immutable ledger
//! entries, then reconstructs the task's full state as of any entry by
//! replaying the ledger prefix.
//!
//! The crate splits along the write and read paths:
//! - [`record`] computes the minimal entry drafts a mutation produces
//! - [`store`] defines the ledger and current-state traits; [`db`] is the
//!   durable SQLite implementation whose mutators append ledger entries in
//!   the same transaction as the live-row write
//! - [`replay`] folds ordered entry prefixes back into field projections,
//!   relation membership, and assembled [`replay::Snapshot`]s
//! - [`query`] serves paginated, filterable history listings
//!
//! # Conventions
//!
//! - **Errors**: library APIs return [`error::HistoryError`]; binary
//!   entry points use `anyhow::Result` with context.
//! - **Logging**: `tracing` macros; replay anomalies warn, consistency
//!   violations log at error severity and degrade instead of failing.

pub mod clock;
pub mod db;
pub mod entry;
pub mod error;
pub mod model;
pub mod query;
pub mod record;
pub mod replay;
pub mod resolve;
pub mod store;

pub use db::SqliteHistory;
pub use entry::{ChangeType, FieldName, HistoryEntry, Position, RelationKind};
pub use error::{HistoryError, Result};
pub use model::{Priority, RelationSets, TaskFields, TaskRecord, TaskSummary};
pub use query::{list_history, HistoryPage, HistoryQuery};
pub use replay::{snapshot_at, Snapshot, DEFAULT_REPLAY_CAP};
pub use store::{CurrentState, HistoryStore, MemoryHistory};
