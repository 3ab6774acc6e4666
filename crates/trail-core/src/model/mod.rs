//! Live task model: the current-state record the history ledger audits.

pub mod task;

pub use task::{Priority, RelationSets, TaskFields, TaskRecord, TaskSummary};
