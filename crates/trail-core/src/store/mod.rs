//! Storage abstraction for the history ledger.
//!
//! The replay engine and query service are written against [`HistoryStore`],
//! an abstract ordered-entry interface, so reconstruction is a pure function
//! of whatever entries the store yields — unit tests feed synthetic
//! sequences through [`memory::MemoryHistory`] while production reads go
//! through the SQLite store in [`crate::db`].
//!
//! Stores must uphold the ledger invariants:
//! - entries for one entity are totally ordered by `(changed_at_us, sequence)`
//! - `append` assigns positions serially per entity (no colliding sequences)
//! - entries are immutable once appended

pub mod memory;

pub use memory::MemoryHistory;

use crate::entry::{ChangeType, EntryDraft, FieldName, HistoryEntry, Position, RelationKind};
use crate::error::Result;
use crate::model::{RelationSets, TaskRecord};

/// Filter for paginated history listings.
///
/// Filters combine with AND semantics. An incompatible combination (for
/// example `field_name` together with a relation `change_type`) matches
/// nothing and yields an empty page rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    /// The entity whose history is listed.
    pub entity_id: String,
    /// Restrict to one change type.
    pub change_type: Option<ChangeType>,
    /// Restrict to `field.updated` entries for one tracked field.
    pub field_name: Option<FieldName>,
    /// Page size (validated by the query service).
    pub limit: u32,
    /// Offset into the filtered, descending-ordered set.
    pub offset: u32,
}

/// Durable, append-only, per-entity-ordered ledger of change entries.
pub trait HistoryStore {
    /// Append drafts for one entity, assigning `(changed_at_us, sequence)`
    /// positions and content-hash ids. Drafts land in argument order.
    ///
    /// The effective timestamp is `at_us`, clamped forward to the entity's
    /// last recorded timestamp so ledger order always matches append order
    /// even if the wall clock steps backwards; the sequence counter breaks
    /// same-timestamp ties.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the append fails; either all drafts are
    /// durably written or none are.
    fn append(
        &mut self,
        entity_id: &str,
        at_us: i64,
        drafts: Vec<EntryDraft>,
    ) -> Result<Vec<HistoryEntry>>;

    /// Fetch one entry by id, scoped to its owning entity.
    ///
    /// Returns `None` if the entry does not exist *or* belongs to a
    /// different entity — callers cannot read across entities by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    fn entry(&self, entity_id: &str, entry_id: &str) -> Result<Option<HistoryEntry>>;

    /// The entity's most recent entry, if any history exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    fn latest(&self, entity_id: &str) -> Result<Option<HistoryEntry>>;

    /// Ascending prefix of all entries with position ≤ `up_to`.
    ///
    /// Returns at most `cap + 1` entries so callers can detect an
    /// over-budget prefix without fetching unbounded history.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    fn entries_up_to(&self, entity_id: &str, up_to: Position, cap: usize)
        -> Result<Vec<HistoryEntry>>;

    /// Ascending prefix of relation entries for one kind with position ≤
    /// `up_to`. Scans only this entity's entries of this kind, never
    /// unrelated entities. Same `cap + 1` contract as [`Self::entries_up_to`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    fn relation_entries_up_to(
        &self,
        entity_id: &str,
        kind: RelationKind,
        up_to: Position,
        cap: usize,
    ) -> Result<Vec<HistoryEntry>>;

    /// One descending page of filtered entries plus the filtered total count.
    ///
    /// The count is taken in the same read but is not linearizable with
    /// concurrent writers; it may lag a write that lands between the page
    /// scan and the count.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn page(&self, filter: &HistoryFilter) -> Result<(Vec<HistoryEntry>, u64)>;
}

/// Read access to the authoritative live state the ledger audits.
///
/// Hot-path reads come from here; history is replayed only for historical
/// queries and round-trip verification.
pub trait CurrentState {
    /// The live task row, or `None` if the entity does not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    fn task(&self, entity_id: &str) -> Result<Option<TaskRecord>>;

    /// Live relation membership for the entity (empty sets when none).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    fn relations(&self, entity_id: &str) -> Result<RelationSets>;
}

/// Whether an entry matches a conjunctive filter (entity scoping excluded).
///
/// Shared by the in-memory store and tests; the SQLite store expresses the
/// same predicate in its WHERE clause.
#[must_use]
pub fn matches_filter(entry: &HistoryEntry, filter: &HistoryFilter) -> bool {
    if let Some(ct) = filter.change_type {
        if entry.change_type != ct {
            return false;
        }
    }
    if let Some(fname) = filter.field_name {
        if entry.change_type != ChangeType::FieldUpdated || entry.field_name != Some(fname) {
            return false;
        }
    }
    true
}
