//! Paginated, filterable read API over the history ledger.
//!
//! Listing follows audit-trail consumption order: most recent first,
//! descending by `(changed_at_us, sequence)`. Filters are conjunctive, and
//! an incompatible combination (for example `field_name` together with a
//! relation `change_type`) yields an empty page rather than an error.
//!
//! Authorization is the caller's concern: this service assumes the caller
//! was already cleared to view the entity's history.

use crate::entry::{ChangeType, FieldName, HistoryEntry};
use crate::error::{HistoryError, Result};
use crate::model::TaskSummary;
use crate::store::{CurrentState, HistoryFilter, HistoryStore};
use serde::Serialize;

/// Largest allowed page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page size when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// A validated history listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub entity_id: String,
    pub change_type: Option<ChangeType>,
    pub field_name: Option<FieldName>,
    pub limit: u32,
    pub offset: u32,
}

impl HistoryQuery {
    /// A query for an entity's full history with default pagination.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            change_type: None,
            field_name: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }

    /// Check pagination bounds.
    ///
    /// # Errors
    ///
    /// `Validation` if `limit` is zero or exceeds [`MAX_PAGE_LIMIT`].
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(HistoryError::validation("limit must be at least 1"));
        }
        if self.limit > MAX_PAGE_LIMIT {
            return Err(HistoryError::validation(format!(
                "limit {} exceeds the maximum of {MAX_PAGE_LIMIT}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// One page of an entity's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    /// Descending `(changed_at_us, sequence)` — most recent first.
    pub entries: Vec<HistoryEntry>,
    /// Size of the filtered set at query time. Not linearizable with
    /// concurrent writers: a write landing mid-query may not be counted.
    pub total_count: u64,
    /// Identity of the entity whose history this is.
    pub entity_summary: TaskSummary,
}

/// List one page of an entity's history.
///
/// # Errors
///
/// `Validation` for bad pagination bounds, `NotFound` if the entity has no
/// live row, storage errors pass through.
pub fn list_history<S: HistoryStore + CurrentState + ?Sized>(
    store: &S,
    query: &HistoryQuery,
) -> Result<HistoryPage> {
    query.validate()?;

    let live = store
        .task(&query.entity_id)?
        .ok_or_else(|| HistoryError::entity_not_found(&query.entity_id))?;

    let (entries, total_count) = store.page(&HistoryFilter {
        entity_id: query.entity_id.clone(),
        change_type: query.change_type,
        field_name: query.field_name,
        limit: query.limit,
        offset: query.offset,
    })?;

    Ok(HistoryPage {
        entries,
        total_count,
        entity_summary: TaskSummary {
            id: live.id,
            name: live.fields.name,
            created_at_us: live.created_at_us,
        },
    })
}
