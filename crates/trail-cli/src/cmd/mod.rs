//! Command handlers, one module per subcommand surface.

pub mod create;
pub mod log;
pub mod relate;
pub mod set;
pub mod snapshot;
pub mod verify;

use anyhow::Context;
use std::path::Path;
use tracing::debug;
use trail_core::entry::ChangeType;
use trail_core::{HistoryEntry, SqliteHistory};

/// Open the trail database, creating and migrating it as needed.
pub(crate) fn open_store(db: &Path) -> anyhow::Result<SqliteHistory> {
    let store =
        SqliteHistory::open(db).with_context(|| format!("open trail database {}", db.display()))?;
    debug!(path = %db.display(), "opened trail database");
    Ok(store)
}

/// One-line human description of what an entry recorded.
pub(crate) fn describe(entry: &HistoryEntry) -> String {
    match entry.change_type {
        ChangeType::EntityCreated => "created".to_string(),
        ChangeType::FieldUpdated => format!(
            "{}: {} -> {}",
            entry
                .field_name
                .map_or_else(|| "?".to_string(), |f| f.to_string()),
            entry
                .old_value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            entry
                .new_value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
        ),
        ChangeType::RelationAdded | ChangeType::RelationRemoved => format!(
            "{}{} {}",
            if entry.change_type == ChangeType::RelationAdded {
                '+'
            } else {
                '-'
            },
            entry
                .relation_kind
                .map_or_else(|| "?".to_string(), |k| k.to_string()),
            entry.related_id.as_deref().unwrap_or("?"),
        ),
    }
}
