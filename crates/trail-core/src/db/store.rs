//! SQLite-backed history store and transactional change recorder.
//!
//! [`SqliteHistory`] owns one connection over both sources of truth: the
//! live `tasks`/`task_relations` rows and the `task_history` ledger. Every
//! mutator appends its ledger entries inside the same transaction as the
//! live-row write, so the audit trail can never observe a mutation the
//! live state did not, or vice versa.

use crate::db;
use crate::entry::{
    canonicalize_json, ChangeType, EntryDraft, FieldName, HistoryEntry, Position, RelationKind,
};
use crate::error::{HistoryError, Result};
use crate::model::{Priority, RelationSets, TaskFields, TaskRecord};
use crate::record::{self, RelationDelta};
use crate::store::{CurrentState, HistoryFilter, HistoryStore};
use anyhow::Context;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

const ENTRY_COLUMNS: &str = "entry_id, task_id, changed_at_us, sequence, change_type, \
     field_name, relation_kind, related_id, old_value, new_value, actor_id, metadata";

const TASK_COLUMNS: &str = "task_id, name, description, priority, completed, start_date_us, \
     end_date_us, estimation_points, list_id, created_at_us, updated_at_us";

/// Durable history store over a single SQLite database.
#[derive(Debug)]
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Open (or create) the database at `path`, migrated to the latest
    /// schema.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened, configured, or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_trail(path)?,
        })
    }

    /// A fresh in-memory database, migrated. Used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Fails if the in-memory database cannot be created or migrated.
    pub fn in_memory() -> anyhow::Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory database")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enable foreign keys")?;
        db::migrations::migrate(&mut conn).context("apply trail migrations")?;
        Ok(Self { conn })
    }

    /// Create a task and record its `entity.created` entry, atomically.
    ///
    /// # Errors
    ///
    /// `Validation` if the id is already taken; storage errors pass through.
    pub fn create_task(
        &mut self,
        entity_id: &str,
        fields: TaskFields,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<HistoryEntry> {
        let tx = self.conn.transaction()?;
        if fetch_task(&tx, entity_id)?.is_some() {
            return Err(HistoryError::validation(format!(
                "task '{entity_id}' already exists"
            )));
        }

        // The live row must exist before its first ledger entry: the
        // ledger's task_id foreign key points at it.
        tx.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)"),
            params![
                entity_id,
                fields.name,
                fields.description,
                fields.priority.map(Priority::as_str),
                fields.completed,
                fields.start_date_us,
                fields.end_date_us,
                fields.estimation_points,
                fields.list_id,
                at_us,
            ],
        )?;

        let draft = record::creation_draft(&fields, actor_id, None);
        let mut written = append_entries(&tx, entity_id, at_us, vec![draft])?;
        let entry = written
            .pop()
            .ok_or_else(|| HistoryError::validation("creation produced no entry"))?;
        tx.commit()?;
        Ok(entry)
    }

    /// Apply a scalar mutation, recording one entry per changed field in the
    /// same transaction. A no-op diff writes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist; storage errors pass through.
    pub fn update_task(
        &mut self,
        entity_id: &str,
        post: TaskFields,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<Vec<HistoryEntry>> {
        let tx = self.conn.transaction()?;
        let pre = fetch_task(&tx, entity_id)?
            .ok_or_else(|| HistoryError::entity_not_found(entity_id))?;

        let drafts = record::field_diffs(&pre.fields, &post, actor_id);
        if drafts.is_empty() {
            return Ok(vec![]);
        }

        let written = append_entries(&tx, entity_id, at_us, drafts)?;
        let updated_at_us = written.last().map_or(at_us, |e| e.changed_at_us);
        tx.execute(
            "UPDATE tasks SET name = ?2, description = ?3, priority = ?4, completed = ?5,
                start_date_us = ?6, end_date_us = ?7, estimation_points = ?8, list_id = ?9,
                updated_at_us = ?10
             WHERE task_id = ?1",
            params![
                entity_id,
                post.name,
                post.description,
                post.priority.map(Priority::as_str),
                post.completed,
                post.start_date_us,
                post.end_date_us,
                post.estimation_points,
                post.list_id,
                updated_at_us,
            ],
        )?;
        tx.commit()?;
        Ok(written)
    }

    /// Apply a relation delta, recording one entry per added/removed id in
    /// the same transaction. An empty delta writes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist; storage errors pass through.
    pub fn apply_relations(
        &mut self,
        entity_id: &str,
        kind: RelationKind,
        delta: &RelationDelta,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<Vec<HistoryEntry>> {
        let tx = self.conn.transaction()?;
        if fetch_task(&tx, entity_id)?.is_none() {
            return Err(HistoryError::entity_not_found(entity_id));
        }
        if delta.is_empty() {
            return Ok(vec![]);
        }

        let drafts = record::relation_diffs(kind, delta, actor_id);
        let written = append_entries(&tx, entity_id, at_us, drafts)?;

        for related_id in &delta.removed {
            tx.execute(
                "DELETE FROM task_relations WHERE task_id = ?1 AND kind = ?2 AND related_id = ?3",
                params![entity_id, kind.as_str(), related_id],
            )?;
        }
        let created_at_us = written.first().map_or(at_us, |e| e.changed_at_us);
        for related_id in &delta.added {
            tx.execute(
                "INSERT OR IGNORE INTO task_relations (task_id, kind, related_id, created_at_us)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, kind.as_str(), related_id, created_at_us],
            )?;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Delete a task; its relations and ledger entries cascade with it.
    ///
    /// Deletion is the one mutation that records nothing — there is no
    /// entity left to own the entry. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Storage errors pass through.
    pub fn delete_task(&mut self, entity_id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute("DELETE FROM tasks WHERE task_id = ?1", params![entity_id])?;
        tx.commit()?;
        Ok(affected > 0)
    }
}

impl HistoryStore for SqliteHistory {
    fn append(
        &mut self,
        entity_id: &str,
        at_us: i64,
        drafts: Vec<EntryDraft>,
    ) -> Result<Vec<HistoryEntry>> {
        let tx = self.conn.transaction()?;
        let written = append_entries(&tx, entity_id, at_us, drafts)?;
        tx.commit()?;
        Ok(written)
    }

    fn entry(&self, entity_id: &str, entry_id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM task_history WHERE task_id = ?1 AND entry_id = ?2"),
                params![entity_id, entry_id],
                entry_from_row,
            )
            .optional()?)
    }

    fn latest(&self, entity_id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM task_history WHERE task_id = ?1
                     ORDER BY changed_at_us DESC, sequence DESC LIMIT 1"
                ),
                params![entity_id],
                entry_from_row,
            )
            .optional()?)
    }

    fn entries_up_to(
        &self,
        entity_id: &str,
        up_to: Position,
        cap: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM task_history
             WHERE task_id = ?1
               AND (changed_at_us < ?2 OR (changed_at_us = ?2 AND sequence <= ?3))
             ORDER BY changed_at_us ASC, sequence ASC
             LIMIT ?4"
        ))?;
        let rows = stmt.query_map(
            params![
                entity_id,
                up_to.changed_at_us,
                sequence_param(up_to.sequence),
                overflow_limit(cap),
            ],
            entry_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn relation_entries_up_to(
        &self,
        entity_id: &str,
        kind: RelationKind,
        up_to: Position,
        cap: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM task_history
             WHERE task_id = ?1 AND relation_kind = ?2
               AND (changed_at_us < ?3 OR (changed_at_us = ?3 AND sequence <= ?4))
             ORDER BY changed_at_us ASC, sequence ASC
             LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            params![
                entity_id,
                kind.as_str(),
                up_to.changed_at_us,
                sequence_param(up_to.sequence),
                overflow_limit(cap),
            ],
            entry_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn page(&self, filter: &HistoryFilter) -> Result<(Vec<HistoryEntry>, u64)> {
        // Mirrors crate::store::matches_filter in SQL.
        let change_type = filter.change_type.map(ChangeType::as_str);
        let field_name = filter.field_name.map(FieldName::as_str);
        let field_type = ChangeType::FieldUpdated.as_str();

        let mut conditions = String::from("task_id = ?1");
        let mut bound: Vec<&dyn ToSql> = vec![&filter.entity_id];
        if let Some(ct) = &change_type {
            bound.push(ct);
            conditions.push_str(&format!(" AND change_type = ?{}", bound.len()));
        }
        if let Some(fname) = &field_name {
            bound.push(&field_type);
            conditions.push_str(&format!(" AND change_type = ?{}", bound.len()));
            bound.push(fname);
            conditions.push_str(&format!(" AND field_name = ?{}", bound.len()));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM task_history WHERE {conditions}"),
            bound.as_slice(),
            |row| row.get(0),
        )?;

        let limit = i64::from(filter.limit);
        bound.push(&limit);
        let limit_index = bound.len();
        let offset = i64::from(filter.offset);
        bound.push(&offset);
        let offset_index = bound.len();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM task_history
             WHERE {conditions}
             ORDER BY changed_at_us DESC, sequence DESC
             LIMIT ?{limit_index} OFFSET ?{offset_index}"
        ))?;
        let rows = stmt.query_map(bound.as_slice(), entry_from_row)?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((entries, u64::try_from(total).unwrap_or(0)))
    }
}

impl CurrentState for SqliteHistory {
    fn task(&self, entity_id: &str) -> Result<Option<TaskRecord>> {
        fetch_task(&self.conn, entity_id)
    }

    fn relations(&self, entity_id: &str) -> Result<RelationSets> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, related_id FROM task_relations WHERE task_id = ?1")?;
        let rows = stmt.query_map(params![entity_id], |row| {
            let kind: String = row.get(0)?;
            let related_id: String = row.get(1)?;
            Ok((kind, related_id))
        })?;

        let mut sets = RelationSets::default();
        for row in rows {
            let (kind, related_id) = row?;
            let kind: RelationKind = parse_text_column(0, &kind)?;
            sets.get_mut(kind).insert(related_id);
        }
        Ok(sets)
    }
}

/// Append drafts inside an open transaction, assigning positions.
///
/// Timestamp clamping and sequence assignment follow the ledger-order
/// contract of [`HistoryStore::append`]; the `UNIQUE (task_id, sequence)`
/// constraint backstops any write that slips past transaction serialization.
fn append_entries(
    conn: &Connection,
    entity_id: &str,
    at_us: i64,
    drafts: Vec<EntryDraft>,
) -> Result<Vec<HistoryEntry>> {
    let (mut next_seq, changed_at_us) = last_position(conn, entity_id)?
        .map_or((0, at_us), |last| {
            (last.sequence + 1, at_us.max(last.changed_at_us))
        });

    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO task_history ({ENTRY_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))?;

    let mut written = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let entry = draft.into_entry(
            entity_id,
            Position {
                changed_at_us,
                sequence: next_seq,
            },
        );
        next_seq += 1;

        stmt.execute(params![
            entry.id,
            entry.entity_id,
            entry.changed_at_us,
            i64::try_from(entry.sequence)
                .map_err(|_| HistoryError::validation("sequence counter overflow"))?,
            entry.change_type.as_str(),
            entry.field_name.map(FieldName::as_str),
            entry.relation_kind.map(RelationKind::as_str),
            entry.related_id,
            entry.old_value.as_ref().map(canonicalize_json),
            entry.new_value.as_ref().map(canonicalize_json),
            entry.actor_id,
            entry.metadata.as_ref().map(canonicalize_json),
        ])?;
        written.push(entry);
    }
    Ok(written)
}

fn last_position(conn: &Connection, entity_id: &str) -> Result<Option<Position>> {
    Ok(conn
        .query_row(
            "SELECT changed_at_us, sequence FROM task_history WHERE task_id = ?1
             ORDER BY changed_at_us DESC, sequence DESC LIMIT 1",
            params![entity_id],
            |row| {
                let changed_at_us: i64 = row.get(0)?;
                let sequence: i64 = row.get(1)?;
                Ok(Position {
                    changed_at_us,
                    sequence: u64::try_from(sequence).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e))
                    })?,
                })
            },
        )
        .optional()?)
}

fn fetch_task(conn: &Connection, entity_id: &str) -> Result<Option<TaskRecord>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"),
            params![entity_id],
            |row| {
                let priority: Option<String> = row.get(3)?;
                let priority = priority
                    .as_deref()
                    .map(|raw| parse_text_column::<Priority>(3, raw))
                    .transpose()?;
                Ok(TaskRecord {
                    id: row.get(0)?,
                    fields: TaskFields {
                        name: row.get(1)?,
                        description: row.get(2)?,
                        priority,
                        completed: row.get(4)?,
                        start_date_us: row.get(5)?,
                        end_date_us: row.get(6)?,
                        estimation_points: row.get(7)?,
                        list_id: row.get(8)?,
                    },
                    created_at_us: row.get(9)?,
                    updated_at_us: row.get(10)?,
                })
            },
        )
        .optional()?)
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let sequence: i64 = row.get(3)?;
    let change_type: String = row.get(4)?;
    let field_name: Option<String> = row.get(5)?;
    let relation_kind: Option<String> = row.get(6)?;

    Ok(HistoryEntry {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        changed_at_us: row.get(2)?,
        sequence: u64::try_from(sequence).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(e))
        })?,
        change_type: parse_text_column(4, &change_type)?,
        field_name: field_name
            .as_deref()
            .map(|raw| parse_text_column(5, raw))
            .transpose()?,
        relation_kind: relation_kind
            .as_deref()
            .map(|raw| parse_text_column(6, raw))
            .transpose()?,
        related_id: row.get(7)?,
        old_value: parse_json_column(row, 8)?,
        new_value: parse_json_column(row, 9)?,
        actor_id: row.get(10)?,
        metadata: parse_json_column(row, 11)?,
    })
}

fn parse_text_column<T: FromStr>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.as_deref()
        .map(|text| {
            serde_json::from_str(text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

/// Bind value for an inclusive sequence bound; saturates at `i64::MAX`.
fn sequence_param(sequence: u64) -> i64 {
    i64::try_from(sequence).unwrap_or(i64::MAX)
}

/// `LIMIT` bind value for the `cap + 1` overflow-detection contract.
fn overflow_limit(cap: usize) -> i64 {
    i64::try_from(cap.saturating_add(1)).unwrap_or(i64::MAX)
}
