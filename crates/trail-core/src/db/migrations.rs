//! Versioned schema migrations driven by `PRAGMA user_version`.
//!
//! Each migration runs inside the single transaction that also bumps the
//! version pragma, so a crash mid-migration leaves the database at the
//! previous version with no partial DDL visible.

use crate::db::schema;
use rusqlite::Connection;

/// Schema version this build of the crate expects.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Ordered migration scripts, one per version step.
const MIGRATIONS: &[(u32, &str)] = &[
    (1, schema::MIGRATION_V1_SQL),
    (2, schema::MIGRATION_V2_SQL),
];

/// Read the database's current schema version.
///
/// # Errors
///
/// Fails on I/O errors or a `user_version` outside `u32` range.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    u32::try_from(version).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            Box::new(e),
        )
    })
}

/// Apply all pending migrations.
///
/// Safe to call on every open; a database already at
/// [`LATEST_SCHEMA_VERSION`] is left untouched.
///
/// # Errors
///
/// Fails if a migration script cannot be applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
    let current = current_schema_version(conn)?;

    for &(version, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::debug!(version, "applied schema migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_object_exists(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [kind, name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[test]
    fn fresh_database_migrates_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);
        for table in ["tasks", "task_relations", "task_history"] {
            assert!(sqlite_object_exists(&conn, "table", table)?, "missing {table}");
        }
        for index in schema::REQUIRED_INDEXES {
            assert!(sqlite_object_exists(&conn, "index", index)?, "missing {index}");
        }
        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        migrate(&mut conn)?;
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn partial_version_applies_only_pending_steps() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        let tx = conn.transaction()?;
        tx.execute_batch(schema::MIGRATION_V1_SQL)?;
        tx.pragma_update(None, "user_version", 1)?;
        tx.commit()?;

        migrate(&mut conn)?;
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);
        assert!(sqlite_object_exists(&conn, "index", "idx_task_history_position")?);
        Ok(())
    }
}
