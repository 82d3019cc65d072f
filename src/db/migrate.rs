//! Schema upgrades compiled into the binary.
//!
//! Step `n` of [`SCHEMA`] takes the database from version `n` to `n + 1`;
//! the current version lives in `PRAGMA user_version`, so a fresh file is
//! version 0 and needs no bookkeeping table.

use rusqlite::Connection;

use crate::error::{Result, ReviewgraphError};

const SCHEMA: &[&str] = &[include_str!("../../migrations/001_core_tables.sql")];

/// Version a fully migrated database reports.
pub const LATEST_VERSION: u32 = SCHEMA.len() as u32;

pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database up to [`LATEST_VERSION`], returning how many steps ran.
pub fn run_migrations(conn: &mut Connection) -> Result<usize> {
    apply(conn, SCHEMA)
}

fn apply(conn: &mut Connection, steps: &[&str]) -> Result<usize> {
    let current = schema_version(conn)?;
    let latest = steps.len() as u32;
    if current > latest {
        return Err(ReviewgraphError::Config(format!(
            "Database schema version {} is newer than this build supports ({})",
            current, latest
        )));
    }

    for (index, sql) in steps.iter().enumerate().skip(current as usize) {
        let version = index as u32 + 1;
        log::info!("Upgrading schema to version {}", version);
        // DDL and the version bump commit together or not at all
        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| {
            log::error!("Schema version {} failed: {}", version, e);
            ReviewgraphError::from_sqlite(e)
        })?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }

    let ran = (latest - current) as usize;
    if ran == 0 {
        log::debug!("Schema already at version {}", latest);
    }
    Ok(ran)
}
