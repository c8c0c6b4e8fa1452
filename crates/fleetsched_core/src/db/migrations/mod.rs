//! Task store schema steps and the executor that applies them.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - All pending steps run in one transaction; `PRAGMA user_version` moves
//!   only with a committed step.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "task_documents",
    sql: include_str!("0001_init.sql"),
}];

/// Where a connection's schema stands relative to this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current: u32,
    pub latest: u32,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.current == self.latest
    }

    pub fn pending(&self) -> usize {
        SCHEMA_STEPS
            .iter()
            .filter(|step| step.version > self.current)
            .count()
    }
}

/// Latest schema version this binary can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the connection's schema version.
pub fn schema_status(conn: &Connection) -> DbResult<SchemaStatus> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(SchemaStatus {
        current,
        latest: latest_version(),
    })
}

/// Brings `conn` up to [`latest_version`].
///
/// Fails with `UnsupportedSchemaVersion` when the file was written by a
/// newer binary, and with `MigrationFailed` naming the step that broke.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let status = schema_status(conn)?;
    if status.current > status.latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: status.current,
            latest_supported: status.latest,
        });
    }
    if status.is_current() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > status.current) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::MigrationFailed {
                version: step.version,
                name: step.name,
                source,
            })?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        status.current,
        status.latest,
        status.pending()
    );
    Ok(())
}
