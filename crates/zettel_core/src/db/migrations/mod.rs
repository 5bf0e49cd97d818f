//! Embedded schema for the note graph.
//!
//! - `0001_notes.sql`: notes keyed by uuid with a unique slug, plus the
//!   `tags`/`note_tags` tag set.
//! - `0002_note_links.sql`: `note_links` edges. A deleted source cascades its
//!   links away; a deleted target turns its inbound links back into orphans.
//!
//! # Invariants
//! - Versions are dense and strictly increasing, starting at 1.
//! - Every pending step runs in a single transaction, and `PRAGMA
//!   user_version` is bumped after each one inside it.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "notes",
        sql: include_str!("0001_notes.sql"),
    },
    SchemaStep {
        version: 2,
        name: "note_links",
        sql: include_str!("0002_note_links.sql"),
    },
];

/// Schema version a fully migrated graph database reports.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Runs the schema steps this database has not seen yet.
///
/// A database written by a newer zettel build is refused untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    for step in pending {
        info!(
            "event=db_migrate module=db status=ok from_version={} version={} name={}",
            found, step.version, step.name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, SCHEMA_STEPS};

    #[test]
    fn versions_are_dense_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
        assert_eq!(latest_version() as usize, SCHEMA_STEPS.len());
    }
}
