//! Note/link store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes (with their tag sets) and link rows.
//! - Provide the point/range queries the graph service resolves against.
//!
//! # Invariants
//! - `save_note` validates before touching SQL and replaces the tag set in the
//!   same transaction as the row upsert.
//! - Slug uniqueness is checked by callers; the `UNIQUE` constraint is only a
//!   backstop.
//! - Persisted rows that fail to decode surface as `InvalidData`.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::link::{LinkId, LinkType, NoteLink};
use crate::model::note::{Note, NoteId, NoteValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    slug,
    file_path,
    created_at,
    updated_at
FROM notes";

const LINK_SELECT_SQL: &str = "SELECT
    id,
    source_note_id,
    target_slug,
    target_note_id,
    link_type,
    created_at
FROM note_links";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "notes",
        &["id", "title", "slug", "file_path", "created_at", "updated_at"],
    ),
    (
        "note_links",
        &[
            "id",
            "source_note_id",
            "target_slug",
            "target_note_id",
            "link_type",
            "created_at",
        ],
    ),
    ("tags", &["id", "name"]),
    ("note_tags", &["note_id", "tag_id"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    /// Point update targeted a link id that does not exist.
    LinkNotFound(LinkId),
    /// Connection schema is not at the migrated version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::LinkNotFound(id) => write!(f, "note link not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "note store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "note store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "note store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-level operations over notes and link rows.
pub trait NoteStore {
    /// Runs `op` inside one transaction; any error rolls everything back.
    ///
    /// When a transaction is already open, `op` joins it instead.
    fn atomically<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>;
    /// Inserts or updates a note (and its tag set) by id.
    fn save_note(&self, note: &Note) -> RepoResult<()>;
    fn get_note_by_id(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn get_note_by_slug(&self, slug: &str) -> RepoResult<Option<Note>>;
    /// All notes, newest first.
    fn get_all_notes(&self) -> RepoResult<Vec<Note>>;
    /// Deletes one source's links of one type. Returns the number removed.
    fn delete_links_from_source(&self, source_id: NoteId, link_type: LinkType)
        -> RepoResult<usize>;
    fn save_link(&self, link: &NoteLink) -> RepoResult<()>;
    /// Outgoing links of a note in insertion order, resolved and orphaned.
    fn get_links_from_source(&self, source_id: NoteId) -> RepoResult<Vec<NoteLink>>;
    /// Unresolved links whose stored target slug equals `slug`.
    fn get_orphaned_links_targeting(&self, slug: &str) -> RepoResult<Vec<NoteLink>>;
    /// Points an existing link at `target_note_id`.
    fn resolve_link(&self, link_id: LinkId, target_note_id: NoteId) -> RepoResult<()>;
    /// Links whose resolved target is `target_note_id`.
    fn get_backlinks(&self, target_note_id: NoteId) -> RepoResult<Vec<NoteLink>>;
}

/// SQLite-backed note store.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    ///
    /// Rejects connections that are not migrated to the expected schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn atomically<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        if !self.conn.is_autocommit() {
            return op(self);
        }

        // Statements issued through `self` run on the same connection, so they
        // belong to this transaction. Dropping `tx` on error rolls back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = op(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn save_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;
        let tags = normalize_tags(&note.tags);

        self.atomically(|store| {
            let note_id = note.id.to_string();
            store.conn.execute(
                "INSERT INTO notes (id, title, slug, file_path, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    slug = excluded.slug,
                    file_path = excluded.file_path,
                    updated_at = excluded.updated_at;",
                params![
                    note_id.as_str(),
                    note.title.as_str(),
                    note.slug.as_str(),
                    note.file_path.as_str(),
                    note.created_at,
                    note.updated_at,
                ],
            )?;

            store.conn.execute(
                "DELETE FROM note_tags WHERE note_id = ?1;",
                [note_id.as_str()],
            )?;
            for tag in &tags {
                store.conn.execute(
                    "INSERT OR IGNORE INTO tags (name) VALUES (?1);",
                    [tag.as_str()],
                )?;
                store.conn.execute(
                    "INSERT OR IGNORE INTO note_tags (note_id, tag_id)
                     SELECT ?1, id
                     FROM tags
                     WHERE name = ?2 COLLATE NOCASE;",
                    params![note_id.as_str(), tag.as_str()],
                )?;
            }
            Ok(())
        })
    }

    fn get_note_by_id(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.query_one_note(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"), &id.to_string())
    }

    fn get_note_by_slug(&self, slug: &str) -> RepoResult<Option<Note>> {
        self.query_one_note(&format!("{NOTE_SELECT_SQL} WHERE slug = ?1;"), slug)
    }

    fn get_all_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY created_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(self.parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_links_from_source(
        &self,
        source_id: NoteId,
        link_type: LinkType,
    ) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM note_links WHERE source_note_id = ?1 AND link_type = ?2;",
            params![source_id.to_string(), link_type.as_str()],
        )?;
        Ok(removed)
    }

    fn save_link(&self, link: &NoteLink) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO note_links (
                id,
                source_note_id,
                target_slug,
                target_note_id,
                link_type,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                link.id.to_string(),
                link.source_note_id.to_string(),
                link.target_slug.as_str(),
                link.target_note_id.map(|id| id.to_string()),
                link.link_type.as_str(),
                link.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_links_from_source(&self, source_id: NoteId) -> RepoResult<Vec<NoteLink>> {
        query_links(
            self.conn,
            &format!(
                "{LINK_SELECT_SQL}
                 WHERE source_note_id = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            &source_id.to_string(),
        )
    }

    fn get_orphaned_links_targeting(&self, slug: &str) -> RepoResult<Vec<NoteLink>> {
        query_links(
            self.conn,
            &format!(
                "{LINK_SELECT_SQL}
                 WHERE target_note_id IS NULL
                   AND target_slug = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            slug,
        )
    }

    fn resolve_link(&self, link_id: LinkId, target_note_id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE note_links SET target_note_id = ?2 WHERE id = ?1;",
            params![link_id.to_string(), target_note_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::LinkNotFound(link_id));
        }
        Ok(())
    }

    fn get_backlinks(&self, target_note_id: NoteId) -> RepoResult<Vec<NoteLink>> {
        query_links(
            self.conn,
            &format!(
                "{LINK_SELECT_SQL}
                 WHERE target_note_id = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            &target_note_id.to_string(),
        )
    }
}

impl SqliteNoteStore<'_> {
    fn query_one_note(&self, sql: &str, key: &str) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.parse_note_row(row)?)),
            None => Ok(None),
        }
    }

    fn parse_note_row(&self, row: &Row<'_>) -> RepoResult<Note> {
        let id_text: String = row.get("id")?;
        let id = parse_uuid(&id_text, "notes.id")?;
        Ok(Note {
            id,
            title: row.get("title")?,
            slug: row.get("slug")?,
            file_path: row.get("file_path")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            tags: load_tags_for_note(self.conn, &id_text)?,
        })
    }
}

/// Normalizes one tag: trimmed and lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts a tag set.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn query_links(conn: &Connection, sql: &str, key: &str) -> RepoResult<Vec<NoteLink>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        links.push(parse_link_row(row)?);
    }
    Ok(links)
}

fn parse_link_row(row: &Row<'_>) -> RepoResult<NoteLink> {
    let id_text: String = row.get("id")?;
    let source_text: String = row.get("source_note_id")?;
    let target_note_id = match row.get::<_, Option<String>>("target_note_id")? {
        Some(value) => Some(parse_uuid(&value, "note_links.target_note_id")?),
        None => None,
    };
    let type_text: String = row.get("link_type")?;
    let link_type = LinkType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid link type `{type_text}` in note_links.link_type"
        ))
    })?;

    Ok(NoteLink {
        id: parse_uuid(&id_text, "note_links.id")?,
        source_note_id: parse_uuid(&source_text, "note_links.source_note_id")?,
        target_slug: row.get("target_slug")?,
        target_note_id,
        link_type,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn load_tags_for_note(conn: &Connection, note_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM note_tags nt
         INNER JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
