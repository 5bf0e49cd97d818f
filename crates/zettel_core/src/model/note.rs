//! Note domain model.
//!
//! # Invariants
//! - `slug` is derived from the title at creation and never recomputed.
//! - `file_path` is relative to the notes root and never escapes it.
//! - `updated_at >= created_at`.

use crate::model::now_epoch_ms;
use crate::wikilink::slug::{is_normalized_slug, normalize_slug};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

/// Reasons a note cannot be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    BlankTitle,
    /// Title normalizes to an empty slug.
    EmptySlug,
    /// Slug is not in canonical form.
    NonCanonicalSlug(String),
    /// File path is empty, absolute, or climbs out of the notes root.
    UnsafeFilePath(String),
    TimestampOrder { created_at: i64, updated_at: i64 },
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "note title must not be blank"),
            Self::EmptySlug => write!(f, "note title does not produce a usable slug"),
            Self::NonCanonicalSlug(slug) => write!(f, "slug `{slug}` is not normalized"),
            Self::UnsafeFilePath(path) => write!(f, "unsafe note file path `{path}`"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for NoteValidationError {}

/// A zettel note. Text lives on disk at `file_path`; this is its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub slug: String,
    /// Relative to the notes root.
    pub file_path: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    /// Normalized tag set, sorted.
    pub tags: Vec<String>,
}

impl Note {
    /// Creates a note with a fresh id, a slug derived from `title`, and both
    /// timestamps set to now.
    ///
    /// The slug may be empty for unusable titles; [`Note::validate`] rejects
    /// such notes.
    pub fn new(title: impl Into<String>, file_path: impl Into<String>) -> Self {
        let title = title.into();
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            slug: normalize_slug(&title),
            title,
            file_path: file_path.into(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    /// Bumps `updated_at` to now, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.updated_at);
    }

    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::BlankTitle);
        }
        if self.slug.is_empty() {
            return Err(NoteValidationError::EmptySlug);
        }
        if !is_normalized_slug(&self.slug) {
            return Err(NoteValidationError::NonCanonicalSlug(self.slug.clone()));
        }
        validate_relative_path(&self.file_path)?;
        if self.updated_at < self.created_at {
            return Err(NoteValidationError::TimestampOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Joins `file_path` onto `notes_root` after checking it stays inside.
pub fn resolve_note_path(
    notes_root: &Path,
    file_path: &str,
) -> Result<PathBuf, NoteValidationError> {
    validate_relative_path(file_path)?;
    Ok(notes_root.join(file_path))
}

fn validate_relative_path(file_path: &str) -> Result<(), NoteValidationError> {
    let unsafe_path = || NoteValidationError::UnsafeFilePath(file_path.to_string());
    if file_path.trim().is_empty() || file_path.contains('\0') {
        return Err(unsafe_path());
    }

    for component in Path::new(file_path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve_note_path, Note, NoteValidationError};
    use std::path::Path;

    #[test]
    fn new_note_derives_slug_from_title() {
        let note = Note::new("My Important Note", "my-important-note.md");
        assert_eq!(note.slug, "my-important-note");
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.validate().is_ok());
    }

    #[test]
    fn symbol_only_title_fails_validation() {
        let note = Note::new("!!!", "x.md");
        assert_eq!(note.validate(), Err(NoteValidationError::EmptySlug));
    }

    #[test]
    fn hand_edited_slug_must_stay_canonical() {
        let mut note = Note::new("Title", "title.md");
        note.slug = "Not Canonical".to_string();
        assert!(matches!(
            note.validate(),
            Err(NoteValidationError::NonCanonicalSlug(_))
        ));
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut note = Note::new("Title", "title.md");
        note.updated_at = i64::MAX - 1;
        note.touch();
        assert_eq!(note.updated_at, i64::MAX - 1);
    }

    #[test]
    fn note_paths_must_stay_inside_root() {
        let root = Path::new("/notes");
        assert_eq!(
            resolve_note_path(root, "daily/today.md").unwrap(),
            root.join("daily/today.md")
        );
        for bad in ["", "  ", "../escape.md", "a/../../b.md", "/etc/passwd"] {
            assert!(
                resolve_note_path(root, bad).is_err(),
                "path `{bad}` should be rejected"
            );
        }
    }
}
