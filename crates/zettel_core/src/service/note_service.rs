//! Note workflow service.
//!
//! # Responsibility
//! - Drive create/edit flows through the link graph in the required order:
//!   write the file, then save the note, rewrite its links and resolve
//!   orphans in one graph transaction.
//! - Keep file naming (`<slug>.md`) in one place.
//! - Put the body on disk back the way it was when the graph rejects it.
//!
//! # Invariants
//! - A note's slug is fixed at creation; retitling never changes it.
//! - Slug conflicts are rejected before any file is written.

use crate::files::{FsNoteFiles, NoteFiles};
use crate::model::link::NoteLink;
use crate::model::note::{resolve_note_path, Note, NoteId};
use crate::repo::note_store::{normalize_tags, NoteStore};
use crate::service::link_graph::{LinkGraphError, LinkGraphService};
use crate::wikilink::slug::normalize_slug;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const NOTE_FILE_EXTENSION: &str = "md";
// Leaves room for the extension under the common 255-byte name limit.
const MAX_FILE_STEM_BYTES: usize = 240;

/// Errors from note workflow operations.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank or normalizes to an empty slug.
    InvalidTitle(String),
    /// Tag input contains a blank value.
    InvalidTag(String),
    NoteNotFound(NoteId),
    SlugNotFound(String),
    WriteNote {
        note_id: NoteId,
        path: PathBuf,
        source: std::io::Error,
    },
    Graph(LinkGraphError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle(title) => write!(f, "invalid note title: `{title}`"),
            Self::InvalidTag(tag) => write!(f, "invalid tag: `{tag}`"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::SlugNotFound(slug) => write!(f, "no note with slug `{slug}`"),
            Self::WriteNote {
                note_id,
                path,
                source,
            } => write!(
                f,
                "failed to write note {note_id} at `{}`: {source}",
                path.display()
            ),
            Self::Graph(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WriteNote { source, .. } => Some(source),
            Self::Graph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LinkGraphError> for NoteServiceError {
    fn from(value: LinkGraphError) -> Self {
        Self::Graph(value)
    }
}

/// Note create/edit workflows on top of [`LinkGraphService`].
pub struct NoteService<S: NoteStore, F: NoteFiles = FsNoteFiles> {
    graph: LinkGraphService<S, F>,
    notes_root: PathBuf,
}

impl<S: NoteStore, F: NoteFiles> NoteService<S, F> {
    pub fn new(graph: LinkGraphService<S, F>, notes_root: impl Into<PathBuf>) -> Self {
        Self {
            graph,
            notes_root: notes_root.into(),
        }
    }

    pub fn graph(&self) -> &LinkGraphService<S, F> {
        &self.graph
    }

    pub fn notes_root(&self) -> &Path {
        &self.notes_root
    }

    /// Creates a note file and registers it in the graph.
    ///
    /// Runs the full integration order, so links written by earlier notes
    /// that already name this slug become resolved. On failure the file is
    /// removed again and no note row is left behind.
    pub fn create_note(
        &self,
        title: &str,
        body: &str,
        tags: Vec<String>,
    ) -> Result<Note, NoteServiceError> {
        let title = title.trim();
        let slug = normalize_slug(title);
        if slug.is_empty() {
            return Err(NoteServiceError::InvalidTitle(title.to_string()));
        }
        if let Some(existing) = self.graph.get_note_by_slug(&slug)? {
            return Err(LinkGraphError::SlugAlreadyExists {
                slug,
                existing_id: existing.id,
            }
            .into());
        }

        let mut note = Note::new(title, String::new());
        note.file_path = note_file_name(&note.slug, note.id);
        note.tags = validated_tags(&tags)?;

        self.write_and_commit(&note, body)?;
        info!(
            "event=note_create module=note_service status=ok note_id={}",
            note.id
        );
        self.read_back(note.id, "created note not found in read-back")
    }

    /// Replaces a note's body and re-scans its links.
    ///
    /// When the graph update fails the previous body is written back.
    pub fn update_note_body(&self, id: NoteId, body: &str) -> Result<Note, NoteServiceError> {
        let mut note = self.require_note(id)?;
        note.touch();
        self.write_and_commit(&note, body)?;
        Ok(note)
    }

    /// Changes the display title. The slug stays as created.
    pub fn retitle_note(&self, id: NoteId, title: &str) -> Result<Note, NoteServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NoteServiceError::InvalidTitle(title.to_string()));
        }
        let mut note = self.require_note(id)?;
        note.title = title.to_string();
        note.touch();
        self.graph.save_note(&note)?;
        Ok(note)
    }

    /// Replaces the whole tag set of a note.
    pub fn set_note_tags(&self, id: NoteId, tags: Vec<String>) -> Result<Note, NoteServiceError> {
        let normalized = validated_tags(&tags)?;
        let mut note = self.require_note(id)?;
        note.tags = normalized;
        note.touch();
        self.graph.save_note(&note)?;
        self.read_back(id, "note missing after tag replacement")
    }

    /// Re-reads a note's file after an external edit and refreshes its links.
    pub fn rescan_note(&self, slug: &str) -> Result<Vec<NoteLink>, NoteServiceError> {
        let note = self
            .graph
            .get_note_by_slug(slug)?
            .ok_or_else(|| NoteServiceError::SlugNotFound(slug.to_string()))?;
        Ok(self.graph.update_note_links(&note, &self.notes_root)?)
    }

    fn require_note(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.graph
            .get_note_by_id(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))
    }

    fn read_back(&self, id: NoteId, details: &'static str) -> Result<Note, NoteServiceError> {
        self.graph
            .get_note_by_id(id)?
            .ok_or(NoteServiceError::InconsistentState(details))
    }

    fn write_and_commit(&self, note: &Note, body: &str) -> Result<(), NoteServiceError> {
        let path = resolve_note_path(&self.notes_root, &note.file_path)
            .map_err(|err| NoteServiceError::Graph(LinkGraphError::Validation(err)))?;
        let files = self.graph.files();
        let previous = files.read_file(&path).ok();

        files.write_file(&path, body.as_bytes()).map_err(|source| {
            error!(
                "event=note_write module=note_service status=error note_id={} error={}",
                note.id, source
            );
            NoteServiceError::WriteNote {
                note_id: note.id,
                path: path.clone(),
                source,
            }
        })?;

        if let Err(err) = self.graph.commit_note(note, &self.notes_root) {
            let restored = match &previous {
                Some(bytes) => files.write_file(&path, bytes),
                None => files.remove_file(&path),
            };
            if let Err(restore_err) = restored {
                error!(
                    "event=note_write module=note_service status=error note_id={} error_code=restore_failed error={}",
                    note.id, restore_err
                );
            }
            return Err(err.into());
        }
        Ok(())
    }
}

/// File name for a new note: `<slug>.md`, shortened with the note id when
/// the slug would not fit a 255-byte file name.
pub fn note_file_name(slug: &str, id: NoteId) -> String {
    if slug.len() <= MAX_FILE_STEM_BYTES {
        return format!("{slug}.{NOTE_FILE_EXTENSION}");
    }

    let suffix = id.to_string();
    let mut end = MAX_FILE_STEM_BYTES - suffix.len() - 1;
    while !slug.is_char_boundary(end) {
        end -= 1;
    }
    let stem = slug[..end].trim_end_matches('-');
    format!("{stem}-{suffix}.{NOTE_FILE_EXTENSION}")
}

fn validated_tags(tags: &[String]) -> Result<Vec<String>, NoteServiceError> {
    if let Some(blank) = tags.iter().find(|tag| tag.trim().is_empty()) {
        return Err(NoteServiceError::InvalidTag(blank.clone()));
    }
    Ok(normalize_tags(tags))
}

#[cfg(test)]
mod tests {
    use super::{note_file_name, MAX_FILE_STEM_BYTES};
    use uuid::Uuid;

    #[test]
    fn short_slugs_name_the_file_directly() {
        assert_eq!(note_file_name("weekly-review", Uuid::new_v4()), "weekly-review.md");
    }

    #[test]
    fn long_multibyte_slugs_are_cut_at_a_char_boundary() {
        let id = Uuid::new_v4();
        let slug = "ж".repeat(150);
        let name = note_file_name(&slug, id);

        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.ends_with(&format!("-{id}.md")));
        let stem = name.trim_end_matches(&format!("-{id}.md"));
        assert!(stem.len() <= MAX_FILE_STEM_BYTES);
        assert!(stem.chars().all(|ch| ch == 'ж'));
    }

    #[test]
    fn four_byte_characters_never_split() {
        let slug = "𝒂".repeat(200);
        let name = note_file_name(&slug, Uuid::new_v4());
        assert!(name.len() <= 255);
        assert!(name.starts_with('𝒂'));
    }
}
