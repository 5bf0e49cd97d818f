//! Link graph service.
//!
//! # Responsibility
//! - Keep each note's persisted link set in step with its text.
//! - Resolve forward references once their target note exists.
//!
//! # Invariants
//! - `update_note_links` replaces a source's link set in one transaction:
//!   readers see the old set or the new one, never a mix.
//! - Links are resolved eagerly at write time when the target exists, and
//!   lazily by `resolve_orphaned_backlinks` when the target is created later.
//! - Slug uniqueness is checked before write and reported as
//!   `SlugAlreadyExists`.

use crate::files::{FsNoteFiles, NoteFiles};
use crate::model::link::{LinkType, NoteLink};
use crate::model::note::{resolve_note_path, Note, NoteId, NoteValidationError};
use crate::repo::note_store::{NoteStore, RepoError, RepoResult};
use crate::wikilink::extract::{extract_links, ExtractedLink};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Errors from link graph operations.
#[derive(Debug)]
pub enum LinkGraphError {
    /// Note fails model validation (including an unusable title/slug).
    Validation(NoteValidationError),
    /// Another note already owns this slug.
    SlugAlreadyExists { slug: String, existing_id: NoteId },
    /// Note text could not be read.
    ReadNote {
        note_id: NoteId,
        path: PathBuf,
        source: std::io::Error,
    },
    /// Store call failed; nothing from this operation was persisted.
    Store {
        operation: &'static str,
        note_id: Option<NoteId>,
        source: RepoError,
    },
}

impl Display for LinkGraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::SlugAlreadyExists { slug, existing_id } => {
                write!(f, "slug already exists: `{slug}` (note {existing_id})")
            }
            Self::ReadNote {
                note_id,
                path,
                source,
            } => write!(
                f,
                "failed to read note {note_id} at `{}`: {source}",
                path.display()
            ),
            Self::Store {
                operation,
                note_id: Some(note_id),
                source,
            } => write!(f, "{operation} failed for note {note_id}: {source}"),
            Self::Store {
                operation,
                note_id: None,
                source,
            } => write!(f, "{operation} failed: {source}"),
        }
    }
}

impl Error for LinkGraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::SlugAlreadyExists { .. } => None,
            Self::ReadNote { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
        }
    }
}

fn store_error(
    operation: &'static str,
    note_id: Option<NoteId>,
) -> impl FnOnce(RepoError) -> LinkGraphError {
    move |source| match source {
        RepoError::Validation(err) => LinkGraphError::Validation(err),
        source => {
            error!(
                "event={} module=link_graph status=error note_id={} error={}",
                operation,
                note_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                source
            );
            LinkGraphError::Store {
                operation,
                note_id,
                source,
            }
        }
    }
}

/// Orchestrates extraction, persistence and resolution of note links.
pub struct LinkGraphService<S: NoteStore, F: NoteFiles = FsNoteFiles> {
    store: S,
    files: F,
}

impl<S: NoteStore> LinkGraphService<S> {
    /// Creates a service reading note text from the filesystem.
    pub fn new(store: S) -> Self {
        Self::with_files(store, FsNoteFiles)
    }
}

impl<S: NoteStore, F: NoteFiles> LinkGraphService<S, F> {
    /// Creates a service with a custom note text backend.
    pub fn with_files(store: S, files: F) -> Self {
        Self { store, files }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// Inserts or updates a note after checking slug ownership.
    ///
    /// The slug lookup and the write share one transaction.
    pub fn save_note(&self, note: &Note) -> Result<(), LinkGraphError> {
        note.validate().map_err(LinkGraphError::Validation)?;

        let conflict = self
            .store
            .atomically(|store| {
                if let Some(existing) = store.get_note_by_slug(&note.slug)? {
                    if existing.id != note.id {
                        return Ok(Some(existing.id));
                    }
                }
                store.save_note(note)?;
                Ok(None)
            })
            .map_err(store_error("note_save", Some(note.id)))?;

        if let Some(existing_id) = conflict {
            info!(
                "event=note_save module=link_graph status=rejected note_id={} error_code=slug_exists",
                note.id
            );
            return Err(LinkGraphError::SlugAlreadyExists {
                slug: note.slug.clone(),
                existing_id,
            });
        }

        debug!("event=note_save module=link_graph status=ok note_id={}", note.id);
        Ok(())
    }

    pub fn get_note_by_id(&self, id: NoteId) -> Result<Option<Note>, LinkGraphError> {
        self.store
            .get_note_by_id(id)
            .map_err(store_error("note_get", Some(id)))
    }

    pub fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, LinkGraphError> {
        self.store
            .get_note_by_slug(slug)
            .map_err(store_error("note_get_by_slug", None))
    }

    /// All notes, newest first.
    pub fn get_all_notes(&self) -> Result<Vec<Note>, LinkGraphError> {
        self.store
            .get_all_notes()
            .map_err(store_error("note_list", None))
    }

    /// Re-scans the note's text and replaces its reference links.
    ///
    /// Each extracted slug is looked up; existing targets are linked
    /// immediately, missing ones are stored as orphans. Returns the new link
    /// rows in document order.
    ///
    /// # Errors
    /// - `ReadNote` when the file is missing or unreadable (nothing changes).
    /// - `Store` when any write fails (the previous link set stays intact).
    pub fn update_note_links(
        &self,
        note: &Note,
        notes_root: &Path,
    ) -> Result<Vec<NoteLink>, LinkGraphError> {
        let started_at = Instant::now();
        let extracted = self.read_links(note, notes_root)?;

        let links = self
            .store
            .atomically(|store| replace_links(store, note.id, &extracted))
            .map_err(store_error("note_links_update", Some(note.id)))?;

        log_links_written("note_links_update", note.id, &links, started_at);
        Ok(links)
    }

    /// Saves a note, rewrites its links and resolves orphans naming its slug,
    /// all in one transaction.
    ///
    /// Either every step lands or none does, so a failed create leaves no
    /// note row behind and a failed edit keeps the previous row and links.
    pub fn commit_note(
        &self,
        note: &Note,
        notes_root: &Path,
    ) -> Result<Vec<NoteLink>, LinkGraphError> {
        let started_at = Instant::now();
        note.validate().map_err(LinkGraphError::Validation)?;
        let extracted = self.read_links(note, notes_root)?;

        let outcome = self
            .store
            .atomically(|store| {
                if let Some(existing) = store.get_note_by_slug(&note.slug)? {
                    if existing.id != note.id {
                        return Ok(Err(existing.id));
                    }
                }
                store.save_note(note)?;
                let links = replace_links(store, note.id, &extracted)?;
                let resolved = resolve_orphans(store, note)?;
                Ok(Ok((links, resolved)))
            })
            .map_err(store_error("note_commit", Some(note.id)))?;

        let (links, resolved) = outcome.map_err(|existing_id| {
            info!(
                "event=note_commit module=link_graph status=rejected note_id={} error_code=slug_exists",
                note.id
            );
            LinkGraphError::SlugAlreadyExists {
                slug: note.slug.clone(),
                existing_id,
            }
        })?;

        log_links_written("note_commit", note.id, &links, started_at);
        debug!(
            "event=note_commit module=link_graph status=ok note_id={} backlinks_resolved={}",
            note.id, resolved
        );
        Ok(links)
    }

    /// Points every orphaned link naming `note.slug` at `note`.
    ///
    /// Each link is updated independently; after a partial failure a retry
    /// picks up the links that are still orphaned. Returns how many links
    /// were resolved.
    pub fn resolve_orphaned_backlinks(&self, note: &Note) -> Result<usize, LinkGraphError> {
        let resolved = resolve_orphans(&self.store, note)
            .map_err(store_error("orphan_resolve", Some(note.id)))?;

        info!(
            "event=orphan_resolve module=link_graph status=ok note_id={} resolved={}",
            note.id, resolved
        );
        Ok(resolved)
    }

    /// Outgoing links of a note, resolved and orphaned.
    pub fn get_links_by_source_note(&self, id: NoteId) -> Result<Vec<NoteLink>, LinkGraphError> {
        self.store
            .get_links_from_source(id)
            .map_err(store_error("links_from_source", Some(id)))
    }

    /// Resolved links pointing at `note_id`. Orphans are never included.
    pub fn get_backlinks(&self, note_id: NoteId) -> Result<Vec<NoteLink>, LinkGraphError> {
        self.store
            .get_backlinks(note_id)
            .map_err(store_error("backlinks", Some(note_id)))
    }

    fn read_links(
        &self,
        note: &Note,
        notes_root: &Path,
    ) -> Result<Vec<ExtractedLink>, LinkGraphError> {
        let path =
            resolve_note_path(notes_root, &note.file_path).map_err(LinkGraphError::Validation)?;
        let bytes = self.files.read_file(&path).map_err(|source| {
            error!(
                "event=note_links_update module=link_graph status=error note_id={} error_code=read_failed error={}",
                note.id, source
            );
            LinkGraphError::ReadNote {
                note_id: note.id,
                path: path.clone(),
                source,
            }
        })?;
        Ok(extract_links(&String::from_utf8_lossy(&bytes)))
    }
}

fn replace_links<S: NoteStore>(
    store: &S,
    source_id: NoteId,
    extracted: &[ExtractedLink],
) -> RepoResult<Vec<NoteLink>> {
    store.delete_links_from_source(source_id, LinkType::Reference)?;
    let mut links = Vec::with_capacity(extracted.len());
    for item in extracted {
        let target_id = store
            .get_note_by_slug(&item.target_slug)?
            .map(|target| target.id);
        let link = NoteLink::reference(source_id, item.target_slug.as_str(), target_id);
        store.save_link(&link)?;
        links.push(link);
    }
    Ok(links)
}

fn resolve_orphans<S: NoteStore>(store: &S, note: &Note) -> RepoResult<usize> {
    let orphans = store.get_orphaned_links_targeting(&note.slug)?;
    for link in &orphans {
        store.resolve_link(link.id, note.id)?;
    }
    Ok(orphans.len())
}

fn log_links_written(event: &str, note_id: NoteId, links: &[NoteLink], started_at: Instant) {
    let orphaned = links.iter().filter(|link| link.is_orphaned()).count();
    info!(
        "event={} module=link_graph status=ok note_id={} links={} resolved={} orphaned={} duration_ms={}",
        event,
        note_id,
        links.len(),
        links.len() - orphaned,
        orphaned,
        started_at.elapsed().as_millis()
    );
}
