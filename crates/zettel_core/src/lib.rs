//! Wiki-link graph core for zettel notes.
//!
//! Turns note text into a persisted, bidirectional link graph and keeps it
//! consistent as notes are created and edited in any order.

pub mod config;
pub mod db;
pub mod files;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod wikilink;

pub use config::{ConfigError, CoreConfig};
pub use files::{FsNoteFiles, NoteFiles};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::link::{LinkId, LinkType, NoteLink};
pub use model::note::{resolve_note_path, Note, NoteId, NoteValidationError};
pub use repo::note_store::{
    normalize_tag, normalize_tags, NoteStore, RepoError, RepoResult, SqliteNoteStore,
};
pub use service::link_graph::{LinkGraphError, LinkGraphService};
pub use service::note_service::{note_file_name, NoteService, NoteServiceError};
pub use wikilink::extract::{extract_links, ExtractedLink};
pub use wikilink::slug::{normalize_slug, MAX_SLUG_LEN};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
