//! Link edge model.

use crate::model::note::NoteId;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable link identifier.
pub type LinkId = Uuid;

/// Kind of edge between two notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Plain `[[target]]` reference from note text.
    Reference,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

/// Directed edge from a source note to a target slug.
///
/// `target_note_id == None` marks an orphaned (forward) reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteLink {
    pub id: LinkId,
    pub source_note_id: NoteId,
    pub target_slug: String,
    pub target_note_id: Option<NoteId>,
    pub link_type: LinkType,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl NoteLink {
    /// Creates a reference link with a fresh id.
    pub fn reference(
        source_note_id: NoteId,
        target_slug: impl Into<String>,
        target_note_id: Option<NoteId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_note_id,
            target_slug: target_slug.into(),
            target_note_id,
            link_type: LinkType::Reference,
            created_at: now_epoch_ms(),
        }
    }

    pub fn is_orphaned(&self) -> bool {
        self.target_note_id.is_none()
    }
}
