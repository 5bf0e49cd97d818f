//! Note text storage.
//!
//! # Responsibility
//! - Read, write and remove note bodies addressed by absolute paths.
//!
//! # Invariants
//! - Callers validate relative note paths with
//!   [`crate::model::note::resolve_note_path`] before reaching this layer.

use std::io;
use std::path::Path;

/// Storage for note bodies.
pub trait NoteFiles {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Replaces the file content, creating parent directories as needed.
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Plain filesystem note storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsNoteFiles;

impl NoteFiles for FsNoteFiles {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

impl<F: NoteFiles + ?Sized> NoteFiles for &F {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        (**self).write_file(path, content)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{FsNoteFiles, NoteFiles};

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/note.md");

        FsNoteFiles.write_file(&path, b"[[x]]").unwrap();
        assert_eq!(FsNoteFiles.read_file(&path).unwrap(), b"[[x]]");

        FsNoteFiles.remove_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsNoteFiles
            .read_file(&dir.path().join("absent.md"))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
