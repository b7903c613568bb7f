//! JSON storage for the task document
//!
//! The whole document lives in one file (`.taskmap/tasks.json` by default).
//! Reads take a shared lock; writes go to a temp file under an exclusive lock
//! and are renamed over the target so a crash never leaves a partial file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ErrorKind, TasksDocument};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Task file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse task file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Parse { .. } => ErrorKind::Validation,
            StorageError::Io { .. } => ErrorKind::Io,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Persistence gateway for one task document
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    /// Creates a gateway for the file at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the task file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads and parses the whole document
    pub fn load(&self) -> Result<TasksDocument, StorageError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(self.path.clone()),
            _ => StorageError::io(&self.path, e),
        })?;

        // Acquire shared lock for reading
        file.lock_shared()
            .map_err(|e| StorageError::io(&self.path, e))?;

        let doc: TasksDocument =
            serde_json::from_reader(BufReader::new(&file)).map_err(|source| {
                if source.is_io() {
                    StorageError::io(&self.path, source.into())
                } else {
                    StorageError::Parse {
                        path: self.path.clone(),
                        source,
                    }
                }
            })?;

        debug!(path = %self.path.display(), tasks = doc.tasks.len(), "task file loaded");
        // Lock is released when file is dropped
        Ok(doc)
    }

    /// Replaces the whole file atomically (temp file + rename)
    pub fn save(&self, doc: &TasksDocument) -> Result<(), StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StorageError::io(&temp_path, e))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .map_err(|e| StorageError::io(&temp_path, e))?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, doc).map_err(|source| {
                StorageError::io(&temp_path, source.into())
            })?;
            writeln!(writer).map_err(|e| StorageError::io(&temp_path, e))?;
            writer.flush().map_err(|e| StorageError::io(&temp_path, e))?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        debug!(path = %self.path.display(), tasks = doc.tasks.len(), "task file saved");
        Ok(())
    }
}
