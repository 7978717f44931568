//! File-backed task store.
//!
//! One JSON record per task at `data_dir/task-{task_id}.json`. Records are
//! replaced wholesale: `save` serializes the full task to a unique temp
//! file and renames it over the final path, so a reader never observes a
//! half-written record. No locking is performed; the task runner is the
//! only writer for a given id in the intended flow.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("task {task_id} record is corrupt: {source}")]
    Corrupt {
        task_id: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize task {task_id}: {source}")]
    Serialize {
        task_id: String,
        source: serde_json::Error,
    },

    #[error("task store io: {0}")]
    Io(#[from] io::Error),
}

/// Durable keyed store of [`Task`] records, plus the directory the
/// downloaded artifacts land in.
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding task records and downloaded artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `task_id`.
    pub fn task_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("task-{task_id}.json"))
    }

    /// Path of a downloaded artifact by its file name.
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write a new record keyed by `task.task_id`.
    ///
    /// An existing record with the same id is overwritten.
    pub fn create(&self, task: &Task) -> Result<(), StoreError> {
        self.save(task)
    }

    /// Persist the current task object, replacing the on-disk record
    /// wholesale.
    ///
    /// The record is written to a unique temp file in the same directory
    /// and renamed into place, so even racing saves each commit a complete
    /// record and a reader never sees a mix of two.
    pub fn save(&self, task: &Task) -> Result<(), StoreError> {
        let json = serde_json::to_vec(task).map_err(|source| StoreError::Serialize {
            task_id: task.task_id.clone(),
            source,
        })?;
        let path = self.task_path(&task.task_id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    /// Read and deserialize the record for `task_id`.
    pub fn load(&self, task_id: &str) -> Result<Task, StoreError> {
        let path = self.task_path(task_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(task_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&raw).map_err(|source| {
            tracing::warn!(task_id = %task_id, error = %source, "corrupt task record");
            StoreError::Corrupt {
                task_id: task_id.to_string(),
                source,
            }
        })
    }
}
