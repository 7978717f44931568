//! Task records for asynchronous URL fingerprint jobs.
//!
//! A [`Task`] is the durable unit of work created by `POST /from_url`. Its
//! id is content-addressed: the blake3 digest of the submitted URL, so the
//! same URL always maps to the same task. The serialized form omits unset
//! optional fields, keeping the on-disk records minimal.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a task.
///
/// Transitions are monotonic along
/// `pending -> downloading -> processing -> {success | failed}`;
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// Durable record tracking one URL-to-fingerprint job.
///
/// The on-disk record is the single source of truth for a task's progress;
/// any process that knows the `task_id` can read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,

    /// Caller-supplied inputs, immutable after creation.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,

    /// Local artifact name, set once the download completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    pub status: TaskStatus,

    /// Human-readable progress or error note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Opaque fingerprint record, present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl Task {
    /// Create a fresh `pending` task for `url`.
    pub fn new(url: String, title: Option<String>, extra: Option<String>) -> Self {
        Self {
            task_id: task_id_for(&url),
            url,
            title,
            extra,
            filename: None,
            status: TaskStatus::Pending,
            message: None,
            result: None,
        }
    }
}

/// Derive the content-addressed task id for a URL.
///
/// Pure function of the URL bytes: identical URLs yield identical ids.
pub fn task_id_for(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}
