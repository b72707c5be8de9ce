use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;

use crate::runtime::types::TaskState;

/// The complete in-memory record for a single generation task.
#[derive(Debug)]
struct TaskRecord {
    status: TaskState,
    error: Option<String>,
    result_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Centralized, lock-guarded task state shared by the HTTP surface and the
/// pipeline jobs.
///
/// Uses a `tokio::sync::RwLock<HashMap>` so many pollers can read snapshots
/// concurrently while running jobs update their own records. The backing map
/// is never exposed; all mutation goes through [`TaskTracker::update`].
///
/// Records live for the whole process lifetime — there is no eviction and no
/// persistence, so a restart loses all task history and a long-running
/// process accumulates one record per job ever started.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    inner: Arc<RwLock<HashMap<String, TaskRecord>>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh task id and insert a `Pending` record.
    ///
    /// Ids are v4 UUIDs, unique for the process lifetime.
    pub async fn create(&self) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = TaskRecord {
            status: TaskState::Pending,
            error: None,
            result_url: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.insert(task_id.clone(), record);
        task_id
    }

    /// Overwrite the task's status snapshot.
    ///
    /// Returns `false` without touching the record when the id is unknown or
    /// the task is already terminal; late writes against a finished task are
    /// an anomaly worth logging, not a state change.
    pub async fn update(
        &self,
        task_id: &str,
        status: TaskState,
        error: Option<String>,
        result_url: Option<String>,
    ) -> bool {
        let mut guard = self.inner.write().await;
        let Some(record) = guard.get_mut(task_id) else {
            warn!(task_id, %status, "update for unknown task id");
            return false;
        };
        if record.status.is_terminal() {
            warn!(
                task_id,
                current = %record.status,
                requested = %status,
                "rejected update to terminal task"
            );
            return false;
        }
        record.status = status;
        record.error = error;
        record.result_url = result_url;
        record.updated_at = Utc::now();
        true
    }

    /// Return a read-only snapshot of the task, or `None` for unknown ids.
    pub async fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        let guard = self.inner.read().await;
        let record = guard.get(task_id)?;
        Some(TaskSnapshot {
            task_id: task_id.to_owned(),
            status: record.status,
            error: record.error.clone(),
            result_url: record.result_url.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// A read-only view of a task's current state returned to callers.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskState,
    pub error: Option<String>,
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
