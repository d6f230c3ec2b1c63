//! Tracks at most one in-flight research task per user.

use std::time::{Duration, Instant};

use dashmap::{DashMap, mapref::entry::Entry};

/// Task lifecycle. `Processing` is the only non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One tracked research task.
#[derive(Debug, Clone)]
pub struct ResearchTask {
    pub query: String,
    pub status: TaskStatus,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
    pub error: Option<String>,
}

impl ResearchTask {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            status: TaskStatus::Processing,
            started_at: Instant::now(),
            finished_at: None,
            error: None,
        }
    }
}

/// Why a submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// A task for this user is still running.
    #[error("a research task is already in progress")]
    AlreadyActive,
}

/// One task slot per user id, with cooperative cancellation.
///
/// Cancellation is bookkeeping only: nothing interrupts an engine
/// invocation already in flight, but a cancelled slot makes the eventual
/// result undeliverable (terminal transitions require `Processing`).
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, ResearchTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new `processing` task. Rejected while a previous task for
    /// the same user is still in flight; terminal slots are replaced.
    pub fn begin(&self, user_id: &str, query: &str) -> Result<(), SubmitError> {
        match self.tasks.entry(user_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().status == TaskStatus::Processing {
                    return Err(SubmitError::AlreadyActive);
                }
                occupied.insert(ResearchTask::new(query));
            },
            Entry::Vacant(vacant) => {
                vacant.insert(ResearchTask::new(query));
            },
        }
        Ok(())
    }

    /// Mark the task completed. Returns false when there is nothing to
    /// complete — unknown user, or the user cancelled mid-flight.
    pub fn complete(&self, user_id: &str) -> bool {
        self.finish(user_id, TaskStatus::Completed, None)
    }

    /// Mark the task failed, keeping the error detail for status queries.
    pub fn fail(&self, user_id: &str, error: impl Into<String>) -> bool {
        self.finish(user_id, TaskStatus::Failed, Some(error.into()))
    }

    /// Cooperative cancellation: true iff the task was `processing`.
    pub fn cancel(&self, user_id: &str) -> bool {
        self.finish(user_id, TaskStatus::Cancelled, None)
    }

    fn finish(&self, user_id: &str, status: TaskStatus, error: Option<String>) -> bool {
        match self.tasks.get_mut(user_id) {
            Some(mut task) if task.status == TaskStatus::Processing => {
                task.status = status;
                task.finished_at = Some(Instant::now());
                task.error = error;
                true
            },
            _ => false,
        }
    }

    /// Last known task for the user, if any.
    pub fn status(&self, user_id: &str) -> Option<ResearchTask> {
        self.tasks.get(user_id).map(|task| task.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove terminal tasks older than `ttl`; returns how many. In-flight
    /// tasks are never swept — their terminal transition is guaranteed by
    /// the invocation wrapper.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        self.sweep_at(ttl, Instant::now())
    }

    fn sweep_at(&self, ttl: Duration, now: Instant) -> usize {
        let mut removed = 0;
        self.tasks.retain(|_, task| {
            let keep = task
                .finished_at
                .is_none_or(|finished| now.duration_since(finished) <= ttl);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn begin_records_a_processing_task() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "how do tides work").unwrap();

        let task = registry.status("U1").unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.query, "how do tides work");
        assert!(task.finished_at.is_none());
    }

    #[test]
    fn begin_rejects_while_processing() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "first").unwrap();
        assert_eq!(registry.begin("U1", "second"), Err(SubmitError::AlreadyActive));
        // The original slot is untouched.
        assert_eq!(registry.status("U1").unwrap().query, "first");
    }

    #[test]
    fn begin_replaces_a_terminal_slot() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "first").unwrap();
        assert!(registry.complete("U1"));

        registry.begin("U1", "second").unwrap();
        let task = registry.status("U1").unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.query, "second");
    }

    #[test]
    fn complete_sets_terminal_state() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "q").unwrap();
        assert!(registry.complete("U1"));

        let task = registry.status("U1").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn fail_keeps_error_detail() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "q").unwrap();
        assert!(registry.fail("U1", "researcher unreachable"));

        let task = registry.status("U1").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("researcher unreachable"));
    }

    #[test]
    fn cancel_only_succeeds_while_processing() {
        let registry = TaskRegistry::new();
        assert!(!registry.cancel("unknown"));

        registry.begin("U1", "q").unwrap();
        assert!(registry.cancel("U1"));
        assert_eq!(registry.status("U1").unwrap().status, TaskStatus::Cancelled);
        // Repeated cancellation of a terminal task fails.
        assert!(!registry.cancel("U1"));
    }

    #[test]
    fn complete_after_cancel_is_a_no_op() {
        let registry = TaskRegistry::new();
        registry.begin("U1", "q").unwrap();
        assert!(registry.cancel("U1"));

        assert!(!registry.complete("U1"));
        assert_eq!(registry.status("U1").unwrap().status, TaskStatus::Cancelled);
    }

    #[test]
    fn status_for_unknown_user_is_none() {
        let registry = TaskRegistry::new();
        assert!(registry.status("U1").is_none());
    }

    #[test]
    fn sweep_removes_old_terminal_tasks_only() {
        let registry = TaskRegistry::new();
        registry.begin("done", "q").unwrap();
        registry.complete("done");
        registry.begin("running", "q").unwrap();

        let now = Instant::now() + TTL + Duration::from_secs(1);
        assert_eq!(registry.sweep_at(TTL, now), 1);
        assert!(registry.status("done").is_none());
        assert_eq!(
            registry.status("running").unwrap().status,
            TaskStatus::Processing
        );
    }
}
