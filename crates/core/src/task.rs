// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: the central entity and its state machine (spec §3, §4.6).

use crate::event::{EventSeverity, TaskEvent};
use crate::id::{RepoId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Task lifecycle state. Terminal states (`Done`, `Failed`, `Cancelled`) are
/// absorbing: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Blocked,
    Done,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed | TaskState::Cancelled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Blocked => "blocked",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Where a submission originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Transport,
    Webhook,
    Operator,
    System,
}

/// Artifact produced by a completed (or in-progress) worker run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskArtifact {
    pub summary: Option<String>,
    pub worktree_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub pr_url: Option<String>,
    pub checks_summary: Option<String>,
}

/// An illegal transition attempt, or an invariant violation caught before it
/// could be applied. The task itself is left unchanged on error.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal transition: cannot apply '{transition}' to task in state '{from}'")]
    Illegal { from: TaskState, transition: &'static str },
    #[error("cancel already requested")]
    CancelAlreadyRequested,
}

/// The central entity: one submitted unit of work and its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    pub source: TaskSource,
    pub text: String,
    pub repo_id: RepoId,
    pub worker_session_key: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub escalation_required: bool,
    pub artifact: Option<TaskArtifact>,
    pub children: Vec<TaskId>,
    pub parent_task_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancel_requested: bool,
    pub events: Vec<TaskEvent>,
    pub error: Option<String>,
}

/// Inputs needed to construct a brand-new task; split out from `Task` so
/// callers can't forget a required field.
pub struct NewTask {
    pub id: TaskId,
    pub text: String,
    pub repo_id: RepoId,
    pub worker_session_key: String,
    pub source: TaskSource,
    pub max_retries: u32,
    pub parent_task_id: Option<TaskId>,
}

impl Task {
    pub fn new(cfg: NewTask, now: DateTime<Utc>) -> Self {
        let mut task = Self {
            id: cfg.id,
            state: TaskState::Queued,
            source: cfg.source,
            text: cfg.text,
            repo_id: cfg.repo_id,
            worker_session_key: cfg.worker_session_key,
            retry_count: 0,
            max_retries: cfg.max_retries,
            escalation_required: false,
            artifact: None,
            children: Vec::new(),
            parent_task_id: cfg.parent_task_id,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            cancel_requested: false,
            events: Vec::new(),
            error: None,
        };
        task.push_event(now, "submit", "task submitted", EventSeverity::Info, None);
        task
    }

    fn push_event(
        &mut self,
        at: DateTime<Utc>,
        kind: &str,
        message: impl Into<String>,
        severity: EventSeverity,
        details: Option<HashMap<String, String>>,
    ) {
        let mut event = TaskEvent::new(at, kind.to_string(), message).with_severity(severity);
        if let Some(d) = details {
            event = event.with_details(d);
        }
        self.events.push(event);
        self.updated_at = at;
    }

    fn reject(&mut self, now: DateTime<Utc>, transition: &'static str) -> TransitionError {
        self.push_event(
            now,
            "rejected",
            format!("illegal transition '{transition}' from state '{}'", self.state),
            EventSeverity::Warn,
            None,
        );
        TransitionError::Illegal { from: self.state, transition }
    }

    /// `queued -> running`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != TaskState::Queued {
            return Err(self.reject(now, "start"));
        }
        self.state = TaskState::Running;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.push_event(now, "start", "task started", EventSeverity::Info, None);
        Ok(())
    }

    /// `running -> done`.
    pub fn complete_success(&mut self, now: DateTime<Utc>, artifact: Option<TaskArtifact>) -> Result<(), TransitionError> {
        if self.state != TaskState::Running {
            return Err(self.reject(now, "complete_success"));
        }
        self.state = TaskState::Done;
        self.finished_at = Some(now);
        self.artifact = artifact;
        self.push_event(now, "complete_success", "task completed successfully", EventSeverity::Info, None);
        Ok(())
    }

    /// `running -> {queued, failed}` depending on retriability and the
    /// retry budget. Returns the resulting state for caller convenience.
    pub fn complete_failure(
        &mut self,
        now: DateTime<Utc>,
        retriable: bool,
        error: impl Into<String>,
    ) -> Result<TaskState, TransitionError> {
        if self.state != TaskState::Running {
            return Err(self.reject(now, "complete_failure"));
        }
        let error = error.into();
        self.error = Some(error.clone());

        let exhausted = self.retry_count >= self.max_retries;
        if retriable && !exhausted {
            self.retry_count += 1;
            self.state = TaskState::Queued;
            let mut details = HashMap::new();
            details.insert("error".to_string(), error.clone());
            details.insert("retry_count".to_string(), self.retry_count.to_string());
            self.push_event(now, "retry", format!("task failed, retrying ({}/{})", self.retry_count, self.max_retries), EventSeverity::Warn, Some(details));
        } else {
            self.state = TaskState::Failed;
            self.finished_at = Some(now);
            self.escalation_required = true;
            let mut details = HashMap::new();
            details.insert("error".to_string(), error.clone());
            details.insert("retriable".to_string(), retriable.to_string());
            self.push_event(now, "failed", format!("task failed terminally: {error}"), EventSeverity::Error, Some(details));
        }
        Ok(self.state)
    }

    /// `running -> blocked`.
    pub fn block(&mut self, now: DateTime<Utc>, reason: impl Into<String>) -> Result<(), TransitionError> {
        if self.state != TaskState::Running {
            return Err(self.reject(now, "block"));
        }
        let reason = reason.into();
        self.state = TaskState::Blocked;
        let mut details = HashMap::new();
        details.insert("reason".to_string(), reason.clone());
        self.push_event(now, "block", format!("task blocked: {reason}"), EventSeverity::Warn, Some(details));
        Ok(())
    }

    /// `blocked -> queued`.
    pub fn unblock(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != TaskState::Blocked {
            return Err(self.reject(now, "unblock"));
        }
        self.state = TaskState::Queued;
        self.push_event(now, "unblock", "task unblocked, returned to queue", EventSeverity::Info, None);
        Ok(())
    }

    /// Request cancellation. `queued`/`blocked` cancel immediately;
    /// `running` only sets the flag (the caller must kill the worker and
    /// call [`Task::confirm_cancelled`] once it has). Terminal states and a
    /// second request against `running` are no-ops.
    pub fn request_cancel(&mut self, now: DateTime<Utc>) -> Result<CancelOutcome, TransitionError> {
        match self.state {
            TaskState::Done | TaskState::Failed | TaskState::Cancelled => Ok(CancelOutcome::NoOp),
            TaskState::Queued | TaskState::Blocked => {
                self.state = TaskState::Cancelled;
                self.finished_at = Some(now);
                self.push_event(now, "cancel", "task cancelled", EventSeverity::Info, None);
                Ok(CancelOutcome::Cancelled)
            }
            TaskState::Running => {
                if self.cancel_requested {
                    return Ok(CancelOutcome::AlreadyPending);
                }
                self.cancel_requested = true;
                self.push_event(now, "cancel_requested", "cancellation requested, killing worker session", EventSeverity::Info, None);
                Ok(CancelOutcome::Pending)
            }
        }
    }

    /// The worker session confirmed exit after a cancel request against a
    /// running task: finalize the cancellation.
    pub fn confirm_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != TaskState::Running || !self.cancel_requested {
            return Err(self.reject(now, "confirm_cancelled"));
        }
        self.state = TaskState::Cancelled;
        self.finished_at = Some(now);
        self.push_event(now, "cancel", "task cancelled (worker confirmed exit)", EventSeverity::Info, None);
        Ok(())
    }

    /// The worker session did not exit within `cancelTimeoutMs` of a cancel
    /// request: fail the task with a distinguished event.
    pub fn cancel_timeout(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != TaskState::Running || !self.cancel_requested {
            return Err(self.reject(now, "cancel_timeout"));
        }
        self.state = TaskState::Failed;
        self.finished_at = Some(now);
        self.escalation_required = true;
        self.error = Some("cancel_timeout".to_string());
        self.push_event(now, "cancel_timeout", "worker did not exit before cancel timeout", EventSeverity::Error, None);
        Ok(())
    }
}

/// Result of requesting a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Task was in a terminal state; nothing happened.
    NoOp,
    /// Task moved directly to `cancelled` (was `queued`/`blocked`).
    Cancelled,
    /// Task was `running`; a kill was requested and confirmation is pending.
    Pending,
    /// Task was `running` and a cancel was already pending.
    AlreadyPending,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
