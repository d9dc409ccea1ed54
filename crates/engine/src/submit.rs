// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission request shape (spec §4.6 `submitTask`).

use fm_core::{TaskId, TaskSource};

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub text: String,
    pub repo_id: Option<String>,
    pub source: TaskSource,
    pub parent_task_id: Option<TaskId>,
    /// One child task is created per entry, each using the entry as its
    /// own `text` and this submission's `parentTaskId` set to the newly
    /// created parent. Empty means "no fanout": a plain single task.
    pub fanout: Vec<String>,
}

impl SubmitRequest {
    pub fn new(text: impl Into<String>, source: TaskSource) -> Self {
        Self {
            text: text.into(),
            repo_id: None,
            source,
            parent_task_id: None,
            fanout: Vec::new(),
        }
    }

    pub fn with_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = Some(repo_id.into());
        self
    }

    pub fn with_fanout(mut self, fanout: Vec<String>) -> Self {
        self.fanout = fanout;
        self
    }
}
