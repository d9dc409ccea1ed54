// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task isolated checkout allocation (C2 Worktree Manager).

use std::path::{Path, PathBuf};
use std::time::Duration;

use fm_core::{slug, Clock, RepoRegistration, TaskId};

use crate::error::WorktreeError;
use crate::git;

const DEFAULT_BRANCH_PREFIX: &str = "fm-task";

/// Result of a successful `create_worktree` call.
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
    pub base_ref: String,
}

pub struct WorktreeManagerConfig {
    /// Directory under which every task's worktree directory is created.
    pub worktree_root: PathBuf,
    pub branch_prefix: String,
}

impl WorktreeManagerConfig {
    pub fn new(worktree_root: impl Into<PathBuf>) -> Self {
        Self {
            worktree_root: worktree_root.into(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
        }
    }
}

pub struct WorktreeManager {
    config: WorktreeManagerConfig,
}

impl WorktreeManager {
    pub fn new(config: WorktreeManagerConfig) -> Self {
        Self { config }
    }

    fn branch_name(&self, task_id: &TaskId) -> String {
        format!("{}-{}", self.config.branch_prefix, slug(task_id.as_str(), "task", 40))
    }

    fn worktree_path(&self, branch: &str) -> PathBuf {
        self.config.worktree_root.join(branch)
    }

    /// Materialize an isolated checkout of `repo` for `task_id`, on a
    /// deterministic branch derived from the task id. Re-creating against
    /// an already-existing path/branch is idempotent: the old worktree and
    /// branch are torn down first.
    pub async fn create_worktree(&self, repo: &RepoRegistration, task_id: &TaskId) -> Result<WorktreeInfo, WorktreeError> {
        let branch = self.branch_name(task_id);
        let path = self.worktree_path(&branch);

        if path.exists() {
            let _ = git::worktree_remove(&repo.path, &path).await;
            let _ = git::worktree_prune(&repo.path).await;
            if path.exists() {
                tokio::fs::remove_dir_all(&path).await?;
            }
        }

        git::worktree_add(&repo.path, &path, &branch, &repo.default_branch).await?;

        Ok(WorktreeInfo {
            path,
            branch,
            base_ref: repo.default_branch.clone(),
        })
    }

    /// Tear down a worktree and release its branch. `path` must be a
    /// directory previously returned by `create_worktree` (the branch name
    /// is derived from its final path segment).
    pub async fn destroy_worktree(&self, repo: &RepoRegistration, path: &Path) -> Result<(), WorktreeError> {
        let branch = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| WorktreeError::NotFound(path.to_path_buf()))?;

        git::worktree_remove(&repo.path, path).await?;
        git::worktree_prune(&repo.path).await?;
        git::branch_delete(&repo.path, &branch).await?;
        Ok(())
    }

    /// Worktree directories under the root whose mtime is older than
    /// `age_threshold`. The manager holds no cross-restart locks, so this is
    /// purely a filesystem-mtime check.
    pub fn list_stale(&self, clock: &impl Clock, age_threshold: Duration) -> Result<Vec<PathBuf>, WorktreeError> {
        let mut stale = Vec::new();
        let entries = match std::fs::read_dir(&self.config.worktree_root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stale),
            Err(e) => return Err(e.into()),
        };

        let now = clock.now();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let metadata = entry.metadata()?;
            let modified = metadata.modified()?;
            let age = now
                .signed_duration_since(chrono::DateTime::<chrono::Utc>::from(modified))
                .to_std()
                .unwrap_or_default();
            if age >= age_threshold {
                stale.push(entry.path());
            }
        }
        Ok(stale)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
