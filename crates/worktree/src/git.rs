// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `git worktree`/`git branch` subprocess wrapper, following the
//! teacher's timeout-wrapped subprocess-runner convention.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::error::WorktreeError;

pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

async fn run(repo_root: &Path, args: &[&str], op: &str) -> Result<(), WorktreeError> {
    let mut cmd = Command::new("git");
    cmd.current_dir(repo_root).args(args);

    let output = match tokio::time::timeout(GIT_WORKTREE_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(WorktreeError::Io(e)),
        Err(_) => {
            return Err(WorktreeError::Timeout {
                op: op.to_string(),
                secs: GIT_WORKTREE_TIMEOUT.as_secs(),
            })
        }
    };

    if output.status.success() {
        Ok(())
    } else {
        Err(WorktreeError::GitCommandFailed {
            op: op.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

pub async fn worktree_add(repo_root: &Path, path: &Path, branch: &str, base_ref: &str) -> Result<(), WorktreeError> {
    run(
        repo_root,
        &["worktree", "add", "-B", branch, &path.to_string_lossy(), base_ref],
        "worktree add",
    )
    .await
}

pub async fn worktree_remove(repo_root: &Path, path: &Path) -> Result<(), WorktreeError> {
    run(repo_root, &["worktree", "remove", "--force", &path.to_string_lossy()], "worktree remove").await
}

/// Delete the branch. Tolerant of the branch not existing (teacher's
/// kill-session-ignoring-not-found idiom applied to `git branch -D`).
pub async fn branch_delete(repo_root: &Path, branch: &str) -> Result<(), WorktreeError> {
    match run(repo_root, &["branch", "-D", branch], "branch delete").await {
        Ok(()) => Ok(()),
        Err(WorktreeError::GitCommandFailed { stderr, .. }) if stderr.contains("not found") => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn worktree_prune(repo_root: &Path) -> Result<(), WorktreeError> {
    run(repo_root, &["worktree", "prune"], "worktree prune").await
}
