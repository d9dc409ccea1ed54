// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    #[error("git {op} failed: {stderr}")]
    GitCommandFailed { op: String, stderr: String },

    #[error("git {op} timed out after {secs}s")]
    Timeout { op: String, secs: u64 },

    #[error("worktree path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
