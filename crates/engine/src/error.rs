// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("repo resolution failed: {0}")]
    Repo(#[from] fm_core::ResolveRepoError),

    #[error("task transition rejected: {0}")]
    Transition(#[from] fm_core::TransitionError),

    #[error("worktree error: {0}")]
    Worktree(#[from] fm_worktree::WorktreeError),

    #[error("launcher error: {0}")]
    Launcher(#[from] fm_adapters::LauncherError),

    #[error("storage error: {0}")]
    Storage(#[from] fm_storage::StorageError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("missing_engine_command")]
    MissingEngineCommand,
}
