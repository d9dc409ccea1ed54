// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] fm_storage::StorageError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("release '{0}' not found")]
    NotFound(String),

    #[error("no previous release to roll back to")]
    NoPreviousRelease,
}
