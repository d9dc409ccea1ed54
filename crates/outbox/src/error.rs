// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("storage error: {0}")]
    Storage(#[from] fm_storage::StorageError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("idempotency key must not be empty")]
    EmptyIdempotencyKey,
}
