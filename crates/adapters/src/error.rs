// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("timed out waiting for session '{name}' to exit after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },
}
