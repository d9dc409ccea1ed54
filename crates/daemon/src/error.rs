// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("could not determine state directory (set DATA_DIR, XDG_STATE_HOME, or HOME)")]
    NoStateDir,

    #[error("another daemon instance is already running")]
    LockFailed(#[source] std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("release error: {0}")]
    Release(#[from] fm_release::ReleaseError),

    #[error("engine error: {0}")]
    Engine(#[from] fm_engine::EngineError),

    #[error("startup integrity check failed: {0:?}")]
    IntegrityFailed(fm_release::IntegrityReport),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
