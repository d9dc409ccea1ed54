// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (spec §6).

use std::path::PathBuf;

use fm_release::IntegrityMode;

use crate::error::DaemonError;

/// Resolve state directory: `DATA_DIR` > `XDG_STATE_HOME`/foreman >
/// `~/.local/state/foreman`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("DATA_DIR") {
        return Ok(expand_path(&dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("foreman"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/foreman"))
}

/// Expand a leading `~/` or bare `~` to `$HOME`. Anything else (`~foo`,
/// `foo~bar`, an already-absolute path) is left untouched.
pub fn expand_path(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Mock,
    Process,
}

/// Runtime configuration for `foremand`, assembled from the environment
/// variables enumerated in spec §6. Never derives `Debug` directly — secret
/// fields are redacted by the handwritten [`std::fmt::Debug`] impl below.
#[derive(Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub release_root_dir: PathBuf,
    pub worktree_root_dir: PathBuf,
    pub control_auth_token: Option<String>,
    pub startup_integrity_mode: IntegrityMode,
    pub bridge_shared_secret: Option<String>,
    pub bridge_retry_base_ms: u64,
    pub bridge_retry_max_ms: u64,
    pub bridge_max_retries: u32,
    pub engine_mode: EngineMode,
    pub engine_command: String,
    pub task_auto_commit: bool,
    pub task_auto_pr: bool,
    pub session_prefix: String,
    pub tmux_binary: String,
    pub auto_cleanup: bool,
    pub failed_retention_hours: u32,
    pub max_concurrent_workers: usize,
    pub cancel_timeout_ms: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &self.data_dir)
            .field("release_root_dir", &self.release_root_dir)
            .field("worktree_root_dir", &self.worktree_root_dir)
            .field("control_auth_token", &redacted(&self.control_auth_token))
            .field("startup_integrity_mode", &self.startup_integrity_mode)
            .field("bridge_shared_secret", &redacted(&self.bridge_shared_secret))
            .field("bridge_retry_base_ms", &self.bridge_retry_base_ms)
            .field("bridge_retry_max_ms", &self.bridge_retry_max_ms)
            .field("bridge_max_retries", &self.bridge_max_retries)
            .field("engine_mode", &self.engine_mode)
            .field("engine_command", &self.engine_command)
            .field("task_auto_commit", &self.task_auto_commit)
            .field("task_auto_pr", &self.task_auto_pr)
            .field("session_prefix", &self.session_prefix)
            .field("tmux_binary", &self.tmux_binary)
            .field("auto_cleanup", &self.auto_cleanup)
            .field("failed_retention_hours", &self.failed_retention_hours)
            .field("max_concurrent_workers", &self.max_concurrent_workers)
            .field("cancel_timeout_ms", &self.cancel_timeout_ms)
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: impl Into<PathBuf>) -> PathBuf {
    std::env::var(key).map(|v| expand_path(&v)).unwrap_or_else(|_| default.into())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let data_dir = state_dir()?;
        let release_root_dir = env_path("RELEASE_ROOT_DIR", data_dir.join("releases"));
        let worktree_root_dir = env_path("WORKTREE_ROOT_DIR", data_dir.join("worktrees"));

        let startup_integrity_mode = match env_string("STARTUP_INTEGRITY_MODE", "warn").as_str() {
            "off" => IntegrityMode::Off,
            "strict" => IntegrityMode::Strict,
            "warn" => IntegrityMode::Warn,
            other => return Err(DaemonError::InvalidConfig(format!("invalid STARTUP_INTEGRITY_MODE: {other}"))),
        };

        let engine_mode = match env_string("ENGINE_MODE", "mock").as_str() {
            "mock" => EngineMode::Mock,
            "process" => EngineMode::Process,
            other => return Err(DaemonError::InvalidConfig(format!("invalid ENGINE_MODE: {other}"))),
        };

        Ok(Self {
            data_dir,
            release_root_dir,
            worktree_root_dir,
            control_auth_token: std::env::var("CONTROL_AUTH_TOKEN").ok(),
            startup_integrity_mode,
            bridge_shared_secret: std::env::var("BRIDGE_SHARED_SECRET").ok(),
            bridge_retry_base_ms: env_u64("BRIDGE_RETRY_BASE_MS", 1_000),
            bridge_retry_max_ms: env_u64("BRIDGE_RETRY_MAX_MS", 60_000),
            bridge_max_retries: env_u32("BRIDGE_MAX_RETRIES", 5),
            engine_mode,
            // Not a literal spec §6 key (mock mode never runs it, it's only
            // observed by `NoOpSessionAdapter`-bypassed worker launches in
            // process mode) but the orchestrator needs *some* command
            // template to substitute `{task}` into; defaulting it keeps mock
            // mode usable out of the box as the deterministic-echo engine.
            engine_command: env_string("ENGINE_COMMAND", "echo '{task}'"),
            task_auto_commit: env_bool("TASK_AUTO_COMMIT", true),
            task_auto_pr: env_bool("TASK_AUTO_PR", false),
            session_prefix: env_string("WORKER_SESSION_PREFIX", fm_adapters::DEFAULT_PREFIX),
            tmux_binary: env_string("WORKER_TMUX_BINARY", "tmux"),
            auto_cleanup: env_bool("WORKER_AUTO_CLEANUP", true),
            failed_retention_hours: env_u32("WORKER_FAILED_RETENTION_HOURS", 0),
            max_concurrent_workers: env_usize("MAX_CONCURRENT_WORKERS", 4),
            cancel_timeout_ms: env_u64("CANCEL_TIMEOUT_MS", 30_000),
        })
    }

    pub fn socket_path(&self) -> PathBuf {
        self.data_dir.join("daemon.sock")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("daemon.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("daemon.log")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
