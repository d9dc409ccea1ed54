// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup wiring: acquires the single-instance lock, runs the startup
//! integrity gate, and constructs every component from [`Config`].

use std::sync::Arc;

use fs2::FileExt;
use tracing::{error, info, warn};

use async_trait::async_trait;
use fm_adapters::session::{NoOpSessionAdapter, SessionAdapter, SessionError, TmuxAdapter};
use fm_core::{SystemClock, UuidIdGen};
use fm_engine::{Orchestrator, OrchestratorConfig};
use fm_outbox::{Dispatcher, Outbox, OutboxConfig};
use fm_release::ReleaseManager;
use fm_worktree::{WorktreeManager, WorktreeManagerConfig};
use std::path::Path;

use crate::config::{Config, EngineMode};
use crate::error::DaemonError;

/// A no-op dispatcher for the outbound transport outbox and inbound bridge
/// until a real transport/webhook target is wired in.
struct NullDispatcher;

#[async_trait]
impl<P: Send + Sync> Dispatcher<P> for NullDispatcher {
    async fn dispatch(&self, _payload: &P) -> Result<Option<String>, String> {
        Ok(None)
    }
}

/// Selects between the engine modes spec §6 recognizes (`mock` | `process`)
/// at startup without needing `fm-engine` to be generic over a trait object
/// (`SessionAdapter: Clone` rules that out).
#[derive(Clone)]
enum ConfiguredSessionAdapter {
    Mock(NoOpSessionAdapter),
    Process(TmuxAdapter),
}

#[async_trait]
impl SessionAdapter for ConfiguredSessionAdapter {
    async fn spawn(&self, name: &str, cwd: &Path, cmd: &str, env: &[(String, String)]) -> Result<String, SessionError> {
        match self {
            Self::Mock(a) => a.spawn(name, cwd, cmd, env).await,
            Self::Process(a) => a.spawn(name, cwd, cmd, env).await,
        }
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        match self {
            Self::Mock(a) => a.send(id, input).await,
            Self::Process(a) => a.send(id, input).await,
        }
    }

    async fn send_literal(&self, id: &str, text: &str) -> Result<(), SessionError> {
        match self {
            Self::Mock(a) => a.send_literal(id, text).await,
            Self::Process(a) => a.send_literal(id, text).await,
        }
    }

    async fn send_enter(&self, id: &str) -> Result<(), SessionError> {
        match self {
            Self::Mock(a) => a.send_enter(id).await,
            Self::Process(a) => a.send_enter(id).await,
        }
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        match self {
            Self::Mock(a) => a.kill(id).await,
            Self::Process(a) => a.kill(id).await,
        }
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        match self {
            Self::Mock(a) => a.is_alive(id).await,
            Self::Process(a) => a.is_alive(id).await,
        }
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SessionError> {
        match self {
            Self::Mock(a) => a.capture_output(id, lines).await,
            Self::Process(a) => a.capture_output(id, lines).await,
        }
    }

    async fn is_process_running(&self, id: &str, pattern: &str) -> Result<bool, SessionError> {
        match self {
            Self::Mock(a) => a.is_process_running(id, pattern).await,
            Self::Process(a) => a.is_process_running(id, pattern).await,
        }
    }

    async fn get_exit_code(&self, id: &str) -> Result<Option<i32>, SessionError> {
        match self {
            Self::Mock(a) => a.get_exit_code(id).await,
            Self::Process(a) => a.get_exit_code(id).await,
        }
    }

    async fn list_sessions(&self) -> Result<Vec<String>, SessionError> {
        match self {
            Self::Mock(a) => a.list_sessions().await,
            Self::Process(a) => a.list_sessions().await,
        }
    }
}

pub type EngineOrchestrator = Orchestrator<ConfiguredSessionAdapter, SystemClock, UuidIdGen>;

/// Everything the running daemon owns. Dropping this (after `lock_file` is
/// released) tears the process down cleanly.
pub struct Daemon {
    pub config: Config,
    pub orchestrator: Arc<EngineOrchestrator>,
    pub outbound_outbox: Arc<Outbox<serde_json::Value, NullDispatcher, SystemClock>>,
    pub bridge_outbox: Arc<Outbox<serde_json::Value, NullDispatcher, SystemClock>>,
    lock_file: std::fs::File,
}

impl Daemon {
    pub fn release_manager(&self) -> ReleaseManager<SystemClock> {
        ReleaseManager::new(self.config.release_root_dir.clone(), SystemClock)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.lock_file);
        if self.config.lock_path().exists() {
            let _ = std::fs::remove_file(self.config.lock_path());
        }
    }
}

fn acquire_lock(config: &Config) -> Result<std::fs::File, DaemonError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(config.lock_path())?;
    lock_file.try_lock_exclusive().map_err(DaemonError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Runs the integrity check against `startup_integrity_mode`, per spec §6's
/// exit semantics: `strict` + not-ok is fatal, `warn` + not-ok logs and
/// continues, `off` skips the check entirely.
fn run_integrity_gate(release_manager: &ReleaseManager<SystemClock>, mode: fm_release::IntegrityMode) -> Result<(), DaemonError> {
    if mode == fm_release::IntegrityMode::Off {
        info!("startup integrity check skipped (STARTUP_INTEGRITY_MODE=off)");
        return Ok(());
    }

    let report = release_manager.integrity_check(mode);
    if report.ok {
        info!(checked = report.checked, "startup integrity check passed");
        return Ok(());
    }

    match mode {
        fm_release::IntegrityMode::Strict => {
            error!(?report, "startup integrity check failed, refusing to start");
            Err(DaemonError::IntegrityFailed(report))
        }
        fm_release::IntegrityMode::Warn => {
            warn!(?report, "startup integrity check failed, continuing anyway");
            Ok(())
        }
        fm_release::IntegrityMode::Off => unreachable!("handled above"),
    }
}

/// Acquires the lock, runs the integrity gate, and wires every component
/// into a running [`Daemon`].
pub async fn startup(config: Config) -> Result<Daemon, DaemonError> {
    let lock_file = acquire_lock(&config)?;

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(&config.release_root_dir)?;
    std::fs::create_dir_all(&config.worktree_root_dir)?;
    std::fs::create_dir_all(config.data_dir.join("tasks"))?;

    let release_manager = ReleaseManager::new(config.release_root_dir.clone(), SystemClock);
    run_integrity_gate(&release_manager, config.startup_integrity_mode)?;

    let worktree_manager = WorktreeManager::new(WorktreeManagerConfig::new(config.worktree_root_dir.clone()));

    let session_adapter = match config.engine_mode {
        EngineMode::Mock => ConfiguredSessionAdapter::Mock(NoOpSessionAdapter::new()),
        EngineMode::Process => ConfiguredSessionAdapter::Process(TmuxAdapter::new()),
    };

    let orchestrator_config = OrchestratorConfig {
        max_concurrent_workers: config.max_concurrent_workers,
        cancel_timeout_ms: config.cancel_timeout_ms,
        session_prefix: config.session_prefix.clone(),
        auto_cleanup: config.auto_cleanup,
        failed_retention_hours: config.failed_retention_hours,
        engine_command: Some(config.engine_command.clone()),
        ..OrchestratorConfig::default()
    };

    let orchestrator = Arc::new(Orchestrator::new(
        worktree_manager,
        session_adapter,
        SystemClock,
        UuidIdGen,
        orchestrator_config,
        config.data_dir.clone(),
    ));

    let outbox_config = OutboxConfig { max_retries: config.bridge_max_retries, retry_base_ms: config.bridge_retry_base_ms, retry_max_ms: config.bridge_retry_max_ms };

    let outbound_outbox = Arc::new(
        Outbox::new(config.data_dir.join("outbox-state.json"), NullDispatcher, SystemClock, outbox_config.clone(), None)
            .map_err(|e| DaemonError::InvalidConfig(e.to_string()))?,
    );
    let bridge_outbox = Arc::new(
        Outbox::new(config.data_dir.join("bridge-state.json"), NullDispatcher, SystemClock, outbox_config, config.bridge_shared_secret.clone())
            .map_err(|e| DaemonError::InvalidConfig(e.to_string()))?,
    );

    Ok(Daemon { config, orchestrator, outbound_outbox, bridge_outbox, lock_file })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
