// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Launcher (C3): wraps a [`SessionAdapter`] with the deterministic
//! naming, wait-for-exit polling, and cleanup policy the orchestrator needs.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::LauncherError;
use crate::session::SessionAdapter;

const DEFAULT_POLL_MS: u64 = 500;

/// Tracks the name -> adapter-assigned-id mapping for sessions this launcher
/// started, so callers can keep using the human-readable name everywhere.
pub struct WorkerLauncher<S: SessionAdapter> {
    adapter: S,
    sessions: Mutex<HashMap<String, String>>,
}

impl<S: SessionAdapter> WorkerLauncher<S> {
    pub fn new(adapter: S) -> Self {
        Self {
            adapter,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn adapter(&self) -> &S {
        &self.adapter
    }

    /// Kill any existing session with this name (adapters tolerate "not
    /// found"), then spawn fresh. Returns the adapter-assigned session id.
    pub async fn start_session(&self, name: &str, cwd: &Path, command: &str) -> Result<String, LauncherError> {
        let id = self.adapter.spawn(name, cwd, command, &[]).await?;
        self.sessions.lock().insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.sessions.lock().get(name).cloned()
    }

    pub async fn has_session(&self, name: &str) -> bool {
        match self.lookup(name) {
            Some(id) => self.adapter.is_alive(&id).await.unwrap_or(false),
            None => false,
        }
    }

    /// Poll every `poll_ms` (default 500) until the session is absent, or
    /// fail with a timeout error after `timeout_ms`.
    pub async fn wait_for_exit(&self, name: &str, timeout_ms: u64, poll_ms: Option<u64>) -> Result<(), LauncherError> {
        let poll = Duration::from_millis(poll_ms.unwrap_or(DEFAULT_POLL_MS));
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if !self.has_session(name).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LauncherError::Timeout {
                    name: name.to_string(),
                    timeout_ms,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Kill the session, tolerating "no such session" (e.g. it was never
    /// started by this launcher, or already exited).
    pub async fn kill_session(&self, name: &str) -> Result<(), LauncherError> {
        if let Some(id) = self.lookup(name) {
            self.adapter.kill(&id).await?;
            self.sessions.lock().remove(name);
        }
        Ok(())
    }

    /// Names of every currently-live session known to the adapter.
    pub async fn list_sessions(&self) -> Result<Vec<String>, LauncherError> {
        Ok(self.adapter.list_sessions().await?)
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
