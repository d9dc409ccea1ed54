// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator (C6): owns the task map, drives submissions through the
//! state machine, and runs the execution loop that allocates worktrees,
//! launches workers, and reacts to their completion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use fm_adapters::session::SessionAdapter;
use fm_adapters::{cleanup, naming, WorkerLauncher};
use fm_core::{
    next_task_id, CancelOutcome, Clock, IdGen, NewTask, RepoRegistration, RepoRegistry, Task, TaskArtifact, TaskId, TaskSource, TaskState,
};
use fm_worktree::{WorktreeInfo, WorktreeManager};

use crate::artifact::{self, ArtifactStatus, WorkerArtifact};
use crate::config::OrchestratorConfig;
use crate::error::EngineError;
use crate::health::{self, HealthMetrics, HealthReport};
use crate::submit::SubmitRequest;

const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

#[derive(Debug, Serialize, Deserialize)]
struct TaskSnapshot {
    tasks: Vec<Task>,
}

pub struct Orchestrator<S: SessionAdapter, C: Clock, G: IdGen> {
    tasks: Mutex<HashMap<String, Task>>,
    worktrees: Mutex<HashMap<String, WorktreeInfo>>,
    repos: RwLock<RepoRegistry>,
    worktree_manager: WorktreeManager,
    launcher: WorkerLauncher<S>,
    clock: C,
    id_gen: G,
    config: OrchestratorConfig,
    snapshot_path: PathBuf,
}

impl<S: SessionAdapter, C: Clock, G: IdGen> Orchestrator<S, C, G> {
    pub fn new(
        worktree_manager: WorktreeManager,
        adapter: S,
        clock: C,
        id_gen: G,
        config: OrchestratorConfig,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            worktrees: Mutex::new(HashMap::new()),
            repos: RwLock::new(RepoRegistry::new()),
            worktree_manager,
            launcher: WorkerLauncher::new(adapter),
            clock,
            id_gen,
            config,
            snapshot_path: data_dir.into().join("tasks").join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn register_repo(&self, repo: RepoRegistration) {
        self.repos.write().register(repo);
    }

    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().get(id.as_str()).cloned()
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.tasks.lock().values().cloned().collect()
    }

    /// `submitTask`: resolve the repo, mint an id, compute the deterministic
    /// worker session key, expand `fanout` into child tasks, persist.
    pub fn submit_task(&self, req: SubmitRequest) -> Result<Task, EngineError> {
        let now = self.clock.now();
        let repo = self.repos.read().resolve(req.repo_id.as_deref())?.clone();

        let task_id = next_task_id(&self.clock, &self.id_gen);
        let session_key = naming::session_name(&self.config.session_prefix, repo.id.as_str(), &req.text, task_id.as_str());

        let mut task = Task::new(
            NewTask {
                id: task_id.clone(),
                text: req.text,
                repo_id: repo.id.clone(),
                worker_session_key: session_key,
                source: req.source,
                max_retries: self.config.default_max_retries,
                parent_task_id: req.parent_task_id,
            },
            now,
        );

        let mut children = Vec::with_capacity(req.fanout.len());
        {
            let mut tasks = self.tasks.lock();
            for (i, child_text) in req.fanout.into_iter().enumerate() {
                let child_id = next_task_id(&self.clock, &self.id_gen);
                let child_key = naming::session_name(&self.config.session_prefix, repo.id.as_str(), &child_text, child_id.as_str());
                let child = Task::new(
                    NewTask {
                        id: child_id.clone(),
                        text: child_text,
                        repo_id: repo.id.clone(),
                        worker_session_key: child_key,
                        source: TaskSource::System,
                        max_retries: self.config.default_max_retries,
                        parent_task_id: Some(task_id.clone()),
                    },
                    now,
                );
                tracing::info!(task_id = %child.id, parent = %task_id, fanout_index = i, "fanout child task created");
                children.push(child_id);
                tasks.insert(child.id.as_str().to_string(), child);
            }
            task.children = children;
            tracing::info!(task_id = %task.id, repo_id = %repo.id, "task submitted");
            tasks.insert(task.id.as_str().to_string(), task.clone());
        }

        self.persist()?;
        Ok(task)
    }

    /// `cancel()`. `queued`/`blocked` resolve synchronously; `running` kills
    /// the session and waits up to `cancelTimeoutMs` for confirmed exit.
    pub async fn cancel_task(&self, id: &TaskId) -> Result<CancelOutcome, EngineError> {
        let now = self.clock.now();
        let (outcome, session_key) = {
            let mut tasks = self.tasks.lock();
            let task = tasks.get_mut(id.as_str()).ok_or_else(|| EngineError::TaskNotFound(id.as_str().to_string()))?;
            (task.request_cancel(now)?, task.worker_session_key.clone())
        };
        self.persist()?;

        if outcome == CancelOutcome::Pending {
            self.launcher.kill_session(&session_key).await?;
            let exited = self
                .launcher
                .wait_for_exit(&session_key, self.config.cancel_timeout_ms, Some(self.config.poll_ms))
                .await;

            let now = self.clock.now();
            let mut tasks = self.tasks.lock();
            let task = tasks.get_mut(id.as_str()).ok_or_else(|| EngineError::TaskNotFound(id.as_str().to_string()))?;
            match exited {
                Ok(()) => task.confirm_cancelled(now)?,
                Err(_) => task.cancel_timeout(now)?,
            }
            drop(tasks);
            self.persist()?;
        }

        Ok(outcome)
    }

    /// Spawn one Tokio task per currently-startable `queued` task, up to
    /// the available concurrency headroom. Global FIFO by `createdAt`
    /// satisfies the per-repo FIFO guarantee as a side effect: any two
    /// same-repo tasks necessarily appear in creation order regardless of
    /// interleaving with other repos.
    pub async fn run_once(self: Arc<Self>) -> Result<usize, EngineError> {
        let running = self.tasks.lock().values().filter(|t| t.state == TaskState::Running).count();
        let slots = self.config.max_concurrent_workers.saturating_sub(running);
        if slots == 0 {
            return Ok(0);
        }

        let mut candidates: Vec<Task> = self.tasks.lock().values().filter(|t| t.state == TaskState::Queued).cloned().collect();
        candidates.sort_by_key(|t| t.created_at);
        candidates.truncate(slots);

        let started = candidates.len();
        for task in candidates {
            let me = Arc::clone(&self);
            tokio::spawn(async move {
                me.run_task(task.id).await;
            });
        }
        Ok(started)
    }

    async fn run_task(&self, task_id: TaskId) {
        if let Err(err) = self.run_task_inner(&task_id).await {
            tracing::error!(task_id = %task_id, error = %err, "worker run failed");
            let now = self.clock.now();
            let mut tasks = self.tasks.lock();
            if let Some(task) = tasks.get_mut(task_id.as_str()) {
                if task.state == TaskState::Running {
                    let _ = task.complete_failure(now, true, err.to_string());
                }
            }
            drop(tasks);
            let _ = self.persist();
        }
    }

    async fn run_task_inner(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let command = self.config.engine_command.clone().ok_or(EngineError::MissingEngineCommand)?;

        let (repo_id, text, session_key) = {
            let tasks = self.tasks.lock();
            let task = tasks.get(task_id.as_str()).ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
            (task.repo_id.clone(), task.text.clone(), task.worker_session_key.clone())
        };
        let repo = self.repos.read().resolve(Some(repo_id.as_str()))?.clone();

        let worktree_info = self.worktree_manager.create_worktree(&repo, task_id).await?;
        self.worktrees.lock().insert(task_id.as_str().to_string(), worktree_info.clone());

        {
            let now = self.clock.now();
            let mut tasks = self.tasks.lock();
            let task = tasks.get_mut(task_id.as_str()).ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
            task.start(now)?;
        }
        self.persist()?;

        let command = command.replace("{task}", &text);
        self.launcher.start_session(&session_key, &worktree_info.path, &command).await?;
        tracing::info!(task_id = %task_id, session = %session_key, "worker session started");

        let poll = Duration::from_millis(self.config.poll_ms);
        loop {
            if !self.launcher.has_session(&session_key).await {
                break;
            }
            if self.tasks.lock().get(task_id.as_str()).map(|t| t.cancel_requested).unwrap_or(false) {
                self.launcher.kill_session(&session_key).await?;
                let exited = self
                    .launcher
                    .wait_for_exit(&session_key, self.config.cancel_timeout_ms, Some(self.config.poll_ms))
                    .await;
                let now = self.clock.now();
                let mut tasks = self.tasks.lock();
                let task = tasks.get_mut(task_id.as_str()).ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
                match exited {
                    Ok(()) => task.confirm_cancelled(now)?,
                    Err(_) => task.cancel_timeout(now)?,
                }
                drop(tasks);
                self.persist()?;
                self.teardown_worktree(task_id, &repo, &worktree_info.path, TaskState::Cancelled).await?;
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }

        let parsed = artifact::read_artifact(&worktree_info.path);
        let resulting_state = self.finish_task(task_id, &worktree_info, parsed).await?;
        if resulting_state != TaskState::Queued {
            self.teardown_worktree(task_id, &repo, &worktree_info.path, resulting_state).await?;
        }
        Ok(())
    }

    async fn finish_task(&self, task_id: &TaskId, worktree_info: &WorktreeInfo, artifact: Option<WorkerArtifact>) -> Result<TaskState, EngineError> {
        let now = self.clock.now();
        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(task_id.as_str()).ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;

        let state = match artifact {
            Some(a) if a.status == Some(ArtifactStatus::Success) => {
                let task_artifact = TaskArtifact {
                    summary: a.summary,
                    worktree_path: Some(worktree_info.path.clone()),
                    branch: a.branch.or(Some(worktree_info.branch.clone())),
                    commit_sha: a.commit_sha,
                    pr_url: a.pr_url,
                    checks_summary: a.checks_summary,
                };
                task.complete_success(now, Some(task_artifact))?;
                TaskState::Done
            }
            Some(a) if a.status == Some(ArtifactStatus::Block) => {
                task.block(now, a.summary.unwrap_or_else(|| "worker requested human intervention".to_string()))?;
                TaskState::Blocked
            }
            Some(a) => {
                let retriable = a.retriable.unwrap_or(true);
                let message = a.summary.unwrap_or_else(|| "worker reported failure".to_string());
                task.complete_failure(now, retriable, message)?
            }
            None => task.complete_failure(now, true, "no completion artifact found; worker likely killed before writing one")?,
        };
        drop(tasks);
        self.persist()?;
        Ok(state)
    }

    async fn teardown_worktree(&self, task_id: &TaskId, repo: &RepoRegistration, path: &std::path::Path, terminal_state: TaskState) -> Result<(), EngineError> {
        let decision = cleanup::should_cleanup(
            terminal_state,
            cleanup::CleanupConfig {
                auto_cleanup: self.config.auto_cleanup,
                failed_retention_hours: self.config.failed_retention_hours,
            },
        );
        if !decision.cleanup {
            tracing::info!(task_id = %task_id, reason = %decision.reason, "worktree retained");
            return Ok(());
        }
        self.worktree_manager.destroy_worktree(repo, path).await?;
        self.worktrees.lock().remove(task_id.as_str());
        tracing::info!(task_id = %task_id, reason = %decision.reason, "worktree cleaned up");
        Ok(())
    }

    fn persist(&self) -> Result<(), EngineError> {
        let tasks: Vec<Task> = self.tasks.lock().values().cloned().collect();
        let bytes = serde_json::to_vec_pretty(&TaskSnapshot { tasks })?;
        fm_storage::write_atomic(&self.snapshot_path, &bytes)?;
        Ok(())
    }

    /// `getHealthStatus()`.
    pub async fn health_report(&self) -> Result<HealthReport, EngineError> {
        let now = self.clock.now();
        let tasks: Vec<Task> = self.tasks.lock().values().cloned().collect();

        let mut metrics = HealthMetrics {
            total_tasks: tasks.len(),
            ..Default::default()
        };
        let mut last_terminal_progress_at = None;

        for task in &tasks {
            match task.state {
                TaskState::Queued => {
                    metrics.queued += 1;
                    if now.signed_duration_since(task.updated_at).num_milliseconds() as u64 > self.config.stale_queued_after_ms {
                        metrics.stale_queued += 1;
                    }
                }
                TaskState::Running => {
                    metrics.running += 1;
                    if now.signed_duration_since(task.started_at.unwrap_or(task.updated_at)).num_milliseconds() as u64 > self.config.stale_running_after_ms {
                        metrics.stale_running += 1;
                    }
                }
                TaskState::Done => metrics.done += 1,
                TaskState::Failed => metrics.failed += 1,
                TaskState::Blocked => metrics.blocked += 1,
                TaskState::Cancelled => metrics.cancelled += 1,
            }
            if task.state.is_terminal() {
                if let Some(finished) = task.finished_at {
                    last_terminal_progress_at = Some(last_terminal_progress_at.map_or(finished, |p: chrono::DateTime<Utc>| p.max(finished)));
                }
            }
        }

        metrics.stale_worktrees = self
            .worktree_manager
            .list_stale(&self.clock, Duration::from_millis(self.config.stale_worktree_after_ms))?
            .len();

        let running_keys: std::collections::HashSet<String> = tasks.iter().filter(|t| t.state == TaskState::Running).map(|t| t.worker_session_key.clone()).collect();
        let live_sessions = self.launcher.list_sessions().await?;
        metrics.orphaned_worker_slots = live_sessions.iter().filter(|s| !running_keys.contains(*s)).count();

        Ok(health::assess(metrics, now, last_terminal_progress_at, chrono::Duration::milliseconds(self.config.failing_window_ms)))
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
