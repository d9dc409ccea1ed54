// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::time::Duration;

use super::*;
use fm_adapters::session::{FakeSessionAdapter, SessionCall};
use fm_core::{slug, FakeClock, RepoId, SequentialIdGen};
use tokio::process::Command;

async fn init_repo(dir: &Path) -> RepoRegistration {
    let run = |args: &[&str]| {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir).args(args);
        cmd
    };
    run(&["init", "-b", "main"]).output().await.unwrap();
    run(&["config", "user.email", "test@example.com"]).output().await.unwrap();
    run(&["config", "user.name", "test"]).output().await.unwrap();
    std::fs::write(dir.join("README.md"), "hello").unwrap();
    run(&["add", "."]).output().await.unwrap();
    run(&["commit", "-m", "initial"]).output().await.unwrap();
    RepoRegistration::new(RepoId::new("repo-1"), dir.to_path_buf(), "main", None, true, chrono::Utc::now())
}

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        engine_command: Some("run-agent {task}".to_string()),
        poll_ms: 10,
        cancel_timeout_ms: 500,
        failed_retention_hours: 0,
        ..Default::default()
    }
}

type TestOrchestrator = Orchestrator<FakeSessionAdapter, FakeClock, SequentialIdGen>;

async fn build(repo: RepoRegistration, worktree_root: &Path, data_dir: &Path) -> (Arc<TestOrchestrator>, FakeSessionAdapter) {
    let manager = WorktreeManager::new(fm_worktree::WorktreeManagerConfig::new(worktree_root));
    let adapter = FakeSessionAdapter::new();
    let handle = adapter.clone();
    let orch = Orchestrator::new(manager, adapter, FakeClock::at_epoch_ms(0), SequentialIdGen::new("t"), test_config(), data_dir);
    orch.register_repo(repo);
    (Arc::new(orch), handle)
}

fn worktree_path_for(worktree_root: &Path, task_id: &TaskId) -> std::path::PathBuf {
    worktree_root.join(format!("fm-task-{}", slug(task_id.as_str(), "task", 40)))
}

#[tokio::test]
async fn submit_task_without_registered_repo_fails() {
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let manager = WorktreeManager::new(fm_worktree::WorktreeManagerConfig::new(worktree_root.path()));
    let orch: TestOrchestrator = Orchestrator::new(manager, FakeSessionAdapter::new(), FakeClock::at_epoch_ms(0), SequentialIdGen::new("t"), test_config(), data_dir.path());

    let err = orch.submit_task(SubmitRequest::new("do it", TaskSource::Operator)).unwrap_err();
    assert!(matches!(err, EngineError::Repo(_)));
}

#[tokio::test]
async fn submit_task_with_fanout_creates_children() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, _adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let parent = orch
        .submit_task(SubmitRequest::new("parent task", TaskSource::Operator).with_fanout(vec!["child a".to_string(), "child b".to_string()]))
        .unwrap();

    assert_eq!(parent.children.len(), 2);
    assert_eq!(orch.list_tasks().len(), 3);
    for child_id in &parent.children {
        let child = orch.get_task(child_id).unwrap();
        assert_eq!(child.parent_task_id.as_ref(), Some(&parent.id));
        assert_eq!(child.state, TaskState::Queued);
    }
}

#[tokio::test]
async fn cancel_queued_task_is_immediate() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, _adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let task = orch.submit_task(SubmitRequest::new("do it", TaskSource::Operator)).unwrap();
    let outcome = orch.cancel_task(&task.id).await.unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
    assert_eq!(orch.get_task(&task.id).unwrap().state, TaskState::Cancelled);
}

#[tokio::test]
async fn successful_worker_run_completes_task_and_cleans_up_worktree() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let task = orch.submit_task(SubmitRequest::new("ship the feature", TaskSource::Operator)).unwrap();
    let worktree_path = worktree_path_for(worktree_root.path(), &task.id);

    let runner = Arc::clone(&orch);
    let task_id = task.id.clone();
    let join = tokio::spawn(async move { runner.run_task_inner(&task_id).await });

    wait_for_spawn(&adapter).await;
    std::fs::write(
        worktree_path.join(crate::ARTIFACT_FILE_NAME),
        r#"{"status":"success","summary":"done","commitSha":"deadbeef"}"#,
    )
    .unwrap();
    adapter.set_exited("fake-1", 0);

    join.await.unwrap().unwrap();

    let finished = orch.get_task(&task.id).unwrap();
    assert_eq!(finished.state, TaskState::Done);
    assert_eq!(finished.artifact.as_ref().unwrap().commit_sha.as_deref(), Some("deadbeef"));
    assert!(!worktree_path.exists(), "worktree should be cleaned up after a done task");
}

#[tokio::test]
async fn retriable_failure_requeues_task_and_keeps_worktree() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let task = orch.submit_task(SubmitRequest::new("flaky task", TaskSource::Operator)).unwrap();
    let worktree_path = worktree_path_for(worktree_root.path(), &task.id);

    let runner = Arc::clone(&orch);
    let task_id = task.id.clone();
    let join = tokio::spawn(async move { runner.run_task_inner(&task_id).await });

    wait_for_spawn(&adapter).await;
    // no artifact written: absence is treated as failure, retriable = true
    adapter.set_exited("fake-1", 1);

    join.await.unwrap().unwrap();

    let after = orch.get_task(&task.id).unwrap();
    assert_eq!(after.state, TaskState::Queued);
    assert_eq!(after.retry_count, 1);
    assert!(worktree_path.exists(), "a requeued task's worktree is left for the next run to reuse");
}

#[tokio::test]
async fn block_artifact_transitions_task_to_blocked() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let task = orch.submit_task(SubmitRequest::new("needs a human", TaskSource::Operator)).unwrap();
    let worktree_path = worktree_path_for(worktree_root.path(), &task.id);

    let runner = Arc::clone(&orch);
    let task_id = task.id.clone();
    let join = tokio::spawn(async move { runner.run_task_inner(&task_id).await });

    wait_for_spawn(&adapter).await;
    std::fs::write(worktree_path.join(crate::ARTIFACT_FILE_NAME), r#"{"status":"block","summary":"needs approval"}"#).unwrap();
    adapter.set_exited("fake-1", 0);

    join.await.unwrap().unwrap();

    let after = orch.get_task(&task.id).unwrap();
    assert_eq!(after.state, TaskState::Blocked);
}

#[tokio::test]
async fn health_report_is_ok_with_no_tasks() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, _adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    let report = orch.health_report().await.unwrap();
    assert_eq!(report.status, crate::HealthStatus::Ok);
    assert_eq!(report.metrics.total_tasks, 0);
}

#[tokio::test]
async fn health_report_counts_queued_task() {
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = init_repo(repo_dir.path()).await;
    let worktree_root = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let (orch, _adapter) = build(repo, worktree_root.path(), data_dir.path()).await;

    orch.submit_task(SubmitRequest::new("one", TaskSource::Operator)).unwrap();
    let report = orch.health_report().await.unwrap();
    assert_eq!(report.metrics.queued, 1);
    assert_eq!(report.status, crate::HealthStatus::Ok);
}

async fn wait_for_spawn(adapter: &FakeSessionAdapter) {
    for _ in 0..200 {
        if adapter.calls().iter().any(|c| matches!(c, SessionCall::Spawn { .. })) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for worker session spawn");
}
