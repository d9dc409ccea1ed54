// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::{RepoId, TaskId};

fn new_task(max_retries: u32) -> Task {
    let now = Utc::now();
    Task::new(
        NewTask {
            id: TaskId::new("task-1"),
            text: "do the thing".to_string(),
            repo_id: RepoId::new("repo-1"),
            worker_session_key: "session-1".to_string(),
            source: TaskSource::Operator,
            max_retries,
            parent_task_id: None,
        },
        now,
    )
}

#[test]
fn fresh_task_is_queued_with_submit_event() {
    let task = new_task(2);
    assert_eq!(task.state, TaskState::Queued);
    assert_eq!(task.events.len(), 1);
    assert_eq!(task.events[0].kind, "submit");
}

#[test]
fn start_then_complete_success_reaches_done() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    assert_eq!(task.state, TaskState::Running);
    assert_eq!(task.started_at, Some(now));

    task.complete_success(now, None).unwrap();
    assert_eq!(task.state, TaskState::Done);
    assert!(task.finished_at.is_some());
}

#[test]
fn complete_failure_retries_until_budget_exhausted_then_fails() {
    let mut task = new_task(1);
    let now = Utc::now();

    task.start(now).unwrap();
    let state = task.complete_failure(now, true, "boom").unwrap();
    assert_eq!(state, TaskState::Queued);
    assert_eq!(task.retry_count, 1);

    task.start(now).unwrap();
    let state = task.complete_failure(now, true, "boom again").unwrap();
    assert_eq!(state, TaskState::Failed);
    assert!(task.escalation_required);
}

#[test]
fn complete_failure_non_retriable_fails_immediately() {
    let mut task = new_task(5);
    let now = Utc::now();
    task.start(now).unwrap();
    let state = task.complete_failure(now, false, "fatal").unwrap();
    assert_eq!(state, TaskState::Failed);
    assert_eq!(task.retry_count, 0);
}

#[test]
fn block_then_unblock_returns_to_queue() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    task.block(now, "waiting on review").unwrap();
    assert_eq!(task.state, TaskState::Blocked);

    task.unblock(now).unwrap();
    assert_eq!(task.state, TaskState::Queued);
}

#[test]
fn cancel_from_queued_is_immediate() {
    let mut task = new_task(2);
    let now = Utc::now();
    let outcome = task.request_cancel(now).unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
    assert_eq!(task.state, TaskState::Cancelled);
}

#[test]
fn cancel_from_blocked_is_immediate() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    task.block(now, "waiting").unwrap();
    let outcome = task.request_cancel(now).unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
    assert_eq!(task.state, TaskState::Cancelled);
}

#[test]
fn cancel_from_running_is_two_phase() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();

    let outcome = task.request_cancel(now).unwrap();
    assert_eq!(outcome, CancelOutcome::Pending);
    assert_eq!(task.state, TaskState::Running);
    assert!(task.cancel_requested);

    let second = task.request_cancel(now).unwrap();
    assert_eq!(second, CancelOutcome::AlreadyPending);

    task.confirm_cancelled(now).unwrap();
    assert_eq!(task.state, TaskState::Cancelled);
}

#[test]
fn cancel_timeout_fails_the_task() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    task.request_cancel(now).unwrap();
    task.cancel_timeout(now).unwrap();
    assert_eq!(task.state, TaskState::Failed);
    assert!(task.escalation_required);
}

#[test]
fn cancel_on_terminal_state_is_noop() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    task.complete_success(now, None).unwrap();
    let outcome = task.request_cancel(now).unwrap();
    assert_eq!(outcome, CancelOutcome::NoOp);
    assert_eq!(task.state, TaskState::Done);
}

#[test]
fn illegal_transition_is_rejected_and_logged() {
    let mut task = new_task(2);
    let now = Utc::now();
    task.start(now).unwrap();
    let err = task.start(now);
    assert!(matches!(err, Err(TransitionError::Illegal { from: TaskState::Running, transition: "start" })));
    assert_eq!(task.events.last().unwrap().kind, "rejected");
}
