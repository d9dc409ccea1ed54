// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Failing,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub total_tasks: usize,
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub blocked: usize,
    pub cancelled: usize,
    pub stale_queued: usize,
    pub stale_running: usize,
    pub stale_worktrees: usize,
    pub orphaned_worker_slots: usize,
}

impl HealthMetrics {
    fn has_degradation_signal(&self) -> bool {
        self.stale_queued > 0 || self.stale_running > 0 || self.stale_worktrees > 0 || self.orphaned_worker_slots > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub issues: Vec<String>,
    pub metrics: HealthMetrics,
}

/// `degraded` iff any `stale*`/`orphanedWorkerSlots` metric is non-zero;
/// `failing` iff `failed` is nonzero and no terminal progress has landed
/// within `stale_window` of `checked_at`.
pub fn assess(metrics: HealthMetrics, checked_at: DateTime<Utc>, last_terminal_progress_at: Option<DateTime<Utc>>, stale_window: chrono::Duration) -> HealthReport {
    let mut issues = Vec::new();

    let no_recent_progress = match last_terminal_progress_at {
        Some(at) => checked_at.signed_duration_since(at) > stale_window,
        None => metrics.total_tasks > 0,
    };

    let status = if metrics.failed > 0 && no_recent_progress {
        issues.push(format!("{} failed task(s) with no recent terminal progress", metrics.failed));
        HealthStatus::Failing
    } else if metrics.has_degradation_signal() {
        if metrics.stale_queued > 0 {
            issues.push(format!("{} stale queued task(s)", metrics.stale_queued));
        }
        if metrics.stale_running > 0 {
            issues.push(format!("{} stale running task(s)", metrics.stale_running));
        }
        if metrics.stale_worktrees > 0 {
            issues.push(format!("{} stale worktree(s)", metrics.stale_worktrees));
        }
        if metrics.orphaned_worker_slots > 0 {
            issues.push(format!("{} orphaned worker slot(s)", metrics.orphaned_worker_slots));
        }
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };

    HealthReport {
        status,
        checked_at,
        issues,
        metrics,
    }
}
