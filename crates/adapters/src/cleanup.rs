// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-terminal-state session cleanup policy (C3 Worker Launcher).

use fm_core::TaskState;

#[derive(Debug, Clone, Copy)]
pub struct CleanupConfig {
    pub auto_cleanup: bool,
    pub failed_retention_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupDecision {
    pub cleanup: bool,
    pub reason: String,
}

/// Decide whether a worker's session should be cleaned up after its task
/// left `running`. Unlike [`TaskState::is_terminal`], `blocked` counts as a
/// resting state here too: the worker session ends the same way whether the
/// task is waiting for an operator or is truly done.
pub fn should_cleanup(terminal_state: TaskState, config: CleanupConfig) -> CleanupDecision {
    debug_assert_ne!(terminal_state, TaskState::Running);
    debug_assert_ne!(terminal_state, TaskState::Queued);

    if !config.auto_cleanup {
        return CleanupDecision {
            cleanup: false,
            reason: "autocleanup_disabled".to_string(),
        };
    }

    let is_failed_or_blocked = matches!(terminal_state, TaskState::Failed) || terminal_state == TaskState::Blocked;
    if is_failed_or_blocked && config.failed_retention_hours > 0 {
        return CleanupDecision {
            cleanup: false,
            reason: format!("retained_for_{}h", config.failed_retention_hours),
        };
    }
    if is_failed_or_blocked {
        return CleanupDecision {
            cleanup: true,
            reason: "failed_cleanup_immediate".to_string(),
        };
    }

    CleanupDecision {
        cleanup: true,
        reason: "terminal_cleanup".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(auto_cleanup: bool, retention: u32) -> CleanupConfig {
        CleanupConfig {
            auto_cleanup,
            failed_retention_hours: retention,
        }
    }

    #[test]
    fn disabled_autocleanup_never_cleans() {
        let d = should_cleanup(TaskState::Done, cfg(false, 0));
        assert!(!d.cleanup);
        assert_eq!(d.reason, "autocleanup_disabled");
    }

    #[test]
    fn failed_with_retention_is_retained() {
        let d = should_cleanup(TaskState::Failed, cfg(true, 24));
        assert!(!d.cleanup);
        assert_eq!(d.reason, "retained_for_24h");
    }

    #[test]
    fn failed_without_retention_cleans_immediately() {
        let d = should_cleanup(TaskState::Failed, cfg(true, 0));
        assert!(d.cleanup);
        assert_eq!(d.reason, "failed_cleanup_immediate");
    }

    #[test]
    fn cancelled_with_retention_zero_cleans_immediately() {
        let d = should_cleanup(TaskState::Cancelled, cfg(true, 24));
        assert!(d.cleanup);
        assert_eq!(d.reason, "terminal_cleanup");
    }

    #[test]
    fn done_always_cleans_when_enabled() {
        let d = should_cleanup(TaskState::Done, cfg(true, 48));
        assert!(d.cleanup);
        assert_eq!(d.reason, "terminal_cleanup");
    }
}
