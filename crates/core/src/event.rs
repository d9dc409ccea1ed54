// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only task audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity of a recorded task event. Illegal-transition rejections are
/// recorded at `Warn`; everything else at `Info` unless noted otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
}

/// One entry in a task's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub at: DateTime<Utc>,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    #[serde(default = "default_severity")]
    pub severity: EventSeverity,
}

fn default_severity() -> EventSeverity {
    EventSeverity::Info
}

impl TaskEvent {
    pub fn new(at: DateTime<Utc>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            at,
            kind: kind.into(),
            message: message.into(),
            details: None,
            severity: EventSeverity::Info,
        }
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }
}
