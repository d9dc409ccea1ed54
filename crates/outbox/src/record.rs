// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Queued,
    Retrying,
    Sent,
    Acked,
    Poison,
}

impl RecordStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Sent | RecordStatus::Acked | RecordStatus::Poison)
    }

    pub fn is_due_for_dispatch(self) -> bool {
        matches!(self, RecordStatus::Queued | RecordStatus::Retrying)
    }
}

/// One outbox/bridge record. Generic over the payload type so the same
/// primitive serves both the outbound transport outbox and the inbound
/// webhook supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<P> {
    pub id: String,
    pub idempotency_key: String,
    pub status: RecordStatus,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: P,
    pub last_error: Option<String>,
    /// Set when a bridge dispatch acks with a created task id.
    pub task_id: Option<String>,
}

impl<P> Record<P> {
    pub fn new(id: String, idempotency_key: String, payload: P, now: DateTime<Utc>) -> Self {
        Self {
            id,
            idempotency_key,
            status: RecordStatus::Queued,
            attempts: 0,
            next_attempt_at: now,
            created_at: now,
            updated_at: now,
            payload,
            last_error: None,
            task_id: None,
        }
    }
}
