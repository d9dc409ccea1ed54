// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::RecordStatus;

/// Readable concurrently with dispatch: counts per status plus the most
/// recent failure seen by the pump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub queued: usize,
    pub retrying: usize,
    pub sent: usize,
    pub acked: usize,
    pub poison: usize,
    pub last_error: Option<String>,
}

impl HealthSnapshot {
    pub(crate) fn from_counts(counts: HashMap<RecordStatus, usize>, last_error: Option<String>) -> Self {
        Self {
            queued: counts.get(&RecordStatus::Queued).copied().unwrap_or(0),
            retrying: counts.get(&RecordStatus::Retrying).copied().unwrap_or(0),
            sent: counts.get(&RecordStatus::Sent).copied().unwrap_or(0),
            acked: counts.get(&RecordStatus::Acked).copied().unwrap_or(0),
            poison: counts.get(&RecordStatus::Poison).copied().unwrap_or(0),
            last_error,
        }
    }
}
