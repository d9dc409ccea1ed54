// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;

/// Sends (or, for the bridge, submits) one record's payload.
///
/// `Ok(Some(task_id))` is the bridge's ack with the created task id;
/// `Ok(None)` is a plain outbox send succeeding with nothing to report
/// back. `Err` carries the failure message recorded as `lastError`.
#[async_trait]
pub trait Dispatcher<P>: Send + Sync {
    async fn dispatch(&self, payload: &P) -> Result<Option<String>, String>;
}
