// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox / Bridge Supervisor (C5): a durable queue-with-retry primitive
//! generic over a payload type and a [`Dispatcher`], reused for both the
//! outbound transport outbox and the inbound webhook bridge.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tracing::{error, info, warn};
use uuid::Uuid;

use fm_core::Clock;

use crate::auth::secrets_match;
use crate::backoff::next_delay_ms;
use crate::config::OutboxConfig;
use crate::dispatcher::Dispatcher;
use crate::error::OutboxError;
use crate::health::HealthSnapshot;
use crate::record::{Record, RecordStatus};
use crate::state::{self, PersistedState};

#[derive(Debug, Clone)]
pub enum EnqueueOutcome<P> {
    Created(Record<P>),
    Duplicate(Record<P>),
}

#[derive(Debug, Clone)]
pub enum AcceptOutcome<P> {
    Accepted(EnqueueOutcome<P>),
    Rejected,
}

pub struct Outbox<P, D, C>
where
    D: Dispatcher<P>,
    C: Clock,
{
    records: Mutex<Vec<Record<P>>>,
    dispatcher: D,
    clock: C,
    config: OutboxConfig,
    state_path: PathBuf,
    shared_secret: Option<String>,
    closed: AtomicBool,
    wake_tx: mpsc::Sender<()>,
    wake_rx: AsyncMutex<mpsc::Receiver<()>>,
    shutdown: Notify,
}

impl<P, D, C> Outbox<P, D, C>
where
    P: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    D: Dispatcher<P>,
    C: Clock,
{
    /// `shared_secret` configures the bridge's HMAC-authenticated `accept`
    /// path; leave it `None` for a plain outbound outbox.
    pub fn new(
        state_path: impl Into<PathBuf>,
        dispatcher: D,
        clock: C,
        config: OutboxConfig,
        shared_secret: Option<String>,
    ) -> Result<Self, OutboxError> {
        let state_path = state_path.into();
        let persisted: PersistedState<P> = state::load(&state_path)?;
        let (wake_tx, wake_rx) = mpsc::channel(1);

        Ok(Self {
            records: Mutex::new(persisted.records),
            dispatcher,
            clock,
            config,
            state_path,
            shared_secret,
            closed: AtomicBool::new(false),
            wake_tx,
            wake_rx: AsyncMutex::new(wake_rx),
            shutdown: Notify::new(),
        })
    }

    /// Outbound transport outbox entry point.
    pub fn enqueue(&self, idempotency_key: &str, payload: P) -> Result<EnqueueOutcome<P>, OutboxError> {
        self.enqueue_internal(idempotency_key, payload)
    }

    /// Inbound webhook bridge entry point: authenticates before enqueueing.
    pub fn accept(&self, message_id: &str, payload: P, provided_secret: &str) -> Result<AcceptOutcome<P>, OutboxError> {
        if let Some(secret) = &self.shared_secret {
            if !secrets_match(secret, provided_secret) {
                return Ok(AcceptOutcome::Rejected);
            }
        }
        Ok(AcceptOutcome::Accepted(self.enqueue_internal(message_id, payload)?))
    }

    fn enqueue_internal(&self, key: &str, payload: P) -> Result<EnqueueOutcome<P>, OutboxError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(OutboxError::EmptyIdempotencyKey);
        }
        let now = self.clock.now();

        let (outcome, created) = {
            let mut records = self.records.lock();
            if let Some(existing) = records.iter().find(|r| r.idempotency_key == key && r.status != RecordStatus::Poison) {
                (EnqueueOutcome::Duplicate(existing.clone()), false)
            } else {
                let record = Record::new(Uuid::new_v4().to_string(), key.to_string(), payload, now);
                records.push(record.clone());
                (EnqueueOutcome::Created(record), true)
            }
        };

        self.persist()?;
        if created {
            self.wake();
        }
        Ok(outcome)
    }

    /// Counts per status plus the most recent failure, readable
    /// concurrently with dispatch.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        let records = self.records.lock();
        let mut counts: HashMap<RecordStatus, usize> = HashMap::new();
        for r in records.iter() {
            *counts.entry(r.status).or_insert(0) += 1;
        }
        let last_error = records
            .iter()
            .filter(|r| r.last_error.is_some())
            .max_by_key(|r| r.updated_at)
            .and_then(|r| r.last_error.clone());
        HealthSnapshot::from_counts(counts, last_error)
    }

    /// Snapshot of every record currently held, for inspection/tests.
    pub fn records(&self) -> Vec<Record<P>> {
        self.records.lock().clone()
    }

    /// One pump pass: attempts every due record sequentially. Never
    /// concurrent with itself — callers only ever hold one `&self` pass at
    /// a time because `run` serializes calls through its own loop.
    pub async fn dispatch_due(&self) -> Result<usize, OutboxError> {
        let now = self.clock.now();
        let due_ids: Vec<String> = {
            let records = self.records.lock();
            records
                .iter()
                .filter(|r| r.status.is_due_for_dispatch() && r.next_attempt_at <= now)
                .map(|r| r.id.clone())
                .collect()
        };

        for id in &due_ids {
            self.dispatch_one(id).await?;
        }
        Ok(due_ids.len())
    }

    async fn dispatch_one(&self, id: &str) -> Result<(), OutboxError> {
        let payload = {
            let records = self.records.lock();
            records.iter().find(|r| r.id == id).map(|r| r.payload.clone())
        };
        let Some(payload) = payload else {
            return Ok(());
        };

        let result = self.dispatcher.dispatch(&payload).await;
        let now = self.clock.now();

        {
            let mut records = self.records.lock();
            if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                match result {
                    Ok(task_id) => {
                        record.status = if task_id.is_some() { RecordStatus::Acked } else { RecordStatus::Sent };
                        record.task_id = task_id;
                        record.last_error = None;
                        record.updated_at = now;
                        info!(id = %record.id, status = ?record.status, "outbox dispatch succeeded");
                    }
                    Err(err) => {
                        record.attempts += 1;
                        record.last_error = Some(err.clone());
                        record.updated_at = now;
                        if record.attempts > self.config.max_retries {
                            record.status = RecordStatus::Poison;
                            record.next_attempt_at = now;
                            error!(id = %record.id, attempts = record.attempts, error = %err, "outbox record poisoned");
                        } else {
                            record.status = RecordStatus::Retrying;
                            let delay = next_delay_ms(record.attempts, self.config.retry_base_ms, self.config.retry_max_ms);
                            record.next_attempt_at = now + chrono::Duration::milliseconds(delay as i64);
                            warn!(id = %record.id, attempts = record.attempts, error = %err, "outbox dispatch failed, retrying");
                        }
                    }
                }
            }
        }

        self.persist()
    }

    fn persist(&self) -> Result<(), OutboxError> {
        let records = self.records.lock().clone();
        state::save(&self.state_path, &PersistedState { version: 1, records })
    }

    fn wake(&self) {
        let _ = self.wake_tx.try_send(());
    }

    /// Runs the dispatch pump until [`Outbox::stop`] is called: a timer
    /// tick every `max(200ms, retryBaseMs/2)`, plus an immediate pass on
    /// every enqueue.
    pub async fn run(self: Arc<Self>) {
        let period = Duration::from_millis(self.config.pump_period_ms());
        let mut interval = tokio::time::interval(period);

        loop {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.recv_wake() => {}
                _ = self.shutdown.notified() => break,
            }
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.dispatch_due().await {
                error!(error = %err, "outbox pump pass failed");
            }
        }
    }

    async fn recv_wake(&self) {
        let mut rx = self.wake_rx.lock().await;
        rx.recv().await;
    }

    /// Closes the pump: in-flight attempts finish, then the loop exits.
    pub fn stop(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if let Err(err) = self.persist() {
            error!(error = %err, "outbox final persist on stop failed");
        }
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
