// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable `{version:1, records:[...]}` state file, written via
//! write-tmp-then-rename.

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::OutboxError;
use crate::record::Record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState<P> {
    pub version: u32,
    pub records: Vec<Record<P>>,
}

impl<P> Default for PersistedState<P> {
    fn default() -> Self {
        Self {
            version: 1,
            records: Vec::new(),
        }
    }
}

pub fn load<P: DeserializeOwned>(path: &Path) -> Result<PersistedState<P>, OutboxError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::default()),
        Err(e) => Err(OutboxError::Storage(e.into())),
    }
}

pub fn save<P: Serialize>(path: &Path, state: &PersistedState<P>) -> Result<(), OutboxError> {
    let bytes = serde_json::to_vec_pretty(state)?;
    fm_storage::write_atomic(path, &bytes)?;
    Ok(())
}
