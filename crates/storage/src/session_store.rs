// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed session namespace keyed by opaque session keys
//! (C1 Session Store).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::atomic::{append_line, write_atomic};
use crate::StorageError;

const CONTEXT_FILE: &str = "context.jsonl";
const LOG_FILE: &str = "log.jsonl";
const STATE_FILE: &str = "state.json";
const ALIASES_DIR: &str = "sessions";
const ALIASES_FILE: &str = "aliases.json";

/// One entry in `sessions/aliases.json`, keyed by the normalized alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub session_key: String,
    pub created_at: DateTime<Utc>,
}

/// Replace any character outside `[A-Za-z0-9._-]` with `_`. Applied to every
/// path segment derived from caller-supplied strings before it touches the
/// filesystem.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

/// Normalizes (trim + lowercase) and validates an alias against
/// `^[a-z0-9._-]{1,64}$`, returning the normalized form.
pub fn normalize_alias(alias: &str) -> Result<String, StorageError> {
    let normalized = alias.trim().to_lowercase();
    let valid = !normalized.is_empty()
        && normalized.len() <= 64
        && normalized.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(normalized)
    } else {
        Err(StorageError::InvalidAlias(alias.to_string()))
    }
}

/// sha1 hex digest of a session key, used as its directory name.
fn session_hash(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Root-relative storage for session-scoped JSONL logs, state blobs, and the
/// alias map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, key: &str) -> PathBuf {
        self.root.join("sessions").join(session_hash(key))
    }

    fn session_file(&self, key: &str, file: &str) -> PathBuf {
        self.session_dir(key).join(sanitize(file))
    }

    /// Atomic-per-line append of `value` as JSON text to `<hash>/<file>`.
    pub fn append_line(&self, key: &str, file: &str, value: &Value) -> Result<(), StorageError> {
        let path = self.session_file(key, file);
        let line = serde_json::to_string(value)?;
        append_line(&path, &line)
    }

    /// The last `limit` valid JSON lines in `<hash>/<file>`. Lines that fail
    /// to parse are silently dropped, never surfaced as an error.
    pub fn read_json_lines(&self, key: &str, file: &str, limit: usize) -> Result<Vec<Value>, StorageError> {
        let path = self.session_file(key, file);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let valid: Vec<Value> = contents
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .collect();
        let start = valid.len().saturating_sub(limit);
        Ok(valid[start..].to_vec())
    }

    /// Overwrite the session's `state.json` with `value`, atomically.
    pub fn write_session_state(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let path = self.session_file(key, STATE_FILE);
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &bytes)
    }

    /// Read the session's `state.json`, or `None` if absent.
    pub fn read_session_state(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.session_file(key, STATE_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of `context.jsonl` and `log.jsonl`. Missing files
    /// are not an error.
    pub fn clear_session_data(&self, key: &str) -> Result<(), StorageError> {
        for file in [CONTEXT_FILE, LOG_FILE] {
            let path = self.session_file(key, file);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn aliases_path(&self) -> PathBuf {
        self.root.join(ALIASES_DIR).join(ALIASES_FILE)
    }

    /// Read the alias map (normalized alias -> entry), or an empty map if
    /// the file doesn't exist yet or its contents aren't a conforming
    /// `{alias: entry}` object.
    pub fn read_alias_map(&self) -> Result<HashMap<String, AliasEntry>, StorageError> {
        let path = self.aliases_path();
        match std::fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the alias map atomically.
    pub fn write_alias_map(&self, map: &HashMap<String, AliasEntry>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(map)?;
        write_atomic(&self.aliases_path(), &bytes)
    }

    /// The on-disk directory for a given session key, for callers (e.g. the
    /// worker launcher) that need to point a process's cwd or logs there.
    pub fn session_path(&self, key: &str) -> PathBuf {
        self.session_dir(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
#[path = "session_store_tests.rs"]
mod tests;
