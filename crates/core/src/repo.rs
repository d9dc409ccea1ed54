// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository registration: the set of source trees the orchestrator may
//! allocate worktrees against.

use crate::id::RepoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A registered source repository.
///
/// Exactly one registration exists per `id`; at most one registration may
/// have `is_default == true` at any time (enforced by the registry that
/// owns these, not by this type itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRegistration {
    pub id: RepoId,
    pub path: PathBuf,
    pub default_branch: String,
    pub remote: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepoRegistration {
    pub fn new(
        id: RepoId,
        path: PathBuf,
        default_branch: impl Into<String>,
        remote: Option<String>,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            path,
            default_branch: default_branch.into(),
            remote,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory registry enforcing "at most one default" and "exactly one
/// registration per id".
#[derive(Debug, Default)]
pub struct RepoRegistry {
    repos: std::collections::HashMap<String, RepoRegistration>,
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a registration. If `is_default` is set, clears the
    /// default flag on every other registration first.
    pub fn register(&mut self, mut reg: RepoRegistration) {
        if reg.is_default {
            for other in self.repos.values_mut() {
                other.is_default = false;
            }
        }
        reg.updated_at = reg.created_at.max(reg.updated_at);
        self.repos.insert(reg.id.as_str().to_string(), reg);
    }

    pub fn get(&self, id: &str) -> Option<&RepoRegistration> {
        self.repos.get(id)
    }

    pub fn default_repo(&self) -> Option<&RepoRegistration> {
        self.repos.values().find(|r| r.is_default)
    }

    pub fn resolve(&self, repo_id: Option<&str>) -> Result<&RepoRegistration, ResolveRepoError> {
        match repo_id {
            Some(id) => self.get(id).ok_or_else(|| ResolveRepoError::NotFound(id.to_string())),
            None => self.default_repo().ok_or(ResolveRepoError::NoDefault),
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &RepoRegistration> {
        self.repos.values()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveRepoError {
    #[error("repo not registered: {0}")]
    NotFound(String),
    #[error("no_repo_registered")]
    NoDefault,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(id: &str, default: bool) -> RepoRegistration {
        RepoRegistration::new(RepoId::new(id), PathBuf::from("/tmp/x"), "main", None, default, Utc::now())
    }

    #[test]
    fn only_one_default_survives() {
        let mut registry = RepoRegistry::new();
        registry.register(reg("a", true));
        registry.register(reg("b", true));
        assert!(!registry.get("a").unwrap().is_default);
        assert!(registry.get("b").unwrap().is_default);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let mut registry = RepoRegistry::new();
        registry.register(reg("a", true));
        let resolved = registry.resolve(None).unwrap();
        assert_eq!(resolved.id.as_str(), "a");
    }

    #[test]
    fn resolve_with_no_default_fails() {
        let registry = RepoRegistry::new();
        assert!(matches!(registry.resolve(None), Err(ResolveRepoError::NoDefault)));
    }
}
