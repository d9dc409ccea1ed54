// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Release Manager (C4): content-addressed snapshots of a source tree with
//! atomic symlink activation, rollback, and manifest-verified integrity.

use std::path::{Path, PathBuf};

use fm_core::Clock;
use tracing::info;

use crate::activation::{activate, current_release_dir, rollback};
use crate::error::ReleaseError;
use crate::integrity::{integrity_check, IntegrityMode, IntegrityReport};
use crate::manifest::ReleaseInfo;
use crate::snapshot::create_snapshot;

pub struct ReleaseManager<C: Clock> {
    releases_root: PathBuf,
    clock: C,
}

impl<C: Clock> ReleaseManager<C> {
    pub fn new(releases_root: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            releases_root: releases_root.into(),
            clock,
        }
    }

    pub fn create_snapshot(&self, source_dir: &Path) -> Result<ReleaseInfo, ReleaseError> {
        let info = create_snapshot(&self.releases_root, source_dir, &self.clock)?;
        info!(sha = %info.sha, source = %source_dir.display(), "release snapshot created");
        Ok(info)
    }

    pub fn activate(&self, sha: &str) -> Result<(), ReleaseError> {
        activate(&self.releases_root, sha)?;
        info!(sha, "release activated");
        Ok(())
    }

    pub fn rollback(&self, target: &str) -> Result<(), ReleaseError> {
        rollback(&self.releases_root, target)?;
        info!(target, "release rolled back");
        Ok(())
    }

    pub fn integrity_check(&self, mode: IntegrityMode) -> IntegrityReport {
        integrity_check(&self.releases_root, mode)
    }

    pub fn current_release_dir(&self) -> Option<PathBuf> {
        current_release_dir(&self.releases_root)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
