// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk shapes written alongside every release: the SHA-256 manifest and
//! the small info blob recording how the release came to be.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "release-manifest.json";
pub const INFO_FILE_NAME: &str = "release-info.json";

/// `release-manifest.json`: every file in the release, keyed by path
/// relative to the release root, with its SHA-256 hex digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub generated_at: DateTime<Utc>,
    pub files: BTreeMap<String, String>,
}

/// `release-info.json`: provenance for a single release directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub sha: String,
    pub source_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub manifest_file: String,
}
