// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `integrityCheck`: verify the active release's files against its manifest.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::current_release_dir;
use crate::manifest::{ReleaseManifest, MANIFEST_FILE_NAME};

const MISSING_MANIFEST_SENTINEL: &str = "<manifest>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityMode {
    Off,
    Warn,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub ok: bool,
    pub checked: usize,
    pub missing: Vec<String>,
    pub mismatches: Vec<String>,
}

impl IntegrityReport {
    fn empty_ok() -> Self {
        Self {
            ok: true,
            checked: 0,
            missing: Vec::new(),
            mismatches: Vec::new(),
        }
    }
}

pub fn integrity_check(releases_root: &Path, mode: IntegrityMode) -> IntegrityReport {
    if mode == IntegrityMode::Off {
        return IntegrityReport::empty_ok();
    }

    let Some(release_dir) = current_release_dir(releases_root) else {
        return absent_report(mode);
    };

    let manifest_path = release_dir.join(MANIFEST_FILE_NAME);
    let manifest: ReleaseManifest = match fs::read(&manifest_path).ok().and_then(|bytes| serde_json::from_slice(&bytes).ok()) {
        Some(m) => m,
        None => return absent_report(mode),
    };

    let mut missing = Vec::new();
    let mut mismatches = Vec::new();
    for (rel_path, expected_digest) in &manifest.files {
        let full_path = release_dir.join(rel_path);
        match fs::read(&full_path) {
            Ok(bytes) => {
                let actual = sha256_hex(&bytes);
                if &actual != expected_digest {
                    mismatches.push(rel_path.clone());
                }
            }
            Err(_) => missing.push(rel_path.clone()),
        }
    }

    let checked = manifest.files.len();
    let clean = missing.is_empty() && mismatches.is_empty();
    IntegrityReport {
        ok: clean || mode == IntegrityMode::Warn,
        checked,
        missing,
        mismatches,
    }
}

fn absent_report(mode: IntegrityMode) -> IntegrityReport {
    IntegrityReport {
        ok: mode != IntegrityMode::Strict,
        checked: 0,
        missing: vec![MISSING_MANIFEST_SENTINEL.to_string()],
        mismatches: Vec::new(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
