// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `createSnapshot`: a content-addressed, recursive copy of a source
//! directory into `releases/<sha>/`, with a SHA-256 manifest of every file.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use fm_core::Clock;
use sha1::{Digest as Sha1Digest, Sha1};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::error::ReleaseError;
use crate::manifest::{ReleaseInfo, ReleaseManifest, INFO_FILE_NAME, MANIFEST_FILE_NAME};

const EXCLUDED_TOP_LEVEL: [&str; 3] = [".git", "node_modules", ".DS_Store"];

/// Create a fresh, content-addressed snapshot of `source_dir` under
/// `releases_root`, writing the manifest and info files next to the copy.
pub fn create_snapshot<C: Clock>(releases_root: &Path, source_dir: &Path, clock: &C) -> Result<ReleaseInfo, ReleaseError> {
    let now = clock.now();
    let sha = release_id(source_dir, now);
    let release_dir = releases_root.join(&sha);
    fs::create_dir_all(&release_dir)?;

    let mut files = BTreeMap::new();
    copy_tree(source_dir, source_dir, &release_dir, &mut files)?;

    let manifest = ReleaseManifest {
        generated_at: now,
        files,
    };
    let manifest_path = release_dir.join(MANIFEST_FILE_NAME);
    fm_storage::write_atomic(&manifest_path, serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    let info = ReleaseInfo {
        sha: sha.clone(),
        source_dir: source_dir.to_path_buf(),
        created_at: now,
        manifest_file: MANIFEST_FILE_NAME.to_string(),
    };
    let info_path = release_dir.join(INFO_FILE_NAME);
    fm_storage::write_atomic(&info_path, serde_json::to_string_pretty(&info)?.as_bytes())?;

    Ok(info)
}

/// 12-hex-char identifier: `sha1(sourceDir || ISO8601-now)`, truncated.
fn release_id(source_dir: &Path, now: chrono::DateTime<chrono::Utc>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source_dir.to_string_lossy().as_bytes());
    hasher.update(now.to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..12].to_string()
}

fn copy_tree(root: &Path, cur: &Path, dst_root: &Path, files: &mut BTreeMap<String, String>) -> Result<(), ReleaseError> {
    for entry in fs::read_dir(cur)? {
        let entry = entry?;
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(&path);
        let first_segment = rel.components().next().map(|c| c.as_os_str()).unwrap_or_else(|| OsStr::new(""));
        if EXCLUDED_TOP_LEVEL.iter().any(|name| first_segment == OsStr::new(name)) {
            continue;
        }

        let file_type = entry.file_type()?;
        let dst_path = dst_root.join(rel);
        if file_type.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_tree(root, &path, dst_root, files)?;
        } else if file_type.is_file() {
            if let Some(parent) = dst_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&path, &dst_path)?;
            let digest = sha256_file(&dst_path)?;
            files.insert(rel_to_slash(rel), digest);
        }
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String, ReleaseError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn rel_to_slash(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
