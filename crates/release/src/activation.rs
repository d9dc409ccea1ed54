// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `activate` / `rollback`: atomic symlink swap of `releases/current` (and
//! `releases/previous`), always written as relative paths.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ReleaseError;

const CURRENT_LINK: &str = "current";
const PREVIOUS_LINK: &str = "previous";

/// Point `releases/current` at `releases/<sha>/`, demoting the old current
/// target to `releases/previous` if one existed.
pub fn activate(releases_root: &Path, sha: &str) -> Result<(), ReleaseError> {
    let target = releases_root.join(sha);
    if !target.is_dir() {
        return Err(ReleaseError::NotFound(sha.to_string()));
    }

    let current_link = releases_root.join(CURRENT_LINK);
    let previous_link = releases_root.join(PREVIOUS_LINK);
    let old_current = resolve_link(&current_link);

    if let Some(old) = &old_current {
        swap_link(&previous_link, old)?;
    }
    swap_link(&current_link, &target)?;
    Ok(())
}

/// `rollback("previous")` swaps `current` back to the current `previous`
/// target. `rollback(<sha>)` re-activates an explicit release.
pub fn rollback(releases_root: &Path, target: &str) -> Result<(), ReleaseError> {
    if target != "previous" {
        return activate(releases_root, target);
    }

    let previous_link = releases_root.join(PREVIOUS_LINK);
    let old_previous = resolve_link(&previous_link).ok_or(ReleaseError::NoPreviousRelease)?;

    let current_link = releases_root.join(CURRENT_LINK);
    let old_current = resolve_link(&current_link);

    swap_link(&current_link, &old_previous)?;
    if let Some(old) = old_current {
        swap_link(&previous_link, &old)?;
    }
    Ok(())
}

/// The release directory `releases/current` points at, if any.
pub fn current_release_dir(releases_root: &Path) -> Option<PathBuf> {
    resolve_link(&releases_root.join(CURRENT_LINK))
}

fn resolve_link(link_path: &Path) -> Option<PathBuf> {
    let raw = fs::read_link(link_path).ok()?;
    let dir = link_path.parent().unwrap_or_else(|| Path::new("."));
    Some(normalize(&dir.join(raw)))
}

/// Create `link_path` -> `target` via a `.tmp-<nanos>` sibling symlink, then
/// rename over the final name so the swap is atomic.
fn swap_link(link_path: &Path, target: &Path) -> Result<(), ReleaseError> {
    let rel_target = relative_from(link_path.parent().unwrap_or_else(|| Path::new(".")), target);
    let tmp_path = link_path.with_file_name(format!(".tmp-{}", unique_suffix()));

    #[cfg(unix)]
    std::os::unix::fs::symlink(&rel_target, &tmp_path)?;
    #[cfg(not(unix))]
    compile_error!("release activation requires a unix target for symlink support");

    fs::rename(&tmp_path, link_path)?;
    Ok(())
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// Relative path from `from_dir` to `to`, assuming both are already
/// absolute (or at least consistently rooted).
fn relative_from(from_dir: &Path, to: &Path) -> PathBuf {
    let from_comps: Vec<_> = from_dir.components().collect();
    let to_comps: Vec<_> = to.components().collect();

    let common = from_comps.iter().zip(to_comps.iter()).take_while(|(a, b)| a == b).count();

    let mut result = PathBuf::new();
    for _ in common..from_comps.len() {
        result.push("..");
    }
    for comp in &to_comps[common..] {
        result.push(comp.as_os_str());
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// Collapse `.`/`..` components without touching the filesystem (the target
/// may legitimately not exist, e.g. mid-rollback).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "activation_tests.rs"]
mod tests;
