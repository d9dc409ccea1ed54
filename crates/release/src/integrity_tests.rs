// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::activation::activate;
use fm_core::FakeClock;
use std::fs;

fn snapshot(releases_root: &Path, source_dir: &Path) -> crate::manifest::ReleaseInfo {
    let clock = FakeClock::at_epoch_ms(1_000);
    crate::snapshot::create_snapshot(releases_root, source_dir, &clock).unwrap()
}

#[test]
fn off_mode_skips_io_and_is_always_ok() {
    let releases = tempfile::tempdir().unwrap();
    let report = integrity_check(releases.path(), IntegrityMode::Off);
    assert!(report.ok);
    assert_eq!(report.checked, 0);
}

#[test]
fn strict_mode_ok_when_manifest_matches_files() {
    let source = tempfile::tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "hello").unwrap();
    let releases = tempfile::tempdir().unwrap();
    let info = snapshot(releases.path(), source.path());
    activate(releases.path(), &info.sha).unwrap();

    let report = integrity_check(releases.path(), IntegrityMode::Strict);
    assert!(report.ok);
    assert_eq!(report.checked, 1);
    assert!(report.missing.is_empty());
    assert!(report.mismatches.is_empty());
}

#[test]
fn strict_mode_fails_on_missing_file() {
    let source = tempfile::tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "hello").unwrap();
    let releases = tempfile::tempdir().unwrap();
    let info = snapshot(releases.path(), source.path());
    activate(releases.path(), &info.sha).unwrap();
    fs::remove_file(releases.path().join(&info.sha).join("a.txt")).unwrap();

    let report = integrity_check(releases.path(), IntegrityMode::Strict);
    assert!(!report.ok);
    assert_eq!(report.missing, vec!["a.txt".to_string()]);
}

#[test]
fn strict_mode_fails_on_mismatch() {
    let source = tempfile::tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "hello").unwrap();
    let releases = tempfile::tempdir().unwrap();
    let info = snapshot(releases.path(), source.path());
    activate(releases.path(), &info.sha).unwrap();
    fs::write(releases.path().join(&info.sha).join("a.txt"), "tampered").unwrap();

    let report = integrity_check(releases.path(), IntegrityMode::Strict);
    assert!(!report.ok);
    assert_eq!(report.mismatches, vec!["a.txt".to_string()]);
}

#[test]
fn warn_mode_reports_problems_but_ok_is_true() {
    let source = tempfile::tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "hello").unwrap();
    let releases = tempfile::tempdir().unwrap();
    let info = snapshot(releases.path(), source.path());
    activate(releases.path(), &info.sha).unwrap();
    fs::remove_file(releases.path().join(&info.sha).join("a.txt")).unwrap();

    let report = integrity_check(releases.path(), IntegrityMode::Warn);
    assert!(report.ok);
    assert_eq!(report.missing.len(), 1);
}

#[test]
fn strict_mode_fails_when_no_current_release() {
    let releases = tempfile::tempdir().unwrap();
    let report = integrity_check(releases.path(), IntegrityMode::Strict);
    assert!(!report.ok);
    assert_eq!(report.missing, vec!["<manifest>".to_string()]);
}

#[test]
fn warn_mode_is_ok_when_no_current_release() {
    let releases = tempfile::tempdir().unwrap();
    let report = integrity_check(releases.path(), IntegrityMode::Warn);
    assert!(report.ok);
}

