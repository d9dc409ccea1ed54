// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker completion artifact convention: a JSON blob the worker writes
//! inside its worktree before exiting, read once after `waitForExit`
//! returns.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const ARTIFACT_FILE_NAME: &str = ".task-result.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Success,
    Failure,
    Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerArtifact {
    pub status: Option<ArtifactStatus>,
    pub summary: Option<String>,
    pub branch: Option<String>,
    #[serde(rename = "commitSha")]
    pub commit_sha: Option<String>,
    #[serde(rename = "prUrl")]
    pub pr_url: Option<String>,
    #[serde(rename = "checksSummary")]
    pub checks_summary: Option<String>,
    pub retriable: Option<bool>,
}

/// Read `<worktree>/.task-result.json`. A missing or unparseable file is
/// not an error here — the caller treats `None` as "failure, retriable".
pub fn read_artifact(worktree_path: &Path) -> Option<WorkerArtifact> {
    let bytes = std::fs::read(worktree_path.join(ARTIFACT_FILE_NAME)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_artifact(dir.path()).is_none());
    }

    #[test]
    fn parses_full_success_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ARTIFACT_FILE_NAME),
            r#"{"status":"success","summary":"done","branch":"fm-task-1","commitSha":"abc123","prUrl":"https://example/pr/1","checksSummary":"all green","retriable":false}"#,
        )
        .unwrap();

        let artifact = read_artifact(dir.path()).unwrap();
        assert_eq!(artifact.status, Some(ArtifactStatus::Success));
        assert_eq!(artifact.commit_sha.as_deref(), Some("abc123"));
    }

    #[test]
    fn malformed_artifact_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ARTIFACT_FILE_NAME), "not json").unwrap();
        assert!(read_artifact(dir.path()).is_none());
    }
}
