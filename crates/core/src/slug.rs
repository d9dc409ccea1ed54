// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic slug generation shared by the worktree manager and the
//! worker launcher's session naming.

/// Lowercase `s`, replace runs of non-`[a-z0-9]` characters with a single
/// `-`, trim leading/trailing `-`, truncate to `max_len`. If the result is
/// empty, return `fallback` instead (also truncated to `max_len`).
pub fn slug(s: &str, fallback: &str, max_len: usize) -> String {
    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    let truncated: String = trimmed.chars().take(max_len).collect();
    let truncated = truncated.trim_end_matches('-').to_string();

    if truncated.is_empty() {
        fallback.chars().take(max_len).collect()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_separators() {
        assert_eq!(slug("Fix The Bug!!", "task", 24), "fix-the-bug");
    }

    #[test]
    fn trims_leading_and_trailing_dashes() {
        assert_eq!(slug("--hello--", "task", 24), "hello");
    }

    #[test]
    fn truncates_to_max_len() {
        assert_eq!(slug("abcdefghij", "task", 5), "abcde");
    }

    #[test]
    fn falls_back_when_empty_after_cleanup() {
        assert_eq!(slug("!!!", "task", 16), "task");
        assert_eq!(slug("", "task", 16), "task");
    }

    #[test]
    fn truncated_result_does_not_end_on_boundary_dash() {
        // "abc-def" truncated to 4 chars is "abc-"; must trim trailing dash.
        assert_eq!(slug("abc def", "task", 4), "abc");
    }
}
