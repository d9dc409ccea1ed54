// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Constant-time shared-secret comparison for the bridge variant, built on
//! top of `hmac`'s own constant-time tag verification rather than a direct
//! byte-for-byte string compare.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const AUTH_TAG_MESSAGE: &[u8] = b"fm-outbox-bridge-auth";

/// `true` iff `provided` equals `expected`, compared in constant time.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
    let expected_tag = match tag_for(expected) {
        Some(t) => t,
        None => return false,
    };
    let mut provided_mac = match HmacSha256::new_from_slice(provided.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    provided_mac.update(AUTH_TAG_MESSAGE);
    provided_mac.verify_slice(&expected_tag).is_ok()
}

fn tag_for(secret: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(AUTH_TAG_MESSAGE);
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secrets_compare_equal() {
        assert!(secrets_match("bridge-secret", "bridge-secret"));
    }

    #[test]
    fn mismatched_secrets_compare_unequal() {
        assert!(!secrets_match("bridge-secret", "wrong-secret"));
    }

    #[test]
    fn empty_provided_secret_never_matches() {
        assert!(!secrets_match("bridge-secret", ""));
    }
}
