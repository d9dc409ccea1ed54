// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure backoff arithmetic, split out so it's trivially unit-testable.

/// `min(retryMaxMs, retryBaseMs * 2^(attempts-1))`. `attempts` is the count
/// after the failed attempt that just happened, so it is always >= 1.
pub fn next_delay_ms(attempts: u32, retry_base_ms: u64, retry_max_ms: u64) -> u64 {
    let exponent = attempts.saturating_sub(1);
    let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let scaled = retry_base_ms.saturating_mul(multiplier);
    scaled.min(retry_max_ms)
}
