// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the server crate.

use std::time::Duration;

/// Keep-alive timer for the next request line (default 15 s,
/// `COMEXE_KEEPALIVE_SECS`).
pub fn keepalive() -> Duration {
    std::env::var("COMEXE_KEEPALIVE_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(15))
}

/// Requests served per connection before keep-alive is cut off
/// (default 100, `COMEXE_MAX_REQUESTS`).
pub fn max_requests() -> u32 {
    std::env::var("COMEXE_MAX_REQUESTS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(100)
}

/// TLS handshake step cap (default 10_000, `COMEXE_HANDSHAKE_ATTEMPTS`).
pub fn handshake_attempts() -> u32 {
    std::env::var("COMEXE_HANDSHAKE_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(10_000)
}
