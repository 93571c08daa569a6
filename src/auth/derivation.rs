//! Credential derivation shared by clients and the server.
//!
//! ```text
//! window   = ticks / WINDOW_TICKS
//! password = hex(SHA256(api_key ++ window))
//! token    = hex(SHA256(user_id ++ ":" ++ password))
//! ```
//!
//! Ticks are 100-nanosecond intervals since 0001-01-01T00:00:00Z, the unit
//! already used by deployed desktop and web clients. Both sides must agree on
//! unit and epoch or every token lands in the wrong window.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::types::{AuthToken, DerivedPassword};

/// Ticks per second (1 tick = 100ns).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Length of one credential window.
pub const WINDOW_SECONDS: i64 = 60;

/// Length of one credential window in ticks.
pub const WINDOW_TICKS: i64 = WINDOW_SECONDS * TICKS_PER_SECOND;

/// Tick value of 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Index of the window containing `ticks` (floor division).
pub fn window_index(ticks: i64) -> i64 {
    ticks.div_euclid(WINDOW_TICKS)
}

/// Derive the one-time password for the window containing `ticks`.
pub fn derive_password(api_key: &str, ticks: i64) -> DerivedPassword {
    // Integer Display is locale-free: plain ASCII digits, optional leading '-'.
    let input = format!("{}{}", api_key, window_index(ticks));
    DerivedPassword::new(sha256_hex(&input))
}

/// Derive the wire token from an identity and a derived password.
pub fn derive_token(user_id: &str, password: &DerivedPassword) -> AuthToken {
    let input = format!("{}:{}", user_id, password.expose());
    AuthToken::new(sha256_hex(&input))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert a UTC instant to ticks. Saturates outside the representable range.
pub fn ticks_from_datetime(at: DateTime<Utc>) -> i64 {
    let sub_second = i64::from(at.timestamp_subsec_nanos()) / 100;
    at.timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(sub_second)
        .saturating_add(UNIX_EPOCH_TICKS)
}

/// Source of the current time in ticks.
///
/// Injected into the authenticator and signer so window arithmetic can be
/// tested without touching the system clock.
pub trait Clock: Send + Sync {
    fn now_ticks(&self) -> i64;
}

/// UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ticks(&self) -> i64 {
        ticks_from_datetime(Utc::now())
    }
}

/// Manually driven clock for tests and offline signing.
#[derive(Debug, Default)]
pub struct FixedClock {
    ticks: AtomicI64,
}

impl FixedClock {
    pub fn new(ticks: i64) -> Self {
        Self {
            ticks: AtomicI64::new(ticks),
        }
    }

    pub fn set(&self, ticks: i64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Move the clock by a whole number of windows (negative moves back).
    pub fn advance_windows(&self, windows: i64) {
        self.ticks
            .fetch_add(windows.saturating_mul(WINDOW_TICKS), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ticks(&self) -> i64 {
        self.ticks.load(Ordering::SeqCst)
    }
}
