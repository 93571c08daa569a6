//! Server-side verification of `HMAC-SHA256` authorization headers.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::auth::derivation::{Clock, SystemClock, WINDOW_TICKS, derive_password, derive_token};
use crate::auth::header::{HeaderError, parse_authorization};
use crate::auth::secret::SharedSecret;
use crate::types::{AuthToken, UserId};

/// Default drift tolerance: previous, current and next window.
pub const DEFAULT_DRIFT_WINDOWS: u32 = 1;

/// Upper bound on configurable drift, one hour each way.
pub const MAX_DRIFT_WINDOWS: u32 = 60;

/// Number of windows accepted on each side of the server's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftTolerance(u32);

impl DriftTolerance {
    /// Returns `None` above `MAX_DRIFT_WINDOWS`.
    pub fn new(windows: u32) -> Option<Self> {
        (windows <= MAX_DRIFT_WINDOWS).then_some(Self(windows))
    }

    pub fn windows(&self) -> u32 {
        self.0
    }

    /// Offsets checked during validation, `-N..=N`.
    fn offsets(&self) -> std::ops::RangeInclusive<i64> {
        let n = i64::from(self.0);
        -n..=n
    }
}

impl Default for DriftTolerance {
    fn default() -> Self {
        Self(DEFAULT_DRIFT_WINDOWS)
    }
}

/// Why a request was rejected. For logs only, never sent to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Malformed(HeaderError),
    UnknownUser,
    TokenMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "Malformed header: {}", e),
            Self::UnknownUser => write!(f, "Unknown user"),
            Self::TokenMismatch => write!(f, "No matching token within drift tolerance"),
        }
    }
}

/// Result of checking one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// `offset` is the window offset (relative to "now") that matched.
    Accepted { user_id: UserId, offset: i64 },
    Rejected(RejectReason),
}

impl AuthOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Verifies inbound headers against one configured shared secret.
///
/// Holds only immutable configuration; share it behind an `Arc`.
pub struct RequestAuthenticator {
    secret: SharedSecret,
    tolerance: DriftTolerance,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("secret", &self.secret)
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl RequestAuthenticator {
    /// Create an authenticator reading the system clock.
    pub fn new(secret: SharedSecret, tolerance: DriftTolerance) -> Self {
        Self {
            secret,
            tolerance,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tolerance(&self) -> DriftTolerance {
        self.tolerance
    }

    pub fn user_id(&self) -> &UserId {
        self.secret.user_id()
    }

    /// Accept or reject a header value.
    pub fn validate(&self, auth_header: &str) -> bool {
        self.check(auth_header).is_accepted()
    }

    /// Check a header value against the current time.
    pub fn check(&self, auth_header: &str) -> AuthOutcome {
        // One clock read per validation; every offset is relative to it.
        let now = self.clock.now_ticks();
        self.check_at(auth_header, now)
    }

    /// Check a header value as if the clock read `now_ticks`.
    pub fn check_at(&self, auth_header: &str, now_ticks: i64) -> AuthOutcome {
        let parsed = match parse_authorization(auth_header) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(reason = %e, "Rejected malformed Authorization header");
                return AuthOutcome::Rejected(RejectReason::Malformed(e));
            }
        };

        let expected_user = self.secret.user_id();
        if parsed.user_id != *expected_user {
            warn!(
                user = %mask_identity(parsed.user_id.as_str()),
                "Rejected Authorization header for unknown user"
            );
            return AuthOutcome::Rejected(RejectReason::UnknownUser);
        }

        match find_matching_offset(&self.secret, &parsed.token, now_ticks, self.tolerance) {
            Some(offset) => {
                debug!(
                    user = %mask_identity(expected_user.as_str()),
                    offset,
                    "Auth validated"
                );
                AuthOutcome::Accepted {
                    user_id: parsed.user_id,
                    offset,
                }
            }
            None => {
                warn!(
                    user = %mask_identity(expected_user.as_str()),
                    "Invalid auth token"
                );
                AuthOutcome::Rejected(RejectReason::TokenMismatch)
            }
        }
    }
}

/// First window offset whose derived token equals `received`.
///
/// Candidates whose tick arithmetic would overflow are skipped, so extreme
/// clock values fail closed.
fn find_matching_offset(
    secret: &SharedSecret,
    received: &AuthToken,
    now_ticks: i64,
    tolerance: DriftTolerance,
) -> Option<i64> {
    tolerance.offsets().find(|&offset| {
        let Some(ticks) = offset
            .checked_mul(WINDOW_TICKS)
            .and_then(|shift| now_ticks.checked_add(shift))
        else {
            return false;
        };

        let password = derive_password(secret.api_key().expose(), ticks);
        let candidate = derive_token(secret.user_id().as_str(), &password);
        bool::from(
            candidate
                .as_str()
                .as_bytes()
                .ct_eq(received.as_str().as_bytes()),
        )
    })
}

/// Validate a header against explicit credentials using the system clock and
/// the default drift tolerance.
pub fn validate(auth_header: &str, expected_user_id: &str, expected_api_key: &str) -> bool {
    let secret = SharedSecret::new(expected_user_id, expected_api_key);
    RequestAuthenticator::new(secret, DriftTolerance::default()).validate(auth_header)
}

/// Mask an identity for logging: first two characters, then `***`.
pub fn mask_identity(identity: &str) -> String {
    let mut chars = identity.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), Some(_)) => format!("{}{}***", a, b),
        _ => "***".to_string(),
    }
}
