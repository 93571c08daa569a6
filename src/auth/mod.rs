//! Time-windowed `HMAC-SHA256` request authentication.
//!
//! Clients and the server share a `(user_id, api_key)` pair. For every
//! request the client derives a one-time password from the API key and the
//! current 60-second window, hashes it together with the user id, and sends
//!
//! ```text
//! Authorization: HMAC-SHA256 <user_id>:<token_hex>
//! ```
//!
//! The server re-derives the token for the current window and `N` windows on
//! either side to absorb clock skew, and accepts on the first match.
//!
//! ## Security Model
//!
//! - The API key and the derived password never travel on the wire
//! - A captured header replays for at most `2N + 1` windows
//! - Rejections carry no detail back to the caller; the reason is only logged
//! - Identities are masked in logs, tokens are never logged
//!
//! ## Usage
//!
//! ```ignore
//! let secret = SharedSecret::new("alice", "secret123");
//!
//! // client
//! let header = AuthSigner::new(secret.clone()).header_value();
//!
//! // server
//! let auth = RequestAuthenticator::new(secret, DriftTolerance::default());
//! assert!(auth.validate(&header));
//! ```

mod authenticator;
pub mod derivation;
mod header;
mod secret;
mod signer;

pub use authenticator::{
    AuthOutcome, DEFAULT_DRIFT_WINDOWS, DriftTolerance, MAX_DRIFT_WINDOWS, RejectReason,
    RequestAuthenticator, mask_identity, validate,
};
pub use derivation::{Clock, FixedClock, SystemClock, WINDOW_TICKS, derive_password, derive_token};
pub use header::{
    AUTH_SCHEME, HeaderError, ParsedAuthorization, format_authorization, parse_authorization,
};
pub use secret::SharedSecret;
pub use signer::AuthSigner;
