//! Client-side header construction.

use std::fmt;
use std::sync::Arc;

use crate::auth::derivation::{Clock, SystemClock, derive_password, derive_token};
use crate::auth::header::format_authorization;
use crate::auth::secret::SharedSecret;

/// Builds a fresh `Authorization` value for every outbound request.
#[derive(Clone)]
pub struct AuthSigner {
    secret: SharedSecret,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AuthSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSigner")
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

impl AuthSigner {
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Header value for the current time.
    pub fn header_value(&self) -> String {
        self.header_value_at(self.clock.now_ticks())
    }

    /// Header value for an explicit tick reading.
    pub fn header_value_at(&self, ticks: i64) -> String {
        let password = derive_password(self.secret.api_key().expose(), ticks);
        let token = derive_token(self.secret.user_id().as_str(), &password);
        format_authorization(self.secret.user_id(), &token)
    }
}
