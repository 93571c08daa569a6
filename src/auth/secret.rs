//! The `(user_id, api_key)` pair provisioned out of band.

use crate::types::{ApiKey, UserId};

/// Shared secret held by both a client and the server.
///
/// Immutable once built; `Debug` never prints the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSecret {
    user_id: UserId,
    api_key: ApiKey,
}

impl SharedSecret {
    pub fn new(user_id: impl Into<UserId>, api_key: impl Into<ApiKey>) -> Self {
        Self {
            user_id: user_id.into(),
            api_key: api_key.into(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_api_key() {
        let secret = SharedSecret::new("alice", "secret123");
        let rendered = format!("{:?}", secret);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret123"));
    }
}
