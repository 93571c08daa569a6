//! `Authorization` header wire format: `HMAC-SHA256 {user_id}:{token}`.

use std::fmt;

use crate::types::{AuthToken, UserId};

/// Scheme token, compared ASCII case-insensitively.
pub const AUTH_SCHEME: &str = "HMAC-SHA256";

const SCHEME_PREFIX: &str = "HMAC-SHA256 ";

/// Credentials carried by a well-formed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    pub user_id: UserId,
    pub token: AuthToken,
}

/// Why a header could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// Header absent or empty
    Empty,
    /// Header bytes are not visible ASCII
    InvalidEncoding,
    /// Scheme is not `HMAC-SHA256`
    WrongScheme,
    /// No `:` between user id and token
    MissingSeparator,
    /// Nothing before the `:`
    EmptyUserId,
    /// Nothing after the `:`
    EmptyToken,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Authorization header is empty"),
            Self::InvalidEncoding => write!(f, "Authorization header is not valid ASCII"),
            Self::WrongScheme => write!(f, "Authorization scheme is not {}", AUTH_SCHEME),
            Self::MissingSeparator => write!(f, "Authorization credentials have no separator"),
            Self::EmptyUserId => write!(f, "Authorization user id is empty"),
            Self::EmptyToken => write!(f, "Authorization token is empty"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Parse an `Authorization` header value.
///
/// Splits on the first `:` only; anything after it belongs to the token.
pub fn parse_authorization(header: &str) -> Result<ParsedAuthorization, HeaderError> {
    if header.is_empty() {
        return Err(HeaderError::Empty);
    }

    let credentials = strip_scheme(header).ok_or(HeaderError::WrongScheme)?;
    let (user_id, token) = credentials
        .split_once(':')
        .ok_or(HeaderError::MissingSeparator)?;

    if user_id.is_empty() {
        return Err(HeaderError::EmptyUserId);
    }
    if token.is_empty() {
        return Err(HeaderError::EmptyToken);
    }

    Ok(ParsedAuthorization {
        user_id: UserId::new(user_id),
        token: AuthToken::new(token),
    })
}

fn strip_scheme(header: &str) -> Option<&str> {
    let prefix = header.get(..SCHEME_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(SCHEME_PREFIX) {
        header.get(SCHEME_PREFIX.len()..)
    } else {
        None
    }
}

/// Render a header value for the given credentials.
pub fn format_authorization(user_id: &UserId, token: &AuthToken) -> String {
    format!("{} {}:{}", AUTH_SCHEME, user_id, token)
}
