use serde::Deserialize;
use std::{env, fmt, fs, path::Path};

use crate::auth::{DEFAULT_DRIFT_WINDOWS, DriftTolerance, MAX_DRIFT_WINDOWS, SharedSecret};

/// Paths that never require authentication (prefix match on the lower-cased path).
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/health", "/swagger", "/favicon.ico"];

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            auth: AuthSettings::default(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default = "default_drift_windows", rename = "driftWindows")]
    pub drift_windows: u32,
    /// Development escape hatch: serve without auth when credentials are missing.
    #[serde(default, rename = "allowUnauthenticated")]
    pub allow_unauthenticated: bool,
    #[serde(default = "default_excluded_paths", rename = "excludedPaths")]
    pub excluded_paths: Vec<String>,
}

fn default_drift_windows() -> u32 {
    DEFAULT_DRIFT_WINDOWS
}

fn default_excluded_paths() -> Vec<String> {
    DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            user_id: None,
            api_key: None,
            drift_windows: DEFAULT_DRIFT_WINDOWS,
            allow_unauthenticated: false,
            excluded_paths: default_excluded_paths(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("user_id", &self.user_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("drift_windows", &self.drift_windows)
            .field("allow_unauthenticated", &self.allow_unauthenticated)
            .field("excluded_paths", &self.excluded_paths)
            .finish()
    }
}

/// How the host treats inbound requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Enforced {
        secret: SharedSecret,
        tolerance: DriftTolerance,
    },
    /// No credentials configured and the development bypass is enabled.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// User id or API key missing and the bypass was not requested
    MissingCredentials,
    /// Drift tolerance above `MAX_DRIFT_WINDOWS`
    DriftOutOfRange(u32),
    /// User id contains the header separator
    InvalidUserId,
    /// Excluded path is empty or not absolute, which would match every request
    InvalidExcludedPath(String),
    /// Config file unreadable or malformed
    File(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(
                f,
                "Auth user id and API key are required (set AUTH_USER_ID and AUTH_API_KEY, or pass --allow-unauthenticated for local development)"
            ),
            Self::DriftOutOfRange(n) => write!(
                f,
                "Drift tolerance of {} windows exceeds the maximum of {}",
                n, MAX_DRIFT_WINDOWS
            ),
            Self::InvalidUserId => write!(f, "Auth user id must not contain ':'"),
            Self::InvalidExcludedPath(path) => write!(
                f,
                "Excluded path {:?} must start with '/' and name a route other than the root",
                path
            ),
            Self::File(msg) => write!(f, "Config file error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AuthSettings {
    /// Turn raw settings into an enforcement decision.
    pub fn resolve(&self) -> Result<AuthMode, ConfigError> {
        let tolerance = DriftTolerance::new(self.drift_windows)
            .ok_or(ConfigError::DriftOutOfRange(self.drift_windows))?;

        // Excluded paths are prefixes; "" or "/" would exempt every route.
        if let Some(bad) = self
            .excluded_paths
            .iter()
            .find(|p| !p.starts_with('/') || p.trim_end_matches('/').is_empty())
        {
            return Err(ConfigError::InvalidExcludedPath(bad.clone()));
        }

        let user_id = self.user_id.as_deref().filter(|s| !s.is_empty());
        let api_key = self.api_key.as_deref().filter(|s| !s.is_empty());

        match (user_id, api_key) {
            (Some(user_id), Some(api_key)) => {
                if user_id.contains(':') {
                    return Err(ConfigError::InvalidUserId);
                }
                Ok(AuthMode::Enforced {
                    secret: SharedSecret::new(user_id, api_key),
                    tolerance,
                })
            }
            _ if self.allow_unauthenticated => Ok(AuthMode::Disabled),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

impl GatewayConfig {
    /// Load from a JSON file, expanding `${VAR}` references in string values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: GatewayConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::File(e.to_string()))?;
        Ok(cfg.expanded())
    }

    fn expanded(mut self) -> Self {
        self.bind = expand_env_vars(&self.bind);
        if let Some(user_id) = self.auth.user_id.as_mut() {
            *user_id = expand_env_vars(user_id);
        }
        if let Some(api_key) = self.auth.api_key.as_mut() {
            *api_key = expand_env_vars(api_key);
        }
        self
    }
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
/// Unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
