// Core modules
pub mod auth;
mod config;
mod types;

// HTTP host and client
pub mod api;
pub mod client;
pub mod logging;
pub mod server;

// Re-export key types and functions
pub use auth::{
    AuthOutcome, AuthSigner, Clock, DriftTolerance, RequestAuthenticator, SharedSecret,
    SystemClock, derive_password, derive_token, validate,
};
pub use client::{ApiClient, ClientError};
pub use config::{AuthMode, AuthSettings, ConfigError, DEFAULT_EXCLUDED_PATHS, GatewayConfig};
pub use server::start_gateway;
pub use types::{ApiKey, AuthToken, DerivedPassword, UserId};
