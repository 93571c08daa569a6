//! HTTP client that signs every request for a gateway-protected API.

use std::fmt;

use reqwest::header::AUTHORIZATION;
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::auth::AuthSigner;

#[derive(Debug)]
pub enum ClientError {
    /// Base URL or request path could not be parsed
    InvalidUrl(String),
    /// Transport failure
    Http(String),
    /// Server answered with a non-success status
    Status { status: u16, body: String },
    /// Response body was not the expected JSON
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::Http(msg) => write!(f, "HTTP error: {}", msg),
            Self::Status { status, body } => write!(f, "Request failed with {}: {}", status, body),
            Self::Decode(msg) => write!(f, "Invalid response body: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// API client bound to one base URL.
///
/// The `Authorization` header is recomputed per request, so a long-lived
/// client keeps working across window boundaries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    signer: AuthSigner,
}

impl ApiClient {
    pub fn new(base_url: &str, signer: AuthSigner) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            signer,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.http.get(self.url(path)?);
        self.send(request).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)?).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .header(AUTHORIZATION, self.signer.header_value())
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gateway request failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}
