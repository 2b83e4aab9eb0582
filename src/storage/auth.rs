//! Service account authentication for Google APIs.
//!
//! Implements the OAuth 2.0 JWT bearer flow: a short-lived RS256 assertion
//! signed with the service account key (with `sub` set to the delegated user)
//! is exchanged for an access token. Tokens are cached until shortly before
//! they expire.

use crate::error::UploadError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// OAuth scope granting full Drive access
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google's maximum)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh cached tokens this long before they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The parts of a service account key file the token flow needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email, used as the JWT issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a service account key given as base64-encoded JSON
    pub fn from_base64(encoded: &str) -> Result<Self, UploadError> {
        let json = STANDARD
            .decode(encoded.trim())
            .map_err(|e| UploadError::Auth(format!("credentials are not valid base64: {e}")))?;
        Self::from_json(&json)
    }

    /// Parse a service account key from raw JSON bytes
    pub fn from_json(json: &[u8]) -> Result<Self, UploadError> {
        serde_json::from_slice(json)
            .map_err(|e| UploadError::Auth(format!("invalid service account key: {e}")))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Issues access tokens for a service account acting as a delegated user
pub struct TokenProvider {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    subject: String,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Create a provider; fails if the private key is not a usable RSA PEM
    pub fn new(
        client: reqwest::Client,
        key: ServiceAccountKey,
        subject: impl Into<String>,
        token_uri_override: Option<String>,
    ) -> Result<Self, UploadError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| UploadError::Auth(format!("invalid service account private key: {e}")))?;
        let token_uri = token_uri_override.unwrap_or_else(|| key.token_uri.clone());

        Ok(Self {
            client,
            key,
            encoding_key,
            subject: subject.into(),
            token_uri,
            cached: Mutex::new(None),
        })
    }

    /// Service account email
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Return a valid access token, fetching a new one when needed
    pub async fn access_token(&self) -> Result<String, UploadError> {
        // Held across the exchange so concurrent jobs share one refresh
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let response = self.exchange().await?;
        let lifetime = Duration::from_secs(response.expires_in);
        let refresh_at = Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN);

        tracing::debug!(
            client_email = %self.key.client_email,
            subject = %self.subject,
            expires_in = response.expires_in,
            "obtained storage access token"
        );

        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at,
        });
        Ok(response.access_token)
    }

    fn assertion(&self) -> Result<String, UploadError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            sub: self.subject.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| UploadError::Auth(format!("failed to sign token assertion: {e}")))
    }

    async fn exchange(&self) -> Result<TokenResponse, UploadError> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|e| UploadError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| UploadError::Auth(format!("malformed token response: {e}")))
    }
}
