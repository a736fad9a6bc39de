//! Firebase Cloud Messaging (FCM) push provider.
//!
//! Implements the domain `PushProvider` trait on top of the FCM HTTP v1 API.
//! Authentication uses a Google service account: a signed RS256 assertion is
//! exchanged for an OAuth2 access token, which is cached until shortly before
//! it expires.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use domain::models::mask_token;
use domain::services::{PushError, PushMessage, PushProvider};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::FcmConfig;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Push provider backed by Firebase Cloud Messaging HTTP v1.
pub struct FcmPushProvider {
    client: Client,
    config: FcmConfig,
    credentials: ServiceAccountCredentials,
    token_cache: RwLock<Option<CachedToken>>,
}

/// Cached OAuth2 access token.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + TOKEN_EXPIRY_BUFFER
    }
}

/// Google service account credentials.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    /// Private key in PEM format.
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// JWT claims for Google OAuth2 service account authentication.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Google OAuth2 token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// FCM v1 API message structure.
#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: MessagePayload<'a>,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    token: &'a str,
    notification: NotificationPayload<'a>,
    data: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apns: Option<ApnsConfig>,
}

#[derive(Debug, Serialize)]
struct NotificationPayload<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct AndroidConfig {
    priority: &'static str,
}

#[derive(Debug, Serialize)]
struct ApnsConfig {
    headers: ApnsHeaders,
}

#[derive(Debug, Serialize)]
struct ApnsHeaders {
    #[serde(rename = "apns-priority")]
    priority: &'static str,
}

/// FCM API error response.
#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmErrorDetails,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetails {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Error type for FCM operations.
#[derive(Debug, thiserror::Error)]
pub enum FcmError {
    #[error("Failed to parse credentials: {0}")]
    CredentialsError(String),

    #[error("Failed to create JWT: {0}")]
    JwtError(String),

    #[error("Failed to get access token: {0}")]
    TokenError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("FCM API error: {0}")]
    ApiError(String),

    #[error("Invalid FCM token")]
    InvalidToken,

    #[error("FCM is not enabled")]
    NotEnabled,
}

impl From<FcmError> for PushError {
    fn from(err: FcmError) -> Self {
        match err {
            FcmError::InvalidToken => PushError::InvalidToken,
            FcmError::HttpError(e) => PushError::Transport(e.to_string()),
            FcmError::ApiError(msg) => PushError::Rejected(msg),
            other => PushError::Rejected(other.to_string()),
        }
    }
}

/// Outcome classification of a non-success FCM response.
#[derive(Debug, PartialEq, Eq)]
enum ResponseClass {
    InvalidToken,
    Retryable(String),
    Fatal(String),
}

fn classify_error_response(status: StatusCode, body: &str) -> ResponseClass {
    let parsed = serde_json::from_str::<FcmErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map(|r| r.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if let Some(response) = &parsed {
        let unregistered = response
            .error
            .details
            .iter()
            .any(|d| d.error_code.as_deref() == Some("UNREGISTERED"));
        if unregistered || response.error.status == "NOT_FOUND" {
            return ResponseClass::InvalidToken;
        }
    }

    if status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("UNREGISTERED") || body.contains("INVALID_ARGUMENT")))
    {
        return ResponseClass::InvalidToken;
    }

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ResponseClass::Retryable(message)
    } else {
        ResponseClass::Fatal(message)
    }
}

impl FcmPushProvider {
    /// Create a new FCM provider.
    ///
    /// # Errors
    /// Returns an error if FCM is disabled or the credentials cannot be loaded.
    pub fn new(config: FcmConfig) -> Result<Self, FcmError> {
        if !config.enabled {
            return Err(FcmError::NotEnabled);
        }

        let credentials = Self::load_credentials(&config.credentials)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            credentials,
            token_cache: RwLock::new(None),
        })
    }

    /// Load service account credentials from a JSON string or a file path.
    fn load_credentials(source: &str) -> Result<ServiceAccountCredentials, FcmError> {
        let content = if source.trim_start().starts_with('{') {
            source.to_string()
        } else {
            std::fs::read_to_string(source).map_err(|e| {
                FcmError::CredentialsError(format!("Failed to read credentials file: {}", e))
            })?
        };

        serde_json::from_str(&content)
            .map_err(|e| FcmError::CredentialsError(format!("Invalid credentials JSON: {}", e)))
    }

    /// Get a valid OAuth2 access token, refreshing if necessary.
    async fn access_token(&self) -> Result<String, FcmError> {
        if let Some(token) = self.token_cache.read().await.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cache = self.token_cache.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cache.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_access_token().await?;
        let access_token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(access_token)
    }

    /// Exchange a signed service-account assertion for an access token.
    async fn fetch_access_token(&self) -> Result<CachedToken, FcmError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let encoding_key =
            jsonwebtoken::EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
                .map_err(|e| FcmError::JwtError(format!("Invalid private key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| FcmError::JwtError(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FcmError::TokenError(format!(
                "Token exchange failed: {}",
                error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Fetched FCM access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    fn build_message<'a>(&self, token: &'a str, message: &'a PushMessage) -> FcmMessage<'a> {
        let high = self.config.high_priority;
        FcmMessage {
            message: MessagePayload {
                token,
                notification: NotificationPayload {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
                android: high.then_some(AndroidConfig { priority: "high" }),
                apns: high.then_some(ApnsConfig {
                    headers: ApnsHeaders { priority: "10" },
                }),
            },
        }
    }

    /// Send one message, retrying 5xx and transport failures with exponential backoff.
    async fn send_message(&self, token: &str, message: &PushMessage) -> Result<(), FcmError> {
        let access_token = self.access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.config.project_id
        );
        let payload = self.build_message(token, message);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // 100ms, 200ms, 400ms, ...
                tokio::time::sleep(Duration::from_millis(100 << (attempt - 1).min(10))).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&access_token)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(FcmError::HttpError(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                tracing::debug!(
                    token = %mask_token(token),
                    attempt = attempt,
                    "FCM message sent"
                );
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            match classify_error_response(status, &body) {
                ResponseClass::InvalidToken => return Err(FcmError::InvalidToken),
                ResponseClass::Fatal(msg) => return Err(FcmError::ApiError(msg)),
                ResponseClass::Retryable(msg) => {
                    tracing::debug!(
                        token = %mask_token(token),
                        attempt = attempt,
                        status = status.as_u16(),
                        "Retryable FCM error"
                    );
                    last_error = Some(FcmError::ApiError(msg));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FcmError::ApiError("Unknown error".to_string())))
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        self.send_message(token, message).await.map_err(|e| {
            if matches!(e, FcmError::InvalidToken) {
                tracing::warn!(token = %mask_token(token), "FCM reported token as unregistered");
            }
            PushError::from(e)
        })
    }
}
