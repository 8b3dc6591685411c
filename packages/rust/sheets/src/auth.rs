//! OAuth2 access tokens for the Sheets and Drive APIs.
//!
//! Service accounts use the JWT bearer grant: an RS256-signed assertion is
//! exchanged at the key's `token_uri` for a short-lived access token, which
//! is cached until shortly before it expires.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use leadsync_shared::{LeadSyncError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// OAuth2 scopes requested for the service account.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// JWT bearer grant type.
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google's maximum).
const ASSERTION_TTL_SECS: i64 = 3600;

/// Refresh this long before the cached token's expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a Google service-account JSON key that we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Read and parse a key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LeadSyncError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            LeadSyncError::config(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign the JWT assertion presented to the token endpoint.
pub(crate) fn build_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: SCOPES.join(" "),
        aud: key.token_uri.clone(),
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_TTL_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| LeadSyncError::Auth(format!("invalid private key: {e}")))?;

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| LeadSyncError::Auth(format!("failed to sign assertion: {e}")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

enum TokenSource {
    ServiceAccount {
        key: ServiceAccountKey,
        cache: Mutex<Option<CachedToken>>,
    },
    Static(String),
}

/// Supplies bearer tokens for Google API requests.
pub struct Authenticator {
    source: TokenSource,
}

impl Authenticator {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self {
            source: TokenSource::ServiceAccount {
                key,
                cache: Mutex::new(None),
            },
        }
    }

    /// Use a token minted elsewhere (e.g. `gcloud auth print-access-token`).
    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
        }
    }

    /// Current access token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    pub async fn access_token(&self, client: &Client) -> Result<String> {
        let (key, cache) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount { key, cache } => (key, cache),
        };

        let mut guard = cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh(now)) {
            return Ok(cached.token.clone());
        }

        debug!(account = %key.client_email, "requesting access token");
        let fresh = exchange_assertion(client, key, now).await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }
}

async fn exchange_assertion(
    client: &Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken> {
    let assertion = build_assertion(key, now)?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| LeadSyncError::Network(format!("{}: {e}", key.token_uri)))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        LeadSyncError::Network(format!("{}: failed to read body: {e}", key.token_uri))
    })?;

    if !status.is_success() {
        return Err(LeadSyncError::Auth(format!(
            "token exchange failed (HTTP {status}): {body}"
        )));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| LeadSyncError::Auth(format!("unexpected token response: {e}")))?;

    let expires_in = parsed.expires_in.unwrap_or(ASSERTION_TTL_SECS);
    info!(expires_in, "obtained access token");

    Ok(CachedToken {
        token: parsed.access_token,
        expires_at: now + Duration::seconds(expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY_FIXTURE: &str = "../../../fixtures/google/service_account.json";
    const PUBLIC_KEY_FIXTURE: &str = "../../../fixtures/google/test_public_key.pem";

    fn load_key() -> ServiceAccountKey {
        ServiceAccountKey::from_file(Path::new(KEY_FIXTURE)).expect("read key fixture")
    }

    #[test]
    fn assertion_is_verifiable_rs256() {
        let key = load_key();
        let now = Utc::now();
        let jwt = build_assertion(&key, now).unwrap();

        let pem = std::fs::read(PUBLIC_KEY_FIXTURE).expect("read public key fixture");
        let decoding_key = DecodingKey::from_rsa_pem(&pem).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[key.token_uri.as_str()]);
        validation.set_issuer(&[key.client_email.as_str()]);

        let decoded = jsonwebtoken::decode::<AssertionClaims>(&jwt, &decoding_key, &validation)
            .expect("valid assertion");
        assert_eq!(decoded.header.kid.as_deref(), Some("test-key-1"));
        assert_eq!(decoded.claims.exp - decoded.claims.iat, ASSERTION_TTL_SECS);
        assert!(decoded.claims.scope.contains("auth/spreadsheets"));
    }

    #[test]
    fn bad_private_key_is_auth_error() {
        let mut key = load_key();
        key.private_key = "not a pem".into();
        let err = build_assertion(&key, Utc::now()).unwrap_err();
        assert!(matches!(err, LeadSyncError::Auth(_)));
    }

    #[test]
    fn missing_key_file_is_io_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/key.json")).unwrap_err();
        assert!(matches!(err, LeadSyncError::Io { .. }));
    }

    #[tokio::test]
    async fn token_is_exchanged_once_then_cached() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.cached",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut key = load_key();
        key.token_uri = format!("{}/token", server.uri());
        let auth = Authenticator::service_account(key);
        let client = Client::new();

        assert_eq!(auth.access_token(&client).await.unwrap(), "ya29.cached");
        assert_eq!(auth.access_token(&client).await.unwrap(), "ya29.cached");
    }

    #[tokio::test]
    async fn rejected_exchange_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let mut key = load_key();
        key.token_uri = format!("{}/token", server.uri());
        let auth = Authenticator::service_account(key);

        let err = auth.access_token(&Client::new()).await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn cached_token_freshness_margin() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh(now));

        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(600),
        };
        assert!(token.is_fresh(now));
    }
}
