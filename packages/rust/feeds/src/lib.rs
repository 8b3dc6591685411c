//! HTTP client for the website's lead-form feeds.
//!
//! Each feed is a bearer-protected JSON endpoint answering
//! `{"status": "success", "data": [...]}`. Anything else (transport failure,
//! non-2xx status, malformed body, other status) is reported as
//! [`LeadSyncError::Feed`] so the caller can skip the source for this cycle.

use std::future::Future;
use std::time::Duration;

use leadsync_shared::{AppConfig, FeedEnvelope, FeedItem, LeadSource, LeadSyncError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// Default timeout in seconds for feed requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest slice of an error body echoed into logs.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("LeadSync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FeedFetcher
// ---------------------------------------------------------------------------

/// Anything that can produce the raw items of a lead feed.
pub trait FeedFetcher {
    /// Fetch every item currently published by `source`.
    fn fetch(&self, source: LeadSource) -> impl Future<Output = Result<Vec<FeedItem>>> + Send;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Endpoint URLs for each feed.
#[derive(Debug, Clone)]
pub struct FeedEndpoints {
    pub floorplan: Url,
    pub showguide: Url,
}

impl FeedEndpoints {
    /// Parse the endpoint URLs from the `[feeds]` config section.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            floorplan: parse_url(&config.feeds.floorplan_url)?,
            showguide: parse_url(&config.feeds.showguide_url)?,
        })
    }

    pub fn url_for(&self, source: LeadSource) -> &Url {
        match source {
            LeadSource::Floorplan => &self.floorplan,
            LeadSource::ShowGuide => &self.showguide,
        }
    }
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl From<&AppConfig> for FeedOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.feeds.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpFeedClient
// ---------------------------------------------------------------------------

/// Bearer-authenticated reqwest client for both feeds.
pub struct HttpFeedClient {
    client: Client,
    endpoints: FeedEndpoints,
    bearer_token: String,
}

impl HttpFeedClient {
    pub fn new(
        endpoints: FeedEndpoints,
        bearer_token: impl Into<String>,
        opts: &FeedOptions,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(opts)?,
            endpoints,
            bearer_token: bearer_token.into(),
        })
    }
}

impl FeedFetcher for HttpFeedClient {
    #[instrument(skip_all, fields(source = %source))]
    async fn fetch(&self, source: LeadSource) -> Result<Vec<FeedItem>> {
        let url = self.endpoints.url_for(source);
        info!(%url, "fetching feed");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| LeadSyncError::feed(source.display_name(), format!("{url}: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            LeadSyncError::feed(
                source.display_name(),
                format!("{url}: failed to read body: {e}"),
            )
        })?;

        if !status.is_success() {
            return Err(LeadSyncError::feed(
                source.display_name(),
                format!("HTTP {status}: {}", truncate(&body)),
            ));
        }

        let envelope: FeedEnvelope = serde_json::from_str(&body).map_err(|e| {
            LeadSyncError::feed(source.display_name(), format!("malformed JSON: {e}"))
        })?;

        if !envelope.is_success() {
            return Err(LeadSyncError::feed(
                source.display_name(),
                format!("API error: {}", truncate(&body)),
            ));
        }

        let items = envelope.into_items();
        debug!(items = items.len(), "feed decoded");
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| LeadSyncError::config(format!("invalid feed URL '{raw}': {e}")))
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FeedOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| LeadSyncError::Network(format!("failed to build HTTP client: {e}")))
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{head}…")
}
