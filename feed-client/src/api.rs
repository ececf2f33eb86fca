use crate::wire::FeedResponse;
use crate::PostSource;
use moltscout_core::{
    retry_with_backoff, ApiConfig, ConfigError, CoreError, FeedApiError, FeedQuery, PostRecord,
    RetryConfig,
};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// HTTP client for the platform's post listings.
#[derive(Debug, Clone)]
pub struct MoltbookClient {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl MoltbookClient {
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        let base_url = parse_base_url(&config.base_url)?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            api_key: config.api_key.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `{base}/posts?sort=..&limit=..`, scoped with `submolt=` when the query names a
    /// channel.
    pub fn posts_url(&self, query: &FeedQuery) -> Url {
        let mut url = self.base_url.clone();
        // base urls that cannot carry a path are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("posts");
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("sort", &query.sort);
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(channel) = &query.channel {
                pairs.append_pair("submolt", channel);
            }
        }
        url
    }

    async fn request_posts(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, CoreError> {
        let url = self.posts_url(query);
        let mut request = self.http_client.get(url.clone());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!("Requesting feed {} from {}", query, url);
        let response = request.send().await.map_err(|e| {
            error!("Network error for feed {}: {}", query, e);
            if e.is_timeout() {
                CoreError::FeedApi(FeedApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let response = check_status(response, query)?;

        let body: FeedResponse = response.json().await.map_err(|e| {
            error!("Failed to parse feed {}: {}", query, e);
            CoreError::FeedApi(FeedApiError::InvalidResponse {
                details: format!("Failed to parse posts for {}", query),
            })
        })?;

        let posts: Vec<PostRecord> = body.into_posts().into_iter().map(PostRecord::from).collect();
        info!("Retrieved {} posts from feed {}", posts.len(), query);
        Ok(posts)
    }
}

impl PostSource for MoltbookClient {
    async fn fetch_batch(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, CoreError> {
        retry_with_backoff(|| self.request_posts(query), &self.retry).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field: "api.base_url".to_string(),
        value: format!("{} ({})", raw, e),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            value: raw.to_string(),
        }
        .into());
    }
    Ok(url)
}

fn check_status(response: Response, query: &FeedQuery) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!("Request failed with status: {} for feed {}", status, query);
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok());
    Err(status_error(status, retry_after, query))
}

/// Maps a non-success listing status to an error. A missing or unparsable
/// `retry-after` on 429 falls back to 60 seconds.
fn status_error(status: StatusCode, retry_after: Option<&str>, query: &FeedQuery) -> CoreError {
    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            FeedApiError::RateLimitExceeded { retry_after }
        }
        StatusCode::UNAUTHORIZED => FeedApiError::InvalidToken,
        StatusCode::FORBIDDEN => FeedApiError::Forbidden {
            resource: query.to_string(),
        },
        StatusCode::NOT_FOUND => match &query.channel {
            Some(channel) => FeedApiError::ChannelNotFound {
                channel: channel.clone(),
            },
            None => FeedApiError::EndpointUnavailable {
                endpoint: "posts".to_string(),
            },
        },
        s if s.is_server_error() => FeedApiError::ServerError {
            status_code: s.as_u16(),
        },
        s => {
            return CoreError::RequestFailed {
                message: format!("Unexpected status for feed {}", query),
                status_code: Some(s.as_u16()),
            }
        }
    };
    error.into()
}
