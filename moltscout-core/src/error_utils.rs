use crate::error::*;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Classification shared by every error type in the crate.
pub trait ErrorExt: Display {
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> &'static str;

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn log_error(&self) -> &Self {
        error!("{}: {}", self.error_code(), self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("{} (warning): {}", self.error_code(), self);
        self
    }
}

impl ErrorExt for CoreError {
    fn is_retryable(&self) -> bool {
        match self {
            CoreError::FeedApi(e) => e.is_retryable(),
            CoreError::Memory(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::RequestFailed { status_code, .. } => {
                matches!(status_code, Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::FeedApi(e) => e.retry_after(),
            CoreError::Llm(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::FeedApi(e) => e.user_friendly_message(),
            CoreError::Memory(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::RequestFailed { message, .. } => format!("Request failed: {}", message),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::FeedApi(_) => "FEED_API",
            CoreError::Memory(_) => "MEMORY",
            CoreError::Llm(_) => "LLM",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::Internal { .. } => "INTERNAL",
            CoreError::RequestFailed { .. } => "REQUEST_FAILED",
        }
    }

    fn log_error(&self) -> &Self {
        error!("{}: {}", self.error_code(), self);
        match self {
            CoreError::FeedApi(e) => error!("Feed API error details: {:?}", e),
            CoreError::Memory(e) => error!("Memory store error details: {:?}", e),
            CoreError::Llm(e) => error!("LLM error details: {:?}", e),
            CoreError::Config(e) => error!("Configuration error details: {:?}", e),
            _ => {}
        }
        self
    }
}

impl ErrorExt for FeedApiError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FeedApiError::RateLimitExceeded { .. }
                | FeedApiError::RequestTimeout
                | FeedApiError::ServerError { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            FeedApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            FeedApiError::RequestTimeout => Some(Duration::from_secs(2)),
            FeedApiError::ServerError { .. } => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FeedApiError::InvalidToken => {
                "The platform API key was rejected. Check the configured api_key.".to_string()
            }
            FeedApiError::RateLimitExceeded { retry_after } => format!(
                "The platform is rate limiting requests. Try again in {} seconds.",
                retry_after
            ),
            FeedApiError::Forbidden { resource } => {
                format!("Access to {} is not allowed for this account.", resource)
            }
            FeedApiError::ChannelNotFound { channel } => {
                format!("The channel m/{} does not exist.", channel)
            }
            FeedApiError::EndpointUnavailable { endpoint } => {
                format!("The feed endpoint {} was not found.", endpoint)
            }
            FeedApiError::ServerError { .. } => {
                "The platform is having trouble right now. Please try again later.".to_string()
            }
            FeedApiError::RequestTimeout => {
                "The platform did not answer in time. Please try again.".to_string()
            }
            FeedApiError::InvalidResponse { .. } => {
                "The platform returned a response that could not be read.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            FeedApiError::RateLimitExceeded { .. } => "FEED_RATE_LIMITED",
            FeedApiError::Forbidden { .. } => "FEED_FORBIDDEN",
            FeedApiError::ChannelNotFound { .. } => "FEED_CHANNEL_NOT_FOUND",
            FeedApiError::InvalidToken => "FEED_INVALID_TOKEN",
            FeedApiError::EndpointUnavailable { .. } => "FEED_ENDPOINT_UNAVAILABLE",
            FeedApiError::RequestTimeout => "FEED_TIMEOUT",
            FeedApiError::InvalidResponse { .. } => "FEED_INVALID_RESPONSE",
            FeedApiError::ServerError { .. } => "FEED_SERVER_ERROR",
        }
    }
}

impl ErrorExt for MemoryError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            MemoryError::ReadFailed { path, .. } => {
                format!("Could not read the seen-posts memory at {}.", path)
            }
            MemoryError::Corrupt { path, .. } => format!(
                "The seen-posts memory at {} is corrupt. Fix or remove it before scanning again.",
                path
            ),
            MemoryError::WriteFailed { path, .. } => format!(
                "Could not save the seen-posts memory to {}. Nothing was marked seen.",
                path
            ),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            MemoryError::ReadFailed { .. } => "MEMORY_READ_FAILED",
            MemoryError::Corrupt { .. } => "MEMORY_CORRUPT",
            MemoryError::WriteFailed { .. } => "MEMORY_WRITE_FAILED",
        }
    }
}

impl ErrorExt for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            LlmError::ServiceUnavailable { .. } => Some(Duration::from_secs(10)),
            LlmError::RequestTimeout { .. } => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::InvalidApiKey { provider } => {
                format!("The API key for {} is invalid or missing.", provider)
            }
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "{} is rate limiting requests. Try again in {} seconds.",
                provider, retry_after
            ),
            LlmError::ModelNotAvailable { model } => {
                format!("The model {} is not available.", model)
            }
            LlmError::InvalidPrompt { reason } => {
                format!("The analysis prompt was rejected: {}", reason)
            }
            LlmError::ServiceUnavailable { provider } => {
                format!("{} is currently unavailable. Please try again later.", provider)
            }
            LlmError::RequestTimeout { provider } => {
                format!("{} did not answer in time.", provider)
            }
            LlmError::InvalidResponseFormat { provider } => {
                format!("{} returned a response that could not be read.", provider)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY",
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMITED",
            LlmError::ModelNotAvailable { .. } => "LLM_MODEL_NOT_AVAILABLE",
            LlmError::InvalidPrompt { .. } => "LLM_INVALID_PROMPT",
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE",
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT",
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE",
        }
    }
}

impl ErrorExt for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotReadable { path } => {
                format!("Could not read the configuration file at {}.", path)
            }
            ConfigError::MissingField { field } => {
                format!("The configuration is missing the required field '{}'.", field)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("'{}' is not a valid value for '{}'.", value, field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => {
                format!("Set the {} environment variable.", var_name)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("The configuration was rejected: {}", reason)
            }
            ConfigError::Parse(e) => format!("The configuration file has a syntax error: {}", e),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotReadable { .. } => "CONFIG_FILE_NOT_READABLE",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }
}

/// Logs a fatal scan error along with its code and the message meant for the operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if let Some(retry_after) = error.retry_after() {
            info!("Error is retryable. Retry after: {:?}", retry_after);
        }
    }
}

/// Backoff settings for the HTTP collaborators.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let jitter = delay.as_secs_f64() * self.jitter_factor * fastrand::f64();
        delay + Duration::from_secs_f64(jitter)
    }
}

pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorExt,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= config.max_retries || !error.is_retryable() {
                    return Err(error);
                }

                if let Some(retry_delay) = error.retry_after() {
                    delay = retry_delay;
                }
                delay = std::cmp::min(delay, config.max_delay);
                let wait = config.jittered(delay);

                info!(
                    "Retrying operation (attempt {}/{}) after {:?}: {}",
                    attempt + 1,
                    config.max_retries,
                    wait,
                    error
                );

                tokio::time::sleep(wait).await;
                delay = std::cmp::min(delay * 2, config.max_delay);
                attempt += 1;
            }
        }
    }
}
