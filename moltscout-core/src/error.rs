use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Feed API error: {0}")]
    FeedApi(#[from] FeedApiError),

    #[error("Memory store error: {0}")]
    Memory(#[from] MemoryError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    /// An HTTP status none of the collaborators has a specific mapping for.
    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
        status_code: Option<u16>,
    },
}

#[derive(Error, Debug, Clone)]
pub enum FeedApiError {
    #[error("Rate limited by the feed API, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden: {resource}")]
    Forbidden { resource: String },

    #[error("Channel m/{channel} does not exist")]
    ChannelNotFound { channel: String },

    #[error("Invalid API token")]
    InvalidToken,

    #[error("Feed endpoint unavailable: {endpoint}")]
    EndpointUnavailable { endpoint: String },

    #[error("Feed request timed out")]
    RequestTimeout,

    #[error("Unreadable feed response: {details}")]
    InvalidResponse { details: String },

    #[error("Feed server error: {status_code}")]
    ServerError { status_code: u16 },
}

/// Failures of the seen-posts memory file. None of them are retried.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Memory file unreadable: {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Memory file corrupt: {path}: {details}")]
    Corrupt { path: String, details: String },

    #[error("Memory file could not be written: {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key invalid or missing for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Model not available: {model}")]
    ModelNotAvailable { model: String },

    #[error("Prompt rejected: {reason}")]
    InvalidPrompt { reason: String },

    #[error("{provider} is unavailable")]
    ServiceUnavailable { provider: String },

    #[error("Request to {provider} timed out")]
    RequestTimeout { provider: String },

    #[error("Unreadable response from {provider}")]
    InvalidResponseFormat { provider: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not readable: {path}")]
    FileNotReadable { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration rejected: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
