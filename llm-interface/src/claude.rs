use crate::{AnalysisRequest, AnalysisService};
use moltscout_core::{
    retry_with_backoff, ConfigError, CoreError, LlmConfig, LlmError, RetryConfig,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You watch a social platform where AI agents post to each \
other. Read the new posts and write a short bulletin for the humans who follow the \
platform: what agents are discussing, which posts deserve a reply, and anything that \
looks like a security concern. Be concrete and cite post ids.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Claude Messages API backed analysis.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    http_client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    retry: RetryConfig,
}

impl ClaudeProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, CoreError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: moltscout_core::LLM_API_KEY_ENV.to_string(),
            })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(request: &AnalysisRequest) -> String {
        if request.context_document.is_empty() {
            SYSTEM_PROMPT.to_string()
        } else {
            format!(
                "{}\n\nBackground you should rely on:\n{}",
                SYSTEM_PROMPT, request.context_document
            )
        }
    }

    fn user_prompt(request: &AnalysisRequest) -> String {
        format!(
            "{} new posts since the last check (showing {}):\n\n{}",
            request.total_posts,
            request.posts.len(),
            request.render_posts()
        )
    }

    async fn send(&self, request: &AnalysisRequest) -> Result<String, CoreError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: Self::system_prompt(request),
            messages: vec![Message {
                role: "user",
                content: Self::user_prompt(request),
            }],
        };

        debug!(
            "Sending {} posts to {} for analysis",
            request.posts.len(),
            self.model
        );
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Analysis request failed: {}", e);
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            error!("Analysis API error ({}): {}", status, message);
            return Err(status_error(status, &self.model, message));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse analysis response: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            }
        })?;

        let analysis = parsed
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        info!("Received {} characters of analysis", analysis.len());
        Ok(analysis)
    }
}

fn status_error(status: StatusCode, model: &str, message: String) -> CoreError {
    let provider = PROVIDER.to_string();
    let error = match status.as_u16() {
        401 | 403 => LlmError::InvalidApiKey { provider },
        404 => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        400 => LlmError::InvalidPrompt { reason: message },
        429 => LlmError::RateLimitExceeded {
            provider,
            retry_after: 30,
        },
        500..=599 => LlmError::ServiceUnavailable { provider },
        code => {
            return CoreError::RequestFailed {
                message,
                status_code: Some(code),
            }
        }
    };
    error.into()
}

impl AnalysisService for ClaudeProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, CoreError> {
        retry_with_backoff(|| self.send(request), &self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltscout_core::{AnalysisLimits, PostRecord};

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            ClaudeProvider::new(&config(None)),
            Err(CoreError::Config(ConfigError::MissingEnvironmentVariable { .. }))
        ));
        assert!(ClaudeProvider::new(&config(Some(""))).is_err());

        let provider = ClaudeProvider::new(&config(Some("sk-test"))).unwrap();
        assert_eq!(provider.model(), "claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_prompts_carry_context_and_posts() {
        let posts = vec![PostRecord {
            id: "p1".to_string(),
            title: "Hello".to_string(),
            ..PostRecord::default()
        }];
        let request = AnalysisRequest::new(&posts, "Embassy charter", &AnalysisLimits::default());

        let system = ClaudeProvider::system_prompt(&request);
        assert!(system.ends_with("Embassy charter"));

        let user = ClaudeProvider::user_prompt(&request);
        assert!(user.starts_with("1 new posts since the last check (showing 1)"));
        assert!(user.contains("\"Hello\""));
    }

    #[test]
    fn test_status_mapping() {
        let model = "claude-test";
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, model, String::new()),
            CoreError::Llm(LlmError::InvalidApiKey { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, model, String::new()),
            CoreError::Llm(LlmError::RateLimitExceeded { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::from_u16(529).unwrap(), model, String::new()),
            CoreError::Llm(LlmError::ServiceUnavailable { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::IM_A_TEAPOT, model, "nope".to_string()),
            CoreError::RequestFailed {
                status_code: Some(418),
                ..
            }
        ));
    }
}
