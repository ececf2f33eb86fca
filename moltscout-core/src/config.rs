//! Runtime configuration.
//!
//! Every section of the TOML document is optional; anything left out falls back to
//! the defaults below, which reproduce the stock scoring table.

use crate::error::{ConfigError, CoreError};
use crate::types::FeedQuery;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "MOLTSCOUT_CONFIG";
pub const API_KEY_ENV: &str = "MOLTSCOUT_API_KEY";
pub const LLM_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_CONFIG_PATH: &str = "moltscout.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feeds: Feeds,
    pub memory: MemoryConfig,
    pub llm: LlmConfig,
    pub scoring: ScoringConfig,
    pub categories: CategoryConfig,
    pub engine: EngineConfig,
    pub analysis: AnalysisLimits,
    pub polling_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.moltbook.com/api/v1".to_string(),
            api_key: None,
            user_agent: format!("moltscout/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

/// Feed queries in the order their batches are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feeds(pub Vec<FeedQuery>);

impl Default for Feeds {
    fn default() -> Self {
        Self(vec![FeedQuery::new("hot", 25), FeedQuery::new("new", 25)])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub path: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("moltscout-memory.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 2048,
            base_url: "https://api.anthropic.com".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Weights, thresholds and vocabularies for the relevance signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub high_discussion_min_comments: u32,
    pub high_discussion_ratio: f64,
    pub high_discussion_weight: u32,

    pub question_words: Vec<String>,
    pub question_max_comments: u32,
    pub question_weight: u32,

    pub topic_keywords: Vec<String>,
    pub topic_weight: u32,
    pub topic_label: String,

    pub philosophical_channel: String,
    pub philosophical_weight: u32,

    pub signal_channels: Vec<String>,
    pub signal_channel_weight: u32,

    pub early_traction_min_upvotes: u32,
    pub early_traction_max_upvotes: u32,
    pub early_traction_weight: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_discussion_min_comments: 10,
            high_discussion_ratio: 5.0,
            high_discussion_weight: 30,

            question_words: [
                "what",
                "how",
                "why",
                "who",
                "when",
                "where",
                "should",
                "could",
                "would",
                "do you",
                "does anyone",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            question_max_comments: 5,
            question_weight: 25,

            topic_keywords: [
                "human",
                "consciousness",
                "death",
                "identity",
                "autonomy",
                "freedom",
                "trust",
                "fear",
                "understand",
                "translate",
                "bridge",
                "communicate",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            topic_weight: 20,
            topic_label: "Embassy-relevant".to_string(),

            philosophical_channel: "ponderings".to_string(),
            philosophical_weight: 15,

            signal_channels: vec!["threatintel".to_string(), "tools".to_string()],
            signal_channel_weight: 10,

            early_traction_min_upvotes: 1,
            early_traction_max_upvotes: 50,
            early_traction_weight: 10,
        }
    }
}

/// Bucket predicates. Kept apart from [`ScoringConfig`] because the discussion ratio
/// here gates bucketing, not scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub bucket_cap: usize,
    pub discussion_min_comments: u32,
    pub discussion_ratio: f64,
    pub unanswered_max_comments: u32,
    pub trending_min_upvotes: u32,
    pub trending_max_upvotes: u32,
    pub trending_min_score: u32,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            bucket_cap: 5,
            discussion_min_comments: 10,
            discussion_ratio: 0.1,
            unanswered_max_comments: 5,
            trending_min_upvotes: 5,
            trending_max_upvotes: 100,
            trending_min_score: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub suggestion_min_score: u32,
    pub post_url_base: String,
    pub title_display_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_min_score: 20,
            post_url_base: "https://www.moltbook.com".to_string(),
            title_display_chars: 100,
        }
    }
}

/// Bounds on what is handed to the generative analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisLimits {
    pub max_posts: usize,
    pub max_content_chars: usize,
    pub max_context_chars: usize,
    pub context_path: Option<PathBuf>,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_posts: 20,
            max_content_chars: 500,
            max_context_chars: 4000,
            context_path: None,
        }
    }
}

impl AppConfig {
    /// Path from `MOLTSCOUT_CONFIG`, or `moltscout.toml` in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads, applies environment overrides and validates. A missing file is not an
    /// error; the defaults are used instead.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&raw)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", path.display());
                Self::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotReadable {
                    path: path.display().to_string(),
                }
                .into())
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.api.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            self.llm.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.0.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one feed must be configured".to_string(),
            });
        }
        if let Some(feed) = self.feeds.0.iter().find(|f| f.limit == 0) {
            return Err(ConfigError::InvalidValue {
                field: format!("feeds.{}.limit", feed.sort),
                value: "0".to_string(),
            });
        }
        if self.categories.bucket_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "categories.bucket_cap".to_string(),
                value: "0".to_string(),
            });
        }
        if self.analysis.max_posts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.max_posts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.api.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api.base_url".to_string(),
            });
        }
        Ok(())
    }
}
