//! Raw JSON shapes returned by the platform and their normalization into
//! [`PostRecord`]. Nothing past this module sees an optional or polymorphic field.

use moltscout_core::{PostRecord, DEFAULT_CHANNEL, UNKNOWN_AUTHOR};
use serde::{Deserialize, Serialize};

/// A field the platform sends either as a bare string or as `{ "name": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedRef {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

impl NamedRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            NamedRef::Name(name) => Some(name.as_str()),
            NamedRef::Object { name } => name.as_deref(),
        }
        .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub submolt: Option<NamedRef>,
    #[serde(default)]
    pub author: Option<NamedRef>,
    #[serde(default)]
    pub upvotes: Option<i64>,
    #[serde(default, rename = "commentCount", alias = "comment_count")]
    pub comment_count: Option<i64>,
}

/// Listing body: either `{"posts": [...]}` or a bare array. An object without `posts`
/// does not parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Wrapped { posts: Vec<RawPost> },
    Bare(Vec<RawPost>),
}

impl FeedResponse {
    pub fn into_posts(self) -> Vec<RawPost> {
        match self {
            FeedResponse::Wrapped { posts } => posts,
            FeedResponse::Bare(posts) => posts,
        }
    }
}

fn counter(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, u32::MAX as i64) as u32
}

impl From<RawPost> for PostRecord {
    fn from(raw: RawPost) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            content: raw.content.unwrap_or_default(),
            channel: raw
                .submolt
                .as_ref()
                .and_then(NamedRef::name)
                .unwrap_or(DEFAULT_CHANNEL)
                .to_string(),
            author: raw
                .author
                .as_ref()
                .and_then(NamedRef::name)
                .unwrap_or(UNKNOWN_AUTHOR)
                .to_string(),
            upvotes: counter(raw.upvotes),
            comment_count: counter(raw.comment_count),
        }
    }
}
