use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CHANNEL: &str = "general";
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A single platform post, already normalized from whatever shape the wire carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub channel: String,
    pub author: String,
    pub upvotes: u32,
    pub comment_count: u32,
}

impl PostRecord {
    /// Title and content joined the way the signal detectors read them.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    /// Posts without an identifier can be scored but never remembered.
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}

impl Default for PostRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            channel: DEFAULT_CHANNEL.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            upvotes: 0,
            comment_count: 0,
        }
    }
}

/// A post enriched with its relevance score and the signals that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub author: String,
    pub upvotes: u32,
    pub comment_count: u32,
    pub channel: String,
    pub url: String,
    pub score: u32,
    pub reasons: Vec<String>,
}

impl Opportunity {
    /// Comments per upvote, with zero upvotes counted as one.
    pub fn discussion_ratio(&self) -> f64 {
        discussion_ratio(self.comment_count, self.upvotes)
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (m/{}, by {}, {} up / {} comments) {} [{}]",
            self.score,
            self.title,
            self.channel,
            self.author,
            self.upvotes,
            self.comment_count,
            self.url,
            self.reasons.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPost {
    pub channel: String,
    pub title: String,
    pub content: String,
    pub reason: String,
}

/// One feed request: a sort order, optionally scoped to a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub sort: String,
    #[serde(default)]
    pub channel: Option<String>,
    pub limit: u32,
}

impl FeedQuery {
    pub fn new(sort: impl Into<String>, limit: u32) -> Self {
        Self {
            sort: sort.into(),
            channel: None,
            limit,
        }
    }

    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

impl fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "m/{}:{}({})", channel, self.sort, self.limit),
            None => write!(f, "{}({})", self.sort, self.limit),
        }
    }
}

pub fn discussion_ratio(comment_count: u32, upvotes: u32) -> f64 {
    comment_count as f64 / upvotes.max(1) as f64
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

pub fn post_url(base: &str, id: &str) -> String {
    format!("{}/post/{}", base.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_defaults() {
        let post = PostRecord::default();
        assert_eq!(post.channel, "general");
        assert_eq!(post.author, "Unknown");
        assert!(!post.has_id());
        assert_eq!(post.text(), " ");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefgh", 3), "abc...");
        // multi-byte characters are never split
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }

    #[test]
    fn test_post_url() {
        assert_eq!(
            post_url("https://www.moltbook.com/", "abc123"),
            "https://www.moltbook.com/post/abc123"
        );
    }

    #[test]
    fn test_discussion_ratio_zero_upvotes() {
        assert_eq!(discussion_ratio(12, 0), 12.0);
        assert_eq!(discussion_ratio(15, 20), 0.75);
    }

    #[test]
    fn test_feed_query_display() {
        assert_eq!(FeedQuery::new("hot", 25).to_string(), "hot(25)");
        assert_eq!(
            FeedQuery::new("new", 10).in_channel("tools").to_string(),
            "m/tools:new(10)"
        );
    }
}
