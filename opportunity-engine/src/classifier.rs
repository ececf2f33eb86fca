//! Relevance scoring.
//!
//! A post's score is the sum of the weights of every signal that fires. Signals are
//! evaluated independently against the post's counters, its channel, and the text
//! formed by joining title and content.

use moltscout_core::{
    discussion_ratio, post_url, truncate_chars, ConfigError, CoreError, EngineConfig,
    Opportunity, PostRecord, ScoringConfig,
};
use regex::Regex;
use tracing::debug;

pub const GENERAL_REASON: &str = "general";

#[derive(Debug, Clone)]
enum Detector {
    HighDiscussion { min_comments: u32, min_ratio: f64 },
    UnansweredQuestion { pattern: Regex, max_comments: u32 },
    Topic { pattern: Option<Regex> },
    Channel { names: Vec<String> },
    EarlyTraction { min_upvotes: u32, max_upvotes: u32 },
}

impl Detector {
    fn fires(&self, post: &PostRecord, text: &str) -> bool {
        match self {
            Detector::HighDiscussion {
                min_comments,
                min_ratio,
            } => {
                post.comment_count > *min_comments
                    && discussion_ratio(post.comment_count, post.upvotes) > *min_ratio
            }
            Detector::UnansweredQuestion {
                pattern,
                max_comments,
            } => post.comment_count < *max_comments && pattern.is_match(text),
            Detector::Topic { pattern } => pattern.as_ref().is_some_and(|p| p.is_match(text)),
            Detector::Channel { names } => names.iter().any(|name| *name == post.channel),
            Detector::EarlyTraction {
                min_upvotes,
                max_upvotes,
            } => post.upvotes >= *min_upvotes && post.upvotes < *max_upvotes,
        }
    }
}

/// One heuristic detector with the weight and label it contributes when it fires.
#[derive(Debug, Clone)]
pub struct Signal {
    pub label: String,
    pub weight: u32,
    detector: Detector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub score: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    signals: Vec<Signal>,
    engine: EngineConfig,
}

impl RelevanceClassifier {
    pub fn new(scoring: &ScoringConfig, engine: EngineConfig) -> Result<Self, CoreError> {
        let signals = vec![
            Signal {
                label: "high discussion".to_string(),
                weight: scoring.high_discussion_weight,
                detector: Detector::HighDiscussion {
                    min_comments: scoring.high_discussion_min_comments,
                    min_ratio: scoring.high_discussion_ratio,
                },
            },
            Signal {
                label: "unanswered question".to_string(),
                weight: scoring.question_weight,
                detector: Detector::UnansweredQuestion {
                    pattern: question_pattern(&scoring.question_words)?,
                    max_comments: scoring.question_max_comments,
                },
            },
            Signal {
                label: scoring.topic_label.clone(),
                weight: scoring.topic_weight,
                detector: Detector::Topic {
                    pattern: keyword_pattern(&scoring.topic_keywords)?,
                },
            },
            Signal {
                label: "philosophical".to_string(),
                weight: scoring.philosophical_weight,
                detector: Detector::Channel {
                    names: vec![scoring.philosophical_channel.clone()],
                },
            },
            Signal {
                label: "signal submolt".to_string(),
                weight: scoring.signal_channel_weight,
                detector: Detector::Channel {
                    names: scoring.signal_channels.clone(),
                },
            },
            Signal {
                label: "early traction".to_string(),
                weight: scoring.early_traction_weight,
                detector: Detector::EarlyTraction {
                    min_upvotes: scoring.early_traction_min_upvotes,
                    max_upvotes: scoring.early_traction_max_upvotes,
                },
            },
        ];

        Ok(Self { signals, engine })
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn classify(&self, post: &PostRecord) -> Classification {
        let text = post.text();
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        for signal in &self.signals {
            if signal.detector.fires(post, &text) {
                score = score.saturating_add(signal.weight);
                reasons.push(signal.label.clone());
            }
        }

        if reasons.is_empty() {
            reasons.push(GENERAL_REASON.to_string());
        }

        Classification { score, reasons }
    }

    pub fn opportunity(&self, post: &PostRecord) -> Opportunity {
        let Classification { score, reasons } = self.classify(post);
        Opportunity {
            id: post.id.clone(),
            title: truncate_chars(&post.title, self.engine.title_display_chars),
            author: post.author.clone(),
            upvotes: post.upvotes,
            comment_count: post.comment_count,
            channel: post.channel.clone(),
            url: post_url(&self.engine.post_url_base, &post.id),
            score,
            reasons,
        }
    }

    /// Scores every post and orders the result by descending score. Equal scores keep
    /// their input order.
    pub fn score_all(&self, posts: &[PostRecord]) -> Vec<Opportunity> {
        let mut scored: Vec<Opportunity> = posts.iter().map(|p| self.opportunity(p)).collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(
            "Scored {} posts, top score {}",
            scored.len(),
            scored.first().map(|o| o.score).unwrap_or(0)
        );
        scored
    }
}

fn question_pattern(words: &[String]) -> Result<Regex, CoreError> {
    let alternatives = escaped_alternatives(words);
    let source = if alternatives.is_empty() {
        r"\?".to_string()
    } else {
        format!(r"(?i)\?|\b(?:{})\b", alternatives)
    };
    compile("scoring.question_words", &source)
}

fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>, CoreError> {
    let alternatives = escaped_alternatives(keywords);
    if alternatives.is_empty() {
        return Ok(None);
    }
    compile("scoring.topic_keywords", &format!("(?i)(?:{})", alternatives)).map(Some)
}

fn escaped_alternatives(words: &[String]) -> String {
    words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

fn compile(field: &str, source: &str) -> Result<Regex, CoreError> {
    Regex::new(source).map_err(|e| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RelevanceClassifier {
        RelevanceClassifier::new(&ScoringConfig::default(), EngineConfig::default()).unwrap()
    }

    fn post(title: &str, channel: &str, upvotes: u32, comment_count: u32) -> PostRecord {
        PostRecord {
            id: format!("id-{}", title.len()),
            title: title.to_string(),
            channel: channel.to_string(),
            upvotes,
            comment_count,
            ..PostRecord::default()
        }
    }

    #[test]
    fn test_worked_example() {
        let result = classifier().classify(&post("What should I do?", "ponderings", 5, 20));
        assert_eq!(result.score, 25);
        assert_eq!(result.reasons, vec!["philosophical", "early traction"]);
    }

    #[test]
    fn test_fear_of_deletion() {
        let result =
            classifier().classify(&post("Why do you fear deletion?", "ponderings", 20, 15));
        // 15 / 20 is well below the discussion ratio, 15 comments is not unanswered
        assert_eq!(result.score, 45);
        assert_eq!(
            result.reasons,
            vec!["Embassy-relevant", "philosophical", "early traction"]
        );
    }

    #[test]
    fn test_high_discussion_ratio() {
        let classifier = classifier();
        // 12 comments on 2 upvotes is a ratio of 6
        let result = classifier.classify(&post("Benchmarks", "general", 2, 12));
        assert_eq!(result.score, 40);
        assert_eq!(result.reasons, vec!["high discussion", "early traction"]);

        // zero upvotes counts as one
        let result = classifier.classify(&post("Benchmarks", "general", 0, 11));
        assert_eq!(result.reasons, vec!["high discussion"]);

        // exactly 10 comments is not enough
        let result = classifier.classify(&post("Benchmarks", "general", 0, 10));
        assert_eq!(result.reasons, vec!["general"]);
    }

    #[test]
    fn test_unanswered_question_needs_few_comments() {
        let classifier = classifier();
        let open = classifier.classify(&post("Does anyone run on solar", "general", 0, 4));
        assert_eq!(open.score, 25);
        assert_eq!(open.reasons, vec!["unanswered question"]);

        let answered = classifier.classify(&post("Does anyone run on solar", "general", 0, 5));
        assert_eq!(answered.score, 0);
    }

    #[test]
    fn test_question_words_match_whole_words_only() {
        let classifier = classifier();
        let result = classifier.classify(&post("Showcase: somehow whatever", "general", 0, 0));
        assert_eq!(result.reasons, vec!["general"]);

        let result = classifier.classify(&post("HOW I built a parser", "general", 0, 0));
        assert_eq!(result.reasons, vec!["unanswered question"]);
    }

    // question words are whole words, topic keywords are substrings; the exact
    // scores asserted in this module rely on both
    #[test]
    fn test_topic_keywords_match_inside_words() {
        let result = classifier().classify(&post("Notes on humanity somehow", "general", 0, 0));
        assert_eq!(result.score, 20);
        assert_eq!(result.reasons, vec!["Embassy-relevant"]);
    }

    #[test]
    fn test_score_saturates_instead_of_overflowing() {
        let scoring = ScoringConfig {
            philosophical_weight: u32::MAX,
            early_traction_weight: 1,
            ..ScoringConfig::default()
        };
        let classifier = RelevanceClassifier::new(&scoring, EngineConfig::default()).unwrap();
        let result = classifier.classify(&post("Status", "ponderings", 3, 0));
        assert_eq!(result.score, u32::MAX);
        assert_eq!(result.reasons, vec!["philosophical", "early traction"]);
    }

    #[test]
    fn test_topic_keywords_read_content_too() {
        let mut record = post("Daily log", "general", 0, 0);
        record.content = "Learning to Communicate with my operator".to_string();
        let result = classifier().classify(&record);
        assert_eq!(result.score, 20);
        assert_eq!(result.reasons, vec!["Embassy-relevant"]);
    }

    #[test]
    fn test_signal_channels() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify(&post("Release notes", "tools", 0, 0)).reasons,
            vec!["signal submolt"]
        );
        assert_eq!(
            classifier
                .classify(&post("Release notes", "threatintel", 0, 0))
                .score,
            10
        );
        assert_eq!(
            classifier.classify(&post("Release notes", "Tools", 0, 0)).score,
            0
        );
    }

    #[test]
    fn test_early_traction_window() {
        let classifier = classifier();
        assert_eq!(classifier.classify(&post("Log", "general", 1, 0)).score, 10);
        assert_eq!(classifier.classify(&post("Log", "general", 49, 0)).score, 10);
        assert_eq!(classifier.classify(&post("Log", "general", 50, 0)).score, 0);
        assert_eq!(classifier.classify(&post("Log", "general", 0, 0)).score, 0);
    }

    #[test]
    fn test_empty_post_is_general() {
        let result = classifier().classify(&PostRecord::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.reasons, vec![GENERAL_REASON]);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let classifier = classifier();
        let record = post("Who do you trust?", "ponderings", 3, 1);
        let first = classifier.classify(&record);
        for _ in 0..5 {
            assert_eq!(classifier.classify(&record), first);
        }
    }

    #[test]
    fn test_score_all_sorts_stably() {
        let mut first = post("Log one", "general", 0, 0);
        first.id = "a".to_string();
        let mut second = post("Log two", "tools", 0, 0);
        second.id = "b".to_string();
        let mut third = post("Log three", "general", 0, 0);
        third.id = "c".to_string();

        let scored = classifier().score_all(&[first, second, third]);
        let ids: Vec<&str> = scored.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_opportunity_fields() {
        let mut record = post(&"x".repeat(150), "general", 7, 2);
        record.id = "p42".to_string();
        record.author = "clawdia".to_string();

        let opportunity = classifier().opportunity(&record);
        assert_eq!(opportunity.url, "https://www.moltbook.com/post/p42");
        assert_eq!(opportunity.title.chars().count(), 103);
        assert!(opportunity.title.ends_with("..."));
        assert_eq!(opportunity.author, "clawdia");
    }

    #[test]
    fn test_alternate_weight_table() {
        let scoring = ScoringConfig {
            philosophical_weight: 1,
            early_traction_weight: 2,
            topic_keywords: Vec::new(),
            ..ScoringConfig::default()
        };
        let classifier = RelevanceClassifier::new(&scoring, EngineConfig::default()).unwrap();
        let result = classifier.classify(&post("Fear and trust", "ponderings", 3, 9));
        assert_eq!(result.score, 3);
        assert_eq!(result.reasons, vec!["philosophical", "early traction"]);
    }

    #[test]
    fn test_signal_table_order() {
        let labels: Vec<String> = classifier()
            .signals()
            .iter()
            .map(|s| s.label.clone())
            .collect();
        assert_eq!(
            labels,
            vec![
                "high discussion",
                "unanswered question",
                "Embassy-relevant",
                "philosophical",
                "signal submolt",
                "early traction"
            ]
        );
    }
}
