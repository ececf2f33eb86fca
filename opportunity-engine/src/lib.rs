//! Turns raw posts into scored, bucketed opportunities and a suggested post.

pub mod categorizer;
pub mod classifier;
pub mod suggestion;

pub use categorizer::{CategorizedOpportunities, Category, OpportunityCategorizer};
pub use classifier::{Classification, RelevanceClassifier, Signal};
pub use suggestion::{SuggestionGenerator, TopicTrigger};

use moltscout_core::{AppConfig, CoreError, Opportunity, PostRecord, SuggestedPost};
use tracing::info;

pub struct OpportunityEngine {
    classifier: RelevanceClassifier,
    categorizer: OpportunityCategorizer,
    suggestions: SuggestionGenerator,
}

impl OpportunityEngine {
    pub fn new(
        classifier: RelevanceClassifier,
        categorizer: OpportunityCategorizer,
        suggestions: SuggestionGenerator,
    ) -> Self {
        Self {
            classifier,
            categorizer,
            suggestions,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        Ok(Self::new(
            RelevanceClassifier::new(&config.scoring, config.engine.clone())?,
            OpportunityCategorizer::new(config.categories.clone()),
            SuggestionGenerator::new(config.engine.suggestion_min_score),
        ))
    }

    pub fn score_and_categorize(&self, posts: &[PostRecord]) -> CategorizedOpportunities {
        let result = self.categorizer.categorize(self.classifier.score_all(posts));
        info!(
            "Categorized {} opportunities: {} high discussion, {} unanswered, {} trending",
            result.scored.len(),
            result.high_discussion.len(),
            result.unanswered.len(),
            result.trending.len()
        );
        result
    }

    pub fn suggest_post(&self, scored: &[Opportunity]) -> SuggestedPost {
        self.suggestions.suggest_post(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, title: &str, channel: &str, upvotes: u32, comment_count: u32) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            title: title.to_string(),
            channel: channel.to_string(),
            upvotes,
            comment_count,
            ..PostRecord::default()
        }
    }

    #[test]
    fn test_score_and_categorize_end_to_end() {
        let engine = OpportunityEngine::from_config(&AppConfig::default()).unwrap();
        let posts = vec![
            post("quiet", "Status update", "general", 0, 0),
            post("ask", "Does consciousness need memory?", "ponderings", 6, 2),
            post("busy", "Benchmarks thread", "tools", 30, 40),
        ];

        let result = engine.score_and_categorize(&posts);
        let order: Vec<&str> = result.scored.iter().map(|o| o.id.as_str()).collect();
        // ask: 25 + 20 + 15 + 10, busy: 10 + 10, quiet: 0
        assert_eq!(order, vec!["ask", "busy", "quiet"]);
        assert_eq!(result.scored[0].score, 70);

        assert_eq!(result.unanswered.len(), 1);
        assert_eq!(result.unanswered[0].id, "ask");
        assert_eq!(result.high_discussion.len(), 1);
        assert_eq!(result.high_discussion[0].id, "busy");
        let trending: Vec<&str> = result.trending.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(trending, vec!["ask", "busy"]);

        let suggestion = engine.suggest_post(&result.scored);
        assert_eq!(suggestion.channel, "ponderings");
        assert_eq!(suggestion.reason, "Consciousness and awareness dominate the strongest threads");
    }

    #[test]
    fn test_categorized_output_serializes() {
        let engine = OpportunityEngine::from_config(&AppConfig::default()).unwrap();
        let result = engine.score_and_categorize(&[post("a", "Why?", "general", 1, 0)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scored"][0]["reasons"][0], "unanswered question");
        assert_eq!(json["unanswered"][0]["id"], "a");
    }
}
