use moltscout_core::{CategoryConfig, Opportunity};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    HighDiscussion,
    Unanswered,
    Trending,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::HighDiscussion,
        Category::Unanswered,
        Category::Trending,
    ];

    pub fn matches(&self, opportunity: &Opportunity, config: &CategoryConfig) -> bool {
        match self {
            Category::HighDiscussion => {
                opportunity.comment_count > config.discussion_min_comments
                    && opportunity.discussion_ratio() > config.discussion_ratio
            }
            Category::Unanswered => {
                opportunity.title.contains('?')
                    && opportunity.comment_count < config.unanswered_max_comments
            }
            Category::Trending => {
                opportunity.upvotes >= config.trending_min_upvotes
                    && opportunity.upvotes < config.trending_max_upvotes
                    && opportunity.score > config.trending_min_score
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::HighDiscussion => "high discussion",
            Category::Unanswered => "unanswered",
            Category::Trending => "trending",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorizedOpportunities {
    pub high_discussion: Vec<Opportunity>,
    pub unanswered: Vec<Opportunity>,
    pub trending: Vec<Opportunity>,
    pub scored: Vec<Opportunity>,
}

impl CategorizedOpportunities {
    pub fn bucket(&self, category: Category) -> &[Opportunity] {
        match category {
            Category::HighDiscussion => &self.high_discussion,
            Category::Unanswered => &self.unanswered,
            Category::Trending => &self.trending,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityCategorizer {
    config: CategoryConfig,
}

impl OpportunityCategorizer {
    pub fn new(config: CategoryConfig) -> Self {
        Self { config }
    }

    /// Expects `scored` already in descending score order; each bucket keeps that order.
    pub fn bucket(&self, category: Category, scored: &[Opportunity]) -> Vec<Opportunity> {
        scored
            .iter()
            .filter(|o| category.matches(o, &self.config))
            .take(self.config.bucket_cap)
            .cloned()
            .collect()
    }

    pub fn categorize(&self, scored: Vec<Opportunity>) -> CategorizedOpportunities {
        CategorizedOpportunities {
            high_discussion: self.bucket(Category::HighDiscussion, &scored),
            unanswered: self.bucket(Category::Unanswered, &scored),
            trending: self.bucket(Category::Trending, &scored),
            scored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(id: &str, title: &str, upvotes: u32, comment_count: u32, score: u32) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            title: title.to_string(),
            author: "Unknown".to_string(),
            upvotes,
            comment_count,
            channel: "general".to_string(),
            url: format!("https://www.moltbook.com/post/{}", id),
            score,
            reasons: vec!["general".to_string()],
        }
    }

    #[test]
    fn test_high_discussion_uses_bucket_ratio() {
        let categorizer = OpportunityCategorizer::default();
        // 15 / 20 = 0.75 clears the 0.1 bucket ratio, though not the scoring ratio
        let busy = opportunity("a", "Thread", 20, 15, 10);
        // 11 / 200 = 0.055 does not
        let popular = opportunity("b", "Thread", 200, 11, 10);
        let quiet = opportunity("c", "Thread", 1, 10, 10);

        let bucket = categorizer.bucket(Category::HighDiscussion, &[busy, popular, quiet]);
        let ids: Vec<&str> = bucket.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_unanswered_requires_question_mark_in_title() {
        let categorizer = OpportunityCategorizer::default();
        let scored = vec![
            opportunity("a", "Anyone else?", 0, 4, 25),
            opportunity("b", "What I learned today", 0, 0, 25),
            opportunity("c", "Is this normal?", 0, 5, 0),
        ];
        let bucket = categorizer.bucket(Category::Unanswered, &scored);
        let ids: Vec<&str> = bucket.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_trending_window_and_score() {
        let categorizer = OpportunityCategorizer::default();
        let scored = vec![
            opportunity("a", "Post", 5, 0, 16),
            opportunity("b", "Post", 99, 0, 30),
            opportunity("c", "Post", 100, 0, 30),
            opportunity("d", "Post", 4, 0, 30),
            opportunity("e", "Post", 50, 0, 15),
        ];
        let bucket = categorizer.bucket(Category::Trending, &scored);
        let ids: Vec<&str> = bucket.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_buckets_are_capped() {
        let categorizer = OpportunityCategorizer::default();
        let scored: Vec<Opportunity> = (0..12)
            .map(|i| opportunity(&format!("p{}", i), "Why?", 10, 12, 40 - i))
            .collect();

        let result = categorizer.categorize(scored);
        assert_eq!(result.scored.len(), 12);
        for category in Category::ALL {
            assert!(result.bucket(category).len() <= 5, "{} over cap", category);
        }
        assert_eq!(result.high_discussion.len(), 5);
        assert_eq!(result.trending.len(), 5);
        assert_eq!(result.high_discussion[0].id, "p0");
        assert_eq!(result.high_discussion[4].id, "p4");
    }

    #[test]
    fn test_one_opportunity_in_several_buckets() {
        let categorizer = OpportunityCategorizer::default();
        let both = opportunity("a", "Why?", 10, 3, 35);
        let result = categorizer.categorize(vec![both]);
        assert_eq!(result.unanswered.len(), 1);
        assert_eq!(result.trending.len(), 1);
        assert!(result.high_discussion.is_empty());
    }

    #[test]
    fn test_custom_cap() {
        let categorizer = OpportunityCategorizer::new(CategoryConfig {
            bucket_cap: 2,
            ..CategoryConfig::default()
        });
        let scored: Vec<Opportunity> = (0..4)
            .map(|i| opportunity(&format!("p{}", i), "Why?", 0, 0, 10))
            .collect();
        assert_eq!(categorizer.bucket(Category::Unanswered, &scored).len(), 2);
    }
}
