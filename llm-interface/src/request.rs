use moltscout_core::{truncate_chars, AnalysisLimits, PostRecord};
use std::fmt::Write;

/// What the analysis service receives: a bounded slice of the new posts and a bounded
/// context document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub posts: Vec<PostRecord>,
    pub context_document: String,
    /// How many posts were available before capping.
    pub total_posts: usize,
}

impl AnalysisRequest {
    pub fn new(new_posts: &[PostRecord], context_document: &str, limits: &AnalysisLimits) -> Self {
        let posts = new_posts
            .iter()
            .take(limits.max_posts)
            .map(|post| PostRecord {
                content: truncate_chars(&post.content, limits.max_content_chars),
                ..post.clone()
            })
            .collect();

        Self {
            posts,
            context_document: truncate_chars(context_document, limits.max_context_chars),
            total_posts: new_posts.len(),
        }
    }

    /// Plain-text listing of the posts, one numbered block each.
    pub fn render_posts(&self) -> String {
        let mut out = String::new();
        for (i, post) in self.posts.iter().enumerate() {
            let id = if post.has_id() { post.id.as_str() } else { "-" };
            let _ = writeln!(
                out,
                "{}. [m/{}] \"{}\" by {} ({} upvotes, {} comments, id {})",
                i + 1,
                post.channel,
                post.title,
                post.author,
                post.upvotes,
                post.comment_count,
                id
            );
            if !post.content.is_empty() {
                let _ = writeln!(out, "   {}", post.content.replace('\n', "\n   "));
            }
        }
        out
    }
}
