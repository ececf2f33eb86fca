use crate::MemoryStore;
use moltscout_core::PostRecord;
use std::collections::HashSet;

/// Flattens batches into one sequence, keeping the first occurrence of every id.
///
/// Batches are read in the order given, so callers control which feed wins a tie.
/// Posts without an id cannot be compared and are always kept.
pub fn merge_batches<I>(batches: I) -> Vec<PostRecord>
where
    I: IntoIterator<Item = Vec<PostRecord>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for post in batches.into_iter().flatten() {
        if post.has_id() && !seen.insert(post.id.clone()) {
            continue;
        }
        merged.push(post);
    }

    merged
}

/// Posts whose id the memory has not recorded yet, in their original order.
pub fn filter_unseen(posts: Vec<PostRecord>, memory: &MemoryStore) -> Vec<PostRecord> {
    posts
        .into_iter()
        .filter(|post| !memory.contains(&post.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, title: &str) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            title: title.to_string(),
            ..PostRecord::default()
        }
    }

    fn ids(posts: &[PostRecord]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let hot = vec![post("a", "hot a"), post("b", "hot b"), post("c", "hot c")];
        let new = vec![post("d", "new d"), post("b", "new b"), post("a", "new a")];

        let merged = merge_batches(vec![hot, new]);
        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);
        assert_eq!(merged[1].title, "hot b");
    }

    #[test]
    fn test_merge_drops_duplicates_within_a_batch() {
        let merged = merge_batches(vec![vec![post("a", "1"), post("a", "2")]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "1");
    }

    #[test]
    fn test_merge_keeps_posts_without_id() {
        let merged = merge_batches(vec![
            vec![post("", "anonymous"), post("a", "a")],
            vec![post("", "anonymous again")],
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2].title, "anonymous again");
    }

    #[test]
    fn test_merge_of_nothing() {
        assert!(merge_batches(Vec::<Vec<PostRecord>>::new()).is_empty());
        assert!(merge_batches(vec![Vec::new(), Vec::new()]).is_empty());
    }

    #[test]
    fn test_filter_unseen_preserves_order() {
        let mut memory = MemoryStore::new();
        memory.mark_seen(["b", "d"]);

        let posts = vec![post("a", ""), post("b", ""), post("c", ""), post("d", ""), post("", "")];
        let unseen = filter_unseen(posts, &memory);
        assert_eq!(ids(&unseen), vec!["a", "c", ""]);
    }

    #[test]
    fn test_filter_unseen_with_empty_memory() {
        let posts = vec![post("x", ""), post("y", "")];
        assert_eq!(filter_unseen(posts, &MemoryStore::new()).len(), 2);
    }
}
