//! One scan: fetch every configured feed, keep only posts the memory has not seen,
//! hand them to the analysis service, then remember them.
//!
//! The memory only advances after analysis succeeded and the new memory was written.
//! A failure anywhere before that leaves the caller's memory exactly as it was, so the
//! next scan surfaces the same posts again.

use chrono::Utc;
use feed_client::PostSource;
use futures::future::join_all;
use llm_interface::{AnalysisRequest, AnalysisService};
use memory_store::{filter_unseen, merge_batches, MemoryPersistence, MemoryStore};
use moltscout_core::{AnalysisLimits, AppConfig, CoreError, ErrorExt, FeedQuery, PostRecord};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Fetching,
    Deduplicating,
    Filtering,
    NoNewPosts,
    Classifying,
    PersistingMemory,
    Done,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Fetching => "fetching",
            ScanState::Deduplicating => "deduplicating",
            ScanState::Filtering => "filtering",
            ScanState::NoNewPosts => "no new posts",
            ScanState::Classifying => "classifying",
            ScanState::PersistingMemory => "persisting memory",
            ScanState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Posts found by [`scan`] and the memory as it would look once they are processed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub new_posts: Vec<PostRecord>,
    pub updated_memory: MemoryStore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub new_posts: Vec<PostRecord>,
    pub analysis: String,
}

/// Issues every query concurrently. Results come back in query order whatever order
/// the requests finish in; a failed query contributes an empty batch.
pub async fn fetch_batches<S: PostSource>(source: &S, queries: &[FeedQuery]) -> Vec<Vec<PostRecord>> {
    let results = join_all(queries.iter().map(|query| source.fetch_batch(query))).await;

    results
        .into_iter()
        .zip(queries)
        .map(|(result, query)| match result {
            Ok(posts) => {
                debug!("Feed {} returned {} posts", query, posts.len());
                posts
            }
            Err(e) => {
                e.log_warn();
                warn!("Feed {} failed, treating it as empty", query);
                Vec::new()
            }
        })
        .collect()
}

/// Fetches, merges and filters without persisting anything. `updated_memory` equals
/// `memory` when nothing new was found.
pub async fn scan<S: PostSource>(memory: &MemoryStore, source: &S, queries: &[FeedQuery]) -> ScanResult {
    let merged = merge_batches(fetch_batches(source, queries).await);
    let new_posts = filter_unseen(merged, memory);
    let updated_memory = if new_posts.is_empty() {
        memory.clone()
    } else {
        memory.advanced(&new_posts, Utc::now())
    };

    ScanResult {
        new_posts,
        updated_memory,
    }
}

/// Reads the background document handed to the analysis service. No path means no
/// document.
pub async fn load_context_document(path: Option<&Path>) -> Result<String, CoreError> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => Ok(String::new()),
    }
}

pub struct ScanOrchestrator<S, A, P> {
    source: S,
    analyst: A,
    persistence: P,
    queries: Vec<FeedQuery>,
    limits: AnalysisLimits,
    context_document: String,
}

impl<S, A, P> ScanOrchestrator<S, A, P>
where
    S: PostSource,
    A: AnalysisService,
    P: MemoryPersistence,
{
    pub fn new(source: S, analyst: A, persistence: P, config: &AppConfig) -> Self {
        Self {
            source,
            analyst,
            persistence,
            queries: config.feeds.0.clone(),
            limits: config.analysis.clone(),
            context_document: String::new(),
        }
    }

    pub fn with_context_document(mut self, context_document: impl Into<String>) -> Self {
        self.context_document = context_document.into();
        self
    }

    fn enter(&self, state: ScanState) {
        debug!("Scan state: {}", state);
    }

    pub async fn load_memory(&self) -> Result<MemoryStore, CoreError> {
        self.persistence.load().await
    }

    /// Runs one scan against `memory`. Returns `None` when nothing new was found.
    pub async fn run(&self, memory: &mut MemoryStore) -> Result<Option<ScanOutcome>, CoreError> {
        self.enter(ScanState::Idle);

        self.enter(ScanState::Fetching);
        let batches = fetch_batches(&self.source, &self.queries).await;
        let fetched: usize = batches.iter().map(Vec::len).sum();

        self.enter(ScanState::Deduplicating);
        let merged = merge_batches(batches);

        self.enter(ScanState::Filtering);
        let new_posts = filter_unseen(merged, memory);

        if new_posts.is_empty() {
            self.enter(ScanState::NoNewPosts);
            info!("Fetched {} posts, nothing new since the last check", fetched);
            return Ok(None);
        }
        info!(
            "Fetched {} posts, {} new since {}",
            fetched,
            new_posts.len(),
            memory
                .last_checked_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "the first run".to_string())
        );

        self.enter(ScanState::Classifying);
        let request = AnalysisRequest::new(&new_posts, &self.context_document, &self.limits);
        let analysis = self.analyst.analyze(&request).await.map_err(|e| {
            warn!("Analysis failed, nothing was marked seen");
            e
        })?;

        self.enter(ScanState::PersistingMemory);
        let updated = memory.advanced(&new_posts, Utc::now());
        self.persistence.save(&updated).await.map_err(|e| {
            warn!("Saving memory failed, nothing was marked seen");
            e
        })?;
        *memory = updated;

        self.enter(ScanState::Done);
        Ok(Some(ScanOutcome {
            new_posts,
            analysis,
        }))
    }
}
