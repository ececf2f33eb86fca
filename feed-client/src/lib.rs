pub mod api;
pub mod wire;


pub use api::MoltbookClient;
pub use wire::{FeedResponse, NamedRef, RawPost};

use moltscout_core::{CoreError, FeedQuery, PostRecord};

/// Anything that can produce a batch of posts for a feed query.
pub trait PostSource {
    async fn fetch_batch(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, CoreError>;
}

impl<S: PostSource> PostSource for &S {
    async fn fetch_batch(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, CoreError> {
        (**self).fetch_batch(query).await
    }
}
