pub mod claude;
pub mod request;

pub use claude::ClaudeProvider;
pub use request::AnalysisRequest;

use moltscout_core::CoreError;

/// A generative service that turns a batch of new posts into free-form analysis text.
///
/// Any `Ok` value is a valid result, the empty string included.
pub trait AnalysisService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, CoreError>;
}

impl<A: AnalysisService> AnalysisService for &A {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, CoreError> {
        (**self).analyze(request).await
    }
}
