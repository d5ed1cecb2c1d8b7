//! Challenge-solving collaborator interface

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solver backend error: {0}")]
    Backend(String),

    #[error("solver timed out after {0}s")]
    Timeout(u64),
}

/// Produces a challenge token for a page, if it can
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Attempts to solve the challenge on `page_url`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(token))` - A token was obtained
    /// * `Ok(None)` - The solver declined; manual intervention is required
    /// * `Err(SolveError)` - The solver itself failed
    async fn solve(&self, page_url: &str, site_key: Option<&str>)
        -> Result<Option<String>, SolveError>;
}

/// Safe default: never auto-solves, always defers to a human
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualChallengeSolver;

#[async_trait]
impl ChallengeSolver for ManualChallengeSolver {
    async fn solve(
        &self,
        page_url: &str,
        _site_key: Option<&str>,
    ) -> Result<Option<String>, SolveError> {
        tracing::info!(url = page_url, "challenge requires manual intervention");
        Ok(None)
    }
}
