//! Per-target escalation state machine
//!
//! The plain fetch always runs first. A 401/403 is escalated to the renderer
//! when browser fallback is enabled, and a 403 is additionally handed to the
//! challenge solver. Both decisions use the status of the original fetch.
//! Collaborator failures are recorded in metadata and never abort the target.

use crate::escalation::render::Renderer;
use crate::escalation::solver::ChallengeSolver;
use crate::escalation::stage::{should_render, should_solve_challenge, EscalationStage};
use crate::fetch::FetchEngine;
use crate::scan::ScanResult;
use crate::session::SessionStore;
use std::sync::Arc;

/// Metadata key for the rendered page title
pub const META_BROWSER_TITLE: &str = "browser_title";
/// Metadata key for the rendered markup length in characters
pub const META_RENDERED_HTML_LENGTH: &str = "rendered_html_length";
/// Metadata key for a rendering failure
pub const META_BROWSER_ERROR: &str = "browser_error";
/// Metadata key for whether the solver produced a token
pub const META_CAPTCHA_TOKEN_RECEIVED: &str = "captcha_token_received";
/// Metadata key for a solver failure
pub const META_CAPTCHA_ERROR: &str = "captcha_error";

/// Drives one target from fetch through optional escalation
pub struct EscalationOrchestrator {
    fetcher: Arc<FetchEngine>,
    renderer: Option<Arc<dyn Renderer>>,
    solver: Arc<dyn ChallengeSolver>,
    browser_fallback: bool,
}

impl EscalationOrchestrator {
    pub fn new(
        fetcher: Arc<FetchEngine>,
        renderer: Option<Arc<dyn Renderer>>,
        solver: Arc<dyn ChallengeSolver>,
        browser_fallback: bool,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            solver,
            browser_fallback,
        }
    }

    pub fn fetcher(&self) -> &Arc<FetchEngine> {
        &self.fetcher
    }

    /// Scans one target and returns its final result
    pub async fn scan(&self, url: &str) -> ScanResult {
        let mut result = self.fetcher.fetch(url).await;
        let mut stage = EscalationStage::Fetched;
        let fetched_status = result.status_code;

        if should_render(fetched_status, self.browser_fallback) {
            self.render_into(url, &mut result).await;
            stage = advance(stage, EscalationStage::Rendered);
        }

        if should_solve_challenge(fetched_status) {
            self.solve_into(url, &mut result).await;
            stage = advance(stage, EscalationStage::CaptchaAttempted);
        }

        let stage = advance(stage, EscalationStage::Done);
        tracing::debug!(url, stage = %stage, "escalation finished");
        result
    }

    async fn render_into(&self, url: &str, result: &mut ScanResult) {
        let Some(renderer) = &self.renderer else {
            tracing::warn!(url, "browser fallback requested but no renderer configured");
            result.set_metadata(META_BROWSER_ERROR, "no renderer configured");
            return;
        };

        match renderer.render(url).await {
            Ok(output) => {
                tracing::info!(url, title = ?output.title, "browser_render");
                result.set_metadata(META_RENDERED_HTML_LENGTH, output.html_length());
                result.set_metadata(META_BROWSER_TITLE, output.title.clone());
                merge_into_session(self.fetcher.session(), &output).await;
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "browser_render_error");
                result.set_metadata(META_BROWSER_ERROR, e.to_string());
            }
        }
    }

    async fn solve_into(&self, url: &str, result: &mut ScanResult) {
        match self.solver.solve(url, None).await {
            Ok(token) => {
                let received = token.is_some_and(|t| !t.is_empty());
                result.set_metadata(META_CAPTCHA_TOKEN_RECEIVED, received);
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "captcha_solve_error");
                result.set_metadata(META_CAPTCHA_TOKEN_RECEIVED, false);
                result.set_metadata(META_CAPTCHA_ERROR, e.to_string());
            }
        }
    }
}

/// Writes rendered cookies and local storage back into the session
async fn merge_into_session(session: &SessionStore, output: &crate::escalation::RenderOutput) {
    session
        .merge_cookies(
            output
                .cookies
                .iter()
                .map(|c| (c.name.clone(), c.value.clone())),
        )
        .await;
    session
        .merge_local_storage(output.local_storage.clone())
        .await;
}

fn advance(from: EscalationStage, to: EscalationStage) -> EscalationStage {
    debug_assert!(from.can_transition_to(to), "illegal escalation {} -> {}", from, to);
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::escalation::render::{RenderError, RenderOutput, RenderedCookie};
    use crate::escalation::solver::{ManualChallengeSolver, SolveError};
    use crate::proxy::ProxyPool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, _url: &str) -> Result<RenderOutput, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::Navigation("net::ERR_ABORTED".to_string()));
            }
            Ok(RenderOutput {
                html: "<html><title>Challenge</title></html>".to_string(),
                title: Some("Challenge".to_string()),
                cookies: vec![RenderedCookie::new("cf_clearance", "ok")],
                local_storage: [("seen".to_string(), "1".to_string())].into_iter().collect(),
            })
        }
    }

    struct TokenSolver(Result<Option<String>, ()>);

    #[async_trait]
    impl ChallengeSolver for TokenSolver {
        async fn solve(&self, _: &str, _: Option<&str>) -> Result<Option<String>, SolveError> {
            self.0
                .clone()
                .map_err(|_| SolveError::Backend("quota exhausted".to_string()))
        }
    }

    fn stub_renderer(fail: bool) -> Arc<StubRenderer> {
        Arc::new(StubRenderer {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    async fn server_with_status(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(status).set_body_string("denied"))
            .mount(&server)
            .await;
        server
    }

    fn fetcher(url: &str) -> Arc<FetchEngine> {
        let mut config = Config::with_targets(vec![url.to_string()]);
        config.obey_robots_txt = false;
        config.requests_per_second = 1000.0;
        config.jitter_min_seconds = 0.0;
        config.jitter_max_seconds = 0.0;
        Arc::new(
            FetchEngine::new(
                &config,
                Arc::new(SessionStore::default()),
                Arc::new(ProxyPool::new(vec![])),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_forbidden_renders_and_attempts_captcha() {
        let server = server_with_status(403).await;
        let url = format!("{}/", server.uri());
        let renderer = stub_renderer(false);
        let fetcher = fetcher(&url);
        let orchestrator = EscalationOrchestrator::new(
            fetcher.clone(),
            Some(renderer.clone()),
            Arc::new(ManualChallengeSolver),
            true,
        );

        let result = orchestrator.scan(&url).await;

        assert_eq!(result.status_code, Some(403));
        assert!(result.errors.is_empty());
        assert_eq!(result.metadata_str(META_BROWSER_TITLE), Some("Challenge"));
        assert_eq!(result.metadata_u64(META_RENDERED_HTML_LENGTH), Some(37));
        assert_eq!(result.metadata_bool(META_CAPTCHA_TOKEN_RECEIVED), Some(false));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

        let session = fetcher.session().snapshot().await;
        assert_eq!(session.cookie("cf_clearance"), Some("ok"));
        assert_eq!(session.local_storage["seen"], "1");
    }

    #[tokio::test]
    async fn test_unauthorized_renders_without_captcha() {
        let server = server_with_status(401).await;
        let url = format!("{}/", server.uri());
        let renderer = stub_renderer(false);
        let orchestrator = EscalationOrchestrator::new(
            fetcher(&url),
            Some(renderer.clone()),
            Arc::new(TokenSolver(Ok(Some("tok".to_string())))),
            true,
        );

        let result = orchestrator.scan(&url).await;

        assert!(result.metadata.contains_key(META_BROWSER_TITLE));
        assert!(!result.metadata.contains_key(META_CAPTCHA_TOKEN_RECEIVED));
    }

    #[tokio::test]
    async fn test_captcha_runs_even_without_browser_fallback() {
        let server = server_with_status(403).await;
        let url = format!("{}/", server.uri());
        let renderer = stub_renderer(false);
        let orchestrator = EscalationOrchestrator::new(
            fetcher(&url),
            Some(renderer.clone()),
            Arc::new(TokenSolver(Ok(Some("tok".to_string())))),
            false,
        );

        let result = orchestrator.scan(&url).await;

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert!(!result.metadata.contains_key(META_BROWSER_TITLE));
        assert_eq!(result.metadata_bool(META_CAPTCHA_TOKEN_RECEIVED), Some(true));
    }

    #[tokio::test]
    async fn test_ok_status_is_not_escalated() {
        let server = server_with_status(200).await;
        let url = format!("{}/", server.uri());
        let renderer = stub_renderer(false);
        let orchestrator = EscalationOrchestrator::new(
            fetcher(&url),
            Some(renderer.clone()),
            Arc::new(ManualChallengeSolver),
            true,
        );

        let result = orchestrator.scan(&url).await;

        assert_eq!(result.status_code, Some(200));
        assert!(result.metadata.is_empty());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_collaborator_failures_are_recorded() {
        let server = server_with_status(403).await;
        let url = format!("{}/", server.uri());
        let orchestrator = EscalationOrchestrator::new(
            fetcher(&url),
            Some(stub_renderer(true)),
            Arc::new(TokenSolver(Err(()))),
            true,
        );

        let result = orchestrator.scan(&url).await;

        assert!(result.errors.is_empty());
        assert_eq!(
            result.metadata_str(META_BROWSER_ERROR),
            Some("navigation failed: net::ERR_ABORTED")
        );
        assert!(!result.metadata.contains_key(META_BROWSER_TITLE));
        assert_eq!(result.metadata_bool(META_CAPTCHA_TOKEN_RECEIVED), Some(false));
        assert_eq!(
            result.metadata_str(META_CAPTCHA_ERROR),
            Some("solver backend error: quota exhausted")
        );
    }

    #[tokio::test]
    async fn test_missing_renderer_is_recorded() {
        let server = server_with_status(401).await;
        let url = format!("{}/", server.uri());
        let orchestrator =
            EscalationOrchestrator::new(fetcher(&url), None, Arc::new(ManualChallengeSolver), true);

        let result = orchestrator.scan(&url).await;
        assert_eq!(
            result.metadata_str(META_BROWSER_ERROR),
            Some("no renderer configured")
        );
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_not_received() {
        let server = server_with_status(403).await;
        let url = format!("{}/", server.uri());
        let orchestrator = EscalationOrchestrator::new(
            fetcher(&url),
            None,
            Arc::new(TokenSolver(Ok(Some(String::new())))),
            false,
        );

        let result = orchestrator.scan(&url).await;
        assert_eq!(result.metadata_bool(META_CAPTCHA_TOKEN_RECEIVED), Some(false));
    }
}
