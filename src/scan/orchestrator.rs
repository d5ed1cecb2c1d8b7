//! Scan orchestrator - run-level coordination
//!
//! Owns everything that lives for exactly one run: the session store, the
//! proxy pool, the collaborators and the cancellation token. `run` fans every
//! target out into its own task and collects the results back in input order.

use crate::config::{duration_from_secs, validate, Config};
use crate::escalation::{ChallengeSolver, EscalationOrchestrator, ManualChallengeSolver, Renderer};
use crate::fetch::{FetchEngine, Sleeper};
use crate::proxy::ProxyPool;
use crate::scan::ScanResult;
use crate::session::SessionStore;
use crate::ScanError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Error recorded when a target task panicked or was aborted
pub const TASK_ABORTED_ERROR: &str = "Scan task aborted";

/// Main scan orchestration structure
pub struct ScanOrchestrator {
    config: Config,
    session: Arc<SessionStore>,
    proxies: Arc<ProxyPool>,
    renderer: Option<Arc<dyn Renderer>>,
    solver: Arc<dyn ChallengeSolver>,
    sleeper: Option<Arc<dyn Sleeper>>,
    cancel: CancellationToken,
}

impl ScanOrchestrator {
    /// Creates an orchestrator for a configuration
    ///
    /// The session starts out empty apart from the configured auth token, and
    /// the challenge solver defaults to `ManualChallengeSolver`. No renderer
    /// is attached until `with_renderer` is called.
    pub fn new(config: Config) -> Self {
        let session = Arc::new(SessionStore::with_auth_token(config.auth_token.clone()));
        let proxies = Arc::new(ProxyPool::new(config.proxies.clone()));

        Self {
            config,
            session,
            proxies,
            renderer: None,
            solver: Arc::new(ManualChallengeSolver),
            sleeper: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_challenge_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replaces the sleeper used for jitter and backoff delays
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Token that stops the run when cancelled
    ///
    /// Targets still in flight finish with a cancellation error.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn proxies(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    /// Scans every configured target
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ScanResult>)` - One result per target, in target order
    /// * `Err(ScanError)` - The disclaimer is unacknowledged or the
    ///   configuration is invalid; no request was made
    pub async fn run(&self) -> Result<Vec<ScanResult>, ScanError> {
        if !self.config.disclaimer_acknowledged {
            return Err(ScanError::DisclaimerNotAcknowledged);
        }
        validate(&self.config)?;

        let mut engine =
            FetchEngine::new(&self.config, self.session.clone(), self.proxies.clone())?;
        if let Some(sleeper) = &self.sleeper {
            engine = engine.with_sleeper(sleeper.clone());
        }
        let escalation = Arc::new(EscalationOrchestrator::new(
            Arc::new(engine),
            self.renderer.clone(),
            self.solver.clone(),
            self.config.use_browser_fallback,
        ));

        let token = self.cancel.child_token();
        let deadline = self
            .config
            .run_timeout_seconds
            .map(|secs| spawn_deadline(duration_from_secs(secs), token.clone()));

        let targets = &self.config.targets;
        let started = Instant::now();
        tracing::info!(
            targets = targets.len(),
            concurrency = self.config.concurrency,
            proxies = self.proxies.len(),
            "scan_started"
        );

        let mut tasks = JoinSet::new();
        for (index, url) in targets.iter().enumerate() {
            let escalation = escalation.clone();
            let token = token.clone();
            let url = url.clone();

            tasks.spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => ScanResult::cancelled(&url),
                    result = escalation.scan(&url) => result,
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<ScanResult>> = vec![None; targets.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "scan task failed"),
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let results: Vec<ScanResult> = slots
            .into_iter()
            .zip(targets)
            .map(|(slot, url)| slot.unwrap_or_else(|| ScanResult::failed(url, TASK_ABORTED_ERROR)))
            .collect();

        tracing::info!(
            targets = results.len(),
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            cancelled = token.is_cancelled(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "scan_finished"
        );

        Ok(results)
    }
}

/// Cancels `token` once `after` has elapsed, unless it is cancelled first
fn spawn_deadline(after: Duration, token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                tracing::warn!(timeout_secs = after.as_secs_f64(), "run deadline reached, cancelling");
                token.cancel();
            }
        }
    })
}

/// Runs a complete scan with default collaborators
///
/// This is the simplest entry point: it builds a `ScanOrchestrator` for the
/// configuration and runs it.
pub async fn run_scan(config: Config) -> Result<Vec<ScanResult>, ScanError> {
    ScanOrchestrator::new(config).run().await
}
