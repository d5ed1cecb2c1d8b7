//! Integration tests for the scanner
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! scans end-to-end through the public API.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_sentinel::config::{load_config, Config};
use sumi_sentinel::escalation::{
    ChallengeSolver, RenderError, RenderOutput, RenderedCookie, Renderer, SolveError,
};
use sumi_sentinel::fetch::FetchEngine;
use sumi_sentinel::proxy::ProxyPool;
use sumi_sentinel::scan::{run_scan, ScanOrchestrator, CANCELLED_ERROR, ROBOTS_BLOCKED_ERROR};
use sumi_sentinel::{ScanError, SessionStore};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration that scans quickly against a local server
fn create_test_config(targets: Vec<String>) -> Config {
    let mut config = Config::with_targets(targets);
    config.disclaimer_acknowledged = true;
    config.obey_robots_txt = false;
    config.requests_per_second = 1000.0;
    config.timeout_seconds = 5.0;
    config.jitter_min_seconds = 0.0;
    config.jitter_max_seconds = 0.0;
    config
}

struct FixedRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for FixedRenderer {
    async fn render(&self, _url: &str) -> Result<RenderOutput, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RenderOutput {
            html: "<html><head><title>Just a moment</title></head></html>".to_string(),
            title: Some("Just a moment".to_string()),
            cookies: vec![RenderedCookie::new("clearance", "granted")],
            local_storage: Default::default(),
        })
    }
}

struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _url: &str) -> Result<RenderOutput, RenderError> {
        Err(RenderError::Launch("chromium not found".to_string()))
    }
}

struct TokenSolver;

#[async_trait]
impl ChallengeSolver for TokenSolver {
    async fn solve(&self, _: &str, _: Option<&str>) -> Result<Option<String>, SolveError> {
        Ok(Some("token-123".to_string()))
    }
}

#[tokio::test]
async fn test_results_follow_target_order() {
    let mock_server = MockServer::start().await;

    // Earlier targets answer later, so completion order is reversed
    for (route, status, delay_ms) in [("/slow", 200, 400), ("/medium", 201, 200), ("/fast", 202, 0)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status).set_delay(Duration::from_millis(delay_ms)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let targets: Vec<String> = ["/slow", "/medium", "/fast"]
        .iter()
        .map(|route| format!("{}{}", mock_server.uri(), route))
        .collect();
    let mut config = create_test_config(targets.clone());
    config.concurrency = 3;

    let results = run_scan(config).await.expect("scan should complete");

    assert_eq!(results.len(), 3);
    let urls: Vec<_> = results.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, targets);
    let statuses: Vec<_> = results.iter().map(|r| r.status_code).collect();
    assert_eq!(statuses, vec![Some(200), Some(201), Some(202)]);
    assert!(results.iter().all(|r| r.errors.is_empty()));
}

#[tokio::test]
async fn test_robots_disallowed_target_is_never_fetched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![
        format!("{}/private", mock_server.uri()),
        format!("{}/public", mock_server.uri()),
    ]);
    config.obey_robots_txt = true;

    let results = run_scan(config).await.expect("scan should complete");

    assert_eq!(results[0].errors, vec![ROBOTS_BLOCKED_ERROR.to_string()]);
    assert_eq!(results[0].status_code, None);
    assert_eq!(results[1].status_code, Some(200));
    assert_eq!(results[1].content_length, Some(5));
}

#[tokio::test]
async fn test_cookies_carry_over_to_later_fetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "session=abc123; Path=/"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let login = format!("{}/login", mock_server.uri());
    let dashboard = format!("{}/dashboard", mock_server.uri());
    let config = create_test_config(vec![login.clone(), dashboard.clone()]);

    let session = Arc::new(SessionStore::default());
    let engine = FetchEngine::new(&config, session.clone(), Arc::new(ProxyPool::new(vec![])))
        .expect("engine should build");

    let first = engine.fetch(&login).await;
    assert_eq!(first.status_code, Some(200));
    assert_eq!(
        session.cookie_header().await,
        Some("session=abc123".to_string())
    );

    // Without the cookie this request would fall through to wiremock's 404
    let second = engine.fetch(&dashboard).await;
    assert_eq!(second.status_code, Some(200));
}

#[tokio::test]
async fn test_forbidden_target_escalates_to_renderer_and_solver() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Access denied"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/guarded", mock_server.uri());
    let renderer = Arc::new(FixedRenderer {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = ScanOrchestrator::new(create_test_config(vec![url.clone()]))
        .with_renderer(renderer.clone())
        .with_challenge_solver(Arc::new(TokenSolver));

    let results = orchestrator.run().await.expect("scan should complete");
    let result = &results[0];

    assert_eq!(result.status_code, Some(403));
    assert!(result.errors.is_empty());
    assert_eq!(result.metadata_str("browser_title"), Some("Just a moment"));
    assert_eq!(result.metadata_u64("rendered_html_length"), Some(54));
    assert_eq!(result.metadata_bool("captcha_token_received"), Some(true));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let session = orchestrator.session().snapshot().await;
    assert_eq!(session.cookie("clearance"), Some("granted"));
}

#[tokio::test]
async fn test_renderer_failure_is_recorded_not_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let url = format!("{}/account", mock_server.uri());
    let orchestrator = ScanOrchestrator::new(create_test_config(vec![url]))
        .with_renderer(Arc::new(FailingRenderer));

    let results = orchestrator.run().await.expect("scan should complete");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status_code, Some(401));
    assert!(results[0].errors.is_empty());
    assert_eq!(
        results[0].metadata_str("browser_error"),
        Some("browser launch failed: chromium not found")
    );
    assert!(!results[0].metadata.contains_key("captcha_token_received"));
}

#[tokio::test]
async fn test_unacknowledged_disclaimer_makes_no_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("scan.toml");
    std::fs::write(
        &config_path,
        format!(
            "targets = [\"{}/\"]\nobey_robots_txt = true\n",
            mock_server.uri()
        ),
    )
    .expect("Failed to write config");

    let config = load_config(&config_path).expect("config should load");
    assert!(!config.disclaimer_acknowledged);

    let err = run_scan(config).await.unwrap_err();
    assert!(matches!(err, ScanError::DisclaimerNotAcknowledged));
}

#[tokio::test]
async fn test_run_deadline_cancels_slow_targets() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quick"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/stuck"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![
        format!("{}/quick", mock_server.uri()),
        format!("{}/stuck", mock_server.uri()),
    ]);
    config.run_timeout_seconds = Some(0.5);

    let results = run_scan(config).await.expect("scan should complete");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status_code, Some(200));
    assert!(results[0].errors.is_empty());
    assert_eq!(results[1].errors, vec![CANCELLED_ERROR.to_string()]);
    assert_eq!(results[1].status_code, None);
}

#[tokio::test]
async fn test_server_errors_are_results_not_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    let results = run_scan(config).await.expect("scan should complete");

    assert_eq!(results[0].status_code, Some(503));
    assert!(results[0].errors.is_empty());
    assert!(results[0].metadata.is_empty());
}

#[tokio::test]
async fn test_configured_headers_and_auth_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("x-audit-run", "42"))
        .and(header("user-agent", "AuditBot/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())]);
    config.auth_token = Some("s3cret".to_string());
    config.user_agents = vec!["AuditBot/1.0".to_string()];
    config
        .headers
        .insert("X-Audit-Run".to_string(), "42".to_string());

    let results = run_scan(config).await.expect("scan should complete");
    assert_eq!(results[0].status_code, Some(200));
}

#[tokio::test]
async fn test_concurrency_limit_bounds_in_flight_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(6)
        .mount(&mock_server)
        .await;

    let targets: Vec<String> = (0..6)
        .map(|i| format!("{}/page{}", mock_server.uri(), i))
        .collect();
    let mut config = create_test_config(targets);
    config.concurrency = 2;

    let started = Instant::now();
    let results = run_scan(config).await.expect("scan should complete");
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.status_code == Some(200)));

    // Two slots over six 300ms responses means three sequential waves
    assert!(
        elapsed >= Duration::from_millis(850),
        "finished in {:?}, more than 2 requests ran at once",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(1700),
        "finished in {:?}, requests did not run in parallel",
        elapsed
    );
}

#[tokio::test]
async fn test_engine_rotates_proxy_on_forbidden_response() {
    // Each mock server plays an HTTP proxy for a plain-http target
    let blocked_proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&blocked_proxy)
        .await;

    let open_proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&open_proxy)
        .await;

    let target = "http://scan-target.invalid/page".to_string();
    let mut config = create_test_config(vec![target.clone()]);
    config.proxies = vec![blocked_proxy.uri(), open_proxy.uri()];

    let engine = FetchEngine::new(
        &config,
        Arc::new(SessionStore::default()),
        Arc::new(ProxyPool::new(config.proxies.clone())),
    )
    .expect("engine should build");

    let first = engine.fetch(&target).await;
    assert_eq!(first.status_code, Some(403));
    assert_eq!(engine.proxies().current(), Some(open_proxy.uri()));

    let second = engine.fetch(&target).await;
    assert_eq!(second.status_code, Some(200));
    assert_eq!(engine.proxies().current(), Some(open_proxy.uri()));
}

#[tokio::test]
async fn test_engine_keeps_proxy_on_success() {
    let proxy_a = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&proxy_a)
        .await;

    let proxy_b = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&proxy_b)
        .await;

    let target = "http://scan-target.invalid/".to_string();
    let mut config = create_test_config(vec![target.clone()]);
    config.proxies = vec![proxy_a.uri(), proxy_b.uri()];

    let engine = FetchEngine::new(
        &config,
        Arc::new(SessionStore::default()),
        Arc::new(ProxyPool::new(config.proxies.clone())),
    )
    .expect("engine should build");

    for _ in 0..2 {
        let result = engine.fetch(&target).await;
        assert_eq!(result.status_code, Some(200));
        assert_eq!(engine.proxies().current(), Some(proxy_a.uri()));
    }
}
