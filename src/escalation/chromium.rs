//! Headless Chromium renderer
//!
//! Only compiled with the `browser` feature. Each render launches a fresh
//! browser, seeds it from the session, navigates, and captures the final
//! page state before shutting the browser down.

use crate::escalation::render::{RenderError, RenderOutput, RenderedCookie, Renderer};
use crate::session::SessionStore;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

const CAPTURE_LOCAL_STORAGE: &str =
    "JSON.stringify(Object.fromEntries(Object.entries(window.localStorage)))";

pub struct ChromiumRenderer {
    session: Arc<SessionStore>,
    wait_selector: Option<String>,
    wait_timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(
        session: Arc<SessionStore>,
        wait_selector: Option<String>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            session,
            wait_selector,
            wait_timeout,
        }
    }

    async fn render_page(&self, page: &Page, url: &str) -> Result<RenderOutput, RenderError> {
        let state = self.session.snapshot().await;

        let cookies = state
            .cookies()
            .iter()
            .map(|(name, value)| {
                CookieParam::builder()
                    .name(name.clone())
                    .value(value.clone())
                    .url(url)
                    .build()
                    .map_err(RenderError::Other)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !cookies.is_empty() {
            page.set_cookies(cookies)
                .await
                .map_err(|e| RenderError::Other(e.to_string()))?;
        }

        if !state.local_storage.is_empty() {
            let script = local_storage_primer(&state.local_storage)?;
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
                .await
                .map_err(|e| RenderError::Other(e.to_string()))?;
        }

        page.goto(url)
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        if let Some(selector) = &self.wait_selector {
            self.wait_for_selector(page, selector).await?;
        }

        let local_storage = match page.evaluate(CAPTURE_LOCAL_STORAGE).await {
            Ok(value) => value
                .into_value::<String>()
                .ok()
                .and_then(|json| serde_json::from_str(&json).ok())
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(url, error = %e, "local storage unavailable");
                BTreeMap::new()
            }
        };

        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| RenderError::Other(e.to_string()))?
            .into_iter()
            .map(|c| RenderedCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
            })
            .collect();

        let html = page
            .content()
            .await
            .map_err(|e| RenderError::Other(e.to_string()))?;
        let title = page
            .get_title()
            .await
            .map_err(|e| RenderError::Other(e.to_string()))?;

        Ok(RenderOutput {
            html,
            title,
            cookies,
            local_storage,
        })
    }

    async fn wait_for_selector(&self, page: &Page, selector: &str) -> Result<(), RenderError> {
        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(self.wait_timeout, poll)
            .await
            .map_err(|_| RenderError::Timeout(format!("selector {}", selector)))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<RenderOutput, RenderError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .build()
            .map_err(RenderError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let output = match browser.new_page("about:blank").await {
            Ok(page) => self.render_page(&page, url).await,
            Err(e) => Err(RenderError::Other(e.to_string())),
        };

        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        handle.abort();

        output
    }
}

/// Builds a script that writes the given entries into `localStorage`
fn local_storage_primer(entries: &BTreeMap<String, String>) -> Result<String, RenderError> {
    let json = serde_json::to_string(entries).map_err(|e| RenderError::Other(e.to_string()))?;
    Ok(format!(
        "(() => {{ const entries = {}; for (const [k, v] of Object.entries(entries)) {{ try {{ window.localStorage.setItem(k, v); }} catch (e) {{}} }} }})();",
        json
    ))
}
