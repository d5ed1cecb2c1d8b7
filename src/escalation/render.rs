//! Rendering collaborator interface
//!
//! A renderer loads a page in a real browser context. Implementations are
//! expected to seed the context from the session store before navigating and
//! to report the cookies and local storage they end up with; the escalation
//! orchestrator merges those back into the session.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by a rendering collaborator
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("render failed: {0}")]
    Other(String),
}

/// A cookie observed in the rendered browser context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl RenderedCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }
}

/// Captured state of a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    /// Final DOM serialized as HTML
    pub html: String,
    pub title: Option<String>,
    pub cookies: Vec<RenderedCookie>,
    pub local_storage: BTreeMap<String, String>,
}

impl RenderOutput {
    /// Length of the rendered markup in characters
    pub fn html_length(&self) -> u64 {
        self.html.chars().count() as u64
    }
}

/// Loads a URL in a browser and captures the resulting page state
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderOutput, RenderError>;
}
