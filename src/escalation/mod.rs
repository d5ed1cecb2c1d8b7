//! Escalation module
//!
//! Decides what happens to a target after its plain fetch:
//! - 401/403 with browser fallback enabled goes to a `Renderer`
//! - 403 goes to a `ChallengeSolver`
//! - anything else is final as fetched

#[cfg(feature = "browser")]
mod chromium;
mod orchestrator;
mod render;
mod solver;
mod stage;

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;
pub use orchestrator::{
    EscalationOrchestrator, META_BROWSER_ERROR, META_BROWSER_TITLE, META_CAPTCHA_ERROR,
    META_CAPTCHA_TOKEN_RECEIVED, META_RENDERED_HTML_LENGTH,
};
pub use render::{RenderError, RenderOutput, RenderedCookie, Renderer};
pub use solver::{ChallengeSolver, ManualChallengeSolver, SolveError};
pub use stage::{should_render, should_solve_challenge, EscalationStage};
