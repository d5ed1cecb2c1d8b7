/// Escalation stage definitions for a single target
///
/// A target always moves forward through `Fetched → Rendered →
/// CaptchaAttempted → Done`, skipping any optional stage that does not apply.
use std::fmt;

/// Where a target is in its escalation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EscalationStage {
    /// The plain HTTP fetch finished (successfully or not)
    Fetched,

    /// The rendering collaborator was invoked
    Rendered,

    /// The challenge-solving collaborator was invoked
    CaptchaAttempted,

    /// Terminal; the result is final
    Done,
}

impl EscalationStage {
    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Transitions only go forward; optional stages may be skipped.
    pub fn can_transition_to(&self, next: EscalationStage) -> bool {
        next > *self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Rendered => "rendered",
            Self::CaptchaAttempted => "captcha_attempted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for EscalationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if a fetch status should be escalated to the renderer
pub fn should_render(status_code: Option<u16>, browser_fallback: bool) -> bool {
    browser_fallback && matches!(status_code, Some(401) | Some(403))
}

/// Returns true if a fetch status should be escalated to the challenge solver
pub fn should_solve_challenge(status_code: Option<u16>) -> bool {
    status_code == Some(403)
}
