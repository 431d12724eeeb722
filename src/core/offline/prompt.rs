//! Deferred install prompt.
//!
//! The install-eligibility event is captured instead of acted upon. The
//! dashboard shows an install control while a captured event is pending;
//! pressing it replays the prompt, and any answer hides the control for
//! good.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// No eligibility event yet.
    Idle,
    /// Event captured; install control visible.
    Deferred,
    /// Prompt on screen, waiting for an answer.
    Showing,
    /// User answered; control hidden.
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Accepted,
    Dismissed,
}

#[derive(Debug)]
pub struct InstallPrompt {
    state: PromptState,
}

impl Default for InstallPrompt {
    fn default() -> Self {
        Self {
            state: PromptState::Idle,
        }
    }
}

impl InstallPrompt {
    /// Intercept the eligibility event. Ignored once answered.
    pub fn capture(&mut self) {
        if self.state == PromptState::Idle {
            self.state = PromptState::Deferred;
        }
    }

    pub fn control_visible(&self) -> bool {
        matches!(self.state, PromptState::Deferred | PromptState::Showing)
    }

    pub fn is_showing(&self) -> bool {
        self.state == PromptState::Showing
    }

    /// Replay the deferred prompt. Returns false if nothing was captured.
    pub fn replay(&mut self) -> bool {
        if self.state != PromptState::Deferred {
            return false;
        }
        self.state = PromptState::Showing;
        true
    }

    /// Record the user's answer; the control is hidden either way.
    pub fn respond(&mut self, choice: PromptChoice) -> Option<PromptChoice> {
        if self.state != PromptState::Showing {
            return None;
        }
        tracing::info!(event = "install_prompt_answered", ?choice);
        self.state = PromptState::Hidden;
        Some(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_appears_only_after_capture() {
        let mut prompt = InstallPrompt::default();
        assert!(!prompt.control_visible());
        assert!(!prompt.replay());
        prompt.capture();
        assert!(prompt.control_visible());
    }

    #[test]
    fn hides_after_accept_and_after_decline() {
        for choice in [PromptChoice::Accepted, PromptChoice::Dismissed] {
            let mut prompt = InstallPrompt::default();
            prompt.capture();
            assert!(prompt.replay());
            assert!(prompt.is_showing());
            assert_eq!(prompt.respond(choice), Some(choice));
            assert!(!prompt.control_visible());
            assert_eq!(prompt.state, PromptState::Hidden);
        }
    }

    #[test]
    fn answered_prompt_cannot_be_recaptured() {
        let mut prompt = InstallPrompt::default();
        prompt.capture();
        prompt.replay();
        prompt.respond(PromptChoice::Dismissed);
        prompt.capture();
        assert!(!prompt.control_visible());
        assert!(!prompt.replay());
    }

    #[test]
    fn respond_without_replay_is_ignored() {
        let mut prompt = InstallPrompt::default();
        prompt.capture();
        assert_eq!(prompt.respond(PromptChoice::Accepted), None);
        assert!(prompt.control_visible());
    }
}
