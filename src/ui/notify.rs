//! Toasts: the one-line notices shown in the status bar.
//!
//! A toast replaces whatever toast was showing and disappears after
//! [`TOAST_TTL`]. With no live toast the status bar shows key help instead.
//! Details worth keeping go to `tracing`, not here.

use crate::core::config::TOAST_TTL;
use crate::core::lifecycle::Notice;
use ratatui::style::Color;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn color(self) -> Color {
        match self {
            NotifyLevel::Info => Color::Cyan,
            NotifyLevel::Success => Color::Green,
            NotifyLevel::Warning => Color::Yellow,
            NotifyLevel::Error => Color::Red,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            NotifyLevel::Info => "(i)",
            NotifyLevel::Success => "(ok)",
            NotifyLevel::Warning => "(x)",
            NotifyLevel::Error => "(!)",
        }
    }
}

impl From<&Notice> for NotifyLevel {
    fn from(notice: &Notice) -> Self {
        match notice {
            Notice::Calling(_) | Notice::MissedCall(_) => NotifyLevel::Info,
            Notice::Connected => NotifyLevel::Success,
            Notice::CallEnded | Notice::PeerBusy => NotifyLevel::Warning,
            Notice::Failed(_) => NotifyLevel::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
    shown_at: Instant,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_TTL
    }
}

/// Holds at most one toast; the newest wins.
#[derive(Debug, Default)]
pub struct NotifyManager {
    current: Option<Notification>,
}

impl NotifyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, level: NotifyLevel, message: impl Into<String>) {
        self.current = Some(Notification {
            level,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(NotifyLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(NotifyLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(NotifyLevel::Error, message);
    }

    /// Toast a connection notice with its own text and level.
    pub fn notice(&mut self, notice: &Notice) {
        self.show(notice.into(), notice.to_string());
    }

    /// The live toast, if one is showing and not yet expired.
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref().filter(|n| !n.is_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ChatError;
    use std::time::Duration;

    #[test]
    fn newest_toast_replaces_the_old_one() {
        let mut toasts = NotifyManager::new();
        assert!(toasts.current().is_none());

        toasts.info("Calling bob42...");
        toasts.error("Invalid Phone Number");
        let shown = toasts.current().unwrap();
        assert_eq!(shown.level, NotifyLevel::Error);
        assert_eq!(shown.message, "Invalid Phone Number");
    }

    #[test]
    fn toast_expires_after_ttl() {
        let mut toasts = NotifyManager::new();
        toasts.success("Saved Bob");
        if let Some(n) = toasts.current.as_mut() {
            n.shown_at = Instant::now() - TOAST_TTL - Duration::from_millis(1);
        }
        assert!(toasts.current().is_none());
    }

    #[test]
    fn notices_pick_their_level() {
        let mut toasts = NotifyManager::new();
        toasts.notice(&Notice::Connected);
        assert_eq!(toasts.current().unwrap().level, NotifyLevel::Success);
        assert_eq!(toasts.current().unwrap().message, "Connected!");

        toasts.notice(&Notice::MissedCall("carol".into()));
        assert_eq!(toasts.current().unwrap().level, NotifyLevel::Info);
        assert_eq!(toasts.current().unwrap().message, "Missed call from carol");

        toasts.notice(&Notice::PeerBusy);
        assert_eq!(toasts.current().unwrap().level, NotifyLevel::Warning);

        toasts.notice(&Notice::Failed(ChatError::Busy));
        assert_eq!(toasts.current().unwrap().level, NotifyLevel::Error);
    }
}
