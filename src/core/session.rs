//! Peer session manager: owns the single identity registration.
//!
//! Login validates the raw identifier and asks the transport to register
//! its namespaced form. The transport answers later with a registration
//! event, which [`PeerSession::resolve`] maps to a [`RegistrationResult`].

use crate::core::error::ChatError;
use crate::core::identity::Identity;
use crate::core::transport::{Transport, TransportError, TransportEvent};
use tracing::{info, warn};

/// Explicitly owned session data, built once registration succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub identity: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Registering(Identity),
    Registered(SessionContext),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationResult {
    Registered(SessionContext),
    /// Another session already holds the identifier.
    Duplicate,
    Failed(TransportError),
}

impl RegistrationResult {
    /// The error to surface for a failed registration, if any.
    pub fn error(&self) -> Option<ChatError> {
        match self {
            Self::Registered(_) => None,
            Self::Duplicate => Some(ChatError::DuplicateIdentity),
            Self::Failed(kind) => Some(ChatError::Transport(kind.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct PeerSession {
    state: SessionState,
}

impl Default for PeerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
        }
    }

    pub fn context(&self) -> Option<&SessionContext> {
        match &self.state {
            SessionState::Registered(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Validate `raw` and start registering it.
    ///
    /// Returns `Ok(None)` when a registration is already in flight or the
    /// session is established; the submission is ignored.
    pub fn register(
        &mut self,
        raw: &str,
        transport: &dyn Transport,
    ) -> Result<Option<Identity>, ChatError> {
        if !matches!(self.state, SessionState::LoggedOut) {
            return Ok(None);
        }

        let identity = Identity::parse(raw)?;
        info!(
            event = "registration_started",
            identity = %identity,
            "Registering identity"
        );
        transport.register(identity.namespaced());
        self.state = SessionState::Registering(identity.clone());
        Ok(Some(identity))
    }

    /// Map a registration event to its outcome. Other events, and
    /// registration events while not registering, yield `None`.
    pub fn resolve(&mut self, event: &TransportEvent) -> Option<RegistrationResult> {
        let SessionState::Registering(identity) = &self.state else {
            return None;
        };

        let result = match event {
            TransportEvent::Registered { name } if *name == identity.namespaced() => {
                let ctx = SessionContext {
                    identity: identity.clone(),
                };
                RegistrationResult::Registered(ctx)
            }
            TransportEvent::Registered { name } => {
                warn!(
                    event = "registration_name_mismatch",
                    expected = %identity.namespaced(),
                    got = %name,
                    "Transport confirmed a different name"
                );
                return None;
            }
            TransportEvent::RegistrationFailed(TransportError::UnavailableId) => {
                RegistrationResult::Duplicate
            }
            TransportEvent::RegistrationFailed(kind) => RegistrationResult::Failed(kind.clone()),
            _ => return None,
        };

        self.state = match &result {
            RegistrationResult::Registered(ctx) => {
                info!(event = "registered", identity = %ctx.identity, "Session established");
                SessionState::Registered(ctx.clone())
            }
            failed => {
                warn!(event = "registration_failed", outcome = ?failed, "Registration failed");
                SessionState::LoggedOut
            }
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::recording::{Command, RecordingTransport};

    #[test]
    fn register_sanitizes_and_namespaces() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();

        let id = session.register("abc123!!", &transport).unwrap().unwrap();
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(
            transport.take(),
            vec![Command::Register("stranger_abc123".into())]
        );
        assert!(matches!(session.state, SessionState::Registering(_)));
    }

    #[test]
    fn short_identifier_never_registers() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();

        assert_eq!(
            session.register("ab", &transport),
            Err(ChatError::InvalidIdentity)
        );
        assert!(transport.take().is_empty());
        assert_eq!(session.state, SessionState::LoggedOut);
    }

    #[test]
    fn submissions_while_registering_are_ignored() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();
        session.register("abc123", &transport).unwrap();
        transport.take();

        assert_eq!(session.register("other1", &transport), Ok(None));
        assert!(transport.take().is_empty());
    }

    #[test]
    fn success_establishes_context() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();
        session.register("abc123", &transport).unwrap();

        let result = session.resolve(&TransportEvent::Registered {
            name: "stranger_abc123".into(),
        });
        let expected = SessionContext {
            identity: Identity::parse("abc123").unwrap(),
        };
        assert_eq!(result, Some(RegistrationResult::Registered(expected.clone())));
        assert_eq!(session.context(), Some(&expected));
    }

    #[test]
    fn duplicate_returns_to_login() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();
        session.register("abc123", &transport).unwrap();

        let result = session
            .resolve(&TransportEvent::RegistrationFailed(
                TransportError::UnavailableId,
            ))
            .unwrap();
        assert_eq!(result, RegistrationResult::Duplicate);
        assert_eq!(result.error(), Some(ChatError::DuplicateIdentity));
        assert_eq!(session.state, SessionState::LoggedOut);

        // A fresh attempt is allowed afterwards.
        assert!(session.register("abc123", &transport).unwrap().is_some());
    }

    #[test]
    fn other_failures_map_to_connection_error() {
        let transport = RecordingTransport::default();
        let mut session = PeerSession::new();
        session.register("abc123", &transport).unwrap();

        let result = session
            .resolve(&TransportEvent::RegistrationFailed(TransportError::Network(
                "no relay".into(),
            )))
            .unwrap();
        assert_eq!(
            result.error().map(|e| e.to_string()),
            Some("Connection Error: network (no relay)".into())
        );
    }

    #[test]
    fn unrelated_events_are_not_registration_outcomes() {
        let mut session = PeerSession::new();
        assert_eq!(
            session.resolve(&TransportEvent::Registered {
                name: "stranger_abc123".into()
            }),
            None
        );
    }
}
