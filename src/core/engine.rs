//! ChatEngine: ties the session manager and the connection controller to
//! the transport.
//!
//! The UI calls one method per user action or transport event and gets
//! back a list of [`UiEffect`]s to apply. Transport commands produced by
//! the controller are issued here; the UI never talks to the transport.

use crate::core::error::ChatError;
use crate::core::identity::Identity;
use crate::core::lifecycle::{ConnState, Controller, Effect, Input, Message, Notice};
use crate::core::session::{PeerSession, RegistrationResult};
use crate::core::transport::{CloseReason, Transport, TransportEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── UI Effects ───────────────────────────────────────────────────────────────

/// What the UI must change after an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    /// Login accepted for registration; show "Connecting...".
    Registering,
    /// Registration refused or failed; stay on the login screen.
    LoginFailed(ChatError),
    /// Session established; switch to the dashboard.
    Dashboard { identity: Identity },
    ChatOpened { partner: String },
    Append(Message),
    ChatReset,
    Notify(Notice),
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct ChatEngine {
    transport: Arc<dyn Transport>,
    session: PeerSession,
    controller: Option<Controller>,
}

impl ChatEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            session: PeerSession::new(),
            controller: None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.context().map(|ctx| &ctx.identity)
    }

    pub fn conn_state(&self) -> &ConnState {
        self.controller
            .as_ref()
            .map(Controller::state)
            .unwrap_or(&ConnState::Idle)
    }

    pub fn login(&mut self, raw: &str) -> Vec<UiEffect> {
        match self.session.register(raw, self.transport.as_ref()) {
            Ok(Some(_)) => vec![UiEffect::Registering],
            Ok(None) => vec![],
            Err(e) => vec![UiEffect::LoginFailed(e)],
        }
    }

    pub fn dial(&mut self, target: &str) -> Vec<UiEffect> {
        let Some(ctl) = self.controller.as_mut() else {
            return vec![];
        };
        let effects = ctl.dial(target);
        self.execute(effects)
    }

    pub fn send(&mut self, text: &str) -> Vec<UiEffect> {
        let Some(ctl) = self.controller.as_mut() else {
            return vec![];
        };
        let effects = ctl.send(text);
        self.execute(effects)
    }

    pub fn close(&mut self) -> Vec<UiEffect> {
        let Some(ctl) = self.controller.as_mut() else {
            return vec![];
        };
        let effects = ctl.close();
        self.execute(effects)
    }

    /// Process one event from the transport, in arrival order.
    pub fn handle_event(&mut self, event: TransportEvent) -> Vec<UiEffect> {
        if let Some(result) = self.session.resolve(&event) {
            return self.on_registration(result);
        }

        match event {
            TransportEvent::Offer { id, from } => match self.controller.as_mut() {
                Some(ctl) => {
                    info!(event = "offer_received", id = %id, from = %from, "Inbound chat offer");
                    let effects = ctl.handle(Input::Offer { id, from });
                    self.execute(effects)
                }
                None => {
                    warn!(event = "offer_before_session", id = %id, "Offer without a session");
                    self.transport.close(id, CloseReason::Hangup);
                    vec![]
                }
            },
            TransportEvent::Link { id, signal } => match self.controller.as_mut() {
                Some(ctl) => {
                    let effects = ctl.handle(Input::Link { id, signal });
                    self.execute(effects)
                }
                None => vec![],
            },
            TransportEvent::Error(kind) => {
                warn!(event = "session_error", error = %kind, "Transport error");
                vec![UiEffect::Notify(Notice::Failed(ChatError::Transport(
                    kind.to_string(),
                )))]
            }
            TransportEvent::Registered { .. } | TransportEvent::RegistrationFailed(_) => {
                debug!(event = "registration_event_ignored", "No registration in flight");
                vec![]
            }
        }
    }

    fn on_registration(&mut self, result: RegistrationResult) -> Vec<UiEffect> {
        match result {
            RegistrationResult::Registered(ctx) => {
                let identity = ctx.identity.clone();
                self.controller = Some(Controller::new(ctx.identity));
                vec![UiEffect::Dashboard { identity }]
            }
            failed => match failed.error() {
                Some(e) => vec![UiEffect::LoginFailed(e)],
                None => vec![],
            },
        }
    }

    /// Issue transport commands and pass UI effects through.
    fn execute(&self, effects: Vec<Effect>) -> Vec<UiEffect> {
        let mut ui = Vec::new();
        for effect in effects {
            match effect {
                Effect::Dial { id, remote } => self.transport.dial(id, remote),
                Effect::Accept { id } => self.transport.accept(id),
                Effect::Hangup { id, reason } => self.transport.close(id, reason),
                Effect::Transmit { id, payload } => self.transport.send(id, payload),
                Effect::ChatOpened { partner } => ui.push(UiEffect::ChatOpened { partner }),
                Effect::Append(msg) => ui.push(UiEffect::Append(msg)),
                Effect::ChatReset => ui.push(UiEffect::ChatReset),
                Effect::Notify(notice) => ui.push(UiEffect::Notify(notice)),
            }
        }
        ui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::MessageDirection;
    use crate::core::transport::recording::{Command, RecordingTransport};
    use crate::core::transport::{ConnectionId, LinkSignal, TransportError};
    use serde_json::json;

    fn engine() -> (ChatEngine, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        (ChatEngine::new(transport.clone()), transport)
    }

    fn logged_in(raw: &str) -> (ChatEngine, Arc<RecordingTransport>) {
        let (mut engine, transport) = engine();
        engine.login(raw);
        let name = format!("stranger_{}", crate::core::identity::sanitize(raw));
        engine.handle_event(TransportEvent::Registered { name });
        transport.take();
        (engine, transport)
    }

    #[test]
    fn login_success_shows_dashboard() {
        let (mut engine, transport) = engine();
        assert_eq!(engine.login("abc123!!"), vec![UiEffect::Registering]);
        assert_eq!(
            transport.take(),
            vec![Command::Register("stranger_abc123".into())]
        );

        let effects = engine.handle_event(TransportEvent::Registered {
            name: "stranger_abc123".into(),
        });
        assert_eq!(
            effects,
            vec![UiEffect::Dashboard {
                identity: Identity::parse("abc123").unwrap()
            }]
        );
        assert_eq!(engine.identity().map(Identity::as_str), Some("abc123"));
    }

    #[test]
    fn short_login_is_rejected_locally() {
        let (mut engine, transport) = engine();
        assert_eq!(
            engine.login("ab"),
            vec![UiEffect::LoginFailed(ChatError::InvalidIdentity)]
        );
        assert!(transport.take().is_empty());
        assert!(engine.identity().is_none());
    }

    #[test]
    fn duplicate_login_stays_on_login() {
        let (mut engine, _) = engine();
        engine.login("abc123");
        let effects = engine.handle_event(TransportEvent::RegistrationFailed(
            TransportError::UnavailableId,
        ));
        assert_eq!(
            effects,
            vec![UiEffect::LoginFailed(ChatError::DuplicateIdentity)]
        );
        assert!(engine.identity().is_none());
    }

    #[test]
    fn dial_issues_transport_command() {
        let (mut engine, transport) = logged_in("alice1");
        let effects = engine.dial("bob42");
        assert_eq!(
            effects,
            vec![UiEffect::Notify(Notice::Calling("bob42".into()))]
        );
        assert!(matches!(
            transport.take().as_slice(),
            [Command::Dial(_, remote)] if remote == "stranger_bob42"
        ));
    }

    #[test]
    fn inbound_chat_round_trip() {
        let (mut engine, transport) = logged_in("alice1");
        let id = ConnectionId::new();

        engine.handle_event(TransportEvent::Offer {
            id,
            from: "stranger_bob42".into(),
        });
        assert_eq!(transport.take(), vec![Command::Accept(id)]);

        let opened = engine.handle_event(TransportEvent::Link {
            id,
            signal: LinkSignal::Opened,
        });
        assert_eq!(
            opened,
            vec![
                UiEffect::ChatOpened {
                    partner: "bob42".into()
                },
                UiEffect::Notify(Notice::Connected),
            ]
        );

        engine.send("hi bob");
        assert_eq!(
            transport.take(),
            vec![Command::Send(
                id,
                json!({ "type": "msg", "content": "hi bob" })
            )]
        );

        let received = engine.handle_event(TransportEvent::Link {
            id,
            signal: LinkSignal::Data(json!({ "type": "msg", "content": "hi alice" })),
        });
        assert_eq!(
            received,
            vec![UiEffect::Append(Message {
                direction: MessageDirection::Received,
                text: "hi alice".into()
            })]
        );

        let closed = engine.handle_event(TransportEvent::Link {
            id,
            signal: LinkSignal::Closed(CloseReason::Hangup),
        });
        assert_eq!(
            closed,
            vec![UiEffect::ChatReset, UiEffect::Notify(Notice::CallEnded)]
        );
        assert_eq!(engine.conn_state(), &ConnState::Idle);
    }

    #[test]
    fn second_offer_while_open_is_refused_busy() {
        let (mut engine, transport) = logged_in("alice1");
        let a = ConnectionId::new();
        engine.handle_event(TransportEvent::Offer {
            id: a,
            from: "stranger_bob42".into(),
        });
        engine.handle_event(TransportEvent::Link {
            id: a,
            signal: LinkSignal::Opened,
        });
        transport.take();

        let b = ConnectionId::new();
        engine.handle_event(TransportEvent::Offer {
            id: b,
            from: "stranger_carol".into(),
        });
        assert_eq!(transport.take(), vec![Command::Close(b, CloseReason::Busy)]);
        assert!(engine.conn_state().is_open());
        assert_eq!(engine.conn_state().partner(), Some("bob42"));
    }

    #[test]
    fn actions_before_login_do_nothing() {
        let (mut engine, transport) = engine();
        assert!(engine.dial("bob42").is_empty());
        assert!(engine.send("hello").is_empty());
        assert!(engine.close().is_empty());
        assert!(transport.take().is_empty());
    }

    #[test]
    fn session_errors_become_notices() {
        let (mut engine, _) = logged_in("alice1");
        let effects = engine.handle_event(TransportEvent::Error(TransportError::Network(
            "relay lost".into(),
        )));
        assert_eq!(
            effects,
            vec![UiEffect::Notify(Notice::Failed(ChatError::Transport(
                "network (relay lost)".into()
            )))]
        );
        assert!(engine.identity().is_some());
    }
}
