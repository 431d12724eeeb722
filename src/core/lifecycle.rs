//! Connection lifecycle: the single-chat state machine.
//!
//! Idle → Pending → Open → (closed) → Idle. The transition function is pure:
//! it takes the current [`ConnState`] and one [`Input`] and returns the next
//! state plus the [`Effect`]s the caller must carry out. Nothing here
//! touches the network or the screen.
//!
//! Invariants:
//! - At most one connection is Pending or Open at a time.
//! - Guard: while Open, any new dial or inbound offer is refused without
//!   touching the open connection. A dial is refused locally with `Busy`;
//!   an offer is closed with [`CloseReason::Busy`].
//! - While Pending, a new dial or offer supersedes the pending attempt,
//!   which is hung up.
//! - Link signals for any connection other than the current one are stale
//!   and ignored.
//! - `send` is dropped unless Open; `close` is a no-op when Idle.

use crate::core::envelope::Envelope;
use crate::core::error::{ChatError, ValidationError};
use crate::core::identity::{Identity, namespaced, sanitize, strip_namespace};
use crate::core::transport::{CloseReason, ConnectionId, LinkSignal};
use serde_json::Value;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    /// Dial sent or offer accepted; waiting for the channel to open.
    Pending {
        id: ConnectionId,
        remote: String,
        direction: Direction,
    },
    /// Messages may flow.
    Open { id: ConnectionId, remote: String },
}

impl ConnState {
    fn current_id(&self) -> Option<ConnectionId> {
        match self {
            ConnState::Idle => None,
            ConnState::Pending { id, .. } | ConnState::Open { id, .. } => Some(*id),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnState::Open { .. })
    }

    /// Display name of the remote party, if any.
    pub fn partner(&self) -> Option<&str> {
        match self {
            ConnState::Idle => None,
            ConnState::Pending { remote, .. } | ConnState::Open { remote, .. } => {
                Some(strip_namespace(remote))
            }
        }
    }
}

/// Everything that can happen to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// User asked to call `target` (raw, unsanitized).
    Dial { id: ConnectionId, target: String },
    /// Remote peer `from` (namespaced) wants to talk.
    Offer { id: ConnectionId, from: String },
    /// The collaborator reported something about connection `id`.
    Link { id: ConnectionId, signal: LinkSignal },
    /// User submitted text.
    Send { text: String },
    /// User pressed disconnect.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Sent,
    Received,
}

/// A rendered chat line. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub direction: MessageDirection,
    pub text: String,
}

/// Transient, user-visible outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Calling(String),
    Connected,
    CallEnded,
    /// The callee refused because it is already in a chat.
    PeerBusy,
    /// An inbound offer was refused because we are already in a chat.
    MissedCall(String),
    Failed(ChatError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Calling(target) => write!(f, "Calling {target}..."),
            Notice::Connected => f.write_str("Connected!"),
            Notice::CallEnded => f.write_str("Call ended."),
            Notice::PeerBusy => f.write_str("Peer is busy."),
            Notice::MissedCall(from) => write!(f, "Missed call from {from}"),
            Notice::Failed(e) => e.fmt(f),
        }
    }
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the collaborator to dial `remote` (namespaced).
    Dial { id: ConnectionId, remote: String },
    /// Accept a pending inbound offer.
    Accept { id: ConnectionId },
    /// Close or refuse connection `id`.
    Hangup { id: ConnectionId, reason: CloseReason },
    /// Send a payload on the open connection.
    Transmit { id: ConnectionId, payload: Value },
    /// Set up the chat view for `partner` (display name).
    ChatOpened { partner: String },
    Append(Message),
    /// Clear the chat view back to its "ended" placeholder.
    ChatReset,
    Notify(Notice),
}

/// The pure transition function.
pub fn transition(state: &ConnState, input: Input, local: &Identity) -> (ConnState, Vec<Effect>) {
    let unchanged = |effects: Vec<Effect>| (state.clone(), effects);

    match input {
        Input::Dial { id, target } => {
            let target = sanitize(target.trim());
            if target.is_empty() {
                return unchanged(vec![]);
            }
            if target == local.as_str() {
                return unchanged(vec![Effect::Notify(Notice::Failed(
                    ValidationError::SelfDial.into(),
                ))]);
            }
            if state.is_open() {
                return unchanged(vec![Effect::Notify(Notice::Failed(ChatError::Busy))]);
            }

            let mut effects = supersede(state);
            effects.push(Effect::Dial {
                id,
                remote: namespaced(&target),
            });
            effects.push(Effect::Notify(Notice::Calling(target.clone())));
            (
                ConnState::Pending {
                    id,
                    remote: namespaced(&target),
                    direction: Direction::Outbound,
                },
                effects,
            )
        }

        Input::Offer { id, from } => {
            if state.is_open() {
                return unchanged(vec![
                    Effect::Hangup {
                        id,
                        reason: CloseReason::Busy,
                    },
                    Effect::Notify(Notice::MissedCall(strip_namespace(&from).to_string())),
                ]);
            }

            let mut effects = supersede(state);
            effects.push(Effect::Accept { id });
            (
                ConnState::Pending {
                    id,
                    remote: from,
                    direction: Direction::Inbound,
                },
                effects,
            )
        }

        Input::Link { id, signal } => {
            if state.current_id() != Some(id) {
                debug!(event = "stale_link_signal", id = %id, ?signal, "Ignoring signal for old connection");
                return unchanged(vec![]);
            }
            on_link(state, id, signal)
        }

        Input::Send { text } => {
            let text = text.trim();
            match state {
                ConnState::Open { id, .. } if !text.is_empty() => unchanged(vec![
                    Effect::Transmit {
                        id: *id,
                        payload: Envelope::msg(text).to_value(),
                    },
                    Effect::Append(Message {
                        direction: MessageDirection::Sent,
                        text: text.to_string(),
                    }),
                ]),
                _ => unchanged(vec![]),
            }
        }

        Input::Close => match state.current_id() {
            None => unchanged(vec![]),
            Some(id) => (
                ConnState::Idle,
                vec![
                    Effect::Hangup {
                        id,
                        reason: CloseReason::Hangup,
                    },
                    Effect::ChatReset,
                    Effect::Notify(Notice::CallEnded),
                ],
            ),
        },
    }
}

/// Hang up a pending attempt that is being replaced.
fn supersede(state: &ConnState) -> Vec<Effect> {
    match state {
        ConnState::Pending { id, .. } => vec![Effect::Hangup {
            id: *id,
            reason: CloseReason::Hangup,
        }],
        _ => vec![],
    }
}

fn on_link(state: &ConnState, id: ConnectionId, signal: LinkSignal) -> (ConnState, Vec<Effect>) {
    match signal {
        LinkSignal::Opened => match state {
            ConnState::Pending { remote, .. } => (
                ConnState::Open {
                    id,
                    remote: remote.clone(),
                },
                vec![
                    Effect::ChatOpened {
                        partner: strip_namespace(remote).to_string(),
                    },
                    Effect::Notify(Notice::Connected),
                ],
            ),
            _ => (state.clone(), vec![]),
        },

        LinkSignal::Data(payload) => {
            if !state.is_open() {
                return (state.clone(), vec![]);
            }
            match Envelope::text_of(&payload) {
                Some(text) => (
                    state.clone(),
                    vec![Effect::Append(Message {
                        direction: MessageDirection::Received,
                        text,
                    })],
                ),
                None => {
                    debug!(event = "envelope_dropped", %payload, "Ignoring unknown payload");
                    (state.clone(), vec![])
                }
            }
        }

        LinkSignal::Closed(reason) => {
            let notice = match reason {
                CloseReason::Busy => Notice::PeerBusy,
                CloseReason::Hangup | CloseReason::Lost => Notice::CallEnded,
            };
            (
                ConnState::Idle,
                vec![Effect::ChatReset, Effect::Notify(notice)],
            )
        }

        LinkSignal::Error(err) => (
            ConnState::Idle,
            vec![
                Effect::Hangup {
                    id,
                    reason: CloseReason::Hangup,
                },
                Effect::ChatReset,
                Effect::Notify(Notice::Failed(ChatError::Transport(err.to_string()))),
            ],
        ),
    }
}

/// Owns the connection state for one registered session.
pub struct Controller {
    local: Identity,
    state: ConnState,
}

impl Controller {
    pub fn new(local: Identity) -> Self {
        Self {
            local,
            state: ConnState::Idle,
        }
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let (next, effects) = transition(&self.state, input, &self.local);
        self.state = next;
        effects
    }

    pub fn dial(&mut self, target: &str) -> Vec<Effect> {
        self.handle(Input::Dial {
            id: ConnectionId::new(),
            target: target.to_string(),
        })
    }

    pub fn send(&mut self, text: &str) -> Vec<Effect> {
        self.handle(Input::Send {
            text: text.to_string(),
        })
    }

    pub fn close(&mut self) -> Vec<Effect> {
        self.handle(Input::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::TransportError;
    use serde_json::json;

    fn me() -> Identity {
        Identity::parse("alice1").unwrap()
    }

    /// Drive a fresh controller to Open with `remote`, returning the id.
    fn open_with(ctl: &mut Controller, remote: &str) -> ConnectionId {
        let id = ConnectionId::new();
        ctl.handle(Input::Offer {
            id,
            from: namespaced(remote),
        });
        ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Opened,
        });
        assert!(ctl.state().is_open());
        id
    }

    fn dial_id(effects: &[Effect]) -> ConnectionId {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Dial { id, .. } => Some(*id),
                _ => None,
            })
            .expect("dial effect")
    }

    #[test]
    fn dial_from_idle_goes_pending() {
        let mut ctl = Controller::new(me());
        let effects = ctl.dial(" bob-42 ");
        let id = dial_id(&effects);
        assert_eq!(
            effects,
            vec![
                Effect::Dial {
                    id,
                    remote: "stranger_bob42".into()
                },
                Effect::Notify(Notice::Calling("bob42".into())),
            ]
        );
        assert!(matches!(
            ctl.state(),
            ConnState::Pending { direction: Direction::Outbound, .. }
        ));
    }

    #[test]
    fn dial_empty_target_is_silent() {
        let mut ctl = Controller::new(me());
        assert!(ctl.dial("  !! ").is_empty());
        assert_eq!(ctl.state(), &ConnState::Idle);
    }

    #[test]
    fn dial_self_is_rejected() {
        let mut ctl = Controller::new(me());
        let effects = ctl.dial("alice1");
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::Failed(ChatError::Validation(
                ValidationError::SelfDial
            )))]
        );
        assert_eq!(ctl.state(), &ConnState::Idle);
    }

    #[test]
    fn pending_opens_and_sets_up_chat() {
        let mut ctl = Controller::new(me());
        let id = dial_id(&ctl.dial("bob42"));
        let effects = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Opened,
        });
        assert_eq!(
            effects,
            vec![
                Effect::ChatOpened {
                    partner: "bob42".into()
                },
                Effect::Notify(Notice::Connected),
            ]
        );
        assert_eq!(ctl.state().partner(), Some("bob42"));
    }

    #[test]
    fn second_offer_while_open_is_refused_busy() {
        let mut ctl = Controller::new(me());
        let a = open_with(&mut ctl, "bob42");
        let before = ctl.state().clone();

        let b = ConnectionId::new();
        let effects = ctl.handle(Input::Offer {
            id: b,
            from: "stranger_carol".into(),
        });

        assert_eq!(
            effects,
            vec![
                Effect::Hangup {
                    id: b,
                    reason: CloseReason::Busy
                },
                Effect::Notify(Notice::MissedCall("carol".into())),
            ]
        );
        assert_eq!(ctl.state(), &before);
        assert_eq!(ctl.state().current_id(), Some(a));
    }

    #[test]
    fn dial_while_open_is_refused_without_touching_connection() {
        let mut ctl = Controller::new(me());
        open_with(&mut ctl, "bob42");
        let before = ctl.state().clone();

        let effects = ctl.dial("carol");
        assert_eq!(effects, vec![Effect::Notify(Notice::Failed(ChatError::Busy))]);
        assert_eq!(ctl.state(), &before);
    }

    #[test]
    fn new_attempt_supersedes_pending() {
        let mut ctl = Controller::new(me());
        let first = dial_id(&ctl.dial("bob42"));
        let offer = ConnectionId::new();
        let effects = ctl.handle(Input::Offer {
            id: offer,
            from: "stranger_carol".into(),
        });
        assert_eq!(
            effects,
            vec![
                Effect::Hangup {
                    id: first,
                    reason: CloseReason::Hangup
                },
                Effect::Accept { id: offer },
            ]
        );

        // The superseded attempt opening later changes nothing.
        let stale = ctl.handle(Input::Link {
            id: first,
            signal: LinkSignal::Opened,
        });
        assert!(stale.is_empty());
        assert!(matches!(
            ctl.state(),
            ConnState::Pending { direction: Direction::Inbound, .. }
        ));
    }

    #[test]
    fn send_only_works_when_open() {
        let mut ctl = Controller::new(me());
        assert!(ctl.send("hello").is_empty());

        let id = dial_id(&ctl.dial("bob42"));
        assert!(ctl.send("hello").is_empty());

        ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Opened,
        });
        assert!(ctl.send("   ").is_empty());
        assert_eq!(
            ctl.send(" hello "),
            vec![
                Effect::Transmit {
                    id,
                    payload: json!({ "type": "msg", "content": "hello" })
                },
                Effect::Append(Message {
                    direction: MessageDirection::Sent,
                    text: "hello".into()
                }),
            ]
        );
    }

    #[test]
    fn received_messages_append_and_others_drop() {
        let mut ctl = Controller::new(me());
        let id = open_with(&mut ctl, "bob42");

        let effects = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Data(json!({ "type": "msg", "content": "hey" })),
        });
        assert_eq!(
            effects,
            vec![Effect::Append(Message {
                direction: MessageDirection::Received,
                text: "hey".into()
            })]
        );

        let dropped = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Data(json!({ "type": "typing" })),
        });
        assert!(dropped.is_empty());
        assert!(ctl.state().is_open());
    }

    #[test]
    fn close_while_idle_is_noop() {
        let mut ctl = Controller::new(me());
        assert!(ctl.close().is_empty());
        assert!(ctl.close().is_empty());
        assert_eq!(ctl.state(), &ConnState::Idle);
    }

    #[test]
    fn close_while_open_hangs_up_and_resets() {
        let mut ctl = Controller::new(me());
        let id = open_with(&mut ctl, "bob42");
        assert_eq!(
            ctl.close(),
            vec![
                Effect::Hangup {
                    id,
                    reason: CloseReason::Hangup
                },
                Effect::ChatReset,
                Effect::Notify(Notice::CallEnded),
            ]
        );
        assert_eq!(ctl.state(), &ConnState::Idle);

        // The collaborator's own close event for that link arrives late.
        let late = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Closed(CloseReason::Hangup),
        });
        assert!(late.is_empty());
    }

    #[test]
    fn remote_busy_is_reported() {
        let mut ctl = Controller::new(me());
        let id = dial_id(&ctl.dial("bob42"));
        let effects = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Closed(CloseReason::Busy),
        });
        assert_eq!(
            effects,
            vec![Effect::ChatReset, Effect::Notify(Notice::PeerBusy)]
        );
        assert_eq!(ctl.state(), &ConnState::Idle);
    }

    #[test]
    fn transport_error_closes_the_chat() {
        let mut ctl = Controller::new(me());
        let id = open_with(&mut ctl, "bob42");
        let effects = ctl.handle(Input::Link {
            id,
            signal: LinkSignal::Error(TransportError::PeerUnavailable),
        });
        assert_eq!(
            effects,
            vec![
                Effect::Hangup {
                    id,
                    reason: CloseReason::Hangup
                },
                Effect::ChatReset,
                Effect::Notify(Notice::Failed(ChatError::Transport(
                    "peer-unavailable".into()
                ))),
            ]
        );
        assert_eq!(ctl.state(), &ConnState::Idle);
    }

    #[test]
    fn never_two_open_connections() {
        let mut ctl = Controller::new(me());
        let a = open_with(&mut ctl, "bob42");
        for i in 0..5 {
            let id = ConnectionId::new();
            ctl.handle(Input::Offer {
                id,
                from: namespaced(&format!("peer{i}")),
            });
            ctl.handle(Input::Link {
                id,
                signal: LinkSignal::Opened,
            });
            ctl.dial(&format!("other{i}"));
            assert_eq!(ctl.state().current_id(), Some(a));
        }
    }
}
