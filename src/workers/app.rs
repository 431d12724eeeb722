use crate::core::contacts::ContactBook;
use crate::core::engine::{ChatEngine, UiEffect};
use crate::core::lifecycle::{Message, MessageDirection};
use crate::core::offline::InstallPrompt;
use crate::ui::notify::NotifyManager;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Login,
    Dashboard,
    AddContact,
    Logs,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Login => "Login",
            Mode::Dashboard => "Dashboard",
            Mode::AddContact => "Add Contact",
            Mode::Logs => "Logs",
        }
    }
}

/// What the login screen shows under the input box.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoginStatus {
    Idle,
    Connecting,
    Failed,
}

/// The chat pane: a partner and an append-only list of lines.
#[derive(Debug, Default)]
pub struct ChatView {
    partner: Option<String>,
    messages: Vec<Message>,
}

impl ChatView {
    pub fn partner(&self) -> Option<&str> {
        self.partner.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn open(&mut self, partner: String) {
        self.partner = Some(partner);
        self.messages.clear();
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        self.partner = None;
        self.messages.clear();
    }
}

pub struct App {
    pub mode: Mode,
    pub engine: ChatEngine,
    pub contacts: ContactBook,
    pub prompt: InstallPrompt,
    pub notify: NotifyManager,
    pub chat: ChatView,

    pub login_input: String,
    pub login_status: LoginStatus,
    pub dial_input: String,
    pub compose_input: String,
    pub selected_contact: usize,
    pub contact_name_input: String,
    pub contact_phone_input: String,
    pub log_scroll: usize,
}

impl App {
    pub fn new(engine: ChatEngine, contacts: ContactBook, prefill: Option<String>) -> Self {
        Self {
            mode: Mode::Login,
            engine,
            contacts,
            prompt: InstallPrompt::default(),
            notify: NotifyManager::new(),
            chat: ChatView::default(),
            login_input: prefill.unwrap_or_default(),
            login_status: LoginStatus::Idle,
            dial_input: String::new(),
            compose_input: String::new(),
            selected_contact: 0,
            contact_name_input: String::new(),
            contact_phone_input: String::new(),
            log_scroll: 0,
        }
    }

    /// Apply engine output to the screen state.
    pub fn apply(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            match effect {
                UiEffect::Registering => self.login_status = LoginStatus::Connecting,
                UiEffect::LoginFailed(e) => {
                    self.login_status = LoginStatus::Failed;
                    self.notify.error(e.to_string());
                }
                UiEffect::Dashboard { identity } => {
                    self.login_status = LoginStatus::Idle;
                    self.mode = Mode::Dashboard;
                    tracing::info!(event = "dashboard_shown", identity = %identity);
                }
                UiEffect::ChatOpened { partner } => self.chat.open(partner),
                UiEffect::Append(msg) => self.chat.push(msg),
                UiEffect::ChatReset => self.chat.reset(),
                UiEffect::Notify(notice) => self.notify.notice(&notice),
            }
        }
    }

    pub fn selected_phone(&self) -> Option<&str> {
        self.contacts
            .get(self.selected_contact)
            .map(|c| c.phone.as_str())
    }

    pub fn select_next_contact(&mut self) {
        if !self.contacts.is_empty() {
            self.selected_contact = (self.selected_contact + 1) % self.contacts.len();
        }
    }

    pub fn select_prev_contact(&mut self) {
        let len = self.contacts.len();
        if len > 0 {
            self.selected_contact = (self.selected_contact + len - 1) % len;
        }
    }
}

pub fn is_sent(message: &Message) -> bool {
    message.direction == MessageDirection::Sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ChatError;
    use crate::core::identity::Identity;
    use crate::core::lifecycle::Notice;
    use crate::core::transport::recording::RecordingTransport;
    use std::sync::Arc;

    fn app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = ChatEngine::new(Arc::new(RecordingTransport::default()));
        let contacts = ContactBook::load(dir.path().join("contacts.json"));
        (App::new(engine, contacts, Some("alice1".into())), dir)
    }

    #[test]
    fn login_flow_updates_status_and_mode() {
        let (mut app, _dir) = app();
        assert_eq!(app.login_input, "alice1");

        app.apply(vec![UiEffect::Registering]);
        assert_eq!(app.login_status, LoginStatus::Connecting);

        app.apply(vec![UiEffect::LoginFailed(ChatError::DuplicateIdentity)]);
        assert_eq!(app.mode, Mode::Login);
        assert_eq!(app.login_status, LoginStatus::Failed);
        assert_eq!(
            app.notify.current().unwrap().message,
            "Number already online! Close other sessions."
        );

        app.apply(vec![UiEffect::Dashboard {
            identity: Identity::parse("alice1").unwrap(),
        }]);
        assert_eq!(app.mode, Mode::Dashboard);
    }

    #[test]
    fn chat_view_appends_in_order_and_resets() {
        let (mut app, _dir) = app();
        app.apply(vec![
            UiEffect::ChatOpened {
                partner: "bob42".into(),
            },
            UiEffect::Append(Message {
                direction: MessageDirection::Sent,
                text: "one".into(),
            }),
            UiEffect::Append(Message {
                direction: MessageDirection::Received,
                text: "two".into(),
            }),
        ]);
        assert_eq!(app.chat.partner(), Some("bob42"));
        let texts: Vec<_> = app.chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert!(is_sent(&app.chat.messages()[0]));

        app.apply(vec![UiEffect::ChatReset, UiEffect::Notify(Notice::CallEnded)]);
        assert!(app.chat.partner().is_none());
        assert!(app.chat.messages().is_empty());
        assert_eq!(app.notify.current().unwrap().message, "Call ended.");
    }

    #[test]
    fn contact_selection_wraps() {
        let (mut app, _dir) = app();
        app.select_next_contact();
        assert_eq!(app.selected_contact, 0);

        let me = Identity::parse("alice1").unwrap();
        app.contacts.add("Bob", "bob42", &me).unwrap();
        app.contacts.add("Carol", "carol", &me).unwrap();
        app.select_prev_contact();
        assert_eq!(app.selected_phone(), Some("carol"));
        app.select_next_contact();
        assert_eq!(app.selected_phone(), Some("bob42"));
    }
}
