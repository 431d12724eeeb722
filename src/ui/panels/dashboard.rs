//! Dashboard: dial box, contact list, install control, chat pane and
//! compose box.

use crate::ui::commands::{ChatCommand, help_line, parse_command};
use crate::ui::traits::{Action, Component, Focusable, FocusableElement, Handler};
use crate::workers::app::{App, Mode, is_sent};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

const FOCUS_ORDER: &[FocusableElement] = &[
    FocusableElement::DialInput,
    FocusableElement::ContactList,
    FocusableElement::ComposeInput,
];

pub struct DashboardPanel {
    focus: usize,
    list_state: ListState,
}

impl Default for DashboardPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardPanel {
    pub fn new() -> Self {
        Self {
            focus: 0,
            list_state: ListState::default(),
        }
    }

    fn border(&self, element: FocusableElement) -> Style {
        if self.focused() == Some(element) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    fn render_sidebar(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let install_height = if app.prompt.control_visible() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(install_height),
            ])
            .split(area);

        let me = app
            .engine
            .identity()
            .map(|id| id.to_string())
            .unwrap_or_default();
        let header = Paragraph::new(Line::from(vec![
            Span::styled(" My number: ", Style::default().fg(Color::Gray)),
            Span::styled(
                me,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, chunks[0]);

        let cursor = if self.focused() == Some(FocusableElement::DialInput) {
            "_"
        } else {
            ""
        };
        let dial = Paragraph::new(format!("{}{}", app.dial_input, cursor)).block(
            Block::default()
                .title(" Call number ")
                .borders(Borders::ALL)
                .border_style(self.border(FocusableElement::DialInput)),
        );
        f.render_widget(dial, chunks[1]);

        let items: Vec<ListItem> = app
            .contacts
            .contacts()
            .iter()
            .map(|c| {
                ListItem::new(Line::from(vec![
                    Span::styled("● ", Style::default().fg(Color::Cyan)),
                    Span::raw(c.name.clone()),
                    Span::styled(format!(" ({})", c.phone), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();
        self.list_state.select(if app.contacts.is_empty() {
            None
        } else {
            Some(app.selected_contact)
        });
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Contacts ({}) ", app.contacts.len()))
                    .borders(Borders::ALL)
                    .border_style(self.border(FocusableElement::ContactList)),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[2], &mut self.list_state);

        if app.prompt.control_visible() {
            let control = Paragraph::new(" [i] Install offline shell ")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(control, chunks[3]);
        }
    }

    fn render_chat(&self, f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(area);

        let (title, lines) = match app.chat.partner() {
            Some(partner) => {
                let lines: Vec<Line> = app
                    .chat
                    .messages()
                    .iter()
                    .map(|m| {
                        let (who, color) = if is_sent(m) {
                            ("You".to_string(), Color::Green)
                        } else {
                            (partner.to_string(), Color::Cyan)
                        };
                        Line::from(vec![
                            Span::styled(
                                format!(" {who}: "),
                                Style::default().fg(color).add_modifier(Modifier::BOLD),
                            ),
                            Span::raw(m.text.clone()),
                        ])
                    })
                    .collect();
                (format!(" Chat with {partner} "), lines)
            }
            None => (
                " No active chat ".to_string(),
                vec![Line::from(Span::styled(
                    " Dial a number or pick a contact to start chatting.",
                    Style::default().fg(Color::DarkGray),
                ))],
            ),
        };

        // Keep the newest lines in view.
        let visible = chunks[0].height.saturating_sub(2) as usize;
        let skip = lines.len().saturating_sub(visible);
        let messages = Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(messages, chunks[0]);

        let cursor = if self.focused() == Some(FocusableElement::ComposeInput) {
            "_"
        } else {
            ""
        };
        let compose = Paragraph::new(format!("{}{}", app.compose_input, cursor)).block(
            Block::default()
                .title(" Message ")
                .borders(Borders::ALL)
                .border_style(self.border(FocusableElement::ComposeInput)),
        );
        f.render_widget(compose, chunks[1]);
    }

    /// Submit the compose box. Plain text is kept in the box unless a chat
    /// is open to take it.
    fn submit_compose(&mut self, app: &mut App) -> Option<Action> {
        let command = parse_command(&app.compose_input);
        if command.is_none() && !app.engine.conn_state().is_open() {
            return Some(Action::None);
        }
        let text = std::mem::take(&mut app.compose_input);
        match command {
            None => Some(Action::Send(text)),
            Some(Ok(ChatCommand::Hangup)) => Some(Action::Hangup),
            Some(Ok(ChatCommand::Help)) => {
                app.notify.info(help_line());
                Some(Action::None)
            }
            Some(Err(msg)) => {
                app.notify.error(msg);
                Some(Action::None)
            }
        }
    }

    fn handle_list_key(&mut self, app: &mut App, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                app.select_prev_contact();
                Some(Action::None)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.select_next_contact();
                Some(Action::None)
            }
            KeyCode::Enter => match app.selected_phone() {
                Some(phone) => Some(Action::Dial(phone.to_string())),
                None => Some(Action::None),
            },
            KeyCode::Char('a') => Some(Action::SwitchMode(Mode::AddContact)),
            KeyCode::Char('l') => Some(Action::SwitchMode(Mode::Logs)),
            KeyCode::Char('h') => Some(Action::Hangup),
            KeyCode::Char('i') if app.prompt.control_visible() => {
                Some(Action::ShowInstallPrompt)
            }
            KeyCode::Char('q') => Some(Action::Quit),
            _ => Some(Action::None),
        }
    }
}

impl Focusable for DashboardPanel {
    fn focusable_elements(&self) -> Vec<FocusableElement> {
        FOCUS_ORDER.to_vec()
    }

    fn focused_index(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, index: usize) {
        self.focus = index;
    }
}

impl Component for DashboardPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(1)])
            .split(area);
        self.render_sidebar(f, app, chunks[0]);
        self.render_chat(f, app, chunks[1]);
    }

    fn on_focus(&mut self, app: &mut App) {
        if app.selected_contact >= app.contacts.len() {
            app.selected_contact = app.contacts.len().saturating_sub(1);
        }
    }
}

impl Handler for DashboardPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Tab => {
                self.focus_next();
                return Some(Action::None);
            }
            KeyCode::BackTab => {
                self.focus_prev();
                return Some(Action::None);
            }
            _ => {}
        }

        match self.focused()? {
            FocusableElement::ContactList => self.handle_list_key(app, key),
            FocusableElement::DialInput => match key {
                KeyCode::Enter => {
                    let target = std::mem::take(&mut app.dial_input);
                    Some(Action::Dial(target))
                }
                KeyCode::Char(c) => {
                    app.dial_input.push(c);
                    Some(Action::None)
                }
                KeyCode::Backspace => {
                    app.dial_input.pop();
                    Some(Action::None)
                }
                KeyCode::Esc => {
                    self.set_focus(1);
                    Some(Action::None)
                }
                _ => Some(Action::None),
            },
            FocusableElement::ComposeInput => match key {
                KeyCode::Enter => self.submit_compose(app),
                KeyCode::Char(c) => {
                    app.compose_input.push(c);
                    Some(Action::None)
                }
                KeyCode::Backspace => {
                    app.compose_input.pop();
                    Some(Action::None)
                }
                KeyCode::Esc => {
                    self.set_focus(1);
                    Some(Action::None)
                }
                _ => Some(Action::None),
            },
            _ => Some(Action::None),
        }
    }
}
