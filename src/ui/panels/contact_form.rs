use crate::ui::traits::{Action, Component, Focusable, FocusableElement, Handler};
use crate::workers::app::{App, Mode};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

pub struct ContactFormPanel {
    focus: usize,
}

impl Default for ContactFormPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactFormPanel {
    pub fn new() -> Self {
        Self { focus: 0 }
    }

    fn input(&self, title: &str, value: &str, element: FocusableElement) -> Paragraph<'static> {
        let focused = self.focused() == Some(element);
        let (color, cursor) = if focused {
            (Color::Cyan, "_")
        } else {
            (Color::DarkGray, "")
        };
        Paragraph::new(format!("{value}{cursor}")).block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
    }

    fn field<'a>(&self, app: &'a mut App) -> Option<&'a mut String> {
        match self.focused()? {
            FocusableElement::NameInput => Some(&mut app.contact_name_input),
            FocusableElement::PhoneInput => Some(&mut app.contact_phone_input),
            _ => None,
        }
    }
}

impl Focusable for ContactFormPanel {
    fn focusable_elements(&self) -> Vec<FocusableElement> {
        vec![FocusableElement::NameInput, FocusableElement::PhoneInput]
    }

    fn focused_index(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, index: usize) {
        self.focus = index;
    }
}

impl Component for ContactFormPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(area);

        let help = Paragraph::new(" Save someone you want to call again.")
            .style(Style::default().fg(Color::Gray));
        f.render_widget(help, chunks[0]);
        f.render_widget(
            self.input("Name", &app.contact_name_input, FocusableElement::NameInput),
            chunks[1],
        );
        f.render_widget(
            self.input("Number", &app.contact_phone_input, FocusableElement::PhoneInput),
            chunks[2],
        );
    }

    fn on_focus(&mut self, app: &mut App) {
        self.focus = 0;
        app.contact_name_input.clear();
        app.contact_phone_input.clear();
    }
}

impl Handler for ContactFormPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Esc => Some(Action::SwitchMode(Mode::Dashboard)),
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                Some(Action::None)
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_prev();
                Some(Action::None)
            }
            KeyCode::Enter => Some(Action::AddContact {
                name: app.contact_name_input.clone(),
                phone: app.contact_phone_input.clone(),
            }),
            KeyCode::Char(c) => {
                if let Some(field) = self.field(app) {
                    field.push(c);
                }
                Some(Action::None)
            }
            KeyCode::Backspace => {
                if let Some(field) = self.field(app) {
                    field.pop();
                }
                Some(Action::None)
            }
            _ => Some(Action::None),
        }
    }
}
