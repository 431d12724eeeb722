use crate::ui::traits::{Action, Component, Handler};
use crate::workers::app::{App, LoginStatus};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::time::Instant;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct LoginPanel {
    started: Instant,
}

impl Default for LoginPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginPanel {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn spinner(&self) -> &'static str {
        let frame = (self.started.elapsed().as_millis() / 80) as usize;
        SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
    }
}

impl Component for LoginPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(area);

        let title = Paragraph::new(vec![
            Line::from(Span::styled(
                "Stranger Connect",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Pick a number. Anyone who knows it can call you.",
                Style::default().fg(Color::Gray),
            )),
        ])
        .alignment(Alignment::Center);
        f.render_widget(title, chunks[1]);

        let width = area.width.min(40);
        let input_area = Rect {
            x: area.x + (area.width - width) / 2,
            width,
            ..chunks[3]
        };
        let border = match app.login_status {
            LoginStatus::Failed => Color::Red,
            _ => Color::Cyan,
        };
        let input = Paragraph::new(format!("{}_", app.login_input))
            .block(
                Block::default()
                    .title(" Your Number ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .style(Style::default().fg(Color::White));
        f.render_widget(input, input_area);

        let status = match app.login_status {
            LoginStatus::Connecting => Line::from(vec![
                Span::styled(
                    format!("{} ", self.spinner()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled("Connecting...", Style::default().fg(Color::Yellow)),
            ]),
            LoginStatus::Failed => {
                Line::from(Span::styled("Error", Style::default().fg(Color::Red)))
            }
            LoginStatus::Idle => Line::from(""),
        };
        f.render_widget(
            Paragraph::new(status).alignment(Alignment::Center),
            chunks[4],
        );
    }
}

impl Handler for LoginPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Option<Action> {
        if app.login_status == LoginStatus::Connecting {
            return match key {
                KeyCode::Esc => Some(Action::Quit),
                _ => Some(Action::None),
            };
        }

        match key {
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Enter => Some(Action::Login(app.login_input.clone())),
            KeyCode::Char(c) => {
                app.login_input.push(c);
                Some(Action::None)
            }
            KeyCode::Backspace => {
                app.login_input.pop();
                Some(Action::None)
            }
            _ => Some(Action::None),
        }
    }
}
