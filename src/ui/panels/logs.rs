use crate::ui::traits::{Action, Component, Handler};
use crate::utils::log_buffer::LogBuffer;
use crate::workers::app::{App, Mode};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use tracing::Level;

const PAGE: usize = 10;

fn level_style(level: Level) -> (&'static str, Color) {
    match level {
        Level::ERROR => ("ERROR", Color::Red),
        Level::WARN => (" WARN", Color::Yellow),
        Level::INFO => (" INFO", Color::Green),
        Level::DEBUG => ("DEBUG", Color::DarkGray),
        Level::TRACE => ("TRACE", Color::Indexed(240)),
    }
}

pub struct LogsPanel {
    buffer: LogBuffer,
}

impl LogsPanel {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl Component for LogsPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let entries = self.buffer.entries();
        let total = entries.len();

        let visible_height = area.height.saturating_sub(2) as usize;
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);

        let items: Vec<ListItem> = entries
            .iter()
            .skip(scroll)
            .take(visible_height)
            .map(|entry| {
                let (level_str, level_color) = level_style(entry.level);
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!(" {} ", entry.timestamp),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{level_str} "),
                        Style::default()
                            .fg(level_color)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(&entry.message),
                ]))
            })
            .collect();

        let title = format!(" Logs ({total}) ");
        let log_list = List::new(items).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(log_list, area);
    }

    fn on_blur(&mut self, app: &mut App) {
        app.log_scroll = 0;
    }
}

impl Handler for LogsPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Option<Action> {
        let scroll = app.log_scroll;
        app.log_scroll = match key {
            KeyCode::Esc => return Some(Action::SwitchMode(Mode::Dashboard)),
            KeyCode::Char('d') => {
                self.buffer.clear();
                0
            }
            KeyCode::Up | KeyCode::Char('k') => scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => scroll.saturating_add(1),
            KeyCode::PageUp => scroll.saturating_sub(PAGE),
            KeyCode::PageDown => scroll.saturating_add(PAGE),
            KeyCode::Home => 0,
            // Render clamps this to the last page.
            KeyCode::End => self.buffer.len(),
            _ => scroll,
        };
        Some(Action::None)
    }
}
