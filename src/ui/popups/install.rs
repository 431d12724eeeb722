use crate::core::config::CACHE_NAME;
use crate::core::offline::PromptChoice;
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Render the replayed install prompt.
pub fn render_install_prompt(f: &mut Frame) {
    let popup_width = 52u16.min(f.area().width);
    let popup_height = 8u16.min(f.area().height);
    let popup_x = (f.area().width.saturating_sub(popup_width)) / 2;
    let popup_y = (f.area().height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Install the offline shell?",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Caches the app assets as {CACHE_NAME}."),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y] ", Style::default().fg(Color::Green)),
            Span::raw("Install    "),
            Span::styled("[n] ", Style::default().fg(Color::Red)),
            Span::raw("Not now"),
        ]),
    ];

    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Install ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(popup, popup_area);
}

/// Map a key to an answer. Other keys leave the prompt open.
pub fn install_prompt_choice(key: KeyCode) -> Option<PromptChoice> {
    match key {
        KeyCode::Char('y') | KeyCode::Enter => Some(PromptChoice::Accepted),
        KeyCode::Char('n') | KeyCode::Esc => Some(PromptChoice::Dismissed),
        _ => None,
    }
}
