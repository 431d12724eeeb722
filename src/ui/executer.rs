use crate::core::config::CONTACTS_FILE;
use crate::core::contacts::ContactBook;
use crate::core::engine::ChatEngine;
use crate::core::lifecycle::{ConnState, Direction as CallDirection};
use crate::core::offline::{self, AssetCache, HttpSource, PromptChoice};
use crate::core::transport::{IrohTransport, TransportEvent};
use crate::ui::panels::{ContactFormPanel, DashboardPanel, LoginPanel, LogsPanel};
use crate::ui::popups::{install_prompt_choice, render_install_prompt};
use crate::ui::traits::{Action, Component, Handler};
use crate::utils::log_buffer::LogBuffer;
use crate::utils::sos::SignalOfStop;
use crate::workers::app::{App, Mode};
use crate::workers::args::Args;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use std::io::{Stdout, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

type InstallResult = Result<usize, String>;

pub struct UIExecuter {
    app: App,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    data_dir: PathBuf,
    shell_origin: String,
    install_tx: mpsc::UnboundedSender<InstallResult>,

    login_panel: LoginPanel,
    dashboard_panel: DashboardPanel,
    contact_form_panel: ContactFormPanel,
    logs_panel: LogsPanel,
}

pub async fn run(
    args: Args,
    data_dir: PathBuf,
    sos: SignalOfStop,
    log_buffer: LogBuffer,
) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TransportEvent>();
    let (install_tx, mut install_rx) = mpsc::unbounded_channel::<InstallResult>();

    let transport = IrohTransport::new(args.network(), event_tx, sos.clone());
    let engine = ChatEngine::new(Arc::new(transport.clone()));
    let contacts = ContactBook::load(data_dir.join(CONTACTS_FILE));
    let mut app = App::new(engine, contacts, args.identity.clone());

    if !AssetCache::open(&data_dir).is_installed() {
        info!(event = "install_eligible", "Offline shell not cached; deferring install prompt");
        app.prompt.capture();
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
    terminal.clear()?;

    let mut executer = UIExecuter {
        app,
        terminal,
        data_dir,
        shell_origin: args.shell_origin().to_string(),
        install_tx,
        login_panel: LoginPanel::new(),
        dashboard_panel: DashboardPanel::new(),
        contact_form_panel: ContactFormPanel::new(),
        logs_panel: LogsPanel::new(log_buffer),
    };

    let result = executer
        .run_event_loop(&mut event_rx, &mut install_rx, &sos)
        .await;

    // Restore the terminal whatever happened.
    disable_raw_mode()?;
    execute!(executer.terminal.backend_mut(), LeaveAlternateScreen)?;
    executer.terminal.show_cursor()?;

    sos.cancel();
    transport.shutdown().await;
    result
}

impl UIExecuter {
    fn switch_mode(&mut self, new_mode: Mode) {
        let app = &mut self.app;
        match app.mode {
            Mode::Login => self.login_panel.on_blur(app),
            Mode::Dashboard => self.dashboard_panel.on_blur(app),
            Mode::AddContact => self.contact_form_panel.on_blur(app),
            Mode::Logs => self.logs_panel.on_blur(app),
        }
        app.mode = new_mode;
        match new_mode {
            Mode::Login => self.login_panel.on_focus(app),
            Mode::Dashboard => self.dashboard_panel.on_focus(app),
            Mode::AddContact => self.contact_form_panel.on_focus(app),
            Mode::Logs => self.logs_panel.on_focus(app),
        }
    }

    fn render_frame(&mut self) -> std::io::Result<()> {
        let app = &self.app;
        let mode = app.mode;
        let login_panel = &mut self.login_panel;
        let dashboard_panel = &mut self.dashboard_panel;
        let contact_form_panel = &mut self.contact_form_panel;
        let logs_panel = &mut self.logs_panel;

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(2)])
                .split(f.area());

            match mode {
                Mode::Login => login_panel.render(f, app, chunks[0]),
                Mode::Dashboard => dashboard_panel.render(f, app, chunks[0]),
                Mode::AddContact => contact_form_panel.render(f, app, chunks[0]),
                Mode::Logs => logs_panel.render(f, app, chunks[0]),
            }

            if app.prompt.is_showing() {
                render_install_prompt(f);
            }

            render_status_bar(f, app, chunks[1]);
        })?;

        Ok(())
    }

    async fn run_event_loop(
        &mut self,
        event_rx: &mut mpsc::UnboundedReceiver<TransportEvent>,
        install_rx: &mut mpsc::UnboundedReceiver<InstallResult>,
        sos: &SignalOfStop,
    ) -> anyhow::Result<()> {
        loop {
            self.render_frame()?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if self.app.prompt.is_showing() {
                    self.handle_prompt_key(key.code);
                } else if let Some(action) = self.handle_panel_key(key.code)
                    && self.handle_action(action)
                {
                    return Ok(());
                }
            }

            // Transport events, in arrival order.
            while let Ok(ev) = event_rx.try_recv() {
                let effects = self.app.engine.handle_event(ev);
                self.app.apply(effects);
            }

            while let Ok(result) = install_rx.try_recv() {
                self.on_install_finished(result);
            }

            if sos.cancelled() {
                return Ok(());
            }
        }
    }

    fn handle_panel_key(&mut self, key: KeyCode) -> Option<Action> {
        let app = &mut self.app;
        match app.mode {
            Mode::Login => self.login_panel.handle_key(app, key),
            Mode::Dashboard => self.dashboard_panel.handle_key(app, key),
            Mode::AddContact => self.contact_form_panel.handle_key(app, key),
            Mode::Logs => self.logs_panel.handle_key(app, key),
        }
    }

    /// Returns true when the application should quit.
    fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::SwitchMode(mode) => self.switch_mode(mode),
            Action::Login(raw) => {
                let effects = self.app.engine.login(&raw);
                self.app.apply(effects);
            }
            Action::Dial(target) => {
                let effects = self.app.engine.dial(&target);
                self.app.apply(effects);
            }
            Action::Send(text) => {
                let effects = self.app.engine.send(&text);
                self.app.apply(effects);
            }
            Action::Hangup => {
                let effects = self.app.engine.close();
                self.app.apply(effects);
            }
            Action::AddContact { name, phone } => self.add_contact(&name, &phone),
            Action::ShowInstallPrompt => {
                self.app.prompt.replay();
            }
            Action::Quit => return true,
            Action::None => {}
        }
        false
    }

    fn add_contact(&mut self, name: &str, phone: &str) {
        let Some(identity) = self.app.engine.identity().cloned() else {
            return;
        };
        match self.app.contacts.add(name, phone, &identity) {
            Ok(contact) => {
                self.app.notify.success(format!("Saved {}", contact.name));
                self.app.selected_contact = self.app.contacts.len() - 1;
                self.switch_mode(Mode::Dashboard);
            }
            Err(e) => self.app.notify.error(e.to_string()),
        }
    }

    fn handle_prompt_key(&mut self, key: KeyCode) {
        let Some(choice) = install_prompt_choice(key) else {
            return;
        };
        if self.app.prompt.respond(choice) == Some(PromptChoice::Accepted) {
            self.spawn_install();
        }
    }

    fn spawn_install(&mut self) {
        self.app.notify.info("Installing offline shell...");
        let data_dir = self.data_dir.clone();
        let origin = self.shell_origin.clone();
        let tx = self.install_tx.clone();

        tokio::spawn(async move {
            let result: anyhow::Result<usize> = async {
                let urls = offline::manifest(&origin)?;
                let source = HttpSource::new()?;
                AssetCache::open(&data_dir).install(&urls, &source).await
            }
            .await;
            let _ = tx.send(result.map_err(|e| format!("{e:#}")));
        });
    }

    fn on_install_finished(&mut self, result: InstallResult) {
        match result {
            Ok(count) => self
                .app
                .notify
                .success(format!("Offline shell installed ({count} assets)")),
            Err(e) => {
                error!(event = "shell_install_failure", error = %e, "Offline shell install failed");
                self.app.notify.error("Offline shell install failed");
            }
        }
    }
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let help = match app.mode {
        Mode::Login => "Enter: connect | Esc: quit",
        Mode::Dashboard => {
            "Tab: focus | Enter: call/send | a: add contact | h: hang up | l: logs | q: quit"
        }
        Mode::AddContact => "Tab: next field | Enter: save | Esc: back",
        Mode::Logs => "Up/Down: scroll | d: clear | Esc: back",
    };
    let help_line = if let Some(notif) = app.notify.current() {
        Paragraph::new(format!(" {} {}", notif.level.icon(), notif.message))
            .style(Style::default().fg(notif.level.color()))
    } else {
        Paragraph::new(format!(" {help}")).style(Style::default().fg(Color::DarkGray))
    };
    f.render_widget(help_line, chunks[0]);

    let state = app.engine.conn_state();
    let who = state.partner().unwrap_or_default();
    let (label, color) = match state {
        ConnState::Idle => ("Idle".to_string(), Color::DarkGray),
        ConnState::Pending {
            direction: CallDirection::Outbound,
            ..
        } => (format!("Calling {who}..."), Color::Yellow),
        ConnState::Pending { .. } => (format!("Answering {who}..."), Color::Yellow),
        ConnState::Open { .. } => (format!("In chat with {who}"), Color::Green),
    };
    let status = Line::from(vec![
        Span::styled(" ● ", Style::default().fg(color)),
        Span::styled(label, Style::default().fg(color)),
        Span::styled(
            format!("  |  {}", app.mode.label()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::Black)),
        chunks[1],
    );
}
