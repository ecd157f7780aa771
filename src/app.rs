//! Main application state and event loop.
//!
//! Network calls run as spawned tasks; each posts one [`AppEvent`] back to
//! the loop, which applies it. All screen state is mutated on the loop only.
//! Results are tagged with the session generation they were issued under and
//! dropped if the session has changed since.

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::models::{AuthResponse, ConceptExplanation, HistoryResponse, Session};
use crate::screens::{AuthRequest, HistoryScreen, HomeScreen, LoginScreen, Screen, ScreenAction};
use crate::services::{
    ApiClient, AuthGateway, ExplanationFetcher, HistoryGateway, SaveOutcome, SessionStore, Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Home,
    History,
    Login,
}

/// Completion of a background request.
#[derive(Debug)]
pub enum AppEvent {
    ExplanationLoaded(Result<ConceptExplanation, ClientError>),
    AuthCompleted(Result<AuthResponse, ClientError>),
    HistoryLoaded(Result<HistoryResponse, ClientError>),
    HistorySaved(Result<SaveOutcome, ClientError>),
}

/// An [`AppEvent`] tagged with the session generation that issued it.
#[derive(Debug)]
pub struct Completion {
    generation: u64,
    event: AppEvent,
}

/// Application state.
pub struct App {
    current_screen: AppScreen,
    should_quit: bool,

    // Services
    store: SessionStore,
    auth: AuthGateway,
    fetcher: ExplanationFetcher,
    history: HistoryGateway,
    session_rx: watch::Receiver<Session>,

    // Screens
    home_screen: HomeScreen,
    login_screen: LoginScreen,
    history_screen: HistoryScreen,

    // Background results
    events_tx: mpsc::UnboundedSender<Completion>,
    events_rx: mpsc::UnboundedReceiver<Completion>,

    // Status bar info
    status_message: String,
}

impl App {
    /// Create a new application instance backed by the persisted session.
    pub fn new(config: Config) -> Result<Self> {
        let store = SessionStore::open(config.session_path());
        Self::with_store(Arc::new(config), store)
    }

    /// Create an application around an existing session store.
    pub fn with_store(config: Arc<Config>, store: SessionStore) -> Result<Self> {
        let theme = Arc::new(Theme::from_config(&config.theme));

        // Initialize services
        let api = ApiClient::new(&config.api)?;
        let auth = AuthGateway::new(api.clone());
        let fetcher = ExplanationFetcher::new(api.clone(), store.clone());
        let history = HistoryGateway::new(api, store.clone());
        let mut session_rx = store.subscribe();
        session_rx.borrow_and_update();

        // Initialize screens
        let mut home_screen = HomeScreen::new(
            theme.clone(),
            Duration::from_secs(config.display.saved_indicator_secs),
        );
        home_screen.set_authenticated(store.is_authenticated());
        let login_screen = LoginScreen::new(theme.clone());
        let mut history_screen = HistoryScreen::new(config.clone(), theme);
        history_screen.set_username(store.user().map(|u| u.username));

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            current_screen: AppScreen::Home,
            should_quit: false,
            store,
            auth,
            fetcher,
            history,
            session_rx,
            home_screen,
            login_screen,
            history_screen,
            events_tx,
            events_rx,
            status_message: String::new(),
        })
    }

    /// Run the application.
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Load initial data
        self.dispatch(ScreenAction::FetchExplanation);

        // Main event loop
        let result = self.event_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    /// Main event loop.
    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            // Draw UI
            terminal.draw(|f| self.draw(f))?;

            // Poll for events with timeout
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key).await;
                }
            }

            while let Ok(completion) = self.events_rx.try_recv() {
                self.handle_event(completion);
            }
            self.sync_session();

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Global key handling, then delegation to the current screen.
    async fn handle_key(&mut self, key: KeyEvent) {
        let on_login = self.current_screen == AppScreen::Login;
        let action = match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (KeyModifiers::CONTROL, KeyCode::Char('q')) => {
                self.should_quit = true;
                ScreenAction::None
            }
            // The login form takes text input, so letter shortcuts stay off there.
            (_, KeyCode::Char('q')) if !on_login => {
                self.should_quit = true;
                ScreenAction::None
            }
            (_, KeyCode::Char('1')) if !on_login => ScreenAction::Navigate(AppScreen::Home),
            (_, KeyCode::Char('2')) if !on_login => ScreenAction::Navigate(AppScreen::History),
            (_, KeyCode::Char('i')) if !on_login && !self.store.is_authenticated() => {
                ScreenAction::Navigate(AppScreen::Login)
            }
            (_, KeyCode::Char('o')) if !on_login && self.store.is_authenticated() => {
                ScreenAction::Logout
            }
            _ => match self.current_screen {
                AppScreen::Home => self.home_screen.handle_key(key).await,
                AppScreen::History => self.history_screen.handle_key(key).await,
                AppScreen::Login => self.login_screen.handle_key(key).await,
            },
        };
        self.dispatch(action);
    }

    /// Carry out a screen action, spawning requests where needed.
    fn dispatch(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::None => {}
            ScreenAction::StatusMessage(msg) => self.status_message = msg,
            ScreenAction::Navigate(screen) => self.navigate(screen),
            ScreenAction::FetchExplanation => {
                self.home_screen.begin_fetch();
                let fetcher = self.fetcher.clone();
                self.spawn(async move { AppEvent::ExplanationLoaded(fetcher.fetch().await) });
            }
            ScreenAction::RetryMain => {
                self.home_screen.begin_fetch();
                let fetcher = self.fetcher.clone();
                self.spawn(async move { AppEvent::ExplanationLoaded(fetcher.retry_main().await) });
            }
            ScreenAction::SaveToHistory {
                concept,
                explanation,
            } => {
                let history = self.history.clone();
                self.spawn(async move {
                    AppEvent::HistorySaved(history.append(&concept, &explanation).await)
                });
            }
            ScreenAction::LoadHistory => {
                if !self.store.is_authenticated() {
                    self.navigate(AppScreen::Login);
                    return;
                }
                self.history_screen.begin_load();
                let history = self.history.clone();
                self.spawn(async move { AppEvent::HistoryLoaded(history.list().await) });
            }
            ScreenAction::SubmitAuth(request) => {
                let auth = self.auth.clone();
                self.spawn(async move {
                    let result = match request {
                        AuthRequest::Login { email, password } => {
                            auth.login(&email, &password).await
                        }
                        AuthRequest::Register {
                            username,
                            email,
                            password,
                        } => auth.register(&username, &email, &password).await,
                    };
                    AppEvent::AuthCompleted(result)
                });
            }
            ScreenAction::Logout => {
                if let Err(e) = self.store.logout() {
                    warn!("{:#}", e);
                }
                self.status_message = "Signed out".to_string();
                if self.current_screen == AppScreen::History {
                    self.current_screen = AppScreen::Home;
                }
            }
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let generation = self.store.generation();
        tokio::spawn(async move {
            let event = task.await;
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(Completion { generation, event });
        });
    }

    fn navigate(&mut self, screen: AppScreen) {
        debug!("Navigate to {:?}", screen);
        match screen {
            AppScreen::History if !self.store.is_authenticated() => {
                self.current_screen = AppScreen::Login;
            }
            AppScreen::History => {
                self.current_screen = AppScreen::History;
                self.dispatch(ScreenAction::LoadHistory);
            }
            other => self.current_screen = other,
        }
    }

    /// Apply a completed background request.
    pub fn handle_event(&mut self, completion: Completion) {
        let Completion { generation, event } = completion;
        // Sign-in results start a session rather than belong to one.
        let stale = generation != self.store.generation()
            && !matches!(event, AppEvent::AuthCompleted(_));
        if stale {
            debug!("Dropping result from a previous session");
            return;
        }

        match event {
            AppEvent::ExplanationLoaded(result) => {
                self.home_screen.set_mode(self.fetcher.mode());
                if let Err(e) = &result {
                    if e.requires_login() {
                        self.expire_session(e);
                    }
                }
                self.home_screen.finish_fetch(result);
            }
            AppEvent::AuthCompleted(Ok(auth)) => {
                let username = auth.user.username.clone();
                if let Err(e) = self.store.login(auth.access_token, auth.user) {
                    warn!("{:#}", e);
                }
                self.login_screen.finish_submit(Ok(()));
                self.status_message = format!("Signed in as {}", username);
                self.current_screen = AppScreen::Home;
            }
            AppEvent::AuthCompleted(Err(e)) => {
                self.login_screen.finish_submit(Err(e));
            }
            AppEvent::HistoryLoaded(result) => match result {
                Err(e) if e.requires_login() => self.expire_session(&e),
                other => self.history_screen.finish_load(other),
            },
            AppEvent::HistorySaved(result) => {
                match &result {
                    Ok(SaveOutcome::Saved) => {
                        self.status_message = "Saved to history".to_string();
                    }
                    Err(e) if e.requires_login() => self.expire_session(e),
                    _ => {}
                }
                self.home_screen.finish_save(result, Instant::now());
            }
        }
    }

    /// Drop the session and send the user to the login form.
    fn expire_session(&mut self, err: &ClientError) {
        warn!("Session no longer valid: {}", err);
        if let Err(e) = self.store.logout() {
            warn!("{:#}", e);
        }
        self.login_screen.set_error(err.user_message());
        self.current_screen = AppScreen::Login;
    }

    /// React to session changes: refresh views and refetch the explanation.
    fn sync_session(&mut self) {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return;
        }
        let session = self.session_rx.borrow_and_update().clone();
        debug!("Session changed, authenticated={}", session.is_authenticated());

        self.home_screen.set_authenticated(session.is_authenticated());
        self.home_screen.reset_save();
        if session.is_authenticated() {
            self.history_screen
                .set_username(session.user().map(|u| u.username.clone()));
        } else {
            self.history_screen.clear();
        }
        self.dispatch(ScreenAction::FetchExplanation);
    }

    /// Draw the UI.
    fn draw(&mut self, f: &mut ratatui::Frame) {
        use ratatui::layout::{Constraint, Direction, Layout};
        use ratatui::style::{Color, Modifier, Style};
        use ratatui::text::{Line, Span};
        use ratatui::widgets::{Block, Borders, Paragraph, Tabs};

        // The login form is shown without navigation.
        if self.current_screen == AppScreen::Login {
            let area = f.area();
            self.login_screen.draw(f, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Navigation
                Constraint::Min(0),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        let nav = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(32)])
            .split(chunks[0]);

        let titles: Vec<Line> = ["1 Home", "2 History"]
            .iter()
            .map(|t| Line::from(*t))
            .collect();
        let selected = match self.current_screen {
            AppScreen::History => 1,
            _ => 0,
        };
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("LearnInFive"))
            .select(selected)
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_widget(tabs, nav[0]);

        let account = match self.store.user() {
            Some(user) => Line::from(vec![
                Span::styled(user.username, Style::default().fg(Color::White)),
                Span::styled("  o Logout", Style::default().fg(Color::Red)),
            ]),
            None => Line::from(Span::styled("i Sign In", Style::default().fg(Color::Cyan))),
        };
        f.render_widget(
            Paragraph::new(account)
                .right_aligned()
                .block(Block::default().borders(Borders::ALL)),
            nav[1],
        );

        // Main content area
        match self.current_screen {
            AppScreen::Home => self.home_screen.draw(f, chunks[1]),
            AppScreen::History => self.history_screen.draw(f, chunks[1]),
            AppScreen::Login => {}
        }

        // Status bar
        let status = Paragraph::new(Line::from(vec![
            Span::raw(" "),
            Span::styled(&self.status_message, Style::default().fg(Color::Gray)),
            Span::raw(" │ "),
            Span::styled("j/k", Style::default().fg(Color::DarkGray)),
            Span::styled(" Nav", Style::default().fg(Color::Gray)),
            Span::raw(" │ "),
            Span::styled("r", Style::default().fg(Color::DarkGray)),
            Span::styled(" Reload", Style::default().fg(Color::Gray)),
            Span::raw(" │ "),
            Span::styled("q", Style::default().fg(Color::DarkGray)),
            Span::styled(" Quit", Style::default().fg(Color::Gray)),
        ]));
        f.render_widget(status, chunks[2]);
    }
}
