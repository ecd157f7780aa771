//! Home screen - shows the current concept explanation.

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use ratatui_garnish::{shadow::HalfShadow, GarnishableWidget, Padding};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ClientError;
use crate::models::ConceptExplanation;
use crate::services::{markdown, FetchMode, SaveOutcome, Theme};

use super::{Screen, ScreenAction};

/// Progress of the "save to history" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    /// Request in flight; further saves are ignored.
    Saving,
    /// Saved at the given instant; shown until the indicator window passes.
    Saved(Instant),
    Failed(String),
}

/// Home screen with the explanation card.
pub struct HomeScreen {
    theme: Arc<Theme>,

    explanation: Option<ConceptExplanation>,
    loading: bool,
    error: Option<String>,
    mode: FetchMode,
    authenticated: bool,

    save: SaveState,
    saved_indicator: Duration,
    scroll: u16,
}

impl HomeScreen {
    /// Create a new home screen.
    pub fn new(theme: Arc<Theme>, saved_indicator: Duration) -> Self {
        Self {
            theme,
            explanation: None,
            loading: true,
            error: None,
            mode: FetchMode::Primary,
            authenticated: false,
            save: SaveState::Idle,
            saved_indicator,
            scroll: 0,
        }
    }

    pub fn explanation(&self) -> Option<&ConceptExplanation> {
        self.explanation.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    pub fn set_mode(&mut self, mode: FetchMode) {
        self.mode = mode;
    }

    /// Mark a fetch as started.
    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Apply a completed fetch. The latest completion always wins.
    pub fn finish_fetch(&mut self, result: Result<ConceptExplanation, ClientError>) {
        self.loading = false;
        match result {
            Ok(explanation) => {
                self.explanation = Some(explanation);
                self.error = None;
                self.scroll = 0;
                // A confirmation or failure belongs to the previous explanation.
                if self.save != SaveState::Saving {
                    self.save = SaveState::Idle;
                }
            }
            Err(e) => {
                self.error = Some(e.user_message());
            }
        }
    }

    /// Start a save if one is possible, returning what to save.
    fn begin_save(&mut self) -> Option<(String, String)> {
        if !self.authenticated || self.save == SaveState::Saving {
            return None;
        }
        let explanation = self.explanation.as_ref()?;
        self.save = SaveState::Saving;
        Some((explanation.concept.clone(), explanation.explanation.clone()))
    }

    /// Apply a completed save.
    pub fn finish_save(&mut self, result: Result<SaveOutcome, ClientError>, now: Instant) {
        self.save = match result {
            Ok(SaveOutcome::Saved) => SaveState::Saved(now),
            Ok(SaveOutcome::Skipped) => SaveState::Idle,
            Err(e) => SaveState::Failed(e.user_message()),
        };
    }

    /// Forget any save in progress or on display.
    pub fn reset_save(&mut self) {
        self.save = SaveState::Idle;
    }

    /// Save state as seen at `now`; an expired confirmation reads as idle.
    pub fn save_state(&self, now: Instant) -> SaveState {
        match &self.save {
            SaveState::Saved(at) if now.duration_since(*at) >= self.saved_indicator => {
                SaveState::Idle
            }
            other => other.clone(),
        }
    }

    fn save_label(&self) -> Option<Span<'static>> {
        if !self.authenticated || self.explanation.is_none() {
            return None;
        }
        let span = match self.save_state(Instant::now()) {
            SaveState::Idle => Span::styled("s Save to history", Style::default().fg(self.theme.muted)),
            SaveState::Saving => Span::styled("Saving...", Style::default().fg(self.theme.muted)),
            SaveState::Saved(_) => Span::styled(
                "✓ Saved to history",
                Style::default().fg(self.theme.success),
            ),
            SaveState::Failed(msg) => Span::styled(msg, Style::default().fg(self.theme.error)),
        };
        Some(span)
    }
}

#[async_trait]
impl Screen for HomeScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        let tagline = Paragraph::new(Line::from(Span::styled(
            "Computer Science Concepts Explained Like You're Five",
            Style::default().fg(self.theme.muted),
        )))
        .centered();
        f.render_widget(tagline, header);

        if self.loading && (self.explanation.is_none() || self.error.is_some()) {
            let loading = Paragraph::new("Loading...")
                .style(Style::default().fg(self.theme.accent))
                .centered();
            f.render_widget(loading, super::centered(body, 20, 1));
        } else if let Some(error) = &self.error {
            let lines = vec![
                Line::from(Span::styled(error.clone(), Style::default().fg(self.theme.error))),
                Line::default(),
                Line::from(Span::styled("r Try Again", Style::default().fg(self.theme.muted))),
            ];
            let paragraph = Paragraph::new(lines).centered();
            f.render_widget(paragraph, super::centered(body, body.width, 3));
        } else if let Some(explanation) = &self.explanation {
            let mut title = format!(" {} ", explanation.concept);
            if self.loading {
                title.push_str("(refreshing...) ");
            }
            let block = Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(self.theme.primary)
                        .add_modifier(Modifier::BOLD),
                ))
                .title_alignment(ratatui::layout::Alignment::Center)
                .border_style(Style::default().fg(self.theme.primary));

            let card = Paragraph::new(markdown::render(&explanation.explanation, &self.theme))
                .block(block)
                .style(Style::default().fg(self.theme.foreground))
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0))
                .garnish(Padding::horizontal(1))
                .garnish(HalfShadow::default());
            f.render_widget(card, body);
        }

        let mut spans = Vec::new();
        if self.mode == FetchMode::Fallback {
            spans.push(Span::styled(
                "Using fallback explanations",
                Style::default().fg(self.theme.warning),
            ));
            spans.push(Span::raw("  "));
            spans.push(Span::styled("m Retry main", Style::default().fg(self.theme.muted)));
            spans.push(Span::raw("  │  "));
        }
        if let Some(label) = self.save_label() {
            spans.push(label);
        }
        f.render_widget(Paragraph::new(Line::from(spans)), footer);
    }

    async fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                ScreenAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                ScreenAction::None
            }
            KeyCode::Char('r') => ScreenAction::FetchExplanation,
            KeyCode::Char('m') if self.mode == FetchMode::Fallback => ScreenAction::RetryMain,
            KeyCode::Char('s') if !self.authenticated => {
                ScreenAction::StatusMessage("Sign in to save explanations".to_string())
            }
            KeyCode::Char('s') => match self.begin_save() {
                Some((concept, explanation)) => ScreenAction::SaveToHistory {
                    concept,
                    explanation,
                },
                None => ScreenAction::None,
            },
            _ => ScreenAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn screen() -> HomeScreen {
        HomeScreen::new(Arc::new(Theme::default()), Duration::from_secs(3))
    }

    fn loaded(concept: &str) -> ConceptExplanation {
        ConceptExplanation {
            concept: concept.to_string(),
            explanation: "text".to_string(),
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_success_replaces_explanation_and_clears_error() {
        let mut home = screen();
        home.finish_fetch(Err(ClientError::Fetch("HTTP 500".to_string())));
        assert!(home.error().is_some());

        home.finish_fetch(Ok(loaded("Recursion")));
        home.finish_fetch(Ok(loaded("Queues")));
        assert_eq!(home.explanation().unwrap().concept, "Queues");
        assert!(home.error().is_none());
        assert!(!home.is_loading());
    }

    #[test]
    fn test_saved_indicator_expires_after_window() {
        let mut home = screen();
        let t0 = Instant::now();
        home.finish_save(Ok(SaveOutcome::Saved), t0);

        assert_eq!(home.save_state(t0 + Duration::from_millis(2999)), SaveState::Saved(t0));
        assert_eq!(home.save_state(t0 + Duration::from_secs(3)), SaveState::Idle);
    }

    #[test]
    fn test_new_explanation_clears_save_result() {
        let mut home = screen();
        let t0 = Instant::now();
        home.finish_save(Ok(SaveOutcome::Saved), t0);
        home.finish_fetch(Ok(loaded("Queues")));
        assert_eq!(home.save_state(t0), SaveState::Idle);

        home.finish_save(Err(ClientError::Fetch("Failed to save: 500".to_string())), t0);
        home.finish_fetch(Ok(loaded("Stacks")));
        assert_eq!(home.save_state(t0), SaveState::Idle);
    }

    #[tokio::test]
    async fn test_fetch_keeps_save_in_flight() {
        let mut home = screen();
        home.set_authenticated(true);
        home.finish_fetch(Ok(loaded("Recursion")));
        home.handle_key(key('s')).await;

        home.finish_fetch(Ok(loaded("Queues")));
        assert_eq!(home.save_state(Instant::now()), SaveState::Saving);

        home.reset_save();
        assert_eq!(home.save_state(Instant::now()), SaveState::Idle);
    }

    #[test]
    fn test_skipped_save_is_idle() {
        let mut home = screen();
        home.finish_save(Ok(SaveOutcome::Skipped), Instant::now());
        assert_eq!(home.save_state(Instant::now()), SaveState::Idle);
    }

    #[tokio::test]
    async fn test_save_requires_session_and_explanation() {
        let mut home = screen();
        assert_eq!(home.handle_key(key('s')).await, ScreenAction::None);

        home.set_authenticated(false);
        home.finish_fetch(Ok(loaded("Recursion")));
        assert!(matches!(
            home.handle_key(key('s')).await,
            ScreenAction::StatusMessage(_)
        ));

        home.set_authenticated(true);
        assert_eq!(
            home.handle_key(key('s')).await,
            ScreenAction::SaveToHistory {
                concept: "Recursion".to_string(),
                explanation: "text".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_save_disabled_while_in_flight() {
        let mut home = screen();
        home.set_authenticated(true);
        home.finish_fetch(Ok(loaded("Recursion")));

        assert!(matches!(
            home.handle_key(key('s')).await,
            ScreenAction::SaveToHistory { .. }
        ));
        assert_eq!(home.handle_key(key('s')).await, ScreenAction::None);

        home.finish_save(Ok(SaveOutcome::Saved), Instant::now());
        assert!(matches!(
            home.handle_key(key('s')).await,
            ScreenAction::SaveToHistory { .. }
        ));
    }

    #[tokio::test]
    async fn test_retry_main_only_in_fallback() {
        let mut home = screen();
        assert_eq!(home.handle_key(key('m')).await, ScreenAction::None);
        home.set_mode(FetchMode::Fallback);
        assert_eq!(home.handle_key(key('m')).await, ScreenAction::RetryMain);
    }
}
