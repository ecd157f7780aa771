//! History screen - browse saved explanations.

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use ratatui_garnish::{shadow::HalfShadow, GarnishableStatefulWidget, GarnishableWidget, Padding};
use std::sync::Arc;

use crate::app::AppScreen;
use crate::config::Config;
use crate::error::ClientError;
use crate::models::{HistoryEntry, HistoryResponse, OpaqueId};
use crate::services::{markdown, Theme};

use super::{Screen, ScreenAction};

/// History screen listing the user's saved explanations.
pub struct HistoryScreen {
    config: Arc<Config>,
    theme: Arc<Theme>,

    // UI state
    list_state: ListState,
    expanded: Option<OpaqueId>,
    loading: bool,
    error: Option<String>,

    // Cached data, in server order
    entries: Vec<HistoryEntry>,
    username: Option<String>,
}

impl HistoryScreen {
    /// Create a new history screen.
    pub fn new(config: Arc<Config>, theme: Arc<Theme>) -> Self {
        Self {
            config,
            theme,
            list_state: ListState::default(),
            expanded: None,
            loading: false,
            error: None,
            entries: Vec::new(),
            username: None,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    /// Mark a load as started.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Apply a completed load.
    pub fn finish_load(&mut self, result: Result<HistoryResponse, ClientError>) {
        self.loading = false;
        match result {
            Ok(history) => {
                self.entries = history.entries;
                self.error = None;
                self.list_state.select(if self.entries.is_empty() {
                    None
                } else {
                    Some(0)
                });
                if let Some(id) = &self.expanded {
                    if !self.entries.iter().any(|e| &e.id == id) {
                        self.expanded = None;
                    }
                }
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
    }

    /// Forget cached entries, e.g. after sign-out.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.expanded = None;
        self.loading = false;
        self.error = None;
        self.list_state.select(None);
        self.username = None;
    }

    fn selected(&self) -> Option<&HistoryEntry> {
        self.list_state.selected().and_then(|i| self.entries.get(i))
    }

    /// Expand the selected entry, or collapse it if already expanded.
    fn toggle_expanded(&mut self) {
        let Some(id) = self.selected().map(|e| e.id.clone()) else {
            return;
        };
        self.expanded = if self.expanded.as_ref() == Some(&id) {
            None
        } else {
            Some(id)
        };
    }

    fn move_up(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            let new_index = if selected == 0 {
                self.entries.len().saturating_sub(1)
            } else {
                selected - 1
            };
            self.list_state.select(Some(new_index));
        }
    }

    fn move_down(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            let new_index = if selected >= self.entries.len().saturating_sub(1) {
                0
            } else {
                selected + 1
            };
            self.list_state.select(Some(new_index));
        }
    }

    fn draw_message(&self, f: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
        let height = lines.len() as u16;
        let paragraph = Paragraph::new(lines).centered();
        f.render_widget(paragraph, super::centered(area, area.width, height));
    }
}

#[async_trait]
impl Screen for HistoryScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let [header, body] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(area);

        let mut greeting = vec![Span::styled(
            "Learning History",
            Style::default()
                .fg(self.theme.primary)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(username) = &self.username {
            greeting.push(Span::styled(
                format!("  Welcome back, {}! Here are your past explanations.", username),
                Style::default().fg(self.theme.muted),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(greeting)), header);

        if self.loading && self.entries.is_empty() {
            let loading = vec![Line::from(Span::styled(
                "Loading...",
                Style::default().fg(self.theme.accent),
            ))];
            self.draw_message(f, body, loading);
            return;
        }

        if let Some(error) = &self.error {
            let lines = vec![
                Line::from(Span::styled(error.clone(), Style::default().fg(self.theme.error))),
                Line::default(),
                Line::from(Span::styled("r Try Again", Style::default().fg(self.theme.muted))),
            ];
            self.draw_message(f, body, lines);
            return;
        }

        if self.entries.is_empty() {
            let lines = vec![
                Line::from(Span::styled(
                    "No History Yet",
                    Style::default().fg(self.theme.foreground).add_modifier(Modifier::BOLD),
                )),
                Line::default(),
                Line::from(Span::styled(
                    "Start learning and your explanations will appear here!",
                    Style::default().fg(self.theme.muted),
                )),
                Line::from(Span::styled(
                    "Esc Get your first explanation",
                    Style::default().fg(self.theme.muted),
                )),
            ];
            self.draw_message(f, body, lines);
            return;
        }

        let chunks = if self.expanded.is_some() {
            Layout::vertical([Constraint::Percentage(40), Constraint::Percentage(60)]).split(body)
        } else {
            Layout::vertical([Constraint::Percentage(100)]).split(body)
        };

        let date_format = &self.config.display.date_format;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let marker = if self.expanded.as_ref() == Some(&entry.id) {
                    "▾ "
                } else {
                    "▸ "
                };
                ListItem::new(Line::from(vec![
                    Span::raw(marker),
                    Span::styled(
                        entry.concept.clone(),
                        Style::default().fg(self.theme.heading[0]).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        entry.created_at_display(date_format),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(
                        "You have learned about {} concepts so far!",
                        self.entries.len()
                    ))
                    .border_style(Style::default().fg(self.theme.primary)),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.muted)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("► ");
        let garnished = GarnishableStatefulWidget::garnish(list, HalfShadow::default());
        f.render_stateful_widget(garnished, chunks[0], &mut self.list_state);

        if let Some(entry) = self
            .expanded
            .as_ref()
            .and_then(|id| self.entries.iter().find(|e| &e.id == id))
        {
            let detail = Paragraph::new(markdown::render(&entry.explanation, &self.theme))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} ", entry.concept)),
                )
                .wrap(Wrap { trim: false })
                .garnish(Padding::horizontal(1))
                .garnish(HalfShadow::default());
            f.render_widget(detail, chunks[1]);
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_up();
                ScreenAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_down();
                ScreenAction::None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.toggle_expanded();
                ScreenAction::None
            }
            KeyCode::Char('r') => ScreenAction::LoadHistory,
            KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
                ScreenAction::Navigate(AppScreen::Home)
            }
            _ => ScreenAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn screen() -> HistoryScreen {
        HistoryScreen::new(Arc::new(Config::default()), Arc::new(Theme::default()))
    }

    fn response(ids: &[&str]) -> HistoryResponse {
        HistoryResponse {
            entries: ids
                .iter()
                .map(|id| HistoryEntry {
                    id: OpaqueId::new(*id),
                    concept: format!("Concept {}", id),
                    explanation: "text".to_string(),
                    created_at: "2025-01-01T00:00:00Z".to_string(),
                    user_id: OpaqueId::new("u-1"),
                })
                .collect(),
            total: ids.len() as u64,
        }
    }

    async fn press(screen: &mut HistoryScreen, code: KeyCode) -> ScreenAction {
        screen.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).await
    }

    #[test]
    fn test_keeps_server_order() {
        let mut history = screen();
        history.finish_load(Ok(response(&["z", "a", "m"])));
        let ids: Vec<_> = history.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_one_entry_expanded_at_a_time() {
        let mut history = screen();
        history.finish_load(Ok(response(&["a", "b"])));

        press(&mut history, KeyCode::Enter).await;
        assert_eq!(history.expanded, Some(OpaqueId::new("a")));

        press(&mut history, KeyCode::Down).await;
        press(&mut history, KeyCode::Enter).await;
        assert_eq!(history.expanded, Some(OpaqueId::new("b")));

        press(&mut history, KeyCode::Enter).await;
        assert_eq!(history.expanded, None);
    }

    #[test]
    fn test_error_keeps_entries_and_shows_message() {
        let mut history = screen();
        history.finish_load(Ok(response(&["a"])));
        history.finish_load(Err(ClientError::Fetch("Failed to fetch history: 500".to_string())));
        assert_eq!(history.error(), Some("Failed to fetch history: 500"));
        assert_eq!(history.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_key_reloads() {
        let mut history = screen();
        assert_eq!(press(&mut history, KeyCode::Char('r')).await, ScreenAction::LoadHistory);
    }
}
