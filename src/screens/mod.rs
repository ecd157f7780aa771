//! TUI screens.

pub mod history;
pub mod home;
pub mod login;

pub use history::HistoryScreen;
pub use home::HomeScreen;
pub use login::{AuthRequest, LoginScreen};

use async_trait::async_trait;
use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::Frame;

use crate::app::AppScreen;

/// Action returned by screen key handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAction {
    /// No action needed.
    None,
    /// Display a status message.
    StatusMessage(String),
    /// Switch to another screen.
    Navigate(AppScreen),
    /// Fetch an explanation with the current endpoint selection.
    FetchExplanation,
    /// Leave fallback mode and fetch from the main endpoint.
    RetryMain,
    /// Save the shown explanation to history.
    SaveToHistory { concept: String, explanation: String },
    /// Reload the history list.
    LoadHistory,
    /// Submit the sign in / sign up form.
    SubmitAuth(AuthRequest),
    /// Sign out.
    Logout,
}

/// Trait for screen implementations.
#[async_trait]
pub trait Screen {
    /// Draw the screen.
    fn draw(&mut self, f: &mut Frame, area: Rect);

    /// Handle a key event.
    async fn handle_key(&mut self, key: KeyEvent) -> ScreenAction;
}

/// A `width` x `height` rect centred in `area`, clamped to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}
