//! Login screen - sign in or create an account.

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use ratatui_garnish::{shadow::HalfShadow, GarnishableWidget, Padding};
use std::sync::Arc;

use crate::app::AppScreen;
use crate::error::ClientError;
use crate::services::Theme;

use super::{Screen, ScreenAction};

/// Form submission, ready for the auth gateway.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Login {
        email: String,
        password: String,
    },
    Register {
        username: String,
        email: String,
        password: String,
    },
}

// Keep passwords out of debug output and logs.
impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthRequest::Login { email, .. } => f
                .debug_struct("Login")
                .field("email", email)
                .finish_non_exhaustive(),
            AuthRequest::Register {
                username, email, ..
            } => f
                .debug_struct("Register")
                .field("username", username)
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Email,
    Password,
}

/// Sign in / sign up form.
pub struct LoginScreen {
    theme: Arc<Theme>,

    mode: Mode,
    focus: Field,
    username: String,
    email: String,
    password: String,

    error: Option<String>,
    submitting: bool,
}

impl LoginScreen {
    /// Create a new login screen in sign-in mode.
    pub fn new(theme: Arc<Theme>) -> Self {
        Self {
            theme,
            mode: Mode::SignIn,
            focus: Field::Email,
            username: String::new(),
            email: String::new(),
            password: String::new(),
            error: None,
            submitting: false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Show a message above the form, e.g. after a redirect.
    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Apply the outcome of a submission. The form is cleared on success.
    pub fn finish_submit(&mut self, result: Result<(), ClientError>) {
        self.submitting = false;
        match result {
            Ok(()) => self.clear(),
            Err(e) => self.error = Some(e.user_message()),
        }
    }

    fn clear(&mut self) {
        self.username.clear();
        self.email.clear();
        self.password.clear();
        self.error = None;
        self.focus = self.fields()[0];
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::SignIn => Mode::SignUp,
            Mode::SignUp => Mode::SignIn,
        };
        self.clear();
    }

    fn fields(&self) -> &'static [Field] {
        match self.mode {
            Mode::SignIn => &[Field::Email, Field::Password],
            Mode::SignUp => &[Field::Username, Field::Email, Field::Password],
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let fields = self.fields();
        let index = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (index + 1) % fields.len()
        } else {
            (index + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    fn focused_value(&mut self) -> &mut String {
        match self.focus {
            Field::Username => &mut self.username,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    fn submit(&mut self) -> ScreenAction {
        if self.submitting {
            return ScreenAction::None;
        }
        self.submitting = true;
        self.error = None;
        let request = match self.mode {
            Mode::SignIn => AuthRequest::Login {
                email: self.email.trim().to_string(),
                password: self.password.clone(),
            },
            Mode::SignUp => AuthRequest::Register {
                username: self.username.trim().to_string(),
                email: self.email.trim().to_string(),
                password: self.password.clone(),
            },
        };
        ScreenAction::SubmitAuth(request)
    }

    fn field_line(&self, field: Field) -> Line<'static> {
        let (label, value) = match field {
            Field::Username => ("Username", self.username.clone()),
            Field::Email => ("Email   ", self.email.clone()),
            Field::Password => ("Password", "•".repeat(self.password.chars().count())),
        };
        let focused = self.focus == field;
        let label_style = if focused {
            Style::default()
                .fg(self.theme.primary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let cursor = if focused { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!("{}  ", label), label_style),
            Span::styled(value, Style::default().fg(self.theme.foreground)),
            Span::styled(cursor, Style::default().fg(self.theme.accent)),
        ])
    }
}

#[async_trait]
impl Screen for LoginScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let (title, greeting, button, busy, switch) = match self.mode {
            Mode::SignIn => (
                " Sign In ",
                "Welcome back!",
                "Enter Sign In",
                "Signing In...",
                "Don't have an account? Ctrl+T Sign up",
            ),
            Mode::SignUp => (
                " Sign Up ",
                "Join our learning community",
                "Enter Create Account",
                "Creating Account...",
                "Already have an account? Ctrl+T Sign in",
            ),
        };

        let mut lines = vec![
            Line::from(Span::styled(greeting, Style::default().fg(self.theme.muted))),
            Line::default(),
        ];
        for field in self.fields() {
            lines.push(self.field_line(*field));
            lines.push(Line::default());
        }
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(self.theme.error),
            )));
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            if self.submitting { busy } else { button },
            Style::default()
                .fg(self.theme.primary)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(switch, Style::default().fg(self.theme.muted))));
        lines.push(Line::from(Span::styled(
            "Tab Next field  Esc Back",
            Style::default().fg(self.theme.muted),
        )));

        let height = lines.len() as u16 + 2;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.theme.primary)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(self.theme.primary));

        let form = Paragraph::new(lines)
            .block(block)
            .garnish(Padding::horizontal(1))
            .garnish(HalfShadow::default());
        f.render_widget(form, super::centered(area, 56, height));
    }

    async fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('t')) => {
                self.toggle_mode();
                ScreenAction::None
            }
            (_, KeyCode::Esc) => ScreenAction::Navigate(AppScreen::Home),
            (_, KeyCode::Tab) | (_, KeyCode::Down) => {
                self.move_focus(true);
                ScreenAction::None
            }
            (_, KeyCode::BackTab) | (_, KeyCode::Up) => {
                self.move_focus(false);
                ScreenAction::None
            }
            (_, KeyCode::Enter) => self.submit(),
            (_, KeyCode::Backspace) => {
                self.focused_value().pop();
                self.error = None;
                ScreenAction::None
            }
            (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
                self.focused_value().push(c);
                self.error = None;
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> LoginScreen {
        LoginScreen::new(Arc::new(Theme::default()))
    }

    async fn type_str(screen: &mut LoginScreen, text: &str) {
        for c in text.chars() {
            screen
                .handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                .await;
        }
    }

    async fn press(screen: &mut LoginScreen, code: KeyCode) -> ScreenAction {
        screen.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).await
    }

    #[tokio::test]
    async fn test_sign_in_submission() {
        let mut login = screen();
        type_str(&mut login, "ada@example.com").await;
        press(&mut login, KeyCode::Tab).await;
        type_str(&mut login, "secret").await;

        let action = press(&mut login, KeyCode::Enter).await;
        assert_eq!(
            action,
            ScreenAction::SubmitAuth(AuthRequest::Login {
                email: "ada@example.com".to_string(),
                password: "secret".to_string(),
            })
        );
        assert!(login.is_submitting());

        // Disabled while the request is in flight.
        assert_eq!(press(&mut login, KeyCode::Enter).await, ScreenAction::None);
    }

    #[tokio::test]
    async fn test_sign_up_includes_username() {
        let mut login = screen();
        login
            .handle_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL))
            .await;
        type_str(&mut login, "ada").await;
        press(&mut login, KeyCode::Tab).await;
        type_str(&mut login, "ada@example.com").await;
        press(&mut login, KeyCode::Tab).await;
        type_str(&mut login, "pw").await;

        assert_eq!(
            press(&mut login, KeyCode::Enter).await,
            ScreenAction::SubmitAuth(AuthRequest::Register {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_error_cleared_on_edit() {
        let mut login = screen();
        press(&mut login, KeyCode::Enter).await;
        login.finish_submit(Err(ClientError::Authentication(
            "Incorrect email or password".to_string(),
        )));
        assert_eq!(login.error(), Some("Incorrect email or password"));
        assert!(!login.is_submitting());

        type_str(&mut login, "a").await;
        assert!(login.error().is_none());
    }

    #[tokio::test]
    async fn test_toggle_mode_clears_form() {
        let mut login = screen();
        type_str(&mut login, "ada@example.com").await;
        login.set_error("boom".to_string());
        login
            .handle_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL))
            .await;
        assert!(login.error().is_none());
        assert!(login.email.is_empty());
        assert_eq!(login.focus, Field::Username);
    }

    #[test]
    fn test_debug_hides_password() {
        let request = AuthRequest::Login {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", request).contains("hunter2"));
    }
}
