//! Colour palette.

use ratatui::style::Color;

use crate::config::ThemeConfig;

/// Theme with ratatui colors.
#[derive(Debug, Clone)]
pub struct Theme {
    pub foreground: Color,
    pub muted: Color,
    pub primary: Color,
    pub accent: Color,
    pub heading: [Color; 3],
    pub error: Color,
    pub success: Color,
    pub warning: Color,
    pub code: Color,
    pub code_block: Color,
}

impl Theme {
    /// Build the theme, applying any hex overrides from the config.
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut theme = Self::default();
        if let Some(hex) = &config.primary {
            theme.primary = parse_hex(hex).unwrap_or(theme.primary);
        }
        if let Some(hex) = &config.accent {
            theme.accent = parse_hex(hex).unwrap_or(theme.accent);
        }
        if let Some(hex) = &config.error {
            theme.error = parse_hex(hex).unwrap_or(theme.error);
        }
        theme
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            muted: Color::DarkGray,
            primary: Color::Rgb(37, 99, 235),
            accent: Color::Cyan,
            heading: [
                Color::Rgb(29, 78, 216),
                Color::Rgb(37, 99, 235),
                Color::Rgb(59, 130, 246),
            ],
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            code: Color::Rgb(219, 39, 119),
            code_block: Color::Gray,
        }
    }
}

/// Parse a hex color string like "#RRGGBB" to a ratatui Color.
fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(parse_hex("ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#gg0000"), None);
        assert_eq!(parse_hex("+f+f+f"), None);
    }

    #[test]
    fn test_non_ascii_override_keeps_default() {
        // Six bytes, but not six hex digits.
        let config = ThemeConfig {
            primary: Some("#aé123".to_string()),
            accent: None,
            error: None,
        };
        let theme = Theme::from_config(&config);
        assert_eq!(theme.primary, Theme::default().primary);
    }

    #[test]
    fn test_invalid_override_keeps_default() {
        let config = ThemeConfig {
            primary: Some("not-a-colour".to_string()),
            accent: Some("#000000".to_string()),
            error: None,
        };
        let theme = Theme::from_config(&config);
        assert_eq!(theme.primary, Theme::default().primary);
        assert_eq!(theme.accent, Color::Rgb(0, 0, 0));
    }
}
