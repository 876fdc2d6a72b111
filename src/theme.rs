//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Style;
use ratatui::style::Color;
use samegametui::TokenColor;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark token colours, indexed by [`TokenColor::index`].
const ONEDARK_TOKENS: [Color; 5] = [
    Color::Rgb(0xC6, 0x78, 0xDD), // purple
    Color::Rgb(0x56, 0xB6, 0xC2), // cyan
    Color::Rgb(0x98, 0xC3, 0x79), // green
    Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
    Color::Rgb(0xE0, 0x6C, 0x75), // red
];

/// Token and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Token colours, one per [`TokenColor`].
    pub tokens: [Color; 5],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, help).
    pub main_fg: Color,
    /// Titles and labels.
    pub title: Color,
    /// Empty-cell dots and secondary text.
    pub inactive_fg: Color,
    /// Cursor background.
    pub selected_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    pub const fn onedark_default() -> Self {
        Self {
            tokens: ONEDARK_TOKENS,
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            selected_bg: Color::Rgb(0x2C, 0x31, 0x3C),
        }
    }

    /// Load a btop-style theme file, then apply `style`. No path, or a path that
    /// does not exist, gives the One Dark defaults.
    pub fn load(path: Option<&Path>, style: Style) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_style(style)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_style(style);
        log::debug!("loaded theme {} ({} keys)", path.display(), map.len());
        Ok(theme)
    }

    pub fn default_for_style(style: Style) -> Self {
        let mut t = Self::onedark_default();
        t.apply_style(style);
        t
    }

    /// Override token colours for high-contrast or colorblind play.
    pub fn apply_style(&mut self, style: Style) {
        match style {
            Style::Normal => {}
            Style::HighContrast => {
                self.tokens = [
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                ];
            }
            Style::Colorblind => {
                // Tol's vibrant set: separable without red/green cues.
                self.tokens = [
                    Color::Rgb(0xEE, 0x33, 0x77),
                    Color::Rgb(0x33, 0xBB, 0xEE),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0xCC, 0x33, 0x11),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        Self {
            tokens: [
                get("net_box").unwrap_or(d.tokens[0]),
                get("hi_fg")
                    .or_else(|| get("proc_misc"))
                    .unwrap_or(d.tokens[1]),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or(d.tokens[2]),
                get("cpu_mid").or_else(|| get("title")).unwrap_or(d.tokens[3]),
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or(d.tokens[4]),
            ],
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            selected_bg: get("selected_bg").unwrap_or(d.selected_bg),
        }
    }

    #[inline]
    pub fn token_color(&self, color: TokenColor) -> Color {
        self.tokens[color.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = match hex.len() {
        6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?),
        3 => (
            channel(&hex[0..1])? * 17,
            channel(&hex[1..2])? * 17,
            channel(&hex[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GGGGGG"), Err(ThemeError::InvalidHex(_))));
        // Multi-byte input must not panic on slicing.
        assert!(parse_hex("#€aaa").is_err());
    }

    #[test]
    fn test_parse_theme_lines() {
        let map = parse_theme_file(
            r##"
# comment
theme[meter_bg]="#31353F"
theme[hi_fg]='#00FFFF'
theme[empty]=""
not a theme line
"##,
        );
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
        assert_eq!(map.get("hi_fg"), Some(&"#00FFFF".to_string()));
        assert!(!map.contains_key("empty"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_from_map_overrides_and_falls_back() {
        let map = parse_theme_file(r##"theme[hi_fg]="#010203""##);
        let theme = Theme::from_map(&map);
        assert_eq!(theme.token_color(TokenColor::Cyan), Color::Rgb(1, 2, 3));
        assert_eq!(theme.token_color(TokenColor::Red), ONEDARK_TOKENS[4]);
        assert_eq!(theme.bg, Theme::default().bg);
    }

    #[test]
    fn test_missing_file_uses_style_defaults() {
        let theme = Theme::load(
            Some(Path::new("/definitely/not/here.theme")),
            Style::HighContrast,
        )
        .unwrap();
        assert_eq!(theme.token_color(TokenColor::Red), Color::Rgb(0xFF, 0, 0));
    }
}
