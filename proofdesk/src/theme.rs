//! Color theme system for proofdesk.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every UI surface
//! proofdesk renders. Two built-in themes are provided:
//!
//! - `dark` uses ANSI 16 colors (`Color::Reset`, `Color::DarkGray`, etc.) so it
//!   works on any terminal including 256-color SSH sessions with no truecolor support.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB; requires truecolor.

use proofdesk_core::{DecisionType, NoticeLevel};
use ratatui::style::Color;
use tracing::warn;

/// All color values used across proofdesk's UI surfaces.
///
/// Callers use `theme.field` directly inside `Style::default().fg(theme.border_active)`.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Article view
    /// Background of an undecided issue span.
    pub highlight_pending: Color,
    /// Background of the selected issue's span.
    pub highlight_selected: Color,
    pub text_added: Color,
    pub text_removed: Color,
    pub text_context: Color,

    // Decision badges
    pub decision_accepted: Color,
    pub decision_rejected: Color,
    pub decision_modified: Color,
    pub decision_pending: Color,

    // Severity badges
    pub severity_high: Color,
    pub severity_medium: Color,
    pub severity_low: Color,

    // Notifications
    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_warning: Color,
    pub toast_error: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator color when in NORMAL mode.
    pub status_mode_normal: Color,
    /// Mode indicator color when in INSERT mode.
    pub status_mode_insert: Color,

    pub background: Color,
}

impl Theme {
    /// Returns the built-in dark theme using ANSI 16 colors.
    ///
    /// Works on all terminals: 16-color, 256-color, and truecolor.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            highlight_pending: Color::Blue,
            highlight_selected: Color::Magenta,
            text_added: Color::Green,
            text_removed: Color::Red,
            text_context: Color::Reset,

            decision_accepted: Color::Green,
            decision_rejected: Color::Red,
            decision_modified: Color::Yellow,
            decision_pending: Color::DarkGray,

            severity_high: Color::Red,
            severity_medium: Color::Yellow,
            severity_low: Color::Blue,

            toast_info: Color::Cyan,
            toast_success: Color::Green,
            toast_warning: Color::Yellow,
            toast_error: Color::Red,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,

            background: Color::Reset,
        }
    }

    /// Returns the Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let surface2 = Color::Rgb(88, 91, 112); // #585b70
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            highlight_pending: surface2,
            highlight_selected: mauve,
            text_added: green,
            text_removed: red,
            text_context: text,

            decision_accepted: green,
            decision_rejected: red,
            decision_modified: yellow,
            decision_pending: overlay1,

            severity_high: red,
            severity_medium: peach,
            severity_low: blue,

            toast_info: teal,
            toast_success: green,
            toast_warning: yellow,
            toast_error: red,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,

            background: base,
        }
    }

    /// Resolves a theme name string to the corresponding built-in theme.
    ///
    /// Unknown names fall back to `dark()` so a typo in config never prevents
    /// startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }

    pub fn decision(&self, decision: Option<DecisionType>) -> Color {
        match decision {
            Some(DecisionType::Accepted) => self.decision_accepted,
            Some(DecisionType::Rejected) => self.decision_rejected,
            Some(DecisionType::Modified) => self.decision_modified,
            None => self.decision_pending,
        }
    }

    /// Severity labels are free-form on the wire; unknown ones render as low.
    pub fn severity(&self, severity: Option<&str>) -> Color {
        match severity.map(str::to_ascii_lowercase).as_deref() {
            Some("critical" | "high" | "error") => self.severity_high,
            Some("major" | "medium" | "warning") => self.severity_medium,
            _ => self.severity_low,
        }
    }

    pub fn notice(&self, level: NoticeLevel) -> Color {
        match level {
            NoticeLevel::Info => self.toast_info,
            NoticeLevel::Success => self.toast_success,
            NoticeLevel::Warning => self.toast_warning,
            NoticeLevel::Error => self.toast_error,
        }
    }
}
