//! Colour themes.
//!
//! Two built-ins:
//!
//! - `dark` uses the ANSI 16 colours so it works on any terminal, including
//!   256-colour SSH sessions.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB and needs a
//!   truecolor terminal.

use ratatui::style::Color;
use tracing::warn;

/// Every colour the UI draws with. Callers use the fields directly, e.g.
/// `Style::default().fg(theme.border_active)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub border_active: Color,
    pub border_inactive: Color,

    /// Text of removed lines on the left pane.
    pub diff_removed: Color,
    pub diff_removed_bg: Color,
    /// Text of added lines on the right pane.
    pub diff_added: Color,
    pub diff_added_bg: Color,
    /// Rows that exist only on the other side.
    pub diff_filler: Color,
    pub diff_context: Color,
    pub line_number: Color,
    /// Background of the cursor row in both panes.
    pub cursor_bg: Color,

    pub file_added: Color,
    pub file_removed: Color,
    pub file_modified: Color,
    pub file_renamed: Color,
    pub directory: Color,

    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_notice: Color,
    pub status_mode: Color,
}

impl Theme {
    /// The default theme.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_removed: Color::Red,
            diff_removed_bg: Color::Reset,
            diff_added: Color::Green,
            diff_added_bg: Color::Reset,
            diff_filler: Color::DarkGray,
            diff_context: Color::Reset,
            line_number: Color::DarkGray,
            cursor_bg: Color::DarkGray,

            file_added: Color::Green,
            file_removed: Color::Red,
            file_modified: Color::Yellow,
            file_renamed: Color::Cyan,
            directory: Color::Blue,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_notice: Color::Yellow,
            status_mode: Color::Cyan,
        }
    }

    /// Catppuccin Mocha, <https://github.com/catppuccin/catppuccin>.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_removed: red,
            diff_removed_bg: Color::Rgb(67, 41, 57),
            diff_added: green,
            diff_added_bg: Color::Rgb(43, 58, 50),
            diff_filler: surface1,
            diff_context: text,
            line_number: overlay1,
            cursor_bg: surface0,

            file_added: green,
            file_removed: red,
            file_modified: yellow,
            file_renamed: teal,
            directory: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_notice: peach,
            status_mode: lavender,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark`
    /// so a typo never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                warn!(theme = other, "unknown theme, falling back to dark");
                Self::dark()
            }
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_spellings_select_catppuccin() {
        assert_eq!(Theme::from_name("catppuccin-mocha"), Theme::catppuccin_mocha());
        assert_eq!(Theme::from_name("catppuccin_mocha"), Theme::catppuccin_mocha());
    }

    #[test]
    fn unknown_name_falls_back_to_dark() {
        assert_eq!(Theme::from_name("solarized"), Theme::dark());
        assert_eq!(Theme::default(), Theme::dark());
    }
}
