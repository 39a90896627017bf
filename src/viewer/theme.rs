//! Gruvbox colour themes.

use ratatui::style::Color;

/// Viewer theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Gruvbox dark.
    #[default]
    GruvboxDark,
    /// Gruvbox light.
    GruvboxLight,
}

impl Theme {
    /// Next theme in the cycle.
    pub fn next(self) -> Self {
        match self {
            Theme::GruvboxDark => Theme::GruvboxLight,
            Theme::GruvboxLight => Theme::GruvboxDark,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Theme::GruvboxDark => "Gruvbox Dark",
            Theme::GruvboxLight => "Gruvbox Light",
        }
    }
}

/// Colours used by the viewer.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Background.
    pub bg0: Color,
    /// Raised background (status line).
    pub bg1: Color,
    /// Borders.
    pub bg2: Color,
    /// Text.
    pub fg0: Color,
    /// Dimmed text, missing values.
    pub gray: Color,
    /// Titles and cursor.
    pub yellow: Color,
    /// Labels.
    pub green: Color,
    /// Axis names.
    pub aqua: Color,
    /// Regions.
    pub orange: Color,
    /// Errors.
    pub red: Color,
}

impl ThemeColors {
    /// Palette of a theme.
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::GruvboxDark => Self {
                bg0: Color::Rgb(40, 40, 40),
                bg1: Color::Rgb(60, 56, 54),
                bg2: Color::Rgb(102, 92, 84),
                fg0: Color::Rgb(235, 219, 178),
                gray: Color::Rgb(146, 131, 116),
                yellow: Color::Rgb(250, 189, 47),
                green: Color::Rgb(184, 187, 38),
                aqua: Color::Rgb(142, 192, 124),
                orange: Color::Rgb(254, 128, 25),
                red: Color::Rgb(251, 73, 52),
            },
            Theme::GruvboxLight => Self {
                bg0: Color::Rgb(251, 241, 199),
                bg1: Color::Rgb(235, 219, 178),
                bg2: Color::Rgb(213, 196, 161),
                fg0: Color::Rgb(60, 56, 54),
                gray: Color::Rgb(124, 111, 100),
                yellow: Color::Rgb(181, 118, 20),
                green: Color::Rgb(121, 116, 14),
                aqua: Color::Rgb(66, 123, 88),
                orange: Color::Rgb(175, 58, 3),
                red: Color::Rgb(157, 0, 6),
            },
        }
    }
}
