//! Colour mapping for heatmaps.

use ratatui::style::Color;

/// Colour palette for heatmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPalette {
    /// Viridis (perceptually uniform).
    #[default]
    Viridis,
    /// Plasma (perceptually uniform).
    Plasma,
    /// Rainbow, blue to red.
    Rainbow,
    /// Diverging blue-white-red.
    BlueRed,
}

impl ColorPalette {
    /// Next palette in the cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Viridis => Self::Plasma,
            Self::Plasma => Self::Rainbow,
            Self::Rainbow => Self::BlueRed,
            Self::BlueRed => Self::Viridis,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Viridis => "Viridis",
            Self::Plasma => "Plasma",
            Self::Rainbow => "Rainbow",
            Self::BlueRed => "Blue-Red",
        }
    }

    /// Colour of a normalised value; `t` is clamped to `[0, 1]`.
    pub fn color(self, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Viridis => two_segment(t, [68.0, 1.0, 84.0], [33.0, 104.0, 109.0], [253.0, 231.0, 37.0]),
            Self::Plasma => two_segment(t, [13.0, 8.0, 135.0], [180.0, 54.0, 121.0], [240.0, 175.0, 12.0]),
            Self::Rainbow => rainbow(t),
            Self::BlueRed => two_segment(t, [0.0, 0.0, 255.0], [255.0, 255.0, 255.0], [255.0, 0.0, 0.0]),
        }
    }
}

/// Piecewise linear ramp `low -> mid -> high`.
fn two_segment(t: f64, low: [f64; 3], mid: [f64; 3], high: [f64; 3]) -> Color {
    let (from, to, s) = if t < 0.5 {
        (low, mid, t * 2.0)
    } else {
        (mid, high, (t - 0.5) * 2.0)
    };
    let channel = |i: usize| (from[i] + s * (to[i] - from[i])).round() as u8;
    Color::Rgb(channel(0), channel(1), channel(2))
}

/// HSV hue sweep from 240 degrees (blue) down to 0 (red).
fn rainbow(t: f64) -> Color {
    let h = (1.0 - t) * 240.0;
    let x = 1.0 - ((h / 60.0) % 2.0 - 1.0).abs();
    let (r, g, b) = match h {
        h if h < 60.0 => (1.0, x, 0.0),
        h if h < 120.0 => (x, 1.0, 0.0),
        h if h < 180.0 => (0.0, 1.0, x),
        _ => (0.0, x, 1.0),
    };
    Color::Rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_clamping() {
        assert_eq!(ColorPalette::Viridis.color(0.0), Color::Rgb(68, 1, 84));
        assert_eq!(ColorPalette::Viridis.color(7.0), Color::Rgb(253, 231, 37));
        assert_eq!(ColorPalette::BlueRed.color(0.5), Color::Rgb(255, 255, 255));
        assert_eq!(ColorPalette::Rainbow.color(0.0), Color::Rgb(0, 0, 255));
        assert_eq!(ColorPalette::Rainbow.color(1.0), Color::Rgb(255, 0, 0));
        assert_eq!(ColorPalette::Plasma.color(f64::NAN), Color::Rgb(13, 8, 135));
    }

    #[test]
    fn cycle_returns_to_start() {
        let mut p = ColorPalette::default();
        for _ in 0..4 {
            p = p.next();
        }
        assert_eq!(p, ColorPalette::Viridis);
    }
}
