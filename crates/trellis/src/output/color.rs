//! Color and styling helpers for CLI output.
//!
//! Lanes cycle through a fixed palette so a line of history keeps one color
//! from its tip down to where it joins another lane. Branch labels are bold,
//! bookkeeping (levels, counts) is dimmed.

use colored::{Color, Colorize};

use super::OutputConfig;

/// Colors assigned to lanes, in lane order.
const LANE_PALETTE: [Color; 6] = [
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Red,
];

/// The palette color of `lane`.
pub(crate) fn lane_color(lane: usize) -> Color {
    LANE_PALETTE[lane % LANE_PALETTE.len()]
}

/// Paint `text` in the color of `lane`.
pub(crate) fn in_lane(text: &str, lane: usize, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.color(lane_color(lane)).to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Apply dimmed style to text.
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text.
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> OutputConfig {
        OutputConfig { use_colors: false }
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(lane_color(0), lane_color(LANE_PALETTE.len()));
        assert_ne!(lane_color(0), lane_color(1));
    }

    #[test]
    fn no_color_leaves_text_untouched() {
        let config = plain();
        assert_eq!(in_lane("*", 3, &config), "*");
        assert_eq!(bold("main", &config), "main");
        assert_eq!(dimmed("12", &config), "12");
        assert_eq!(warning("stale", &config), "stale");
        assert_eq!(info("ok", &config), "ok");
    }
}
