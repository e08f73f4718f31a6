//! The markup convention cell text carries from this crate to the
//! renderer collaborator (spec.md §1: "a 'renderer' capability
//! (cells-to-screen); their internals are not specified here").
//!
//! Styled cells are plain `String`s (matching `fleet_model::Row::cells`)
//! carrying small bracket tags the renderer is expected to strip and
//! interpret, the same division of labor a templating engine has with
//! its eventual HTML/terminal consumer. Unstyled text passes through
//! unchanged.

use std::fmt::Write as _;

/// The fixed named color palette `color()`/`gradient()`/threshold
/// coloring draw from (spec.md §4.1, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Yellow,
    Red,
    White,
    Gray,
    Blue,
    Cyan,
    Magenta,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::White => "white",
            Color::Gray => "gray",
            Color::Blue => "blue",
            Color::Cyan => "cyan",
            Color::Magenta => "magenta",
        }
    }

    pub fn parse(name: &str) -> Option<Color> {
        match name.to_ascii_lowercase().as_str() {
            "green" => Some(Color::Green),
            "yellow" => Some(Color::Yellow),
            "red" => Some(Color::Red),
            "white" => Some(Color::White),
            "gray" | "grey" => Some(Color::Gray),
            "blue" => Some(Color::Blue),
            "cyan" => Some(Color::Cyan),
            "magenta" => Some(Color::Magenta),
            _ => None,
        }
    }
}

/// A comma-separated subset of `{bold, italic, underline}` (spec.md §4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decorations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Decorations {
    pub fn parse(spec: &str) -> Self {
        let mut d = Decorations::default();
        for part in spec.split(',') {
            match part.trim().to_ascii_lowercase().as_str() {
                "bold" => d.bold = true,
                "italic" => d.italic = true,
                "underline" => d.underline = true,
                _ => {}
            }
        }
        d
    }

    pub fn is_none(self) -> bool {
        !self.bold && !self.italic && !self.underline
    }
}

/// Wraps `text` in a foreground-color tag. Empty text stays empty
/// (spec.md §4.1: "styling functions must produce empty output for
/// empty text").
pub fn colorize(color_name: &str, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!("<fg={color_name}>{text}</fg>")
}

/// Wraps `text` in a full style tag (background, foreground,
/// decorations). Omits attributes that weren't requested so "MUST NOT
/// emit styling codes when no decoration is requested" holds even when
/// `bg`/`fg` are both empty and `decorations` is empty.
pub fn styled(bg: &str, fg: &str, decorations: Decorations, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if bg.is_empty() && fg.is_empty() && decorations.is_none() {
        return text.to_string();
    }
    let mut attrs = String::new();
    if !bg.is_empty() {
        let _ = write!(attrs, " bg={bg}");
    }
    if !fg.is_empty() {
        let _ = write!(attrs, " fg={fg}");
    }
    if decorations.bold {
        attrs.push_str(" bold");
    }
    if decorations.italic {
        attrs.push_str(" italic");
    }
    if decorations.underline {
        attrs.push_str(" underline");
    }
    format!("<style{attrs}>{text}</style>")
}

/// Linear interpolation across a fixed palette by `value`'s position in
/// `[min, max]`, clamped at the ends (spec.md §4.1 `gradient`).
pub fn gradient_color(value: f64, min: f64, max: f64, palette: &[Color]) -> Color {
    if palette.is_empty() {
        return Color::White;
    }
    if palette.len() == 1 || max <= min {
        return palette[0];
    }
    let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let idx = (t * (palette.len() - 1) as f64).round() as usize;
    palette[idx.min(palette.len() - 1)]
}

/// The threshold coloring policy shared by CPU and memory cells
/// (spec.md §4.8): green below 70%, yellow 70–<90%, red 90–100%, and a
/// red-background/white-foreground/underline treatment above 100%.
pub fn threshold_style(ratio: f64, text: &str) -> String {
    if ratio > 1.0 {
        styled(
            Color::Red.name(),
            Color::White.name(),
            Decorations {
                bold: false,
                italic: false,
                underline: true,
            },
            text,
        )
    } else if ratio >= 0.9 {
        colorize(Color::Red.name(), text)
    } else if ratio >= 0.7 {
        colorize(Color::Yellow.name(), text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_empty_text_stays_empty() {
        assert_eq!(colorize("red", ""), "");
    }

    #[test]
    fn styled_with_no_attrs_is_plain_text() {
        assert_eq!(styled("", "", Decorations::default(), "hi"), "hi");
    }

    #[test]
    fn styled_with_attrs_emits_tag() {
        let out = styled(
            "",
            "green",
            Decorations {
                bold: true,
                ..Default::default()
            },
            "ok",
        );
        assert_eq!(out, "<style fg=green bold>ok</style>");
    }

    #[test]
    fn threshold_bands_match_spec_cutoffs() {
        assert_eq!(threshold_style(0.5, "500m"), "500m");
        assert_eq!(threshold_style(0.85, "850m"), "<fg=yellow>850m</fg>");
        assert_eq!(threshold_style(0.95, "950m"), "<fg=red>950m</fg>");
        assert_eq!(
            threshold_style(1.1, "1100m"),
            "<style bg=red fg=white underline>1100m</style>"
        );
    }
}
