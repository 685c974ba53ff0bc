use crate::domain::Tone;
use ratatui::style::{Color, Modifier, Style};

// Small palette on top of the terminal's own background: white text, grays for
// structure and in-flight calls, and three semantic colors for verdicts.
//
// Keep this palette cohesive. Prefer adding new roles here instead of sprinkling colors through the UI.
pub const FG: Color = Color::Rgb(229, 231, 235);
pub const MUTED: Color = Color::Rgb(156, 163, 175);
pub const DIM: Color = Color::Rgb(107, 114, 128);
pub const BAR_BG: Color = Color::Rgb(14, 18, 24);

pub const ACCENT: Color = Color::Rgb(255, 159, 26);

// Semantic colors (keep minimal).
pub const SUCCESS: Color = Color::Rgb(134, 239, 172); // light green (ok verdicts, logo underscore)
pub const WARNING: Color = Color::Rgb(253, 224, 71); // soft yellow (retrying)
pub const ERROR: Color = Color::Rgb(248, 113, 113); // soft red

pub fn tone_style(tone: Tone) -> Style {
    let color = match tone {
        Tone::Pending => MUTED,
        Tone::Retry => WARNING,
        Tone::Error => ERROR,
        Tone::Ok => SUCCESS,
    };
    Style::default().fg(color)
}

pub fn header_style() -> Style {
    Style::default().fg(FG).add_modifier(Modifier::BOLD)
}

pub fn tree_style() -> Style {
    Style::default().fg(DIM)
}

pub fn spinner_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn status_line_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn logo_style() -> Style {
    Style::default().fg(FG)
}

pub fn logo_underscore_style() -> Style {
    Style::default().fg(SUCCESS)
}
