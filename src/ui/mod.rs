mod table;
pub mod theme;

pub use table::{format_elapsed, function_column_width, snapshot_line_count, spinner_frame};

use crate::app::{AppModel, Tab, TabContent};
use crate::domain::CallTreeSnapshot;
use ansi_to_tui::IntoText;
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

const LOGO: [&str; 5] = [
    r"           _ _                 _       _",
    r"  ___ __ _| | |_      ____ _| |_ ___| |__",
    r" / __/ _` | | \ \ /\ / / _` | __/ __| '_ \",
    r"| (_| (_| | | |\ V  V / (_| | || (__| | | |",
    r" \___\__,_|_|_| \_/\_/ \__,_|\__\___|_| |_|",
];

const LOGO_UNDERSCORE: [&str; 2] = [" _____", "|_____|"];

/// First logo line the blinking underscore is drawn next to.
const UNDERSCORE_ROW: usize = 3;

pub const INITIALIZING_MESSAGE: &str = "Initializing...";
pub const WAITING_MESSAGE: &str = "Waiting for function calls...";

const HELP_KEYS: [(&str, &str); 3] = [("tab", "switch tabs"), ("t", "tail"), ("q", "quit")];

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    let [tabs_area, body_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(full_area);

    render_tab_bar(frame, tabs_area, model);
    render_body(frame, body_area, model);
    render_help(frame, help_area);
}

/// Lines the Functions tab occupies for `snapshot`, splash included.
pub fn functions_line_count(snapshot: &CallTreeSnapshot) -> usize {
    if snapshot.is_empty() {
        splash_line_count()
    } else {
        snapshot_line_count(snapshot)
    }
}

fn splash_line_count() -> usize {
    // Logo, a blank line, then the message.
    LOGO.len() + 2
}

fn render_tab_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let titles = Tab::ALL
        .iter()
        .map(|tab| Line::from(format!(" {} ", tab.label())))
        .collect::<Vec<_>>();
    let selected = Tab::ALL
        .iter()
        .position(|tab| *tab == model.active_tab)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(theme::MUTED).bg(theme::BAR_BG))
        .highlight_style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::styled("│", Style::default().fg(theme::DIM)))
        .padding(" ", "");
    frame.render_widget(tabs, area);
}

fn render_body(frame: &mut Frame, area: Rect, model: &AppModel) {
    let window = body_window(model, model.scroll_offset, usize::from(area.height));
    let body = Paragraph::new(window)
        .block(Block::default().padding(Padding::horizontal(2)))
        .scroll((0, 0));
    frame.render_widget(body, area);
}

/// The `height` lines of the active tab starting at `offset`. Only the
/// visible slice is styled, so the offset never reaches the widget.
fn body_window(model: &AppModel, offset: usize, height: usize) -> Text<'static> {
    if !model.is_ready() {
        return visible(splash_lines(model.ticks, INITIALIZING_MESSAGE), offset, height);
    }
    match &model.content {
        None => Text::default(),
        Some(TabContent::Functions(snapshot)) if snapshot.is_empty() => {
            visible(splash_lines(model.ticks, WAITING_MESSAGE), offset, height)
        }
        Some(TabContent::Functions(snapshot)) => visible(
            table::snapshot_lines(snapshot, model.spinner_ticks),
            offset,
            height,
        ),
        Some(TabContent::Logs(logs)) => {
            let slice = logs
                .lines()
                .skip(offset)
                .take(height)
                .collect::<Vec<_>>()
                .join("\n");
            slice
                .as_str()
                .into_text()
                .unwrap_or_else(|_| Text::raw(slice.clone()))
        }
    }
}

fn visible(lines: Vec<Line<'static>>, offset: usize, height: usize) -> Text<'static> {
    Text::from(
        lines
            .into_iter()
            .skip(offset)
            .take(height)
            .collect::<Vec<_>>(),
    )
}

fn splash_lines(ticks: u64, message: &str) -> Vec<Line<'static>> {
    let mut lines = logo_lines(ticks);
    lines.push(Line::default());
    lines.push(Line::styled(message.to_string(), theme::status_line_style()));
    lines
}

/// The logo, with the underscore shown on even ticks.
fn logo_lines(ticks: u64) -> Vec<Line<'static>> {
    let show_underscore = ticks % 2 == 0;
    let logo_width = LOGO
        .iter()
        .map(|line| UnicodeWidthStr::width(*line))
        .max()
        .unwrap_or(0);

    LOGO.iter()
        .enumerate()
        .map(|(index, line)| {
            let mut spans = vec![Span::styled(line.to_string(), theme::logo_style())];
            let underscore = index
                .checked_sub(UNDERSCORE_ROW)
                .and_then(|offset| LOGO_UNDERSCORE.get(offset));
            if let (true, Some(underscore)) = (show_underscore, underscore) {
                let gap = logo_width - UnicodeWidthStr::width(*line);
                spans.push(Span::raw(" ".repeat(gap)));
                spans.push(Span::styled(
                    underscore.to_string(),
                    theme::logo_underscore_style(),
                ));
            }
            Line::from(spans)
        })
        .collect()
}

fn render_help(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(theme::MUTED);
    let desc_style = Style::default().fg(theme::DIM);
    let mut spans = vec![Span::raw("  ")];
    for (index, (key, desc)) in HELP_KEYS.iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(" • ", desc_style));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(*desc, desc_style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
