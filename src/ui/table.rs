use crate::domain::{CallRow, CallTree, CallTreeSnapshot};
use crate::ui::theme;
use ratatui::prelude::*;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

pub const SPINNER_FRAMES: [&str; 8] = ["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "];

pub const SPINNER_WIDTH: usize = 2;
pub const MIN_FUNCTION_WIDTH: usize = 20;
pub const MAX_FUNCTION_WIDTH: usize = 50;
pub const ATTEMPTS_WIDTH: usize = 8;
pub const DURATION_WIDTH: usize = 10;
pub const STATUS_WIDTH: usize = 40;

const ELLIPSIS: &str = "…";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Align {
    Left,
    Right,
}

pub fn spinner_frame(spinner_ticks: u64) -> &'static str {
    SPINNER_FRAMES[(spinner_ticks % SPINNER_FRAMES.len() as u64) as usize]
}

/// Widest prefixed function cell, clamped to the column bounds.
pub fn function_column_width(rows: &[CallRow]) -> usize {
    let longest = rows
        .iter()
        .map(|row| UnicodeWidthStr::width(row.function_cell_text().as_str()))
        .max()
        .unwrap_or(0);
    longest.clamp(MIN_FUNCTION_WIDTH, MAX_FUNCTION_WIDTH)
}

/// Elapsed time in the style of `1.25s`, `2m3.5s` or `1h0m0s`; `?` when the
/// start of the call is unknown.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.is_zero() {
        return "?".to_string();
    }
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }

    let total_secs = millis / 1_000;
    let frac = millis % 1_000;
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let seconds = if frac == 0 {
        secs.to_string()
    } else {
        let frac = format!("{frac:03}");
        format!("{secs}.{}", frac.trim_end_matches('0'))
    };

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn header_line(function_width: usize) -> Line<'static> {
    let style = theme::header_style();
    let mut spans = vec![Span::raw(" ".repeat(SPINNER_WIDTH))];
    spans.extend(fit_spans(
        vec![Span::styled("Function", style)],
        function_width,
        Align::Left,
    ));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::styled("Attempts", style)],
        ATTEMPTS_WIDTH,
        Align::Right,
    ));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::styled("Duration", style)],
        DURATION_WIDTH,
        Align::Right,
    ));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::styled("Status", style)],
        STATUS_WIDTH,
        Align::Left,
    ));
    Line::from(spans)
}

pub fn row_line(row: &CallRow, function_width: usize, spinner: &str) -> Line<'static> {
    let spinner_cell = if row.pending {
        Span::styled(spinner.to_string(), theme::spinner_style())
    } else {
        Span::raw("")
    };

    let mut function_cell = Vec::new();
    if !row.prefix.is_empty() {
        function_cell.push(Span::styled(row.prefix.clone(), theme::tree_style()));
    }
    function_cell.push(Span::styled(
        row.function.clone(),
        theme::tone_style(row.function_tone),
    ));

    let mut spans = fit_spans(vec![spinner_cell], SPINNER_WIDTH, Align::Left);
    spans.extend(fit_spans(function_cell, function_width, Align::Left));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::raw(row.attempts.to_string())],
        ATTEMPTS_WIDTH,
        Align::Right,
    ));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::raw(format_elapsed(row.elapsed))],
        DURATION_WIDTH,
        Align::Right,
    ));
    spans.push(Span::raw(" "));
    spans.extend(fit_spans(
        vec![Span::styled(
            row.status.clone(),
            theme::tone_style(row.status_tone),
        )],
        STATUS_WIDTH,
        Align::Left,
    ));
    Line::from(spans)
}

pub fn tree_lines(tree: &CallTree, spinner: &str) -> Vec<Line<'static>> {
    let function_width = function_column_width(&tree.rows);
    let mut lines = Vec::with_capacity(tree.rows.len() + 1);
    lines.push(header_line(function_width));
    lines.extend(
        tree.rows
            .iter()
            .map(|row| row_line(row, function_width, spinner)),
    );
    lines
}

/// One table per root in registration order, separated by a blank line.
pub fn snapshot_lines(snapshot: &CallTreeSnapshot, spinner_ticks: u64) -> Vec<Line<'static>> {
    let spinner = spinner_frame(spinner_ticks);
    let mut lines = Vec::new();
    for (index, tree) in snapshot.trees.iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        lines.extend(tree_lines(tree, spinner));
    }
    lines
}

pub fn snapshot_line_count(snapshot: &CallTreeSnapshot) -> usize {
    let rows: usize = snapshot.trees.iter().map(|tree| tree.rows.len() + 1).sum();
    rows + snapshot.trees.len().saturating_sub(1)
}

/// Truncates (with a trailing ellipsis) or pads styled spans to exactly
/// `width` columns. Each surviving span keeps its style; the ellipsis takes
/// the style of the span it cuts.
fn fit_spans(spans: Vec<Span<'static>>, width: usize, align: Align) -> Vec<Span<'static>> {
    let total: usize = spans.iter().map(Span::width).sum();
    if total <= width {
        let padding = Span::raw(" ".repeat(width - total));
        return match align {
            Align::Left => spans.into_iter().chain([padding]).collect(),
            Align::Right => [padding].into_iter().chain(spans).collect(),
        };
    }
    if width == 0 {
        return Vec::new();
    }

    let mut available = width.saturating_sub(UnicodeWidthStr::width(ELLIPSIS));
    let mut out = Vec::new();
    for span in spans {
        let span_width = span.width();
        if span_width <= available {
            available -= span_width;
            out.push(span);
            continue;
        }

        let mut kept = String::new();
        for ch in span.content.chars() {
            let next = format!("{kept}{ch}");
            if UnicodeWidthStr::width(next.as_str()) > available {
                break;
            }
            kept.push(ch);
        }
        let used = UnicodeWidthStr::width(kept.as_str());
        kept.push_str(ELLIPSIS);
        out.push(Span::styled(kept, span.style));
        // Wide characters can leave one column unfilled.
        if used < available {
            out.push(Span::raw(" ".repeat(available - used)));
        }
        break;
    }
    out
}
