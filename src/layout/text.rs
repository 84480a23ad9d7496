use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

const ELLIPSIS: char = '…';

/// Measures `text` at `font_size`, wrapping on whitespace when `max_width`
/// is given.
pub(super) fn measure_label(
    text: &str,
    font_size: f32,
    max_width: Option<f32>,
    theme: &Theme,
    config: &LayoutConfig,
) -> TextBlock {
    let fast_metrics = config.fast_text_metrics;
    let font_family = theme.font_family.as_str();
    let mut lines = Vec::new();
    for line in split_lines(text) {
        match max_width {
            Some(limit) => lines.extend(wrap_line(
                &line,
                limit,
                font_size,
                font_family,
                fast_metrics,
            )),
            None => lines.push(line),
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, font_family, fast_metrics))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;

    TextBlock {
        lines,
        width,
        height,
    }
}

/// Single-line width of `text` in the theme font.
pub(super) fn label_width(text: &str, font_size: f32, theme: &Theme, config: &LayoutConfig) -> f32 {
    text_width(
        text,
        font_size,
        theme.font_family.as_str(),
        config.fast_text_metrics,
    )
}

/// Shortens `text` with a trailing ellipsis until it fits in `max_width`.
pub(super) fn truncate_to_width(
    text: &str,
    max_width: f32,
    font_size: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    if label_width(text, font_size, theme, config) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let mut candidate = chars.iter().collect::<String>().trim_end().to_string();
        candidate.push(ELLIPSIS);
        if label_width(&candidate, font_size, theme, config) <= max_width {
            return candidate;
        }
    }
    ELLIPSIS.to_string()
}

pub(super) fn char_width_factor(ch: char) -> f32 {
    // Per-character advances of a typical sans-serif face, in em.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' | 'B' | 'K' | 'X' | 'Y' => 0.65,
        'C' | 'D' | 'G' | 'H' | 'N' | 'O' | 'Q' | 'U' => 0.745,
        'E' | 'F' | 'L' | 'P' | 'R' | 'S' | 'T' | 'Z' => 0.6,
        'I' => 0.272,
        'J' => 0.557,
        'M' => 0.903,
        'V' => 0.661,
        'W' => 0.958,
        'f' | 't' => 0.32,
        'i' | 'j' | 'l' => 0.235,
        'm' => 0.867,
        'r' => 0.364,
        'w' => 0.811,
        'a'..='z' => 0.57,
        '1' => 0.396,
        '0'..='9' => 0.6,
        '@' | '#' | '%' | '&' => 0.946,
        c if text_metrics::is_wide(c) => 1.0,
        _ => 0.568,
    }
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

pub(super) fn wrap_line(
    line: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    fast_metrics: bool,
) -> Vec<String> {
    if text_width(line, font_size, font_family, fast_metrics) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, font_size, font_family, fast_metrics) > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(super) fn text_width(text: &str, font_size: f32, font_family: &str, fast_metrics: bool) -> f32 {
    if fast_metrics {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}
