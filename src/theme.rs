use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());

const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const MODERN_PALETTE: [&str; 8] = [
    "#4338CA", "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub title_font_size: f32,
    pub text_color: String,
    pub muted_text_color: String,
    pub axis_color: String,
    pub grid_color: String,
    pub background: String,
    /// Ordinal palette, assigned to categories in first-seen order.
    pub palette: Vec<String>,
    pub flow_start_color: String,
    pub flow_process_color: String,
    pub flow_decision_color: String,
    pub flow_end_color: String,
    pub flow_node_border: String,
    pub flow_link_color: String,
    pub edge_label_background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 12.0,
            title_font_size: 18.0,
            text_color: "#333333".to_string(),
            muted_text_color: "#666666".to_string(),
            axis_color: "#333333".to_string(),
            grid_color: "#E5E5E5".to_string(),
            background: "#FFFFFF".to_string(),
            palette: CATEGORY10.iter().map(|c| c.to_string()).collect(),
            flow_start_color: "#4CAF50".to_string(),
            flow_process_color: "#2196F3".to_string(),
            flow_decision_color: "#FFC107".to_string(),
            flow_end_color: "#F44336".to_string(),
            flow_node_border: "#333333".to_string(),
            flow_link_color: "#999999".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            title_font_size: 18.0,
            text_color: "#1F2937".to_string(),
            muted_text_color: "#6B7280".to_string(),
            axis_color: "#9CA3AF".to_string(),
            grid_color: "#F3F4F6".to_string(),
            background: "#FFFFFF".to_string(),
            palette: MODERN_PALETTE.iter().map(|c| c.to_string()).collect(),
            flow_start_color: "#10B981".to_string(),
            flow_process_color: "#3B82F6".to_string(),
            flow_decision_color: "#F59E0B".to_string(),
            flow_end_color: "#EF4444".to_string(),
            flow_node_border: "#1F2937".to_string(),
            flow_link_color: "#9CA3AF".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value.trim())
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha ignored).
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();
    if !is_hex_color(value) {
        return None;
    }
    let hex = &value[1..];
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    if hex.len() == 3 {
        let expand = |idx: usize| channel(&hex[idx..idx + 1].repeat(2));
        return Some((expand(0)?, expand(1)?, expand(2)?));
    }
    Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?))
}

/// Dark or light text, whichever reads better on `fill`.
pub fn contrast_text_color(fill: &str) -> &'static str {
    let Some((r, g, b)) = parse_hex_color(fill) else {
        return "#FFFFFF";
    };
    let luminance = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luminance > 160.0 { "#111827" } else { "#FFFFFF" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#4338CA"));
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#11223344"));
        assert!(!is_hex_color("red"));
        assert!(!is_hex_color("#12345"));
        assert_eq!(parse_hex_color("#0f8"), Some((0, 0xff, 0x88)));
        assert_eq!(parse_hex_color("#3B82F6"), Some((0x3b, 0x82, 0xf6)));
    }

    #[test]
    fn contrast_prefers_dark_text_on_light_fill() {
        assert_eq!(contrast_text_color("#FFC107"), "#111827");
        assert_eq!(contrast_text_color("#1f77b4"), "#FFFFFF");
    }
}
