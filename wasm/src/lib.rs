use nlchart::config::Config;
use nlchart::normalize::normalize_response;
use nlchart::theme::Theme;
use nlchart::validate::validate_chart;
use nlchart::{ChartData, render_chart};
use serde::Deserialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    fast_text: Option<bool>,
}

fn build_config(options: ChartRenderOptions) -> Config {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::by_name) {
        config.theme = theme;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    // System fonts are not reachable from the browser.
    config.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    config
}

fn parse_chart(chart_type: &str, payload: &str) -> Result<ChartData, String> {
    let value: Value = serde_json::from_str(payload)
        .unwrap_or_else(|_| Value::String(payload.to_string()));
    let normalized = normalize_response(&value).map_err(|error| error.to_string())?;
    validate_chart(chart_type, &normalized.value).map_err(|error| error.to_string())
}

/// Validates raw extraction output and renders it to SVG.
#[wasm_bindgen]
pub fn render_chart_svg(
    chart_type: &str,
    payload: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<ChartRenderOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string()))?,
        None => ChartRenderOptions::default(),
    };
    let data = parse_chart(chart_type, payload).map_err(|error| JsValue::from_str(&error))?;
    Ok(render_chart(&data, &build_config(options)))
}

/// Validates raw extraction output and returns the clean chart JSON.
#[wasm_bindgen]
pub fn validate_chart_json(chart_type: &str, payload: &str) -> Result<String, JsValue> {
    let data = parse_chart(chart_type, payload).map_err(|error| JsValue::from_str(&error))?;
    serde_json::to_string(&data).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bar_chart_from_model_text() {
        let payload = r#"{"response":"```json\n{\"title\":\"Sales\",\"data\":[{\"label\":\"Q1\",\"value\":10},{\"label\":\"Q2\",\"value\":30}]}\n```"}"#;
        let data = parse_chart("bar", payload).unwrap();
        let svg = render_chart(&data, &build_config(ChartRenderOptions::default()));
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Sales"));
        assert!(svg.contains("Q2"));
    }

    #[test]
    fn rejects_unknown_chart_type() {
        let err = parse_chart("radar", "{}").unwrap_err();
        assert!(err.contains("radar"));
    }
}
