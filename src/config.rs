use crate::schema::StrictChecks;
use crate::theme::Theme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(60.0, 30.0, 60.0, 70.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GanttConfig {
    pub margin: Margins,
    /// Lower bound for the task-name column; grows to fit the longest name.
    pub min_label_width: f32,
    pub max_label_width: f32,
    pub band_padding: f32,
    pub bar_radius: f32,
    pub tick_target: usize,
    pub show_dependencies: bool,
    pub legend_swatch: f32,
    pub legend_spacing: f32,
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            margin: Margins::new(60.0, 30.0, 50.0, 20.0),
            min_label_width: 80.0,
            max_label_width: 220.0,
            band_padding: 0.2,
            bar_radius: 4.0,
            tick_target: 8,
            show_dependencies: true,
            legend_swatch: 12.0,
            legend_spacing: 18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BarConfig {
    pub margin: Margins,
    pub band_padding: f32,
    pub y_ticks: usize,
    pub show_values: bool,
    pub bar_radius: f32,
    pub legend_swatch: f32,
    pub legend_spacing: f32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            margin: Margins::default(),
            band_padding: 0.2,
            y_ticks: 10,
            show_values: true,
            bar_radius: 2.0,
            legend_swatch: 12.0,
            legend_spacing: 18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PieConfig {
    pub margin: f32,
    pub title_height: f32,
    pub legend_swatch: f32,
    pub legend_spacing: f32,
    /// Slices narrower than this many radians get no in-slice label.
    pub min_label_angle: f32,
    /// Radius fraction where slice labels sit.
    pub label_radius_ratio: f32,
}

impl Default for PieConfig {
    fn default() -> Self {
        Self {
            margin: 40.0,
            title_height: 40.0,
            legend_swatch: 14.0,
            legend_spacing: 22.0,
            min_label_angle: 0.25,
            label_radius_ratio: 0.65,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineConfig {
    pub margin: Margins,
    pub band_padding: f32,
    /// Multiplier pushing the y-domain past the extreme values, away from zero.
    pub y_headroom: f64,
    pub y_ticks: usize,
    pub point_radius: f32,
    pub stroke_width: f32,
    pub legend_swatch: f32,
    pub legend_spacing: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            margin: Margins::default(),
            band_padding: 0.1,
            y_headroom: 1.1,
            y_ticks: 10,
            point_radius: 4.0,
            stroke_width: 2.0,
            legend_swatch: 12.0,
            legend_spacing: 18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub padding: f32,
    pub link_distance: f32,
    /// Negative values repel.
    pub charge_strength: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub max_iterations: usize,
    /// Stop once the summed squared velocity drops below this.
    pub energy_threshold: f32,
    pub curvature: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            node_width: 120.0,
            node_height: 44.0,
            padding: 20.0,
            link_distance: 150.0,
            charge_strength: -500.0,
            center_strength: 1.0,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            // 1 - alpha_min^(1/300): alpha reaches alpha_min after 300 ticks.
            alpha_decay: 0.0228,
            max_iterations: 300,
            energy_threshold: 0.01,
            curvature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub label_line_height: f32,
    pub fast_text_metrics: bool,
    pub empty_message: String,
    pub gantt: GanttConfig,
    pub bar: BarConfig,
    pub pie: PieConfig,
    pub line: LineConfig,
    pub flow: FlowConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_line_height: 1.3,
            fast_text_metrics: false,
            empty_message: "No data available".to_string(),
            gantt: GanttConfig::default(),
            bar: BarConfig::default(),
            pie: PieConfig::default(),
            line: LineConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

/// Output canvas; doubles as the layout viewport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The `{prompt, chartType}` parse endpoint.
    Proxy,
    /// A local Ollama server, prompted directly.
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    pub backend: Backend,
    pub endpoint: String,
    pub ollama_host: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Proxy,
            endpoint: "http://localhost:3000/api/charts-parse".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub extraction: ExtractionConfig,
    pub strict: StrictChecks,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    title_font_size: Option<f32>,
    text_color: Option<String>,
    axis_color: Option<String>,
    grid_color: Option<String>,
    background: Option<String>,
    palette: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    label_line_height: Option<f32>,
    fast_text_metrics: Option<bool>,
    empty_message: Option<String>,
    gantt: Option<GanttConfig>,
    bar: Option<BarConfig>,
    pie: Option<PieConfig>,
    line: Option<LineConfig>,
    flow: Option<FlowConfig>,
    render: Option<RenderConfig>,
    extraction: Option<ExtractionConfig>,
    strict: Option<StrictChecks>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let parsed = parse_config_file(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str::<ConfigFile>(contents) {
        Ok(parsed) => Ok(parsed),
        // Hand-written configs may carry comments or trailing commas.
        Err(json_err) => json5::from_str::<ConfigFile>(contents).map_err(|_| json_err.into()),
    }
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.title_font_size {
            config.theme.title_font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.axis_color {
            config.theme.axis_color = v;
        }
        if let Some(v) = vars.grid_color {
            config.theme.grid_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.palette {
            if v.is_empty() {
                anyhow::bail!("themeVariables.palette must list at least one color");
            }
            config.theme.palette = v;
        }
    }

    if let Some(v) = parsed.label_line_height {
        config.layout.label_line_height = v;
    }
    if let Some(v) = parsed.fast_text_metrics {
        config.layout.fast_text_metrics = v;
    }
    if let Some(v) = parsed.empty_message {
        config.layout.empty_message = v;
    }
    if let Some(v) = parsed.gantt {
        config.layout.gantt = v;
    }
    if let Some(v) = parsed.bar {
        config.layout.bar = v;
    }
    if let Some(v) = parsed.pie {
        config.layout.pie = v;
    }
    if let Some(v) = parsed.line {
        config.layout.line = v;
    }
    if let Some(v) = parsed.flow {
        config.layout.flow = v;
    }
    if let Some(v) = parsed.render {
        config.render = v;
    }
    if let Some(v) = parsed.extraction {
        config.extraction = v;
    }
    if let Some(v) = parsed.strict {
        config.strict = v;
    }
    Ok(())
}
