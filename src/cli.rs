use crate::config::{Backend, Config, load_config};
use crate::gantt_code::gantt_code;
use crate::generator::GeneratedChart;
use crate::ir::{ChartData, ChartType};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::normalize::{normalize_response, normalize_text};
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::validate::validate_typed;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "nlchart",
    version,
    about = "Natural-language chart generator and renderer (gantt, bar, pie, line, flow)"
)]
pub struct Args {
    /// Natural-language chart request, sent to the extraction backend
    #[arg(short = 'p', long = "prompt")]
    pub prompt: Option<String>,

    /// Chart type: gantt, bar, pie, line or flow
    #[arg(short = 't', long = "chartType")]
    pub chart_type: Option<String>,

    /// Chart JSON (or raw model output) file, or '-' for stdin
    #[arg(short = 'i', long = "input", conflicts_with = "prompt")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width, overriding the config file (default 960)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height, overriding the config file (default 540)
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Extraction backend
    #[arg(long = "backend", value_enum)]
    pub backend: Option<BackendArg>,

    /// Parse endpoint URL (proxy backend) or server URL (ollama backend)
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,

    /// Model name for the ollama backend
    #[arg(long = "model")]
    pub model: Option<String>,

    /// Write the validated chart JSON here
    #[arg(long = "dataOutput")]
    pub data_output: Option<PathBuf>,

    /// Write the Mermaid source of a Gantt chart here
    #[arg(long = "codeOutput")]
    pub code_output: Option<PathBuf>,

    /// Write the computed layout as JSON here
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    Proxy,
    Ollama,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let chart = match &args.prompt {
        Some(prompt) => generate_from_prompt(prompt, args.chart_type.as_deref(), &config)?,
        None => {
            let input = read_input(args.input.as_deref())?;
            chart_from_input(&input, args.chart_type.as_deref(), &config)?
        }
    };

    if let Some(path) = &args.data_output {
        let json = serde_json::to_string_pretty(&chart.data.to_json())?;
        std::fs::write(path, json)
            .with_context(|| format!("writing chart data to {}", path.display()))?;
    }
    if let Some(path) = &args.code_output {
        let code = chart
            .code
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--codeOutput is only available for gantt charts"))?;
        std::fs::write(path, code)
            .with_context(|| format!("writing gantt code to {}", path.display()))?;
    }

    let viewport = (config.render.width, config.render.height);
    let layout = compute_layout(&chart.data, &config.theme, &config.layout, viewport);
    if let Some(path) = &args.dump_layout {
        write_layout_dump(path, &layout, &chart.data)?;
    }
    let svg = render_svg(&layout, &config.theme);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }
    info!(chart_type = %chart.data.chart_type(), "chart rendered");
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(backend) = args.backend {
        config.extraction.backend = match backend {
            BackendArg::Proxy => Backend::Proxy,
            BackendArg::Ollama => Backend::Ollama,
        };
    }
    if let Some(endpoint) = &args.endpoint {
        match config.extraction.backend {
            Backend::Proxy => config.extraction.endpoint = endpoint.clone(),
            Backend::Ollama => config.extraction.ollama_host = endpoint.clone(),
        }
    }
    if let Some(model) = &args.model {
        config.extraction.model = model.clone();
    }
}

#[cfg(feature = "http")]
fn generate_from_prompt(
    prompt: &str,
    chart_type: Option<&str>,
    config: &Config,
) -> Result<GeneratedChart> {
    use crate::extract::client_from_config;
    use crate::generator::ChartGenerator;

    let chart_type = chart_type.ok_or_else(|| anyhow::anyhow!("--chartType is required with --prompt"))?;
    let client = client_from_config(&config.extraction)?;
    let mut generator = ChartGenerator::with_strict(client, config.strict.clone());
    Ok(generator.generate(prompt, chart_type)?)
}

#[cfg(not(feature = "http"))]
fn generate_from_prompt(
    _prompt: &str,
    _chart_type: Option<&str>,
    _config: &Config,
) -> Result<GeneratedChart> {
    anyhow::bail!("--prompt requires the `http` feature")
}

/// Accepts chart JSON, `{response: ...}` payloads, fenced or chatty model
/// output, and saved chart envelopes (`{type, data}`).
fn chart_from_input(input: &str, chart_type: Option<&str>, config: &Config) -> Result<GeneratedChart> {
    let normalized = match serde_json::from_str::<Value>(input) {
        Ok(value) => normalize_response(&value)?,
        Err(_) => normalize_text(input)?,
    };
    let (kind, value) = match chart_type {
        Some(tag) => (tag.parse::<ChartType>()?, normalized.value),
        None => envelope_parts(normalized.value)?,
    };
    let data = validate_typed(kind, &value, &config.strict)?;
    let code = match &data {
        ChartData::Gantt(chart) => Some(gantt_code(chart)),
        _ => None,
    };
    Ok(GeneratedChart { data, code })
}

fn envelope_parts(value: Value) -> Result<(ChartType, Value)> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("--chartType is required unless the input carries a `type` field"))?
        .parse::<ChartType>()?;
    let data = value.get("data").filter(|d| d.is_object()).cloned().unwrap_or(value);
    Ok((kind, data))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_accepts_fenced_model_output() {
        let input = "Here you go:\n```json\n{\"title\":\"Sales\",\"data\":[{\"label\":\"Q1\",\"value\":10}]}\n```";
        let chart = chart_from_input(input, Some("bar"), &Config::default()).unwrap();
        assert_eq!(chart.data.chart_type(), ChartType::Bar);
        assert_eq!(chart.data.item_count(), 1);
        assert!(chart.code.is_none());
    }

    #[test]
    fn input_envelope_supplies_chart_type() {
        let input = r#"{"title":"Plan","type":"gantt","data":{"title":"Plan","tasks":[{"id":1,"name":"A","start":"2025-01-01","end":"2025-01-02"}]}}"#;
        let chart = chart_from_input(input, None, &Config::default()).unwrap();
        assert_eq!(chart.data.chart_type(), ChartType::Gantt);
        assert!(chart.code.unwrap().contains(":t1, 2025-01-01, 2025-01-02"));
    }

    #[test]
    fn missing_chart_type_is_reported() {
        let err = chart_from_input(r#"{"title":"x","data":[]}"#, None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("--chartType"));
    }

    #[test]
    fn endpoint_override_follows_backend() {
        let args = Args::parse_from([
            "nlchart",
            "-p",
            "sales",
            "-t",
            "bar",
            "--backend",
            "ollama",
            "--endpoint",
            "http://gpu:11434",
            "-w",
            "640",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.extraction.backend, Backend::Ollama);
        assert_eq!(config.extraction.ollama_host, "http://gpu:11434");
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 540.0);
    }

    #[test]
    fn config_file_canvas_survives_without_flags() {
        let path = std::env::temp_dir().join(format!("nlchart-canvas-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"render": {"width": 400, "height": 300}}"#).unwrap();
        let mut config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        let args = Args::parse_from(["nlchart", "-i", "chart.json", "-t", "bar"]);
        assert!(args.width.is_none() && args.height.is_none());
        apply_overrides(&mut config, &args);
        assert_eq!(config.render.width, 400.0);
        assert_eq!(config.render.height, 300.0);

        let args = Args::parse_from(["nlchart", "-i", "chart.json", "-H", "720"]);
        apply_overrides(&mut config, &args);
        assert_eq!(config.render.width, 400.0);
        assert_eq!(config.render.height, 720.0);
    }
}
