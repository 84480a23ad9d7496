#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod gantt_code;
pub mod generator;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod normalize;
pub mod prompt;
pub mod render;
pub mod schema;
pub mod store;
pub mod text_metrics;
pub mod theme;
pub mod validate;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use error::{ChartError, ErrorKind};
pub use extract::ExtractionClient;
pub use generator::{ChartGenerator, GeneratedChart, RequestState};
pub use ir::{ChartData, ChartType};
pub use layout::{Layout, compute_layout};
pub use normalize::normalize_response;
pub use render::render_svg;
pub use store::ChartStore;
pub use validate::validate_chart;

/// Lays out and renders `data` at the configured canvas size.
pub fn render_chart(data: &ChartData, config: &Config) -> String {
    let viewport = (config.render.width, config.render.height);
    let layout = compute_layout(data, &config.theme, &config.layout, viewport);
    render_svg(&layout, &config.theme)
}
