mod bar;
mod empty;
mod flow;
pub mod force;
mod gantt;
mod line;
mod pie;
pub mod scale;
mod text;
pub(crate) mod types;
pub use flow::FlowDiagram;
pub use pie::polar;
pub use types::*;
use bar::*;
use empty::*;
use flow::*;
use gantt::*;
use line::*;
use pie::*;
use text::*;

use crate::config::{LayoutConfig, Margins};
use crate::ir::ChartData;
use crate::theme::Theme;
use scale::{BandScale, LinearScale, OrdinalColors};

// Gap between a legend swatch and its text.
const LEGEND_TEXT_GAP: f32 = 6.0;
const AXIS_TITLE_OFFSET: f32 = 40.0;
const TICK_LABEL_GAP: f32 = 8.0;

/// Lays `data` out on a `width` x `height` canvas. Charts without items get
/// the empty state.
pub fn compute_layout(
    data: &ChartData,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: (f32, f32),
) -> Layout {
    let width = viewport.0.max(1.0);
    let height = viewport.1.max(1.0);
    if data.is_empty() {
        return compute_empty_layout(data.chart_type(), data.title(), theme, config, width, height);
    }
    match data {
        ChartData::Gantt(chart) => compute_gantt_layout(chart, theme, config, width, height),
        ChartData::Bar(chart) => compute_bar_layout(chart, theme, config, width, height),
        ChartData::Pie(chart) => compute_pie_layout(chart, theme, config, width, height),
        ChartData::Line(chart) => compute_line_layout(chart, theme, config, width, height),
        ChartData::Flow(chart) => compute_flow_layout(chart, theme, config, width, height),
    }
}

/// Centered bold title, vertically centered in `band_height` from the top.
fn title_label(title: &str, theme: &Theme, width: f32, band_height: f32) -> Option<Label> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    Some(Label {
        x: width / 2.0,
        y: (band_height / 2.0).max(theme.title_font_size),
        text: title.to_string(),
        font_size: theme.title_font_size,
        anchor: TextAnchor::Middle,
        color: theme.text_color.clone(),
        bold: true,
        rotate: None,
    })
}

fn plot_area(width: f32, height: f32, margin: &Margins) -> Rect {
    Rect {
        x: margin.left,
        y: margin.top,
        width: (width - margin.left - margin.right).max(1.0),
        height: (height - margin.top - margin.bottom).max(1.0),
    }
}

/// One row of swatches starting at (`x`, `y`), in the order given.
fn legend_row(
    entries: &[(String, String)],
    x: f32,
    y: f32,
    swatch: f32,
    spacing: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<LegendItem> {
    let mut cursor = x;
    let mut items = Vec::with_capacity(entries.len());
    for (label, color) in entries {
        items.push(LegendItem {
            x: cursor,
            y,
            swatch,
            color: color.clone(),
            label: label.clone(),
        });
        cursor += swatch
            + LEGEND_TEXT_GAP
            + label_width(label, theme.font_size, theme, config)
            + spacing;
    }
    items
}

/// Stacked swatches, one per line.
fn legend_column(
    entries: &[(String, String)],
    x: f32,
    y: f32,
    swatch: f32,
    spacing: f32,
) -> Vec<LegendItem> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, (label, color))| LegendItem {
            x,
            y: y + idx as f32 * spacing,
            swatch,
            color: color.clone(),
            label: label.clone(),
        })
        .collect()
}

fn axis_title(text: Option<&str>, x: f32, y: f32, rotate: Option<f32>, theme: &Theme) -> Option<Label> {
    let text = text.map(str::trim).filter(|t| !t.is_empty())?;
    Some(Label {
        x,
        y,
        text: text.to_string(),
        font_size: theme.font_size,
        anchor: TextAnchor::Middle,
        color: theme.text_color.clone(),
        bold: true,
        rotate,
    })
}

/// Value axis along the left edge of `plot`, with grid lines across it.
fn left_value_axis(
    scale: &LinearScale,
    plot: Rect,
    tick_count: usize,
    title: Option<&str>,
    theme: &Theme,
) -> AxisLayout {
    let ticks = scale
        .ticks(tick_count)
        .into_iter()
        .map(|value| AxisTick {
            offset: scale.scale(value),
            label: scale::format_tick(value),
        })
        .collect();
    AxisLayout {
        orient: AxisOrient::Left,
        x: plot.x,
        y: plot.y,
        length: plot.height,
        ticks,
        grid_length: plot.width,
        title: axis_title(
            title,
            plot.x - AXIS_TITLE_OFFSET - TICK_LABEL_GAP,
            plot.y + plot.height / 2.0,
            Some(-90.0),
            theme,
        ),
    }
}

/// Category axis along the bottom of `plot`; labels are clipped to the band.
fn bottom_band_axis(
    band: &BandScale,
    plot: Rect,
    title: Option<&str>,
    theme: &Theme,
    config: &LayoutConfig,
) -> AxisLayout {
    let max_label = band.step.max(theme.font_size * 2.0);
    let ticks = band
        .domain
        .iter()
        .filter_map(|key| {
            band.center(key).map(|offset| AxisTick {
                offset,
                label: truncate_to_width(key, max_label, theme.font_size, theme, config),
            })
        })
        .collect();
    AxisLayout {
        orient: AxisOrient::Bottom,
        x: plot.x,
        y: plot.bottom(),
        length: plot.width,
        ticks,
        grid_length: 0.0,
        title: axis_title(
            title,
            plot.x + plot.width / 2.0,
            plot.bottom() + AXIS_TITLE_OFFSET,
            None,
            theme,
        ),
    }
}

/// Palette colors for `keys`, assigned in the order given.
fn category_colors<'a>(keys: impl IntoIterator<Item = &'a str>, theme: &Theme) -> OrdinalColors {
    let mut colors = OrdinalColors::new(&theme.palette);
    for key in keys {
        colors.color(key);
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BarChartData, ChartType, FlowChartData, GanttChartData, PieChartData};

    fn fast_config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn empty_data_renders_empty_state_for_every_type() {
        let theme = Theme::modern();
        let config = fast_config();
        let charts = [
            ChartData::Gantt(GanttChartData {
                title: "Plan".into(),
                tasks: vec![],
            }),
            ChartData::Bar(BarChartData {
                title: "Sales".into(),
                x_axis_label: None,
                y_axis_label: None,
                data: vec![],
            }),
            ChartData::Pie(PieChartData {
                title: "Share".into(),
                data: vec![],
            }),
            ChartData::Line(BarChartData {
                title: "Trend".into(),
                x_axis_label: None,
                y_axis_label: None,
                data: vec![],
            }),
            ChartData::Flow(FlowChartData {
                title: "Process".into(),
                nodes: vec![],
                links: vec![],
            }),
        ];
        for chart in &charts {
            let layout = compute_layout(chart, &theme, &config, (640.0, 480.0));
            assert!(layout.is_empty_state(), "{:?}", chart.chart_type());
            assert_eq!(layout.chart_type, chart.chart_type());
            assert_eq!((layout.width, layout.height), (640.0, 480.0));
            assert!(layout.hotspots.is_empty());
        }
        assert_eq!(charts.len(), ChartType::ALL.len());
    }

    #[test]
    fn legend_row_advances_left_to_right() {
        let theme = Theme::modern();
        let config = fast_config();
        let entries = vec![
            ("Design".to_string(), "#111111".to_string()),
            ("Build".to_string(), "#222222".to_string()),
        ];
        let items = legend_row(&entries, 10.0, 20.0, 12.0, 18.0, &theme, &config);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].x, 10.0);
        assert!(items[1].x > items[0].x + 12.0 + 18.0);
    }

    #[test]
    fn blank_title_gets_no_label() {
        let theme = Theme::modern();
        assert!(title_label("  ", &theme, 400.0, 60.0).is_none());
        let label = title_label("Quarterly Sales", &theme, 400.0, 60.0).unwrap();
        assert_eq!(label.x, 200.0);
        assert!(label.bold);
    }
}
