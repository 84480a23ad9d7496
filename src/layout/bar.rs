use std::collections::HashMap;

use crate::ir::{BarChartData, ChartType, DataPoint};

use super::scale::{distinct_in_order, format_tick};
use super::*;

pub(super) const DEFAULT_SERIES: &str = "Default";
const VALUE_LABEL_GAP: f32 = 4.0;

pub(super) fn compute_bar_layout(
    chart: &BarChartData,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let bar_cfg = &config.bar;
    let plot = plot_area(width, height, &bar_cfg.margin);

    let labels = distinct_in_order(chart.data.iter().map(|point| point.label.as_str()));
    let band = BandScale::new(labels, (plot.x, plot.right()), bar_cfg.band_padding);
    let y_scale = LinearScale::new(value_domain(&chart.data), (plot.bottom(), plot.y))
        .nice(bar_cfg.y_ticks);
    let baseline = y_scale.scale(0.0);

    let has_categories = chart.data.iter().any(|point| point.category.is_some());
    let colors = category_colors(chart.data.iter().map(series_key), theme);

    // Points sharing a label split its band in input order.
    let mut slots: HashMap<&str, (usize, usize)> = HashMap::new();
    for point in &chart.data {
        slots.entry(point.label.as_str()).or_insert((0, 0)).1 += 1;
    }

    let mut bars = Vec::with_capacity(chart.data.len());
    let mut hotspots = Vec::with_capacity(chart.data.len());
    for (idx, point) in chart.data.iter().enumerate() {
        let Some(band_x) = band.position(&point.label) else {
            continue;
        };
        let slot = slots.entry(point.label.as_str()).or_insert((0, 1));
        let (slot_idx, slot_count) = (slot.0, slot.1.max(1));
        slot.0 += 1;

        let sub_width = band.bandwidth / slot_count as f32;
        let x = band_x + sub_width * slot_idx as f32;
        let value_y = y_scale.scale(point.value);
        let y = value_y.min(baseline);
        let bar_height = (baseline - value_y).abs();
        let color = lookup_color(&colors, series_key(point));

        let value_label = bar_cfg.show_values.then(|| {
            let above = point.value >= 0.0;
            Label {
                x: x + sub_width / 2.0,
                y: if above {
                    y - VALUE_LABEL_GAP
                } else {
                    y + bar_height + VALUE_LABEL_GAP + theme.font_size * 0.8
                },
                text: format_tick(point.value),
                font_size: theme.font_size * 0.9,
                anchor: TextAnchor::Middle,
                color: theme.muted_text_color.clone(),
                bold: false,
                rotate: None,
            }
        });

        let id = format!("bar-{idx}");
        hotspots.push(Hotspot {
            id: id.clone(),
            bounds: Rect {
                x,
                y,
                width: sub_width,
                height: bar_height,
            },
            tooltip: point_tooltip(point),
        });
        bars.push(BarRect {
            id,
            label: point.label.clone(),
            category: point.category.clone(),
            value: point.value,
            x,
            y,
            width: sub_width,
            height: bar_height,
            color,
            value_label,
        });
    }

    let legend = if has_categories {
        legend_row(
            colors.entries(),
            plot.x,
            plot.y - bar_cfg.legend_spacing,
            bar_cfg.legend_swatch,
            bar_cfg.legend_spacing,
            theme,
            config,
        )
    } else {
        Vec::new()
    };

    Layout {
        chart_type: ChartType::Bar,
        width,
        height,
        title: title_label(&chart.title, theme, width, bar_cfg.margin.top - bar_cfg.legend_spacing),
        hotspots,
        diagram: DiagramData::Bar(BarLayout {
            plot,
            y_scale,
            x_axis: bottom_band_axis(&band, plot, chart.x_axis_label.as_deref(), theme, config),
            y_axis: left_value_axis(
                &y_scale,
                plot,
                bar_cfg.y_ticks,
                chart.y_axis_label.as_deref(),
                theme,
            ),
            bars,
            legend,
            radius: bar_cfg.bar_radius,
        }),
    }
}

/// `[min(0, min), max(0, max)]`, widened to `[0, 1]` when every value is zero.
fn value_domain(points: &[DataPoint]) -> (f64, f64) {
    let (lo, hi) = points
        .iter()
        .map(|point| point.value)
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo <= f64::EPSILON {
        (0.0, 1.0)
    } else {
        (lo, hi)
    }
}

pub(super) fn series_key(point: &DataPoint) -> &str {
    point.category.as_deref().unwrap_or(DEFAULT_SERIES)
}

pub(super) fn lookup_color(colors: &OrdinalColors, key: &str) -> String {
    colors
        .entries()
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, color)| color.clone())
        .unwrap_or_default()
}

pub(super) fn point_tooltip(point: &DataPoint) -> String {
    match point.category.as_deref() {
        Some(category) => format!(
            "{}\n{}: {}",
            point.label,
            category,
            format_tick(point.value)
        ),
        None => format!("{}: {}", point.label, format_tick(point.value)),
    }
}
