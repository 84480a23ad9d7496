use crate::ir::{ChartType, DataPoint, LineChartData};

use super::scale::distinct_in_order;
use super::*;

pub(super) fn compute_line_layout(
    chart: &LineChartData,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let line_cfg = &config.line;
    let plot = plot_area(width, height, &line_cfg.margin);

    let labels = distinct_in_order(chart.data.iter().map(|point| point.label.as_str()));
    let band = BandScale::new(labels, (plot.x, plot.right()), line_cfg.band_padding);

    let y_scale = LinearScale::new(value_domain(&chart.data, line_cfg.y_headroom), (plot.bottom(), plot.y));

    let series_names = distinct_in_order(chart.data.iter().map(series_key));
    let colors = category_colors(series_names.iter().map(String::as_str), theme);

    let mut series: Vec<LineSeries> = series_names
        .iter()
        .map(|name| LineSeries {
            name: name.clone(),
            color: lookup_color(&colors, name),
            points: Vec::new(),
        })
        .collect();
    let mut hotspots = Vec::with_capacity(chart.data.len());
    let hit = line_cfg.point_radius * 2.0;
    for point in &chart.data {
        let (Some(x), Some(series_idx)) = (
            band.center(&point.label),
            series_names.iter().position(|name| name == series_key(point)),
        ) else {
            continue;
        };
        let line = &mut series[series_idx];
        let id = format!("point-{}-{}", series_idx, line.points.len());
        let y = y_scale.scale(point.value);
        hotspots.push(Hotspot {
            id: id.clone(),
            bounds: Rect {
                x: x - hit / 2.0,
                y: y - hit / 2.0,
                width: hit,
                height: hit,
            },
            tooltip: point_tooltip(point),
        });
        line.points.push(LinePoint {
            id,
            label: point.label.clone(),
            value: point.value,
            x,
            y,
        });
    }

    let legend = legend_row(
        colors.entries(),
        plot.x,
        plot.y - line_cfg.legend_spacing,
        line_cfg.legend_swatch,
        line_cfg.legend_spacing,
        theme,
        config,
    );

    Layout {
        chart_type: ChartType::Line,
        width,
        height,
        title: title_label(&chart.title, theme, width, line_cfg.margin.top - line_cfg.legend_spacing),
        hotspots,
        diagram: DiagramData::Line(LineLayout {
            plot,
            y_scale,
            x_axis: bottom_band_axis(&band, plot, chart.x_axis_label.as_deref(), theme, config),
            y_axis: left_value_axis(
                &y_scale,
                plot,
                line_cfg.y_ticks,
                chart.y_axis_label.as_deref(),
                theme,
            ),
            series,
            legend,
            point_radius: line_cfg.point_radius,
            stroke_width: line_cfg.stroke_width,
        }),
    }
}

/// Zero plus every value, pushed outward from zero by `headroom` and kept
/// inside the finite range. Degenerate domains widen to one unit.
fn value_domain(points: &[DataPoint], headroom: f64) -> (f64, f64) {
    let max = points.iter().map(|p| p.value).fold(0.0f64, f64::max);
    let min = points.iter().map(|p| p.value).fold(0.0f64, f64::min);
    let headroom = headroom.max(1.0);
    let hi = (max * headroom).min(f64::MAX);
    let lo = (min * headroom).max(f64::MIN);
    if hi - lo <= f64::EPSILON {
        (lo, lo + 1.0)
    } else {
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, value: f64, category: Option<&str>) -> DataPoint {
        DataPoint {
            label: label.to_string(),
            value,
            category: category.map(str::to_string),
        }
    }

    fn line_layout(data: Vec<DataPoint>) -> (Layout, LineLayout) {
        let chart = LineChartData {
            title: "Visitors".to_string(),
            x_axis_label: None,
            y_axis_label: None,
            data,
        };
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        let layout = compute_line_layout(&chart, &Theme::modern(), &config, 960.0, 540.0);
        let DiagramData::Line(line) = layout.diagram.clone() else {
            panic!("expected line layout");
        };
        (layout, line)
    }

    #[test]
    fn ungrouped_points_form_default_series() {
        let (layout, line) = line_layout(vec![
            point("Jan", 100.0, None),
            point("Feb", 150.0, None),
            point("Mar", 120.0, None),
        ]);
        assert_eq!(line.series.len(), 1);
        assert_eq!(line.series[0].name, "Default");
        assert_eq!(line.series[0].points.len(), 3);
        assert_eq!(layout.hotspots.len(), 3);
        assert!((line.y_scale.domain.1 - 165.0).abs() < 1e-9);
        assert_eq!(line.y_scale.domain.0, 0.0);
    }

    #[test]
    fn points_sit_at_band_centers_and_series_split_by_category() {
        let (_, line) = line_layout(vec![
            point("Jan", 10.0, Some("Web")),
            point("Jan", 4.0, Some("Mobile")),
            point("Feb", 12.0, Some("Web")),
            point("Feb", 6.0, Some("Mobile")),
        ]);
        let names: Vec<&str> = line.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Web", "Mobile"]);
        let web = &line.series[0];
        let mobile = &line.series[1];
        assert_eq!(web.points[0].x, mobile.points[0].x);
        assert!(web.points[1].x > web.points[0].x);
        assert!(web.points[0].y < mobile.points[0].y);
        assert_ne!(web.color, mobile.color);
        assert_eq!(line.legend.len(), 2);
    }

    #[test]
    fn all_negative_series_stays_inside_plot() {
        let (_, line) = line_layout(vec![point("Jan", -10.0, None), point("Feb", -5.0, None)]);
        assert!((line.y_scale.domain.0 + 11.0).abs() < 1e-9);
        assert_eq!(line.y_scale.domain.1, 0.0);
        for p in &line.series[0].points {
            assert!(p.y >= line.plot.y && p.y <= line.plot.bottom(), "y={}", p.y);
        }
        assert!(line.series[0].points[1].y < line.series[0].points[0].y);
    }

    #[test]
    fn mixed_signs_get_headroom_both_ways() {
        let (_, line) = line_layout(vec![point("Jan", -20.0, None), point("Feb", 40.0, None)]);
        assert!((line.y_scale.domain.0 + 22.0).abs() < 1e-9);
        assert!((line.y_scale.domain.1 - 44.0).abs() < 1e-9);
    }

    #[test]
    fn values_near_f64_max_keep_distinct_positions() {
        let (_, line) = line_layout(vec![point("Jan", 1.7e308, None), point("Feb", 1.0, None)]);
        assert!(line.y_scale.domain.1.is_finite());
        let points = &line.series[0].points;
        assert!(points.iter().all(|p| p.y.is_finite()));
        assert!(points[0].y < points[1].y);
        assert!(points[0].y >= line.plot.y);
        assert!(!line.y_axis.ticks.is_empty());
        assert!(line.y_axis.ticks.iter().all(|t| !t.label.contains("inf")));
    }
}
