use std::f64::consts::{FRAC_PI_2, TAU};

use crate::ir::{ChartType, PieChartData};
use crate::theme::{contrast_text_color, is_hex_color};

use super::scale::format_tick;
use super::*;

const LEGEND_GAP: f32 = 24.0;

pub(super) fn compute_pie_layout(
    chart: &PieChartData,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let pie_cfg = &config.pie;
    let total: f64 = chart.data.iter().map(|slice| slice.value.max(0.0)).sum();
    if total <= 0.0 {
        tracing::debug!(slices = chart.data.len(), "pie has no positive value");
        return compute_empty_layout(ChartType::Pie, &chart.title, theme, config, width, height);
    }

    let legend_texts: Vec<String> = chart
        .data
        .iter()
        .map(|slice| legend_text(&slice.label, percent_of(slice.value, total)))
        .collect();
    let legend_width = legend_texts
        .iter()
        .map(|text| label_width(text, theme.font_size, theme, config))
        .fold(0.0, f32::max)
        + pie_cfg.legend_swatch
        + LEGEND_TEXT_GAP;

    let area_width = (width - 2.0 * pie_cfg.margin - legend_width - LEGEND_GAP).max(1.0);
    let area_height = (height - pie_cfg.title_height - 2.0 * pie_cfg.margin).max(1.0);
    let radius = area_width.min(area_height) / 2.0;
    let center = (
        pie_cfg.margin + area_width / 2.0,
        pie_cfg.title_height + pie_cfg.margin + area_height / 2.0,
    );

    let mut colors = OrdinalColors::new(&theme.palette);
    let mut slices = Vec::with_capacity(chart.data.len());
    let mut hotspots = Vec::with_capacity(chart.data.len());
    let mut legend_entries = Vec::with_capacity(chart.data.len());
    let mut angle = 0.0f64;
    for (idx, (slice, legend)) in chart.data.iter().zip(legend_texts).enumerate() {
        let value = slice.value.max(0.0);
        let span = value / total * TAU;
        let start_angle = angle;
        let end_angle = angle + span;
        angle = end_angle;

        let palette_color = colors.color(&slice.label);
        let color = match slice.color.as_deref() {
            Some(custom) if is_hex_color(custom) => custom.trim().to_string(),
            Some(custom) => {
                tracing::warn!(
                    label = %slice.label,
                    color = %custom,
                    "pie slice color is not a hex color; using the palette"
                );
                palette_color
            }
            None => palette_color,
        };
        let percent = percent_of(slice.value, total);

        let text = (span >= pie_cfg.min_label_angle as f64).then(|| {
            let (x, y) = polar(
                center,
                radius * pie_cfg.label_radius_ratio,
                (start_angle + end_angle) / 2.0,
            );
            Label {
                x,
                y: y + theme.font_size * 0.35,
                text: format!("{}%", format_tick((percent * 10.0).round() / 10.0)),
                font_size: theme.font_size,
                anchor: TextAnchor::Middle,
                color: contrast_text_color(&color).to_string(),
                bold: true,
                rotate: None,
            }
        });

        let id = format!("slice-{idx}");
        if span > 0.0 {
            hotspots.push(Hotspot {
                id: id.clone(),
                bounds: wedge_bounds(center, radius, start_angle, end_angle),
                tooltip: format!(
                    "{}: {} ({:.1}%)",
                    slice.label,
                    format_tick(slice.value),
                    percent
                ),
            });
        }
        legend_entries.push((legend, color.clone()));
        slices.push(PieSliceLayout {
            id,
            label: slice.label.clone(),
            value: slice.value,
            percent,
            start_angle,
            end_angle,
            color,
            text,
        });
    }

    let legend_x = pie_cfg.margin + area_width + LEGEND_GAP;
    let legend_height = legend_entries.len() as f32 * pie_cfg.legend_spacing;
    let legend = legend_column(
        &legend_entries,
        legend_x,
        center.1 - legend_height / 2.0,
        pie_cfg.legend_swatch,
        pie_cfg.legend_spacing,
    );

    Layout {
        chart_type: ChartType::Pie,
        width,
        height,
        title: title_label(&chart.title, theme, width, pie_cfg.title_height),
        hotspots,
        diagram: DiagramData::Pie(PieLayout {
            center,
            radius,
            total,
            slices,
            legend,
        }),
    }
}

fn percent_of(value: f64, total: f64) -> f64 {
    value.max(0.0) / total * 100.0
}

fn legend_text(label: &str, percent: f64) -> String {
    format!("{label} ({percent:.1}%)")
}

/// Point at `angle` radians clockwise from 12 o'clock.
pub fn polar(center: (f32, f32), radius: f32, angle: f64) -> (f32, f32) {
    let r = radius as f64;
    (
        center.0 + (r * angle.sin()) as f32,
        center.1 - (r * angle.cos()) as f32,
    )
}

fn wedge_bounds(center: (f32, f32), radius: f32, start: f64, end: f64) -> Rect {
    let mut points = vec![center, polar(center, radius, start), polar(center, radius, end)];
    // Extremes of the circle the arc passes through.
    let mut quarter = (start / FRAC_PI_2).ceil() * FRAC_PI_2;
    while quarter < end {
        points.push(polar(center, radius, quarter));
        quarter += FRAC_PI_2;
    }
    let (min_x, max_x) = points
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (min_y, max_y) = points
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PieSlice;

    fn slice(label: &str, value: f64, color: Option<&str>) -> PieSlice {
        PieSlice {
            label: label.to_string(),
            value,
            color: color.map(str::to_string),
        }
    }

    fn pie_layout(data: Vec<PieSlice>) -> Layout {
        let chart = PieChartData {
            title: "Issue status".to_string(),
            data,
        };
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        compute_pie_layout(&chart, &Theme::modern(), &config, 960.0, 540.0)
    }

    fn slices(layout: &Layout) -> &[PieSliceLayout] {
        match &layout.diagram {
            DiagramData::Pie(pie) => &pie.slices,
            other => panic!("expected pie layout, got {other:?}"),
        }
    }

    #[test]
    fn spans_are_proportional_and_cover_the_circle() {
        let layout = pie_layout(vec![slice("A", 25.0, None), slice("B", 75.0, None)]);
        let slices = slices(&layout);
        let total: f64 = slices.iter().map(|s| s.span()).sum();
        assert!((total - TAU).abs() < 1e-9);
        assert!((slices[1].span() / slices[0].span() - 3.0).abs() < 1e-9);
        assert_eq!(slices[0].start_angle, 0.0);
        assert_eq!(slices[1].start_angle, slices[0].end_angle);
        assert!((slices[0].percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn hex_override_wins_and_other_colors_fall_back() {
        let layout = pie_layout(vec![
            slice("Open", 30.0, Some("#ff0000")),
            slice("Closed", 70.0, Some("crimson")),
        ]);
        let slices = slices(&layout);
        assert_eq!(slices[0].color, "#ff0000");
        assert_eq!(slices[1].color, Theme::modern().palette[1]);
    }

    #[test]
    fn negative_values_take_no_angle() {
        let layout = pie_layout(vec![slice("A", -5.0, None), slice("B", 10.0, None)]);
        let slices = slices(&layout);
        assert_eq!(slices[0].span(), 0.0);
        assert!((slices[1].span() - TAU).abs() < 1e-9);
        assert_eq!(layout.hotspots.len(), 1);
    }

    #[test]
    fn no_positive_value_shows_empty_state() {
        let layout = pie_layout(vec![slice("A", 0.0, None), slice("B", -1.0, None)]);
        assert!(layout.is_empty_state());
    }

    #[test]
    fn legend_lists_label_and_percent() {
        let layout = pie_layout(vec![slice("Yes", 1.0, None), slice("No", 3.0, None)]);
        let DiagramData::Pie(pie) = &layout.diagram else {
            panic!("expected pie layout");
        };
        assert_eq!(pie.legend[0].label, "Yes (25.0%)");
        assert_eq!(pie.legend[1].label, "No (75.0%)");
    }

    #[test]
    fn polar_starts_at_twelve_oclock_clockwise() {
        let (x, y) = polar((100.0, 100.0), 50.0, 0.0);
        assert!((x - 100.0).abs() < 1e-4 && (y - 50.0).abs() < 1e-4);
        let (x, y) = polar((100.0, 100.0), 50.0, FRAC_PI_2);
        assert!((x - 150.0).abs() < 1e-4 && (y - 100.0).abs() < 1e-4);
    }
}
