use chrono::NaiveDate;
use std::collections::HashMap;

use crate::ir::{GanttChartData, GanttTask};
use crate::schema::parse_date;
use super::scale::TimeScale;

use super::*;

const UNCATEGORIZED: &str = "Uncategorized";
const LABEL_COLUMN_GAP: f32 = 12.0;
// Horizontal run out of a bar before a connector turns.
const CONNECTOR_STUB: f32 = 8.0;

struct ParsedTask<'a> {
    task: &'a GanttTask,
    dates: Option<(NaiveDate, NaiveDate)>,
}

pub(super) fn compute_gantt_layout(
    chart: &GanttChartData,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let gantt_cfg = &config.gantt;
    let tasks: Vec<ParsedTask<'_>> = chart
        .tasks
        .iter()
        .map(|task| {
            let dates = parse_date(&task.start).zip(parse_date(&task.end));
            if dates.is_none() {
                tracing::warn!(
                    task = task.id,
                    start = %task.start,
                    end = %task.end,
                    "gantt task has an unparseable date; drawing it without a bar"
                );
            }
            ParsedTask { task, dates }
        })
        .collect();

    let domain = gantt_domain(&tasks);

    let label_font = theme.font_size;
    let longest = chart
        .tasks
        .iter()
        .map(|task| label_width(&task.name, label_font, theme, config))
        .fold(0.0, f32::max);
    let label_column = longest.clamp(gantt_cfg.min_label_width, gantt_cfg.max_label_width);

    let mut margin = gantt_cfg.margin;
    margin.left += label_column + LABEL_COLUMN_GAP;
    let plot = plot_area(width, height, &margin);

    let row_keys: Vec<String> = (0..tasks.len()).map(|idx| idx.to_string()).collect();
    let band = BandScale::new(row_keys, (plot.y, plot.bottom()), gantt_cfg.band_padding);

    let has_categories = chart.tasks.iter().any(|task| task.category.is_some());
    let colors = category_colors(
        chart
            .tasks
            .iter()
            .map(|task| task.category.as_deref().unwrap_or(UNCATEGORIZED)),
        theme,
    );
    let color_of =
        |task: &GanttTask| lookup_color(&colors, task.category.as_deref().unwrap_or(UNCATEGORIZED));

    let time = domain.map(|domain| TimeScale::new(domain, (plot.x, plot.right())));

    let mut rows = Vec::with_capacity(tasks.len());
    let mut bars = Vec::new();
    let mut hotspots = Vec::with_capacity(tasks.len());
    for (idx, parsed) in tasks.iter().enumerate() {
        let task = parsed.task;
        let y = band.position_at(idx);
        rows.push(GanttRow {
            task_id: task.id,
            label: truncate_to_width(&task.name, label_column, label_font, theme, config),
            y: y + band.bandwidth / 2.0,
            height: band.bandwidth,
        });

        let id = format!("task-{}", task.id);
        let tooltip = task_tooltip(task, parsed.dates);
        match (parsed.dates, time.as_ref()) {
            (Some((start, end)), Some(time)) => {
                let x0 = time.scale(start);
                let x1 = time.scale(end);
                let bar = GanttBar {
                    id: id.clone(),
                    task_id: task.id,
                    x: x0.min(x1),
                    y,
                    width: (x1 - x0).abs().max(1.0),
                    height: band.bandwidth,
                    color: color_of(task),
                };
                hotspots.push(Hotspot {
                    id,
                    bounds: Rect {
                        x: bar.x,
                        y: bar.y,
                        width: bar.width,
                        height: bar.height,
                    },
                    tooltip,
                });
                bars.push(bar);
            }
            _ => {
                // No bar: the whole row strip carries the tooltip.
                hotspots.push(Hotspot {
                    id,
                    bounds: Rect {
                        x: plot.x,
                        y,
                        width: plot.width,
                        height: band.bandwidth,
                    },
                    tooltip,
                });
            }
        }
    }

    let dependencies = if gantt_cfg.show_dependencies {
        dependency_connectors(&chart.tasks, &bars)
    } else {
        Vec::new()
    };

    let axis = time.map(|time| AxisLayout {
        orient: AxisOrient::Bottom,
        x: plot.x,
        y: plot.bottom(),
        length: plot.width,
        ticks: time
            .ticks(gantt_cfg.tick_target)
            .into_iter()
            .map(|(date, label)| AxisTick {
                offset: time.scale(date),
                label,
            })
            .collect(),
        grid_length: plot.height,
        title: None,
    });

    let legend = if has_categories {
        legend_row(
            colors.entries(),
            plot.x,
            plot.y - gantt_cfg.legend_spacing,
            gantt_cfg.legend_swatch,
            gantt_cfg.legend_spacing,
            theme,
            config,
        )
    } else {
        Vec::new()
    };

    Layout {
        chart_type: crate::ir::ChartType::Gantt,
        width,
        height,
        title: title_label(&chart.title, theme, width, gantt_cfg.margin.top - gantt_cfg.legend_spacing),
        hotspots,
        diagram: DiagramData::Gantt(GanttLayout {
            plot,
            domain,
            rows,
            bars,
            dependencies,
            axis,
            legend,
            radius: gantt_cfg.bar_radius,
        }),
    }
}

/// Earliest start to latest end over tasks whose dates parse.
fn gantt_domain(tasks: &[ParsedTask<'_>]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = tasks.iter().filter_map(|task| task.dates);
    let (first_start, first_end) = dates.next()?;
    let init = (first_start.min(first_end), first_start.max(first_end));
    Some(dates.fold(init, |(lo, hi), (start, end)| {
        (lo.min(start).min(end), hi.max(end).max(start))
    }))
}

fn task_tooltip(task: &GanttTask, dates: Option<(NaiveDate, NaiveDate)>) -> String {
    let mut lines = vec![task.name.clone()];
    match dates {
        Some((start, end)) => {
            lines.push(format!("Start: {}", start.format("%b %d, %Y")));
            lines.push(format!("End: {}", end.format("%b %d, %Y")));
        }
        None => lines.push("Invalid Date".to_string()),
    }
    if let Some(category) = task.category.as_deref() {
        lines.push(format!("Category: {category}"));
    }
    lines.join("\n")
}

/// Elbow from the end of each dependency's bar to the start of the
/// dependent bar. Ids without a bar are skipped.
fn dependency_connectors(tasks: &[GanttTask], bars: &[GanttBar]) -> Vec<GanttDependency> {
    let by_id: HashMap<i64, &GanttBar> = bars.iter().map(|bar| (bar.task_id, bar)).collect();
    let mut connectors = Vec::new();
    for task in tasks {
        let Some(target) = by_id.get(&task.id) else {
            continue;
        };
        for dep in task.dependencies.iter().flatten() {
            let Some(source) = by_id.get(dep) else {
                continue;
            };
            let from = (source.x + source.width, source.y + source.height / 2.0);
            let to = (target.x, target.y + target.height / 2.0);
            let turn_x = (from.0 + CONNECTOR_STUB).max(to.0 - CONNECTOR_STUB);
            let points = if turn_x <= to.0 {
                vec![from, (turn_x, from.1), (turn_x, to.1), to]
            } else {
                // Dependent starts before the dependency ends: route below.
                let mid_y = (from.1 + to.1) / 2.0;
                let back_x = to.0 - CONNECTOR_STUB;
                vec![
                    from,
                    (from.0 + CONNECTOR_STUB, from.1),
                    (from.0 + CONNECTOR_STUB, mid_y),
                    (back_x, mid_y),
                    (back_x, to.1),
                    to,
                ]
            };
            connectors.push(GanttDependency {
                from: *dep,
                to: task.id,
                points,
            });
        }
    }
    connectors
}
