use crate::layout::{
    AxisLayout, AxisOrient, BarLayout, DiagramData, EmptyLayout, FlowLayout, FlowNodeLayout,
    GanttLayout, Label, Layout, LegendItem, LineLayout, PieLayout, TextBlock, polar,
};
use crate::config::RenderConfig;
use crate::ir::FlowNodeType;
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::path::Path;

const TICK_SIZE: f32 = 6.0;
const EDGE_LABEL_PAD_X: f32 = 6.0;
const EDGE_LABEL_PAD_Y: f32 = 3.0;

/// Hover text keyed by drawable id.
struct Tooltips<'a>(HashMap<&'a str, &'a str>);

impl<'a> Tooltips<'a> {
    fn new(layout: &'a Layout) -> Self {
        Self(
            layout
                .hotspots
                .iter()
                .map(|spot| (spot.id.as_str(), spot.tooltip.as_str()))
                .collect(),
        )
    }

    /// Opens a `<g>` carrying `data-id` for `id`.
    fn open(&self, id: &str, class: &str) -> String {
        format!(
            "<g class=\"{class}\" data-id=\"{}\">",
            escape_xml(id)
        )
    }

    /// Closes the group, with the tooltip as its `<title>` when one exists.
    fn close(&self, id: &str) -> String {
        match self.0.get(id) {
            Some(text) => format!("<title>{}</title></g>", escape_xml(text)),
            None => "</g>".to_string(),
        }
    }
}

pub fn render_svg(layout: &Layout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;
    let tooltips = Tooltips::new(layout);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"{}\" data-chart-type=\"{}\">",
        escape_xml(&theme.font_family),
        layout.chart_type
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.flow_link_color
    ));
    svg.push_str(&format!(
        "<marker id=\"dep-arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"5\" markerHeight=\"5\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.muted_text_color
    ));
    svg.push_str("</defs>");

    if let Some(title) = &layout.title {
        svg.push_str(&label_svg(title, "chart-title"));
    }

    match &layout.diagram {
        DiagramData::Gantt(gantt) => render_gantt(&mut svg, gantt, theme, &tooltips),
        DiagramData::Bar(bar) => render_bar(&mut svg, bar, theme, &tooltips),
        DiagramData::Pie(pie) => render_pie(&mut svg, pie, theme, &tooltips),
        DiagramData::Line(line) => render_line(&mut svg, line, theme, &tooltips),
        DiagramData::Flow(flow) => render_flow(&mut svg, flow, theme, &tooltips),
        DiagramData::Empty(empty) => render_empty(&mut svg, empty),
    }

    svg.push_str("</svg>");
    svg
}

fn render_gantt(svg: &mut String, gantt: &GanttLayout, theme: &Theme, tooltips: &Tooltips<'_>) {
    if let Some(axis) = &gantt.axis {
        svg.push_str(&axis_svg(axis, theme));
    }
    for row in &gantt.rows {
        svg.push_str(&format!(
            "<text class=\"task-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"{}\" fill=\"{}\">{}</text>",
            gantt.plot.x - 12.0,
            row.y + theme.font_size * 0.35,
            theme.font_size,
            theme.text_color,
            escape_xml(&row.label)
        ));
    }
    for bar in &gantt.bars {
        svg.push_str(&tooltips.open(&bar.id, "task"));
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{r}\" ry=\"{r}\" fill=\"{}\"/>",
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            bar.color,
            r = gantt.radius
        ));
        svg.push_str(&tooltips.close(&bar.id));
    }
    // Rows without a bar still get a hover strip.
    for row in &gantt.rows {
        let id = format!("task-{}", row.task_id);
        if gantt.bars.iter().any(|bar| bar.id == id) {
            continue;
        }
        svg.push_str(&tooltips.open(&id, "task invalid"));
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"transparent\"/>",
            gantt.plot.x,
            row.y - row.height / 2.0,
            gantt.plot.width,
            row.height
        ));
        svg.push_str(&tooltips.close(&id));
    }
    for dep in &gantt.dependencies {
        svg.push_str(&format!(
            "<path class=\"dependency\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.2\" marker-end=\"url(#dep-arrow)\"/>",
            points_to_path(&dep.points),
            theme.muted_text_color
        ));
    }
    svg.push_str(&legend_svg(&gantt.legend, theme));
}

fn render_bar(svg: &mut String, bar: &BarLayout, theme: &Theme, tooltips: &Tooltips<'_>) {
    svg.push_str(&axis_svg(&bar.y_axis, theme));
    svg.push_str(&axis_svg(&bar.x_axis, theme));
    for rect in &bar.bars {
        svg.push_str(&tooltips.open(&rect.id, "bar"));
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{r}\" ry=\"{r}\" fill=\"{}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            rect.color,
            r = bar.radius
        ));
        svg.push_str(&tooltips.close(&rect.id));
        if let Some(label) = &rect.value_label {
            svg.push_str(&label_svg(label, "value"));
        }
    }
    svg.push_str(&legend_svg(&bar.legend, theme));
}

fn render_pie(svg: &mut String, pie: &PieLayout, theme: &Theme, tooltips: &Tooltips<'_>) {
    let (cx, cy) = pie.center;
    for slice in &pie.slices {
        if slice.span() <= 0.0 {
            continue;
        }
        svg.push_str(&tooltips.open(&slice.id, "slice"));
        if slice.span() >= TAU - 1e-9 {
            svg.push_str(&format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
                pie.radius, slice.color, theme.background
            ));
        } else {
            let (x0, y0) = polar(pie.center, pie.radius, slice.start_angle);
            let (x1, y1) = polar(pie.center, pie.radius, slice.end_angle);
            let large_arc = if slice.span() > std::f64::consts::PI { 1 } else { 0 };
            svg.push_str(&format!(
                "<path d=\"M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large_arc} 1 {x1:.2} {y1:.2} Z\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
                slice.color,
                theme.background,
                r = pie.radius
            ));
        }
        svg.push_str(&tooltips.close(&slice.id));
        if let Some(label) = &slice.text {
            svg.push_str(&label_svg(label, "slice-label"));
        }
    }
    svg.push_str(&legend_svg(&pie.legend, theme));
}

fn render_line(svg: &mut String, line: &LineLayout, theme: &Theme, tooltips: &Tooltips<'_>) {
    svg.push_str(&axis_svg(&line.y_axis, theme));
    svg.push_str(&axis_svg(&line.x_axis, theme));
    for series in &line.series {
        let points: Vec<(f32, f32)> = series.points.iter().map(|p| (p.x, p.y)).collect();
        svg.push_str(&format!(
            "<path class=\"series\" data-series=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\"/>",
            escape_xml(&series.name),
            points_to_path(&points),
            series.color,
            line.stroke_width
        ));
        for point in &series.points {
            svg.push_str(&tooltips.open(&point.id, "point"));
            svg.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.5\"/>",
                point.x, point.y, line.point_radius, series.color, theme.background
            ));
            svg.push_str(&tooltips.close(&point.id));
        }
    }
    svg.push_str(&legend_svg(&line.legend, theme));
}

fn render_flow(svg: &mut String, flow: &FlowLayout, theme: &Theme, tooltips: &Tooltips<'_>) {
    for link in &flow.links {
        svg.push_str(&format!(
            "<path class=\"link\" data-source=\"{}\" data-target=\"{}\" d=\"M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" marker-end=\"url(#arrow)\"/>",
            escape_xml(&link.source),
            escape_xml(&link.target),
            link.start.0,
            link.start.1,
            link.control.0,
            link.control.1,
            link.end.0,
            link.end.1,
            theme.flow_link_color
        ));
    }
    for link in &flow.links {
        let Some(label) = &link.label else {
            continue;
        };
        let (x, y) = link.label_anchor;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\"/>",
            x - label.width / 2.0 - EDGE_LABEL_PAD_X,
            y - label.height / 2.0 - EDGE_LABEL_PAD_Y,
            label.width + 2.0 * EDGE_LABEL_PAD_X,
            label.height + 2.0 * EDGE_LABEL_PAD_Y,
            theme.edge_label_background
        ));
        svg.push_str(&text_block_svg(
            x,
            y,
            label,
            theme.font_size * 0.9,
            &theme.muted_text_color,
        ));
    }
    for node in &flow.nodes {
        svg.push_str(&tooltips.open(&node.id, "node"));
        svg.push_str(&node_shape_svg(node, theme));
        svg.push_str(&text_block_svg(
            node.x,
            node.y,
            &node.label,
            theme.font_size,
            &node.text_color,
        ));
        svg.push_str(&tooltips.close(&node.id));
    }
}

fn render_empty(svg: &mut String, empty: &EmptyLayout) {
    svg.push_str(&label_svg(&empty.message, "empty-state"));
}

fn node_shape_svg(node: &FlowNodeLayout, theme: &Theme) -> String {
    let x = node.x - node.width / 2.0;
    let y = node.y - node.height / 2.0;
    match node.node_type {
        FlowNodeType::Decision => format!(
            "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.5\"/>",
            node.x,
            y,
            x + node.width,
            node.y,
            node.x,
            y + node.height,
            x,
            node.y,
            node.fill,
            theme.flow_node_border
        ),
        FlowNodeType::Start | FlowNodeType::End => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.5\"/>",
            node.width,
            node.height,
            node.fill,
            theme.flow_node_border,
            r = node.height / 2.0
        ),
        FlowNodeType::Process => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.5\"/>",
            node.width, node.height, node.fill, theme.flow_node_border
        ),
    }
}

fn axis_svg(axis: &AxisLayout, theme: &Theme) -> String {
    let mut out = String::from("<g class=\"axis\">");
    match axis.orient {
        AxisOrient::Bottom => {
            for tick in &axis.ticks {
                if axis.grid_length > 0.0 {
                    out.push_str(&format!(
                        "<line x1=\"{o:.2}\" y1=\"{:.2}\" x2=\"{o:.2}\" y2=\"{:.2}\" stroke=\"{}\"/>",
                        axis.y,
                        axis.y - axis.grid_length,
                        theme.grid_color,
                        o = tick.offset
                    ));
                }
                out.push_str(&format!(
                    "<line x1=\"{o:.2}\" y1=\"{:.2}\" x2=\"{o:.2}\" y2=\"{:.2}\" stroke=\"{}\"/>",
                    axis.y,
                    axis.y + TICK_SIZE,
                    theme.axis_color,
                    o = tick.offset
                ));
                out.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"{}\" fill=\"{}\">{}</text>",
                    tick.offset,
                    axis.y + TICK_SIZE + theme.font_size,
                    theme.font_size,
                    theme.text_color,
                    escape_xml(&tick.label)
                ));
            }
            out.push_str(&format!(
                "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{}\"/>",
                axis.x,
                axis.x + axis.length,
                theme.axis_color,
                y = axis.y
            ));
        }
        AxisOrient::Left => {
            for tick in &axis.ticks {
                if axis.grid_length > 0.0 {
                    out.push_str(&format!(
                        "<line x1=\"{:.2}\" y1=\"{o:.2}\" x2=\"{:.2}\" y2=\"{o:.2}\" stroke=\"{}\"/>",
                        axis.x,
                        axis.x + axis.grid_length,
                        theme.grid_color,
                        o = tick.offset
                    ));
                }
                out.push_str(&format!(
                    "<line x1=\"{:.2}\" y1=\"{o:.2}\" x2=\"{:.2}\" y2=\"{o:.2}\" stroke=\"{}\"/>",
                    axis.x - TICK_SIZE,
                    axis.x,
                    theme.axis_color,
                    o = tick.offset
                ));
                out.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"{}\" fill=\"{}\">{}</text>",
                    axis.x - TICK_SIZE - 3.0,
                    tick.offset + theme.font_size * 0.35,
                    theme.font_size,
                    theme.text_color,
                    escape_xml(&tick.label)
                ));
            }
            out.push_str(&format!(
                "<line x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\" stroke=\"{}\"/>",
                axis.y,
                axis.y + axis.length,
                theme.axis_color,
                x = axis.x
            ));
        }
    }
    if let Some(title) = &axis.title {
        out.push_str(&label_svg(title, "axis-title"));
    }
    out.push_str("</g>");
    out
}

fn legend_svg(items: &[LegendItem], theme: &Theme) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("<g class=\"legend\">");
    for item in items {
        out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{s}\" height=\"{s}\" rx=\"2\" ry=\"2\" fill=\"{}\"/>",
            item.x,
            item.y - item.swatch / 2.0,
            item.color,
            s = item.swatch
        ));
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            item.x + item.swatch + 6.0,
            item.y + theme.font_size * 0.35,
            theme.font_size,
            theme.text_color,
            escape_xml(&item.label)
        ));
    }
    out.push_str("</g>");
    out
}

fn label_svg(label: &Label, class: &str) -> String {
    let weight = if label.bold { " font-weight=\"600\"" } else { "" };
    let transform = label
        .rotate
        .map(|deg| format!(" transform=\"rotate({deg} {:.2} {:.2})\"", label.x, label.y))
        .unwrap_or_default();
    format!(
        "<text class=\"{class}\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{}\" font-size=\"{}\" fill=\"{}\"{weight}{transform}>{}</text>",
        label.x,
        label.y,
        label.anchor.as_svg(),
        label.font_size,
        label.color,
        escape_xml(&label.text)
    )
}

/// Multi-line text centered on (`x`, `y`).
fn text_block_svg(x: f32, y: f32, block: &TextBlock, font_size: f32, color: &str) -> String {
    let line_count = block.lines.len().max(1) as f32;
    let line_height = block.height / line_count;
    let start_y = y - block.height / 2.0 + line_height / 2.0 + font_size * 0.35;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-size=\"{font_size}\" fill=\"{color}\">"
    );
    for (idx, line) in block.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in rest {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .map(|name| name.trim().trim_matches('"').trim_matches('\''))
        .find(|name| !name.is_empty())
        .unwrap_or("sans-serif")
        .to_string();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

/// Escapes markup and drops characters XML 1.0 cannot carry: C0 controls
/// other than tab, newline and carriage return, plus U+FFFE and U+FFFF.
fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            '\u{FFFE}' | '\u{FFFF}' => {}
            c if c < '\u{20}' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{ChartData, DataPoint, PieChartData, PieSlice};
    use crate::layout::compute_layout;

    fn fast_config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn svg_uses_layout_dimensions_and_text() {
        let chart = ChartData::Bar(crate::ir::BarChartData {
            title: "Sales & Returns".to_string(),
            x_axis_label: None,
            y_axis_label: None,
            data: vec![
                DataPoint {
                    label: "Q1".to_string(),
                    value: 10.0,
                    category: None,
                },
                DataPoint {
                    label: "Q2".to_string(),
                    value: 30.0,
                    category: None,
                },
            ],
        });
        let theme = Theme::modern();
        let layout = compute_layout(&chart, &theme, &fast_config(), (800.0, 450.0));
        let svg = render_svg(&layout, &theme);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"800\" height=\"450\""));
        assert!(svg.contains("Sales &amp; Returns"));
        assert!(svg.contains(">Q1<") && svg.contains(">Q2<"));
        assert!(svg.contains("data-id=\"bar-1\""));
        assert!(svg.contains("<title>Q2: 30</title>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn full_pie_slice_renders_as_circle() {
        let chart = ChartData::Pie(PieChartData {
            title: String::new(),
            data: vec![PieSlice {
                label: "All".to_string(),
                value: 5.0,
                color: Some("#123456".to_string()),
            }],
        });
        let theme = Theme::modern();
        let layout = compute_layout(&chart, &theme, &fast_config(), (600.0, 400.0));
        let svg = render_svg(&layout, &theme);
        assert!(svg.contains("<circle"));
        assert!(svg.contains("fill=\"#123456\""));
        assert!(svg.contains("All (100.0%)"));
    }

    #[test]
    fn empty_state_shows_message() {
        let chart = ChartData::Pie(PieChartData {
            title: "Nothing".to_string(),
            data: vec![],
        });
        let theme = Theme::modern();
        let layout = compute_layout(&chart, &theme, &fast_config(), (600.0, 400.0));
        let svg = render_svg(&layout, &theme);
        assert!(svg.contains("No data available"));
        assert!(svg.contains("Nothing"));
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }

    #[test]
    fn control_characters_never_reach_the_document() {
        assert_eq!(escape_xml("Sales\u{1}\u{1b}[0m\tQ1\n"), "Sales[0m\tQ1\n");
        let chart = ChartData::Bar(crate::ir::BarChartData {
            title: "Sales\u{0001}".to_string(),
            x_axis_label: None,
            y_axis_label: None,
            data: vec![DataPoint {
                label: "Q\u{7}1".to_string(),
                value: 3.0,
                category: Some("North\u{0}".to_string()),
            }],
        });
        let theme = Theme::modern();
        let layout = compute_layout(&chart, &theme, &fast_config(), (400.0, 300.0));
        let svg = render_svg(&layout, &theme);
        assert!(svg.contains(">Sales<"));
        assert!(
            !svg.chars().any(|c| c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')),
            "control character in svg"
        );
    }
}
