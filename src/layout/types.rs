use chrono::NaiveDate;
use serde::Serialize;

use crate::ir::{ChartType, FlowNodeType};

use super::scale::LinearScale;

#[derive(Debug, Clone, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_svg(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// A positioned single-line label.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub anchor: TextAnchor,
    pub color: String,
    pub bold: bool,
    /// Rotation in degrees around (x, y).
    pub rotate: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Click target with its hover text. `id` matches the `id` of the drawable
/// it annotates.
#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub id: String,
    pub bounds: Rect,
    pub tooltip: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrient {
    Bottom,
    Left,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisTick {
    /// x for a bottom axis, y for a left axis.
    pub offset: f32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisLayout {
    pub orient: AxisOrient,
    pub x: f32,
    pub y: f32,
    pub length: f32,
    pub ticks: Vec<AxisTick>,
    /// Grid line length across the plot; zero draws no grid.
    pub grid_length: f32,
    pub title: Option<Label>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendItem {
    pub x: f32,
    pub y: f32,
    pub swatch: f32,
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttRow {
    pub task_id: i64,
    pub label: String,
    pub y: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttBar {
    pub id: String,
    pub task_id: i64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttDependency {
    pub from: i64,
    pub to: i64,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttLayout {
    pub plot: Rect,
    /// `None` when no task carries a parseable date.
    pub domain: Option<(NaiveDate, NaiveDate)>,
    pub rows: Vec<GanttRow>,
    pub bars: Vec<GanttBar>,
    pub dependencies: Vec<GanttDependency>,
    pub axis: Option<AxisLayout>,
    pub legend: Vec<LegendItem>,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarRect {
    pub id: String,
    pub label: String,
    pub category: Option<String>,
    pub value: f64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub value_label: Option<Label>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarLayout {
    pub plot: Rect,
    pub y_scale: LinearScale,
    pub x_axis: AxisLayout,
    pub y_axis: AxisLayout,
    pub bars: Vec<BarRect>,
    pub legend: Vec<LegendItem>,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieSliceLayout {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub percent: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: String,
    pub text: Option<Label>,
}

impl PieSliceLayout {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PieLayout {
    pub center: (f32, f32),
    pub radius: f32,
    pub total: f64,
    pub slices: Vec<PieSliceLayout>,
    pub legend: Vec<LegendItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinePoint {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineLayout {
    pub plot: Rect,
    pub y_scale: LinearScale,
    pub x_axis: AxisLayout,
    pub y_axis: AxisLayout,
    pub series: Vec<LineSeries>,
    pub legend: Vec<LegendItem>,
    pub point_radius: f32,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowNodeLayout {
    pub id: String,
    pub node_id: String,
    pub node_type: FlowNodeType,
    /// Center of the node.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: TextBlock,
    pub fill: String,
    pub text_color: String,
}

/// Quadratic curve from `start` through `control` to `end`.
#[derive(Debug, Clone, Serialize)]
pub struct FlowLinkLayout {
    pub source: String,
    pub target: String,
    pub start: (f32, f32),
    pub control: (f32, f32),
    pub end: (f32, f32),
    pub label: Option<TextBlock>,
    pub label_anchor: (f32, f32),
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowLayout {
    pub nodes: Vec<FlowNodeLayout>,
    pub links: Vec<FlowLinkLayout>,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmptyLayout {
    pub message: Label,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiagramData {
    Gantt(GanttLayout),
    Bar(BarLayout),
    Pie(PieLayout),
    Line(LineLayout),
    Flow(FlowLayout),
    Empty(EmptyLayout),
}

/// Everything needed to draw one chart at a fixed size.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub chart_type: ChartType,
    pub width: f32,
    pub height: f32,
    pub title: Option<Label>,
    pub hotspots: Vec<Hotspot>,
    pub diagram: DiagramData,
}

impl Layout {
    pub fn is_empty_state(&self) -> bool {
        matches!(self.diagram, DiagramData::Empty(_))
    }

    /// Topmost hotspot under the point, for hover and click handling.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&Hotspot> {
        self.hotspots
            .iter()
            .rev()
            .find(|spot| spot.bounds.contains(x, y))
    }
}
