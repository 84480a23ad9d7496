use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Gantt,
    Bar,
    Pie,
    Line,
    Flow,
}

impl ChartType {
    pub const ALL: [ChartType; 5] = [
        ChartType::Gantt,
        ChartType::Bar,
        ChartType::Pie,
        ChartType::Line,
        ChartType::Flow,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "gantt" => Some(Self::Gantt),
            "bar" => Some(Self::Bar),
            "pie" => Some(Self::Pie),
            "line" => Some(Self::Line),
            "flow" => Some(Self::Flow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Gantt => "gantt",
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
            ChartType::Flow => "flow",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| ChartError::UnsupportedChartType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTask {
    pub id: i64,
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttChartData {
    pub title: String,
    pub tasks: Vec<GanttTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Shared by bar and line charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChartData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    pub data: Vec<DataPoint>,
}

pub type LineChartData = BarChartData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChartData {
    pub title: String,
    pub data: Vec<PieSlice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowNodeType {
    Start,
    Process,
    Decision,
    End,
}

impl FlowNodeType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "process" => Some(Self::Process),
            "decision" => Some(Self::Decision),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: FlowNodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowChartData {
    pub title: String,
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

/// Validated payload for one chart. The chart type travels beside the
/// payload, so serialization writes the inner value only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Gantt(GanttChartData),
    Bar(BarChartData),
    Pie(PieChartData),
    Line(LineChartData),
    Flow(FlowChartData),
}

impl ChartData {
    pub fn chart_type(&self) -> ChartType {
        match self {
            ChartData::Gantt(_) => ChartType::Gantt,
            ChartData::Bar(_) => ChartType::Bar,
            ChartData::Pie(_) => ChartType::Pie,
            ChartData::Line(_) => ChartType::Line,
            ChartData::Flow(_) => ChartType::Flow,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartData::Gantt(data) => &data.title,
            ChartData::Bar(data) | ChartData::Line(data) => &data.title,
            ChartData::Pie(data) => &data.title,
            ChartData::Flow(data) => &data.title,
        }
    }

    /// Number of tasks, points, slices or nodes.
    pub fn item_count(&self) -> usize {
        match self {
            ChartData::Gantt(data) => data.tasks.len(),
            ChartData::Bar(data) | ChartData::Line(data) => data.data.len(),
            ChartData::Pie(data) => data.data.len(),
            ChartData::Flow(data) => data.nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_type_tags_round_trip() {
        for kind in ChartType::ALL {
            assert_eq!(ChartType::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(ChartType::from_tag(" PIE "), Some(ChartType::Pie));
        assert!("radar".parse::<ChartType>().is_err());
    }

    #[test]
    fn chart_data_serializes_without_tag() {
        let data = ChartData::Pie(PieChartData {
            title: "Bugs".to_string(),
            data: vec![PieSlice {
                label: "Open".to_string(),
                value: 30.0,
                color: None,
            }],
        });
        let json = data.to_json();
        assert_eq!(json["title"], "Bugs");
        assert!(json["data"][0].get("color").is_none());
        assert_eq!(data.chart_type(), ChartType::Pie);
    }
}
