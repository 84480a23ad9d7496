//! Per-chart-type data contracts.
//!
//! Schemas walk an untrusted [`serde_json::Value`] and either build the typed
//! chart payload or report every offending field at once. Only shape is
//! checked: presence, primitive types, array element shape. Business rules
//! (date order, dependency ids, pie totals) are opt-in via [`StrictChecks`].

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, ValidationErrors};
use crate::ir::{
    BarChartData, DataPoint, FlowChartData, FlowLink, FlowNode, FlowNodeType, GanttChartData,
    GanttTask, PieChartData, PieSlice,
};
use crate::store::NewChart;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const PIE_SUM_TOLERANCE: f64 = 0.01;

/// Cross-field rules that are off unless configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrictChecks {
    /// Task dates must parse and `start <= end`.
    pub gantt_date_order: bool,
    /// Dependency ids must name a task of the same chart; ids must be unique.
    pub gantt_dependencies: bool,
    /// Pie values must add up to this total.
    pub pie_sum: Option<f64>,
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn gantt(value: &Value, strict: &StrictChecks) -> Result<GanttChartData, ChartError> {
    let mut walker = Walker::default();
    let Some(root) = walker.object(value, "") else {
        return Err(ChartError::SchemaValidation(walker.errors));
    };
    let title = walker.required_string(root, "title", "");
    let mut tasks = Vec::new();
    if let Some(items) = walker.required_array(root, "tasks", "") {
        for (idx, item) in items.iter().enumerate() {
            let path = index_path("tasks", idx);
            let Some(obj) = walker.object(item, &path) else {
                continue;
            };
            let id = walker.required_integer(obj, "id", &path);
            let name = walker.required_string(obj, "name", &path);
            let start = walker.required_date(obj, "start", &path);
            let end = walker.required_date(obj, "end", &path);
            let dependencies = walker.optional_integer_array(obj, "dependencies", &path);
            let category = walker.optional_string(obj, "category", &path);
            if let (Some(id), Some(name), Some(start), Some(end)) = (id, name, start, end) {
                tasks.push(GanttTask {
                    id,
                    name,
                    start,
                    end,
                    dependencies,
                    category,
                });
            }
        }
    }

    let mut errors = walker.errors;
    if errors.is_empty() {
        if strict.gantt_date_order {
            check_gantt_dates(&tasks, &mut errors);
        }
        if strict.gantt_dependencies {
            check_gantt_dependencies(&tasks, &mut errors);
        }
    }
    errors.into_result(GanttChartData {
        title: title.unwrap_or_default(),
        tasks,
    })
}

/// Bar and line charts share this contract.
pub fn bar(value: &Value) -> Result<BarChartData, ChartError> {
    let mut walker = Walker::default();
    let Some(root) = walker.object(value, "") else {
        return Err(ChartError::SchemaValidation(walker.errors));
    };
    let title = walker.required_string(root, "title", "");
    let x_axis_label = walker.optional_string(root, "xAxisLabel", "");
    let y_axis_label = walker.optional_string(root, "yAxisLabel", "");
    let mut data = Vec::new();
    if let Some(items) = walker.required_array(root, "data", "") {
        for (idx, item) in items.iter().enumerate() {
            let path = index_path("data", idx);
            let Some(obj) = walker.object(item, &path) else {
                continue;
            };
            let label = walker.required_string(obj, "label", &path);
            let value = walker.required_number(obj, "value", &path);
            let category = walker.optional_string(obj, "category", &path);
            if let (Some(label), Some(value)) = (label, value) {
                data.push(DataPoint {
                    label,
                    value,
                    category,
                });
            }
        }
    }
    walker.errors.into_result(BarChartData {
        title: title.unwrap_or_default(),
        x_axis_label,
        y_axis_label,
        data,
    })
}

pub fn pie(value: &Value, strict: &StrictChecks) -> Result<PieChartData, ChartError> {
    let mut walker = Walker::default();
    let Some(root) = walker.object(value, "") else {
        return Err(ChartError::SchemaValidation(walker.errors));
    };
    let title = walker.required_string(root, "title", "");
    let mut data = Vec::new();
    if let Some(items) = walker.required_array(root, "data", "") {
        for (idx, item) in items.iter().enumerate() {
            let path = index_path("data", idx);
            let Some(obj) = walker.object(item, &path) else {
                continue;
            };
            let label = walker.required_string(obj, "label", &path);
            let value = walker.required_number(obj, "value", &path);
            let color = walker.optional_string(obj, "color", &path);
            if let (Some(label), Some(value)) = (label, value) {
                data.push(PieSlice {
                    label,
                    value,
                    color,
                });
            }
        }
    }

    let mut errors = walker.errors;
    if errors.is_empty()
        && let Some(expected) = strict.pie_sum
    {
        let total: f64 = data.iter().map(|slice| slice.value).sum();
        if (total - expected).abs() > PIE_SUM_TOLERANCE {
            errors.push(
                "data",
                format!("values sum to {}, expected {}", format_number(total), format_number(expected)),
            );
        }
    }
    errors.into_result(PieChartData {
        title: title.unwrap_or_default(),
        data,
    })
}

/// Flow charts never fail past the root, but they are normalized rather than
/// kept verbatim: numeric ids and labels become strings, a missing label falls
/// back to the id, unknown node types become `process`, and nodes or links
/// without their ids are dropped. Links to unknown nodes are kept. The
/// serialized result can therefore differ from the input.
pub fn flow(value: &Value) -> Result<FlowChartData, ChartError> {
    let Some(root) = value.as_object() else {
        return Err(ChartError::SchemaValidation(ValidationErrors::single(
            "",
            format!("expected object, found {}", type_name(value)),
        )));
    };
    let title = root.get("title").and_then(scalar_text).unwrap_or_default();
    let nodes = root
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    let id = obj.get("id").and_then(scalar_text)?;
                    let label = obj
                        .get("label")
                        .and_then(scalar_text)
                        .unwrap_or_else(|| id.clone());
                    let node_type = obj
                        .get("type")
                        .and_then(Value::as_str)
                        .and_then(FlowNodeType::from_tag)
                        .unwrap_or(FlowNodeType::Process);
                    Some(FlowNode {
                        id,
                        label,
                        node_type,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let links = root
        .get("links")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    Some(FlowLink {
                        source: obj.get("source").and_then(scalar_text)?,
                        target: obj.get("target").and_then(scalar_text)?,
                        label: obj.get("label").and_then(scalar_text),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(FlowChartData {
        title,
        nodes,
        links,
    })
}

/// Payload accepted by the chart store.
pub fn new_chart(value: &Value) -> Result<NewChart, ChartError> {
    let mut walker = Walker::default();
    let Some(root) = walker.object(value, "") else {
        return Err(ChartError::SchemaValidation(walker.errors));
    };
    let title = walker.required_string(root, "title", "");
    let chart_type = walker.required_string(root, "type", "");
    let data = match root.get("data") {
        None | Some(Value::Null) => {
            walker.errors.push("data", "required");
            None
        }
        Some(value) => Some(value.clone()),
    };
    let user_id = walker.optional_integer(root, "userId", "");
    walker.errors.into_result(NewChart {
        title: title.unwrap_or_default(),
        chart_type: chart_type.unwrap_or_default(),
        data: data.unwrap_or(Value::Null),
        user_id,
    })
}

fn check_gantt_dates(tasks: &[GanttTask], errors: &mut ValidationErrors) {
    for (idx, task) in tasks.iter().enumerate() {
        let path = index_path("tasks", idx);
        let start = parse_date(&task.start);
        let end = parse_date(&task.end);
        if start.is_none() {
            errors.push(join_path(&path, "start"), "not a valid YYYY-MM-DD date");
        }
        if end.is_none() {
            errors.push(join_path(&path, "end"), "not a valid YYYY-MM-DD date");
        }
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            errors.push(
                join_path(&path, "end"),
                format!("{} is before start {}", task.end, task.start),
            );
        }
    }
}

fn check_gantt_dependencies(tasks: &[GanttTask], errors: &mut ValidationErrors) {
    let mut ids = HashSet::new();
    for (idx, task) in tasks.iter().enumerate() {
        if !ids.insert(task.id) {
            errors.push(
                join_path(&index_path("tasks", idx), "id"),
                format!("duplicate task id {}", task.id),
            );
        }
    }
    for (idx, task) in tasks.iter().enumerate() {
        let Some(deps) = task.dependencies.as_ref() else {
            continue;
        };
        let path = join_path(&index_path("tasks", idx), "dependencies");
        for (dep_idx, dep) in deps.iter().enumerate() {
            if !ids.contains(dep) {
                errors.push(index_path(&path, dep_idx), format!("unknown task id {dep}"));
            }
        }
    }
}

#[derive(Default)]
struct Walker {
    errors: ValidationErrors,
}

impl Walker {
    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(obj) => Some(obj),
            None => {
                self.mismatch(path, "object", value);
                None
            }
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        let path = join_path(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(path, "required");
                None
            }
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => {
                self.mismatch(&path, "string", other);
                None
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => {
                self.mismatch(&join_path(path, key), "string", other);
                None
            }
        }
    }

    /// Dates are only checked for being non-empty strings here.
    fn required_date(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        let text = self.required_string(obj, key, path)?;
        if text.trim().is_empty() {
            self.errors
                .push(join_path(path, key), "expected a non-empty date string");
            return None;
        }
        Some(text)
    }

    fn required_number(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<f64> {
        let path = join_path(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(path, "required");
                None
            }
            Some(Value::Number(number)) => match number.as_f64() {
                Some(value) if value.is_finite() => Some(value),
                _ => {
                    self.errors.push(path, "expected a finite number");
                    None
                }
            },
            Some(other) => {
                self.mismatch(&path, "number", other);
                None
            }
        }
    }

    fn required_integer(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<i64> {
        let path = join_path(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(path, "required");
                None
            }
            Some(value) => self.integer(value, &path),
        }
    }

    fn optional_integer(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<i64> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => self.integer(value, &join_path(path, key)),
        }
    }

    fn optional_integer_array(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<Vec<i64>> {
        let path = join_path(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    if let Some(id) = self.integer(item, &index_path(&path, idx)) {
                        out.push(id);
                    }
                }
                Some(out)
            }
            Some(other) => {
                self.mismatch(&path, "array", other);
                None
            }
        }
    }

    fn required_array<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'a Vec<Value>> {
        let path = join_path(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(path, "required");
                None
            }
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                self.mismatch(&path, "array", other);
                None
            }
        }
    }

    fn integer(&mut self, value: &Value, path: &str) -> Option<i64> {
        if let Some(number) = value.as_i64() {
            return Some(number);
        }
        if let Some(number) = value.as_f64()
            && number.fract() == 0.0
            && number.abs() < i64::MAX as f64
        {
            return Some(number as i64);
        }
        self.mismatch(path, "integer", value);
        None
    }

    fn mismatch(&mut self, path: &str, expected: &str, found: &Value) {
        self.errors.push(
            path,
            format!("expected {expected}, found {}", type_name(found)),
        );
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn index_path(path: &str, idx: usize) -> String {
    format!("{path}[{idx}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
