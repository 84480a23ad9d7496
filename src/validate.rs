use serde_json::Value;

use crate::error::ChartError;
use crate::ir::{ChartData, ChartType};
use crate::schema::{self, StrictChecks};

/// Validates `json` against the schema named by `chart_type`.
pub fn validate_chart(chart_type: &str, json: &Value) -> Result<ChartData, ChartError> {
    validate_chart_with(chart_type, json, &StrictChecks::default())
}

pub fn validate_chart_with(
    chart_type: &str,
    json: &Value,
    strict: &StrictChecks,
) -> Result<ChartData, ChartError> {
    let kind: ChartType = chart_type.parse()?;
    validate_typed(kind, json, strict)
}

pub fn validate_typed(
    kind: ChartType,
    json: &Value,
    strict: &StrictChecks,
) -> Result<ChartData, ChartError> {
    match kind {
        ChartType::Gantt => schema::gantt(json, strict).map(ChartData::Gantt),
        ChartType::Bar => schema::bar(json).map(ChartData::Bar),
        ChartType::Pie => schema::pie(json, strict).map(ChartData::Pie),
        ChartType::Line => schema::bar(json).map(ChartData::Line),
        ChartType::Flow => schema::flow(json).map(ChartData::Flow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn gantt_sample() -> Value {
        json!({
            "title": "Website Redesign",
            "tasks": [
                {"id": 1, "name": "Research", "start": "2025-03-02", "end": "2025-03-07",
                 "category": "Planning"},
                {"id": 2, "name": "Wireframes", "start": "2025-03-08", "end": "2025-03-14",
                 "dependencies": [1], "category": "Design"},
                {"id": 3, "name": "Build", "start": "2025-03-15", "end": "2025-03-24",
                 "dependencies": [2, 1]}
            ]
        })
    }

    #[test]
    fn valid_gantt_round_trips_deep_equal() {
        let input = gantt_sample();
        let data = validate_chart("gantt", &input).unwrap();
        assert_eq!(data.chart_type(), ChartType::Gantt);
        assert_eq!(data.to_json(), input);
    }

    #[test]
    fn gantt_missing_required_field_fails() {
        for field in ["id", "name", "start", "end"] {
            let mut input = gantt_sample();
            input["tasks"][1].as_object_mut().unwrap().remove(field);
            let err = validate_chart("gantt", &input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SchemaValidation, "field {field}");
            assert!(err.to_string().contains(&format!("tasks[1].{field}: required")));
        }
        let mut input = gantt_sample();
        input.as_object_mut().unwrap().remove("tasks");
        assert_eq!(
            validate_chart("gantt", &input).unwrap_err().kind(),
            ErrorKind::SchemaValidation
        );
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = validate_chart("unknown", &json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedChartType);
    }

    #[test]
    fn line_reuses_bar_contract() {
        let input = json!({
            "title": "Temps",
            "xAxisLabel": "Month",
            "data": [{"label": "Jan", "value": 3, "category": "Oslo"}]
        });
        let data = validate_chart("line", &input).unwrap();
        match data {
            ChartData::Line(line) => {
                assert_eq!(line.x_axis_label.as_deref(), Some("Month"));
                assert!(line.y_axis_label.is_none());
            }
            other => panic!("expected line data, got {other:?}"),
        }
    }

    #[test]
    fn flow_passes_through() {
        let data = validate_chart("flow", &json!({"title": "Empty"})).unwrap();
        assert!(data.is_empty());
    }
}
