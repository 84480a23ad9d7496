//! Instruction templates sent to the language model.

use crate::ir::ChartType;

const RESPONSE_RULE: &str = "Only respond with valid JSON, no additional text.";

const GANTT_SHAPE: &str = r#"{
  "title": "Chart title",
  "tasks": [
    {
      "id": 1,
      "name": "Task name",
      "start": "2023-03-01",
      "end": "2023-03-15",
      "dependencies": [2, 3],
      "category": "Planning"
    }
  ]
}"#;

const BAR_SHAPE: &str = r#"{
  "title": "Chart title",
  "xAxisLabel": "X-Axis Label",
  "yAxisLabel": "Y-Axis Label",
  "data": [
    { "label": "Category A", "value": 25, "category": "Group 1" },
    { "label": "Category B", "value": 50, "category": "Group 2" }
  ]
}"#;

const PIE_SHAPE: &str = r##"{
  "title": "Chart title",
  "data": [
    { "label": "Category A", "value": 25, "color": "#4338CA" },
    { "label": "Category B", "value": 75, "color": "#3B82F6" }
  ]
}"##;

const LINE_SHAPE: &str = r#"{
  "title": "Chart title",
  "xAxisLabel": "X-Axis Label",
  "yAxisLabel": "Y-Axis Label",
  "data": [
    { "label": "Jan", "value": 25, "category": "Temperature" },
    { "label": "Feb", "value": 30, "category": "Temperature" }
  ]
}"#;

const FLOW_SHAPE: &str = r#"{
  "title": "Chart title",
  "nodes": [
    { "id": "1", "label": "Start", "type": "start" },
    { "id": "2", "label": "Process", "type": "process" },
    { "id": "3", "label": "End", "type": "end" }
  ],
  "links": [
    { "source": "1", "target": "2", "label": "Next" },
    { "source": "2", "target": "3", "label": "Complete" }
  ]
}"#;

fn shape(chart_type: ChartType) -> &'static str {
    match chart_type {
        ChartType::Gantt => GANTT_SHAPE,
        ChartType::Bar => BAR_SHAPE,
        ChartType::Pie => PIE_SHAPE,
        ChartType::Line => LINE_SHAPE,
        ChartType::Flow => FLOW_SHAPE,
    }
}

fn noun(chart_type: ChartType) -> &'static str {
    match chart_type {
        ChartType::Gantt => "Gantt chart",
        ChartType::Bar => "bar chart",
        ChartType::Pie => "pie chart",
        ChartType::Line => "line chart",
        ChartType::Flow => "flow chart",
    }
}

/// Wraps the user's request in the extraction instructions for `chart_type`.
pub fn format_prompt(prompt: &str, chart_type: ChartType) -> String {
    let mut text = format!(
        "Parse the following {} request into a structured JSON format:\n{}\n\nReturn a JSON object with the following structure:\n{}\n\n{}",
        noun(chart_type),
        prompt.trim(),
        shape(chart_type),
        RESPONSE_RULE
    );
    match chart_type {
        ChartType::Pie => text.push_str(" Ensure values sum to 100."),
        ChartType::Bar | ChartType::Line => text.push_str(" Every value must be a number."),
        ChartType::Gantt => text.push_str(" Dates must use the YYYY-MM-DD format."),
        ChartType::Flow => {}
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_embeds_prompt_and_rule() {
        for kind in ChartType::ALL {
            let text = format_prompt("  quarterly sales  ", kind);
            assert!(text.contains("\nquarterly sales\n"), "{kind}");
            assert!(text.contains(RESPONSE_RULE), "{kind}");
            assert!(text.contains("\"title\""), "{kind}");
        }
    }

    #[test]
    fn pie_template_asks_for_hundred() {
        let text = format_prompt("bugs by status", ChartType::Pie);
        assert!(text.ends_with("Ensure values sum to 100."));
        assert!(!format_prompt("x", ChartType::Bar).contains("sum to 100"));
    }

    #[test]
    fn shapes_are_valid_json() {
        for kind in ChartType::ALL {
            let value: serde_json::Value = serde_json::from_str(shape(kind)).unwrap();
            assert!(value.get("title").is_some());
        }
    }
}
