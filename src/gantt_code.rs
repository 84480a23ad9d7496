//! Mermaid `gantt` text for a generated Gantt chart.

use crate::ir::{GanttChartData, GanttTask};
use crate::layout::scale::distinct_in_order;

const DEFAULT_SECTION: &str = "Tasks";
const INDENT: &str = "    ";

pub fn gantt_code(chart: &GanttChartData) -> String {
    let mut out = String::from("gantt\n");
    let title = sanitize(&chart.title);
    if !title.is_empty() {
        out.push_str(&format!("{INDENT}title {title}\n"));
    }
    out.push_str(&format!("{INDENT}dateFormat YYYY-MM-DD\n"));

    let sections = distinct_in_order(chart.tasks.iter().map(section_name));
    for section in &sections {
        out.push_str(&format!("{INDENT}section {}\n", sanitize(section)));
        for task in chart.tasks.iter().filter(|task| section_name(task) == section) {
            out.push_str(&format!(
                "{INDENT}{} :t{}, {}, {}\n",
                sanitize(&task.name),
                task.id,
                task.start.trim(),
                task.end.trim()
            ));
        }
    }
    out
}

fn section_name(task: &GanttTask) -> &str {
    task.category
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_SECTION)
}

/// Mermaid reads `:` as the name/metadata separator and `#` as an entity
/// prefix, and every statement must stay on one line.
fn sanitize(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
        .replace(':', " -")
        .replace('#', "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, name: &str, start: &str, end: &str, category: Option<&str>) -> GanttTask {
        GanttTask {
            id,
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            dependencies: None,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn groups_tasks_by_category_in_first_seen_order() {
        let chart = GanttChartData {
            title: "Website Redesign".to_string(),
            tasks: vec![
                task(1, "Research", "2025-03-02", "2025-03-07", Some("Planning")),
                task(2, "Wireframes", "2025-03-08", "2025-03-14", Some("Design")),
                task(3, "Kickoff", "2025-03-01", "2025-03-01", Some("Planning")),
            ],
        };
        let code = gantt_code(&chart);
        let expected = "gantt\n    title Website Redesign\n    dateFormat YYYY-MM-DD\n    section Planning\n    Research :t1, 2025-03-02, 2025-03-07\n    Kickoff :t3, 2025-03-01, 2025-03-01\n    section Design\n    Wireframes :t2, 2025-03-08, 2025-03-14\n";
        assert_eq!(code, expected);
    }

    #[test]
    fn uncategorized_tasks_share_default_section() {
        let chart = GanttChartData {
            title: String::new(),
            tasks: vec![task(7, "Ship: v1", "2025-01-01", "2025-01-02", None)],
        };
        let code = gantt_code(&chart);
        assert!(!code.contains("title"));
        assert!(code.contains("section Tasks\n"));
        assert!(code.contains("Ship - v1 :t7, 2025-01-01, 2025-01-02"));
    }
}
