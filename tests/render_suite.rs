use std::path::Path;

use nlchart::config::LayoutConfig;
use nlchart::layout::{DiagramData, Layout, compute_layout};
use nlchart::theme::Theme;
use nlchart::{ChartData, ChartType, render_svg, validate_chart};
use serde_json::{Value, json};

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

fn layout_config() -> LayoutConfig {
    LayoutConfig {
        fast_text_metrics: true,
        ..LayoutConfig::default()
    }
}

fn load_fixture(rel: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    serde_json::from_str(&input).expect("fixture is not JSON")
}

fn render(data: &ChartData, viewport: (f32, f32)) -> (Layout, String) {
    let theme = Theme::modern();
    let layout = compute_layout(data, &theme, &layout_config(), viewport);
    let svg = render_svg(&layout, &theme);
    (layout, svg)
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new chart types must be added intentionally.
    let candidates = [
        ("gantt", "gantt_basic.json"),
        ("bar", "bar_basic.json"),
        ("bar", "bar_grouped.json"),
        ("pie", "pie_basic.json"),
        ("line", "line_basic.json"),
        ("flow", "flow_basic.json"),
    ];

    for (chart_type, rel) in candidates {
        let value = load_fixture(rel);
        let data = validate_chart(chart_type, &value).expect("fixture failed validation");
        let (layout, svg) = render(&data, (960.0, 540.0));
        assert_valid_svg(&svg, rel);
        assert!(!layout.is_empty_state(), "{rel}: unexpected empty state");
        assert!(
            svg.contains("width=\"960\" height=\"540\""),
            "{rel}: canvas size not preserved"
        );
        let title = value["title"].as_str().unwrap_or_default();
        assert!(svg.contains(title), "{rel}: title missing");
        for spot in &layout.hotspots {
            assert!(
                svg.contains(&format!("data-id=\"{}\"", spot.id)),
                "{rel}: no drawable for hotspot {}",
                spot.id
            );
        }
    }
}

#[test]
fn every_type_renders_empty_state() {
    let empties = [
        ("gantt", json!({"title": "Plan", "tasks": []})),
        ("bar", json!({"title": "Sales", "data": []})),
        ("pie", json!({"title": "Share", "data": []})),
        ("line", json!({"title": "Trend", "data": []})),
        ("flow", json!({"title": "Process", "nodes": [], "links": []})),
    ];
    for (chart_type, value) in empties {
        let data = validate_chart(chart_type, &value).unwrap();
        let (layout, svg) = render(&data, (400.0, 300.0));
        assert!(layout.is_empty_state(), "{chart_type}");
        assert!(svg.contains("No data available"), "{chart_type}");
        assert!(!svg.contains("data-id="), "{chart_type}");
    }
}

#[test]
fn gantt_fixture_spans_exact_dates() {
    let data = validate_chart("gantt", &load_fixture("gantt_basic.json")).unwrap();
    let (layout, svg) = render(&data, (960.0, 540.0));
    let DiagramData::Gantt(gantt) = &layout.diagram else {
        panic!("expected gantt layout");
    };
    let (start, end) = gantt.domain.unwrap();
    assert_eq!(start.to_string(), "2025-03-02");
    assert_eq!(end.to_string(), "2025-03-24");
    assert_eq!(gantt.bars.len(), 4);
    assert_eq!(gantt.dependencies.len(), 4);
    assert!(svg.contains("Start: Mar 02, 2025"));
    assert!(svg.contains("class=\"dependency\""));
}

#[test]
fn pie_fixture_spans_full_circle() {
    let data = validate_chart("pie", &load_fixture("pie_basic.json")).unwrap();
    let (layout, svg) = render(&data, (960.0, 540.0));
    let DiagramData::Pie(pie) = &layout.diagram else {
        panic!("expected pie layout");
    };
    let total: f64 = pie.slices.iter().map(|s| s.span()).sum();
    assert!((total - std::f64::consts::TAU).abs() < 1e-9);
    assert_eq!(pie.slices[0].color, "#4338CA");
    assert_ne!(pie.slices[2].color, "not-a-color");
    assert!(svg.contains("Open (30.0%)"));
    assert!(!svg.contains("not-a-color"));
}

#[test]
fn flow_fixture_stays_in_view() {
    let data = validate_chart("flow", &load_fixture("flow_basic.json")).unwrap();
    let (layout, svg) = render(&data, (800.0, 600.0));
    let DiagramData::Flow(flow) = &layout.diagram else {
        panic!("expected flow layout");
    };
    assert_eq!(flow.nodes.len(), 6);
    assert_eq!(flow.links.len(), 6);
    for node in &flow.nodes {
        assert!(node.x >= 0.0 && node.x <= 800.0, "{} x={}", node.node_id, node.x);
        assert!(node.y >= 0.0 && node.y <= 600.0, "{} y={}", node.node_id, node.y);
    }
    assert!(svg.contains("<polygon"));
    assert!(svg.contains(">Yes<"));
    assert!(svg.contains("marker-end=\"url(#arrow)\""));
}

#[test]
fn render_is_deterministic() {
    for (chart_type, rel) in [("flow", "flow_basic.json"), ("line", "line_basic.json")] {
        let data = validate_chart(chart_type, &load_fixture(rel)).unwrap();
        let (_, first) = render(&data, (700.0, 500.0));
        let (_, second) = render(&data, (700.0, 500.0));
        assert_eq!(first, second, "{rel}");
    }
}

#[test]
fn chart_type_attribute_matches_data() {
    let data = validate_chart("line", &load_fixture("line_basic.json")).unwrap();
    assert_eq!(data.chart_type(), ChartType::Line);
    let (_, svg) = render(&data, (960.0, 540.0));
    assert!(svg.contains("data-chart-type=\"line\""));
    assert!(svg.contains("data-series=\"Berlin\""));
    assert!(svg.contains("data-series=\"Lisbon\""));
}
