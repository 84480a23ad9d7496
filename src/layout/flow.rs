use std::collections::HashMap;

use crate::ir::{ChartType, FlowChartData, FlowNodeType};
use crate::theme::contrast_text_color;

use super::force::{ForceSimulation, RunStats, SimLink};
use super::*;

const NODE_TEXT_PADDING: f32 = 12.0;
const DECISION_SCALE_X: f32 = 1.3;
const DECISION_SCALE_Y: f32 = 1.6;
const TITLE_BAND: f32 = 40.0;

struct NodeSpec {
    id: String,
    node_type: FlowNodeType,
    label: TextBlock,
    width: f32,
    height: f32,
    fill: String,
    text_color: String,
    tooltip: String,
}

struct LinkSpec {
    source: usize,
    target: usize,
    label: Option<TextBlock>,
}

/// A flow chart bound to its force simulation. Node positions can be moved
/// by dragging; [`FlowDiagram::layout`] recomputes link geometry from the
/// current positions.
pub struct FlowDiagram {
    title: Option<Label>,
    nodes: Vec<NodeSpec>,
    links: Vec<LinkSpec>,
    index: HashMap<String, usize>,
    simulation: ForceSimulation,
    curvature: f32,
    width: f32,
    height: f32,
    stats: RunStats,
}

impl FlowDiagram {
    pub fn new(
        chart: &FlowChartData,
        theme: &Theme,
        config: &LayoutConfig,
        width: f32,
        height: f32,
    ) -> Self {
        let flow_cfg = &config.flow;
        let label_max = flow_cfg.node_width - 2.0 * NODE_TEXT_PADDING;

        let mut index = HashMap::new();
        let mut nodes = Vec::with_capacity(chart.nodes.len());
        for node in &chart.nodes {
            if index.contains_key(&node.id) {
                tracing::warn!(id = %node.id, "duplicate flow node id; keeping the first");
                continue;
            }
            index.insert(node.id.clone(), nodes.len());
            let label = measure_label(&node.label, theme.font_size, Some(label_max), theme, config);
            let base_width = flow_cfg.node_width.max(label.width + 2.0 * NODE_TEXT_PADDING);
            let base_height = flow_cfg
                .node_height
                .max(label.height + NODE_TEXT_PADDING);
            let (width, height) = match node.node_type {
                FlowNodeType::Decision => {
                    (base_width * DECISION_SCALE_X, base_height * DECISION_SCALE_Y)
                }
                _ => (base_width, base_height),
            };
            let fill = node_fill(node.node_type, theme).to_string();
            nodes.push(NodeSpec {
                id: node.id.clone(),
                node_type: node.node_type,
                text_color: contrast_text_color(&fill).to_string(),
                tooltip: format!("{}\n{}", node.label, node_type_name(node.node_type)),
                label,
                width,
                height,
                fill,
            });
        }

        let mut links = Vec::with_capacity(chart.links.len());
        for link in &chart.links {
            let (Some(&source), Some(&target)) =
                (index.get(&link.source), index.get(&link.target))
            else {
                tracing::warn!(
                    source = %link.source,
                    target = %link.target,
                    "flow link references an unknown node; skipping"
                );
                continue;
            };
            let label = link
                .label
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(|text| measure_label(text, theme.font_size * 0.9, None, theme, config));
            links.push(LinkSpec {
                source,
                target,
                label,
            });
        }

        let title = title_label(&chart.title, theme, width, TITLE_BAND);
        let top = if title.is_some() { TITLE_BAND } else { 0.0 };
        let half_w = nodes.iter().map(|n| n.width / 2.0).fold(0.0, f32::max);
        let half_h = nodes.iter().map(|n| n.height / 2.0).fold(0.0, f32::max);
        let bounds = Rect {
            x: flow_cfg.padding + half_w,
            y: top + flow_cfg.padding + half_h,
            width: (width - 2.0 * (flow_cfg.padding + half_w)).max(0.0),
            height: (height - top - 2.0 * (flow_cfg.padding + half_h)).max(0.0),
        };
        let center = (
            bounds.x + bounds.width / 2.0,
            bounds.y + bounds.height / 2.0,
        );
        let sim_links = links
            .iter()
            .map(|link| SimLink {
                source: link.source,
                target: link.target,
            })
            .collect();
        let simulation =
            ForceSimulation::from_config(nodes.len(), sim_links, flow_cfg, center, Some(bounds));

        Self {
            title,
            nodes,
            links,
            index,
            simulation,
            curvature: flow_cfg.curvature,
            width,
            height,
            stats: RunStats {
                iterations: 0,
                converged: false,
            },
        }
    }

    /// Runs the simulation to rest.
    pub fn settle(&mut self) -> RunStats {
        let stats = self.simulation.run();
        self.stats = RunStats {
            iterations: self.stats.iterations + stats.iterations,
            converged: stats.converged,
        };
        stats
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.simulation
    }

    /// Pins node `id` under the pointer and lets the rest settle around it.
    pub fn drag(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(idx) = self.node_index(id) else {
            return false;
        };
        self.simulation.drag_to(idx, x, y);
        self.settle();
        true
    }

    /// Unpins node `id` and lets the simulation take it back.
    pub fn release(&mut self, id: &str) -> bool {
        let Some(idx) = self.node_index(id) else {
            return false;
        };
        self.simulation.release(idx);
        self.settle();
        true
    }

    pub fn layout(&self) -> Layout {
        let positions = self.simulation.nodes();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut hotspots = Vec::with_capacity(self.nodes.len());
        for (spec, state) in self.nodes.iter().zip(positions) {
            let id = format!("node-{}", spec.id);
            hotspots.push(Hotspot {
                id: id.clone(),
                bounds: Rect {
                    x: state.x - spec.width / 2.0,
                    y: state.y - spec.height / 2.0,
                    width: spec.width,
                    height: spec.height,
                },
                tooltip: spec.tooltip.clone(),
            });
            nodes.push(FlowNodeLayout {
                id,
                node_id: spec.id.clone(),
                node_type: spec.node_type,
                x: state.x,
                y: state.y,
                width: spec.width,
                height: spec.height,
                label: spec.label.clone(),
                fill: spec.fill.clone(),
                text_color: spec.text_color.clone(),
            });
        }

        let links = self
            .links
            .iter()
            .map(|link| self.link_geometry(link, &nodes))
            .collect();

        Layout {
            chart_type: ChartType::Flow,
            width: self.width,
            height: self.height,
            title: self.title.clone(),
            hotspots,
            diagram: DiagramData::Flow(FlowLayout {
                nodes,
                links,
                iterations: self.stats.iterations,
                converged: self.stats.converged,
            }),
        }
    }

    fn link_geometry(&self, link: &LinkSpec, nodes: &[FlowNodeLayout]) -> FlowLinkLayout {
        let source = &nodes[link.source];
        let target = &nodes[link.target];
        let (start, end) = if link.source == link.target {
            let top = (source.x, source.y - source.height / 2.0);
            (top, (source.x + source.width / 2.0, source.y))
        } else {
            (
                boundary_point(source, (target.x, target.y)),
                boundary_point(target, (source.x, source.y)),
            )
        };
        let control = curve_control(start, end, self.curvature);
        let label_anchor = quadratic_point(start, control, end, 0.5);
        FlowLinkLayout {
            source: source.node_id.clone(),
            target: target.node_id.clone(),
            start,
            control,
            end,
            label: link.label.clone(),
            label_anchor,
        }
    }
}

pub(super) fn compute_flow_layout(
    chart: &FlowChartData,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let mut diagram = FlowDiagram::new(chart, theme, config, width, height);
    diagram.settle();
    diagram.layout()
}

fn node_fill(node_type: FlowNodeType, theme: &Theme) -> &str {
    match node_type {
        FlowNodeType::Start => &theme.flow_start_color,
        FlowNodeType::Process => &theme.flow_process_color,
        FlowNodeType::Decision => &theme.flow_decision_color,
        FlowNodeType::End => &theme.flow_end_color,
    }
}

fn node_type_name(node_type: FlowNodeType) -> &'static str {
    match node_type {
        FlowNodeType::Start => "Start",
        FlowNodeType::Process => "Process",
        FlowNodeType::Decision => "Decision",
        FlowNodeType::End => "End",
    }
}

/// Where the segment from the node center toward `toward` leaves the shape.
fn boundary_point(node: &FlowNodeLayout, toward: (f32, f32)) -> (f32, f32) {
    let dx = toward.0 - node.x;
    let dy = toward.1 - node.y;
    if dx == 0.0 && dy == 0.0 {
        return (node.x, node.y);
    }
    let hw = node.width / 2.0;
    let hh = node.height / 2.0;
    let t = match node.node_type {
        FlowNodeType::Decision => 1.0 / (dx.abs() / hw + dy.abs() / hh),
        _ => {
            let tx = if dx == 0.0 { f32::INFINITY } else { hw / dx.abs() };
            let ty = if dy == 0.0 { f32::INFINITY } else { hh / dy.abs() };
            tx.min(ty)
        }
    };
    (node.x + dx * t, node.y + dy * t)
}

/// Control point offset perpendicular to the chord by `curvature` times
/// its length.
fn curve_control(start: (f32, f32), end: (f32, f32), curvature: f32) -> (f32, f32) {
    let mid = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return mid;
    }
    let (nx, ny) = (-dy / len, dx / len);
    (mid.0 + nx * len * curvature, mid.1 + ny * len * curvature)
}

fn quadratic_point(p0: (f32, f32), p1: (f32, f32), p2: (f32, f32), t: f32) -> (f32, f32) {
    let u = 1.0 - t;
    (
        u * u * p0.0 + 2.0 * u * t * p1.0 + t * t * p2.0,
        u * u * p0.1 + 2.0 * u * t * p1.1 + t * t * p2.1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowLink, FlowNode};

    fn node(id: &str, label: &str, node_type: FlowNodeType) -> FlowNode {
        FlowNode {
            id: id.to_string(),
            label: label.to_string(),
            node_type,
        }
    }

    fn link(source: &str, target: &str, label: Option<&str>) -> FlowLink {
        FlowLink {
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
        }
    }

    fn order_flow() -> FlowChartData {
        FlowChartData {
            title: "Order handling".to_string(),
            nodes: vec![
                node("1", "Receive order", FlowNodeType::Start),
                node("2", "In stock?", FlowNodeType::Decision),
                node("3", "Ship", FlowNodeType::Process),
                node("4", "Done", FlowNodeType::End),
            ],
            links: vec![
                link("1", "2", None),
                link("2", "3", Some("yes")),
                link("3", "4", None),
                link("2", "9", Some("no")),
            ],
        }
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        }
    }

    fn flow_of(layout: &Layout) -> &FlowLayout {
        match &layout.diagram {
            DiagramData::Flow(flow) => flow,
            other => panic!("expected flow layout, got {other:?}"),
        }
    }

    #[test]
    fn unknown_link_endpoints_are_skipped() {
        let layout = compute_flow_layout(&order_flow(), &Theme::modern(), &config(), 960.0, 540.0);
        let flow = flow_of(&layout);
        assert_eq!(flow.nodes.len(), 4);
        assert_eq!(flow.links.len(), 3);
        assert_eq!(layout.hotspots.len(), 4);
        assert!(flow.iterations > 0);
    }

    #[test]
    fn nodes_fit_inside_viewport() {
        let layout = compute_flow_layout(&order_flow(), &Theme::modern(), &config(), 640.0, 400.0);
        for node in &flow_of(&layout).nodes {
            assert!(node.x - node.width / 2.0 >= 0.0 && node.x + node.width / 2.0 <= 640.0);
            assert!(node.y - node.height / 2.0 >= 0.0 && node.y + node.height / 2.0 <= 400.0);
        }
    }

    #[test]
    fn layout_is_deterministic() {
        let a = compute_flow_layout(&order_flow(), &Theme::modern(), &config(), 960.0, 540.0);
        let b = compute_flow_layout(&order_flow(), &Theme::modern(), &config(), 960.0, 540.0);
        let pos = |layout: &Layout| {
            flow_of(layout)
                .nodes
                .iter()
                .map(|n| (n.x, n.y))
                .collect::<Vec<_>>()
        };
        assert_eq!(pos(&a), pos(&b));
    }

    #[test]
    fn link_labels_sit_on_curve_midpoint() {
        let layout = compute_flow_layout(&order_flow(), &Theme::modern(), &config(), 960.0, 540.0);
        let flow = flow_of(&layout);
        let labelled = flow.links.iter().find(|l| l.label.is_some()).unwrap();
        let expected = quadratic_point(labelled.start, labelled.control, labelled.end, 0.5);
        assert_eq!(labelled.label_anchor, expected);
        assert_eq!(labelled.label.as_ref().unwrap().lines, vec!["yes"]);
        let mid = (
            (labelled.start.0 + labelled.end.0) / 2.0,
            (labelled.start.1 + labelled.end.1) / 2.0,
        );
        assert_ne!(labelled.control, mid);
    }

    #[test]
    fn dragging_pins_node_and_updates_links() {
        let mut diagram =
            FlowDiagram::new(&order_flow(), &Theme::modern(), &config(), 960.0, 540.0);
        diagram.settle();
        assert!(diagram.drag("3", 300.0, 300.0));
        let layout = diagram.layout();
        let flow = flow_of(&layout);
        let ship = flow.nodes.iter().find(|n| n.node_id == "3").unwrap();
        assert_eq!((ship.x, ship.y), (300.0, 300.0));
        let into_ship = flow.links.iter().find(|l| l.target == "3").unwrap();
        let boundary = boundary_point(ship, into_ship.start);
        assert!((into_ship.end.0 - boundary.0).abs() < 1e-3);
        assert!(diagram.release("3"));
        assert!(!diagram.drag("missing", 0.0, 0.0));
    }

    #[test]
    fn decision_nodes_are_larger_and_colored_by_type() {
        let theme = Theme::modern();
        let layout = compute_flow_layout(&order_flow(), &theme, &config(), 960.0, 540.0);
        let flow = flow_of(&layout);
        let decision = flow.nodes.iter().find(|n| n.node_type == FlowNodeType::Decision).unwrap();
        let process = flow.nodes.iter().find(|n| n.node_type == FlowNodeType::Process).unwrap();
        assert!(decision.height > process.height);
        assert_eq!(decision.fill, theme.flow_decision_color);
        assert_eq!(process.fill, theme.flow_process_color);
    }
}
