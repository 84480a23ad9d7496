//! Force-directed placement for flow charts.
//!
//! Velocity-Verlet style integration with three forces: pairwise many-body
//! charge, springs along links, and a centering shift. `step` is pure; the
//! [`ForceSimulation`] driver owns the state and adds pinning and batch runs.

use serde::Serialize;

use crate::config::FlowConfig;

use super::Rect;

const INITIAL_RADIUS: f32 = 10.0;
// Golden angle, pi * (3 - sqrt(5)).
const INITIAL_ANGLE: f32 = 2.399_963;
// Below this squared distance the charge force is softened.
const DISTANCE_MIN2: f32 = 1.0;
const DRAG_ALPHA: f32 = 0.3;
// Consecutive quiet ticks before the energy stop applies.
const SETTLE_TICKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Pinned position; the node ignores forces while set.
    pub fixed: Option<(f32, f32)>,
}

impl NodeState {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            fixed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimState {
    pub nodes: Vec<NodeState>,
    pub alpha: f32,
}

impl SimState {
    /// Sum of squared node speeds.
    pub fn kinetic_energy(&self) -> f32 {
        self.nodes
            .iter()
            .map(|node| node.vx * node.vx + node.vy * node.vy)
            .sum()
    }
}

/// Spring between two node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForceParams {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub center: (f32, f32),
    pub center_strength: f32,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub alpha_target: f32,
    /// Region node positions are clamped into.
    pub bounds: Option<Rect>,
}

impl ForceParams {
    pub fn from_config(config: &FlowConfig, center: (f32, f32), bounds: Option<Rect>) -> Self {
        Self {
            link_distance: config.link_distance,
            charge_strength: config.charge_strength,
            center,
            center_strength: config.center_strength,
            velocity_decay: config.velocity_decay,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            alpha_target: 0.0,
            bounds,
        }
    }
}

/// One simulation tick. Links pointing outside `state.nodes` are ignored.
pub fn step(state: &SimState, links: &[SimLink], params: &ForceParams) -> SimState {
    let mut next = state.clone();
    next.alpha += (params.alpha_target - next.alpha) * params.alpha_decay;
    let alpha = next.alpha;
    let nodes = &mut next.nodes;
    let n = nodes.len();
    if n == 0 {
        return next;
    }

    apply_links(nodes, links, params.link_distance, alpha);
    apply_charge(nodes, params.charge_strength, alpha);
    apply_center(nodes, params.center, params.center_strength);

    let keep = 1.0 - params.velocity_decay;
    for node in nodes.iter_mut() {
        match node.fixed {
            Some((fx, fy)) => {
                node.x = fx;
                node.y = fy;
                node.vx = 0.0;
                node.vy = 0.0;
            }
            None => {
                node.vx *= keep;
                node.vy *= keep;
                node.x += node.vx;
                node.y += node.vy;
            }
        }
        if let Some(bounds) = params.bounds {
            clamp_into(node, bounds);
        }
    }
    next
}

fn apply_links(nodes: &mut [NodeState], links: &[SimLink], distance: f32, alpha: f32) {
    let n = nodes.len();
    let valid: Vec<&SimLink> = links
        .iter()
        .filter(|link| link.source < n && link.target < n && link.source != link.target)
        .collect();
    let mut degree = vec![0usize; n];
    for link in &valid {
        degree[link.source] += 1;
        degree[link.target] += 1;
    }
    for (idx, link) in valid.iter().enumerate() {
        let (s, t) = (link.source, link.target);
        let (ds, dt) = (degree[s] as f32, degree[t] as f32);
        let strength = 1.0 / ds.min(dt);
        let bias = ds / (ds + dt);

        let source = nodes[s];
        let target = nodes[t];
        let mut dx = target.x + target.vx - source.x - source.vx;
        let mut dy = target.y + target.vy - source.y - source.vy;
        if dx == 0.0 {
            dx = jiggle(idx);
        }
        if dy == 0.0 {
            dy = jiggle(idx + 1);
        }
        let len = (dx * dx + dy * dy).sqrt();
        let pull = (len - distance) / len * alpha * strength;
        dx *= pull;
        dy *= pull;
        nodes[t].vx -= dx * bias;
        nodes[t].vy -= dy * bias;
        nodes[s].vx += dx * (1.0 - bias);
        nodes[s].vy += dy * (1.0 - bias);
    }
}

fn apply_charge(nodes: &mut [NodeState], strength: f32, alpha: f32) {
    let n = nodes.len();
    let positions: Vec<(f32, f32)> = nodes.iter().map(|node| (node.x, node.y)).collect();
    for i in 0..n {
        let (xi, yi) = positions[i];
        let (mut ax, mut ay) = (0.0f32, 0.0f32);
        for (j, &(xj, yj)) in positions.iter().enumerate() {
            if i == j {
                continue;
            }
            let mut dx = xj - xi;
            let mut dy = yj - yi;
            if dx == 0.0 {
                dx = jiggle(i * n + j);
            }
            if dy == 0.0 {
                dy = jiggle(j * n + i);
            }
            let mut d2 = dx * dx + dy * dy;
            if d2 < DISTANCE_MIN2 {
                d2 = (DISTANCE_MIN2 * d2).sqrt();
            }
            ax += dx * strength * alpha / d2;
            ay += dy * strength * alpha / d2;
        }
        nodes[i].vx += ax;
        nodes[i].vy += ay;
    }
}

fn apply_center(nodes: &mut [NodeState], center: (f32, f32), strength: f32) {
    let n = nodes.len() as f32;
    let (sx, sy) = nodes
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), node| (sx + node.x, sy + node.y));
    let shift_x = (sx / n - center.0) * strength;
    let shift_y = (sy / n - center.1) * strength;
    for node in nodes.iter_mut() {
        node.x -= shift_x;
        node.y -= shift_y;
    }
}

fn clamp_into(node: &mut NodeState, bounds: Rect) {
    let (min_x, max_x) = (bounds.x, bounds.right().max(bounds.x));
    let (min_y, max_y) = (bounds.y, bounds.bottom().max(bounds.y));
    if node.x < min_x || node.x > max_x {
        node.x = node.x.clamp(min_x, max_x);
        node.vx = 0.0;
    }
    if node.y < min_y || node.y > max_y {
        node.y = node.y.clamp(min_y, max_y);
        node.vy = 0.0;
    }
}

/// Tiny deterministic offset that separates coincident nodes.
fn jiggle(seed: usize) -> f32 {
    ((seed % 7) as f32 + 1.0) * 1e-6
}

/// Sunflower spiral around `center`, so runs are reproducible.
pub fn phyllotaxis(count: usize, center: (f32, f32)) -> Vec<NodeState> {
    (0..count)
        .map(|i| {
            let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
            let angle = i as f32 * INITIAL_ANGLE;
            NodeState::at(
                center.0 + radius * angle.cos(),
                center.1 + radius * angle.sin(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct ForceSimulation {
    state: SimState,
    links: Vec<SimLink>,
    params: ForceParams,
    max_iterations: usize,
    energy_threshold: f32,
    ticks: usize,
}

impl ForceSimulation {
    pub fn new(
        node_count: usize,
        links: Vec<SimLink>,
        params: ForceParams,
        max_iterations: usize,
        energy_threshold: f32,
    ) -> Self {
        let mut nodes = phyllotaxis(node_count, params.center);
        if let Some(bounds) = params.bounds {
            for node in &mut nodes {
                clamp_into(node, bounds);
            }
        }
        Self {
            state: SimState { nodes, alpha: 1.0 },
            links,
            params,
            max_iterations,
            energy_threshold,
            ticks: 0,
        }
    }

    pub fn from_config(
        node_count: usize,
        links: Vec<SimLink>,
        config: &FlowConfig,
        center: (f32, f32),
        bounds: Option<Rect>,
    ) -> Self {
        Self::new(
            node_count,
            links,
            ForceParams::from_config(config, center, bounds),
            config.max_iterations,
            config.energy_threshold,
        )
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.state.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn alpha(&self) -> f32 {
        self.state.alpha
    }

    /// Total ticks since construction.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Advances one tick and returns the kinetic energy afterwards.
    pub fn tick(&mut self) -> f32 {
        self.state = step(&self.state, &self.links, &self.params);
        self.ticks += 1;
        self.state.kinetic_energy()
    }

    /// Ticks until the system is quiet, alpha cools below `alpha_min`, or
    /// the iteration budget runs out.
    pub fn run(&mut self) -> RunStats {
        let mut iterations = 0;
        let mut quiet = 0;
        while iterations < self.max_iterations {
            if self.state.alpha < self.params.alpha_min
                && self.params.alpha_target < self.params.alpha_min
            {
                break;
            }
            let energy = self.tick();
            iterations += 1;
            quiet = if energy < self.energy_threshold { quiet + 1 } else { 0 };
            if quiet >= SETTLE_TICKS {
                break;
            }
        }
        let converged = quiet >= SETTLE_TICKS || self.state.alpha < self.params.alpha_min;
        tracing::debug!(
            iterations,
            converged,
            alpha = self.state.alpha,
            "force simulation settled"
        );
        RunStats {
            iterations,
            converged,
        }
    }

    /// Fixes node `idx` at (`x`, `y`), clamped into the bounds.
    pub fn pin(&mut self, idx: usize, x: f32, y: f32) -> bool {
        let bounds = self.params.bounds;
        let Some(node) = self.state.nodes.get_mut(idx) else {
            return false;
        };
        let (mut x, mut y) = (x, y);
        if let Some(bounds) = bounds {
            x = x.clamp(bounds.x, bounds.right().max(bounds.x));
            y = y.clamp(bounds.y, bounds.bottom().max(bounds.y));
        }
        node.fixed = Some((x, y));
        node.x = x;
        node.y = y;
        node.vx = 0.0;
        node.vy = 0.0;
        true
    }

    /// Pins `idx` at the pointer and reheats so neighbours follow.
    pub fn drag_to(&mut self, idx: usize, x: f32, y: f32) -> bool {
        if !self.pin(idx, x, y) {
            return false;
        }
        self.restart(self.state.alpha.max(DRAG_ALPHA));
        true
    }

    /// Unpins `idx`, handing it back to the simulation.
    pub fn release(&mut self, idx: usize) -> bool {
        let Some(node) = self.state.nodes.get_mut(idx) else {
            return false;
        };
        node.fixed = None;
        self.restart(self.state.alpha.max(DRAG_ALPHA));
        true
    }

    /// Resets alpha so the next `run` moves nodes again.
    pub fn restart(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }
}
