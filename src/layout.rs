//! Deterministic force-directed layout
//!
//! Each weakly connected component is laid out on its own with a
//! Fruchterman-Reingold simulation and the components are then packed into
//! rows, so disconnected clusters never overlap. Starting positions come
//! from a SHA-256 of the account id, which makes the output a pure function
//! of the model.

use crate::graph_model::DerivedGraphModel;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Layout tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub iterations: usize,
    pub ideal_edge_length: f64,
    pub component_gap: f64,
    pub max_row_width: f64,
    pub padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 200,
            ideal_edge_length: 80.0,
            component_gap: 120.0,
            max_row_width: 1600.0,
            padding: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned bounds of a set of positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    fn of(points: impl Iterator<Item = Point>) -> Option<Self> {
        points.fold(None, |acc, p| {
            Some(match acc {
                None => Bounds { min: p, max: p },
                Some(b) => Bounds {
                    min: Point {
                        x: b.min.x.min(p.x),
                        y: b.min.y.min(p.y),
                    },
                    max: Point {
                        x: b.max.x.max(p.x),
                        y: b.max.y.max(p.y),
                    },
                },
            })
        })
    }
}

/// Computed positions, indexed like `DerivedGraphModel::nodes`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub positions: Vec<Point>,
    /// Bounds of each component after packing, in component order
    pub component_bounds: Vec<Bounds>,
}

impl Layout {
    pub fn position(&self, node_index: usize) -> Option<Point> {
        self.positions.get(node_index).copied()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(self.positions.iter().copied())
    }
}

/// Lay out the whole model
pub fn compute(model: &DerivedGraphModel, config: &LayoutConfig) -> Layout {
    let mut positions = vec![Point::default(); model.node_count()];
    let mut component_bounds = Vec::new();

    let mut cursor_x = config.padding;
    let mut cursor_y = config.padding;
    let mut row_height: f64 = 0.0;

    for members in model.components() {
        let local = simulate_component(model, &members, config);
        let Some(bounds) = Bounds::of(local.iter().copied()) else {
            continue;
        };

        if cursor_x > config.padding && cursor_x + bounds.width() > config.max_row_width {
            cursor_x = config.padding;
            cursor_y += row_height + config.component_gap;
            row_height = 0.0;
        }

        let dx = cursor_x - bounds.min.x;
        let dy = cursor_y - bounds.min.y;
        for (&node, point) in members.iter().zip(local.iter()) {
            positions[node] = Point {
                x: point.x + dx,
                y: point.y + dy,
            };
        }

        component_bounds.push(Bounds {
            min: Point {
                x: cursor_x,
                y: cursor_y,
            },
            max: Point {
                x: cursor_x + bounds.width(),
                y: cursor_y + bounds.height(),
            },
        });

        cursor_x += bounds.width() + config.component_gap;
        row_height = row_height.max(bounds.height());
    }

    Layout {
        positions,
        component_bounds,
    }
}

/// Run Fruchterman-Reingold over one component, returning local positions
fn simulate_component(
    model: &DerivedGraphModel,
    members: &[usize],
    config: &LayoutConfig,
) -> Vec<Point> {
    let n = members.len();
    let k = config.ideal_edge_length.max(1.0);
    let spread = k * (n as f64).sqrt();

    let mut positions: Vec<Point> = members
        .iter()
        .map(|&i| seed_position(&model.nodes()[i].id, spread))
        .collect();
    if n < 2 {
        return positions;
    }

    // global node index -> local slot
    let mut local = vec![usize::MAX; model.node_count()];
    for (slot, &node) in members.iter().enumerate() {
        local[node] = slot;
    }
    let springs: Vec<(usize, usize)> = model
        .edges()
        .iter()
        .filter(|e| e.source != e.target && local[e.source] != usize::MAX)
        .map(|e| (local[e.source], local[e.target]))
        .collect();

    let initial_temperature = spread / 4.0;
    let iterations = config.iterations.max(1);

    for step in 0..iterations {
        let temperature = initial_temperature * (1.0 - step as f64 / iterations as f64);
        let mut displacement = vec![Point::default(); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy, dist) = separation(&positions[i], &positions[j], i, j);
                let force = k * k / dist;
                displacement[i].x += dx / dist * force;
                displacement[i].y += dy / dist * force;
                displacement[j].x -= dx / dist * force;
                displacement[j].y -= dy / dist * force;
            }
        }

        for &(u, v) in &springs {
            let (dx, dy, dist) = separation(&positions[u], &positions[v], u, v);
            let force = dist * dist / k;
            displacement[u].x -= dx / dist * force;
            displacement[u].y -= dy / dist * force;
            displacement[v].x += dx / dist * force;
            displacement[v].y += dy / dist * force;
        }

        for (point, delta) in positions.iter_mut().zip(displacement.iter()) {
            let length = (delta.x * delta.x + delta.y * delta.y).sqrt();
            if length > f64::EPSILON {
                let capped = length.min(temperature);
                point.x += delta.x / length * capped;
                point.y += delta.y / length * capped;
            }
        }
    }

    positions
}

/// Vector from `b` to `a` with a floor on distance; coincident points are
/// pushed apart along a direction derived from their slots
fn separation(a: &Point, b: &Point, i: usize, j: usize) -> (f64, f64, f64) {
    const MIN_DISTANCE: f64 = 0.01;
    let dist = a.distance(b);
    if dist < MIN_DISTANCE {
        let angle = (i * 31 + j * 17) as f64;
        (angle.cos() * MIN_DISTANCE, angle.sin() * MIN_DISTANCE, MIN_DISTANCE)
    } else {
        (a.x - b.x, a.y - b.y, dist)
    }
}

/// Stable starting point in `[0, spread)^2` derived from the account id
fn seed_position(id: &str, spread: f64) -> Point {
    let digest = Sha256::digest(id.as_bytes());
    let x = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let y = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);
    Point {
        x: x as f64 / u32::MAX as f64 * spread,
        y: y as f64 / u32::MAX as f64 * spread,
    }
}
