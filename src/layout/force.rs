//! One-shot force-directed placement for nodes without a saved position.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ForceConfig;
use crate::geometry::{Point, snap_to_grid};
use crate::model::{Model, NodeId};

/// Pairs closer than this are treated as this far apart.
const MIN_DISTANCE: f32 = 1.0;

/// Seeded source of initial positions, so a given table always starts from
/// the same scatter.
pub struct Scatter {
    rng: StdRng,
    magnitude: f32,
    grid: f32,
}

impl Scatter {
    pub fn new(config: &ForceConfig, grid: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            magnitude: config.scatter_magnitude,
            grid,
        }
    }

    /// A point in the square of side `magnitude` centred on the origin.
    pub fn next_position(&mut self) -> Point {
        let x = (self.rng.random::<f32>() - 0.5) * self.magnitude;
        let y = (self.rng.random::<f32>() - 0.5) * self.magnitude;
        snap_to_grid(Point::new(x, y), self.grid)
    }
}

/// Run the simulation, moving every node not in `pinned`. Pinned nodes still
/// push and pull on the others.
pub fn force_layout(model: &mut Model, pinned: &BTreeSet<NodeId>, config: &ForceConfig) {
    let n = model.node_count();
    if n == 0 || pinned.len() >= n {
        return;
    }
    let springs: Vec<(usize, usize)> = model
        .connectors()
        .filter(|(_, c)| c.origin != c.destination)
        .map(|(_, c)| (c.origin.0, c.destination.0))
        .collect();
    let mut positions: Vec<Point> = model.nodes().map(|(_, node)| node.pos).collect();
    let mut temperature = config.initial_temperature;

    for iteration in 0..config.iterations {
        let mut displacement = vec![Point::ZERO; n];

        for j in 0..n {
            for k in (j + 1)..n {
                let (unit, distance) = separation(positions[j], positions[k], j, k);
                let push = unit * (config.repel_force / (distance * distance));
                displacement[j] = displacement[j] - push;
                displacement[k] = displacement[k] + push;
            }
        }

        for &(u, v) in &springs {
            let delta = positions[v] - positions[u];
            let distance = delta.length();
            if distance < MIN_DISTANCE {
                continue;
            }
            let strength = config.attract_force * (distance / config.ideal_spring_length).ln();
            let pull = delta / distance * strength;
            displacement[u] = displacement[u] + pull;
            displacement[v] = displacement[v] - pull;
        }

        for (i, pos) in positions.iter_mut().enumerate() {
            if pinned.contains(&NodeId(i)) {
                continue;
            }
            let step = capped(displacement[i], temperature);
            if step.is_finite() {
                *pos = *pos + step;
            }
        }
        tracing::trace!(iteration, temperature, "force layout pass");
        temperature *= config.cooling_factor;
    }

    for (i, node) in model.nodes_raw_mut().iter_mut().enumerate() {
        if !pinned.contains(&NodeId(i)) {
            node.pos = positions[i];
        }
    }
    tracing::debug!(
        nodes = n,
        pinned = pinned.len(),
        iterations = config.iterations,
        "force layout placed nodes"
    );
}

/// Unit vector from `a` to `b` and their distance, clamped away from zero.
/// Coincident points separate along a direction derived from their indices.
fn separation(a: Point, b: Point, i: usize, j: usize) -> (Point, f32) {
    let delta = b - a;
    let distance = delta.length();
    if distance >= MIN_DISTANCE && distance.is_finite() {
        return (delta / distance, distance);
    }
    let unit = a.unit_towards(b).unwrap_or_else(|| {
        // golden-angle spread keeps stacked pairs from all leaving the same way
        let angle = (i * 31 + j) as f32 * 2.399_963;
        Point::new(angle.cos(), angle.sin())
    });
    (unit, MIN_DISTANCE)
}

fn capped(step: Point, limit: f32) -> Point {
    let length = step.length();
    if length > limit && length > 0.0 {
        step * (limit / length)
    } else {
        step
    }
}
