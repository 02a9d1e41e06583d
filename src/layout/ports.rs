//! Which side of a rectangular node each connector attaches to.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use serde::Serialize;

use super::angle::invert_angle;
use super::subdivide::edge_midpoint;
use crate::geometry::{Point, angle_between, segment_intersects_rect};
use crate::model::{ConnectorId, Model, NodeClass, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    North,
    East,
    South,
    West,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::North, Edge::East, Edge::South, Edge::West];

    pub fn index(self) -> usize {
        match self {
            Edge::North => 0,
            Edge::East => 1,
            Edge::South => 2,
            Edge::West => 3,
        }
    }

    /// North and south run horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Edge::North | Edge::South)
    }
}

/// Map a direction onto the side of a box it leaves through.
///
/// # Panics
///
/// If `angle` is not within `[0, 2π]`; callers normalise first.
pub fn angle_to_edge(angle: f64) -> Edge {
    assert!(
        (0.0..=TAU).contains(&angle),
        "connector angle {angle} outside [0, 2π)"
    );
    if (FRAC_PI_4..3.0 * FRAC_PI_4).contains(&angle) {
        Edge::North
    } else if (3.0 * FRAC_PI_4..5.0 * FRAC_PI_4).contains(&angle) {
        Edge::West
    } else if (5.0 * FRAC_PI_4..7.0 * FRAC_PI_4).contains(&angle) {
        Edge::South
    } else {
        Edge::East
    }
}

/// The two sides of a destination box that face a sender arriving from
/// `angle`, in tie-break preference order.
///
/// # Panics
///
/// If `angle` is outside `[0, 2π)`.
pub fn candidate_edges(angle: f64) -> [Edge; 2] {
    if (0.0..FRAC_PI_2).contains(&angle) {
        [Edge::South, Edge::West]
    } else if (FRAC_PI_2..PI).contains(&angle) {
        [Edge::East, Edge::South]
    } else if (PI..3.0 * FRAC_PI_2).contains(&angle) {
        [Edge::North, Edge::East]
    } else if (3.0 * FRAC_PI_2..TAU).contains(&angle) {
        [Edge::West, Edge::North]
    } else {
        panic!("no candidate edges for angle {angle}");
    }
}

/// Per-node connector lists for each side, rebuilt at the start of every
/// layout pass.
#[derive(Debug, Clone, Default)]
pub struct PortBuckets {
    buckets: Vec<[Vec<ConnectorId>; 4]>,
}

impl PortBuckets {
    pub fn new(node_count: usize) -> Self {
        Self {
            buckets: vec![Default::default(); node_count],
        }
    }

    pub fn push(&mut self, node: NodeId, edge: Edge, connector: ConnectorId) {
        if node.0 >= self.buckets.len() {
            self.buckets.resize_with(node.0 + 1, Default::default);
        }
        self.buckets[node.0][edge.index()].push(connector);
    }

    pub fn bucket(&self, node: NodeId, edge: Edge) -> &[ConnectorId] {
        self.buckets
            .get(node.0)
            .map(|edges| edges[edge.index()].as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn bucket_mut(&mut self, node: NodeId, edge: Edge) -> Option<&mut Vec<ConnectorId>> {
        self.buckets.get_mut(node.0).map(|edges| &mut edges[edge.index()])
    }

    /// Sides of `node` that received at least one connector.
    pub fn occupied(&self, node: NodeId) -> impl Iterator<Item = Edge> + '_ {
        Edge::ALL
            .into_iter()
            .filter(move |edge| !self.bucket(node, *edge).is_empty())
    }
}

/// Place `id` into the buckets of whichever rectangular ends it has.
/// `angle` is the connector's resolved direction.
pub fn assign_to_edge(model: &Model, id: ConnectorId, angle: f64, buckets: &mut PortBuckets) {
    let c = model.connector(id);
    let origin = model.node(c.origin);
    let dest = model.node(c.destination);
    match (origin.class, dest.class) {
        (NodeClass::Observed, NodeClass::Latent) => {
            buckets.push(c.origin, angle_to_edge(angle), id);
        }
        (NodeClass::Latent, NodeClass::Observed) => {
            buckets.push(c.destination, angle_to_edge(invert_angle(model, c)), id);
        }
        (NodeClass::Observed, NodeClass::Observed) => {
            let origin_edge = angle_to_edge(angle);
            buckets.push(c.origin, origin_edge, id);
            let from = edge_midpoint(origin, origin_edge);
            let intermediate = angle_between(from, dest.pos);
            let dest_edge = best_edge(
                candidate_edges(intermediate),
                model,
                c.destination,
                c.origin,
                from,
            );
            tracing::trace!(
                connector = id.0,
                ?origin_edge,
                ?dest_edge,
                "assigned rectangular ports"
            );
            buckets.push(c.destination, dest_edge, id);
        }
        _ => {}
    }
}

/// Choose between two sides of `dest` for a connector coming from `from`.
///
/// A candidate whose straight run would cross a third visible node loses
/// when the other one is clear. Otherwise the more perpendicular approach
/// wins, with ties going to the first candidate.
pub fn best_edge(
    candidates: [Edge; 2],
    model: &Model,
    dest: NodeId,
    origin: NodeId,
    from: Point,
) -> Edge {
    let dest_node = model.node(dest);
    let mut crosses = [false; 2];
    let mut score = [0.0f64; 2];
    for (i, edge) in candidates.into_iter().enumerate() {
        let target = edge_midpoint(dest_node, edge);
        let approach = angle_between(from, target);
        score[i] = if edge.is_horizontal() {
            approach.sin().abs()
        } else {
            approach.cos().abs()
        };
        crosses[i] = crosses_other_node(model, from, target, dest, origin);
    }
    match crosses {
        [true, false] => candidates[1],
        [false, true] => candidates[0],
        _ if score[1] > score[0] => candidates[1],
        _ => candidates[0],
    }
}

fn crosses_other_node(model: &Model, a: Point, b: Point, dest: NodeId, origin: NodeId) -> bool {
    model.nodes().any(|(id, node)| {
        id != dest
            && id != origin
            && node.visible
            && node.class != NodeClass::Intercept
            && segment_intersects_rect(a, b, &node.bounds())
    })
}
