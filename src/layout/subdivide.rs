use std::f64::consts::{PI, TAU};

use super::PassEnds;
use super::ports::{Edge, PortBuckets};
use crate::geometry::{Point, angle_between, sufficiently_aligned};
use crate::model::{ConnectorId, Model, Node, NodeClass, NodeId};

/// `count` evenly spaced points along one side of an observed node, kept
/// clear of the corners. Index order runs counter-clockwise around the box.
pub fn subdivide(node: &Node, edge: Edge, count: usize) -> Vec<Point> {
    if node.class != NodeClass::Observed || count == 0 {
        return Vec::new();
    }
    let bounds = node.bounds();
    let slots = (count + 1) as f32;
    (1..=count)
        .map(|i| {
            let i = i as f32;
            match edge {
                Edge::North => {
                    Point::new(bounds.max.x - bounds.width() / slots * i, bounds.min.y)
                }
                Edge::South => {
                    Point::new(bounds.min.x + bounds.width() / slots * i, bounds.max.y)
                }
                Edge::East => {
                    Point::new(bounds.max.x, bounds.max.y - bounds.height() / slots * i)
                }
                Edge::West => {
                    Point::new(bounds.min.x, bounds.min.y + bounds.height() / slots * i)
                }
            }
        })
        .collect()
}

/// Centre of one side of the node's box; equal to `subdivide(node, edge, 1)`
/// for observed nodes.
pub fn edge_midpoint(node: &Node, edge: Edge) -> Point {
    let b = node.bounds();
    let c = node.pos;
    match edge {
        Edge::North => Point::new(c.x, b.min.y),
        Edge::South => Point::new(c.x, b.max.y),
        Edge::East => Point::new(b.max.x, c.y),
        Edge::West => Point::new(b.min.x, c.y),
    }
}

/// Direction in which connector `id` leaves `node`, used to order a bucket.
fn departure_angle(model: &Model, id: ConnectorId, node: NodeId) -> f64 {
    let c = model.connector(id);
    let o = model.node(c.origin).pos;
    let d = model.node(c.destination).pos;
    if c.destination == node {
        angle_between(o, d)
    } else {
        angle_between(d, o)
    }
}

/// Sort a bucket so neighbouring connectors do not cross on their way out.
/// West keys wrap through zero, so they are unrolled past 2π first.
pub fn order_bucket(model: &Model, node: NodeId, edge: Edge, bucket: &mut [ConnectorId]) {
    let key = |id: ConnectorId| {
        let angle = departure_angle(model, id, node);
        if edge == Edge::West && angle < PI {
            angle + TAU
        } else {
            angle
        }
    };
    bucket.sort_by(|a, b| key(*a).total_cmp(&key(*b)));
}

/// Turn every non-empty bucket into concrete attachment points.
pub(crate) fn resolve_ports(
    model: &Model,
    buckets: &mut PortBuckets,
    ends: &mut [Option<PassEnds>],
    tolerance: f64,
) {
    for (node_id, node) in model.nodes() {
        if node.class != NodeClass::Observed || !node.visible {
            continue;
        }
        for edge in Edge::ALL {
            let Some(bucket) = buckets.bucket_mut(node_id, edge) else {
                continue;
            };
            if bucket.is_empty() {
                continue;
            }
            order_bucket(model, node_id, edge, bucket);
            let points = subdivide(node, edge, bucket.len());
            let pair = bucket.len() == 2;
            for (&id, point) in bucket.iter().zip(points) {
                let c = model.connector(id);
                let chord = angle_between(model.node(c.origin).pos, model.node(c.destination).pos);
                let point = if pair && sufficiently_aligned(chord, tolerance) {
                    edge_midpoint(node, edge)
                } else {
                    point
                };
                let Some(end) = ends.get_mut(id.0).and_then(Option::as_mut) else {
                    continue;
                };
                if c.origin == node_id {
                    end.origin = point;
                }
                if c.destination == node_id {
                    end.destination = point;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::model::ConnectorKind;

    fn box_node() -> Node {
        let mut node = Node::new("x", NodeClass::Observed, Point::new(10.0, 20.0));
        node.size = Size::new(120.0, 60.0);
        node
    }

    #[test]
    fn points_are_distinct_even_and_on_the_edge() {
        let node = box_node();
        let b = node.bounds();
        for edge in Edge::ALL {
            for n in 1..8 {
                let points = subdivide(&node, edge, n);
                assert_eq!(points.len(), n);
                for p in &points {
                    match edge {
                        Edge::North => assert_eq!(p.y, b.min.y),
                        Edge::South => assert_eq!(p.y, b.max.y),
                        Edge::East => assert_eq!(p.x, b.max.x),
                        Edge::West => assert_eq!(p.x, b.min.x),
                    }
                    assert!(p.x >= b.min.x && p.x <= b.max.x);
                    assert!(p.y >= b.min.y && p.y <= b.max.y);
                    assert!(!b.corners().contains(p));
                }
                let gaps: Vec<f32> = points.windows(2).map(|w| w[0].distance(w[1])).collect();
                for gap in &gaps {
                    assert!(*gap > 0.0);
                    assert!((gap - gaps[0]).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn walk_direction_is_counter_clockwise() {
        let node = box_node();
        let north = subdivide(&node, Edge::North, 2);
        assert!(north[0].x > north[1].x);
        let west = subdivide(&node, Edge::West, 2);
        assert!(west[0].y < west[1].y);
        let south = subdivide(&node, Edge::South, 2);
        assert!(south[0].x < south[1].x);
        let east = subdivide(&node, Edge::East, 2);
        assert!(east[0].y > east[1].y);
    }

    #[test]
    fn single_point_is_the_midpoint() {
        let node = box_node();
        for edge in Edge::ALL {
            assert_eq!(subdivide(&node, edge, 1), vec![edge_midpoint(&node, edge)]);
        }
    }

    #[test]
    fn non_rectangular_or_empty_requests_yield_nothing() {
        let node = box_node();
        assert!(subdivide(&node, Edge::North, 0).is_empty());
        let mut latent = box_node();
        latent.class = NodeClass::Latent;
        assert!(subdivide(&latent, Edge::North, 3).is_empty());
    }

    #[test]
    fn west_bucket_ordering_wraps() {
        let mut model = Model::new();
        let hub = model.add_node(box_node()).unwrap();
        // one target above-left, one below-left of the hub
        let up = model
            .add_node(Node::new("up", NodeClass::Observed, Point::new(-300.0, -100.0)))
            .unwrap();
        let down = model
            .add_node(Node::new("down", NodeClass::Observed, Point::new(-300.0, 140.0)))
            .unwrap();
        let to_up = model.add_connector(hub, up, ConnectorKind::Straight).unwrap();
        let to_down = model.add_connector(hub, down, ConnectorKind::Straight).unwrap();

        // The upward connector takes the top slot of the west side's
        // top-to-bottom walk, whatever order the bucket was filled in.
        for mut bucket in [vec![to_up, to_down], vec![to_down, to_up]] {
            order_bucket(&model, hub, Edge::West, &mut bucket);
            assert_eq!(bucket, vec![to_up, to_down]);
        }
    }
}
