use std::f64::consts::PI;

use super::PassEnds;
use crate::config::LayoutConfig;
use crate::geometry::{Point, angle_between, move_along_angle, normalize_angle, rect_boundary_point};
use crate::model::{Connector, ConnectorKind, Model, Node, NodeClass};

/// Move latent ends of a straight or curved connector onto the circle,
/// facing the other end's final attachment point.
///
/// Rectangular ports must already be resolved: the origin looks at the
/// resolved destination, and the destination then looks back at the
/// (possibly just moved) origin.
pub(crate) fn anchor_latent_ends(model: &Model, connector: &Connector, ends: &mut PassEnds) {
    if connector.kind == ConnectorKind::Circular {
        return;
    }
    let origin = model.node(connector.origin);
    let dest = model.node(connector.destination);
    if origin.class == NodeClass::Latent {
        let toward = angle_between(origin.pos, ends.destination);
        ends.origin = move_along_angle(origin.pos, toward, origin.radius());
    }
    if dest.class == NodeClass::Latent {
        let from = angle_between(ends.origin, dest.pos);
        ends.destination = move_along_angle(dest.pos, from + PI, dest.radius());
    }
}

/// Endpoints of a variance loop drawn on `node`.
///
/// # Panics
///
/// If the connector is not a self-loop on `node`.
pub(crate) fn anchor_variance_loop(
    node: &Node,
    connector: &Connector,
    config: &LayoutConfig,
) -> PassEnds {
    assert!(
        connector.origin == connector.destination,
        "variance loop on `{}` must start and end on the same node",
        node.name
    );
    let angle = normalize_angle(connector.variance_angle);
    if node.class == NodeClass::Intercept {
        return PassEnds::at(node.pos, node.pos, angle);
    }
    let boundary = |direction: f64| -> Point {
        match node.class {
            NodeClass::Latent => move_along_angle(node.pos, direction, node.radius()),
            _ => rect_boundary_point(&node.bounds(), direction),
        }
    };
    let anchor = boundary(angle);
    PassEnds {
        origin: boundary(angle + config.variance_spread),
        destination: boundary(angle - config.variance_spread),
        angle,
        reference: Some(move_along_angle(anchor, angle, config.variance_loop_height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use std::f64::consts::FRAC_PI_2;

    fn latent(name: &str, pos: Point, diameter: f32) -> Node {
        let mut node = Node::new(name, NodeClass::Latent, pos);
        node.size = Size::new(diameter, diameter);
        node
    }

    #[test]
    fn latent_to_latent_ends_sit_on_both_circles() {
        let mut model = Model::new();
        let a = model.add_node(latent("a", Point::ZERO, 60.0)).unwrap();
        let b = model
            .add_node(latent("b", Point::new(300.0, 400.0), 80.0))
            .unwrap();
        let id = model.add_connector(a, b, ConnectorKind::Straight).unwrap();
        let mut ends = PassEnds::at(Point::ZERO, Point::new(300.0, 400.0), 0.0);
        anchor_latent_ends(&model, model.connector(id), &mut ends);

        assert!((ends.origin.distance(Point::ZERO) - 30.0).abs() < 1e-3);
        assert!((ends.destination.distance(Point::new(300.0, 400.0)) - 40.0).abs() < 1e-3);
        // both points lie on the centre line
        assert!((ends.origin.x - 18.0).abs() < 1e-3 && (ends.origin.y - 24.0).abs() < 1e-3);
        assert!((ends.destination.x - 276.0).abs() < 1e-3);
    }

    #[test]
    fn observed_end_is_left_alone() {
        let mut model = Model::new();
        let mut obs = Node::new("x", NodeClass::Observed, Point::new(0.0, 200.0));
        obs.size = Size::new(80.0, 50.0);
        let x = model.add_node(obs).unwrap();
        let f = model.add_node(latent("f", Point::ZERO, 100.0)).unwrap();
        let id = model.add_connector(f, x, ConnectorKind::Straight).unwrap();
        let port = Point::new(10.0, 175.0);
        let mut ends = PassEnds::at(Point::ZERO, port, 0.0);
        anchor_latent_ends(&model, model.connector(id), &mut ends);
        assert_eq!(ends.destination, port);
        assert!((ends.origin.distance(Point::ZERO) - 50.0).abs() < 1e-3);
        let drift = angle_between(Point::ZERO, ends.origin) - angle_between(Point::ZERO, port);
        assert!(drift.abs() < 1e-4);
    }

    #[test]
    fn variance_loop_defaults_to_the_top() {
        let mut model = Model::new();
        let mut obs = Node::new("x", NodeClass::Observed, Point::ZERO);
        obs.size = Size::new(100.0, 50.0);
        let x = model.add_node(obs).unwrap();
        let id = model.add_connector(x, x, ConnectorKind::Circular).unwrap();
        let config = LayoutConfig::default();
        let ends = anchor_variance_loop(model.node(x), model.connector(id), &config);

        assert_eq!(ends.angle, FRAC_PI_2);
        assert!((ends.origin.y + 25.0).abs() < 1e-3 && ends.origin.x < 0.0);
        assert!((ends.destination.y + 25.0).abs() < 1e-3 && ends.destination.x > 0.0);
        let reference = ends.reference.unwrap();
        assert!(reference.x.abs() < 1e-3 && (reference.y + 55.0).abs() < 1e-3);
    }

    #[test]
    fn variance_loop_on_latent_follows_circle() {
        let mut model = Model::new();
        let f = model.add_node(latent("f", Point::ZERO, 100.0)).unwrap();
        let id = model.add_connector(f, f, ConnectorKind::Circular).unwrap();
        model.set_variance_angle(id, PI);
        let ends = anchor_variance_loop(model.node(f), model.connector(id), &LayoutConfig::default());
        assert!((ends.origin.distance(Point::ZERO) - 50.0).abs() < 1e-3);
        assert!((ends.destination.distance(Point::ZERO) - 50.0).abs() < 1e-3);
        let reference = ends.reference.unwrap();
        assert!((reference.x + 80.0).abs() < 1e-3);
    }

    #[test]
    #[should_panic(expected = "same node")]
    fn variance_loop_between_two_nodes_is_a_defect() {
        let node = latent("f", Point::ZERO, 10.0);
        let mut bogus = Model::new();
        let a = bogus.add_node(node.clone()).unwrap();
        let b = bogus.add_node(latent("g", Point::ZERO, 10.0)).unwrap();
        let id = bogus.add_connector(a, b, ConnectorKind::Curved).unwrap();
        let mut connector = bogus.connector(id).clone();
        connector.kind = ConnectorKind::Circular;
        anchor_variance_loop(&node, &connector, &LayoutConfig::default());
    }
}
