use std::collections::BTreeSet;
use std::path::Path;

use semdiagram::geometry::{Point, Rect};
use semdiagram::layout::{
    ConnectorGeometry, DiagramLayout, Edge, PortBuckets, assign_to_edge, force_layout,
    resolve_angle,
};
use semdiagram::text_metrics::RatioMeasure;
use semdiagram::{
    ConnectorId, ConnectorKind, ForceConfig, LayoutConfig, LayoutError, Model, Node, NodeClass,
    NodeId, build_model, compute_layout, parse_parameter_table, reuse_layout,
};

const EPS: f32 = 1e-2;

fn fixture_model(name: &str, view_generated: bool) -> Model {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let contents = std::fs::read_to_string(&path).expect("fixture read failed");
    let rows = parse_parameter_table(&contents).expect("fixture parse failed");
    let mut model = build_model(&rows, None, &LayoutConfig::default()).expect("import failed");
    model.set_view_generated(view_generated);
    model
}

fn on_rect_boundary(p: Point, rect: &Rect) -> bool {
    let within_x = p.x >= rect.min.x - EPS && p.x <= rect.max.x + EPS;
    let within_y = p.y >= rect.min.y - EPS && p.y <= rect.max.y + EPS;
    let on_vertical = (p.x - rect.min.x).abs() < EPS || (p.x - rect.max.x).abs() < EPS;
    let on_horizontal = (p.y - rect.min.y).abs() < EPS || (p.y - rect.max.y).abs() < EPS;
    (on_vertical && within_y) || (on_horizontal && within_x)
}

fn assert_on_boundary(model: &Model, id: NodeId, p: Point, what: &str) {
    let node = model.node(id);
    match node.class {
        NodeClass::Observed => assert!(
            on_rect_boundary(p, &node.bounds()),
            "{what} {p:?} is off the box of `{}` {:?}",
            node.name,
            node.bounds()
        ),
        NodeClass::Latent => {
            let d = p.distance(node.pos);
            assert!(
                (d - node.radius()).abs() < EPS,
                "{what} of `{}` is {d} from centre, radius {}",
                node.name,
                node.radius()
            );
        }
        NodeClass::Intercept => assert_eq!(p, node.pos),
    }
}

fn assert_endpoints_on_boundaries(model: &Model, layout: &DiagramLayout) {
    for c in &layout.connectors {
        assert_on_boundary(model, c.from, c.origin, "origin");
        assert_on_boundary(model, c.to, c.destination, "destination");
    }
}

/// X -> f (latent), Y -> X curved, f -> Y, all on one horizontal line.
fn three_in_a_row() -> (Model, NodeId, NodeId, NodeId) {
    three_with_latent_at(0.0)
}

/// Same wiring with the latent node raised `lift` above the row.
fn three_with_latent_at(lift: f32) -> (Model, NodeId, NodeId, NodeId) {
    let mut model = Model::new();
    let a = model
        .add_node(Node::new("a", NodeClass::Observed, Point::new(0.0, 0.0)).with_text("X"))
        .unwrap();
    let b = model
        .add_node(Node::new("b", NodeClass::Latent, Point::new(200.0, -lift)))
        .unwrap();
    let c = model
        .add_node(Node::new("c", NodeClass::Observed, Point::new(400.0, 0.0)).with_text("Y"))
        .unwrap();
    model.add_connector(a, b, ConnectorKind::Straight).unwrap();
    model.add_connector(c, a, ConnectorKind::Curved).unwrap();
    model.add_connector(b, c, ConnectorKind::Straight).unwrap();
    (model, a, b, c)
}

#[test]
fn ports_face_the_latent_node_and_sit_on_its_circle() {
    let (mut model, a, b, c) = three_in_a_row();
    let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    assert_eq!(layout.connectors.len(), 3);

    let mut buckets = PortBuckets::new(model.node_count());
    for (id, connector) in model.connectors() {
        assign_to_edge(&model, id, resolve_angle(&model, connector), &mut buckets);
    }
    assert_eq!(buckets.occupied(a).collect::<Vec<_>>(), vec![Edge::East]);
    assert_eq!(buckets.occupied(c).collect::<Vec<_>>(), vec![Edge::West]);
    assert_eq!(buckets.bucket(a, Edge::East).len(), 2);
    assert_eq!(buckets.bucket(c, Edge::West).len(), 2);

    let radius = model.node(b).size.width / 2.0;
    let center = model.node(b).pos;
    let into_b = &layout.connectors[0];
    let out_of_b = &layout.connectors[2];
    assert!((into_b.destination.distance(center) - radius).abs() < EPS);
    assert!((out_of_b.origin.distance(center) - radius).abs() < EPS);
    // the circle ends face the neighbours
    assert!(into_b.destination.x < center.x);
    assert!(out_of_b.origin.x > center.x);
}

#[test]
fn raised_latent_node_draws_ports_to_the_top_edges() {
    let (mut model, a, b, c) = three_with_latent_at(300.0);
    let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    assert_eq!(layout.connectors.len(), 3);

    let mut buckets = PortBuckets::new(model.node_count());
    for (id, connector) in model.connectors() {
        assign_to_edge(&model, id, resolve_angle(&model, connector), &mut buckets);
    }
    let ids: Vec<ConnectorId> = model.connectors().map(|(id, _)| id).collect();
    let (into_b, out_of_b) = (ids[0], ids[2]);
    assert!(buckets.bucket(a, Edge::North).contains(&into_b));
    assert!(buckets.bucket(c, Edge::North).contains(&out_of_b));

    let center = model.node(b).pos;
    let radius = model.node(b).radius();
    let into = layout.connector(into_b).unwrap();
    let out = layout.connector(out_of_b).unwrap();
    assert!((into.origin.y - model.node(a).bounds().min.y).abs() < EPS);
    assert!((out.destination.y - model.node(c).bounds().min.y).abs() < EPS);
    assert!((into.destination.distance(center) - radius).abs() < EPS);
    assert!((out.origin.distance(center) - radius).abs() < EPS);
    // lower-left and lower-right of the circle, toward each neighbour
    assert!(into.destination.x < center.x && into.destination.y > center.y);
    assert!(out.origin.x > center.x && out.origin.y > center.y);
}

#[test]
fn collinear_pairs_share_the_edge_midpoint() {
    let (mut model, a, _, c) = three_in_a_row();
    let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    let a_node = model.node(a);
    let c_node = model.node(c);
    let a_east = Point::new(a_node.pos.x + a_node.size.width / 2.0, a_node.pos.y);
    let c_west = Point::new(c_node.pos.x - c_node.size.width / 2.0, c_node.pos.y);

    assert_eq!(layout.connectors[0].origin, a_east);
    assert_eq!(layout.connectors[1].destination, a_east);
    assert_eq!(layout.connectors[1].origin, c_west);
    assert_eq!(layout.connectors[2].destination, c_west);
}

#[test]
fn connectors_route_around_a_blocking_node() {
    let mut model = Model::new();
    let mut boxed = |name: &str, x: f32, y: f32| {
        let node = Node::new(name, NodeClass::Observed, Point::new(x, y)).with_text("abcdefgh");
        model.add_node(node).unwrap()
    };
    let a = boxed("a", 0.0, 0.0);
    let c = boxed("c", 400.0, 100.0);
    boxed("b", 250.0, 90.0);
    let id = model.add_connector(a, c, ConnectorKind::Straight).unwrap();
    let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());

    let c_node = model.node(c);
    let end = layout.connector(id).unwrap().destination;
    // arrives on the north side rather than crossing `b` to reach the west
    assert!((end.y - c_node.bounds().min.y).abs() < EPS);
}

#[test]
fn fixture_endpoints_lie_on_node_boundaries() {
    for (name, generated) in [
        ("holzinger.json", false),
        ("holzinger.json", true),
        ("political_democracy.json", false),
        ("political_democracy.json", true),
    ] {
        let mut model = fixture_model(name, generated);
        let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
        assert!(!layout.connectors.is_empty(), "{name}: nothing drawn");
        assert_endpoints_on_boundaries(&model, &layout);
    }
}

#[test]
fn generated_connectors_are_hidden_until_requested() {
    let mut model = fixture_model("holzinger.json", false);
    let user_only = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    assert_eq!(user_only.connectors.len(), 9);
    assert!(user_only.connectors.iter().all(|c| c.kind == ConnectorKind::Straight));

    model.set_view_generated(true);
    let everything = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    assert_eq!(everything.connectors.len(), 24);
    let arcs = everything
        .connectors
        .iter()
        .filter(|c| matches!(c.geometry, ConnectorGeometry::Arc { .. }))
        .count();
    assert_eq!(arcs, 12);
}

#[test]
fn imported_nodes_end_up_finite_and_apart() {
    let model = fixture_model("holzinger.json", true);
    let positions: Vec<Point> = model.nodes().map(|(_, node)| node.pos).collect();
    assert_eq!(positions.len(), 12);
    for (i, p) in positions.iter().enumerate() {
        assert!(p.is_finite(), "node {i} at {p:?}");
        for q in &positions[i + 1..] {
            assert!(p.distance(*q) > 1e-3);
        }
    }
}

#[test]
fn force_layout_is_deterministic() {
    let a = fixture_model("political_democracy.json", false);
    let b = fixture_model("political_democracy.json", false);
    for ((_, x), (_, y)) in a.nodes().zip(b.nodes()) {
        assert_eq!(x.pos, y.pos, "{} moved between runs", x.name);
    }

    let mut pinned_model = a.clone();
    let pinned: BTreeSet<NodeId> = pinned_model.nodes().map(|(id, _)| id).collect();
    force_layout(&mut pinned_model, &pinned, &ForceConfig::default());
    for ((_, x), (_, y)) in a.nodes().zip(pinned_model.nodes()) {
        assert_eq!(x.pos, y.pos);
    }
}

#[test]
fn reuse_matches_the_full_pass_until_the_model_changes() {
    let mut model = fixture_model("political_democracy.json", true);
    let config = LayoutConfig::default();
    let full = compute_layout(&mut model, &RatioMeasure::default(), &config);
    let reused = reuse_layout(&model, &config).unwrap();
    assert_eq!(full.connectors.len(), reused.connectors.len());
    for (x, y) in full.connectors.iter().zip(&reused.connectors) {
        assert_eq!(x.origin, y.origin);
        assert_eq!(x.destination, y.destination);
        assert_eq!(x.geometry, y.geometry);
    }

    let id = model.find_node("y1").unwrap();
    model.move_node(id, Point::new(1000.0, 1000.0), config.grid_size);
    assert!(reuse_layout(&model, &config).is_err());
}

#[test]
fn toggling_generated_connectors_forces_a_full_pass() {
    let mut model = Model::new();
    let a = model
        .add_node(Node::new("a", NodeClass::Observed, Point::new(0.0, 0.0)))
        .unwrap();
    let b = model
        .add_node(Node::new("b", NodeClass::Observed, Point::new(400.0, 600.0)))
        .unwrap();
    model.add_connector(a, b, ConnectorKind::Straight).unwrap();
    let generated = model.add_connector(b, a, ConnectorKind::Curved).unwrap();
    model.connector_mut(generated).user_defined = false;
    let config = LayoutConfig::default();
    let measure = RatioMeasure::default();

    model.set_view_generated(true);
    let with_generated = compute_layout(&mut model, &measure, &config);
    model.set_view_generated(false);
    compute_layout(&mut model, &measure, &config);
    assert!(reuse_layout(&model, &config).is_ok());

    model.set_view_generated(true);
    assert_eq!(reuse_layout(&model, &config).unwrap_err(), LayoutError::Stale);
    let full = compute_layout(&mut model, &measure, &config);
    for (x, y) in with_generated.connectors.iter().zip(&full.connectors) {
        assert_eq!(x.origin, y.origin);
        assert_eq!(x.destination, y.destination);
    }
    let reused = reuse_layout(&model, &config).unwrap();
    assert_eq!(reused.connectors.len(), 2);
}

#[test]
fn changing_label_style_forces_a_full_pass() {
    let mut model = fixture_model("holzinger.json", false);
    let mut config = LayoutConfig::default();
    compute_layout(&mut model, &RatioMeasure::default(), &config);
    assert!(reuse_layout(&model, &config).is_ok());

    model.set_coeff_display(semdiagram::CoefficientDisplay::Interval);
    assert_eq!(reuse_layout(&model, &config).unwrap_err(), LayoutError::Stale);
    compute_layout(&mut model, &RatioMeasure::default(), &config);
    assert!(reuse_layout(&model, &config).is_ok());

    config.coeff_display = Some(semdiagram::CoefficientDisplay::Value);
    assert_eq!(reuse_layout(&model, &config).unwrap_err(), LayoutError::Stale);
}

#[test]
fn layout_bounds_cover_every_stroke() {
    let mut model = fixture_model("holzinger.json", true);
    let layout = compute_layout(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
    let bounds = layout.bounds().unwrap();
    let inside = |p: Point| {
        p.x >= bounds.min.x - EPS
            && p.x <= bounds.max.x + EPS
            && p.y >= bounds.min.y - EPS
            && p.y <= bounds.max.y + EPS
    };
    for c in &layout.connectors {
        for head in c.geometry.heads() {
            for p in head.points() {
                assert!(inside(p), "{p:?} outside {bounds:?}");
            }
        }
    }
    for node in &layout.nodes {
        assert!(inside(node.center));
    }
}
