use std::f64::consts::PI;

use crate::geometry::{angle_between, control_point, normalize_angle};
use crate::model::{Connector, ConnectorKind, Model};

/// Direction in which a connector leaves its origin, in `[0, 2π)`.
///
/// Straight connectors point at the destination centre, curved ones at
/// their control point. Variance loops carry their own reference angle.
pub fn resolve_angle(model: &Model, connector: &Connector) -> f64 {
    let o = model.node(connector.origin).pos;
    let d = model.node(connector.destination).pos;
    match connector.kind {
        ConnectorKind::Straight => angle_between(o, d),
        ConnectorKind::Curved => angle_between(o, control_point(o, d, connector.curvature)),
        ConnectorKind::Circular => normalize_angle(connector.variance_angle),
    }
}

/// The same direction as seen from the destination.
pub fn invert_angle(model: &Model, connector: &Connector) -> f64 {
    let o = model.node(connector.origin).pos;
    let d = model.node(connector.destination).pos;
    match connector.kind {
        ConnectorKind::Straight => normalize_angle(angle_between(o, d) + PI),
        ConnectorKind::Curved => angle_between(d, control_point(o, d, connector.curvature)),
        ConnectorKind::Circular => normalize_angle(connector.variance_angle),
    }
}
