//! Strokes, arrow heads and label anchors for resolved connectors.

use std::f64::consts::{FRAC_PI_2, PI};

use super::types::{ArrowHead, ConnectorGeometry};
use crate::geometry::{
    Circle, Point, angle_between, circle_from_points, control_point, move_along_angle,
    normalize_angle, quad_bezier,
};
use crate::model::{Connector, ConnectorKind, ResolvedEnds};

const HEAD_SPREAD: f64 = PI / 7.0;

/// Triangle with its tip at `tip`, pointing along `direction`.
pub fn arrow_head(tip: Point, direction: f64, size: f32) -> ArrowHead {
    ArrowHead {
        tip,
        left: move_along_angle(tip, direction + PI + HEAD_SPREAD, size),
        right: move_along_angle(tip, direction + PI - HEAD_SPREAD, size),
    }
}

pub fn connector_geometry(
    connector: &Connector,
    ends: &ResolvedEnds,
    arrow_scale: f32,
) -> ConnectorGeometry {
    let size = connector.thickness * arrow_scale;
    match connector.kind {
        ConnectorKind::Straight => line(ends.origin, ends.destination, size),
        ConnectorKind::Curved => curve(ends.origin, ends.destination, connector.curvature, size),
        ConnectorKind::Circular => {
            let arc = ends
                .reference
                .and_then(|r| LoopArc::new(ends.origin, r, ends.destination));
            match arc {
                Some(arc) => arc.geometry(size),
                None => line(ends.origin, ends.destination, size),
            }
        }
    }
}

fn line(origin: Point, dest: Point, size: f32) -> ConnectorGeometry {
    let angle = angle_between(origin, dest);
    ConnectorGeometry::Line {
        start: origin,
        end: move_along_angle(dest, angle + PI, size * 0.5),
        head: arrow_head(dest, angle, size),
    }
}

fn curve(origin: Point, dest: Point, curvature: f32, size: f32) -> ConnectorGeometry {
    let ctrl = control_point(origin, dest, curvature);
    let into_origin = angle_between(ctrl, origin);
    let into_dest = angle_between(ctrl, dest);
    let start = move_along_angle(origin, into_origin + PI, size * 0.5);
    let end = move_along_angle(dest, into_dest + PI, size * 0.5);
    ConnectorGeometry::Curve {
        start,
        ctrl: control_point(start, end, curvature),
        end,
        heads: [
            arrow_head(origin, into_origin, size),
            arrow_head(dest, into_dest, size),
        ],
    }
}

/// Circle through a loop's two ends and its reference point, with the
/// signed sweep that passes through the reference.
#[derive(Debug, Clone, Copy)]
struct LoopArc {
    circle: Circle,
    start_angle: f64,
    sweep: f64,
}

impl LoopArc {
    fn new(origin: Point, reference: Point, dest: Point) -> Option<Self> {
        let circle = circle_from_points(origin, reference, dest)?;
        let a = angle_between(circle.center, origin);
        let r = angle_between(circle.center, reference);
        let b = angle_between(circle.center, dest);
        let ccw = normalize_angle(r - a) < normalize_angle(b - a);
        let sweep = if ccw {
            normalize_angle(b - a)
        } else {
            -normalize_angle(a - b)
        };
        Some(Self {
            circle,
            start_angle: a,
            sweep,
        })
    }

    fn point_at(&self, t: f32) -> Point {
        self.circle
            .point_at(self.start_angle + self.sweep * t as f64)
    }

    fn geometry(&self, size: f32) -> ConnectorGeometry {
        let dir = self.sweep.signum();
        let radius = self.circle.radius.max(f32::EPSILON) as f64;
        let trim = ((size as f64 * 0.5) / radius).min(self.sweep.abs() / 4.0);
        let start_angle = self.start_angle + dir * trim;
        let sweep = self.sweep - 2.0 * dir * trim;
        let end_angle = self.start_angle + self.sweep;
        // travel direction at angle θ is θ ± π/2 depending on orientation
        let origin_head = normalize_angle(self.start_angle + dir * FRAC_PI_2 + PI);
        let dest_head = normalize_angle(end_angle + dir * FRAC_PI_2);
        ConnectorGeometry::Arc {
            circle: self.circle,
            start: self.circle.point_at(start_angle),
            end: self.circle.point_at(start_angle + sweep),
            start_angle,
            sweep,
            heads: [
                arrow_head(self.circle.point_at(self.start_angle), origin_head, size),
                arrow_head(self.circle.point_at(end_angle), dest_head, size),
            ],
        }
    }
}

/// Where a connector's estimate label sits, `along_line` of the way from
/// origin to destination.
pub fn label_anchor(connector: &Connector, ends: &ResolvedEnds) -> Point {
    let t = connector.along_line.clamp(0.0, 1.0);
    match connector.kind {
        ConnectorKind::Straight => ends.origin + (ends.destination - ends.origin) * t,
        ConnectorKind::Curved => {
            let ctrl = control_point(ends.origin, ends.destination, connector.curvature);
            quad_bezier(ends.origin, ctrl, ends.destination, t)
        }
        ConnectorKind::Circular => ends
            .reference
            .and_then(|r| LoopArc::new(ends.origin, r, ends.destination))
            .map(|arc| arc.point_at(t))
            .unwrap_or_else(|| ends.origin.midpoint(ends.destination)),
    }
}
