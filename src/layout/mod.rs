mod anchor;
pub mod angle;
pub mod force;
pub mod geometry;
pub mod ports;
mod sizing;
pub mod subdivide;
pub(crate) mod types;
pub use types::*;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{Point, Size};
use crate::model::{ConnectorId, ConnectorKind, LabelBox, Model, ResolvedEnds};
use crate::text_metrics::TextMeasure;

pub use angle::{invert_angle, resolve_angle};
pub use force::{Scatter, force_layout};
pub use ports::{Edge, PortBuckets, angle_to_edge, assign_to_edge, best_edge, candidate_edges};
pub use subdivide::{edge_midpoint, subdivide};

/// Working endpoints of one connector during a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PassEnds {
    pub(crate) origin: Point,
    pub(crate) destination: Point,
    pub(crate) angle: f64,
    pub(crate) reference: Option<Point>,
}

impl PassEnds {
    pub(crate) fn at(origin: Point, destination: Point, angle: f64) -> Self {
        Self {
            origin,
            destination,
            angle,
            reference: None,
        }
    }
}

/// Full layout pass: size nodes, resolve every drawable connector's ports
/// and anchors, store the results on the model and return a snapshot.
///
/// Each stage runs over all connectors before the next starts; port choice
/// for a rectangle pair looks at other nodes' final boxes, and latent
/// anchoring looks at the other end's final port.
///
/// # Panics
///
/// If a variance connector is not a self-loop; `Model::add_connector`
/// rejects those, so this only fires for hand-edited connectors.
pub fn compute_layout(
    model: &mut Model,
    measure: &dyn TextMeasure,
    config: &LayoutConfig,
) -> DiagramLayout {
    let _span = tracing::debug_span!(
        "layout_pass",
        nodes = model.node_count(),
        connectors = model.connector_count()
    )
    .entered();

    sizing::size_nodes(model, measure, config);

    let drawable: Vec<ConnectorId> = model
        .connectors()
        .map(|(id, _)| id)
        .filter(|id| model.is_drawable(*id))
        .collect();

    let mut ends: Vec<Option<PassEnds>> = vec![None; model.connector_count()];
    for &id in &drawable {
        let c = model.connector(id);
        let angle = resolve_angle(model, c);
        ends[id.0] = Some(PassEnds::at(
            model.node(c.origin).pos,
            model.node(c.destination).pos,
            angle,
        ));
    }

    let mut buckets = PortBuckets::new(model.node_count());
    for &id in &drawable {
        if model.connector(id).kind == ConnectorKind::Circular {
            continue;
        }
        if let Some(end) = &ends[id.0] {
            assign_to_edge(model, id, end.angle, &mut buckets);
        }
    }

    subdivide::resolve_ports(model, &mut buckets, &mut ends, config.alignment_tolerance);

    for &id in &drawable {
        let c = model.connector(id);
        let Some(end) = ends[id.0].as_mut() else {
            continue;
        };
        match c.kind {
            ConnectorKind::Circular => {
                *end = anchor::anchor_variance_loop(model.node(c.origin), c, config);
            }
            _ => anchor::anchor_latent_ends(model, c, end),
        }
    }

    let display = config.coeff_display.unwrap_or(model.coeff_display());
    let label_font_size = config.label_font_size();
    let line_height = measure.line_height(config.font_size);
    let connectors = model.connectors_raw_mut();
    for &id in &drawable {
        let Some(end) = ends[id.0] else {
            continue;
        };
        let c = &mut connectors[id.0];
        let mut resolved = ResolvedEnds {
            origin: end.origin,
            destination: end.destination,
            angle: end.angle,
            reference: end.reference,
            label: Point::ZERO,
        };
        resolved.label = geometry::label_anchor(c, &resolved);
        c.resolved = Some(resolved);

        let Some(text) = display.format(&c.estimate, config.estimate_precision) else {
            continue;
        };
        let stale = c.label_box.as_ref().is_none_or(|label| label.text != text);
        if stale {
            let width = measure.text_width(&text, label_font_size, false) + 3.0 * c.estimate_padding;
            c.label_box = Some(LabelBox {
                text,
                size: Size::new(width, line_height),
            });
        }
    }
    model.mark_fresh(display);

    let layout = snapshot(model, config);
    tracing::debug!(
        nodes = layout.nodes.len(),
        connectors = layout.connectors.len(),
        "layout pass complete"
    );
    layout
}

/// Rebuild the drawing from endpoints stored by the last full pass, without
/// re-resolving ports.
///
/// Fails with [`LayoutError::Stale`] after any model edit, including a
/// change of label style, since the last full pass.
pub fn reuse_layout(model: &Model, config: &LayoutConfig) -> Result<DiagramLayout, LayoutError> {
    let display = config.coeff_display.unwrap_or(model.coeff_display());
    if !model.is_fresh_for(display) {
        return Err(LayoutError::Stale);
    }
    if let Some((id, _)) = model
        .connectors()
        .find(|(id, c)| model.is_drawable(*id) && c.resolved.is_none())
    {
        let key = model.connector_key(id);
        return Err(LayoutError::Unresolved {
            origin: key.origin,
            destination: key.destination,
        });
    }
    Ok(snapshot(model, config))
}

fn snapshot(model: &Model, config: &LayoutConfig) -> DiagramLayout {
    let display = config.coeff_display.unwrap_or(model.coeff_display());
    let nodes = model
        .nodes()
        .filter(|(_, node)| node.visible)
        .map(|(id, node)| NodeLayout {
            id,
            name: node.name.clone(),
            text: node.text.clone(),
            class: node.class,
            center: node.pos,
            size: node.size,
            text_origin: Point::new(node.pos.x - node.size.width / 2.0 + node.padding, node.pos.y),
            bold: node.bold,
            thickness: node.thickness,
        })
        .collect();

    let connectors = model
        .connectors()
        .filter(|(id, _)| model.is_drawable(*id))
        .filter_map(|(id, c)| {
            let ends = c.resolved?;
            let label = match display.format(&c.estimate, config.estimate_precision) {
                Some(text) => c.label_box.as_ref().filter(|b| b.text == text).map(|b| LabelLayout {
                    text: b.text.clone(),
                    center: ends.label,
                    size: b.size,
                }),
                None => None,
            };
            Some(ConnectorLayout {
                id,
                kind: c.kind,
                from: c.origin,
                to: c.destination,
                origin: ends.origin,
                destination: ends.destination,
                angle: ends.angle,
                thickness: c.thickness,
                geometry: geometry::connector_geometry(c, &ends, config.arrow_scale),
                label,
            })
        })
        .collect();

    DiagramLayout {
        nodes,
        connectors,
        font_size: config.font_size,
        label_font_size: config.label_font_size(),
    }
}
