use serde::Serialize;

use crate::geometry::{Circle, Point, Rect, Size};
use crate::model::{ConnectorId, ConnectorKind, NodeClass, NodeId};

#[derive(Debug, Clone, Serialize)]
pub struct NodeLayout {
    pub id: NodeId,
    pub name: String,
    pub text: String,
    pub class: NodeClass,
    pub center: Point,
    pub size: Size,
    /// Left end of the text baseline box, `padding` in from the left side.
    pub text_origin: Point,
    pub bold: bool,
    pub thickness: f32,
}

impl NodeLayout {
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowHead {
    pub tip: Point,
    pub left: Point,
    pub right: Point,
}

impl ArrowHead {
    pub fn points(&self) -> [Point; 3] {
        [self.tip, self.left, self.right]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectorGeometry {
    Line {
        start: Point,
        end: Point,
        head: ArrowHead,
    },
    Curve {
        start: Point,
        ctrl: Point,
        end: Point,
        heads: [ArrowHead; 2],
    },
    /// Circular arc from `start_angle`, sweeping `sweep` radians
    /// (positive is counter-clockwise on screen).
    Arc {
        circle: Circle,
        start: Point,
        end: Point,
        start_angle: f64,
        sweep: f64,
        heads: [ArrowHead; 2],
    },
}

impl ConnectorGeometry {
    pub fn heads(&self) -> &[ArrowHead] {
        match self {
            Self::Line { head, .. } => std::slice::from_ref(head),
            Self::Curve { heads, .. } | Self::Arc { heads, .. } => heads,
        }
    }

    /// Points that bound the stroke; arcs contribute their full circle box.
    fn extent(&self) -> Rect {
        let mut rect = match self {
            Self::Line { start, end, .. } => point_rect(*start).union(&point_rect(*end)),
            Self::Curve {
                start, ctrl, end, ..
            } => point_rect(*start)
                .union(&point_rect(*ctrl))
                .union(&point_rect(*end)),
            Self::Arc { circle, .. } => Rect::from_center(
                circle.center,
                Size::new(circle.radius * 2.0, circle.radius * 2.0),
            ),
        };
        for head in self.heads() {
            for p in head.points() {
                rect = rect.union(&point_rect(p));
            }
        }
        rect
    }
}

fn point_rect(p: Point) -> Rect {
    Rect { min: p, max: p }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelLayout {
    pub text: String,
    pub center: Point,
    pub size: Size,
}

impl LabelLayout {
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center, self.size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectorLayout {
    pub id: ConnectorId,
    pub kind: ConnectorKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Attachment point on `from`.
    pub origin: Point,
    pub destination: Point,
    pub angle: f64,
    pub thickness: f32,
    pub geometry: ConnectorGeometry,
    pub label: Option<LabelLayout>,
}

/// Everything a backend needs to draw one frame, in local coordinates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagramLayout {
    pub nodes: Vec<NodeLayout>,
    pub connectors: Vec<ConnectorLayout>,
    pub font_size: f32,
    pub label_font_size: f32,
}

impl DiagramLayout {
    /// Union of node boxes and label boxes, the area a printed page must
    /// cover.
    pub fn content_bounds(&self) -> Option<Rect> {
        let nodes = self.nodes.iter().map(NodeLayout::bounds);
        let labels = self
            .connectors
            .iter()
            .filter_map(|c| c.label.as_ref().map(LabelLayout::bounds));
        nodes.chain(labels).reduce(|acc, r| acc.union(&r))
    }

    /// Like `content_bounds`, but also covering strokes and arrow heads.
    pub fn bounds(&self) -> Option<Rect> {
        let strokes = self.connectors.iter().map(|c| c.geometry.extent());
        match self.content_bounds() {
            Some(content) => Some(strokes.fold(content, |acc, r| acc.union(&r))),
            None => strokes.reduce(|acc, r| acc.union(&r)),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeLayout> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&ConnectorLayout> {
        self.connectors.iter().find(|c| c.id == id)
    }
}
