//! Path-diagram model: a node arena plus connectors that refer to nodes by
//! handle. Layout mutates nodes in place through the arena, so every
//! connector observes the same position without shared pointers.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::geometry::{Point, Rect, Size, snap_to_grid};

pub const DEFAULT_CURVATURE: f32 = 0.3;
pub const DEFAULT_ALONG_LINE: f32 = 0.5;
pub const DEFAULT_ESTIMATE_PADDING: f32 = 2.5;
pub const DEFAULT_NODE_THICKNESS: f32 = 3.0;
pub const DEFAULT_CONNECTOR_THICKNESS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub(crate) usize);

impl ConnectorId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    /// Rectangle; connectors attach to one of its four edges.
    Observed,
    /// Circle; connectors attach at the boundary point nearest the other end.
    Latent,
    /// Reserved. Carries no attachment geometry.
    Intercept,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub text: String,
    pub class: NodeClass,
    /// Centre of the node.
    pub pos: Point,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Cached advance width of `text`, filled by the first layout pass.
    #[serde(default)]
    pub text_width: Option<f32>,
    /// Horizontal inset of the text from the node's left side.
    #[serde(default)]
    pub padding: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default = "default_node_thickness")]
    pub thickness: f32,
}

fn default_true() -> bool {
    true
}

fn default_node_thickness() -> f32 {
    DEFAULT_NODE_THICKNESS
}

fn default_connector_thickness() -> f32 {
    DEFAULT_CONNECTOR_THICKNESS
}

fn default_along_line() -> f32 {
    DEFAULT_ALONG_LINE
}

fn default_variance_angle() -> f64 {
    FRAC_PI_2
}

fn default_estimate_padding() -> f32 {
    DEFAULT_ESTIMATE_PADDING
}

impl Node {
    pub fn new(name: impl Into<String>, class: NodeClass, pos: Point) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            name,
            class,
            pos,
            size: Size::default(),
            visible: true,
            text_width: None,
            padding: 0.0,
            bold: false,
            thickness: DEFAULT_NODE_THICKNESS,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self.text_width = None;
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.pos, self.size)
    }

    /// Radius used for circular attachment on latent nodes.
    pub fn radius(&self) -> f32 {
        self.size.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Regression arrow.
    Straight,
    /// Covariance between two distinct nodes, double-headed.
    Curved,
    /// Variance of a single node, drawn as a loop on its boundary.
    Circular,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub p_value: f64,
    pub ci: [f64; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoefficientDisplay {
    None,
    Value,
    Interval,
    #[default]
    Star,
}

impl CoefficientDisplay {
    pub fn format(self, estimate: &Estimate, precision: usize) -> Option<String> {
        match self {
            Self::None => None,
            Self::Value => Some(format!("{:.*}", precision, estimate.value)),
            Self::Interval => Some(format!(
                "[{:.*}, {:.*}]",
                precision, estimate.ci[0], precision, estimate.ci[1]
            )),
            Self::Star => {
                let stars = match estimate.p_value {
                    p if p < 0.001 => "***",
                    p if p < 0.01 => "**",
                    p if p < 0.05 => "*",
                    _ => "",
                };
                Some(format!("{:.*}{}", precision, estimate.value, stars))
            }
        }
    }
}

/// Endpoints written back by the last full layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEnds {
    pub origin: Point,
    pub destination: Point,
    pub angle: f64,
    /// Outward reference point of a variance loop.
    #[serde(default)]
    pub reference: Option<Point>,
    pub label: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub origin: NodeId,
    pub destination: NodeId,
    pub kind: ConnectorKind,
    #[serde(default)]
    pub curvature: f32,
    #[serde(default = "default_along_line")]
    pub along_line: f32,
    #[serde(default = "default_variance_angle")]
    pub variance_angle: f64,
    #[serde(default)]
    pub estimate: Estimate,
    #[serde(default = "default_true")]
    pub user_defined: bool,
    #[serde(default = "default_connector_thickness")]
    pub thickness: f32,
    #[serde(default = "default_estimate_padding")]
    pub estimate_padding: f32,
    /// Measured estimate label, reused until its text changes.
    #[serde(default)]
    pub label_box: Option<LabelBox>,
    #[serde(default)]
    pub resolved: Option<ResolvedEnds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelBox {
    pub text: String,
    pub size: Size,
}

impl Connector {
    fn new(origin: NodeId, destination: NodeId, kind: ConnectorKind) -> Self {
        Self {
            origin,
            destination,
            kind,
            curvature: match kind {
                ConnectorKind::Straight => 0.0,
                _ => DEFAULT_CURVATURE,
            },
            along_line: DEFAULT_ALONG_LINE,
            variance_angle: FRAC_PI_2,
            estimate: Estimate::default(),
            user_defined: true,
            thickness: DEFAULT_CONNECTOR_THICKNESS,
            estimate_padding: DEFAULT_ESTIMATE_PADDING,
            label_box: None,
            resolved: None,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.origin == node || self.destination == node
    }
}

/// Identity used to carry edits across re-imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorKey {
    pub origin: String,
    pub destination: String,
    pub kind: ConnectorKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    nodes: Vec<Node>,
    connectors: Vec<Connector>,
    #[serde(default)]
    coeff_display: CoefficientDisplay,
    /// Draw connectors the estimator generated, not only user-specified ones.
    #[serde(default)]
    view_generated: bool,
    #[serde(skip)]
    fresh: bool,
    /// Label style the last full pass measured.
    #[serde(skip)]
    pass_display: Option<CoefficientDisplay>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, ModelError> {
        if self.find_node(&node.name).is_some() {
            return Err(ModelError::DuplicateNode(node.name));
        }
        self.nodes.push(node);
        self.fresh = false;
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn add_connector(
        &mut self,
        origin: NodeId,
        destination: NodeId,
        kind: ConnectorKind,
    ) -> Result<ConnectorId, ModelError> {
        self.check_ends(origin, destination, kind)?;
        self.connectors
            .push(Connector::new(origin, destination, kind));
        self.fresh = false;
        Ok(ConnectorId(self.connectors.len() - 1))
    }

    pub(crate) fn check_ends(
        &self,
        origin: NodeId,
        destination: NodeId,
        kind: ConnectorKind,
    ) -> Result<(), ModelError> {
        let o = self
            .nodes
            .get(origin.0)
            .ok_or(ModelError::UnknownNode(origin.0))?;
        let d = self
            .nodes
            .get(destination.0)
            .ok_or(ModelError::UnknownNode(destination.0))?;
        match (kind, origin == destination) {
            (ConnectorKind::Circular, false) => Err(ModelError::NotSelfLoop {
                kind,
                origin: o.name.clone(),
                destination: d.name.clone(),
            }),
            (ConnectorKind::Straight | ConnectorKind::Curved, true) => {
                Err(ModelError::UnexpectedSelfLoop {
                    kind,
                    node: o.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutable access; any change invalidates the last layout pass.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.fresh = false;
        &mut self.nodes[id.0]
    }

    pub fn connector(&self, id: ConnectorId) -> &Connector {
        &self.connectors[id.0]
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> &mut Connector {
        self.fresh = false;
        &mut self.connectors[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn connectors(&self) -> impl Iterator<Item = (ConnectorId, &Connector)> {
        self.connectors
            .iter()
            .enumerate()
            .map(|(i, c)| (ConnectorId(i), c))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(NodeId)
    }

    pub fn find_connector(&self, key: &ConnectorKey) -> Option<ConnectorId> {
        self.connectors().find_map(|(id, _)| {
            if self.connector_key(id) == *key {
                Some(id)
            } else {
                None
            }
        })
    }

    pub fn connector_key(&self, id: ConnectorId) -> ConnectorKey {
        let c = self.connector(id);
        ConnectorKey {
            origin: self.node(c.origin).name.clone(),
            destination: self.node(c.destination).name.clone(),
            kind: c.kind,
        }
    }

    /// A connector is drawn when both ends are visible and it is either
    /// user-specified or generated connectors are switched on.
    pub fn is_drawable(&self, id: ConnectorId) -> bool {
        let c = self.connector(id);
        self.node(c.origin).visible
            && self.node(c.destination).visible
            && (c.user_defined || self.view_generated)
    }

    pub fn coeff_display(&self) -> CoefficientDisplay {
        self.coeff_display
    }

    pub fn set_coeff_display(&mut self, display: CoefficientDisplay) {
        if self.coeff_display != display {
            self.coeff_display = display;
            self.fresh = false;
        }
    }

    pub fn view_generated(&self) -> bool {
        self.view_generated
    }

    /// Toggling changes which connectors share an edge, so it invalidates
    /// the last layout pass.
    pub fn set_view_generated(&mut self, on: bool) {
        if self.view_generated != on {
            self.view_generated = on;
            self.fresh = false;
        }
    }

    /// Direct manipulation: place a node, snapping its centre to `grid`.
    pub fn move_node(&mut self, id: NodeId, pos: Point, grid: f32) {
        self.node_mut(id).pos = snap_to_grid(pos, grid);
    }

    /// Straight connectors keep zero curvature; returns whether it applied.
    pub fn set_curvature(&mut self, id: ConnectorId, curvature: f32) -> bool {
        if self.connector(id).kind == ConnectorKind::Straight {
            tracing::debug!(connector = id.0, "ignoring curvature edit on straight connector");
            return false;
        }
        self.connector_mut(id).curvature = curvature;
        true
    }

    pub fn set_along_line(&mut self, id: ConnectorId, proportion: f32) {
        self.connector_mut(id).along_line = proportion.clamp(0.0, 1.0);
    }

    pub fn set_variance_angle(&mut self, id: ConnectorId, angle: f64) {
        self.connector_mut(id).variance_angle = crate::geometry::normalize_angle(angle);
    }

    /// Show only `id` and the nodes it shares a connector with.
    pub fn focus(&mut self, id: NodeId) {
        let adjacency = Adjacency::build(self);
        let keep = adjacency.neighbors(id).to_vec();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.visible = i == id.0 || keep.contains(&NodeId(i));
        }
        self.fresh = false;
    }

    /// Make every connected node visible again.
    pub fn show_all(&mut self) {
        let adjacency = Adjacency::build(self);
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if adjacency.contains(NodeId(i)) {
                node.visible = true;
            }
        }
        self.fresh = false;
    }

    /// True while resolved endpoints still match node positions.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Whether the last full pass measured labels in `display`.
    pub(crate) fn is_fresh_for(&self, display: CoefficientDisplay) -> bool {
        self.fresh && self.pass_display == Some(display)
    }

    pub(crate) fn mark_fresh(&mut self, display: CoefficientDisplay) {
        self.fresh = true;
        self.pass_display = Some(display);
    }

    /// Drop every connector, handing them back; nodes are kept.
    pub(crate) fn take_connectors(&mut self) -> Vec<Connector> {
        self.fresh = false;
        std::mem::take(&mut self.connectors)
    }

    pub(crate) fn nodes_raw_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub(crate) fn connectors_raw_mut(&mut self) -> &mut [Connector] {
        &mut self.connectors
    }
}

/// Node -> itself plus every node it shares a connector with.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    index: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    pub fn build(model: &Model) -> Self {
        let mut index: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (_, c) in model.connectors() {
            for (from, to) in [(c.origin, c.destination), (c.destination, c.origin)] {
                let entry = index.entry(from).or_insert_with(|| vec![from]);
                if !entry.contains(&to) {
                    entry.push(to);
                }
            }
        }
        Self { index }
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.index.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_nodes() -> (Model, NodeId, NodeId, NodeId) {
        let mut model = Model::new();
        let a = model
            .add_node(Node::new("a", NodeClass::Observed, Point::new(0.0, 0.0)))
            .unwrap();
        let b = model
            .add_node(Node::new("b", NodeClass::Latent, Point::new(100.0, 0.0)))
            .unwrap();
        let c = model
            .add_node(Node::new("c", NodeClass::Observed, Point::new(200.0, 0.0)))
            .unwrap();
        (model, a, b, c)
    }

    #[test]
    fn circular_connectors_must_be_self_loops() {
        let (mut model, a, b, _) = three_nodes();
        assert!(matches!(
            model.add_connector(a, b, ConnectorKind::Circular),
            Err(ModelError::NotSelfLoop { .. })
        ));
        assert!(matches!(
            model.add_connector(a, a, ConnectorKind::Straight),
            Err(ModelError::UnexpectedSelfLoop { .. })
        ));
        assert!(model.add_connector(a, a, ConnectorKind::Circular).is_ok());
        assert_eq!(
            model.add_connector(a, NodeId(9), ConnectorKind::Straight),
            Err(ModelError::UnknownNode(9))
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (mut model, ..) = three_nodes();
        let err = model
            .add_node(Node::new("a", NodeClass::Observed, Point::ZERO))
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateNode("a".to_string()));
    }

    #[test]
    fn straight_connectors_keep_zero_curvature() {
        let (mut model, a, b, _) = three_nodes();
        let s = model.add_connector(a, b, ConnectorKind::Straight).unwrap();
        let c = model.add_connector(a, b, ConnectorKind::Curved).unwrap();
        assert_eq!(model.connector(s).curvature, 0.0);
        assert!(!model.set_curvature(s, 0.5));
        assert_eq!(model.connector(s).curvature, 0.0);
        assert!(model.set_curvature(c, -0.2));
        assert_eq!(model.connector(c).curvature, -0.2);
        model.set_along_line(c, 4.0);
        assert_eq!(model.connector(c).along_line, 1.0);
    }

    #[test]
    fn focus_hides_unrelated_nodes() {
        let (mut model, a, b, c) = three_nodes();
        model.add_connector(a, b, ConnectorKind::Straight).unwrap();
        model.add_connector(b, c, ConnectorKind::Straight).unwrap();
        model.focus(a);
        assert!(model.node(a).visible);
        assert!(model.node(b).visible);
        assert!(!model.node(c).visible);
        model.show_all();
        assert!(model.node(c).visible);
    }

    #[test]
    fn clone_is_a_handle_copy() {
        let (mut model, a, b, _) = three_nodes();
        let id = model.add_connector(a, b, ConnectorKind::Straight).unwrap();
        let mut copy = model.clone();
        copy.move_node(a, Point::new(41.0, 39.0), 20.0);
        assert_eq!(copy.node(copy.connector(id).origin).pos, Point::new(40.0, 40.0));
        assert_eq!(model.node(a).pos, Point::ZERO);
    }

    #[test]
    fn coefficient_labels() {
        let est = Estimate {
            value: 0.13486,
            p_value: 0.049,
            ci: [0.1, 0.2],
        };
        assert_eq!(CoefficientDisplay::Value.format(&est, 2).as_deref(), Some("0.13"));
        assert_eq!(
            CoefficientDisplay::Interval.format(&est, 2).as_deref(),
            Some("[0.10, 0.20]")
        );
        assert_eq!(CoefficientDisplay::Star.format(&est, 2).as_deref(), Some("0.13*"));
        assert_eq!(CoefficientDisplay::None.format(&est, 2), None);
    }

    #[test]
    fn view_and_label_settings_clear_freshness() {
        let (mut model, ..) = three_nodes();
        model.mark_fresh(CoefficientDisplay::Star);
        model.set_view_generated(false);
        assert!(model.is_fresh());
        model.set_view_generated(true);
        assert!(!model.is_fresh());

        model.mark_fresh(CoefficientDisplay::Star);
        assert!(model.is_fresh_for(CoefficientDisplay::Star));
        assert!(!model.is_fresh_for(CoefficientDisplay::Value));
        model.set_coeff_display(CoefficientDisplay::Value);
        assert!(!model.is_fresh());
    }
}
