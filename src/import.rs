//! Build a model from an estimator's parameter table, merging in a previously
//! saved project when there is one.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::ModelError;
use crate::layout::{Scatter, force_layout};
use crate::model::{ConnectorKey, ConnectorKind, Estimate, Model, Node, NodeClass, NodeId};

/// One row of a lavaan-style parameter table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub lhs: String,
    pub op: String,
    pub rhs: String,
    #[serde(default)]
    pub user: i32,
    #[serde(default)]
    pub group: i32,
    #[serde(default)]
    pub est: Option<f64>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub pvalue: Option<f64>,
    #[serde(default)]
    pub ci_lower: Option<f64>,
    #[serde(default)]
    pub ci_upper: Option<f64>,
}

impl ParameterRow {
    fn estimate(&self) -> Estimate {
        Estimate {
            value: self.est.unwrap_or(0.0),
            p_value: self.pvalue.unwrap_or(1.0),
            ci: [self.ci_lower.unwrap_or(0.0), self.ci_upper.unwrap_or(0.0)],
        }
    }

    /// Connector kind and (origin, destination) names, or `None` for
    /// operators that are not drawn.
    fn connector(&self) -> Option<(ConnectorKind, &str, &str)> {
        match self.op.as_str() {
            "=~" => Some((ConnectorKind::Straight, &self.lhs, &self.rhs)),
            "~" => Some((ConnectorKind::Straight, &self.rhs, &self.lhs)),
            "~~" if self.lhs == self.rhs => Some((ConnectorKind::Circular, &self.lhs, &self.rhs)),
            "~~" => Some((ConnectorKind::Curved, &self.lhs, &self.rhs)),
            _ => None,
        }
    }
}

pub fn parse_parameter_table(contents: &str) -> Result<Vec<ParameterRow>, serde_json::Error> {
    serde_json::from_str(contents)
}

/// Edits carried over from a saved connector.
#[derive(Debug, Clone, Copy)]
struct SavedEdits {
    curvature: f32,
    along_line: f32,
    variance_angle: f64,
}

/// Turn `rows` into a model. Nodes from `prior` keep their place and start
/// hidden until a row mentions them; new nodes are scattered and then placed
/// by the force layout while prior nodes stay pinned.
pub fn build_model(
    rows: &[ParameterRow],
    prior: Option<Model>,
    config: &LayoutConfig,
) -> Result<Model, ModelError> {
    let had_prior = prior.is_some();
    let mut model = prior.unwrap_or_default();

    let mut saved: HashMap<ConnectorKey, SavedEdits> = HashMap::new();
    for (id, c) in model.connectors() {
        saved.insert(
            model.connector_key(id),
            SavedEdits {
                curvature: c.curvature,
                along_line: c.along_line,
                variance_angle: c.variance_angle,
            },
        );
    }
    model.take_connectors();
    for node in model.nodes_raw_mut() {
        node.visible = false;
    }

    let latent: BTreeSet<&str> = rows
        .iter()
        .filter(|row| row.op == "=~")
        .map(|row| row.lhs.as_str())
        .collect();

    let mut scatter = Scatter::new(&config.force, config.grid_size);
    let mut fresh_nodes: BTreeSet<NodeId> = BTreeSet::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some((kind, origin_name, dest_name)) = row.connector() else {
            skipped += 1;
            continue;
        };
        let mut ensure = |name: &str| -> Result<NodeId, ModelError> {
            let id = match model.find_node(name) {
                Some(id) => id,
                None => {
                    let node = Node::new(name, NodeClass::Observed, scatter.next_position());
                    let id = model.add_node(node)?;
                    fresh_nodes.insert(id);
                    id
                }
            };
            let node = model.node_mut(id);
            node.visible = true;
            node.class = if latent.contains(name) {
                NodeClass::Latent
            } else {
                NodeClass::Observed
            };
            Ok(id)
        };
        let origin = ensure(origin_name)?;
        let destination = ensure(dest_name)?;

        let key = ConnectorKey {
            origin: origin_name.to_string(),
            destination: dest_name.to_string(),
            kind,
        };
        if model.find_connector(&key).is_some() {
            tracing::debug!(lhs = %row.lhs, op = %row.op, rhs = %row.rhs, group = row.group, "duplicate parameter row");
            continue;
        }
        let id = match model.add_connector(origin, destination, kind) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, lhs = %row.lhs, op = %row.op, rhs = %row.rhs, "skipping parameter row");
                continue;
            }
        };

        let c = model.connector_mut(id);
        c.estimate = row.estimate();
        c.user_defined = row.user == 1;
        if let Some(edits) = saved.get(&key) {
            if kind != ConnectorKind::Straight {
                c.curvature = edits.curvature;
            }
            c.along_line = edits.along_line;
            c.variance_angle = edits.variance_angle;
        }
    }

    tracing::debug!(
        rows = rows.len(),
        skipped,
        nodes = model.node_count(),
        new_nodes = fresh_nodes.len(),
        connectors = model.connector_count(),
        had_prior,
        "imported parameter table"
    );

    if !fresh_nodes.is_empty() {
        let pinned: BTreeSet<NodeId> = model
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| !fresh_nodes.contains(id))
            .collect();
        force_layout(&mut model, &pinned, &config.force);
    }
    Ok(model)
}
