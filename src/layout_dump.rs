use crate::layout::{ConnectorGeometry, DiagramLayout};
use crate::model::{ConnectorKind, NodeClass, NodeId};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub connectors: Vec<ConnectorDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub name: String,
    pub class: NodeClass,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub origin: String,
    pub destination: String,
    pub kind: ConnectorKind,
    pub angle: f64,
    pub geometry: ConnectorGeometry,
    pub label: Option<LabelDump>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &DiagramLayout) -> Self {
        let names: HashMap<_, _> = layout
            .nodes
            .iter()
            .map(|node| (node.id, node.name.as_str()))
            .collect();
        let name_of = |id: NodeId| names.get(&id).copied().unwrap_or_default().to_string();

        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                name: node.name.clone(),
                class: node.class,
                x: node.center.x,
                y: node.center.y,
                width: node.size.width,
                height: node.size.height,
            })
            .collect();

        let connectors = layout
            .connectors
            .iter()
            .map(|c| ConnectorDump {
                origin: name_of(c.from),
                destination: name_of(c.to),
                kind: c.kind,
                angle: c.angle,
                geometry: c.geometry.clone(),
                label: c.label.as_ref().map(|label| LabelDump {
                    text: label.text.clone(),
                    x: label.center.x,
                    y: label.center.y,
                    width: label.size.width,
                    height: label.size.height,
                }),
            })
            .collect();

        let (width, height) = layout
            .bounds()
            .map(|b| (b.width(), b.height()))
            .unwrap_or_default();

        LayoutDump {
            width,
            height,
            nodes,
            connectors,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &DiagramLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
