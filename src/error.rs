use std::path::PathBuf;

use thiserror::Error;

use crate::model::ConnectorKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate node name `{0}`")]
    DuplicateNode(String),
    #[error("unknown node handle {0}")]
    UnknownNode(usize),
    #[error("{kind:?} connector `{origin}` -> `{destination}` must be a self-loop")]
    NotSelfLoop {
        kind: ConnectorKind,
        origin: String,
        destination: String,
    },
    #[error("{kind:?} connector on `{node}` cannot be a self-loop")]
    UnexpectedSelfLoop { kind: ConnectorKind, node: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("model changed since the last full layout pass")]
    Stale,
    #[error("connector `{origin}` -> `{destination}` has no resolved endpoints")]
    Unresolved { origin: String, destination: String },
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize project: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("inconsistent project: {0}")]
    Invalid(#[from] ModelError),
}
