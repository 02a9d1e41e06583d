//! Saved projects: the whole model as JSON, including node positions and
//! connector edits, so a re-import can skip the initial layout.

use std::path::Path;

use crate::error::ProjectError;
use crate::model::Model;

pub fn project_to_json(model: &Model) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(model)?)
}

/// Parse a project without checking its handles; `load_project` does both.
pub fn project_from_json(contents: &str) -> Result<Model, serde_json::Error> {
    serde_json::from_str(contents)
}

pub fn save_project(model: &Model, path: &Path) -> Result<(), ProjectError> {
    let json = project_to_json(model)?;
    std::fs::write(path, json).map_err(|source| ProjectError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_project(path: &Path) -> Result<Model, ProjectError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let model = project_from_json(&contents).map_err(|source| ProjectError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&model)?;
    tracing::debug!(
        path = %path.display(),
        nodes = model.node_count(),
        connectors = model.connector_count(),
        "loaded project"
    );
    Ok(model)
}

/// `Ok(None)` when there is no project at `path` yet.
pub fn load_project_if_exists(path: &Path) -> Result<Option<Model>, ProjectError> {
    if !path.exists() {
        return Ok(None);
    }
    load_project(path).map(Some)
}

fn validate(model: &Model) -> Result<(), ProjectError> {
    let mut names = std::collections::HashSet::new();
    for (_, node) in model.nodes() {
        if !names.insert(node.name.as_str()) {
            return Err(crate::error::ModelError::DuplicateNode(node.name.clone()).into());
        }
    }
    for (_, c) in model.connectors() {
        model.check_ends(c.origin, c.destination, c.kind)?;
    }
    Ok(())
}
