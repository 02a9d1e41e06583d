#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod import;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod project;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ExportConfig, ForceConfig, LayoutConfig, RenderConfig, load_config};
pub use error::{LayoutError, ModelError, ProjectError};
pub use import::{ParameterRow, build_model, parse_parameter_table};
pub use layout::{DiagramLayout, compute_layout, reuse_layout};
pub use model::{
    CoefficientDisplay, Connector, ConnectorId, ConnectorKind, Model, Node, NodeClass, NodeId,
};
