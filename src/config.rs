use crate::geometry::Point;
use crate::model::CoefficientDisplay;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceConfig {
    pub iterations: usize,
    pub ideal_spring_length: f32,
    pub repel_force: f32,
    pub attract_force: f32,
    /// Initial cap on how far a node may move in one pass.
    pub initial_temperature: f32,
    pub cooling_factor: f32,
    /// Side length of the square new nodes are scattered over before the
    /// simulation runs.
    pub scatter_magnitude: f32,
    pub seed: u64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            ideal_spring_length: 10.0,
            repel_force: 0.8,
            attract_force: 0.7,
            initial_temperature: 150.0,
            cooling_factor: 0.99,
            scatter_magnitude: 2000.0,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub font_size: f32,
    pub target_padding: f32,
    pub observed_height: f32,
    pub grid_size: f32,
    /// Arrow head length as a multiple of connector thickness.
    pub arrow_scale: f32,
    /// Half-angle between a variance loop's two ends.
    pub variance_spread: f64,
    pub variance_loop_height: f32,
    /// Tolerance for treating a two-connector edge as collinear.
    pub alignment_tolerance: f64,
    pub estimate_precision: usize,
    pub coeff_display: Option<CoefficientDisplay>,
    pub force: ForceConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            target_padding: 10.0,
            observed_height: 50.0,
            grid_size: 20.0,
            arrow_scale: 5.0,
            variance_spread: PI / 10.0,
            variance_loop_height: 30.0,
            alignment_tolerance: PI / 256.0,
            estimate_precision: 2,
            coeff_display: None,
            force: ForceConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn label_font_size(&self) -> f32 {
        (self.font_size - 2.0).max(1.0)
    }
}

/// Screen-space view for the interactive renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub viewport_center: Point,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            scale: 1.0,
            viewport_center: Point::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub page_padding: f32,
    /// Local units to page points.
    pub points_per_pixel: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_padding: 15.0,
            points_per_pixel: 0.75,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    force: Option<ForceConfigFile>,
    render: Option<RenderConfigFile>,
    export: Option<ExportConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_stroke: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    target_padding: Option<f32>,
    observed_height: Option<f32>,
    grid_size: Option<f32>,
    arrow_scale: Option<f32>,
    variance_spread: Option<f64>,
    variance_loop_height: Option<f32>,
    estimate_precision: Option<usize>,
    coeff_display: Option<CoefficientDisplay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceConfigFile {
    iterations: Option<usize>,
    ideal_spring_length: Option<f32>,
    repel_force: Option<f32>,
    attract_force: Option<f32>,
    initial_temperature: Option<f32>,
    cooling_factor: Option<f32>,
    scatter_magnitude: Option<f32>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    scale: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportConfigFile {
    page_padding: Option<f32>,
    points_per_pixel: Option<f32>,
}

macro_rules! apply {
    ($target:expr, $source:expr, $($field:ident),+ $(,)?) => {
        $(if let Some(v) = $source.$field { $target.$field = v; })+
    };
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a JSON or JSON5 config; every field is optional and overrides
/// the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(contents)?,
    };

    let mut config = Config::default();
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme name; keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        apply!(
            config.theme,
            vars,
            font_family,
            font_size,
            node_fill,
            node_stroke,
            text_color,
            line_color,
            label_background,
            background,
        );
    }
    config.layout.font_size = config.theme.font_size;

    if let Some(layout) = parsed.layout {
        apply!(
            config.layout,
            layout,
            target_padding,
            observed_height,
            grid_size,
            arrow_scale,
            variance_spread,
            variance_loop_height,
            estimate_precision,
        );
        if layout.coeff_display.is_some() {
            config.layout.coeff_display = layout.coeff_display;
        }
    }

    if let Some(force) = parsed.force {
        apply!(
            config.layout.force,
            force,
            iterations,
            ideal_spring_length,
            repel_force,
            attract_force,
            initial_temperature,
            cooling_factor,
            scatter_magnitude,
            seed,
        );
    }

    if let Some(render) = parsed.render {
        apply!(config.render, render, width, height, scale);
    }

    if let Some(export) = parsed.export {
        apply!(config.export, export, page_padding, points_per_pixel);
    }

    Ok(config)
}
