use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::config::RenderConfig;
use crate::geometry::{Point, Size};
use crate::layout::{
    ArrowHead, ConnectorGeometry, ConnectorLayout, DiagramLayout, LabelLayout, NodeLayout,
};
use crate::model::NodeClass;
use crate::theme::Theme;

/// Uniform scale then translate from local units to output units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub translate: Point,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        translate: Point::ZERO,
    };

    /// Screen mapping of the interactive view:
    /// `(p + viewport_center) * scale + window / 2`.
    pub fn viewport(config: &RenderConfig) -> Self {
        Self {
            scale: config.scale,
            translate: config.viewport_center * config.scale
                + Point::new(config.width / 2.0, config.height / 2.0),
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        p * self.scale + self.translate
    }

    pub fn length(&self, len: f32) -> f32 {
        len * self.scale
    }
}

/// Draw a layout as SVG on a `canvas`-sized sheet.
pub fn render_svg(
    layout: &DiagramLayout,
    theme: &Theme,
    transform: &Transform,
    canvas: Size,
) -> String {
    let mut svg = String::new();
    let (width, height) = (canvas.width, canvas.height);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">"
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );

    let font_size = transform.length(layout.font_size);
    for node in &layout.nodes {
        node_svg(&mut svg, node, theme, transform, font_size);
    }
    for connector in &layout.connectors {
        connector_svg(&mut svg, connector, theme, transform);
    }
    let label_font_size = transform.length(layout.label_font_size);
    for label in layout.connectors.iter().filter_map(|c| c.label.as_ref()) {
        label_svg(&mut svg, label, theme, transform, label_font_size);
    }

    svg.push_str("</svg>");
    svg
}

/// The interactive view: the layout seen through the configured viewport.
pub fn render_view(layout: &DiagramLayout, theme: &Theme, config: &RenderConfig) -> String {
    render_svg(
        layout,
        theme,
        &Transform::viewport(config),
        Size::new(config.width, config.height),
    )
}

fn node_svg(svg: &mut String, node: &NodeLayout, theme: &Theme, t: &Transform, font_size: f32) {
    let center = t.apply(node.center);
    let size = node.size * t.scale;
    let stroke = t.length(node.thickness);
    match node.class {
        NodeClass::Observed => {
            let corner = center - size.half();
            let _ = write!(
                svg,
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke:.2}\"/>",
                corner.x, corner.y, size.width, size.height, theme.node_fill, theme.node_stroke
            );
        }
        NodeClass::Latent => {
            let _ = write!(
                svg,
                "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke:.2}\"/>",
                center.x,
                center.y,
                size.width / 2.0,
                size.height / 2.0,
                theme.node_fill,
                theme.node_stroke
            );
        }
        NodeClass::Intercept => {}
    }
    let text = t.apply(node.text_origin);
    let weight = if node.bold { " font-weight=\"bold\"" } else { "" };
    let _ = write!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{}\"{weight}>{}</text>",
        text.x,
        text.y,
        escape_xml(&theme.font_family),
        theme.text_color,
        escape_xml(&node.text)
    );
}

fn connector_svg(svg: &mut String, connector: &ConnectorLayout, theme: &Theme, t: &Transform) {
    let stroke = t.length(connector.thickness);
    let d = match &connector.geometry {
        ConnectorGeometry::Line { start, end, .. } => {
            let (s, e) = (t.apply(*start), t.apply(*end));
            format!("M {:.2} {:.2} L {:.2} {:.2}", s.x, s.y, e.x, e.y)
        }
        ConnectorGeometry::Curve {
            start, ctrl, end, ..
        } => {
            let (s, c, e) = (t.apply(*start), t.apply(*ctrl), t.apply(*end));
            format!(
                "M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}",
                s.x, s.y, c.x, c.y, e.x, e.y
            )
        }
        ConnectorGeometry::Arc {
            circle,
            start,
            end,
            sweep,
            ..
        } => {
            let (s, e) = (t.apply(*start), t.apply(*end));
            let r = t.length(circle.radius);
            let large = u8::from(sweep.abs() > PI);
            // positive sweep turns counter-clockwise on screen
            let sweep_flag = u8::from(*sweep < 0.0);
            format!(
                "M {:.2} {:.2} A {r:.2} {r:.2} 0 {large} {sweep_flag} {:.2} {:.2}",
                s.x, s.y, e.x, e.y
            )
        }
    };
    let _ = write!(
        svg,
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{stroke:.2}\"/>",
        theme.line_color
    );
    for head in connector.geometry.heads() {
        arrow_svg(svg, head, theme, t);
    }
}

fn arrow_svg(svg: &mut String, head: &ArrowHead, theme: &Theme, t: &Transform) {
    let points: Vec<String> = head
        .points()
        .iter()
        .map(|p| {
            let p = t.apply(*p);
            format!("{:.2},{:.2}", p.x, p.y)
        })
        .collect();
    let _ = write!(
        svg,
        "<polygon points=\"{}\" fill=\"{}\"/>",
        points.join(" "),
        theme.line_color
    );
}

fn label_svg(svg: &mut String, label: &LabelLayout, theme: &Theme, t: &Transform, font_size: f32) {
    let center = t.apply(label.center);
    let size = label.size * t.scale;
    let corner = center - size.half();
    let _ = write!(
        svg,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
        corner.x, corner.y, size.width, size.height, theme.label_background
    );
    let _ = write!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{}\">{}</text>",
        center.x,
        center.y,
        escape_xml(&theme.font_family),
        theme.text_color,
        escape_xml(&label.text)
    );
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid canvas size {}x{}", render_cfg.width, render_cfg.height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
