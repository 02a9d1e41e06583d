//! Document export: the layout on a fixed-origin page sized to its content.

use crate::config::ExportConfig;
use crate::geometry::{Point, Size};
use crate::layout::DiagramLayout;
use crate::render::{Transform, render_svg};
use crate::theme::Theme;

/// Page mapping and page size for `layout`. The drawing's bounding box is
/// scaled to points and inset by `page_padding` on every side.
pub fn page_transform(layout: &DiagramLayout, config: &ExportConfig) -> (Transform, Size) {
    let scale = config.points_per_pixel;
    let pad = config.page_padding;
    let Some(bounds) = layout.bounds() else {
        return (
            Transform {
                scale,
                translate: Point::new(pad, pad),
            },
            Size::new(2.0 * pad, 2.0 * pad),
        );
    };
    let transform = Transform {
        scale,
        translate: Point::new(pad, pad) - bounds.min * scale,
    };
    let size = Size::new(
        bounds.width() * scale + 2.0 * pad,
        bounds.height() * scale + 2.0 * pad,
    );
    (transform, size)
}

pub fn export_svg(layout: &DiagramLayout, theme: &Theme, config: &ExportConfig) -> String {
    let (transform, page) = page_transform(layout, config);
    tracing::debug!(
        width = page.width,
        height = page.height,
        "exporting page"
    );
    render_svg(layout, theme, &transform, page)
}

#[cfg(feature = "pdf")]
pub fn export_pdf(
    layout: &DiagramLayout,
    theme: &Theme,
    config: &ExportConfig,
) -> anyhow::Result<Vec<u8>> {
    svg_to_pdf(&export_svg(layout, theme, config))
}

#[cfg(feature = "pdf")]
pub fn svg_to_pdf(svg: &str) -> anyhow::Result<Vec<u8>> {
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opt)?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|err| anyhow::anyhow!("failed to convert SVG to PDF: {err:?}"))
}
