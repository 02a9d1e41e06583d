use crate::config::LayoutConfig;
use crate::model::{Model, NodeClass};
use crate::text_metrics::TextMeasure;

/// Derive node sizes from their text. Widths already measured on an earlier
/// pass are reused.
pub(crate) fn size_nodes(model: &mut Model, measure: &dyn TextMeasure, config: &LayoutConfig) {
    let padding = config.target_padding;
    let line_height = measure.line_height(config.font_size);
    for node in model.nodes_raw_mut().iter_mut().filter(|n| n.visible) {
        if node.class == NodeClass::Intercept {
            continue;
        }
        let text_width = *node
            .text_width
            .get_or_insert_with(|| measure.text_width(&node.text, config.font_size, node.bold));
        match node.class {
            NodeClass::Observed => {
                node.size.width = text_width + 2.0 * padding;
                node.size.height = config.observed_height;
                node.padding = padding;
            }
            NodeClass::Latent => {
                let diameter = text_width.hypot(line_height) + 2.0 * padding;
                node.size.width = diameter;
                node.size.height = diameter;
                node.padding = (diameter - text_width) / 2.0;
            }
            NodeClass::Intercept => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};
    use crate::model::Node;
    use crate::text_metrics::RatioMeasure;

    #[test]
    fn observed_and_latent_sizes() {
        let mut model = Model::new();
        let obs = model
            .add_node(Node::new("x1", NodeClass::Observed, Point::ZERO))
            .unwrap();
        let lat = model
            .add_node(Node::new("visual", NodeClass::Latent, Point::ZERO))
            .unwrap();
        let int = model
            .add_node(Node::new("1", NodeClass::Intercept, Point::ZERO))
            .unwrap();
        let measure = RatioMeasure { char_ratio: 0.5 };
        let config = LayoutConfig::default();
        size_nodes(&mut model, &measure, &config);

        // "x1" at 16px and ratio 0.5 is 16 wide
        assert_eq!(model.node(obs).size, Size::new(36.0, 50.0));
        assert_eq!(model.node(obs).padding, 10.0);

        let latent = model.node(lat);
        assert_eq!(latent.size.width, latent.size.height);
        let expected = 48.0f32.hypot(24.0) + 20.0;
        assert!((latent.size.width - expected).abs() < 1e-4);
        assert!((latent.padding - (expected - 48.0) / 2.0).abs() < 1e-4);

        assert_eq!(model.node(int).size, Size::default());
    }

    #[test]
    fn cached_width_is_reused() {
        let mut model = Model::new();
        let id = model
            .add_node(Node::new("y", NodeClass::Observed, Point::ZERO))
            .unwrap();
        model.node_mut(id).text_width = Some(100.0);
        size_nodes(&mut model, &RatioMeasure::default(), &LayoutConfig::default());
        assert_eq!(model.node(id).size.width, 120.0);
    }
}
