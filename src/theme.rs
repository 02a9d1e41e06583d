use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_stroke: String,
    pub text_color: String,
    pub line_color: String,
    pub label_background: String,
    pub background: String,
}

impl Theme {
    /// Black outlines on white, as used for publication figures.
    pub fn classic() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 16.0,
            node_fill: "#FFFFFF".to_string(),
            node_stroke: "#000000".to_string(),
            text_color: "#000000".to_string(),
            line_color: "#000000".to_string(),
            label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 14.0,
            node_fill: "#F8FAFF".to_string(),
            node_stroke: "#44546A".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
