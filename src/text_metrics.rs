use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Advance width of a single line of text. Node sizes are derived from this,
/// so both renderers must supply it before a layout pass.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32;

    fn line_height(&self, font_size: f32) -> f32 {
        font_size * 1.5
    }
}

/// Width as a fixed fraction of the font size per character. Used when no
/// system font is available and in tests, where it keeps sizes predictable.
#[derive(Debug, Clone, Copy)]
pub struct RatioMeasure {
    pub char_ratio: f32,
}

impl Default for RatioMeasure {
    fn default() -> Self {
        Self { char_ratio: 0.56 }
    }
}

impl TextMeasure for RatioMeasure {
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let weight = if bold { 1.08 } else { 1.0 };
        text.chars().filter(|c| *c != '\n').count() as f32 * font_size * self.char_ratio * weight
    }
}

/// Measures with the first system font matching a CSS-like family list,
/// falling back to `RatioMeasure` when nothing matches.
#[derive(Debug, Clone)]
pub struct FontMeasure {
    pub font_family: String,
    fallback: RatioMeasure,
}

impl FontMeasure {
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            fallback: RatioMeasure::default(),
        }
    }
}

impl TextMeasure for FontMeasure {
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        measure_text_width(text, font_size, &self.font_family, bold)
            .unwrap_or_else(|| self.fallback.text_width(text, font_size, bold))
    }
}

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str, bold: bool) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family, bold)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<(String, bool), Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str, bold: bool) -> Option<f32> {
        let key = (normalize_family_key(font_family), bold);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family, bold);
            if face.is_none() {
                tracing::debug!(family = font_family, "no system font matched; using ratio fallback");
            }
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get_mut(&key).and_then(|face| face.as_mut())?;
        let normalized = text.replace('\t', "    ");
        face.measure_width(&normalized, font_size)
    }

    fn load_face(&mut self, font_family: &str, bold: bool) -> Option<FontFace> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Option<Family<'static>>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            let generic = match raw.to_ascii_lowercase().as_str() {
                "serif" => Some(Family::Serif),
                "sans" | "sans-serif" | "system-ui" | "-apple-system" => Some(Family::SansSerif),
                "monospace" | "ui-monospace" => Some(Family::Monospace),
                _ => None,
            };
            if generic.is_none() {
                names.push(raw.to_string());
            }
            generics.push(generic);
        }
        if generics.is_empty() {
            generics.push(Some(Family::SansSerif));
        }

        let mut name_iter = names.iter();
        let families: Vec<Family<'_>> = generics
            .into_iter()
            .filter_map(|generic| match generic {
                Some(family) => Some(family),
                None => name_iter.next().map(|name| Family::Name(name.as_str())),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded = None;
        self.db.with_face_data(id, |data, index| {
            if let Ok(face) = Face::parse(data, index) {
                let ascii_advances = ascii_advances(&face);
                loaded = Some(FontFace {
                    data: data.to_vec(),
                    index,
                    units_per_em: face.units_per_em().max(1),
                    ascii_advances,
                    advance_cache: HashMap::new(),
                });
            }
        });
        loaded
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

fn ascii_advances(face: &Face<'_>) -> [u16; 128] {
    let mut advances = [0u16; 128];
    for byte in 0u8..=127 {
        if let Some(glyph_id) = face.glyph_index(byte as char) {
            advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
        }
    }
    advances
}

impl FontFace {
    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;

        if text.is_ascii() {
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                width += if advance == 0 {
                    fallback
                } else {
                    advance as f32 * scale
                };
            }
            return Some(width.max(0.0));
        }

        let missing: Vec<char> = text
            .chars()
            .filter(|ch| *ch != '\n' && !self.advance_cache.contains_key(ch))
            .collect();
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok()?;
            for ch in missing {
                let advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph));
                self.advance_cache.insert(ch, advance);
            }
        }

        for ch in text.chars().filter(|ch| *ch != '\n') {
            width += match self.advance_cache.get(&ch).copied().flatten() {
                Some(advance) => advance as f32 * scale,
                None => fallback,
            };
        }
        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
