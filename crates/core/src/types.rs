//! Layout IR: the canonical per-slide record passed from the decoder to the
//! renderer, and surfaced as JSON to external callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One decoded slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideLayout {
    /// Fresh identifier, different on every decode.
    pub id: String,

    /// 1-based slide number in presentation order.
    pub index: usize,

    pub width_px: i64,
    pub height_px: i64,

    #[serde(default)]
    pub background: Option<Fill>,

    /// Font families referenced by text runs.
    #[serde(default)]
    pub fonts: BTreeSet<String>,

    /// Elements in source order, which is also paint order.
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl SlideLayout {
    /// Create an empty slide of the given pixel size.
    pub fn new(id: impl Into<String>, index: usize, width_px: i64, height_px: i64) -> Self {
        Self {
            id: id.into(),
            index,
            width_px,
            height_px,
            background: None,
            fonts: BTreeSet::new(),
            elements: Vec::new(),
        }
    }

    /// Append an element, recording the font families its runs reference.
    pub fn push_element(&mut self, element: Element) {
        for family in element.font_families() {
            self.fonts.insert(family.to_string());
        }
        self.elements.push(element);
    }
}

/// Axis-aligned box in pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BBox {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the box has no area.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A positioned slide element: shared envelope plus a per-type payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,

    /// Absent only in externally supplied IR; such elements render empty.
    #[serde(default)]
    pub bbox: Option<BBox>,

    /// Paint order; higher paints later.
    #[serde(default)]
    pub z: u32,

    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub flip_h: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub flip_v: bool,

    #[serde(flatten)]
    pub kind: ElementKind,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Element {
    /// Create an element with a default envelope.
    pub fn new(id: impl Into<String>, bbox: BBox, z: u32, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            bbox: Some(bbox),
            z,
            rotation: 0.0,
            opacity: None,
            flip_h: false,
            flip_v: false,
            kind,
        }
    }

    /// The IR type tag of this element.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ElementKind::Text(_) => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Shape(_) => "shape",
            ElementKind::Table(_) => "table",
            ElementKind::Line(_) => "line",
        }
    }

    /// Font families referenced by this element's runs, in run order.
    pub fn font_families(&self) -> Vec<&str> {
        let runs: Box<dyn Iterator<Item = &Run>> = match &self.kind {
            ElementKind::Text(text) => Box::new(
                text.runs
                    .iter()
                    .chain(text.bullets.iter().flat_map(|b| b.runs.iter())),
            ),
            ElementKind::Table(table) => Box::new(
                table
                    .rows
                    .iter()
                    .flat_map(|r| r.cells.iter())
                    .flat_map(|c| c.runs.iter()),
            ),
            _ => Box::new(std::iter::empty()),
        };
        runs.filter_map(|run| run.font.family.as_deref()).collect()
    }
}

/// Per-type element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text(TextElement),
    Image(ImageElement),
    Shape(ShapeElement),
    Table(TableElement),
    Line(LineElement),
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Paragraph list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Bullet,
    Number,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(default)]
    pub align: Align,

    /// All runs of all paragraphs, flattened.
    #[serde(default)]
    pub runs: Vec<Run>,

    /// One block per non-empty paragraph.
    #[serde(default)]
    pub bullets: Vec<ParagraphBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParagraphBlock {
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub marker: Marker,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub src: String,

    #[serde(default = "default_object_fit")]
    pub object_fit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Stroke>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Fill>,
}

fn default_object_fit() -> String {
    "cover".to_string()
}

impl ImageElement {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            object_fit: default_object_fit(),
            crop: None,
            shadow: None,
            border: None,
            background: None,
        }
    }
}

/// Clip insets in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Crop {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeElement {
    /// Preset geometry name (`rect`, `ellipse`, ...) or `custom`.
    #[serde(rename = "shape", default = "default_shape_kind")]
    pub shape_kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,

    /// Corner radius in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
}

fn default_shape_kind() -> String {
    "rect".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableElement {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineElement {
    /// Start and end point; fewer than two renders nothing.
    #[serde(default)]
    pub points: Vec<Point>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
}

/// A styled span of text. `text` is never empty in decoder output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub font: FontSpec,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strike: bool,
    #[serde(default)]
    pub highlight: Option<String>,
}

impl Run {
    /// A run with the given text and font; colour and decoration follow the font.
    pub fn new(text: impl Into<String>, font: FontSpec) -> Self {
        Self {
            text: text.into(),
            color: font.color.clone(),
            underline: font.underline,
            strike: false,
            highlight: None,
            font,
        }
    }
}

pub const WEIGHT_NORMAL: u16 = 400;
pub const WEIGHT_BOLD: u16 = 700;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default)]
    pub family: Option<String>,

    /// Size in points.
    #[serde(default)]
    pub size: Option<f64>,

    #[serde(default = "default_weight")]
    pub weight: u16,

    #[serde(default)]
    pub style: FontStyle,

    #[serde(default)]
    pub underline: bool,

    #[serde(default)]
    pub color: Option<String>,
}

fn default_weight() -> u16 {
    WEIGHT_NORMAL
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: None,
            size: None,
            weight: WEIGHT_NORMAL,
            style: FontStyle::Normal,
            underline: false,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
        }
    }
}

/// A resolved paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fill {
    Solid {
        color: String,
        /// From the colour's alpha modifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
    },
    Gradient {
        stops: Vec<GradientStop>,
        /// Degrees.
        #[serde(default)]
        angle: f64,
    },
    Image {
        src: String,
        #[serde(default = "default_object_fit")]
        fit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
    },
    /// A scheme colour the palette could not turn into RGB.
    UnresolvedTheme {
        name: String,
    },
}

impl Fill {
    pub fn solid(color: impl Into<String>) -> Self {
        Self::Solid {
            color: color.into(),
            opacity: None,
        }
    }

    /// Single representative colour, when there is one.
    pub fn primary_color(&self) -> Option<&str> {
        match self {
            Self::Solid { color, .. } => Some(color),
            Self::Gradient { stops, .. } => stops.first().map(|s| s.color.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position in [0, 1].
    pub offset: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stroke {
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    /// `dash` or `dot` when the outline is not solid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

impl Stroke {
    /// `None` when neither width nor colour is known.
    pub fn new(width: Option<f64>, color: Option<String>) -> Option<Self> {
        if width.is_none() && color.is_none() {
            return None;
        }
        Some(Self {
            width,
            color,
            dash: None,
        })
    }
}

/// Outer shadow, pixel units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shadow {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub blur: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub opacity: Option<f64>,
}

/// Geometry-only view of a slide layout: its shapes without content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    /// 1-based layout number.
    pub index: usize,
    pub width_px: i64,
    pub height_px: i64,
    #[serde(default)]
    pub shapes: Vec<TemplateShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateShape {
    /// Preset geometry name, or `custom`.
    pub geometry: String,
    pub bbox: BBox,
    #[serde(default)]
    pub z: u32,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub stroke: Option<Stroke>,
    /// `p:ph type` when the shape is a placeholder (`body` when untyped).
    #[serde(default)]
    pub placeholder_type: Option<String>,
}

/// A text node exposed for external editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableElement {
    pub selector: String,
    pub text: String,
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_element() -> Element {
        let mut font = FontSpec::default();
        font.family = Some("Inter".to_string());
        let run = Run::new("Hello", font);
        Element::new(
            "e1",
            BBox::new(10, 20, 300, 40),
            0,
            ElementKind::Text(TextElement {
                runs: vec![run.clone()],
                bullets: vec![ParagraphBlock {
                    level: 0,
                    marker: Marker::None,
                    text: "Hello".to_string(),
                    runs: vec![run],
                }],
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_element_serializes_flat_with_type_tag() {
        let value = serde_json::to_value(text_element()).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["bbox"]["width"], 300);
        assert_eq!(value["align"], "left");
        assert!(value.get("opacity").is_none());
    }

    #[test]
    fn test_element_round_trips_through_json() {
        let element = text_element();
        let json = serde_json::to_string(&element).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }

    #[test]
    fn test_fill_tags() {
        let value = serde_json::to_value(Fill::UnresolvedTheme {
            name: "accent1".to_string(),
        })
        .unwrap();
        assert_eq!(value["type"], "unresolved_theme");
        assert_eq!(value["name"], "accent1");
    }

    #[test]
    fn test_missing_bbox_deserializes() {
        let json = r##"{"id":"x","z":3,"type":"shape","shape":"rect"}"##;
        let element: Element = serde_json::from_str(json).unwrap();
        assert!(element.bbox.is_none());
        assert_eq!(element.z, 3);
        assert_eq!(element.type_name(), "shape");
    }

    #[test]
    fn test_push_element_collects_fonts() {
        let mut slide = SlideLayout::new("s", 1, 960, 540);
        slide.push_element(text_element());
        slide.push_element(text_element());
        assert_eq!(slide.fonts.len(), 1);
        assert!(slide.fonts.contains("Inter"));
    }

    #[test]
    fn test_stroke_requires_width_or_color() {
        assert!(Stroke::new(None, None).is_none());
        assert!(Stroke::new(Some(1.0), None).is_some());
    }
}
