//! Core layout types, unit conversion and paint resolution for converting
//! presentation slides into markup.

pub mod error;
pub mod options;
pub mod paint;
pub mod resolve;
pub mod types;
pub mod units;

pub use error::{Error, Result};
pub use options::DecodeOptions;
pub use paint::{ColorKind, ColorSpec, GradientMode, PaintSpec, StopSpec, ThemePalette};
pub use resolve::FillResolver;
pub use types::{
    Align, BBox, Cell, Crop, EditableElement, Element, ElementKind, Fill, FontSpec, FontStyle,
    GradientStop, ImageElement, LayoutTemplate, LineElement, Marker, ParagraphBlock, Point, Row,
    Run, Shadow, ShapeElement, SlideLayout, Stroke, TableElement, TemplateShape, TextElement,
};
pub use units::{length_to_px, length_to_px_at};
