//! PPTX (Office Open XML) decoder producing the slide layout IR.
//!
//! A .pptx file is a ZIP archive of XML parts. The decoder resolves slide
//! order, theme colours and layout inheritance, flattens each slide's shape
//! tree into positioned elements and extracts embedded images.

mod assets;
pub mod decoder;
pub mod fill;
pub mod geometry;
pub mod package;
pub mod template;
pub mod text;
pub mod theme;
pub mod xml;

pub use decoder::PptxDecoder;
pub use template::extract_layout_template;
