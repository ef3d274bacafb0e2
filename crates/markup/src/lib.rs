//! Markup stages of slide conversion: layout IR to HTML, HTML to a React
//! component, and selector-addressed text edits on the HTML.

pub mod edit;
pub mod render;
pub mod scanner;
pub mod selector;
pub mod template;
pub mod transpile;

pub use edit::{apply_edit, apply_edits, extract_editable_elements, find_text_by_content, EditAction, TextEdit};
pub use render::{render, render_element};
pub use selector::Selector;
pub use template::render_template;
pub use transpile::{transpile, TranspileOptions, Transpiler};
