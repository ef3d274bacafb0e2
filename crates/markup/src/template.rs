//! Layout templates as Tailwind-classed placeholder boxes.

use crate::render::{escape_attr, Style};
use slide_core::units::format_number;
use slide_core::{Fill, LayoutTemplate, Stroke, TemplateShape};

/// Utility class for a scheme colour that never resolved to RGB.
fn theme_class(name: &str) -> &'static str {
    match name {
        "accent1" => "bg-blue-500",
        "accent2" => "bg-green-500",
        "accent3" => "bg-red-500",
        "accent4" => "bg-purple-500",
        "accent5" => "bg-yellow-500",
        "accent6" => "bg-pink-500",
        "dk1" | "tx1" => "bg-gray-800",
        "dk2" | "tx2" => "bg-gray-700",
        "lt1" | "bg1" => "bg-gray-100",
        "lt2" | "bg2" => "bg-gray-200",
        _ => "bg-gray-400",
    }
}

fn fill_class(fill: &Fill) -> Option<String> {
    match fill {
        Fill::UnresolvedTheme { name } => Some(theme_class(name).to_string()),
        other => other.primary_color().map(|color| format!("bg-[{}]", color)),
    }
}

fn border_classes(stroke: &Stroke) -> Vec<String> {
    let Some(color) = &stroke.color else {
        return Vec::new();
    };
    let width = stroke.width.unwrap_or(1.0);
    let bucket = if width <= 1.0 {
        "border"
    } else if width <= 2.0 {
        "border-2"
    } else if width <= 4.0 {
        "border-4"
    } else {
        "border-8"
    };
    vec![bucket.to_string(), format!("border-[{}]", color)]
}

fn shape_classes(shape: &TemplateShape) -> Vec<String> {
    let mut classes = vec!["absolute".to_string()];
    classes.extend(shape.fill.as_ref().and_then(fill_class));
    if let Some(stroke) = &shape.stroke {
        classes.extend(border_classes(stroke));
    }
    match shape.geometry.as_str() {
        "ellipse" => classes.push("rounded-full".to_string()),
        "roundRect" | "round2SameRect" => classes.push("rounded-lg".to_string()),
        _ => {}
    }
    classes
}

fn render_shape(shape: &TemplateShape) -> String {
    let mut style = Style::new();
    style
        .px("left", shape.bbox.x as f64)
        .px("top", shape.bbox.y as f64)
        .px("width", shape.bbox.width as f64)
        .px("height", shape.bbox.height as f64);

    let mut transforms = Vec::new();
    if shape.rotation != 0.0 {
        transforms.push(format!("rotate({}deg)", format_number(shape.rotation)));
    }
    if shape.flip_h {
        transforms.push("scaleX(-1)".to_string());
    }
    if shape.flip_v {
        transforms.push("scaleY(-1)".to_string());
    }
    if !transforms.is_empty() {
        style.set("transform", transforms.join(" "));
    }

    let mut attrs = format!(
        "class=\"{}\" style=\"{}\"",
        escape_attr(&shape_classes(shape).join(" ")),
        escape_attr(&style.to_css())
    );
    if let Some(placeholder) = &shape.placeholder_type {
        attrs.push_str(&format!(" data-placeholder=\"{}\"", escape_attr(placeholder)));
    }
    format!("  <div {}></div>", attrs)
}

/// Render a layout template as one container with a box per shape, in
/// ascending `z`. Shapes without area are left out.
pub fn render_template(template: &LayoutTemplate) -> String {
    let mut shapes: Vec<&TemplateShape> = template
        .shapes
        .iter()
        .filter(|shape| !shape.bbox.is_degenerate())
        .collect();
    shapes.sort_by_key(|shape| shape.z);

    let mut lines = vec![format!(
        "<div class=\"relative overflow-hidden\" style=\"width:{}px; height:{}px;\">",
        template.width_px, template.height_px
    )];
    lines.extend(shapes.into_iter().map(render_shape));
    lines.push("</div>".to_string());
    lines.join("\n")
}
