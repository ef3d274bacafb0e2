//! Layout IR to absolutely positioned HTML.

use slide_core::units::format_number;
use slide_core::{
    Element, ElementKind, Fill, ImageElement, LineElement, Marker, ParagraphBlock, Run, Shadow,
    ShapeElement, SlideLayout, Stroke, TableElement, TextElement,
};

/// Indentation per paragraph level, in pixels.
const LEVEL_INDENT_PX: u32 = 18;

/// Extra indentation for paragraphs with a list marker.
const MARKER_INDENT_PX: u32 = 12;

const DEFAULT_SHADOW_COLOR: &str = "rgba(0,0,0,0.25)";

/// An ordered CSS declaration list. Setting a property twice keeps its
/// first position and replaces the value.
#[derive(Debug, Default, Clone)]
pub(crate) struct Style {
    declarations: Vec<(&'static str, String)>,
}

impl Style {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, property: &'static str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.declarations.iter_mut().find(|(p, _)| *p == property) {
            Some(slot) => slot.1 = value,
            None => self.declarations.push((property, value)),
        }
        self
    }

    pub(crate) fn set_opt(&mut self, property: &'static str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.set(property, value);
        }
        self
    }

    pub(crate) fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn px(&mut self, property: &'static str, value: impl Into<f64>) -> &mut Self {
        self.set(property, format!("{}px", format_number(value.into())))
    }

    pub(crate) fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(property, value)| format!("{}:{};", property, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Escape text content.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

/// Quote a value as a single-quoted CSS string.
fn css_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render one slide as an HTML fragment.
///
/// Output depends only on the input: elements paint in ascending `z`, ties
/// keeping their IR order.
pub fn render(slide: &SlideLayout) -> String {
    let mut container = Style::new();
    container
        .set("position", "relative")
        .px("width", slide.width_px as f64)
        .px("height", slide.height_px as f64)
        .set("overflow", "hidden");
    if let Some(background) = &slide.background {
        apply_fill(&mut container, background);
    }

    let mut ordered: Vec<&Element> = slide.elements.iter().collect();
    ordered.sort_by_key(|element| element.z);

    let mut html = format!("<div style=\"{}\">", escape_attr(&container.to_css()));
    for element in ordered {
        html.push_str(&render_element(element));
    }
    html.push_str("</div>");
    html
}

/// Render a single element; empty when it has no box.
pub fn render_element(element: &Element) -> String {
    if let ElementKind::Line(line) = &element.kind {
        return render_line(element, line);
    }
    let Some(mut style) = base_style(element) else {
        return String::new();
    };
    match &element.kind {
        ElementKind::Text(text) => render_text(&mut style, text),
        ElementKind::Shape(shape) => render_shape(&mut style, shape),
        ElementKind::Image(image) => render_image(&mut style, image),
        ElementKind::Table(table) => render_table(&mut style, table),
        ElementKind::Line(_) => String::new(),
    }
}

fn base_style(element: &Element) -> Option<Style> {
    let bbox = element.bbox?;
    let mut style = Style::new();
    style
        .set("position", "absolute")
        .px("left", bbox.x as f64)
        .px("top", bbox.y as f64)
        .px("width", bbox.width as f64)
        .px("height", bbox.height as f64)
        .set("z-index", element.z.to_string());

    let mut transforms = Vec::new();
    if element.rotation != 0.0 {
        transforms.push(format!("rotate({}deg)", format_number(element.rotation)));
    }
    if element.flip_h {
        transforms.push("scaleX(-1)".to_string());
    }
    if element.flip_v {
        transforms.push("scaleY(-1)".to_string());
    }
    if !transforms.is_empty() {
        style.set("transform", transforms.join(" "));
    }
    style.set_opt("opacity", element.opacity.map(format_number));
    Some(style)
}

fn apply_fill(style: &mut Style, fill: &Fill) {
    match fill {
        Fill::Solid { color, opacity } => {
            let background = match opacity {
                Some(opacity) => rgba(color, *opacity).unwrap_or_else(|| color.clone()),
                None => color.clone(),
            };
            style.set("background", background);
        }
        Fill::Gradient { stops, angle } => {
            let stops: Vec<String> = stops
                .iter()
                .map(|stop| format!("{} {}%", stop.color, format_number(stop.offset * 100.0)))
                .collect();
            style.set(
                "background",
                format!("linear-gradient({}deg, {})", format_number(*angle), stops.join(", ")),
            );
        }
        Fill::Image { src, fit, opacity } => {
            style
                .set("background-image", format!("url({})", css_string(src)))
                .set("background-size", fit.clone())
                .set("background-repeat", "no-repeat")
                .set("background-position", "center");
            if let Some(opacity) = opacity {
                let element = style
                    .get("opacity")
                    .and_then(|value| value.parse::<f64>().ok())
                    .unwrap_or(1.0);
                style.set("opacity", format_number(element * opacity));
            }
        }
        Fill::UnresolvedTheme { name } => {
            log::debug!("Skipping unresolved theme colour {}", name);
        }
    }
}

fn apply_stroke(style: &mut Style, stroke: &Stroke) {
    let Some(color) = &stroke.color else {
        return;
    };
    let line = match stroke.dash.as_deref() {
        Some("dash") | Some("dot") => "dashed",
        _ => "solid",
    };
    style.set(
        "border",
        format!("{}px {} {}", format_number(stroke.width.unwrap_or(1.0)), line, color),
    );
}

fn shadow_css(shadow: &Shadow) -> String {
    let color = match (&shadow.color, shadow.opacity) {
        (Some(color), Some(opacity)) => rgba(color, opacity).unwrap_or_else(|| color.clone()),
        (Some(color), None) => color.clone(),
        (None, _) => DEFAULT_SHADOW_COLOR.to_string(),
    };
    format!(
        "{}px {}px {}px {}",
        format_number(shadow.offset_x),
        format_number(shadow.offset_y),
        format_number(shadow.blur),
        color
    )
}

/// `#RRGGBB` plus an alpha to `rgba(r,g,b,a)`.
fn rgba(hex: &str, alpha: f64) -> Option<String> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(format!(
        "rgba({},{},{},{})",
        channel(0)?,
        channel(2)?,
        channel(4)?,
        format_number(alpha)
    ))
}

fn render_text(style: &mut Style, text: &TextElement) -> String {
    style.set("text-align", text.align.as_css()).set("overflow", "hidden");
    if let Some(fill) = &text.fill {
        apply_fill(style, fill);
    }
    if let Some(stroke) = &text.stroke {
        apply_stroke(style, stroke);
    }
    if let Some(shadow) = &text.shadow {
        // Without a box fill the shadow belongs to the glyphs.
        let property = if text.fill.is_some() { "box-shadow" } else { "text-shadow" };
        style.set(property, shadow_css(shadow));
    }

    let mut html = format!("<div style=\"{}\">", escape_attr(&style.to_css()));
    if text.bullets.is_empty() {
        for run in &text.runs {
            html.push_str(&render_run(run));
        }
    } else {
        for paragraph in &text.bullets {
            html.push_str(&render_paragraph(paragraph));
        }
    }
    html.push_str("</div>");
    html
}

fn render_paragraph(paragraph: &ParagraphBlock) -> String {
    let mut indent = paragraph.level * LEVEL_INDENT_PX;
    if paragraph.marker != Marker::None {
        indent += MARKER_INDENT_PX;
    }
    let mut html = format!("<div style=\"padding-left:{}px;\">", indent);
    if paragraph.marker == Marker::Bullet {
        html.push_str("<span style=\"padding-right:8px;\">•</span>");
    }
    if paragraph.runs.is_empty() {
        html.push_str(&escape_text(&paragraph.text));
    } else {
        for run in &paragraph.runs {
            html.push_str(&render_run(run));
        }
    }
    html.push_str("</div>");
    html
}

fn render_run(run: &Run) -> String {
    let mut style = Style::new();
    style
        .set_opt("font-family", run.font.family.as_deref().map(css_string))
        .set_opt("font-size", run.font.size.map(|s| format!("{}pt", format_number(s))))
        .set("font-weight", run.font.weight.to_string())
        .set("font-style", run.font.style.as_css())
        .set_opt("color", run.color.clone().or_else(|| run.font.color.clone()));
    if run.strike {
        style.set("text-decoration", "line-through");
    } else if run.underline || run.font.underline {
        style.set("text-decoration", "underline");
    }
    style.set_opt("background-color", run.highlight.clone());

    format!(
        "<span style=\"{}\">{}</span>",
        escape_attr(&style.to_css()),
        escape_text(&run.text)
    )
}

/// Escape text and turn line breaks into `<br/>`.
fn escape_text(text: &str) -> String {
    escape_html(text).replace('\n', "<br/>")
}

fn render_shape(style: &mut Style, shape: &ShapeElement) -> String {
    if shape.shape_kind == "ellipse" {
        style.set("border-radius", "50%");
    } else if let Some(radius) = shape.radius {
        style.px("border-radius", radius);
    }
    if let Some(fill) = &shape.fill {
        apply_fill(style, fill);
    }
    if let Some(stroke) = &shape.stroke {
        apply_stroke(style, stroke);
    }
    if let Some(shadow) = &shape.shadow {
        style.set("box-shadow", shadow_css(shadow));
    }
    format!("<div style=\"{}\"></div>", escape_attr(&style.to_css()))
}

fn render_image(style: &mut Style, image: &ImageElement) -> String {
    style.set("object-fit", image.object_fit.clone());
    if let Some(crop) = &image.crop {
        style.set(
            "clip-path",
            format!(
                "inset({}px {}px {}px {}px)",
                format_number(crop.top),
                format_number(crop.right),
                format_number(crop.bottom),
                format_number(crop.left)
            ),
        );
    }
    if let Some(shadow) = &image.shadow {
        style.set("box-shadow", shadow_css(shadow));
    }
    if let Some(border) = &image.border {
        apply_stroke(style, border);
    }
    if let Some(background) = &image.background {
        apply_fill(style, background);
    }
    format!(
        "<img src=\"{}\" style=\"{}\" />",
        escape_attr(&image.src),
        escape_attr(&style.to_css())
    )
}

fn render_table(style: &mut Style, table: &TableElement) -> String {
    style.set("border-collapse", "collapse");
    let mut html = format!("<table style=\"{}\">", escape_attr(&style.to_css()));
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in &row.cells {
            html.push_str("<td>");
            if cell.runs.is_empty() {
                html.push_str(&escape_text(&cell.text));
            } else {
                for run in &cell.runs {
                    html.push_str(&render_run(run));
                }
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn render_line(element: &Element, line: &LineElement) -> String {
    let [start, end] = match line.points.as_slice() {
        [start, end, ..] => [*start, *end],
        _ => return String::new(),
    };
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = dx.hypot(dy);
    let angle = dy.atan2(dx).to_degrees();

    let stroke = line.stroke.clone().unwrap_or_default();
    let border_style = match stroke.dash.as_deref() {
        Some("dash") | Some("dot") => "dashed",
        _ => "solid",
    };

    let mut style = Style::new();
    style
        .set("position", "absolute")
        .px("left", start.x)
        .px("top", start.y)
        .px("width", length)
        .set("height", "0px")
        .set("z-index", element.z.to_string());
    if angle != 0.0 {
        style.set("transform", format!("rotate({}deg)", format_number(angle)));
    }
    style
        .set("transform-origin", "0 0")
        .set(
            "border-top",
            format!(
                "{}px {} {}",
                format_number(stroke.width.unwrap_or(1.0)),
                border_style,
                stroke.color.as_deref().unwrap_or("#000000")
            ),
        )
        .set_opt("opacity", element.opacity.map(format_number));

    format!("<div style=\"{}\"></div>", escape_attr(&style.to_css()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slide_core::types::WEIGHT_BOLD;
    use slide_core::{BBox, Cell, Crop, FontSpec, FontStyle, GradientStop, Point, Row};

    fn shape(id: &str, z: u32, color: &str) -> Element {
        Element::new(
            id,
            BBox::new(10, 20, 100, 50),
            z,
            ElementKind::Shape(ShapeElement {
                shape_kind: "rect".to_string(),
                fill: Some(Fill::solid(color)),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_render_container_and_background() {
        let mut slide = SlideLayout::new("s", 1, 960, 540);
        slide.background = Some(Fill::solid("#FFFFFF"));
        assert_eq!(
            render(&slide),
            "<div style=\"position:relative; width:960px; height:540px; overflow:hidden; background:#FFFFFF;\"></div>"
        );
    }

    #[test]
    fn test_render_orders_by_z_and_is_deterministic() {
        let mut slide = SlideLayout::new("s", 1, 960, 540);
        slide.push_element(shape("top", 5, "#000001"));
        slide.push_element(shape("bottom", 1, "#000002"));
        slide.push_element(shape("tie", 5, "#000003"));

        let html = render(&slide);
        let bottom = html.find("#000002").unwrap();
        let top = html.find("#000001").unwrap();
        let tie = html.find("#000003").unwrap();
        assert!(bottom < top && top < tie);
        assert_eq!(html, render(&slide));
    }

    #[test]
    fn test_render_shape_styles() {
        let mut element = shape("e", 2, "#FF0000");
        element.rotation = 45.0;
        element.flip_h = true;
        element.opacity = Some(0.5);
        if let ElementKind::Shape(shape) = &mut element.kind {
            shape.shape_kind = "ellipse".to_string();
            shape.stroke = Some(Stroke {
                width: Some(2.0),
                color: Some("#000000".to_string()),
                dash: Some("dot".to_string()),
            });
            shape.shadow = Some(Shadow {
                color: Some("#000000".to_string()),
                blur: 4.0,
                offset_x: 2.0,
                offset_y: 3.0,
                opacity: Some(0.4),
            });
        }
        assert_eq!(
            render_element(&element),
            "<div style=\"position:absolute; left:10px; top:20px; width:100px; height:50px; z-index:2; \
transform:rotate(45deg) scaleX(-1); opacity:0.5; border-radius:50%; background:#FF0000; \
border:2px dashed #000000; box-shadow:2px 3px 4px rgba(0,0,0,0.4);\"></div>"
        );
    }

    #[test]
    fn test_render_gradient_fill() {
        let mut style = Style::new();
        apply_fill(
            &mut style,
            &Fill::Gradient {
                stops: vec![
                    GradientStop { offset: 0.0, color: "#FF0000".to_string() },
                    GradientStop { offset: 0.5, color: "#0000FF".to_string() },
                ],
                angle: 90.0,
            },
        );
        assert_eq!(style.to_css(), "background:linear-gradient(90deg, #FF0000 0%, #0000FF 50%);");
    }

    fn filled(fill: Fill) -> Element {
        let mut element = shape("f", 0, "#000000");
        if let ElementKind::Shape(shape) = &mut element.kind {
            shape.fill = Some(fill);
        }
        element
    }

    const BOX: &str = "position:absolute; left:10px; top:20px; width:100px; height:50px; z-index:0;";

    #[test]
    fn test_render_image_fill() {
        let image = Fill::Image {
            src: "/assets/bg.png".to_string(),
            fit: "contain".to_string(),
            opacity: Some(0.5),
        };
        assert_eq!(
            render_element(&filled(image.clone())),
            format!(
                "<div style=\"{} background-image:url('/assets/bg.png'); background-size:contain; \
background-repeat:no-repeat; background-position:center; opacity:0.5;\"></div>",
                BOX
            )
        );

        let mut element = filled(image);
        element.opacity = Some(0.5);
        assert_eq!(
            render_element(&element),
            format!(
                "<div style=\"{} opacity:0.25; background-image:url('/assets/bg.png'); background-size:contain; \
background-repeat:no-repeat; background-position:center;\"></div>",
                BOX
            )
        );
    }

    #[test]
    fn test_render_gradient_shape() {
        let html = render_element(&filled(Fill::Gradient {
            stops: vec![
                GradientStop { offset: 0.0, color: "#FF0000".to_string() },
                GradientStop { offset: 1.0, color: "#0000FF".to_string() },
            ],
            angle: 45.0,
        }));
        assert_eq!(
            html,
            format!(
                "<div style=\"{} background:linear-gradient(45deg, #FF0000 0%, #0000FF 100%);\"></div>",
                BOX
            )
        );
    }

    #[test]
    fn test_render_unresolved_theme_has_no_background() {
        let html = render_element(&filled(Fill::UnresolvedTheme {
            name: "accent6".to_string(),
        }));
        assert_eq!(html, format!("<div style=\"{}\"></div>", BOX));
        assert!(!html.contains("background"));
    }

    #[test]
    fn test_render_translucent_solid() {
        let html = render_element(&filled(Fill::Solid {
            color: "#FF0000".to_string(),
            opacity: Some(0.4),
        }));
        assert!(html.contains("background:rgba(255,0,0,0.4);"));
    }

    #[test]
    fn test_quotes_in_css_strings_are_escaped() {
        let mut font = FontSpec::default();
        font.family = Some("O'Neil".to_string());
        let html = render_run(&Run::new("x", font));
        assert!(html.contains(r"font-family:'O\'Neil';"));

        let html = render_element(&filled(Fill::Image {
            src: r"/assets/it's\a.png".to_string(),
            fit: "cover".to_string(),
            opacity: None,
        }));
        assert!(html.contains(r"background-image:url('/assets/it\'s\\a.png');"));
    }

    #[test]
    fn test_render_text_paragraphs_and_runs() {
        let mut font = FontSpec::default();
        font.family = Some("Inter".to_string());
        font.size = Some(24.0);
        font.weight = WEIGHT_BOLD;
        font.style = FontStyle::Italic;
        font.color = Some("#333333".to_string());
        let mut run = Run::new("A & B", font);
        run.underline = true;
        run.strike = true;

        let element = Element::new(
            "t",
            BBox::new(0, 0, 200, 100),
            0,
            ElementKind::Text(TextElement {
                runs: vec![run.clone()],
                bullets: vec![
                    ParagraphBlock {
                        level: 1,
                        marker: Marker::Bullet,
                        text: "A & B".to_string(),
                        runs: vec![run],
                    },
                    ParagraphBlock {
                        level: 0,
                        marker: Marker::Number,
                        text: "plain".to_string(),
                        runs: Vec::new(),
                    },
                ],
                ..Default::default()
            }),
        );

        let html = render_element(&element);
        assert!(html.contains("text-align:left; overflow:hidden;"));
        assert!(html.contains(
            "<div style=\"padding-left:30px;\"><span style=\"padding-right:8px;\">•</span>\
<span style=\"font-family:'Inter'; font-size:24pt; font-weight:700; font-style:italic; \
color:#333333; text-decoration:line-through;\">A &amp; B</span></div>"
        ));
        assert!(html.contains("<div style=\"padding-left:12px;\">plain</div>"));
    }

    #[test]
    fn test_render_text_shadow_without_fill() {
        let element = Element::new(
            "t",
            BBox::new(0, 0, 10, 10),
            0,
            ElementKind::Text(TextElement {
                shadow: Some(Shadow::default()),
                ..Default::default()
            }),
        );
        assert!(render_element(&element).contains("text-shadow:0px 0px 0px rgba(0,0,0,0.25);"));
    }

    #[test]
    fn test_render_image_with_crop() {
        let mut image = ImageElement::new("/assets/a\"b.png");
        image.crop = Some(Crop { left: 1.0, top: 2.0, right: 3.0, bottom: 4.5 });
        let element = Element::new("i", BBox::new(0, 0, 10, 10), 0, ElementKind::Image(image));
        let html = render_element(&element);
        assert!(html.starts_with("<img src=\"/assets/a&quot;b.png\""));
        assert!(html.contains("object-fit:cover; clip-path:inset(2px 3px 4.5px 1px);"));
        assert!(html.ends_with(" />"));
    }

    #[test]
    fn test_render_table() {
        let table = TableElement {
            rows: vec![Row {
                cells: vec![
                    Cell { text: "a<b".to_string(), runs: Vec::new() },
                    Cell { text: String::new(), runs: Vec::new() },
                ],
            }],
        };
        let element = Element::new("t", BBox::new(0, 0, 10, 10), 0, ElementKind::Table(table));
        let html = render_element(&element);
        assert!(html.contains("border-collapse:collapse;"));
        assert!(html.ends_with("<tr><td>a&lt;b</td><td></td></tr></table>"));
    }

    #[test]
    fn test_render_line() {
        let element = Element::new(
            "l",
            BBox::new(0, 0, 0, 0),
            3,
            ElementKind::Line(LineElement {
                points: vec![Point { x: 10.0, y: 10.0 }, Point { x: 10.0, y: 110.0 }],
                stroke: Some(Stroke {
                    width: Some(2.0),
                    color: Some("#112233".to_string()),
                    dash: None,
                }),
            }),
        );
        assert_eq!(
            render_element(&element),
            "<div style=\"position:absolute; left:10px; top:10px; width:100px; height:0px; z-index:3; \
transform:rotate(90deg); transform-origin:0 0; border-top:2px solid #112233;\"></div>"
        );
    }

    #[test]
    fn test_degenerate_elements_render_empty() {
        let line = Element::new(
            "l",
            BBox::new(0, 0, 0, 0),
            0,
            ElementKind::Line(LineElement {
                points: vec![Point::default()],
                stroke: None,
            }),
        );
        assert_eq!(render_element(&line), "");

        let mut boxless = shape("s", 0, "#000000");
        boxless.bbox = None;
        assert_eq!(render_element(&boxless), "");
    }
}
