//! Rendered markup to a React function component.
//!
//! Editable text nodes and user-supplied image sources become optional
//! string props; everything else is carried over as JSX.

use crate::scanner::{decode_entities, is_raw_text, is_void, scan, Attr, Token};
use regex::Regex;
use slide_core::Result;
use std::collections::HashSet;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static CSS_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-([a-z])").unwrap());

/// Minimum trimmed length of a text node that becomes a prop.
const MIN_EDITABLE_CHARS: usize = 4;

/// Words of the text used to build a prop name.
const PROP_NAME_WORDS: usize = 3;

const DEFAULT_COMPONENT_NAME: &str = "SlideLayout";

/// Options for [`Transpiler`].
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Substrings that mark an `img` source as user content.
    pub user_content_markers: Vec<String>,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            user_content_markers: vec!["/app_data/images/".to_string(), "/uploads/".to_string()],
        }
    }
}

impl TranspileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_content_markers(mut self, markers: Vec<String>) -> Self {
        self.user_content_markers = markers;
        self
    }

    pub fn with_user_content_marker(mut self, marker: impl Into<String>) -> Self {
        self.user_content_markers.push(marker.into());
        self
    }
}

/// Transpile with default options.
pub fn transpile(markup: &str, font_urls: &[String], component_name: &str) -> Result<String> {
    Transpiler::new().transpile(markup, font_urls, component_name)
}

#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    options: TranspileOptions,
}

impl Transpiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TranspileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TranspileOptions {
        &self.options
    }

    /// Produce the component source for `markup`. Fails only when the
    /// markup cannot be scanned.
    pub fn transpile(&self, markup: &str, font_urls: &[String], component_name: &str) -> Result<String> {
        let name = component_identifier(component_name);
        let roots = build_tree(markup)?;

        let mut emitter = Emitter::new(&self.options);
        if roots.len() > 1 {
            emitter.lines.push(indent(2, "<>"));
            for node in &roots {
                emitter.emit(node, 3)?;
            }
            emitter.lines.push(indent(2, "</>"));
        } else if let Some(root) = roots.first() {
            emitter.emit(root, 2)?;
        } else {
            emitter.lines.push(indent(2, "null"));
        }

        log::debug!("Transpiled {} with {} props", name, emitter.props.len());
        let interface = emitter.interface(&name)?;
        let component = emitter.component(&name, font_urls)?;
        Ok(format!("{}\n\n{}", interface, component))
    }
}

/// A scanned element tree. Text is entity-decoded except inside raw-text
/// elements.
#[derive(Debug)]
enum Node {
    Element {
        name: String,
        attrs: Vec<Attr>,
        children: Vec<Node>,
    },
    Text {
        text: String,
        raw: bool,
    },
}

struct OpenElement {
    name: String,
    attrs: Vec<Attr>,
    children: Vec<Node>,
}

fn attach(stack: &mut [OpenElement], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn close_top(stack: &mut Vec<OpenElement>, roots: &mut Vec<Node>) {
    if let Some(open) = stack.pop() {
        let node = Node::Element {
            name: open.name,
            attrs: open.attrs,
            children: open.children,
        };
        attach(stack, roots, node);
    }
}

/// Build the element tree, closing elements left open by a mismatched or
/// missing end tag and ignoring end tags that close nothing.
fn build_tree(markup: &str) -> Result<Vec<Node>> {
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut roots = Vec::new();

    for token in scan(markup)? {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
                ..
            } => {
                if self_closing || is_void(&name) {
                    let node = Node::Element {
                        name,
                        attrs,
                        children: Vec::new(),
                    };
                    attach(&mut stack, &mut roots, node);
                } else {
                    stack.push(OpenElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
            }
            Token::EndTag { name, span } => {
                match stack.iter().rposition(|open| open.name == name) {
                    Some(position) => {
                        while stack.len() > position {
                            close_top(&mut stack, &mut roots);
                        }
                    }
                    None => log::debug!("Ignoring unmatched </{}> at byte {}", name, span.start),
                }
            }
            Token::Text { raw, .. } => {
                let in_raw_text = stack.last().is_some_and(|open| is_raw_text(&open.name));
                let text = if in_raw_text {
                    raw.to_string()
                } else {
                    decode_entities(raw)
                };
                if text.trim().is_empty() {
                    continue;
                }
                attach(
                    &mut stack,
                    &mut roots,
                    Node::Text {
                        text,
                        raw: in_raw_text,
                    },
                );
            }
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }
    Ok(roots)
}

enum PropKind {
    Text { default: String },
    Image,
}

struct Prop {
    name: String,
    kind: PropKind,
}

struct Emitter<'o> {
    options: &'o TranspileOptions,
    props: Vec<Prop>,
    taken: HashSet<String>,
    text_fallbacks: usize,
    images: usize,
    lines: Vec<String>,
}

impl<'o> Emitter<'o> {
    fn new(options: &'o TranspileOptions) -> Self {
        Self {
            options,
            props: Vec::new(),
            taken: HashSet::new(),
            text_fallbacks: 0,
            images: 0,
            lines: Vec::new(),
        }
    }

    fn emit(&mut self, node: &Node, depth: usize) -> Result<()> {
        match node {
            Node::Text { text, raw: true } => {
                let line = format!("{{{}}}", js_string(text)?);
                self.lines.push(indent(depth, &line));
            }
            Node::Text { text, raw: false } => {
                let text = text.trim();
                let line = if is_editable(text) {
                    format!("{{{}}}", self.text_prop(text))
                } else if text.contains(['{', '}', '<', '>']) {
                    format!("{{{}}}", js_string(text)?)
                } else {
                    text.to_string()
                };
                self.lines.push(indent(depth, &line));
            }
            Node::Element {
                name,
                attrs,
                children,
            } => {
                let attrs = self.convert_attrs(name, attrs)?;
                let open = if attrs.is_empty() {
                    format!("<{}", name)
                } else {
                    format!("<{} {}", name, attrs)
                };
                if children.is_empty() {
                    self.lines.push(indent(depth, &format!("{} />", open)));
                } else {
                    self.lines.push(indent(depth, &format!("{}>", open)));
                    for child in children {
                        self.emit(child, depth + 1)?;
                    }
                    self.lines.push(indent(depth, &format!("</{}>", name)));
                }
            }
        }
        Ok(())
    }

    fn convert_attrs(&mut self, element: &str, attrs: &[Attr]) -> Result<String> {
        let mut parts = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let name = attr.name.as_str();
            let value = attr.value.as_deref();
            let part = match name {
                "style" => format!("style={{{}}}", style_object(value.unwrap_or(""))?),
                "class" => format!("className={}", jsx_value(value.unwrap_or(""))?),
                _ if name.starts_with("data-") => format!("{}={}", name, jsx_value(value.unwrap_or(""))?),
                _ if value.map_or(true, |v| v.is_empty() || v.eq_ignore_ascii_case(name)) => name.to_string(),
                "src" if element == "img" && value.is_some_and(|v| self.is_user_content(v)) => {
                    format!("src={{{}}}", self.image_prop())
                }
                _ => format!("{}={}", name, jsx_value(value.unwrap_or(""))?),
            };
            parts.push(part);
        }
        Ok(parts.join(" "))
    }

    fn is_user_content(&self, src: &str) -> bool {
        self.options
            .user_content_markers
            .iter()
            .any(|marker| src.contains(marker.as_str()))
    }

    fn claim(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut suffix = 1;
        while self.taken.contains(&name) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        self.taken.insert(name.clone());
        name
    }

    fn text_prop(&mut self, text: &str) -> String {
        let mut base = prop_name_from_text(text);
        if base.is_empty() {
            base = format!("Text{}", self.text_fallbacks);
            self.text_fallbacks += 1;
        }
        let name = self.claim(base);
        self.props.push(Prop {
            name: name.clone(),
            kind: PropKind::Text {
                default: text.to_string(),
            },
        });
        name
    }

    fn image_prop(&mut self) -> String {
        let name = self.claim(format!("image{}", self.images));
        self.images += 1;
        self.props.push(Prop {
            name: name.clone(),
            kind: PropKind::Image,
        });
        name
    }

    fn interface(&self, component: &str) -> Result<String> {
        if self.props.is_empty() {
            return Ok(format!("interface {}Props {{}}", component));
        }
        let mut lines = vec![format!("interface {}Props {{", component)];
        for prop in &self.props {
            lines.push(match &prop.kind {
                PropKind::Text { default } => {
                    format!("  {}?: string; // Default: {}", prop.name, js_string(default)?)
                }
                PropKind::Image => format!("  {}?: string;", prop.name),
            });
        }
        lines.push("}".to_string());
        Ok(lines.join("\n"))
    }

    fn component(&self, component: &str, font_urls: &[String]) -> Result<String> {
        let mut lines = Vec::new();
        if self.props.is_empty() {
            lines.push(format!("const {}: React.FC = () => {{", component));
        } else {
            let mut params = Vec::with_capacity(self.props.len());
            for prop in &self.props {
                params.push(match &prop.kind {
                    PropKind::Text { default } => format!("{} = {}", prop.name, js_string(default)?),
                    PropKind::Image => prop.name.clone(),
                });
            }
            lines.push(format!(
                "const {0}: React.FC<{0}Props> = ({{ {1} }}) => {{",
                component,
                params.join(", ")
            ));
        }

        if !font_urls.is_empty() {
            let mut urls = Vec::with_capacity(font_urls.len());
            for url in font_urls {
                urls.push(js_string(url)?);
            }
            lines.push("  // Load fonts".to_string());
            lines.push("  React.useEffect(() => {".to_string());
            lines.push(format!("    const links = [{}].map((href) => {{", urls.join(", ")));
            lines.push("      const link = document.createElement(\"link\");".to_string());
            lines.push("      link.rel = \"stylesheet\";".to_string());
            lines.push("      link.href = href;".to_string());
            lines.push("      document.head.appendChild(link);".to_string());
            lines.push("      return link;".to_string());
            lines.push("    });".to_string());
            lines.push("    return () => {".to_string());
            lines.push("      links.forEach((link) => document.head.removeChild(link));".to_string());
            lines.push("    };".to_string());
            lines.push("  }, []);".to_string());
            lines.push(String::new());
        }

        lines.push("  return (".to_string());
        lines.extend(self.lines.iter().cloned());
        lines.push("  );".to_string());
        lines.push("};".to_string());
        Ok(lines.join("\n"))
    }
}

fn indent(depth: usize, line: &str) -> String {
    format!("{}{}", "  ".repeat(depth), line)
}

/// A JavaScript string literal.
fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// A JSX attribute value: a plain string when it can be written as one.
fn jsx_value(value: &str) -> Result<String> {
    if value.contains('"') {
        Ok(format!("{{{}}}", js_string(value)?))
    } else {
        Ok(format!("\"{}\"", value))
    }
}

/// Inline CSS to a React style object literal.
/// Split a style attribute on the `;` that are outside parentheses and quotes.
fn split_declarations(css: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in css.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&css[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&css[start..]);
    declarations
}

fn style_object(css: &str) -> Result<String> {
    let mut entries = Vec::new();
    for declaration in split_declarations(css) {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim();
        if property.is_empty() {
            continue;
        }
        let key = if property.starts_with("--") {
            js_string(property)?
        } else {
            CSS_DASH
                .replace_all(&property.to_ascii_lowercase(), |caps: &regex::Captures| {
                    caps[1].to_ascii_uppercase()
                })
                .into_owned()
        };
        entries.push(format!("{}: {}", key, js_string(value.trim())?));
    }
    if entries.is_empty() {
        Ok("{}".to_string())
    } else {
        Ok(format!("{{ {} }}", entries.join(", ")))
    }
}

/// Long enough and not just digits and punctuation.
/// Long enough, and not made only of ASCII digits and punctuation.
fn is_editable(text: &str) -> bool {
    text.chars().count() >= MIN_EDITABLE_CHARS
        && !text
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| c.is_ascii_digit() || c.is_ascii_punctuation())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn prop_name_from_text(text: &str) -> String {
    let cleaned = NON_WORD.replace_all(text, "");
    let name: String = cleaned
        .split_whitespace()
        .take(PROP_NAME_WORDS)
        .map(capitalize)
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Text{}", name)
    } else {
        name
    }
}

fn component_identifier(name: &str) -> String {
    let ident: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    match ident.chars().next() {
        None => DEFAULT_COMPONENT_NAME.to_string(),
        Some(first) if first.is_ascii_digit() => format!("Slide{}", ident),
        Some(_) => ident,
    }
}
