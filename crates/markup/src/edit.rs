//! Selector-addressed text edits over rendered markup.
//!
//! Edits splice the source string at scanner spans, so everything outside
//! the edited content is preserved byte for byte.

use crate::scanner::{attr, decode_entities, is_raw_text, is_void, scan, Attr, Token};
use crate::selector::{Selector, NTH_CHILD_CANDIDATES};
use serde::{Deserialize, Serialize};
use slide_core::{EditableElement, Result};
use std::ops::Range;

/// What to do with the content of the selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Replace,
    Append,
    Prepend,
    Delete,
}

impl EditAction {
    fn apply(&self, content: &str, value: &str) -> String {
        match self {
            Self::Replace => value.to_string(),
            Self::Append => format!("{}{}", content, value),
            Self::Prepend => format!("{}{}", value, content),
            Self::Delete => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub selector: String,
    pub action: EditAction,
    #[serde(default)]
    pub value: Option<String>,
}

impl TextEdit {
    pub fn new(selector: impl Into<String>, action: EditAction) -> Self {
        Self {
            selector: selector.into(),
            action,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// An element with both its start and end tag in the source.
struct ElementPair<'t> {
    name: &'t str,
    attrs: &'t [Attr],
    depth: usize,
    inner: Range<usize>,
}

/// All open/close pairs in start-tag order. Elements closed implicitly by an
/// ancestor's end tag have no pair.
fn element_pairs<'t>(tokens: &'t [Token<'_>]) -> Vec<ElementPair<'t>> {
    struct Open<'t> {
        order: usize,
        name: &'t str,
        attrs: &'t [Attr],
        depth: usize,
        inner_start: usize,
    }

    let mut stack: Vec<Open<'t>> = Vec::new();
    let mut pairs: Vec<(usize, ElementPair<'t>)> = Vec::new();
    let mut order = 0;

    for token in tokens {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
                span,
            } => {
                if *self_closing || is_void(name) {
                    continue;
                }
                let depth = stack.len();
                stack.push(Open {
                    order,
                    name,
                    attrs,
                    depth,
                    inner_start: span.end,
                });
                order += 1;
            }
            Token::EndTag { name, span } => {
                let Some(position) = stack.iter().rposition(|open| open.name == name.as_str()) else {
                    continue;
                };
                stack.truncate(position + 1);
                if let Some(open) = stack.pop() {
                    pairs.push((
                        open.order,
                        ElementPair {
                            name: open.name,
                            attrs: open.attrs,
                            depth: open.depth,
                            inner: open.inner_start..span.start,
                        },
                    ));
                }
            }
            Token::Text { .. } => {}
        }
    }

    pairs.sort_by_key(|(order, _)| *order);
    pairs.into_iter().map(|(_, pair)| pair).collect()
}

fn locate<'p, 't>(pairs: &'p [ElementPair<'t>], selector: &Selector) -> Option<&'p ElementPair<'t>> {
    match selector {
        Selector::NthChild { parent, index } => {
            let parent = locate(pairs, parent)?;
            pairs
                .iter()
                .filter(|pair| {
                    pair.depth == parent.depth + 1
                        && pair.inner.start >= parent.inner.start
                        && pair.inner.end <= parent.inner.end
                        && NTH_CHILD_CANDIDATES.contains(&pair.name)
                })
                .nth(index.checked_sub(1)?)
        }
        Selector::Text(_) => None,
        _ => pairs.iter().find(|pair| selector.matches(pair.name, pair.attrs)),
    }
}

fn locate_text(tokens: &[Token<'_>], needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    tokens.iter().find_map(|token| match token {
        Token::Text { raw, span } => raw
            .find(needle)
            .map(|at| span.start + at..span.start + at + needle.len()),
        _ => None,
    })
}

/// Apply one edit. An edit whose selector matches nothing returns the
/// markup unchanged.
pub fn apply_edit(markup: &str, edit: &TextEdit) -> Result<String> {
    let tokens = scan(markup)?;
    let selector = Selector::parse(&edit.selector);
    let target = match &selector {
        Selector::Text(needle) => locate_text(&tokens, needle),
        _ => locate(&element_pairs(&tokens), &selector).map(|pair| pair.inner.clone()),
    };

    let Some(range) = target else {
        log::debug!("No element matches selector {:?}; edit skipped", edit.selector);
        return Ok(markup.to_string());
    };

    let content = &markup[range.clone()];
    let edited = edit.action.apply(content, edit.value.as_deref().unwrap_or(""));
    Ok(format!("{}{}{}", &markup[..range.start], edited, &markup[range.end..]))
}

/// Apply edits in order, each to the output of the previous one.
pub fn apply_edits(markup: &str, edits: &[TextEdit]) -> Result<String> {
    let mut current = markup.to_string();
    for edit in edits {
        current = apply_edit(&current, edit)?;
    }
    Ok(current)
}

fn path_segment(name: &str, attrs: &[Attr]) -> String {
    if let Some(id) = attr(attrs, "id").filter(|id| !id.is_empty()) {
        return format!("#{}", id);
    }
    if let Some(class) = attr(attrs, "class").and_then(|c| c.split_whitespace().next()) {
        return format!(".{}", class);
    }
    name.to_string()
}

fn is_editable_text(text: &str) -> bool {
    if text.chars().count() <= 3 {
        return false;
    }
    let stripped: Vec<char> = text
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '.'))
        .collect();
    stripped.is_empty() || !stripped.iter().all(|c| c.is_numeric())
}

/// Text nodes worth exposing for editing, in document order, each with the
/// ancestor path that leads to it.
///
/// The paths (`#slide > .title`) are for display only. [`Selector::parse`]
/// reads such a path as a single id or class, so passing it back to
/// [`apply_edits`] matches nothing.
pub fn extract_editable_elements(markup: &str) -> Result<Vec<EditableElement>> {
    let mut path: Vec<(String, String)> = Vec::new();
    let mut elements = Vec::new();

    for token in scan(markup)? {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
                ..
            } => {
                if self_closing || is_void(&name) {
                    continue;
                }
                let segment = path_segment(&name, &attrs);
                path.push((name, segment));
            }
            Token::EndTag { name, .. } => {
                if let Some(position) = path.iter().rposition(|(open, _)| *open == name) {
                    path.truncate(position);
                }
            }
            Token::Text { raw, .. } => {
                if path.last().is_some_and(|(name, _)| is_raw_text(name)) {
                    continue;
                }
                let decoded = decode_entities(raw);
                let text = decoded.trim();
                if !is_editable_text(text) {
                    continue;
                }
                let selector = if path.is_empty() {
                    "body".to_string()
                } else {
                    path.iter()
                        .map(|(_, segment)| segment.as_str())
                        .collect::<Vec<_>>()
                        .join(" > ")
                };
                elements.push(EditableElement {
                    selector,
                    text: text.to_string(),
                    length: text.chars().count(),
                });
            }
        }
    }

    Ok(elements)
}

/// Selector of the first editable element whose text contains `needle`.
pub fn find_text_by_content(markup: &str, needle: &str) -> Result<Option<String>> {
    Ok(extract_editable_elements(markup)?
        .into_iter()
        .find(|element| element.text.contains(needle))
        .map(|element| element.selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"<div class="a">Hello</div>"#;

    #[test]
    fn test_replace_and_delete() {
        let edited = apply_edits(BASE, &[TextEdit::new(".a", EditAction::Replace).with_value("Hi")]).unwrap();
        assert_eq!(edited, r#"<div class="a">Hi</div>"#);

        let deleted = apply_edits(BASE, &[TextEdit::new(".a", EditAction::Delete)]).unwrap();
        assert_eq!(deleted, r#"<div class="a"></div>"#);
    }

    #[test]
    fn test_missing_selector_is_noop() {
        let edits = [TextEdit::new(".missing", EditAction::Replace).with_value("x")];
        assert_eq!(apply_edits(BASE, &edits).unwrap(), BASE);
    }

    #[test]
    fn test_edits_apply_in_sequence() {
        let edits = [
            TextEdit::new(".a", EditAction::Append).with_value(" world"),
            TextEdit::new(".a", EditAction::Prepend).with_value("Oh, "),
            TextEdit::new("Oh, Hello", EditAction::Replace).with_value("Well, hi"),
        ];
        assert_eq!(
            apply_edits(BASE, &edits).unwrap(),
            r#"<div class="a">Well, hi world</div>"#
        );
    }

    #[test]
    fn test_id_tag_and_nth_child() {
        let markup = r#"<section id="main"><h1>Title</h1><ul class="list"><li>One</li><li>Two</li></ul></section>"#;
        let edits = [
            TextEdit::new("h1", EditAction::Replace).with_value("New"),
            TextEdit::new(".list:nth-child(2)", EditAction::Replace).with_value("Deux"),
            TextEdit::new("#main:nth-child(5)", EditAction::Replace).with_value("none"),
        ];
        assert_eq!(
            apply_edits(markup, &edits).unwrap(),
            r#"<section id="main"><h1>New</h1><ul class="list"><li>One</li><li>Deux</li></ul></section>"#
        );
    }

    #[test]
    fn test_nested_same_class_scopes_to_balanced_close() {
        let markup = r#"<div class="a"><div class="a">inner</div>tail</div><p>keep</p>"#;
        let edits = [TextEdit::new(".a", EditAction::Replace).with_value("X")];
        assert_eq!(
            apply_edits(markup, &edits).unwrap(),
            r#"<div class="a">X</div><p>keep</p>"#
        );
    }

    #[test]
    fn test_class_token_match_and_void_skipped() {
        let markup = r#"<img class="a"><span class="ab">no</span><span class="x a">yes</span>"#;
        let edits = [TextEdit::new(".a", EditAction::Replace).with_value("ok")];
        assert_eq!(
            apply_edits(markup, &edits).unwrap(),
            r#"<img class="a"><span class="ab">no</span><span class="x a">ok</span>"#
        );
    }

    #[test]
    fn test_unparseable_markup_is_error() {
        let edits = [TextEdit::new(".a", EditAction::Delete)];
        assert!(apply_edits("<div class=\"a", &edits).is_err());
    }

    #[test]
    fn test_edit_deserializes_lowercase_action() {
        let edits: Vec<TextEdit> =
            serde_json::from_str(r#"[{"selector":".a","action":"append","value":"!"},{"selector":"p","action":"delete"}]"#)
                .unwrap();
        assert_eq!(edits[0], TextEdit::new(".a", EditAction::Append).with_value("!"));
        assert_eq!(edits[1].value, None);
    }

    #[test]
    fn test_extract_editable_elements() {
        let markup = r#"<div id="slide"><div class="title big">Quarterly &amp; Annual</div>
<p>abc</p><span>1,234.5</span><img src="x.png"><span>Real text</span><style>.a { color: red }</style></div>
<p>Loose words</p>"#;
        let elements = extract_editable_elements(markup).unwrap();
        let found: Vec<(&str, &str)> = elements
            .iter()
            .map(|e| (e.selector.as_str(), e.text.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("#slide > .title", "Quarterly & Annual"),
                ("#slide > span", "Real text"),
                ("p", "Loose words"),
            ]
        );
        assert_eq!(elements[0].length, 18);
        assert!(elements.iter().all(|e| e.length > 3));
    }

    #[test]
    fn test_extracted_path_is_not_an_edit_selector() {
        let markup = r#"<div id="slide"><div class="title">Quarterly results</div></div>"#;
        let elements = extract_editable_elements(markup).unwrap();
        assert_eq!(elements[0].selector, "#slide > .title");
        assert_eq!(
            Selector::parse(&elements[0].selector),
            Selector::Id("slide > .title".to_string())
        );
        let edit = TextEdit::new(elements[0].selector.clone(), EditAction::Replace).with_value("New");
        assert_eq!(apply_edit(markup, &edit).unwrap(), markup);
    }

    #[test]
    fn test_top_level_text_uses_body() {
        let elements = extract_editable_elements("Some loose text").unwrap();
        assert_eq!(elements[0].selector, "body");
    }

    #[test]
    fn test_find_text_by_content() {
        let markup = r#"<div class="card"><p>First paragraph</p><p id="second">Second one</p></div>"#;
        assert_eq!(
            find_text_by_content(markup, "Second").unwrap().as_deref(),
            Some(".card > #second")
        );
        assert_eq!(find_text_by_content(markup, "absent").unwrap(), None);
    }
}
