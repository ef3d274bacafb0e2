//! The edit selector grammar.

use crate::scanner::{attr, Attr};
use regex::Regex;
use std::sync::LazyLock;

static NTH_CHILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):nth-child\((\d+)\)").unwrap());

/// Tags counted when resolving `:nth-child`.
pub const NTH_CHILD_CANDIDATES: &[&str] = &["div", "span", "li", "p"];

/// A parsed selector, tried in this order: `<sel>:nth-child(<n>)`, `.class`,
/// `#id`, bare tag name, and finally literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The `index`-th (1-based) candidate child of `parent`.
    NthChild { parent: Box<Selector>, index: usize },
    Class(String),
    Id(String),
    Tag(String),
    /// Plain text to find in the markup.
    Text(String),
}

impl Selector {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();

        if let Some(caps) = NTH_CHILD.captures(selector) {
            if let Ok(index) = caps[2].parse::<usize>() {
                return Self::NthChild {
                    parent: Box::new(Self::parse(&caps[1])),
                    index,
                };
            }
        }
        if let Some(class) = selector.strip_prefix('.') {
            return Self::Class(class.to_string());
        }
        if let Some(id) = selector.strip_prefix('#') {
            return Self::Id(id.to_string());
        }
        if !selector.is_empty() && !selector.contains(['.', '#', ' ']) {
            return Self::Tag(selector.to_ascii_lowercase());
        }
        Self::Text(selector.to_string())
    }

    /// Whether an element matches this selector on its own. Compound and
    /// text selectors never match a single element.
    pub fn matches(&self, name: &str, attrs: &[Attr]) -> bool {
        match self {
            Self::Class(class) => attr(attrs, "class")
                .is_some_and(|value| value.split_whitespace().any(|token| token == class)),
            Self::Id(id) => attr(attrs, "id") == Some(id.as_str()),
            Self::Tag(tag) => name == tag,
            Self::NthChild { .. } | Self::Text(_) => false,
        }
    }
}
