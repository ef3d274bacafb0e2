//! A minimal owned element tree built from quick-xml events.
//!
//! Element names are stored without their namespace prefix (`p:sp` → `sp`);
//! attribute keys keep theirs (`r:embed`), since OOXML reuses local
//! attribute names across namespaces (`id` vs `r:id`).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slide_core::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parse a complete document and return its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(element_from(e)),
                Ok(Event::Empty(ref e)) => attach(&mut stack, &mut root, element_from(e)),
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Bad text content: {}", e)))?;
                        if !text.is_empty() {
                            parent.children.push(XmlNode::Text(text.into_owned()));
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        root.ok_or_else(|| Error::Xml("Document has no root element".to_string()))
    }

    /// Attribute value by its qualified key (`val`, `r:embed`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute parsed as an integer.
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(|v| v.trim().parse().ok())
    }

    /// OOXML boolean attribute (`1`, `true`, `on`).
    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attr(key)
            .map(|v| matches!(v.trim(), "1" | "true" | "on"))
    }

    /// Direct element children.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// All direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Follow a chain of direct children.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names
            .iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// First descendant (depth-first, excluding self) with the given name.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for element in self.elements() {
            if element.name == name {
                return Some(element);
            }
            if let Some(found) = element.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }
}

fn element_from(e: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            (key, value)
        })
        .collect();
    XmlElement {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree_and_navigate() {
        let xml = r#"<?xml version="1.0"?>
<p:sld xmlns:p="p" xmlns:a="a" xmlns:r="r">
  <p:cSld><p:spTree>
    <p:sp><p:spPr><a:xfrm rot="60000"><a:off x="1" y="2"/></a:xfrm></p:spPr></p:sp>
    <p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>
  </p:spTree></p:cSld>
</p:sld>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "sld");
        let tree = root.path(&["cSld", "spTree"]).unwrap();
        assert_eq!(tree.elements().count(), 2);
        let off = tree.find("off").unwrap();
        assert_eq!(off.attr_i64("x"), Some(1));
        assert_eq!(tree.find("xfrm").unwrap().attr_i64("rot"), Some(60000));
        assert_eq!(tree.find("blip").unwrap().attr("r:embed"), Some("rId2"));
    }

    #[test]
    fn test_text_keeps_inner_spaces() {
        let root = XmlElement::parse("<a:r><a:t> Hello &amp; world </a:t></a:r>").unwrap();
        assert_eq!(root.child("t").unwrap().text(), " Hello & world ");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("").is_err());
    }

    #[test]
    fn test_attr_bool() {
        let root = XmlElement::parse(r#"<x a="1" b="0" c="true"/>"#).unwrap();
        assert_eq!(root.attr_bool("a"), Some(true));
        assert_eq!(root.attr_bool("b"), Some(false));
        assert_eq!(root.attr_bool("c"), Some(true));
        assert_eq!(root.attr_bool("d"), None);
    }
}
