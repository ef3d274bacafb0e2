//! Access to the parts and relationships of a PPTX zip container.

use crate::xml::XmlElement;
use slide_core::{Error, Result};
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// An opened PPTX container.
pub struct Package<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    /// Open a container. Failure here is fatal for the whole document.
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::Decode(format!("Failed to open ZIP container: {}", e)))?;
        Ok(Self { archive })
    }

    /// Whether a part exists.
    pub fn has_part(&self, path: &str) -> bool {
        self.archive.file_names().any(|name| name == path)
    }

    /// All part names in the container.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read a part as UTF-8 text.
    pub fn read_string(&mut self, path: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Read a part as raw bytes.
    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

        Ok(data)
    }

    /// Read and parse an XML part.
    pub fn read_xml(&mut self, path: &str) -> Result<XmlElement> {
        let content = self.read_string(path)?;
        XmlElement::parse(&content)
    }

    /// Relationships of a part. A part without a `.rels` file has none.
    pub fn relationships(&mut self, part: &str) -> Relationships {
        let rels_path = rels_path_for(part);
        if !self.has_part(&rels_path) {
            return Relationships::default();
        }
        match self.read_xml(&rels_path) {
            Ok(root) => Relationships::from_xml(&root, part),
            Err(e) => {
                log::warn!("Ignoring unreadable relationships '{}': {}", rels_path, e);
                Relationships::default()
            }
        }
    }

    /// Read slide size and slide order from `ppt/presentation.xml`.
    pub fn presentation_info(&mut self) -> Result<PresentationInfo> {
        let root = self
            .read_xml(PRESENTATION_PART)
            .map_err(|e| Error::Decode(format!("Cannot read {}: {}", PRESENTATION_PART, e)))?;

        let size = root
            .child("sldSz")
            .ok_or_else(|| Error::Decode("Missing slide size (p:sldSz)".to_string()))?;
        let width_emu = size
            .attr_i64("cx")
            .filter(|v| *v > 0)
            .ok_or_else(|| Error::Decode("Corrupt slide width in p:sldSz".to_string()))?;
        let height_emu = size
            .attr_i64("cy")
            .filter(|v| *v > 0)
            .ok_or_else(|| Error::Decode("Corrupt slide height in p:sldSz".to_string()))?;

        let rels = self.relationships(PRESENTATION_PART);
        let mut slide_parts: Vec<String> = root
            .child("sldIdLst")
            .map(|list| {
                list.children_named("sldId")
                    .filter_map(|id| id.attr("r:id"))
                    .filter_map(|rid| rels.get(rid))
                    .map(|rel| rel.target.clone())
                    .collect()
            })
            .unwrap_or_default();

        if slide_parts.is_empty() {
            slide_parts = fallback_slide_order(&rels);
        }

        Ok(PresentationInfo {
            width_emu,
            height_emu,
            slide_parts,
        })
    }
}

/// Slide size and ordered slide part names.
#[derive(Debug, Clone)]
pub struct PresentationInfo {
    pub width_emu: i64,
    pub height_emu: i64,
    pub slide_parts: Vec<String>,
}

/// One `Relationship` entry with its target resolved to a part name.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: Vec<Relationship>,
}

impl Relationships {
    fn from_xml(root: &XmlElement, source_part: &str) -> Self {
        let entries = root
            .children_named("Relationship")
            .filter_map(|rel| {
                let id = rel.attr("Id")?.to_string();
                let raw_target = rel.attr("Target")?;
                let external = rel.attr("TargetMode") == Some("External");
                let target = if external {
                    raw_target.to_string()
                } else {
                    resolve_target(source_part, raw_target)
                };
                Some(Relationship {
                    id,
                    rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                    target,
                    external,
                })
            })
            .collect();
        Self { entries }
    }

    /// Relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|rel| rel.id == id)
    }

    /// First relationship whose type ends with `/<kind>` (e.g. `slideLayout`).
    pub fn first_of_kind(&self, kind: &str) -> Option<&Relationship> {
        self.entries.iter().find(|rel| rel_kind(&rel.rel_type) == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }
}

fn rel_kind(rel_type: &str) -> &str {
    rel_type.rsplit('/').next().unwrap_or(rel_type)
}

/// Slides ordered by the number in their relationship id or target, used
/// when `p:sldIdLst` is missing.
fn fallback_slide_order(rels: &Relationships) -> Vec<String> {
    let mut slides: Vec<(String, Option<usize>)> = rels
        .iter()
        .filter(|rel| rel_kind(&rel.rel_type) == "slide")
        .map(|rel| {
            let order = extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
            (rel.target.clone(), order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    slides.into_iter().map(|(path, _)| path).collect()
}

/// Extract a trailing number from a string like "rId2" or "slide3.xml".
pub fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_part_name(absolute);
    }
    let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    if base_dir.is_empty() {
        normalize_part_name(target)
    } else {
        normalize_part_name(&format!("{}/{}", base_dir, target))
    }
}

fn normalize_part_name(path: &str) -> String {
    let mut normalized: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            ".." => {
                normalized.pop();
            }
            "." | "" => {}
            other => normalized.push(other),
        }
    }
    normalized.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("ppt/slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide2.xml"),
            "ppt/slides/slide2.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/image9.jpeg"),
            "ppt/media/image9.jpeg"
        );
    }

    #[test]
    fn test_relationships_lookup() {
        let xml = r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;
        let root = XmlElement::parse(xml).unwrap();
        let rels = Relationships::from_xml(&root, "ppt/slides/slide1.xml");
        assert_eq!(
            rels.first_of_kind("slideLayout").map(|r| r.target.as_str()),
            Some("ppt/slideLayouts/slideLayout2.xml")
        );
        assert_eq!(rels.get("rId2").unwrap().target, "ppt/media/image1.png");
        assert!(rels.get("rId3").unwrap().external);
        assert_eq!(rels.get("rId3").unwrap().target, "https://example.com");
        assert!(rels.get("rId9").is_none());
    }

    #[test]
    fn test_fallback_slide_order_sorts_by_number() {
        let xml = r#"<Relationships>
  <Relationship Id="rId3" Type="http://x/relationships/slide" Target="slides/slide10.xml"/>
  <Relationship Id="rId2" Type="http://x/relationships/slide" Target="slides/slide2.xml"/>
  <Relationship Id="rId1" Type="http://x/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
</Relationships>"#;
        let root = XmlElement::parse(xml).unwrap();
        let rels = Relationships::from_xml(&root, "ppt/presentation.xml");
        assert_eq!(
            fallback_slide_order(&rels),
            vec!["ppt/slides/slide2.xml", "ppt/slides/slide10.xml"]
        );
    }
}
