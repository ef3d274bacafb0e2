//! Paragraphs and runs of a `p:txBody` / `a:txBody`.

use crate::fill::{color_child, fill_paint};
use crate::xml::XmlElement;
use slide_core::types::{WEIGHT_BOLD, WEIGHT_NORMAL};
use slide_core::units::hundredths_to_pt;
use slide_core::{Align, FillResolver, FontSpec, FontStyle, Marker, ParagraphBlock, Run};

/// Decoded content of a text body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBody {
    pub align: Align,
    pub runs: Vec<Run>,
    pub paragraphs: Vec<ParagraphBlock>,
}

impl TextBody {
    /// Whether any paragraph carries visible text.
    pub fn has_text(&self) -> bool {
        self.paragraphs.iter().any(|p| !p.text.trim().is_empty())
    }

    /// Paragraph texts joined by newlines.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read every non-empty paragraph of a text body.
pub fn read_text_body(body: &XmlElement, resolver: &FillResolver<'_>) -> TextBody {
    let mut text_body = TextBody::default();

    let mut first = true;
    for paragraph in body.children_named("p") {
        let p_pr = paragraph.child("pPr");
        if first {
            text_body.align = p_pr.and_then(|p| p.attr("algn")).map(align_from).unwrap_or_default();
            first = false;
        }

        let Some(block) = read_paragraph(paragraph, resolver) else {
            continue;
        };
        text_body.runs.extend(block.runs.iter().cloned());
        text_body.paragraphs.push(block);
    }

    text_body
}

fn read_paragraph(paragraph: &XmlElement, resolver: &FillResolver<'_>) -> Option<ParagraphBlock> {
    let p_pr = paragraph.child("pPr");
    let mut text = String::new();
    let mut runs = Vec::new();

    for child in paragraph.elements() {
        match child.name.as_str() {
            "r" => {
                let run_text = child.child("t").map(XmlElement::text).unwrap_or_default();
                if run_text.is_empty() {
                    continue;
                }
                text.push_str(&run_text);
                runs.push(read_run(run_text, child.child("rPr"), resolver));
            }
            "fld" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            "br" => text.push('\n'),
            _ => {}
        }
    }

    if text.is_empty() {
        return None;
    }

    if runs.is_empty() {
        let properties = p_pr
            .and_then(|p| p.child("defRPr"))
            .or_else(|| paragraph.child("endParaRPr"));
        runs.push(read_run(text.clone(), properties, resolver));
    }

    let (level, marker) = classify_marker(p_pr);
    Some(ParagraphBlock {
        level,
        marker,
        text,
        runs,
    })
}

/// Paragraph level and list marker.
///
/// `a:buNone` always wins, then `a:buAutoNum`, then `a:buChar`; without any
/// of these a nested paragraph is a bullet and a top-level one has none.
pub fn classify_marker(p_pr: Option<&XmlElement>) -> (u32, Marker) {
    let level = p_pr
        .and_then(|p| p.attr_i64("lvl"))
        .map(|lvl| lvl.clamp(0, 8) as u32)
        .unwrap_or(0);

    let marker = match p_pr {
        Some(p) if p.child("buNone").is_some() => Marker::None,
        Some(p) if p.child("buAutoNum").is_some() => Marker::Number,
        Some(p) if p.child("buChar").is_some() => Marker::Bullet,
        _ if level > 0 => Marker::Bullet,
        _ => Marker::None,
    };
    (level, marker)
}

fn align_from(value: &str) -> Align {
    match value {
        "ctr" => Align::Center,
        "r" => Align::Right,
        "just" | "dist" => Align::Justify,
        _ => Align::Left,
    }
}

/// Build a run from its text and `a:rPr`.
pub fn read_run(text: String, r_pr: Option<&XmlElement>, resolver: &FillResolver<'_>) -> Run {
    let Some(r_pr) = r_pr else {
        return Run::new(text, FontSpec::default());
    };

    let family = ["latin", "ea", "cs"]
        .iter()
        .filter_map(|name| r_pr.child(name))
        .filter_map(|face| face.attr("typeface"))
        .find_map(|face| resolver.palette().resolve_typeface(face));

    let color = match fill_paint(r_pr) {
        Some(paint) => resolver.resolve_stroke_color(&paint),
        None => None,
    };

    let underline = r_pr.attr("u").is_some_and(|u| u != "none");
    let font = FontSpec {
        family,
        size: r_pr.attr_i64("sz").filter(|sz| *sz > 0).map(hundredths_to_pt),
        weight: if r_pr.attr_bool("b") == Some(true) {
            WEIGHT_BOLD
        } else {
            WEIGHT_NORMAL
        },
        style: if r_pr.attr_bool("i") == Some(true) {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        },
        underline,
        color,
    };

    let mut run = Run::new(text, font);
    run.strike = r_pr.attr("strike").is_some_and(|s| s != "noStrike");
    run.highlight = r_pr
        .child("highlight")
        .and_then(color_child)
        .and_then(|spec| resolver.resolve_color(&spec));
    run
}
