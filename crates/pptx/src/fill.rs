//! Reading paint descriptions (fills, outlines, shadows) out of DrawingML.

use crate::xml::XmlElement;
use slide_core::units::{angle_to_degrees, fraction_from_thousandths, length_to_px_at};
use slide_core::{ColorKind, ColorSpec, FillResolver, PaintSpec, Shadow, StopSpec, Stroke};

const FILL_ELEMENTS: &[&str] = &[
    "noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill",
];

/// Colour reference held by a colour element (`a:srgbClr`, `a:schemeClr`, ...).
pub fn color_from_element(element: &XmlElement) -> Option<ColorSpec> {
    let kind = match element.name.as_str() {
        "srgbClr" => ColorKind::Srgb(element.attr("val")?.to_string()),
        "schemeClr" => ColorKind::Scheme(element.attr("val")?.to_string()),
        "sysClr" => ColorKind::System {
            last: element.attr("lastClr").map(str::to_string),
        },
        "prstClr" => ColorKind::Preset(element.attr("val")?.to_string()),
        _ => return None,
    };
    let mut spec = ColorSpec::new(kind);
    for modifier in element.elements() {
        let value = modifier.attr_i64("val");
        match modifier.name.as_str() {
            "lumMod" => spec.lum_mod = value,
            "lumOff" => spec.lum_off = value,
            "alpha" => spec.alpha = value,
            _ => {}
        }
    }
    Some(spec)
}

/// First colour element among the children of `parent`.
pub fn color_child(parent: &XmlElement) -> Option<ColorSpec> {
    parent.elements().find_map(color_from_element)
}

/// The fill declared directly under a properties element (`p:spPr`,
/// `p:bgPr`, `a:tcPr`, `a:rPr`, ...).
pub fn fill_paint(properties: &XmlElement) -> Option<PaintSpec> {
    let fill = properties
        .elements()
        .find(|e| FILL_ELEMENTS.contains(&e.name.as_str()))?;
    paint_from_fill_element(fill)
}

fn paint_from_fill_element(fill: &XmlElement) -> Option<PaintSpec> {
    match fill.name.as_str() {
        "noFill" => Some(PaintSpec::NoFill),
        "solidFill" => color_child(fill).map(PaintSpec::Solid),
        "gradFill" => {
            let stops = fill
                .child("gsLst")
                .map(|list| {
                    list.children_named("gs")
                        .filter_map(|gs| {
                            Some(StopSpec {
                                offset: fraction_from_thousandths(gs.attr_i64("pos").unwrap_or(0)),
                                color: color_child(gs)?,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            let ooxml_angle = fill
                .child("lin")
                .and_then(|lin| lin.attr_i64("ang"))
                .map(angle_to_degrees)
                .unwrap_or(0.0);
            Some(PaintSpec::Gradient {
                stops,
                angle: css_gradient_angle(ooxml_angle),
            })
        }
        "blipFill" => fill
            .child("blip")
            .and_then(|blip| blip.attr("r:embed"))
            .map(|rel_id| PaintSpec::Blip {
                rel_id: rel_id.to_string(),
            }),
        // Patterns are flattened to their foreground colour.
        "pattFill" => fill.child("fgClr").and_then(color_child).map(PaintSpec::Solid),
        "grpFill" => Some(PaintSpec::Group),
        _ => None,
    }
}

/// DrawingML measures gradient direction clockwise from "left to right";
/// CSS measures it clockwise from "bottom to top".
pub fn css_gradient_angle(ooxml_degrees: f64) -> f64 {
    (ooxml_degrees + 90.0).rem_euclid(360.0)
}

/// Fill for a shape: explicit `spPr` fill, then `useBgFill`, then the style
/// `a:fillRef`.
pub fn shape_fill_paint(shape: &XmlElement) -> Option<PaintSpec> {
    if let Some(paint) = shape.child("spPr").and_then(fill_paint) {
        return Some(paint);
    }
    if shape.attr_bool("useBgFill") == Some(true) {
        return Some(PaintSpec::SlideBackground);
    }
    style_ref(shape, "fillRef")
}

fn style_ref(shape: &XmlElement, name: &str) -> Option<PaintSpec> {
    let reference = shape.child("style")?.child(name)?;
    let idx = reference.attr_i64("idx").unwrap_or(0).max(0) as u32;
    let color = color_child(reference)?;
    Some(PaintSpec::StyleRef { idx, color })
}

/// Outline of a shape from `a:ln`, falling back to the style `a:lnRef`.
pub fn shape_stroke(shape: &XmlElement, resolver: &FillResolver<'_>, dpi: u32) -> Option<Stroke> {
    let line = shape.child("spPr").and_then(|sp_pr| sp_pr.child("ln"));
    let style_paint = style_ref(shape, "lnRef");
    stroke_from_line(line, style_paint.as_ref(), resolver, dpi)
}

/// Resolve an `a:ln` element (and an optional style fallback) to a stroke.
pub fn stroke_from_line(
    line: Option<&XmlElement>,
    style_paint: Option<&PaintSpec>,
    resolver: &FillResolver<'_>,
    dpi: u32,
) -> Option<Stroke> {
    let Some(line) = line else {
        let color = style_paint.and_then(|paint| resolver.resolve_stroke_color(paint))?;
        return Stroke::new(None, Some(color));
    };

    let paint = fill_paint(line);
    if matches!(paint, Some(PaintSpec::NoFill)) {
        return None;
    }

    let width = line
        .attr_i64("w")
        .filter(|w| *w > 0)
        .map(|w| (length_to_px_at(w, dpi) as f64).max(1.0));
    let color = match &paint {
        Some(paint) => resolver.resolve_stroke_color(paint),
        None => style_paint.and_then(|paint| resolver.resolve_stroke_color(paint)),
    };

    let mut stroke = Stroke::new(width, color)?;
    stroke.dash = line
        .child("prstDash")
        .and_then(|dash| dash.attr("val"))
        .and_then(dash_hint);
    Some(stroke)
}

/// Normalize a preset dash name to `dash`, `dot`, or nothing for solid.
fn dash_hint(preset: &str) -> Option<String> {
    let lower = preset.to_ascii_lowercase();
    if lower == "solid" {
        None
    } else if lower.contains("dash") {
        Some("dash".to_string())
    } else if lower.contains("dot") {
        Some("dot".to_string())
    } else {
        None
    }
}

/// `a:effectLst/a:outerShdw` of a properties element.
pub fn outer_shadow(properties: &XmlElement, resolver: &FillResolver<'_>, dpi: u32) -> Option<Shadow> {
    let shadow = properties.child("effectLst")?.child("outerShdw")?;
    let blur = length_to_px_at(shadow.attr_i64("blurRad").unwrap_or(0), dpi) as f64;
    let distance = length_to_px_at(shadow.attr_i64("dist").unwrap_or(0), dpi) as f64;
    let direction = angle_to_degrees(shadow.attr_i64("dir").unwrap_or(0)).to_radians();
    let color_spec = color_child(shadow);
    Some(Shadow {
        color: color_spec.as_ref().and_then(|c| resolver.resolve_color(c)),
        blur,
        offset_x: round2(distance * direction.cos()),
        offset_y: round2(distance * direction.sin()),
        opacity: color_spec.as_ref().and_then(ColorSpec::opacity),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use slide_core::{Fill, ThemePalette};

    fn parse(xml: &str) -> XmlElement {
        XmlElement::parse(xml).unwrap()
    }

    #[test]
    fn test_solid_fill_with_modifiers() {
        let sp_pr = parse(
            r#"<p:spPr><a:solidFill><a:schemeClr val="accent1"><a:lumMod val="75000"/></a:schemeClr></a:solidFill></p:spPr>"#,
        );
        match fill_paint(&sp_pr) {
            Some(PaintSpec::Solid(spec)) => {
                assert_eq!(spec.kind, ColorKind::Scheme("accent1".to_string()));
                assert_eq!(spec.lum_mod, Some(75_000));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_gradient_fill() {
        let sp_pr = parse(
            r#"<p:spPr><a:gradFill><a:gsLst>
                <a:gs pos="0"><a:srgbClr val="FF0000"/></a:gs>
                <a:gs pos="100000"><a:srgbClr val="0000FF"/></a:gs>
              </a:gsLst><a:lin ang="5400000"/></a:gradFill></p:spPr>"#,
        );
        match fill_paint(&sp_pr) {
            Some(PaintSpec::Gradient { stops, angle }) => {
                assert_eq!(stops.len(), 2);
                assert_eq!(stops[1].offset, 1.0);
                assert_eq!(angle, 180.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shape_fill_falls_back_to_style() {
        let shape = parse(
            r#"<p:sp><p:spPr/><p:style><a:fillRef idx="1"><a:schemeClr val="accent2"/></a:fillRef></p:style></p:sp>"#,
        );
        assert!(matches!(
            shape_fill_paint(&shape),
            Some(PaintSpec::StyleRef { idx: 1, .. })
        ));

        let bg = parse(r#"<p:sp useBgFill="1"><p:spPr/></p:sp>"#);
        assert_eq!(shape_fill_paint(&bg), Some(PaintSpec::SlideBackground));

        let none = parse(r#"<p:sp><p:spPr><a:noFill/></p:spPr></p:sp>"#);
        assert_eq!(shape_fill_paint(&none), Some(PaintSpec::NoFill));
    }

    #[test]
    fn test_stroke_from_line() {
        let palette = ThemePalette::new();
        let resolver = FillResolver::new(&palette);
        let shape = parse(
            r#"<p:sp><p:spPr><a:ln w="25400"><a:solidFill><a:srgbClr val="112233"/></a:solidFill><a:prstDash val="sysDash"/></a:ln></p:spPr></p:sp>"#,
        );
        let stroke = shape_stroke(&shape, &resolver, 96).unwrap();
        assert_eq!(stroke.width, Some(3.0));
        assert_eq!(stroke.color.as_deref(), Some("#112233"));
        assert_eq!(stroke.dash.as_deref(), Some("dash"));

        let hidden = parse(r#"<p:sp><p:spPr><a:ln w="25400"><a:noFill/></a:ln></p:spPr></p:sp>"#);
        assert!(shape_stroke(&hidden, &resolver, 96).is_none());

        let bare = parse(r#"<p:sp><p:spPr/></p:sp>"#);
        assert!(shape_stroke(&bare, &resolver, 96).is_none());
    }

    #[test]
    fn test_outer_shadow() {
        let palette = ThemePalette::new();
        let resolver = FillResolver::new(&palette);
        let sp_pr = parse(
            r#"<p:spPr><a:effectLst><a:outerShdw blurRad="38100" dist="38100" dir="5400000"><a:srgbClr val="000000"><a:alpha val="40000"/></a:srgbClr></a:outerShdw></a:effectLst></p:spPr>"#,
        );
        let shadow = outer_shadow(&sp_pr, &resolver, 96).unwrap();
        assert_eq!(shadow.blur, 4.0);
        assert_eq!(shadow.offset_x, 0.0);
        assert_eq!(shadow.offset_y, 4.0);
        assert_eq!(shadow.color.as_deref(), Some("#000000"));
        assert_eq!(shadow.opacity, Some(0.4));
    }

    #[test]
    fn test_resolved_pattern_fill_uses_foreground() {
        let palette = ThemePalette::new();
        let resolver = FillResolver::new(&palette);
        let sp_pr = parse(
            r#"<p:spPr><a:pattFill prst="pct5"><a:fgClr><a:srgbClr val="00FF00"/></a:fgClr></a:pattFill></p:spPr>"#,
        );
        let paint = fill_paint(&sp_pr).unwrap();
        assert_eq!(resolver.resolve_fill(&paint), Some(Fill::solid("#00FF00")));
    }
}
