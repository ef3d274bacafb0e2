//! Layout templates: the geometry of a slide layout, without its content.

use crate::decoder::{placeholder_type, LayoutContext, PptxDecoder};
use crate::fill::{fill_paint, stroke_from_line};
use crate::geometry::{bbox_of, geometry_name, Xfrm};
use crate::package::{extract_slide_number, Package};
use slide_core::units::length_to_px_at;
use slide_core::{Error, FillResolver, LayoutTemplate, Result, TemplateShape};
use std::io::{Read, Seek};

const LAYOUT_PREFIX: &str = "ppt/slideLayouts/slideLayout";

/// Extract the shapes of the `layout_index`-th (0-based) slide layout with
/// default options.
pub fn extract_layout_template<R: Read + Seek>(reader: R, layout_index: usize) -> Result<LayoutTemplate> {
    PptxDecoder::new().layout_template(reader, layout_index)
}

impl PptxDecoder {
    /// Extract the shapes of the `layout_index`-th (0-based) slide layout,
    /// layouts ordered by their part number.
    pub fn layout_template<R: Read + Seek>(&self, reader: R, layout_index: usize) -> Result<LayoutTemplate> {
        let mut package = Package::open(reader)?;
        let info = package.presentation_info()?;
        let dpi = self.options().dpi;

        let mut layouts: Vec<(usize, String)> = package
            .part_names()
            .into_iter()
            .filter(|name| name.starts_with(LAYOUT_PREFIX) && name.ends_with(".xml"))
            .map(|name| (extract_slide_number(&name).unwrap_or(usize::MAX), name))
            .collect();
        layouts.sort();

        let (_, layout_name) = layouts.get(layout_index).ok_or_else(|| {
            Error::Decode(format!(
                "Layout index {} out of range (found {} layouts)",
                layout_index,
                layouts.len()
            ))
        })?;

        let context = LayoutContext::load(&mut package, layout_name);
        let layout = context
            .layout
            .as_ref()
            .ok_or_else(|| Error::Decode(format!("Cannot read {}", layout_name)))?;
        let resolver = FillResolver::new(&context.palette).with_gradient_mode(self.options().gradient_mode);

        let mut shapes = Vec::new();
        if let Some(tree) = layout.root.path(&["cSld", "spTree"]) {
            for (z, shape) in tree.children_named("sp").enumerate() {
                let sp_pr = shape.child("spPr");
                let Some(xfrm) = Xfrm::of_properties(sp_pr) else {
                    continue;
                };
                let bbox = bbox_of(&xfrm, dpi);
                if bbox.width == 0 || bbox.height == 0 {
                    continue;
                }

                let placeholder = shape
                    .path(&["nvSpPr", "nvPr", "ph"])
                    .map(|ph| placeholder_type(ph).to_string());
                shapes.push(TemplateShape {
                    geometry: geometry_name(sp_pr),
                    bbox,
                    z: z as u32,
                    rotation: xfrm.rotation,
                    flip_h: xfrm.flip_h,
                    flip_v: xfrm.flip_v,
                    fill: sp_pr
                        .and_then(fill_paint)
                        .and_then(|paint| resolver.resolve_fill(&paint)),
                    stroke: stroke_from_line(sp_pr.and_then(|p| p.child("ln")), None, &resolver, dpi),
                    placeholder_type: placeholder,
                });
            }
        }

        log::debug!("Layout {}: {} template shapes", layout_name, shapes.len());
        Ok(LayoutTemplate {
            index: layout_index + 1,
            width_px: length_to_px_at(info.width_emu, dpi),
            height_px: length_to_px_at(info.height_emu, dpi),
            shapes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tests::{slide_xml, Fixture};
    use slide_core::{BBox, Fill};
    use std::io::Cursor;

    #[test]
    fn test_extract_layout_template() {
        let fixture = Fixture {
            slides: vec![slide_xml("")],
            layout_tree: r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Band"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
<p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="9144000" cy="914400"/></a:xfrm><a:prstGeom prst="rect"/><a:solidFill><a:schemeClr val="accent1"/></a:solidFill>
<a:ln w="25400"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln></p:spPr></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Body"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
<p:spPr><a:xfrm rot="5400000"><a:off x="914400" y="1828800"/><a:ext cx="1828800" cy="914400"/></a:xfrm><a:prstGeom prst="ellipse"/></p:spPr></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="NoGeometry"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#
                .to_string(),
            ..Default::default()
        };

        let template = extract_layout_template(Cursor::new(fixture.build()), 0).unwrap();
        assert_eq!((template.width_px, template.height_px), (960, 540));
        assert_eq!(template.shapes.len(), 2);

        let band = &template.shapes[0];
        assert_eq!(band.geometry, "rect");
        assert_eq!(band.bbox, BBox::new(0, 0, 960, 96));
        assert_eq!(band.fill, Some(Fill::solid("#4472C4")));
        assert_eq!(band.stroke.as_ref().and_then(|s| s.width), Some(3.0));
        assert!(band.placeholder_type.is_none());

        let body = &template.shapes[1];
        assert_eq!(body.geometry, "ellipse");
        assert_eq!(body.z, 1);
        assert_eq!(body.rotation, 90.0);
        assert_eq!(body.placeholder_type.as_deref(), Some("body"));
    }

    #[test]
    fn test_layout_index_out_of_range() {
        let fixture = Fixture {
            slides: vec![slide_xml("")],
            ..Default::default()
        };
        let result = extract_layout_template(Cursor::new(fixture.build()), 3);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
