//! PPTX decoder: walks each slide's shape tree and builds the layout IR.

use crate::assets::AssetSink;
use crate::fill::{color_child, fill_paint, outer_shadow, shape_fill_paint, shape_stroke};
use crate::geometry::{bbox_of, corner_radius, geometry_name, is_line_geometry, Transform, Xfrm};
use crate::package::{Package, Relationships};
use crate::text::read_text_body;
use crate::theme::palette_from;
use crate::xml::XmlElement;
use slide_core::units::{fraction_from_thousandths, length_to_px_at};
use slide_core::{
    BBox, Cell, Crop, DecodeOptions, Element, ElementKind, Error, Fill, FillResolver, ImageElement,
    LineElement, PaintSpec, Point, Result, Row, ShapeElement, SlideLayout, TableElement,
    TextElement, ThemePalette,
};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::rc::Rc;
use uuid::Uuid;

/// Decoder for PPTX (Office Open XML) presentations.
pub struct PptxDecoder {
    options: DecodeOptions,
}

impl PptxDecoder {
    /// Create a decoder with default options.
    pub fn new() -> Self {
        Self {
            options: DecodeOptions::default(),
        }
    }

    /// Set decoding options.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode every slide of a presentation.
    ///
    /// Embedded images are written to `asset_dir` and referenced as
    /// `asset_url_prefix/<file>`. Only an unreadable container or a missing
    /// slide size fail the call; problems with single shapes are logged and
    /// the shape is skipped.
    pub fn decode<R: Read + Seek>(
        &self,
        reader: R,
        asset_dir: &Path,
        asset_url_prefix: &str,
    ) -> Result<Vec<SlideLayout>> {
        let mut package = Package::open(reader)?;
        let info = package.presentation_info()?;

        let dpi = self.options.dpi;
        let width_px = length_to_px_at(info.width_emu, dpi);
        let height_px = length_to_px_at(info.height_emu, dpi);

        fs::create_dir_all(asset_dir)?;
        let assets = AssetSink::new(asset_dir, asset_url_prefix, &self.options.default_image_ext);

        let mut contexts: HashMap<String, Rc<LayoutContext>> = HashMap::new();
        let mut slides = Vec::with_capacity(info.slide_parts.len());

        for (idx, part_name) in info.slide_parts.iter().enumerate() {
            let number = idx + 1;
            let mut slide = SlideLayout::new(Uuid::new_v4().to_string(), number, width_px, height_px);

            match package.read_xml(part_name) {
                Ok(root) => {
                    let rels = package.relationships(part_name);
                    let part = Part {
                        name: part_name.clone(),
                        root,
                        rels,
                    };
                    self.decode_slide(&mut package, &mut contexts, &assets, &part, &mut slide);
                }
                Err(e) => log::warn!("Slide {}: cannot read {}: {}", number, part_name, e),
            }

            log::debug!(
                "Slide {}: {} elements, {} fonts",
                number,
                slide.elements.len(),
                slide.fonts.len()
            );
            slides.push(slide);
        }

        Ok(slides)
    }

    /// Decode a presentation held in memory.
    pub fn decode_bytes(
        &self,
        data: &[u8],
        asset_dir: &Path,
        asset_url_prefix: &str,
    ) -> Result<Vec<SlideLayout>> {
        self.decode(Cursor::new(data), asset_dir, asset_url_prefix)
    }

    /// Decode a presentation file.
    pub fn decode_file(
        &self,
        path: impl AsRef<Path>,
        asset_dir: &Path,
        asset_url_prefix: &str,
    ) -> Result<Vec<SlideLayout>> {
        let file = File::open(path.as_ref())?;
        self.decode(BufReader::new(file), asset_dir, asset_url_prefix)
    }

    fn decode_slide<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        contexts: &mut HashMap<String, Rc<LayoutContext>>,
        assets: &AssetSink,
        part: &Part,
        slide: &mut SlideLayout,
    ) {
        let layout_name = part
            .rels
            .first_of_kind("slideLayout")
            .map(|rel| rel.target.clone())
            .unwrap_or_default();
        let context = match contexts.get(&layout_name) {
            Some(context) => Rc::clone(context),
            None => {
                let context = Rc::new(LayoutContext::load(package, &layout_name));
                contexts.insert(layout_name, Rc::clone(&context));
                context
            }
        };

        let number = slide.index;
        let base = FillResolver::new(&context.palette).with_gradient_mode(self.options.gradient_mode);
        slide.background = [Some(part), context.layout.as_ref(), context.master.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|owner| background_fill(package, assets, number, owner, &base));

        let Some(tree) = part.root.path(&["cSld", "spTree"]) else {
            log::debug!("Slide {}: no shape tree", number);
            return;
        };

        let mut walker = ShapeWalker {
            options: &self.options,
            package,
            assets,
            context: &context,
            part,
            resolver: base.clone().with_background(slide.background.clone()),
            slide_number: number,
            next_z: 0,
            elements: Vec::new(),
        };
        walker.walk(tree, Transform::identity(), None);

        for element in walker.elements {
            slide.push_element(element);
        }
    }
}

impl Default for PptxDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed part together with its relationships.
pub(crate) struct Part {
    pub name: String,
    pub root: XmlElement,
    pub rels: Relationships,
}

impl Part {
    fn load<R: Read + Seek>(package: &mut Package<R>, name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        match package.read_xml(name) {
            Ok(root) => Some(Self {
                name: name.to_string(),
                root,
                rels: package.relationships(name),
            }),
            Err(e) => {
                log::warn!("Ignoring unreadable part {}: {}", name, e);
                None
            }
        }
    }
}

/// Slide layout, its master, and the palette their theme defines.
pub(crate) struct LayoutContext {
    pub layout: Option<Part>,
    pub master: Option<Part>,
    pub palette: ThemePalette,
}

impl LayoutContext {
    pub(crate) fn load<R: Read + Seek>(package: &mut Package<R>, layout_name: &str) -> Self {
        let layout = Part::load(package, layout_name);
        let master = layout
            .as_ref()
            .and_then(|l| l.rels.first_of_kind("slideMaster"))
            .map(|rel| rel.target.clone())
            .and_then(|name| Part::load(package, &name));
        let theme = master
            .as_ref()
            .and_then(|m| m.rels.first_of_kind("theme"))
            .map(|rel| rel.target.clone())
            .and_then(|name| Part::load(package, &name));

        let palette = palette_from(theme.as_ref().map(|t| &t.root), master.as_ref().map(|m| &m.root));
        Self {
            layout,
            master,
            palette,
        }
    }
}

/// Background of one part (`p:bg`), `None` when it declares none.
fn background_fill<R: Read + Seek>(
    package: &mut Package<R>,
    assets: &AssetSink,
    slide_number: usize,
    owner: &Part,
    resolver: &FillResolver<'_>,
) -> Option<Fill> {
    let bg = owner.root.path(&["cSld", "bg"])?;

    if let Some(bg_pr) = bg.child("bgPr") {
        return match fill_paint(bg_pr)? {
            PaintSpec::Blip { rel_id } => {
                let extracted = extract_media(package, &owner.rels, &rel_id, assets, |target| {
                    assets.background_name(slide_number, target)
                });
                match extracted {
                    Ok(src) => Some(Fill::Image {
                        src,
                        fit: "cover".to_string(),
                        opacity: None,
                    }),
                    Err(e) => {
                        log::warn!("Slide {}: background image from {}: {}", slide_number, owner.name, e);
                        None
                    }
                }
            }
            paint => resolver.resolve_fill(&paint),
        };
    }

    let color = bg.child("bgRef").and_then(color_child)?;
    resolver.resolve_fill(&PaintSpec::Solid(color))
}

/// Copy the media part behind `rel_id` into the asset directory.
fn extract_media<R: Read + Seek>(
    package: &mut Package<R>,
    rels: &Relationships,
    rel_id: &str,
    assets: &AssetSink,
    file_name: impl FnOnce(&str) -> String,
) -> Result<String> {
    let rel = rels
        .get(rel_id)
        .filter(|rel| !rel.external)
        .ok_or_else(|| Error::Zip(format!("No embedded media for relationship {}", rel_id)))?;
    let data = package.read_bytes(&rel.target)?;
    let name = file_name(&rel.target);
    Ok(assets.write(&name, &data)?)
}

/// The `p:ph` marker of a shape, if it is a placeholder.
fn placeholder_of(shape: &XmlElement) -> Option<&XmlElement> {
    shape
        .elements()
        .find(|e| e.name.starts_with("nv"))
        .and_then(|nv| nv.child("nvPr"))
        .and_then(|nv_pr| nv_pr.child("ph"))
}

/// Placeholder type as layouts and masters name it.
pub(crate) fn placeholder_type(ph: &XmlElement) -> &str {
    match ph.attr("type").unwrap_or("body") {
        "ctrTitle" => "title",
        "subTitle" => "body",
        other => other,
    }
}

/// The shape in `root`'s tree that a slide placeholder inherits from: same
/// `idx` first, then same type.
fn matching_placeholder<'t>(root: &'t XmlElement, ph: &XmlElement) -> Option<&'t XmlElement> {
    let tree = root.path(&["cSld", "spTree"])?;
    let candidates: Vec<(&XmlElement, &XmlElement)> = tree
        .elements()
        .filter_map(|shape| placeholder_of(shape).map(|candidate| (shape, candidate)))
        .collect();

    if let Some(idx) = ph.attr("idx") {
        if let Some((shape, _)) = candidates.iter().find(|(_, c)| c.attr("idx") == Some(idx)) {
            return Some(shape);
        }
    }
    let wanted = placeholder_type(ph);
    candidates
        .iter()
        .find(|(_, c)| placeholder_type(c) == wanted)
        .map(|(shape, _)| *shape)
}

fn crop_from(src_rect: &XmlElement, bbox: &BBox) -> Option<Crop> {
    let inset = |key: &str, extent: i64| {
        let fraction = fraction_from_thousandths(src_rect.attr_i64(key).unwrap_or(0)).max(0.0);
        (extent as f64 * fraction).round()
    };
    let crop = Crop {
        left: inset("l", bbox.width),
        top: inset("t", bbox.height),
        right: inset("r", bbox.width),
        bottom: inset("b", bbox.height),
    };
    if crop == Crop::default() {
        None
    } else {
        Some(crop)
    }
}

/// Rotate `point` clockwise about `center` by `degrees`.
fn rotate_about(point: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    let round = |v: f64| (v * 100.0).round() / 100.0;
    Point {
        x: round(center.x + dx * cos - dy * sin),
        y: round(center.y + dx * sin + dy * cos),
    }
}

/// Depth-first walk over one slide's shape tree.
struct ShapeWalker<'a, R> {
    options: &'a DecodeOptions,
    package: &'a mut Package<R>,
    assets: &'a AssetSink,
    context: &'a LayoutContext,
    part: &'a Part,
    resolver: FillResolver<'a>,
    slide_number: usize,
    next_z: u32,
    elements: Vec<Element>,
}

impl<'a, R: Read + Seek> ShapeWalker<'a, R> {
    fn walk(&mut self, tree: &XmlElement, transform: Transform, group_fill: Option<Fill>) {
        for child in tree.elements() {
            match child.name.as_str() {
                "sp" | "pic" | "graphicFrame" | "cxnSp" => {
                    let z = self.next_z;
                    self.next_z += 1;
                    match self.decode_shape(child, z, &transform, group_fill.as_ref()) {
                        Ok(Some(element)) => self.elements.push(element),
                        Ok(None) => {}
                        Err(e) => log::warn!(
                            "Slide {}: skipping shape {} ({}): {}",
                            self.slide_number,
                            z,
                            child.name,
                            e
                        ),
                    }
                }
                "grpSp" => {
                    let properties = child.child("grpSpPr");
                    let inner = properties
                        .and_then(|p| p.child("xfrm"))
                        .map(|xfrm| transform.enter_group(xfrm))
                        .unwrap_or(transform);
                    let resolver = self.resolver.clone().with_group_fill(group_fill.clone());
                    let fill = properties
                        .and_then(fill_paint)
                        .and_then(|paint| resolver.resolve_fill(&paint))
                        .or_else(|| group_fill.clone());
                    self.walk(child, inner, fill);
                }
                "AlternateContent" => {
                    if let Some(branch) = child.child("Fallback").or_else(|| child.child("Choice")) {
                        self.walk(branch, transform, group_fill.clone());
                    }
                }
                _ => {}
            }
        }
    }

    fn decode_shape(
        &mut self,
        shape: &XmlElement,
        z: u32,
        transform: &Transform,
        group_fill: Option<&Fill>,
    ) -> Result<Option<Element>> {
        let resolver = self.resolver.clone().with_group_fill(group_fill.cloned());
        match shape.name.as_str() {
            "pic" => self.decode_picture(shape, z, transform, &resolver),
            "graphicFrame" => Ok(self.decode_graphic_frame(shape, z, transform, &resolver)),
            "cxnSp" => {
                let Some(xfrm) = self.placement(shape, shape.child("spPr"), transform) else {
                    log::debug!("Slide {}: connector {} has no geometry", self.slide_number, z);
                    return Ok(None);
                };
                Ok(self.decode_line(shape, z, &xfrm, &resolver))
            }
            _ => self.decode_sp(shape, z, transform, &resolver),
        }
    }

    /// Slide-space transform of a shape, inheriting placeholder geometry
    /// from the layout or master when the shape has none of its own.
    fn placement(
        &self,
        shape: &XmlElement,
        properties: Option<&XmlElement>,
        transform: &Transform,
    ) -> Option<Xfrm> {
        let local = match properties {
            Some(p) if p.name == "xfrm" => Xfrm::read(p),
            _ => Xfrm::of_properties(properties),
        };
        local
            .map(|xfrm| transform.apply(&xfrm))
            .or_else(|| self.inherited_xfrm(shape))
    }

    fn inherited_xfrm(&self, shape: &XmlElement) -> Option<Xfrm> {
        let ph = placeholder_of(shape)?;
        [self.context.layout.as_ref(), self.context.master.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(|owner| matching_placeholder(&owner.root, ph))
            .find_map(|source| Xfrm::of_properties(source.child("spPr")))
    }

    fn element(&self, bbox: BBox, z: u32, xfrm: &Xfrm, kind: ElementKind) -> Element {
        let mut element = Element::new(Uuid::new_v4().to_string(), bbox, z, kind);
        element.rotation = xfrm.rotation;
        element.flip_h = xfrm.flip_h;
        element.flip_v = xfrm.flip_v;
        element
    }

    fn decode_sp(
        &mut self,
        shape: &XmlElement,
        z: u32,
        transform: &Transform,
        resolver: &FillResolver<'_>,
    ) -> Result<Option<Element>> {
        let dpi = self.options.dpi;
        let sp_pr = shape.child("spPr");
        let Some(xfrm) = self.placement(shape, sp_pr, transform) else {
            log::debug!("Slide {}: shape {} has no geometry", self.slide_number, z);
            return Ok(None);
        };

        let geometry = geometry_name(sp_pr);
        if is_line_geometry(&geometry) {
            return Ok(self.decode_line(shape, z, &xfrm, resolver));
        }

        let bbox = bbox_of(&xfrm, dpi);
        if bbox.is_degenerate() {
            log::warn!(
                "Slide {}: skipping shape {} with empty box {}x{}",
                self.slide_number,
                z,
                bbox.width,
                bbox.height
            );
            return Ok(None);
        }

        let fill = match shape_fill_paint(shape) {
            Some(PaintSpec::Blip { rel_id }) => Some(self.image_fill(shape, &rel_id, z)?),
            Some(paint) => resolver.resolve_fill(&paint),
            None => None,
        };
        let stroke = shape_stroke(shape, resolver, dpi);
        let shadow = sp_pr.and_then(|p| outer_shadow(p, resolver, dpi));
        let text = shape
            .child("txBody")
            .map(|body| read_text_body(body, resolver))
            .unwrap_or_default();

        let visible_fill = fill
            .as_ref()
            .is_some_and(|f| !matches!(f, Fill::UnresolvedTheme { .. }));
        let visible_stroke = stroke.as_ref().is_some_and(|s| s.color.is_some());
        if !text.has_text() && !visible_fill && !visible_stroke {
            if placeholder_of(shape).is_some() {
                log::debug!("Slide {}: dropping empty placeholder {}", self.slide_number, z);
            } else {
                log::debug!("Slide {}: dropping shape {} with nothing to draw", self.slide_number, z);
            }
            return Ok(None);
        }

        let kind = if text.has_text() {
            ElementKind::Text(TextElement {
                align: text.align,
                runs: text.runs,
                bullets: text.paragraphs,
                fill,
                stroke,
                shadow,
            })
        } else {
            ElementKind::Shape(ShapeElement {
                radius: corner_radius(sp_pr, &bbox),
                shape_kind: geometry,
                fill,
                stroke,
                shadow,
            })
        };
        Ok(Some(self.element(bbox, z, &xfrm, kind)))
    }

    fn image_fill(&mut self, shape: &XmlElement, rel_id: &str, z: u32) -> Result<Fill> {
        let src = self.extract(rel_id, z)?;
        let opacity = shape
            .path(&["spPr", "blipFill", "blip", "alphaModFix"])
            .and_then(|a| a.attr_i64("amt"))
            .map(|amt| fraction_from_thousandths(amt).clamp(0.0, 1.0));
        Ok(Fill::Image {
            src,
            fit: "cover".to_string(),
            opacity,
        })
    }

    fn extract(&mut self, rel_id: &str, z: u32) -> Result<String> {
        let assets = self.assets;
        let slide = self.slide_number;
        extract_media(self.package, &self.part.rels, rel_id, assets, |target| {
            assets.image_name(slide, z, target)
        })
        .map_err(|e| Error::Asset {
            slide,
            shape: z as usize,
            message: e.to_string(),
        })
    }

    fn decode_picture(
        &mut self,
        shape: &XmlElement,
        z: u32,
        transform: &Transform,
        resolver: &FillResolver<'_>,
    ) -> Result<Option<Element>> {
        let dpi = self.options.dpi;
        let sp_pr = shape.child("spPr");
        let Some(xfrm) = self.placement(shape, sp_pr, transform) else {
            log::debug!("Slide {}: picture {} has no geometry", self.slide_number, z);
            return Ok(None);
        };
        let bbox = bbox_of(&xfrm, dpi);
        if bbox.is_degenerate() {
            log::warn!("Slide {}: skipping picture {} with empty box", self.slide_number, z);
            return Ok(None);
        }

        let blip_fill = shape.child("blipFill");
        let Some(blip) = blip_fill.and_then(|b| b.child("blip")) else {
            log::debug!("Slide {}: picture {} has no image data", self.slide_number, z);
            return Ok(None);
        };
        let Some(rel_id) = blip.attr("r:embed") else {
            log::debug!("Slide {}: picture {} is linked, not embedded", self.slide_number, z);
            return Ok(None);
        };

        let mut image = ImageElement::new(self.extract(rel_id, z)?);
        image.crop = blip_fill
            .and_then(|b| b.child("srcRect"))
            .and_then(|rect| crop_from(rect, &bbox));
        image.border = shape_stroke(shape, resolver, dpi);
        image.shadow = sp_pr.and_then(|p| outer_shadow(p, resolver, dpi));
        image.background = sp_pr
            .and_then(fill_paint)
            .and_then(|paint| resolver.resolve_fill(&paint));

        let mut element = self.element(bbox, z, &xfrm, ElementKind::Image(image));
        element.opacity = blip
            .child("alphaModFix")
            .and_then(|a| a.attr_i64("amt"))
            .map(|amt| fraction_from_thousandths(amt).clamp(0.0, 1.0));
        Ok(Some(element))
    }

    fn decode_graphic_frame(
        &self,
        shape: &XmlElement,
        z: u32,
        transform: &Transform,
        resolver: &FillResolver<'_>,
    ) -> Option<Element> {
        let Some(table) = shape.path(&["graphic", "graphicData", "tbl"]) else {
            log::debug!(
                "Slide {}: skipping graphic frame {} (not a table)",
                self.slide_number,
                z
            );
            return None;
        };
        let Some(xfrm) = self.placement(shape, shape.child("xfrm"), transform) else {
            log::debug!("Slide {}: table {} has no geometry", self.slide_number, z);
            return None;
        };
        let bbox = bbox_of(&xfrm, self.options.dpi);
        if bbox.is_degenerate() {
            log::warn!("Slide {}: skipping table {} with empty box", self.slide_number, z);
            return None;
        }

        let rows = table
            .children_named("tr")
            .map(|tr| Row {
                cells: tr
                    .children_named("tc")
                    .map(|tc| {
                        let body = tc
                            .child("txBody")
                            .map(|b| read_text_body(b, resolver))
                            .unwrap_or_default();
                        Cell {
                            text: body.plain_text(),
                            runs: body.runs,
                        }
                    })
                    .collect(),
            })
            .collect();

        Some(self.element(bbox, z, &xfrm, ElementKind::Table(TableElement { rows })))
    }

    /// Straight line from the box corners, with flips and rotation applied
    /// to the endpoints.
    fn decode_line(
        &self,
        shape: &XmlElement,
        z: u32,
        xfrm: &Xfrm,
        resolver: &FillResolver<'_>,
    ) -> Option<Element> {
        let dpi = self.options.dpi;
        let bbox = bbox_of(xfrm, dpi);
        if bbox.width == 0 && bbox.height == 0 {
            log::warn!("Slide {}: skipping zero-length line {}", self.slide_number, z);
            return None;
        }
        let Some(stroke) = shape_stroke(shape, resolver, dpi) else {
            log::debug!("Slide {}: dropping line {} without outline", self.slide_number, z);
            return None;
        };

        let (left, right) = (bbox.x as f64, (bbox.x + bbox.width) as f64);
        let (top, bottom) = (bbox.y as f64, (bbox.y + bbox.height) as f64);
        let (x1, x2) = if xfrm.flip_h { (right, left) } else { (left, right) };
        let (y1, y2) = if xfrm.flip_v { (bottom, top) } else { (top, bottom) };
        let mut points = vec![Point { x: x1, y: y1 }, Point { x: x2, y: y2 }];
        if xfrm.rotation != 0.0 {
            let center = Point {
                x: (left + right) / 2.0,
                y: (top + bottom) / 2.0,
            };
            points = points
                .into_iter()
                .map(|p| rotate_about(p, center, xfrm.rotation))
                .collect();
        }

        let line = LineElement {
            points,
            stroke: Some(stroke),
        };
        Some(Element::new(
            Uuid::new_v4().to_string(),
            bbox,
            z,
            ElementKind::Line(line),
        ))
    }
}
