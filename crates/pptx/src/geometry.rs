//! Shape transforms: `a:xfrm` offsets and extents, and the coordinate
//! mapping applied to the children of group shapes.

use crate::xml::XmlElement;
use slide_core::units::{angle_to_degrees, length_to_px_at};
use slide_core::BBox;

/// Default `adj` of a rounded rectangle, in thousandths of a percent of
/// the shorter side.
const ROUND_RECT_DEFAULT_ADJ: i64 = 16_667;

/// A shape transform in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Xfrm {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Xfrm {
    /// Read an `a:xfrm` / `p:xfrm`. `None` when the extent is missing.
    pub fn read(xfrm: &XmlElement) -> Option<Self> {
        let ext = xfrm.child("ext")?;
        let off = xfrm.child("off");
        Some(Self {
            x: off.and_then(|o| o.attr_i64("x")).unwrap_or(0),
            y: off.and_then(|o| o.attr_i64("y")).unwrap_or(0),
            cx: ext.attr_i64("cx")?,
            cy: ext.attr_i64("cy")?,
            rotation: xfrm.attr_i64("rot").map(angle_to_degrees).unwrap_or(0.0),
            flip_h: xfrm.attr_bool("flipH").unwrap_or(false),
            flip_v: xfrm.attr_bool("flipV").unwrap_or(false),
        })
    }

    /// The transform under a shape's properties element (`p:spPr`, `p:grpSpPr`).
    pub fn of_properties(properties: Option<&XmlElement>) -> Option<Self> {
        properties.and_then(|p| p.child("xfrm")).and_then(Self::read)
    }
}

/// Maps child coordinates of nested groups to slide coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Compose with the child coordinate space of a group's `a:xfrm`
    /// (`a:off`/`a:ext` against `a:chOff`/`a:chExt`).
    pub fn enter_group(&self, group_xfrm: &XmlElement) -> Self {
        let Some(outer) = Xfrm::read(group_xfrm) else {
            return *self;
        };
        let child_off = group_xfrm.child("chOff");
        let child_ext = group_xfrm.child("chExt");
        let ch_x = child_off.and_then(|c| c.attr_i64("x")).unwrap_or(outer.x) as f64;
        let ch_y = child_off.and_then(|c| c.attr_i64("y")).unwrap_or(outer.y) as f64;
        let ch_cx = child_ext.and_then(|c| c.attr_i64("cx")).unwrap_or(outer.cx) as f64;
        let ch_cy = child_ext.and_then(|c| c.attr_i64("cy")).unwrap_or(outer.cy) as f64;

        let local_sx = if ch_cx > 0.0 { outer.cx as f64 / ch_cx } else { 1.0 };
        let local_sy = if ch_cy > 0.0 { outer.cy as f64 / ch_cy } else { 1.0 };
        let local_tx = outer.x as f64 - ch_x * local_sx;
        let local_ty = outer.y as f64 - ch_y * local_sy;

        Self {
            sx: self.sx * local_sx,
            sy: self.sy * local_sy,
            tx: self.sx * local_tx + self.tx,
            ty: self.sy * local_ty + self.ty,
        }
    }

    /// Map a transform to slide EMUs.
    pub fn apply(&self, xfrm: &Xfrm) -> Xfrm {
        Xfrm {
            x: (xfrm.x as f64 * self.sx + self.tx).round() as i64,
            y: (xfrm.y as f64 * self.sy + self.ty).round() as i64,
            cx: (xfrm.cx as f64 * self.sx).round() as i64,
            cy: (xfrm.cy as f64 * self.sy).round() as i64,
            ..*xfrm
        }
    }
}

/// Pixel box of a slide-space transform.
pub fn bbox_of(xfrm: &Xfrm, dpi: u32) -> BBox {
    BBox::new(
        length_to_px_at(xfrm.x, dpi),
        length_to_px_at(xfrm.y, dpi),
        length_to_px_at(xfrm.cx, dpi),
        length_to_px_at(xfrm.cy, dpi),
    )
}

/// Preset geometry name of a shape, `custom` for free-form paths.
pub fn geometry_name(sp_pr: Option<&XmlElement>) -> String {
    let Some(sp_pr) = sp_pr else {
        return "rect".to_string();
    };
    if let Some(prst) = sp_pr.child("prstGeom").and_then(|g| g.attr("prst")) {
        return prst.to_string();
    }
    if sp_pr.child("custGeom").is_some() {
        return "custom".to_string();
    }
    "rect".to_string()
}

/// Whether a preset geometry is drawn as a straight line.
pub fn is_line_geometry(name: &str) -> bool {
    matches!(
        name,
        "line" | "straightConnector1" | "bentConnector2" | "curvedConnector2"
    )
}

/// Corner radius in pixels for rounded-rectangle presets.
pub fn corner_radius(sp_pr: Option<&XmlElement>, bbox: &BBox) -> Option<f64> {
    let geometry = sp_pr?.child("prstGeom")?;
    if !matches!(geometry.attr("prst"), Some("roundRect") | Some("round2SameRect")) {
        return None;
    }
    let adj = geometry
        .child("avLst")
        .and_then(|list| list.children_named("gd").next())
        .and_then(|gd| gd.attr("fmla"))
        .and_then(|fmla| fmla.strip_prefix("val "))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(ROUND_RECT_DEFAULT_ADJ)
        .clamp(0, 50_000);
    let shorter = bbox.width.min(bbox.height) as f64;
    Some((shorter * adj as f64 / 100_000.0).round())
}
