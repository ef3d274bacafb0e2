//! Unresolved paint descriptions as read from OOXML, and the theme palette
//! used to turn scheme references into concrete colours.

use std::collections::HashMap;

/// A colour reference before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSpec {
    pub kind: ColorKind,
    /// `a:lumMod` in thousandths of a percent.
    pub lum_mod: Option<i64>,
    /// `a:lumOff` in thousandths of a percent.
    pub lum_off: Option<i64>,
    /// `a:alpha` in thousandths of a percent.
    pub alpha: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorKind {
    /// `a:srgbClr val="RRGGBB"`.
    Srgb(String),
    /// `a:schemeClr val="accent1"`.
    Scheme(String),
    /// `a:sysClr lastClr="RRGGBB"`.
    System { last: Option<String> },
    /// `a:prstClr val="black"`.
    Preset(String),
}

impl ColorSpec {
    pub fn new(kind: ColorKind) -> Self {
        Self {
            kind,
            lum_mod: None,
            lum_off: None,
            alpha: None,
        }
    }

    pub fn srgb(hex: impl Into<String>) -> Self {
        Self::new(ColorKind::Srgb(hex.into()))
    }

    pub fn scheme(name: impl Into<String>) -> Self {
        Self::new(ColorKind::Scheme(name.into()))
    }

    /// Opacity in [0, 1] when an alpha modifier is present.
    pub fn opacity(&self) -> Option<f64> {
        self.alpha.map(|a| (a as f64 / 100_000.0).clamp(0.0, 1.0))
    }
}

/// A gradient stop before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StopSpec {
    pub offset: f64,
    pub color: ColorSpec,
}

/// A fill or outline paint before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSpec {
    /// Explicit `a:noFill`.
    NoFill,
    Solid(ColorSpec),
    Gradient { stops: Vec<StopSpec>, angle: f64 },
    /// Picture fill; the relationship is resolved by the decoder.
    Blip { rel_id: String },
    /// `a:grpFill`: inherits from the enclosing group.
    Group,
    /// `useBgFill="1"`: shows the slide background through the shape.
    SlideBackground,
    /// Colour from the shape style (`p:style/a:fillRef`), `idx` 0 means none.
    StyleRef { idx: u32, color: ColorSpec },
}

/// Whether gradients survive resolution or collapse to their first stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientMode {
    #[default]
    Full,
    Flat,
}

const SCHEME_SLOTS: &[&str] = &[
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5",
    "accent6", "hlink", "folHlink",
];

/// Theme colour scheme plus the master's colour map.
///
/// Only colours actually present in the theme are known; lookups for
/// anything else return `None` so callers can record the reference as
/// unresolved instead of guessing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemePalette {
    colors: HashMap<String, String>,
    aliases: HashMap<String, String>,
    /// Major (heading) latin typeface.
    pub major_font: Option<String>,
    /// Minor (body) latin typeface.
    pub minor_font: Option<String>,
}

impl ThemePalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scheme slot (`dk1`, `accent1`, ...) as `#RRGGBB`.
    pub fn set_color(&mut self, slot: &str, hex: &str) {
        if let Some(color) = normalize_hex(hex) {
            self.colors.insert(slot.to_string(), color);
        }
    }

    /// Record a colour-map alias (`bg1` → `lt1`).
    pub fn set_alias(&mut self, name: &str, slot: &str) {
        self.aliases.insert(name.to_string(), slot.to_string());
    }

    /// Whether `slot` is a colour scheme slot name.
    pub fn is_scheme_slot(slot: &str) -> bool {
        SCHEME_SLOTS.contains(&slot)
    }

    /// Concrete colour for a scheme name, following colour-map aliases.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let slot = self
            .aliases
            .get(name)
            .map(String::as_str)
            .unwrap_or_else(|| default_alias(name));
        self.colors.get(slot).map(String::as_str)
    }

    /// Resolve `+mj-lt` / `+mn-lt` theme font references.
    pub fn resolve_typeface(&self, typeface: &str) -> Option<String> {
        match typeface {
            "+mj-lt" | "+mj-ea" | "+mj-cs" => self.major_font.clone(),
            "+mn-lt" | "+mn-ea" | "+mn-cs" => self.minor_font.clone(),
            "" => None,
            other => Some(other.to_string()),
        }
    }
}

/// Colour-map aliases used when the master does not supply `p:clrMap`.
fn default_alias(name: &str) -> &str {
    match name {
        "tx1" => "dk1",
        "bg1" => "lt1",
        "tx2" => "dk2",
        "bg2" => "lt2",
        other => other,
    }
}

/// Normalize `rrggbb` / `#RRGGBB` to upper-case `#RRGGBB`.
pub fn normalize_hex(hex: &str) -> Option<String> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_ascii_uppercase()))
}
