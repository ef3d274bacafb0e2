//! Paint resolution.
//!
//! A [`FillResolver`] runs an ordered chain of strategies over a
//! [`PaintSpec`]. Each strategy declares which paints it applies to and
//! returns an optional [`Fill`]; the first `Some` wins. Resolution never
//! fails: the worst case is `None`, which callers record as an absent fill.

use crate::paint::{normalize_hex, ColorKind, ColorSpec, GradientMode, PaintSpec, ThemePalette};
use crate::types::{Fill, GradientStop};

/// One link of the resolution chain.
struct Strategy {
    name: &'static str,
    applies: fn(&PaintSpec) -> bool,
    resolve: fn(&FillResolver<'_>, &PaintSpec) -> Option<Fill>,
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "inline",
        applies: is_inline_color,
        resolve: resolve_inline,
    },
    Strategy {
        name: "scheme",
        applies: is_scheme_color,
        resolve: resolve_scheme,
    },
    Strategy {
        name: "gradient",
        applies: is_gradient,
        resolve: resolve_gradient,
    },
    Strategy {
        name: "inherited",
        applies: is_inherited,
        resolve: resolve_inherited,
    },
];

/// Resolves paints against a theme palette and the inherited context.
#[derive(Debug, Clone)]
pub struct FillResolver<'a> {
    palette: &'a ThemePalette,
    gradient_mode: GradientMode,
    background: Option<Fill>,
    group_fill: Option<Fill>,
}

impl<'a> FillResolver<'a> {
    pub fn new(palette: &'a ThemePalette) -> Self {
        Self {
            palette,
            gradient_mode: GradientMode::Full,
            background: None,
            group_fill: None,
        }
    }

    pub fn with_gradient_mode(mut self, mode: GradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    /// Fill shown through shapes with `useBgFill`.
    pub fn with_background(mut self, background: Option<Fill>) -> Self {
        self.background = background;
        self
    }

    /// Fill of the enclosing group, for `a:grpFill`.
    pub fn with_group_fill(mut self, fill: Option<Fill>) -> Self {
        self.group_fill = fill;
        self
    }

    pub fn palette(&self) -> &ThemePalette {
        self.palette
    }

    /// Resolve a paint to a fill, or `None` when it cannot be made concrete.
    pub fn resolve_fill(&self, paint: &PaintSpec) -> Option<Fill> {
        for strategy in STRATEGIES {
            if !(strategy.applies)(paint) {
                continue;
            }
            if let Some(fill) = (strategy.resolve)(self, paint) {
                log::trace!("paint resolved by {} strategy", strategy.name);
                return Some(fill);
            }
        }
        None
    }

    /// Resolve a colour reference to `#RRGGBB`, concrete colours only.
    pub fn resolve_color(&self, spec: &ColorSpec) -> Option<String> {
        let base = match &spec.kind {
            ColorKind::Srgb(hex) => normalize_hex(hex),
            ColorKind::Scheme(name) => self.palette.lookup(name).map(str::to_string),
            ColorKind::System { last } => last.as_deref().and_then(normalize_hex),
            ColorKind::Preset(name) => preset_color(name).map(str::to_string),
        }?;
        Some(apply_luminance(&base, spec.lum_mod, spec.lum_off))
    }

    /// A solid fill carrying the colour's alpha as its opacity.
    pub fn resolve_solid(&self, spec: &ColorSpec) -> Option<Fill> {
        self.resolve_color(spec).map(|color| Fill::Solid {
            color,
            opacity: spec.opacity(),
        })
    }

    /// Outline colour of a line paint. Only solid paints carry a colour.
    pub fn resolve_stroke_color(&self, paint: &PaintSpec) -> Option<String> {
        match paint {
            PaintSpec::Solid(color) => self.resolve_color(color),
            PaintSpec::StyleRef { idx, color } if *idx > 0 => self.resolve_color(color),
            PaintSpec::Gradient { stops, .. } => {
                stops.first().and_then(|s| self.resolve_color(&s.color))
            }
            _ => None,
        }
    }
}

fn is_inline_color(paint: &PaintSpec) -> bool {
    matches!(paint, PaintSpec::Solid(ColorSpec { kind: ColorKind::Srgb(_), .. }))
}

fn resolve_inline(resolver: &FillResolver<'_>, paint: &PaintSpec) -> Option<Fill> {
    match paint {
        PaintSpec::Solid(color) => resolver.resolve_solid(color),
        _ => None,
    }
}

fn is_scheme_color(paint: &PaintSpec) -> bool {
    matches!(paint, PaintSpec::Solid(ColorSpec { kind: ColorKind::Scheme(_), .. }))
}

fn resolve_scheme(resolver: &FillResolver<'_>, paint: &PaintSpec) -> Option<Fill> {
    let PaintSpec::Solid(color) = paint else {
        return None;
    };
    let ColorKind::Scheme(name) = &color.kind else {
        return None;
    };
    Some(
        resolver
            .resolve_solid(color)
            .unwrap_or_else(|| Fill::UnresolvedTheme { name: name.clone() }),
    )
}

fn is_gradient(paint: &PaintSpec) -> bool {
    matches!(paint, PaintSpec::Gradient { .. })
}

fn resolve_gradient(resolver: &FillResolver<'_>, paint: &PaintSpec) -> Option<Fill> {
    let PaintSpec::Gradient { stops, angle } = paint else {
        return None;
    };
    let resolved: Vec<GradientStop> = stops
        .iter()
        .filter_map(|stop| {
            resolver.resolve_color(&stop.color).map(|color| GradientStop {
                offset: stop.offset.clamp(0.0, 1.0),
                color,
            })
        })
        .collect();
    let first = resolved.first()?.color.clone();
    match resolver.gradient_mode {
        GradientMode::Flat => Some(Fill::solid(first)),
        GradientMode::Full => Some(Fill::Gradient {
            stops: resolved,
            angle: *angle,
        }),
    }
}

fn is_inherited(paint: &PaintSpec) -> bool {
    match paint {
        PaintSpec::Group | PaintSpec::SlideBackground | PaintSpec::StyleRef { .. } => true,
        PaintSpec::Solid(color) => {
            matches!(color.kind, ColorKind::System { .. } | ColorKind::Preset(_))
        }
        _ => false,
    }
}

/// Force-resolve inherited paints to a concrete colour, or give up.
fn resolve_inherited(resolver: &FillResolver<'_>, paint: &PaintSpec) -> Option<Fill> {
    match paint {
        PaintSpec::Group => resolver.group_fill.clone(),
        PaintSpec::SlideBackground => match &resolver.background {
            Some(fill @ (Fill::Solid { .. } | Fill::Gradient { .. })) => Some(fill.clone()),
            _ => None,
        },
        PaintSpec::StyleRef { idx: 0, .. } => None,
        PaintSpec::StyleRef { color, .. } | PaintSpec::Solid(color) => resolver.resolve_solid(color),
        _ => None,
    }
}

fn preset_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "black" => "#000000",
        "white" => "#FFFFFF",
        "red" => "#FF0000",
        "green" => "#008000",
        "blue" => "#0000FF",
        "yellow" => "#FFFF00",
        "gray" | "grey" => "#808080",
        "orange" => "#FFA500",
        "purple" => "#800080",
        _ => return None,
    })
}

/// Apply `lumMod` / `lumOff` (thousandths of a percent) in HSL space.
pub fn apply_luminance(hex: &str, lum_mod: Option<i64>, lum_off: Option<i64>) -> String {
    if lum_mod.is_none() && lum_off.is_none() {
        return hex.to_string();
    }
    let Some((r, g, b)) = parse_rgb(hex) else {
        return hex.to_string();
    };
    let (h, s, l) = rgb_to_hsl(r, g, b);
    let modulated = l * lum_mod.unwrap_or(100_000) as f64 / 100_000.0
        + lum_off.unwrap_or(0) as f64 / 100_000.0;
    let (r, g, b) = hsl_to_rgb(h, s, modulated.clamp(0.0, 1.0));
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

fn parse_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f64| {
        let t = if t < 0.0 {
            t + 1.0
        } else if t > 1.0 {
            t - 1.0
        } else {
            t
        };
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::StopSpec;

    fn palette() -> ThemePalette {
        let mut palette = ThemePalette::new();
        palette.set_color("accent1", "4472C4");
        palette.set_color("lt1", "FFFFFF");
        palette
    }

    #[test]
    fn test_inline_color_is_normalized() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        let fill = resolver.resolve_fill(&PaintSpec::Solid(ColorSpec::srgb("ff8800")));
        assert_eq!(fill, Some(Fill::solid("#FF8800")));

        let mut darker = ColorSpec::srgb("ff0000");
        darker.lum_mod = Some(50_000);
        let fill = resolver.resolve_fill(&PaintSpec::Solid(darker));
        assert_eq!(fill, Some(Fill::solid("#800000")));
    }

    #[test]
    fn test_solid_alpha_becomes_opacity() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        let mut translucent = ColorSpec::scheme("accent1");
        translucent.alpha = Some(40_000);
        let fill = resolver.resolve_fill(&PaintSpec::Solid(translucent));
        assert_eq!(
            fill,
            Some(Fill::Solid {
                color: "#4472C4".to_string(),
                opacity: Some(0.4),
            })
        );
    }

    #[test]
    fn test_scheme_color_resolves_through_palette() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        let fill = resolver.resolve_fill(&PaintSpec::Solid(ColorSpec::scheme("accent1")));
        assert_eq!(fill, Some(Fill::solid("#4472C4")));
    }

    #[test]
    fn test_unknown_scheme_color_is_recorded_unresolved() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        let fill = resolver.resolve_fill(&PaintSpec::Solid(ColorSpec::scheme("accent6")));
        assert_eq!(
            fill,
            Some(Fill::UnresolvedTheme {
                name: "accent6".to_string()
            })
        );
    }

    #[test]
    fn test_gradient_full_and_flat() {
        let palette = palette();
        let paint = PaintSpec::Gradient {
            stops: vec![
                StopSpec {
                    offset: 0.0,
                    color: ColorSpec::srgb("000000"),
                },
                StopSpec {
                    offset: 1.0,
                    color: ColorSpec::scheme("accent1"),
                },
            ],
            angle: 90.0,
        };

        let full = FillResolver::new(&palette).resolve_fill(&paint);
        match full {
            Some(Fill::Gradient { stops, angle }) => {
                assert_eq!(stops.len(), 2);
                assert_eq!(stops[1].color, "#4472C4");
                assert_eq!(angle, 90.0);
            }
            other => panic!("expected gradient, got {:?}", other),
        }

        let flat = FillResolver::new(&palette)
            .with_gradient_mode(GradientMode::Flat)
            .resolve_fill(&paint);
        assert_eq!(flat, Some(Fill::solid("#000000")));
    }

    #[test]
    fn test_gradient_without_resolvable_stops_is_absent() {
        let palette = ThemePalette::new();
        let paint = PaintSpec::Gradient {
            stops: vec![StopSpec {
                offset: 0.0,
                color: ColorSpec::scheme("accent1"),
            }],
            angle: 0.0,
        };
        assert_eq!(FillResolver::new(&palette).resolve_fill(&paint), None);
    }

    #[test]
    fn test_inherited_paints() {
        let palette = palette();
        let resolver = FillResolver::new(&palette).with_background(Some(Fill::solid("#101010")));
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::SlideBackground),
            Some(Fill::solid("#101010"))
        );
        assert_eq!(resolver.resolve_fill(&PaintSpec::Group), None);
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::StyleRef {
                idx: 1,
                color: ColorSpec::scheme("accent1")
            }),
            Some(Fill::solid("#4472C4"))
        );
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::StyleRef {
                idx: 0,
                color: ColorSpec::scheme("accent1")
            }),
            None
        );
        // Style references never fall back to an unresolved theme record.
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::StyleRef {
                idx: 2,
                color: ColorSpec::scheme("accent4")
            }),
            None
        );
    }

    #[test]
    fn test_no_fill_and_blip_are_absent() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        assert_eq!(resolver.resolve_fill(&PaintSpec::NoFill), None);
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::Blip {
                rel_id: "rId2".to_string()
            }),
            None
        );
    }

    #[test]
    fn test_system_and_preset_colors() {
        let palette = palette();
        let resolver = FillResolver::new(&palette);
        let system = ColorSpec::new(ColorKind::System {
            last: Some("000000".to_string()),
        });
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::Solid(system)),
            Some(Fill::solid("#000000"))
        );
        let preset = ColorSpec::new(ColorKind::Preset("white".to_string()));
        assert_eq!(
            resolver.resolve_fill(&PaintSpec::Solid(preset)),
            Some(Fill::solid("#FFFFFF"))
        );
    }

    #[test]
    fn test_apply_luminance() {
        assert_eq!(apply_luminance("#FFFFFF", Some(50_000), None), "#808080");
        assert_eq!(apply_luminance("#000000", None, Some(100_000)), "#FFFFFF");
        assert_eq!(apply_luminance("#4472C4", None, None), "#4472C4");
    }
}
