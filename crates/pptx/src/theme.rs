//! Theme colour scheme, font scheme and master colour map.

use crate::xml::XmlElement;
use slide_core::ThemePalette;

/// Build a palette from a theme part and the master's `p:clrMap`.
pub fn palette_from(theme: Option<&XmlElement>, master: Option<&XmlElement>) -> ThemePalette {
    let mut palette = ThemePalette::new();

    if let Some(elements) = theme.and_then(|t| t.child("themeElements")) {
        if let Some(scheme) = elements.child("clrScheme") {
            for slot in scheme.elements() {
                if !ThemePalette::is_scheme_slot(&slot.name) {
                    continue;
                }
                let hex = slot.elements().find_map(|color| match color.name.as_str() {
                    "srgbClr" => color.attr("val"),
                    "sysClr" => color.attr("lastClr"),
                    _ => None,
                });
                if let Some(hex) = hex {
                    palette.set_color(&slot.name, hex);
                }
            }
        }

        if let Some(fonts) = elements.child("fontScheme") {
            palette.major_font = latin_typeface(fonts.child("majorFont"));
            palette.minor_font = latin_typeface(fonts.child("minorFont"));
        }
    }

    if let Some(map) = master.and_then(|m| m.child("clrMap")) {
        for (name, slot) in &map.attrs {
            if !name.contains(':') {
                palette.set_alias(name, slot);
            }
        }
    }

    palette
}

fn latin_typeface(font: Option<&XmlElement>) -> Option<String> {
    font.and_then(|f| f.child("latin"))
        .and_then(|latin| latin.attr("typeface"))
        .filter(|face| !face.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME: &str = r#"<a:theme xmlns:a="a">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
    </a:clrScheme>
    <a:fontScheme name="Office">
      <a:majorFont><a:latin typeface="Calibri Light"/></a:majorFont>
      <a:minorFont><a:latin typeface="Calibri"/></a:minorFont>
    </a:fontScheme>
  </a:themeElements>
</a:theme>"#;

    #[test]
    fn test_palette_from_theme() {
        let theme = XmlElement::parse(THEME).unwrap();
        let palette = palette_from(Some(&theme), None);
        assert_eq!(palette.lookup("accent1"), Some("#4472C4"));
        assert_eq!(palette.lookup("tx1"), Some("#000000"));
        assert_eq!(palette.lookup("bg1"), Some("#FFFFFF"));
        assert_eq!(palette.major_font.as_deref(), Some("Calibri Light"));
        assert_eq!(palette.minor_font.as_deref(), Some("Calibri"));
    }

    #[test]
    fn test_master_color_map_overrides_aliases() {
        let theme = XmlElement::parse(THEME).unwrap();
        let master = XmlElement::parse(
            r#"<p:sldMaster xmlns:p="p"><p:clrMap bg1="dk1" tx1="lt1"/></p:sldMaster>"#,
        )
        .unwrap();
        let palette = palette_from(Some(&theme), Some(&master));
        assert_eq!(palette.lookup("bg1"), Some("#000000"));
        assert_eq!(palette.lookup("tx1"), Some("#FFFFFF"));
    }

    #[test]
    fn test_missing_theme_gives_empty_palette() {
        let palette = palette_from(None, None);
        assert_eq!(palette.lookup("accent1"), None);
        assert!(palette.major_font.is_none());
    }
}
