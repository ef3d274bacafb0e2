//! A small streaming scanner over HTML fragments.
//!
//! Yields start tags, end tags and text with their byte spans in the source,
//! so consumers can either rebuild the markup or splice into it in place.
//! Comments, doctypes and processing instructions are skipped; the body of
//! `script` and `style` is passed through as a single text token.

use slide_core::{Error, Result};
use std::ops::Range;

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// An attribute as written; `value` is entity-decoded, `None` for bare flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    StartTag {
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
        span: Range<usize>,
    },
    EndTag {
        name: String,
        span: Range<usize>,
    },
    Text {
        raw: &'a str,
        span: Range<usize>,
    },
}

impl Token<'_> {
    pub fn span(&self) -> Range<usize> {
        match self {
            Token::StartTag { span, .. } | Token::EndTag { span, .. } | Token::Text { span, .. } => {
                span.clone()
            }
        }
    }
}

/// Look up an attribute value by (lower-case) name.
pub fn attr<'a>(attrs: &'a [Attr], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name == name)
        .and_then(|a| a.value.as_deref())
}

/// Iterator over the tokens of a fragment.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    raw_text_end_tag: Option<String>,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text_end_tag: None,
            failed: false,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    /// Whether a `<` at `at` opens markup rather than being literal text.
    fn opens_markup(&self, at: usize) -> bool {
        match self.bytes().get(at + 1) {
            Some(b'!') | Some(b'?') => true,
            Some(b'/') => self.bytes().get(at + 2).is_some_and(u8::is_ascii_alphabetic),
            Some(c) => c.is_ascii_alphabetic(),
            None => false,
        }
    }

    fn find_from(&self, at: usize, needle: &str) -> Option<usize> {
        self.src[at..].find(needle).map(|i| at + i)
    }

    fn scan_raw_text(&mut self, end_tag: String) -> Option<Token<'a>> {
        let start = self.pos;
        let needle = format!("</{}", end_tag);
        let lower = self.src[start..].to_ascii_lowercase();
        let end = lower.find(&needle).map(|i| start + i).unwrap_or(self.src.len());
        self.pos = end;
        if end == start {
            return None;
        }
        Some(Token::Text {
            raw: &self.src[start..end],
            span: start..end,
        })
    }

    fn scan_text(&mut self) -> Token<'a> {
        let start = self.pos;
        let mut end = self.src.len();
        let mut at = start + 1;
        while let Some(offset) = self.bytes()[at.min(end)..].iter().position(|&b| b == b'<') {
            at += offset;
            if self.opens_markup(at) {
                end = at;
                break;
            }
            at += 1;
        }
        self.pos = end;
        Token::Text {
            raw: &self.src[start..end],
            span: start..end,
        }
    }

    /// Skip `<!-- -->`, `<!...>` and `<?...>`.
    fn skip_declaration(&mut self) -> Result<()> {
        let start = self.pos;
        let (terminator, what) = if self.src[start..].starts_with("<!--") {
            ("-->", "comment")
        } else {
            (">", "declaration")
        };
        let end = self
            .find_from(start + 2, terminator)
            .ok_or_else(|| Error::markup(start, format!("unterminated {}", what)))?;
        self.pos = end + terminator.len();
        Ok(())
    }

    fn scan_name(&mut self) -> String {
        let start = self.pos;
        while let Some(&c) = self.bytes().get(self.pos) {
            if c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        while self.bytes().get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn scan_end_tag(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        self.pos += 2;
        let name = self.scan_name();
        let close = self
            .find_from(self.pos, ">")
            .ok_or_else(|| Error::markup(start, format!("unterminated end tag </{}", name)))?;
        self.pos = close + 1;
        Ok(Token::EndTag {
            name,
            span: start..self.pos,
        })
    }

    fn scan_start_tag(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        self.pos += 1;
        let name = self.scan_name();
        let unterminated = || Error::markup(start, format!("unterminated tag <{}", name));

        let mut attrs = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            match self.bytes().get(self.pos) {
                None => return Err(unterminated()),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.bytes().get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        break true;
                    }
                }
                Some(_) => attrs.push(self.scan_attr().ok_or_else(unterminated)?),
            }
        };

        if !self_closing && is_raw_text(&name) {
            self.raw_text_end_tag = Some(name.clone());
        }

        Ok(Token::StartTag {
            name,
            attrs,
            self_closing,
            span: start..self.pos,
        })
    }

    /// One attribute; `None` when the input ends inside a quoted value.
    fn scan_attr(&mut self) -> Option<Attr> {
        let name_start = self.pos;
        while let Some(&c) = self.bytes().get(self.pos) {
            if c.is_ascii_whitespace() || matches!(c, b'=' | b'>' | b'/') {
                break;
            }
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_ascii_lowercase();

        self.skip_whitespace();
        if self.bytes().get(self.pos) != Some(&b'=') {
            return Some(Attr { name, value: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let raw = match self.bytes().get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let close = self.src[value_start..].find(quote as char)? + value_start;
                self.pos = close + 1;
                &self.src[value_start..close]
            }
            _ => {
                let value_start = self.pos;
                while let Some(&c) = self.bytes().get(self.pos) {
                    if c.is_ascii_whitespace() || c == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                &self.src[value_start..self.pos]
            }
        };

        Some(Attr {
            name,
            value: Some(decode_entities(raw)),
        })
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(end_tag) = self.raw_text_end_tag.take() {
                if let Some(text) = self.scan_raw_text(end_tag) {
                    return Some(Ok(text));
                }
            }
            if self.pos >= self.src.len() {
                return None;
            }

            let result = if self.bytes()[self.pos] != b'<' || !self.opens_markup(self.pos) {
                Ok(self.scan_text())
            } else {
                match self.bytes()[self.pos + 1] {
                    b'!' | b'?' => match self.skip_declaration() {
                        Ok(()) => continue,
                        Err(e) => Err(e),
                    },
                    b'/' => self.scan_end_tag(),
                    _ => self.scan_start_tag(),
                }
            };

            if result.is_err() {
                self.failed = true;
            }
            return Some(result);
        }
    }
}

/// Scan a whole fragment, failing on the first unterminated construct.
pub fn scan(src: &str) -> Result<Vec<Token<'_>>> {
    Scanner::new(src).collect()
}

/// Decode the named entities the renderer emits plus numeric references.
/// Unknown entities are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "bull" => '•',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_tags_and_text() {
        let src = r#"<div class="a b" data-x='1'>Hi <b>there</b><img src="x.png"/></div>"#;
        let tokens = scan(src).unwrap();
        assert_eq!(tokens.len(), 7);

        match &tokens[0] {
            Token::StartTag {
                name,
                attrs,
                self_closing,
                span,
            } => {
                assert_eq!(name, "div");
                assert_eq!(attr(attrs, "class"), Some("a b"));
                assert_eq!(attr(attrs, "data-x"), Some("1"));
                assert!(!self_closing);
                assert_eq!(&src[span.clone()], r#"<div class="a b" data-x='1'>"#);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&tokens[1], Token::Text { raw: "Hi ", .. }));
        assert!(matches!(&tokens[5], Token::StartTag { self_closing: true, .. }));
        assert!(matches!(&tokens[6], Token::EndTag { name, .. } if name == "div"));
    }

    #[test]
    fn test_comments_and_doctype_are_skipped() {
        let tokens = scan("<!DOCTYPE html><!-- note --><p>x</p>").unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_literal_less_than_is_text() {
        let tokens = scan("<p>a < b</p>").unwrap();
        assert!(matches!(&tokens[1], Token::Text { raw: "a < b", .. }));
    }

    #[test]
    fn test_style_body_is_raw_text() {
        let tokens = scan("<style>p > a { color: red }</style><p>x</p>").unwrap();
        assert!(matches!(&tokens[1], Token::Text { raw: "p > a { color: red }", .. }));
        assert!(matches!(&tokens[2], Token::EndTag { name, .. } if name == "style"));
    }

    #[test]
    fn test_bare_and_unquoted_attributes() {
        let tokens = scan("<input disabled value=abc>").unwrap();
        let Token::StartTag { attrs, .. } = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(attrs[0], Attr { name: "disabled".to_string(), value: None });
        assert_eq!(attr(attrs, "value"), Some("abc"));
    }

    #[test]
    fn test_unterminated_constructs_are_errors() {
        assert!(matches!(scan("<div class=\"a"), Err(Error::Markup { offset: 0, .. })));
        assert!(scan("<p>x</p><!-- open").is_err());
        assert!(scan("<p>x</p").is_err());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#39;x&#x41;"), "'xA");
        assert_eq!(decode_entities("&unknown; & done"), "&unknown; & done");
    }
}
