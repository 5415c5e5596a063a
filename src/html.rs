//! Minimal streaming HTML start-tag scanner.
//!
//! Publisher pages and the proxy login page are only ever searched for a few
//! start tags (`<meta>`, `<a>`, `<form>`, `<input>`) and their attributes, so
//! there is no tree: [`TagScanner`] consumes the body chunk by chunk as it
//! arrives and hands back every complete start tag. Comments are skipped,
//! quoted attribute values may contain `>`, and a tag split across chunks is
//! carried over.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex is valid") // Static pattern, safe to panic
});

/// One start tag with lowercased name and attribute keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl StartTag {
    /// Returns the first value of attribute `name`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if the whitespace-separated `class` list contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Text,
    Tag { quote: Option<u8> },
    Comment,
}

/// Incremental start-tag scanner.
#[derive(Debug)]
pub struct TagScanner {
    state: ScanState,
    pending: Vec<u8>,
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TagScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ScanState::Text,
            pending: Vec::new(),
        }
    }

    /// Consumes the next chunk and returns the start tags it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StartTag> {
        let mut tags = Vec::new();

        for &byte in chunk {
            match self.state {
                ScanState::Text => {
                    if byte == b'<' {
                        self.pending.clear();
                        self.state = ScanState::Tag { quote: None };
                    }
                }
                ScanState::Tag { quote: Some(open) } => {
                    self.pending.push(byte);
                    if byte == open {
                        self.state = ScanState::Tag { quote: None };
                    }
                }
                ScanState::Tag { quote: None } => {
                    if byte == b'>' {
                        if let Some(tag) = parse_tag(&self.pending) {
                            tags.push(tag);
                        }
                        self.state = ScanState::Text;
                        continue;
                    }
                    if byte == b'<' {
                        // The previous `<` was stray text.
                        self.pending.clear();
                        continue;
                    }
                    self.pending.push(byte);
                    if self.pending == b"!--" {
                        self.state = ScanState::Comment;
                    } else if (byte == b'"' || byte == b'\'') && self.in_attribute_value() {
                        self.state = ScanState::Tag { quote: Some(byte) };
                    }
                }
                ScanState::Comment => {
                    self.pending.push(byte);
                    if self.pending.ends_with(b"-->") {
                        self.pending.clear();
                        self.state = ScanState::Text;
                    }
                }
            }
        }

        tags
    }

    /// A quote only opens a value right after `=` (ignoring whitespace).
    fn in_attribute_value(&self) -> bool {
        self.pending[..self.pending.len() - 1]
            .iter()
            .rev()
            .find(|b| !b.is_ascii_whitespace())
            == Some(&b'=')
    }
}

/// Scans a complete document.
#[must_use]
pub fn scan_start_tags(html: &str) -> Vec<StartTag> {
    TagScanner::new().feed(html.as_bytes())
}

fn parse_tag(raw: &[u8]) -> Option<StartTag> {
    let raw = String::from_utf8_lossy(raw);
    let name_len = raw
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(raw.len());
    if name_len == 0 {
        // End tags, doctype, processing instructions, stray `<`.
        return None;
    }

    let attrs = ATTR_PATTERN
        .captures_iter(&raw[name_len..])
        .map(|caps| {
            let key = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (key, decode_entities(value))
        })
        .collect();

    Some(StartTag {
        name: raw[..name_len].to_ascii_lowercase(),
        attrs,
    })
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
