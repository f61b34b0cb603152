//! Rich-text markup codec.
//!
//! Formatted documents are stored as an HTML rich-text serialization. Only
//! document content survives a conversion to plain text; styling is dropped.
//! The decoder is deliberately small: it understands the subset of HTML that
//! rich-text editors emit (paragraph blocks, inline spans, `<br />`,
//! character references) and reports anything it cannot make sense of as a
//! [`CorruptFormatError`] instead of guessing.

use std::fmt;

const DOCTYPE: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.0//EN" "http://www.w3.org/TR/REC-html40/strict.dtd">"#;

const HEAD: &str = concat!(
    "<html><head><meta name=\"qrichtext\" content=\"1\" />",
    "<style type=\"text/css\">\np, li { white-space: pre-wrap; }\n</style>",
    "</head><body>\n"
);

const TAIL: &str = "</body></html>";

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "hr", "img", "input", "link", "meta", "wbr",
];

/// Elements that start a new line of plain text.
const BLOCK_ELEMENTS: &[&str] = &[
    "blockquote", "dd", "div", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "li", "p", "pre", "tr",
];

/// Elements whose text is never document content.
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "title"];

/// Elements whose body is raw text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

/// Markup that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptFormatError {
    message: String,
    offset: usize,
}

impl CorruptFormatError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Byte offset in the input where decoding gave up.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CorruptFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "corrupt formatted document at byte {}: {}",
            self.offset, self.message
        )
    }
}

impl std::error::Error for CorruptFormatError {}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Whether `content` is a complete markup document rather than plain text.
///
/// Both ends are checked: text that merely opens with `<html>` is still
/// plain text.
pub fn is_markup(content: &str) -> bool {
    starts_with_markup(content) && ends_with_ignore_case(content.trim_end(), "</html>")
}

/// Whether `content` opens with a doctype or `<html>` tag.
pub(crate) fn starts_with_markup(content: &str) -> bool {
    let head = content.trim_start();
    starts_with_ignore_case(head, "<!doctype") || starts_with_ignore_case(head, "<html")
}

/// Wrap plain text in a minimal rich-text envelope.
///
/// Every line becomes one paragraph; empty lines become `<p><br /></p>` as
/// rich-text editors write them.
pub fn convert_to_formatted(plain: &str) -> String {
    let mut out = String::with_capacity(plain.len() + DOCTYPE.len() + HEAD.len() + 64);
    out.push_str(DOCTYPE);
    out.push('\n');
    out.push_str(HEAD);
    for line in plain.split('\n') {
        if line.is_empty() {
            out.push_str("<p><br /></p>\n");
        } else {
            out.push_str("<p>");
            escape_into(&mut out, line);
            out.push_str("</p>\n");
        }
    }
    out.push_str(TAIL);
    out
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push('\t'),
            c if c.is_control() => {
                out.push_str("&#");
                out.push_str(&(c as u32).to_string());
                out.push(';');
            }
            c => out.push(c),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Strip markup and return the document's text.
///
/// Input that is not a complete markup document (see [`is_markup`]) is
/// returned unchanged, so converting plain content is a no-op.
pub fn convert_to_plain(formatted: &str) -> Result<String, CorruptFormatError> {
    if !is_markup(formatted) {
        return Ok(formatted.to_string());
    }
    decode_markup(formatted)
}

/// Decode content known to be markup, such as a `.lef` file.
///
/// Unlike [`convert_to_plain`] nothing is inferred from the content: every
/// `<` is read as markup.
pub fn decode_markup(markup: &str) -> Result<String, CorruptFormatError> {
    Decoder::new(markup).run()
}

/// Check that formatted content decodes, discarding the text.
pub fn validate_formatted(markup: &str) -> Result<(), CorruptFormatError> {
    decode_markup(markup).map(|_| ())
}

/// A line of output under construction.
#[derive(Debug, Default)]
struct Line {
    text: String,
    has_text: bool,
    breaks: usize,
}

impl Line {
    fn is_blank(&self) -> bool {
        self.breaks == 0 && self.text.chars().all(char::is_whitespace)
    }

    /// A `<br />` that is the only content of its block is a placeholder
    /// for an empty paragraph, not a line break.
    fn finish(mut self) -> String {
        if !self.has_text && self.breaks > 0 {
            self.text.pop();
        }
        self.text
    }
}

struct Decoder<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<String>,
    lines: Vec<String>,
    current: Option<Line>,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            lines: Vec::new(),
            current: None,
        }
    }

    fn run(mut self) -> Result<String, CorruptFormatError> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            if rest.starts_with('<') {
                self.markup()?;
            } else {
                let end = rest.find('<').map_or(self.input.len(), |p| self.pos + p);
                let text = decode_entities(&self.input[self.pos..end], self.pos)?;
                self.text(&text);
                self.pos = end;
            }
        }

        while let Some(name) = self.stack.pop() {
            self.closed(&name);
        }
        if let Some(line) = self.current.take() {
            self.lines.push(line.finish());
        }
        Ok(self.lines.join("\n"))
    }

    fn markup(&mut self) -> Result<(), CorruptFormatError> {
        let start = self.pos;
        let rest = &self.input[start..];

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .ok_or_else(|| CorruptFormatError::new("unterminated comment", start))?;
            self.pos = start + 4 + end + 3;
            return Ok(());
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest
                .find('>')
                .ok_or_else(|| CorruptFormatError::new("unterminated declaration", start))?;
            self.pos = start + end + 1;
            return Ok(());
        }

        match rest[1..].chars().next() {
            Some(c) if c.is_ascii_alphabetic() || c == '/' => {}
            _ => return Err(CorruptFormatError::new("stray '<' in text", start)),
        }

        let end = find_tag_end(rest)
            .ok_or_else(|| CorruptFormatError::new("unterminated tag", start))?;
        let tag = parse_tag(&rest[1..end], start)?;
        self.pos = start + end + 1;

        if tag.closing {
            self.close(&tag.name, start)
        } else {
            self.open(tag)
        }
    }

    fn open(&mut self, tag: Tag) -> Result<(), CorruptFormatError> {
        let name = tag.name.as_str();
        if name == "br" {
            if !self.suppressed() {
                let line = self.current.get_or_insert_with(Line::default);
                line.text.push('\n');
                line.breaks += 1;
            }
            return Ok(());
        }
        if name == "hr" {
            self.end_line();
            return Ok(());
        }
        if VOID_ELEMENTS.contains(&name) || tag.self_closing {
            return Ok(());
        }

        if BLOCK_ELEMENTS.contains(&name) && !self.suppressed() {
            match self.current.take() {
                Some(line) if !line.is_blank() => self.lines.push(line.finish()),
                _ => {}
            }
            self.current = Some(Line::default());
        }

        if RAW_TEXT_ELEMENTS.contains(&name) {
            let close = format!("</{}", name);
            let offset = find_ignore_case(&self.input[self.pos..], &close).ok_or_else(|| {
                CorruptFormatError::new(format!("unterminated <{}>", name), self.pos)
            })?;
            self.pos += offset;
        }

        self.stack.push(tag.name);
        Ok(())
    }

    fn close(&mut self, name: &str, offset: usize) -> Result<(), CorruptFormatError> {
        if VOID_ELEMENTS.contains(&name) {
            return Ok(());
        }
        let index = self
            .stack
            .iter()
            .rposition(|open| open == name)
            .ok_or_else(|| {
                CorruptFormatError::new(format!("unexpected closing tag </{}>", name), offset)
            })?;
        // Elements left open inside this one are closed implicitly.
        while self.stack.len() > index {
            if let Some(open) = self.stack.pop() {
                self.closed(&open);
            }
        }
        Ok(())
    }

    fn closed(&mut self, name: &str) {
        if BLOCK_ELEMENTS.contains(&name) && !self.suppressed() {
            if let Some(line) = self.current.take() {
                self.lines.push(line.finish());
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.suppressed() {
            return;
        }
        match self.current.as_mut() {
            Some(line) => {
                line.text.push_str(text);
                line.has_text = true;
            }
            None if text.chars().all(char::is_whitespace) => {}
            None => {
                self.current = Some(Line {
                    text: text.to_string(),
                    has_text: true,
                    breaks: 0,
                });
            }
        }
    }

    fn end_line(&mut self) {
        if let Some(line) = self.current.take() {
            if !line.is_blank() {
                self.lines.push(line.finish());
            }
        }
    }

    fn suppressed(&self) -> bool {
        self.stack
            .iter()
            .any(|open| HIDDEN_ELEMENTS.contains(&open.as_str()))
    }
}

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
}

/// Index of the `>` ending the tag that starts `rest`, skipping quoted
/// attribute values.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            (None, _) => {}
        }
    }
    None
}

fn parse_tag(inner: &str, offset: usize) -> Result<Tag, CorruptFormatError> {
    let inner = inner.trim();
    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body.trim_start()),
        None => (false, inner),
    };
    let self_closing = body.ends_with('/');
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if name.is_empty() {
        return Err(CorruptFormatError::new("empty tag name", offset));
    }
    Ok(Tag {
        name,
        closing,
        self_closing,
    })
}

fn decode_entities(raw: &str, offset: usize) -> Result<String, CorruptFormatError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';').filter(|&i| i <= 32);
        let Some(semi) = semi else {
            // A bare ampersand is text.
            out.push('&');
            rest = after;
            continue;
        };
        let name = &after[..semi];
        let at = offset + (raw.len() - rest.len()) + amp;
        match name {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            "nbsp" => out.push('\u{a0}'),
            _ if name.starts_with('#') => out.push(decode_char_ref(&name[1..], at)?),
            _ => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_char_ref(digits: &str, offset: usize) -> Result<char, CorruptFormatError> {
    let hex = digits
        .strip_prefix('x')
        .or_else(|| digits.strip_prefix('X'));
    let value = match hex {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse::<u32>(),
    };
    value
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| CorruptFormatError::new("invalid character reference", offset))
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.as_bytes()[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
