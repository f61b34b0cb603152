//! Document formats for Leaf
//!
//! A document is either plain text or formatted rich-text markup stored
//! with the `.lef` extension. This module decides which, normalizes file
//! extensions, and converts content between the two representations.

mod format;
mod markup;

pub use format::{classify_format, normalize_extension, Format, FORMATTED_EXTENSION, PLAIN_EXTENSION};
pub use markup::{
    convert_to_formatted, convert_to_plain, decode_markup, is_markup, validate_formatted,
    CorruptFormatError,
};

/// Serialize an editor buffer held in `source` format for storage as `target`.
///
/// A plain buffer saved as plain is written verbatim, whatever it looks
/// like. A formatted buffer is decoded when saving as plain, and a plain one
/// is wrapped when saving as formatted. A formatted buffer that holds bare
/// text rather than markup is wrapped too.
pub fn serialize_for(
    content: &str,
    source: Format,
    target: Format,
) -> Result<String, CorruptFormatError> {
    match (source, target) {
        (Format::Plain, Format::Plain) => Ok(content.to_string()),
        (Format::Formatted, Format::Plain) => decode_markup(content),
        (Format::Formatted, Format::Formatted) if markup::starts_with_markup(content) => {
            validate_formatted(content)?;
            Ok(content.to_string())
        }
        (_, Format::Formatted) => Ok(convert_to_formatted(content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_plain_as_formatted_wraps() {
        let out = serialize_for("hello", Format::Plain, Format::Formatted).unwrap();
        assert!(is_markup(&out));
        assert_eq!(convert_to_plain(&out).unwrap(), "hello");
    }

    #[test]
    fn test_serialize_plain_html_as_formatted_wraps() {
        let page = "<html><body><p>page</p></body></html>";
        let out = serialize_for(page, Format::Plain, Format::Formatted).unwrap();
        assert_eq!(decode_markup(&out).unwrap(), page);
    }

    #[test]
    fn test_serialize_plain_as_plain_is_verbatim() {
        for text in [
            "<!DOCTYPE html>\n<html><body><h1>Title</h1><p>para</p></body></html>",
            "<html> is a tag, and 1 < 2",
            "plain",
        ] {
            assert_eq!(serialize_for(text, Format::Plain, Format::Plain).unwrap(), text);
        }
    }

    #[test]
    fn test_serialize_markup_as_formatted_passes_through() {
        let markup = convert_to_formatted("a\nb");
        assert_eq!(
            serialize_for(&markup, Format::Formatted, Format::Formatted).unwrap(),
            markup
        );
    }

    #[test]
    fn test_serialize_bare_text_as_formatted_wraps() {
        let out = serialize_for("a\nb", Format::Formatted, Format::Formatted).unwrap();
        assert_eq!(decode_markup(&out).unwrap(), "a\nb");
    }

    #[test]
    fn test_serialize_markup_as_plain_strips() {
        let markup = convert_to_formatted("a\nb");
        assert_eq!(
            serialize_for(&markup, Format::Formatted, Format::Plain).unwrap(),
            "a\nb"
        );
    }

    #[test]
    fn test_serialize_rejects_corrupt_markup() {
        let formatted = |s: &str| serialize_for(s, Format::Formatted, Format::Formatted);
        assert!(formatted("<html><body><p>oops").is_ok());
        assert!(formatted("<html><body></div>").is_err());
        assert!(serialize_for("<html><body></div>", Format::Formatted, Format::Plain).is_err());
    }
}
