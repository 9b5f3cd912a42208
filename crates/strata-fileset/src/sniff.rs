//! Content-type detection from the leading bytes of a file.

/// Number of leading bytes considered.
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"\x00asm", "application/wasm"),
];

const MARKUP: &[(&[u8], &str)] = &[
    (b"<!doctype html", "text/html; charset=utf-8"),
    (b"<html", "text/html; charset=utf-8"),
    (b"<head", "text/html; charset=utf-8"),
    (b"<body", "text/html; charset=utf-8"),
    (b"<?xml", "text/xml; charset=utf-8"),
];

/// Guess a MIME type from at most [`SNIFF_LEN`] leading bytes.
///
/// Empty content counts as text.
pub fn detect_content_type(head: &[u8]) -> &'static str {
    let head = &head[..head.len().min(SNIFF_LEN)];

    for &(magic, mime) in SIGNATURES {
        if head.starts_with(magic) {
            return mime;
        }
    }

    let trimmed = trim_leading_whitespace(head);
    for &(tag, mime) in MARKUP {
        if starts_with_ignore_case(trimmed, tag) {
            return mime;
        }
    }

    if head.starts_with(b"\xEF\xBB\xBF") || !head.iter().any(|&b| is_binary_byte(b)) {
        return TEXT_PLAIN;
    }
    OCTET_STREAM
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text() {
        assert_eq!(detect_content_type(b"foo"), TEXT_PLAIN);
        assert_eq!(detect_content_type(b"line one\nline two\r\n\ttabbed"), TEXT_PLAIN);
        assert_eq!(detect_content_type("héllo wörld".as_bytes()), TEXT_PLAIN);
    }

    #[test]
    fn empty_is_text() {
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
    }

    #[test]
    fn binary_falls_back_to_octet_stream() {
        assert_eq!(detect_content_type(&[0x00, 0x01, 0x02, 0xFF]), OCTET_STREAM);
    }

    #[test]
    fn magic_signatures() {
        assert_eq!(detect_content_type(b"%PDF-1.7 ..."), "application/pdf");
        assert_eq!(detect_content_type(b"\x89PNG\r\n\x1a\n\0\0"), "image/png");
        assert_eq!(detect_content_type(b"\x1F\x8B\x08\0\0"), "application/x-gzip");
        assert_eq!(detect_content_type(b"GIF89a...."), "image/gif");
    }

    #[test]
    fn markup_is_case_insensitive_after_whitespace() {
        assert_eq!(detect_content_type(b"  \n<!DOCTYPE HTML><p>"), "text/html; charset=utf-8");
        assert_eq!(detect_content_type(b"<?xml version=\"1.0\"?>"), "text/xml; charset=utf-8");
    }

    #[test]
    fn only_leading_window_is_considered() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), TEXT_PLAIN);
    }
}
