//! Text decoding and entry-name helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding {
        if let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes()) {
            let (result, _, _) = encoding.decode(bytes);
            return result;
        }
    }

    // Fallback: Windows-1252 (superset of ISO-8859-1)
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract encoding from an XML declaration (`<?xml ... encoding="..."?>`).
///
/// Only the first ~100 bytes are checked.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_start = 1;
    let value_end = after_enc[value_start..].iter().position(|&b| b == quote)? + value_start;

    std::str::from_utf8(&after_enc[value_start..value_end]).ok()
}

/// Strip UTF-8 BOM (byte order mark) if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Final path component of an entry name ("text/ch1.xhtml" -> "ch1.xhtml").
pub fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Basename with its extension removed ("text/ch1.xhtml" -> "ch1").
pub fn basename_noext(name: &str) -> &str {
    let base = basename(name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(pos) => &base[..pos],
    }
}

/// Normalize an entry name: resolve `.`/`..` segments, drop empty ones.
pub fn normalize_name(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_cp1252_fallback() {
        // 0xE9 is 'é' in Windows-1252 but malformed UTF-8
        assert_eq!(decode_text(&[b'h', 0xE9], None), "hé");
    }

    #[test]
    fn test_extract_xml_encoding() {
        let xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?><html/>"#;
        assert_eq!(extract_xml_encoding(xml), Some("ISO-8859-1"));
        assert_eq!(extract_xml_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("text/ch1.xhtml"), "ch1.xhtml");
        assert_eq!(basename("ch1.xhtml"), "ch1.xhtml");
        assert_eq!(basename_noext("text/ch1.xhtml"), "ch1");
        assert_eq!(basename_noext("text/noext"), "noext");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("text/../images/qr.png"), "images/qr.png");
        assert_eq!(normalize_name("./a/b"), "a/b");
        assert_eq!(normalize_name("a//b"), "a/b");
    }
}
