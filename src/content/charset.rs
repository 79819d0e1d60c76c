use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};

use crate::{TaskError, TaskResult};

/// Number of leading bytes inspected when sniffing a page's encoding
const PRESCAN_LEN: usize = 1024;

/// Picks the character encoding of an HTML body
///
/// The declared `charset` parameter wins when it names a known encoding.
/// Otherwise the body is sniffed (see [`sniff_encoding`]).
///
/// Returns the encoding and the length of a byte order mark to skip.
pub fn resolve_encoding(charset: Option<&str>, body: &[u8]) -> Option<(&'static Encoding, usize)> {
    if let Some(encoding) = charset.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        let bom = match Encoding::for_bom(body) {
            Some((bom_encoding, len)) if bom_encoding == encoding => len,
            _ => 0,
        };
        return Some((encoding, bom));
    }

    sniff_encoding(body)
}

/// Sniffs the encoding of an HTML body without a declared charset
///
/// In order: a byte order mark, a `<meta>` charset declaration within the
/// first kilobyte, then a check that the first kilobyte is valid UTF-8.
pub fn sniff_encoding(body: &[u8]) -> Option<(&'static Encoding, usize)> {
    if let Some(found) = Encoding::for_bom(body) {
        return Some(found);
    }

    let head = &body[..body.len().min(PRESCAN_LEN)];

    if let Some(encoding) = prescan_meta(head) {
        return Some((encoding, 0));
    }

    match std::str::from_utf8(head) {
        Ok(_) => Some((UTF_8, 0)),
        // A multi-byte sequence cut off at the prescan boundary
        Err(e) if e.error_len().is_none() => Some((UTF_8, 0)),
        Err(_) => None,
    }
}

/// Decodes an HTML body to UTF-8 text and resolves character references
///
/// Bodies already in UTF-8 are not transcoded; stray invalid sequences are
/// replaced. Any other encoding must decode cleanly.
pub fn decode_page(url: &str, body: &[u8], charset: Option<&str>) -> TaskResult<String> {
    let (encoding, bom) = resolve_encoding(charset, body).ok_or_else(|| {
        TaskError::CharsetDetection {
            url: url.to_string(),
        }
    })?;
    let bytes = &body[bom..];

    let text: Cow<'_, str> = if encoding == UTF_8 {
        String::from_utf8_lossy(bytes)
    } else {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| TaskError::Decode {
                url: url.to_string(),
                encoding: encoding.name(),
            })?
    };

    Ok(html_escape::decode_html_entities(&text).into_owned())
}

fn prescan_meta(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut pos = 0;

    while let Some(offset) = find(&lower[pos..], b"<meta") {
        let start = pos + offset + b"<meta".len();
        let end = lower[start..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(lower.len(), |e| start + e);

        if let Some(encoding) = charset_attribute(&lower[start..end]).and_then(Encoding::for_label) {
            return Some(meta_override(encoding));
        }

        pos = end;
    }

    None
}

/// Pulls the label out of `charset=...`, quoted or not
fn charset_attribute(tag: &[u8]) -> Option<&[u8]> {
    let idx = find(tag, b"charset")?;
    let rest = skip_whitespace(&tag[idx + b"charset".len()..]);
    let rest = skip_whitespace(rest.strip_prefix(b"=")?);

    let (rest, quote) = match rest.first() {
        Some(&q @ (b'"' | b'\'')) => (&rest[1..], Some(q)),
        _ => (rest, None),
    };

    let len = rest
        .iter()
        .position(|&b| match quote {
            Some(q) => b == q,
            None => b.is_ascii_whitespace() || matches!(b, b';' | b'"' | b'\'' | b'/'),
        })
        .unwrap_or(rest.len());

    (len > 0).then(|| &rest[..len])
}

// A meta tag can only be read if the document is ASCII-compatible
fn meta_override(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        UTF_8
    } else if encoding == X_USER_DEFINED {
        WINDOWS_1252
    } else {
        encoding
    }
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let n = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[n..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
