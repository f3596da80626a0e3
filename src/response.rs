//! Response text rendering

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};

pub fn http_version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}

/// Render the status line and header block as received, blank line included.
pub fn format_response_headers(version: Version, status: StatusCode, headers: &HeaderMap) -> String {
    let label = http_version_label(version);
    let mut output = match status.canonical_reason() {
        Some(reason) => format!("{} {} {}\r\n", label, status.as_u16(), reason),
        None => format!("{} {}\r\n", label, status.as_u16()),
    };
    for (name, value) in headers.iter() {
        output.push_str(name.as_str());
        output.push_str(": ");
        output.push_str(&String::from_utf8_lossy(value.as_bytes()));
        output.push_str("\r\n");
    }
    output.push_str("\r\n");
    output
}

/// Charset parameter of a `Content-Type` value, lowercased.
pub fn extract_charset(content_type: Option<&str>) -> Option<String> {
    content_type?.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}

/// Decode a body using the declared charset, falling back to UTF-8.
pub fn decode_body_with_charset(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = extract_charset(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        log::debug!("Response body contained invalid {} sequences", encoding.name());
    }
    text.into_owned()
}
