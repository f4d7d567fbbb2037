//! Plain-text extraction from Gmail message payloads.
//!
//! Nothing in here fails: undecodable data degrades to lossy or empty text so
//! one malformed message never aborts a run.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;
use shared_types::gmail::MessagePart;
use std::sync::LazyLock;

/// Standard alphabet, tolerant of non-canonical trailing bits
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Wide enough that ordinary paragraphs come back on one line
const RENDER_WIDTH: usize = 10_000;

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Extract the readable body of a message.
///
/// Prefers the first `text/plain` part, then the first `text/html` part
/// converted to text, then data carried directly on the root payload.
pub fn extract_body_text(payload: &MessagePart) -> String {
    let parts = flatten_parts(payload);

    if let Some((_, data)) = parts
        .iter()
        .find(|(mime, _)| mime.starts_with("text/plain"))
    {
        return decode_transport(data.unwrap_or_default());
    }

    if let Some((_, data)) = parts.iter().find(|(mime, _)| mime.starts_with("text/html")) {
        return html_to_text(&decode_transport(data.unwrap_or_default()));
    }

    match payload.data() {
        Some(data) if !data.is_empty() => decode_transport(data),
        _ => String::new(),
    }
}

/// Depth-first (mime type, data) pairs, root first
fn flatten_parts(payload: &MessagePart) -> Vec<(&str, Option<&str>)> {
    let mut out = Vec::new();
    walk_parts(payload, &mut out);
    out
}

fn walk_parts<'a>(part: &'a MessagePart, out: &mut Vec<(&'a str, Option<&'a str>)>) {
    out.push((part.mime_type(), part.data()));
    for child in &part.parts {
        walk_parts(child, out);
    }
}

/// Decode a base64url blob (padding optional), falling back to
/// quoted-printable, then to an empty string.
pub fn decode_transport(data: &str) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    let missing = (4 - normalized.len() % 4) % 4;
    normalized.extend(std::iter::repeat('=').take(missing));

    match LENIENT_BASE64.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!("Body is not base64 ({}), trying quoted-printable", e);
            match quoted_printable::decode(data.as_bytes(), quoted_printable::ParseMode::Robust) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!("Failed to decode message body: {}", e);
                    String::new()
                }
            }
        }
    }
}

/// Render HTML as plain text and collapse runs of blank lines to a single
/// blank line. Markup html2text cannot parse is kept as-is.
pub fn html_to_text(html: &str) -> String {
    let text = match html2text::config::plain_no_decorate()
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to render HTML body: {}", e);
            html.to_string()
        }
    };
    let text = text.replace("\r\n", "\n");
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Unknown charsets and malformed words come back as lossy text rather than
/// an error. Leading whitespace is dropped along with the header name.
pub fn decode_header_value(raw: &str) -> String {
    // mailparse expects a full "Key: value" header line
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw.as_bytes());
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((header, _)) => header.get_value(),
        Err(_) => raw.to_string(),
    }
}
