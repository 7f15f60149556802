//! MIME part-tree helpers: plain-text body selection, attachment listing,
//! header lookup, and mailbox (`Name <addr>`) parsing.

use std::sync::LazyLock;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use regex::Regex;

use super::{AttachmentInfo, Header, MimePart};

/// Maximum depth for recursive multipart descent (adversarial nesting guard).
const MAX_DEPTH: usize = 10;

/// Case-insensitive header lookup.
pub fn header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Selects and decodes the plain-text body of a payload tree.
///
/// Children of a `multipart/alternative` container are preferred over a
/// direct `text/plain` sibling, matching how mail clients pick the canonical
/// text rendering of a message.
pub fn plain_text_body(payload: &MimePart) -> Option<String> {
    find_plain_text(payload, 0)
}

fn find_plain_text(part: &MimePart, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    if part.mime_type.eq_ignore_ascii_case("text/plain") && part.filename.is_empty() {
        return decode_body(part);
    }
    if let Some(alternative) = part
        .parts
        .iter()
        .find(|p| p.mime_type.eq_ignore_ascii_case("multipart/alternative"))
    {
        if let Some(text) = find_plain_text(alternative, depth + 1) {
            return Some(text);
        }
    }
    if let Some(plain) = part
        .parts
        .iter()
        .find(|p| p.mime_type.eq_ignore_ascii_case("text/plain") && p.filename.is_empty())
    {
        if let Some(text) = decode_body(plain) {
            return Some(text);
        }
    }
    part.parts
        .iter()
        .filter(|p| p.mime_type.starts_with("multipart/"))
        .find_map(|p| find_plain_text(p, depth + 1))
}

/// Decodes a part's base64url body data to UTF-8 text (lossy on bad bytes).
fn decode_body(part: &MimePart) -> Option<String> {
    let data = part.body.data.as_deref()?;
    let bytes = URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Collects attachment descriptors (any part with a filename) from the tree.
pub fn attachments(payload: &MimePart) -> Vec<AttachmentInfo> {
    let mut found = Vec::new();
    collect_attachments(payload, 0, &mut found);
    found
}

fn collect_attachments(part: &MimePart, depth: usize, found: &mut Vec<AttachmentInfo>) {
    if depth > MAX_DEPTH {
        return;
    }
    if !part.filename.is_empty() {
        found.push(AttachmentInfo {
            filename: part.filename.clone(),
            mime_type: part.mime_type.clone(),
            attachment_id: part.body.attachment_id.clone(),
        });
    }
    for child in &part.parts {
        collect_attachments(child, depth + 1, found);
    }
}

static MAILBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"?([^"<]*?)"?\s*<\s*([^>\s]+)\s*>\s*$"#).unwrap());

static BARE_ADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

/// Splits a From/Reply-To header into `(display name, address)`.
/// Either side may be absent; a bare address yields no name.
pub fn parse_mailbox(raw: &str) -> (Option<String>, Option<String>) {
    if let Some(caps) = MAILBOX_RE.captures(raw) {
        let name = caps[1].trim().to_string();
        let addr = caps[2].trim().to_lowercase();
        let name = if name.is_empty() { None } else { Some(name) };
        return (name, Some(addr));
    }
    let addr = BARE_ADDR_RE
        .find(raw)
        .map(|m| m.as_str().to_lowercase());
    (None, addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::PartBody;

    fn b64(text: &str) -> Option<String> {
        Some(URL_SAFE_NO_PAD.encode(text.as_bytes()))
    }

    fn text_part(mime_type: &str, text: &str) -> MimePart {
        MimePart {
            mime_type: mime_type.to_string(),
            body: PartBody {
                data: b64(text),
                attachment_id: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_direct_text_plain_payload() {
        let payload = text_part("text/plain", "hello");
        assert_eq!(plain_text_body(&payload).as_deref(), Some("hello"));
    }

    #[test]
    fn test_multipart_alternative_children_preferred() {
        let alternative = MimePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![
                text_part("text/plain", "plain wins"),
                text_part("text/html", "<p>html</p>"),
            ],
            ..Default::default()
        };
        let payload = MimePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![text_part("text/plain", "sibling"), alternative],
            ..Default::default()
        };
        // The alternative subtree wins over a direct text/plain sibling.
        assert_eq!(plain_text_body(&payload).as_deref(), Some("plain wins"));
    }

    #[test]
    fn test_direct_text_plain_child_fallback() {
        let payload = MimePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![
                text_part("text/html", "<p>html</p>"),
                text_part("text/plain", "body text"),
            ],
            ..Default::default()
        };
        assert_eq!(plain_text_body(&payload).as_deref(), Some("body text"));
    }

    #[test]
    fn test_attachment_part_is_not_a_body() {
        let mut resume = text_part("text/plain", "resume bytes");
        resume.filename = "resume.txt".to_string();
        let payload = MimePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![resume, text_part("text/plain", "actual body")],
            ..Default::default()
        };
        assert_eq!(plain_text_body(&payload).as_deref(), Some("actual body"));
    }

    #[test]
    fn test_no_text_part_yields_none() {
        let payload = MimePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![text_part("text/html", "<p>only html</p>")],
            ..Default::default()
        };
        assert!(plain_text_body(&payload).is_none());
    }

    #[test]
    fn test_padded_base64_also_decodes() {
        let payload = MimePart {
            mime_type: "text/plain".to_string(),
            body: PartBody {
                data: Some(URL_SAFE.encode("padded".as_bytes())),
                attachment_id: None,
            },
            ..Default::default()
        };
        assert_eq!(plain_text_body(&payload).as_deref(), Some("padded"));
    }

    #[test]
    fn test_attachments_collected_recursively() {
        let mut pdf = MimePart {
            mime_type: "application/pdf".to_string(),
            ..Default::default()
        };
        pdf.filename = "resume.pdf".to_string();
        pdf.body.attachment_id = Some("att-1".to_string());
        let payload = MimePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![text_part("text/plain", "body"), pdf],
            ..Default::default()
        };
        let atts = attachments(&payload);
        assert_eq!(atts.len(), 1);
        assert_eq!(atts[0].filename, "resume.pdf");
        assert_eq!(atts[0].attachment_id.as_deref(), Some("att-1"));
    }

    #[test]
    fn test_parse_mailbox_with_display_name() {
        let (name, addr) = parse_mailbox("Jane Doe <Jane.Doe@Example.com>");
        assert_eq!(name.as_deref(), Some("Jane Doe"));
        assert_eq!(addr.as_deref(), Some("jane.doe@example.com"));
    }

    #[test]
    fn test_parse_mailbox_quoted_name() {
        let (name, addr) = parse_mailbox("\"Doe, Jane\" <jane@example.com>");
        assert_eq!(name.as_deref(), Some("Doe, Jane"));
        assert_eq!(addr.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_parse_mailbox_bare_address() {
        let (name, addr) = parse_mailbox("jane@example.com");
        assert!(name.is_none());
        assert_eq!(addr.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_parse_mailbox_garbage() {
        let (name, addr) = parse_mailbox("not an address");
        assert!(name.is_none());
        assert!(addr.is_none());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let headers = vec![Header {
            name: "Subject".to_string(),
            value: "Application".to_string(),
        }];
        assert_eq!(header(&headers, "subject"), Some("Application"));
        assert_eq!(header(&headers, "From"), None);
    }
}
