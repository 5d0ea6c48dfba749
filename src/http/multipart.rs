// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! multipart/form-data body encoding

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;

use super::content_types::{MULTIPART_FORM_DATA, OCTET_STREAM};

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One named field of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Form field name
    pub field_name: String,
    /// File name announced in Content-Disposition
    pub file_name: Option<String>,
    /// Declared content type of the part
    pub mime_type: String,
    /// Raw part content, sent unmodified
    pub bytes: Bytes,
}

impl MultipartPart {
    /// Create a new part with `application/octet-stream` content
    pub fn new(field_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: None,
            mime_type: OCTET_STREAM.to_string(),
            bytes: bytes.into(),
        }
    }

    /// Create a file part
    pub fn file(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: Some(file_name.into()),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Set the file name
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the content type
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// An encoded multipart body together with its boundary
#[derive(Debug, Clone)]
pub(crate) struct MultipartBody {
    pub boundary: String,
    pub body: Bytes,
}

impl MultipartBody {
    /// Value for the Content-Type header
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", MULTIPART_FORM_DATA, self.boundary)
    }
}

/// Encode plain fields followed by parts into one multipart body.
pub(crate) fn encode(fields: &[(String, String)], parts: &[MultipartPart]) -> MultipartBody {
    let boundary = generate_boundary(fields, parts);
    let mut buf = BytesMut::new();

    for (name, value) in fields {
        put_delimiter(&mut buf, &boundary);
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }

    for part in parts {
        put_delimiter(&mut buf, &boundary);
        let mut disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(&part.field_name)
        );
        if let Some(ref file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
        }
        buf.put_slice(disposition.as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(format!("Content-Type: {}\r\n\r\n", part.mime_type).as_bytes());
        buf.put_slice(&part.bytes);
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(format!("--{}--\r\n", boundary).as_bytes());

    MultipartBody {
        boundary,
        body: buf.freeze(),
    }
}

fn put_delimiter(buf: &mut BytesMut, boundary: &str) {
    buf.put_slice(format!("--{}\r\n", boundary).as_bytes());
}

/// Quotes and line breaks would end the quoted-string early.
fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Pick a boundary that appears in none of the payloads.
fn generate_boundary(fields: &[(String, String)], parts: &[MultipartPart]) -> String {
    loop {
        let seq = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let boundary = format!(
            "----httpsession{:016x}{:08x}{:04x}",
            nanos,
            std::process::id(),
            seq & 0xffff
        );
        let needle = boundary.as_bytes();
        let collides = fields.iter().any(|(_, v)| contains(v.as_bytes(), needle))
            || parts.iter().any(|p| contains(&p.bytes, needle));
        if !collides {
            return boundary;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Split a body on its boundary and return (headers, content) per section.
    pub(crate) fn sections(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
        let delimiter = format!("--{}", boundary);
        let mut out = Vec::new();
        let mut rest = body;
        loop {
            let Some(start) = find(rest, delimiter.as_bytes()) else {
                break;
            };
            rest = &rest[start + delimiter.len()..];
            if rest.starts_with(b"--") {
                break;
            }
            rest = &rest[2..]; // CRLF after delimiter
            let header_end = find(rest, b"\r\n\r\n").unwrap();
            let headers = String::from_utf8(rest[..header_end].to_vec()).unwrap();
            let content_start = header_end + 4;
            let next = find(&rest[content_start..], delimiter.as_bytes()).unwrap();
            // content is followed by CRLF before the next delimiter
            let content = rest[content_start..content_start + next - 2].to_vec();
            out.push((headers, content));
            rest = &rest[content_start + next..];
        }
        out
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_parts_round_trip() {
        let binary: Vec<u8> = (0u8..=255).collect();
        let parts = vec![
            MultipartPart::file("upload", "hello.txt", "text/plain", "Hello\r\nWorld"),
            MultipartPart::new("blob", binary.clone()),
        ];
        let encoded = encode(&[], &parts);
        let sections = sections(&encoded.body, &encoded.boundary);

        assert_eq!(sections.len(), 2);
        assert!(sections[0]
            .0
            .contains("Content-Disposition: form-data; name=\"upload\"; filename=\"hello.txt\""));
        assert!(sections[0].0.contains("Content-Type: text/plain"));
        assert_eq!(sections[0].1, b"Hello\r\nWorld");
        assert!(!sections[1].0.contains("filename="));
        assert!(sections[1].0.contains("Content-Type: application/octet-stream"));
        assert_eq!(sections[1].1, binary);
    }

    #[test]
    fn test_fields_precede_parts() {
        let fields = vec![("title".to_string(), "report".to_string())];
        let parts = vec![MultipartPart::file("doc", "a.bin", "application/pdf", vec![1, 2, 3])];
        let encoded = encode(&fields, &parts);
        let sections = sections(&encoded.body, &encoded.boundary);

        assert_eq!(sections.len(), 2);
        assert!(sections[0].0.contains("name=\"title\""));
        assert_eq!(sections[0].1, b"report");
        assert_eq!(sections[1].1, vec![1, 2, 3]);
    }

    #[test]
    fn test_content_type_carries_boundary() {
        let encoded = encode(&[], &[MultipartPart::new("a", "b")]);
        assert_eq!(
            encoded.content_type(),
            format!("multipart/form-data; boundary={}", encoded.boundary)
        );
        assert!(encoded
            .body
            .ends_with(format!("--{}--\r\n", encoded.boundary).as_bytes()));
    }

    #[test]
    fn test_quoted_names_escaped() {
        let encoded = encode(&[], &[MultipartPart::file("f\"x", "a\"b.txt", "text/plain", "")]);
        let text = String::from_utf8_lossy(&encoded.body);
        assert!(text.contains("name=\"f\\\"x\""));
        assert!(text.contains("filename=\"a\\\"b.txt\""));
    }
}
