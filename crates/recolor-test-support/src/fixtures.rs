//! Request bodies and payloads shared by HTTP and pipeline tests.

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "recolor-test-boundary";

/// Small byte payload standing in for an image.
pub const SAMPLE_IMAGE: &[u8] = b"\x89PNG\r\n\x1a\nrecolor-sample";

/// A single multipart field.
#[derive(Debug, Clone, Copy)]
pub struct Part<'a> {
    /// Form field name.
    pub name: &'a str,
    /// Optional filename attribute.
    pub filename: Option<&'a str>,
    /// Field payload.
    pub data: &'a [u8],
}

/// Encode `parts` as a `multipart/form-data` body delimited by [`BOUNDARY`].
#[must_use]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = part.filename.map_or_else(
            || format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
            |filename| {
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n",
                    part.name
                )
            },
        );
        body.extend_from_slice(disposition.as_bytes());
        if part.filename.is_some() {
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `Content-Type` header value matching [`multipart_body`].
#[must_use]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_frames_each_part() {
        let body = multipart_body(&[
            Part {
                name: "note",
                filename: None,
                data: b"hello",
            },
            Part {
                name: "image",
                filename: Some("cat.png"),
                data: SAMPLE_IMAGE,
            },
        ]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--recolor-test-boundary\r\n"));
        assert!(text.contains("name=\"note\"\r\n\r\nhello\r\n"));
        assert!(text.contains("filename=\"cat.png\""));
        assert!(text.ends_with("--recolor-test-boundary--\r\n"));
        assert!(multipart_content_type().ends_with(BOUNDARY));
    }
}
