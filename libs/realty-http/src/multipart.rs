//! `multipart/form-data` request bodies (RFC 7578).
//!
//! A [`Form`] is encoded into a single buffered body. The boundary is chosen
//! by the form itself, and [`RequestBuilder::multipart`] sets the matching
//! `Content-Type` header, so callers never set one.
//!
//! [`RequestBuilder::multipart`]: crate::RequestBuilder::multipart

use crate::error::HttpError;
use bytes::{BufMut, Bytes, BytesMut};
use mime::Mime;

/// One part of a multipart form.
#[derive(Clone, Debug)]
pub struct Part {
    value: Bytes,
    file_name: Option<String>,
    mime: Option<Mime>,
}

impl Part {
    /// A plain text field.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Bytes::from(value.into()),
            file_name: None,
            mime: None,
        }
    }

    /// A binary field. Add [`file_name`](Self::file_name) to make it a file upload.
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Set the file name reported in `Content-Disposition`.
    #[must_use]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the part's content type.
    #[must_use]
    pub fn mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Set the part's content type from a string.
    ///
    /// # Errors
    /// Returns `HttpError::Multipart` if the string is not a valid media type.
    pub fn mime_str(self, mime: &str) -> Result<Self, HttpError> {
        let parsed = mime
            .parse::<Mime>()
            .map_err(|e| HttpError::Multipart(format!("invalid content type '{mime}': {e}")))?;
        Ok(self.mime(parsed))
    }

    /// Size of the part's payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn content_type(&self) -> Option<&str> {
        match (&self.mime, &self.file_name) {
            (Some(m), _) => Some(m.as_ref()),
            (None, Some(_)) => Some(mime::APPLICATION_OCTET_STREAM.as_ref()),
            (None, None) => None,
        }
    }
}

/// A `multipart/form-data` body under construction.
#[derive(Clone, Debug)]
pub struct Form {
    boundary: String,
    parts: Vec<(String, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create an empty form with a random boundary.
    #[must_use]
    pub fn new() -> Self {
        let boundary = format!(
            "{:016x}-{:016x}-{:016x}",
            rand::random::<u64>(),
            rand::random::<u64>(),
            rand::random::<u64>()
        );
        Self {
            boundary,
            parts: Vec::new(),
        }
    }

    /// Add a text field.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(name, Part::text(value))
    }

    /// Add an arbitrary part.
    #[must_use]
    pub fn part(mut self, name: impl Into<String>, part: Part) -> Self {
        self.parts.push((name.into(), part));
        self
    }

    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Check every field and file name without encoding the body.
    ///
    /// # Errors
    /// Returns `HttpError::Multipart` if a name is empty or contains `"`, CR
    /// or LF, which cannot be represented in `Content-Disposition`.
    pub fn validate(&self) -> Result<(), HttpError> {
        for (name, part) in &self.parts {
            check_header_token(name, "field name")?;
            if let Some(file_name) = &part.file_name {
                check_header_token(file_name, "file name")?;
            }
        }
        Ok(())
    }

    /// Encode the form into a single body buffer.
    ///
    /// # Errors
    /// Same as [`validate`](Self::validate).
    pub fn encode(&self) -> Result<Bytes, HttpError> {
        self.validate()?;
        let payload: usize = self.parts.iter().map(|(_, p)| p.len()).sum();
        let mut buf = BytesMut::with_capacity(payload + self.parts.len() * 128 + 64);

        for (name, part) in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(file_name) = &part.file_name {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(file_name.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");
            if let Some(content_type) = part.content_type() {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.value);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(buf.freeze())
    }
}

fn check_header_token(value: &str, what: &str) -> Result<(), HttpError> {
    if value.is_empty() {
        return Err(HttpError::Multipart(format!("{what} is empty")));
    }
    if value.contains(['"', '\r', '\n']) {
        return Err(HttpError::Multipart(format!(
            "{what} '{}' contains a quote or line break",
            value.escape_debug()
        )));
    }
    Ok(())
}
