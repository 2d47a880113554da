//! Minimal HTTP/1.1 framing codec for the CWMP transport.
//!
//! CWMP runs the session over plain HTTP POSTs on a single connection, so
//! the transport only needs request framing (request line + headers +
//! `Content-Length` body) and response serialization. The codec is
//! size-capped and handles partial reads; it does not implement chunked
//! transfer encoding.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Maximum accepted header block size (16 KB).
const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Maximum accepted request body size (4 MB).
const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// A framed inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpRequest {
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }

    /// CWMP bodies must be carried with an XML content type.
    #[must_use]
    pub fn has_xml_content_type(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("xml"))
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Utf8`] if the body is not valid UTF-8.
    pub fn body_utf8(&self) -> Result<&str, CodecError> {
        Ok(std::str::from_utf8(&self.body)?)
    }
}

/// An outbound HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    /// 200 with an XML body: the normal reply carrying a CWMP envelope.
    #[must_use]
    pub fn xml(body: String) -> Self {
        Self {
            status: 200,
            content_type: "application/xml",
            body,
        }
    }

    /// 204 with an empty body: the "no more requests" session terminator.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: "text/plain",
            body: String::new(),
        }
    }

    /// 500 with a human-readable reason: a session-fatal fault.
    #[must_use]
    pub fn fault(reason: impl Into<String>) -> Self {
        Self {
            status: 500,
            content_type: "text/plain",
            body: reason.into(),
        }
    }

    /// 404 for non-CWMP traffic (GETs).
    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            status: 404,
            content_type: "text/plain",
            body: reason.into(),
        }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug)]
struct PendingHead {
    method: String,
    path: String,
    content_type: Option<String>,
    content_length: usize,
}

/// Codec framing HTTP requests in and HTTP responses out.
#[derive(Debug, Default)]
pub struct HttpCodec {
    head: Option<PendingHead>,
}

impl HttpCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_head_end(src: &[u8]) -> Option<usize> {
    src.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &str) -> Result<PendingHead, CodecError> {
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| CodecError::Malformed("empty request head".to_string()))?;

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Err(CodecError::Malformed(format!(
            "invalid request line: {request_line}"
        )));
    };

    let mut content_type = None;
    let mut content_length = 0usize;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| CodecError::Malformed(format!("invalid Content-Length: {value}")))?;
        }
    }

    Ok(PendingHead {
        method: method.to_string(),
        path: path.to_string(),
        content_type,
        content_length,
    })
}

impl Decoder for HttpCodec {
    type Item = HttpRequest;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.head.is_none() {
            let Some(head_end) = find_head_end(src) else {
                if src.len() > MAX_HEADER_SIZE {
                    return Err(CodecError::HeadersTooLarge(src.len()));
                }
                return Ok(None);
            };

            let head_str = std::str::from_utf8(&src[..head_end])?;
            let head = parse_head(head_str)?;

            if head.content_length > MAX_BODY_SIZE {
                return Err(CodecError::BodyTooLarge(head.content_length));
            }

            src.advance(head_end + 4);
            self.head = Some(head);
        }

        let Some(head) = self.head.as_ref() else {
            return Ok(None);
        };

        if src.len() < head.content_length {
            src.reserve(head.content_length - src.len());
            return Ok(None);
        }

        // Head is complete and the body is buffered; take ownership of both.
        let head = self.head.take().ok_or_else(|| {
            CodecError::Malformed("decoder state lost between reads".to_string())
        })?;
        let body = src.split_to(head.content_length).freeze();

        trace!(
            "framed {} {} ({} byte body)",
            head.method,
            head.path,
            body.len()
        );

        Ok(Some(HttpRequest {
            method: head.method,
            path: head.path,
            content_type: head.content_type,
            body,
        }))
    }
}

impl Encoder<HttpResponse> for HttpCodec {
    type Error = CodecError;

    fn encode(&mut self, item: HttpResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.body.as_bytes();
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            item.status,
            reason_phrase(item.status),
            item.content_type,
            body.len()
        );

        dst.reserve(head.len() + body.len());
        dst.extend_from_slice(head.as_bytes());
        dst.extend_from_slice(body);

        Ok(())
    }
}

/// Errors that can occur during transport framing.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("request headers too large: {0} bytes (max: {MAX_HEADER_SIZE})")]
    HeadersTooLarge(usize),

    #[error("request body too large: {0} bytes (max: {MAX_BODY_SIZE})")]
    BodyTooLarge(usize),

    #[error("malformed HTTP request: {0}")]
    Malformed(String),
}
