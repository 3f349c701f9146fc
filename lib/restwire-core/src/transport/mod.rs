//! Transport boundary.
//!
//! The engine talks to the network through the [`HttpClient`] contract: it
//! hands over a frozen [`Request`] and gets back a [`Response`] whose body is
//! readable once as a byte stream. A `reqwest`-backed adapter is provided in
//! [`ReqwestClient`].

use std::fmt;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::sync::Mutex;

use bytes::{Buf, Bytes};
use http::{HeaderMap, Method, StatusCode};
use mime::Mime;
use url::Url;

use crate::converter::EncodedBody;

mod reqwest;
pub use self::reqwest::ReqwestClient;

/// Maximum body length echoed into error previews.
pub(crate) const BODY_PREVIEW_MAX: usize = 1024;

/// Boxed future returned by transport implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves the base URL requests are built against.
pub trait Endpoint: Send + Sync {
    /// The base URL, without a trailing path.
    fn url(&self) -> &str;
}

/// Endpoint with a fixed base URL.
#[derive(Debug, Clone)]
pub struct FixedEndpoint {
    url: String,
}

impl FixedEndpoint {
    /// Creates an endpoint for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Endpoint for FixedEndpoint {
    fn url(&self) -> &str {
        &self.url
    }
}

/// A frozen, immutable wire-level request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL, query included.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encoded body, when the method declares one.
    pub body: Option<EncodedBody>,
}

/// Executes frozen requests against the wire.
///
/// Implementations fail with an [`io::Error`] when the transport itself
/// breaks; non-2xx responses are *not* transport failures and must be
/// returned as regular responses.
pub trait HttpClient: Send + Sync {
    /// Performs one round trip.
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<Response, io::Error>>;
}

/// Single-pass byte source backing a response body.
enum BodySource {
    Buffered(Bytes),
    Stream(Mutex<Box<dyn Read + Send>>),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(data) => write!(formatter, "Buffered({} bytes)", data.len()),
            Self::Stream(_) => write!(formatter, "Stream"),
        }
    }
}

/// A response body: media type, declared length, and a byte source readable
/// once (streaming) or in place (buffered).
#[derive(Debug)]
pub struct ResponseBody {
    content_type: Option<Mime>,
    length: Option<u64>,
    source: BodySource,
}

impl ResponseBody {
    /// Creates an in-memory body; the length is the byte count.
    pub fn from_bytes(data: impl Into<Bytes>, content_type: Option<Mime>) -> Self {
        let data = data.into();
        Self {
            content_type,
            length: Some(data.len() as u64),
            source: BodySource::Buffered(data),
        }
    }

    /// Creates a lazy, single-pass, non-restartable body.
    pub fn from_reader(
        reader: impl Read + Send + 'static,
        content_type: Option<Mime>,
        length: Option<u64>,
    ) -> Self {
        Self {
            content_type,
            length,
            source: BodySource::Stream(Mutex::new(Box::new(reader))),
        }
    }

    /// Media type of the body, when declared.
    #[must_use]
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Declared length in bytes, when known.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Whether the body is materialized in memory.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        matches!(self.source, BodySource::Buffered(_))
    }

    /// The materialized bytes, when buffered.
    #[must_use]
    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.source {
            BodySource::Buffered(data) => Some(data),
            BodySource::Stream(_) => None,
        }
    }
}

/// A wire-level response.
#[derive(Debug)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers, in wire order.
    pub headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl Response {
    /// Assembles a response from its parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<ResponseBody>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The body, when the response carries one.
    #[must_use]
    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Reads a streaming body fully and replaces it with an in-memory body
    /// carrying identical metadata. Idempotent; buffered bodies are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Propagates the [`io::Error`] of the underlying byte source.
    pub fn buffer_body(&mut self) -> io::Result<()> {
        if let Some(body) = &mut self.body {
            if let BodySource::Stream(reader) = &mut body.source {
                let reader = match reader.get_mut() {
                    Ok(reader) => reader,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                body.length = Some(data.len() as u64);
                body.source = BodySource::Buffered(data.into());
            }
        }
        Ok(())
    }

    /// Takes the body as a single-pass reader.
    ///
    /// A buffered body stays in place and the reader sees a cheap view of
    /// it; a streaming body is moved out and the response is left without
    /// one, since the stream cannot be restarted.
    pub(crate) fn take_body_reader(&mut self) -> Option<BodyReader> {
        let buffered = self.body.as_ref()?.is_buffered();
        if buffered {
            let data = self.body.as_ref()?.bytes()?.clone();
            Some(BodyReader::Buffered(data.reader()))
        } else {
            let body = self.body.take()?;
            match body.source {
                BodySource::Stream(reader) => {
                    let inner = match reader.into_inner() {
                        Ok(inner) => inner,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    Some(BodyReader::Stream(inner))
                }
                BodySource::Buffered(data) => Some(BodyReader::Buffered(data.reader())),
            }
        }
    }

    /// Drops the body, e.g. after a converter consumed part of it.
    pub(crate) fn clear_body(&mut self) {
        self.body = None;
    }

    /// Full body text when buffered (lossy UTF-8).
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let bytes = self.body.as_ref()?.bytes()?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Short textual preview of the body for diagnostics.
    pub(crate) fn body_preview(&self) -> String {
        match self.text() {
            Some(text) if text.len() > BODY_PREVIEW_MAX => {
                let mut end = BODY_PREVIEW_MAX;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                let mut preview = text;
                preview.truncate(end);
                preview.push_str("... (truncated)");
                preview
            }
            Some(text) => text,
            None => "<no body>".to_string(),
        }
    }
}

/// Single-pass reader over a response body.
pub(crate) enum BodyReader {
    Buffered(bytes::buf::Reader<Bytes>),
    Stream(Box<dyn Read + Send>),
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Buffered(reader) => reader.read(buf),
            Self::Stream(reader) => reader.read(buf),
        }
    }
}

/// Wraps a byte source and remembers whether *it* raised first, so a decode
/// failure caused by the source is not misreported as a conversion failure.
pub(crate) struct FaultTracking<R> {
    inner: R,
    fault: Option<io::Error>,
}

impl<R> FaultTracking<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, fault: None }
    }

    /// The source's own error, when one occurred.
    pub(crate) fn take_fault(&mut self) -> Option<io::Error> {
        self.fault.take()
    }
}

impl<R: Read> Read for FaultTracking<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(count) => Ok(count),
            Err(err) => {
                let mirror = io::Error::new(err.kind(), err.to_string());
                self.fault = Some(err);
                Err(mirror)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming_response(data: &'static [u8]) -> Response {
        let body = ResponseBody::from_reader(data, Some(mime::TEXT_PLAIN), None);
        Response::new(StatusCode::OK, HeaderMap::new(), Some(body))
    }

    #[test]
    fn test_buffer_body_materializes_stream_with_identical_metadata() {
        let mut response = streaming_response(b"hello");

        response.buffer_body().expect("should buffer");

        let body = response.body().expect("should have body");
        assert!(body.is_buffered());
        assert_eq!(body.length(), Some(5));
        assert_eq!(body.content_type(), Some(&mime::TEXT_PLAIN));
        assert_eq!(response.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_buffer_body_is_idempotent() {
        let mut response = streaming_response(b"hello");

        response.buffer_body().expect("should buffer");
        response.buffer_body().expect("should stay buffered");

        assert_eq!(response.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_buffered_body_stays_readable_after_take() {
        let mut response = streaming_response(b"hello");
        response.buffer_body().expect("should buffer");

        let mut reader = response.take_body_reader().expect("should have reader");
        let mut read = String::new();
        reader.read_to_string(&mut read).expect("should read");

        assert_eq!(read, "hello");
        assert_eq!(response.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_streaming_body_is_single_pass() {
        let mut response = streaming_response(b"hello");

        let mut reader = response.take_body_reader().expect("should have reader");
        let mut read = String::new();
        reader.read_to_string(&mut read).expect("should read");

        assert_eq!(read, "hello");
        assert!(response.body().is_none());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream reset"))
        }
    }

    #[test]
    fn test_fault_tracking_remembers_source_errors() {
        let mut reader = FaultTracking::new(FailingReader);

        let err = reader.read(&mut [0u8; 8]).expect_err("should fail");
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);

        let fault = reader.take_fault().expect("should remember the fault");
        assert_eq!(fault.kind(), io::ErrorKind::ConnectionReset);
        assert!(reader.take_fault().is_none());
    }

    #[test]
    fn test_fault_tracking_stays_clean_on_success() {
        let mut reader = FaultTracking::new(b"ok".as_slice());

        let mut read = String::new();
        reader.read_to_string(&mut read).expect("should read");

        assert_eq!(read, "ok");
        assert!(reader.take_fault().is_none());
    }

    #[test]
    fn test_body_preview_truncates_long_bodies() {
        let long = "x".repeat(BODY_PREVIEW_MAX + 100);
        let body = ResponseBody::from_bytes(long.into_bytes(), None);
        let response = Response::new(StatusCode::OK, HeaderMap::new(), Some(body));

        let preview = response.body_preview();

        assert!(preview.ends_with("... (truncated)"));
        assert!(preview.len() < BODY_PREVIEW_MAX + 100);
    }
}
