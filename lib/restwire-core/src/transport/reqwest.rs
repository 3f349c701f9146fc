//! `reqwest`-backed transport adapter.

use std::io;

use headers::{ContentType, HeaderMapExt};
use mime::Mime;

use super::{BoxFuture, HttpClient, Request, Response, ResponseBody};

/// Transport backed by a shared [`reqwest::Client`].
///
/// The response body is buffered when the response is received; descriptors
/// declared streaming read from the buffered source. Transport failures are
/// surfaced as [`io::Error`]s wrapping the underlying `reqwest` error.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Wraps an existing client, preserving its pools and configuration.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<Response, io::Error>> {
        let client = self.client.clone();
        Box::pin(async move {
            let Request {
                method,
                url,
                mut headers,
                body,
            } = request;

            let mut builder = client.request(method, url);
            if let Some(body) = body {
                headers.typed_insert(ContentType::from(body.content_type.clone()));
                builder = builder.body(body.data);
            }
            let response = builder
                .headers(headers)
                .send()
                .await
                .map_err(io::Error::other)?;

            let status = response.status();
            let headers = response.headers().clone();
            let content_type = headers.typed_get::<ContentType>().map(Mime::from);
            let data = response.bytes().await.map_err(io::Error::other)?;
            let body =
                (!data.is_empty()).then(|| ResponseBody::from_bytes(data, content_type));

            Ok(Response::new(status, headers, body))
        })
    }
}
