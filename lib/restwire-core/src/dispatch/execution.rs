//! `RestCall::invoke`: build, intercept, send, classify, convert.

use std::any;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span};
use url::Url;

use super::builder::RequestBuilder;
use super::{CallResult, Outcome, RestCall};
use crate::converter::Converter;
use crate::descriptor::ResponseKind;
use crate::error::RestError;
use crate::logging::LogLevel;
use crate::transport::{FaultTracking, Request, Response, ResponseBody};

/// Span label prefix for calls running on pooled workers.
const DISPATCH_PREFIX: &str = "restwire-";

impl<C: Converter> RestCall<C> {
    /// Performs the invocation: builds the request, runs the interceptor,
    /// sends, classifies the outcome, and converts the body.
    ///
    /// Non-blocking invocations run inside a tracing span labelled from the
    /// final request path, released on every exit path.
    ///
    /// # Errors
    ///
    /// Fails with exactly one classified [`RestError`]; every error is
    /// written to the log sink (at verbosity ≥ basic) before it is returned.
    pub async fn invoke<T>(&self) -> Result<CallResult<T>, RestError>
    where
        T: DeserializeOwned,
    {
        self.descriptor.init();

        let result = match self.prepare() {
            Ok(request) => {
                let url = request.url.clone();
                if self.descriptor.is_synchronous() {
                    self.exchange::<T>(request, &url).await
                } else {
                    let label = format!("{DISPATCH_PREFIX}{}", url.path());
                    self.exchange::<T>(request, &url)
                        .instrument(info_span!("dispatch", call = %label))
                        .await
                }
            }
            Err(err) => Err(err),
        };

        result.inspect_err(|err| {
            if self.log_level.logs() {
                self.log_error(err);
            }
        })
    }

    /// Builds and freezes the request: argument binding, then interception,
    /// then freeze.
    fn prepare(&self) -> Result<Request, RestError> {
        let mut builder = RequestBuilder::new(self.endpoint.url(), &self.descriptor);
        builder.bind(&self.args)?;
        self.interceptor.intercept(&mut builder);
        builder.freeze()
    }

    async fn exchange<T>(&self, request: Request, url: &Url) -> Result<CallResult<T>, RestError>
    where
        T: DeserializeOwned,
    {
        if self.log_level.logs() {
            self.log_request(&request);
        }

        debug!(?request, "sending...");
        let start = Instant::now();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| RestError::Network {
                url: Some(url.to_string()),
                source,
            })?;
        let elapsed = start.elapsed();
        debug!(status = %response.status, "...receiving");

        let mut response = response;
        if self.log_level.logs() {
            self.log_and_replace_response(url, &mut response, elapsed)?;
        }

        self.classify(url, response)
    }

    /// Classifies the response exactly once, at the point of detection.
    fn classify<T>(&self, url: &Url, mut response: Response) -> Result<CallResult<T>, RestError>
    where
        T: DeserializeOwned,
    {
        if !response.status.is_success() {
            // Materialize the body so it survives the response being surfaced
            // as an error payload.
            response
                .buffer_body()
                .map_err(|source| RestError::Network {
                    url: Some(url.to_string()),
                    source,
                })?;
            return Err(RestError::Http {
                url: url.to_string(),
                status: response.status,
                response,
            });
        }

        match self.descriptor.response() {
            ResponseKind::Raw => {
                if !self.descriptor.is_streaming() {
                    response
                        .buffer_body()
                        .map_err(|source| RestError::Network {
                            url: Some(url.to_string()),
                            source,
                        })?;
                }
                Ok(CallResult {
                    response,
                    outcome: Outcome::Raw,
                })
            }
            ResponseKind::Decoded => {
                let Some(reader) = response.take_body_reader() else {
                    return Ok(CallResult {
                        response,
                        outcome: Outcome::Empty,
                    });
                };

                let mut body = FaultTracking::new(reader);
                match self.converter.decode::<T>(&mut body) {
                    Ok(value) => Ok(CallResult {
                        response,
                        outcome: Outcome::Decoded(value),
                    }),
                    Err(source) => {
                        // If the byte source itself raised, propagate that
                        // rather than reporting a conversion failure.
                        if let Some(fault) = body.take_fault() {
                            return Err(RestError::Network {
                                url: Some(url.to_string()),
                                source: fault,
                            });
                        }

                        // The body was partially read by the converter.
                        response.clear_body();
                        Err(RestError::Conversion {
                            url: url.to_string(),
                            converter: self.converter.name(),
                            target: any::type_name::<T>(),
                            response: Some(response),
                            source,
                        })
                    }
                }
            }
        }
    }

    /// Log request line, headers, and body per the configured level.
    fn log_request(&self, request: &Request) {
        self.log
            .log(&format!("---> HTTP {} {}", request.method, request.url));

        if self.log_level >= LogLevel::Headers {
            for (name, value) in &request.headers {
                self.log
                    .log(&format!("{name}: {}", value.to_str().unwrap_or("<binary>")));
            }

            let mut body_size = "no".to_string();
            if let Some(body) = &request.body {
                self.log.log(&format!("Content-Type: {}", body.content_type));
                self.log.log(&format!("Content-Length: {}", body.data.len()));
                body_size = format!("{}-byte", body.data.len());

                if self.log_level >= LogLevel::Full {
                    if !request.headers.is_empty() {
                        self.log.log("");
                    }
                    self.log.log(&String::from_utf8_lossy(&body.data));
                } else if self.log_level >= LogLevel::HeadersAndArgs {
                    self.log.log("---> REQUEST:");
                    for (index, arg) in self.args.values().iter().enumerate() {
                        self.log.log(&format!("#{index}: {arg}"));
                    }
                }
            }

            self.log.log(&format!("---> END HTTP ({body_size} body)"));
        }
    }

    /// Log response line, headers, and body per the configured level.
    ///
    /// At full verbosity the body is consumed and replaced with an in-memory
    /// body carrying identical metadata, so it stays available for decoding.
    fn log_and_replace_response(
        &self,
        url: &Url,
        response: &mut Response,
        elapsed: Duration,
    ) -> Result<(), RestError> {
        self.log.log(&format!(
            "<--- HTTP {} {url} ({}ms)",
            response.status.as_u16(),
            elapsed.as_millis()
        ));

        if self.log_level >= LogLevel::Headers {
            for (name, value) in &response.headers {
                self.log
                    .log(&format!("{name}: {}", value.to_str().unwrap_or("<binary>")));
            }

            let mut body_size = 0u64;
            if response.body().is_some() {
                if self.log_level >= LogLevel::Full {
                    if !response.headers.is_empty() {
                        self.log.log("");
                    }
                    response
                        .buffer_body()
                        .map_err(|source| RestError::Network {
                            url: Some(url.to_string()),
                            source,
                        })?;
                }
                if let Some(bytes) = response.body().and_then(ResponseBody::bytes) {
                    body_size = bytes.len() as u64;
                    if self.log_level >= LogLevel::Full {
                        self.log.log(&String::from_utf8_lossy(bytes));
                    }
                } else if let Some(length) = response.body().and_then(ResponseBody::length) {
                    body_size = length;
                }
            }

            self.log.log(&format!("<--- END HTTP ({body_size}-byte body)"));
        }

        Ok(())
    }

    /// Log an error that occurred while processing a request or response.
    fn log_error(&self, error: &RestError) {
        self.log
            .log(&format!("---- ERROR {}", error.url().unwrap_or_default()));
        self.log.log(&error.to_string());
        self.log.log("---- END ERROR");
    }
}
