use std::error::Error as StdError;
use std::io;

use http::StatusCode;

use crate::converter::ConvertError;
use crate::transport::Response;

/// Classified outcome of a failed invocation.
///
/// Classification happens exactly once, at the point of detection; an error
/// is never re-classified on its way out, only optionally transformed by an
/// [`ErrorHandler`](crate::dispatch::ErrorHandler) before delivery. Each
/// variant carries the request URL when it is known and the raw response
/// when one exists.
#[derive(derive_more::Debug, derive_more::Display)]
pub enum RestError {
    /// The transport call itself failed before a response was obtainable.
    #[display("network failure for {}: {source}", url.as_deref().unwrap_or("<unresolved>"))]
    Network {
        /// Request URL, when it was resolved before the failure.
        url: Option<String>,
        /// The underlying I/O failure.
        source: io::Error,
    },

    /// A response was obtained but its status code falls outside `[200,300)`.
    #[display("HTTP {status} for {url}: {}", response.body_preview())]
    Http {
        /// Request URL.
        url: String,
        /// The offending status code.
        status: StatusCode,
        /// The raw response, body fully materialized so it can be inspected
        /// after the call.
        response: Response,
    },

    /// A response body was obtained but could not be decoded into the
    /// declared type.
    #[display("failed to convert response from {url} into {target} with {converter}: {source}")]
    Conversion {
        /// Request URL.
        url: String,
        /// Name of the converter that failed.
        converter: &'static str,
        /// Name of the declared target type.
        target: &'static str,
        /// The raw response, body dropped where the converter consumed it.
        #[debug(skip)]
        response: Option<Response>,
        /// The converter's failure.
        source: ConvertError,
    },

    /// Any failure not otherwise classified.
    #[display("unexpected dispatch failure: {message}")]
    Unexpected {
        /// Request URL, when it was resolved before the failure.
        url: Option<String>,
        /// Description of the failure.
        message: String,
    },

    /// A fatal, non-retryable setup problem detected at dispatch time.
    #[display("invalid dispatch configuration: {message}")]
    Configuration {
        /// Description of the misconfiguration.
        message: String,
        /// The error the misconfiguration was detected while handling, if any.
        cause: Option<Box<RestError>>,
    },
}

impl RestError {
    /// The request URL, when known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. } | Self::Unexpected { url, .. } => url.as_deref(),
            Self::Http { url, .. } | Self::Conversion { url, .. } => Some(url),
            Self::Configuration { .. } => None,
        }
    }

    /// The raw response, when one exists.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Http { response, .. } => Some(response),
            Self::Conversion { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            cause: None,
        }
    }
}

impl StdError for RestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Network { source, .. } => Some(source),
            Self::Conversion { source, .. } => Some(source),
            Self::Configuration {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RestError>();
        assert_sync::<RestError>();
    }

    #[test]
    fn test_configuration_error_exposes_cause() {
        let original = RestError::Unexpected {
            url: None,
            message: "boom".to_string(),
        };
        let error = RestError::Configuration {
            message: "error handler returned no error".to_string(),
            cause: Some(Box::new(original)),
        };

        let cause = error.source().expect("should expose the cause");
        assert!(cause.to_string().contains("boom"));
    }
}
