//! Pluggable body conversion.
//!
//! A [`Converter`] turns typed values into request bytes and response byte
//! streams back into typed values. The engine only depends on this contract;
//! [`JsonConverter`] is the provided default.

use std::error::Error as StdError;
use std::io::Read;

use bytes::Bytes;
use mime::Mime;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An encoded request body with its media type.
#[derive(Clone, PartialEq, derive_more::Debug)]
pub struct EncodedBody {
    /// Media type advertised alongside the body.
    pub content_type: Mime,
    /// The serialized payload.
    #[debug(ignore)]
    pub data: Bytes,
}

/// Failure to encode or decode a body.
#[derive(derive_more::Debug, derive_more::Display)]
#[display("{message}")]
pub struct ConvertError {
    /// Human-readable description of the failure.
    pub message: String,
    /// Underlying cause, when one exists.
    #[debug(skip)]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ConvertError {
    /// Creates an error without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping its underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl StdError for ConvertError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// Encodes request bodies and decodes response bodies.
///
/// Decoding reads from a single-pass byte source. A decode failure caused by
/// the source itself (rather than by malformed content) is detected by the
/// engine through a fault-tracking wrapper around the source, so converters
/// only need to surface whatever error they hit.
pub trait Converter: Send + Sync {
    /// Short name used in diagnostics (e.g. `"json"`).
    fn name(&self) -> &'static str;

    /// Media type this converter produces.
    fn content_type(&self) -> Mime;

    /// Serializes `value` into a request body.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvertError`] when the value cannot be serialized.
    fn encode<T: Serialize>(&self, value: &T) -> Result<EncodedBody, ConvertError>;

    /// Deserializes the declared type from a single-pass byte source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvertError`] when the body cannot be decoded.
    fn decode<T: DeserializeOwned>(&self, body: &mut dyn Read) -> Result<T, ConvertError>;
}

/// JSON converter backed by `serde_json`.
///
/// Decode failures report the JSON path at which deserialization failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> Mime {
        mime::APPLICATION_JSON
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<EncodedBody, ConvertError> {
        let data = serde_json::to_vec(value)
            .map_err(|err| ConvertError::with_source("failed to serialize JSON body", err))?;
        Ok(EncodedBody {
            content_type: mime::APPLICATION_JSON,
            data: data.into(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, body: &mut dyn Read) -> Result<T, ConvertError> {
        let mut deserializer = serde_json::Deserializer::from_reader(body);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            ConvertError::with_source(
                format!("failed to deserialize JSON at '{path}'"),
                err.into_inner(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_json_round_trip() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        let body = JsonConverter.encode(&data).expect("should encode");
        assert_eq!(body.content_type, mime::APPLICATION_JSON);

        let decoded: TestData = JsonConverter
            .decode(&mut body.data.as_ref())
            .expect("should decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_json_decode_failure_reports_path() {
        let mut body = br#"{"name": "test", "value": "not a number"}"#.as_slice();

        let error = JsonConverter
            .decode::<TestData>(&mut body)
            .expect_err("should fail");

        insta::assert_snapshot!(error.message, @"failed to deserialize JSON at 'value'");
        assert!(error.source.is_some());
    }

    #[test]
    fn test_json_decode_failure_on_truncated_body() {
        let mut body = br#"{"name": "test""#.as_slice();

        let error = JsonConverter
            .decode::<TestData>(&mut body)
            .expect_err("should fail");

        assert!(error.message.starts_with("failed to deserialize JSON"));
    }
}
