//! Mutable request under construction.

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use super::{ArgValue, BodyArg, CallArgs};
use crate::descriptor::{MethodDescriptor, ParamSlot};
use crate::error::RestError;
use crate::interceptor::RequestFacade;
use crate::transport::Request;

fn replace_path_param(path: &str, param_name: &str, value: &str) -> String {
    let pattern = ["{", param_name, "}"].concat();
    path.replace(&pattern, value)
}

/// URL-encode a path parameter value using percent-encoding.
fn encode_path_value(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Header mutations are kept as ordered operations until the request is
/// frozen, so a replayed tape reproduces appends and replacements exactly.
#[derive(Debug, Clone)]
enum HeaderOp {
    Append { name: String, value: String },
    Replace { name: String, value: String },
}

/// Builds one wire-level request: arguments are bound to the descriptor's
/// slots, the interceptor mutates the builder through [`RequestFacade`], and
/// [`RequestBuilder::freeze`] produces the immutable [`Request`].
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    descriptor: &'a MethodDescriptor,
    base_url: String,
    path_params: IndexMap<String, String>,
    query: Vec<(String, String)>,
    headers: Vec<HeaderOp>,
    body: Option<BodyArg>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(base_url: &str, descriptor: &'a MethodDescriptor) -> Self {
        Self {
            descriptor,
            base_url: base_url.to_string(),
            path_params: IndexMap::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Binds positional arguments to the descriptor's parameter slots.
    pub(crate) fn bind(&mut self, args: &CallArgs) -> Result<(), RestError> {
        let arity = self.descriptor.arity();
        if arity != args.len() {
            return Err(RestError::Unexpected {
                url: None,
                message: format!(
                    "method '{}' expects {arity} arguments, got {}",
                    self.descriptor.name(),
                    args.len()
                ),
            });
        }

        let slots = self
            .descriptor
            .params()
            .iter()
            .filter(|slot| !matches!(slot, ParamSlot::Callback));
        for (slot, arg) in slots.zip(args.values()) {
            match (slot, arg) {
                (ParamSlot::Path(name), ArgValue::Param(value)) => {
                    let text = scalar_text(name, value)?;
                    self.set_path_param(name, &text);
                }
                (ParamSlot::Query(name), ArgValue::Param(value)) => {
                    let text = scalar_text(name, value)?;
                    self.add_query_param(name, &text);
                }
                (ParamSlot::Header(name), ArgValue::Param(value)) => {
                    let text = scalar_text(name, value)?;
                    self.add_header(name, &text);
                }
                (ParamSlot::Body, ArgValue::Body(body)) => {
                    self.body = Some(body.clone());
                }
                (slot, arg) => {
                    return Err(RestError::Unexpected {
                        url: None,
                        message: format!(
                            "argument {arg} does not fit the declared slot {slot:?}"
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Freezes into an immutable request: resolves the path template, joins
    /// the base URL, appends query parameters, applies header operations in
    /// recorded order, and serializes the body.
    pub(crate) fn freeze(self) -> Result<Request, RestError> {
        let Self {
            descriptor,
            base_url,
            path_params,
            query,
            headers,
            body,
        } = self;

        let mut path = descriptor.path().to_string();
        let mut missings = Vec::new();
        for name in &descriptor.template().names {
            match path_params.get(name) {
                Some(value) => path = replace_path_param(&path, name, value),
                None => missings.push(name.clone()),
            }
        }
        if !missings.is_empty() {
            return Err(RestError::Unexpected {
                url: None,
                message: format!(
                    "path '{}' is missing required arguments: {missings:?}",
                    descriptor.path()
                ),
            });
        }

        let joined = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = joined.parse::<Url>().map_err(|err| RestError::Unexpected {
            url: Some(joined.clone()),
            message: format!("invalid request URL: {err}"),
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &query {
                pairs.append_pair(name, value);
            }
            drop(pairs);
        }

        let mut header_map = HeaderMap::new();
        for op in headers {
            match op {
                HeaderOp::Append { name, value } => {
                    let (name, value) = parse_header(&url, &name, &value)?;
                    header_map.append(name, value);
                }
                HeaderOp::Replace { name, value } => {
                    let (name, value) = parse_header(&url, &name, &value)?;
                    header_map.insert(name, value);
                }
            }
        }

        let body = body
            .map(|body| body.encode())
            .transpose()
            .map_err(|err| RestError::Unexpected {
                url: Some(url.to_string()),
                message: format!("failed to serialize request body: {err}"),
            })?;

        Ok(Request {
            method: descriptor.method().clone(),
            url,
            headers: header_map,
            body,
        })
    }
}

fn scalar_text(name: &str, value: &serde_json::Value) -> Result<String, RestError> {
    match value {
        serde_json::Value::String(text) => Ok(text.clone()),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        serde_json::Value::Bool(flag) => Ok(flag.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(RestError::Unexpected {
                url: None,
                message: format!("unsupported value for parameter '{name}': {value}"),
            })
        }
    }
}

fn parse_header(
    url: &Url,
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), RestError> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| RestError::Unexpected {
        url: Some(url.to_string()),
        message: format!("invalid header name: {err}"),
    })?;
    let value = HeaderValue::from_str(value).map_err(|err| RestError::Unexpected {
        url: Some(url.to_string()),
        message: format!("invalid header value: {err}"),
    })?;
    Ok((name, value))
}

impl RequestFacade for RequestBuilder<'_> {
    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push(HeaderOp::Append {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push(HeaderOp::Replace {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn add_query_param(&mut self, name: &str, value: &str) {
        self.query.push((name.to_string(), value.to_string()));
    }

    fn set_path_param(&mut self, name: &str, value: &str) {
        self.path_params
            .insert(name.to_string(), encode_path_value(value));
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::dispatch::ArgValue;

    fn descriptor() -> MethodDescriptor {
        MethodDescriptor::new("get_user_docs", Method::GET, "/users/{id}/docs")
            .with_path_param("id")
            .with_query_param("page")
            .with_header_param("x-tenant")
    }

    #[test]
    fn test_bind_and_freeze_resolves_the_request() {
        let descriptor = descriptor();
        let mut builder = RequestBuilder::new("http://example.test/", &descriptor);

        let args = CallArgs::new(vec![
            ArgValue::param(42),
            ArgValue::param(2),
            ArgValue::param("acme"),
        ]);
        builder.bind(&args).expect("should bind");
        let request = builder.freeze().expect("should freeze");

        insta::assert_snapshot!(request.url.as_str(), @"http://example.test/users/42/docs?page=2");
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.headers.get("x-tenant").map(|value| value.as_bytes()),
            Some(b"acme".as_slice())
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_path_values_are_percent_encoded() {
        let descriptor = MethodDescriptor::new("get_doc", Method::GET, "/docs/{name}")
            .with_path_param("name");
        let mut builder = RequestBuilder::new("http://example.test", &descriptor);

        builder
            .bind(&CallArgs::new(vec![ArgValue::param("a b/c")]))
            .expect("should bind");
        let request = builder.freeze().expect("should freeze");

        insta::assert_snapshot!(request.url.as_str(), @"http://example.test/docs/a%20b%2Fc");
    }

    #[test]
    fn test_missing_path_argument_is_rejected() {
        let descriptor = MethodDescriptor::new("get_user", Method::GET, "/users/{id}");
        let builder = RequestBuilder::new("http://example.test", &descriptor);

        let error = builder.freeze().expect_err("should fail");

        assert!(matches!(error, RestError::Unexpected { .. }));
        assert!(error.to_string().contains("missing required arguments"));
    }

    #[test]
    fn test_argument_count_mismatch_is_rejected() {
        let descriptor = descriptor();
        let mut builder = RequestBuilder::new("http://example.test", &descriptor);

        let error = builder
            .bind(&CallArgs::new(vec![ArgValue::param(42)]))
            .expect_err("should fail");

        assert!(matches!(error, RestError::Unexpected { .. }));
    }

    #[test]
    fn test_header_operations_apply_in_recorded_order() {
        let descriptor = MethodDescriptor::new("ping", Method::GET, "/ping");
        let mut builder = RequestBuilder::new("http://example.test", &descriptor);

        builder.add_header("x-trace", "1");
        builder.add_header("x-trace", "2");
        builder.set_header("accept", "application/json");
        builder.set_header("accept", "text/plain");

        let request = builder.freeze().expect("should freeze");

        let traces: Vec<_> = request.headers.get_all("x-trace").iter().collect();
        assert_eq!(traces.len(), 2);
        assert_eq!(
            request.headers.get("accept").map(|value| value.as_bytes()),
            Some(b"text/plain".as_slice())
        );
    }
}
