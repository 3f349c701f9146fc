//! Immutable metadata about one client method.

use std::sync::{LazyLock, OnceLock};

use http::Method;
use regex::Regex;

/// Regular expression for matching path parameters in the format `{param_name}`.
static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>\w+)}").expect("a valid regex"));

/// How the declared response of a method reaches the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    /// The body is decoded into the declared type.
    #[default]
    Decoded,
    /// The raw response itself is the payload.
    Raw,
}

/// One positional parameter slot of a client method.
///
/// Runtime arguments are bound to slots in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSlot {
    /// Substituted into the path template under the given name.
    Path(String),
    /// Appended to the query string under the given name.
    Query(String),
    /// Added as a request header with the given name.
    Header(String),
    /// Serialized as the request body.
    Body,
    /// Trailing callback argument; selects the deferred execution strategy.
    ///
    /// This slot is structural: it consumes no bound runtime argument, the
    /// callback is handed to the strategy instead.
    Callback,
}

/// Immutable description of one client method.
///
/// A descriptor is resolved once (out of scope here) and then consumed
/// read-only by every invocation of the method. The parsed path template is
/// initialized lazily; [`MethodDescriptor::init`] is idempotent and safe to
/// repeat.
///
/// # Examples
///
/// ```rust
/// use http::Method;
/// use restwire_core::MethodDescriptor;
///
/// let descriptor = MethodDescriptor::new("get_user", Method::GET, "/users/{id}")
///     .with_path_param("id");
/// assert!(descriptor.is_synchronous());
/// ```
#[derive(Debug)]
pub struct MethodDescriptor {
    name: String,
    method: Method,
    path: String,
    params: Vec<ParamSlot>,
    response: ResponseKind,
    synchronous: bool,
    streaming: bool,
    reactive: bool,
    parsed: OnceLock<PathTemplate>,
}

/// Parsed form of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathTemplate {
    /// Parameter names the template requires, in order of appearance.
    pub(crate) names: Vec<String>,
}

impl MethodDescriptor {
    /// Creates a blocking, decoded-response descriptor with no parameters.
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            params: Vec::new(),
            response: ResponseKind::default(),
            synchronous: true,
            streaming: false,
            reactive: false,
            parsed: OnceLock::new(),
        }
    }

    /// Declares a path parameter slot.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSlot::Path(name.into()));
        self
    }

    /// Declares a query parameter slot.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSlot::Query(name.into()));
        self
    }

    /// Declares a header parameter slot.
    #[must_use]
    pub fn with_header_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSlot::Header(name.into()));
        self
    }

    /// Declares the body slot.
    #[must_use]
    pub fn with_body(mut self) -> Self {
        self.params.push(ParamSlot::Body);
        self
    }

    /// Declares a trailing callback slot; the method becomes non-blocking.
    #[must_use]
    pub fn with_trailing_callback(mut self) -> Self {
        self.params.push(ParamSlot::Callback);
        self.synchronous = false;
        self
    }

    /// Declares that the caller wants the raw response.
    #[must_use]
    pub fn with_raw_response(mut self) -> Self {
        self.response = ResponseKind::Raw;
        self
    }

    /// Declares that the response body stays a lazy, single-pass byte stream.
    #[must_use]
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Declares the method reactive; the method becomes non-blocking.
    #[must_use]
    pub fn with_reactive(mut self) -> Self {
        self.reactive = true;
        self.synchronous = false;
        self
    }

    /// The method name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path template, with `{name}` placeholders.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The positional parameter slots.
    #[must_use]
    pub fn params(&self) -> &[ParamSlot] {
        &self.params
    }

    /// How the response reaches the caller.
    #[must_use]
    pub fn response(&self) -> ResponseKind {
        self.response
    }

    /// Whether the method blocks the caller for its result.
    #[must_use]
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Whether a raw response body stays a single-pass byte stream.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Whether the method produces a reactive single-value producer.
    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Whether the last declared slot is a callback.
    #[must_use]
    pub fn trailing_callback(&self) -> bool {
        matches!(self.params.last(), Some(ParamSlot::Callback))
    }

    /// Ensures the path template is parsed. Idempotent.
    pub fn init(&self) {
        let _ = self.template();
    }

    pub(crate) fn template(&self) -> &PathTemplate {
        self.parsed.get_or_init(|| {
            let names = PARAM_RE
                .captures_iter(&self.path)
                .filter_map(|caps| caps.name("name"))
                .map(|found| found.as_str().to_string())
                .collect();
            PathTemplate { names }
        })
    }

    /// Number of runtime arguments the method expects (callback excluded).
    pub(crate) fn arity(&self) -> usize {
        self.params
            .iter()
            .filter(|slot| !matches!(slot, ParamSlot::Callback))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parsing_is_idempotent() {
        let descriptor = MethodDescriptor::new("get_doc", Method::GET, "/users/{user_id}/docs/{doc_id}");

        descriptor.init();
        descriptor.init();

        assert_eq!(descriptor.template().names, vec!["user_id", "doc_id"]);
    }

    #[test]
    fn test_arity_excludes_trailing_callback() {
        let descriptor = MethodDescriptor::new("create_user", Method::POST, "/users")
            .with_body()
            .with_trailing_callback();

        assert_eq!(descriptor.arity(), 1);
        assert!(descriptor.trailing_callback());
        assert!(!descriptor.is_synchronous());
    }

    #[test]
    fn test_reactive_methods_are_not_synchronous() {
        let descriptor =
            MethodDescriptor::new("watch_user", Method::GET, "/users/{id}").with_reactive();

        assert!(descriptor.is_reactive());
        assert!(!descriptor.is_synchronous());
    }
}
