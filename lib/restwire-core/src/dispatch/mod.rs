//! The invocation engine.
//!
//! A [`RestCall`] owns one invocation's immutable inputs and exposes
//! [`RestCall::invoke`], which performs build → intercept → send → classify
//! → convert. How `invoke` is scheduled, and how its outcome reaches the
//! caller, is decided by the execution strategy selected once per method
//! (see [`StrategyKind::select`]).

use std::fmt;
use std::sync::Arc;

use crate::converter::{ConvertError, Converter, EncodedBody, JsonConverter};
use crate::descriptor::MethodDescriptor;
use crate::interceptor::Interceptor;
use crate::logging::{LogLevel, LogSink};
use crate::transport::{Endpoint, HttpClient, Response};

mod builder;
mod execution;
mod handler;
mod strategy;

pub use self::builder::RequestBuilder;
pub use self::handler::ErrorHandler;
pub use self::strategy::{
    BlockingStrategy, Callback, DeferredStrategy, ReactiveStrategy, Single, StrategyKind,
};

/// Lazily-encoded body argument.
///
/// The value is captured at binding time but serialized only when the
/// request is frozen; on deferred calls that happens on the work pool, not
/// on the caller's thread.
#[derive(Clone, derive_more::Debug)]
pub struct BodyArg {
    type_name: &'static str,
    #[debug(ignore)]
    encode: Arc<dyn Fn() -> Result<EncodedBody, ConvertError> + Send + Sync>,
}

impl BodyArg {
    /// Captures a value and the converter that will serialize it.
    pub fn new<C, T>(converter: Arc<C>, value: T) -> Self
    where
        C: Converter + 'static,
        T: serde::Serialize + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            encode: Arc::new(move || converter.encode(&value)),
        }
    }

    pub(crate) fn encode(&self) -> Result<EncodedBody, ConvertError> {
        (self.encode)()
    }
}

/// One positional runtime argument.
#[derive(Debug, Clone, derive_more::From)]
pub enum ArgValue {
    /// A path, query, or header value.
    Param(serde_json::Value),
    /// The request body.
    Body(BodyArg),
}

impl ArgValue {
    /// Creates a path/query/header argument.
    pub fn param(value: impl Into<serde_json::Value>) -> Self {
        Self::Param(value.into())
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(value) => write!(formatter, "{value}"),
            Self::Body(body) => write!(formatter, "<{} body>", body.type_name),
        }
    }
}

/// Positional arguments of one invocation, bound to the descriptor's
/// parameter slots in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Vec<ArgValue>,
}

impl CallArgs {
    /// Creates the argument list.
    #[must_use]
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self { values }
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values(&self) -> &[ArgValue] {
        &self.values
    }
}

impl From<Vec<ArgValue>> for CallArgs {
    fn from(values: Vec<ArgValue>) -> Self {
        Self::new(values)
    }
}

/// Successful outcome of one invocation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The body decoded into the declared type.
    Decoded(T),
    /// The raw response itself is the payload.
    Raw,
    /// The response carried no body.
    Empty,
}

/// Pairs the raw transport response with the converted value, carrying both
/// through the callback boundary without re-deriving either.
#[derive(Debug)]
pub struct CallResult<T> {
    /// The transport response.
    pub response: Response,
    /// What the invocation produced.
    pub outcome: Outcome<T>,
}

impl<T> CallResult<T> {
    /// The decoded value, when there is one.
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self.outcome {
            Outcome::Decoded(value) => Some(value),
            Outcome::Raw | Outcome::Empty => None,
        }
    }

    /// Discards the outcome and keeps the raw response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Owns one invocation's immutable inputs.
///
/// A call is created per logical invocation, consumed exactly once by
/// [`RestCall::invoke`], then discarded. It is never mutated after
/// construction: the deferred strategy builds a *second* call sharing every
/// field except the interceptor rather than mutating the first, which keeps
/// the engine free of internal locking.
#[derive(derive_more::Debug)]
pub struct RestCall<C: Converter = JsonConverter> {
    #[debug(skip)]
    pub(crate) endpoint: Arc<dyn Endpoint>,
    #[debug(skip)]
    pub(crate) converter: Arc<C>,
    #[debug(skip)]
    pub(crate) client: Arc<dyn HttpClient>,
    #[debug(skip)]
    pub(crate) interceptor: Arc<dyn Interceptor>,
    pub(crate) descriptor: Arc<MethodDescriptor>,
    pub(crate) args: Arc<CallArgs>,
    pub(crate) log_level: LogLevel,
    #[debug(skip)]
    pub(crate) log: Arc<dyn LogSink>,
}

impl<C: Converter> Clone for RestCall<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            converter: Arc::clone(&self.converter),
            client: Arc::clone(&self.client),
            interceptor: Arc::clone(&self.interceptor),
            descriptor: Arc::clone(&self.descriptor),
            args: Arc::clone(&self.args),
            log_level: self.log_level,
            log: Arc::clone(&self.log),
        }
    }
}

impl<C: Converter> RestCall<C> {
    /// Assembles a call from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endpoint: Arc<dyn Endpoint>,
        converter: Arc<C>,
        client: Arc<dyn HttpClient>,
        interceptor: Arc<dyn Interceptor>,
        descriptor: Arc<MethodDescriptor>,
        args: CallArgs,
        log_level: LogLevel,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            endpoint,
            converter,
            client,
            interceptor,
            descriptor,
            args: Arc::new(args),
            log_level,
            log,
        }
    }

    /// The method descriptor of this call.
    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// A copy of this call with the interceptor swapped, sharing every other
    /// field. Used by the deferred strategy to replay a recorded tape.
    pub(crate) fn with_interceptor(&self, interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            interceptor,
            ..self.clone()
        }
    }
}
