//! # Restwire Core
//!
//! Request-dispatch and invocation engine of a declarative HTTP client:
//! given a resolved method call (endpoint metadata plus runtime arguments),
//! it builds a wire-level request, runs it through a user-supplied
//! interception and transport layer, classifies the outcome, converts the
//! response body, and delivers the result according to one of several
//! execution modes.
//!
//! - **[`RestCall`]** owns one invocation's immutable inputs and performs
//!   build → intercept → send → classify → convert in [`RestCall::invoke`].
//! - **Execution strategies** decide scheduling and delivery:
//!   [`BlockingStrategy`] returns the outcome on the caller's task,
//!   [`DeferredStrategy`] runs the call on a work executor and delivers
//!   through a [`Callback`] on a completion executor, and
//!   [`ReactiveStrategy`] produces a lazily-subscribed [`Single`].
//! - **[`Interceptor`]** mutates outgoing requests; [`InterceptorTape`]
//!   records an interception on the caller's thread so the deferred strategy
//!   can replay it identically on the work pool.
//! - **[`RestError`]** is the closed error taxonomy: network, HTTP,
//!   conversion, unexpected, and configuration failures, classified once at
//!   the point of detection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use http::Method;
//! use restwire_core::{
//!     ArgValue, BlockingStrategy, CallArgs, FixedEndpoint, JsonConverter, LogLevel,
//!     MethodDescriptor, NoOpInterceptor, ReqwestClient, RestCall, TracingLog,
//! };
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u32,
//! }
//!
//! # async fn example() -> Result<(), restwire_core::RestError> {
//! let descriptor = Arc::new(
//!     MethodDescriptor::new("get_user", Method::GET, "/users/{id}").with_path_param("id"),
//! );
//!
//! let call = RestCall::new(
//!     Arc::new(FixedEndpoint::new("https://api.example.com")),
//!     Arc::new(JsonConverter),
//!     Arc::new(ReqwestClient::default()),
//!     Arc::new(NoOpInterceptor),
//!     descriptor,
//!     CallArgs::new(vec![ArgValue::param(42)]),
//!     LogLevel::Basic,
//!     Arc::new(TracingLog),
//! );
//!
//! let strategy = BlockingStrategy::default();
//! let user: Option<User> = strategy.handle(&call).await?.value();
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//!
//! Executors are externally owned [`tokio::runtime::Handle`]s, injected into
//! the deferred and reactive strategies at construction time: a missing
//! executor is a configuration error when the strategy is built, not on the
//! first call. For a single logical call, interception recording (caller
//! thread) happens-before replay (work pool) happens-before the send
//! happens-before completion delivery; across calls there is no ordering.
//! There is no cancellation of a call once dispatched to the work pool.

pub mod converter;
pub mod descriptor;
pub mod dispatch;
pub mod interceptor;
pub mod logging;
pub mod transport;

mod error;

pub use self::converter::{ConvertError, Converter, EncodedBody, JsonConverter};
pub use self::descriptor::{MethodDescriptor, ParamSlot, ResponseKind};
pub use self::dispatch::{
    ArgValue, BlockingStrategy, BodyArg, CallArgs, CallResult, Callback, DeferredStrategy,
    ErrorHandler, Outcome, ReactiveStrategy, RequestBuilder, RestCall, Single, StrategyKind,
};
pub use self::error::RestError;
pub use self::interceptor::{Interceptor, InterceptorTape, NoOpInterceptor, RequestFacade};
pub use self::logging::{LogLevel, LogSink, TracingLog};
pub use self::transport::{
    BoxFuture, Endpoint, FixedEndpoint, HttpClient, ReqwestClient, Request, Response, ResponseBody,
};
