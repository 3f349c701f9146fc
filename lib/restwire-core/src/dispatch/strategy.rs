//! Execution strategies: how an invocation is scheduled and delivered.
//!
//! The set is closed: {blocking, deferred, reactive}. The variant for a
//! method is resolved once via [`StrategyKind::select`], not per call.
//! Executors are injected at construction time, so a missing executor is a
//! configuration error at the point the strategy is built rather than a
//! first-call surprise.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use super::handler::{self, ErrorHandler};
use super::{CallResult, RestCall};
use crate::converter::{Converter, JsonConverter};
use crate::descriptor::MethodDescriptor;
use crate::error::RestError;
use crate::interceptor::InterceptorTape;

/// The closed set of execution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Run on the caller's task and return the outcome directly.
    Blocking,
    /// Run on the work executor, deliver through a callback on the
    /// completion executor.
    Deferred,
    /// Wrap in a lazily-subscribed single-value producer.
    Reactive,
}

impl StrategyKind {
    /// Resolves the strategy for a method.
    ///
    /// Checked in fixed priority order: reactive first, then the structural
    /// trailing-callback convention for deferred, then blocking as the
    /// default. Evaluated once per method, not per call.
    #[must_use]
    pub fn select(descriptor: &MethodDescriptor) -> Self {
        if ReactiveStrategy::can_handle(descriptor) {
            Self::Reactive
        } else if DeferredStrategy::can_handle(descriptor) {
            Self::Deferred
        } else {
            Self::Blocking
        }
    }
}

/// Receives the single outcome of a deferred or reactive call.
pub trait Callback<T>: Send + 'static {
    /// Delivers the successful outcome.
    fn on_success(self, result: CallResult<T>);

    /// Delivers the classified (and possibly transformed) error.
    fn on_error(self, error: RestError);
}

fn deliver<T, CB: Callback<T>>(callback: CB, result: Result<CallResult<T>, RestError>) {
    match result {
        Ok(result) => callback.on_success(result),
        Err(error) => callback.on_error(error),
    }
}

/// Runs `invoke()` on the caller's task.
#[derive(Default, derive_more::Debug)]
pub struct BlockingStrategy {
    #[debug(skip)]
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl BlockingStrategy {
    /// Creates the strategy; an absent handler delivers errors unchanged.
    #[must_use]
    pub fn new(error_handler: Option<Arc<dyn ErrorHandler>>) -> Self {
        Self { error_handler }
    }

    /// Whether this strategy applies to the method.
    #[must_use]
    pub fn can_handle(descriptor: &MethodDescriptor) -> bool {
        descriptor.is_synchronous()
    }

    /// Invokes the call and returns its outcome, with classified errors
    /// passed through the error handler for a final transform.
    ///
    /// # Errors
    ///
    /// Fails with the (possibly transformed) classified [`RestError`].
    pub async fn handle<T, C>(&self, call: &RestCall<C>) -> Result<CallResult<T>, RestError>
    where
        T: DeserializeOwned,
        C: Converter,
    {
        call.invoke::<T>()
            .await
            .map_err(|error| handler::apply(self.error_handler.as_deref(), error))
    }
}

/// Runs `invoke()` on a work executor and delivers the outcome through a
/// callback on a completion executor.
#[derive(derive_more::Debug)]
pub struct DeferredStrategy {
    work: Handle,
    completion: Handle,
    #[debug(skip)]
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl DeferredStrategy {
    /// Creates the strategy from its executors.
    ///
    /// # Errors
    ///
    /// Fails with [`RestError::Configuration`] when either executor is
    /// absent, synchronously, before any call is dispatched.
    pub fn new(
        work: Option<Handle>,
        completion: Option<Handle>,
        error_handler: Option<Arc<dyn ErrorHandler>>,
    ) -> Result<Self, RestError> {
        let (Some(work), Some(completion)) = (work, completion) else {
            return Err(RestError::configuration(
                "deferred invocation requires a work executor and a completion executor",
            ));
        };
        Ok(Self {
            work,
            completion,
            error_handler,
        })
    }

    /// Whether this strategy applies to the method: selected structurally by
    /// the trailing-callback parameter convention, not by a descriptor flag.
    #[must_use]
    pub fn can_handle(descriptor: &MethodDescriptor) -> bool {
        descriptor.trailing_callback()
    }

    /// Dispatches the call.
    ///
    /// The interceptor runs synchronously on the caller's thread, recorded
    /// into a tape, so interception logic observing caller context runs at
    /// the expected time; argument serialization and the network round trip
    /// are deferred to the work executor, where a second call replays the
    /// tape. The visible return value is empty; the outcome arrives through
    /// `callback` on the completion executor.
    pub fn handle<T, C, CB>(&self, call: &RestCall<C>, callback: CB)
    where
        T: DeserializeOwned + Send + 'static,
        C: Converter + Send + Sync + 'static,
        CB: Callback<T>,
    {
        let mut tape = InterceptorTape::new();
        call.interceptor.intercept(&mut tape);
        let replay = call.with_interceptor(Arc::new(tape));

        let completion = self.completion.clone();
        let error_handler = self.error_handler.clone();
        self.work.spawn(async move {
            let result = replay
                .invoke::<T>()
                .await
                .map_err(|error| handler::apply(error_handler.as_deref(), error));
            completion.spawn(async move {
                deliver(callback, result);
            });
        });
    }
}

/// Wraps calls in lazily-subscribed single-value producers.
#[derive(Debug)]
pub struct ReactiveStrategy {
    work: Handle,
}

impl ReactiveStrategy {
    /// Creates the strategy from its work executor.
    ///
    /// # Errors
    ///
    /// Fails with [`RestError::Configuration`] when the executor is absent,
    /// synchronously, before any work is scheduled.
    pub fn new(work: Option<Handle>) -> Result<Self, RestError> {
        let Some(work) = work else {
            return Err(RestError::configuration(
                "reactive invocation requires a work executor",
            ));
        };
        Ok(Self { work })
    }

    /// Whether this strategy applies to the method.
    #[must_use]
    pub fn can_handle(descriptor: &MethodDescriptor) -> bool {
        descriptor.is_reactive()
    }

    /// Wraps the call in a producer; nothing runs until it is subscribed.
    #[must_use]
    pub fn handle<T, C>(&self, call: &RestCall<C>) -> Single<T, C>
    where
        C: Converter,
    {
        Single {
            call: call.clone(),
            work: self.work.clone(),
            _output: PhantomData,
        }
    }
}

/// Lazily-subscribed producer of exactly one value or one error.
///
/// The underlying call is not executed until [`Single::subscribe`] (or
/// [`Single::resolve`]) is used; subscription schedules `invoke()` on the
/// work executor and the outcome is delivered through the subscriber's
/// success or error channel.
#[derive(derive_more::Debug)]
pub struct Single<T, C: Converter = JsonConverter> {
    call: RestCall<C>,
    #[debug(skip)]
    work: Handle,
    #[debug(skip)]
    _output: PhantomData<fn() -> T>,
}

impl<T, C> Single<T, C>
where
    T: DeserializeOwned + Send + 'static,
    C: Converter + Send + Sync + 'static,
{
    /// Schedules the call on the work executor and delivers its single
    /// outcome to `callback`.
    pub fn subscribe<CB: Callback<T>>(self, callback: CB) {
        let Self { call, work, .. } = self;
        work.spawn(async move {
            deliver(callback, call.invoke::<T>().await);
        });
    }

    /// Subscribes with a oneshot channel and awaits the single outcome.
    ///
    /// # Errors
    ///
    /// Fails with the classified [`RestError`] delivered by the producer.
    pub async fn resolve(self) -> Result<CallResult<T>, RestError> {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.subscribe(ChannelCallback { sender });
        receiver.await.unwrap_or_else(|_| {
            Err(RestError::Unexpected {
                url: None,
                message: "producer dropped without delivering an outcome".to_string(),
            })
        })
    }
}

struct ChannelCallback<T> {
    sender: tokio::sync::oneshot::Sender<Result<CallResult<T>, RestError>>,
}

impl<T: Send + 'static> Callback<T> for ChannelCallback<T> {
    fn on_success(self, result: CallResult<T>) {
        let _ = self.sender.send(Ok(result));
    }

    fn on_error(self, error: RestError) {
        let _ = self.sender.send(Err(error));
    }
}
