//! Request interception.
//!
//! An [`Interceptor`] mutates an outgoing request through the
//! [`RequestFacade`] surface after arguments are bound and before the
//! request is frozen. [`InterceptorTape`] records such mutations so they can
//! be replayed later, possibly on another thread.

/// Mutation surface an interceptor sees while a request is being built.
pub trait RequestFacade {
    /// Appends a header value, preserving previously added values.
    fn add_header(&mut self, name: &str, value: &str);

    /// Replaces every previously set value of a header.
    fn set_header(&mut self, name: &str, value: &str);

    /// Appends a query parameter.
    fn add_query_param(&mut self, name: &str, value: &str);

    /// Sets a path parameter, replacing any previously bound value.
    fn set_path_param(&mut self, name: &str, value: &str);
}

/// User-supplied mutation of an outgoing request before it is sent.
pub trait Interceptor: Send + Sync {
    /// Mutates the request under construction.
    fn intercept(&self, request: &mut dyn RequestFacade);
}

/// Interceptor that leaves every request untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpInterceptor;

impl Interceptor for NoOpInterceptor {
    fn intercept(&self, _request: &mut dyn RequestFacade) {}
}

/// One recorded facade mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mutation {
    AddHeader { name: String, value: String },
    SetHeader { name: String, value: String },
    AddQueryParam { name: String, value: String },
    SetPathParam { name: String, value: String },
}

/// Records facade mutations for later replay.
///
/// Recording happens synchronously on the caller's thread; the tape is then
/// moved into the replay context and applied on the work pool. Replay
/// reproduces the recorded sequence exactly: no mutation is skipped,
/// reordered, or deduplicated, since interceptors may have order-dependent
/// or non-idempotent effects such as appending to a header list.
#[derive(Debug, Default)]
pub struct InterceptorTape {
    mutations: Vec<Mutation>,
}

impl InterceptorTape {
    /// Creates an empty tape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl RequestFacade for InterceptorTape {
    fn add_header(&mut self, name: &str, value: &str) {
        self.mutations.push(Mutation::AddHeader {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.mutations.push(Mutation::SetHeader {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn add_query_param(&mut self, name: &str, value: &str) {
        self.mutations.push(Mutation::AddQueryParam {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_path_param(&mut self, name: &str, value: &str) {
        self.mutations.push(Mutation::SetPathParam {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
}

impl Interceptor for InterceptorTape {
    fn intercept(&self, request: &mut dyn RequestFacade) {
        for mutation in &self.mutations {
            match mutation {
                Mutation::AddHeader { name, value } => request.add_header(name, value),
                Mutation::SetHeader { name, value } => request.set_header(name, value),
                Mutation::AddQueryParam { name, value } => request.add_query_param(name, value),
                Mutation::SetPathParam { name, value } => request.set_path_param(name, value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_records_in_order() {
        let mut tape = InterceptorTape::new();
        tape.add_header("X-Trace", "1");
        tape.add_header("X-Trace", "2");
        tape.set_header("Accept", "application/json");

        assert_eq!(tape.len(), 3);
        assert!(!tape.is_empty());
    }

    #[test]
    fn test_replay_preserves_order_and_duplicates() {
        let mut tape = InterceptorTape::new();
        tape.add_header("X-Trace", "1");
        tape.add_header("X-Trace", "2");
        tape.add_query_param("page", "3");
        tape.set_path_param("id", "42");

        let mut replayed = InterceptorTape::new();
        tape.intercept(&mut replayed);

        assert_eq!(tape.mutations, replayed.mutations);
    }
}
