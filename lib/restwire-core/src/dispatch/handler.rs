//! User-supplied error transformation.

use crate::error::RestError;

/// Lets user code rewrite a classified error before it is delivered.
///
/// Applied by the blocking and deferred strategies as the last step before
/// an error reaches the caller. The handler observes the original and
/// returns the error to deliver in its place; returning `None` is a
/// programming error in the handler itself and is escalated as a
/// [`RestError::Configuration`] wrapping the original as its cause,
/// delivered through the same channel the original would have used.
pub trait ErrorHandler: Send + Sync {
    /// Produces the error to deliver in place of `error`.
    fn transform(&self, error: &RestError) -> Option<RestError>;
}

/// Applies an optional handler; an absent handler delivers the error
/// unchanged.
pub(crate) fn apply(handler: Option<&dyn ErrorHandler>, error: RestError) -> RestError {
    let Some(handler) = handler else {
        return error;
    };
    match handler.transform(&error) {
        Some(replacement) => replacement,
        None => RestError::Configuration {
            message: "error handler returned no error for a classified error".to_string(),
            cause: Some(Box::new(error)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rewriting;

    impl ErrorHandler for Rewriting {
        fn transform(&self, error: &RestError) -> Option<RestError> {
            Some(RestError::Unexpected {
                url: error.url().map(ToString::to_string),
                message: "rewritten".to_string(),
            })
        }
    }

    struct Empty;

    impl ErrorHandler for Empty {
        fn transform(&self, _error: &RestError) -> Option<RestError> {
            None
        }
    }

    fn original() -> RestError {
        RestError::Unexpected {
            url: Some("http://example.test/users".to_string()),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_absent_handler_passes_errors_through() {
        let error = apply(None, original());
        assert!(error.to_string().contains("boom"));
    }

    #[test]
    fn test_handler_replaces_the_error() {
        let error = apply(Some(&Rewriting), original());
        assert!(error.to_string().contains("rewritten"));
    }

    #[test]
    fn test_empty_transform_escalates_with_the_original_as_cause() {
        let error = apply(Some(&Empty), original());

        let RestError::Configuration { cause, .. } = error else {
            panic!("expected a configuration error, got {error}");
        };
        let cause = cause.expect("should wrap the original");
        assert!(cause.to_string().contains("boom"));
    }
}
