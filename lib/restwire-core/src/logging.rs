//! Tiered wire logging.
//!
//! Every invocation carries a [`LogLevel`] and a [`LogSink`]; the dispatch
//! engine writes request, response, and error lines to the sink when the
//! level allows it. Internal diagnostics go through `tracing` regardless.

use tracing::debug;

/// Controls how much of an exchange is written to the [`LogSink`].
///
/// Levels are ordered; each level logs a strict superset of the information
/// logged by the levels below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No wire logging.
    #[default]
    None,
    /// Request and response lines only.
    Basic,
    /// Basic plus headers and body sizes.
    Headers,
    /// Headers plus the invocation arguments in place of the request body.
    HeadersAndArgs,
    /// Headers plus full request and response bodies.
    Full,
}

impl LogLevel {
    /// Whether any wire logging happens at this level.
    #[must_use]
    pub fn logs(self) -> bool {
        self > Self::None
    }
}

/// Append-only destination for wire log lines.
///
/// Different invocations run concurrently on different pools, so a sink is
/// written to from whichever thread currently owns an invocation and must be
/// safe for concurrent append.
pub trait LogSink: Send + Sync {
    /// Appends one line.
    fn log(&self, line: &str);
}

/// Default sink routing wire lines through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, line: &str) {
        debug!(target: "restwire::wire", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_strictly_ordered() {
        assert!(LogLevel::None < LogLevel::Basic);
        assert!(LogLevel::Basic < LogLevel::Headers);
        assert!(LogLevel::Headers < LogLevel::HeadersAndArgs);
        assert!(LogLevel::HeadersAndArgs < LogLevel::Full);
    }

    #[test]
    fn test_only_none_disables_logging() {
        assert!(!LogLevel::None.logs());
        assert!(LogLevel::Basic.logs());
        assert!(LogLevel::Headers.logs());
        assert!(LogLevel::HeadersAndArgs.logs());
        assert!(LogLevel::Full.logs());
    }
}
