//! Logger seam for lifecycle diagnostics and redirected monitor output.

use super::MonitorError;
use tracing::info;

/// Receives redirected monitor output and lifecycle diagnostics.
///
/// `message` is the event name for monitor output, or a short context line for
/// diagnostics; `detail` carries the event text or the error.
pub trait DbLogger: Send + Sync {
    fn log(&self, message: &str, detail: &str);
}

/// Default logger: forwards every line to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl DbLogger for TracingLogger {
    fn log(&self, message: &str, detail: &str) {
        info!(target: "chain_db::db", detail = %detail, "{}", message);
    }
}

/// Outcome of an operation whose failure is reported but never propagated.
///
/// Monitor detach/attach inside the connection lifecycle return this instead of
/// a `Result`, so callers cannot mistake them for fatal steps.
#[must_use = "a best-effort outcome should be reported"]
#[derive(Debug)]
pub struct BestEffort(Option<MonitorError>);

impl BestEffort {
    pub fn from_result(result: Result<(), MonitorError>) -> Self {
        Self(result.err())
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_none()
    }

    pub fn error(&self) -> Option<&MonitorError> {
        self.0.as_ref()
    }

    /// Log the failure, if any, as exactly one line. Returns true when the
    /// operation succeeded.
    pub fn report(self, logger: &dyn DbLogger, context: &str) -> bool {
        match self.0 {
            None => true,
            Some(err) => {
                logger.log(context, &err.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(String, String)>>);

    impl DbLogger for Lines {
        fn log(&self, message: &str, detail: &str) {
            self.0
                .lock()
                .unwrap()
                .push((message.to_string(), detail.to_string()));
        }
    }

    #[test]
    fn test_best_effort_success_logs_nothing() {
        let lines = Lines::default();
        assert!(BestEffort::from_result(Ok(())).report(&lines, "ctx"));
        assert!(lines.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_best_effort_failure_logs_once() {
        let lines = Lines::default();
        let outcome = BestEffort::from_result(Err(MonitorError::NotAttached));
        assert!(!outcome.is_ok());
        assert!(matches!(outcome.error(), Some(MonitorError::NotAttached)));
        assert!(!outcome.report(&lines, "database disconnect exception - "));

        let lines = lines.0.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "database disconnect exception - ");
        assert_eq!(lines[0].1, MonitorError::NotAttached.to_string());
    }
}
