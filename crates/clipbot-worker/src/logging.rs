//! Structured run logging utilities.
//!
//! Provides consistent, structured logging for pipeline runs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use clipbot_models::{RunId, UserId};

/// Run logger for structured logging with consistent formatting.
///
/// Every line carries the run ID, the user it belongs to and the operation.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    user_id: i64,
    operation: String,
}

impl RunLogger {
    /// Create a new logger for a specific run and operation.
    pub fn new(run_id: &RunId, user_id: UserId, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            user_id: user_id.as_i64(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            user_id = self.user_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            user_id = self.user_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            user_id = self.user_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            user_id = self.user_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    /// Create a tracing span for this run.
    ///
    /// Child events emitted inside the span (media commands, transport calls)
    /// inherit the run's fields.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            user_id = self.user_id,
            operation = %self.operation
        )
    }
}
