//! Error taxonomy for batch runs
//!
//! Run entry points never return these as `Err`. They travel inside
//! [`RunOutcome::error`](crate::parallel::RunOutcome) so callers can tell why a
//! batch reported `ok == false` when the reason was not a rejected item.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// No worker was bound before a run call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A worker returned an error, panicked, or broke the outcome contract
    #[error("worker execution failed on partition {partition}: {message}")]
    WorkerExecution { partition: usize, message: String },

    /// The fail-set difference could not be computed
    #[error("aggregation error: {0}")]
    Aggregation(String),

    /// The worker pool could not be built or torn down cleanly
    #[error("worker pool lifecycle error: {0}")]
    PoolLifecycle(String),

    /// A log scope could not be installed
    #[error("logging error: {0}")]
    Logging(String),
}

impl PoolError {
    pub fn worker(partition: usize, message: impl Into<String>) -> Self {
        PoolError::WorkerExecution {
            partition,
            message: message.into(),
        }
    }

    /// Short kind label used in summaries and log lines
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::Configuration(_) => "configuration",
            PoolError::WorkerExecution { .. } => "worker-execution",
            PoolError::Aggregation(_) => "aggregation",
            PoolError::PoolLifecycle(_) => "pool-lifecycle",
            PoolError::Logging(_) => "logging",
        }
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
