//! # multiproc - Bulk task distribution over bounded worker pools
//!
//! Split a batch of work items into partitions, run a worker function over
//! every partition on a bounded pool of threads, and get back one merged
//! report: which items failed, the per-channel results, and the worker
//! diagnostics.
//!
//! ## Features
//!
//! - **Two execution strategies**: blocking completion-order dispatch, or
//!   submit-then-wait with results in submission order
//! - **Fail-set by value or identity**: hashable items are compared by value,
//!   anything else by allocation
//! - **Funneled logging**: records from every worker thread land, whole and
//!   flushed, in one scoped destination
//! - **Layered configuration**: embedded defaults, project files and
//!   `MULTIPROC_` environment variables
//!
//! ## Quick Start
//!
//! ```bash
//! # Reverse 10000 accepted and 10000 rejected strings on 4 workers
//! multiproc reverse --count 10000 --workers 4 --mode async
//!
//! # Same run with every log record funneled into one file
//! multiproc -v reverse --count 10000 --log-file run.log
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod parallel;

pub use config::MultiProcConfig;
pub use error::PoolError;
pub use logging::{LogScope, LogSink, ScopedLogger, with_log_scope};
pub use parallel::{MultiProcPool, RunOptions, RunOutcome, Worker, WorkerOutcome};

/// Result type alias for multiproc operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
