//! Batch execution over a bounded worker pool
//!
//! This module takes a list of work items and a worker function, splits the
//! items into partitions, runs the worker on every partition in parallel, and
//! folds the per-partition outcomes into one report.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Partitioning**: Round-robin split of the input into near-equal partitions
//! - **Worker Binding**: Binds a worker to fixed options and working directory
//! - **Execution Strategy**: Synchronous (completion order) or Asynchronous (submission order) dispatch
//! - **Aggregation**: Merges success items, result channels and diagnostics; computes the fail-set
//!
//! ## What This Module Does NOT Do:
//! - **Scheduling**: No work stealing, priorities, persistent queues or timeouts
//! - **Streaming**: Results are only available once the whole batch is done
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ Partitioner │───▶│ WorkerBinding│───▶│ ExecutionStrategy│───▶│  Aggregator  │
//! │             │    │              │    │                  │    │              │
//! │ • i mod P   │    │ • options    │    │ • sync: crossbeam│    │ • success    │
//! │ • chunking  │    │ • working dir│    │ • async: rayon   │    │ • N channels │
//! │             │    │ • panics     │    │ • joined pool    │    │ • fail-set   │
//! └─────────────┘    └──────────────┘    └──────────────────┘    └──────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use multiproc::parallel::{MultiProcPool, Options, RunOptions, WorkerOutcome};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! fn evens(
//!     partition: &[Arc<u32>],
//!     _worker_name: &str,
//!     _options: &Options,
//!     _working_dir: &Path,
//! ) -> anyhow::Result<WorkerOutcome<u32, u32, String>> {
//!     let success: Vec<Arc<u32>> = partition.iter().filter(|v| ***v % 2 == 0).cloned().collect();
//!     let halves = success.iter().map(|v| **v / 2).collect();
//!     Ok(WorkerOutcome::new(success, vec![halves], Vec::new()))
//! }
//!
//! let mut pool: MultiProcPool<u32, u32, String> = MultiProcPool::hashable();
//! pool.configure(evens, Options::new(), ".");
//!
//! let outcome = pool.run_synchronous(1..=10u32, RunOptions::new().workers(2));
//! assert!(!outcome.ok);
//! assert_eq!(outcome.fail_list.len(), 5);
//! assert_eq!(outcome.result_lists[0].len(), 5);
//! ```

pub mod aggregate;
pub mod core;
pub mod partition;
pub mod processor;
pub mod worker;

#[cfg(test)]
mod tests;

// Re-export main types for easier access
pub use aggregate::{RunOutcome, fail_set, identity_difference, value_difference};
pub use core::{AsyncMapResult, ExecutionStrategy, POOL_CHUNK_SIZE};
pub use processor::{MultiProcPool, RunOptions};
pub use worker::{Options, WORKER_NAME, Worker, WorkerBinding, WorkerOutcome};
