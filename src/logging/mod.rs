//! Concurrent log aggregation
//!
//! A [`LogScope`] collects records from the entering thread and from every
//! worker thread handed its [`ScopedLogger`], and writes them to one
//! destination through a serialized writer. Records never interleave and each
//! one is flushed before the next is written.
//!
//! ```rust
//! use multiproc::logging::{LogBuffer, LogSink, with_log_scope};
//!
//! let buffer = LogBuffer::new();
//! with_log_scope(
//!     LogSink::Buffer(buffer.clone()),
//!     "{level} {message}",
//!     tracing::Level::INFO,
//!     |logger| {
//!         logger.info("first");
//!         logger.debug("filtered out");
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(buffer.lines(), vec!["INFO first"]);
//! ```

pub mod format;
pub mod scope;
pub mod sink;


pub use format::{DEFAULT_FORMAT, TemplateFormat};
pub use scope::{LogScope, ScopedLogger, with_log_scope};
pub use sink::{LogBuffer, LogSink};
