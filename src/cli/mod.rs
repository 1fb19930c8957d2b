//! Command-line interface for multiproc
//!
//! A small demo front end over the library: it runs the string reversal
//! worker through either execution strategy and shows the merged
//! configuration.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
