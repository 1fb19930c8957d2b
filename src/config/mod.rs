//! Configuration management for multiproc
//!
//! Settings are layered with figment: embedded defaults, then a project file
//! (`multiproc.toml`, `.json` or `.yaml`) or an explicit `--config` path, then
//! `MULTIPROC_` environment variables.

pub mod core;


pub use core::{LogSettings, MultiProcConfig, PoolSettings};
