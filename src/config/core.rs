use crate::parallel::{ExecutionStrategy, RunOptions};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// `[pool]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub num_workers: usize,
    pub num_results: usize,
    pub sync_chunk_size: usize,
    pub async_chunk_size: usize,
    pub working_dir: PathBuf,
}

impl PoolSettings {
    /// Run options for `strategy`, using the chunk size configured for it
    pub fn run_options(&self, strategy: ExecutionStrategy) -> RunOptions {
        let chunk_size = match strategy {
            ExecutionStrategy::Synchronous => self.sync_chunk_size,
            ExecutionStrategy::Asynchronous => self.async_chunk_size,
        };
        RunOptions::new()
            .workers(self.num_workers)
            .results(self.num_results)
            .chunk_size(chunk_size)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub format: String,
    pub level: String,
}

impl LogSettings {
    pub fn level(&self) -> Result<Level> {
        self.level
            .parse::<Level>()
            .with_context(|| format!("Invalid log level '{}'", self.level))
    }
}

pub struct MultiProcConfig {
    figment: Figment,
}

impl MultiProcConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        // A custom config replaces the project files, never the defaults or env vars
        if let Some(custom_path) = custom_config {
            figment = if custom_path.ends_with(".json") {
                figment.merge(Json::file(custom_path))
            } else if custom_path.ends_with(".yaml") || custom_path.ends_with(".yml") {
                figment.merge(Yaml::file(custom_path))
            } else {
                figment.merge(Toml::file(custom_path))
            };
        } else {
            figment = figment
                .merge(Toml::file("multiproc.toml"))
                .merge(Json::file("multiproc.json"))
                .merge(Yaml::file("multiproc.yaml"))
                .merge(Yaml::file("multiproc.yml"));
        }

        // MULTIPROC_POOL__NUM_WORKERS=8 -> pool.num_workers
        figment = figment.merge(Env::prefixed("MULTIPROC_").split("__"));

        Ok(MultiProcConfig { figment })
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    pub fn pool_settings(&self) -> Result<PoolSettings> {
        self.figment
            .extract_inner("pool")
            .context("Invalid [pool] configuration")
    }

    pub fn log_settings(&self) -> Result<LogSettings> {
        self.figment
            .extract_inner("logging")
            .context("Invalid [logging] configuration")
    }
}
