use crate::config::MultiProcConfig;
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration as JSON
    Show,
    /// Get a configuration value or section (e.g. pool.num_workers)
    Get { key: String },
    /// Check that every section deserializes
    Validate,
}

pub fn execute(args: ConfigArgs, custom_config: Option<&str>) -> Result<()> {
    let config = MultiProcConfig::load_with_custom_config(custom_config)?;

    match args.command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&config.get_full_config()?)?);
        }
        ConfigCommand::Get { key } => {
            let value = config
                .get_section(&key)
                .map_err(|_| anyhow!("Configuration key '{}' not found", key))?;
            match value {
                serde_json::Value::String(s) => println!("{}", s),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    println!("{}", serde_json::to_string_pretty(&value)?)
                }
                other => println!("{}", other),
            }
        }
        ConfigCommand::Validate => {
            config.pool_settings()?;
            config.log_settings()?.level()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
