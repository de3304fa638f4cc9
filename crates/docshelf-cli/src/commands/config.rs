//! Config command handlers

use anyhow::Result;

use docshelf_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_level": config.log_level,
                    "require_valid_credential": config.require_valid_credential,
                    "request_timeout_secs": config.request_timeout_secs,
                    "default_search_type": config.default_search_type,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:                 {}", config.data_dir.display());
            println!("  log_level:                {}", config.log_level);
            println!(
                "  require_valid_credential: {}",
                config.require_valid_credential
            );
            println!(
                "  request_timeout_secs:     {}",
                config
                    .request_timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  default_search_type:      {}", config.default_search_type);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}
