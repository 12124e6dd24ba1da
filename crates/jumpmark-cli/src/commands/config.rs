//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use jumpmark_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "quota_bytes": config.quota_bytes,
                    "per_page": config.per_page,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:    {}", config.data_dir.display());
            println!("  quota_bytes: {}", config.quota_bytes);
            println!("  per_page:    {}", config.per_page);
            println!(
                "  log_file:    {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "quota_bytes" => {
            config.quota_bytes = value
                .parse()
                .context("Invalid value for quota_bytes. Use a number of bytes.")?;
        }
        "per_page" => {
            let per_page: usize = value
                .parse()
                .context("Invalid value for per_page. Use a positive number.")?;
            if per_page == 0 {
                bail!("per_page must be at least 1");
            }
            config.per_page = per_page;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, quota_bytes, per_page, log_file",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "quota_bytes", "2048").unwrap();
        apply(&mut config, "per_page", "50").unwrap();
        apply(&mut config, "log_file", "/tmp/jumpmark.log").unwrap();
        assert_eq!(config.quota_bytes, 2048);
        assert_eq!(config.per_page, 50);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/jumpmark.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "quota_bytes", "big").is_err());
        assert!(apply(&mut config, "per_page", "0").is_err());
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
        assert_eq!(config.per_page, 20);
    }
}
