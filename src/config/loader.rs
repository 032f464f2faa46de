// Configuration loader
// Loads ~/.pulsewatch/config.toml, then applies environment overrides

use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Default location of the config file
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".pulsewatch/config.toml"))
}

/// Load configuration from the Pulsewatch config file and environment
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    let mut config = load_config_from(&path)?;
    config.apply_env(|name| std::env::var(name).ok());
    validate(&config)?;
    Ok(config)
}

/// Load configuration from an explicit file (missing file = defaults)
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!(crate::errors::config_parse_error(&e.to_string())))?;

    validate(&config)?;
    Ok(config)
}

impl Config {
    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PULSEWATCH_API_URL").filter(|v| !v.is_empty()) {
            self.client.base_url = url;
        }

        if let Some(secs) = lookup("PULSEWATCH_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => self.client.timeout_seconds = secs,
                _ => tracing::warn!(value = %secs, "Ignoring invalid PULSEWATCH_TIMEOUT_SECS"),
            }
        }

        if let Some(debug) = lookup("PULSEWATCH_DEBUG") {
            self.debug = debug == "1" || debug.eq_ignore_ascii_case("true");
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    let url = Url::parse(&config.client.base_url)
        .with_context(|| format!("Invalid base URL '{}'", config.client.base_url))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        bail!(
            "Invalid base URL '{}': scheme must be http or https",
            config.client.base_url
        );
    }

    if config.client.timeout_seconds == 0 {
        bail!("client.timeout_seconds must be greater than 0");
    }

    Ok(())
}
