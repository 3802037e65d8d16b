//! Configuration loading from disk and the environment.

use std::path::Path;
use std::fs;
use crate::config::schema::ProxySettings;

/// Environment variable naming the storefront origin.
pub const ENV_STORE_URL: &str = "PRINTIFY_STORE_URL";
/// Environment variable naming the alternate storefront origin.
pub const ENV_OVERRIDE_STORE_URL: &str = "USD_STORE_URL";
/// Environment variable fixing the operator-facing origin.
pub const ENV_PUBLIC_ORIGIN: &str = "PROXY_PUBLIC_ORIGIN";
/// Environment variable overriding the bind address.
pub const ENV_BIND_ADDRESS: &str = "PROXY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load settings from an optional TOML file, then apply environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ProxySettings, ConfigError> {
    let mut settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ProxySettings::default(),
    };

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Apply environment overrides using the given lookup.
///
/// Empty values are ignored so an exported-but-blank variable does not
/// clobber the file setting.
pub fn apply_env<F>(settings: &mut ProxySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(origin) = get(ENV_STORE_URL) {
        settings.upstream.origin = Some(origin);
    }
    if let Some(origin) = get(ENV_OVERRIDE_STORE_URL) {
        settings.upstream.override_origin = Some(origin);
    }
    if let Some(origin) = get(ENV_PUBLIC_ORIGIN) {
        settings.public.origin = Some(origin);
    }
    if let Some(addr) = get(ENV_BIND_ADDRESS) {
        settings.listener.bind_address = addr;
    }
}
