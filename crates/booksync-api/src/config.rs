use std::collections::HashMap;
use std::env;

use booksync_core::config::SyncSettings;
use booksync_core::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub sync: SyncSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BOOKSYNC_API_BIND_ADDR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        if bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "BOOKSYNC_API_BIND_ADDR must be host:port, got `{bind_addr}`"
            )));
        }

        Ok(Self {
            bind_addr,
            sync: SyncSettings::from_lookup(&lookup)?,
        })
    }
}
