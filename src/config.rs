//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3978;

/// Token tenant for multi-tenant bot registrations.
pub const DEFAULT_TENANT: &str = "botframework.com";

/// Connector hosts trusted with the bot's bearer token. `*.` matches any
/// subdomain.
pub const DEFAULT_TRUSTED_SERVICE_HOSTS: &[&str] = &[
    "*.botframework.com",
    "*.botframework.us",
    "*.botframework.azure.us",
    "*.trafficmanager.net",
];

/// Request timeout for the connector and token endpoints.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Bot application identity used to authenticate outbound replies.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_password: SecretString,
    pub tenant_id: String,
}

/// Process-wide bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// `None` runs without outbound authentication (local emulator).
    pub credentials: Option<AppCredentials>,
    pub bind_address: String,
    pub port: u16,
    /// External Adaptive Card file. `None` uses the bundled card.
    pub card_path: Option<PathBuf>,
    /// Host patterns a `serviceUrl` must match before a token is attached.
    pub trusted_service_hosts: Vec<String>,
    pub http_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            card_path: None,
            trusted_service_hosts: DEFAULT_TRUSTED_SERVICE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl BotConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let credentials = match non_empty("MICROSOFT_APP_ID") {
            Some(app_id) => {
                let password = non_empty("MICROSOFT_APP_PASSWORD").ok_or_else(|| {
                    ConfigError::MissingRequired {
                        key: "MICROSOFT_APP_PASSWORD".to_string(),
                        hint: "Set it alongside MICROSOFT_APP_ID, or unset both for local testing."
                            .to_string(),
                    }
                })?;
                Some(AppCredentials {
                    app_id,
                    app_password: SecretString::from(password),
                    tenant_id: non_empty("MICROSOFT_APP_TENANT_ID")
                        .unwrap_or_else(|| DEFAULT_TENANT.to_string()),
                })
            }
            None => None,
        };

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let mut trusted_service_hosts = defaults.trusted_service_hosts;
        if let Some(extra) = non_empty("BOT_TRUSTED_SERVICE_HOSTS") {
            trusted_service_hosts.extend(
                extra
                    .split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty()),
            );
        }

        let http_timeout = match non_empty("BOT_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: "BOT_HTTP_TIMEOUT_SECS".to_string(),
                        message: "must be at least 1 second".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "BOT_HTTP_TIMEOUT_SECS".to_string(),
                        message: format!("{raw:?}: {e}"),
                    });
                }
            },
            None => defaults.http_timeout,
        };

        Ok(Self {
            credentials,
            bind_address: non_empty("BOT_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            card_path: non_empty("BOT_CARD_PATH").map(PathBuf::from),
            trusted_service_hosts,
            http_timeout,
        })
    }

    /// Socket address string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
