//! Runtime configuration
//!
//! Values come from environment variables (after `.env` is loaded by the
//! binary). Tests build configs through [`AppConfig::from_lookup`] instead
//! of mutating the process environment.

use std::time::Duration;

use crate::error::ConfigError;
use crate::platform::Platform;
use crate::resolver::DEFAULT_RESOLVER_URL;
use crate::suppressor::DEFAULT_REPLAY_WINDOW;
use crate::validator::LinkPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port
    pub port: u16,

    /// App scheme and share domain
    pub policy: LinkPolicy,

    /// Platform resolved links are opened on; `None` keeps the original link
    pub preferred_platform: Option<Platform>,

    /// Link Resolution API endpoint
    pub resolver_url: String,

    /// Country code passed to the resolver
    pub user_country: String,

    /// Duplicate-suppression window
    pub replay_window: Duration,

    /// Shared secret for `/api/*`; `None` disables the check
    pub api_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            policy: LinkPolicy::default(),
            preferred_platform: None,
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            user_country: "US".to_string(),
            replay_window: DEFAULT_REPLAY_WINDOW,
            api_secret: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Unset or empty keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key: "PORT", value })?,
            None => defaults.port,
        };

        let replay_window = match get("REPLAY_WINDOW_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { key: "REPLAY_WINDOW_SECS", value })?,
            ),
            None => defaults.replay_window,
        };

        let preferred_platform = match get("PREFERRED_PLATFORM") {
            Some(id) => Some(Platform::from_id(&id).ok_or(ConfigError::UnknownPlatform(id))?),
            None => None,
        };

        let policy = LinkPolicy {
            app_scheme: get("APP_SCHEME")
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or(defaults.policy.app_scheme),
            share_domain: get("SHARE_DOMAIN")
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or(defaults.policy.share_domain),
        };
        if policy.app_scheme == "http" || policy.app_scheme == "https" {
            return Err(ConfigError::InvalidScheme(policy.app_scheme));
        }

        Ok(Self {
            port,
            policy,
            preferred_platform,
            resolver_url: get("RESOLVER_URL").unwrap_or(defaults.resolver_url),
            user_country: get("USER_COUNTRY").unwrap_or(defaults.user_country),
            replay_window,
            api_secret: get("AUTHORIZATION"),
        })
    }
}
