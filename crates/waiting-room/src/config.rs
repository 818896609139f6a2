//! Waiting room configuration.
//!
//! Configuration is loaded from environment variables. Session flags loaded
//! here are only initial values; at runtime the session service owns them
//! and pushes changes through the registry.

use crate::types::SessionFlags;
use common::config::{ObservabilityConfig, DEFAULT_LOG_LEVEL};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default limit for the lobby message shown to waiting users.
pub const DEFAULT_LOBBY_MESSAGE_MAX_CHARS: usize = 128;

/// Default timeout for each backend call.
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;

/// Waiting room configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Initial `waitingRoomEnabled` (default: true).
    pub waiting_room_enabled: bool,

    /// Initial `authenticatedGuestModeEnabled` (default: false).
    pub authenticated_guest: bool,

    /// Initial `lobbyMessageFeatureEnabled` (default: false).
    pub lobby_message_enabled: bool,

    /// Initial `allowRememberChoice` (default: true).
    pub allow_remember_choice: bool,

    /// Maximum lobby message length in characters (default: 128).
    pub lobby_message_max_chars: usize,

    /// Timeout applied to every backend call (default: 5s).
    pub backend_timeout: Duration,

    /// Close the panel after a batch action (default: true).
    pub close_panel_on_batch: bool,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            waiting_room_enabled: true,
            authenticated_guest: false,
            lobby_message_enabled: false,
            allow_remember_choice: true,
            lobby_message_max_chars: DEFAULT_LOBBY_MESSAGE_MAX_CHARS,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            close_panel_on_batch: true,
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let waiting_room_enabled =
            parse_bool(vars, "WR_WAITING_ROOM_ENABLED", defaults.waiting_room_enabled)?;
        let authenticated_guest =
            parse_bool(vars, "WR_AUTHENTICATED_GUEST", defaults.authenticated_guest)?;
        let lobby_message_enabled =
            parse_bool(vars, "WR_LOBBY_MESSAGE_ENABLED", defaults.lobby_message_enabled)?;
        let allow_remember_choice =
            parse_bool(vars, "WR_ALLOW_REMEMBER_CHOICE", defaults.allow_remember_choice)?;
        let close_panel_on_batch =
            parse_bool(vars, "WR_CLOSE_PANEL_ON_BATCH", defaults.close_panel_on_batch)?;
        let json_logs = parse_bool(vars, "WR_JSON_LOGS", defaults.observability.json_logs)?;

        let lobby_message_max_chars = parse_positive(
            vars,
            "WR_LOBBY_MESSAGE_MAX_CHARS",
            DEFAULT_LOBBY_MESSAGE_MAX_CHARS,
        )?;
        let backend_timeout_ms =
            parse_positive(vars, "WR_BACKEND_TIMEOUT_MS", DEFAULT_BACKEND_TIMEOUT_MS)?;

        let log_level = vars
            .get("WR_LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Config {
            waiting_room_enabled,
            authenticated_guest,
            lobby_message_enabled,
            allow_remember_choice,
            lobby_message_max_chars,
            backend_timeout: Duration::from_millis(backend_timeout_ms),
            close_panel_on_batch,
            observability: ObservabilityConfig {
                log_level,
                json_logs,
            },
        })
    }

    /// Session flags to seed the registry with.
    #[must_use]
    pub fn initial_flags(&self) -> SessionFlags {
        SessionFlags {
            waiting_room_enabled: self.waiting_room_enabled,
            authenticated_guest_mode_enabled: self.authenticated_guest,
            lobby_message_feature_enabled: self.lobby_message_enabled,
            allow_remember_choice: self.allow_remember_choice,
        }
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(name, raw)),
    }
}

fn parse_positive<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(invalid(name, raw)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config, Config::default());
        assert_eq!(config.lobby_message_max_chars, 128);
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.initial_flags(), SessionFlags::default());
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let config = Config::from_vars(&vars(&[
            ("WR_WAITING_ROOM_ENABLED", "false"),
            ("WR_AUTHENTICATED_GUEST", "YES"),
            ("WR_LOBBY_MESSAGE_ENABLED", "1"),
            ("WR_ALLOW_REMEMBER_CHOICE", "no"),
            ("WR_LOBBY_MESSAGE_MAX_CHARS", "64"),
            ("WR_BACKEND_TIMEOUT_MS", "750"),
            ("WR_CLOSE_PANEL_ON_BATCH", "0"),
            ("WR_LOG_LEVEL", "waiting_room=debug"),
            ("WR_JSON_LOGS", "true"),
        ]))
        .expect("Config should load successfully");

        assert_eq!(
            config.initial_flags(),
            SessionFlags {
                waiting_room_enabled: false,
                authenticated_guest_mode_enabled: true,
                lobby_message_feature_enabled: true,
                allow_remember_choice: false,
            }
        );
        assert_eq!(config.lobby_message_max_chars, 64);
        assert_eq!(config.backend_timeout, Duration::from_millis(750));
        assert!(!config.close_panel_on_batch);
        assert_eq!(config.observability.log_level, "waiting_room=debug");
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let result = Config::from_vars(&vars(&[("WR_AUTHENTICATED_GUEST", "maybe")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name, .. }) if name == "WR_AUTHENTICATED_GUEST"
        ));
    }

    #[test]
    fn test_zero_and_garbage_numbers_rejected() {
        for (name, value) in [
            ("WR_BACKEND_TIMEOUT_MS", "0"),
            ("WR_BACKEND_TIMEOUT_MS", "soon"),
            ("WR_LOBBY_MESSAGE_MAX_CHARS", "0"),
            ("WR_LOBBY_MESSAGE_MAX_CHARS", "-5"),
        ] {
            let result = Config::from_vars(&vars(&[(name, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { name: ref n, .. }) if n == name),
                "{name}={value}"
            );
        }
    }
}
