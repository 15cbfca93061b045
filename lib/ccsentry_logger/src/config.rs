//! Environment-driven configuration.

use std::env;

use crate::{dsn::sanitize_dsn, integrations::IntegrationSelection};

/// Reads a boolean from the environment variable `name`.
///
/// Unset, empty and unrecognized values (including non-UTF-8 ones) yield `default`. Recognized
/// values are matched case-insensitively after trimming whitespace.
pub fn parse_bool_env(name: &str, default: bool) -> bool {
    let Ok(value) = env::var(name) else {
        return default;
    };
    parse_bool(&value).unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "t" => Some(true),
        "n" | "no" | "false" | "0" | "f" => Some(false),
        _ => None,
    }
}

/// Snapshot of the Sentry client configuration taken from the environment.
///
/// A new snapshot is read on each [`Self::from_env()`] call; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentryLoggerConfig {
    /// Sanitized DSN; `None` disables error reporting.
    pub dsn: Option<String>,
    /// Passed through as the SDK debug flag.
    pub debug: bool,
    /// Whether the SDK default integrations are enabled.
    pub enable_default_integrations: bool,
    /// Whether the logging integration is kept among the default integrations.
    pub enable_logging_integration: bool,
    /// Whether auto-enabling integrations are enabled.
    pub enable_auto_integrations: bool,
}

impl SentryLoggerConfig {
    pub const DSN_ENV_VAR: &'static str = "SENTRY_DSN";
    pub const DEBUG_ENV_VAR: &'static str = "CCSENTRY_DEBUG";
    pub const DEFAULT_INTEGRATIONS_ENV_VAR: &'static str = "CCSENTRY_DEFAULT_INTEGRATIONS";
    pub const LOGGING_INTEGRATION_ENV_VAR: &'static str = "CCSENTRY_AUTO_ENABLE_LOG";
    pub const AUTO_INTEGRATIONS_ENV_VAR: &'static str = "CCSENTRY_AUTO_INTEGRATIONS";

    /// Env vars read by [`Self::from_env()`].
    pub const ENV_VARS: [&'static str; 5] = [
        Self::DSN_ENV_VAR,
        Self::DEBUG_ENV_VAR,
        Self::DEFAULT_INTEGRATIONS_ENV_VAR,
        Self::LOGGING_INTEGRATION_ENV_VAR,
        Self::AUTO_INTEGRATIONS_ENV_VAR,
    ];

    pub fn from_env() -> Self {
        let dsn = env::var(Self::DSN_ENV_VAR)
            .ok()
            .filter(|dsn| !dsn.is_empty())
            .map(|dsn| sanitize_dsn(&dsn));
        Self {
            dsn,
            debug: parse_bool_env(Self::DEBUG_ENV_VAR, false),
            enable_default_integrations: parse_bool_env(Self::DEFAULT_INTEGRATIONS_ENV_VAR, true),
            enable_logging_integration: parse_bool_env(Self::LOGGING_INTEGRATION_ENV_VAR, false),
            enable_auto_integrations: parse_bool_env(Self::AUTO_INTEGRATIONS_ENV_VAR, false),
        }
    }

    pub fn integration_selection(&self) -> IntegrationSelection {
        IntegrationSelection {
            enable_defaults: self.enable_default_integrations,
            enable_logging: self.enable_logging_integration,
            enable_auto: self.enable_auto_integrations,
        }
    }
}
