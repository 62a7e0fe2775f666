//! Error types.
//!
//! None of these ever prevent a logger from being built: construction
//! degrades to defaults and reports them on the diagnostics channel.

use thiserror::Error;

/// Failure while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure while resolving or firing a hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid settings for hook `{hook}`: {source}")]
    Settings {
        hook: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid DSN `{dsn}`: {reason}")]
    Dsn { dsn: String, reason: String },

    #[error("could not start hook `{hook}`: {reason}")]
    Init { hook: &'static str, reason: String },

    #[error("hook `{hook}` failed: {reason}")]
    Fire { hook: String, reason: String },
}

/// Failure while rendering an entry.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("text rendering failed")]
    Fmt(#[from] std::fmt::Error),
}
