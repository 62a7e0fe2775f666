//! Logger construction.

use std::env;
use std::fmt;
use std::sync::Arc;

use crate::config::{HooksConfig, LoggerConfig};
use crate::hooks::HookRegistry;
use crate::logger::{
    formatter_by_name, Fields, Formatter, JsonFormatter, Level, Logger, Output, TextFormatter,
    Writer,
};

/// Environment variable selecting the application environment.
pub const ENV_NAME: &str = "APP_ENV";
/// Environment variable overriding the configured log level.
pub const ENV_LEVEL: &str = "LOG_LEVEL";
/// Environment that forces JSON output.
pub const PRODUCTION: &str = "production";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Everything needed to build a [`Logger`].
#[derive(Clone)]
pub struct Settings {
    pub environment: String,
    pub level: String,
    /// Explicit formatter; ignored in production.
    pub formatter: Option<Arc<dyn Formatter>>,
    /// Named formatter, used when no explicit formatter is set.
    pub formatter_name: String,
    pub base_fields: Fields,
    pub hooks: HooksConfig,
    pub output: Output,
    pub registry: HookRegistry,
    /// Called by `Logger::fatal` after writing.
    pub exit: fn(i32) -> !,
}

fn process_exit(code: i32) -> ! {
    std::process::exit(code)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            formatter: None,
            formatter_name: String::new(),
            base_fields: Fields::new(),
            hooks: HooksConfig::Unset,
            output: Output::stdout(),
            registry: HookRegistry::builtin(),
            exit: process_exit,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("level", &self.level)
            .field("formatter", &self.formatter)
            .field("formatter_name", &self.formatter_name)
            .field("base_fields", &self.base_fields)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Settings for `config`, with the environment applied: `APP_ENV` selects
    /// the environment and a non-empty `LOG_LEVEL` replaces the configured level.
    pub fn from_config(config: &LoggerConfig) -> Self {
        let level = match env::var(ENV_LEVEL) {
            Ok(level) if !level.is_empty() => level,
            _ => config.log_level.clone(),
        };

        Self {
            environment: env::var(ENV_NAME).unwrap_or_default(),
            level,
            formatter: config.formatter_instance.clone(),
            formatter_name: config.formatter_name.clone(),
            hooks: config.hooks.clone(),
            ..Self::default()
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_formatter_name(mut self, name: impl Into<String>) -> Self {
        self.formatter_name = name.into();
        self
    }

    pub fn with_base_fields(mut self, fields: impl Into<Fields>) -> Self {
        self.base_fields = fields.into();
        self
    }

    pub fn with_hooks(mut self, hooks: HooksConfig) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_output(mut self, output: impl Into<Output>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_registry(mut self, registry: HookRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_exit(mut self, exit: fn(i32) -> !) -> Self {
        self.exit = exit;
        self
    }

    pub(crate) fn build(self) -> Logger {
        let formatter = resolve_formatter(&self.environment, self.formatter, &self.formatter_name);
        let hooks = self.registry.resolve(&self.hooks.descriptors());
        let level = resolve_level(&self.level);

        Logger {
            writer: Arc::new(Writer {
                level,
                formatter,
                output: self.output,
                hooks,
                exit: self.exit,
            }),
            fields: self.base_fields,
            error_type: None,
        }
    }
}

fn resolve_formatter(
    environment: &str,
    explicit: Option<Arc<dyn Formatter>>,
    name: &str,
) -> Arc<dyn Formatter> {
    if environment == PRODUCTION {
        return Arc::new(JsonFormatter::default());
    }
    if let Some(formatter) = explicit {
        return formatter;
    }
    if !name.is_empty() {
        if let Some(formatter) = formatter_by_name(name) {
            return formatter;
        }
        tracing::debug!(formatter = %name, "Unknown formatter name, using text output");
    }
    Arc::new(TextFormatter::default())
}

fn resolve_level(level: &str) -> Level {
    let level = if level.is_empty() { DEFAULT_LOG_LEVEL } else { level };
    match level.parse() {
        Ok(level) => level,
        Err(e) => {
            tracing::debug!(error = %e, "Falling back to info level");
            Level::Info
        }
    }
}
