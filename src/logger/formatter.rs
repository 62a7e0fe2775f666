//! Entry formatters.
//!
//! # Responsibilities
//! - Render an [`Entry`] to the bytes written to the output
//! - Provide the machine-readable (JSON), human-readable (text) and custom
//!   bracketed formats
//! - Resolve a formatter from its configured name
//!
//! # Design Decisions
//! - One line per entry, always newline-terminated
//! - Field keys are rendered in sorted order for stable output
//! - JSON keys that collide with `time`, `level` or `msg` are prefixed with `fields.`

use std::fmt::{self, Write as _};
use std::sync::Arc;

use colored::Colorize;
use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::logger::fields::display_value;
use crate::logger::{Entry, Level};

/// Renders entries.
pub trait Formatter: Send + Sync + fmt::Debug {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError>;
}

/// Looks up a formatter by its configured name (case-insensitive).
pub fn formatter_by_name(name: &str) -> Option<Arc<dyn Formatter>> {
    match name.to_ascii_lowercase().as_str() {
        "custom" => Some(Arc::new(CustomFormatter)),
        "json" => Some(Arc::new(JsonFormatter::default())),
        "text" => Some(Arc::new(TextFormatter::default())),
        _ => None,
    }
}

/// One JSON object per line.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub disable_timestamp: bool,
    /// strftime pattern; RFC 2822 when unset.
    pub timestamp_format: Option<String>,
}

impl Formatter for JsonFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        let mut object = Map::new();
        for (key, value) in entry.fields.iter() {
            let key = match key.as_str() {
                "time" | "level" | "msg" => format!("fields.{}", key),
                _ => key.clone(),
            };
            object.insert(key, value.clone());
        }
        if !self.disable_timestamp {
            object.insert(
                "time".to_string(),
                Value::String(format_time(entry, self.timestamp_format.as_deref())),
            );
        }
        object.insert("level".to_string(), Value::String(entry.level.to_string()));
        object.insert("msg".to_string(), Value::String(entry.message.clone()));

        let mut bytes = serde_json::to_vec(&Value::Object(object))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Human-readable `LEVEL[time] message key=value` lines.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    pub colors: bool,
    pub full_timestamp: bool,
    /// strftime pattern; RFC 2822 when unset.
    pub timestamp_format: Option<String>,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colors: true,
            full_timestamp: true,
            timestamp_format: None,
        }
    }
}

impl TextFormatter {
    fn level_label(&self, level: Level) -> String {
        let mut label = level.as_str().to_ascii_uppercase();
        label.truncate(4);
        if !self.colors {
            return label;
        }
        match level {
            Level::Trace | Level::Debug => label.white().to_string(),
            Level::Info => label.cyan().to_string(),
            Level::Warn => label.yellow().to_string(),
            Level::Error | Level::Fatal | Level::Panic => label.red().to_string(),
        }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        let mut line = self.level_label(entry.level);
        if self.full_timestamp {
            write!(line, "[{}]", format_time(entry, self.timestamp_format.as_deref()))?;
        }
        write!(line, " {:<44}", entry.message)?;
        for (key, value) in entry.fields.iter() {
            write!(line, " {}={}", key, quote_if_needed(&display_value(value)))?;
        }
        let mut line = line.trim_end().to_string();
        line.push('\n');
        Ok(line.into_bytes())
    }
}

/// `"<time> [<level>] <map[k:v ...]>: <message>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomFormatter;

impl Formatter for CustomFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>, FormatError> {
        Ok(format!(
            "{} [{}] <{}>: {}\n",
            entry.time.to_rfc3339(),
            entry.level,
            entry.fields.to_map_string(),
            entry.message
        )
        .into_bytes())
    }
}

fn format_time(entry: &Entry, pattern: Option<&str>) -> String {
    match pattern {
        Some(pattern) => entry.time.format(pattern).to_string(),
        None => entry.time.to_rfc2822(),
    }
}

fn quote_if_needed(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-._/@^+:".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("{:?}", value)
    }
}
