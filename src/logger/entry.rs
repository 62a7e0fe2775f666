//! A single log record as seen by hooks and formatters.

use std::panic::Location;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::logger::{Fields, Level};

/// One log record.
///
/// Hooks receive it mutably before formatting, so they may add fields.
#[derive(Debug, Clone)]
pub struct Entry {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
    /// Source location of the facade call that produced this entry.
    pub location: &'static Location<'static>,
    /// Type name of the error attached with `Logger::with_error`, if any.
    pub error_type: Option<&'static str>,
}

impl Entry {
    pub fn new(level: Level, message: String, fields: Fields, location: &'static Location<'static>) -> Self {
        Self {
            time: Utc::now(),
            level,
            message,
            fields,
            location,
            error_type: None,
        }
    }

    /// Adds or replaces a field on this entry only.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields = self.fields.with(key, value);
    }
}
