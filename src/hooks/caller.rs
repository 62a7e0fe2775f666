//! Caller location hook.
//!
//! Adds `"<dir>/<file>:<line>"` of the code that called the logger to every
//! entry. The location comes from `#[track_caller]` on the facade methods, so
//! frames inside this crate are never reported.

use serde::Deserialize;
use serde_json::Value;

use crate::error::HookError;
use crate::hooks::{decode_settings, Hook};
use crate::logger::{Entry, Level};

pub const CALLER_HOOK_NAME: &str = "filename_line";
pub const DEFAULT_FIELD_NAME: &str = "where";

#[derive(Debug, Default, Deserialize)]
struct CallerSettings {
    #[serde(default)]
    field_name: String,
}

/// Attaches the caller's short path and line under a configurable key.
#[derive(Debug, Clone)]
pub struct CallerHook {
    field_name: String,
}

impl CallerHook {
    pub fn new(field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self {
            field_name: if field_name.is_empty() {
                DEFAULT_FIELD_NAME.to_string()
            } else {
                field_name
            },
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

pub(crate) fn build(settings: &Value) -> Result<Option<Box<dyn Hook>>, HookError> {
    let settings: CallerSettings = decode_settings(CALLER_HOOK_NAME, settings)?;
    Ok(Some(Box::new(CallerHook::new(settings.field_name))))
}

impl Hook for CallerHook {
    fn name(&self) -> &str {
        CALLER_HOOK_NAME
    }

    fn levels(&self) -> &[Level] {
        &Level::ALL
    }

    fn fire(&self, entry: &mut Entry) -> Result<(), HookError> {
        let location = format!("{}:{}", short_path(entry.location.file()), entry.location.line());
        entry.insert(self.field_name.clone(), location);
        Ok(())
    }
}

/// Keeps the last two components of `file`.
fn short_path(file: &str) -> &str {
    let mut separators = file.rmatch_indices(|c: char| c == '/' || c == '\\');
    match (separators.next(), separators.next()) {
        (Some(_), Some((idx, _))) => &file[idx + 1..],
        _ => file,
    }
}
