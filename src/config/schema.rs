//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logger::Formatter;

/// Root logger configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level name (e.g. "debug"). Overridden by `LOG_LEVEL` when set.
    pub log_level: String,

    /// Named formatter: "custom", "json" or "text".
    pub formatter_name: String,

    /// Pre-built formatter; takes precedence over `formatter_name` outside production.
    #[serde(skip)]
    pub formatter_instance: Option<Arc<dyn Formatter>>,

    /// Hooks, as a list of `{name, settings}` entries or a name → settings table.
    pub hooks: HooksConfig,
}

/// A single hook entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HookDescriptor {
    pub name: String,

    #[serde(default)]
    pub settings: Value,
}

impl HookDescriptor {
    pub fn new(name: impl Into<String>, settings: Value) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }
}

/// The accepted shapes of the `hooks` setting.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HooksConfig {
    #[default]
    Unset,
    /// `[[hooks]] name = "..." settings = {...}`
    List(Vec<Value>),
    /// `[hooks.<name>] ...settings`
    Map(BTreeMap<String, Value>),
    /// Anything else; resolves to no hooks.
    Other(Value),
}

impl HooksConfig {
    /// Normalizes either shape to an ordered list of descriptors.
    ///
    /// List entries keep their order and entries that are not `{name, settings}`
    /// tables are dropped. Table entries are ordered by hook name.
    pub fn descriptors(&self) -> Vec<HookDescriptor> {
        match self {
            HooksConfig::List(entries) => entries
                .iter()
                .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                    Ok(descriptor) => Some(descriptor),
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping malformed hook entry");
                        None
                    }
                })
                .collect(),
            HooksConfig::Map(map) => map
                .iter()
                .map(|(name, settings)| HookDescriptor::new(name.clone(), settings.clone()))
                .collect(),
            HooksConfig::Unset | HooksConfig::Other(_) => Vec::new(),
        }
    }
}

impl From<Vec<HookDescriptor>> for HooksConfig {
    fn from(descriptors: Vec<HookDescriptor>) -> Self {
        HooksConfig::List(
            descriptors
                .into_iter()
                .map(|d| serde_json::json!({ "name": d.name, "settings": d.settings }))
                .collect(),
        )
    }
}
