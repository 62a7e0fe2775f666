//! Side-effect hooks fired on qualifying log entries.
//!
//! # Responsibilities
//! - Define the `Hook` contract (levels + fire)
//! - Map hook names from configuration to factories
//! - Resolve configured descriptors into hooks at construction time
//!
//! # Design Decisions
//! - Unknown hook names are skipped: configs may reference hooks this build lacks
//! - A factory may decline (`Ok(None)`), e.g. the error reporter without a DSN
//! - Decode failures are reported on the diagnostics channel and the hook is
//!   left out; they never stop the logger from being built

pub mod caller;
pub mod sentry;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::HookDescriptor;
use crate::error::HookError;
use crate::logger::{Entry, Level};

pub use caller::{CallerHook, CALLER_HOOK_NAME};
pub use sentry::{SentryHook, SENTRY_HOOK_NAME};

/// A handler run for every written entry whose level is in `levels()`.
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    fn levels(&self) -> &[Level];

    fn fire(&self, entry: &mut Entry) -> Result<(), HookError>;

    /// Completes pending side effects, within the hook's own time bound.
    /// Called before fatal and panic entries end the process or thread.
    fn flush(&self) {}
}

/// Builds a hook from its settings. `Ok(None)` means the hook is disabled.
pub type HookFactory = fn(&Value) -> Result<Option<Box<dyn Hook>>, HookError>;

/// Name → factory table consulted when a logger is built.
#[derive(Clone)]
pub struct HookRegistry {
    factories: BTreeMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the caller-location and error-reporting hooks.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register(CALLER_HOOK_NAME, caller::build)
            .register(SENTRY_HOOK_NAME, sentry::build);
        registry
    }

    /// Adds or replaces the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: HookFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the hooks for `descriptors`, in order.
    pub fn resolve(&self, descriptors: &[HookDescriptor]) -> Vec<Arc<dyn Hook>> {
        let mut hooks: Vec<Arc<dyn Hook>> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let Some(factory) = self.factories.get(&descriptor.name) else {
                tracing::debug!(hook = %descriptor.name, "Skipping unknown hook");
                continue;
            };
            match factory(&descriptor.settings) {
                Ok(Some(hook)) => hooks.push(Arc::from(hook)),
                Ok(None) => tracing::debug!(hook = %descriptor.name, "Hook disabled by its settings"),
                Err(e) => tracing::warn!(hook = %descriptor.name, error = %e, "Init hook failed"),
            }
        }
        hooks
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Decodes hook settings; `null` decodes as the default settings.
pub(crate) fn decode_settings<T>(hook: &'static str, settings: &Value) -> Result<T, HookError>
where
    T: DeserializeOwned + Default,
{
    if settings.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(settings.clone()).map_err(|source| HookError::Settings { hook, source })
}
