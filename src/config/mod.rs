//! Configuration management.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → LoggerConfig
//!     → Settings::from_config (APP_ENV / LOG_LEVEL applied)
//!     → Logger
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Hook settings stay untyped here; each hook decodes its own

pub mod loader;
pub mod schema;

pub use loader::{load_config, parse_config};
pub use schema::{HookDescriptor, HooksConfig, LoggerConfig};
