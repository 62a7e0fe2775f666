//! Structured logging for gRPC services.
//!
//! A leveled logger with immutable field sets and pluggable formatters and
//! hooks, a request [`Context`] that carries it, and interceptors that log
//! exactly one line per gRPC call.

pub mod config;
pub mod context;
pub mod error;
pub mod grpc;
pub mod hooks;
pub mod logger;

pub use config::{load_config, parse_config, HookDescriptor, HooksConfig, LoggerConfig};
pub use context::{Context, LoggerExt};
pub use error::{ConfigError, FormatError, HookError};
pub use grpc::{
    severity_for, CallInfo, Code, GrpcLoggerLayer, LoggedStream, ServerStream, Status,
    StreamInterceptor, UnaryInterceptor,
};
pub use hooks::{CallerHook, Hook, HookRegistry, SentryHook};
pub use logger::{Fields, Level, Logger, Settings};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
