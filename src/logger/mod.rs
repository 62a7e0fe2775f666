//! Leveled logging facade.
//!
//! # Data Flow
//! ```text
//! Settings / LoggerConfig
//!     → formatter resolution (environment, instance, name)
//!     → hook resolution (HookRegistry)
//!     → Writer (immutable, shared via Arc)
//!     → Logger (Writer + Fields)
//!
//! logger.with_field(..)   → new Logger, same Writer, merged Fields
//! logger.info(..)         → Entry → hooks → Formatter → Output
//! ```
//!
//! # Design Decisions
//! - No process-wide state: every `Logger` carries its own `Writer`
//! - Construction never fails; misconfiguration degrades to defaults
//! - `fatal`/`panic` are terminal and return `!`

pub mod entry;
pub mod fields;
pub mod formatter;
pub mod level;
pub mod output;
mod settings;

use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::LoggerConfig;
use crate::hooks::Hook;

pub use entry::Entry;
pub use fields::{Fields, ERROR_KEY};
pub use formatter::{formatter_by_name, CustomFormatter, Formatter, JsonFormatter, TextFormatter};
pub use level::{Level, ParseLevelError};
pub use output::{Output, SharedBuffer};
pub use settings::{
    Settings, DEFAULT_ENVIRONMENT, DEFAULT_LOG_LEVEL, ENV_LEVEL, ENV_NAME, PRODUCTION,
};

/// Backing configuration shared by a logger and everything derived from it.
pub struct Writer {
    level: Level,
    formatter: Arc<dyn Formatter>,
    output: Output,
    hooks: Vec<Arc<dyn Hook>>,
    exit: fn(i32) -> !,
}

impl Writer {
    fn flush(&self) {
        for hook in &self.hooks {
            hook.flush();
        }
    }

    fn dispatch(&self, mut entry: Entry) {
        for hook in &self.hooks {
            if !hook.levels().contains(&entry.level) {
                continue;
            }
            if let Err(e) = hook.fire(&mut entry) {
                tracing::warn!(hook = hook.name(), error = %e, "Failed to fire hook");
            }
        }

        match self.formatter.format(&entry) {
            Ok(bytes) => {
                if let Err(e) = self.output.write_line(&bytes) {
                    tracing::warn!(error = %e, "Failed to write log entry");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to format log entry"),
        }
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("level", &self.level)
            .field("formatter", &self.formatter)
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The logging facade.
///
/// Cheap to clone. Specialization (`with_*`) returns a new logger and leaves
/// the receiver untouched, so loggers can be derived concurrently from a
/// common parent without locking.
#[derive(Clone, Debug)]
pub struct Logger {
    writer: Arc<Writer>,
    fields: Fields,
    error_type: Option<&'static str>,
}

impl Logger {
    /// Builds a logger from a loaded configuration, honouring the `APP_ENV`
    /// and `LOG_LEVEL` environment variables. Never fails.
    pub fn new(config: &LoggerConfig, base_fields: impl Into<Fields>) -> Logger {
        Settings::from_config(config)
            .with_base_fields(base_fields)
            .build()
    }

    /// Builds a logger from explicit settings. Never fails.
    pub fn from_settings(settings: Settings) -> Logger {
        settings.build()
    }

    /// The logger handed out when a context carries none: development
    /// environment, info level, text output to stdout, no hooks.
    pub fn fallback() -> Logger {
        static FALLBACK: OnceLock<Logger> = OnceLock::new();
        FALLBACK.get_or_init(|| Settings::default().build()).clone()
    }

    pub fn level(&self) -> Level {
        self.writer.level
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.writer.formatter
    }

    /// Names of the hooks registered on the backing writer, in firing order.
    pub fn hook_names(&self) -> Vec<&str> {
        self.writer.hooks.iter().map(|h| h.name()).collect()
    }

    /// Whether `other` writes through the same backing writer.
    pub fn shares_writer(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.writer, &other.writer)
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level <= self.writer.level
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Logger {
        self.derive(self.fields.with(key, value))
    }

    pub fn with_fields(&self, fields: &Fields) -> Logger {
        self.derive(self.fields.merge(fields))
    }

    pub fn with_error<E>(&self, err: &E) -> Logger
    where
        E: Error + ?Sized + 'static,
    {
        Logger {
            writer: Arc::clone(&self.writer),
            fields: self.fields.with(ERROR_KEY, err.to_string()),
            error_type: Some(std::any::type_name::<E>()),
        }
    }

    fn derive(&self, fields: Fields) -> Logger {
        Logger {
            writer: Arc::clone(&self.writer),
            fields,
            error_type: self.error_type,
        }
    }

    /// Writes `message` at `level` if the threshold admits it.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        if self.is_enabled(level) {
            self.write(level, message.to_string());
        }
    }

    #[track_caller]
    fn write(&self, level: Level, message: String) {
        let mut entry = Entry::new(level, message, self.fields.clone(), Location::caller());
        entry.error_type = self.error_type;
        self.writer.dispatch(entry);
    }

    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Level::Trace, message)
    }

    #[track_caller]
    pub fn trace_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args)
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message)
    }

    #[track_caller]
    pub fn debug_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message)
    }

    #[track_caller]
    pub fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message)
    }

    #[track_caller]
    pub fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    /// Alias of [`Logger::warn`].
    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message)
    }

    /// Alias of [`Logger::warn_fmt`].
    #[track_caller]
    pub fn warning_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message)
    }

    #[track_caller]
    pub fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    /// Writes at fatal level, flushes hooks, then ends the process through the
    /// writer's exit function (`std::process::exit(1)` unless overridden in
    /// [`Settings`]).
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.log(Level::Fatal, message);
        self.writer.flush();
        (self.writer.exit)(1)
    }

    #[track_caller]
    pub fn fatal_fmt(&self, args: fmt::Arguments<'_>) -> ! {
        self.fatal(args)
    }

    /// Writes at panic level, then panics with the message. The unwind
    /// propagates to the caller.
    #[track_caller]
    pub fn panic(&self, message: impl fmt::Display) -> ! {
        let message = message.to_string();
        if self.is_enabled(Level::Panic) {
            self.write(Level::Panic, message.clone());
            self.writer.flush();
        }
        panic!("{}", message)
    }

    #[track_caller]
    pub fn panic_fmt(&self, args: fmt::Arguments<'_>) -> ! {
        self.panic(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn capture(level: &str) -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Settings::default()
            .with_level(level)
            .with_formatter(Arc::new(JsonFormatter::default()))
            .with_output(buffer.clone())
            .build();
        (logger, buffer)
    }

    fn parse(line: &str) -> serde_json::Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_threshold_filters_lower_levels() {
        let (logger, buffer) = capture("warn");
        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error_fmt(format_args!("shown {}", 2));

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(parse(&lines[0])["msg"], "shown");
        assert_eq!(parse(&lines[1])["msg"], "shown 2");
        assert_eq!(parse(&lines[1])["level"], "error");
    }

    #[test]
    fn test_specialization_leaves_receiver_unchanged() {
        let (logger, buffer) = capture("info");
        let child = logger.with_field("request", "abc").with_fields(&crate::fields! { "n" => 1 });

        logger.info("parent");
        child.info("child");

        let lines = buffer.lines();
        let parent = parse(&lines[0]);
        let child_line = parse(&lines[1]);
        assert!(parent.get("request").is_none());
        assert_eq!(child_line["request"], "abc");
        assert_eq!(child_line["n"], 1);
        assert!(logger.fields().is_empty());
        assert!(child.shares_writer(&logger));
    }

    #[test]
    fn test_with_error_sets_error_field() {
        let (logger, buffer) = capture("info");
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        logger.with_error(&err).error("open failed");
        let line = parse(&buffer.lines()[0]);
        assert_eq!(line["error"], json!("no such file"));
    }

    #[test]
    fn test_unparsable_level_falls_back_to_info() {
        let (logger, _) = capture("verbose");
        assert_eq!(logger.level(), Level::Info);
    }

    #[test]
    fn test_fallback_logger_is_info() {
        let logger = Logger::fallback();
        assert_eq!(logger.level(), Level::Info);
        assert!(logger.fields().is_empty());
        assert!(logger.hook_names().is_empty());
    }

    static EXITS: AtomicUsize = AtomicUsize::new(0);

    fn counting_exit(code: i32) -> ! {
        EXITS.fetch_add(1, Ordering::SeqCst);
        panic!("exit({})", code)
    }

    #[test]
    fn test_fatal_writes_then_exits() {
        let buffer = SharedBuffer::new();
        let logger = Settings::default()
            .with_formatter(Arc::new(JsonFormatter::default()))
            .with_output(buffer.clone())
            .with_exit(counting_exit)
            .build();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.fatal("cannot continue");
        }));

        assert!(result.is_err());
        assert_eq!(EXITS.load(Ordering::SeqCst), 1);
        assert_eq!(parse(&buffer.lines()[0])["level"], "fatal");
    }

    static FLUSHES: AtomicUsize = AtomicUsize::new(0);
    static FLUSHED_BEFORE_EXIT: AtomicUsize = AtomicUsize::new(0);

    struct Flusher;

    impl Hook for Flusher {
        fn name(&self) -> &str {
            "flusher"
        }

        fn levels(&self) -> &[Level] {
            &Level::ALL
        }

        fn fire(&self, _entry: &mut Entry) -> Result<(), crate::error::HookError> {
            Ok(())
        }

        fn flush(&self) {
            FLUSHES.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flusher(_: &Value) -> Result<Option<Box<dyn Hook>>, crate::error::HookError> {
        Ok(Some(Box::new(Flusher)))
    }

    fn exit_recording_flushes(code: i32) -> ! {
        FLUSHED_BEFORE_EXIT.store(FLUSHES.load(Ordering::SeqCst), Ordering::SeqCst);
        panic!("exit({})", code)
    }

    #[test]
    fn test_fatal_flushes_hooks_before_exit() {
        let mut registry = crate::hooks::HookRegistry::empty();
        registry.register("flusher", flusher);
        let hooks = crate::config::HooksConfig::from(vec![crate::config::HookDescriptor::new(
            "flusher",
            Value::Null,
        )]);
        let logger = Settings::default()
            .with_output(SharedBuffer::new())
            .with_registry(registry)
            .with_hooks(hooks)
            .with_exit(exit_recording_flushes)
            .build();

        logger.error("not terminal");
        assert_eq!(FLUSHES.load(Ordering::SeqCst), 0);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.fatal("going down");
        }));

        assert!(result.is_err());
        assert_eq!(FLUSHED_BEFORE_EXIT.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "state corrupted")]
    fn test_panic_propagates() {
        let (logger, _) = capture("info");
        logger.panic_fmt(format_args!("state {}", "corrupted"));
    }
}
