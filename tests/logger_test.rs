//! End-to-end behaviour of the logging facade.

mod common;

use std::sync::Arc;
use std::thread;

use grpc_logger::logger::{CustomFormatter, SharedBuffer, TextFormatter};
use grpc_logger::{fields, parse_config, HookRegistry, Level, Logger, Settings};

use common::{capture_logger, capture_settings, json_lines};

#[test]
fn test_threshold_filters_lower_levels() {
    let (settings, buffer) = capture_settings();
    let logger = Logger::from_settings(settings.with_level("warning"));

    logger.error("disk full");
    logger.warn("disk almost full");
    logger.info("disk fine");
    logger.debug("disk stats");

    let lines = json_lines(&buffer);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["level"], "error");
    assert_eq!(lines[1]["level"], "warning");
}

#[test]
fn test_unknown_level_falls_back_to_info() {
    let (settings, buffer) = capture_settings();
    let logger = Logger::from_settings(settings.with_level("verbose"));
    assert_eq!(logger.level(), Level::Info);

    logger.debug("hidden");
    logger.info("shown");
    assert_eq!(json_lines(&buffer).len(), 1);
}

#[test]
fn test_fields_accumulate_without_touching_parent() {
    let (logger, buffer) = capture_logger();
    let request = logger.with_fields(&fields! { "request_id" => "r-1", "attempt" => 2 });
    let nested = request.with_field("user", "ada");

    nested.info("served");
    logger.info("idle");

    let lines = json_lines(&buffer);
    assert_eq!(lines[0]["request_id"], "r-1");
    assert_eq!(lines[0]["attempt"], 2);
    assert_eq!(lines[0]["user"], "ada");
    assert!(lines[1].get("request_id").is_none());
    assert!(request.fields().get("user").is_none());
}

#[test]
fn test_concurrent_derivation() {
    let (logger, buffer) = capture_logger();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let logger = logger.clone();
            thread::spawn(move || {
                let logger = logger.with_field("worker", worker);
                for seq in 0..25 {
                    logger.with_field("seq", seq).info("tick");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = json_lines(&buffer);
    assert_eq!(lines.len(), 200);
    for worker in 0..8 {
        let count = lines.iter().filter(|line| line["worker"] == worker).count();
        assert_eq!(count, 25);
    }
    assert!(logger.fields().is_empty());
}

#[test]
fn test_with_error_attaches_message() {
    let (logger, buffer) = capture_logger();
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    logger.with_error(&err).error("startup failed");

    let lines = json_lines(&buffer);
    assert_eq!(lines[0]["error"], "config.toml missing");
    assert_eq!(lines[0]["msg"], "startup failed");
}

#[test]
fn test_custom_format_line_shape() {
    let buffer = SharedBuffer::new();
    let logger = Logger::from_settings(
        Settings::default()
            .with_formatter(Arc::new(CustomFormatter::default()))
            .with_output(buffer.clone()),
    );
    logger.with_field("k", "v").info("hello");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[info]"), "{}", lines[0]);
    assert!(lines[0].ends_with("<map[k:v]>: hello"), "{}", lines[0]);
}

#[test]
fn test_text_format_contains_message_and_fields() {
    let buffer = SharedBuffer::new();
    let logger = Logger::from_settings(
        Settings::default()
            .with_formatter(Arc::new(TextFormatter {
                colors: false,
                ..TextFormatter::default()
            }))
            .with_output(buffer.clone()),
    );
    logger.with_field("port", 8080).warn("listening");

    let line = &buffer.lines()[0];
    assert!(line.contains("WARN"), "{}", line);
    assert!(line.contains("listening"), "{}", line);
    assert!(line.contains("port=8080"), "{}", line);
}

#[test]
fn test_production_forces_json() {
    let buffer = SharedBuffer::new();
    let logger = Logger::from_settings(
        Settings::default()
            .with_environment("production")
            .with_formatter_name("text")
            .with_output(buffer.clone()),
    );
    logger.info("structured");

    let line: serde_json::Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
    assert_eq!(line["msg"], "structured");
}

#[test]
fn test_hook_shapes_resolve_identically() {
    let list = parse_config(
        r#"
        [[hooks]]
        name = "filename_line"
        settings = { field_name = "src" }

        [[hooks]]
        name = "sentry"
        settings = { dsn = "" }
        "#,
    )
    .unwrap();
    let map = parse_config(
        r#"
        [hooks.filename_line]
        field_name = "src"

        [hooks.sentry]
        dsn = ""
        "#,
    )
    .unwrap();

    let from_list = Logger::from_settings(Settings::default().with_hooks(list.hooks));
    let from_map = Logger::from_settings(Settings::default().with_hooks(map.hooks));
    assert_eq!(from_list.hook_names(), vec!["filename_line"]);
    assert_eq!(from_list.hook_names(), from_map.hook_names());
}

#[test]
fn test_unknown_and_broken_hooks_are_skipped() {
    let config = parse_config(
        r#"
        [[hooks]]
        name = "syslog"

        [[hooks]]
        name = "sentry"
        settings = { dsn = "not a url" }

        [[hooks]]
        name = "filename_line"
        "#,
    )
    .unwrap();

    let logger = Logger::from_settings(
        Settings::default()
            .with_hooks(config.hooks)
            .with_registry(HookRegistry::builtin()),
    );
    assert_eq!(logger.hook_names(), vec!["filename_line"]);
}

#[test]
fn test_caller_hook_reports_this_file() {
    let config = parse_config(
        r#"
        [[hooks]]
        name = "filename_line"
        "#,
    )
    .unwrap();
    let (settings, buffer) = capture_settings();
    let logger = Logger::from_settings(settings.with_hooks(config.hooks));

    let line_no = line!() + 1;
    logger.info("located");

    let lines = json_lines(&buffer);
    assert_eq!(lines[0]["where"], format!("tests/logger_test.rs:{}", line_no));
}
