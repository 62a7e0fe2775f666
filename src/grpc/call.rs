//! Per-call logger derivation and the completion line.

use std::error::Error;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::fields;
use crate::grpc::{severity_for, Code, Status};
use crate::logger::Logger;

/// Field naming the RPC system of every per-call logger.
pub const SYSTEM_FIELD: &str = "system";
/// Field telling server from client log statements.
pub const KIND_FIELD: &str = "span.kind";
/// Field carrying the per-call trace id.
pub const TRACE_ID_FIELD: &str = "traceID";

pub const SERVICE_FIELD: &str = "grpc.service";
pub const METHOD_FIELD: &str = "grpc.method";
pub const START_TIME_FIELD: &str = "grpc.start_time";
pub const DEADLINE_FIELD: &str = "grpc.request.deadline";
pub const CODE_FIELD: &str = "grpc.code";
pub const MESSAGE_FIELD: &str = "grpc.message";
pub const DURATION_FIELD: &str = "grpc.duration";

pub const MSG_FINISHED: &str = "request finished";
pub const MSG_FAILED: &str = "request failed";

/// Splits `/package.Service/Method` into service and method.
pub fn split_method(full_method: &str) -> (&str, &str) {
    match full_method.rsplit_once('/') {
        Some((service, method)) => (service.trim_start_matches('/'), method),
        None => ("", full_method),
    }
}

/// Derives the logger for one call from the server's base logger.
pub fn logger_for_call(
    base: &Logger,
    full_method: &str,
    start: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> Logger {
    let (service, method) = split_method(full_method);
    let logger = base.with_fields(&fields! {
        TRACE_ID_FIELD => Uuid::new_v4().to_string(),
        SYSTEM_FIELD => "grpc",
        KIND_FIELD => "server",
        SERVICE_FIELD => service,
        METHOD_FIELD => method,
        START_TIME_FIELD => rfc3339(start),
    });

    match deadline {
        Some(deadline) => logger.with_field(DEADLINE_FIELD, rfc3339(deadline)),
        None => logger,
    }
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// How a call ended, as far as logging is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub status: Status,
    /// Whether the status came from the call itself rather than being
    /// inferred from an unrelated error.
    pub decoded: bool,
}

impl CallOutcome {
    pub fn ok() -> Self {
        Self::decoded(Status::ok())
    }

    pub fn decoded(status: Status) -> Self {
        Self {
            status,
            decoded: true,
        }
    }

    /// An outcome that could not be read as a status.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::new(Code::Unknown, message),
            decoded: false,
        }
    }

    pub fn from_result<T, E>(result: &Result<T, E>) -> Self
    where
        E: Error + 'static,
    {
        match result {
            Ok(_) => Self::ok(),
            Err(err) => match Status::from_error(err) {
                Some(status) => Self::decoded(status),
                None => Self::failed(err.to_string()),
            },
        }
    }
}

/// Emits the single completion line for a call.
pub fn log_finished_call(logger: &Logger, outcome: &CallOutcome, elapsed: Duration) {
    let code = outcome.status.code();
    let logger = logger.with_fields(&fields! {
        CODE_FIELD => code.to_string(),
        MESSAGE_FIELD => outcome.status.message(),
        DURATION_FIELD => format!("{:?}", elapsed),
    });
    let message = if outcome.decoded { MSG_FINISHED } else { MSG_FAILED };
    logger.log(severity_for(code), message);
}

/// State captured when a call starts.
#[derive(Debug)]
pub(crate) struct CallStart {
    pub(crate) logger: Logger,
    started: Instant,
}

impl CallStart {
    pub(crate) fn begin(base: &Logger, full_method: &str, deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            logger: logger_for_call(base, full_method, Utc::now(), deadline),
            started: Instant::now(),
        }
    }

    pub(crate) fn finish(self, logger: &Logger, outcome: &CallOutcome) {
        log_finished_call(logger, outcome, self.started.elapsed());
    }
}
