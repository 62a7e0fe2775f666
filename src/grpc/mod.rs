//! gRPC server-side call logging.
//!
//! # Data Flow
//! ```text
//! call ──► start: derive per-call logger (traceID, service, method, deadline)
//!              │
//!              ▼
//!          handler runs with the logger in its Context / request extensions
//!              │
//!              ▼
//!          finish: grpc.code, grpc.message, grpc.duration ──► one line at
//!                  the severity of the status code
//! ```
//!
//! [`UnaryInterceptor`] and [`StreamInterceptor`] wrap handler closures
//! directly; [`GrpcLoggerLayer`] does the same for any tower `http` service.

pub mod call;
pub mod code;
pub mod interceptor;
pub mod layer;

pub use call::{log_finished_call, logger_for_call, split_method, CallOutcome};
pub use code::{severity_for, Code, Status};
pub use interceptor::{CallInfo, LoggedStream, ServerStream, StreamInterceptor, UnaryInterceptor};
pub use layer::{GrpcLoggerLayer, GrpcLoggerService, LoggedBody, ResponseFuture};
