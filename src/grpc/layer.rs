//! Per-call logging as a tower middleware for `http` services.
//!
//! Works with any service taking `http::Request` and returning
//! `http::Response`, including tonic servers. The call status is read from
//! the response headers for trailers-only responses, otherwise from the
//! trailers frame of the response body.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context as TaskContext, Poll};
use std::time::Duration;

use http::{HeaderMap, Request, Response};
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tower::{Layer, Service};

use crate::context::{deadline_after, LoggerExt};
use crate::grpc::call::{CallOutcome, CallStart};
use crate::grpc::{Code, Status};
use crate::logger::Logger;

pub const GRPC_STATUS_HEADER: &str = "grpc-status";
pub const GRPC_MESSAGE_HEADER: &str = "grpc-message";
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

const MISSING_STATUS: &str = "missing grpc-status";
const DROPPED: &str = "response dropped before completion";

/// Wraps services in [`GrpcLoggerService`].
#[derive(Debug, Clone)]
pub struct GrpcLoggerLayer {
    logger: Logger,
}

impl GrpcLoggerLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for GrpcLoggerLayer {
    type Service = GrpcLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcLoggerService {
            inner,
            logger: self.logger.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrpcLoggerService<S> {
    inner: S,
    logger: Logger,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GrpcLoggerService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: fmt::Display,
    ResBody: Body,
{
    type Response = Response<LoggedBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let deadline = req
            .headers()
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| parse_timeout(value.as_bytes()))
            .map(deadline_after);
        let call = CallStart::begin(&self.logger, req.uri().path(), deadline);
        req.attach_logger(call.logger.clone());

        ResponseFuture {
            inner: self.inner.call(req),
            guard: CallGuard(Some(call)),
        }
    }
}

/// Logs the call exactly once: on the first `finish`, or as cancelled when
/// dropped before that.
#[derive(Debug)]
struct CallGuard(Option<CallStart>);

impl CallGuard {
    fn finish(&mut self, outcome: CallOutcome) {
        if let Some(call) = self.0.take() {
            let logger = call.logger.clone();
            call.finish(&logger, &outcome);
        }
    }

    fn take(&mut self) -> CallGuard {
        CallGuard(self.0.take())
    }

    fn is_armed(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.finish(CallOutcome::decoded(Status::new(Code::Cancelled, DROPPED)));
    }
}

#[pin_project]
#[derive(Debug)]
pub struct ResponseFuture<F> {
    #[pin]
    inner: F,
    guard: CallGuard,
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
    E: fmt::Display,
{
    type Output = Result<Response<LoggedBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match ready!(this.inner.poll(cx)) {
            Ok(res) => {
                let mut guard = this.guard.take();
                match outcome_from_headers(res.headers()) {
                    Some(outcome) => guard.finish(outcome),
                    // An empty body may never be polled, so its status can't
                    // arrive later.
                    None if res.body().is_end_stream() => {
                        guard.finish(CallOutcome::failed(MISSING_STATUS))
                    }
                    None => {}
                }
                Poll::Ready(Ok(res.map(move |inner| LoggedBody { inner, guard })))
            }
            Err(err) => {
                this.guard.finish(CallOutcome::failed(err.to_string()));
                Poll::Ready(Err(err))
            }
        }
    }
}

/// Response body that logs the call when its status arrives.
#[pin_project]
#[derive(Debug)]
pub struct LoggedBody<B> {
    #[pin]
    inner: B,
    guard: CallGuard,
}

impl<B> LoggedBody<B> {
    pub fn get_ref(&self) -> &B {
        &self.inner
    }
}

impl<B> Body for LoggedBody<B>
where
    B: Body,
    B::Error: fmt::Display,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        if this.guard.is_armed() {
            match &frame {
                Some(Ok(frame)) => {
                    if let Some(trailers) = frame.trailers_ref() {
                        let outcome = outcome_from_headers(trailers)
                            .unwrap_or_else(|| CallOutcome::failed(MISSING_STATUS));
                        this.guard.finish(outcome);
                    } else if this.inner.is_end_stream() {
                        this.guard.finish(CallOutcome::failed(MISSING_STATUS));
                    }
                }
                Some(Err(err)) => this.guard.finish(CallOutcome::failed(err.to_string())),
                None => this.guard.finish(CallOutcome::failed(MISSING_STATUS)),
            }
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn outcome_from_headers(headers: &HeaderMap) -> Option<CallOutcome> {
    let code = Code::from_header(headers.get(GRPC_STATUS_HEADER)?.as_bytes());
    let message = headers
        .get(GRPC_MESSAGE_HEADER)
        .map(|value| percent_decode(value.as_bytes()))
        .unwrap_or_default();
    Some(CallOutcome::decoded(Status::new(code, message)))
}

/// Parses a `grpc-timeout` value: up to 8 digits followed by a unit.
pub fn parse_timeout(value: &[u8]) -> Option<Duration> {
    let (unit, digits) = value.split_last()?;
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    let amount: u64 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    let timeout = match unit {
        b'H' => Duration::from_secs(amount * 3600),
        b'M' => Duration::from_secs(amount * 60),
        b'S' => Duration::from_secs(amount),
        b'm' => Duration::from_millis(amount),
        b'u' => Duration::from_micros(amount),
        b'n' => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

fn percent_decode(value: &[u8]) -> String {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i] == b'%' && i + 2 < value.len() {
            let hex = std::str::from_utf8(&value[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(value[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
