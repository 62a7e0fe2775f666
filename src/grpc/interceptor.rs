//! Unary and streaming server interceptors.
//!
//! Both wrap a handler invocation: a per-call logger is derived and attached
//! to a fresh [`Context`] before the handler runs, and exactly one completion
//! line is written after it returns, whatever the outcome.

use std::error::Error;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures_util::Stream;
use pin_project::pin_project;

use crate::context::Context;
use crate::grpc::call::{split_method, CallOutcome, CallStart};
use crate::logger::Logger;

/// The method a call targets, as `/package.Service/Method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    full_method: String,
}

impl CallInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }

    pub fn full_method(&self) -> &str {
        &self.full_method
    }

    pub fn service(&self) -> &str {
        split_method(&self.full_method).0
    }

    pub fn method(&self) -> &str {
        split_method(&self.full_method).1
    }
}

/// A server-side stream that exposes its request context.
pub trait ServerStream {
    fn context(&self) -> &Context;
}

/// A stream whose context carries the per-call logger.
///
/// Derefs to the wrapped stream and forwards `Stream` when the inner stream
/// implements it.
#[pin_project]
#[derive(Debug)]
pub struct LoggedStream<S> {
    #[pin]
    inner: S,
    ctx: Context,
}

impl<S> LoggedStream<S> {
    pub fn new(inner: S, ctx: Context) -> Self {
        Self { inner, ctx }
    }

    pub fn logger(&self) -> Logger {
        self.ctx.logger()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> ServerStream for LoggedStream<S> {
    fn context(&self) -> &Context {
        &self.ctx
    }
}

impl<S> Deref for LoggedStream<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S> DerefMut for LoggedStream<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Stream> Stream for LoggedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<S::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Logs unary calls.
#[derive(Debug, Clone)]
pub struct UnaryInterceptor {
    logger: Logger,
}

impl UnaryInterceptor {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Runs `handler` with a context carrying the per-call logger and logs
    /// the outcome.
    pub async fn intercept<Req, Resp, E, H, Fut>(
        &self,
        ctx: &Context,
        req: Req,
        info: &CallInfo,
        handler: H,
    ) -> Result<Resp, E>
    where
        H: FnOnce(Context, Req) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
        E: Error + 'static,
    {
        let call = CallStart::begin(&self.logger, info.full_method(), ctx.deadline());
        let call_ctx = ctx.with_logger(call.logger.clone());

        let result = handler(call_ctx.clone(), req).await;

        call.finish(&call_ctx.logger(), &CallOutcome::from_result(&result));
        result
    }
}

/// Logs streaming calls.
#[derive(Debug, Clone)]
pub struct StreamInterceptor {
    logger: Logger,
}

impl StreamInterceptor {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Runs `handler` on `stream` wrapped in a [`LoggedStream`] and logs the
    /// outcome.
    pub async fn intercept<S, E, H, Fut>(&self, stream: S, info: &CallInfo, handler: H) -> Result<(), E>
    where
        S: ServerStream,
        H: FnOnce(LoggedStream<S>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Error + 'static,
    {
        let ctx = stream.context();
        let call = CallStart::begin(&self.logger, info.full_method(), ctx.deadline());
        let call_ctx = ctx.with_logger(call.logger.clone());
        let logger = call_ctx.logger();

        let result = handler(LoggedStream::new(stream, call_ctx)).await;

        call.finish(&logger, &CallOutcome::from_result(&result));
        result
    }
}
