//! Request-scoped logger propagation.
//!
//! # Responsibilities
//! - Carry a [`Logger`] alongside a request, explicitly threaded through calls
//! - Fall back to [`Logger::fallback`] when nothing was attached
//!
//! # Design Decisions
//! - The logger is stored in an `http::Extensions` map under a private
//!   newtype, so no other extension can collide with or replace it
//! - Attaching returns a new context; the original is left as it was

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{Extensions, Request};

use crate::logger::Logger;

#[derive(Clone)]
struct LoggerSlot(Logger);

/// Per-request state passed explicitly through a call chain.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<DateTime<Utc>>,
    extensions: Extensions,
}

impl Context {
    /// An empty context: no deadline, no logger.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context carrying `logger`.
    pub fn with_logger(&self, logger: Logger) -> Self {
        let mut ctx = self.clone();
        ctx.extensions.attach_logger(logger);
        ctx
    }

    /// The attached logger, or the fallback logger.
    pub fn logger(&self) -> Logger {
        self.extensions.logger()
    }

    pub fn try_logger(&self) -> Option<&Logger> {
        self.extensions.get::<LoggerSlot>().map(|slot| &slot.0)
    }

    pub fn with_deadline(&self, deadline: DateTime<Utc>) -> Self {
        let mut ctx = self.clone();
        ctx.deadline = Some(deadline);
        ctx
    }

    /// Sets the deadline to now + `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(deadline_after(timeout))
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Now + `timeout`, saturating at the latest representable time.
pub(crate) fn deadline_after(timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|timeout| Utc::now().checked_add_signed(timeout))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Attach/retrieve a logger on anything that owns `http::Extensions`.
pub trait LoggerExt {
    fn attach_logger(&mut self, logger: Logger);

    /// The attached logger, or the fallback logger.
    fn logger(&self) -> Logger;
}

impl LoggerExt for Extensions {
    fn attach_logger(&mut self, logger: Logger) {
        self.insert(LoggerSlot(logger));
    }

    fn logger(&self) -> Logger {
        match self.get::<LoggerSlot>() {
            Some(slot) => slot.0.clone(),
            None => Logger::fallback(),
        }
    }
}

impl<B> LoggerExt for Request<B> {
    fn attach_logger(&mut self, logger: Logger) {
        self.extensions_mut().attach_logger(logger);
    }

    fn logger(&self) -> Logger {
        self.extensions().logger()
    }
}
