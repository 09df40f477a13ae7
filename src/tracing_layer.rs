//! Tracing layer that records events as leveled table rows

use crate::error::{LoggerError, Result};
use crate::logger::BufferedTableLogger;
use crate::schema::{LogLevel, RowShape};
use crate::store::TabularStore;
use std::sync::{Mutex, PoisonError, TryLockError};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;

/// Events from this crate are never recorded, so a flush cannot feed itself
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// A tracing layer that queues every event on a [`BufferedTableLogger`]
///
/// `TRACE` events are recorded as `DEBUG`. Logging errors are dropped, a
/// failing store never takes the subscriber down with it. Whatever is still
/// buffered is flushed when the layer is dropped along with its subscriber.
pub struct TableTracingLayer<S: TabularStore> {
    logger: Mutex<BufferedTableLogger<S>>,
}

impl<S: TabularStore> TableTracingLayer<S> {
    /// Wrap a logger that writes leveled rows
    ///
    /// Fails with [`LoggerError::ShapeMismatch`] if the logger is already
    /// pinned to plain rows, since every event would be rejected.
    pub fn new(logger: BufferedTableLogger<S>) -> Result<Self> {
        if let Some(RowShape::Plain) = logger.shape() {
            return Err(LoggerError::ShapeMismatch {
                expected: RowShape::Leveled,
                found: RowShape::Plain,
            });
        }
        Ok(Self {
            logger: Mutex::new(logger),
        })
    }

    /// Flush the wrapped logger, reporting any store error
    pub fn flush(&self) -> Result<()> {
        self.with_logger(|logger| logger.flush())
    }

    /// Run `f` with exclusive access to the wrapped logger
    pub fn with_logger<R>(&self, f: impl FnOnce(&mut BufferedTableLogger<S>) -> R) -> R {
        let mut logger = self.logger.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut logger)
    }

    fn record(&self, level: LogLevel, message: String) {
        let mut logger = match self.logger.try_lock() {
            Ok(logger) => logger,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            // Re-entered from inside a flush on this thread; drop the event
            Err(TryLockError::WouldBlock) => return,
        };
        let _ = logger.log(level, message);
    }
}

impl<S: TabularStore> Drop for TableTracingLayer<S> {
    fn drop(&mut self) {
        let logger = self.logger.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = logger.flush() {
            tracing::warn!(
                error = %e,
                rows = logger.len(),
                "could not flush tracing rows on shutdown"
            );
        }
    }
}

impl<S, Sub> Layer<Sub> for TableTracingLayer<S>
where
    S: TabularStore + Send + 'static,
    S::Table: Send + 'static,
    Sub: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, Sub>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if target == OWN_TARGET || target.starts_with(&format!("{}::", OWN_TARGET)) {
            return;
        }

        let mut message = String::new();
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        self.record(
            LogLevel::from(*metadata.level()),
            format!("{}: {}", target, message),
        );
    }
}

/// A visitor for flattening an event's fields into one line
struct MessageVisitor<'a>(&'a mut String);

impl MessageVisitor<'_> {
    fn separate(&mut self) {
        if !self.0.is_empty() {
            self.0.push_str(", ");
        }
    }
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        use std::fmt::Write;
        self.separate();
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        } else {
            let _ = write!(self.0, "{} = {:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.separate();
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            self.0.push_str(&format!("{} = \"{}\"", field.name(), value));
        }
    }
}
