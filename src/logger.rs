//! Buffered logger writing rows to a tabular store
//!
//! Entries are timestamped and queued in memory. The queue is written to the
//! store as one contiguous block when it reaches `max_buffer` rows, or when the
//! caller asks for it with [`BufferedTableLogger::flush`]. There are no timers
//! and no background work: a flush always happens on the calling thread.

use crate::config::LoggerConfig;
use crate::error::{LoggerError, Result};
use crate::schema::{IntoMessage, LogLevel, LogRow, RowShape, TIMESTAMP_FORMAT};
use crate::store::{TableHandle, TabularStore};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::slice;

/// Buffers log rows and appends them to a table in batches
///
/// All rows written by one logger share a shape. The shape comes from
/// [`LoggerConfig::shape`] when set, otherwise from the first queued entry;
/// a call of the other shape fails with [`LoggerError::ShapeMismatch`].
pub struct BufferedTableLogger<S: TabularStore> {
    config: LoggerConfig,
    timezone: Tz,
    store: S,
    table: Option<S::Table>,
    buffer: Vec<LogRow>,
    shape: Option<RowShape>,
    clock: fn() -> DateTime<Utc>,
    flush_count: u64,
}

impl<S: TabularStore> BufferedTableLogger<S> {
    /// Validate `config` and build a logger over `store`
    ///
    /// The store is not touched; the table is looked up on the first flush.
    pub fn new(config: LoggerConfig, store: S) -> Result<Self> {
        let timezone = config.validate()?;
        let shape = config.shape;

        Ok(Self {
            buffer: Vec::with_capacity(config.max_buffer.min(1024)),
            config,
            timezone,
            store,
            table: None,
            shape,
            clock: Utc::now,
            flush_count: 0,
        })
    }

    /// Replace the time source used for row timestamps
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Queue a `[timestamp, message]` row
    ///
    /// Absent and empty messages are dropped. Returns the flush error if this
    /// entry filled the buffer and the automatic flush failed; the entry stays
    /// queued in that case.
    pub fn insert<M: IntoMessage>(&mut self, message: M) -> Result<()> {
        let Some(message) = message.into_message().filter(|m| !m.is_empty()) else {
            return Ok(());
        };
        let row = LogRow::plain(self.timestamp(), message);
        self.push(RowShape::Plain, row)
    }

    /// Queue a `[timestamp, level, message]` row
    pub fn log<M: IntoMessage>(&mut self, level: LogLevel, message: M) -> Result<()> {
        let Some(message) = message.into_message() else {
            return Ok(());
        };
        let row = LogRow::leveled(self.timestamp(), level, message);
        self.push(RowShape::Leveled, row)
    }

    /// Queue an `INFO` row, see [`Self::log`]
    pub fn info<M: IntoMessage>(&mut self, message: M) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    /// Queue a `DEBUG` row, see [`Self::log`]
    pub fn debug<M: IntoMessage>(&mut self, message: M) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    /// Queue a `WARN` row, see [`Self::log`]
    pub fn warn<M: IntoMessage>(&mut self, message: M) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    /// Queue an `ERROR` row, see [`Self::log`]
    pub fn error<M: IntoMessage>(&mut self, message: M) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    /// Append every buffered row to the table and clear the buffer
    ///
    /// Does nothing, and makes no store calls, when the buffer is empty. On
    /// the first non-empty flush the table is looked up by name and created
    /// if missing. Leveled rows going into an empty table get a
    /// `Timestamp | Level | Message` header first. The buffer is cleared only
    /// once the rows are written, so a failed flush can simply be retried.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let table = match self.table.take() {
            Some(table) => table,
            None => resolve_table(&mut self.store, &self.config.table)?,
        };
        let table = self.table.insert(table);

        let count = self.buffer.len();
        let mut last_row = table.last_row_index()?;

        let header = (last_row == 0 && self.buffer[0].shape() == Some(RowShape::Leveled))
            .then(LogRow::header);
        let incoming = count + usize::from(header.is_some());

        if last_row.saturating_add(incoming) > table.max_row_capacity()? {
            table.ensure_capacity(last_row, incoming)?;
        }

        if let Some(header) = header {
            table.append_rows(last_row, slice::from_ref(&header))?;
            last_row += 1;
        }

        table.append_rows(last_row, &self.buffer)?;

        self.buffer.clear();
        self.flush_count += 1;
        tracing::debug!(
            table = %self.config.table,
            rows = count,
            first_row = last_row + 1,
            "flushed buffered rows"
        );

        Ok(())
    }

    /// Number of rows waiting to be flushed
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Rows waiting to be flushed, oldest first
    pub fn pending(&self) -> &[LogRow] {
        &self.buffer
    }

    /// Successful non-empty flushes so far, explicit or automatic
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Shape this logger writes, once known
    pub fn shape(&self) -> Option<RowShape> {
        self.shape
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn timestamp(&self) -> String {
        (self.clock)()
            .with_timezone(&self.timezone)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    fn push(&mut self, shape: RowShape, row: LogRow) -> Result<()> {
        match self.shape {
            Some(expected) if expected != shape => {
                return Err(LoggerError::ShapeMismatch {
                    expected,
                    found: shape,
                });
            }
            Some(_) => {}
            None => self.shape = Some(shape),
        }

        self.buffer.push(row);
        if self.buffer.len() >= self.config.max_buffer {
            self.flush()?;
        }
        Ok(())
    }
}

impl<S: TabularStore> Drop for BufferedTableLogger<S> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            tracing::warn!(
                table = %self.config.table,
                pending = self.buffer.len(),
                "logger dropped with unflushed rows"
            );
        }
    }
}

fn resolve_table<S: TabularStore>(store: &mut S, name: &str) -> Result<S::Table> {
    if let Some(table) = store.find_table(name)? {
        return Ok(table);
    }
    let table = store.create_table(name)?;
    tracing::info!(table = %name, "created log table");
    Ok(table)
}
