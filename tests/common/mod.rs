//! Common test utilities and helpers

use chrono::{DateTime, TimeZone, Utc};
use sheet_logger::error::BackendError;
use sheet_logger::memory_store::{MemoryStore, MemoryTableHandle, StoreCall};
use sheet_logger::schema::LogRow;
use sheet_logger::store::{TableHandle, TabularStore};
use sheet_logger::{BufferedTableLogger, LoggerConfig};
use std::cell::Cell;
use std::rc::Rc;

/// Fixed instant every test row is stamped with
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 19, 12, 0, 0).unwrap()
}

pub const FIXED_TIMESTAMP: &str = "2025-01-19 12:00:00";

/// Create a logger over a fresh in-memory store, returning a handle onto the store
pub fn create_test_logger(config: LoggerConfig) -> (BufferedTableLogger<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let logger = BufferedTableLogger::new(config, store.clone())
        .expect("Failed to create logger")
        .with_clock(fixed_clock);
    (logger, store)
}

/// Message cells of every row in a table
pub fn messages(store: &MemoryStore, table: &str) -> Vec<String> {
    store
        .rows(table)
        .unwrap_or_default()
        .iter()
        .filter_map(|row| row.message().map(String::from))
        .collect()
}

/// Number of append calls recorded against a table
#[allow(dead_code)]
pub fn append_calls(store: &MemoryStore) -> Vec<(usize, usize)> {
    store
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::AppendRows { start_row, rows, .. } => Some((start_row, rows)),
            _ => None,
        })
        .collect()
}

/// Store whose appends fail a set number of times with an error of its own
///
/// Stands in for a third-party backend reporting failures through
/// [`BackendError::Other`].
#[allow(dead_code)]
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failures_left: Rc<Cell<usize>>,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: Rc::new(Cell::new(failures)),
        }
    }
}

#[allow(dead_code)]
pub struct FlakyTable {
    inner: MemoryTableHandle,
    failures_left: Rc<Cell<usize>>,
}

impl TabularStore for FlakyStore {
    type Table = FlakyTable;

    fn find_table(&mut self, name: &str) -> Result<Option<Self::Table>, BackendError> {
        let failures_left = Rc::clone(&self.failures_left);
        Ok(self
            .inner
            .find_table(name)?
            .map(|inner| FlakyTable { inner, failures_left }))
    }

    fn create_table(&mut self, name: &str) -> Result<Self::Table, BackendError> {
        Ok(FlakyTable {
            inner: self.inner.create_table(name)?,
            failures_left: Rc::clone(&self.failures_left),
        })
    }
}

impl TableHandle for FlakyTable {
    fn last_row_index(&self) -> Result<usize, BackendError> {
        self.inner.last_row_index()
    }

    fn max_row_capacity(&self) -> Result<usize, BackendError> {
        self.inner.max_row_capacity()
    }

    fn ensure_capacity(&mut self, after_row: usize, additional_rows: usize) -> Result<(), BackendError> {
        self.inner.ensure_capacity(after_row, additional_rows)
    }

    fn append_rows(&mut self, start_row: usize, rows: &[LogRow]) -> Result<(), BackendError> {
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(anyhow::anyhow!("service unavailable ({} failures left)", left - 1).into());
        }
        self.inner.append_rows(start_row, rows)
    }
}
