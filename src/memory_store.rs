//! In-memory tabular store
//!
//! Models a workbook the way a spreadsheet does: every table has a fixed row
//! capacity that must be grown explicitly, and writes land at absolute row
//! positions. Every call is recorded, and a single failure can be armed per
//! operation, so the flush policy can be observed from tests.

use crate::error::BackendError;
use crate::schema::LogRow;
use crate::store::{TableHandle, TabularStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Row capacity of a freshly created table
pub const DEFAULT_TABLE_CAPACITY: usize = 1000;

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindTable,
    CreateTable,
    LastRowIndex,
    MaxRowCapacity,
    EnsureCapacity,
    AppendRows,
}

impl StoreOp {
    fn name(self) -> &'static str {
        match self {
            StoreOp::FindTable => "find_table",
            StoreOp::CreateTable => "create_table",
            StoreOp::LastRowIndex => "last_row_index",
            StoreOp::MaxRowCapacity => "max_row_capacity",
            StoreOp::EnsureCapacity => "ensure_capacity",
            StoreOp::AppendRows => "append_rows",
        }
    }
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FindTable(String),
    CreateTable(String),
    LastRowIndex(String),
    MaxRowCapacity(String),
    EnsureCapacity {
        table: String,
        after_row: usize,
        additional_rows: usize,
    },
    AppendRows {
        table: String,
        start_row: usize,
        rows: usize,
    },
}

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<LogRow>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Workbook {
    tables: BTreeMap<String, MemoryTable>,
    calls: Vec<StoreCall>,
    armed_failure: Option<(StoreOp, usize)>,
    default_capacity: usize,
}

impl Workbook {
    fn record(&mut self, op: StoreOp, call: StoreCall) -> Result<(), BackendError> {
        self.calls.push(call);
        match self.armed_failure {
            Some((armed, 0)) if armed == op => {
                self.armed_failure = None;
                Err(BackendError::Rejected {
                    operation: op.name(),
                    reason: "injected failure".to_string(),
                })
            }
            Some((armed, ref mut skip)) if armed == op => {
                *skip -= 1;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn table(&self, name: &str) -> Result<&MemoryTable, BackendError> {
        self.tables
            .get(name)
            .ok_or_else(|| BackendError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable, BackendError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| BackendError::TableNotFound(name.to_string()))
    }
}

/// Shared, cloneable handle onto an in-memory workbook
#[derive(Debug, Clone)]
pub struct MemoryStore {
    workbook: Arc<Mutex<Workbook>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_default_capacity(DEFAULT_TABLE_CAPACITY)
    }

    /// Tables created by this store start with `capacity` rows
    pub fn with_default_capacity(capacity: usize) -> Self {
        Self {
            workbook: Arc::new(Mutex::new(Workbook {
                default_capacity: capacity,
                ..Workbook::default()
            })),
        }
    }

    /// Seed a table with existing rows. Not recorded as a call.
    pub fn with_table<I>(self, name: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = LogRow>,
    {
        {
            let mut workbook = self.lock();
            let rows: Vec<LogRow> = rows.into_iter().collect();
            let capacity = workbook.default_capacity.max(rows.len());
            workbook
                .tables
                .insert(name.to_string(), MemoryTable { rows, capacity });
        }
        self
    }

    /// Make the next call of `op` fail with [`BackendError::Rejected`]
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Let `skip` calls of `op` through, then fail the one after
    pub fn fail_after(&self, op: StoreOp, skip: usize) {
        self.lock().armed_failure = Some((op, skip));
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, name: &str) -> Option<Vec<LogRow>> {
        self.lock().tables.get(name).map(|t| t.rows.clone())
    }

    pub fn capacity(&self, name: &str) -> Option<usize> {
        self.lock().tables.get(name).map(|t| t.capacity)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Workbook> {
        self.workbook.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, name: &str) -> MemoryTableHandle {
        MemoryTableHandle {
            name: name.to_string(),
            workbook: Arc::clone(&self.workbook),
        }
    }
}

impl TabularStore for MemoryStore {
    type Table = MemoryTableHandle;

    fn find_table(&mut self, name: &str) -> Result<Option<Self::Table>, BackendError> {
        let mut workbook = self.lock();
        workbook.record(StoreOp::FindTable, StoreCall::FindTable(name.to_string()))?;
        let exists = workbook.tables.contains_key(name);
        drop(workbook);
        Ok(exists.then(|| self.handle(name)))
    }

    fn create_table(&mut self, name: &str) -> Result<Self::Table, BackendError> {
        let mut workbook = self.lock();
        workbook.record(StoreOp::CreateTable, StoreCall::CreateTable(name.to_string()))?;
        if workbook.tables.contains_key(name) {
            return Err(BackendError::Rejected {
                operation: StoreOp::CreateTable.name(),
                reason: format!("table '{}' already exists", name),
            });
        }
        let capacity = workbook.default_capacity;
        workbook.tables.insert(
            name.to_string(),
            MemoryTable {
                rows: Vec::new(),
                capacity,
            },
        );
        drop(workbook);
        Ok(self.handle(name))
    }
}

/// Handle onto one table of a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryTableHandle {
    name: String,
    workbook: Arc<Mutex<Workbook>>,
}

impl MemoryTableHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Workbook> {
        self.workbook.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TableHandle for MemoryTableHandle {
    fn last_row_index(&self) -> Result<usize, BackendError> {
        let mut workbook = self.lock();
        workbook.record(StoreOp::LastRowIndex, StoreCall::LastRowIndex(self.name.clone()))?;
        Ok(workbook.table(&self.name)?.rows.len())
    }

    fn max_row_capacity(&self) -> Result<usize, BackendError> {
        let mut workbook = self.lock();
        workbook.record(StoreOp::MaxRowCapacity, StoreCall::MaxRowCapacity(self.name.clone()))?;
        Ok(workbook.table(&self.name)?.capacity)
    }

    fn ensure_capacity(&mut self, after_row: usize, additional_rows: usize) -> Result<(), BackendError> {
        let mut workbook = self.lock();
        workbook.record(
            StoreOp::EnsureCapacity,
            StoreCall::EnsureCapacity {
                table: self.name.clone(),
                after_row,
                additional_rows,
            },
        )?;
        let table = workbook.table_mut(&self.name)?;
        if after_row + additional_rows > table.capacity {
            table.capacity += additional_rows;
        }
        Ok(())
    }

    fn append_rows(&mut self, start_row: usize, rows: &[LogRow]) -> Result<(), BackendError> {
        let mut workbook = self.lock();
        workbook.record(
            StoreOp::AppendRows,
            StoreCall::AppendRows {
                table: self.name.clone(),
                start_row,
                rows: rows.len(),
            },
        )?;
        let table = workbook.table_mut(&self.name)?;
        let end = start_row + rows.len();
        if end > table.capacity {
            return Err(BackendError::Rejected {
                operation: StoreOp::AppendRows.name(),
                reason: format!(
                    "rows {}..{} exceed table capacity {}",
                    start_row + 1,
                    end,
                    table.capacity
                ),
            });
        }

        // Writes are positional: rows past the end are padded, earlier ones overwritten.
        if table.rows.len() < start_row {
            table.rows.resize(start_row, LogRow::from_cells(Vec::<String>::new()));
        }
        for (offset, row) in rows.iter().enumerate() {
            let index = start_row + offset;
            if index < table.rows.len() {
                table.rows[index] = row.clone();
            } else {
                table.rows.push(row.clone());
            }
        }
        Ok(())
    }
}
