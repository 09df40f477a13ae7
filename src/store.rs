//! Tabular storage collaborator
//!
//! The logger never talks to a spreadsheet service directly. It is handed a
//! [`TabularStore`] at construction and resolves a [`TableHandle`] from it the
//! first time it has rows to write.

use crate::error::BackendError;
use crate::schema::LogRow;

/// A workbook of named tables
pub trait TabularStore {
    type Table: TableHandle;

    /// Look up a table by name
    fn find_table(&mut self, name: &str) -> Result<Option<Self::Table>, BackendError>;

    /// Create an empty table with the given name
    fn create_table(&mut self, name: &str) -> Result<Self::Table, BackendError>;
}

/// A single named grid of cells
pub trait TableHandle {
    /// Number of rows in use; 0 for an empty table
    fn last_row_index(&self) -> Result<usize, BackendError>;

    /// Rows the table can currently hold
    fn max_row_capacity(&self) -> Result<usize, BackendError>;

    /// Grow storage so `additional_rows` fit after `after_row`
    fn ensure_capacity(&mut self, after_row: usize, additional_rows: usize) -> Result<(), BackendError>;

    /// Write `rows` starting at row `start_row + 1`, one cell per element, in order
    fn append_rows(&mut self, start_row: usize, rows: &[LogRow]) -> Result<(), BackendError>;
}
