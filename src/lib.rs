//! Sheet Logger
//!
//! A buffered logger that queues timestamped entries in memory and appends
//! them as rows to a spreadsheet-like table. The table lives behind the
//! [`TabularStore`] trait, so the same logger drives an in-memory workbook,
//! a directory of JSONL files, or any spreadsheet service a caller wraps.
//!
//! ```
//! use sheet_logger::{BufferedTableLogger, LoggerConfig, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut logger = BufferedTableLogger::new(LoggerConfig::new("Logs"), store.clone())?;
//! logger.info("service started")?;
//! logger.warn(format_args!("disk at {}%", 91))?;
//! logger.flush()?;
//!
//! assert_eq!(store.rows("Logs").unwrap().len(), 3); // header + 2 rows
//! # Ok::<(), sheet_logger::LoggerError>(())
//! ```

pub mod config;
pub mod error;
pub mod jsonl_store;
pub mod logger;
pub mod memory_store;
pub mod schema;
pub mod store;
pub mod tail_reader;
pub mod tracing_layer;

// Re-export commonly used types
pub use config::LoggerConfig;
pub use error::{BackendError, ConfigError, LoggerError, Result};
pub use jsonl_store::JsonlStore;
pub use logger::BufferedTableLogger;
pub use memory_store::MemoryStore;
pub use schema::{IntoMessage, LogLevel, LogRow, RowShape};
pub use store::{TableHandle, TabularStore};
pub use tail_reader::read_last_n_rows;
pub use tracing_layer::TableTracingLayer;
