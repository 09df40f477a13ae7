//! Directory-backed tabular store
//!
//! Each table is a `<name>.jsonl` file in the store directory, one JSON array
//! of cells per line. Row `n` of the table is line `n` of the file. An optional
//! store id selects a sub-directory, so one root can hold several workbooks.

use crate::config::LoggerConfig;
use crate::error::BackendError;
use crate::schema::LogRow;
use crate::store::{TableHandle, TabularStore};
use fs2::FileExt;
use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Workbook stored as a directory of JSONL tables
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(Self { dir })
    }

    /// Open the workbook named `store_id` under `root`, or `root` itself
    pub fn open(root: PathBuf, store_id: Option<&str>) -> io::Result<Self> {
        match store_id {
            Some(id) => {
                validate_name(id).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                Self::new(root.join(id))
            }
            None => Self::new(root),
        }
    }

    /// Open the workbook named by `config.store_id` under `root`
    pub fn for_config(root: PathBuf, config: &LoggerConfig) -> io::Result<Self> {
        Self::open(root, config.store_id.as_deref())
    }

    /// Open the workbook named by `config.store_id` under the root taken from
    /// `SHEET_LOGGER_DIR`, or `~/.sheet-logger`
    pub fn from_env(config: &LoggerConfig) -> io::Result<Self> {
        let root = match std::env::var("SHEET_LOGGER_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                // Respect $HOME first (tests, sandboxes), then fall back to dirs
                let home = std::env::var("HOME")
                    .ok()
                    .map(PathBuf::from)
                    .or_else(dirs::home_dir)
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::NotFound, "Could not determine home directory")
                    })?;
                home.join(".sheet-logger")
            }
        };

        Self::for_config(root, config)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing table `name`
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", name))
    }

    /// Read every row of a table
    pub fn read_rows(&self, name: &str) -> Result<Vec<LogRow>, BackendError> {
        let path = self.table_path(name);
        if !path.exists() {
            return Err(BackendError::TableNotFound(name.to_string()));
        }
        let reader = BufReader::new(File::open(path)?);
        let mut rows = Vec::new();
        for line in reader.lines() {
            rows.push(serde_json::from_str(&line?)?);
        }
        Ok(rows)
    }
}

impl TabularStore for JsonlStore {
    type Table = JsonlTable;

    fn find_table(&mut self, name: &str) -> Result<Option<Self::Table>, BackendError> {
        validate_name(name)?;
        let path = self.table_path(name);
        Ok(path.is_file().then(|| JsonlTable::new(path)))
    }

    fn create_table(&mut self, name: &str) -> Result<Self::Table, BackendError> {
        validate_name(name)?;
        let path = self.table_path(name);
        OpenOptions::new().write(true).create_new(true).open(&path)?;
        tracing::debug!(path = %path.display(), "created table file");
        Ok(JsonlTable::new(path))
    }
}

/// One JSONL table file
///
/// Tables are only ever appended to, so the handle remembers how far into
/// the file it has counted and only scans bytes written since.
#[derive(Debug, Clone)]
pub struct JsonlTable {
    path: PathBuf,
    scanned: Cell<RowMark>,
}

/// Row count of the first `offset` bytes of a table file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RowMark {
    offset: u64,
    rows: usize,
}

impl JsonlTable {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            scanned: Cell::new(RowMark::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count rows up to the current end of `file`, resuming from the last mark
    fn count_rows(&self, mut file: &File) -> io::Result<RowMark> {
        let len = file.metadata()?.len();
        let mut mark = self.scanned.get();
        if mark.offset > len {
            // Shrunk behind our back; start over
            mark = RowMark::default();
        }
        if mark.offset < len {
            file.seek(SeekFrom::Start(mark.offset))?;
            let mut reader = BufReader::with_capacity(64 * 1024, file.take(len - mark.offset));
            loop {
                let chunk = reader.fill_buf()?;
                if chunk.is_empty() {
                    break;
                }
                mark.rows += chunk.iter().filter(|&&b| b == b'\n').count();
                let consumed = chunk.len();
                mark.offset += consumed as u64;
                reader.consume(consumed);
            }
        }
        self.scanned.set(mark);
        Ok(mark)
    }
}

impl TableHandle for JsonlTable {
    fn last_row_index(&self) -> Result<usize, BackendError> {
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        Ok(self.count_rows(&file)?.rows)
    }

    /// Files grow on write, so capacity is unbounded
    fn max_row_capacity(&self) -> Result<usize, BackendError> {
        Ok(usize::MAX)
    }

    fn ensure_capacity(&mut self, _after_row: usize, _additional_rows: usize) -> Result<(), BackendError> {
        Ok(())
    }

    /// Append rows under an exclusive lock
    ///
    /// The write is refused if the file no longer ends at `start_row`, which
    /// happens when another process appended since the caller looked.
    fn append_rows(&mut self, start_row: usize, rows: &[LogRow]) -> Result<(), BackendError> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;

        // Lock is released when file is dropped
        file.lock_exclusive()?;

        let mark = self.count_rows(&file)?;
        let current = mark.rows;
        if current != start_row {
            return Err(BackendError::Rejected {
                operation: "append_rows",
                reason: format!(
                    "table has {} rows, refusing to write at row {}",
                    current,
                    start_row + 1
                ),
            });
        }

        write_or_truncate(&file, mark.offset, |file| write_rows(file, rows))?;

        self.scanned.set(RowMark {
            offset: file.metadata()?.len(),
            rows: current + rows.len(),
        });
        Ok(())
    }
}

fn write_rows(file: &File, rows: &[LogRow]) -> Result<(), BackendError> {
    let mut writer = BufWriter::with_capacity(8192, file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Run `write`, cutting the file back to `end` if it fails part way
fn write_or_truncate<F>(file: &File, end: u64, write: F) -> Result<(), BackendError>
where
    F: FnOnce(&File) -> Result<(), BackendError>,
{
    let result = write(file);
    if result.is_err() {
        if let Err(e) = file.set_len(end) {
            tracing::warn!(error = %e, "could not roll back partial append");
        }
    }
    result
}

fn validate_name(name: &str) -> Result<(), BackendError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(BackendError::Rejected {
            operation: "resolve_table",
            reason: format!("'{}' is not a usable table name", name),
        });
    }
    Ok(())
}
