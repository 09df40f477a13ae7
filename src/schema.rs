//! Row layout for table-backed logs
//!
//! A log entry is written as one row of text cells. Plain entries carry
//! `[timestamp, message]`, leveled entries carry `[timestamp, level, message]`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Header written above leveled rows in a fresh table
pub const LEVELED_HEADER: [&str; 3] = ["Timestamp", "Level", "Message"];

/// `yyyy-MM-dd HH:mm:ss`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column layout of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowShape {
    /// `[timestamp, message]`
    Plain,
    /// `[timestamp, level, message]`
    Leveled,
}

impl RowShape {
    /// Number of cells a row of this shape holds
    pub fn columns(self) -> usize {
        match self {
            RowShape::Plain => 2,
            RowShape::Leveled => 3,
        }
    }

    fn from_columns(columns: usize) -> Option<Self> {
        match columns {
            2 => Some(RowShape::Plain),
            3 => Some(RowShape::Leveled),
            _ => None,
        }
    }
}

impl fmt::Display for RowShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowShape::Plain => write!(f, "plain (2-column)"),
            RowShape::Leveled => write!(f, "leveled (3-column)"),
        }
    }
}

/// Severity tag on a leveled row. There is no filtering by level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [LogLevel::Info, LogLevel::Debug, LogLevel::Warn, LogLevel::Error];

    /// Name written into the level column
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// One row of cells, serialized as a JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRow {
    cells: Vec<String>,
}

impl LogRow {
    /// `[timestamp, message]`
    pub fn plain(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            cells: vec![timestamp.into(), message.into()],
        }
    }

    /// `[timestamp, level, message]`
    pub fn leveled(timestamp: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            cells: vec![timestamp.into(), level.as_str().to_string(), message.into()],
        }
    }

    /// The `Timestamp | Level | Message` header row
    pub fn header() -> Self {
        Self::from_cells(LEVELED_HEADER)
    }

    /// Build a row from arbitrary cells (used by stores reading rows back)
    pub fn from_cells<I, C>(cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<String> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Shape implied by the column count, `None` for any other width
    pub fn shape(&self) -> Option<RowShape> {
        RowShape::from_columns(self.cells.len())
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.cells.first().map(String::as_str)
    }

    /// Message cell, always the last one
    pub fn message(&self) -> Option<&str> {
        self.cells.last().map(String::as_str)
    }

    pub fn level(&self) -> Option<LogLevel> {
        match self.shape()? {
            RowShape::Leveled => self.cells[1].parse().ok(),
            RowShape::Plain => None,
        }
    }
}

/// Conversion of a logging argument into message text.
///
/// `None` means "no message": the logging call is dropped without error.
pub trait IntoMessage {
    fn into_message(self) -> Option<String>;
}

impl IntoMessage for String {
    fn into_message(self) -> Option<String> {
        Some(self)
    }
}

impl IntoMessage for &str {
    fn into_message(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoMessage for &String {
    fn into_message(self) -> Option<String> {
        Some(self.clone())
    }
}

impl IntoMessage for Cow<'_, str> {
    fn into_message(self) -> Option<String> {
        Some(self.into_owned())
    }
}

impl IntoMessage for fmt::Arguments<'_> {
    fn into_message(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: IntoMessage> IntoMessage for Option<T> {
    fn into_message(self) -> Option<String> {
        self.and_then(IntoMessage::into_message)
    }
}

macro_rules! display_message {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoMessage for $ty {
                fn into_message(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_message!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
