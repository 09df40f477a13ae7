//! Property-based tests using proptest
//!
//! These drive the logger with random message streams and thresholds and
//! check the flush policy against what ends up in the table.

mod common;

use common::*;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use sheet_logger::memory_store::StoreOp;
use sheet_logger::schema::{LogLevel, LogRow};
use sheet_logger::{BufferedTableLogger, JsonlStore, LoggerConfig};
use tempfile::TempDir;

// Strategy for generating log levels
fn log_level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

// Strategy for generating arbitrary Unicode messages (including edge cases)
fn message_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Regular ASCII
        "[a-zA-Z0-9 .,!?]{1,100}",
        // Unicode with emojis
        "[\u{0080}-\u{10FFFF}]{1,50}",
        // Mixed printable content, including quotes and backslashes
        "\\PC{1,200}",
        // Long string
        "[x]{500}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_auto_flush_count_matches_threshold(
        max_buffer in 1usize..20,
        entries in 0usize..100,
    ) {
        let (mut logger, store) = create_test_logger(LoggerConfig::new("Logs").with_max_buffer(max_buffer));

        for i in 0..entries {
            logger.insert(format!("entry {}", i)).unwrap();
            prop_assert!(logger.len() < max_buffer);
        }

        prop_assert_eq!(logger.flush_count(), (entries / max_buffer) as u64);
        prop_assert_eq!(logger.len(), entries % max_buffer);

        logger.flush().unwrap();
        let expected: Vec<String> = (0..entries).map(|i| format!("entry {}", i)).collect();
        prop_assert_eq!(messages(&store, "Logs"), expected);
    }

    #[test]
    fn test_leveled_rows_preserve_order_and_header_once(
        entries in prop::collection::vec((log_level_strategy(), message_strategy()), 1..60),
        max_buffer in 1usize..25,
    ) {
        let (mut logger, store) = create_test_logger(LoggerConfig::new("Logs").with_max_buffer(max_buffer));

        for (level, message) in &entries {
            logger.log(*level, message).unwrap();
        }
        logger.flush().unwrap();

        let rows = store.rows("Logs").unwrap();
        prop_assert_eq!(rows.len(), entries.len() + 1);
        prop_assert_eq!(&rows[0], &LogRow::header());
        for (row, (level, message)) in rows[1..].iter().zip(&entries) {
            prop_assert_eq!(row, &LogRow::leveled(FIXED_TIMESTAMP, *level, message.clone()));
        }
    }

    #[test]
    fn test_failures_never_lose_rows(
        messages_in in prop::collection::vec("[a-z]{1,12}", 1..40),
        fail_at in prop::collection::vec(0usize..40, 0..5),
    ) {
        let (mut logger, store) = create_test_logger(LoggerConfig::new("Logs").with_max_buffer(7));

        for (i, message) in messages_in.iter().enumerate() {
            if fail_at.contains(&i) {
                store.fail_next(StoreOp::AppendRows);
            }
            // Errors from the automatic flush are expected here
            let _ = logger.insert(message);
        }
        // A failure armed on the last entry may still be pending
        let _ = logger.flush();
        logger.flush().unwrap();

        prop_assert!(logger.is_empty());
        prop_assert_eq!(messages(&store, "Logs"), messages_in);
    }

    #[test]
    fn test_jsonl_store_handles_special_characters(
        messages_in in prop::collection::vec(message_strategy(), 1..20)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlStore::new(temp_dir.path().to_path_buf()).unwrap();
        let mut logger = BufferedTableLogger::new(LoggerConfig::new("Logs").with_max_buffer(4), store.clone())
            .unwrap()
            .with_clock(fixed_clock);

        for message in &messages_in {
            logger.error(message).unwrap();
        }
        logger.flush().unwrap();

        let rows = store.read_rows("Logs").unwrap();
        prop_assert_eq!(rows.len(), messages_in.len() + 1);
        for (row, message) in rows[1..].iter().zip(&messages_in) {
            prop_assert_eq!(row.message(), Some(message.as_str()));
        }
    }

    #[test]
    fn test_tail_reading_correctness(
        num_rows in 1usize..100,
        requested in 1usize..50,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlStore::new(temp_dir.path().to_path_buf()).unwrap();
        let mut logger = BufferedTableLogger::new(LoggerConfig::new("Logs"), store.clone())
            .unwrap()
            .with_clock(fixed_clock);
        for i in 0..num_rows {
            logger.insert(format!("number {}", i)).unwrap();
        }
        logger.flush().unwrap();

        let rows = sheet_logger::read_last_n_rows(&store.table_path("Logs"), requested).unwrap();
        let expected_count = requested.min(num_rows);
        prop_assert_eq!(rows.len(), expected_count);

        let first = num_rows - expected_count;
        for (i, row) in rows.iter().enumerate() {
            let expected = format!("number {}", first + i);
            prop_assert_eq!(row.message(), Some(expected.as_str()));
        }
    }
}
