//! Tail reading for JSONL tables

use crate::schema::LogRow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Read the last `n` rows of a JSONL table without loading the whole file
///
/// Reads backwards in fixed-size chunks and stops as soon as enough complete
/// lines have been seen. Lines that do not parse as a row are skipped.
pub fn read_last_n_rows(file_path: &Path, n: usize) -> io::Result<Vec<LogRow>> {
    const CHUNK_SIZE: u64 = 64 * 1024;

    let mut file = File::open(file_path)?;
    let mut offset = file.metadata()?.len();

    // Lines collected newest first
    let mut newest_first: Vec<LogRow> = Vec::new();
    let mut carry: Vec<u8> = Vec::new();

    while offset > 0 && newest_first.len() < n {
        let read_size = CHUNK_SIZE.min(offset);
        offset -= read_size;

        file.seek(SeekFrom::Start(offset))?;
        let mut chunk = vec![0u8; read_size as usize];
        file.read_exact(&mut chunk)?;
        chunk.append(&mut carry);

        // Everything before the first newline may be a partial line, unless we hit the start
        let mut end = chunk.len();
        while let Some(pos) = chunk[..end].iter().rposition(|&b| b == b'\n') {
            push_line(&chunk[pos + 1..end], &mut newest_first);
            end = pos;
            if newest_first.len() >= n {
                break;
            }
        }
        carry = chunk[..end].to_vec();
    }

    if offset == 0 && newest_first.len() < n {
        push_line(&carry, &mut newest_first);
    }

    newest_first.truncate(n);
    newest_first.reverse();
    Ok(newest_first)
}

fn push_line(line: &[u8], out: &mut Vec<LogRow>) {
    if line.is_empty() {
        return;
    }
    if let Ok(row) = serde_json::from_slice::<LogRow>(line) {
        out.push(row);
    }
}
