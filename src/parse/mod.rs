// src/parse/mod.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, warn};

/// One input record: source header → raw cell value.
/// Duplicate headers collapse to a single entry (last value wins).
pub type RawRow = HashMap<String, String>;

/// Output of the tabular parser: the normalized header row plus one
/// `RawRow` per data record.
#[derive(Debug)]
pub struct ParsedFile {
    /// Trimmed, order-preserving header names with empty names dropped
    /// and duplicates collapsed.
    pub headers: Vec<String>,
    /// Header names that occurred more than once in the raw header row.
    /// Non-fatal: columns after the first occurrence are shadowed.
    pub duplicate_headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Candidate delimiters, in preference order on equal counts.
/// Space is only considered when none of the others occur.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = DELIMITERS[0];
    let mut best_count = 0usize;
    for &d in &DELIMITERS {
        let count = header_line.bytes().filter(|&b| b == d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    if best_count == 0 && header_line.contains(' ') {
        return b' ';
    }
    best
}

/// Parse delimited text into headers plus raw rows. The first row is
/// always treated as the header row. A file that yields zero data rows
/// is an error, not a panic.
pub fn parse_delimited(text: &str) -> Result<ParsedFile> {
    if text.trim().is_empty() {
        anyhow::bail!("input file is empty");
    }
    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(header_line);
    debug!(delimiter = %(delimiter as char), "detected delimiter");

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(Cursor::new(text.as_bytes()));

    // (column index, trimmed name) for every named column, duplicates
    // included so that a later duplicate shadows the earlier one.
    let mut columns: Vec<(usize, String)> = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut duplicate_headers: Vec<String> = Vec::new();
    let mut rows: Vec<RawRow> = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("parse error at record {}", idx))?;

        if idx == 0 {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for (col, cell) in record.iter().enumerate() {
                let name = cell.trim();
                if name.is_empty() {
                    continue;
                }
                let seen = counts.entry(name.to_string()).or_insert(0);
                *seen += 1;
                if *seen == 1 {
                    headers.push(name.to_string());
                } else if *seen == 2 {
                    duplicate_headers.push(name.to_string());
                }
                columns.push((col, name.to_string()));
            }
            if !duplicate_headers.is_empty() {
                warn!(
                    headers = ?duplicate_headers,
                    "duplicate header names; later columns shadow earlier ones"
                );
            }
            continue;
        }

        // Skip records that are entirely empty after trimming.
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::with_capacity(columns.len());
        for (col, name) in &columns {
            let value = record.get(*col).map(str::trim).unwrap_or("");
            row.insert(name.clone(), value.to_string());
        }
        rows.push(row);
    }

    if headers.is_empty() {
        anyhow::bail!("header row has no named columns");
    }
    if rows.is_empty() {
        anyhow::bail!("file contains no data rows");
    }

    debug!(headers = headers.len(), rows = rows.len(), "parsed file");
    Ok(ParsedFile {
        headers,
        duplicate_headers,
        rows,
    })
}
