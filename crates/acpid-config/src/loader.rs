//! Loader for the whitespace-delimited table files.
//!
//! Format, shared by `acpid.conf` and `acpi.map`:
//!
//! ```text
//! # comment
//! EV_KEY  01  KEY_POWER  116  1  button/power PWRF 00000080   # trailing comment
//! ```
//!
//! Fields are separated by runs of spaces or tabs. `#` starts a comment
//! anywhere on a line. The last field takes the rest of the line, so the
//! description column may contain spaces.

use crate::error::RowError;
use crate::tables::{ActionTable, EventTable, Table, TableRow};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DELIMITERS: &[char] = &[' ', '\t'];
const COMMENT: char = '#';

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOrigin {
    /// Rows were read from this file.
    File(PathBuf),
    /// The built-in table was substituted.
    Defaults(DefaultReason),
}

/// Why the built-in table was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    /// The file could not be opened or read.
    Unreadable(String),
    /// The file was read but contained no usable rows.
    NoRows,
}

/// A row that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line number.
    pub line: usize,
    /// Why the row was skipped.
    pub error: RowError,
}

/// Full result of loading one table file.
#[derive(Debug, Clone)]
pub struct LoadReport<R> {
    /// The table to use. Never empty.
    pub table: Table<R>,
    /// Where the rows came from.
    pub origin: TableOrigin,
    /// Rows skipped because they did not parse.
    pub rejected: Vec<RejectedRow>,
}

impl<R> LoadReport<R> {
    /// Whether the built-in defaults are in use.
    pub fn used_defaults(&self) -> bool {
        matches!(self.origin, TableOrigin::Defaults(_))
    }
}

/// Load the action table, falling back to the defaults.
pub fn load_action_table(path: impl AsRef<Path>) -> ActionTable {
    load_table(path.as_ref()).table
}

/// Load the event map, falling back to the defaults.
pub fn load_event_table(path: impl AsRef<Path>) -> EventTable {
    load_table(path.as_ref()).table
}

/// Load any table type and report how it was built.
///
/// Rows with too few fields or bad numbers are rejected one by one and
/// logged; they never stop the rest of the file from loading.
pub fn load_table<R: TableRow>(path: &Path) -> LoadReport<R> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            info!(
                "Using built-in {} table, {} not readable: {}",
                R::TABLE,
                path.display(),
                e
            );
            return LoadReport {
                table: Table::defaults(),
                origin: TableOrigin::Defaults(DefaultReason::Unreadable(e.to_string())),
                rejected: Vec::new(),
            };
        }
    };

    let content = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = content {
        warn!(
            "{} is not valid UTF-8, invalid bytes replaced with U+FFFD",
            path.display()
        );
    }
    let (rows, rejected) = parse_rows::<R>(&content);

    for row in &rejected {
        warn!(
            "{}:{}: skipping {} row: {}",
            path.display(),
            row.line,
            R::TABLE,
            row.error
        );
    }

    if rows.is_empty() {
        warn!(
            "No usable rows in {}, using built-in {} table",
            path.display(),
            R::TABLE
        );
        return LoadReport {
            table: Table::defaults(),
            origin: TableOrigin::Defaults(DefaultReason::NoRows),
            rejected,
        };
    }

    debug!(
        "Loaded {} {} rows from {}",
        rows.len(),
        R::TABLE,
        path.display()
    );

    LoadReport {
        table: Table::from_rows(rows),
        origin: TableOrigin::File(path.to_path_buf()),
        rejected,
    }
}

/// Parse table content into accepted rows and rejected ones.
pub fn parse_rows<R: TableRow>(content: &str) -> (Vec<R>, Vec<RejectedRow>) {
    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let fields = tokenize_line(line, R::FIELDS);
        if fields.is_empty() {
            continue;
        }

        let parsed = if fields.len() < R::FIELDS {
            Err(RowError::FieldCount {
                expected: R::FIELDS,
                found: fields.len(),
            })
        } else {
            R::from_fields(&fields)
        };

        match parsed {
            Ok(row) => rows.push(row),
            Err(error) => rejected.push(RejectedRow {
                line: idx + 1,
                error,
            }),
        }
    }

    (rows, rejected)
}

/// Split a line into at most `max_fields` fields.
///
/// Comments are stripped first. The final field keeps the remainder of the
/// line verbatim apart from surrounding delimiters.
pub fn tokenize_line(line: &str, max_fields: usize) -> Vec<&str> {
    let line = match line.find(COMMENT) {
        Some(pos) => &line[..pos],
        None => line,
    };
    let mut rest = line.trim_matches(DELIMITERS);
    let mut fields = Vec::with_capacity(max_fields);

    while !rest.is_empty() && max_fields > 0 {
        if fields.len() + 1 == max_fields {
            fields.push(rest);
            break;
        }
        match rest.find(DELIMITERS) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start_matches(DELIMITERS);
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}
