//! Mapping table types and their built-in defaults.

use crate::error::RowError;
use std::fmt;

/// A row type that can be parsed from one line of a table file.
pub trait TableRow: Sized + Clone {
    /// Number of fields a row must carry. The last field is greedy.
    const FIELDS: usize;

    /// Human-readable table name used in log messages.
    const TABLE: &'static str;

    /// Build a row from exactly [`Self::FIELDS`] tokens.
    fn from_fields(fields: &[&str]) -> Result<Self, RowError>;

    /// The built-in rows used when no usable file is present.
    fn defaults() -> Vec<Self>;
}

/// One recognized binary input event and the description it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapEntry {
    /// Symbolic event type, e.g. `EV_KEY`.
    pub type_name: String,
    /// Numeric event type.
    pub type_code: u16,
    /// Symbolic event code, e.g. `KEY_POWER`.
    pub code_name: String,
    /// Numeric event code.
    pub code_value: u16,
    /// Event value (1 = press, 0 = release).
    pub value: u32,
    /// Description, the key into the action table.
    pub description: String,
}

impl EventMapEntry {
    /// Create a new entry.
    pub fn new(
        type_name: impl Into<String>,
        type_code: u16,
        code_name: impl Into<String>,
        code_value: u16,
        value: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            type_code,
            code_name: code_name.into(),
            code_value,
            value,
            description: description.into(),
        }
    }
}

impl TableRow for EventMapEntry {
    const FIELDS: usize = 6;
    const TABLE: &'static str = "event map";

    fn from_fields(fields: &[&str]) -> Result<Self, RowError> {
        if fields.len() != Self::FIELDS {
            return Err(RowError::FieldCount {
                expected: Self::FIELDS,
                found: fields.len(),
            });
        }

        Ok(Self {
            type_name: fields[0].to_string(),
            type_code: parse_hex_u16("type_code", fields[1])?,
            code_name: fields[2].to_string(),
            code_value: parse_dec_u16("code_value", fields[3])?,
            value: parse_dec_value(fields[4])?,
            description: fields[5].to_string(),
        })
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::new("EV_KEY", 0x01, "KEY_POWER", 116, 1, "button/power PWRF 00000080"),
            Self::new("EV_KEY", 0x01, "KEY_POWER", 116, 1, "button/power PWRB 00000080"),
        ]
    }
}

/// Maps a fragment of an event description to a handler path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMapEntry {
    /// Substring searched for in the event description.
    pub key_fragment: String,
    /// Handler path, relative to the configuration directory.
    pub action_path: String,
}

impl ActionMapEntry {
    /// Create a new entry.
    pub fn new(key_fragment: impl Into<String>, action_path: impl Into<String>) -> Self {
        Self {
            key_fragment: key_fragment.into(),
            action_path: action_path.into(),
        }
    }
}

impl TableRow for ActionMapEntry {
    const FIELDS: usize = 2;
    const TABLE: &'static str = "action";

    fn from_fields(fields: &[&str]) -> Result<Self, RowError> {
        match fields {
            [key, action] => Ok(Self::new(*key, *action)),
            _ => Err(RowError::FieldCount {
                expected: Self::FIELDS,
                found: fields.len(),
            }),
        }
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::new("PWRF", "PWRF/00000080"),
            Self::new("LID0", "LID/00000080"),
        ]
    }
}

/// An ordered, non-empty table of rows. Order decides first-match-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R: TableRow> Table<R> {
    /// The built-in table.
    pub fn defaults() -> Self {
        Self { rows: R::defaults() }
    }

    /// Build a table from rows, substituting the defaults if `rows` is empty.
    pub fn from_rows(rows: Vec<R>) -> Self {
        if rows.is_empty() {
            Self::defaults()
        } else {
            Self { rows }
        }
    }
}

impl<R> Table<R> {
    /// Rows in load order.
    pub fn entries(&self) -> &[R] {
        &self.rows
    }

    /// Iterate rows in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for tables built through this module.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// The event map.
pub type EventTable = Table<EventMapEntry>;

/// The action table.
pub type ActionTable = Table<ActionMapEntry>;

/// Both tables, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTables {
    events: EventTable,
    actions: ActionTable,
}

impl MappingTables {
    /// Bundle an event map and an action table.
    pub fn new(events: EventTable, actions: ActionTable) -> Self {
        Self { events, actions }
    }

    /// The event map.
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    /// The action table.
    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }
}

impl Default for MappingTables {
    fn default() -> Self {
        Self::new(EventTable::defaults(), ActionTable::defaults())
    }
}

impl fmt::Display for MappingTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} event mappings, {} actions",
            self.events.len(),
            self.actions.len()
        )
    }
}

fn parse_hex_u16(field: &'static str, raw: &str) -> Result<u16, RowError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u16::from_str_radix(digits, 16).map_err(|e| number_error(field, raw, e))
}

fn parse_dec_u16(field: &'static str, raw: &str) -> Result<u16, RowError> {
    raw.parse::<u16>().map_err(|e| number_error(field, raw, e))
}

// Values are non-negative ints in the kernel's i32 range.
fn parse_dec_value(raw: &str) -> Result<u32, RowError> {
    let value = raw
        .parse::<u32>()
        .map_err(|e| number_error("value", raw, e))?;
    if value > i32::MAX as u32 {
        return Err(RowError::Number {
            field: "value",
            value: raw.to_string(),
            reason: format!("exceeds {}", i32::MAX),
        });
    }
    Ok(value)
}

fn number_error(field: &'static str, raw: &str, err: impl fmt::Display) -> RowError {
    RowError::Number {
        field,
        value: raw.to_string(),
        reason: err.to_string(),
    }
}
