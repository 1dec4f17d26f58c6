//! Turns decoded OData payloads into [`RowSet`]s and names the sheets they
//! end up on.

mod naming;

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::model::RowSet;

pub use naming::{FORBIDDEN_SHEET_CHARS, MAX_SHEET_NAME_LEN, SheetNameRegistry, sheet_name};

/// Key holding the record list in an OData collection response.
pub const RECORDS_KEY: &str = "value";
/// Column used for list items that are not objects.
pub const SCALAR_COLUMN: &str = "value";

/// Shape of the payload the rows were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// An object carrying a `value` list, the expected OData shape.
    Records,
    /// A bare JSON array.
    BareList,
    /// Anything else; treated as zero rows.
    Unrecognized,
}

impl PayloadShape {
    /// Whether the shape deviates from the expected OData collection.
    pub fn is_anomaly(self) -> bool {
        self != PayloadShape::Records
    }
}

/// Result of normalising one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub rows: RowSet,
    pub shape: PayloadShape,
}

/// Extracts the record list from `payload` and tabulates it.
///
/// Columns are the union of record keys in first-seen order, minus
/// `drop_columns`. An empty result carries the placeholder column so the
/// exporter always has a header to write.
pub fn normalize_payload(payload: &Value, drop_columns: &[String]) -> Normalized {
    let (records, shape) = match payload {
        Value::Object(map) => match map.get(RECORDS_KEY) {
            Some(Value::Array(items)) => (items.as_slice(), PayloadShape::Records),
            _ => (&[][..], PayloadShape::Unrecognized),
        },
        Value::Array(items) => (items.as_slice(), PayloadShape::BareList),
        _ => (&[][..], PayloadShape::Unrecognized),
    };

    Normalized {
        rows: tabulate(records, drop_columns),
        shape,
    }
}

/// Builds a row set from a list of records.
pub fn tabulate(records: &[Value], drop_columns: &[String]) -> RowSet {
    if records.is_empty() {
        return RowSet::placeholder();
    }

    let dropped: HashSet<&str> = drop_columns.iter().map(String::as_str).collect();
    let objects: Vec<Map<String, Value>> = records.iter().map(as_record).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns: Vec<String> = Vec::new();
    for record in &objects {
        for key in record.keys() {
            if !dropped.contains(key.as_str()) && seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    if columns.is_empty() {
        // Every field was dropped, or records were `{}`: keep the row count
        // visible under the placeholder header.
        return RowSet {
            columns: RowSet::placeholder().columns,
            rows: vec![vec![Value::Null]; objects.len()],
        };
    }

    let rows = objects
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    RowSet { columns, rows }
}

fn as_record(item: &Value) -> Map<String, Value> {
    match item {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert(SCALAR_COLUMN.to_string(), other.clone());
            map
        }
    }
}
