//! Entity mapping
//!
//! An entity is a struct bound to one table: a primary key column plus a
//! fixed list of value columns. The session generates its INSERT, SELECT,
//! upsert and DELETE statements from these declarations.

use ormstudy_core::mapping::EntityListener;
use ormstudy_core::SqlValue;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Row;
use std::fmt;

/// Primary key types an entity may use
pub trait EntityId: Clone + fmt::Debug + fmt::Display + Into<SqlValue> {
    /// The id for a freshly generated rowid, or `None` when the application
    /// assigns ids itself
    fn from_generated(rowid: i64) -> Option<Self>;
}

impl EntityId for i64 {
    fn from_generated(rowid: i64) -> Option<Self> {
        Some(rowid)
    }
}

impl EntityId for String {
    fn from_generated(_rowid: i64) -> Option<Self> {
        None
    }
}

/// A struct mapped onto a single table
///
/// `values()` must yield one value per entry of `COLUMNS`, in the same
/// order. `from_row` reads columns by name so it works for `SELECT *` and for
/// `SELECT alias.*` alike.
pub trait Entity: Sized {
    type Id: EntityId;

    /// Name used in logs, errors and named query result declarations
    const ENTITY_NAME: &'static str;
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// Value columns, excluding the id
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    fn values(&self) -> Vec<SqlValue>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Listeners fired around persist and remove
    fn listeners() -> Vec<Box<dyn EntityListener<Self>>> {
        Vec::new()
    }
}

/// Convert a neutral value into an owned driver value
pub fn to_sql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(*v),
        SqlValue::Text(v) => Value::Text(v.clone()),
    }
}

/// Convert a borrowed driver value into a neutral value
///
/// Blobs are rendered as lowercase hex text.
pub fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Text(hex::encode(bytes)),
    }
}

/// Every column of a row as neutral values
pub fn row_values(row: &Row<'_>) -> rusqlite::Result<Vec<SqlValue>> {
    let count = row.as_ref().column_count();
    (0..count)
        .map(|i| row.get_ref(i).map(from_value_ref))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_generated_ids() {
        assert_eq!(i64::from_generated(5), Some(5));
        assert_eq!(String::from_generated(5), None);
    }

    #[test]
    fn test_row_values_cover_every_storage_class() {
        let conn = Connection::open_in_memory().unwrap();
        let values = conn
            .query_row("SELECT NULL, 1, 2.5, 'kim', x'0aff'", [], |row| row_values(row))
            .unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Null,
                SqlValue::Integer(1),
                SqlValue::Real(2.5),
                SqlValue::Text("kim".into()),
                SqlValue::Text("0aff".into()),
            ]
        );
    }

    #[test]
    fn test_to_sql_round_trips_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let value: String = conn
            .query_row("SELECT ?", [to_sql(&SqlValue::from("seoul"))], |r| r.get(0))
            .unwrap();
        assert_eq!(value, "seoul");
    }
}
