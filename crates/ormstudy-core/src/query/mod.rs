//! Type-safe SQL query builder
//!
//! Tables and columns are declared once per entity; queries are assembled
//! from typed columns and rendered to SQL text with positional `?`
//! parameters. Rendering never interpolates values into the SQL text.
//!
//! ```
//! use ormstudy_core::query::{Select, Table};
//!
//! let item = Table::new("ITEM", "item");
//! let name = item.col::<String>("NAME");
//! let price = item.col::<i64>("PRICE");
//!
//! let stmt = Select::from(&item)
//!     .filter(name.eq("good").and(price.gt(20000)))
//!     .order_by(price.desc())
//!     .build();
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT item.* FROM ITEM item WHERE (item.NAME = ? AND item.PRICE > ?) ORDER BY item.PRICE DESC"
//! );
//! assert_eq!(stmt.params.len(), 2);
//! ```

mod expr;
mod statement;
mod table;

pub use expr::{CompareOp, Expr, OrderSpec, Predicate, PredicateBuilder, Projection};
pub use statement::{Delete, Select, Statement, Update};
pub use table::{Column, Table};

/// Accumulates SQL text and its bound parameters while rendering
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    pub(crate) sql: String,
    pub(crate) params: Vec<crate::value::SqlValue>,
    /// Prefix columns with their table alias
    pub(crate) qualify: bool,
}

impl SqlWriter {
    pub(crate) fn qualified() -> Self {
        Self {
            qualify: true,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub(crate) fn bind(&mut self, value: crate::value::SqlValue) {
        self.sql.push('?');
        self.params.push(value);
    }
}
