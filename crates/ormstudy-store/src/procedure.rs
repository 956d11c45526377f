//! Stored procedures
//!
//! SQLite has no stored procedures. A procedure is declared with its IN and
//! OUT parameters and backed by a Rust function that SQLite calls as a
//! scalar function; the single OUT parameter is the function result.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::mapping::{from_value_ref, to_sql};
use ormstudy_core::mapping::NamedStoredProcedure;
use ormstudy_core::{ExError, ExErrorKind, SqlValue};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Body of a procedure: IN arguments to the OUT value
pub type ProcedureFn = fn(&[SqlValue]) -> Result<SqlValue>;

/// A declared procedure together with its implementation
#[derive(Clone)]
pub struct Procedure {
    declaration: NamedStoredProcedure,
    body: ProcedureFn,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

impl Procedure {
    pub fn new(declaration: NamedStoredProcedure, body: ProcedureFn) -> Self {
        Self { declaration, body }
    }

    pub fn declaration(&self) -> &NamedStoredProcedure {
        &self.declaration
    }

    /// Install the body as a scalar function on `conn`
    pub(crate) fn register(&self, conn: &Connection) -> Result<()> {
        let arity = i32::try_from(self.declaration.in_params()).map_err(|_| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("register_procedure")
                .with_message(format!(
                    "too many parameters for {}",
                    self.declaration.procedure_name
                ))
        })?;
        let body = self.body;
        conn.create_scalar_function(
            self.declaration.procedure_name.as_str(),
            arity,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let args: Vec<SqlValue> =
                    (0..ctx.len()).map(|i| from_value_ref(ctx.get_raw(i))).collect();
                body(&args)
                    .map(|out| to_sql(&out))
                    .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
            },
        )
        .map_err(from_rusqlite)
    }
}
