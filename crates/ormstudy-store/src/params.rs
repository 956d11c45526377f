//! Statement parameters
//!
//! Queries bind either positional `?` parameters or named `:name`
//! parameters, never both.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::mapping::to_sql;
use ormstudy_core::{ExError, ExErrorKind, SqlValue};
use rusqlite::Statement;

/// Parameters bound to one statement execution
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<SqlValue>),
    Named(Vec<(String, SqlValue)>),
}

impl Params {
    /// Start an empty named parameter list
    pub fn named() -> Self {
        Params::Named(Vec::new())
    }

    /// Add a named parameter; the leading `:` is optional
    ///
    /// Turns `None` into a named list. Has no effect on positional lists.
    pub fn set(self, name: &str, value: impl Into<SqlValue>) -> Self {
        let name = if name.starts_with(':') {
            name.to_string()
        } else {
            format!(":{}", name)
        };
        match self {
            Params::None => Params::Named(vec![(name, value.into())]),
            Params::Named(mut pairs) => {
                pairs.push((name, value.into()));
                Params::Named(pairs)
            }
            positional => positional,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(values) => values.len(),
            Params::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn bind_to(&self, stmt: &mut Statement<'_>) -> Result<()> {
        let expected = stmt.parameter_count();
        if expected != self.len() {
            return Err(ExError::new(ExErrorKind::InvalidQuery)
                .with_op("bind")
                .with_message(format!(
                    "statement expects {} parameters, got {}",
                    expected,
                    self.len()
                )));
        }
        match self {
            Params::None => {}
            Params::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, to_sql(value))
                        .map_err(from_rusqlite)?;
                }
            }
            Params::Named(pairs) => {
                for (name, value) in pairs {
                    let index = stmt
                        .parameter_index(name)
                        .map_err(from_rusqlite)?
                        .ok_or_else(|| {
                            ExError::new(ExErrorKind::InvalidQuery)
                                .with_op("bind")
                                .with_message(format!("unknown parameter {}", name))
                        })?;
                    stmt.raw_bind_parameter(index, to_sql(value))
                        .map_err(from_rusqlite)?;
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        if values.is_empty() {
            Params::None
        } else {
            Params::Positional(values)
        }
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}

/// Build positional parameters from anything convertible to `SqlValue`
///
/// ```
/// use ormstudy_store::{sql_params, Params};
///
/// let params = sql_params!["member1", 10];
/// assert_eq!(params.len(), 2);
/// assert_eq!(sql_params![], Params::None);
/// ```
#[macro_export]
macro_rules! sql_params {
    () => {
        $crate::Params::None
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Params::Positional(vec![$($crate::SqlValue::from($value)),+])
    };
}
