//! Table and column handles

use super::expr::{CompareOp, Expr, OrderSpec, Predicate, Projection};
use super::statement::Select;
use crate::value::SqlValue;
use std::marker::PhantomData;

/// A table reference with the alias it is queried under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    alias: String,
}

impl Table {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// Same table under another alias, for self joins and subqueries
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        Self::new(self.name.clone(), alias)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Typed handle to one column of this table
    pub fn col<T>(&self, column: &str) -> Column<T> {
        Column {
            table_alias: self.alias.clone(),
            name: column.to_string(),
            _type: PhantomData,
        }
    }
}

/// A column whose values have Rust type `T`
#[derive(Debug)]
pub struct Column<T> {
    table_alias: String,
    name: String,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            table_alias: self.table_alias.clone(),
            name: self.name.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> Column<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> Expr {
        Expr::Column {
            table_alias: self.table_alias.clone(),
            name: self.name.clone(),
        }
    }

    fn compare_value(&self, op: CompareOp, value: SqlValue) -> Predicate {
        Predicate::Compare {
            left: self.expr(),
            op,
            right: Expr::Value(value),
        }
    }

    /// `self = other` between two columns (join and correlation conditions)
    pub fn eq_col(&self, other: &Column<T>) -> Predicate {
        Predicate::Compare {
            left: self.expr(),
            op: CompareOp::Eq,
            right: other.expr(),
        }
    }

    /// `self = (scalar subquery)`
    pub fn eq_subquery(&self, subquery: Select) -> Predicate {
        Predicate::Compare {
            left: self.expr(),
            op: CompareOp::Eq,
            right: Expr::Subquery(Box::new(subquery)),
        }
    }

    /// `self IN (subquery)`
    pub fn in_subquery(&self, subquery: Select) -> Predicate {
        Predicate::InSubquery {
            expr: self.expr(),
            subquery: Box::new(subquery),
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expr(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expr(),
            negated: true,
        }
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(self.expr())
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(self.expr())
    }

    /// `MAX(self)`
    pub fn max(&self) -> Expr {
        Expr::Aggregate {
            function: "MAX",
            arg: Box::new(self.expr()),
        }
    }

    /// `COUNT(self)`
    pub fn count(&self) -> Expr {
        Expr::Aggregate {
            function: "COUNT",
            arg: Box::new(self.expr()),
        }
    }

    /// Project this column under a different label
    pub fn as_(&self, alias: &str) -> Projection {
        Projection::new(self.expr()).with_alias(alias)
    }
}

impl<T: Into<SqlValue>> Column<T> {
    fn lift(value: impl Into<T>) -> SqlValue {
        let typed: T = value.into();
        typed.into()
    }

    pub fn eq(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Eq, Self::lift(value))
    }

    pub fn ne(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Ne, Self::lift(value))
    }

    pub fn gt(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Gt, Self::lift(value))
    }

    pub fn ge(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Ge, Self::lift(value))
    }

    pub fn lt(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Lt, Self::lift(value))
    }

    pub fn le(&self, value: impl Into<T>) -> Predicate {
        self.compare_value(CompareOp::Le, Self::lift(value))
    }

    /// `self + value`, for update assignments
    pub fn add(&self, value: impl Into<T>) -> Expr {
        Expr::Binary {
            left: Box::new(self.expr()),
            op: "+",
            right: Box::new(Expr::Value(Self::lift(value))),
        }
    }
}

impl Column<String> {
    /// `LIKE '%needle%'` with `%`, `_` and `\` in `needle` matched literally
    pub fn contains(&self, needle: &str) -> Predicate {
        Predicate::Like {
            expr: self.expr(),
            pattern: format!("%{}%", escape_like(needle)),
        }
    }

    /// `LIKE 'prefix%'` with `%`, `_` and `\` in `prefix` matched literally
    pub fn starts_with(&self, prefix: &str) -> Predicate {
        Predicate::Like {
            expr: self.expr(),
            pattern: format!("{}%", escape_like(prefix)),
        }
    }
}

impl<T> From<Column<T>> for Projection {
    fn from(column: Column<T>) -> Self {
        Projection::new(column.expr())
    }
}

impl<T> From<&Column<T>> for Projection {
    fn from(column: &Column<T>) -> Self {
        Projection::new(column.expr())
    }
}

pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
