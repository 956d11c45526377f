//! SELECT, UPDATE and DELETE statements

use super::expr::{Expr, OrderSpec, Predicate, Projection};
use super::table::{Column, Table};
use super::SqlWriter;
use crate::value::SqlValue;

/// Rendered SQL with its positional parameters, in bind order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    kind: JoinKind,
    table: Table,
    on: Predicate,
}

/// A SELECT over one root table
///
/// Without explicit projections the statement selects `<alias>.*` of the
/// root table, which is what entity row mappers expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    from: Table,
    projections: Vec<Projection>,
    distinct: bool,
    joins: Vec<Join>,
    filter: Option<Predicate>,
    order: Vec<OrderSpec>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    pub fn from(table: &Table) -> Self {
        Self {
            from: table.clone(),
            projections: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Replace the SELECT list
    pub fn select<P: Into<Projection>>(mut self, projections: impl IntoIterator<Item = P>) -> Self {
        self.projections = projections.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn inner_join(mut self, table: &Table, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.clone(),
            on,
        });
        self
    }

    pub fn left_join(mut self, table: &Table, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.clone(),
            on,
        });
        self
    }

    /// Add a WHERE condition; repeated calls are AND-ed
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Add a WHERE condition if one is given
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order.push(spec);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Wrap as a scalar subquery expression
    pub fn into_expr(self) -> Expr {
        Expr::Subquery(Box::new(self))
    }

    pub fn build(&self) -> Statement {
        let mut w = SqlWriter::qualified();
        self.render_into(&mut w);
        Statement {
            sql: w.sql,
            params: w.params,
        }
    }

    pub(crate) fn render_into(&self, w: &mut SqlWriter) {
        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        if self.projections.is_empty() {
            w.push(self.from.alias());
            w.push(".*");
        } else {
            for (i, projection) in self.projections.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                projection.render(w);
            }
        }

        w.push(" FROM ");
        render_table(w, &self.from);

        for join in &self.joins {
            w.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            render_table(w, &join.table);
            w.push(" ON ");
            join.on.render(w);
        }

        if let Some(filter) = &self.filter {
            w.push(" WHERE ");
            filter.render(w);
        }

        if !self.order.is_empty() {
            w.push(" ORDER BY ");
            for (i, spec) in self.order.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                spec.render(w);
            }
        }

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                w.push(" LIMIT ");
                w.bind(SqlValue::Integer(clamp(limit)));
                if let Some(offset) = offset {
                    w.push(" OFFSET ");
                    w.bind(SqlValue::Integer(clamp(offset)));
                }
            }
            (None, Some(offset)) => {
                w.push(" LIMIT -1 OFFSET ");
                w.bind(SqlValue::Integer(clamp(offset)));
            }
            (None, None) => {}
        }
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn render_table(w: &mut SqlWriter, table: &Table) {
    w.push(table.name());
    if table.alias() != table.name() {
        w.push(" ");
        w.push(table.alias());
    }
}

/// A bulk UPDATE; columns render unqualified
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: Table,
    assignments: Vec<(String, Expr)>,
    filter: Option<Predicate>,
}

impl Update {
    pub fn table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            assignments: Vec::new(),
            filter: None,
        }
    }

    pub fn set<T>(mut self, column: &Column<T>, value: impl Into<Expr>) -> Self {
        self.assignments
            .push((column.name().to_string(), value.into()));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn build(&self) -> Statement {
        let mut w = SqlWriter::default();
        w.push("UPDATE ");
        w.push(self.table.name());
        w.push(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(column);
            w.push(" = ");
            value.render(&mut w);
        }
        if let Some(filter) = &self.filter {
            w.push(" WHERE ");
            filter.render(&mut w);
        }
        Statement {
            sql: w.sql,
            params: w.params,
        }
    }
}

/// A bulk DELETE; columns render unqualified
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: Table,
    filter: Option<Predicate>,
}

impl Delete {
    pub fn from(table: &Table) -> Self {
        Self {
            table: table.clone(),
            filter: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn build(&self) -> Statement {
        let mut w = SqlWriter::default();
        w.push("DELETE FROM ");
        w.push(self.table.name());
        if let Some(filter) = &self.filter {
            w.push(" WHERE ");
            filter.render(&mut w);
        }
        Statement {
            sql: w.sql,
            params: w.params,
        }
    }
}
