//! Expressions, predicates, projections and ordering

use super::statement::Select;
use super::SqlWriter;
use crate::value::SqlValue;

/// A value-producing SQL expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column { table_alias: String, name: String },
    Value(SqlValue),
    Aggregate { function: &'static str, arg: Box<Expr> },
    Binary { left: Box<Expr>, op: &'static str, right: Box<Expr> },
    Subquery(Box<Select>),
}

impl Expr {
    pub(crate) fn render(&self, w: &mut SqlWriter) {
        match self {
            Expr::Column { table_alias, name } => {
                if w.qualify {
                    w.push(table_alias);
                    w.push(".");
                }
                w.push(name);
            }
            Expr::Value(v) => w.bind(v.clone()),
            Expr::Aggregate { function, arg } => {
                w.push(function);
                w.push("(");
                arg.render(w);
                w.push(")");
            }
            Expr::Binary { left, op, right } => {
                left.render(w);
                w.push(" ");
                w.push(op);
                w.push(" ");
                right.render(w);
            }
            Expr::Subquery(select) => {
                w.push("(");
                select.render_into(w);
                w.push(")");
            }
        }
    }
}

impl From<SqlValue> for Expr {
    fn from(value: SqlValue) -> Self {
        Expr::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// A boolean condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { left: Expr, op: CompareOp, right: Expr },
    Like { expr: Expr, pattern: String },
    IsNull { expr: Expr, negated: bool },
    InSubquery { expr: Expr, subquery: Box<Select> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction; nested conjunctions are flattened
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), right) => {
                left.push(right);
                Predicate::And(left)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    /// Disjunction; nested disjunctions are flattened
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), right) => {
                left.push(right);
                Predicate::Or(left)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    pub(crate) fn render(&self, w: &mut SqlWriter) {
        match self {
            Predicate::Compare { left, op, right } => {
                left.render(w);
                w.push(" ");
                w.push(op.sql());
                w.push(" ");
                right.render(w);
            }
            Predicate::Like { expr, pattern } => {
                expr.render(w);
                w.push(" LIKE ");
                w.bind(SqlValue::Text(pattern.clone()));
                w.push(" ESCAPE '\\'");
            }
            Predicate::IsNull { expr, negated } => {
                expr.render(w);
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::InSubquery { expr, subquery } => {
                expr.render(w);
                w.push(" IN (");
                subquery.render_into(w);
                w.push(")");
            }
            Predicate::And(parts) => render_joined(w, parts, " AND "),
            Predicate::Or(parts) => render_joined(w, parts, " OR "),
            Predicate::Not(inner) => {
                w.push("NOT (");
                inner.render(w);
                w.push(")");
            }
        }
    }
}

fn render_joined(w: &mut SqlWriter, parts: &[Predicate], sep: &str) {
    if parts.len() == 1 {
        parts[0].render(w);
        return;
    }
    w.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            w.push(sep);
        }
        part.render(w);
    }
    w.push(")");
}

/// Accumulates optional conditions into one conjunction
///
/// Starts empty; `build` yields `None` when nothing was added, which a
/// `Select` treats as "no WHERE clause".
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    parts: Vec<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        self.parts.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(&self) -> Option<Predicate> {
        match self.parts.len() {
            0 => None,
            1 => Some(self.parts[0].clone()),
            _ => Some(Predicate::And(self.parts.clone())),
        }
    }
}

/// One entry of a SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    expr: Expr,
    alias: Option<String>,
}

impl Projection {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub(crate) fn render(&self, w: &mut SqlWriter) {
        self.expr.render(w);
        if let Some(alias) = &self.alias {
            w.push(" AS ");
            w.push(alias);
        }
    }
}

impl From<Expr> for Projection {
    fn from(expr: Expr) -> Self {
        Projection::new(expr)
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    expr: Expr,
    descending: bool,
}

impl OrderSpec {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }

    pub(crate) fn render(&self, w: &mut SqlWriter) {
        self.expr.render(w);
        w.push(if self.descending { " DESC" } else { " ASC" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Table;

    fn render(p: &Predicate) -> SqlWriter {
        let mut w = SqlWriter::qualified();
        p.render(&mut w);
        w
    }

    #[test]
    fn test_and_flattens() {
        let t = Table::new("ITEM", "i");
        let p = t
            .col::<i64>("A")
            .eq(1)
            .and(t.col::<i64>("B").eq(2))
            .and(t.col::<i64>("C").eq(3));
        match &p {
            Predicate::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
        assert_eq!(render(&p).sql, "(i.A = ? AND i.B = ? AND i.C = ?)");
    }

    #[test]
    fn test_or_and_not_render() {
        let t = Table::new("ITEM", "i");
        let p = t.col::<i64>("A").lt(1).or(t.col::<i64>("A").ge(9)).not();
        let w = render(&p);
        assert_eq!(w.sql, "NOT ((i.A < ? OR i.A >= ?))");
        assert_eq!(w.params, vec![SqlValue::Integer(1), SqlValue::Integer(9)]);
    }

    #[test]
    fn test_like_binds_pattern_with_escape_clause() {
        let t = Table::new("ITEM", "i");
        let w = render(&t.col::<String>("NAME").contains("10%"));
        assert_eq!(w.sql, "i.NAME LIKE ? ESCAPE '\\'");
        assert_eq!(w.params, vec![SqlValue::Text("%10\\%%".to_string())]);
    }

    #[test]
    fn test_predicate_builder() {
        let t = Table::new("ITEM", "i");
        let mut builder = PredicateBuilder::new();
        assert!(builder.build().is_none());

        builder.and(t.col::<String>("NAME").starts_with("Hello"));
        assert!(matches!(builder.build(), Some(Predicate::Like { .. })));

        builder.and(t.col::<i64>("PRICE").gt(100));
        assert!(matches!(builder.build(), Some(Predicate::And(ref v)) if v.len() == 2));
    }
}
