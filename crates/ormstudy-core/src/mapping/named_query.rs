//! Named queries, result set mappings and stored procedure declarations
//!
//! These are declared once per persistence unit and looked up by name at
//! execution time.

use crate::errors::{OrmStudyError, Result};
use std::collections::BTreeMap;

/// A native SQL statement registered under a stable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: String,
    pub sql: String,
    /// Entity the rows map to, if the query returns whole entities
    pub result_entity: Option<String>,
}

impl NamedQuery {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            result_entity: None,
        }
    }

    pub fn returning(mut self, entity: impl Into<String>) -> Self {
        self.result_entity = Some(entity.into());
        self
    }
}

/// Describes how a native result row splits into an entity and scalar columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSetMapping {
    pub name: String,
    pub entity: String,
    /// Scalar columns that follow the entity columns, by label
    pub columns: Vec<String>,
}

/// Direction of a stored procedure parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParameter {
    pub name: String,
    pub mode: ParameterMode,
}

/// A stored procedure declared under a name distinct from the procedure name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStoredProcedure {
    pub name: String,
    pub procedure_name: String,
    pub parameters: Vec<ProcedureParameter>,
}

impl NamedStoredProcedure {
    pub fn in_params(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.mode == ParameterMode::In)
            .count()
    }
}

/// Registry of named queries and result set mappings
#[derive(Debug, Clone, Default)]
pub struct NamedQueries {
    queries: BTreeMap<String, NamedQuery>,
    mappings: BTreeMap<String, ResultSetMapping>,
    procedures: BTreeMap<String, NamedStoredProcedure>,
}

impl NamedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named query
    ///
    /// # Errors
    ///
    /// `DuplicateMapping` when the name is already taken.
    pub fn register(&mut self, query: NamedQuery) -> Result<()> {
        if self.queries.contains_key(&query.name) {
            return Err(OrmStudyError::DuplicateNamedQuery { name: query.name }.into());
        }
        self.queries.insert(query.name.clone(), query);
        Ok(())
    }

    /// Look up a named query
    ///
    /// # Errors
    ///
    /// `MissingMapping` when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&NamedQuery> {
        self.queries.get(name).ok_or_else(|| {
            OrmStudyError::NamedQueryNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn register_mapping(&mut self, mapping: ResultSetMapping) {
        self.mappings.insert(mapping.name.clone(), mapping);
    }

    /// Look up a result set mapping
    ///
    /// # Errors
    ///
    /// `MissingMapping` when nothing is registered under `name`.
    pub fn mapping(&self, name: &str) -> Result<&ResultSetMapping> {
        self.mappings.get(name).ok_or_else(|| {
            OrmStudyError::NamedQueryNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn register_procedure(&mut self, procedure: NamedStoredProcedure) {
        self.procedures.insert(procedure.name.clone(), procedure);
    }

    /// Look up a stored procedure declaration
    ///
    /// # Errors
    ///
    /// `MissingMapping` when nothing is registered under `name`.
    pub fn procedure(&self, name: &str) -> Result<&NamedStoredProcedure> {
        self.procedures.get(name).ok_or_else(|| {
            OrmStudyError::ProcedureNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_register_and_get() {
        let mut queries = NamedQueries::new();
        queries
            .register(
                NamedQuery::new("Member.memberSQL", "SELECT * FROM MEMBER WHERE AGE > ?")
                    .returning("Member"),
            )
            .unwrap();

        let q = queries.get("Member.memberSQL").unwrap();
        assert_eq!(q.result_entity.as_deref(), Some("Member"));
        assert_eq!(queries.names().collect::<Vec<_>>(), vec!["Member.memberSQL"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut queries = NamedQueries::new();
        queries.register(NamedQuery::new("q", "SELECT 1")).unwrap();
        let err = queries.register(NamedQuery::new("q", "SELECT 2")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DuplicateMapping);
        assert_eq!(queries.get("q").unwrap().sql, "SELECT 1");
    }

    #[test]
    fn test_unknown_query_is_missing_mapping() {
        let queries = NamedQueries::new();
        let err = queries.get("nope").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingMapping);
        assert!(queries.procedure("multiply").is_err());
        assert!(queries.mapping("memberWithOrderCount").is_err());
    }

    #[test]
    fn test_procedure_in_param_count() {
        let proc = NamedStoredProcedure {
            name: "multiply".into(),
            procedure_name: "proc_multiply".into(),
            parameters: vec![
                ProcedureParameter {
                    name: "inParam".into(),
                    mode: ParameterMode::In,
                },
                ProcedureParameter {
                    name: "outParam".into(),
                    mode: ParameterMode::Out,
                },
            ],
        };
        assert_eq!(proc.in_params(), 1);
    }
}
