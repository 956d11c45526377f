//! The transaction handle a unit of work operates on
//!
//! Every statement runs inside the session's single transaction. Entity
//! operations generate plain SQL from the `Entity` declarations and execute
//! it immediately; there is no first-level cache and no deferred flush.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::mapping::{row_values, Entity, EntityId};
use crate::params::Params;
use crate::session::factory::Mappings;
use crate::session::EntityRef;
use ormstudy_core::core_types::schema::{EVENT_TX_COMMIT, EVENT_TX_ROLLBACK};
use ormstudy_core::core_types::SessionId;
use ormstudy_core::mapping::{EntityGraph, ResultSetMapping};
use ormstudy_core::query::{Delete, Select, Statement, Update};
use ormstudy_core::{log_lifecycle, ExError, ExErrorKind, OrmStudyError, SqlValue};
use rusqlite::types::FromSql;
use rusqlite::{Connection, Row, Transaction};
use std::sync::Arc;

/// Logs a rollback if the transaction is dropped unfinished
struct TxGuard {
    session_id: SessionId,
    finished: bool,
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        if !self.finished {
            log_lifecycle!(
                EVENT_TX_ROLLBACK,
                session_id = %self.session_id,
                panicking = std::thread::panicking(),
                "transaction dropped before commit"
            );
        }
    }
}

/// Active transaction of one session
///
/// Dropping it without `commit` rolls back.
pub struct SessionTx<'s> {
    // Declared before the guard so the rollback happens before it is logged
    tx: Transaction<'s>,
    guard: TxGuard,
    mappings: Arc<Mappings>,
    show_sql: bool,
}

impl<'s> SessionTx<'s> {
    pub(crate) fn new(
        tx: Transaction<'s>,
        session_id: SessionId,
        mappings: Arc<Mappings>,
        show_sql: bool,
    ) -> Self {
        Self {
            tx,
            guard: TxGuard {
                session_id,
                finished: false,
            },
            mappings,
            show_sql,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.guard.session_id
    }

    /// The underlying connection, inside this transaction
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    // ===== Entity operations =====

    /// Insert a new entity
    ///
    /// Entities without an id get the generated rowid assigned back.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the id is taken, `InvalidInput` when the entity
    /// has no id and its id type is not generated.
    pub fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let listeners = E::listeners();
        for listener in &listeners {
            listener.pre_persist(entity);
        }

        let mut columns: Vec<&str> = Vec::with_capacity(E::COLUMNS.len() + 1);
        let mut values: Vec<SqlValue> = Vec::with_capacity(E::COLUMNS.len() + 1);
        let assigned = entity.id();
        match &assigned {
            Some(id) => {
                if self.contains::<E>(id)? {
                    return Err(OrmStudyError::EntityAlreadyExists {
                        entity: E::ENTITY_NAME.to_string(),
                        id: id.to_string(),
                    }
                    .into());
                }
                columns.push(E::ID_COLUMN);
                values.push(id.clone().into());
            }
            None => {
                if E::Id::from_generated(0).is_none() {
                    return Err(OrmStudyError::MissingId {
                        entity: E::ENTITY_NAME.to_string(),
                    }
                    .into());
                }
            }
        }
        columns.extend_from_slice(E::COLUMNS);
        values.extend(checked_values(entity)?);

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", E::TABLE)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                E::TABLE,
                columns.join(", "),
                placeholders(columns.len())
            )
        };
        self.run_execute(&sql, &Params::from(values))
            .map_err(|e| e.with_entity(E::ENTITY_NAME))?;

        if assigned.is_none() {
            if let Some(id) = E::Id::from_generated(self.tx.last_insert_rowid()) {
                entity.set_id(id);
            }
        }

        for listener in &listeners {
            listener.post_persist(entity);
        }

        tracing::debug!(
            session_id = %self.session_id(),
            entity = E::ENTITY_NAME,
            entity_id = ?entity.id(),
            "persisted"
        );
        Ok(())
    }

    /// Whether a row with this id exists
    pub fn contains<E: Entity>(&self, id: &E::Id) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?",
            E::TABLE,
            E::ID_COLUMN
        );
        let hits = self.run_query(&sql, &Params::from(vec![id.clone().into()]), |_| Ok(()))?;
        Ok(!hits.is_empty())
    }

    /// Load an entity by id
    pub fn find<E: Entity>(&self, id: impl Into<E::Id>) -> Result<Option<E>> {
        let id: E::Id = id.into();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            E::TABLE,
            E::ID_COLUMN
        );
        let mut rows = self.run_query(&sql, &Params::from(vec![id.into()]), map_entity::<E>)?;
        Ok(rows.pop())
    }

    /// Load an entity that must exist
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has this id.
    pub fn get<E: Entity>(&self, id: impl Into<E::Id>) -> Result<E> {
        let id: E::Id = id.into();
        self.find::<E>(id.clone())?.ok_or_else(|| {
            OrmStudyError::EntityNotFound {
                entity: E::ENTITY_NAME.to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    /// A reference that loads the entity on first access
    pub fn get_reference<E: Entity>(&self, id: impl Into<E::Id>) -> EntityRef<'_, 's, E> {
        EntityRef::new(self, id.into())
    }

    /// Insert or update by id
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the entity has no id.
    pub fn merge<E: Entity>(&self, entity: &E) -> Result<()> {
        let id = entity.id().ok_or_else(|| {
            ExError::from(OrmStudyError::MissingId {
                entity: E::ENTITY_NAME.to_string(),
            })
            .with_op("merge")
        })?;

        let mut columns = vec![E::ID_COLUMN];
        columns.extend_from_slice(E::COLUMNS);
        let mut values: Vec<SqlValue> = vec![id.clone().into()];
        values.extend(checked_values(entity)?);

        let on_conflict = if E::COLUMNS.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments: Vec<String> = E::COLUMNS
                .iter()
                .map(|c| format!("{} = excluded.{}", c, c))
                .collect();
            format!("DO UPDATE SET {}", assignments.join(", "))
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            E::TABLE,
            columns.join(", "),
            placeholders(columns.len()),
            E::ID_COLUMN,
            on_conflict
        );
        self.run_execute(&sql, &Params::from(values))
            .map_err(|e| e.with_entity(E::ENTITY_NAME))?;

        tracing::debug!(
            session_id = %self.session_id(),
            entity = E::ENTITY_NAME,
            entity_id = %id,
            "merged"
        );
        Ok(())
    }

    /// Delete an entity by its id
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the entity has no id, `NotFound` when no row was
    /// deleted.
    pub fn remove<E: Entity>(&self, entity: &E) -> Result<()> {
        let id = entity.id().ok_or_else(|| {
            ExError::from(OrmStudyError::MissingId {
                entity: E::ENTITY_NAME.to_string(),
            })
            .with_op("remove")
        })?;

        for listener in E::listeners() {
            listener.pre_remove(entity);
        }

        let sql = format!("DELETE FROM {} WHERE {} = ?", E::TABLE, E::ID_COLUMN);
        let deleted = self
            .run_execute(&sql, &Params::from(vec![id.clone().into()]))
            .map_err(|e| e.with_entity(E::ENTITY_NAME))?;
        if deleted == 0 {
            return Err(OrmStudyError::EntityNotFound {
                entity: E::ENTITY_NAME.to_string(),
                id: id.to_string(),
            }
            .into());
        }

        tracing::debug!(
            session_id = %self.session_id(),
            entity = E::ENTITY_NAME,
            entity_id = %id,
            "removed"
        );
        Ok(())
    }

    /// Statements run eagerly, so there is never pending work to write
    pub fn flush(&self) {
        tracing::debug!(session_id = %self.session_id(), "flush");
    }

    // ===== Native SQL =====

    /// Run a query whose rows map to whole entities
    pub fn query_entities<E: Entity>(&self, sql: &str, params: impl Into<Params>) -> Result<Vec<E>> {
        self.run_query(sql, &params.into(), map_entity::<E>)
    }

    /// Run a query and map each row with `f`
    pub fn query_map<T, F>(&self, sql: &str, params: impl Into<Params>, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.run_query(sql, &params.into(), |row| f(row).map_err(from_rusqlite))
    }

    /// Run a query and return every row as neutral values
    pub fn query_values(&self, sql: &str, params: impl Into<Params>) -> Result<Vec<Vec<SqlValue>>> {
        self.run_query(sql, &params.into(), |row| row_values(row).map_err(from_rusqlite))
    }

    /// First column of the first row
    ///
    /// # Errors
    ///
    /// `NotFound` when the query returns no rows.
    pub fn query_scalar<T: FromSql>(&self, sql: &str, params: impl Into<Params>) -> Result<T> {
        let mut rows = self.run_query(sql, &params.into(), |row| {
            row.get::<_, T>(0).map_err(from_rusqlite)
        })?;
        if rows.is_empty() {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op("query_scalar")
                .with_message("query returned no rows"));
        }
        Ok(rows.swap_remove(0))
    }

    /// Execute a single data-changing statement; returns the affected rows
    pub fn execute(&self, sql: &str, params: impl Into<Params>) -> Result<usize> {
        self.run_execute(sql, &params.into())
    }

    /// Execute several statements without parameters
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.log_sql(sql);
        self.tx.execute_batch(sql).map_err(from_rusqlite)
    }

    // ===== Query builder =====

    pub fn select<E: Entity>(&self, select: &Select) -> Result<Vec<E>> {
        let Statement { sql, params } = select.build();
        self.run_query(&sql, &Params::from(params), map_entity::<E>)
    }

    pub fn select_map<T, F>(&self, select: &Select, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let Statement { sql, params } = select.build();
        self.query_map(&sql, params, f)
    }

    pub fn select_values(&self, select: &Select) -> Result<Vec<Vec<SqlValue>>> {
        let Statement { sql, params } = select.build();
        self.query_values(&sql, params)
    }

    /// Bulk update; returns the affected rows
    pub fn execute_update(&self, update: &Update) -> Result<usize> {
        let Statement { sql, params } = update.build();
        self.run_execute(&sql, &Params::from(params))
    }

    /// Bulk delete; returns the affected rows
    pub fn execute_delete(&self, delete: &Delete) -> Result<usize> {
        let Statement { sql, params } = delete.build();
        self.run_execute(&sql, &Params::from(params))
    }

    // ===== Named mappings =====

    /// Run a registered named query returning entities
    ///
    /// # Errors
    ///
    /// `MissingMapping` for an unknown name, `InvalidQuery` when the query
    /// is declared to return a different entity.
    pub fn named_query<E: Entity>(&self, name: &str, params: impl Into<Params>) -> Result<Vec<E>> {
        let query = self.mappings.queries.get(name)?;
        if let Some(declared) = &query.result_entity {
            if declared != E::ENTITY_NAME {
                return Err(OrmStudyError::InvalidQuery {
                    reason: format!(
                        "named query {} returns {}, not {}",
                        name,
                        declared,
                        E::ENTITY_NAME
                    ),
                }
                .into());
            }
        }
        self.run_query(&query.sql, &params.into(), map_entity::<E>)
    }

    /// Run a registered named query with a custom row mapper
    pub fn named_query_map<T, F>(&self, name: &str, params: impl Into<Params>, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let query = self.mappings.queries.get(name)?;
        self.query_map(&query.sql, params, f)
    }

    pub fn result_set_mapping(&self, name: &str) -> Result<&ResultSetMapping> {
        self.mappings.queries.mapping(name)
    }

    pub fn entity_graph(&self, name: &str) -> Result<&EntityGraph> {
        self.mappings.graphs.get(name)
    }

    /// Call a declared stored procedure and return its OUT value
    ///
    /// # Errors
    ///
    /// `MissingMapping` for an undeclared procedure, `InvalidInput` when the
    /// number of IN arguments does not match the declaration.
    pub fn call_procedure(&self, name: &str, args: &[SqlValue]) -> Result<SqlValue> {
        let declaration = self.mappings.queries.procedure(name)?;
        if args.len() != declaration.in_params() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("call_procedure")
                .with_message(format!(
                    "{} expects {} IN parameters, got {}",
                    name,
                    declaration.in_params(),
                    args.len()
                )));
        }
        let sql = format!(
            "SELECT {}({})",
            declaration.procedure_name,
            placeholders(args.len())
        );
        let mut rows = self.query_values(&sql, args.to_vec())?;
        Ok(rows
            .pop()
            .and_then(|mut row| row.pop())
            .unwrap_or(SqlValue::Null))
    }

    // ===== Completion =====

    /// Commit and finish the transaction
    ///
    /// # Errors
    ///
    /// `Persistence` when SQLite refuses the commit; the transaction is then
    /// rolled back.
    pub fn commit(self) -> Result<()> {
        let SessionTx { tx, mut guard, .. } = self;
        guard.finished = true;
        match tx.commit() {
            Ok(()) => {
                log_lifecycle!(EVENT_TX_COMMIT, session_id = %guard.session_id);
                Ok(())
            }
            Err(e) => {
                let err = from_rusqlite(e).with_op("commit");
                log_rollback(&guard.session_id, &err);
                Err(err)
            }
        }
    }

    /// Roll back because of `cause`, logging its kind, code and message
    ///
    /// # Errors
    ///
    /// `Persistence` when SQLite refuses the rollback.
    pub fn rollback(self, cause: &ExError) -> Result<()> {
        let SessionTx { tx, mut guard, .. } = self;
        guard.finished = true;
        let result = tx.rollback().map_err(from_rusqlite);
        log_rollback(&guard.session_id, cause);
        result
    }

    // ===== Execution helpers =====

    fn log_sql(&self, sql: &str) {
        if self.show_sql {
            tracing::debug!(session_id = %self.session_id(), sql = sql, "statement");
        }
    }

    fn run_query<T>(
        &self,
        sql: &str,
        params: &Params,
        mut map: impl FnMut(&Row<'_>) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.log_sql(sql);
        let mut stmt = self.tx.prepare_cached(sql).map_err(from_rusqlite)?;
        params.bind_to(&mut stmt)?;
        let mut rows = stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            out.push(map(row)?);
        }
        Ok(out)
    }

    fn run_execute(&self, sql: &str, params: &Params) -> Result<usize> {
        self.log_sql(sql);
        let mut stmt = self.tx.prepare_cached(sql).map_err(from_rusqlite)?;
        params.bind_to(&mut stmt)?;
        stmt.raw_execute().map_err(from_rusqlite)
    }
}

fn log_rollback(session_id: &SessionId, cause: &ExError) {
    log_lifecycle!(
        EVENT_TX_ROLLBACK,
        session_id = %session_id,
        err_kind = ?cause.kind(),
        err_code = cause.code(),
        "{}",
        cause
    );
}

fn map_entity<E: Entity>(row: &Row<'_>) -> Result<E> {
    E::from_row(row).map_err(|e| from_rusqlite(e).with_entity(E::ENTITY_NAME))
}

fn checked_values<E: Entity>(entity: &E) -> Result<Vec<SqlValue>> {
    let values = entity.values();
    if values.len() != E::COLUMNS.len() {
        return Err(ExError::new(ExErrorKind::Internal)
            .with_entity(E::ENTITY_NAME)
            .with_message(format!(
                "{} columns declared, {} values supplied",
                E::COLUMNS.len(),
                values.len()
            )));
    }
    Ok(values)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
