//! Session factory
//!
//! A factory is built once per persistence unit. It applies the schema,
//! holds the mapping registries, and hands out sessions. Dropping the
//! factory (or calling `close`) releases the database: for a memory unit the
//! keeper connection is the last handle, so the data goes with it.

#![allow(clippy::result_large_err)]

use crate::config::{DatabaseLocation, PersistenceUnit};
use crate::db;
use crate::errors::Result;
use crate::migrations::{apply_migrations, Migration};
use crate::procedure::Procedure;
use crate::session::Session;
use ormstudy_core::core_types::schema::EVENT_FACTORY_CLOSE;
use ormstudy_core::core_types::{FactoryId, SessionId};
use ormstudy_core::log_lifecycle;
use ormstudy_core::mapping::{EntityGraph, EntityGraphs, NamedQueries, NamedQuery, ResultSetMapping};
use rusqlite::Connection;
use std::sync::Arc;

/// Registries shared by every session of one factory
#[derive(Debug, Default)]
pub(crate) struct Mappings {
    pub(crate) queries: NamedQueries,
    pub(crate) graphs: EntityGraphs,
    pub(crate) procedures: Vec<Procedure>,
}

/// Collects schema and mapping declarations before the factory exists
#[derive(Debug)]
pub struct SessionFactoryBuilder {
    unit: PersistenceUnit,
    schema: Vec<Migration>,
    queries: Vec<NamedQuery>,
    mappings: Vec<ResultSetMapping>,
    graphs: Vec<EntityGraph>,
    procedures: Vec<Procedure>,
}

impl SessionFactoryBuilder {
    /// Append migrations; they run in the order given
    pub fn schema(mut self, migrations: &[Migration]) -> Self {
        self.schema.extend_from_slice(migrations);
        self
    }

    pub fn named_query(mut self, query: NamedQuery) -> Self {
        self.queries.push(query);
        self
    }

    pub fn result_set_mapping(mut self, mapping: ResultSetMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn entity_graph(mut self, graph: EntityGraph) -> Self {
        self.graphs.push(graph);
        self
    }

    pub fn procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Validate the unit, open the database and apply the schema
    ///
    /// # Errors
    ///
    /// `Configuration` for an invalid unit, `DuplicateMapping` for a named
    /// query registered twice, `Persistence` when the database cannot be
    /// opened or a migration fails.
    pub fn build(self) -> Result<SessionFactory> {
        self.unit.validate()?;

        let mut registry = Mappings::default();
        for query in self.queries {
            registry.queries.register(query)?;
        }
        for mapping in self.mappings {
            registry.queries.register_mapping(mapping);
        }
        for graph in self.graphs {
            registry.graphs.register(graph);
        }
        for procedure in &self.procedures {
            registry
                .queries
                .register_procedure(procedure.declaration().clone());
        }
        registry.procedures = self.procedures;

        let id = FactoryId::new();
        let database = match &self.unit.database {
            DatabaseLocation::Memory => self.unit.memory_uri(&id),
            DatabaseLocation::File { path } => path.display().to_string(),
        };

        let mut conn = open_connection(&self.unit, &database)?;
        apply_migrations(&mut conn, &self.schema)?;

        // A file database survives without a keeper; a memory one does not
        let keeper = if self.unit.is_memory() {
            Some(conn)
        } else {
            None
        };

        tracing::debug!(
            factory_id = %id,
            unit = %self.unit.name,
            database = %database,
            migrations = self.schema.len(),
            "session factory built"
        );

        Ok(SessionFactory {
            id,
            unit: self.unit,
            database,
            keeper,
            mappings: Arc::new(registry),
            last_session: None,
            sessions_opened: 0,
        })
    }
}

/// Manufactures sessions against one database
///
/// Not a process-wide singleton: construct one, pass it by value to
/// `run_in_transaction`, and it is closed when that call returns.
#[derive(Debug)]
pub struct SessionFactory {
    id: FactoryId,
    unit: PersistenceUnit,
    database: String,
    keeper: Option<Connection>,
    mappings: Arc<Mappings>,
    last_session: Option<SessionId>,
    sessions_opened: u32,
}

impl SessionFactory {
    pub fn builder(unit: PersistenceUnit) -> SessionFactoryBuilder {
        SessionFactoryBuilder {
            unit,
            schema: Vec::new(),
            queries: Vec::new(),
            mappings: Vec::new(),
            graphs: Vec::new(),
            procedures: Vec::new(),
        }
    }

    pub fn id(&self) -> &FactoryId {
        &self.id
    }

    pub fn unit(&self) -> &PersistenceUnit {
        &self.unit
    }

    /// Shared-cache URI of a memory unit, or the file path of a file unit
    pub fn database_uri(&self) -> &str {
        &self.database
    }

    pub fn sessions_opened(&self) -> u32 {
        self.sessions_opened
    }

    /// Open a new session with its own connection
    ///
    /// # Errors
    ///
    /// `Persistence` when the connection cannot be opened or configured.
    pub fn open_session(&mut self) -> Result<Session> {
        let conn = open_connection(&self.unit, &self.database)?;
        for procedure in &self.mappings.procedures {
            procedure.register(&conn)?;
        }

        let id = SessionId::new();
        self.last_session = Some(id.clone());
        self.sessions_opened += 1;

        tracing::debug!(factory_id = %self.id, session_id = %id, "session opened");
        Ok(Session::new(
            id,
            conn,
            Arc::clone(&self.mappings),
            self.unit.show_sql,
        ))
    }

    /// Close the factory and release its database
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for SessionFactory {
    fn drop(&mut self) {
        let session_id = self
            .last_session
            .as_ref()
            .map(SessionId::as_str)
            .unwrap_or_default();
        log_lifecycle!(
            EVENT_FACTORY_CLOSE,
            factory_id = %self.id,
            session_id = session_id,
            sessions_opened = self.sessions_opened,
        );
        // Dropping the keeper releases a memory database
        self.keeper.take();
    }
}

fn open_connection(unit: &PersistenceUnit, database: &str) -> Result<Connection> {
    let conn = match &unit.database {
        DatabaseLocation::Memory => db::open_shared_memory(database)?,
        DatabaseLocation::File { path } => db::open(path)?,
    };
    db::configure(&conn, unit)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormstudy_core::ExErrorKind;

    const SCHEMA: &[Migration] = &[Migration {
        id: "001_counter",
        sql: "CREATE TABLE COUNTER (ID INTEGER PRIMARY KEY, N INTEGER NOT NULL);",
    }];

    #[test]
    fn test_sessions_share_the_memory_database() {
        let mut factory = SessionFactory::builder(PersistenceUnit::in_memory("f"))
            .schema(SCHEMA)
            .build()
            .unwrap();

        let a = factory.open_session().unwrap();
        a.connection()
            .execute("INSERT INTO COUNTER (N) VALUES (1)", [])
            .unwrap();
        let b = factory.open_session().unwrap();
        let n: i64 = b
            .connection()
            .query_row("SELECT COUNT(*) FROM COUNTER", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(factory.sessions_opened(), 2);
    }

    #[test]
    fn test_factories_do_not_share_memory_databases() {
        let unit = PersistenceUnit::in_memory("same-name");
        let a = SessionFactory::builder(unit.clone()).schema(SCHEMA).build().unwrap();
        let b = SessionFactory::builder(unit).schema(SCHEMA).build().unwrap();
        assert_ne!(a.database_uri(), b.database_uri());
    }

    #[test]
    fn test_duplicate_named_query_fails_build() {
        let err = SessionFactory::builder(PersistenceUnit::in_memory("f"))
            .named_query(NamedQuery::new("q", "SELECT 1"))
            .named_query(NamedQuery::new("q", "SELECT 2"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DuplicateMapping);
    }

    #[test]
    fn test_invalid_unit_fails_build() {
        let err = SessionFactory::builder(PersistenceUnit::in_memory(" "))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }
}
