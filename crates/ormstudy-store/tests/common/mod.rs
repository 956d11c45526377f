#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use ormstudy_core::mapping::{EntityListener, LoggingListener};
use ormstudy_core::SqlValue;
use ormstudy_store::{Entity, Migration, PersistenceUnit, SessionFactory};
use rusqlite::Row;
use std::path::Path;

pub const SCHEMA: &[Migration] = &[Migration {
    id: "001_member_team",
    sql: "CREATE TABLE TEAM (ID INTEGER PRIMARY KEY, NAME TEXT NOT NULL);
          CREATE TABLE MEMBER (
              ID TEXT PRIMARY KEY,
              NAME TEXT NOT NULL,
              AGE INTEGER NOT NULL DEFAULT 0,
              TEAM_ID INTEGER REFERENCES TEAM (ID)
          );",
}];

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub team_id: Option<i64>,
}

impl Member {
    pub fn new(id: &str, name: &str, age: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age,
            team_id: None,
        }
    }
}

impl Entity for Member {
    type Id = String;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "AGE", "TEAM_ID"];

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.age.into(),
            self.team_id.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            age: row.get("AGE")?,
            team_id: row.get("TEAM_ID")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

impl Entity for Team {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Team";
    const TABLE: &'static str = "TEAM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
        })
    }

    fn listeners() -> Vec<Box<dyn EntityListener<Self>>> {
        vec![Box::new(LoggingListener)]
    }
}

pub fn memory_factory(name: &str) -> SessionFactory {
    SessionFactory::builder(PersistenceUnit::in_memory(name))
        .schema(SCHEMA)
        .build()
        .unwrap()
}

pub fn file_factory(path: &Path) -> SessionFactory {
    SessionFactory::builder(PersistenceUnit::in_memory("file-test").with_file(path))
        .schema(SCHEMA)
        .build()
        .unwrap()
}
