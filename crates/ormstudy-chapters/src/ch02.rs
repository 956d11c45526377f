//! Chapter 2: the first entity
//!
//! A member with an assigned text id. Changes are written back with an
//! explicit `merge`; nothing tracks dirty fields.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::SqlValue;
use ormstudy_store::{Entity, Migration, Result, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch02_001_member",
    sql: include_str!("../schema/ch02.sql"),
}];

pub(crate) const TABLES: &[&str] = &["CH02_MEMBER"];

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub username: String,
    pub age: i64,
}

impl Member {
    pub fn new(id: &str, username: &str, age: i64) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            age,
        }
    }
}

impl Entity for Member {
    type Id = String;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH02_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "AGE"];

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.username.as_str().into(), self.age.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            username: row.get("NAME")?,
            age: row.get("AGE")?,
        })
    }
}

/// Persist `id1`, change its age, read it back
pub fn logic(tx: &SessionTx<'_>) -> Result<Member> {
    let mut member = Member::new("id1", "TEST", 10);
    tx.persist(&mut member)?;

    member.age = 12;
    tx.merge(&member)?;

    tx.get::<Member>("id1")
}

/// Persist `id2`, then update `id1` found by key
pub fn logic2(tx: &SessionTx<'_>) -> Result<Member> {
    let mut member = Member::new("id2", "TEST2", 20);
    tx.persist(&mut member)?;

    let mut found = tx.get::<Member>("id1")?;
    found.age = 11;
    tx.merge(&found)?;

    tx.get::<Member>("id1")
}

pub fn all_members(tx: &SessionTx<'_>) -> Result<Vec<Member>> {
    tx.query_entities("SELECT * FROM CH02_MEMBER ORDER BY ID", ())
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch02);

    let member = logic(tx)?;
    report.log(format!(
        "findMember={}, age={}",
        member.username, member.age
    ));

    let member = logic2(tx)?;
    report.log(format!(
        "findMember={}, age={}",
        member.username, member.age
    ));

    let members = all_members(tx)?;
    report.log(format!("members.size={}", members.len()));
    Ok(report)
}
