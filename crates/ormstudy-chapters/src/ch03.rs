//! Chapter 3: persistence context operations
//!
//! Lookup by key, queries with named parameters, merge of detached and new
//! entities, and removal.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::SqlValue;
use ormstudy_store::{Entity, Migration, Params, Result, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch03_001_member",
    sql: include_str!("../schema/ch03.sql"),
}];

pub(crate) const TABLES: &[&str] = &["CH03_MEMBER"];

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
    const TABLE: &'static str = "CH03_MEMBER";
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

/// Two lookups of the same key yield equal values
pub fn logic1(tx: &SessionTx<'_>) -> Result<bool> {
    let mut member = Member::new("id1", "TEST", 10);
    tx.persist(&mut member)?;

    let a = tx.get::<Member>("id1")?;
    let b = tx.get::<Member>("id1")?;
    Ok(a == b)
}

pub fn find_by_id(tx: &SessionTx<'_>, id: &str) -> Result<Vec<Member>> {
    tx.query_entities(
        "SELECT * FROM CH03_MEMBER WHERE ID = :id",
        Params::named().set("id", id),
    )
}

/// Merge one existing and one new member
pub fn logic_merge(tx: &SessionTx<'_>) -> Result<()> {
    tx.merge(&Member::new("id1", "TEST1", 11))?;
    tx.merge(&Member::new("id2", "TEST2", 12))?;
    tx.flush();
    Ok(())
}

pub fn logic_delete(tx: &SessionTx<'_>) -> Result<Option<Member>> {
    let member = tx.get::<Member>("id1")?;
    tx.remove(&member)?;
    tx.flush();
    tx.find::<Member>("id1")
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch03);

    report.log(format!("a == b : {}", logic1(tx)?));

    for member in find_by_id(tx, "id1")? {
        report.log(format!("query result: {} {}", member.id, member.username));
    }

    logic_merge(tx)?;
    let count: i64 = tx.query_scalar("SELECT COUNT(*) FROM CH03_MEMBER", ())?;
    report.log(format!("after merge: {} members", count));

    let removed = logic_delete(tx)?;
    report.log(format!("after remove: id1 present = {}", removed.is_some()));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormstudy_core::ExErrorKind;
    use ormstudy_store::{run_in_transaction, PersistenceUnit};

    fn in_tx<T>(work: impl FnOnce(&SessionTx<'_>) -> Result<T>) -> Result<T> {
        let factory = Chapter::Ch03
            .factory(PersistenceUnit::in_memory("ch03-test"))
            .unwrap();
        run_in_transaction(factory, work).into_result()
    }

    #[test]
    fn test_repeated_find_is_equal() {
        assert!(in_tx(logic1).unwrap());
    }

    #[test]
    fn test_named_parameter_query() {
        let found = in_tx(|tx| {
            logic1(tx)?;
            find_by_id(tx, "id1")
        })
        .unwrap();
        assert_eq!(found, vec![Member::new("id1", "TEST", 10)]);
    }

    #[test]
    fn test_merge_updates_existing_and_inserts_new() {
        let (id1, id2) = in_tx(|tx| {
            logic1(tx)?;
            logic_merge(tx)?;
            Ok((tx.get::<Member>("id1")?, tx.get::<Member>("id2")?))
        })
        .unwrap();
        assert_eq!(id1, Member::new("id1", "TEST1", 11));
        assert_eq!(id2, Member::new("id2", "TEST2", 12));
    }

    #[test]
    fn test_delete_then_find_is_none() {
        let after = in_tx(|tx| {
            logic1(tx)?;
            logic_delete(tx)
        })
        .unwrap();
        assert!(after.is_none());
    }

    #[test]
    fn test_delete_without_row_is_not_found() {
        let err = in_tx(logic_delete).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_run_report() {
        let report = in_tx(run).unwrap();
        assert_eq!(report.lines[0], "a == b : true");
        assert!(report.contains("after merge: 2 members"));
        assert!(report.contains("id1 present = false"));
    }
}
