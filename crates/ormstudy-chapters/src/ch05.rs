//! Chapter 5: bidirectional many-to-one
//!
//! `Member.team_id` is the owning side. The team's member list is the
//! inverse side and is read through the foreign key, never written.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::query::{Select, Table};
use ormstudy_core::SqlValue;
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch05_001_member_team",
    sql: include_str!("../schema/ch05.sql"),
}];

pub(crate) const TABLES: &[&str] = &["CH05_MEMBER", "CH05_TEAM"];

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
}

impl Team {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

impl Entity for Team {
    type Id = String;
    const ENTITY_NAME: &'static str = "Team";
    const TABLE: &'static str = "CH05_TEAM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME"];

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub username: String,
    pub age: i64,
    pub team_id: Option<String>,
}

impl Member {
    pub fn new(id: &str, username: &str, age: i64, team: &Team) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            age,
            team_id: Some(team.id.clone()),
        }
    }
}

impl Entity for Member {
    type Id = String;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH05_MEMBER";
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
            self.username.as_str().into(),
            self.age.into(),
            self.team_id.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            username: row.get("NAME")?,
            age: row.get("AGE")?,
            team_id: row.get("TEAM_ID")?,
        })
    }
}

pub fn save(tx: &SessionTx<'_>) -> Result<()> {
    let mut team1 = Team::new("team1", "팀1");
    tx.persist(&mut team1)?;
    let mut team2 = Team::new("team2", "팀2");
    tx.persist(&mut team2)?;

    tx.persist(&mut Member::new("member1", "회원1", 11, &team1))?;
    tx.persist(&mut Member::new("member2", "회원2", 12, &team1))?;
    Ok(())
}

/// Inverse side of the association: members whose foreign key names the team
pub fn team_members(tx: &SessionTx<'_>, team_id: &str) -> Result<Vec<Member>> {
    tx.query_entities(
        "SELECT * FROM CH05_MEMBER WHERE TEAM_ID = ? ORDER BY ID",
        sql_params![team_id],
    )
}

/// Navigate from a member to its team
pub fn member_team(tx: &SessionTx<'_>, member_id: &str) -> Result<Option<Team>> {
    let member = tx.get::<Member>(member_id)?;
    match member.team_id {
        Some(team_id) => tx.find::<Team>(team_id),
        None => Ok(None),
    }
}

pub fn members_of_team_named(tx: &SessionTx<'_>, team_name: &str) -> Result<Vec<Member>> {
    let m = Table::new(Member::TABLE, "m");
    let t = Table::new(Team::TABLE, "t");
    let select = Select::from(&m)
        .inner_join(&t, m.col::<String>("TEAM_ID").eq_col(&t.col("ID")))
        .filter(t.col::<String>("NAME").eq(team_name))
        .order_by(m.col::<String>("ID").asc());
    tx.select(&select)
}

pub fn update_relation(tx: &SessionTx<'_>) -> Result<()> {
    let team2 = tx.get::<Team>("team2")?;
    let mut member = tx.get::<Member>("member1")?;
    member.team_id = Some(team2.id);
    tx.merge(&member)
}

/// Detach the remaining member, then remove the team
pub fn delete_relation(tx: &SessionTx<'_>) -> Result<()> {
    let mut member2 = tx.get::<Member>("member2")?;
    member2.team_id = None;
    tx.merge(&member2)?;

    let team1 = tx.get::<Team>("team1")?;
    tx.remove(&team1)
}

fn log_team(tx: &SessionTx<'_>, team_id: &str, report: &mut ChapterReport) -> Result<()> {
    let team = tx.get::<Team>(team_id)?;
    report.log(format!("team: {}", team.name));
    for member in team_members(tx, team_id)? {
        report.log(format!("  member.username = {}", member.username));
    }
    Ok(())
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch05);

    save(tx)?;
    log_team(tx, "team1", &mut report)?;

    if let Some(team) = member_team(tx, "member1")? {
        report.log(format!("member1 team = {}", team.name));
    }
    for member in members_of_team_named(tx, "팀1")? {
        report.log(format!("[query] member.username = {}", member.username));
    }

    update_relation(tx)?;
    log_team(tx, "team2", &mut report)?;

    delete_relation(tx)?;
    let remaining: i64 = tx.query_scalar("SELECT COUNT(*) FROM CH05_TEAM", ())?;
    report.log(format!("teams left = {}", remaining));
    Ok(report)
}
