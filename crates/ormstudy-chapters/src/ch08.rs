//! Chapter 8: proxies, eager and lazy loading, cascade
//!
//! - eager: a member is read together with its team in one join
//! - lazy: `EntityRef` holds only the id until it is first dereferenced
//! - cascade persist: saving a member saves its pending orders
//! - cascade remove: removing an order removes the member it points to

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::SqlValue;
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch08_001_member_team_orders",
    sql: include_str!("../schema/ch08.sql"),
}];

pub(crate) const TABLES: &[&str] = &["CH08_ORDERS", "CH08_MEMBER", "CH08_TEAM"];

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
    const TABLE: &'static str = "CH08_TEAM";
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub username: String,
    pub team_id: Option<i64>,
    /// Orders saved along with the member by `persist_cascade`
    pub orders: Vec<Order>,
}

impl Member {
    pub fn new(username: &str) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            team_id: None,
            orders: Vec::new(),
        }
    }
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH08_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "TEAM_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.username.as_str().into(), self.team_id.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            username: row.get("NAME")?,
            team_id: row.get("TEAM_ID")?,
            orders: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub member_id: Option<i64>,
    pub order_amount: i64,
}

impl Order {
    pub fn new(order_amount: i64) -> Self {
        Self {
            id: None,
            member_id: None,
            order_amount,
        }
    }
}

impl Entity for Order {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Order";
    const TABLE: &'static str = "CH08_ORDERS";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["MEMBER_ID", "ORDER_AMOUNT"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.member_id.into(), self.order_amount.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            member_id: row.get("MEMBER_ID")?,
            order_amount: row.get("ORDER_AMOUNT")?,
        })
    }
}

/// Persist the member, then every order it holds
pub fn persist_cascade(tx: &SessionTx<'_>, member: &mut Member) -> Result<()> {
    tx.persist(member)?;
    let member_id = member.id;
    for order in &mut member.orders {
        order.member_id = member_id;
        tx.persist(order)?;
    }
    Ok(())
}

/// Remove the order, then the member it points to
pub fn remove_cascade(tx: &SessionTx<'_>, order: &Order) -> Result<()> {
    tx.remove(order)?;
    if let Some(member_id) = order.member_id {
        if let Some(member) = tx.find::<Member>(member_id)? {
            tx.remove(&member)?;
        }
    }
    Ok(())
}

pub fn save_data(tx: &SessionTx<'_>) -> Result<()> {
    let mut member = Member::new("회원1");
    member.orders.push(Order::new(1000));
    persist_cascade(tx, &mut member)?;
    persist_cascade(tx, &mut Member::new("회원2"))?;

    let mut team = Team::new("팀1");
    tx.persist(&mut team)?;
    member.team_id = team.id;
    tx.merge(&member)?;

    tx.persist(&mut Team::new("팀2"))?;
    tx.flush();
    Ok(())
}

/// Member and team in one statement
pub fn find_with_team(tx: &SessionTx<'_>, member_id: i64) -> Result<Option<(Member, Option<Team>)>> {
    let mut rows = tx.query_map(
        "SELECT m.ID, m.NAME, m.TEAM_ID, t.NAME AS TEAM_NAME \
         FROM CH08_MEMBER m LEFT JOIN CH08_TEAM t ON t.ID = m.TEAM_ID \
         WHERE m.ID = ?",
        sql_params![member_id],
        |row| {
            let member = Member::from_row(row)?;
            let team = match (member.team_id, row.get::<_, Option<String>>("TEAM_NAME")?) {
                (Some(id), Some(name)) => Some(Team { id: Some(id), name }),
                _ => None,
            };
            Ok((member, team))
        },
    )?;
    Ok(rows.pop())
}

pub fn orders_of(tx: &SessionTx<'_>, member_id: i64) -> Result<Vec<Order>> {
    tx.query_entities(
        "SELECT * FROM CH08_ORDERS WHERE MEMBER_ID = ? ORDER BY ID",
        sql_params![member_id],
    )
}

/// Wire a member to a team using references only; the team row is never read
pub fn reference_member(
    tx: &SessionTx<'_>,
    member_id: i64,
    team_id: i64,
    report: &mut ChapterReport,
) -> Result<bool> {
    let member = tx.get_reference::<Member>(member_id);
    let team = tx.get_reference::<Team>(team_id);
    report.log(format!("isLoaded = {}", team.is_loaded()));
    report.log(format!("association to team {}", team.id()));

    let mut member = member.into_entity()?;
    member.team_id = Some(*team.id());
    tx.merge(&member)?;
    report.log("association done");
    Ok(team.is_loaded())
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch08);

    save_data(tx)?;

    let member = tx.get::<Member>(1)?;
    report.log(format!("username: {}", member.username));

    if let Some((member, team)) = find_with_team(tx, 1)? {
        report.log(format!("username: {}", member.username));
        report.log(format!(
            "team name: {}",
            team.map(|t| t.name).unwrap_or_default()
        ));
    }

    reference_member(tx, 2, 2, &mut report)?;

    let orders = orders_of(tx, 1)?;
    report.log(format!("orders = {}", orders.len()));

    let order = tx.get_reference::<Order>(1).into_entity()?;
    remove_cascade(tx, &order)?;
    let members: i64 = tx.query_scalar("SELECT COUNT(*) FROM CH08_MEMBER", ())?;
    report.log(format!("members after cascade remove = {}", members));
    Ok(report)
}
