//! Chapter 6: association kinds
//!
//! - one-to-one: `Member.locker_id`, unique per locker
//! - unidirectional one-to-many: the team side writes `MEMBER.TEAM_ID`
//! - many-to-one pair through an order table: `Order -> Member, Product`

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::SqlValue;
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch06_001_associations",
    sql: include_str!("../schema/ch06.sql"),
}];

pub(crate) const TABLES: &[&str] = &[
    "CH06_PRODUCT_ORDER",
    "CH06_PRODUCT",
    "CH06_MEMBER",
    "CH06_TEAM",
    "CH06_LOCKER",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Locker {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Locker {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Locker";
    const TABLE: &'static str = "CH06_LOCKER";
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

/// `TEAM_ID` is not mapped here: the member does not own that column
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub username: String,
    pub locker_id: Option<i64>,
}

impl Member {
    pub fn new(username: &str) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            locker_id: None,
        }
    }
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH06_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "LOCKER_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.username.as_str().into(), self.locker_id.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            username: row.get("NAME")?,
            locker_id: row.get("LOCKER_ID")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    /// Ids of the members this team owns; written to `MEMBER.TEAM_ID`
    pub members: Vec<i64>,
}

impl Entity for Team {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Team";
    const TABLE: &'static str = "CH06_TEAM";
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
            members: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
}

impl Entity for Product {
    type Id = String;
    const ENTITY_NAME: &'static str = "Product";
    const TABLE: &'static str = "CH06_PRODUCT";
    const ID_COLUMN: &'static str = "PRODUCT_ID";
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
            id: row.get("PRODUCT_ID")?,
            name: row.get("NAME")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub member_id: i64,
    pub product_id: String,
    pub order_amount: i64,
}

impl Entity for Order {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Order";
    const TABLE: &'static str = "CH06_PRODUCT_ORDER";
    const ID_COLUMN: &'static str = "ORDER_ID";
    const COLUMNS: &'static [&'static str] = &["MEMBER_ID", "PRODUCT_ID", "ORDER_AMOUNT"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.member_id.into(),
            self.product_id.as_str().into(),
            self.order_amount.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ORDER_ID")?,
            member_id: row.get("MEMBER_ID")?,
            product_id: row.get("PRODUCT_ID")?,
            order_amount: row.get("ORDER_AMOUNT")?,
        })
    }
}

/// An order with both of its many-to-one targets resolved
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub member: Member,
    pub product: Product,
}

/// Persist the team, then write the foreign key of every member it owns
///
/// The extra UPDATE per member is the cost of a one-to-many owned by the
/// side that does not hold the column.
pub fn persist_team(tx: &SessionTx<'_>, team: &mut Team) -> Result<()> {
    tx.persist(team)?;
    let team_id = team.id;
    for member_id in &team.members {
        tx.execute(
            "UPDATE CH06_MEMBER SET TEAM_ID = ? WHERE ID = ?",
            sql_params![team_id, *member_id],
        )?;
    }
    Ok(())
}

pub fn team_members(tx: &SessionTx<'_>, team_id: i64) -> Result<Vec<Member>> {
    tx.query_entities(
        "SELECT * FROM CH06_MEMBER WHERE TEAM_ID = ? ORDER BY ID",
        sql_params![team_id],
    )
}

/// Returns the team id
pub fn test_save(tx: &SessionTx<'_>) -> Result<i64> {
    let mut locker = Locker {
        id: None,
        name: "locker1".to_string(),
    };
    tx.persist(&mut locker)?;

    let mut member1 = Member::new("member1");
    member1.locker_id = locker.id;
    tx.persist(&mut member1)?;
    let mut member2 = Member::new("member2");
    tx.persist(&mut member2)?;

    let mut team = Team {
        id: None,
        name: "team1".to_string(),
        members: member1.id.into_iter().chain(member2.id).collect(),
    };
    persist_team(tx, &mut team)?;
    Ok(team.id.unwrap_or_default())
}

/// Returns the order id
pub fn test_save_order(tx: &SessionTx<'_>) -> Result<i64> {
    let mut product = Product {
        id: "productB".to_string(),
        name: "상품B".to_string(),
    };
    tx.persist(&mut product)?;

    let mut member = Member::new("회원2");
    tx.persist(&mut member)?;

    let mut order = Order {
        id: None,
        member_id: member.id.unwrap_or_default(),
        product_id: product.id.clone(),
        order_amount: 2,
    };
    tx.persist(&mut order)?;
    Ok(order.id.unwrap_or_default())
}

pub fn test_find_order(tx: &SessionTx<'_>, order_id: i64) -> Result<OrderView> {
    let order = tx.get::<Order>(order_id)?;
    let member = tx.get::<Member>(order.member_id)?;
    let product = tx.get::<Product>(order.product_id.clone())?;
    Ok(OrderView {
        order,
        member,
        product,
    })
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch06);

    let team_id = test_save(tx)?;
    let team = tx.get::<Team>(team_id)?;
    for member in team_members(tx, team_id)? {
        report.log(format!(
            "{} member = {}, locker = {:?}",
            team.name, member.username, member.locker_id
        ));
    }

    let order_id = test_save_order(tx)?;
    let view = test_find_order(tx, order_id)?;
    report.log(format!("order id = {}", order_id));
    report.log(format!("member = {}", view.member.username));
    report.log(format!("product = {}", view.product.name));
    report.log(format!("orderAmount = {}", view.order.order_amount));
    Ok(report)
}
