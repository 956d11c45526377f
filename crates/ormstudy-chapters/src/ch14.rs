//! Chapter 14: collections, converters, listeners and entity graphs

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::mapping::{
    AttributeConverter, BooleanToYnConverter, EntityGraph, EntityListener, LoggingListener,
};
use ormstudy_core::SqlValue;
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionFactoryBuilder, SessionTx};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch14_001_advanced",
    sql: include_str!("../schema/ch14.sql"),
}];

pub(crate) const TABLES: &[&str] = &[
    "CH14_ORDER_ITEM",
    "CH14_ORDERS",
    "CH14_ITEM",
    "CH14_COMMENT",
    "CH14_BOARD",
    "CH14_MEMBER",
    "CH14_TEAM",
];

pub const ORDER_WITH_ALL: &str = "Order.withAll";

/// Association paths of `Order` a graph may name
pub const ORDER_PATHS: &[&str] = &["member", "orderItems", "orderItems.item"];

pub fn order_with_all() -> EntityGraph {
    let mut graph = EntityGraph::new(ORDER_WITH_ALL, Order::ENTITY_NAME);
    graph.add_attribute_nodes(&["member"]);
    graph.add_subgraph("orderItems").add_attribute_nodes(&["item"]);
    graph
}

pub(crate) fn mappings(builder: SessionFactoryBuilder) -> SessionFactoryBuilder {
    builder.entity_graph(order_with_all())
}

// ===== Collection wrapper =====

/// A one-to-many collection, replaced by a managed one once its owner is saved
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    Transient(Vec<T>),
    Persistent { owner: i64, items: Vec<T> },
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Transient(Vec::new())
    }
}

impl<T> Collection<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            Collection::Transient(_) => "Vec",
            Collection::Persistent { .. } => "PersistentBag",
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Collection::Transient(items) => items,
            Collection::Persistent { items, .. } => items,
        }
    }

    pub fn push(&mut self, item: T) {
        match self {
            Collection::Transient(items) => items.push(item),
            Collection::Persistent { items, .. } => items.push(item),
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn into_items(self) -> Vec<T> {
        match self {
            Collection::Transient(items) => items,
            Collection::Persistent { items, .. } => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<i64>,
    pub members: Collection<Member>,
}

impl Entity for Team {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Team";
    const TABLE: &'static str = "CH14_TEAM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: i64 = row.get("ID")?;
        Ok(Self {
            id: Some(id),
            members: Collection::Persistent {
                owner: id,
                items: Vec::new(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    /// Stored as `Y`/`N` through `BooleanToYnConverter`
    pub vip: bool,
    pub team_id: Option<i64>,
}

impl Member {
    pub fn new(vip: bool) -> Self {
        Self {
            id: None,
            vip,
            team_id: None,
        }
    }
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH14_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["VIP", "TEAM_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            BooleanToYnConverter
                .to_database_column(Some(&self.vip))
                .into(),
            self.team_id.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let vip: Option<String> = row.get("VIP")?;
        Ok(Self {
            id: row.get("ID")?,
            vip: BooleanToYnConverter.to_entity_attribute(vip.as_ref()),
            team_id: row.get("TEAM_ID")?,
        })
    }

    fn listeners() -> Vec<Box<dyn EntityListener<Self>>> {
        vec![Box::new(LoggingListener)]
    }
}

/// Save the team, then its members with the team's key filled in
pub fn persist_team(tx: &SessionTx<'_>, team: &mut Team) -> Result<()> {
    tx.persist(team)?;
    let owner = team.id.unwrap_or_default();
    let mut saved = Vec::with_capacity(team.members.len());
    for mut member in std::mem::take(&mut team.members).into_items() {
        member.team_id = Some(owner);
        tx.persist(&mut member)?;
        saved.push(member);
    }
    team.members = Collection::Persistent {
        owner,
        items: saved,
    };
    Ok(())
}

pub fn load_team(tx: &SessionTx<'_>, id: i64) -> Result<Option<Team>> {
    let Some(mut team) = tx.find::<Team>(id)? else {
        return Ok(None);
    };
    let members: Vec<Member> = tx.query_entities(
        "SELECT * FROM CH14_MEMBER WHERE TEAM_ID = ? ORDER BY ID",
        sql_params![id],
    )?;
    for member in members {
        team.members.push(member);
    }
    Ok(Some(team))
}

// ===== Ordered list =====

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    /// Kept in `POSITION` order
    pub comments: Vec<Comment>,
}

impl Board {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            content: content.to_string(),
            comments: Vec::new(),
        }
    }
}

impl Entity for Board {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Board";
    const TABLE: &'static str = "CH14_BOARD";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["TITLE", "CONTENT"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.title.as_str().into(), self.content.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            title: row.get("TITLE")?,
            content: row.get("CONTENT")?,
            comments: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: Option<i64>,
    pub comment: String,
    pub board_id: Option<i64>,
    pub position: Option<i64>,
}

impl Entity for Comment {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Comment";
    const TABLE: &'static str = "CH14_COMMENT";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["COMMENT", "BOARD_ID", "POSITION"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.comment.as_str().into(),
            self.board_id.into(),
            self.position.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            comment: row.get("COMMENT")?,
            board_id: row.get("BOARD_ID")?,
            position: row.get("POSITION")?,
        })
    }
}

/// Append a comment; its position is its index in the board's list
pub fn add_comment(tx: &SessionTx<'_>, board: &mut Board, message: &str) -> Result<()> {
    let mut comment = Comment {
        id: None,
        comment: message.to_string(),
        board_id: board.id,
        position: Some(board.comments.len() as i64),
    };
    tx.persist(&mut comment)?;
    board.comments.push(comment);
    Ok(())
}

pub fn load_board(tx: &SessionTx<'_>, id: i64) -> Result<Option<Board>> {
    let Some(mut board) = tx.find::<Board>(id)? else {
        return Ok(None);
    };
    board.comments = tx.query_entities(
        "SELECT * FROM CH14_COMMENT WHERE BOARD_ID = ? ORDER BY POSITION",
        sql_params![id],
    )?;
    Ok(Some(board))
}

// ===== Entity graph =====

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: Option<i64>,
}

impl Entity for Item {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Item";
    const TABLE: &'static str = "CH14_ITEM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { id: row.get("ID")? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub member_id: i64,
}

impl Entity for Order {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Order";
    const TABLE: &'static str = "CH14_ORDERS";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["MEMBER_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.member_id.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            member_id: row.get("MEMBER_ID")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Option<i64>,
    pub order_id: i64,
    pub item_id: Option<i64>,
}

impl Entity for OrderItem {
    type Id = i64;
    const ENTITY_NAME: &'static str = "OrderItem";
    const TABLE: &'static str = "CH14_ORDER_ITEM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["ORDER_ID", "ITEM_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.order_id.into(), self.item_id.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            order_id: row.get("ORDER_ID")?,
            item_id: row.get("ITEM_ID")?,
        })
    }
}

/// An order line with its item, when the graph asked for it
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_item: OrderItem,
    pub item: Option<Item>,
}

/// An order and whichever associations the fetch graph named
///
/// `None` means not fetched, as opposed to fetched and empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedOrder {
    pub order: Order,
    pub member: Option<Member>,
    pub order_items: Option<Vec<OrderLine>>,
}

/// Find an order, loading the associations named by `graph`
pub fn find_order(
    tx: &SessionTx<'_>,
    id: i64,
    graph: Option<&EntityGraph>,
) -> Result<Option<FetchedOrder>> {
    if let Some(graph) = graph {
        graph.validate(ORDER_PATHS)?;
    }
    let Some(order) = tx.find::<Order>(id)? else {
        return Ok(None);
    };
    let fetch = |path: &str| graph.map_or(false, |g| g.contains(path));

    let member = if fetch("member") {
        tx.find::<Member>(order.member_id)?
    } else {
        None
    };

    let order_items = if fetch("orderItems") {
        let rows: Vec<OrderItem> = tx.query_entities(
            "SELECT * FROM CH14_ORDER_ITEM WHERE ORDER_ID = ? ORDER BY ID",
            sql_params![id],
        )?;
        let mut lines = Vec::with_capacity(rows.len());
        for order_item in rows {
            let item = match (fetch("orderItems.item"), order_item.item_id) {
                (true, Some(item_id)) => tx.find::<Item>(item_id)?,
                _ => None,
            };
            lines.push(OrderLine { order_item, item });
        }
        Some(lines)
    } else {
        None
    };

    Ok(Some(FetchedOrder {
        order,
        member,
        order_items,
    }))
}

/// Returns the order id
pub fn save_order(tx: &SessionTx<'_>) -> Result<i64> {
    let mut member = Member::new(true);
    tx.persist(&mut member)?;
    let mut order = Order {
        id: None,
        member_id: member.id.unwrap_or_default(),
    };
    tx.persist(&mut order)?;
    let order_id = order.id.unwrap_or_default();
    for _ in 0..2 {
        let mut item = Item::default();
        tx.persist(&mut item)?;
        tx.persist(&mut OrderItem {
            id: None,
            order_id,
            item_id: item.id,
        })?;
    }
    Ok(order_id)
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch14);

    // collection wrapper
    let mut team = Team {
        id: None,
        members: Collection::default(),
    };
    team.members.push(Member::new(true));
    team.members.push(Member::new(false));
    report.log(format!("members: {}", team.members.kind()));
    persist_team(tx, &mut team)?;
    report.log(format!("members: {}", team.members.kind()));

    let vip: String = tx.query_scalar(
        "SELECT VIP FROM CH14_MEMBER WHERE TEAM_ID = ? ORDER BY ID LIMIT 1",
        sql_params![team.id],
    )?;
    report.log(format!("VIP column = {}", vip));

    // order column
    let mut board = Board::new("제목1", "내용");
    tx.persist(&mut board)?;
    for message in ["댓글1", "댓글2", "댓글3", "댓글4"] {
        add_comment(tx, &mut board, message)?;
    }
    if let Some(board) = load_board(tx, board.id.unwrap_or_default())? {
        for comment in &board.comments {
            report.log(format!(
                "{}: {}",
                comment.position.unwrap_or_default(),
                comment.comment
            ));
        }
    }

    // entity graph
    let order_id = save_order(tx)?;
    let graph = tx.entity_graph(ORDER_WITH_ALL)?;
    if let Some(fetched) = find_order(tx, order_id, Some(graph))? {
        let lines = fetched.order_items.unwrap_or_default();
        report.log(format!("member loaded = {}", fetched.member.is_some()));
        report.log(format!("orderItems = {}", lines.len()));
        report.log(format!(
            "items loaded = {}",
            lines.iter().filter(|l| l.item.is_some()).count()
        ));
    }
    if let Some(plain) = find_order(tx, order_id, None)? {
        report.log(format!("without graph member loaded = {}", plain.member.is_some()));
    }

    let mut adhoc = EntityGraph::new("adhoc", Order::ENTITY_NAME);
    adhoc.add_attribute_nodes(&["member"]);
    adhoc.add_subgraph("orderItems").add_attribute_nodes(&["items"]);
    if let Err(err) = find_order(tx, order_id, Some(&adhoc)) {
        report.log(format!("adhoc graph rejected: {}", err.message()));
    }
    Ok(report)
}
