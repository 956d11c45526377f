//! Chapter 7: inheritance and advanced mapping
//!
//! Joined inheritance keeps the shared item columns in one table and each
//! subtype's columns in its own table, linked by the item id and told apart
//! by `DTYPE`. The remaining sections cover a mapped superclass, a join
//! table and a detail row whose key is derived from its board.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::{OrmStudyError, SqlValue};
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionTx};
use rusqlite::types::Type;
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch07_001_advanced_mapping",
    sql: include_str!("../schema/ch07.sql"),
}];

pub(crate) const TABLES: &[&str] = &[
    "CH07_ALBUM",
    "CH07_MOVIE",
    "CH07_BOOK",
    "CH07_ITEM",
    "CH07_MEMBER",
    "CH07_SELLER",
    "CH07_GRAND_CHILD",
    "CH07_PARENT_CHILD",
    "CH07_CHILD",
    "CH07_PARENT",
    "CH07_BOARD_DETAIL",
    "CH07_BOARD",
];

// ===== Joined inheritance =====

/// Subtype-specific attributes of an item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Album { artist: String },
    Movie { director: String, actor: String },
    Book { author: String, isbn: String },
}

impl ItemKind {
    /// Discriminator value stored in `DTYPE`
    pub fn dtype(&self) -> &'static str {
        match self {
            ItemKind::Album { .. } => "A",
            ItemKind::Movie { .. } => "M",
            ItemKind::Book { .. } => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Option<i64>,
    pub name: String,
    pub price: i64,
    pub kind: ItemKind,
}

/// The base-table part of an item
struct ItemRow {
    id: Option<i64>,
    name: String,
    price: i64,
    dtype: String,
}

impl Entity for ItemRow {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Item";
    const TABLE: &'static str = "CH07_ITEM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "PRICE", "DTYPE"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.price.into(),
            self.dtype.as_str().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            price: row.get("PRICE")?,
            dtype: row.get("DTYPE")?,
        })
    }
}

const ITEM_SELECT: &str = "SELECT i.ID, i.NAME, i.PRICE, i.DTYPE, \
     a.ARTIST, m.DIRECTOR, m.ACTOR, b.AUTHOR, b.ISBN \
     FROM CH07_ITEM i \
     LEFT JOIN CH07_ALBUM a ON a.ID = i.ID \
     LEFT JOIN CH07_MOVIE m ON m.ID = i.ID \
     LEFT JOIN CH07_BOOK b ON b.BOOK_ID = i.ID";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let dtype: String = row.get("DTYPE")?;
    let kind = match dtype.as_str() {
        "A" => ItemKind::Album {
            artist: row.get("ARTIST")?,
        },
        "M" => ItemKind::Movie {
            director: row.get("DIRECTOR")?,
            actor: row.get("ACTOR")?,
        },
        "B" => ItemKind::Book {
            author: row.get("AUTHOR")?,
            isbn: row.get("ISBN")?,
        },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                Box::new(OrmStudyError::Conversion {
                    attribute: "DTYPE".to_string(),
                    value: other.to_string(),
                }),
            ))
        }
    };
    Ok(Item {
        id: row.get("ID")?,
        name: row.get("NAME")?,
        price: row.get("PRICE")?,
        kind,
    })
}

/// Insert the base row, then the subtype row under the generated id
pub fn save_item(tx: &SessionTx<'_>, item: &mut Item) -> Result<()> {
    let mut base = ItemRow {
        id: item.id,
        name: item.name.clone(),
        price: item.price,
        dtype: item.kind.dtype().to_string(),
    };
    tx.persist(&mut base)?;
    let id = base.id;
    item.id = id;

    match &item.kind {
        ItemKind::Album { artist } => tx.execute(
            "INSERT INTO CH07_ALBUM (ID, ARTIST) VALUES (?, ?)",
            sql_params![id, artist.as_str()],
        )?,
        ItemKind::Movie { director, actor } => tx.execute(
            "INSERT INTO CH07_MOVIE (ID, DIRECTOR, ACTOR) VALUES (?, ?, ?)",
            sql_params![id, director.as_str(), actor.as_str()],
        )?,
        ItemKind::Book { author, isbn } => tx.execute(
            "INSERT INTO CH07_BOOK (BOOK_ID, AUTHOR, ISBN) VALUES (?, ?, ?)",
            sql_params![id, author.as_str(), isbn.as_str()],
        )?,
    };
    Ok(())
}

pub fn find_item(tx: &SessionTx<'_>, id: i64) -> Result<Option<Item>> {
    let mut items = tx.query_map(
        &format!("{} WHERE i.ID = ?", ITEM_SELECT),
        sql_params![id],
        item_from_row,
    )?;
    Ok(items.pop())
}

/// Polymorphic query over the base table
pub fn all_items(tx: &SessionTx<'_>) -> Result<Vec<Item>> {
    tx.query_map(&format!("{} ORDER BY i.ID", ITEM_SELECT), (), item_from_row)
}

/// Subtype row first, then the base row
pub fn remove_item(tx: &SessionTx<'_>, item: &Item) -> Result<()> {
    let Some(id) = item.id else {
        return Err(OrmStudyError::MissingId {
            entity: ItemRow::ENTITY_NAME.to_string(),
        }
        .into());
    };
    let sql = match item.kind {
        ItemKind::Album { .. } => "DELETE FROM CH07_ALBUM WHERE ID = ?",
        ItemKind::Movie { .. } => "DELETE FROM CH07_MOVIE WHERE ID = ?",
        ItemKind::Book { .. } => "DELETE FROM CH07_BOOK WHERE BOOK_ID = ?",
    };
    tx.execute(sql, sql_params![id])?;
    let base = tx.get::<ItemRow>(id)?;
    tx.remove(&base)
}

// ===== Mapped superclass =====

/// Columns every subclass table repeats; not an entity of its own
#[derive(Debug, Clone, PartialEq)]
pub struct BaseEntity {
    pub id: Option<i64>,
    pub name: String,
}

impl BaseEntity {
    fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub base: BaseEntity,
    pub email: String,
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH07_MEMBER";
    const ID_COLUMN: &'static str = "MEMBER_ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "EMAIL"];

    fn id(&self) -> Option<i64> {
        self.base.id
    }

    fn set_id(&mut self, id: i64) {
        self.base.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.base.name.as_str().into(), self.email.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            base: BaseEntity {
                id: row.get("MEMBER_ID")?,
                name: row.get("NAME")?,
            },
            email: row.get("EMAIL")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seller {
    pub base: BaseEntity,
    pub shop_name: String,
}

impl Entity for Seller {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Seller";
    const TABLE: &'static str = "CH07_SELLER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "SHOP_NAME"];

    fn id(&self) -> Option<i64> {
        self.base.id
    }

    fn set_id(&mut self, id: i64) {
        self.base.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.base.name.as_str().into(), self.shop_name.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            base: BaseEntity {
                id: row.get("ID")?,
                name: row.get("NAME")?,
            },
            shop_name: row.get("SHOP_NAME")?,
        })
    }
}

// ===== Join table =====

#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Parent {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Parent";
    const TABLE: &'static str = "CH07_PARENT";
    const ID_COLUMN: &'static str = "PARENT_ID";
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
            id: row.get("PARENT_ID")?,
            name: row.get("NAME")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Child {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Child";
    const TABLE: &'static str = "CH07_CHILD";
    const ID_COLUMN: &'static str = "CHILD_ID";
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
            id: row.get("CHILD_ID")?,
            name: row.get("NAME")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrandChild {
    pub id: Option<i64>,
    pub name: String,
    pub child_id: i64,
}

impl Entity for GrandChild {
    type Id = i64;
    const ENTITY_NAME: &'static str = "GrandChild";
    const TABLE: &'static str = "CH07_GRAND_CHILD";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "CHILD_ID"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into(), self.child_id.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            child_id: row.get("CHILD_ID")?,
        })
    }
}

pub fn link_child(tx: &SessionTx<'_>, parent_id: i64, child_id: i64) -> Result<()> {
    tx.execute(
        "INSERT INTO CH07_PARENT_CHILD (PARENT_ID, CHILD_ID) VALUES (?, ?)",
        sql_params![parent_id, child_id],
    )?;
    Ok(())
}

pub fn children_of(tx: &SessionTx<'_>, parent_id: i64) -> Result<Vec<Child>> {
    tx.query_entities(
        "SELECT c.* FROM CH07_CHILD c \
         JOIN CH07_PARENT_CHILD pc ON pc.CHILD_ID = c.CHILD_ID \
         WHERE pc.PARENT_ID = ? ORDER BY c.CHILD_ID",
        sql_params![parent_id],
    )
}

pub fn grand_children_of(tx: &SessionTx<'_>, child_id: i64) -> Result<Vec<GrandChild>> {
    tx.query_entities(
        "SELECT * FROM CH07_GRAND_CHILD WHERE CHILD_ID = ? ORDER BY ID",
        sql_params![child_id],
    )
}

// ===== Secondary table with a derived key =====

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub id: Option<i64>,
    pub title: String,
}

impl Entity for Board {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Board";
    const TABLE: &'static str = "CH07_BOARD";
    const ID_COLUMN: &'static str = "BOARD_ID";
    const COLUMNS: &'static [&'static str] = &["TITLE"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.title.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("BOARD_ID")?,
            title: row.get("TITLE")?,
        })
    }
}

/// Detail row whose primary key is the id of its board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardDetail {
    pub board_id: i64,
    pub content: String,
}

impl BoardDetail {
    /// Fails when the board has not been persisted yet
    pub fn of(board: &Board, content: &str) -> Result<Self> {
        let board_id = board.id.ok_or_else(|| OrmStudyError::MissingId {
            entity: Board::ENTITY_NAME.to_string(),
        })?;
        Ok(Self {
            board_id,
            content: content.to_string(),
        })
    }
}

impl Entity for BoardDetail {
    type Id = i64;
    const ENTITY_NAME: &'static str = "BoardDetail";
    const TABLE: &'static str = "CH07_BOARD_DETAIL";
    const ID_COLUMN: &'static str = "BOARD_DETAIL_ID";
    const COLUMNS: &'static [&'static str] = &["CONTENT"];

    fn id(&self) -> Option<i64> {
        Some(self.board_id)
    }

    fn set_id(&mut self, id: i64) {
        self.board_id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.content.as_str().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            board_id: row.get("BOARD_DETAIL_ID")?,
            content: row.get("CONTENT")?,
        })
    }
}

/// A board read together with its secondary-table content
pub fn find_board_with_content(
    tx: &SessionTx<'_>,
    board_id: i64,
) -> Result<Option<(Board, Option<String>)>> {
    let mut rows = tx.query_map(
        "SELECT b.BOARD_ID, b.TITLE, d.CONTENT FROM CH07_BOARD b \
         LEFT JOIN CH07_BOARD_DETAIL d ON d.BOARD_DETAIL_ID = b.BOARD_ID \
         WHERE b.BOARD_ID = ?",
        sql_params![board_id],
        |row| Ok((Board::from_row(row)?, row.get("CONTENT")?)),
    )?;
    Ok(rows.pop())
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch07);

    let mut items = vec![
        Item {
            id: None,
            name: "앨범1".to_string(),
            price: 15000,
            kind: ItemKind::Album {
                artist: "가수1".to_string(),
            },
        },
        Item {
            id: None,
            name: "영화1".to_string(),
            price: 12000,
            kind: ItemKind::Movie {
                director: "감독1".to_string(),
                actor: "배우1".to_string(),
            },
        },
        Item {
            id: None,
            name: "책1".to_string(),
            price: 20000,
            kind: ItemKind::Book {
                author: "작가1".to_string(),
                isbn: "978-89".to_string(),
            },
        },
    ];
    for item in &mut items {
        save_item(tx, item)?;
    }
    for item in all_items(tx)? {
        report.log(format!(
            "item {} {} DTYPE={}",
            item.id.unwrap_or_default(),
            item.name,
            item.kind.dtype()
        ));
    }

    let mut member = Member {
        base: BaseEntity::new("회원1"),
        email: "member1@example.com".to_string(),
    };
    tx.persist(&mut member)?;
    let mut seller = Seller {
        base: BaseEntity::new("판매자1"),
        shop_name: "상점1".to_string(),
    };
    tx.persist(&mut seller)?;
    report.log(format!(
        "member {} / seller {} ({})",
        member.base.name, seller.base.name, seller.shop_name
    ));

    let mut parent = Parent {
        id: None,
        name: "parent1".to_string(),
    };
    tx.persist(&mut parent)?;
    let parent_id = parent.id.unwrap_or_default();
    for name in ["child1", "child2"] {
        let mut child = Child {
            id: None,
            name: name.to_string(),
        };
        tx.persist(&mut child)?;
        let child_id = child.id.unwrap_or_default();
        link_child(tx, parent_id, child_id)?;
        tx.persist(&mut GrandChild {
            id: None,
            name: format!("{}-grand", name),
            child_id,
        })?;
    }
    let children = children_of(tx, parent_id)?;
    report.log(format!(
        "parent1 children = {}",
        children
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let mut board = Board {
        id: None,
        title: "제목".to_string(),
    };
    tx.persist(&mut board)?;
    tx.persist(&mut BoardDetail::of(&board, "내용")?)?;
    if let Some((board, content)) = find_board_with_content(tx, board.id.unwrap_or_default())? {
        report.log(format!(
            "board {} content = {}",
            board.title,
            content.unwrap_or_default()
        ));
    }
    Ok(report)
}
