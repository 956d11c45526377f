//! Chapter 10: querying
//!
//! The same data read several ways: typed and untyped native queries,
//! named and positional parameters, DTO projections, the query builder,
//! named native queries with a result-set mapping, and a stored procedure.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use ormstudy_core::mapping::{
    NamedQuery, NamedStoredProcedure, ParameterMode, ProcedureParameter, ResultSetMapping,
};
use ormstudy_core::query::{
    Column, Delete, Predicate, PredicateBuilder, Projection, Select, Table, Update,
};
use ormstudy_core::{ExError, ExErrorKind, SqlValue};
use ormstudy_store::{
    sql_params, Entity, Migration, Params, Procedure, Result, SessionFactoryBuilder, SessionTx,
};
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch10_001_query_model",
    sql: include_str!("../schema/ch10.sql"),
}];

pub(crate) const TABLES: &[&str] = &["CH10_ORDER_ITEM", "CH10_ORDERS", "CH10_ITEM", "CH10_MEMBER"];

pub const MEMBER_SQL: &str = "Member.memberSQL";
pub const MEMBER_WITH_ORDER_COUNT: &str = "Member.memberWithOrderCount";
pub const ORDER_COUNT_MAPPING: &str = "memberWithOrderCount";
pub const MULTIPLY: &str = "multiply";

/// Named queries, the result-set mapping and the `multiply` procedure
pub(crate) fn mappings(builder: SessionFactoryBuilder) -> SessionFactoryBuilder {
    builder
        .named_query(
            NamedQuery::new(
                MEMBER_SQL,
                "SELECT ID, NAME, AGE FROM CH10_MEMBER WHERE AGE > ? ORDER BY ID",
            )
            .returning(Member::ENTITY_NAME),
        )
        .named_query(
            NamedQuery::new(
                MEMBER_WITH_ORDER_COUNT,
                "SELECT m.ID, m.NAME, m.AGE, i.ORDER_COUNT FROM CH10_MEMBER m LEFT JOIN (\
                 SELECT im.ID, COUNT(*) AS ORDER_COUNT FROM CH10_ORDERS o, CH10_MEMBER im \
                 WHERE o.MEMBER_ID = im.ID GROUP BY im.ID\
                 ) i ON m.ID = i.ID ORDER BY m.ID",
            )
            .returning(Member::ENTITY_NAME),
        )
        .result_set_mapping(ResultSetMapping {
            name: ORDER_COUNT_MAPPING.to_string(),
            entity: Member::ENTITY_NAME.to_string(),
            columns: vec!["ORDER_COUNT".to_string()],
        })
        .procedure(Procedure::new(
            NamedStoredProcedure {
                name: MULTIPLY.to_string(),
                procedure_name: "proc_multiply".to_string(),
                parameters: vec![
                    ProcedureParameter {
                        name: "inParam".to_string(),
                        mode: ParameterMode::In,
                    },
                    ProcedureParameter {
                        name: "outParam".to_string(),
                        mode: ParameterMode::Out,
                    },
                ],
            },
            proc_multiply,
        ))
}

/// `outParam = inParam * 2`
fn proc_multiply(args: &[SqlValue]) -> Result<SqlValue> {
    let value = args.first().and_then(SqlValue::as_i64).ok_or_else(|| {
        ExError::new(ExErrorKind::Conversion)
            .with_op("proc_multiply")
            .with_message("inParam must be an integer")
    })?;
    value.checked_mul(2).map(SqlValue::Integer).ok_or_else(|| {
        ExError::new(ExErrorKind::Conversion)
            .with_op("proc_multiply")
            .with_message(format!("inParam {} overflows when doubled", value))
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
}

impl Member {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age,
        }
    }
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH10_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "AGE"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into(), self.age.into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            age: row.get("AGE")?,
        })
    }
}

/// Item ids are assigned by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub stock_quantity: i64,
}

impl Item {
    pub fn new(id: i64, name: &str, price: i64, stock_quantity: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            stock_quantity,
        }
    }
}

impl Entity for Item {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Item";
    const TABLE: &'static str = "CH10_ITEM";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &["NAME", "PRICE", "STOCK_QUANTITY"];

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.price.into(),
            self.stock_quantity.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            price: row.get("PRICE")?,
            stock_quantity: row.get("STOCK_QUANTITY")?,
        })
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
    const TABLE: &'static str = "CH10_ORDERS";
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
    const TABLE: &'static str = "CH10_ORDER_ITEM";
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

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDto {
    pub name: String,
    pub age: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDto {
    pub username: String,
    pub price: i64,
}

/// Optional search conditions; absent ones are left out of the WHERE clause
#[derive(Debug, Clone, Default)]
pub struct SearchParam {
    pub name: Option<String>,
    pub price: Option<i64>,
}

/// Query-builder handles for the item table
pub struct QItem {
    pub table: Table,
    pub id: Column<i64>,
    pub name: Column<String>,
    pub price: Column<i64>,
    pub stock_quantity: Column<i64>,
}

impl QItem {
    pub fn new(alias: &str) -> Self {
        let table = Table::new(Item::TABLE, alias);
        Self {
            id: table.col("ID"),
            name: table.col("NAME"),
            price: table.col("PRICE"),
            stock_quantity: table.col("STOCK_QUANTITY"),
            table,
        }
    }

    /// Reusable condition: price above `price`
    pub fn is_expensive(&self, price: i64) -> Predicate {
        self.price.gt(price)
    }
}

/// Reusable condition on any text column
pub fn is_hello_start(column: &Column<String>) -> Predicate {
    column.starts_with("Hello")
}

pub fn save_data(tx: &SessionTx<'_>) -> Result<()> {
    for (name, age) in [("회원1", 20), ("회원2", 21), ("회원3", 22)] {
        tx.persist(&mut Member::new(name, age))?;
    }
    for mut item in [
        Item::new(2, "좋은상품", 30000, 5),
        Item::new(3, "좋은상품", 25000, 3),
        Item::new(4, "보통상품", 15000, 7),
        Item::new(5, "Hello 상품", 40000, 1),
    ] {
        tx.persist(&mut item)?;
    }

    let mut order = Order {
        id: None,
        member_id: 1,
    };
    tx.persist(&mut order)?;
    let order_id = order.id.unwrap_or_default();
    for item_id in [2, 4] {
        tx.persist(&mut OrderItem {
            id: None,
            order_id,
            item_id: Some(item_id),
        })?;
    }
    Ok(())
}

// ===== Native SQL =====

pub fn typed_query(tx: &SessionTx<'_>) -> Result<Vec<Member>> {
    tx.query_entities("SELECT * FROM CH10_MEMBER ORDER BY ID", ())
}

/// Rows as plain value arrays
pub fn untyped_query(tx: &SessionTx<'_>) -> Result<Vec<Vec<SqlValue>>> {
    tx.query_values("SELECT NAME, AGE FROM CH10_MEMBER ORDER BY ID", ())
}

pub fn query_member_named(tx: &SessionTx<'_>, name: &str) -> Result<Vec<Member>> {
    tx.query_entities(
        "SELECT * FROM CH10_MEMBER WHERE NAME = :name",
        Params::named().set("name", name),
    )
}

pub fn query_member_positional(tx: &SessionTx<'_>, name: &str) -> Result<Vec<Member>> {
    tx.query_entities("SELECT * FROM CH10_MEMBER WHERE NAME = ?1", sql_params![name])
}

pub fn query_to_dto(tx: &SessionTx<'_>, name: &str) -> Result<Vec<MemberDto>> {
    tx.query_map(
        "SELECT NAME, AGE FROM CH10_MEMBER WHERE NAME = :name",
        Params::named().set("name", name),
        |row| {
            Ok(MemberDto {
                name: row.get("NAME")?,
                age: row.get("AGE")?,
            })
        },
    )
}

pub fn native_older_than(tx: &SessionTx<'_>, age: i64) -> Result<Vec<(i64, String)>> {
    tx.query_map(
        "SELECT ID, NAME, AGE FROM CH10_MEMBER WHERE AGE > ? ORDER BY ID",
        sql_params![age],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

// ===== Query builder =====

pub fn members_named(tx: &SessionTx<'_>, name: &str) -> Result<Vec<Member>> {
    let m = Table::new(Member::TABLE, "member");
    let name_col = m.col::<String>("NAME");
    let select = Select::from(&m)
        .filter(name_col.eq(name))
        .order_by(name_col.desc());
    tx.select(&select)
}

pub fn good_items_over(tx: &SessionTx<'_>, price: i64) -> Result<Vec<Item>> {
    let item = QItem::new("item");
    let select = Select::from(&item.table)
        .filter(item.name.eq("좋은상품").and(item.price.gt(price)))
        .order_by(item.id.asc());
    tx.select(&select)
}

/// Items above `price`, most expensive first, one page at a time
pub fn items_page(tx: &SessionTx<'_>, price: i64, offset: u64, limit: u64) -> Result<Vec<Item>> {
    let item = QItem::new("item");
    let select = Select::from(&item.table)
        .filter(item.is_expensive(price))
        .order_by(item.price.desc())
        .order_by(item.stock_quantity.asc())
        .offset(offset)
        .limit(limit);
    tx.select(&select)
}

/// Orders joined to their member and (optionally) their order items
pub fn order_rows(tx: &SessionTx<'_>) -> Result<Vec<Vec<SqlValue>>> {
    let o = Table::new(Order::TABLE, "o");
    let m = Table::new(Member::TABLE, "m");
    let oi = Table::new(OrderItem::TABLE, "oi");
    let select = Select::from(&o)
        .select([
            o.col::<i64>("ID").as_("ORDER_ID"),
            m.col::<String>("NAME").as_("MEMBER_NAME"),
            oi.col::<i64>("ITEM_ID").as_("ITEM_ID"),
        ])
        .inner_join(&m, o.col::<i64>("MEMBER_ID").eq_col(&m.col("ID")))
        .left_join(&oi, oi.col::<i64>("ORDER_ID").eq_col(&o.col("ID")))
        .order_by(oi.col::<i64>("ID").asc());
    tx.select_values(&select)
}

pub fn most_expensive(tx: &SessionTx<'_>) -> Result<Vec<Item>> {
    let item = QItem::new("item");
    let item_sub = QItem::new("itemSub");
    let max_price = Select::from(&item_sub.table).select([item_sub.price.max()]);
    tx.select(&Select::from(&item.table).filter(item.price.eq_subquery(max_price)))
}

/// Items whose name also appears on another row, via a correlated subquery
pub fn items_sharing_name(tx: &SessionTx<'_>) -> Result<Vec<Item>> {
    let item = QItem::new("item");
    let item_sub = QItem::new("itemSub");
    let other_names = Select::from(&item_sub.table)
        .select([&item_sub.name])
        .filter(item_sub.id.eq_col(&item.id).not());
    tx.select(
        &Select::from(&item.table)
            .filter(item.name.in_subquery(other_names))
            .order_by(item.id.asc()),
    )
}

pub fn name_price_tuples(tx: &SessionTx<'_>) -> Result<Vec<(String, i64)>> {
    let item = QItem::new("item");
    let select = Select::from(&item.table)
        .select([Projection::from(&item.name), Projection::from(&item.price)])
        .order_by(item.id.asc());
    tx.select_map(&select, |row| Ok((row.get(0)?, row.get(1)?)))
}

/// Projection onto a DTO whose field names differ from the columns
pub fn item_dtos(tx: &SessionTx<'_>) -> Result<Vec<ItemDto>> {
    let item = QItem::new("item");
    let select = Select::from(&item.table)
        .select([item.name.as_("username"), item.price.as_("price")])
        .order_by(item.id.asc());
    tx.select_map(&select, |row| {
        Ok(ItemDto {
            username: row.get("username")?,
            price: row.get("price")?,
        })
    })
}

/// Returns (rows updated, rows deleted)
pub fn bulk_update_and_delete(tx: &SessionTx<'_>, id: i64) -> Result<(usize, usize)> {
    let item = QItem::new("item");
    let updated = tx.execute_update(
        &Update::table(&item.table)
            .set(&item.price, item.price.add(1000))
            .filter(item.id.eq(id)),
    )?;
    let deleted = tx.execute_delete(&Delete::from(&item.table).filter(item.id.eq(id)))?;
    Ok((updated, deleted))
}

pub fn dynamic_search(tx: &SessionTx<'_>, params: &SearchParam) -> Result<Vec<Item>> {
    let item = QItem::new("item");
    let mut builder = PredicateBuilder::new();
    if let Some(name) = params.name.as_deref().filter(|n| !n.is_empty()) {
        builder.and(item.name.contains(name));
    }
    if let Some(price) = params.price {
        builder.and(item.price.gt(price));
    }
    tx.select(
        &Select::from(&item.table)
            .filter_opt(builder.build())
            .order_by(item.id.asc()),
    )
}

// ===== Named queries, mappings, procedures =====

pub fn named_member_sql(tx: &SessionTx<'_>, age: i64) -> Result<Vec<Member>> {
    tx.named_query(MEMBER_SQL, sql_params![age])
}

/// Each member with the scalar column declared by the result-set mapping
pub fn members_with_order_count(tx: &SessionTx<'_>) -> Result<Vec<(Member, i64)>> {
    let mapping = tx.result_set_mapping(ORDER_COUNT_MAPPING)?;
    let count_column = mapping.columns.first().cloned().ok_or_else(|| {
        ExError::new(ExErrorKind::MissingMapping)
            .with_op("result_set_mapping")
            .with_message(format!("{} declares no columns", ORDER_COUNT_MAPPING))
    })?;
    tx.named_query_map(MEMBER_WITH_ORDER_COUNT, (), |row| {
        let count: Option<i64> = row.get(count_column.as_str())?;
        Ok((Member::from_row(row)?, count.unwrap_or(0)))
    })
}

pub fn multiply(tx: &SessionTx<'_>, value: i64) -> Result<i64> {
    let out = tx.call_procedure(MULTIPLY, &[SqlValue::Integer(value)])?;
    out.as_i64().ok_or_else(|| {
        ExError::new(ExErrorKind::Conversion)
            .with_op("call_procedure")
            .with_message(format!("outParam is not an integer: {}", out))
    })
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch10);

    save_data(tx)?;
    for member in typed_query(tx)? {
        report.log(format!("member = {}", member.name));
    }
    if let Some(first) = untyped_query(tx)?.first().and_then(|row| row.first()) {
        report.log(format!("first name column = {}", first));
    }
    report.log(format!(
        "named :name = {}",
        query_member_named(tx, "회원1")?.len()
    ));
    report.log(format!(
        "positional ?1 = {}",
        query_member_positional(tx, "회원1")?.len()
    ));
    for dto in query_to_dto(tx, "회원1")? {
        report.log(format!("dto = {} {}", dto.name, dto.age));
    }

    report.log(format!("members named 회원1 = {}", members_named(tx, "회원1")?.len()));
    report.log(format!("good items > 20000 = {}", good_items_over(tx, 20000)?.len()));
    report.log(format!("page = {}", items_page(tx, 20000, 0, 2)?.len()));
    report.log(format!("order rows = {}", order_rows(tx)?.len()));
    for item in most_expensive(tx)? {
        report.log(format!("max price item = {}", item.name));
    }
    report.log(format!("same name items = {}", items_sharing_name(tx)?.len()));
    for (name, price) in name_price_tuples(tx)? {
        report.log(format!("tuple = {} {}", name, price));
    }

    tx.persist(&mut Item::new(1, "TEST", 1000, 10))?;
    tx.flush();
    for dto in item_dtos(tx)? {
        report.log(format!("name = {}, price = {}", dto.username, dto.price));
    }
    let found = dynamic_search(
        tx,
        &SearchParam {
            name: Some("TEST".to_string()),
            price: Some(100),
        },
    )?;
    report.log(format!("size: {}", found.len()));
    let (updated, deleted) = bulk_update_and_delete(tx, 1)?;
    report.log(format!("result: {}", updated));
    report.log(format!("result: {}", deleted));

    for (id, name) in native_older_than(tx, 20)? {
        report.log(format!("member= {} {}", id, name));
    }
    for (member, order_count) in members_with_order_count(tx)? {
        report.log(format!(
            "member={}, orderCount={}",
            member.id.unwrap_or_default(),
            order_count
        ));
    }
    for member in named_member_sql(tx, 20)? {
        report.log(format!("member = {}", member.id.unwrap_or_default()));
    }
    report.log(format!("out = {}", multiply(tx, 100)?));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormstudy_store::{run_in_transaction, PersistenceUnit};
    use proptest::prelude::*;

    fn in_tx<T>(work: impl FnOnce(&SessionTx<'_>) -> Result<T>) -> Result<T> {
        let factory = Chapter::Ch10
            .factory(PersistenceUnit::in_memory("ch10-test"))
            .unwrap();
        run_in_transaction(factory, work).into_result()
    }

    fn seeded<T>(work: impl FnOnce(&SessionTx<'_>) -> Result<T>) -> T {
        in_tx(|tx| {
            save_data(tx)?;
            work(tx)
        })
        .unwrap()
    }

    fn item_names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_named_and_positional_parameters_agree() {
        let (named, positional) =
            seeded(|tx| Ok((query_member_named(tx, "회원2")?, query_member_positional(tx, "회원2")?)));
        assert_eq!(named, positional);
        assert_eq!(named[0].age, 21);
    }

    #[test]
    fn test_untyped_rows_are_value_arrays() {
        let rows = seeded(untyped_query);
        assert_eq!(
            rows[0],
            vec![SqlValue::Text("회원1".into()), SqlValue::Integer(20)]
        );
    }

    #[test]
    fn test_dto_projection() {
        let dtos = seeded(|tx| query_to_dto(tx, "회원3"));
        assert_eq!(
            dtos,
            vec![MemberDto {
                name: "회원3".to_string(),
                age: 22
            }]
        );
    }

    #[test]
    fn test_builder_filters_and_orders() {
        let items = seeded(|tx| good_items_over(tx, 20000));
        assert_eq!(item_names(&items), vec!["좋은상품", "좋은상품"]);

        let page = seeded(|tx| items_page(tx, 20000, 1, 2));
        let prices: Vec<i64> = page.iter().map(|i| i.price).collect();
        assert_eq!(prices, vec![30000, 25000]);
    }

    #[test]
    fn test_scalar_subquery_finds_max() {
        let items = seeded(most_expensive);
        assert_eq!(item_names(&items), vec!["Hello 상품"]);
    }

    #[test]
    fn test_correlated_in_subquery() {
        let items = seeded(items_sharing_name);
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let lone = seeded(|tx| {
            tx.execute("UPDATE CH10_ITEM SET NAME = '단종상품' WHERE ID = 3", ())?;
            items_sharing_name(tx)
        });
        assert!(lone.is_empty());
    }

    #[test]
    fn test_join_rows_include_left_join_columns() {
        let rows = seeded(order_rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], SqlValue::Text("회원1".into()));
        assert_eq!(rows[0][2], SqlValue::Integer(2));
        assert_eq!(rows[1][2], SqlValue::Integer(4));
    }

    #[test]
    fn test_alias_projection_to_dto() {
        let dtos = seeded(item_dtos);
        assert_eq!(dtos[0].username, "좋은상품");
        assert_eq!(dtos.len(), 4);
    }

    #[test]
    fn test_bulk_update_then_delete() {
        let (updated_price, counts, remaining) = seeded(|tx| {
            tx.persist(&mut Item::new(1, "TEST", 1000, 10))?;
            let item = QItem::new("item");
            tx.execute_update(
                &Update::table(&item.table)
                    .set(&item.price, item.price.add(1000))
                    .filter(item.id.eq(1)),
            )?;
            let updated_price = tx.get::<Item>(1)?.price;
            let counts = bulk_update_and_delete(tx, 1)?;
            Ok((updated_price, counts, tx.find::<Item>(1)?))
        });
        assert_eq!(updated_price, 2000);
        assert_eq!(counts, (1, 1));
        assert!(remaining.is_none());
    }

    #[test]
    fn test_delete_of_ordered_item_is_rejected() {
        let err = in_tx(|tx| {
            save_data(tx)?;
            bulk_update_and_delete(tx, 4)
        })
        .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_dynamic_search_skips_absent_conditions() {
        let all = seeded(|tx| dynamic_search(tx, &SearchParam::default()));
        assert_eq!(all.len(), 4);

        let hello = seeded(|tx| {
            dynamic_search(
                tx,
                &SearchParam {
                    name: Some("Hello".to_string()),
                    price: None,
                },
            )
        });
        assert_eq!(item_names(&hello), vec!["Hello 상품"]);
    }

    #[test]
    fn test_query_delegates() {
        let item = QItem::new("item");
        let stmt = Select::from(&item.table)
            .filter(is_hello_start(&item.name).and(item.is_expensive(100)))
            .build();
        assert!(stmt.sql.contains("item.NAME LIKE ?"));
        assert!(stmt.sql.contains("item.PRICE > ?"));
    }

    #[test]
    fn test_result_set_mapping_adds_order_count() {
        let rows = seeded(members_with_order_count);
        let counts: Vec<(String, i64)> = rows.into_iter().map(|(m, c)| (m.name, c)).collect();
        assert_eq!(
            counts,
            vec![
                ("회원1".to_string(), 1),
                ("회원2".to_string(), 0),
                ("회원3".to_string(), 0)
            ]
        );
    }

    #[test]
    fn test_named_query_and_procedure() {
        let (members, out) = seeded(|tx| Ok((named_member_sql(tx, 20)?, multiply(tx, 100)?)));
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["회원2", "회원3"]);
        assert_eq!(out, 200);
    }

    #[test]
    fn test_procedure_rejects_text() {
        let err = in_tx(|tx| tx.call_procedure(MULTIPLY, &[SqlValue::from("x")])).unwrap_err();
        assert!(err.message().contains("inParam must be an integer"));
    }

    #[test]
    fn test_procedure_rejects_overflow() {
        let err = in_tx(|tx| multiply(tx, i64::MAX)).unwrap_err();
        assert!(err.message().contains("overflows when doubled"));
        assert_eq!(
            proc_multiply(&[SqlValue::Integer(i64::MIN)]).unwrap_err().kind(),
            ExErrorKind::Conversion
        );
    }

    #[test]
    fn test_run_report() {
        let report = in_tx(run).unwrap();
        assert!(report.contains("member = 회원1"));
        assert!(report.contains("same name items = 2"));
        assert!(report.contains("result: 1"));
        assert!(report.contains("max price item = Hello 상품"));
        assert!(report.contains("size: 1"));
        assert!(report.contains("member=1, orderCount=1"));
        assert_eq!(report.lines.last().unwrap(), "out = 200");
    }

    proptest! {
        #[test]
        fn prop_multiply_doubles(n in -1_000_000i64..1_000_000) {
            prop_assert_eq!(proc_multiply(&[SqlValue::Integer(n)]).unwrap(), SqlValue::Integer(n * 2));
        }
    }
}
