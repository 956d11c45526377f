#![allow(clippy::unwrap_used, clippy::expect_used)]

use ormstudy_core::query::{Delete, PredicateBuilder, Select, Table, Update};
use ormstudy_core::SqlValue;
use proptest::prelude::*;

fn member() -> Table {
    Table::new("MEMBER", "m")
}

/// Dynamic search: only the supplied conditions reach the WHERE clause
fn search(username: Option<&str>, min_age: Option<i64>) -> Select {
    let m = member();
    let mut builder = PredicateBuilder::new();
    if let Some(username) = username {
        builder.and(m.col::<String>("USERNAME").eq(username));
    }
    if let Some(age) = min_age {
        builder.and(m.col::<i64>("AGE").ge(age));
    }
    Select::from(&m).filter_opt(builder.build())
}

#[test]
fn test_dynamic_search_without_conditions_has_no_where() {
    let stmt = search(None, None).build();
    assert_eq!(stmt.sql, "SELECT m.* FROM MEMBER m");
    assert!(stmt.params.is_empty());
}

#[test]
fn test_dynamic_search_with_both_conditions() {
    let stmt = search(Some("member1"), Some(10)).build();
    assert_eq!(
        stmt.sql,
        "SELECT m.* FROM MEMBER m WHERE (m.USERNAME = ? AND m.AGE >= ?)"
    );
    assert_eq!(
        stmt.params,
        vec![SqlValue::Text("member1".into()), SqlValue::Integer(10)]
    );
}

#[test]
fn test_contains_escapes_wildcards() {
    let m = member();
    let stmt = Select::from(&m)
        .filter(m.col::<String>("USERNAME").contains("50%_off"))
        .build();
    assert!(stmt.sql.ends_with("LIKE ? ESCAPE '\\'"));
    assert_eq!(stmt.params, vec![SqlValue::Text("%50\\%\\_off%".into())]);
}

#[test]
fn test_bulk_statements() {
    let item = Table::new("ITEM", "item");
    let price = item.col::<i64>("PRICE");
    let name = item.col::<String>("NAME");

    let update = Update::table(&item)
        .set(&price, price.add(100))
        .filter(name.starts_with("good"))
        .build();
    assert_eq!(
        update.sql,
        "UPDATE ITEM SET PRICE = PRICE + ? WHERE NAME LIKE ? ESCAPE '\\'"
    );
    assert_eq!(update.params[1], SqlValue::Text("good%".into()));

    let delete = Delete::from(&item).filter(price.lt(100)).build();
    assert_eq!(delete.sql, "DELETE FROM ITEM WHERE PRICE < ?");
}

proptest! {
    #[test]
    fn prop_placeholders_match_params(username in proptest::option::of("[a-z]{1,8}"), age in proptest::option::of(0i64..120)) {
        let stmt = search(username.as_deref(), age).build();
        prop_assert_eq!(stmt.sql.matches('?').count(), stmt.params.len());
        prop_assert_eq!(stmt.sql.contains("WHERE"), username.is_some() || age.is_some());
    }
}
