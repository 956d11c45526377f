#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Member, Team, SCHEMA};
use ormstudy_core::logging_facility::scoped_capture;
use ormstudy_core::mapping::{
    EntityGraph, NamedQuery, NamedStoredProcedure, ParameterMode, ProcedureParameter,
};
use ormstudy_core::query::{Select, Table, Update};
use ormstudy_core::{ExError, ExErrorKind, SqlValue};
use ormstudy_store::{
    run_in_transaction, sql_params, Params, PersistenceUnit, Procedure, SessionFactory,
};

fn double(args: &[SqlValue]) -> ormstudy_store::Result<SqlValue> {
    match args.first().and_then(SqlValue::as_i64) {
        Some(n) => Ok(SqlValue::Integer(n * 2)),
        None => Err(ExError::new(ExErrorKind::Conversion).with_message("integer expected")),
    }
}

fn factory() -> SessionFactory {
    let mut graph = EntityGraph::new("Member.withTeam", "Member");
    graph.add_attribute_nodes(&["team"]);

    SessionFactory::builder(PersistenceUnit::in_memory("tx").with_show_sql(true))
        .schema(SCHEMA)
        .named_query(
            NamedQuery::new("Member.findByName", "SELECT * FROM MEMBER WHERE NAME = :name")
                .returning("Member"),
        )
        .entity_graph(graph)
        .procedure(Procedure::new(
            NamedStoredProcedure {
                name: "double".into(),
                procedure_name: "proc_double".into(),
                parameters: vec![
                    ProcedureParameter {
                        name: "inParam".into(),
                        mode: ParameterMode::In,
                    },
                    ProcedureParameter {
                        name: "outParam".into(),
                        mode: ParameterMode::Out,
                    },
                ],
            },
            double,
        ))
        .build()
        .unwrap()
}

#[test]
fn test_persist_find_merge_remove() {
    let outcome = run_in_transaction(factory(), |tx| {
        let mut member = Member::new("id1", "memberA", 20);
        tx.persist(&mut member)?;

        member.age = 21;
        tx.merge(&member)?;
        let found = tx.get::<Member>("id1")?;
        assert_eq!(found.age, 21);

        tx.remove(&found)?;
        assert!(tx.find::<Member>("id1")?.is_none());
        Ok(())
    });
    assert!(outcome.is_committed(), "{:?}", outcome.error());
}

#[test]
fn test_generated_id_is_assigned() {
    let ids = run_in_transaction(factory(), |tx| {
        let mut a = Team::new("teamA");
        let mut b = Team::new("teamB");
        tx.persist(&mut a)?;
        tx.persist(&mut b)?;
        Ok((a.id, b.id))
    })
    .into_result()
    .unwrap();
    assert_eq!(ids, (Some(1), Some(2)));
}

#[test]
fn test_duplicate_persist_is_already_exists() {
    let outcome = run_in_transaction(factory(), |tx| {
        tx.persist(&mut Member::new("id1", "memberA", 20))?;
        tx.persist(&mut Member::new("id1", "memberB", 30))
    });
    assert_eq!(outcome.error().unwrap().kind(), ExErrorKind::AlreadyExists);
}

#[test]
fn test_get_missing_is_not_found() {
    let outcome = run_in_transaction(factory(), |tx| tx.get::<Member>("nobody"));
    let err = outcome.error().unwrap();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.entity(), Some("Member"));
    assert_eq!(err.entity_id(), Some("nobody"));
}

#[test]
fn test_merge_inserts_unknown_entity() {
    let names = run_in_transaction(factory(), |tx| {
        tx.merge(&Member::new("id2", "memberB", 30))?;
        tx.query_map("SELECT NAME FROM MEMBER", (), |row| row.get::<_, String>(0))
    })
    .into_result()
    .unwrap();
    assert_eq!(names, vec!["memberB"]);
}

#[test]
fn test_reference_loads_on_first_access() {
    let outcome = run_in_transaction(factory(), |tx| {
        let mut team = Team::new("teamA");
        tx.persist(&mut team)?;

        let reference = tx.get_reference::<Team>(team.id.unwrap());
        assert!(!reference.is_loaded());
        assert_eq!(reference.get()?.name, "teamA");
        assert!(reference.is_loaded());

        let missing = tx.get_reference::<Team>(404);
        assert_eq!(missing.get().unwrap_err().kind(), ExErrorKind::NotFound);
        Ok(())
    });
    assert!(outcome.is_committed(), "{:?}", outcome.error());
}

#[test]
fn test_listener_fires_on_persist() {
    let (capture, _guard) = scoped_capture();

    let outcome = run_in_transaction(factory(), |tx| tx.persist(&mut Team::new("teamA")));
    assert!(outcome.is_committed());

    let messages = capture.messages();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("prePersist obj=Team") && m.contains("teamA")));
}

#[test]
fn test_named_query_with_named_parameter() {
    let found = run_in_transaction(factory(), |tx| {
        tx.persist(&mut Member::new("id1", "memberA", 20))?;
        tx.persist(&mut Member::new("id2", "memberB", 30))?;
        tx.named_query::<Member>("Member.findByName", Params::named().set("name", "memberB"))
    })
    .into_result()
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "id2");
}

#[test]
fn test_named_query_result_type_is_checked() {
    let outcome = run_in_transaction(factory(), |tx| {
        tx.named_query::<Team>("Member.findByName", Params::named().set("name", "x"))
    });
    assert_eq!(outcome.error().unwrap().kind(), ExErrorKind::InvalidQuery);

    let outcome = run_in_transaction(factory(), |tx| tx.named_query::<Member>("Member.nope", ()));
    assert_eq!(outcome.error().unwrap().kind(), ExErrorKind::MissingMapping);
}

#[test]
fn test_call_procedure() {
    let outcome = run_in_transaction(factory(), |tx| {
        let out = tx.call_procedure("double", &[SqlValue::Integer(100)])?;
        assert_eq!(out, SqlValue::Integer(200));

        let err = tx.call_procedure("double", &[]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);

        let err = tx.call_procedure("triple", &[SqlValue::Integer(1)]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingMapping);
        Ok(())
    });
    assert!(outcome.is_committed(), "{:?}", outcome.error());
}

#[test]
fn test_builder_select_and_bulk_update() {
    let outcome = run_in_transaction(factory(), |tx| {
        for (id, name, age) in [("id1", "memberA", 10), ("id2", "memberB", 20), ("id3", "memberC", 30)] {
            tx.persist(&mut Member::new(id, name, age))?;
        }

        let m = Table::new("MEMBER", "m");
        let age = m.col::<i64>("AGE");
        let adults = tx.select::<Member>(&Select::from(&m).filter(age.ge(18)).order_by(age.desc()))?;
        assert_eq!(
            adults.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["id3", "id2"]
        );

        let updated = tx.execute_update(&Update::table(&m).set(&age, age.add(1)).filter(age.lt(25)))?;
        assert_eq!(updated, 2);
        tx.flush();

        tx.query_scalar::<i64>("SELECT SUM(AGE) FROM MEMBER", ())
    });
    assert_eq!(outcome.into_result().unwrap(), 62);
}

#[test]
fn test_show_sql_logs_statements() {
    let (capture, _guard) = scoped_capture();

    let outcome = run_in_transaction(factory(), |tx| {
        tx.query_scalar::<i64>("SELECT COUNT(*) FROM TEAM", ())
    });
    assert!(outcome.is_committed());

    let logged = capture.count_events(|e| e.field("sql") == Some("SELECT COUNT(*) FROM TEAM"));
    assert_eq!(logged, 1);
}

#[test]
fn test_entity_graph_lookup() {
    let outcome = run_in_transaction(factory(), |tx| {
        assert!(tx.entity_graph("Member.withTeam")?.contains("team"));
        Ok(tx.entity_graph("Order.withAll").is_err())
    });
    assert!(outcome.into_result().unwrap());
}

#[test]
fn test_parameter_count_mismatch() {
    let outcome = run_in_transaction(factory(), |tx| {
        tx.execute("UPDATE MEMBER SET AGE = ? WHERE ID = ?", sql_params![1])
    });
    assert_eq!(outcome.error().unwrap().kind(), ExErrorKind::InvalidQuery);
}
