#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{file_factory, memory_factory, Member};
use ormstudy_core::core_types::schema::{
    EVENT_FACTORY_CLOSE, EVENT_SESSION_CLOSE, EVENT_TX_BEGIN, EVENT_TX_COMMIT,
    EVENT_TX_ROLLBACK, OP_UNIT_OF_WORK,
};
use ormstudy_core::logging_facility::scoped_capture;
use ormstudy_core::{ExError, ExErrorKind};
use ormstudy_store::{run_in_transaction, sql_params, Outcome};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn lifecycle(events: &[&str]) -> Vec<String> {
    events.iter().map(|e| e.to_string()).collect()
}

#[test]
fn test_success_path_lifecycle_order() {
    let (capture, _guard) = scoped_capture();

    let outcome = run_in_transaction(memory_factory("success"), |tx| {
        tracing::info!(op = OP_UNIT_OF_WORK, event = "work", "persisting member");
        tx.persist(&mut Member::new("id1", "memberA", 20))
    });

    assert!(outcome.is_committed());
    assert_eq!(
        capture.event_sequence(OP_UNIT_OF_WORK),
        lifecycle(&[
            EVENT_TX_BEGIN,
            "work",
            EVENT_TX_COMMIT,
            EVENT_SESSION_CLOSE,
            EVENT_FACTORY_CLOSE
        ])
    );
}

#[test]
fn test_failure_path_lifecycle_order() {
    let (capture, _guard) = scoped_capture();

    let outcome: Outcome<()> = run_in_transaction(memory_factory("failure"), |tx| {
        tx.persist(&mut Member::new("id1", "memberA", 20))?;
        Err(ExError::unit_of_work("member rejected"))
    });

    assert!(outcome.is_rolled_back());
    assert_eq!(
        capture.event_sequence(OP_UNIT_OF_WORK),
        lifecycle(&[
            EVENT_TX_BEGIN,
            EVENT_TX_ROLLBACK,
            EVENT_SESSION_CLOSE,
            EVENT_FACTORY_CLOSE
        ])
    );

    let events = capture.events();
    let rollback = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_TX_ROLLBACK))
        .unwrap();
    assert_eq!(rollback.field("err_code"), Some("ERR_UNIT_OF_WORK"));
    assert!(rollback.message.as_deref().unwrap().contains("member rejected"));
}

#[test]
fn test_every_lifecycle_event_carries_session_id() {
    let (capture, _guard) = scoped_capture();

    let session_id = run_in_transaction(memory_factory("ids"), |tx| {
        Ok(tx.session_id().as_str().to_string())
    })
    .into_result()
    .unwrap();

    let events = capture.events();
    let lifecycle_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(OP_UNIT_OF_WORK))
        .collect();
    assert_eq!(lifecycle_events.len(), 4);
    for event in lifecycle_events {
        assert_eq!(event.field("session_id"), Some(session_id.as_str()));
        assert!(event.component.is_some());
    }
}

#[test]
fn test_panic_still_closes_session_and_factory_once() {
    let (capture, _guard) = scoped_capture();

    let result = catch_unwind(AssertUnwindSafe(|| {
        run_in_transaction(memory_factory("panic"), |tx| -> ormstudy_store::Result<()> {
            tx.persist(&mut Member::new("id1", "memberA", 20))?;
            panic!("unit of work panicked");
        })
    }));
    assert!(result.is_err());

    let sequence = capture.event_sequence(OP_UNIT_OF_WORK);
    assert_eq!(
        sequence,
        lifecycle(&[
            EVENT_TX_BEGIN,
            EVENT_TX_ROLLBACK,
            EVENT_SESSION_CLOSE,
            EVENT_FACTORY_CLOSE
        ])
    );
    assert!(!sequence.contains(&EVENT_TX_COMMIT.to_string()));

    let events = capture.events();
    let rollback = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_TX_ROLLBACK))
        .unwrap();
    assert_eq!(rollback.field("panicking"), Some("true"));
}

#[test]
fn test_nested_invocations_get_independent_resources() {
    let (capture, _guard) = scoped_capture();

    let outer = run_in_transaction(memory_factory("outer"), |outer_tx| {
        let inner = run_in_transaction(memory_factory("inner"), |inner_tx| {
            Ok(inner_tx.session_id().clone())
        })
        .into_result()?;
        assert_ne!(&inner, outer_tx.session_id());
        Ok((outer_tx.session_id().clone(), inner))
    });
    let (outer_id, inner_id) = outer.into_result().unwrap();

    let closes: Vec<String> = capture
        .events()
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_SESSION_CLOSE))
        .filter_map(|e| e.field("session_id").map(str::to_string))
        .collect();
    // The inner unit finishes first
    assert_eq!(
        closes,
        vec![inner_id.as_str().to_string(), outer_id.as_str().to_string()]
    );

    let factory_closes = capture.count_events(|e| e.event.as_deref() == Some(EVENT_FACTORY_CLOSE));
    assert_eq!(factory_closes, 2);
}

#[test]
fn test_repeated_invocations_use_fresh_databases() {
    let first = run_in_transaction(memory_factory("repeat"), |tx| {
        tx.persist(&mut Member::new("id1", "memberA", 20))?;
        tx.query_scalar::<i64>("SELECT COUNT(*) FROM MEMBER", ())
    });
    let second = run_in_transaction(memory_factory("repeat"), |tx| {
        tx.query_scalar::<i64>("SELECT COUNT(*) FROM MEMBER", ())
    });

    assert_eq!(first.into_result().unwrap(), 1);
    assert_eq!(second.into_result().unwrap(), 0);
}

#[test]
fn test_rolled_back_writes_are_not_visible_afterwards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollback.db");

    let committed = run_in_transaction(file_factory(&path), |tx| {
        tx.persist(&mut Member::new("kept", "memberA", 20))
    });
    assert!(committed.is_committed());

    let rolled_back: Outcome<()> = run_in_transaction(file_factory(&path), |tx| {
        tx.persist(&mut Member::new("lost", "memberB", 30))?;
        tx.execute("UPDATE MEMBER SET AGE = ? WHERE ID = ?", sql_params![99, "kept"])?;
        Err(ExError::unit_of_work("abort"))
    });
    assert!(rolled_back.is_rolled_back());

    let ages = run_in_transaction(file_factory(&path), |tx| {
        tx.query_map("SELECT ID, AGE FROM MEMBER ORDER BY ID", (), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
    })
    .into_result()
    .unwrap();
    assert_eq!(ages, vec![("kept".to_string(), 20)]);
}

#[test]
fn test_commit_failure_rolls_back() {
    let (capture, _guard) = scoped_capture();

    // A deferred foreign key is only checked at COMMIT
    let outcome: Outcome<()> = run_in_transaction(memory_factory("deferred"), |tx| {
        tx.execute_batch(
            "PRAGMA defer_foreign_keys = ON;
             INSERT INTO MEMBER (ID, NAME, TEAM_ID) VALUES ('id1', 'memberA', 999);",
        )
    });

    let err = outcome.error().unwrap();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert_eq!(err.op(), Some("commit"));
    let sequence = capture.event_sequence(OP_UNIT_OF_WORK);
    assert_eq!(sequence[1], EVENT_TX_ROLLBACK);
    assert!(!sequence.contains(&EVENT_TX_COMMIT.to_string()));
}

#[test]
fn test_session_setup_failure_still_closes_factory() {
    let (capture, _guard) = scoped_capture();

    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let factory = file_factory(&sub.join("gone.db"));
    // Without its directory the database cannot be reopened
    std::fs::remove_dir_all(&sub).unwrap();

    let outcome: Outcome<()> = run_in_transaction(factory, |_| Ok(()));

    assert!(outcome.is_rolled_back());
    assert_eq!(
        capture.event_sequence(OP_UNIT_OF_WORK),
        lifecycle(&[EVENT_FACTORY_CLOSE])
    );
}
