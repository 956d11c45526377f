//! Transactional execution wrapper
//!
//! `run_in_transaction` takes ownership of a factory, runs one unit of work
//! in one session, and releases everything before returning:
//!
//! ```text
//! tx_begin -> (unit of work) -> tx_commit | tx_rollback -> session_close -> factory_close
//! ```
//!
//! Cleanup is carried by `Drop`, so the same order holds when the unit of
//! work panics.

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::session::{Session, SessionFactory, SessionTx};
use ormstudy_core::{log_op_end, log_op_error, log_op_start, ExError};
use std::time::Instant;

const OP: &str = "run_in_transaction";

/// Result of one unit of work
#[derive(Debug)]
pub enum Outcome<T> {
    /// The work succeeded and its transaction committed
    Committed(T),
    /// The work, the commit, or the session setup failed; nothing was kept
    RolledBack(ExError),
}

impl<T> Outcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Outcome::RolledBack(_))
    }

    /// The failure, if the work rolled back
    pub fn error(&self) -> Option<&ExError> {
        match self {
            Outcome::Committed(_) => None,
            Outcome::RolledBack(err) => Some(err),
        }
    }

    /// The committed value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Committed(value) => Some(value),
            Outcome::RolledBack(_) => None,
        }
    }

    /// # Errors
    ///
    /// The rollback cause.
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Committed(value) => Ok(value),
            Outcome::RolledBack(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Committed(value) => Outcome::Committed(f(value)),
            Outcome::RolledBack(err) => Outcome::RolledBack(err),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_result()
    }
}

/// Run `work` in a fresh session and transaction, then close the session
/// and the factory
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`. The
/// failure is logged on the rollback event and handed back in
/// `Outcome::RolledBack`; the wrapper itself never panics. A panic inside
/// `work` still rolls back and closes both resources while unwinding.
pub fn run_in_transaction<T, F>(factory: SessionFactory, work: F) -> Outcome<T>
where
    F: FnOnce(&SessionTx<'_>) -> Result<T>,
{
    let start = Instant::now();
    let mut factory = factory;
    log_op_start!(OP, factory_id = %factory.id());

    let outcome = match factory.open_session() {
        Ok(mut session) => {
            let outcome = run_session(&mut session, work);
            session.close();
            outcome
        }
        Err(err) => Outcome::RolledBack(err),
    };
    factory.close();

    match &outcome {
        Outcome::Committed(_) => {
            log_op_end!(OP, duration_ms = start.elapsed().as_millis() as u64);
        }
        Outcome::RolledBack(err) => {
            log_op_error!(
                OP,
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
        }
    }
    outcome
}

fn run_session<T, F>(session: &mut Session, work: F) -> Outcome<T>
where
    F: FnOnce(&SessionTx<'_>) -> Result<T>,
{
    let tx = match session.begin() {
        Ok(tx) => tx,
        Err(err) => return Outcome::RolledBack(err),
    };

    match work(&tx) {
        Ok(value) => match tx.commit() {
            Ok(()) => Outcome::Committed(value),
            Err(err) => Outcome::RolledBack(err),
        },
        Err(err) => {
            if let Err(rollback_err) = tx.rollback(&err) {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Outcome::RolledBack(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceUnit;
    use ormstudy_core::ExErrorKind;

    fn factory() -> SessionFactory {
        SessionFactory::builder(PersistenceUnit::in_memory("wrapper"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_committed_value_is_returned() {
        let outcome = run_in_transaction(factory(), |tx| tx.query_scalar::<i64>("SELECT 40 + 2", ()));
        assert!(outcome.is_committed());
        assert_eq!(outcome.value(), Some(&42));
        assert_eq!(outcome.into_result().unwrap(), 42);
    }

    #[test]
    fn test_work_error_is_returned_unchanged() {
        let outcome: Outcome<()> =
            run_in_transaction(factory(), |_| Err(ExError::unit_of_work("boom")));
        assert!(outcome.is_rolled_back());
        let err = outcome.error().unwrap();
        assert_eq!(err.kind(), ExErrorKind::UnitOfWork);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_outcome_map_and_conversion() {
        let outcome = Outcome::Committed(2).map(|n| n * 10);
        let result: Result<i32> = outcome.into();
        assert_eq!(result.unwrap(), 20);

        let failed: Outcome<i32> = Outcome::RolledBack(ExError::unit_of_work("x"));
        assert!(failed.map(|n| n + 1).value().is_none());
    }
}
