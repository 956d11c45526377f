//! Sessions and the transactional execution wrapper
//!
//! - `SessionFactory` opens the database and hands out sessions
//! - `Session` owns one connection and runs exactly one transaction
//! - `SessionTx` is the handle a unit of work reads and writes through
//! - `run_in_transaction` ties them together with guaranteed cleanup

#![allow(clippy::result_large_err)]

mod factory;
mod reference;
mod tx;
mod wrapper;

pub use factory::{SessionFactory, SessionFactoryBuilder};
pub use reference::EntityRef;
pub use tx::SessionTx;
pub use wrapper::{run_in_transaction, Outcome};

use crate::errors::{from_rusqlite, Result};
use factory::Mappings;
use ormstudy_core::core_types::schema::{EVENT_SESSION_CLOSE, EVENT_TX_BEGIN};
use ormstudy_core::core_types::SessionId;
use ormstudy_core::{log_lifecycle, ExError, ExErrorKind};
use rusqlite::Connection;
use std::sync::Arc;

/// One unit-of-work boundary with its own connection
///
/// Dropping the session closes it; the close is logged exactly once.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    conn: Connection,
    mappings: Arc<Mappings>,
    show_sql: bool,
    began: bool,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        conn: Connection,
        mappings: Arc<Mappings>,
        show_sql: bool,
    ) -> Self {
        Self {
            id,
            conn,
            mappings,
            show_sql,
            began: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The raw connection, outside any transaction
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin the session's transaction
    ///
    /// # Errors
    ///
    /// `Closed` when this session already began its transaction,
    /// `Persistence` when SQLite refuses to begin.
    pub fn begin(&mut self) -> Result<SessionTx<'_>> {
        if self.began {
            return Err(ExError::new(ExErrorKind::Closed)
                .with_op("begin")
                .with_message(format!(
                    "session {} already ran its transaction",
                    self.id
                )));
        }
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        self.began = true;
        log_lifecycle!(EVENT_TX_BEGIN, session_id = %self.id);
        Ok(SessionTx::new(
            tx,
            self.id.clone(),
            Arc::clone(&self.mappings),
            self.show_sql,
        ))
    }

    /// Close the session and its connection
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log_lifecycle!(EVENT_SESSION_CLOSE, session_id = %self.id);
    }
}
